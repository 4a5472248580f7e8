//! Signed notional flow per round and running totals.
//!
//! Fills are valued at the price we quoted or estimated, not at venue
//! reported execution prices, so every figure here is an estimate.

use rust_decimal::Decimal;
use serde::Serialize;

use crate::exchange::OrderSide;

/// Per-round and cumulative cash flow for both legs.
#[derive(Debug, Clone, Default)]
pub struct CashFlowAccumulator {
    maker_round: Decimal,
    taker_round: Decimal,
    total_volume: Decimal,
    cumulative_wear: Decimal,
}

/// Figures frozen when a round is closed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RoundTotals {
    pub maker_pnl: Decimal,
    pub taker_pnl: Decimal,
    pub round_wear: Decimal,
    pub cumulative_wear: Decimal,
    pub total_volume: Decimal,
}

impl CashFlowAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset the per-round flows. Volume and wear keep accumulating.
    pub fn begin_round(&mut self) {
        self.maker_round = Decimal::ZERO;
        self.taker_round = Decimal::ZERO;
    }

    /// Account a maker position change observed at `price`.
    ///
    /// A positive delta is a buy (cash out), a negative delta a sell.
    pub fn record_maker_fill(&mut self, delta: Decimal, price: Decimal) {
        self.maker_round -= delta * price;
        self.total_volume += delta.abs() * price;
    }

    /// Account a taker market order of `size` at `price`.
    pub fn record_taker_fill(&mut self, side: OrderSide, size: Decimal, price: Decimal) {
        self.taker_round -= side.sign() * size * price;
    }

    pub fn maker_cash_flow(&self) -> Decimal {
        self.maker_round
    }

    pub fn taker_cash_flow(&self) -> Decimal {
        self.taker_round
    }

    /// Sum of both legs for the current round.
    pub fn round_wear(&self) -> Decimal {
        self.maker_round + self.taker_round
    }

    pub fn total_volume(&self) -> Decimal {
        self.total_volume
    }

    pub fn cumulative_wear(&self) -> Decimal {
        self.cumulative_wear
    }

    /// Fold the round's wear into the running total and snapshot the figures.
    pub fn close_round(&mut self) -> RoundTotals {
        let round_wear = self.round_wear();
        self.cumulative_wear += round_wear;
        RoundTotals {
            maker_pnl: self.maker_round,
            taker_pnl: self.taker_round,
            round_wear,
            cumulative_wear: self.cumulative_wear,
            total_volume: self.total_volume,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_partial_buy_fills() {
        let mut ledger = CashFlowAccumulator::new();
        ledger.record_maker_fill(dec!(0.8), dec!(100));
        ledger.record_maker_fill(dec!(0.2), dec!(101));

        assert_eq!(ledger.maker_cash_flow(), dec!(-100.2));
        assert_eq!(ledger.total_volume(), dec!(100.2));
    }

    #[test]
    fn test_sell_fill_is_inflow() {
        let mut ledger = CashFlowAccumulator::new();
        ledger.record_maker_fill(dec!(-0.5), dec!(102));
        ledger.record_taker_fill(OrderSide::Buy, dec!(0.5), dec!(101));

        assert_eq!(ledger.maker_cash_flow(), dec!(51));
        assert_eq!(ledger.taker_cash_flow(), dec!(-50.5));
        assert_eq!(ledger.total_volume(), dec!(51));
    }

    #[test]
    fn test_round_wear_and_cumulative_totals() {
        let mut ledger = CashFlowAccumulator::new();
        ledger.record_maker_fill(dec!(0.8), dec!(100));
        ledger.record_maker_fill(dec!(0.2), dec!(101));
        ledger.record_taker_fill(OrderSide::Sell, dec!(1.0), dec!(101));

        let first = ledger.close_round();
        assert_eq!(first.round_wear, dec!(0.8));
        assert_eq!(first.cumulative_wear, dec!(0.8));

        ledger.begin_round();
        assert_eq!(ledger.maker_cash_flow(), Decimal::ZERO);
        assert_eq!(ledger.taker_cash_flow(), Decimal::ZERO);

        ledger.record_maker_fill(dec!(-1), dec!(100));
        ledger.record_taker_fill(OrderSide::Buy, dec!(1), dec!(100.5));
        let second = ledger.close_round();

        assert_eq!(second.round_wear, dec!(-0.5));
        assert_eq!(second.cumulative_wear, dec!(0.3));
        assert_eq!(second.total_volume, dec!(200.2));
    }

    #[test]
    fn test_mixed_sign_fill_sequences() {
        // (observed deltas with their quotes, maker flow, volume)
        let cases: Vec<(Vec<(Decimal, Decimal)>, Decimal, Decimal)> = vec![
            (vec![], dec!(0), dec!(0)),
            (vec![(dec!(1), dec!(100)), (dec!(-1), dec!(101))], dec!(1), dec!(201)),
            (
                vec![(dec!(-0.3), dec!(50)), (dec!(0.5), dec!(49)), (dec!(-0.2), dec!(51))],
                dec!(0.7),
                dec!(49.7),
            ),
            (
                vec![(dec!(0.25), dec!(2000)), (dec!(0.25), dec!(2001)), (dec!(-0.5), dec!(1999))],
                dec!(-0.75),
                dec!(1999.75),
            ),
            (vec![(dec!(-2), dec!(10.5)), (dec!(2), dec!(10.5))], dec!(0), dec!(42)),
        ];

        for (fills, maker, volume) in cases {
            let mut ledger = CashFlowAccumulator::new();
            for (delta, price) in &fills {
                ledger.record_maker_fill(*delta, *price);
            }
            assert_eq!(ledger.maker_cash_flow(), maker, "fills {:?}", fills);
            assert_eq!(ledger.total_volume(), volume, "fills {:?}", fills);
            assert_eq!(ledger.round_wear(), maker);
        }
    }
}
