//! Decimal rounding helpers for exchange tick and lot rules.

use rust_decimal::Decimal;

use crate::exchange::OrderSide;

/// Round a quote onto the tick grid without improving it past the touch.
///
/// Bids round down and asks round up, so a post-only quote never crosses
/// because of rounding.
pub fn round_quote_to_tick(value: Decimal, tick_size: Decimal, side: OrderSide) -> Decimal {
    if tick_size == Decimal::ZERO {
        return value;
    }
    let ticks = value / tick_size;
    let ticks = match side {
        OrderSide::Buy => ticks.floor(),
        OrderSide::Sell => ticks.ceil(),
    };
    ticks * tick_size
}

/// Round down to lot size (quantity precision).
pub fn round_down_to_lot(value: Decimal, lot_size: Decimal) -> Decimal {
    if lot_size == Decimal::ZERO {
        return value;
    }
    (value / lot_size).floor() * lot_size
}

/// True when `value` is a whole number of lots. A zero lot accepts anything.
pub fn is_lot_multiple(value: Decimal, lot_size: Decimal) -> bool {
    lot_size == Decimal::ZERO || (value % lot_size).is_zero()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_round_quote_to_tick() {
        assert_eq!(
            round_quote_to_tick(dec!(100.07), dec!(0.05), OrderSide::Buy),
            dec!(100.05)
        );
        assert_eq!(
            round_quote_to_tick(dec!(100.07), dec!(0.05), OrderSide::Sell),
            dec!(100.10)
        );
        assert_eq!(
            round_quote_to_tick(dec!(100.05), dec!(0.05), OrderSide::Sell),
            dec!(100.05)
        );
    }

    #[test]
    fn test_round_down_to_lot() {
        assert_eq!(round_down_to_lot(dec!(1.567), dec!(0.001)), dec!(1.567));
        assert_eq!(round_down_to_lot(dec!(1.567), dec!(0.01)), dec!(1.56));
        assert_eq!(round_down_to_lot(dec!(0.0004), dec!(0.001)), dec!(0));
    }

    #[test]
    fn test_is_lot_multiple() {
        assert!(is_lot_multiple(dec!(0.05), dec!(0.01)));
        assert!(is_lot_multiple(dec!(0.01), dec!(0.001)));
        assert!(!is_lot_multiple(dec!(0.005), dec!(0.01)));
        assert!(!is_lot_multiple(dec!(0.001), dec!(0.01)));
        assert!(is_lot_multiple(dec!(0.0037), Decimal::ZERO));
    }
}
