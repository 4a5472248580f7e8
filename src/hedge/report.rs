//! Round summaries and the sink boundary they are delivered through.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use super::cashflow::RoundTotals;
use crate::exchange::OrderSide;

/// Immutable summary of one completed round.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoundReport {
    pub ticker: String,
    pub round: u32,
    pub iterations: u32,
    /// Maker direction of the opening leg
    pub direction: OrderSide,
    pub maker_pnl: Decimal,
    pub taker_pnl: Decimal,
    /// maker + taker; normally <= 0 since both legs pay spread and fees
    pub round_wear: Decimal,
    pub cumulative_wear: Decimal,
    /// Maker notional traded since startup
    pub total_volume: Decimal,
    pub finished_at: DateTime<Utc>,
}

impl RoundReport {
    pub fn new(
        ticker: &str,
        round: u32,
        iterations: u32,
        direction: OrderSide,
        totals: RoundTotals,
    ) -> Self {
        Self {
            ticker: ticker.to_string(),
            round,
            iterations,
            direction,
            maker_pnl: totals.maker_pnl,
            taker_pnl: totals.taker_pnl,
            round_wear: totals.round_wear,
            cumulative_wear: totals.cumulative_wear,
            total_volume: totals.total_volume,
            finished_at: Utc::now(),
        }
    }
}

/// Receives round reports. Delivery is best effort.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ReportSink: Send + Sync {
    async fn send_report(&self, report: &RoundReport) -> anyhow::Result<()>;
}
