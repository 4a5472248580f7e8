//! Hedge round engine.
//!
//! A round opens a position on the maker venue with post-only orders,
//! offsets each fill on the taker venue with a market order, holds, then
//! unwinds both legs the same way and reports the cash flow.

mod cashflow;
mod chase;
mod orchestrator;
mod report;
mod retry;
mod taker;

pub use cashflow::{CashFlowAccumulator, RoundTotals};
pub use chase::{ChaseOrder, ChaseOrderController, ChaseOutcome, ChaseTarget};
pub use orchestrator::{next_direction, HedgeRoundOrchestrator, RoundSettings, RoundState, RunSummary};
pub use report::{ReportSink, RoundReport};
pub use retry::{ErrorClassifier, RetryPolicy};
pub use taker::TakerHedgeExecutor;

#[cfg(test)]
pub use report::MockReportSink;
