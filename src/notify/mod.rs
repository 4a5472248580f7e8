//! Round report sinks.

mod telegram;

pub use telegram::{format_report, TelegramReporter};

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, warn};

use crate::hedge::{ReportSink, RoundReport};

/// Writes each report to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogReportSink;

#[async_trait]
impl ReportSink for LogReportSink {
    async fn send_report(&self, report: &RoundReport) -> Result<()> {
        info!(
            ticker = %report.ticker,
            round = report.round,
            iterations = report.iterations,
            direction = %report.direction,
            maker_pnl = %report.maker_pnl,
            taker_pnl = %report.taker_pnl,
            round_wear = %report.round_wear,
            cumulative_wear = %report.cumulative_wear,
            total_volume = %report.total_volume,
            "📊 Round finished"
        );
        Ok(())
    }
}

/// Fans a report out to every inner sink.
///
/// All sinks are attempted; the first error is returned afterwards.
#[derive(Default)]
pub struct MultiSink {
    sinks: Vec<Arc<dyn ReportSink>>,
}

impl MultiSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, sink: Arc<dyn ReportSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

#[async_trait]
impl ReportSink for MultiSink {
    async fn send_report(&self, report: &RoundReport) -> Result<()> {
        let mut first_error = None;
        for sink in &self.sinks {
            if let Err(e) = sink.send_report(report).await {
                warn!(round = report.round, error = %e, "Report sink failed");
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
