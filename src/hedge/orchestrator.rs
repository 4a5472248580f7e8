//! Round state machine tying the maker chase, taker hedge and reporting
//! together for one ticker.

use anyhow::{ensure, Context, Result};
use rust_decimal::Decimal;
use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, info_span, warn, Instrument};

use super::cashflow::CashFlowAccumulator;
use super::chase::{ChaseOrderController, ChaseOutcome, ChaseTarget};
use super::report::{ReportSink, RoundReport};
use super::retry::RetryPolicy;
use super::taker::TakerHedgeExecutor;
use crate::config::{Config, HedgeConfig};
use crate::exchange::{OrderSide, Venue};
use crate::utils::decimal::{is_lot_multiple, round_down_to_lot};

/// Longest the holding phase goes without looking at the stop flag.
const HOLD_STOP_POLL: Duration = Duration::from_millis(250);

/// Where the current round is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RoundState {
    Idle,
    Opening,
    Holding,
    Closing,
    Reporting,
    Stopped,
}

impl fmt::Display for RoundState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RoundState::Idle => "idle",
            RoundState::Opening => "opening",
            RoundState::Holding => "holding",
            RoundState::Closing => "closing",
            RoundState::Reporting => "reporting",
            RoundState::Stopped => "stopped",
        };
        write!(f, "{}", name)
    }
}

/// Direction of the round after `previous`; the first round uses `start`.
pub fn next_direction(previous: Option<OrderSide>, start: OrderSide) -> OrderSide {
    previous.map(OrderSide::opposite).unwrap_or(start)
}

/// Per-ticker round parameters.
#[derive(Debug, Clone)]
pub struct RoundSettings {
    pub ticker: String,
    pub order_quantity: Decimal,
    pub iterations: u32,
    pub start_side: OrderSide,
    pub holding_time: Duration,
    pub report_pause: Duration,
    /// Polling tick while a failed taker hedge is re-attempted
    pub hedge_retry_interval: Duration,
}

impl RoundSettings {
    pub fn from_config(ticker: &str, config: &HedgeConfig) -> Self {
        Self {
            ticker: ticker.to_string(),
            order_quantity: config.order_quantity,
            iterations: config.iterations,
            start_side: config.start_side,
            holding_time: config.holding_time(),
            report_pause: config.report_pause(),
            hedge_retry_interval: config.hedge_retry_interval(),
        }
    }
}

/// Outcome of a ticker's whole run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub ticker: String,
    pub rounds_completed: u32,
    pub cumulative_wear: Decimal,
    pub total_volume: Decimal,
    pub stopped: bool,
}

/// Runs hedge rounds for one ticker until the iteration count is exhausted
/// or the stop flag is raised.
pub struct HedgeRoundOrchestrator {
    settings: RoundSettings,
    chase: ChaseOrderController,
    taker: TakerHedgeExecutor,
    sink: Arc<dyn ReportSink>,
    stop: Arc<AtomicBool>,
    ledger: CashFlowAccumulator,
    state: RoundState,
    last_direction: Option<OrderSide>,
}

impl HedgeRoundOrchestrator {
    pub fn new(
        settings: RoundSettings,
        chase: ChaseOrderController,
        taker: TakerHedgeExecutor,
        sink: Arc<dyn ReportSink>,
        stop: Arc<AtomicBool>,
    ) -> Self {
        Self {
            settings,
            chase,
            taker,
            sink,
            stop,
            ledger: CashFlowAccumulator::new(),
            state: RoundState::Idle,
            last_direction: None,
        }
    }

    /// Resolve both contracts and wire the components.
    ///
    /// Any failure here happens before the first round and is fatal.
    pub async fn build(
        ticker: &str,
        config: &Config,
        maker: Arc<dyn Venue>,
        taker: Arc<dyn Venue>,
        sink: Arc<dyn ReportSink>,
        stop: Arc<AtomicBool>,
    ) -> Result<Self> {
        let maker_symbol = config.maker.contract_for(ticker);
        let taker_symbol = config.taker.contract_for(ticker);

        let maker_spec = maker
            .contract_spec(&maker_symbol)
            .await
            .with_context(|| format!("Failed to resolve {} on {}", maker_symbol, maker.name()))?;
        let taker_spec = taker
            .contract_spec(&taker_symbol)
            .await
            .with_context(|| format!("Failed to resolve {} on {}", taker_symbol, taker.name()))?;

        let quantity = config.hedge.order_quantity;
        ensure!(
            round_down_to_lot(quantity, maker_spec.lot_size) > Decimal::ZERO,
            "{}: order quantity {} is below the maker lot size {}",
            ticker,
            quantity,
            maker_spec.lot_size
        );
        ensure!(
            is_lot_multiple(quantity, maker_spec.lot_size),
            "{}: order quantity {} is not a multiple of the maker lot size {}",
            ticker,
            quantity,
            maker_spec.lot_size
        );
        // Every maker delta is a whole number of maker lots and must be
        // hedged exactly on the taker.
        ensure!(
            is_lot_multiple(quantity, taker_spec.lot_size)
                && is_lot_multiple(maker_spec.lot_size, taker_spec.lot_size),
            "{}: maker lot {} and order quantity {} must be multiples of the taker lot size {}",
            ticker,
            maker_spec.lot_size,
            quantity,
            taker_spec.lot_size
        );

        info!(
            %ticker,
            maker = maker.name(),
            maker_contract = %maker_spec.symbol,
            tick_size = %maker_spec.tick_size,
            lot_size = %maker_spec.lot_size,
            taker = taker.name(),
            taker_contract = %taker_spec.symbol,
            "Contracts resolved"
        );

        let retry = RetryPolicy::from_config(&config.retry);
        let chase = ChaseOrderController::new(
            maker.clone(),
            maker_spec.clone(),
            retry.clone(),
            config.hedge.chase_interval(),
            config.hedge.fill_timeout(),
            config.hedge.flat_epsilon,
            stop.clone(),
        );
        let hedger = TakerHedgeExecutor::new(
            taker,
            taker_spec.symbol,
            maker,
            maker_spec.symbol,
            retry,
            RetryPolicy::for_market_orders(&config.retry),
        );

        Ok(Self::new(
            RoundSettings::from_config(ticker, &config.hedge),
            chase,
            hedger,
            sink,
            stop,
        ))
    }

    pub fn state(&self) -> RoundState {
        self.state
    }

    pub fn ledger(&self) -> &CashFlowAccumulator {
        &self.ledger
    }

    pub fn taker_position(&self) -> Decimal {
        self.taker.position()
    }

    fn stopped(&self) -> bool {
        self.stop.load(Ordering::SeqCst)
    }

    /// Run all configured rounds.
    pub async fn run(&mut self) -> RunSummary {
        let mut rounds_completed = 0;

        for round in 1..=self.settings.iterations {
            if self.stopped() {
                break;
            }

            let direction = next_direction(self.last_direction, self.settings.start_side);
            let span = info_span!(
                "round",
                ticker = %self.settings.ticker,
                round,
                direction = %direction
            );
            if !self.run_round(round, direction).instrument(span).await {
                break;
            }

            self.last_direction = Some(direction);
            rounds_completed += 1;

            if round < self.settings.iterations && !self.settings.report_pause.is_zero() {
                tokio::time::sleep(self.settings.report_pause).await;
            }
        }

        let stopped = rounds_completed < self.settings.iterations;
        if stopped {
            self.state = RoundState::Stopped;
        }

        let summary = RunSummary {
            ticker: self.settings.ticker.clone(),
            rounds_completed,
            cumulative_wear: self.ledger.cumulative_wear(),
            total_volume: self.ledger.total_volume(),
            stopped,
        };
        info!(
            ticker = %summary.ticker,
            rounds = summary.rounds_completed,
            cumulative_wear = %summary.cumulative_wear,
            total_volume = %summary.total_volume,
            stopped,
            "Hedge run finished"
        );
        summary
    }

    /// One full round. Returns false if the round was abandoned on stop.
    async fn run_round(&mut self, round: u32, direction: OrderSide) -> bool {
        self.state = RoundState::Idle;
        self.ledger.begin_round();

        let Some(mut baseline) = self.capture_baseline().await else {
            return self.abandon("idle", Decimal::ZERO);
        };
        info!(%baseline, quantity = %self.settings.order_quantity, "Round started");

        // Opening
        self.state = RoundState::Opening;
        let target = ChaseTarget::Open {
            side: direction,
            size: self.settings.order_quantity,
        };
        let round_start = baseline;
        if let ChaseOutcome::Stopped { position, .. } =
            self.chase.chase(target, &mut baseline, &mut self.ledger).await
        {
            return self.abandon("opening", position);
        }
        if !self.hedge_open(direction, round_start, &mut baseline).await {
            return self.abandon("opening", baseline);
        }

        // Holding
        self.state = RoundState::Holding;
        info!(hold_secs = self.settings.holding_time.as_secs(), "Holding hedged position");
        if !self.hold().await {
            return self.abandon("holding", baseline);
        }

        // Closing
        self.state = RoundState::Closing;
        if let ChaseOutcome::Stopped { position, .. } = self
            .chase
            .chase(ChaseTarget::Close, &mut baseline, &mut self.ledger)
            .await
        {
            return self.abandon("closing", position);
        }
        if !self.hedge_close().await {
            return self.abandon("closing", baseline);
        }

        // Reporting
        self.state = RoundState::Reporting;
        let totals = self.ledger.close_round();
        let report = RoundReport::new(
            &self.settings.ticker,
            round,
            self.settings.iterations,
            direction,
            totals,
        );
        self.deliver(&report).await;

        self.state = RoundState::Idle;
        true
    }

    /// Read the maker position, retrying each chase interval until it
    /// succeeds or the run is stopped.
    async fn capture_baseline(&self) -> Option<Decimal> {
        loop {
            if self.stopped() {
                return None;
            }
            match self.chase.read_position().await {
                Ok(position) => return Some(position),
                Err(e) => {
                    warn!(phase = "idle", error = %e, "Failed to capture maker baseline");
                    tokio::time::sleep(self.settings.hedge_retry_interval).await;
                }
            }
        }
    }

    /// Offset everything the maker filled since `round_start`.
    ///
    /// A failed hedge is re-attempted every retry tick with the maker
    /// position re-read, so late fills are covered too.
    async fn hedge_open(
        &mut self,
        direction: OrderSide,
        round_start: Decimal,
        baseline: &mut Decimal,
    ) -> bool {
        let mut attempt = 0u32;
        loop {
            if self.stopped() {
                return false;
            }

            if attempt > 0 {
                if let Err(e) = self.chase.observe(baseline, &mut self.ledger, direction).await {
                    warn!(phase = "opening", error = %e, "Position poll before hedge retry failed");
                    tokio::time::sleep(self.settings.hedge_retry_interval).await;
                    continue;
                }
            }

            let uncovered = -(*baseline - round_start) - self.taker.position();
            let Some(side) = OrderSide::closing(-uncovered) else {
                return true;
            };

            attempt += 1;
            if self
                .taker
                .hedge(side, uncovered.abs(), false, &mut self.ledger)
                .await
            {
                return true;
            }

            warn!(phase = "opening", attempt, "Taker hedge will be retried");
            tokio::time::sleep(self.settings.hedge_retry_interval).await;
        }
    }

    /// Flatten the taker leg.
    async fn hedge_close(&mut self) -> bool {
        let mut attempt = 0u32;
        loop {
            if self.stopped() {
                return false;
            }

            let position = self.taker.position();
            let Some(side) = OrderSide::closing(position) else {
                return true;
            };

            attempt += 1;
            if self
                .taker
                .hedge(side, position.abs(), true, &mut self.ledger)
                .await
            {
                return true;
            }

            warn!(phase = "closing", attempt, "Taker close will be retried");
            tokio::time::sleep(self.settings.hedge_retry_interval).await;
        }
    }

    async fn deliver(&self, report: &RoundReport) {
        match serde_json::to_string(report) {
            Ok(json) => info!(target: "round_report", "{}", json),
            Err(e) => warn!(error = %e, "Failed to serialize round report"),
        }

        if let Err(e) = self.sink.send_report(report).await {
            warn!(error = %e, "Round report delivery failed");
        }
    }

    /// Sit out the holding time. Returns false as soon as the stop flag is seen.
    async fn hold(&self) -> bool {
        let deadline = tokio::time::Instant::now() + self.settings.holding_time;
        loop {
            if self.stopped() {
                return false;
            }
            let now = tokio::time::Instant::now();
            if now >= deadline {
                return true;
            }
            tokio::time::sleep((deadline - now).min(HOLD_STOP_POLL)).await;
        }
    }

    fn abandon(&mut self, phase: &str, maker_position: Decimal) -> bool {
        self.state = RoundState::Stopped;
        let taker_position = self.taker.position();
        if maker_position.is_zero() && taker_position.is_zero() {
            info!(%phase, "Round stopped");
        } else {
            error!(
                %phase,
                %maker_position,
                %taker_position,
                "Round stopped with open exposure"
            );
        }
        false
    }
}
