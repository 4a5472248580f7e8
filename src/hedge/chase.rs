//! Post-only price chasing on the maker venue.
//!
//! The venue offers no fill stream, so fills are inferred from changes in
//! net position between polls and valued at the last quoted price.

use rust_decimal::Decimal;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use super::cashflow::CashFlowAccumulator;
use super::retry::RetryPolicy;
use crate::exchange::{ContractSpec, OrderHandle, OrderSide, Venue, VenueError};
use crate::utils::decimal::{round_down_to_lot, round_quote_to_tick};

/// What the chase is driving the maker position towards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChaseTarget {
    /// Build up to `size` on `side`
    Open { side: OrderSide, size: Decimal },
    /// Work the position back to flat
    Close,
}

impl ChaseTarget {
    /// Stopping predicate; re-evaluating a finished target stays true.
    pub fn is_complete(&self, position: Decimal, flat_epsilon: Decimal) -> bool {
        match self {
            ChaseTarget::Open { size, .. } => position.abs() >= *size,
            ChaseTarget::Close => position.abs() < flat_epsilon,
        }
    }

    /// Side of the next resting order.
    pub fn quote_side(&self, position: Decimal) -> Option<OrderSide> {
        match self {
            ChaseTarget::Open { side, .. } => Some(*side),
            ChaseTarget::Close => OrderSide::closing(position),
        }
    }

    /// Size still to be worked.
    pub fn remaining(&self, position: Decimal) -> Decimal {
        match self {
            ChaseTarget::Open { size, .. } => (*size - position.abs()).max(Decimal::ZERO),
            ChaseTarget::Close => position.abs(),
        }
    }
}

impl fmt::Display for ChaseTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChaseTarget::Open { .. } => write!(f, "opening"),
            ChaseTarget::Close => write!(f, "closing"),
        }
    }
}

/// The single in-flight maker order of a phase.
#[derive(Debug, Clone, PartialEq)]
pub struct ChaseOrder {
    pub side: OrderSide,
    pub remaining: Decimal,
    pub price: Decimal,
    pub handle: OrderHandle,
}

/// How a chase ended.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ChaseOutcome {
    /// Target reached at `position`; `filled` is the signed sum of observed deltas.
    Completed { position: Decimal, filled: Decimal },
    /// Stop flag raised before the target was reached.
    Stopped { position: Decimal, filled: Decimal },
}

impl ChaseOutcome {
    pub fn position(&self) -> Decimal {
        match self {
            ChaseOutcome::Completed { position, .. } | ChaseOutcome::Stopped { position, .. } => {
                *position
            }
        }
    }
}

/// Drives the maker venue's resting order toward a target position.
pub struct ChaseOrderController {
    venue: Arc<dyn Venue>,
    spec: ContractSpec,
    retry: RetryPolicy,
    interval: Duration,
    fill_timeout: Duration,
    flat_epsilon: Decimal,
    stop: Arc<AtomicBool>,
    active: Option<ChaseOrder>,
    last_quote: Option<Decimal>,
}

impl ChaseOrderController {
    pub fn new(
        venue: Arc<dyn Venue>,
        spec: ContractSpec,
        retry: RetryPolicy,
        interval: Duration,
        fill_timeout: Duration,
        flat_epsilon: Decimal,
        stop: Arc<AtomicBool>,
    ) -> Self {
        Self {
            venue,
            spec,
            retry,
            interval,
            fill_timeout,
            flat_epsilon,
            stop,
            active: None,
            last_quote: None,
        }
    }

    pub fn contract(&self) -> &str {
        &self.spec.symbol
    }

    pub fn venue(&self) -> &Arc<dyn Venue> {
        &self.venue
    }

    pub fn flat_epsilon(&self) -> Decimal {
        self.flat_epsilon
    }

    /// Price used to value the next observed fill.
    pub fn last_quote(&self) -> Option<Decimal> {
        self.last_quote
    }

    pub fn active_order(&self) -> Option<&ChaseOrder> {
        self.active.as_ref()
    }

    fn stopped(&self) -> bool {
        self.stop.load(Ordering::SeqCst)
    }

    /// Current maker position, retried per policy.
    pub async fn read_position(&self) -> Result<Decimal, VenueError> {
        let contract = self.contract();
        self.retry
            .run("net_position", || self.venue.net_position(contract))
            .await
    }

    /// Poll the position and account any change since `baseline`.
    ///
    /// `baseline` only advances once the delta has been recorded, so a
    /// failed poll never loses or double-counts a fill.
    pub async fn observe(
        &mut self,
        baseline: &mut Decimal,
        ledger: &mut CashFlowAccumulator,
        side_hint: OrderSide,
    ) -> Result<(Decimal, Decimal), VenueError> {
        let position = self.read_position().await?;
        let delta = position - *baseline;
        if delta.is_zero() {
            return Ok((position, delta));
        }

        let price = match self.last_quote {
            Some(price) => price,
            None => {
                // Fill seen before we ever quoted; value it at today's touch
                let contract = self.contract();
                let book = self
                    .retry
                    .run("best_bid_ask", || self.venue.best_bid_ask(contract))
                    .await?;
                book.near_touch(side_hint)
            }
        };

        ledger.record_maker_fill(delta, price);
        *baseline = position;
        info!(
            contract = %self.contract(),
            %delta,
            %price,
            %position,
            "Maker fill observed"
        );
        Ok((position, delta))
    }

    /// Cancel whatever rests, then quote the remaining size at the near touch.
    ///
    /// The position is re-read once the cancel is acknowledged, so a fill
    /// that raced the cancel is booked before the new order is sized.
    /// Returns `None` when nothing was submitted (target already met, stop
    /// raised after the cancel, or the remainder rounds to zero lots).
    pub async fn requote(
        &mut self,
        target: &ChaseTarget,
        baseline: &mut Decimal,
        ledger: &mut CashFlowAccumulator,
    ) -> Result<Option<ChaseOrder>, VenueError> {
        let contract = self.spec.symbol.clone();

        let book = self
            .retry
            .run("best_bid_ask", || self.venue.best_bid_ask(&contract))
            .await?;

        self.retry
            .run("cancel_all_orders", || self.venue.cancel_all_orders(&contract))
            .await?;
        self.active = None;

        let hint = target.quote_side(*baseline).unwrap_or(OrderSide::Buy);
        let (position, _) = self.observe(baseline, ledger, hint).await?;
        if target.is_complete(position, self.flat_epsilon) || self.stopped() {
            return Ok(None);
        }
        let Some(side) = target.quote_side(position) else {
            return Ok(None);
        };

        let price = round_quote_to_tick(book.near_touch(side), self.spec.tick_size, side);
        let size = round_down_to_lot(target.remaining(position), self.spec.lot_size);
        if size <= Decimal::ZERO {
            debug!(%contract, remaining = %target.remaining(position), "Remainder below lot size");
            return Ok(None);
        }

        let handle = self
            .retry
            .run("place_limit_order", || {
                self.venue
                    .place_limit_order(&contract, side, size, price, true)
            })
            .await?;

        self.last_quote = Some(price);
        let order = ChaseOrder {
            side,
            remaining: size,
            price,
            handle,
        };
        debug!(%contract, side = %side, %size, %price, "Chase order quoted");
        self.active = Some(order.clone());
        Ok(Some(order))
    }

    /// Best-effort removal of any resting order.
    pub async fn cancel_resting(&mut self) {
        let contract = self.spec.symbol.clone();
        match self
            .retry
            .run("cancel_all_orders", || self.venue.cancel_all_orders(&contract))
            .await
        {
            Ok(()) => self.active = None,
            Err(e) => warn!(%contract, error = %e, "Failed to cancel resting maker orders"),
        }
    }

    /// Chase until `target` is reached or the stop flag is raised.
    ///
    /// Venue errors inside an iteration are logged and the loop carries on
    /// at the next interval.
    pub async fn chase(
        &mut self,
        target: ChaseTarget,
        baseline: &mut Decimal,
        ledger: &mut CashFlowAccumulator,
    ) -> ChaseOutcome {
        let start = *baseline;
        let side_hint = match target {
            ChaseTarget::Open { side, .. } => side,
            ChaseTarget::Close => OrderSide::closing(start).unwrap_or(OrderSide::Buy),
        };
        let mut last_fill = Instant::now();
        let mut stall_warned = false;

        loop {
            if self.stopped() {
                self.cancel_resting().await;
                return ChaseOutcome::Stopped {
                    position: *baseline,
                    filled: *baseline - start,
                };
            }

            let position = match self.observe(baseline, ledger, side_hint).await {
                Ok((position, delta)) => {
                    if !delta.is_zero() {
                        last_fill = Instant::now();
                        stall_warned = false;
                    }
                    position
                }
                Err(e) => {
                    warn!(phase = %target, error = %e, "Position poll failed");
                    tokio::time::sleep(self.interval).await;
                    continue;
                }
            };

            if target.is_complete(position, self.flat_epsilon) {
                if self.active.is_some() {
                    self.cancel_resting().await;
                }
                info!(phase = %target, %position, "Maker target reached");
                return ChaseOutcome::Completed {
                    position,
                    filled: position - start,
                };
            }

            if self.stopped() {
                continue;
            }

            if !stall_warned && last_fill.elapsed() >= self.fill_timeout {
                warn!(
                    phase = %target,
                    %position,
                    waited_secs = last_fill.elapsed().as_secs(),
                    "No maker fill within fill timeout, still chasing"
                );
                stall_warned = true;
            }

            let before = *baseline;
            if let Err(e) = self.requote(&target, baseline, ledger).await {
                warn!(phase = %target, %position, error = %e, "Re-quote failed");
            }
            if *baseline != before {
                last_fill = Instant::now();
                stall_warned = false;
            }

            tokio::time::sleep(self.interval).await;
        }
    }
}
