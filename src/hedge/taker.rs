//! Market-order offset on the taker venue.

use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{error, info};

use super::cashflow::CashFlowAccumulator;
use super::retry::RetryPolicy;
use crate::exchange::{next_client_order_id, OrderSide, Venue, VenueError};

/// Submits compensating market orders and tracks the taker position.
pub struct TakerHedgeExecutor {
    taker: Arc<dyn Venue>,
    taker_contract: String,
    /// Maker venue; its book prices the taker fill
    quote_venue: Arc<dyn Venue>,
    quote_contract: String,
    quote_retry: RetryPolicy,
    order_retry: RetryPolicy,
    position: Decimal,
}

impl TakerHedgeExecutor {
    pub fn new(
        taker: Arc<dyn Venue>,
        taker_contract: impl Into<String>,
        quote_venue: Arc<dyn Venue>,
        quote_contract: impl Into<String>,
        quote_retry: RetryPolicy,
        order_retry: RetryPolicy,
    ) -> Self {
        Self {
            taker,
            taker_contract: taker_contract.into(),
            quote_venue,
            quote_contract: quote_contract.into(),
            quote_retry,
            order_retry,
            position: Decimal::ZERO,
        }
    }

    /// Locally tracked taker position.
    pub fn position(&self) -> Decimal {
        self.position
    }

    pub fn contract(&self) -> &str {
        &self.taker_contract
    }

    /// Offset `size` on the taker venue.
    ///
    /// Returns false without touching any state when the order fails.
    /// With `is_close` the order is reduce-only and the tracked position is
    /// set to exactly zero afterwards. Retries inside one call reuse a single
    /// client order id, so the venue executes the order at most once.
    pub async fn hedge(
        &mut self,
        side: OrderSide,
        size: Decimal,
        is_close: bool,
        ledger: &mut CashFlowAccumulator,
    ) -> bool {
        let client_order_id = next_client_order_id();
        match self.execute(side, size, is_close, &client_order_id).await {
            Ok(price) => {
                ledger.record_taker_fill(side, size, price);
                self.position += side.sign() * size;
                if is_close {
                    self.position = Decimal::ZERO;
                }
                info!(
                    venue = self.taker.name(),
                    contract = %self.taker_contract,
                    side = %side,
                    %size,
                    est_price = %price,
                    taker_position = %self.position,
                    "Taker hedge filled"
                );
                true
            }
            Err(e) => {
                error!(
                    venue = self.taker.name(),
                    contract = %self.taker_contract,
                    side = %side,
                    %size,
                    is_close,
                    %client_order_id,
                    error = %e,
                    "Taker hedge failed"
                );
                false
            }
        }
    }

    /// Price the order off the maker book, then submit it.
    async fn execute(
        &self,
        side: OrderSide,
        size: Decimal,
        is_close: bool,
        client_order_id: &str,
    ) -> Result<Decimal, VenueError> {
        let book = self
            .quote_retry
            .run("best_bid_ask", || self.quote_venue.best_bid_ask(&self.quote_contract))
            .await?;
        let est_price = book.far_touch(side);

        info!(
            contract = %self.taker_contract,
            side = %side,
            %size,
            %est_price,
            reduce_only = is_close,
            %client_order_id,
            "Sending taker hedge"
        );

        self.order_retry
            .run("place_market_order", || {
                self.taker
                    .place_market_order(&self.taker_contract, side, size, is_close, client_order_id)
            })
            .await?;

        Ok(est_price)
    }
}
