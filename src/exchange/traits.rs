//! Venue capability trait shared by the maker and taker legs.
//!
//! The hedge core only needs five remote operations from a venue:
//! - Top of book and net position reads
//! - Cancel everything resting on a contract
//! - Post-only limit orders (maker leg)
//! - Market orders (taker leg)
//!
//! Each concrete venue decides how to provide them. Venue-specific
//! workarounds (e.g. synthesizing cancel-all) live in the implementation.

use async_trait::async_trait;
use rust_decimal::Decimal;
use std::fmt;

use super::error::VenueError;
use super::types::{BookTop, ContractSpec, FillConfirmation, OrderHandle, OrderSide};

/// Which leg of the hedge a venue is serving.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VenueRole {
    Maker,
    Taker,
}

impl fmt::Display for VenueRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VenueRole::Maker => write!(f, "maker"),
            VenueRole::Taker => write!(f, "taker"),
        }
    }
}

/// Remote operations the hedge core consumes from a venue.
#[async_trait]
pub trait Venue: Send + Sync {
    /// Human-readable venue name for logs.
    fn name(&self) -> &str;

    /// Resolve tick and lot rules for a contract.
    async fn contract_spec(&self, contract: &str) -> Result<ContractSpec, VenueError>;

    /// Current best bid and ask.
    async fn best_bid_ask(&self, contract: &str) -> Result<BookTop, VenueError>;

    /// Net signed position size (positive long, negative short).
    ///
    /// May be served from a short-lived cache keyed by contract.
    async fn net_position(&self, contract: &str) -> Result<Decimal, VenueError>;

    /// Cancel every resting order on `contract`. Succeeds when none exist.
    async fn cancel_all_orders(&self, contract: &str) -> Result<(), VenueError>;

    /// Submit a resting limit order.
    async fn place_limit_order(
        &self,
        contract: &str,
        side: OrderSide,
        size: Decimal,
        price: Decimal,
        post_only: bool,
    ) -> Result<OrderHandle, VenueError>;

    /// Submit an immediate market order.
    ///
    /// Submitting again with the same `client_order_id` must not execute a
    /// second time; the earlier execution is returned instead.
    async fn place_market_order(
        &self,
        contract: &str,
        side: OrderSide,
        size: Decimal,
        reduce_only: bool,
        client_order_id: &str,
    ) -> Result<FillConfirmation, VenueError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_display() {
        assert_eq!(VenueRole::Maker.to_string(), "maker");
        assert_eq!(VenueRole::Taker.to_string(), "taker");
    }
}
