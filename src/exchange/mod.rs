//! Venue integrations for the hedge legs.
//!
//! ## Binance USDⓈ-M futures
//! Signed REST access for:
//! - Top of book and contract rules
//! - Net position reads (cached per contract)
//! - Post-only limit orders, market orders and cancels
//!
//! ## Paper
//! In-memory simulation used for paper trading and tests, optionally
//! priced off a live venue's book.

mod cache;
mod client;
mod decorator;
mod error;
pub mod paper;
mod traits;
mod types;

pub use cache::PositionCache;
pub use client::BinanceFuturesClient;
pub use decorator::{apply_decorators, QueryParamDecorator, RequestDecorator};
pub use error::{matches_transient_signature, TransportKind, VenueError};
pub use paper::PaperVenue;
pub use traits::{Venue, VenueRole};
pub use types::*;
