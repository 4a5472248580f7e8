//! # Cross-Venue Hedger
//!
//! Runs delta-neutral hedge rounds across two perpetual futures venues: a
//! post-only maker leg chased at the touch and a market-order taker leg
//! that offsets every maker fill.
//!
//! ## Architecture
//!
//! - `config`: Configuration management and validation
//! - `exchange`: Venue trait, Binance futures REST client and paper venue
//! - `hedge`: Chase controller, taker hedge, round state machine, accounting
//! - `notify`: Round report sinks (log, Telegram)
//! - `utils`: Shared utilities and decimal arithmetic

pub mod config;
pub mod exchange;
pub mod hedge;
pub mod notify;
pub mod utils;

pub use config::Config;
