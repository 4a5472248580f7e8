//! Configuration management for the cross-venue hedger.
//!
//! Loads settings from `config.toml`, `.env` and `HEDGE__*` environment
//! variables. CLI flags are applied on top by the launcher.

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::exchange::OrderSide;

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Round parameters
    #[serde(default)]
    pub hedge: HedgeConfig,
    /// Maker venue (post-only chase leg)
    #[serde(default)]
    pub maker: VenueConfig,
    /// Taker venue (market-order hedge leg)
    #[serde(default)]
    pub taker: VenueConfig,
    /// Retry schedule for remote calls
    #[serde(default)]
    pub retry: RetryConfig,
    /// Round report delivery
    #[serde(default)]
    pub telegram: TelegramConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HedgeConfig {
    /// Base assets to trade, one orchestrator task each (e.g. "BTC")
    #[serde(default = "default_tickers")]
    pub tickers: Vec<String>,
    /// Fixed size opened and closed every round
    #[serde(default = "default_order_quantity")]
    pub order_quantity: Decimal,
    /// Number of rounds to run
    #[serde(default = "default_iterations")]
    pub iterations: u32,
    /// Maker direction of round 1; later rounds alternate
    #[serde(default = "default_start_side")]
    pub start_side: OrderSide,
    /// How long the hedged pair is held before closing
    #[serde(default = "default_holding_time_secs")]
    pub holding_time_secs: u64,
    /// Seconds without any maker fill before a stall warning is logged
    #[serde(default = "default_fill_timeout_secs")]
    pub fill_timeout_secs: u64,
    /// Delay between chase re-quotes
    #[serde(default = "default_chase_interval_ms")]
    pub chase_interval_ms: u64,
    /// Polling tick while a failed taker hedge is re-attempted
    #[serde(default = "default_hedge_retry_interval_ms")]
    pub hedge_retry_interval_ms: u64,
    /// Pause after each round report
    #[serde(default = "default_report_pause_secs")]
    pub report_pause_secs: u64,
    /// Position magnitude below which the maker leg counts as flat
    #[serde(default = "default_flat_epsilon")]
    pub flat_epsilon: Decimal,
}

/// Whether a venue leg trades for real or is simulated in memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VenueKind {
    Live,
    Paper,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VenueConfig {
    /// Live or paper leg
    #[serde(default = "default_venue_kind")]
    pub kind: VenueKind,
    /// REST base URL
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// API key for authentication
    #[serde(default)]
    pub api_key: String,
    /// Secret key for signing requests
    #[serde(default)]
    pub secret_key: String,
    /// Contract naming template; `{base}` is replaced by the ticker
    #[serde(default = "default_symbol_format")]
    pub symbol_format: String,
    /// Override of the venue-reported price tick
    #[serde(default)]
    pub tick_size: Option<Decimal>,
    /// Override of the venue-reported quantity step
    #[serde(default)]
    pub lot_size: Option<Decimal>,
    /// Position read cache lifetime (0 disables caching)
    #[serde(default = "default_position_cache_ttl_ms")]
    pub position_cache_ttl_ms: u64,
    /// Extra query parameters appended to matching requests
    #[serde(default)]
    pub query_params: Vec<QueryParamRule>,
}

/// One request decoration rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryParamRule {
    pub path_contains: String,
    pub key: String,
    pub value: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Attempts for cancels, quotes and position reads
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// First backoff delay
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,
    /// Multiplier applied to the delay after each failure
    #[serde(default = "default_backoff")]
    pub backoff: f64,
    /// Upper bound on a single delay
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
    /// Attempts for taker market orders
    #[serde(default = "default_market_order_attempts")]
    pub market_order_attempts: u32,
    /// Backoff multiplier for taker market orders
    #[serde(default = "default_market_order_backoff")]
    pub market_order_backoff: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub bot_token: String,
    #[serde(default)]
    pub chat_id: String,
    #[serde(default = "default_telegram_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_telegram_api_url")]
    pub api_url: String,
}

// Default value functions
fn default_tickers() -> Vec<String> {
    vec!["BTC".to_string()]
}

fn default_order_quantity() -> Decimal {
    dec!(0.001)
}

fn default_iterations() -> u32 {
    10
}

fn default_start_side() -> OrderSide {
    OrderSide::Buy
}

fn default_holding_time_secs() -> u64 {
    60
}

fn default_fill_timeout_secs() -> u64 {
    10
}

fn default_chase_interval_ms() -> u64 {
    2000
}

fn default_hedge_retry_interval_ms() -> u64 {
    1000
}

fn default_report_pause_secs() -> u64 {
    5
}

fn default_flat_epsilon() -> Decimal {
    dec!(0.00000001)
}

fn default_venue_kind() -> VenueKind {
    VenueKind::Paper
}

fn default_base_url() -> String {
    "https://fapi.binance.com".to_string()
}

fn default_symbol_format() -> String {
    "{base}USDT".to_string()
}

fn default_position_cache_ttl_ms() -> u64 {
    1000
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_delay_ms() -> u64 {
    2000
}

fn default_backoff() -> f64 {
    2.0
}

fn default_max_delay_ms() -> u64 {
    30_000
}

fn default_market_order_attempts() -> u32 {
    5
}

fn default_market_order_backoff() -> f64 {
    1.5
}

fn default_telegram_timeout_secs() -> u64 {
    5
}

fn default_telegram_api_url() -> String {
    "https://api.telegram.org".to_string()
}

impl Config {
    /// Load configuration from environment variables and config files.
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(config::File::with_name("config").required(false))
            .add_source(config::Environment::default().separator("__").prefix("HEDGE"))
            .build()
            .context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(!self.hedge.tickers.is_empty(), "at least one ticker is required");
        anyhow::ensure!(
            self.hedge.tickers.iter().all(|t| !t.trim().is_empty()),
            "tickers must not be blank"
        );
        anyhow::ensure!(
            self.hedge.order_quantity > Decimal::ZERO,
            "order_quantity must be positive"
        );
        anyhow::ensure!(self.hedge.iterations >= 1, "iterations must be >= 1");
        anyhow::ensure!(
            self.hedge.flat_epsilon >= Decimal::ZERO,
            "flat_epsilon must not be negative"
        );
        anyhow::ensure!(
            self.hedge.flat_epsilon < self.hedge.order_quantity,
            "flat_epsilon must be smaller than order_quantity"
        );

        anyhow::ensure!(
            self.retry.max_attempts >= 1 && self.retry.market_order_attempts >= 1,
            "retry attempts must be >= 1"
        );
        anyhow::ensure!(
            self.retry.backoff >= 1.0 && self.retry.market_order_backoff >= 1.0,
            "retry backoff multipliers must be >= 1.0"
        );

        for (role, venue) in [("maker", &self.maker), ("taker", &self.taker)] {
            anyhow::ensure!(
                venue.symbol_format.contains("{base}"),
                "{} symbol_format must contain {{base}}",
                role
            );
            if venue.kind == VenueKind::Live {
                anyhow::ensure!(
                    !venue.api_key.is_empty() && !venue.secret_key.is_empty(),
                    "{} venue is live but has no API credentials",
                    role
                );
            }
        }

        if self.telegram.enabled {
            anyhow::ensure!(
                !self.telegram.bot_token.is_empty() && !self.telegram.chat_id.is_empty(),
                "telegram is enabled but bot_token or chat_id is missing"
            );
        }

        Ok(())
    }
}

impl HedgeConfig {
    pub fn holding_time(&self) -> Duration {
        Duration::from_secs(self.holding_time_secs)
    }

    pub fn fill_timeout(&self) -> Duration {
        Duration::from_secs(self.fill_timeout_secs)
    }

    pub fn chase_interval(&self) -> Duration {
        Duration::from_millis(self.chase_interval_ms)
    }

    pub fn hedge_retry_interval(&self) -> Duration {
        Duration::from_millis(self.hedge_retry_interval_ms)
    }

    pub fn report_pause(&self) -> Duration {
        Duration::from_secs(self.report_pause_secs)
    }
}

impl VenueConfig {
    /// Venue contract name for a base asset, e.g. "BTC" -> "BTCUSDT".
    pub fn contract_for(&self, ticker: &str) -> String {
        let base = ticker.split('-').next().unwrap_or(ticker).trim().to_uppercase();
        self.symbol_format.replace("{base}", &base)
    }

    pub fn position_cache_ttl(&self) -> Duration {
        Duration::from_millis(self.position_cache_ttl_ms)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            hedge: HedgeConfig::default(),
            maker: VenueConfig::default(),
            taker: VenueConfig::default(),
            retry: RetryConfig::default(),
            telegram: TelegramConfig::default(),
        }
    }
}

impl Default for HedgeConfig {
    fn default() -> Self {
        Self {
            tickers: default_tickers(),
            order_quantity: default_order_quantity(),
            iterations: default_iterations(),
            start_side: default_start_side(),
            holding_time_secs: default_holding_time_secs(),
            fill_timeout_secs: default_fill_timeout_secs(),
            chase_interval_ms: default_chase_interval_ms(),
            hedge_retry_interval_ms: default_hedge_retry_interval_ms(),
            report_pause_secs: default_report_pause_secs(),
            flat_epsilon: default_flat_epsilon(),
        }
    }
}

impl Default for VenueConfig {
    fn default() -> Self {
        Self {
            kind: default_venue_kind(),
            base_url: default_base_url(),
            api_key: String::new(),
            secret_key: String::new(),
            symbol_format: default_symbol_format(),
            tick_size: None,
            lot_size: None,
            position_cache_ttl_ms: default_position_cache_ttl_ms(),
            query_params: Vec::new(),
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay_ms: default_initial_delay_ms(),
            backoff: default_backoff(),
            max_delay_ms: default_max_delay_ms(),
            market_order_attempts: default_market_order_attempts(),
            market_order_backoff: default_market_order_backoff(),
        }
    }
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            bot_token: String::new(),
            chat_id: String::new(),
            timeout_secs: default_telegram_timeout_secs(),
            api_url: default_telegram_api_url(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.hedge.chase_interval(), Duration::from_secs(2));
        assert_eq!(config.hedge.start_side, OrderSide::Buy);
    }

    #[test]
    fn test_contract_naming() {
        let venue = VenueConfig::default();
        assert_eq!(venue.contract_for("btc"), "BTCUSDT");
        assert_eq!(venue.contract_for("ETH-USD-PERP"), "ETHUSDT");

        let perp = VenueConfig {
            symbol_format: "{base}-USD-PERP".to_string(),
            ..Default::default()
        };
        assert_eq!(perp.contract_for("SOL"), "SOL-USD-PERP");
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut config = Config::default();
        config.hedge.order_quantity = Decimal::ZERO;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.maker.kind = VenueKind::Live;
        assert!(config.validate().is_err());
        config.maker.api_key = "key".to_string();
        config.maker.secret_key = "secret".to_string();
        assert!(config.validate().is_ok());

        let mut config = Config::default();
        config.telegram.enabled = true;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.hedge.flat_epsilon = dec!(0.01);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_deserialize_partial_toml_shape() {
        let source = config::Config::builder()
            .add_source(config::File::from_str(
                r#"
                [hedge]
                tickers = ["ETH"]
                order_quantity = "0.05"
                start_side = "sell"
                holding_time_secs = 30

                [taker]
                symbol_format = "{base}-USD-PERP"
                "#,
                config::FileFormat::Toml,
            ))
            .build()
            .unwrap();
        let config: Config = source.try_deserialize().unwrap();

        assert_eq!(config.hedge.tickers, vec!["ETH".to_string()]);
        assert_eq!(config.hedge.order_quantity, dec!(0.05));
        assert_eq!(config.hedge.start_side, OrderSide::Sell);
        assert_eq!(config.hedge.iterations, 10);
        assert_eq!(config.taker.contract_for("ETH"), "ETH-USD-PERP");
        assert_eq!(config.maker.kind, VenueKind::Paper);
    }
}
