//! Venue-neutral order types plus Binance USDⓈ-M wire formats.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};

static CLIENT_ORDER_SEQ: AtomicU64 = AtomicU64::new(1);

/// Fresh client order id, unique within the process.
///
/// Reusing one id across retries of the same order lets the venue
/// recognise a resubmission.
pub fn next_client_order_id() -> String {
    let seq = CLIENT_ORDER_SEQ.fetch_add(1, Ordering::Relaxed);
    format!("hedge-{}-{}", Utc::now().timestamp_millis(), seq)
}

/// Order side (buy or sell).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderSide {
    #[serde(alias = "buy", alias = "Buy")]
    Buy,
    #[serde(alias = "sell", alias = "Sell")]
    Sell,
}

impl OrderSide {
    /// The other side of the book.
    pub fn opposite(self) -> Self {
        match self {
            OrderSide::Buy => OrderSide::Sell,
            OrderSide::Sell => OrderSide::Buy,
        }
    }

    /// +1 for buys, -1 for sells.
    pub fn sign(self) -> Decimal {
        match self {
            OrderSide::Buy => Decimal::ONE,
            OrderSide::Sell => Decimal::NEGATIVE_ONE,
        }
    }

    /// Side that reduces a signed position back to flat, if any.
    pub fn closing(position: Decimal) -> Option<Self> {
        if position > Decimal::ZERO {
            Some(OrderSide::Sell)
        } else if position < Decimal::ZERO {
            Some(OrderSide::Buy)
        } else {
            None
        }
    }

    /// Wire representation used by Binance.
    pub fn as_str(self) -> &'static str {
        match self {
            OrderSide::Buy => "BUY",
            OrderSide::Sell => "SELL",
        }
    }
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderSide {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "buy" | "long" => Ok(OrderSide::Buy),
            "sell" | "short" => Ok(OrderSide::Sell),
            other => Err(format!("unknown side '{}', expected buy or sell", other)),
        }
    }
}

/// Top of book for one contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BookTop {
    pub bid: Decimal,
    pub ask: Decimal,
}

impl BookTop {
    pub fn new(bid: Decimal, ask: Decimal) -> Self {
        Self { bid, ask }
    }

    /// Price that joins the queue on our own side without crossing.
    ///
    /// Buys rest on the bid, sells rest on the ask.
    pub fn near_touch(&self, side: OrderSide) -> Decimal {
        match side {
            OrderSide::Buy => self.bid,
            OrderSide::Sell => self.ask,
        }
    }

    /// Price a marketable order on `side` is expected to execute at.
    pub fn far_touch(&self, side: OrderSide) -> Decimal {
        match side {
            OrderSide::Buy => self.ask,
            OrderSide::Sell => self.bid,
        }
    }
}

/// Trading rules for one contract, resolved once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractSpec {
    pub symbol: String,
    pub tick_size: Decimal,
    pub lot_size: Decimal,
}

/// Handle to a resting order returned by a venue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderHandle {
    pub order_id: String,
    pub contract: String,
    pub side: OrderSide,
    pub size: Decimal,
    pub price: Decimal,
}

/// Acknowledgement of an immediate (market) order.
#[derive(Debug, Clone, PartialEq)]
pub struct FillConfirmation {
    pub order_id: String,
    pub contract: String,
    pub side: OrderSide,
    pub size: Decimal,
    /// Average fill price when the venue reports one.
    pub avg_price: Option<Decimal>,
    pub timestamp: DateTime<Utc>,
}

// ==================== Binance wire formats ====================

/// Best bid/ask for a single symbol.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookTicker {
    pub symbol: String,
    #[serde(with = "rust_decimal::serde::str")]
    pub bid_price: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub ask_price: Decimal,
}

/// Position risk entry (one per symbol and position side).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionRisk {
    pub symbol: String,
    #[serde(with = "rust_decimal::serde::str")]
    pub position_amt: Decimal,
}

/// Open order as listed by `GET /fapi/v1/openOrders`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenOrder {
    pub order_id: i64,
    pub symbol: String,
    pub side: OrderSide,
}

/// Order acknowledgement from `POST /fapi/v1/order`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderResponse {
    pub order_id: i64,
    pub symbol: String,
    pub status: String,
    #[serde(with = "rust_decimal::serde::str")]
    pub price: Decimal,
    #[serde(default, with = "rust_decimal::serde::str_option")]
    pub avg_price: Option<Decimal>,
    #[serde(with = "rust_decimal::serde::str")]
    pub orig_qty: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub executed_qty: Decimal,
    pub side: OrderSide,
    pub update_time: i64,
}

/// Error body returned with non-2xx responses.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorBody {
    pub code: i64,
    pub msg: String,
}

/// Subset of `GET /fapi/v1/exchangeInfo` needed for contract rules.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FuturesExchangeInfo {
    pub symbols: Vec<FuturesSymbolInfo>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FuturesSymbolInfo {
    pub symbol: String,
    pub status: String,
    #[serde(default)]
    pub filters: Vec<SymbolFilter>,
}

/// Symbol filters; only price and lot filters are interpreted.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "filterType")]
pub enum SymbolFilter {
    #[serde(rename = "PRICE_FILTER", rename_all = "camelCase")]
    Price {
        #[serde(with = "rust_decimal::serde::str")]
        tick_size: Decimal,
    },
    #[serde(rename = "LOT_SIZE", rename_all = "camelCase")]
    LotSize {
        #[serde(with = "rust_decimal::serde::str")]
        step_size: Decimal,
    },
    #[serde(other)]
    Other,
}

impl FuturesSymbolInfo {
    /// Convert exchange filters into a `ContractSpec`.
    pub fn contract_spec(&self) -> Option<ContractSpec> {
        let mut tick_size = None;
        let mut lot_size = None;
        for filter in &self.filters {
            match filter {
                SymbolFilter::Price { tick_size: t } => tick_size = Some(*t),
                SymbolFilter::LotSize { step_size } => lot_size = Some(*step_size),
                SymbolFilter::Other => {}
            }
        }
        Some(ContractSpec {
            symbol: self.symbol.clone(),
            tick_size: tick_size?,
            lot_size: lot_size?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_side_helpers() {
        assert_eq!(OrderSide::Buy.opposite(), OrderSide::Sell);
        assert_eq!(OrderSide::Sell.sign(), dec!(-1));
        assert_eq!(OrderSide::closing(dec!(0.5)), Some(OrderSide::Sell));
        assert_eq!(OrderSide::closing(dec!(-0.5)), Some(OrderSide::Buy));
        assert_eq!(OrderSide::closing(Decimal::ZERO), None);
        assert_eq!("SELL".parse::<OrderSide>().unwrap(), OrderSide::Sell);
        assert!("hold".parse::<OrderSide>().is_err());
    }

    #[test]
    fn test_near_touch_never_crosses() {
        let book = BookTop::new(dec!(100), dec!(101));
        assert_eq!(book.near_touch(OrderSide::Buy), dec!(100));
        assert_eq!(book.near_touch(OrderSide::Sell), dec!(101));
        assert_eq!(book.far_touch(OrderSide::Buy), dec!(101));
        assert_eq!(book.far_touch(OrderSide::Sell), dec!(100));
    }

    #[test]
    fn test_exchange_info_filters() {
        let json = r#"{"symbols":[{"symbol":"BTCUSDT","status":"TRADING","filters":[
            {"filterType":"PRICE_FILTER","tickSize":"0.10","minPrice":"556.80"},
            {"filterType":"LOT_SIZE","stepSize":"0.001","minQty":"0.001"},
            {"filterType":"PERCENT_PRICE","multiplierUp":"1.05"}]}]}"#;
        let info: FuturesExchangeInfo = serde_json::from_str(json).unwrap();
        let spec = info.symbols[0].contract_spec().unwrap();
        assert_eq!(spec.tick_size, dec!(0.10));
        assert_eq!(spec.lot_size, dec!(0.001));
    }
}
