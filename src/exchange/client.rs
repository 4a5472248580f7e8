//! Binance USDⓈ-M futures REST client implementing [`Venue`].

use async_trait::async_trait;
use chrono::Utc;
use futures_util::future::join_all;
use hmac::{Hmac, Mac};
use reqwest::{Client, Method, Response};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use sha2::Sha256;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use crate::config::VenueConfig;
use crate::exchange::cache::PositionCache;
use crate::exchange::decorator::{apply_decorators, RequestDecorator};
use crate::exchange::error::VenueError;
use crate::exchange::traits::Venue;
use crate::exchange::types::*;

/// Order no longer exists (filled or already cancelled).
const CODE_UNKNOWN_ORDER: i64 = -2011;
/// Order lookup found nothing.
const CODE_NO_SUCH_ORDER: i64 = -2013;
/// Post-only order would have executed as taker.
const CODE_POST_ONLY_REJECTED: i64 = -5022;
const CODE_NEW_ORDER_REJECTED: i64 = -2010;
const AUTH_CODES: &[i64] = &[-1022, -2014, -2015];

/// Signed REST client for one Binance futures account.
pub struct BinanceFuturesClient {
    name: String,
    http: Client,
    api_key: String,
    secret_key: String,
    base_url: String,
    decorators: Vec<Arc<dyn RequestDecorator>>,
    positions: PositionCache,
    tick_override: Option<Decimal>,
    lot_override: Option<Decimal>,
    /// Market order ids sent without a definite answer yet
    pending_market_ids: Mutex<HashSet<String>>,
}

impl BinanceFuturesClient {
    /// Create a new client from venue configuration.
    ///
    /// `decorators` run on every request before signing.
    pub fn new(
        name: impl Into<String>,
        config: &VenueConfig,
        decorators: Vec<Arc<dyn RequestDecorator>>,
    ) -> anyhow::Result<Self> {
        use anyhow::Context;

        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            name: name.into(),
            http,
            api_key: config.api_key.clone(),
            secret_key: config.secret_key.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            decorators,
            positions: PositionCache::new(config.position_cache_ttl()),
            tick_override: config.tick_size,
            lot_override: config.lot_size,
            pending_market_ids: Mutex::new(HashSet::new()),
        })
    }

    /// Generate HMAC-SHA256 signature for authenticated requests.
    fn sign(&self, query_string: &str) -> String {
        let mut mac = Hmac::<Sha256>::new_from_slice(self.secret_key.as_bytes())
            .expect("HMAC can take key of any size");
        mac.update(query_string.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    fn encode_query(params: &[(String, String)]) -> String {
        params
            .iter()
            .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&")
    }

    /// Unauthenticated GET.
    async fn public_get<T: DeserializeOwned>(
        &self,
        path: &str,
        mut params: Vec<(String, String)>,
    ) -> Result<T, VenueError> {
        apply_decorators(&self.decorators, path, &mut params);
        let mut url = format!("{}{}", self.base_url, path);
        if !params.is_empty() {
            url = format!("{}?{}", url, Self::encode_query(&params));
        }

        let response = self.http.get(&url).send().await?;
        Self::decode(response).await
    }

    /// Signed request; parameters travel in the query string.
    async fn signed<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        mut params: Vec<(String, String)>,
    ) -> Result<T, VenueError> {
        apply_decorators(&self.decorators, path, &mut params);
        params.push(("timestamp".to_string(), Utc::now().timestamp_millis().to_string()));

        let query_string = Self::encode_query(&params);
        let signature = self.sign(&query_string);
        let url = format!(
            "{}{}?{}&signature={}",
            self.base_url, path, query_string, signature
        );

        let response = self
            .http
            .request(method, &url)
            .header("X-MBX-APIKEY", &self.api_key)
            .send()
            .await?;

        Self::decode(response).await
    }

    fn fill_from(response: OrderResponse) -> FillConfirmation {
        let size = if response.executed_qty > Decimal::ZERO {
            response.executed_qty
        } else {
            response.orig_qty
        };
        FillConfirmation {
            order_id: response.order_id.to_string(),
            contract: response.symbol,
            side: response.side,
            size,
            avg_price: response.avg_price.filter(|p| *p > Decimal::ZERO),
            timestamp: Utc::now(),
        }
    }

    /// Map non-2xx responses onto the venue error taxonomy.
    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, VenueError> {
        let status = response.status();
        let body = response.text().await?;

        if status.is_success() {
            return serde_json::from_str(&body).map_err(VenueError::from);
        }

        let (code, message) = match serde_json::from_str::<ApiErrorBody>(&body) {
            Ok(err) => (err.code, err.msg),
            Err(_) => (0, body),
        };

        if status.as_u16() == 401 || AUTH_CODES.contains(&code) {
            return Err(VenueError::Auth(message));
        }
        if code == CODE_POST_ONLY_REJECTED || code == CODE_NEW_ORDER_REJECTED {
            return Err(VenueError::Rejected(message));
        }

        Err(VenueError::Api {
            status: status.as_u16(),
            code,
            message,
        })
    }

    /// List resting orders on a symbol.
    #[instrument(skip(self))]
    pub async fn get_open_orders(&self, symbol: &str) -> Result<Vec<OpenOrder>, VenueError> {
        self.signed(
            Method::GET,
            "/fapi/v1/openOrders",
            vec![("symbol".to_string(), symbol.to_string())],
        )
        .await
    }

    /// Cancel one order; an order that is already gone counts as cancelled.
    #[instrument(skip(self))]
    pub async fn cancel_order(&self, symbol: &str, order_id: i64) -> Result<(), VenueError> {
        let result: Result<serde_json::Value, VenueError> = self
            .signed(
                Method::DELETE,
                "/fapi/v1/order",
                vec![
                    ("symbol".to_string(), symbol.to_string()),
                    ("orderId".to_string(), order_id.to_string()),
                ],
            )
            .await;

        match result {
            Ok(_) => Ok(()),
            Err(VenueError::Api { code, .. }) if code == CODE_UNKNOWN_ORDER => {
                debug!(%symbol, order_id, "Order already gone");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Look an order up by client id. `None` when the venue has no such order.
    #[instrument(skip(self))]
    pub async fn query_order(
        &self,
        symbol: &str,
        client_order_id: &str,
    ) -> Result<Option<OrderResponse>, VenueError> {
        let result = self
            .signed(
                Method::GET,
                "/fapi/v1/order",
                vec![
                    ("symbol".to_string(), symbol.to_string()),
                    ("origClientOrderId".to_string(), client_order_id.to_string()),
                ],
            )
            .await;

        match result {
            Ok(order) => Ok(Some(order)),
            Err(VenueError::Api { code, .. }) if code == CODE_NO_SUCH_ORDER => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn submit_order(
        &self,
        params: Vec<(String, String)>,
        contract: &str,
    ) -> Result<OrderResponse, VenueError> {
        let result = self.signed(Method::POST, "/fapi/v1/order", params).await;
        self.positions.invalidate(contract).await;
        result
    }
}

#[async_trait]
impl Venue for BinanceFuturesClient {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(skip(self), fields(venue = %self.name))]
    async fn contract_spec(&self, contract: &str) -> Result<ContractSpec, VenueError> {
        let info: FuturesExchangeInfo = self.public_get("/fapi/v1/exchangeInfo", vec![]).await?;

        let symbol = info
            .symbols
            .iter()
            .find(|s| s.symbol == contract)
            .ok_or_else(|| VenueError::UnknownContract(contract.to_string()))?;

        if symbol.status != "TRADING" {
            return Err(VenueError::UnknownContract(format!(
                "{} is not trading (status {})",
                contract, symbol.status
            )));
        }

        let mut spec = symbol.contract_spec().ok_or_else(|| {
            VenueError::Decode(format!("{} is missing price or lot filters", contract))
        })?;
        if let Some(tick) = self.tick_override {
            spec.tick_size = tick;
        }
        if let Some(lot) = self.lot_override {
            spec.lot_size = lot;
        }
        Ok(spec)
    }

    #[instrument(skip(self), fields(venue = %self.name))]
    async fn best_bid_ask(&self, contract: &str) -> Result<BookTop, VenueError> {
        let ticker: BookTicker = self
            .public_get(
                "/fapi/v1/ticker/bookTicker",
                vec![("symbol".to_string(), contract.to_string())],
            )
            .await?;
        Ok(BookTop::new(ticker.bid_price, ticker.ask_price))
    }

    #[instrument(skip(self), fields(venue = %self.name))]
    async fn net_position(&self, contract: &str) -> Result<Decimal, VenueError> {
        if let Some(size) = self.positions.get(contract).await {
            return Ok(size);
        }

        let positions: Vec<PositionRisk> = self
            .signed(
                Method::GET,
                "/fapi/v2/positionRisk",
                vec![("symbol".to_string(), contract.to_string())],
            )
            .await?;

        let size = positions
            .iter()
            .filter(|p| p.symbol == contract)
            .map(|p| p.position_amt)
            .sum::<Decimal>();

        self.positions.put(contract, size).await;
        Ok(size)
    }

    /// Binance's bulk endpoint is not used: listing and cancelling each
    /// order lets one failed cancel be reported without hiding the rest.
    #[instrument(skip(self), fields(venue = %self.name))]
    async fn cancel_all_orders(&self, contract: &str) -> Result<(), VenueError> {
        let open = self.get_open_orders(contract).await?;
        if open.is_empty() {
            // An order that filled before the cancel leaves nothing open,
            // but the cached position no longer reflects it.
            self.positions.invalidate(contract).await;
            return Ok(());
        }

        let results = join_all(
            open.iter()
                .map(|order| self.cancel_order(contract, order.order_id)),
        )
        .await;
        self.positions.invalidate(contract).await;

        let mut failures = results.into_iter().filter_map(Result::err);
        match failures.next() {
            None => Ok(()),
            Some(first) => {
                let remaining = failures.count();
                if remaining > 0 {
                    warn!(%contract, remaining, "Additional cancel failures suppressed");
                }
                Err(first)
            }
        }
    }

    #[instrument(skip(self), fields(venue = %self.name))]
    async fn place_limit_order(
        &self,
        contract: &str,
        side: OrderSide,
        size: Decimal,
        price: Decimal,
        post_only: bool,
    ) -> Result<OrderHandle, VenueError> {
        let time_in_force = if post_only { "GTX" } else { "GTC" };
        let params = vec![
            ("symbol".to_string(), contract.to_string()),
            ("side".to_string(), side.as_str().to_string()),
            ("type".to_string(), "LIMIT".to_string()),
            ("timeInForce".to_string(), time_in_force.to_string()),
            ("quantity".to_string(), size.normalize().to_string()),
            ("price".to_string(), price.normalize().to_string()),
            ("newClientOrderId".to_string(), next_client_order_id()),
        ];

        let response = self.submit_order(params, contract).await?;

        // Older API versions acknowledge a crossing GTX order as EXPIRED.
        if response.status == "EXPIRED" {
            return Err(VenueError::Rejected(format!(
                "post-only order {} expired immediately",
                response.order_id
            )));
        }

        Ok(OrderHandle {
            order_id: response.order_id.to_string(),
            contract: response.symbol,
            side: response.side,
            size: response.orig_qty,
            price: response.price,
        })
    }

    #[instrument(skip(self), fields(venue = %self.name))]
    async fn place_market_order(
        &self,
        contract: &str,
        side: OrderSide,
        size: Decimal,
        reduce_only: bool,
        client_order_id: &str,
    ) -> Result<FillConfirmation, VenueError> {
        // A timeout or 5xx leaves the outcome unknown; never resend blindly
        let resent = self.pending_market_ids.lock().await.contains(client_order_id);
        if resent {
            if let Some(existing) = self.query_order(contract, client_order_id).await? {
                if existing.executed_qty > Decimal::ZERO {
                    info!(
                        %contract,
                        %client_order_id,
                        executed = %existing.executed_qty,
                        "Market order had executed before the error, not resending"
                    );
                    self.pending_market_ids.lock().await.remove(client_order_id);
                    self.positions.invalidate(contract).await;
                    return Ok(Self::fill_from(existing));
                }
            }
        }

        let mut params = vec![
            ("symbol".to_string(), contract.to_string()),
            ("side".to_string(), side.as_str().to_string()),
            ("type".to_string(), "MARKET".to_string()),
            ("quantity".to_string(), size.normalize().to_string()),
            ("newClientOrderId".to_string(), client_order_id.to_string()),
        ];
        if reduce_only {
            params.push(("reduceOnly".to_string(), "true".to_string()));
        }

        self.pending_market_ids
            .lock()
            .await
            .insert(client_order_id.to_string());
        let result = self.submit_order(params, contract).await;
        if !matches!(&result, Err(e) if e.is_transient()) {
            self.pending_market_ids.lock().await.remove(client_order_id);
        }

        Ok(Self::fill_from(result?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exchange::decorator::QueryParamDecorator;
    use crate::exchange::error::TransportKind;
    use crate::hedge::RetryPolicy;
    use rust_decimal_macros::dec;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> BinanceFuturesClient {
        let config = VenueConfig {
            base_url: server.uri(),
            api_key: "key".to_string(),
            secret_key: "secret".to_string(),
            position_cache_ttl_ms: 60_000,
            ..Default::default()
        };
        BinanceFuturesClient::new("maker", &config, vec![]).unwrap()
    }

    fn order_json(order_id: i64, status: &str, kind: &str) -> serde_json::Value {
        json!({
            "orderId": order_id,
            "symbol": "BTCUSDT",
            "status": status,
            "price": if kind == "LIMIT" { "100.0" } else { "0" },
            "avgPrice": if kind == "LIMIT" { "0.00000" } else { "101.5" },
            "origQty": "0.5",
            "executedQty": if kind == "LIMIT" { "0" } else { "0.5" },
            "side": "BUY",
            "type": kind,
            "updateTime": 1700000000000i64
        })
    }

    #[tokio::test]
    async fn test_best_bid_ask() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/fapi/v1/ticker/bookTicker"))
            .and(query_param("symbol", "BTCUSDT"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "symbol": "BTCUSDT",
                "bidPrice": "100.10",
                "bidQty": "3.2",
                "askPrice": "100.20",
                "askQty": "1.1",
                "time": 1700000000000i64
            })))
            .mount(&server)
            .await;

        let book = client_for(&server).best_bid_ask("BTCUSDT").await.unwrap();
        assert_eq!(book, BookTop::new(dec!(100.10), dec!(100.20)));
    }

    #[tokio::test]
    async fn test_net_position_is_cached_per_contract() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/fapi/v2/positionRisk"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"symbol": "BTCUSDT", "positionAmt": "-0.250", "positionSide": "BOTH"}
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        assert_eq!(client.net_position("BTCUSDT").await.unwrap(), dec!(-0.25));
        assert_eq!(client.net_position("BTCUSDT").await.unwrap(), dec!(-0.25));
    }

    #[tokio::test]
    async fn test_cancel_all_tolerates_already_gone_orders() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/fapi/v1/openOrders"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"orderId": 1, "symbol": "BTCUSDT", "side": "BUY"},
                {"orderId": 2, "symbol": "BTCUSDT", "side": "BUY"}
            ])))
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/fapi/v1/order"))
            .and(query_param("orderId", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(order_json(1, "CANCELED", "LIMIT")))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/fapi/v1/order"))
            .and(query_param("orderId", "2"))
            .respond_with(
                ResponseTemplate::new(400)
                    .set_body_json(json!({"code": -2011, "msg": "Unknown order sent."})),
            )
            .expect(1)
            .mount(&server)
            .await;

        client_for(&server).cancel_all_orders("BTCUSDT").await.unwrap();
    }

    #[tokio::test]
    async fn test_cancel_all_with_no_orders_is_noop() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/fapi/v1/openOrders"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        client_for(&server).cancel_all_orders("BTCUSDT").await.unwrap();
    }

    #[tokio::test]
    async fn test_post_only_limit_order() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/fapi/v1/order"))
            .and(query_param("type", "LIMIT"))
            .and(query_param("timeInForce", "GTX"))
            .and(query_param("quantity", "0.5"))
            .and(query_param("price", "100"))
            .respond_with(ResponseTemplate::new(200).set_body_json(order_json(42, "NEW", "LIMIT")))
            .mount(&server)
            .await;

        let handle = client_for(&server)
            .place_limit_order("BTCUSDT", OrderSide::Buy, dec!(0.5), dec!(100.0), true)
            .await
            .unwrap();
        assert_eq!(handle.order_id, "42");
        assert_eq!(handle.size, dec!(0.5));
    }

    #[tokio::test]
    async fn test_post_only_rejection_is_not_transient() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/fapi/v1/order"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "code": -5022,
                "msg": "Due to the order could not be executed as maker, the Post Only order will be rejected."
            })))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .place_limit_order("BTCUSDT", OrderSide::Buy, dec!(0.5), dec!(100), true)
            .await
            .unwrap_err();
        assert!(matches!(err, VenueError::Rejected(_)));
        assert!(!err.is_transient());
    }

    #[tokio::test]
    async fn test_market_order_reduce_only() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/fapi/v1/order"))
            .and(query_param("type", "MARKET"))
            .and(query_param("reduceOnly", "true"))
            .respond_with(ResponseTemplate::new(200).set_body_json(order_json(7, "FILLED", "MARKET")))
            .mount(&server)
            .await;

        let fill = client_for(&server)
            .place_market_order("BTCUSDT", OrderSide::Buy, dec!(0.5), true, "hedge-1-1")
            .await
            .unwrap();
        assert_eq!(fill.avg_price, Some(dec!(101.5)));
    }

    fn posted_client_ids(requests: &[wiremock::Request]) -> Vec<String> {
        requests
            .iter()
            .filter_map(|r| {
                r.url
                    .query_pairs()
                    .find(|(k, _)| k == "newClientOrderId")
                    .map(|(_, v)| v.to_string())
            })
            .collect()
    }

    #[tokio::test]
    async fn test_market_order_retry_reuses_client_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/fapi/v1/order"))
            .respond_with(ResponseTemplate::new(503).set_body_string("Service Unavailable"))
            .up_to_n_times(1)
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/fapi/v1/order"))
            .and(query_param("origClientOrderId", "hedge-7-1"))
            .respond_with(
                ResponseTemplate::new(400)
                    .set_body_json(json!({"code": -2013, "msg": "Order does not exist."})),
            )
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/fapi/v1/order"))
            .respond_with(ResponseTemplate::new(200).set_body_json(order_json(9, "FILLED", "MARKET")))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let retry = RetryPolicy::new(3, Duration::ZERO, 1.0, Duration::ZERO);
        let fill = retry
            .run("place_market_order", || {
                client.place_market_order("BTCUSDT", OrderSide::Buy, dec!(0.5), false, "hedge-7-1")
            })
            .await
            .unwrap();

        assert_eq!(fill.order_id, "9");
        let requests = server.received_requests().await.unwrap();
        assert_eq!(posted_client_ids(&requests), vec!["hedge-7-1", "hedge-7-1"]);
    }

    #[tokio::test]
    async fn test_executed_market_order_is_not_resent() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/fapi/v1/order"))
            .respond_with(ResponseTemplate::new(504).set_body_string("Gateway Timeout"))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/fapi/v1/order"))
            .and(query_param("origClientOrderId", "hedge-8-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(order_json(11, "FILLED", "MARKET")))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let retry = RetryPolicy::new(3, Duration::ZERO, 1.0, Duration::ZERO);
        let fill = retry
            .run("place_market_order", || {
                client.place_market_order("BTCUSDT", OrderSide::Buy, dec!(0.5), false, "hedge-8-1")
            })
            .await
            .unwrap();

        assert_eq!(fill.order_id, "11");
        assert_eq!(fill.size, dec!(0.5));
    }

    #[tokio::test]
    async fn test_server_errors_are_transient() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/fapi/v1/ticker/bookTicker"))
            .respond_with(ResponseTemplate::new(503).set_body_string("Service Unavailable"))
            .mount(&server)
            .await;

        let err = client_for(&server).best_bid_ask("BTCUSDT").await.unwrap_err();
        assert!(matches!(err, VenueError::Api { status: 503, .. }));
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn test_connection_refused_is_transient() {
        let config = VenueConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            ..Default::default()
        };
        let client = BinanceFuturesClient::new("maker", &config, vec![]).unwrap();
        let err = client.best_bid_ask("BTCUSDT").await.unwrap_err();
        assert!(matches!(
            err,
            VenueError::Transport {
                kind: TransportKind::Connect,
                ..
            }
        ));
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn test_decorators_apply_to_signed_requests() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/fapi/v1/openOrders"))
            .and(query_param("recvWindow", "5000"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .expect(1)
            .mount(&server)
            .await;

        let config = VenueConfig {
            base_url: server.uri(),
            ..Default::default()
        };
        let decorators: Vec<Arc<dyn RequestDecorator>> =
            vec![Arc::new(QueryParamDecorator::new("/fapi/", "recvWindow", "5000"))];
        let client = BinanceFuturesClient::new("maker", &config, decorators).unwrap();
        client.cancel_all_orders("BTCUSDT").await.unwrap();
    }

    #[tokio::test]
    async fn test_contract_spec_with_override() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/fapi/v1/exchangeInfo"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "symbols": [{
                    "symbol": "BTCUSDT",
                    "status": "TRADING",
                    "filters": [
                        {"filterType": "PRICE_FILTER", "tickSize": "0.10"},
                        {"filterType": "LOT_SIZE", "stepSize": "0.001"}
                    ]
                }]
            })))
            .mount(&server)
            .await;

        let config = VenueConfig {
            base_url: server.uri(),
            lot_size: Some(dec!(0.01)),
            ..Default::default()
        };
        let client = BinanceFuturesClient::new("maker", &config, vec![]).unwrap();
        let spec = client.contract_spec("BTCUSDT").await.unwrap();
        assert_eq!(spec.tick_size, dec!(0.10));
        assert_eq!(spec.lot_size, dec!(0.01));

        let missing = client.contract_spec("DOGEUSDT").await.unwrap_err();
        assert!(matches!(missing, VenueError::UnknownContract(_)));
    }
}
