//! OANDA v20 REST client.
//!
//! Every call goes through [`OandaClient::make_request`]: one attempt, a fixed
//! expected status, and the decoded JSON body handed back either as the success
//! value or inside an [`ApiError`].

use super::models::{
    ACCOUNT_KEY, CANDLES_KEY, INSTRUMENTS_KEY, ORDER_FILL_TRANSACTION_KEY,
    OandaOrderRequestWrapper, TRADE_KEY, TRADES_KEY,
};
use crate::config::OandaConfig;
use crate::domain::errors::{ApiError, ApiResult};
use crate::domain::market::candle::{Candle, CandleFrame, CandleQuery};
use crate::domain::trading::account::AccountSummary;
use crate::domain::trading::instrument::{Instrument, InstrumentCollection};
use crate::domain::trading::trade::OpenTrade;
use crate::domain::trading::types::{OrderSide, signed_units};
use crate::infrastructure::core::http_client_factory::HttpClientFactory;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Method, StatusCode};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, error, info, warn};

/// A single call against the OANDA API, relative to the configured base URL
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub path: String,
    pub method: Method,
    pub expected_status: StatusCode,
    pub params: Vec<(String, String)>,
    pub body: Option<Value>,
    pub headers: HeaderMap,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            method,
            expected_status: StatusCode::OK,
            params: Vec::new(),
            body: None,
            headers: HeaderMap::new(),
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn expect_status(mut self, status: StatusCode) -> Self {
        self.expected_status = status;
        self
    }

    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((key.into(), value.into()));
        self
    }

    pub fn params(mut self, params: Vec<(String, String)>) -> Self {
        self.params.extend(params);
        self
    }

    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }
}

pub struct OandaClient {
    http: Client,
    base_url: String,
    account_id: String,
    instruments: InstrumentCollection,
}

impl OandaClient {
    pub fn new(config: OandaConfig, instruments: InstrumentCollection) -> anyhow::Result<Self> {
        let http = HttpClientFactory::create_client(&config.api_key)?;
        Ok(Self {
            http,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            account_id: config.account_id,
            instruments,
        })
    }

    pub fn account_id(&self) -> &str {
        &self.account_id
    }

    pub fn instruments(&self) -> &InstrumentCollection {
        &self.instruments
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn account_path(&self, ep: &str) -> String {
        format!("accounts/{}/{}", self.account_id, ep)
    }

    /// Performs one HTTP call and checks the status code.
    ///
    /// GET, POST and PUT are supported; POST and PUT carry the JSON body, GET
    /// never does. Any other verb fails without touching the network.
    pub async fn make_request(&self, request: ApiRequest) -> ApiResult<Value> {
        let url = self.url(&request.path);

        let builder = match &request.method {
            &Method::GET => self.http.get(&url),
            &Method::POST => self.http.post(&url),
            &Method::PUT => self.http.put(&url),
            other => {
                warn!("Refusing {} {}: unsupported verb", other, url);
                return Err(ApiError::UnsupportedVerb(other.to_string()));
            }
        };

        let mut builder = builder.query(&request.params).headers(request.headers);
        if request.method != Method::GET
            && let Some(body) = &request.body
        {
            builder = builder.json(body);
        }

        debug!("{} {} params={:?}", request.method, url, request.params);

        let response = builder.send().await.map_err(|e| {
            error!("{} {} failed: {}", request.method, url, e);
            ApiError::from(e)
        })?;

        let status = response.status();
        let body: Value = response.json().await.map_err(|e| {
            error!("Failed to decode response from {} ({}): {}", url, status, e);
            ApiError::from(e)
        })?;

        if status != request.expected_status {
            warn!(
                "{} {} returned {} (expected {}): {}",
                request.method, url, status, request.expected_status, body
            );
            return Err(ApiError::UnexpectedStatus { status, body });
        }

        Ok(body)
    }

    /// Fetches `accounts/{account}/{ep}` and returns the value under `key`.
    pub async fn get_account_ep(&self, ep: &str, key: &str) -> ApiResult<Value> {
        let response = self
            .make_request(ApiRequest::get(self.account_path(ep)))
            .await
            .inspect_err(|e| error!("get_account_ep({}) failed: {}", ep, e))?;

        take_key(response, key).inspect_err(|e| error!("get_account_ep({}): {}", ep, e))
    }

    pub async fn get_account_summary(&self) -> ApiResult<AccountSummary> {
        let account = self.get_account_ep("summary", ACCOUNT_KEY).await?;
        decode(account, "account summary")
    }

    pub async fn get_account_instruments(&self) -> ApiResult<Vec<Instrument>> {
        let instruments = self.get_account_ep("instruments", INSTRUMENTS_KEY).await?;
        decode(instruments, "account instruments")
    }

    /// Raw candles for `pair`, including the incomplete trailing one.
    pub async fn fetch_candles(&self, pair: &str, query: &CandleQuery) -> ApiResult<Vec<Candle>> {
        let params = query.to_params();
        let request = ApiRequest::get(format!("instruments/{}/candles", pair)).params(params);

        let candles = match self.make_request(request).await {
            Ok(response) => take_key(response, CANDLES_KEY),
            Err(e) => Err(e),
        }
        .inspect_err(|e| error!("fetch_candles({}, {:?}) failed: {}", pair, query, e))?;

        // Decoded one by one; undecodable entries are dropped.
        let raw: Vec<Value> = decode(candles, "candles")?;
        let candles = raw
            .into_iter()
            .filter_map(|value| match serde_json::from_value::<Candle>(value) {
                Ok(candle) => Some(candle),
                Err(e) => {
                    warn!("Skipping undecodable candle for {}: {}", pair, e);
                    None
                }
            })
            .collect();
        Ok(candles)
    }

    /// Complete candles for `pair` as a table. Fetch failures yield an empty frame.
    pub async fn get_candles_df(&self, pair: &str, query: &CandleQuery) -> CandleFrame {
        match self.fetch_candles(pair, query).await {
            Ok(candles) => CandleFrame::from_candles(&candles),
            Err(_) => CandleFrame::new(),
        }
    }

    /// Places a market order and returns the fill transaction id.
    ///
    /// `units` is rounded to the instrument's `tradeUnitsPrecision`; the sign
    /// of `direction` picks the side. Unknown instruments and a zero direction
    /// fail before any request is sent.
    pub async fn place_trade(
        &self,
        pair: &str,
        units: Decimal,
        direction: i64,
        stop_loss: Option<Decimal>,
        take_profit: Option<Decimal>,
    ) -> ApiResult<String> {
        let Some(precision) = self.instruments.precision(pair) else {
            warn!("Instrument not found: {}", pair);
            return Err(ApiError::UnknownInstrument(pair.to_string()));
        };
        let side = OrderSide::from_direction(direction)
            .inspect_err(|_| warn!("Refusing {} order with direction {}", pair, direction))?;

        let units = signed_units(units, side, precision);
        let order = OandaOrderRequestWrapper::market(pair, units, stop_loss, take_profit);
        let body = serde_json::to_value(&order).map_err(|e| ApiError::decode("order request", e))?;

        info!("Placing {} order: {}", side, body);
        let request = ApiRequest::post(self.account_path("orders"))
            .json(body)
            .expect_status(StatusCode::CREATED);

        let response = self
            .make_request(request)
            .await
            .inspect_err(|e| error!("Order failed: {}", e.payload()))?;

        let fill_id = response
            .get(ORDER_FILL_TRANSACTION_KEY)
            .and_then(|fill| fill.get("id"))
            .and_then(|id| match id {
                Value::String(s) => Some(s.clone()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            });

        match fill_id {
            Some(id) => {
                info!("Order placed successfully: {} {} {} (fill {})", side, units, pair, id);
                Ok(id)
            }
            None => {
                error!("Order failed: {}", response);
                Err(ApiError::missing_field(ORDER_FILL_TRANSACTION_KEY, response))
            }
        }
    }

    /// Closes a trade in full. Blank or missing ids are rejected locally.
    pub async fn close_trade<'a>(&self, trade_id: impl Into<Option<&'a str>>) -> ApiResult<Value> {
        let Some(trade_id) = trade_id.into().map(str::trim).filter(|id| !id.is_empty()) else {
            warn!("Invalid trade ID provided. Cannot close trade.");
            return Err(ApiError::InvalidTradeId);
        };

        let request = ApiRequest::put(self.account_path(&format!("trades/{}/close", trade_id)));
        match self.make_request(request).await {
            Ok(response) => {
                info!("Trade {} closed successfully", trade_id);
                Ok(response)
            }
            Err(e) => {
                error!("Error closing trade {}: {}", trade_id, e.payload());
                Err(e)
            }
        }
    }

    /// Looks up one trade. `Ok(None)` when the broker answers without a `trade`.
    pub async fn get_open_trades(&self, trade_id: &str) -> ApiResult<Option<OpenTrade>> {
        let response = self
            .make_request(ApiRequest::get(
                self.account_path(&format!("trades/{}", trade_id)),
            ))
            .await?;

        match take_key(response, TRADE_KEY) {
            Ok(trade) => decode(trade, "trade").map(Some),
            Err(_) => Ok(None),
        }
    }

    pub async fn list_open_trades(&self) -> ApiResult<Vec<OpenTrade>> {
        let response = self
            .make_request(ApiRequest::get(self.account_path("openTrades")))
            .await?;
        let trades = take_key(response, TRADES_KEY)?;
        decode(trades, "open trades")
    }
}

fn take_key(mut payload: Value, key: &str) -> ApiResult<Value> {
    match payload.as_object_mut().and_then(|object| object.remove(key)) {
        Some(value) => Ok(value),
        None => Err(ApiError::missing_field(key, payload)),
    }
}

fn decode<T: DeserializeOwned>(value: Value, context: &str) -> ApiResult<T> {
    serde_json::from_value(value).map_err(|e| {
        error!("Failed to decode {}: {}", context, e);
        ApiError::decode(context, e)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn offline_client() -> OandaClient {
        // Port 9 (discard) is never served; any real request fails with a transport error.
        let config = OandaConfig::new("http://127.0.0.1:9/v3/", "token", "101-004-1");
        OandaClient::new(config, InstrumentCollection::new()).unwrap()
    }

    #[test]
    fn test_url_joins_base_and_path() {
        let client = offline_client();
        assert_eq!(
            client.url("accounts/101-004-1/summary"),
            "http://127.0.0.1:9/v3/accounts/101-004-1/summary"
        );
        assert_eq!(client.account_path("orders"), "accounts/101-004-1/orders");
    }

    #[test]
    fn test_request_builder_defaults() {
        let request = ApiRequest::post("accounts/1/orders")
            .query("a", "b")
            .json(json!({ "x": 1 }));
        assert_eq!(request.expected_status, StatusCode::OK);
        assert_eq!(request.method, Method::POST);
        assert_eq!(request.params, vec![("a".to_string(), "b".to_string())]);
        assert!(request.body.is_some());
    }

    #[test]
    fn test_take_key() {
        assert_eq!(
            take_key(json!({ "account": { "id": "1" } }), "account").unwrap(),
            json!({ "id": "1" })
        );

        let err = take_key(json!({ "other": 1 }), "account").unwrap_err();
        assert_eq!(err.payload(), json!({ "other": 1 }));
    }

    #[tokio::test]
    async fn test_unsupported_verb_never_sends() {
        let client = offline_client();
        let err = client
            .make_request(ApiRequest::new(Method::DELETE, "accounts/101-004-1/orders/1"))
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::UnsupportedVerb(ref v) if v == "DELETE"));
        assert_eq!(
            err.payload(),
            json!({ "error": "Unsupported HTTP verb: DELETE" })
        );
    }

    #[tokio::test]
    async fn test_transport_failure_is_soft() {
        let client = offline_client();
        let err = client
            .make_request(ApiRequest::get("accounts/101-004-1/summary"))
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::Transport(_)));
        assert!(err.payload().get("Exception").is_some());
    }

    #[tokio::test]
    async fn test_candles_df_is_empty_on_transport_failure() {
        let client = offline_client();
        let frame = client.get_candles_df("EUR_USD", &CandleQuery::new()).await;
        assert!(frame.is_empty());
    }
}
