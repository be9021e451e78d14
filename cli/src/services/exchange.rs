use crate::{
    analysis::SymbolRules,
    config::Settings,
    error::{AppError, Result},
    models::{AccountBalances, Candle, Timeframe, TradeSignal},
    services::http::{build_client, send_with_retry, RateLimiter, RetryPolicy},
    utils::Logger,
};
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use serde::Deserialize;
use serde_json::Value;
use sha2::Sha256;
use std::time::Duration;
use tokio::sync::Mutex;

type HmacSha256 = Hmac<Sha256>;

const RECV_WINDOW_MS: u64 = 5000;
pub const MAX_KLINES: u32 = 1000;

/// Kline row as returned by `/api/v3/klines`
#[derive(Debug, Clone, Deserialize)]
pub struct RawKline(
    pub i64,    // open time (ms)
    pub String, // open
    pub String, // high
    pub String, // low
    pub String, // close
    pub String, // volume
    pub i64,    // close time (ms)
    pub String, // quote asset volume
    pub u64,    // number of trades
    pub String, // taker buy base volume
    pub String, // taker buy quote volume
    pub String, // ignore
);

impl RawKline {
    pub fn close_time_ms(&self) -> i64 {
        self.6
    }

    /// Whether the candle had closed at `now`
    pub fn is_closed_at(&self, now: DateTime<Utc>) -> bool {
        self.close_time_ms() < now.timestamp_millis()
    }

    pub fn to_candle(&self) -> Result<Candle> {
        let open_time = DateTime::<Utc>::from_timestamp_millis(self.0)
            .ok_or_else(|| AppError::Parse(format!("Invalid kline open time {}", self.0)))?;
        Ok(Candle::new(
            open_time,
            parse_decimal(&self.1, "open")?,
            parse_decimal(&self.2, "high")?,
            parse_decimal(&self.3, "low")?,
            parse_decimal(&self.4, "close")?,
            parse_decimal(&self.5, "volume")?,
        ))
    }
}

/// Acknowledgement of a placed order
#[derive(Debug, Clone, PartialEq)]
pub struct OrderAck {
    pub order_id: String,
    pub executed_qty: f64,
    pub quote_qty: f64,
}

/// Binance-compatible spot REST client
pub struct ExchangeClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    api_secret: Option<String>,
    rate_limiter: Mutex<RateLimiter>,
    retry: RetryPolicy,
    logger: Logger,
}

impl ExchangeClient {
    pub fn new(settings: &Settings) -> Result<Self> {
        Ok(Self {
            client: build_client(Duration::from_secs(30))?,
            base_url: settings.exchange_base_url.trim_end_matches('/').to_string(),
            api_key: settings.exchange_api_key.clone(),
            api_secret: settings.exchange_api_secret.clone(),
            rate_limiter: Mutex::new(RateLimiter::new(settings.exchange_rate_limit_per_minute)),
            retry: RetryPolicy::default(),
            logger: Logger::new("EXCHANGE"),
        })
    }

    /// Latest klines for `symbol`, oldest first
    pub async fn klines(&self, symbol: &str, timeframe: Timeframe, limit: u32) -> Result<Vec<RawKline>> {
        self.rate_limiter.lock().await.acquire().await;

        let url = format!("{}/api/v3/klines", self.base_url);
        let limit = limit.clamp(1, MAX_KLINES).to_string();
        let response = send_with_retry(&self.retry, "klines", || {
            self.client.get(&url).query(&[
                ("symbol", symbol),
                ("interval", timeframe.as_str()),
                ("limit", limit.as_str()),
            ])
        })
        .await?;

        let klines: Vec<RawKline> = response.json().await?;
        self.logger.debug(&format!("Fetched {} {} klines for {}", klines.len(), timeframe, symbol));
        Ok(klines)
    }

    /// Lot size and notional filters for `symbol`
    pub async fn symbol_rules(&self, symbol: &str) -> Result<SymbolRules> {
        self.rate_limiter.lock().await.acquire().await;

        let url = format!("{}/api/v3/exchangeInfo", self.base_url);
        let response = send_with_retry(&self.retry, "exchangeInfo", || {
            self.client.get(&url).query(&[("symbol", symbol)])
        })
        .await?;
        let body: Value = response.json().await?;
        parse_symbol_rules(&body, symbol)
    }

    /// Free balances of `coin` and `stable_coin`
    pub async fn account_balances(&self, coin: &str, stable_coin: &str) -> Result<AccountBalances> {
        let body = self.signed_get("/api/v3/account", &[]).await?;
        parse_balances(&body, coin, stable_coin)
    }

    /// Place a market order. Orders are never retried.
    pub async fn market_order(&self, symbol: &str, signal: TradeSignal, quantity: f64) -> Result<OrderAck> {
        let side = match signal {
            TradeSignal::Buy => "BUY",
            TradeSignal::Sell => "SELL",
            TradeSignal::NoSignal => {
                return Err(AppError::InvalidInput("Cannot place an order without a signal".to_string()))
            }
        };
        let (api_key, secret) = self.credentials()?;
        self.rate_limiter.lock().await.acquire().await;

        let client_order_id = format!("strat-{}", uuid::Uuid::new_v4().simple());
        let params = vec![
            ("symbol".to_string(), symbol.to_string()),
            ("side".to_string(), side.to_string()),
            ("type".to_string(), "MARKET".to_string()),
            ("quantity".to_string(), format_quantity(quantity)),
            ("newClientOrderId".to_string(), client_order_id),
            ("newOrderRespType".to_string(), "RESULT".to_string()),
        ];
        let query = signed_query(&params, secret, Utc::now().timestamp_millis())?;
        let url = format!("{}/api/v3/order?{}", self.base_url, query);

        self.logger.info(&format!("Placing {} market order: {} {}", side, format_quantity(quantity), symbol));
        let response = self
            .client
            .post(&url)
            .header("X-MBX-APIKEY", api_key)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(AppError::Exchange(format!("Order rejected ({}): {}", status, text)));
        }
        let body: Value = serde_json::from_str(&text)?;
        parse_order_ack(&body)
    }

    async fn signed_get(&self, path: &str, params: &[(String, String)]) -> Result<Value> {
        let (api_key, secret) = self.credentials()?;
        self.rate_limiter.lock().await.acquire().await;

        let base = format!("{}{}", self.base_url, path);
        let response = send_with_retry(&self.retry, path, || {
            // Timestamp must be fresh on every attempt
            let query = signed_query(params, secret, Utc::now().timestamp_millis()).unwrap_or_default();
            self.client
                .get(format!("{}?{}", base, query))
                .header("X-MBX-APIKEY", api_key)
        })
        .await?;
        Ok(response.json().await?)
    }

    fn credentials(&self) -> Result<(&str, &str)> {
        match (&self.api_key, &self.api_secret) {
            (Some(key), Some(secret)) => Ok((key.as_str(), secret.as_str())),
            _ => Err(AppError::Config(
                "BINANCE_API_KEY and BINANCE_API_SECRET must be set for account access".to_string(),
            )),
        }
    }
}

/// HMAC-SHA256 of `payload`, hex encoded
pub fn sign(payload: &str, secret: &str) -> Result<String> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| AppError::Config(format!("Invalid API secret: {}", e)))?;
    mac.update(payload.as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Query string with recvWindow, timestamp and signature appended
pub fn signed_query(params: &[(String, String)], secret: &str, timestamp_ms: i64) -> Result<String> {
    let mut pairs: Vec<String> = params.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
    pairs.push(format!("recvWindow={}", RECV_WINDOW_MS));
    pairs.push(format!("timestamp={}", timestamp_ms));
    let query = pairs.join("&");
    let signature = sign(&query, secret)?;
    Ok(format!("{}&signature={}", query, signature))
}

fn format_quantity(quantity: f64) -> String {
    let formatted = format!("{:.8}", quantity);
    formatted.trim_end_matches('0').trim_end_matches('.').to_string()
}

fn parse_decimal(value: &str, field: &str) -> Result<f64> {
    value
        .parse::<f64>()
        .map_err(|_| AppError::Parse(format!("Invalid {} value '{}'", field, value)))
}

fn value_as_f64(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::String(s) => s.parse().ok(),
        other => other.as_f64(),
    }
}

pub fn parse_symbol_rules(body: &Value, symbol: &str) -> Result<SymbolRules> {
    let symbol_info = body
        .get("symbols")
        .and_then(|s| s.as_array())
        .and_then(|symbols| {
            symbols
                .iter()
                .find(|s| s.get("symbol").and_then(|v| v.as_str()) == Some(symbol))
        })
        .ok_or_else(|| AppError::NotFound(format!("Symbol {} not listed", symbol)))?;

    let mut rules = SymbolRules::default();
    let filters = symbol_info
        .get("filters")
        .and_then(|f| f.as_array())
        .cloned()
        .unwrap_or_default();

    for filter in &filters {
        match filter.get("filterType").and_then(|t| t.as_str()) {
            Some("LOT_SIZE") => {
                if let Some(step) = value_as_f64(filter.get("stepSize")) {
                    rules.step_size = step;
                }
                if let Some(min_qty) = value_as_f64(filter.get("minQty")) {
                    rules.min_qty = min_qty;
                }
            }
            Some("NOTIONAL") | Some("MIN_NOTIONAL") => {
                if let Some(min_notional) = value_as_f64(filter.get("minNotional")) {
                    rules.min_notional = min_notional;
                }
            }
            _ => {}
        }
    }

    Ok(rules)
}

pub fn parse_balances(body: &Value, coin: &str, stable_coin: &str) -> Result<AccountBalances> {
    let balances = body
        .get("balances")
        .and_then(|b| b.as_array())
        .ok_or_else(|| AppError::Parse("Account response without balances".to_string()))?;

    let free_of = |asset: &str| -> f64 {
        balances
            .iter()
            .find(|b| b.get("asset").and_then(|a| a.as_str()) == Some(asset))
            .and_then(|b| value_as_f64(b.get("free")))
            .unwrap_or(0.0)
    };

    Ok(AccountBalances {
        coin_free: free_of(coin),
        stable_free: free_of(stable_coin),
    })
}

pub fn parse_order_ack(body: &Value) -> Result<OrderAck> {
    let order_id = match body.get("orderId") {
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::String(s)) => s.clone(),
        _ => return Err(AppError::Parse("Order response without orderId".to_string())),
    };
    Ok(OrderAck {
        order_id,
        executed_qty: value_as_f64(body.get("executedQty")).unwrap_or(0.0),
        quote_qty: value_as_f64(body.get("cummulativeQuoteQty")).unwrap_or(0.0),
    })
}
