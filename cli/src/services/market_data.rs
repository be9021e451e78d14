use crate::{
    error::{AppError, Result},
    log_batch_progress,
    models::{normalize_candles, Candle},
    services::http::{build_client, send_with_retry, RetryPolicy},
    utils::Logger,
};
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::{collections::HashMap, time::Duration};

/// Daily stock candles from the Yahoo chart endpoint
pub struct MarketDataClient {
    client: reqwest::Client,
    base_url: String,
    retry: RetryPolicy,
    logger: Logger,
}

/// Result of a batched history download
#[derive(Debug, Default)]
pub struct BatchHistory {
    pub candles: HashMap<String, Vec<Candle>>,
    pub failed: Vec<String>,
}

impl MarketDataClient {
    pub fn new(base_url: &str) -> Result<Self> {
        Ok(Self {
            client: build_client(Duration::from_secs(30))?,
            base_url: base_url.trim_end_matches('/').to_string(),
            retry: RetryPolicy {
                max_attempts: 3,
                ..RetryPolicy::default()
            },
            logger: Logger::new("MARKET_DATA"),
        })
    }

    /// Daily candles covering `range` (e.g. `1y`, `6mo`)
    pub async fn daily_history(&self, symbol: &str, range: &str) -> Result<Vec<Candle>> {
        let url = format!("{}/{}", self.base_url, to_chart_symbol(symbol));
        let label = format!("{} history", symbol);

        let response = send_with_retry(&self.retry, &label, || {
            self.client
                .get(&url)
                .query(&[("range", range), ("interval", "1d"), ("includePrePost", "false")])
        })
        .await?;

        let body: Value = response.json().await?;
        parse_chart_response(&body)
    }

    /// Fetch many symbols in concurrent batches; failures are collected, not fatal
    pub async fn daily_history_batch(
        &self,
        symbols: &[String],
        range: &str,
        batch_size: usize,
        pause: Duration,
    ) -> BatchHistory {
        let mut result = BatchHistory::default();
        let batch_size = batch_size.max(1);
        let total_batches = symbols.len().div_ceil(batch_size);

        for (batch_idx, batch) in symbols.chunks(batch_size).enumerate() {
            log_batch_progress!(self.logger.context(), batch_idx + 1, total_batches, "symbols");

            let tasks = batch.iter().map(|symbol| async move {
                let outcome = self.daily_history(symbol, range).await;
                (symbol.clone(), outcome)
            });

            for (symbol, outcome) in futures::future::join_all(tasks).await {
                match outcome {
                    Ok(candles) if !candles.is_empty() => {
                        result.candles.insert(symbol, candles);
                    }
                    Ok(_) => {
                        self.logger.warn(&format!("No candles returned for {}", symbol));
                        result.failed.push(symbol);
                    }
                    Err(e) => {
                        self.logger.warn(&format!("Failed to fetch {}: {}", symbol, e));
                        result.failed.push(symbol);
                    }
                }
            }

            if batch_idx + 1 < total_batches && !pause.is_zero() {
                tokio::time::sleep(pause).await;
            }
        }

        result
    }
}

/// Yahoo uses `-` where listings use `.` (BRK.A -> BRK-A)
pub fn to_chart_symbol(symbol: &str) -> String {
    symbol.trim().to_uppercase().replace('.', "-")
}

/// Parse a chart API response into sorted candles; rows with null prices are dropped
pub fn parse_chart_response(body: &Value) -> Result<Vec<Candle>> {
    let chart = body
        .get("chart")
        .ok_or_else(|| AppError::Parse("Missing chart object".to_string()))?;

    if let Some(error) = chart.get("error").filter(|e| !e.is_null()) {
        let description = error
            .get("description")
            .and_then(|d| d.as_str())
            .unwrap_or("unknown error");
        return Err(AppError::NotFound(description.to_string()));
    }

    let result = chart
        .get("result")
        .and_then(|r| r.as_array())
        .and_then(|r| r.first())
        .ok_or_else(|| AppError::NotFound("Empty chart result".to_string()))?;

    let timestamps = match result.get("timestamp").and_then(|t| t.as_array()) {
        Some(timestamps) => timestamps,
        None => return Ok(Vec::new()),
    };

    let quote = result
        .get("indicators")
        .and_then(|i| i.get("quote"))
        .and_then(|q| q.as_array())
        .and_then(|q| q.first())
        .ok_or_else(|| AppError::Parse("Missing quote indicators".to_string()))?;

    let opens = quote_series(quote, "open")?;
    let highs = quote_series(quote, "high")?;
    let lows = quote_series(quote, "low")?;
    let closes = quote_series(quote, "close")?;
    let volumes = quote_series(quote, "volume")?;

    let length = timestamps.len();
    if [opens.len(), highs.len(), lows.len(), closes.len(), volumes.len()]
        .iter()
        .any(|&len| len != length)
    {
        return Err(AppError::Parse("Inconsistent array lengths".to_string()));
    }

    let mut candles = Vec::with_capacity(length);
    for i in 0..length {
        let Some(timestamp) = timestamps[i].as_i64() else {
            continue;
        };
        let Some(open_time) = DateTime::<Utc>::from_timestamp(timestamp, 0) else {
            continue;
        };
        let (Some(open), Some(high), Some(low), Some(close)) = (
            opens[i].as_f64(),
            highs[i].as_f64(),
            lows[i].as_f64(),
            closes[i].as_f64(),
        ) else {
            continue;
        };
        let volume = volumes[i].as_f64().unwrap_or(0.0);
        candles.push(Candle::new(open_time, open, high, low, close, volume));
    }

    Ok(normalize_candles(candles))
}

fn quote_series<'a>(quote: &'a Value, key: &str) -> Result<&'a Vec<Value>> {
    quote
        .get(key)
        .and_then(|v| v.as_array())
        .ok_or_else(|| AppError::Parse(format!("Missing key: {}", key)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_chart_symbol() {
        assert_eq!(to_chart_symbol("brk.a"), "BRK-A");
        assert_eq!(to_chart_symbol("AAPL"), "AAPL");
    }

    #[test]
    fn test_parse_chart_response_skips_nulls() {
        let body = json!({
            "chart": {
                "result": [{
                    "meta": {"symbol": "AAPL"},
                    "timestamp": [1709821800, 1709735400, 1709908200],
                    "indicators": {"quote": [{
                        "open": [170.0, 169.0, null],
                        "high": [172.0, 171.0, null],
                        "low": [168.5, 168.0, null],
                        "close": [171.5, 169.5, null],
                        "volume": [1000, 2000, null]
                    }]}
                }],
                "error": null
            }
        });

        let candles = parse_chart_response(&body).unwrap();
        assert_eq!(candles.len(), 2);
        assert!(candles[0].open_time < candles[1].open_time);
        assert_eq!(candles[0].close, 169.5);
        assert_eq!(candles[1].volume, 1000.0);
    }

    #[test]
    fn test_parse_chart_error() {
        let body = json!({
            "chart": {"result": null, "error": {"code": "Not Found", "description": "No data found, symbol may be delisted"}}
        });
        let err = parse_chart_response(&body).unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[test]
    fn test_parse_chart_inconsistent_lengths() {
        let body = json!({
            "chart": {
                "result": [{
                    "timestamp": [1709821800, 1709735400],
                    "indicators": {"quote": [{
                        "open": [170.0], "high": [172.0, 1.0], "low": [1.0, 1.0],
                        "close": [1.0, 1.0], "volume": [1, 1]
                    }]}
                }],
                "error": null
            }
        });
        assert!(parse_chart_response(&body).is_err());
    }
}
