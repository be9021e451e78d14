use crate::context::TradingContext;
use chrono::{DateTime, Utc};
use marketscan::{
    analysis::resample,
    models::{normalize_candles, Candle, Timeframe},
    pipeline::{Step, StepFlow},
    services::{exchange::MAX_KLINES, RawKline},
    utils::Logger,
};

/// Pull the latest klines for the market
pub struct FetchDataFromExchange {
    logger: Logger,
}

impl FetchDataFromExchange {
    pub fn new() -> Self {
        Self {
            logger: Logger::new("FETCH_DATA_FROM_EXCHANGE"),
        }
    }
}

#[async_trait::async_trait]
impl Step<TradingContext> for FetchDataFromExchange {
    fn name(&self) -> &'static str {
        "FETCH_DATA_FROM_EXCHANGE"
    }

    async fn run(&mut self, context: &mut TradingContext) -> anyhow::Result<StepFlow> {
        let symbol = context.config.market_symbol();
        let klines = context
            .exchange()?
            .klines(&symbol, context.config.time_frame, MAX_KLINES)
            .await?;

        self.logger.info(&format!(
            "Fetched {} {} klines for {}",
            klines.len(),
            context.config.time_frame,
            symbol
        ));
        context.raw_klines = klines;
        Ok(StepFlow::Continue)
    }
}

/// Closed candles only, sorted by open time
pub fn closed_candles(klines: &[RawKline], now: DateTime<Utc>) -> anyhow::Result<Vec<Candle>> {
    let mut candles = Vec::with_capacity(klines.len());
    for kline in klines.iter().filter(|k| k.is_closed_at(now)) {
        candles.push(kline.to_candle()?);
    }
    Ok(normalize_candles(candles))
}

/// Convert raw klines into candles
pub struct LoadCandles {
    logger: Logger,
}

impl LoadCandles {
    pub fn new() -> Self {
        Self {
            logger: Logger::new("LOAD_CANDLES"),
        }
    }
}

#[async_trait::async_trait]
impl Step<TradingContext> for LoadCandles {
    fn name(&self) -> &'static str {
        "LOAD_CANDLES"
    }

    async fn run(&mut self, context: &mut TradingContext) -> anyhow::Result<StepFlow> {
        context.candles = closed_candles(&context.raw_klines, Utc::now())?;
        if context.candles.is_empty() {
            anyhow::bail!("exchange returned no closed candles");
        }
        self.logger.debug(&format!(
            "{} closed candles ({} raw)",
            context.candles.len(),
            context.raw_klines.len()
        ));
        Ok(StepFlow::Continue)
    }
}

/// Build the 15m and 1h series
pub struct ReSampleData {
    logger: Logger,
}

impl ReSampleData {
    pub fn new() -> Self {
        Self {
            logger: Logger::new("RESAMPLE_DATA"),
        }
    }
}

#[async_trait::async_trait]
impl Step<TradingContext> for ReSampleData {
    fn name(&self) -> &'static str {
        "RESAMPLE_DATA"
    }

    async fn run(&mut self, context: &mut TradingContext) -> anyhow::Result<StepFlow> {
        context.candles_15m = resample(&context.candles, Timeframe::Minutes15);
        context.candles_60m = resample(&context.candles, Timeframe::Hour1);
        self.logger.info(&format!(
            "{} candles -> {} x 15m, {} x 1h",
            context.candles.len(),
            context.candles_15m.len(),
            context.candles_60m.len()
        ));
        Ok(StepFlow::Continue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::test_support;
    use chrono::{Duration, TimeZone};

    fn kline(open_time: DateTime<Utc>, close: f64) -> RawKline {
        let close_time = open_time + Duration::minutes(5) - Duration::milliseconds(1);
        RawKline(
            open_time.timestamp_millis(),
            "100.0".to_string(),
            format!("{}", close + 1.0),
            "99.0".to_string(),
            close.to_string(),
            "2.5".to_string(),
            close_time.timestamp_millis(),
            "0".to_string(),
            10,
            "0".to_string(),
            "0".to_string(),
            "0".to_string(),
        )
    }

    #[test]
    fn test_closed_candles_drop_open_candle() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let klines = vec![
            kline(start + Duration::minutes(5), 101.0),
            kline(start, 100.5),
            kline(start + Duration::minutes(10), 102.0),
        ];
        let now = start + Duration::minutes(12);
        let candles = closed_candles(&klines, now).unwrap();
        assert_eq!(candles.len(), 2);
        assert_eq!(candles[0].open_time, start);
        assert_eq!(candles[1].close, 101.0);
    }

    #[tokio::test]
    async fn test_resample_step() {
        let dir = tempfile::tempdir().unwrap();
        let mut context = test_support::context(dir.path());
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        context.raw_klines = (0..24).map(|i| kline(start + Duration::minutes(5 * i), 100.0 + i as f64)).collect();

        LoadCandles::new().run(&mut context).await.unwrap();
        assert_eq!(context.candles.len(), 24);
        ReSampleData::new().run(&mut context).await.unwrap();

        assert_eq!(context.candles_15m.len(), 8);
        assert_eq!(context.candles_60m.len(), 2);
        let first_hour = &context.candles_60m[0];
        assert_eq!(first_hour.close, 111.0);
        assert_eq!(first_hour.volume, 30.0);
    }

    #[tokio::test]
    async fn test_load_candles_fails_without_data() {
        let dir = tempfile::tempdir().unwrap();
        let mut context = test_support::context(dir.path());
        assert!(LoadCandles::new().run(&mut context).await.is_err());
    }
}
