use crate::context::TradingContext;
use anyhow::Context;
use marketscan::{
    analysis::{calculate_strat, identify_signal},
    models::Indicators,
    pipeline::{Step, StepFlow},
    services::{strat_chart_path, write_chart, ChartPanel},
    utils::Logger,
};

const CHART_CANDLES_15M: usize = 80;
const CHART_CANDLES_60M: usize = 20;

/// Last close and strat readings on both resampled series
pub struct CalculateIndicators {
    logger: Logger,
}

impl CalculateIndicators {
    pub fn new() -> Self {
        Self {
            logger: Logger::new("CALCULATE_INDICATORS"),
        }
    }
}

#[async_trait::async_trait]
impl Step<TradingContext> for CalculateIndicators {
    fn name(&self) -> &'static str {
        "CALCULATE_INDICATORS"
    }

    async fn run(&mut self, context: &mut TradingContext) -> anyhow::Result<StepFlow> {
        let last = context
            .candles
            .last()
            .context("no candles loaded; LOAD_CANDLES must run first")?;
        context.close_price = Some(last.close);

        let (strat_15m, direction_15m) = calculate_strat(&context.candles_15m);
        let (strat_60m, direction_60m) = calculate_strat(&context.candles_60m);
        let indicators = Indicators {
            strat_15m,
            strat_candle_15m_direction: direction_15m,
            strat_60m,
            strat_candle_60m_direction: direction_60m,
        };

        self.logger.info(&format!(
            "{} close {} | 15m {} {} | 60m {} {}",
            context.config.market_symbol(),
            last.close,
            indicators.strat_15m,
            indicators.strat_candle_15m_direction.as_str(),
            indicators.strat_60m,
            indicators.strat_candle_60m_direction.as_str()
        ));
        context.indicators = Some(indicators);
        Ok(StepFlow::Continue)
    }
}

/// Render the two-panel strat chart
pub struct GenerateChart {
    logger: Logger,
}

impl GenerateChart {
    pub fn new() -> Self {
        Self {
            logger: Logger::new("GENERATE_CHART"),
        }
    }
}

#[async_trait::async_trait]
impl Step<TradingContext> for GenerateChart {
    fn name(&self) -> &'static str {
        "GENERATE_CHART"
    }

    async fn run(&mut self, context: &mut TradingContext) -> anyhow::Result<StepFlow> {
        let indicators = context
            .indicators
            .context("indicators missing; CALCULATE_INDICATORS must run first")?;
        let config = &context.config;

        let title = format!("{}/{} strat", config.coin, config.stable_coin);
        let panels = [
            ChartPanel::tail(
                format!("{}{} 15m", config.coin, config.stable_coin),
                &context.candles_15m,
                CHART_CANDLES_15M,
                indicators.strat_15m,
            ),
            ChartPanel::tail(
                format!("{}{} 60m", config.coin, config.stable_coin),
                &context.candles_60m,
                CHART_CANDLES_60M,
                indicators.strat_60m,
            ),
        ];

        let path = strat_chart_path(&config.output_dir, &config.coin, &config.stable_coin);
        write_chart(&path, &title, &panels)
            .with_context(|| format!("failed to write chart {}", path.display()))?;
        self.logger.info(&format!("Chart saved to {}", path.display()));
        context.chart_path = Some(path);
        Ok(StepFlow::Continue)
    }
}

/// Turn the 15m reading into a BUY / SELL / NO_SIGNAL decision
pub struct IdentifyBuySellSignal {
    logger: Logger,
}

impl IdentifyBuySellSignal {
    pub fn new() -> Self {
        Self {
            logger: Logger::new("IDENTIFY_BUY_SELL_SIGNAL"),
        }
    }
}

#[async_trait::async_trait]
impl Step<TradingContext> for IdentifyBuySellSignal {
    fn name(&self) -> &'static str {
        "IDENTIFY_BUY_SELL_SIGNAL"
    }

    async fn run(&mut self, context: &mut TradingContext) -> anyhow::Result<StepFlow> {
        let indicators = context
            .indicators
            .as_ref()
            .context("indicators missing; CALCULATE_INDICATORS must run first")?;

        let signal = identify_signal(indicators);
        context.signal = signal;
        context.trade_done = signal.is_actionable();

        self.logger.info(&format!(
            "Signal for {}: {}",
            context.config.market_symbol(),
            signal
        ));
        Ok(StepFlow::Continue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::test_support;
    use chrono::{Duration, TimeZone, Utc};
    use marketscan::models::{Candle, CandleDirection, TradeSignal};

    /// 15m candles: outside bar, two lower bars, last one green
    fn reversal_candles() -> Vec<Candle> {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        [
            (10.0, 11.0, 9.0, 10.0),
            (10.0, 12.0, 8.0, 9.0),
            (9.0, 11.0, 7.0, 7.5),
            (7.0, 10.0, 6.0, 9.5),
        ]
        .iter()
        .enumerate()
        .map(|(i, &(o, h, l, c))| Candle::new(start + Duration::minutes(15 * i as i64), o, h, l, c, 1.0))
        .collect()
    }

    #[tokio::test]
    async fn test_indicators_and_buy_signal() {
        let dir = tempfile::tempdir().unwrap();
        let mut context = test_support::context(dir.path());
        context.candles = reversal_candles();
        context.candles_15m = reversal_candles();
        context.candles_60m = vec![reversal_candles()[0].clone()];

        CalculateIndicators::new().run(&mut context).await.unwrap();
        let indicators = context.indicators.unwrap();
        assert_eq!(context.close_price, Some(9.5));
        assert_eq!(indicators.strat_15m.to_string(), "3-2d-2d");
        assert_eq!(indicators.strat_candle_15m_direction, CandleDirection::Green);
        assert_eq!(indicators.strat_60m.to_string(), "na");

        IdentifyBuySellSignal::new().run(&mut context).await.unwrap();
        assert_eq!(context.signal, TradeSignal::Buy);
        assert!(context.trade_done);
    }

    #[tokio::test]
    async fn test_generate_chart_writes_svg() {
        let dir = tempfile::tempdir().unwrap();
        let mut context = test_support::context(dir.path());
        context.candles = reversal_candles();
        context.candles_15m = reversal_candles();
        context.candles_60m = reversal_candles();

        assert!(GenerateChart::new().run(&mut context).await.is_err());
        CalculateIndicators::new().run(&mut context).await.unwrap();
        GenerateChart::new().run(&mut context).await.unwrap();

        let path = context.chart_path.unwrap();
        assert!(path.ends_with("output/_btc_usdt_15m-strat.svg"));
        assert!(std::fs::read_to_string(path).unwrap().contains("BTCUSDT 15m"));
    }
}
