use crate::context::TradingContext;
use anyhow::Context;
use marketscan::{
    models::Indicators,
    pipeline::{Step, StepFlow},
    utils::Logger,
};

/// Caption sent along with the chart
pub fn chart_caption(market: &str, signal: &str, close: f64, indicators: &Indicators) -> String {
    format!(
        "{} {} @ {}\n15m: {} ({})\n60m: {} ({})",
        market,
        signal,
        close,
        indicators.strat_15m,
        indicators.strat_candle_15m_direction.as_str(),
        indicators.strat_60m,
        indicators.strat_candle_60m_direction.as_str()
    )
}

/// Announce the recorded trade
pub struct PublishTransactionOnTelegram {
    logger: Logger,
}

impl PublishTransactionOnTelegram {
    pub fn new() -> Self {
        Self {
            logger: Logger::new("PUBLISH_TRANSACTION"),
        }
    }
}

#[async_trait::async_trait]
impl Step<TradingContext> for PublishTransactionOnTelegram {
    fn name(&self) -> &'static str {
        "PUBLISH_TRANSACTION_ON_TELEGRAM"
    }

    async fn run(&mut self, context: &mut TradingContext) -> anyhow::Result<StepFlow> {
        let transaction = context
            .transaction
            .as_ref()
            .context("no transaction recorded; RECORD_TRANSACTION must run first")?;

        let sent = context.notifier()?.send_message(&transaction.summary()).await?;
        if sent {
            self.logger.info("Transaction published");
        }
        Ok(StepFlow::Continue)
    }
}

/// Send the chart when this run produced a signal
pub struct PublishStrategyChartOnTelegram {
    logger: Logger,
}

impl PublishStrategyChartOnTelegram {
    pub fn new() -> Self {
        Self {
            logger: Logger::new("PUBLISH_STRATEGY_CHART"),
        }
    }
}

#[async_trait::async_trait]
impl Step<TradingContext> for PublishStrategyChartOnTelegram {
    fn name(&self) -> &'static str {
        "PUBLISH_STRATEGY_CHART_ON_TELEGRAM"
    }

    async fn run(&mut self, context: &mut TradingContext) -> anyhow::Result<StepFlow> {
        if !context.trade_done {
            self.logger.debug("No signal, chart not published");
            return Ok(StepFlow::Continue);
        }

        let path = context
            .chart_path
            .as_ref()
            .context("chart missing; GENERATE_CHART must run first")?;
        let indicators = context
            .indicators
            .as_ref()
            .context("indicators missing; CALCULATE_INDICATORS must run first")?;

        let caption = chart_caption(
            &context.config.market_symbol(),
            context.signal.as_str(),
            context.close_price()?,
            indicators,
        );
        let sent = context.notifier()?.send_document(path, Some(&caption)).await?;
        if sent {
            self.logger.info(&format!("Chart {} published", path.display()));
        }
        Ok(StepFlow::Continue)
    }
}
