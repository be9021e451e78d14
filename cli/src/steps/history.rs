use super::ScanContext;
use crate::{
    pipeline::{Step, StepFlow},
    services::MarketDataClient,
    utils::{Logger, Timer},
};

/// Download daily candles for every selected symbol
pub struct FetchDailyHistory {
    logger: Logger,
}

impl FetchDailyHistory {
    pub fn new() -> Self {
        Self {
            logger: Logger::new("FETCH_DAILY_HISTORY"),
        }
    }
}

impl Default for FetchDailyHistory {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl Step<ScanContext> for FetchDailyHistory {
    fn name(&self) -> &'static str {
        "FETCH_DAILY_HISTORY"
    }

    async fn run(&mut self, context: &mut ScanContext) -> anyhow::Result<StepFlow> {
        let timer = Timer::start("daily history");
        let client = MarketDataClient::new(&context.settings.yahoo_chart_url)?;
        let symbols: Vec<String> = context.stocks.iter().map(|s| s.symbol.clone()).collect();

        let batch = client
            .daily_history_batch(
                &symbols,
                &context.options.history_range,
                context.options.batch_size,
                context.options.batch_pause,
            )
            .await;

        self.logger.info(&format!(
            "Fetched history for {} of {} symbols in {:.1}s ({} failed)",
            batch.candles.len(),
            symbols.len(),
            timer.elapsed().as_secs_f64(),
            batch.failed.len()
        ));

        context.history = batch.candles;
        context.failed = batch.failed;
        Ok(StepFlow::Continue)
    }
}
