use crate::context::TradingContext;
use anyhow::Context;
use marketscan::{
    config::Settings,
    pipeline::{Step, StepFlow},
    services::{ExchangeClient, TelegramNotifier, TradeDiary},
    utils::Logger,
};

/// Open the trade diary and make sure its table exists
pub struct SetupDatabase {
    logger: Logger,
}

impl SetupDatabase {
    pub fn new() -> Self {
        Self {
            logger: Logger::new("SETUP_DATABASE"),
        }
    }
}

#[async_trait::async_trait]
impl Step<TradingContext> for SetupDatabase {
    fn name(&self) -> &'static str {
        "SETUP_DATABASE"
    }

    async fn run(&mut self, context: &mut TradingContext) -> anyhow::Result<StepFlow> {
        let path = context.config.db_path.clone();
        let diary = TradeDiary::open(&path, &context.config.table_name)
            .await
            .with_context(|| format!("failed to open trade diary {}", path.display()))?;
        self.logger.debug(&format!("Trade diary ready at {}", diary.path().display()));
        context.diary = Some(diary);
        Ok(StepFlow::Continue)
    }
}

/// Load credentials and build the exchange and Telegram clients
pub struct ReadConfiguration {
    logger: Logger,
}

impl ReadConfiguration {
    pub fn new() -> Self {
        Self {
            logger: Logger::new("READ_CONFIGURATION"),
        }
    }
}

#[async_trait::async_trait]
impl Step<TradingContext> for ReadConfiguration {
    fn name(&self) -> &'static str {
        "READ_CONFIGURATION"
    }

    async fn run(&mut self, context: &mut TradingContext) -> anyhow::Result<StepFlow> {
        let settings = Settings::load().context("failed to load configuration")?;

        if context.config.trade && !context.config.dry_run && !settings.has_exchange_credentials() {
            anyhow::bail!("--trade needs BINANCE_API_KEY and BINANCE_API_SECRET (or use --dry-run)");
        }
        if !settings.has_telegram() {
            self.logger.warn("Telegram is not configured; results are only logged");
        }

        self.logger.info(&format!(
            "Exchange {} (credentials: {}), telegram: {}",
            settings.exchange_base_url,
            if settings.has_exchange_credentials() { "yes" } else { "no" },
            if settings.has_telegram() { "yes" } else { "no" }
        ));

        context.exchange = Some(ExchangeClient::new(&settings)?);
        context.notifier = Some(TelegramNotifier::new(&settings)?);
        context.settings = Some(settings);
        Ok(StepFlow::Continue)
    }
}
