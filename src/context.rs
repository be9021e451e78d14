use crate::config::BotConfig;
use marketscan::{
    analysis::SymbolRules,
    config::Settings,
    models::{AccountBalances, Candle, Indicators, TradeAmount, TradeSignal, Transaction},
    services::{ExchangeClient, OrderAck, RawKline, TelegramNotifier, TradeDiary},
};
use std::path::PathBuf;

/// State shared by the bot steps during one run
pub struct TradingContext {
    pub config: BotConfig,
    pub settings: Option<Settings>,
    pub diary: Option<TradeDiary>,
    pub exchange: Option<ExchangeClient>,
    pub notifier: Option<TelegramNotifier>,

    pub raw_klines: Vec<RawKline>,
    pub candles: Vec<Candle>,
    pub candles_15m: Vec<Candle>,
    pub candles_60m: Vec<Candle>,
    pub close_price: Option<f64>,
    pub indicators: Option<Indicators>,
    pub chart_path: Option<PathBuf>,
    pub signal: TradeSignal,
    pub trade_done: bool,

    pub last_transaction: Option<Transaction>,
    pub symbol_rules: Option<SymbolRules>,
    pub balances: Option<AccountBalances>,
    pub trade_amount: Option<TradeAmount>,
    pub order: Option<OrderAck>,
    pub transaction: Option<Transaction>,
}

impl TradingContext {
    pub fn new(config: BotConfig) -> Self {
        Self {
            config,
            settings: None,
            diary: None,
            exchange: None,
            notifier: None,
            raw_klines: Vec::new(),
            candles: Vec::new(),
            candles_15m: Vec::new(),
            candles_60m: Vec::new(),
            close_price: None,
            indicators: None,
            chart_path: None,
            signal: TradeSignal::NoSignal,
            trade_done: false,
            last_transaction: None,
            symbol_rules: None,
            balances: None,
            trade_amount: None,
            order: None,
            transaction: None,
        }
    }

    pub fn diary(&self) -> anyhow::Result<&TradeDiary> {
        self.diary
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("trade diary not open; SETUP_DATABASE must run first"))
    }

    pub fn exchange(&self) -> anyhow::Result<&ExchangeClient> {
        self.exchange
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("exchange client missing; READ_CONFIGURATION must run first"))
    }

    pub fn notifier(&self) -> anyhow::Result<&TelegramNotifier> {
        self.notifier
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("notifier missing; READ_CONFIGURATION must run first"))
    }

    pub fn close_price(&self) -> anyhow::Result<f64> {
        self.close_price
            .ok_or_else(|| anyhow::anyhow!("close price unknown; CALCULATE_INDICATORS must run first"))
    }
}

#[cfg(test)]
pub mod test_support {
    use super::*;
    use marketscan::models::Timeframe;
    use std::path::Path;
    use std::time::Duration;

    pub fn config(dir: &Path) -> BotConfig {
        BotConfig {
            coin: "BTC".to_string(),
            stable_coin: "USDT".to_string(),
            time_frame: Timeframe::Minutes5,
            db_path: dir.join("diary.db"),
            table_name: "trades".to_string(),
            buying_budget: 50.0,
            wait: Duration::from_secs(300),
            run_once: true,
            dry_run: true,
            trade: true,
            output_dir: dir.join("output"),
        }
    }

    pub fn context(dir: &Path) -> TradingContext {
        TradingContext::new(config(dir))
    }
}
