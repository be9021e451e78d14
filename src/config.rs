use anyhow::{bail, Context};
use clap::Parser;
use marketscan::{models::Timeframe, services::database::validate_table_name, utils::resolve_in_home};
use std::path::PathBuf;
use std::time::Duration;

/// Command-line arguments of the bot
#[derive(Parser, Debug, Clone)]
#[command(name = "crypto-strat-bot")]
#[command(version)]
#[command(about = "Strat pattern signals on exchange candles, with an optional trading chain")]
pub struct Args {
    /// Coin to trade, e.g. BTC
    #[arg(short, long)]
    pub coin: String,
    /// Stable coin quote, e.g. USDT
    #[arg(short = 'm', long)]
    pub stable_coin: String,
    /// Candle time frame pulled from the exchange (must divide 15m)
    #[arg(short = 't', long)]
    pub time_frame: Timeframe,
    /// SQLite trade diary; relative paths live under $HOME
    #[arg(short = 'f', long, default_value = "crypto_trade_diary.db")]
    pub db_file: String,
    /// Trade diary table
    #[arg(long, default_value = "trades")]
    pub table_name: String,
    /// Budget spent per BUY, in stable coin
    #[arg(short, long, default_value_t = 50.0)]
    pub buying_budget: f64,
    /// Minutes between runs
    #[arg(short, long, default_value_t = 5)]
    pub wait_in_minutes: u64,
    /// Run once and exit
    #[arg(short, long)]
    pub run_once: bool,
    /// Never place orders
    #[arg(short, long)]
    pub dry_run: bool,
    /// Enable the account and order steps
    #[arg(long)]
    pub trade: bool,
    /// Directory for generated charts
    #[arg(long, default_value = "output")]
    pub output_dir: PathBuf,
}

/// Validated bot configuration
#[derive(Debug, Clone)]
pub struct BotConfig {
    pub coin: String,
    pub stable_coin: String,
    pub time_frame: Timeframe,
    pub db_path: PathBuf,
    pub table_name: String,
    pub buying_budget: f64,
    pub wait: Duration,
    pub run_once: bool,
    pub dry_run: bool,
    pub trade: bool,
    pub output_dir: PathBuf,
}

impl BotConfig {
    pub fn from_args(args: Args) -> anyhow::Result<Self> {
        let coin = args.coin.trim().to_uppercase();
        let stable_coin = args.stable_coin.trim().to_uppercase();
        if coin.is_empty() || stable_coin.is_empty() {
            bail!("coin and stable coin must not be empty");
        }
        if !args.time_frame.fits_into(Timeframe::Minutes15) {
            bail!(
                "time frame {} cannot be resampled into 15m candles; use 1m, 3m, 5m or 15m",
                args.time_frame
            );
        }
        if !(args.buying_budget > 0.0) {
            bail!("buying budget must be positive, got {}", args.buying_budget);
        }
        if args.wait_in_minutes == 0 {
            bail!("wait in minutes must be at least 1");
        }
        validate_table_name(&args.table_name).context("invalid --table-name")?;

        Ok(Self {
            coin,
            stable_coin,
            time_frame: args.time_frame,
            db_path: resolve_in_home(&args.db_file),
            table_name: args.table_name,
            buying_budget: args.buying_budget,
            wait: Duration::from_secs(args.wait_in_minutes * 60),
            run_once: args.run_once,
            dry_run: args.dry_run,
            trade: args.trade,
            output_dir: args.output_dir,
        })
    }

    /// Exchange symbol, e.g. `BTCUSDT`
    pub fn market_symbol(&self) -> String {
        format!("{}{}", self.coin, self.stable_coin)
    }
}
