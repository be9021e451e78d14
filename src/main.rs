pub mod config;
pub mod context;
pub mod steps;
pub mod worker;

use clap::Parser;
use config::{Args, BotConfig};
use marketscan::utils::init_logger;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok(); // Load .env file if present
    init_logger()?;

    let args = Args::parse();
    let config = BotConfig::from_args(args)?;

    tracing::info!(
        coin = %config.coin,
        stable_coin = %config.stable_coin,
        time_frame = %config.time_frame,
        db = %config.db_path.display(),
        "Loaded configuration"
    );

    worker::run(config).await
}
