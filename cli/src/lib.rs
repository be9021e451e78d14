//! # marketscan - market data downloads and strat analysis
//!
//! Library behind the `marketscan` CLI and the `crypto-strat-bot` binary:
//! - NASDAQ Trader stock-list download and filtering
//! - daily history from the Yahoo chart endpoint and the weekend strat scan
//! - a local results explorer served with axum
//! - Binance klines/account/order client, SQLite trade diary and Telegram notifications
//! - a small step pipeline runner shared by the weekend run and the bot
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use marketscan::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let options = ScanOptions { explore: false, ..ScanOptions::default() };
//!     let mut context = ScanContext::new(options, settings);
//!     weekend_pipeline().run(&mut context).await?;
//!     Ok(())
//! }
//! ```

pub mod analysis;
pub mod config;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod services;
pub mod steps;
pub mod utils;

pub mod prelude {
    //! Commonly used types

    pub use crate::config::Settings;
    pub use crate::error::{AppError, Result};
    pub use crate::models::{Candle, Indicators, ScanReport, Timeframe, TradeSignal, Transaction};
    pub use crate::pipeline::{Pipeline, PipelineOutcome, Step, StepFlow};
    pub use crate::steps::{scan_pipeline, weekend_pipeline, ScanContext, ScanOptions};
}

pub use utils::{init_logger, Logger, Timer};
