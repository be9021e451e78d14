use crate::{
    config::Settings,
    models::{Candle, Exchange, ListedStock, ScanReport},
    services::explorer::DEFAULT_PORT,
};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_STOCKLIST_PATH: &str = "data/stocklist.csv";
pub const DEFAULT_OUTPUT_DIR: &str = "output";
pub const DEFAULT_LIMIT: usize = 100;
pub const DEFAULT_HISTORY_RANGE: &str = "1y";
pub const DEFAULT_BATCH_SIZE: usize = 10;

/// Options of a weekend run or an analysis scan
#[derive(Debug, Clone)]
pub struct ScanOptions {
    pub stocklist_path: PathBuf,
    pub include_etf: bool,
    pub exchanges: Vec<Exchange>,
    /// 0 means no limit
    pub limit: usize,
    /// Overrides the stock list when non-empty
    pub symbols: Vec<String>,
    pub history_range: String,
    pub batch_size: usize,
    pub batch_pause: Duration,
    pub output_dir: PathBuf,
    pub explore: bool,
    pub open_browser: bool,
    pub port: u16,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            stocklist_path: PathBuf::from(DEFAULT_STOCKLIST_PATH),
            include_etf: false,
            exchanges: Vec::new(),
            limit: DEFAULT_LIMIT,
            symbols: Vec::new(),
            history_range: DEFAULT_HISTORY_RANGE.to_string(),
            batch_size: DEFAULT_BATCH_SIZE,
            batch_pause: Duration::from_millis(500),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            explore: true,
            open_browser: true,
            port: DEFAULT_PORT,
        }
    }
}

/// State shared by the weekend steps
#[derive(Debug)]
pub struct ScanContext {
    pub options: ScanOptions,
    pub settings: Settings,
    pub stocks: Vec<ListedStock>,
    pub history: HashMap<String, Vec<Candle>>,
    pub failed: Vec<String>,
    pub report: Option<ScanReport>,
    pub report_csv: Option<PathBuf>,
    pub report_json: Option<PathBuf>,
}

impl ScanContext {
    pub fn new(options: ScanOptions, settings: Settings) -> Self {
        Self {
            options,
            settings,
            stocks: Vec::new(),
            history: HashMap::new(),
            failed: Vec::new(),
            report: None,
            report_csv: None,
            report_json: None,
        }
    }
}
