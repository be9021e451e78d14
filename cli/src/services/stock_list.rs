use crate::{
    error::{AppError, Result},
    models::{Exchange, ListedStock, ListingEntry, RawNasdaqListed, RawOtherListed},
    services::http::{build_client, send_with_retry, RetryPolicy},
    utils::{log_fetch, write_atomic, Logger, Timer},
};
use regex::Regex;
use std::{collections::BTreeMap, path::Path, sync::OnceLock, time::Duration};

const NASDAQ_LISTED_FILE: &str = "nasdaqlisted.txt";
const OTHER_LISTED_FILE: &str = "otherlisted.txt";
const FOOTER_PREFIX: &str = "File Creation Time";

fn symbol_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Z][A-Z0-9.\-]*$").expect("static regex"))
}

/// Which listings to keep
#[derive(Debug, Clone, Default)]
pub struct StockListFilter {
    pub include_etf: bool,
    /// Empty means every exchange
    pub exchanges: Vec<Exchange>,
}

impl StockListFilter {
    pub fn accepts(&self, entry: &ListingEntry) -> bool {
        if entry.is_test_issue {
            return false;
        }
        if entry.stock.is_etf && !self.include_etf {
            return false;
        }
        if !self.exchanges.is_empty() && !self.exchanges.contains(&entry.stock.exchange) {
            return false;
        }
        symbol_pattern().is_match(&entry.stock.symbol)
    }
}

/// Downloads the symbol directory and maintains the stock list file
pub struct StockListService {
    client: reqwest::Client,
    base_url: String,
    retry: RetryPolicy,
    logger: Logger,
}

impl StockListService {
    pub fn new(base_url: &str) -> Result<Self> {
        Ok(Self {
            client: build_client(Duration::from_secs(30))?,
            base_url: base_url.trim_end_matches('/').to_string(),
            retry: RetryPolicy::default(),
            logger: Logger::new("STOCK_LIST"),
        })
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Download both directory files and return the filtered, sorted, de-duplicated list
    pub async fn download(&self, filter: &StockListFilter) -> Result<Vec<ListedStock>> {
        let timer = Timer::start("stock list download");

        let nasdaq = self.fetch_file(NASDAQ_LISTED_FILE).await?;
        let other = self.fetch_file(OTHER_LISTED_FILE).await?;

        let mut entries = parse_nasdaq_listed(&nasdaq)?;
        entries.extend(parse_other_listed(&other)?);
        let total = entries.len();

        let stocks = apply_filter(entries, filter);
        self.logger.info(&format!(
            "Stock list ready: {} of {} listings kept ({:.1}ms)",
            stocks.len(),
            total,
            timer.elapsed_ms()
        ));
        Ok(stocks)
    }

    async fn fetch_file(&self, file_name: &str) -> Result<String> {
        let url = format!("{}/{}", self.base_url, file_name);
        log_fetch(&format!("Downloading {}", url));

        let response = send_with_retry(&self.retry, file_name, || self.client.get(&url)).await?;
        let content = response.text().await?;
        if content.trim().is_empty() {
            return Err(AppError::NotFound(format!("{} is empty", url)));
        }
        Ok(content)
    }
}

fn strip_footer(content: &str) -> String {
    content
        .lines()
        .filter(|line| !line.starts_with(FOOTER_PREFIX) && !line.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn pipe_reader(content: &str) -> csv::Reader<&[u8]> {
    csv::ReaderBuilder::new()
        .delimiter(b'|')
        .quoting(false)
        .flexible(true)
        .from_reader(content.as_bytes())
}

/// Parse `nasdaqlisted.txt`
pub fn parse_nasdaq_listed(content: &str) -> Result<Vec<ListingEntry>> {
    let body = strip_footer(content);
    let mut reader = pipe_reader(&body);
    let mut entries = Vec::new();
    for record in reader.deserialize() {
        let raw: RawNasdaqListed = record?;
        entries.push(raw.to_entry());
    }
    Ok(entries)
}

/// Parse `otherlisted.txt`; rows on unknown venues are skipped
pub fn parse_other_listed(content: &str) -> Result<Vec<ListingEntry>> {
    let body = strip_footer(content);
    let mut reader = pipe_reader(&body);
    let mut entries = Vec::new();
    for record in reader.deserialize() {
        let raw: RawOtherListed = record?;
        if let Some(entry) = raw.to_entry() {
            entries.push(entry);
        }
    }
    Ok(entries)
}

/// Apply `filter`, de-duplicate by symbol (first listing wins) and sort by symbol
pub fn apply_filter(entries: Vec<ListingEntry>, filter: &StockListFilter) -> Vec<ListedStock> {
    let mut by_symbol: BTreeMap<String, ListedStock> = BTreeMap::new();
    for entry in entries {
        if filter.accepts(&entry) {
            by_symbol
                .entry(entry.stock.symbol.clone())
                .or_insert(entry.stock);
        }
    }
    by_symbol.into_values().collect()
}

/// Write the stock list CSV atomically
pub fn write_stock_list(path: &Path, stocks: &[ListedStock]) -> Result<()> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for stock in stocks {
        writer.serialize(stock)?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| AppError::Io(format!("Failed to flush CSV: {}", e)))?;
    write_atomic(path, &bytes)
}

/// Read a stock list CSV written by [`write_stock_list`]
pub fn read_stock_list(path: &Path) -> Result<Vec<ListedStock>> {
    if !path.exists() {
        return Err(AppError::NotFound(format!("Stock list {} does not exist", path.display())));
    }
    let mut reader = csv::Reader::from_path(path)?;
    let mut stocks = Vec::new();
    for record in reader.deserialize() {
        stocks.push(record?);
    }
    Ok(stocks)
}
