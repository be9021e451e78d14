use super::ScanContext;
use crate::{
    models::ListedStock,
    pipeline::{Step, StepFlow},
    services::{read_stock_list, write_stock_list, StockListFilter, StockListService},
    utils::Logger,
};
use anyhow::Context;

/// Download the symbol directory and write the stock list file
pub struct DownloadStockList {
    logger: Logger,
}

impl DownloadStockList {
    pub fn new() -> Self {
        Self {
            logger: Logger::new("DOWNLOAD_STOCK_LIST"),
        }
    }
}

impl Default for DownloadStockList {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl Step<ScanContext> for DownloadStockList {
    fn name(&self) -> &'static str {
        "DOWNLOAD_STOCK_LIST"
    }

    async fn run(&mut self, context: &mut ScanContext) -> anyhow::Result<StepFlow> {
        let filter = StockListFilter {
            include_etf: context.options.include_etf,
            exchanges: context.options.exchanges.clone(),
        };
        let service = StockListService::new(&context.settings.stocklist_source_url)?;
        let stocks = service
            .download(&filter)
            .await
            .context("stock list download failed")?;

        let path = &context.options.stocklist_path;
        write_stock_list(path, &stocks)
            .with_context(|| format!("failed to write {}", path.display()))?;
        self.logger.info(&format!("Wrote {} symbols to {}", stocks.len(), path.display()));
        Ok(StepFlow::Continue)
    }
}

/// Read the stock list back and pick the symbols to analyze
pub struct LoadStockList {
    logger: Logger,
}

impl LoadStockList {
    pub fn new() -> Self {
        Self {
            logger: Logger::new("LOAD_STOCK_LIST"),
        }
    }
}

impl Default for LoadStockList {
    fn default() -> Self {
        Self::new()
    }
}

/// Apply the `--symbols` override and the `--limit` cap
pub fn select_stocks(stocks: Vec<ListedStock>, symbols: &[String], limit: usize) -> Vec<ListedStock> {
    let mut selected: Vec<ListedStock> = if symbols.is_empty() {
        stocks
    } else {
        let wanted: Vec<String> = symbols.iter().map(|s| s.trim().to_uppercase()).collect();
        wanted
            .iter()
            .map(|symbol| {
                stocks
                    .iter()
                    .find(|s| &s.symbol == symbol)
                    .cloned()
                    .unwrap_or_else(|| ListedStock {
                        symbol: symbol.clone(),
                        name: symbol.clone(),
                        exchange: crate::models::Exchange::Nasdaq,
                        is_etf: false,
                    })
            })
            .collect()
    };

    if limit > 0 {
        selected.truncate(limit);
    }
    selected
}

#[async_trait::async_trait]
impl Step<ScanContext> for LoadStockList {
    fn name(&self) -> &'static str {
        "LOAD_STOCK_LIST"
    }

    async fn run(&mut self, context: &mut ScanContext) -> anyhow::Result<StepFlow> {
        let path = &context.options.stocklist_path;
        let stocks = if context.options.symbols.is_empty() || path.exists() {
            read_stock_list(path).with_context(|| format!("failed to read {}", path.display()))?
        } else {
            Vec::new()
        };
        let total = stocks.len();

        context.stocks = select_stocks(stocks, &context.options.symbols, context.options.limit);
        if context.stocks.is_empty() {
            anyhow::bail!("no symbols to analyze");
        }

        self.logger.info(&format!(
            "Selected {} of {} listed symbols",
            context.stocks.len(),
            total
        ));
        Ok(StepFlow::Continue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::models::Exchange;
    use crate::steps::ScanOptions;

    fn stock(symbol: &str) -> ListedStock {
        ListedStock {
            symbol: symbol.to_string(),
            name: format!("{} Corp", symbol),
            exchange: Exchange::Nyse,
            is_etf: false,
        }
    }

    #[test]
    fn test_select_stocks_limit() {
        let stocks = vec![stock("A"), stock("B"), stock("C")];
        let selected = select_stocks(stocks.clone(), &[], 2);
        assert_eq!(selected.len(), 2);
        assert_eq!(select_stocks(stocks, &[], 0).len(), 3);
    }

    #[test]
    fn test_select_stocks_override() {
        let stocks = vec![stock("A"), stock("B")];
        let selected = select_stocks(stocks, &["b".to_string(), "ZZ".to_string()], 100);
        assert_eq!(selected.len(), 2);
        assert_eq!(selected[0].name, "B Corp");
        assert_eq!(selected[1].symbol, "ZZ");
    }

    #[tokio::test]
    async fn test_load_stock_list_step() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stocklist.csv");
        write_stock_list(&path, &[stock("AA"), stock("BB"), stock("CC")]).unwrap();

        let options = ScanOptions {
            stocklist_path: path,
            limit: 2,
            ..ScanOptions::default()
        };
        let mut context = ScanContext::new(options, Settings::default());
        let flow = LoadStockList::new().run(&mut context).await.unwrap();
        assert_eq!(flow, StepFlow::Continue);
        assert_eq!(context.stocks.len(), 2);
    }

    #[tokio::test]
    async fn test_load_stock_list_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let options = ScanOptions {
            stocklist_path: dir.path().join("missing.csv"),
            ..ScanOptions::default()
        };
        let mut context = ScanContext::new(options, Settings::default());
        assert!(LoadStockList::new().run(&mut context).await.is_err());
    }
}
