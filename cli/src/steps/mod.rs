//! Steps of the weekend run and the analysis scan

pub mod analyze;
pub mod context;
pub mod explore;
pub mod history;
pub mod report;
pub mod stock_list;

pub use analyze::AnalyzeStocks;
pub use context::*;
pub use explore::LaunchExplorer;
pub use history::FetchDailyHistory;
pub use report::WriteReport;
pub use stock_list::{DownloadStockList, LoadStockList};

use crate::pipeline::Pipeline;

/// download → load → fetch → analyze → report → explore
pub fn weekend_pipeline() -> Pipeline<ScanContext> {
    Pipeline::new("WEEKEND")
        .with_step(DownloadStockList::new())
        .with_step(LoadStockList::new())
        .with_step(FetchDailyHistory::new())
        .with_step(AnalyzeStocks::new())
        .with_step(WriteReport::new())
        .with_step(LaunchExplorer::new())
}

/// Analysis over an existing stock list, without download or explorer
pub fn scan_pipeline() -> Pipeline<ScanContext> {
    Pipeline::new("SCAN")
        .with_step(LoadStockList::new())
        .with_step(FetchDailyHistory::new())
        .with_step(AnalyzeStocks::new())
        .with_step(WriteReport::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pipeline_order() {
        assert_eq!(
            weekend_pipeline().step_names(),
            vec![
                "DOWNLOAD_STOCK_LIST",
                "LOAD_STOCK_LIST",
                "FETCH_DAILY_HISTORY",
                "ANALYZE_STOCKS",
                "WRITE_REPORT",
                "LAUNCH_EXPLORER"
            ]
        );
        assert_eq!(scan_pipeline().step_names().len(), 4);
    }
}
