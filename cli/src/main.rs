use marketscan::{
    config::Settings,
    models::Exchange,
    pipeline::PipelineOutcome,
    services::{explorer, write_stock_list, StockListFilter, StockListService},
    steps::{
        scan_pipeline, weekend_pipeline, ScanContext, ScanOptions, DEFAULT_BATCH_SIZE,
        DEFAULT_HISTORY_RANGE, DEFAULT_LIMIT, DEFAULT_OUTPUT_DIR, DEFAULT_STOCKLIST_PATH,
    },
    utils::init_logger,
};

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "marketscan")]
#[command(version)]
#[command(about = "Download the US stock list, run the weekend strat scan and explore the results")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Args, Debug, Clone)]
pub struct ListArgs {
    /// Keep ETFs in the stock list
    #[arg(long)]
    pub include_etf: bool,
    /// Only keep listings on this exchange (repeatable)
    #[arg(long = "exchange", value_name = "EXCHANGE")]
    pub exchanges: Vec<Exchange>,
    /// Symbol directory base URL (overrides STOCKLIST_SOURCE_URL)
    #[arg(long)]
    pub source_url: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct ScanArgs {
    /// Stock list CSV
    #[arg(long, default_value = DEFAULT_STOCKLIST_PATH)]
    pub stocklist: PathBuf,
    /// Maximum number of symbols to analyze (0 for all)
    #[arg(short, long, default_value_t = DEFAULT_LIMIT)]
    pub limit: usize,
    /// Analyze these symbols instead of the stock list (comma-separated)
    #[arg(short, long, value_delimiter = ',')]
    pub symbols: Vec<String>,
    /// History range requested per symbol
    #[arg(long, default_value = DEFAULT_HISTORY_RANGE)]
    pub range: String,
    /// Concurrent history downloads per batch
    #[arg(long, default_value_t = DEFAULT_BATCH_SIZE)]
    pub batch_size: usize,
    /// Directory for the scan report
    #[arg(short, long, default_value = DEFAULT_OUTPUT_DIR)]
    pub output_dir: PathBuf,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Download the stock list from the NASDAQ Trader symbol directory
    DownloadStocklist {
        /// Output CSV
        #[arg(short, long, default_value = DEFAULT_STOCKLIST_PATH)]
        output: PathBuf,
        #[command(flatten)]
        list: ListArgs,
    },
    /// Analyze an existing stock list and write the report
    Scan {
        #[command(flatten)]
        scan: ScanArgs,
    },
    /// Download the stock list, analyze it and open the explorer
    Weekend {
        #[command(flatten)]
        list: ListArgs,
        #[command(flatten)]
        scan: ScanArgs,
        /// Stop after writing the report
        #[arg(long)]
        no_explore: bool,
        /// Serve the explorer without opening a browser
        #[arg(long)]
        no_browser: bool,
        /// Explorer port
        #[arg(long, default_value_t = explorer::DEFAULT_PORT)]
        port: u16,
    },
    /// Serve a report written by `weekend` or `scan`
    Explore {
        /// Report JSON file
        report: PathBuf,
        /// Explorer port
        #[arg(long, default_value_t = explorer::DEFAULT_PORT)]
        port: u16,
        /// Do not open a browser
        #[arg(long)]
        no_browser: bool,
    },
}

fn scan_options(scan: ScanArgs) -> ScanOptions {
    ScanOptions {
        stocklist_path: scan.stocklist,
        limit: scan.limit,
        symbols: scan.symbols,
        history_range: scan.range,
        batch_size: scan.batch_size,
        output_dir: scan.output_dir,
        ..ScanOptions::default()
    }
}

fn load_settings(source_url: Option<String>) -> anyhow::Result<Settings> {
    let mut settings = Settings::load().context("failed to load configuration")?;
    if let Some(url) = source_url {
        settings.stocklist_source_url = url;
    }
    Ok(settings)
}

fn print_outcome(outcome: &PipelineOutcome, context: &ScanContext) {
    if let PipelineOutcome::Halted { step, reason } = outcome {
        println!("Stopped at {}: {}", step, reason);
    }
    if let (Some(csv), Some(json)) = (&context.report_csv, &context.report_json) {
        println!("Report: {} ({})", csv.display(), json.display());
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logger()?;

    let cli = Cli::parse();

    match cli.command {
        Commands::DownloadStocklist { output, list } => {
            let settings = load_settings(list.source_url)?;
            let filter = StockListFilter {
                include_etf: list.include_etf,
                exchanges: list.exchanges,
            };
            let stocks = StockListService::new(&settings.stocklist_source_url)?
                .download(&filter)
                .await
                .context("stock list download failed")?;
            write_stock_list(&output, &stocks)
                .with_context(|| format!("failed to write {}", output.display()))?;
            println!("Wrote {} symbols to {}", stocks.len(), output.display());
        }
        Commands::Scan { scan } => {
            let settings = load_settings(None)?;
            let mut context = ScanContext::new(scan_options(scan), settings);
            let outcome = scan_pipeline().run(&mut context).await?;
            print_outcome(&outcome, &context);
        }
        Commands::Weekend {
            list,
            scan,
            no_explore,
            no_browser,
            port,
        } => {
            let settings = load_settings(list.source_url)?;
            let options = ScanOptions {
                include_etf: list.include_etf,
                exchanges: list.exchanges,
                explore: !no_explore,
                open_browser: !no_browser,
                port,
                ..scan_options(scan)
            };
            let mut context = ScanContext::new(options, settings);
            let outcome = weekend_pipeline().run(&mut context).await?;
            print_outcome(&outcome, &context);
        }
        Commands::Explore {
            report,
            port,
            no_browser,
        } => {
            let report = explorer::load_report(&report)
                .with_context(|| format!("failed to load {}", report.display()))?;
            explorer::serve(report, port, !no_browser).await?;
        }
    }

    Ok(())
}
