use super::ScanContext;
use crate::{
    analysis::{calculate_strat, classify_setup, resample},
    models::{Candle, ListedStock, ScanReport, ScanRow, Timeframe},
    pipeline::{Step, StepFlow},
    utils::Logger,
};
use anyhow::Context;
use chrono::{NaiveDate, Utc};
use chrono_tz::America::New_York;
use rayon::prelude::*;

const TRADING_DAYS_PER_WEEK: usize = 5;
const TRADING_DAYS_PER_MONTH: usize = 21;

/// Trading date of a daily candle, in exchange time
pub fn market_date(candle: &Candle) -> NaiveDate {
    candle.open_time.with_timezone(&New_York).date_naive()
}

fn change_over(candles: &[Candle], bars_back: usize) -> Option<f64> {
    let last = candles.last()?;
    let idx = candles.len().checked_sub(bars_back + 1)?;
    last.change_pct_from(&candles[idx])
}

/// Strat reading and setup label for one symbol; `None` without candles
pub fn analyze_symbol(stock: &ListedStock, candles: &[Candle]) -> Option<ScanRow> {
    let last = candles.last()?;
    let weekly = resample(candles, Timeframe::Week1);

    let (daily_pattern, daily_direction) = calculate_strat(candles);
    let (weekly_pattern, weekly_direction) = calculate_strat(&weekly);
    let setup = classify_setup(&daily_pattern, daily_direction, &weekly_pattern);

    Some(ScanRow {
        symbol: stock.symbol.clone(),
        name: stock.name.clone(),
        exchange: stock.exchange,
        as_of: market_date(last),
        close: last.close,
        change_1w_pct: change_over(candles, TRADING_DAYS_PER_WEEK),
        change_1m_pct: change_over(candles, TRADING_DAYS_PER_MONTH),
        daily_strat: daily_pattern.to_string(),
        daily_direction,
        weekly_strat: weekly_pattern.to_string(),
        weekly_direction,
        setup,
    })
}

/// Per-symbol strat analysis over the downloaded history
pub struct AnalyzeStocks {
    logger: Logger,
}

impl AnalyzeStocks {
    pub fn new() -> Self {
        Self {
            logger: Logger::new("ANALYZE_STOCKS"),
        }
    }
}

impl Default for AnalyzeStocks {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl Step<ScanContext> for AnalyzeStocks {
    fn name(&self) -> &'static str {
        "ANALYZE_STOCKS"
    }

    async fn run(&mut self, context: &mut ScanContext) -> anyhow::Result<StepFlow> {
        // CPU-bound; keep it off the async workers
        let stocks = std::mem::take(&mut context.stocks);
        let history = std::mem::take(&mut context.history);
        let (stocks, history, mut rows) = tokio::task::spawn_blocking(move || {
            let rows: Vec<ScanRow> = stocks
                .par_iter()
                .filter_map(|stock| {
                    let candles = history.get(&stock.symbol)?;
                    analyze_symbol(stock, candles)
                })
                .collect();
            (stocks, history, rows)
        })
        .await
        .context("analysis task failed")?;
        context.stocks = stocks;
        context.history = history;
        rows.sort_by(|a, b| a.symbol.cmp(&b.symbol));

        if rows.is_empty() {
            anyhow::bail!(
                "no symbols could be analyzed ({} requested, {} failed to download)",
                context.stocks.len(),
                context.failed.len()
            );
        }

        let as_of = rows
            .iter()
            .map(|r| r.as_of)
            .max()
            .unwrap_or_else(|| Utc::now().with_timezone(&New_York).date_naive());

        let report = ScanReport {
            as_of,
            generated_at: Utc::now(),
            requested: context.stocks.len(),
            failed: context.failed.clone(),
            rows,
        };

        for (setup, count) in report.setup_counts() {
            self.logger.info(&format!("{}: {}", setup.as_str(), count));
        }
        self.logger.info(&format!(
            "Analyzed {} symbols as of {}",
            report.rows.len(),
            report.as_of
        ));

        context.report = Some(report);
        Ok(StepFlow::Continue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::models::{CandleDirection, Exchange, Setup};
    use crate::steps::ScanOptions;
    use chrono::{Duration, TimeZone};

    fn stock(symbol: &str) -> ListedStock {
        ListedStock {
            symbol: symbol.to_string(),
            name: format!("{} Inc.", symbol),
            exchange: Exchange::Nasdaq,
            is_etf: false,
        }
    }

    /// Daily candles at 14:30 UTC (09:30 New York), one per calendar day
    fn daily(values: &[(f64, f64, f64, f64)]) -> Vec<Candle> {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 14, 30, 0).unwrap();
        values
            .iter()
            .enumerate()
            .map(|(i, &(open, high, low, close))| {
                Candle::new(start + Duration::days(i as i64), open, high, low, close, 1000.0)
            })
            .collect()
    }

    #[test]
    fn test_market_date_uses_new_york() {
        let candle = Candle::new(Utc.with_ymd_and_hms(2024, 3, 9, 2, 0, 0).unwrap(), 1.0, 1.0, 1.0, 1.0, 0.0);
        assert_eq!(market_date(&candle), NaiveDate::from_ymd_opt(2024, 3, 8).unwrap());
    }

    #[test]
    fn test_bullish_reversal_setup() {
        // outside, then two lower bars, last one green
        let candles = daily(&[
            (10.0, 11.0, 9.0, 10.0),
            (10.0, 12.0, 8.0, 9.0),
            (9.0, 11.0, 7.0, 7.5),
            (7.0, 10.0, 6.0, 9.5),
        ]);
        let row = analyze_symbol(&stock("AAPL"), &candles).unwrap();
        assert_eq!(row.daily_strat, "3-2d-2d");
        assert_eq!(row.daily_direction, CandleDirection::Green);
        assert_eq!(row.setup, Setup::BullishReversal);
        assert_eq!(row.close, 9.5);
        assert_eq!(row.weekly_strat, "na");
        assert_eq!(row.change_1w_pct, None);
    }

    #[test]
    fn test_changes_need_enough_history() {
        let values: Vec<(f64, f64, f64, f64)> = (0..30)
            .map(|i| {
                let base = 100.0 + i as f64;
                (base, base + 1.0, base - 1.0, base)
            })
            .collect();
        let candles = daily(&values);
        let row = analyze_symbol(&stock("MSFT"), &candles).unwrap();

        let expected_week = (129.0 - 124.0) / 124.0 * 100.0;
        assert!((row.change_1w_pct.unwrap() - expected_week).abs() < 1e-9);
        assert!(row.change_1m_pct.is_some());
        assert_ne!(row.weekly_strat, "na");
    }

    #[tokio::test]
    async fn test_step_builds_report_and_fails_without_data() {
        let mut context = ScanContext::new(ScanOptions::default(), Settings::default());
        context.stocks = vec![stock("AAPL"), stock("MSFT")];
        assert!(AnalyzeStocks::new().run(&mut context).await.is_err());
        assert_eq!(context.stocks.len(), 2);

        context.history.insert(
            "AAPL".to_string(),
            daily(&[(10.0, 11.0, 9.0, 10.5), (10.5, 12.0, 10.0, 11.0)]),
        );
        context.failed = vec!["MSFT".to_string()];
        AnalyzeStocks::new().run(&mut context).await.unwrap();

        let report = context.report.unwrap();
        assert_eq!(report.rows.len(), 1);
        assert_eq!(report.requested, 2);
        assert_eq!(report.failed, vec!["MSFT".to_string()]);
        assert_eq!(report.as_of, NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
        assert_eq!(report.rows[0].daily_strat, "na");
    }
}
