use super::{CandleDirection, Exchange};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Setup label assigned by the weekend analysis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Setup {
    BullishReversal,
    BearishReversal,
    InsideWeek,
    None,
}

impl Setup {
    pub fn as_str(&self) -> &'static str {
        match self {
            Setup::BullishReversal => "bullish-reversal",
            Setup::BearishReversal => "bearish-reversal",
            Setup::InsideWeek => "inside-week",
            Setup::None => "none",
        }
    }
}

/// One analyzed symbol of a weekend run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanRow {
    pub symbol: String,
    pub name: String,
    pub exchange: Exchange,
    pub as_of: NaiveDate,
    pub close: f64,
    pub change_1w_pct: Option<f64>,
    pub change_1m_pct: Option<f64>,
    pub daily_strat: String,
    pub daily_direction: CandleDirection,
    pub weekly_strat: String,
    pub weekly_direction: CandleDirection,
    pub setup: Setup,
}

/// Report written by the weekend run and served by the explorer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanReport {
    pub as_of: NaiveDate,
    pub generated_at: chrono::DateTime<chrono::Utc>,
    pub requested: usize,
    pub failed: Vec<String>,
    pub rows: Vec<ScanRow>,
}

impl ScanReport {
    /// Number of rows per setup label, in a stable order
    pub fn setup_counts(&self) -> Vec<(Setup, usize)> {
        [Setup::BullishReversal, Setup::BearishReversal, Setup::InsideWeek, Setup::None]
            .into_iter()
            .map(|setup| (setup, self.rows.iter().filter(|row| row.setup == setup).count()))
            .collect()
    }
}
