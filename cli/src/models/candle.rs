use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// One OHLCV candle. Sequences of candles are kept sorted by `open_time`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub open_time: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Candle {
    pub fn new(open_time: DateTime<Utc>, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Self {
        Self {
            open_time,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    /// Close strictly above open
    pub fn is_green(&self) -> bool {
        self.close > self.open
    }

    /// Trading date of the candle in UTC
    pub fn date(&self) -> NaiveDate {
        self.open_time.date_naive()
    }

    /// Percentage change from `reference` close to this candle's close
    pub fn change_pct_from(&self, reference: &Candle) -> Option<f64> {
        if reference.close == 0.0 {
            return None;
        }
        Some((self.close - reference.close) / reference.close * 100.0)
    }
}

/// Sort candles by open time and drop duplicated open times (last one wins)
pub fn normalize_candles(mut candles: Vec<Candle>) -> Vec<Candle> {
    candles.sort_by_key(|c| c.open_time);
    let mut result: Vec<Candle> = Vec::with_capacity(candles.len());
    for candle in candles {
        match result.last_mut() {
            Some(last) if last.open_time == candle.open_time => *last = candle,
            _ => result.push(candle),
        }
    }
    result
}
