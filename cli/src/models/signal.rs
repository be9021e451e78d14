use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::AppError;

/// Relationship of a candle to the one before it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StratNumber {
    /// Equal high or low, no classification
    #[serde(rename = "0")]
    Zero,
    /// Inside bar: lower high and higher low
    #[serde(rename = "1")]
    Inside,
    /// Higher high and higher low
    #[serde(rename = "2u")]
    TwoUp,
    /// Lower high and lower low
    #[serde(rename = "2d")]
    TwoDown,
    /// Outside bar: higher high and lower low
    #[serde(rename = "3")]
    Outside,
}

impl StratNumber {
    pub fn as_str(&self) -> &'static str {
        match self {
            StratNumber::Zero => "0",
            StratNumber::Inside => "1",
            StratNumber::TwoUp => "2u",
            StratNumber::TwoDown => "2d",
            StratNumber::Outside => "3",
        }
    }
}

impl fmt::Display for StratNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Three consecutive strat numbers, oldest first. `None` renders as `na`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StratPattern(pub Option<[StratNumber; 3]>);

impl StratPattern {
    pub fn new(oldest: StratNumber, middle: StratNumber, latest: StratNumber) -> Self {
        Self(Some([oldest, middle, latest]))
    }

    pub fn unavailable() -> Self {
        Self(None)
    }

    pub fn is_available(&self) -> bool {
        self.0.is_some()
    }

    pub fn latest(&self) -> Option<StratNumber> {
        self.0.map(|numbers| numbers[2])
    }

    /// True when the pattern ends with `suffix` (e.g. `[2d, 2d]`)
    pub fn ends_with(&self, suffix: &[StratNumber]) -> bool {
        match &self.0 {
            Some(numbers) if suffix.len() <= numbers.len() => numbers.ends_with(suffix),
            _ => false,
        }
    }
}

impl fmt::Display for StratPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            Some([a, b, c]) => write!(f, "{}-{}-{}", a, b, c),
            None => write!(f, "na"),
        }
    }
}

impl Serialize for StratPattern {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Color of the most recent candle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CandleDirection {
    Green,
    Red,
    #[serde(rename = "na")]
    Unknown,
}

impl CandleDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            CandleDirection::Green => "green",
            CandleDirection::Red => "red",
            CandleDirection::Unknown => "na",
        }
    }
}

impl fmt::Display for CandleDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Strat readings on the resampled timeframes
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Indicators {
    pub strat_15m: StratPattern,
    pub strat_candle_15m_direction: CandleDirection,
    pub strat_60m: StratPattern,
    pub strat_candle_60m_direction: CandleDirection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TradeSignal {
    #[serde(rename = "BUY")]
    Buy,
    #[serde(rename = "SELL")]
    Sell,
    #[serde(rename = "NO_SIGNAL")]
    NoSignal,
}

impl TradeSignal {
    pub fn as_str(&self) -> &'static str {
        match self {
            TradeSignal::Buy => "BUY",
            TradeSignal::Sell => "SELL",
            TradeSignal::NoSignal => "NO_SIGNAL",
        }
    }

    pub fn is_actionable(&self) -> bool {
        !matches!(self, TradeSignal::NoSignal)
    }
}

impl FromStr for TradeSignal {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "BUY" => Ok(TradeSignal::Buy),
            "SELL" => Ok(TradeSignal::Sell),
            "NO_SIGNAL" => Ok(TradeSignal::NoSignal),
            other => Err(AppError::Parse(format!("Unknown trade signal: {}", other))),
        }
    }
}

impl fmt::Display for TradeSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use StratNumber::*;

    #[test]
    fn test_pattern_display() {
        assert_eq!(StratPattern::new(Outside, TwoDown, Inside).to_string(), "3-2d-1");
        assert_eq!(StratPattern::unavailable().to_string(), "na");
    }

    #[test]
    fn test_pattern_suffix() {
        let pattern = StratPattern::new(TwoUp, TwoDown, TwoDown);
        assert!(pattern.ends_with(&[TwoDown, TwoDown]));
        assert!(!pattern.ends_with(&[TwoUp, TwoDown]));
        assert!(!StratPattern::unavailable().ends_with(&[TwoDown]));
    }

    #[test]
    fn test_signal_round_trip_str() {
        for signal in [TradeSignal::Buy, TradeSignal::Sell, TradeSignal::NoSignal] {
            assert_eq!(signal.as_str().parse::<TradeSignal>().unwrap(), signal);
        }
    }
}
