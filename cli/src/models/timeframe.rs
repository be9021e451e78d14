use crate::error::AppError;
use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Candle interval supported by the exchange client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Timeframe {
    Minute1,
    Minutes3,
    Minutes5,
    Minutes15,
    Minutes30,
    Hour1,
    Hours2,
    Hours4,
    Day1,
    Week1,
}

impl Timeframe {
    /// Interval string used on the exchange wire
    pub fn as_str(&self) -> &'static str {
        match self {
            Timeframe::Minute1 => "1m",
            Timeframe::Minutes3 => "3m",
            Timeframe::Minutes5 => "5m",
            Timeframe::Minutes15 => "15m",
            Timeframe::Minutes30 => "30m",
            Timeframe::Hour1 => "1h",
            Timeframe::Hours2 => "2h",
            Timeframe::Hours4 => "4h",
            Timeframe::Day1 => "1d",
            Timeframe::Week1 => "1w",
        }
    }

    pub fn minutes(&self) -> i64 {
        match self {
            Timeframe::Minute1 => 1,
            Timeframe::Minutes3 => 3,
            Timeframe::Minutes5 => 5,
            Timeframe::Minutes15 => 15,
            Timeframe::Minutes30 => 30,
            Timeframe::Hour1 => 60,
            Timeframe::Hours2 => 120,
            Timeframe::Hours4 => 240,
            Timeframe::Day1 => 1440,
            Timeframe::Week1 => 10080,
        }
    }

    pub fn duration(&self) -> Duration {
        Duration::minutes(self.minutes())
    }

    /// True when candles of this timeframe can be resampled into `target`
    pub fn fits_into(&self, target: Timeframe) -> bool {
        self.minutes() <= target.minutes() && target.minutes() % self.minutes() == 0
    }
}

impl FromStr for Timeframe {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "1m" | "1min" => Ok(Timeframe::Minute1),
            "3m" | "3min" => Ok(Timeframe::Minutes3),
            "5m" | "5min" => Ok(Timeframe::Minutes5),
            "15m" | "15min" => Ok(Timeframe::Minutes15),
            "30m" | "30min" => Ok(Timeframe::Minutes30),
            "1h" | "1H" | "60m" => Ok(Timeframe::Hour1),
            "2h" | "2H" => Ok(Timeframe::Hours2),
            "4h" | "4H" => Ok(Timeframe::Hours4),
            "1d" | "1D" => Ok(Timeframe::Day1),
            "1w" | "1W" => Ok(Timeframe::Week1),
            other => Err(AppError::InvalidInput(format!("Unsupported time frame: {}", other))),
        }
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_aliases() {
        assert_eq!("5m".parse::<Timeframe>().unwrap(), Timeframe::Minutes5);
        assert_eq!("15min".parse::<Timeframe>().unwrap(), Timeframe::Minutes15);
        assert_eq!("1H".parse::<Timeframe>().unwrap(), Timeframe::Hour1);
        assert!("7m".parse::<Timeframe>().is_err());
    }

    #[test]
    fn test_fits_into() {
        assert!(Timeframe::Minutes5.fits_into(Timeframe::Minutes15));
        assert!(Timeframe::Minutes15.fits_into(Timeframe::Minutes15));
        assert!(!Timeframe::Minutes30.fits_into(Timeframe::Minutes15));
        assert!(Timeframe::Minutes3.fits_into(Timeframe::Hour1));
        assert!(Timeframe::Day1.fits_into(Timeframe::Week1));
    }
}
