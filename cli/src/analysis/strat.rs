use crate::models::{Candle, CandleDirection, StratNumber, StratPattern};
use tracing::warn;

/// Classify `current` against `previous`
pub fn strat_number(current: &Candle, previous: &Candle) -> StratNumber {
    let higher_high = current.high > previous.high;
    let lower_high = current.high < previous.high;
    let higher_low = current.low > previous.low;
    let lower_low = current.low < previous.low;

    if higher_high && higher_low {
        StratNumber::TwoUp
    } else if lower_low && lower_high {
        StratNumber::TwoDown
    } else if higher_high && lower_low {
        StratNumber::Outside
    } else if lower_high && higher_low {
        StratNumber::Inside
    } else {
        StratNumber::Zero
    }
}

/// Strat pattern of the last three candle pairs and the direction of the last candle.
///
/// Needs at least four candles; otherwise returns `na`/`na`.
pub fn calculate_strat(candles: &[Candle]) -> (StratPattern, CandleDirection) {
    let n = candles.len();
    if n < 4 {
        warn!("Unable to calculate strat: only {} candles available", n);
        return (StratPattern::unavailable(), CandleDirection::Unknown);
    }

    let last = &candles[n - 1];
    let second = &candles[n - 2];
    let third = &candles[n - 3];
    let fourth = &candles[n - 4];

    let pattern = StratPattern::new(
        strat_number(third, fourth),
        strat_number(second, third),
        strat_number(last, second),
    );

    (pattern, candle_direction(last))
}

pub fn candle_direction(candle: &Candle) -> CandleDirection {
    if candle.is_green() {
        CandleDirection::Green
    } else {
        CandleDirection::Red
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn bar(index: i64, high: f64, low: f64, open: f64, close: f64) -> Candle {
        let time = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::minutes(15 * index);
        Candle::new(time, open, high, low, close, 1.0)
    }

    #[test]
    fn test_strat_numbers() {
        let previous = bar(0, 10.0, 5.0, 6.0, 7.0);
        assert_eq!(strat_number(&bar(1, 11.0, 6.0, 6.0, 7.0), &previous), StratNumber::TwoUp);
        assert_eq!(strat_number(&bar(1, 9.0, 4.0, 6.0, 7.0), &previous), StratNumber::TwoDown);
        assert_eq!(strat_number(&bar(1, 11.0, 4.0, 6.0, 7.0), &previous), StratNumber::Outside);
        assert_eq!(strat_number(&bar(1, 9.0, 6.0, 6.0, 7.0), &previous), StratNumber::Inside);
        assert_eq!(strat_number(&bar(1, 10.0, 6.0, 6.0, 7.0), &previous), StratNumber::Zero);
    }

    #[test]
    fn test_calculate_strat_pattern() {
        let candles = vec![
            bar(0, 10.0, 5.0, 6.0, 7.0),
            bar(1, 12.0, 4.0, 6.0, 7.0),  // 3
            bar(2, 11.0, 3.0, 7.0, 6.0),  // 2d
            bar(3, 10.0, 4.0, 5.0, 8.0),  // 1, green
        ];
        let (pattern, direction) = calculate_strat(&candles);
        assert_eq!(pattern.to_string(), "3-2d-1");
        assert_eq!(direction, CandleDirection::Green);
    }

    #[test]
    fn test_calculate_strat_uses_last_four() {
        let mut candles = vec![bar(0, 100.0, 1.0, 50.0, 50.0)];
        candles.extend(vec![
            bar(1, 10.0, 5.0, 6.0, 7.0),
            bar(2, 9.0, 4.0, 6.0, 5.0),
            bar(3, 8.0, 3.0, 6.0, 5.0),
            bar(4, 7.0, 2.0, 6.0, 5.0),
        ]);
        let (pattern, direction) = calculate_strat(&candles);
        assert_eq!(pattern.to_string(), "2d-2d-2d");
        assert_eq!(direction, CandleDirection::Red);
    }

    #[test]
    fn test_calculate_strat_not_enough_candles() {
        let candles = vec![bar(0, 10.0, 5.0, 6.0, 7.0), bar(1, 11.0, 6.0, 6.0, 7.0)];
        let (pattern, direction) = calculate_strat(&candles);
        assert_eq!(pattern.to_string(), "na");
        assert_eq!(direction, CandleDirection::Unknown);
    }
}
