use crate::models::{Candle, Timeframe};
use chrono::{DateTime, Datelike, Duration, TimeZone, Utc};
use std::collections::BTreeMap;
use tracing::debug;

/// Resample candles into a longer timeframe.
///
/// Buckets are aligned on UTC boundaries (weeks start on Monday). Each bucket takes
/// the first open, the highest high, the lowest low, the last close and the summed
/// volume of its members. Buckets without data are not emitted.
pub fn resample(candles: &[Candle], target: Timeframe) -> Vec<Candle> {
    if candles.is_empty() {
        return vec![];
    }

    let mut buckets: BTreeMap<DateTime<Utc>, Vec<&Candle>> = BTreeMap::new();
    for candle in candles {
        let bucket_time = bucket_start(candle.open_time, target);
        buckets.entry(bucket_time).or_default().push(candle);
    }

    let result: Vec<Candle> = buckets
        .into_iter()
        .filter_map(|(bucket_time, mut members)| {
            members.sort_by_key(|c| c.open_time);
            aggregate_ohlcv(bucket_time, &members)
        })
        .collect();

    debug!(
        "Resampled {} candles into {} {} candles",
        candles.len(),
        result.len(),
        target
    );
    result
}

/// Start of the bucket containing `time`
pub fn bucket_start(time: DateTime<Utc>, target: Timeframe) -> DateTime<Utc> {
    match target {
        Timeframe::Week1 => {
            let date = time.date_naive();
            let monday = date - Duration::days(date.weekday().num_days_from_monday() as i64);
            Utc.from_utc_datetime(&monday.and_hms_opt(0, 0, 0).unwrap_or_default())
        }
        _ => {
            let bucket_secs = target.minutes() * 60;
            let ts = time.timestamp();
            let floored = ts - ts.rem_euclid(bucket_secs);
            DateTime::<Utc>::from_timestamp(floored, 0).unwrap_or(time)
        }
    }
}

fn aggregate_ohlcv(bucket_time: DateTime<Utc>, members: &[&Candle]) -> Option<Candle> {
    let first = members.first()?;
    let last = members.last()?;

    let high = members.iter().map(|c| c.high).fold(f64::MIN, f64::max);
    let low = members.iter().map(|c| c.low).fold(f64::MAX, f64::min);
    let volume = members.iter().map(|c| c.volume).sum();

    Some(Candle::new(bucket_time, first.open, high, low, last.close, volume))
}
