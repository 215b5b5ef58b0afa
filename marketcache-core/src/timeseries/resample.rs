//! Bucket-based OHLCV resampling, generalized from a single caller: the 4h
//! timeframe, built from 1h bars.

use crate::types::Candle;

/// Floor `epoch_secs` to the start of its `hours`-wide UTC-aligned bucket.
#[must_use]
pub fn bucket_hours(epoch_secs: i64, hours: i64) -> i64 {
    let bucket_secs = hours * 3600;
    epoch_secs.div_euclid(bucket_secs) * bucket_secs
}

/// Resample a series of 1h candles into 4h candles: first/open, max/high,
/// min/low, last/close, sum/volume. Assumes `candles` is already sorted
/// ascending by `time`.
#[must_use]
pub fn resample_to_4h(candles: &[Candle]) -> Vec<Candle> {
    resample_by(candles, |c| bucket_hours(c.time, 4))
}

fn resample_by(candles: &[Candle], bucket_of: impl Fn(&Candle) -> i64) -> Vec<Candle> {
    let mut out: Vec<Candle> = Vec::new();
    let mut current_bucket: Option<i64> = None;
    for c in candles {
        let bucket = bucket_of(c);
        if current_bucket == Some(bucket) {
            let agg = out.last_mut().expect("current_bucket implies a pushed entry");
            agg.high = agg.high.max(c.high);
            agg.low = agg.low.min(c.low);
            agg.close = c.close;
            agg.volume += c.volume;
        } else {
            out.push(Candle {
                time: bucket,
                open: c.open,
                high: c.high,
                low: c.low,
                close: c.close,
                volume: c.volume,
            });
            current_bucket = Some(bucket);
        }
    }
    out
}
