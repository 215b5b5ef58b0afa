//! The Delta Projector (§4.7): filters a cached payload down to the entries
//! at or after a caller-supplied watermark.

use marketcache_core::{Delta, Payload};

/// Project `payload` against `since_ts`: every series is filtered to
/// `time >= since_ts`, and `latest_time` is the maximum `time` across all
/// filtered series (0 if every series is empty).
#[must_use]
pub fn project_delta(payload: &Payload, since_ts: i64) -> Delta {
    let candles: Vec<_> = payload
        .candles
        .iter()
        .filter(|c| c.time >= since_ts)
        .copied()
        .collect();
    let ext_candles: Vec<_> = payload
        .ext_candles
        .iter()
        .filter(|c| c.time >= since_ts)
        .copied()
        .collect();
    let volume: Vec<_> = payload
        .volume
        .iter()
        .filter(|v| v.time >= since_ts)
        .copied()
        .collect();
    let indicators = payload
        .indicators
        .iter()
        .map(|(key, points)| {
            let filtered: Vec<_> = points.iter().filter(|p| p.time >= since_ts).copied().collect();
            (*key, filtered)
        })
        .collect::<std::collections::BTreeMap<_, _>>();

    let mut latest_time = 0i64;
    for c in candles.iter().chain(ext_candles.iter()) {
        latest_time = latest_time.max(c.time);
    }
    for v in &volume {
        latest_time = latest_time.max(v.time);
    }
    for points in indicators.values() {
        if let Some(last) = points.last() {
            latest_time = latest_time.max(last.time);
        }
    }

    Delta {
        symbol: payload.symbol.clone(),
        timeframe: payload.timeframe,
        ext: payload.ext_effective,
        delta: true,
        since: since_ts.max(0),
        latest_time,
        candles,
        ext_candles,
        indicators,
        volume,
    }
}

/// True when every series in the delta is empty — the stream engine treats
/// this as "nothing new to emit".
#[must_use]
pub fn is_empty(delta: &Delta) -> bool {
    delta.candles.is_empty()
        && delta.ext_candles.is_empty()
        && delta.volume.is_empty()
        && delta.indicators.values().all(Vec::is_empty)
}

#[cfg(test)]
mod tests {
    use super::*;
    use marketcache_core::{Candle, Timeframe, VolumeBar, VolumeColor};

    fn payload_with(times: &[i64]) -> Payload {
        let candles: Vec<Candle> = times
            .iter()
            .map(|&t| Candle {
                time: t,
                open: 1.0,
                high: 1.0,
                low: 1.0,
                close: 1.0,
                volume: 1.0,
            })
            .collect();
        let volume = candles
            .iter()
            .map(|c| VolumeBar {
                time: c.time,
                value: c.volume,
                color: VolumeColor::Up,
            })
            .collect();
        Payload {
            symbol: marketcache_core::Symbol::normalize("AAPL").unwrap(),
            timeframe: Timeframe::M5,
            ext_effective: false,
            candles,
            ext_candles: Vec::new(),
            indicators: std::collections::BTreeMap::new(),
            volume,
        }
    }

    #[test]
    fn filters_to_entries_at_or_after_watermark() {
        let payload = payload_with(&[100, 200, 300]);
        let delta = project_delta(&payload, 200);
        assert_eq!(delta.candles.len(), 2);
        assert_eq!(delta.latest_time, 300);
    }

    #[test]
    fn since_greater_than_every_time_yields_empty_delta_and_zero_latest() {
        let payload = payload_with(&[100, 200]);
        let delta = project_delta(&payload, 1_000);
        assert!(is_empty(&delta));
        assert_eq!(delta.latest_time, 0);
    }

    #[test]
    fn repeated_projection_is_idempotent() {
        let payload = payload_with(&[100, 200, 300]);
        let first = project_delta(&payload, 150);
        let second = project_delta(&payload, 150);
        assert_eq!(first.latest_time, second.latest_time);
        assert_eq!(first.candles.len(), second.candles.len());
    }

    #[test]
    fn later_watermark_yields_a_subset_of_earlier_watermark() {
        let payload = payload_with(&[100, 200, 300, 400]);
        let early = project_delta(&payload, 100);
        let late = project_delta(&payload, 300);
        assert!(late.candles.len() <= early.candles.len());
    }

    use proptest::prelude::*;

    fn arb_times() -> impl Strategy<Value = Vec<i64>> {
        prop::collection::vec(0i64..2_000, 0..40).prop_map(|mut times| {
            times.sort_unstable();
            times.dedup();
            times
        })
    }

    proptest! {
        // Projecting the same payload at the same watermark twice must yield
        // the exact same delta: no side effects, no hidden clock dependence.
        #[test]
        fn projection_is_idempotent(times in arb_times(), since in 0i64..2_500) {
            let payload = payload_with(&times);
            let first = project_delta(&payload, since);
            let second = project_delta(&payload, since);
            prop_assert_eq!(first.latest_time, second.latest_time);
            prop_assert_eq!(first.candles.len(), second.candles.len());
            prop_assert_eq!(first.volume.len(), second.volume.len());
        }

        // Raising the watermark can only shrink (never grow) what gets
        // emitted, and every kept candle still satisfies time >= since.
        #[test]
        fn raising_the_watermark_only_shrinks_the_delta(
            times in arb_times(),
            since_a in 0i64..2_500,
            bump in 0i64..500,
        ) {
            let since_b = since_a + bump;
            let payload = payload_with(&times);
            let early = project_delta(&payload, since_a);
            let late = project_delta(&payload, since_b);
            prop_assert!(late.candles.len() <= early.candles.len());
            prop_assert!(late.candles.iter().all(|c| c.time >= since_b));
        }
    }
}
