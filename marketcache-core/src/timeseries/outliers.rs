//! Conservative outlier suppression for intraday and extended-hours bars.
//! Both rules are deliberately tuned to drop one-off bad prints while
//! preserving real gaps and real moves.

use crate::types::Candle;

fn median_sorted(sorted: &[f64]) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let n = sorted.len();
    if n % 2 == 1 {
        sorted[n / 2]
    } else {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    }
}

/// Linear-interpolation quantile matching pandas' default `Series.quantile`.
fn quantile_sorted(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    if sorted.len() == 1 {
        return sorted[0];
    }
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    if lo == hi {
        sorted[lo]
    } else {
        let frac = pos - lo as f64;
        sorted[lo] + (sorted[hi] - sorted[lo]) * frac
    }
}

/// Drop a bar only when it deviates sharply from a rolling median baseline
/// AND has an abnormally wide range AND the next bar does not confirm the
/// move. Applies a 48-bar rolling median with expanding fallback during
/// warm-up.
#[must_use]
pub fn suppress_intraday_outliers(candles: &[Candle]) -> Vec<Candle> {
    const WINDOW: usize = 48;
    let mut out = Vec::with_capacity(candles.len());
    for i in 0..candles.len() {
        let c = candles[i];
        let window_start = i.saturating_sub(WINDOW);
        let window = &candles[window_start..i];
        if window.is_empty() {
            out.push(c);
            continue;
        }
        let mut closes: Vec<f64> = window.iter().map(|x| x.close).collect();
        closes.sort_by(|a, b| a.partial_cmp(b).unwrap());
        let baseline = median_sorted(&closes);
        if baseline <= 0.0 {
            out.push(c);
            continue;
        }
        let deviation = (c.close - baseline).abs() / baseline;
        let range_ratio = (c.high - c.low) / baseline;
        let looks_like_bad_print = deviation > 0.35 && range_ratio > 0.03;
        if looks_like_bad_print {
            let next_confirms = candles
                .get(i + 1)
                .map(|next| c.close > 0.0 && (next.close - c.close).abs() / c.close <= 0.12)
                .unwrap_or(false);
            if !next_confirms {
                continue;
            }
        }
        out.push(c);
    }
    out
}

/// Keep an extended-hours bar only if its range is within a threshold
/// derived from the recent RTH range distribution, or its volume is large
/// enough to be credible on its own.
#[must_use]
pub fn suppress_ext_outliers(ext: &[Candle], rth_reference: &[Candle]) -> Vec<Candle> {
    if ext.is_empty() || rth_reference.is_empty() {
        return ext.to_vec();
    }
    let recent: Vec<&Candle> = rth_reference.iter().rev().take(200).collect();
    let mut ranges: Vec<f64> = recent.iter().map(|c| c.high - c.low).collect();
    ranges.sort_by(|a, b| a.partial_cmp(b).unwrap());
    if ranges.is_empty() {
        return ext.to_vec();
    }
    let median = median_sorted(&ranges);
    let q1 = quantile_sorted(&ranges, 0.25);
    let q3 = quantile_sorted(&ranges, 0.75);
    let iqr = q3 - q1;
    let base_threshold = if iqr > 0.0 {
        median + 4.0 * iqr
    } else {
        median * 4.0
    };
    let last_rth_close = rth_reference.last().map(|c| c.close).unwrap_or(0.0);
    let pct_threshold = last_rth_close * 0.015;
    let threshold = base_threshold.max(pct_threshold);

    let mut volumes: Vec<f64> = recent.iter().map(|c| c.volume).collect();
    volumes.sort_by(|a, b| a.partial_cmp(b).unwrap());
    let volume_median = median_sorted(&volumes);

    ext.iter()
        .filter(|c| {
            let range = c.high - c.low;
            range <= threshold || c.volume > volume_median * 0.10
        })
        .copied()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candle(time: i64, close: f64) -> Candle {
        Candle {
            time,
            open: close,
            high: close * 1.001,
            low: close * 0.999,
            close,
            volume: 1000.0,
        }
    }

    #[test]
    fn drops_single_bad_tick_that_reverts() {
        let mut candles: Vec<Candle> = (0..60).map(|i| candle(i, 100.0)).collect();
        candles[50] = Candle {
            time: 50,
            open: 100.0,
            high: 145.0,
            low: 95.0,
            close: 140.0,
            volume: 1000.0,
        };
        let cleaned = suppress_intraday_outliers(&candles);
        assert!(!cleaned.iter().any(|c| c.time == 50));
        assert_eq!(cleaned.len(), candles.len() - 1);
    }

    #[test]
    fn preserves_real_five_percent_move() {
        let mut candles: Vec<Candle> = (0..60).map(|i| candle(i, 100.0)).collect();
        for i in 50..60 {
            candles[i] = candle(i as i64, 105.0);
        }
        let cleaned = suppress_intraday_outliers(&candles);
        assert_eq!(cleaned.len(), candles.len());
    }

    #[test]
    fn ext_outliers_filtered_against_rth_reference() {
        let rth: Vec<Candle> = (0..200).map(|i| candle(i, 100.0)).collect();
        let ext = vec![
            candle(300, 100.2),
            Candle {
                time: 301,
                open: 100.0,
                high: 140.0,
                low: 95.0,
                close: 138.0,
                volume: 10.0,
            },
        ];
        let cleaned = suppress_ext_outliers(&ext, &rth);
        assert_eq!(cleaned.len(), 1);
        assert_eq!(cleaned[0].time, 300);
    }

    use proptest::prelude::*;

    fn arb_candle(time: i64) -> impl Strategy<Value = Candle> {
        (1.0f64..1_000.0, 0.0f64..20.0, 0.0f64..1_000_000.0).prop_map(move |(base, spread, volume)| {
            Candle {
                time,
                open: base,
                high: base + spread,
                low: (base - spread).max(0.01),
                close: base,
                volume,
            }
        })
    }

    fn arb_candle_series(len: usize) -> impl Strategy<Value = Vec<Candle>> {
        (0..len)
            .map(|i| arb_candle(i as i64))
            .collect::<Vec<_>>()
    }

    proptest! {
        // Outlier suppression only ever removes bars, and never reorders or
        // duplicates the ones it keeps.
        #[test]
        fn intraday_suppression_never_grows_or_reorders(candles in arb_candle_series(80)) {
            let cleaned = suppress_intraday_outliers(&candles);
            prop_assert!(cleaned.len() <= candles.len());
            let mut last_time = i64::MIN;
            for c in &cleaned {
                prop_assert!(c.time > last_time, "suppression reordered or duplicated a bar");
                last_time = c.time;
            }
        }

        // Every surviving bar is one of the original bars, not a synthesized one.
        #[test]
        fn ext_suppression_only_keeps_bars_present_in_input(
            ext in arb_candle_series(20),
            rth in arb_candle_series(50),
        ) {
            let cleaned = suppress_ext_outliers(&ext, &rth);
            prop_assert!(cleaned.len() <= ext.len());
            for c in &cleaned {
                prop_assert!(ext.iter().any(|e| e.time == c.time));
            }
        }
    }
}
