//! The transform pipeline: converts a raw upstream frame into a canonical
//! `Payload` for one `(symbol, timeframe, ext)` key.

use crate::error::{ServiceError, ServiceResult};
use crate::timeseries::{
    compute_all_indicators, resample_to_4h, session_kind, split_sessions,
    suppress_ext_outliers, suppress_intraday_outliers,
};
use crate::types::{Candle, Payload, RawFrame, Session, Symbol, Timeframe, VolumeBar, VolumeColor};

/// Build a canonical `Payload` from a raw frame that has already passed the
/// minimum-bar-count check (callers are responsible for the re-download /
/// fallback-period step in §4.3 step 2, since it requires another upstream
/// round trip that this pure function cannot perform).
pub fn build_payload(
    symbol: &Symbol,
    timeframe: Timeframe,
    ext_requested: bool,
    is_session_bound: bool,
    raw: RawFrame,
) -> ServiceResult<Payload> {
    if raw.is_empty() {
        return Err(ServiceError::not_found(format!(
            "{symbol} yielded no data for {}",
            timeframe.as_str()
        )));
    }

    let mut candles = raw.candles;
    candles.sort_by_key(|c| c.time);
    candles.dedup_by_key(|c| c.time);

    if timeframe.is_intraday() && is_session_bound {
        candles = suppress_intraday_outliers(&candles);
    }

    if timeframe.needs_hourly_resample() {
        candles = resample_to_4h(&candles);
    }

    let indicators = compute_all_indicators(&candles);
    let volume = build_volume_bars(&candles);

    let ext_effective = ext_requested && is_session_bound && timeframe.supports_session_split();

    let (candles, ext_candles) = if ext_effective {
        let (rth, mut ext) = split_sessions(&candles);
        ext = suppress_ext_outliers(&ext, &rth);
        (rth, ext)
    } else {
        (candles, Vec::new())
    };

    Ok(Payload {
        symbol: symbol.clone(),
        timeframe,
        ext_effective,
        candles,
        ext_candles,
        indicators,
        volume,
    })
}

fn build_volume_bars(candles: &[Candle]) -> Vec<VolumeBar> {
    candles
        .iter()
        .map(|c| VolumeBar {
            time: c.time,
            value: c.volume,
            color: if c.close >= c.open {
                VolumeColor::Up
            } else {
                VolumeColor::Down
            },
        })
        .collect()
}

/// Whether a raw frame needs the fallback re-download per §4.3 step 2.
#[must_use]
pub fn needs_fallback_redownload(raw: &RawFrame, timeframe: Timeframe) -> bool {
    match timeframe.min_bars() {
        Some(min_bars) => raw.len() < min_bars && timeframe.fallback_period().is_some(),
        None => false,
    }
}

/// Determine the session of the most recent bar in a series, used for quote
/// derivation.
#[must_use]
pub fn latest_session(candles: &[Candle]) -> Option<Session> {
    candles.last().map(|c| session_kind(c.time))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candle(time: i64, close: f64, volume: f64) -> Candle {
        Candle {
            time,
            open: close,
            high: close + 0.5,
            low: close - 0.5,
            close,
            volume,
        }
    }

    #[test]
    fn empty_raw_frame_is_not_found() {
        let symbol = Symbol::normalize("AAPL").unwrap();
        let err = build_payload(&symbol, Timeframe::M5, false, false, RawFrame::default())
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound { .. }));
    }

    #[test]
    fn candles_strictly_increase_and_ext_disjoint() {
        let symbol = Symbol::normalize("AAPL").unwrap();
        let candles: Vec<Candle> = (0..300).map(|i| candle(i * 60, 100.0, 10.0)).collect();
        let payload =
            build_payload(&symbol, Timeframe::M1, true, true, RawFrame { candles }).unwrap();
        let mut prev = i64::MIN;
        for c in &payload.candles {
            assert!(c.time > prev);
            prev = c.time;
        }
        let ext_times: std::collections::HashSet<i64> =
            payload.ext_candles.iter().map(|c| c.time).collect();
        for c in &payload.candles {
            assert!(!ext_times.contains(&c.time));
        }
    }

    #[test]
    fn h4_timeframe_never_produces_ext_candles() {
        let symbol = Symbol::normalize("AAPL").unwrap();
        let candles: Vec<Candle> = (0..100).map(|i| candle(i * 3600, 100.0, 10.0)).collect();
        let payload =
            build_payload(&symbol, Timeframe::H4, true, true, RawFrame { candles }).unwrap();
        assert!(!payload.ext_effective);
        assert!(payload.ext_candles.is_empty());
    }

    #[test]
    fn crypto_symbol_with_ext_true_never_splits() {
        let symbol = Symbol::normalize("BTC-USD").unwrap();
        let candles: Vec<Candle> = (0..300).map(|i| candle(i * 60, 100.0, 10.0)).collect();
        let payload =
            build_payload(&symbol, Timeframe::M1, true, false, RawFrame { candles }).unwrap();
        assert!(!payload.ext_effective);
        assert!(payload.ext_candles.is_empty());
    }
}
