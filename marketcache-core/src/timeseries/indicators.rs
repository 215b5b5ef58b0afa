//! Derived indicator computation: SMA, EMA, Wilder-style RSI, and VWAP.
//! Leading warm-up bars that lack enough history are simply omitted from
//! the output rather than zero-padded.

use std::collections::BTreeMap;

use crate::types::{Candle, IndicatorKind, IndicatorPoint};

/// Simple moving average over `period` closes.
#[must_use]
pub fn sma(candles: &[Candle], period: usize) -> Vec<IndicatorPoint> {
    if period == 0 || candles.len() < period {
        return Vec::new();
    }
    let mut out = Vec::with_capacity(candles.len() - period + 1);
    let mut window_sum: f64 = candles[..period].iter().map(|c| c.close).sum();
    out.push(IndicatorPoint {
        time: candles[period - 1].time,
        value: window_sum / period as f64,
    });
    for i in period..candles.len() {
        window_sum += candles[i].close - candles[i - period].close;
        out.push(IndicatorPoint {
            time: candles[i].time,
            value: window_sum / period as f64,
        });
    }
    out
}

/// Span-adjusted exponential moving average, seeded with the first close.
#[must_use]
pub fn ema(candles: &[Candle], period: usize) -> Vec<IndicatorPoint> {
    if candles.is_empty() || period == 0 {
        return Vec::new();
    }
    let alpha = 2.0 / (period as f64 + 1.0);
    let mut out = Vec::with_capacity(candles.len());
    let mut value = candles[0].close;
    out.push(IndicatorPoint {
        time: candles[0].time,
        value,
    });
    for c in &candles[1..] {
        value = alpha * c.close + (1.0 - alpha) * value;
        out.push(IndicatorPoint {
            time: c.time,
            value,
        });
    }
    out
}

/// Wilder-style RSI: rolling average gain/loss ratio over `period` bars.
#[must_use]
pub fn rsi(candles: &[Candle], period: usize) -> Vec<IndicatorPoint> {
    if period == 0 || candles.len() <= period {
        return Vec::new();
    }
    let mut gains = Vec::with_capacity(candles.len() - 1);
    let mut losses = Vec::with_capacity(candles.len() - 1);
    for w in candles.windows(2) {
        let delta = w[1].close - w[0].close;
        gains.push(delta.max(0.0));
        losses.push((-delta).max(0.0));
    }
    let mut out = Vec::with_capacity(gains.len() - period + 1);
    for i in period..=gains.len() {
        let window_gain: f64 = gains[i - period..i].iter().sum::<f64>() / period as f64;
        let window_loss: f64 = losses[i - period..i].iter().sum::<f64>() / period as f64;
        let value = if window_loss == 0.0 {
            if window_gain == 0.0 { 50.0 } else { 100.0 }
        } else {
            let rs = window_gain / window_loss;
            100.0 - 100.0 / (1.0 + rs)
        };
        out.push(IndicatorPoint {
            time: candles[i].time,
            value,
        });
    }
    out
}

/// Cumulative volume-weighted average price, using typical price
/// `(high+low+close)/3`. Bars with zero volume are treated as missing and
/// excluded from the running totals rather than producing a divide-by-zero.
#[must_use]
pub fn vwap(candles: &[Candle]) -> Vec<IndicatorPoint> {
    let mut cum_vol = 0.0;
    let mut cum_typical_volume = 0.0;
    let mut out = Vec::with_capacity(candles.len());
    for c in candles {
        if c.volume > 0.0 {
            let typical = (c.high + c.low + c.close) / 3.0;
            cum_vol += c.volume;
            cum_typical_volume += typical * c.volume;
        }
        if cum_vol > 0.0 {
            out.push(IndicatorPoint {
                time: c.time,
                value: cum_typical_volume / cum_vol,
            });
        }
    }
    out
}

/// Compute every indicator series for a cleaned candle series, keyed by
/// wire name.
#[must_use]
pub fn compute_all_indicators(candles: &[Candle]) -> BTreeMap<&'static str, Vec<IndicatorPoint>> {
    let mut out = BTreeMap::new();
    out.insert(IndicatorKind::Sma20.wire_key(), sma(candles, 20));
    out.insert(IndicatorKind::Sma50.wire_key(), sma(candles, 50));
    out.insert(IndicatorKind::Sma200.wire_key(), sma(candles, 200));
    out.insert(IndicatorKind::Ema12.wire_key(), ema(candles, 12));
    out.insert(IndicatorKind::Ema26.wire_key(), ema(candles, 26));
    out.insert(IndicatorKind::Rsi14.wire_key(), rsi(candles, 14));
    out.insert(IndicatorKind::Vwap.wire_key(), vwap(candles));
    out
}
