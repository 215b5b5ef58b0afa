//! Quote derivation from upstream 1-minute intraday data.

use crate::timeseries::session_kind;
use crate::types::{Candle, Quote, Session, SymbolMetadata};

const SPARK_LEN: usize = 30;

/// Derive a lightweight quote from a 1-minute candle series and symbol
/// metadata, per §4.3's quote-derivation rules.
#[must_use]
pub fn derive_quote(candles: &[Candle], metadata: &SymbolMetadata, include_prepost: bool) -> Option<Quote> {
    let last = candles.last()?;
    let spark: Vec<f64> = candles
        .iter()
        .rev()
        .take(SPARK_LEN)
        .map(|c| c.close)
        .rev()
        .collect();

    let session = if include_prepost {
        session_kind(last.time)
    } else {
        Session::Rth
    };

    let latest_rth_close = candles
        .iter()
        .rev()
        .find(|c| matches!(session_kind(c.time), Session::Rth))
        .map(|c| c.close);

    let rth_price = latest_rth_close.or(metadata.prev_close).unwrap_or(last.close);

    let ext_price = if !matches!(session, Session::Rth) {
        Some(last.close)
    } else {
        None
    };

    let display_price = if include_prepost {
        ext_price.unwrap_or(rth_price)
    } else {
        rth_price
    };

    let prev_session_close = candles
        .len()
        .checked_sub(2)
        .map(|idx| candles[idx].close);

    let base = match metadata.prev_close {
        Some(pc) if (pc - display_price).abs() > 1e-9 => pc,
        _ => prev_session_close.or(metadata.prev_close).unwrap_or(0.0),
    };

    let change = display_price - base;
    let change_pct = if base == 0.0 { 0.0 } else { change / base * 100.0 };

    let (rth_change, rth_change_pct) = change_against(rth_price, base);
    let (ext_change, ext_change_pct) = match ext_price {
        Some(p) => {
            let (c, p2) = change_against(p, base);
            (Some(c), Some(p2))
        }
        None => (None, None),
    };

    Some(Quote {
        price: display_price,
        change,
        change_pct,
        spark,
        exchange: metadata.exchange.clone(),
        name: metadata.name.clone(),
        currency: metadata.currency.clone(),
        session,
        last_ts: last.time,
        rth_price: Some(rth_price),
        ext_price,
        ext_change,
        ext_change_pct,
        rth_change: Some(rth_change),
        rth_change_pct: Some(rth_change_pct),
    })
}

fn change_against(price: f64, base: f64) -> (f64, f64) {
    let change = price - base;
    let pct = if base == 0.0 { 0.0 } else { change / base * 100.0 };
    (change, pct)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candle(time: i64, close: f64) -> Candle {
        Candle {
            time,
            open: close,
            high: close + 0.1,
            low: close - 0.1,
            close,
            volume: 100.0,
        }
    }

    #[test]
    fn uses_prev_close_as_change_base_when_distinct() {
        let candles = vec![candle(0, 99.0), candle(60, 100.0)];
        let meta = SymbolMetadata {
            prev_close: Some(95.0),
            ..Default::default()
        };
        let quote = derive_quote(&candles, &meta, false).unwrap();
        assert!((quote.change - 5.0).abs() < 1e-9);
    }

    #[test]
    fn spark_caps_at_thirty_entries() {
        let candles: Vec<Candle> = (0..50).map(|i| candle(i * 60, i as f64)).collect();
        let meta = SymbolMetadata::default();
        let quote = derive_quote(&candles, &meta, false).unwrap();
        assert_eq!(quote.spark.len(), 30);
        assert_eq!(*quote.spark.last().unwrap(), 49.0);
    }

    #[test]
    fn empty_series_yields_none() {
        let meta = SymbolMetadata::default();
        assert!(derive_quote(&[], &meta, false).is_none());
    }
}
