//! Regular-trading-hours vs extended-hours session splitting, computed in
//! US/Eastern regardless of the symbol's actual listing exchange (a
//! deliberate simplification; see design notes).

use std::collections::BTreeMap;

use chrono::{TimeZone, Timelike, Utc};
use chrono_tz::US::Eastern;

use crate::types::{Candle, Session};

/// Classify an epoch-second timestamp into RTH, pre-market, or post-market,
/// using US/Eastern wall-clock time.
#[must_use]
pub fn session_kind(epoch_secs: i64) -> Session {
    let Some(utc) = Utc.timestamp_opt(epoch_secs, 0).single() else {
        return Session::Post;
    };
    let et = utc.with_timezone(&Eastern);
    let (h, m) = (et.hour(), et.minute());
    let in_rth = (h > 9 || (h == 9 && m >= 30)) && (h < 16 || (h == 16 && m == 0));
    if in_rth {
        Session::Rth
    } else if h < 9 || (h == 9 && m < 30) {
        Session::Pre
    } else {
        Session::Post
    }
}

#[must_use]
fn is_rth(epoch_secs: i64) -> bool {
    matches!(session_kind(epoch_secs), Session::Rth)
}

/// Split a candle series into (RTH, extended) by US/Eastern session
/// boundaries. Timestamps are deduplicated first, preferring the last
/// occurrence, so a timestamp can never land in both series.
#[must_use]
pub fn split_sessions(candles: &[Candle]) -> (Vec<Candle>, Vec<Candle>) {
    let mut by_time: BTreeMap<i64, Candle> = BTreeMap::new();
    for c in candles {
        by_time.insert(c.time, *c);
    }
    let mut rth = Vec::new();
    let mut ext = Vec::new();
    for (time, c) in by_time {
        if is_rth(time) {
            rth.push(c);
        } else {
            ext.push(c);
        }
    }
    (rth, ext)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone};

    fn et_epoch(hour: u32, minute: u32) -> i64 {
        let naive = NaiveDate::from_ymd_opt(2024, 6, 10)
            .unwrap()
            .and_hms_opt(hour, minute, 0)
            .unwrap();
        Eastern
            .from_local_datetime(&naive)
            .single()
            .unwrap()
            .with_timezone(&Utc)
            .timestamp()
    }

    #[test]
    fn classifies_market_open_as_rth() {
        assert_eq!(session_kind(et_epoch(9, 30)), Session::Rth);
        assert_eq!(session_kind(et_epoch(16, 0)), Session::Rth);
    }

    #[test]
    fn classifies_before_open_as_pre() {
        assert_eq!(session_kind(et_epoch(8, 0)), Session::Pre);
        assert_eq!(session_kind(et_epoch(9, 29)), Session::Pre);
    }

    #[test]
    fn classifies_after_close_as_post() {
        assert_eq!(session_kind(et_epoch(16, 1)), Session::Post);
        assert_eq!(session_kind(et_epoch(20, 0)), Session::Post);
    }

    #[test]
    fn split_sessions_is_disjoint_and_exhaustive() {
        let candles: Vec<Candle> = [et_epoch(8, 0), et_epoch(10, 0), et_epoch(18, 0)]
            .into_iter()
            .map(|time| Candle {
                time,
                open: 1.0,
                high: 1.0,
                low: 1.0,
                close: 1.0,
                volume: 1.0,
            })
            .collect();
        let (rth, ext) = split_sessions(&candles);
        assert_eq!(rth.len(), 1);
        assert_eq!(ext.len(), 2);
    }
}
