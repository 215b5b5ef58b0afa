//! The Stream Engine (§4.8): one push loop per subscription, ticking at a
//! timeframe-dependent interval, suppressing no-change frames via a content
//! signature, and emitting keep-alives when nothing changed.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::time::{Duration, Instant};

use marketcache_cache::PayloadStore;
use marketcache_core::{Candle, Delta, IndicatorPoint, PayloadKey, VolumeBar};
use tokio::sync::{mpsc, watch};

use crate::delta::{is_empty, project_delta};

/// A frame pushed to a stream subscriber.
#[derive(Debug, Clone)]
pub enum StreamFrame {
    Data(Delta),
    Error {
        symbol: String,
        timeframe: &'static str,
        ext: bool,
        message: String,
    },
    KeepAlive,
}

/// Run one subscription's push loop until the stop signal fires or the
/// receiving end of `tx` is dropped. Returns the final watermark, mostly
/// useful in tests.
pub async fn run_subscription(
    store: Arc<PayloadStore>,
    key: PayloadKey,
    initial_since: i64,
    mut stop: watch::Receiver<bool>,
    tx: mpsc::Sender<StreamFrame>,
) -> i64 {
    let mut since_ts = initial_since.max(0);
    let keepalive_after = store.config().stream_keepalive;
    let tick = Duration::from_secs(key.timeframe.stream_tick_secs());
    let mut ticker = tokio::time::interval(tick);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    let mut last_signature: Option<u64> = None;
    let mut last_emit = Instant::now();
    let mut currently_failing = false;

    loop {
        tokio::select! {
            biased;
            changed = stop.changed() => {
                if changed.is_err() || *stop.borrow() {
                    break;
                }
            }
            _ = ticker.tick() => {}
        }

        store.hot_keys.touch(key.clone());

        match store.get_payload(key.clone()).await {
            Ok(payload) => {
                currently_failing = false;
                let delta = project_delta(&payload, since_ts);
                if !is_empty(&delta) {
                    let sig = signature(&delta);
                    if last_signature != Some(sig) {
                        since_ts = since_ts.max(delta.latest_time);
                        last_signature = Some(sig);
                        last_emit = Instant::now();
                        if tx.send(StreamFrame::Data(delta)).await.is_err() {
                            break;
                        }
                        continue;
                    }
                }
            }
            Err(err) => {
                if !currently_failing {
                    currently_failing = true;
                    last_emit = Instant::now();
                    let frame = StreamFrame::Error {
                        symbol: key.symbol.to_string(),
                        timeframe: key.timeframe.as_str(),
                        ext: key.ext,
                        message: err.to_string(),
                    };
                    if tx.send(frame).await.is_err() {
                        break;
                    }
                    continue;
                }
            }
        }

        if last_emit.elapsed() >= keepalive_after {
            last_emit = Instant::now();
            if tx.send(StreamFrame::KeepAlive).await.is_err() {
                break;
            }
        }
    }

    since_ts
}

/// A compact signature over the tail of every series plus `latest_time`,
/// used to suppress frames with no observable change.
fn signature(delta: &Delta) -> u64 {
    let mut hasher = DefaultHasher::new();
    delta.latest_time.hash(&mut hasher);
    hash_candle_tail(&delta.candles, &mut hasher);
    hash_candle_tail(&delta.ext_candles, &mut hasher);
    hash_volume_tail(&delta.volume, &mut hasher);
    for (key, points) in &delta.indicators {
        key.hash(&mut hasher);
        hash_indicator_tail(points, &mut hasher);
    }
    hasher.finish()
}

const TAIL: usize = 3;

fn hash_candle_tail(candles: &[Candle], hasher: &mut DefaultHasher) {
    for c in candles.iter().rev().take(TAIL) {
        c.time.hash(hasher);
        c.close.to_bits().hash(hasher);
        c.volume.to_bits().hash(hasher);
    }
}

fn hash_volume_tail(bars: &[VolumeBar], hasher: &mut DefaultHasher) {
    for v in bars.iter().rev().take(TAIL) {
        v.time.hash(hasher);
        v.value.to_bits().hash(hasher);
    }
}

fn hash_indicator_tail(points: &[IndicatorPoint], hasher: &mut DefaultHasher) {
    for p in points.iter().rev().take(TAIL) {
        p.time.hash(hasher);
        p.value.to_bits().hash(hasher);
    }
}
