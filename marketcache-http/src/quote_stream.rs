//! The quote-group push loop backing `/api/stream/quotes`: content-diff
//! suppression and a 30s keep-alive, mirroring the payload stream engine's
//! shape (§4.8) but built directly over `get_quotes` since quote groups
//! have no single `PayloadKey` to project a delta from.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::time::{Duration, Instant};

use marketcache_service::{MarketCacheService, QuotesResult};
use tokio::sync::mpsc;

const TICK: Duration = Duration::from_secs(5);
const KEEPALIVE_AFTER: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub enum QuoteFrame {
    Data(QuotesResult),
    KeepAlive,
}

pub async fn run(
    service: Arc<MarketCacheService>,
    symbols: Vec<String>,
    ext: bool,
    tx: mpsc::Sender<QuoteFrame>,
) {
    let mut ticker = tokio::time::interval(TICK);
    let mut last_signature: Option<u64> = None;
    let mut last_emit = Instant::now();

    loop {
        ticker.tick().await;
        let result = service.get_quotes(&symbols, ext).await;
        let sig = signature(&result);
        if last_signature != Some(sig) {
            last_signature = Some(sig);
            last_emit = Instant::now();
            if tx.send(QuoteFrame::Data(result)).await.is_err() {
                break;
            }
            continue;
        }
        if last_emit.elapsed() >= KEEPALIVE_AFTER {
            last_emit = Instant::now();
            if tx.send(QuoteFrame::KeepAlive).await.is_err() {
                break;
            }
        }
    }
}

fn signature(result: &QuotesResult) -> u64 {
    let mut hasher = DefaultHasher::new();
    result.stale.hash(&mut hasher);
    for (symbol, quote) in &result.quotes {
        symbol.hash(&mut hasher);
        quote.last_ts.hash(&mut hasher);
        quote.price.to_bits().hash(&mut hasher);
        quote.change.to_bits().hash(&mut hasher);
    }
    hasher.finish()
}
