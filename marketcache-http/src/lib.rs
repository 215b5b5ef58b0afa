//! The HTTP transport (§6): route wiring, SSE encoding, rate-limit headers,
//! and the error-taxonomy-to-status mapping. Owns no business logic —
//! everything here delegates to `marketcache_service::MarketCacheService`.

pub mod error;
pub mod params;
pub mod quote_stream;
pub mod routes;
pub mod sse;
pub mod state;

pub use routes::router;
pub use state::AppState;
