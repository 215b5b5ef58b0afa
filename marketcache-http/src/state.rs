use std::sync::Arc;

use marketcache_service::MarketCacheService;

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<MarketCacheService>,
}

impl AppState {
    #[must_use]
    pub fn new(service: Arc<MarketCacheService>) -> Self {
        Self { service }
    }
}
