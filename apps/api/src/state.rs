use std::sync::Arc;

use crate::config::Config;
use crate::packing::cache::ResultCache;
use crate::packing::registry::PackSetRegistry;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub registry: PackSetRegistry,
    /// Memoized breakdowns keyed by (version hash, amount). Never authoritative for catalogs.
    pub cache: Arc<ResultCache>,
    pub config: Config,
}

impl AppState {
    pub fn new(registry: PackSetRegistry, config: Config) -> Self {
        Self {
            registry,
            cache: Arc::new(ResultCache::new(config.result_cache_capacity)),
            config,
        }
    }
}
