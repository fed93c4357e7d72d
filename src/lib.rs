// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod model;
pub mod error;
pub mod config;

// Analytics pipeline (normalize -> classify -> enrich -> aggregate/trends -> engine)
pub mod normalize;
pub mod classify;
pub mod enrich;
pub mod aggregate;
pub mod trends;
pub mod engine;

// Collaborators and their implementations
pub mod analysis;
pub mod cache;
pub mod provider;
pub mod tenant;

// HTTP surface
pub mod api;
pub mod metrics;

// ---- Re-exports for stable public API ----
pub use crate::api::create_router;
pub use crate::engine::{AnalyticsEngine, AnalyticsSnapshot, EngineSettings};
pub use crate::error::AnalyticsError;

use std::sync::Arc;

use anyhow::{Context, Result};

use crate::analysis::memory::InMemoryAnalysisStore;
use crate::cache::MokaAnalyticsCache;
use crate::config::AppConfig;
use crate::provider::vapi::VapiClient;
use crate::tenant::StaticTenantResolver;

/// Wire the production engine from configuration.
pub fn build_engine(cfg: &AppConfig) -> Result<AnalyticsEngine> {
    if cfg.provider.api_key.is_empty() {
        tracing::warn!("provider api key is empty; provider calls will be rejected");
    }
    let provider = VapiClient::new(cfg.provider.base_url.clone(), cfg.provider.api_key.clone())
        .context("building provider client")?;
    let tenants = StaticTenantResolver::new(cfg.tenants.clone());

    let mut engine = AnalyticsEngine::new(
        Arc::new(provider),
        Arc::new(tenants),
        EngineSettings::from_config(cfg),
    );

    if let Some(path) = cfg.analysis_store.path.as_deref() {
        let store = InMemoryAnalysisStore::load_from_file(path)?;
        engine = engine.with_store(Arc::new(store));
    }
    if cfg.cache.enabled {
        engine = engine.with_cache(Arc::new(MokaAnalyticsCache::new(cfg.cache.max_capacity)));
    }
    Ok(engine)
}

/// Router with app state built from configuration (no `/metrics`).
pub fn app(cfg: &AppConfig) -> Result<axum::Router> {
    let engine = build_engine(cfg)?;
    Ok(create_router(api::AppState {
        engine: Arc::new(engine),
        default_days: cfg.analytics.default_days,
        default_limit: cfg.analytics.default_limit,
    }))
}
