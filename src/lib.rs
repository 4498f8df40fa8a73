//! Court pricing service.
//!
//! The [`pricing`] module is a pure engine (no I/O). The rest of the crate
//! exposes it over HTTP with a per-institution catalog cache.

pub mod cache;
pub mod config;
pub mod error;
pub mod pricing;

use std::sync::Arc;

use axum::{extract::State, routing::get, Json, Router};
use serde_json::{json, Value};
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};

use crate::cache::CatalogCache;
use crate::config::Config;
use crate::pricing::QuoteSettings;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub cache: CatalogCache,
    pub settings: Arc<QuoteSettings>,
}

impl AppState {
    pub fn new(cache: CatalogCache, settings: QuoteSettings) -> Self {
        Self {
            cache,
            settings: Arc::new(settings),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            CatalogCache::new(config.cache_capacity, config.cache_ttl),
            config.settings.clone(),
        )
    }
}

pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .merge(pricing::router())
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health(State(state): State<AppState>) -> Json<Value> {
    let stats = state.cache.stats().await;
    Json(json!({
        "status": "ok",
        "catalogs": stats.catalogs,
    }))
}
