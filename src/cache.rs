//! In-memory catalog snapshots using moka
//!
//! Each institution's migrated catalog is held as an `Arc<PricingCatalog>`,
//! next to the issues for whatever was left out when it was loaded.
//! Reloading swaps the `Arc`, so quotes already running keep the snapshot
//! they started with.

use moka::future::Cache;
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::pricing::audit::CatalogIssue;
use crate::pricing::migration::StoredCatalog;
use crate::pricing::models::PricingCatalog;
use crate::pricing::services;

/// A loaded catalog and the stored entries that were dropped from it
#[derive(Debug, Clone)]
pub struct CatalogSnapshot {
    pub catalog: Arc<PricingCatalog>,
    pub rejected: Arc<[CatalogIssue]>,
}

/// Institution id -> migrated catalog snapshot
#[derive(Clone)]
pub struct CatalogCache {
    catalogs: Cache<String, CatalogSnapshot>,
}

impl CatalogCache {
    pub fn new(capacity: u64, ttl: Duration) -> Self {
        Self {
            catalogs: Cache::builder()
                .max_capacity(capacity)
                .time_to_live(ttl)
                .build(),
        }
    }

    pub async fn get(&self, institution: &str) -> Option<Arc<PricingCatalog>> {
        self.snapshot(institution).await.map(|snapshot| snapshot.catalog)
    }

    pub async fn snapshot(&self, institution: &str) -> Option<CatalogSnapshot> {
        let hit = self.catalogs.get(institution).await;
        if hit.is_some() {
            tracing::debug!("Cache HIT for catalog: {}", institution);
        } else {
            tracing::debug!("Cache MISS for catalog: {}", institution);
        }
        hit
    }

    pub async fn insert(
        &self,
        institution: &str,
        catalog: PricingCatalog,
        rejected: Vec<CatalogIssue>,
    ) -> Arc<PricingCatalog> {
        let catalog = Arc::new(catalog);
        let snapshot = CatalogSnapshot {
            catalog: catalog.clone(),
            rejected: rejected.into(),
        };
        self.catalogs
            .insert(institution.to_string(), snapshot)
            .await;
        catalog
    }

    /// Drop an institution's snapshot. Returns whether one was cached.
    pub async fn invalidate(&self, institution: &str) -> bool {
        let removed = self.catalogs.remove(institution).await.is_some();
        if removed {
            info!("Cache invalidated for catalog: {}", institution);
        }
        removed
    }

    /// Get cache statistics for monitoring
    pub async fn stats(&self) -> CacheStats {
        self.catalogs.run_pending_tasks().await;
        CacheStats {
            catalogs: self.catalogs.entry_count(),
        }
    }
}

impl Default for CatalogCache {
    fn default() -> Self {
        Self::new(500, Duration::from_secs(60 * 60))
    }
}

/// Cache statistics for the health endpoint
#[derive(Debug, Clone, Serialize)]
pub struct CacheStats {
    pub catalogs: u64,
}

/// Load every `<institution>.json` in `dir` into the cache.
///
/// Files that cannot be read or parsed are logged and skipped. Returns the
/// number of catalogs loaded.
pub async fn warm_catalogs(cache: &CatalogCache, dir: &Path) -> usize {
    info!("Starting catalog warm-up from {}", dir.display());

    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) => {
            warn!("Failed to read catalog directory {}: {}", dir.display(), e);
            return 0;
        }
    };

    let mut loaded = 0;
    loop {
        let entry = match entries.next_entry().await {
            Ok(Some(entry)) => entry,
            Ok(None) => break,
            Err(e) => {
                warn!("Failed to list catalog directory {}: {}", dir.display(), e);
                break;
            }
        };

        let path = entry.path();
        if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
            continue;
        }
        let Some(institution) = path.file_stem().and_then(|stem| stem.to_str()) else {
            continue;
        };

        let stored = match tokio::fs::read_to_string(&path).await {
            Ok(text) => serde_json::from_str::<StoredCatalog>(&text),
            Err(e) => {
                warn!("Failed to read catalog {}: {}", path.display(), e);
                continue;
            }
        };

        match stored {
            Ok(stored) => {
                services::load_catalog(cache, institution, stored).await;
                loaded += 1;
            }
            Err(e) => warn!("Failed to parse catalog {}: {}", path.display(), e),
        }
    }

    info!("Catalog warm-up complete. Stats: {:?}", cache.stats().await);
    loaded
}
