//! Pricing services over the catalog cache.
//!
//! These glue the pure core (migration, resolver, payment, audit) to the
//! per-institution snapshot cache used by the HTTP layer.

use std::sync::Arc;

use tracing::{info, warn};

use crate::cache::CatalogCache;

use super::audit::{audit_catalog, CatalogIssue, Severity};
use super::migration::{load_catalog as migrate_catalog, LoadedCatalog, StoredCatalog};
use super::models::{BookingCandidate, PriceQuote, PricingCatalog};
use super::payment::apply_payment_adjustment;
use super::resolver::quote;
use super::settings::QuoteSettings;

/// Pricing error types
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PricingError {
    #[error("Invalid candidate: {field} {reason}")]
    InvalidCandidate { field: &'static str, reason: String },

    #[error("No catalog loaded for institution '{0}'")]
    UnknownCatalog(String),

    #[error("Unknown payment method '{0}'")]
    UnknownPaymentMethod(String),

    #[error("Payment method '{0}' is disabled")]
    PaymentMethodDisabled(String),

    #[error("Payment method '{0}' adjustment is out of range for this price")]
    PaymentAdjustmentOutOfRange(String),
}

impl PricingError {
    pub fn missing(field: &'static str) -> Self {
        PricingError::InvalidCandidate {
            field,
            reason: "is required".to_string(),
        }
    }

    pub fn invalid(field: &'static str, reason: impl ToString) -> Self {
        PricingError::InvalidCandidate {
            field,
            reason: reason.to_string(),
        }
    }
}

/// Result of normalising a stored catalog.
#[derive(Debug, Clone)]
pub struct PreparedCatalog {
    pub catalog: PricingCatalog,
    pub legacy_rules: usize,
    /// Stored entries and blocks left out of `catalog`.
    pub rejected: Vec<CatalogIssue>,
}

impl PreparedCatalog {
    /// Load-time rejections followed by the audit of what was kept.
    pub fn issues(&self) -> Vec<CatalogIssue> {
        catalog_issues(&self.rejected, &self.catalog)
    }
}

/// Migrate every stored rule once, dropping whatever does not parse.
pub fn prepare_catalog(stored: StoredCatalog) -> PreparedCatalog {
    let legacy_rules = stored.legacy_rules();
    let LoadedCatalog { catalog, rejected } = migrate_catalog(stored);

    PreparedCatalog {
        catalog,
        legacy_rules,
        rejected: rejected.into_iter().map(CatalogIssue::from).collect(),
    }
}

fn catalog_issues(rejected: &[CatalogIssue], catalog: &PricingCatalog) -> Vec<CatalogIssue> {
    let mut issues = rejected.to_vec();
    issues.extend(audit_catalog(catalog));
    issues
}

/// Summary of a catalog stored in the cache.
#[derive(Debug, Clone)]
pub struct CatalogLoadResult {
    pub institution: String,
    pub rules: usize,
    pub legacy_rules: usize,
    pub special_dates: usize,
    pub payment_methods: usize,
    pub issues: Vec<CatalogIssue>,
}

/// Normalise `stored` and publish it as the institution's current snapshot.
///
/// Quotes already running against the previous snapshot keep their `Arc`.
pub async fn load_catalog(cache: &CatalogCache, institution: &str, stored: StoredCatalog) -> CatalogLoadResult {
    let prepared = prepare_catalog(stored);
    let issues = prepared.issues();
    let PreparedCatalog {
        catalog,
        legacy_rules,
        rejected,
    } = prepared;

    let result = CatalogLoadResult {
        institution: institution.to_string(),
        rules: catalog.rules.len(),
        legacy_rules,
        special_dates: catalog.special_dates.len(),
        payment_methods: catalog.payment_methods.len(),
        issues,
    };

    for issue in &result.issues {
        match issue.severity {
            Severity::Error => warn!("Catalog {} error: {}", institution, issue.message),
            Severity::Warning => warn!("Catalog {} warning: {}", institution, issue.message),
        }
    }

    cache.insert(institution, catalog, rejected).await;
    info!(
        "Loaded catalog for {}: {} rules ({} migrated from legacy), {} special dates, {} payment methods",
        institution, result.rules, result.legacy_rules, result.special_dates, result.payment_methods
    );

    result
}

pub async fn get_catalog(cache: &CatalogCache, institution: &str) -> Result<Arc<PricingCatalog>, PricingError> {
    cache
        .get(institution)
        .await
        .ok_or_else(|| PricingError::UnknownCatalog(institution.to_string()))
}

/// Quote a candidate, then apply the payment method if one was chosen.
pub fn quote_with_payment(
    catalog: &PricingCatalog,
    candidate: &BookingCandidate,
    settings: &QuoteSettings,
    payment_method_id: Option<&str>,
) -> Result<PriceQuote, PricingError> {
    let base = quote(catalog, candidate, settings);

    match payment_method_id {
        None => Ok(base),
        Some(id) => {
            let method = catalog
                .payment_method(id)
                .ok_or_else(|| PricingError::UnknownPaymentMethod(id.to_string()))?;
            apply_payment_adjustment(&base, method)
        }
    }
}

/// Quote against the institution's cached snapshot.
pub async fn quote_for_institution(
    cache: &CatalogCache,
    settings: &QuoteSettings,
    institution: &str,
    candidate: &BookingCandidate,
    payment_method_id: Option<&str>,
) -> Result<PriceQuote, PricingError> {
    let catalog = get_catalog(cache, institution).await?;
    quote_with_payment(&catalog, candidate, settings, payment_method_id)
}

pub async fn audit_institution(cache: &CatalogCache, institution: &str) -> Result<Vec<CatalogIssue>, PricingError> {
    let snapshot = cache
        .snapshot(institution)
        .await
        .ok_or_else(|| PricingError::UnknownCatalog(institution.to_string()))?;
    Ok(catalog_issues(&snapshot.rejected, &snapshot.catalog))
}
