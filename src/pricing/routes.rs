//! Pricing route handlers

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    routing::{get, post, put},
    Json, Router,
};

use crate::error::Result;
use crate::AppState;

use super::migration::{empty_block, migrate_all, BlockTemplate, StoredCatalog};
use super::models::{BookingCandidate, PriceQuote, PricingCatalog};
use super::requests::{
    ConflictCheckRequest, InstitutionQuoteRequest, MigrateRulesRequest, QuoteRequest,
};
use super::responses::{
    AuditResponse, CatalogLoadResponse, ConflictReportResponse, EvictResponse,
    MigrateRulesResponse, TemplateResponse, TemplatesResponse, ValidationResponse,
};
use super::services;
use super::validation::{
    detect_conflicts, find_time_gaps, sort_blocks, total_time_range, validate_block, TimeBlockDraft,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/pricing/quote", post(quote))
        .route(
            "/api/pricing/catalogs/:institution",
            put(load_catalog).get(get_catalog).delete(evict_catalog),
        )
        .route("/api/pricing/catalogs/:institution/quote", post(quote_institution))
        .route("/api/pricing/catalogs/:institution/audit", get(audit_catalog))
        .route("/api/pricing/time-blocks/validate", post(validate))
        .route("/api/pricing/time-blocks/conflicts", post(conflicts))
        .route("/api/pricing/time-blocks/templates", get(templates))
        .route("/api/pricing/rules/migrate", post(migrate_rules))
}

/// Quote against a catalog sent with the request.
async fn quote(
    State(state): State<AppState>,
    payload: std::result::Result<Json<QuoteRequest>, JsonRejection>,
) -> Result<Json<PriceQuote>> {
    let Json(req) = payload?;
    let candidate = BookingCandidate::try_from(req.candidate)?;
    let catalog = services::prepare_catalog(req.catalog).catalog;

    let quote = services::quote_with_payment(
        &catalog,
        &candidate,
        &state.settings,
        req.payment_method_id.as_deref(),
    )?;
    Ok(Json(quote))
}

async fn load_catalog(
    State(state): State<AppState>,
    Path(institution): Path<String>,
    payload: std::result::Result<Json<StoredCatalog>, JsonRejection>,
) -> Result<Json<CatalogLoadResponse>> {
    let Json(stored) = payload?;
    let result = services::load_catalog(&state.cache, &institution, stored).await;
    Ok(Json(result.into()))
}

async fn get_catalog(
    State(state): State<AppState>,
    Path(institution): Path<String>,
) -> Result<Json<PricingCatalog>> {
    let catalog = services::get_catalog(&state.cache, &institution).await?;
    Ok(Json(catalog.as_ref().clone()))
}

async fn evict_catalog(
    State(state): State<AppState>,
    Path(institution): Path<String>,
) -> Json<EvictResponse> {
    let evicted = state.cache.invalidate(&institution).await;
    Json(EvictResponse { institution, evicted })
}

async fn quote_institution(
    State(state): State<AppState>,
    Path(institution): Path<String>,
    payload: std::result::Result<Json<InstitutionQuoteRequest>, JsonRejection>,
) -> Result<Json<PriceQuote>> {
    let Json(req) = payload?;
    let candidate = BookingCandidate::try_from(req.candidate)?;

    let quote = services::quote_for_institution(
        &state.cache,
        &state.settings,
        &institution,
        &candidate,
        req.payment_method_id.as_deref(),
    )
    .await?;
    Ok(Json(quote))
}

async fn audit_catalog(
    State(state): State<AppState>,
    Path(institution): Path<String>,
) -> Result<Json<AuditResponse>> {
    let issues = services::audit_institution(&state.cache, &institution).await?;
    Ok(Json(AuditResponse::new(institution, issues)))
}

async fn validate(
    payload: std::result::Result<Json<TimeBlockDraft>, JsonRejection>,
) -> Result<Json<ValidationResponse>> {
    let Json(draft) = payload?;
    Ok(Json(validate_block(&draft).into()))
}

async fn conflicts(
    payload: std::result::Result<Json<ConflictCheckRequest>, JsonRejection>,
) -> Result<Json<ConflictReportResponse>> {
    let Json(req) = payload?;
    let blocks = req.time_blocks;

    let conflicts = detect_conflicts(&blocks);
    Ok(Json(ConflictReportResponse {
        has_conflicts: !conflicts.is_empty(),
        conflicts,
        sorted_blocks: sort_blocks(&blocks),
        gaps: find_time_gaps(&blocks),
        range: total_time_range(&blocks),
    }))
}

async fn templates() -> Json<TemplatesResponse> {
    Json(TemplatesResponse {
        templates: BlockTemplate::ALL
            .into_iter()
            .map(|name| TemplateResponse {
                name,
                block: name.block(),
            })
            .collect(),
        empty_block: empty_block(),
    })
}

async fn migrate_rules(
    payload: std::result::Result<Json<MigrateRulesRequest>, JsonRejection>,
) -> Result<Json<MigrateRulesResponse>> {
    let Json(req) = payload?;
    let migrated_from_legacy = req.rules.iter().filter(|r| r.is_legacy()).count();
    Ok(Json(MigrateRulesResponse {
        migrated_from_legacy,
        rules: migrate_all(req.rules),
    }))
}
