//! Response DTOs for pricing API endpoints.

use serde::Serialize;

use super::audit::{CatalogIssue, Severity};
use super::migration::BlockTemplate;
use super::models::{PricingRule, TimeBlock};
use super::services::CatalogLoadResult;
use super::validation::{Conflict, TimeSpan, ValidationResult};

/// Response for a single block validation
#[derive(Debug, Serialize)]
pub struct ValidationResponse {
    pub valid: bool,
    pub errors: Vec<String>,
}

impl From<ValidationResult> for ValidationResponse {
    fn from(result: ValidationResult) -> Self {
        Self {
            valid: result.valid,
            errors: result.errors.iter().map(ToString::to_string).collect(),
        }
    }
}

/// Response for a conflict check over one rule's blocks
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConflictReportResponse {
    pub has_conflicts: bool,
    pub conflicts: Vec<Conflict>,
    pub sorted_blocks: Vec<TimeBlock>,
    pub gaps: Vec<TimeSpan>,
    pub range: Option<TimeSpan>,
}

/// Response for a catalog load
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogLoadResponse {
    pub institution: String,
    pub rules: usize,
    pub legacy_rules: usize,
    pub special_dates: usize,
    pub payment_methods: usize,
    pub issues: Vec<CatalogIssue>,
}

impl From<CatalogLoadResult> for CatalogLoadResponse {
    fn from(result: CatalogLoadResult) -> Self {
        Self {
            institution: result.institution,
            rules: result.rules,
            legacy_rules: result.legacy_rules,
            special_dates: result.special_dates,
            payment_methods: result.payment_methods,
            issues: result.issues,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditResponse {
    pub institution: String,
    pub errors: usize,
    pub warnings: usize,
    pub issues: Vec<CatalogIssue>,
}

impl AuditResponse {
    pub fn new(institution: String, issues: Vec<CatalogIssue>) -> Self {
        let errors = issues.iter().filter(|i| i.severity == Severity::Error).count();
        Self {
            institution,
            errors,
            warnings: issues.len() - errors,
            issues,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TemplateResponse {
    pub name: BlockTemplate,
    pub block: TimeBlock,
}

/// Block templates offered by the rule editor
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplatesResponse {
    pub templates: Vec<TemplateResponse>,
    pub empty_block: TimeBlock,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrateRulesResponse {
    pub migrated_from_legacy: usize,
    pub rules: Vec<PricingRule>,
}

#[derive(Debug, Serialize)]
pub struct EvictResponse {
    pub institution: String,
    pub evicted: bool,
}
