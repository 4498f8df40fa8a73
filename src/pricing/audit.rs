//! Catalog health check, run when a catalog is loaded.
//!
//! Purely advisory: nothing reported here stops a catalog from being served.
//! The resolver already skips malformed entries on its own, and stored
//! entries that could not be loaded at all arrive here as [`RejectedEntry`]s.

use serde::Serialize;

use super::clock::Day;
use super::migration::RejectedEntry;
use super::models::{PricingCatalog, PricingRule, RuleScope};
use super::validation::detect_conflicts;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogIssue {
    pub severity: Severity,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rule_id: Option<String>,
    pub message: String,
}

impl CatalogIssue {
    fn warning(rule_id: Option<&str>, message: String) -> Self {
        Self {
            severity: Severity::Warning,
            rule_id: rule_id.map(str::to_string),
            message,
        }
    }

    fn error(rule_id: Option<&str>, message: String) -> Self {
        Self {
            severity: Severity::Error,
            rule_id: rule_id.map(str::to_string),
            message,
        }
    }
}

impl From<RejectedEntry> for CatalogIssue {
    fn from(rejected: RejectedEntry) -> Self {
        Self {
            severity: Severity::Error,
            rule_id: rejected.rule_id,
            message: rejected.message,
        }
    }
}

pub fn audit_catalog(catalog: &PricingCatalog) -> Vec<CatalogIssue> {
    let mut issues = Vec::new();

    uncovered_days(catalog, &mut issues);

    for rule in &catalog.rules {
        audit_rule(rule, &mut issues);
    }

    overlapping_rules(&catalog.rules, &mut issues);

    for special in &catalog.special_dates {
        if special.start_time >= special.end_time {
            issues.push(CatalogIssue::error(
                Some(&special.id),
                format!(
                    "special date '{}' on {} has an empty window {}-{}",
                    special.name, special.date, special.start_time, special.end_time
                ),
            ));
        } else if !special.strategy.is_well_formed() {
            issues.push(CatalogIssue::error(
                Some(&special.id),
                format!("special date '{}' on {} has an invalid {:?}", special.name, special.date, special.strategy),
            ));
        }
    }

    issues
}

fn uncovered_days(catalog: &PricingCatalog, issues: &mut Vec<CatalogIssue>) {
    let uncovered: Vec<&str> = Day::ALL
        .iter()
        .filter(|day| {
            !catalog
                .rules
                .iter()
                .any(|r| r.scope == RuleScope::Global && r.is_active_on(**day))
        })
        .map(|day| day.as_str())
        .collect();

    if !uncovered.is_empty() {
        issues.push(CatalogIssue::warning(
            None,
            format!("days without a global rule: {}", uncovered.join(", ")),
        ));
    }
}

fn audit_rule(rule: &PricingRule, issues: &mut Vec<CatalogIssue>) {
    if rule.days.is_empty() {
        issues.push(CatalogIssue::warning(Some(&rule.id), "rule has no days and never applies".to_string()));
    }

    for block in rule.time_blocks.iter().filter(|b| !b.is_matchable()) {
        let reason = if block.start >= block.end {
            "start is not before end"
        } else {
            "price is missing, negative or too large"
        };
        issues.push(CatalogIssue::error(
            Some(&rule.id),
            format!("block {} ({}) is unusable: {}", block.id, block.window(), reason),
        ));
    }

    for conflict in detect_conflicts(&rule.time_blocks) {
        issues.push(CatalogIssue::warning(Some(&rule.id), conflict.message));
    }
}

/// Rules sharing a scope and a day whose blocks overlap. The resolver picks
/// the lower id, which is rarely what the author meant.
fn overlapping_rules(rules: &[PricingRule], issues: &mut Vec<CatalogIssue>) {
    for (i, a) in rules.iter().enumerate() {
        for b in &rules[i + 1..] {
            if a.scope != b.scope {
                continue;
            }
            let shared: Vec<&str> = a.days.intersection(&b.days).map(|d| d.as_str()).collect();
            if shared.is_empty() {
                continue;
            }
            for block_a in &a.time_blocks {
                for block_b in b.time_blocks.iter().filter(|bb| bb.overlaps(block_a)) {
                    issues.push(CatalogIssue::warning(
                        Some(&a.id),
                        format!(
                            "{} overlaps {} {} on {}",
                            block_a.window(),
                            b.id,
                            block_b.window(),
                            shared.join(", ")
                        ),
                    ));
                }
            }
        }
    }
}
