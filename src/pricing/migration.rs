//! Stored-rule normalisation.
//!
//! Rules have been saved in three shapes over time:
//!
//! 1. current: `timeBlocks: [...]` with any number of blocks
//! 2. single block: `start`/`end`/`price`/`priceType` at the rule root
//! 3. oldest: the same single block under `desde`/`hasta`/`precio`/`tipo`, days under `dias`
//!
//! [`migrate`] turns any of them into a [`PricingRule`]. It runs once per rule
//! when a catalog is loaded, never while quoting. Stored data is read
//! leniently: an entry or block that does not parse is left out and reported,
//! the rest of the catalog still loads.

use std::collections::BTreeSet;

use serde::de::{DeserializeOwned, Deserializer};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use super::clock::{ClockTime, Day, SlotDuration};
use super::models::{
    PaymentMethodAdjustment, PriceType, PricingCatalog, PricingRule, RuleScope, SpecialDateRule,
    TimeBlock,
};
use super::validation::{price_text, TimeBlockDraft};

/// A pricing rule as persisted, in whichever shape it was saved.
///
/// Block fields stay as text until [`migrate`] checks them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredRule {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<RuleScope>,
    #[serde(default, alias = "dias", skip_serializing_if = "Option::is_none")]
    pub days: Option<BTreeSet<Day>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub durations: Option<BTreeSet<SlotDuration>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_blocks: Option<Vec<TimeBlockDraft>>,
    #[serde(default, alias = "desde", skip_serializing_if = "Option::is_none")]
    pub start: Option<String>,
    #[serde(default, alias = "hasta", skip_serializing_if = "Option::is_none")]
    pub end: Option<String>,
    #[serde(
        default,
        alias = "precio",
        deserialize_with = "price_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub price: Option<String>,
    #[serde(default, alias = "tipo", skip_serializing_if = "Option::is_none")]
    pub price_type: Option<String>,
}

impl StoredRule {
    /// Saved before time blocks existed.
    pub fn is_legacy(&self) -> bool {
        self.time_blocks.is_none()
    }
}

impl From<PricingRule> for StoredRule {
    fn from(rule: PricingRule) -> Self {
        Self {
            id: Some(rule.id),
            scope: Some(rule.scope),
            days: Some(rule.days),
            durations: Some(rule.durations),
            time_blocks: Some(rule.time_blocks.into_iter().map(TimeBlockDraft::from).collect()),
            ..Default::default()
        }
    }
}

/// One stored catalog entry: parsed, or kept as raw JSON with the parse error.
#[derive(Debug, Clone, PartialEq)]
pub enum StoredEntry<T> {
    Parsed(T),
    Malformed { raw: Value, reason: String },
}

impl<T> StoredEntry<T> {
    pub fn parsed(&self) -> Option<&T> {
        match self {
            StoredEntry::Parsed(value) => Some(value),
            StoredEntry::Malformed { .. } => None,
        }
    }
}

impl<T> From<T> for StoredEntry<T> {
    fn from(value: T) -> Self {
        StoredEntry::Parsed(value)
    }
}

impl<'de, T: DeserializeOwned> Deserialize<'de> for StoredEntry<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Value::deserialize(deserializer)?;
        Ok(match T::deserialize(&raw) {
            Ok(value) => StoredEntry::Parsed(value),
            Err(e) => StoredEntry::Malformed {
                reason: e.to_string(),
                raw,
            },
        })
    }
}

impl<T: Serialize> Serialize for StoredEntry<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            StoredEntry::Parsed(value) => value.serialize(serializer),
            StoredEntry::Malformed { raw, .. } => raw.serialize(serializer),
        }
    }
}

/// A catalog as persisted: rules not yet migrated.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredCatalog {
    #[serde(default)]
    pub rules: Vec<StoredEntry<StoredRule>>,
    #[serde(default)]
    pub special_dates: Vec<StoredEntry<SpecialDateRule>>,
    #[serde(default)]
    pub payment_methods: Vec<StoredEntry<PaymentMethodAdjustment>>,
}

impl StoredCatalog {
    /// Parsed rules saved before time blocks existed.
    pub fn legacy_rules(&self) -> usize {
        self.rules
            .iter()
            .filter_map(StoredEntry::parsed)
            .filter(|r| r.is_legacy())
            .count()
    }
}

impl From<PricingCatalog> for StoredCatalog {
    fn from(catalog: PricingCatalog) -> Self {
        Self {
            rules: catalog
                .rules
                .into_iter()
                .map(|rule| StoredRule::from(rule).into())
                .collect(),
            special_dates: catalog.special_dates.into_iter().map(StoredEntry::from).collect(),
            payment_methods: catalog.payment_methods.into_iter().map(StoredEntry::from).collect(),
        }
    }
}

/// Something stored that was left out of the loaded catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedEntry {
    pub rule_id: Option<String>,
    pub message: String,
}

impl RejectedEntry {
    fn malformed(kind: &str, index: usize, raw: &Value, reason: &str) -> Self {
        Self {
            rule_id: raw.get("id").and_then(Value::as_str).map(str::to_string),
            message: format!("stored {kind} #{} ignored: {reason}", index + 1),
        }
    }
}

pub fn generate_block_id() -> String {
    format!("block-{}", Uuid::new_v4())
}

pub fn generate_rule_id() -> String {
    format!("rule-{}", Uuid::new_v4())
}

fn default_durations() -> BTreeSet<SlotDuration> {
    SlotDuration::from_minutes(60).into_iter().collect()
}

/// Normalise a stored rule into the current shape.
///
/// Rules that already carry `timeBlocks` keep every valid block as stored.
/// Legacy rules get a single block when both `start` and `end` were saved
/// (blank counts as not saved), and no blocks otherwise. Missing days default
/// to none, missing durations to `1h`, missing scope to global. Blocks that
/// fail [`validate_block`](super::validation::validate_block) are dropped.
pub fn migrate(stored: StoredRule) -> PricingRule {
    migrate_checked(stored).0
}

/// [`migrate`], also returning the blocks that were dropped.
pub fn migrate_checked(stored: StoredRule) -> (PricingRule, Vec<RejectedEntry>) {
    let StoredRule {
        id,
        scope,
        days,
        durations,
        time_blocks,
        start,
        end,
        price,
        price_type,
    } = stored;
    let legacy = time_blocks.is_none();
    let id = id.unwrap_or_else(generate_rule_id);

    let drafts = match time_blocks {
        Some(drafts) => drafts,
        None => legacy_block(start, end, price, price_type).into_iter().collect(),
    };

    let mut blocks = Vec::with_capacity(drafts.len());
    let mut rejected = Vec::new();
    for (index, draft) in drafts.into_iter().enumerate() {
        let label = draft.id.clone().unwrap_or_else(|| format!("#{}", index + 1));
        match draft.into_block() {
            Ok(block) => blocks.push(block),
            Err(result) => {
                let reasons: Vec<String> = result.errors.iter().map(ToString::to_string).collect();
                debug!("Dropping block {} of rule {}: {}", label, id, reasons.join("; "));
                rejected.push(RejectedEntry {
                    rule_id: Some(id.clone()),
                    message: format!("block {label} ignored: {}", reasons.join("; ")),
                });
            }
        }
    }

    let rule = PricingRule {
        id,
        scope: scope.unwrap_or_default(),
        days: days.unwrap_or_default(),
        durations: durations.unwrap_or_else(default_durations),
        time_blocks: blocks,
    };

    if legacy {
        debug!(
            "Migrated legacy rule {} into {} time block(s)",
            rule.id,
            rule.time_blocks.len()
        );
    }
    (rule, rejected)
}

fn legacy_block(
    start: Option<String>,
    end: Option<String>,
    price: Option<String>,
    price_type: Option<String>,
) -> Option<TimeBlockDraft> {
    let saved = |value: &Option<String>| value.as_deref().is_some_and(|v| !v.trim().is_empty());
    (saved(&start) && saved(&end)).then(|| TimeBlockDraft {
        id: None,
        start,
        end,
        price,
        price_type,
    })
}

pub fn migrate_all(rules: Vec<StoredRule>) -> Vec<PricingRule> {
    rules.into_iter().map(migrate).collect()
}

/// A stored catalog after migration, with everything that was left out.
#[derive(Debug, Clone)]
pub struct LoadedCatalog {
    pub catalog: PricingCatalog,
    pub rejected: Vec<RejectedEntry>,
}

/// Migrate every parsable rule of a stored catalog and drop malformed
/// entries. Special dates and payment methods have a single shape and pass
/// through.
pub fn load_catalog(stored: StoredCatalog) -> LoadedCatalog {
    let mut rejected = Vec::new();

    let rules: Vec<PricingRule> = keep_parsed("rule", stored.rules, &mut rejected)
        .into_iter()
        .map(|rule| {
            let (rule, dropped) = migrate_checked(rule);
            rejected.extend(dropped);
            rule
        })
        .collect();
    let special_dates = keep_parsed("special date", stored.special_dates, &mut rejected);
    let payment_methods = keep_parsed("payment method", stored.payment_methods, &mut rejected);

    LoadedCatalog {
        catalog: PricingCatalog {
            rules,
            special_dates,
            payment_methods,
        },
        rejected,
    }
}

fn keep_parsed<T>(kind: &str, entries: Vec<StoredEntry<T>>, rejected: &mut Vec<RejectedEntry>) -> Vec<T> {
    entries
        .into_iter()
        .enumerate()
        .filter_map(|(index, entry)| match entry {
            StoredEntry::Parsed(value) => Some(value),
            StoredEntry::Malformed { raw, reason } => {
                debug!("Dropping stored {} #{}: {}", kind, index + 1, reason);
                rejected.push(RejectedEntry::malformed(kind, index, &raw, &reason));
                None
            }
        })
        .collect()
}

/// Single-block export for consumers that only read root-level fields.
///
/// Only the first block survives; later blocks are dropped.
pub fn to_legacy(rule: &PricingRule) -> StoredRule {
    let first = rule.time_blocks.first();
    StoredRule {
        id: Some(rule.id.clone()),
        scope: Some(rule.scope.clone()),
        days: Some(rule.days.clone()),
        durations: Some(rule.durations.clone()),
        time_blocks: None,
        start: first.map(|b| b.start.to_string()),
        end: first.map(|b| b.end.to_string()),
        price: first.and_then(|b| b.price).map(|p| p.to_string()),
        price_type: first.map(|b| b.price_type.to_string()),
    }
}

/// Predefined blocks offered by the rule editor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BlockTemplate {
    Morning,
    Afternoon,
    Night,
    FullDay,
}

impl BlockTemplate {
    pub const ALL: [BlockTemplate; 4] = [
        BlockTemplate::Morning,
        BlockTemplate::Afternoon,
        BlockTemplate::Night,
        BlockTemplate::FullDay,
    ];

    /// Unpriced block for this template, with a fresh id.
    pub fn block(self) -> TimeBlock {
        let (start, end, price_type) = match self {
            BlockTemplate::Morning => (8, 12, PriceType::Normal),
            BlockTemplate::Afternoon => (12, 18, PriceType::Normal),
            BlockTemplate::Night => (18, 23, PriceType::Night),
            BlockTemplate::FullDay => (8, 23, PriceType::Normal),
        };
        new_block(start, end, price_type)
    }
}

/// The block a new rule starts with: 08:00-09:00, normal, unpriced.
pub fn empty_block() -> TimeBlock {
    new_block(8, 9, PriceType::Normal)
}

/// Copy of `block` under a new id.
pub fn duplicate_block(block: &TimeBlock) -> TimeBlock {
    TimeBlock {
        id: generate_block_id(),
        ..block.clone()
    }
}

fn new_block(start_hour: u8, end_hour: u8, price_type: PriceType) -> TimeBlock {
    TimeBlock {
        id: generate_block_id(),
        start: ClockTime::from_hm(start_hour, 0).unwrap_or(ClockTime::MIDNIGHT),
        end: ClockTime::from_hm(end_hour, 0).unwrap_or(ClockTime::MIDNIGHT),
        price_type,
        price: None,
    }
}
