//! Time block validation and overlap detection.
//!
//! Used when rules are authored. Problems found here are warnings for the
//! editor; nothing in this module drops or rewrites data.

use rust_decimal::Decimal;
use serde::de::Deserializer;
use serde::{Deserialize, Serialize};

use super::clock::ClockTime;
use super::migration::generate_block_id;
use super::models::{parse_decimal, PriceType, TimeBlock};

/// A time block as typed into the editor or found in stored data, before any
/// parsing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeBlockDraft {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<String>,
    #[serde(default, deserialize_with = "price_text", skip_serializing_if = "Option::is_none")]
    pub price: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_type: Option<String>,
}

impl From<TimeBlock> for TimeBlockDraft {
    fn from(block: TimeBlock) -> Self {
        Self {
            id: Some(block.id),
            start: Some(block.start.to_string()),
            end: Some(block.end.to_string()),
            price: block.price.map(|p| p.to_string()),
            price_type: Some(block.price_type.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BlockError {
    #[error("start time is required")]
    MissingStart,
    #[error("end time is required")]
    MissingEnd,
    #[error("start time '{0}' is not a valid HH:MM time")]
    InvalidStartFormat(String),
    #[error("end time '{0}' is not a valid HH:MM time")]
    InvalidEndFormat(String),
    #[error("start time must be before end time")]
    StartNotBeforeEnd,
    #[error("price must be a non-negative number")]
    InvalidPrice,
    #[error("unknown price type '{0}'")]
    UnknownPriceType(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationResult {
    pub valid: bool,
    pub errors: Vec<BlockError>,
}

impl ValidationResult {
    fn from_errors(errors: Vec<BlockError>) -> Self {
        Self {
            valid: errors.is_empty(),
            errors,
        }
    }
}

/// Check a draft block. Never fails; every problem is reported.
///
/// A blank price is allowed (the block is simply not priced yet).
pub fn validate_block(block: &TimeBlockDraft) -> ValidationResult {
    let mut errors = Vec::new();

    let start = non_blank(&block.start);
    let end = non_blank(&block.end);

    if start.is_none() {
        errors.push(BlockError::MissingStart);
    }
    if end.is_none() {
        errors.push(BlockError::MissingEnd);
    }

    let start_time = start.and_then(|s| match s.parse::<ClockTime>() {
        Ok(t) => Some(t),
        Err(_) => {
            errors.push(BlockError::InvalidStartFormat(s.to_string()));
            None
        }
    });
    let end_time = end.and_then(|s| match s.parse::<ClockTime>() {
        Ok(t) => Some(t),
        Err(_) => {
            errors.push(BlockError::InvalidEndFormat(s.to_string()));
            None
        }
    });

    if let (Some(start), Some(end)) = (start_time, end_time) {
        if start >= end {
            errors.push(BlockError::StartNotBeforeEnd);
        }
    }

    if let Some(price) = non_blank(&block.price) {
        if !parse_decimal(price).is_some_and(|p| p >= Decimal::ZERO) {
            errors.push(BlockError::InvalidPrice);
        }
    }

    if let Some(price_type) = non_blank(&block.price_type) {
        if price_type.parse::<PriceType>().is_err() {
            errors.push(BlockError::UnknownPriceType(price_type.to_string()));
        }
    }

    ValidationResult::from_errors(errors)
}

impl TimeBlockDraft {
    /// Turn a draft into a catalog block, generating an id when it has none.
    pub fn into_block(self) -> Result<TimeBlock, ValidationResult> {
        let result = validate_block(&self);
        if !result.valid {
            return Err(result);
        }

        self.parse().ok_or(result)
    }

    fn parse(&self) -> Option<TimeBlock> {
        let price_type = match non_blank(&self.price_type) {
            Some(tag) => tag.parse().ok()?,
            None => PriceType::default(),
        };

        Some(TimeBlock {
            id: non_blank(&self.id)
                .map(str::to_string)
                .unwrap_or_else(generate_block_id),
            start: non_blank(&self.start)?.parse().ok()?,
            end: non_blank(&self.end)?.parse().ok()?,
            price_type,
            price: non_blank(&self.price).and_then(parse_decimal),
        })
    }
}

/// Two blocks of the same rule whose windows overlap.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Conflict {
    pub block_index_a: usize,
    pub block_index_b: usize,
    pub message: String,
}

/// Every overlapping pair, as indices into `blocks` (`a < b`).
///
/// Touching windows such as 09:00-10:00 and 10:00-11:00 do not overlap.
pub fn detect_conflicts(blocks: &[TimeBlock]) -> Vec<Conflict> {
    let mut conflicts = Vec::new();

    for (i, a) in blocks.iter().enumerate() {
        for (j, b) in blocks.iter().enumerate().skip(i + 1) {
            if a.overlaps(b) {
                conflicts.push(Conflict {
                    block_index_a: i,
                    block_index_b: j,
                    message: format!("conflict between {} and {}", a.window(), b.window()),
                });
            }
        }
    }

    conflicts
}

/// Whether `block` overlaps any of `others`.
pub fn has_conflicts(block: &TimeBlock, others: &[TimeBlock]) -> bool {
    others.iter().any(|other| block.overlaps(other))
}

/// Blocks in ascending start order. Equal starts keep their relative order.
pub fn sort_blocks(blocks: &[TimeBlock]) -> Vec<TimeBlock> {
    let mut sorted = blocks.to_vec();
    sorted.sort_by_key(|b| b.start);
    sorted
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeSpan {
    pub start: ClockTime,
    pub end: ClockTime,
    pub duration_minutes: u16,
}

impl TimeSpan {
    fn new(start: ClockTime, end: ClockTime) -> Self {
        Self {
            start,
            end,
            duration_minutes: start.minutes_until(end),
        }
    }
}

/// Earliest start to latest end across all blocks.
pub fn total_time_range(blocks: &[TimeBlock]) -> Option<TimeSpan> {
    let start = blocks.iter().map(|b| b.start).min()?;
    let end = blocks.iter().map(|b| b.end).max()?;
    Some(TimeSpan::new(start, end))
}

/// Stretches between the first start and last end that no block covers.
pub fn find_time_gaps(blocks: &[TimeBlock]) -> Vec<TimeSpan> {
    let sorted = sort_blocks(blocks);
    let mut gaps = Vec::new();

    let mut covered_until: Option<ClockTime> = None;
    for block in &sorted {
        if let Some(until) = covered_until {
            if until < block.start {
                gaps.push(TimeSpan::new(until, block.start));
            }
        }
        covered_until = Some(covered_until.map_or(block.end, |until| until.max(block.end)));
    }

    gaps
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// Prices arrive as numbers or strings; keep the text either way.
pub(crate) fn price_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<serde_json::Value>::deserialize(deserializer)? {
        None | Some(serde_json::Value::Null) => None,
        Some(serde_json::Value::String(s)) => Some(s),
        Some(other) => Some(other.to_string()),
    })
}
