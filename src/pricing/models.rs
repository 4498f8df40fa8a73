//! Catalog and quote models.
//!
//! These are the current-shape catalog entities. Stored data in older shapes is
//! normalised into them by [`crate::pricing::migration`] before it reaches the
//! resolver.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};

use super::clock::{ClockTime, Day, SlotDuration};

pub type CourtId = u32;

/// Largest hourly price a block or a fixed special date may carry.
pub const MAX_HOURLY_PRICE: Decimal = dec!(1_000_000_000_000);
/// Largest special-date multiplier.
pub const MAX_MULTIPLIER: Decimal = dec!(1000);
/// Largest special-date percentage, either sign.
pub const MAX_PERCENT: Decimal = dec!(10000);

/// Display tag on a time block. Does not change the price by itself.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum PriceType {
    #[default]
    Normal,
    Night,
    Weekend,
    Holiday,
    Premium,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown price type '{0}'")]
pub struct PriceTypeParseError(pub String);

impl FromStr for PriceType {
    type Err = PriceTypeParseError;

    /// Accepts the legacy Spanish tags alongside the English ones.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "normal" => Ok(PriceType::Normal),
            "night" | "nocturno" | "noche" => Ok(PriceType::Night),
            "weekend" | "fin_semana" | "fin_de_semana" => Ok(PriceType::Weekend),
            "holiday" | "feriado" => Ok(PriceType::Holiday),
            "premium" => Ok(PriceType::Premium),
            _ => Err(PriceTypeParseError(s.to_string())),
        }
    }
}

impl TryFrom<String> for PriceType {
    type Error = PriceTypeParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl fmt::Display for PriceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PriceType::Normal => "normal",
            PriceType::Night => "night",
            PriceType::Weekend => "weekend",
            PriceType::Holiday => "holiday",
            PriceType::Premium => "premium",
        };
        f.write_str(name)
    }
}

/// One priced stretch of the day inside a rule, `[start, end)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeBlock {
    pub id: String,
    pub start: ClockTime,
    pub end: ClockTime,
    #[serde(default)]
    pub price_type: PriceType,
    /// Price per hour. `None` when the block was saved without a price.
    #[serde(default, deserialize_with = "lenient_price")]
    pub price: Option<Decimal>,
}

impl TimeBlock {
    /// A block can be matched only if its window is non-empty and it carries a
    /// price between zero and [`MAX_HOURLY_PRICE`].
    pub fn is_matchable(&self) -> bool {
        self.start < self.end && self.price.is_some_and(|p| p >= Decimal::ZERO && p <= MAX_HOURLY_PRICE)
    }

    pub fn contains(&self, time: ClockTime) -> bool {
        self.start <= time && time < self.end
    }

    pub fn overlaps(&self, other: &TimeBlock) -> bool {
        self.start < other.end && other.start < self.end
    }

    pub fn window(&self) -> String {
        format!("{}-{}", self.start, self.end)
    }
}

/// Which bookings a rule is eligible for.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum RuleScope {
    #[default]
    Global,
    BySport {
        sport: String,
    },
    #[serde(rename_all = "camelCase")]
    ByCourts {
        court_ids: BTreeSet<CourtId>,
    },
}

impl RuleScope {
    pub fn matches(&self, court_id: CourtId, sport: &str) -> bool {
        match self {
            RuleScope::Global => true,
            RuleScope::BySport { sport: s } => s == sport,
            RuleScope::ByCourts { court_ids } => court_ids.contains(&court_id),
        }
    }

    /// Higher wins: court-specific over sport over global.
    pub fn specificity(&self) -> u8 {
        match self {
            RuleScope::Global => 0,
            RuleScope::BySport { .. } => 1,
            RuleScope::ByCourts { .. } => 2,
        }
    }
}

/// Ordinary pricing rule in its current multi-block shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PricingRule {
    pub id: String,
    #[serde(default)]
    pub scope: RuleScope,
    #[serde(default)]
    pub days: BTreeSet<Day>,
    #[serde(default)]
    pub durations: BTreeSet<SlotDuration>,
    #[serde(default)]
    pub time_blocks: Vec<TimeBlock>,
}

impl PricingRule {
    pub fn is_active_on(&self, day: Day) -> bool {
        self.days.contains(&day)
    }

    pub fn allows(&self, duration: SlotDuration) -> bool {
        self.durations.contains(&duration)
    }
}

/// How a special date reprices a booking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "strategy", content = "value", rename_all = "lowercase")]
pub enum SpecialDateStrategy {
    /// Base price times a factor (> 0).
    Multiplier(Decimal),
    /// Flat hourly price (>= 0) replacing the base rate.
    Fixed(Decimal),
    /// Base price plus a percentage; negative for a discount.
    Percentage(Decimal),
}

impl SpecialDateStrategy {
    pub fn is_well_formed(&self) -> bool {
        match *self {
            SpecialDateStrategy::Multiplier(factor) => factor > Decimal::ZERO && factor <= MAX_MULTIPLIER,
            SpecialDateStrategy::Fixed(price) => price >= Decimal::ZERO && price <= MAX_HOURLY_PRICE,
            SpecialDateStrategy::Percentage(pct) => pct.abs() <= MAX_PERCENT,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    #[default]
    High,
}

/// Holiday or event override for one calendar date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpecialDateRule {
    pub id: String,
    pub date: NaiveDate,
    pub name: String,
    #[serde(flatten)]
    pub strategy: SpecialDateStrategy,
    pub start_time: ClockTime,
    pub end_time: ClockTime,
    /// Empty means every court.
    #[serde(default)]
    pub court_ids: BTreeSet<CourtId>,
    #[serde(default)]
    pub priority: Priority,
}

impl SpecialDateRule {
    pub fn is_well_formed(&self) -> bool {
        self.start_time < self.end_time && self.strategy.is_well_formed()
    }

    pub fn applies_to(&self, candidate: &BookingCandidate) -> bool {
        self.date == candidate.date
            && self.start_time <= candidate.start_time
            && candidate.start_time < self.end_time
            && (self.court_ids.is_empty() || self.court_ids.contains(&candidate.court_id))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentMethodAdjustment {
    pub id: String,
    pub name: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Positive is a surcharge, negative a discount.
    #[serde(alias = "adjustment", default)]
    pub adjustment_percent: Decimal,
}

fn default_enabled() -> bool {
    true
}

/// Everything the resolver needs to price a booking, as one immutable value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PricingCatalog {
    #[serde(default)]
    pub rules: Vec<PricingRule>,
    #[serde(default)]
    pub special_dates: Vec<SpecialDateRule>,
    #[serde(default)]
    pub payment_methods: Vec<PaymentMethodAdjustment>,
}

impl PricingCatalog {
    pub fn payment_method(&self, id: &str) -> Option<&PaymentMethodAdjustment> {
        self.payment_methods.iter().find(|m| m.id == id)
    }
}

/// A reservation the user is considering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingCandidate {
    pub court_id: CourtId,
    pub sport: String,
    pub date: NaiveDate,
    pub start_time: ClockTime,
    pub duration: SlotDuration,
}

impl BookingCandidate {
    pub fn day(&self) -> Day {
        self.date.weekday().into()
    }
}

/// What decided the price of a quote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum MatchedSource {
    SpecialDate { rule: SpecialDateRule },
    PricingRule { rule: PricingRule, block: TimeBlock },
    NoMatch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AdjustmentKind {
    SpecialDate,
    Rule,
    NightSurcharge,
    WeekendSurcharge,
    PaymentMethod,
}

/// One line of the price breakdown. `amount` may be negative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Adjustment {
    pub kind: AdjustmentKind,
    pub label: String,
    pub amount: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceQuote {
    pub base_price_per_hour: Decimal,
    pub duration_hours: Decimal,
    pub base_price: Decimal,
    pub matched_source: MatchedSource,
    pub adjustments: Vec<Adjustment>,
    /// `base_price` plus every adjustment, before rounding.
    pub subtotal: Decimal,
    /// `final_price - subtotal`; cosmetic, not part of `adjustments`.
    pub rounding: Decimal,
    pub final_price: Decimal,
}

impl PriceQuote {
    pub fn is_fallback(&self) -> bool {
        matches!(self.matched_source, MatchedSource::NoMatch)
    }

    pub fn adjustments_total(&self) -> Decimal {
        self.adjustments.iter().map(|a| a.amount).sum()
    }
}

/// Reads a price saved as a number, a numeric string, or blank.
pub(crate) fn lenient_price<'de, D>(deserializer: D) -> Result<Option<Decimal>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<serde_json::Value>::deserialize(deserializer)? {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(serde_json::Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(serde_json::Value::String(s)) => parse_decimal(&s)
            .map(Some)
            .ok_or_else(|| de::Error::custom(format!("invalid price '{s}'"))),
        Some(serde_json::Value::Number(n)) => parse_decimal(&n.to_string())
            .map(Some)
            .ok_or_else(|| de::Error::custom(format!("invalid price {n}"))),
        Some(other) => Err(de::Error::custom(format!("invalid price {other}"))),
    }
}

pub(crate) fn parse_decimal(text: &str) -> Option<Decimal> {
    let text = text.trim();
    Decimal::from_str(text)
        .or_else(|_| Decimal::from_scientific(text))
        .ok()
}
