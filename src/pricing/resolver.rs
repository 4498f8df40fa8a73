//! Price resolution for a single booking candidate.
//!
//! Precedence, highest first:
//! 1. a special date covering the candidate's date, time and court
//! 2. the most specific ordinary rule (courts > sport > global) with a block
//!    covering the start time
//! 3. the sport's base rate plus automatic night/weekend surcharges
//!
//! The final price is then rounded to the configured increment.

use std::cmp::Reverse;

use rust_decimal::Decimal;
use tracing::debug;

use super::calculators::{hourly_total, percent_of, round_to_increment};
use super::models::{
    Adjustment, AdjustmentKind, BookingCandidate, MatchedSource, PriceQuote, PricingCatalog,
    PricingRule, SpecialDateRule, SpecialDateStrategy, TimeBlock,
};
use super::settings::QuoteSettings;

/// Price `candidate` against `catalog`.
///
/// Pure: the same inputs always produce the same quote. Malformed catalog
/// entries, and entries whose arithmetic would overflow, are skipped.
pub fn quote(catalog: &PricingCatalog, candidate: &BookingCandidate, settings: &QuoteSettings) -> PriceQuote {
    let base_price_per_hour = settings.base_rates.hourly_rate(&candidate.sport);
    let duration_hours = candidate.duration.hours();
    let base_price = base_price_per_hour.saturating_mul(duration_hours);

    let mut adjustments = Vec::new();

    let special = special_dates_in_order(catalog, candidate)
        .into_iter()
        .find_map(|special| {
            let adjustment = special_date_adjustment(special, base_price, duration_hours);
            if adjustment.is_none() {
                debug!("Skipping special date {}: price out of range", special.id);
            }
            adjustment.map(|a| (special, a))
        });

    let matched_source = if let Some((special, adjustment)) = special {
        debug!("Special date {} ({}) applies to {:?}", special.id, special.name, candidate);
        adjustments.push(adjustment);
        MatchedSource::SpecialDate {
            rule: special.clone(),
        }
    } else if let Some((rule, block, adjustment)) = matching_blocks(catalog, candidate).find_map(|(rule, block)| {
        let adjustment = rule_adjustment(rule, block, base_price, duration_hours);
        if adjustment.is_none() {
            debug!("Skipping block {} in rule {}: price out of range", block.id, rule.id);
        }
        adjustment.map(|a| (rule, block, a))
    }) {
        debug!("Rule {} block {} applies to {:?}", rule.id, block.id, candidate);
        adjustments.push(adjustment);
        MatchedSource::PricingRule {
            rule: rule.clone(),
            block: block.clone(),
        }
    } else {
        debug!("No rule matched {:?}, using base rate", candidate);
        adjustments.extend(fallback_surcharges(candidate, base_price, settings));
        MatchedSource::NoMatch
    };

    let subtotal = adjustments
        .iter()
        .fold(base_price, |total, a| total.saturating_add(a.amount));
    let final_price = round_to_increment(subtotal, settings.rounding_increment);

    PriceQuote {
        base_price_per_hour,
        duration_hours,
        base_price,
        matched_source,
        adjustments,
        subtotal,
        rounding: final_price.saturating_sub(subtotal),
        final_price,
    }
}

/// The special date covering the candidate, if any.
///
/// Several can cover the same slot; the highest priority wins and ties go to
/// the smallest id.
pub fn select_special_date<'a>(
    catalog: &'a PricingCatalog,
    candidate: &BookingCandidate,
) -> Option<&'a SpecialDateRule> {
    special_dates_in_order(catalog, candidate).into_iter().next()
}

fn special_dates_in_order<'a>(catalog: &'a PricingCatalog, candidate: &BookingCandidate) -> Vec<&'a SpecialDateRule> {
    let mut covering: Vec<&SpecialDateRule> = catalog
        .special_dates
        .iter()
        .filter(|sd| {
            let usable = sd.is_well_formed();
            if !usable {
                debug!("Skipping malformed special date {}", sd.id);
            }
            usable
        })
        .filter(|sd| sd.applies_to(candidate))
        .collect();
    covering.sort_by(|a, b| b.priority.cmp(&a.priority).then_with(|| a.id.cmp(&b.id)));
    covering
}

/// The ordinary rule and block pricing the candidate, if any.
///
/// Eligible rules are tried most specific scope first, then by id; within a
/// rule the first matchable block containing the start time wins.
pub fn select_rule<'a>(
    catalog: &'a PricingCatalog,
    candidate: &BookingCandidate,
) -> Option<(&'a PricingRule, &'a TimeBlock)> {
    matching_blocks(catalog, candidate).next()
}

fn matching_blocks<'a>(
    catalog: &'a PricingCatalog,
    candidate: &BookingCandidate,
) -> impl Iterator<Item = (&'a PricingRule, &'a TimeBlock)> + 'a {
    let day = candidate.day();
    let start = candidate.start_time;

    let mut eligible: Vec<&PricingRule> = catalog
        .rules
        .iter()
        .filter(|r| r.scope.matches(candidate.court_id, &candidate.sport))
        .filter(|r| r.is_active_on(day) && r.allows(candidate.duration))
        .collect();
    eligible.sort_by(|a, b| {
        Reverse(a.scope.specificity())
            .cmp(&Reverse(b.scope.specificity()))
            .then_with(|| a.id.cmp(&b.id))
    });

    eligible.into_iter().flat_map(move |rule| {
        rule.time_blocks
            .iter()
            .filter(move |block| {
                let usable = block.is_matchable();
                if !usable {
                    debug!("Skipping unmatchable block {} in rule {}", block.id, rule.id);
                }
                usable
            })
            .filter(move |block| block.contains(start))
            .map(move |block| (rule, block))
    })
}

fn special_date_adjustment(rule: &SpecialDateRule, base_price: Decimal, hours: Decimal) -> Option<Adjustment> {
    let (label, amount) = match rule.strategy {
        SpecialDateStrategy::Multiplier(factor) => (
            format!("{} (x{})", rule.name, factor.normalize()),
            base_price.checked_mul(factor)?.checked_sub(base_price)?,
        ),
        SpecialDateStrategy::Fixed(price) => (
            format!("{} ({}/h)", rule.name, price.normalize()),
            hourly_total(price, hours)?.checked_sub(base_price)?,
        ),
        SpecialDateStrategy::Percentage(pct) => (
            format!("{} ({:+}%)", rule.name, pct.normalize()),
            percent_of(base_price, pct)?,
        ),
    };

    Some(Adjustment {
        kind: AdjustmentKind::SpecialDate,
        label,
        amount,
    })
}

fn rule_adjustment(rule: &PricingRule, block: &TimeBlock, base_price: Decimal, hours: Decimal) -> Option<Adjustment> {
    let price = block.price.unwrap_or_default();
    Some(Adjustment {
        kind: AdjustmentKind::Rule,
        label: format!(
            "{} rate {}/h {} ({})",
            block.price_type,
            price.normalize(),
            block.window(),
            rule.id
        ),
        amount: hourly_total(price, hours)?.checked_sub(base_price)?,
    })
}

/// Night and weekend surcharges, both computed off the same base (additive).
fn fallback_surcharges(candidate: &BookingCandidate, base_price: Decimal, settings: &QuoteSettings) -> Vec<Adjustment> {
    let mut surcharges = Vec::new();

    if candidate.start_time >= settings.night_start {
        if let Some(amount) = percent_of(base_price, settings.night_rate_percent) {
            surcharges.push(Adjustment {
                kind: AdjustmentKind::NightSurcharge,
                label: format!(
                    "Night rate +{}% from {}",
                    settings.night_rate_percent.normalize(),
                    settings.night_start
                ),
                amount,
            });
        }
    }

    if candidate.day().is_weekend() {
        if let Some(amount) = percent_of(base_price, settings.weekend_rate_percent) {
            surcharges.push(Adjustment {
                kind: AdjustmentKind::WeekendSurcharge,
                label: format!("Weekend rate +{}%", settings.weekend_rate_percent.normalize()),
                amount,
            });
        }
    }

    surcharges
}
