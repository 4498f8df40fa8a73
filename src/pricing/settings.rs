//! Caller-supplied knobs for `quote()`.

use std::collections::HashMap;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;

use super::clock::ClockTime;

/// Hourly base rate per sport, with a fallback for sports not in the table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BaseRates {
    pub by_sport: HashMap<String, Decimal>,
    pub default_rate: Decimal,
}

impl BaseRates {
    pub fn new(default_rate: Decimal) -> Self {
        Self {
            by_sport: HashMap::new(),
            default_rate,
        }
    }

    pub fn with_sport(mut self, sport: impl Into<String>, rate: Decimal) -> Self {
        self.by_sport.insert(sport.into(), rate);
        self
    }

    pub fn hourly_rate(&self, sport: &str) -> Decimal {
        self.by_sport.get(sport).copied().unwrap_or(self.default_rate)
    }
}

impl Default for BaseRates {
    fn default() -> Self {
        Self::new(dec!(2000))
            .with_sport("Padel", dec!(2500))
            .with_sport("Tenis", dec!(1800))
            .with_sport("Fútbol", dec!(3000))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuoteSettings {
    /// Final prices are rounded to a multiple of this. Zero disables rounding.
    pub rounding_increment: Decimal,
    /// Fallback night surcharge applies to slots starting at or after this time.
    pub night_start: ClockTime,
    pub night_rate_percent: Decimal,
    pub weekend_rate_percent: Decimal,
    pub base_rates: BaseRates,
}

impl Default for QuoteSettings {
    fn default() -> Self {
        Self {
            rounding_increment: dec!(100),
            night_start: ClockTime::from_minutes(18 * 60).unwrap_or(ClockTime::MIDNIGHT),
            night_rate_percent: dec!(25),
            weekend_rate_percent: dec!(30),
            base_rates: BaseRates::default(),
        }
    }
}

impl QuoteSettings {
    pub fn with_base_rates(mut self, base_rates: BaseRates) -> Self {
        self.base_rates = base_rates;
        self
    }
}
