use std::env;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, Context};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::pricing::clock::ClockTime;
use crate::pricing::settings::{BaseRates, QuoteSettings};

const DEFAULT_SPORT_RATES: &str = "Padel=2500,Tenis=1800,Fútbol=3000";

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub settings: QuoteSettings,
    pub cache_capacity: u64,
    pub cache_ttl: Duration,
    pub catalog_dir: Option<PathBuf>,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup. Unset or blank keys take their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let port = parse_or(get("PORT"), 8080, "PORT")?;
        let rounding_increment = parse_or(get("PRICING_ROUNDING_INCREMENT"), dec!(100), "PRICING_ROUNDING_INCREMENT")?;
        let night_start = match get("PRICING_NIGHT_START") {
            Some(text) => text
                .parse::<ClockTime>()
                .with_context(|| format!("PRICING_NIGHT_START '{text}'"))?,
            None => QuoteSettings::default().night_start,
        };
        let night_rate_percent = parse_or(get("PRICING_NIGHT_RATE"), dec!(25), "PRICING_NIGHT_RATE")?;
        let weekend_rate_percent = parse_or(get("PRICING_WEEKEND_RATE"), dec!(30), "PRICING_WEEKEND_RATE")?;
        let default_rate = parse_or(get("PRICING_DEFAULT_HOURLY_RATE"), dec!(2000), "PRICING_DEFAULT_HOURLY_RATE")?;
        let base_rates = parse_sport_rates(
            &get("PRICING_SPORT_RATES").unwrap_or_else(|| DEFAULT_SPORT_RATES.to_string()),
            default_rate,
        )?;

        let cache_capacity = parse_or(get("CATALOG_CACHE_CAPACITY"), 500, "CATALOG_CACHE_CAPACITY")?;
        let cache_ttl_secs = parse_or(get("CATALOG_CACHE_TTL_SECS"), 3600, "CATALOG_CACHE_TTL_SECS")?;

        Ok(Self {
            port,
            settings: QuoteSettings {
                rounding_increment,
                night_start,
                night_rate_percent,
                weekend_rate_percent,
                base_rates,
            },
            cache_capacity,
            cache_ttl: Duration::from_secs(cache_ttl_secs),
            catalog_dir: get("PRICING_CATALOG_DIR").map(PathBuf::from),
        })
    }
}

fn parse_or<T>(value: Option<String>, default: T, key: &str) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match value {
        Some(text) => text
            .parse()
            .map_err(|e| anyhow!("{key} must be a number, got '{text}': {e}")),
        None => Ok(default),
    }
}

/// Parse `Sport=rate,Sport=rate`. Blank entries are ignored.
fn parse_sport_rates(text: &str, default_rate: Decimal) -> anyhow::Result<BaseRates> {
    text.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .try_fold(BaseRates::new(default_rate), |rates, entry| {
            let (sport, rate) = entry
                .split_once('=')
                .ok_or_else(|| anyhow!("PRICING_SPORT_RATES entry '{entry}' is not Sport=rate"))?;
            let rate: Decimal = rate
                .trim()
                .parse()
                .with_context(|| format!("PRICING_SPORT_RATES rate for '{}'", sport.trim()))?;
            Ok(rates.with_sport(sport.trim(), rate))
        })
}
