//! Request DTOs for pricing API endpoints.

use chrono::NaiveDate;
use serde::Deserialize;

use super::clock::{ClockTime, SlotDuration};
use super::migration::{StoredCatalog, StoredRule};
use super::models::{BookingCandidate, CourtId, TimeBlock};
use super::services::PricingError;

/// Booking candidate as sent by the client. Every field is checked when
/// converted into a [`BookingCandidate`].
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateRequest {
    /// Number or numeric string.
    #[serde(default)]
    pub court_id: Option<serde_json::Value>,
    #[serde(default)]
    pub sport: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub start_time: Option<String>,
    #[serde(default, alias = "durationLabel")]
    pub duration: Option<String>,
}

impl TryFrom<CandidateRequest> for BookingCandidate {
    type Error = PricingError;

    fn try_from(req: CandidateRequest) -> Result<Self, Self::Error> {
        let court_id = match req.court_id {
            None | Some(serde_json::Value::Null) => return Err(PricingError::missing("courtId")),
            Some(value) => parse_court_id(&value)?,
        };

        let sport = req
            .sport
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| PricingError::missing("sport"))?;

        let date = required(req.date, "date")?;
        let date = NaiveDate::parse_from_str(&date, "%Y-%m-%d")
            .map_err(|_| PricingError::invalid("date", format!("'{date}' is not a YYYY-MM-DD date")))?;

        let start_time = required(req.start_time, "startTime")?
            .parse::<ClockTime>()
            .map_err(|e| PricingError::invalid("startTime", e))?;

        let duration = required(req.duration, "duration")?
            .parse::<SlotDuration>()
            .map_err(|e| PricingError::invalid("duration", e))?;

        Ok(BookingCandidate {
            court_id,
            sport,
            date,
            start_time,
            duration,
        })
    }
}

fn required(value: Option<String>, field: &'static str) -> Result<String, PricingError> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| PricingError::missing(field))
}

fn parse_court_id(value: &serde_json::Value) -> Result<CourtId, PricingError> {
    let parsed = match value {
        serde_json::Value::Number(n) => n.as_u64().and_then(|n| CourtId::try_from(n).ok()),
        serde_json::Value::String(s) => s.trim().parse::<CourtId>().ok(),
        _ => None,
    };
    parsed.ok_or_else(|| PricingError::invalid("courtId", format!("{value} is not a court number")))
}

/// Quote against a catalog sent inline with the request
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteRequest {
    #[serde(default)]
    pub catalog: StoredCatalog,
    pub candidate: CandidateRequest,
    #[serde(default)]
    pub payment_method_id: Option<String>,
}

/// Quote against an institution's cached catalog
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstitutionQuoteRequest {
    pub candidate: CandidateRequest,
    #[serde(default)]
    pub payment_method_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConflictCheckRequest {
    #[serde(alias = "blocks")]
    pub time_blocks: Vec<TimeBlock>,
}

#[derive(Debug, Deserialize)]
pub struct MigrateRulesRequest {
    pub rules: Vec<StoredRule>,
}
