//! Time-of-day, slot duration and weekday primitives.
//!
//! Catalog data arrives as strings ("19:00", "1.5h", "Sábado"); these types
//! parse them once so the resolver only ever compares integers.

use std::fmt;
use std::str::FromStr;

use chrono::Weekday;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

pub const MINUTES_PER_DAY: u16 = 24 * 60;

/// A time of day with minute precision, stored as minutes since midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ClockTime(u16);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid time of day '{0}', expected HH:MM")]
pub struct ClockParseError(pub String);

impl ClockTime {
    pub const MIDNIGHT: ClockTime = ClockTime(0);

    pub fn from_hm(hours: u8, minutes: u8) -> Option<Self> {
        if hours < 24 && minutes < 60 {
            Some(Self(u16::from(hours) * 60 + u16::from(minutes)))
        } else {
            None
        }
    }

    pub fn from_minutes(minutes: u16) -> Option<Self> {
        (minutes < MINUTES_PER_DAY).then_some(Self(minutes))
    }

    /// Minutes since midnight.
    pub fn minutes(self) -> u16 {
        self.0
    }

    /// Minutes from `self` to `later`, zero when `later` is not after `self`.
    pub fn minutes_until(self, later: ClockTime) -> u16 {
        later.0.saturating_sub(self.0)
    }
}

impl FromStr for ClockTime {
    type Err = ClockParseError;

    /// Accepts `H:MM` and `HH:MM`, hours 0-23, minutes always two digits.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ClockParseError(s.to_string());
        let (h, m) = s.trim().split_once(':').ok_or_else(err)?;

        let digits = |part: &str| !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit());
        if !digits(h) || h.len() > 2 || !digits(m) || m.len() != 2 {
            return Err(err());
        }

        let hours: u8 = h.parse().map_err(|_| err())?;
        let minutes: u8 = m.parse().map_err(|_| err())?;
        Self::from_hm(hours, minutes).ok_or_else(err)
    }
}

impl TryFrom<String> for ClockTime {
    type Error = ClockParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ClockTime> for String {
    fn from(value: ClockTime) -> Self {
        value.to_string()
    }
}

impl fmt::Display for ClockTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.0 / 60, self.0 % 60)
    }
}

/// Length of a booked slot.
///
/// Labels are written several ways across stored data ("1h", "1.5h", "90m",
/// "01:30"); they all normalise to the same number of minutes, which is what
/// equality and ordering use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SlotDuration(u16);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid duration '{0}', expected a label like 1h, 1.5h, 90m or 01:30")]
pub struct DurationParseError(pub String);

impl SlotDuration {
    pub fn from_minutes(minutes: u16) -> Option<Self> {
        (minutes > 0 && minutes <= MINUTES_PER_DAY).then_some(Self(minutes))
    }

    pub fn minutes(self) -> u16 {
        self.0
    }

    /// Duration in (possibly fractional) hours.
    pub fn hours(self) -> Decimal {
        (Decimal::from(self.0) / Decimal::from(60)).normalize()
    }
}

impl FromStr for SlotDuration {
    type Err = DurationParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || DurationParseError(s.to_string());
        let label = s.trim().to_ascii_lowercase();

        let minutes: Decimal = if let Some(hours) = label.strip_suffix('h') {
            let hours: Decimal = hours.trim().parse().map_err(|_| err())?;
            hours.checked_mul(Decimal::from(60)).ok_or_else(err)?
        } else if let Some(mins) = label
            .strip_suffix("min")
            .or_else(|| label.strip_suffix('m'))
        {
            mins.trim().parse().map_err(|_| err())?
        } else if let Some((h, m)) = label.split_once(':') {
            let h: u16 = h.parse().map_err(|_| err())?;
            let m: u16 = m.parse().map_err(|_| err())?;
            if m >= 60 {
                return Err(err());
            }
            let total = h.checked_mul(60).and_then(|h| h.checked_add(m)).ok_or_else(err)?;
            Decimal::from(total)
        } else {
            return Err(err());
        };

        if minutes.fract() != Decimal::ZERO {
            return Err(err());
        }
        let minutes = minutes.to_u16().ok_or_else(err)?;
        Self::from_minutes(minutes).ok_or_else(err)
    }
}

impl TryFrom<String> for SlotDuration {
    type Error = DurationParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<SlotDuration> for String {
    fn from(value: SlotDuration) -> Self {
        value.to_string()
    }
}

impl fmt::Display for SlotDuration {
    /// Whole and half hours print as hour labels ("2h", "1.5h"), anything else in minutes.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0 % 30 == 0 {
            write!(f, "{}h", self.hours().normalize())
        } else {
            write!(f, "{}m", self.0)
        }
    }
}

/// Day of the week a rule is active on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum Day {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown day of week '{0}'")]
pub struct DayParseError(pub String);

impl Day {
    pub const ALL: [Day; 7] = [
        Day::Monday,
        Day::Tuesday,
        Day::Wednesday,
        Day::Thursday,
        Day::Friday,
        Day::Saturday,
        Day::Sunday,
    ];

    pub fn is_weekend(self) -> bool {
        matches!(self, Day::Saturday | Day::Sunday)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Day::Monday => "monday",
            Day::Tuesday => "tuesday",
            Day::Wednesday => "wednesday",
            Day::Thursday => "thursday",
            Day::Friday => "friday",
            Day::Saturday => "saturday",
            Day::Sunday => "sunday",
        }
    }
}

impl From<Weekday> for Day {
    fn from(value: Weekday) -> Self {
        match value {
            Weekday::Mon => Day::Monday,
            Weekday::Tue => Day::Tuesday,
            Weekday::Wed => Day::Wednesday,
            Weekday::Thu => Day::Thursday,
            Weekday::Fri => Day::Friday,
            Weekday::Sat => Day::Saturday,
            Weekday::Sun => Day::Sunday,
        }
    }
}

impl FromStr for Day {
    type Err = DayParseError;

    /// English full or short names and Spanish names, case and accent insensitive.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let folded: String = s
            .trim()
            .to_lowercase()
            .chars()
            .map(|c| match c {
                'á' => 'a',
                'é' => 'e',
                _ => c,
            })
            .collect();

        let day = match folded.as_str() {
            "monday" | "mon" | "lunes" => Day::Monday,
            "tuesday" | "tue" | "martes" => Day::Tuesday,
            "wednesday" | "wed" | "miercoles" => Day::Wednesday,
            "thursday" | "thu" | "jueves" => Day::Thursday,
            "friday" | "fri" | "viernes" => Day::Friday,
            "saturday" | "sat" | "sabado" => Day::Saturday,
            "sunday" | "sun" | "domingo" => Day::Sunday,
            _ => return Err(DayParseError(s.to_string())),
        };
        Ok(day)
    }
}

impl TryFrom<String> for Day {
    type Error = DayParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl fmt::Display for Day {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
