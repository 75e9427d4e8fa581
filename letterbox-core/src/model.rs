//! Domain model types for Letterbox schedules.
//!
//! This module defines the types a weekly send-time selection is built from:
//! - [`Weekday`] - Day of the week, addressed by three-letter code
//! - [`Period`] - AM/PM half of a 12-hour clock
//! - [`ScheduleSelection`] - A weekday/hour/period picked by a user
//! - [`ScheduleToken`] - The canonical `cron(0 H ? * D *)` wire form

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::schedule::ScheduleError;

/// Day of the week, Sunday first.
///
/// # Examples
///
/// ```
/// use letterbox_core::Weekday;
///
/// let wed: Weekday = "wed".parse().unwrap();
/// assert_eq!(wed, Weekday::Wed);
/// assert_eq!(wed.label(), "Wednesday");
/// assert_eq!(wed.num_days_from_sunday(), 3);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Weekday {
    Sun,
    Mon,
    Tue,
    Wed,
    Thu,
    Fri,
    Sat,
}

impl Weekday {
    /// All weekdays in Sunday-first order.
    pub const ALL: [Weekday; 7] = [
        Weekday::Sun,
        Weekday::Mon,
        Weekday::Tue,
        Weekday::Wed,
        Weekday::Thu,
        Weekday::Fri,
        Weekday::Sat,
    ];

    /// Parse a three-letter code, ignoring case.
    pub fn from_code(code: &str) -> Result<Self, ScheduleError> {
        let upper = code.trim().to_ascii_uppercase();
        Self::ALL
            .iter()
            .copied()
            .find(|day| day.code() == upper)
            .ok_or_else(|| ScheduleError::InvalidWeekday {
                code: code.to_string(),
            })
    }

    /// Three-letter uppercase code (`"SUN"` .. `"SAT"`).
    pub fn code(&self) -> &'static str {
        match self {
            Self::Sun => "SUN",
            Self::Mon => "MON",
            Self::Tue => "TUE",
            Self::Wed => "WED",
            Self::Thu => "THU",
            Self::Fri => "FRI",
            Self::Sat => "SAT",
        }
    }

    /// Full English name.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Sun => "Sunday",
            Self::Mon => "Monday",
            Self::Tue => "Tuesday",
            Self::Wed => "Wednesday",
            Self::Thu => "Thursday",
            Self::Fri => "Friday",
            Self::Sat => "Saturday",
        }
    }

    /// 0-based index with Sunday = 0.
    pub fn num_days_from_sunday(&self) -> u32 {
        match self {
            Self::Sun => 0,
            Self::Mon => 1,
            Self::Tue => 2,
            Self::Wed => 3,
            Self::Thu => 4,
            Self::Fri => 5,
            Self::Sat => 6,
        }
    }

    /// Inverse of [`num_days_from_sunday`](Self::num_days_from_sunday), wrapping modulo 7.
    pub fn from_days_from_sunday(index: u32) -> Self {
        Self::ALL[(index % 7) as usize]
    }
}

impl From<chrono::Weekday> for Weekday {
    fn from(day: chrono::Weekday) -> Self {
        Self::from_days_from_sunday(day.num_days_from_sunday())
    }
}

impl From<Weekday> for chrono::Weekday {
    fn from(day: Weekday) -> Self {
        match day {
            Weekday::Sun => chrono::Weekday::Sun,
            Weekday::Mon => chrono::Weekday::Mon,
            Weekday::Tue => chrono::Weekday::Tue,
            Weekday::Wed => chrono::Weekday::Wed,
            Weekday::Thu => chrono::Weekday::Thu,
            Weekday::Fri => chrono::Weekday::Fri,
            Weekday::Sat => chrono::Weekday::Sat,
        }
    }
}

impl FromStr for Weekday {
    type Err = ScheduleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_code(s)
    }
}

impl fmt::Display for Weekday {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Half of a 12-hour clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Period {
    Am,
    Pm,
}

impl Period {
    /// Convert a 12-hour clock value to a 24-hour one.
    ///
    /// 12 AM is midnight (0) and 12 PM is noon (12); other PM hours add 12.
    pub fn to_hour24(&self, hour12: u8) -> Result<u8, ScheduleError> {
        if !(1..=12).contains(&hour12) {
            return Err(ScheduleError::InvalidHour {
                hour: hour12,
                min: 1,
                max: 12,
            });
        }
        Ok(match (self, hour12) {
            (Self::Am, 12) => 0,
            (Self::Am, h) => h,
            (Self::Pm, 12) => 12,
            (Self::Pm, h) => h + 12,
        })
    }

    /// Split a 24-hour value into a 12-hour value and its period.
    pub fn from_hour24(hour24: u8) -> Result<(u8, Period), ScheduleError> {
        if hour24 > 23 {
            return Err(ScheduleError::InvalidHour {
                hour: hour24,
                min: 0,
                max: 23,
            });
        }
        let period = if hour24 >= 12 { Self::Pm } else { Self::Am };
        let hour12 = match hour24 % 12 {
            0 => 12,
            h => h,
        };
        Ok((hour12, period))
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Am => "AM",
            Self::Pm => "PM",
        }
    }
}

impl FromStr for Period {
    type Err = ScheduleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "AM" => Ok(Self::Am),
            "PM" => Ok(Self::Pm),
            _ => Err(ScheduleError::InvalidPeriod {
                value: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A weekly send time as picked in a form.
///
/// The timezone is not part of the selection; it comes from the codec's
/// [`TimezoneSource`](crate::schedule::TimezoneSource).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleSelection {
    pub weekday: Weekday,
    /// Hour on a 12-hour clock (1-12).
    pub hour: u8,
    pub period: Period,
}

impl ScheduleSelection {
    /// Create a selection, validating the hour.
    pub fn new(weekday: Weekday, hour: u8, period: Period) -> Result<Self, ScheduleError> {
        period.to_hour24(hour)?;
        Ok(Self {
            weekday,
            hour,
            period,
        })
    }

    /// The selected hour on a 24-hour clock.
    pub fn hour24(&self) -> Result<u8, ScheduleError> {
        self.period.to_hour24(self.hour)
    }
}

impl fmt::Display for ScheduleSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at {}:00 {}", self.weekday.label(), self.hour, self.period)
    }
}

/// Canonical UTC-anchored weekly schedule, `cron(0 H ? * D *)`.
///
/// `H` is the UTC hour (0-23) and `D` the UTC day of week, 1-based with
/// Sunday = 1. Construct through the codec or [`ScheduleToken::parse`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ScheduleToken {
    raw: String,
    utc_hour: u8,
    cron_day_of_week: u8,
}

impl ScheduleToken {
    /// Build a token from its UTC components.
    pub fn from_utc(utc_hour: u8, utc_weekday: Weekday) -> Self {
        let cron_day_of_week = (utc_weekday.num_days_from_sunday() + 1) as u8;
        Self {
            raw: format!("cron(0 {} ? * {} *)", utc_hour, cron_day_of_week),
            utc_hour,
            cron_day_of_week,
        }
    }

    /// Parse and validate a token string.
    ///
    /// # Examples
    ///
    /// ```
    /// use letterbox_core::{ScheduleToken, Weekday};
    ///
    /// let token = ScheduleToken::parse("cron(0 13 ? * 2 *)").unwrap();
    /// assert_eq!(token.utc_hour(), 13);
    /// assert_eq!(token.utc_weekday(), Weekday::Mon);
    ///
    /// assert!(ScheduleToken::parse("not-a-cron-string").is_err());
    /// ```
    pub fn parse(token: &str) -> Result<Self, ScheduleError> {
        let invalid = |reason: &str| ScheduleError::InvalidScheduleToken {
            token: token.to_string(),
            reason: reason.to_string(),
        };

        let body = token
            .trim()
            .strip_prefix("cron(")
            .and_then(|rest| rest.strip_suffix(')'))
            .ok_or_else(|| invalid("expected cron(...)"))?;

        let fields: Vec<&str> = body.split_whitespace().collect();
        let [minute, hour, day_of_month, month, day_of_week, year] = fields.as_slice() else {
            return Err(invalid(&format!("expected 6 fields, got {}", fields.len())));
        };

        if *minute != "0" {
            return Err(invalid("minute field must be 0"));
        }
        if *day_of_month != "?" || *month != "*" || *year != "*" {
            return Err(invalid("expected weekly pattern '? *' and '*' for year"));
        }

        let utc_hour: u8 = hour
            .parse()
            .ok()
            .filter(|h| *h <= 23)
            .ok_or_else(|| invalid("hour must be 0-23"))?;
        let cron_day_of_week: u8 = day_of_week
            .parse()
            .ok()
            .filter(|d| (1..=7).contains(d))
            .ok_or_else(|| invalid("day of week must be 1-7"))?;

        Ok(Self {
            raw: format!("cron(0 {} ? * {} *)", utc_hour, cron_day_of_week),
            utc_hour,
            cron_day_of_week,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// UTC hour, 0-23.
    pub fn utc_hour(&self) -> u8 {
        self.utc_hour
    }

    /// UTC day of week as written in the token (1 = Sunday .. 7 = Saturday).
    pub fn cron_day_of_week(&self) -> u8 {
        self.cron_day_of_week
    }

    /// UTC day of week.
    pub fn utc_weekday(&self) -> Weekday {
        Weekday::from_days_from_sunday(u32::from(self.cron_day_of_week) - 1)
    }
}

impl fmt::Display for ScheduleToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}

impl FromStr for ScheduleToken {
    type Err = ScheduleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for ScheduleToken {
    type Error = ScheduleError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ScheduleToken> for String {
    fn from(token: ScheduleToken) -> Self {
        token.raw
    }
}
