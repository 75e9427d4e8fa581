//! Weekly schedule codec.
//!
//! Converts a weekday/hour/AM-PM selection made in the caller's local
//! timezone into a UTC-anchored [`ScheduleToken`] and back.
//!
//! The token only stores a UTC hour and a UTC day of week, so the weekday
//! digits inside it may differ from the local weekday the user picked:
//! 11 PM Wednesday in UTC-5 is stored as Thursday 04:00. Decoding in the
//! same timezone restores the original selection.
//!
//! # Example
//!
//! ```
//! use chrono::{TimeZone, Utc};
//! use letterbox_core::schedule::{FixedClock, FixedTimezone, ScheduleCodec};
//! use letterbox_core::Period;
//!
//! let codec = ScheduleCodec::new(
//!     FixedClock(Utc.with_ymd_and_hms(2026, 3, 4, 12, 0, 0).unwrap()),
//!     FixedTimezone::parse("Etc/GMT+5").unwrap(),
//! );
//!
//! let token = codec.encode("WED", 11, Period::Pm).unwrap();
//! assert_eq!(token.as_str(), "cron(0 4 ? * 5 *)");
//!
//! let decoded = codec.decode(token.as_str()).unwrap();
//! assert_eq!(decoded.display, "Wednesday at 11:00 PM");
//! ```

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Timelike, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use thiserror::Error;

mod clock;

pub use clock::{Clock, FixedClock, FixedTimezone, SystemClock, SystemTimezone, TimezoneSource};

use crate::model::{Period, ScheduleSelection, ScheduleToken, Weekday};

/// Error type for schedule operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScheduleError {
    /// The weekday code is not one of `SUN`..`SAT`.
    #[error("invalid weekday: {code}")]
    InvalidWeekday { code: String },

    /// The period is not `AM` or `PM`.
    #[error("invalid period: {value} (expected AM or PM)")]
    InvalidPeriod { value: String },

    /// The hour is outside the accepted range.
    #[error("invalid hour {hour} (expected {min}-{max})")]
    InvalidHour { hour: u8, min: u8, max: u8 },

    /// The token is not of the form `cron(0 H ? * D *)`.
    #[error("invalid schedule token {token:?}: {reason}")]
    InvalidScheduleToken { token: String, reason: String },

    /// The timezone name is not a known IANA zone.
    #[error("unknown timezone: {name}")]
    UnknownTimezone { name: String },

    /// The local time cannot be represented in the timezone.
    #[error("local time {local} does not exist in {timezone}")]
    NonexistentLocalTime { local: String, timezone: String },
}

/// A schedule token read back into the caller's local time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecodedSchedule {
    pub weekday: Weekday,
    /// Hour on a 12-hour clock (1-12).
    pub hour: u8,
    pub period: Period,
    /// `"<Weekday> at <hour>:00 <AM|PM>"`.
    pub display: String,
}

impl DecodedSchedule {
    fn new(weekday: Weekday, hour24: u8) -> Result<Self, ScheduleError> {
        let (hour, period) = Period::from_hour24(hour24)?;
        Ok(Self {
            weekday,
            hour,
            period,
            display: format!("{} at {}:00 {}", weekday.label(), hour, period),
        })
    }

    /// Short label used in provider listings, e.g. `"Every Monday"`.
    pub fn every_label(&self) -> String {
        format!("Every {}", self.weekday.label())
    }

    /// The decoded value as a selection.
    pub fn selection(&self) -> ScheduleSelection {
        ScheduleSelection {
            weekday: self.weekday,
            hour: self.hour,
            period: self.period,
        }
    }
}

/// Schedule codec bound to a clock and a timezone source.
#[derive(Debug, Clone)]
pub struct ScheduleCodec<C = SystemClock, Z = SystemTimezone> {
    clock: C,
    timezone: Z,
}

impl ScheduleCodec {
    /// Codec using the system clock and the `TZ` environment variable.
    pub fn system() -> Self {
        Self::new(SystemClock, SystemTimezone)
    }
}

impl<C: Clock, Z: TimezoneSource> ScheduleCodec<C, Z> {
    pub fn new(clock: C, timezone: Z) -> Self {
        Self { clock, timezone }
    }

    /// The timezone this codec encodes from and decodes into.
    pub fn timezone(&self) -> Tz {
        self.timezone.timezone()
    }

    /// Encode a weekday code and a 12-hour clock time.
    pub fn encode(&self, weekday: &str, hour12: u8, period: Period) -> Result<ScheduleToken, ScheduleError> {
        let weekday = Weekday::from_code(weekday)?;
        let hour24 = period.to_hour24(hour12)?;
        encode_at(weekday, hour24, self.timezone.timezone(), self.clock.now())
    }

    /// Encode a weekday code and an already converted 24-hour value.
    pub fn encode_hour24(&self, weekday: &str, hour24: u8) -> Result<ScheduleToken, ScheduleError> {
        let weekday = Weekday::from_code(weekday)?;
        encode_at(weekday, hour24, self.timezone.timezone(), self.clock.now())
    }

    /// Encode a validated selection.
    pub fn encode_selection(&self, selection: &ScheduleSelection) -> Result<ScheduleToken, ScheduleError> {
        encode_at(
            selection.weekday,
            selection.hour24()?,
            self.timezone.timezone(),
            self.clock.now(),
        )
    }

    /// Decode a token string into local weekday and time.
    pub fn decode(&self, token: &str) -> Result<DecodedSchedule, ScheduleError> {
        let token = ScheduleToken::parse(token)?;
        decode_at(&token, self.timezone.timezone(), self.clock.now())
    }

    /// When the first newsletter for a selection goes out.
    pub fn first_dispatch(&self, selection: &ScheduleSelection) -> Result<DateTime<Tz>, ScheduleError> {
        first_dispatch_at(
            selection.weekday,
            selection.hour24()?,
            self.timezone.timezone(),
            self.clock.now(),
        )
    }
}

/// Encode `weekday` at `hour24` local time in `tz`, as seen from `now`.
///
/// The local date used is the next one on or after today (in `tz`) that
/// falls on `weekday`. Offsets that are not whole hours lose their minutes,
/// since the token has no minute field.
pub fn encode_at(
    weekday: Weekday,
    hour24: u8,
    tz: Tz,
    now: DateTime<Utc>,
) -> Result<ScheduleToken, ScheduleError> {
    check_hour24(hour24)?;

    let today = now.with_timezone(&tz).date_naive();
    let date = next_on_or_after(today, weekday);
    let local = resolve_local(tz, at_hour(date, hour24))?;
    let utc = local.with_timezone(&Utc);

    if utc.minute() != 0 {
        tracing::debug!(
            "{} has a non-hourly offset, dropping {} minutes from the schedule",
            tz,
            utc.minute()
        );
    }

    // hour() is always < 24
    let token = ScheduleToken::from_utc(utc.hour() as u8, utc.weekday().into());
    tracing::debug!("Encoded {} {}:00 {} as {}", weekday, hour24, tz, token);
    Ok(token)
}

/// Decode `token` into local time in `tz`, as seen from `now`.
///
/// Looks for the token's instant inside the same window [`encode_at`] picks
/// from: the seven local dates starting today. When a DST fall-back makes
/// that window an hour longer than a week, one token occurs twice in it (the
/// first and the last hour); the later, upcoming one wins.
pub fn decode_at(token: &ScheduleToken, tz: Tz, now: DateTime<Utc>) -> Result<DecodedSchedule, ScheduleError> {
    let today = now.with_timezone(&tz).date_naive();
    let window_end = today + Duration::days(7);

    // Local dates run at most a day behind UTC ones, so three weekly
    // candidates from yesterday's UTC date cover the whole window.
    let from = next_on_or_after(today - Duration::days(1), token.utc_weekday());
    let first = Utc.from_utc_datetime(&at_hour(from, token.utc_hour()));
    let candidates = [0, 1, 2].map(|week| (first + Duration::weeks(week)).with_timezone(&tz));

    let local = candidates
        .iter()
        .rev()
        .find(|local| (today..window_end).contains(&local.date_naive()))
        .or_else(|| candidates.iter().find(|local| local.date_naive() >= today))
        .unwrap_or(&candidates[0]);

    DecodedSchedule::new(local.weekday().into(), local.hour() as u8)
}

/// First local instant strictly after `now` that falls on `weekday` at `hour24`.
pub fn first_dispatch_at(
    weekday: Weekday,
    hour24: u8,
    tz: Tz,
    now: DateTime<Utc>,
) -> Result<DateTime<Tz>, ScheduleError> {
    check_hour24(hour24)?;

    let local_now = now.with_timezone(&tz);
    let date = next_on_or_after(local_now.date_naive(), weekday);
    let candidate = resolve_local(tz, at_hour(date, hour24))?;
    if candidate > local_now {
        return Ok(candidate);
    }
    resolve_local(tz, at_hour(date + Duration::days(7), hour24))
}

fn check_hour24(hour24: u8) -> Result<(), ScheduleError> {
    if hour24 > 23 {
        return Err(ScheduleError::InvalidHour {
            hour: hour24,
            min: 0,
            max: 23,
        });
    }
    Ok(())
}

/// The first date on or after `from` that falls on `weekday`.
fn next_on_or_after(from: NaiveDate, weekday: Weekday) -> NaiveDate {
    let current = from.weekday().num_days_from_sunday();
    let ahead = (weekday.num_days_from_sunday() + 7 - current) % 7;
    from + Duration::days(i64::from(ahead))
}

fn at_hour(date: NaiveDate, hour24: u8) -> NaiveDateTime {
    date.and_time(NaiveTime::MIN) + Duration::hours(i64::from(hour24))
}

/// Map a wall-clock time to an instant.
///
/// Ambiguous times take the earlier instant. Times inside a DST gap move
/// forward one hour, the way a wall clock does.
fn resolve_local(tz: Tz, local: NaiveDateTime) -> Result<DateTime<Tz>, ScheduleError> {
    if let Some(instant) = tz.from_local_datetime(&local).earliest() {
        return Ok(instant);
    }
    tz.from_local_datetime(&(local + Duration::hours(1)))
        .earliest()
        .ok_or_else(|| ScheduleError::NonexistentLocalTime {
            local: local.to_string(),
            timezone: tz.to_string(),
        })
}
