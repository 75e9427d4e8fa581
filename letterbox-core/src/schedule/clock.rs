//! Time and timezone sources for the schedule codec.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;

use super::ScheduleError;

/// Source of "now".
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Reads the system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Always returns the same instant. Used by tests and by callers that need
/// encode and decode to agree on a single calendar day.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Source of the caller's IANA timezone.
pub trait TimezoneSource: Send + Sync {
    fn timezone(&self) -> Tz;
}

/// The caller's local timezone.
///
/// `TZ` wins when it names an IANA zone. Otherwise the zone configured in
/// the operating system is used (`/etc/localtime` and friends), and UTC only
/// when neither resolves.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemTimezone;

impl TimezoneSource for SystemTimezone {
    fn timezone(&self) -> Tz {
        let env = std::env::var("TZ").ok();
        resolve_system_timezone(env.as_deref(), || match iana_time_zone::get_timezone() {
            Ok(name) => Some(name),
            Err(e) => {
                tracing::debug!("Could not read the system timezone: {}", e);
                None
            }
        })
    }
}

fn resolve_system_timezone(env: Option<&str>, os: impl FnOnce() -> Option<String>) -> Tz {
    if let Some(name) = env {
        let name = name.trim_start_matches(':');
        match name.parse::<Tz>() {
            Ok(tz) => return tz,
            Err(_) => tracing::warn!("TZ={} is not an IANA timezone, ignoring it", name),
        }
    }

    match os() {
        Some(name) => match name.parse::<Tz>() {
            Ok(tz) => tz,
            Err(_) => {
                tracing::warn!("System timezone {} is not an IANA timezone, using UTC", name);
                Tz::UTC
            }
        },
        None => {
            tracing::warn!("No local timezone found, using UTC");
            Tz::UTC
        }
    }
}

/// A timezone chosen up front (configuration, command-line flag, tests).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedTimezone(pub Tz);

impl FixedTimezone {
    /// Parse an IANA timezone name such as `"America/New_York"`.
    pub fn parse(name: &str) -> Result<Self, ScheduleError> {
        name.parse::<Tz>()
            .map(Self)
            .map_err(|_| ScheduleError::UnknownTimezone {
                name: name.to_string(),
            })
    }
}

impl TimezoneSource for FixedTimezone {
    fn timezone(&self) -> Tz {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_fixed_clock() {
        let instant = Utc.with_ymd_and_hms(2026, 3, 4, 10, 0, 0).unwrap();
        assert_eq!(FixedClock(instant).now(), instant);
    }

    #[test]
    fn test_fixed_timezone_parse() {
        let tz = FixedTimezone::parse("Asia/Tokyo").unwrap();
        assert_eq!(tz.timezone(), chrono_tz::Asia::Tokyo);

        let err = FixedTimezone::parse("Mars/Olympus_Mons").unwrap_err();
        assert!(matches!(err, ScheduleError::UnknownTimezone { .. }));
    }

    #[test]
    fn test_tz_variable_overrides_os_zone() {
        let tz = resolve_system_timezone(Some(":Asia/Tokyo"), || Some("Europe/Berlin".to_string()));
        assert_eq!(tz, chrono_tz::Asia::Tokyo);
    }

    #[test]
    fn test_os_zone_used_without_tz_variable() {
        let tz = resolve_system_timezone(None, || Some("America/New_York".to_string()));
        assert_eq!(tz, chrono_tz::America::New_York);

        let tz = resolve_system_timezone(Some("not/a-zone"), || Some("Europe/Berlin".to_string()));
        assert_eq!(tz, chrono_tz::Europe::Berlin);
    }

    #[test]
    fn test_falls_back_to_utc() {
        assert_eq!(resolve_system_timezone(None, || None), Tz::UTC);
        assert_eq!(resolve_system_timezone(None, || Some("Local".to_string())), Tz::UTC);
    }
}
