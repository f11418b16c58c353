//! Wall-clock deadlines ("15:30") and their resolution against the canonical zone.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use chrono_tz::Tz;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::OrderError;

static TIME_OF_DAY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(2[0-3]|[01]?[0-9]):([0-5]?[0-9])$").expect("time-of-day pattern compiles"));

/// An hour:minute time of day typed by a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deadline {
    hour: u32,
    minute: u32,
}

/// A deadline pinned to an absolute instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedDeadline {
    pub expiry_at: DateTime<Utc>,
    /// The time of day had already passed, so the deadline rolled to tomorrow.
    pub is_tomorrow: bool,
}

impl Deadline {
    pub fn new(hour: u32, minute: u32) -> Result<Self, OrderError> {
        if hour > 23 || minute > 59 {
            return Err(OrderError::InvalidInput(format!(
                "time of day out of range: {}:{}",
                hour, minute
            )));
        }
        Ok(Self { hour, minute })
    }

    /// Pins the deadline to today in `tz`, or tomorrow when it is already
    /// strictly in the past.
    pub fn resolve(&self, now: DateTime<Utc>, tz: Tz) -> Result<ResolvedDeadline, OrderError> {
        let today = now.with_timezone(&tz).date_naive();
        let candidate = self.at(today, tz)?;
        if candidate >= now {
            return Ok(ResolvedDeadline {
                expiry_at: candidate,
                is_tomorrow: false,
            });
        }

        let tomorrow = today
            .succ_opt()
            .ok_or_else(|| OrderError::InvalidInput("date out of range".to_string()))?;
        Ok(ResolvedDeadline {
            expiry_at: self.at(tomorrow, tz)?,
            is_tomorrow: true,
        })
    }

    fn at(&self, date: NaiveDate, tz: Tz) -> Result<DateTime<Utc>, OrderError> {
        date.and_hms_opt(self.hour, self.minute, 0)
            .and_then(|naive| tz.from_local_datetime(&naive).earliest())
            .map(|local| local.with_timezone(&Utc))
            .ok_or_else(|| {
                OrderError::InvalidInput(format!("{} does not exist on {} in {}", self, date, tz))
            })
    }
}

impl FromStr for Deadline {
    type Err = OrderError;

    /// Accepts `H:MM`, `HH:MM`, `H:M` with one or two digits per field.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || OrderError::InvalidInput(format!("invalid time: {}", s));

        let caps = TIME_OF_DAY.captures(s).ok_or_else(invalid)?;
        let field = |i: usize| caps[i].parse::<u32>().map_err(|_| invalid());

        Deadline::new(field(1)?, field(2)?)
    }
}

impl fmt::Display for Deadline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono_tz::Asia::Singapore;

    fn sgt(h: u32, m: u32) -> DateTime<Utc> {
        Singapore
            .with_ymd_and_hms(2024, 3, 15, h, m, 0)
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn test_parse_accepts_short_and_padded_forms() {
        assert_eq!("15:30".parse::<Deadline>().unwrap(), Deadline::new(15, 30).unwrap());
        assert_eq!("8:5".parse::<Deadline>().unwrap(), Deadline::new(8, 5).unwrap());
        assert_eq!("00:00".parse::<Deadline>().unwrap(), Deadline::new(0, 0).unwrap());
        assert_eq!("23:59".parse::<Deadline>().unwrap().to_string(), "23:59");
    }

    #[test]
    fn test_parse_rejects_malformed() {
        for bad in ["24:00", "12:60", "1230", "12:", ":30", "+1:30", "123:00", "ab:cd", "12:30:00", "", " 9:00", "9:00\n"] {
            assert!(
                matches!(bad.parse::<Deadline>(), Err(OrderError::InvalidInput(_))),
                "{} should be rejected",
                bad
            );
        }
    }

    #[test]
    fn test_resolve_later_today() {
        let resolved = Deadline::new(15, 30).unwrap().resolve(sgt(15, 25), Singapore).unwrap();
        assert!(!resolved.is_tomorrow);
        assert_eq!((resolved.expiry_at - sgt(15, 25)).num_seconds(), 300);
    }

    #[test]
    fn test_resolve_rolls_to_tomorrow() {
        let now = sgt(20, 0);
        let resolved = Deadline::new(8, 0).unwrap().resolve(now, Singapore).unwrap();
        assert!(resolved.is_tomorrow);
        assert_eq!((resolved.expiry_at - now).num_seconds(), 12 * 3600);
    }

    #[test]
    fn test_resolve_same_minute_is_today() {
        let now = sgt(9, 0);
        let resolved = Deadline::new(9, 0).unwrap().resolve(now, Singapore).unwrap();
        assert!(!resolved.is_tomorrow);
        assert_eq!(resolved.expiry_at, now);
    }
}
