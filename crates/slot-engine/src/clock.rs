//! Source of "today" for horizon computation.

use chrono::{NaiveDate, Utc};
use chrono_tz::Tz;

use crate::error::ConfigError;

/// Something that knows the current calendar day.
pub trait Clock: Send + Sync {
    fn today(&self) -> NaiveDate;
}

/// Wall clock. Without a timezone the day is taken in UTC.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock {
    tz: Option<Tz>,
}

impl SystemClock {
    pub fn utc() -> Self {
        Self { tz: None }
    }

    pub fn in_timezone(tz: Tz) -> Self {
        Self { tz: Some(tz) }
    }

    /// Resolve an IANA zone name such as `"Europe/Paris"`.
    pub fn from_timezone_name(name: &str) -> Result<Self, ConfigError> {
        let tz: Tz = name
            .parse()
            .map_err(|_| ConfigError::InvalidTimezone(name.to_string()))?;
        Ok(Self::in_timezone(tz))
    }
}

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        let now = Utc::now();
        match self.tz {
            Some(tz) => now.with_timezone(&tz).date_naive(),
            None => now.date_naive(),
        }
    }
}

/// A clock pinned to one day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedClock(pub NaiveDate);

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_unknown_timezone() {
        let err = SystemClock::from_timezone_name("Mars/Olympus_Mons").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidTimezone(_)));
        assert!(SystemClock::from_timezone_name("Europe/Paris").is_ok());
    }

    #[test]
    fn fixed_clock_returns_its_day() {
        let day = NaiveDate::from_ymd_opt(2023, 9, 26).unwrap();
        assert_eq!(FixedClock(day).today(), day);
    }
}
