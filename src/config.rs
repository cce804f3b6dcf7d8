// Parser configuration
// Recognised options and their defaults; unknown keys are ignored on
// deserialisation.

use std::str::FromStr;

use chrono::{Duration, Utc, Weekday};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::error::IcsError;
use crate::models::rrule::weekday_from_code;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    /// Years past "now" at which an unbounded recurrence is cut off.
    pub default_span: u32,
    /// IANA zone applied to floating dates and unresolvable TZIDs.
    pub default_time_zone: String,
    /// Two-letter weekday code used when a rule carries no WKST.
    pub default_week_start: String,
    /// Bypass recurrence expansion entirely.
    pub skip_recurrence: bool,
    /// Bypass the smart-quote normaliser.
    pub disable_character_replacement: bool,
    /// Drop events starting more than this many days before now.
    pub filter_days_before: Option<u32>,
    /// Drop events starting more than this many days after now.
    pub filter_days_after: Option<u32>,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            default_span: 2,
            default_time_zone: "UTC".to_string(),
            default_week_start: "MO".to_string(),
            skip_recurrence: false,
            disable_character_replacement: false,
            filter_days_before: None,
            filter_days_after: None,
        }
    }
}

impl ParserConfig {
    /// Validate option values. Failures here are the only fatal errors a
    /// parse can raise.
    pub fn validate(&self) -> Result<(), IcsError> {
        if self.default_span == 0 {
            return Err(IcsError::Configuration(
                "default_span must be at least 1 year".to_string(),
            ));
        }
        if Tz::from_str(&self.default_time_zone).is_err() {
            return Err(IcsError::Configuration(format!(
                "default_time_zone '{}' is not a recognised IANA zone",
                self.default_time_zone
            )));
        }
        if weekday_from_code(&self.default_week_start).is_none() {
            return Err(IcsError::Configuration(format!(
                "default_week_start '{}' is not a two-letter weekday",
                self.default_week_start
            )));
        }
        Ok(())
    }

    pub(crate) fn zone(&self) -> Tz {
        Tz::from_str(&self.default_time_zone).unwrap_or(Tz::UTC)
    }

    pub(crate) fn week_start(&self) -> Weekday {
        weekday_from_code(&self.default_week_start).unwrap_or(Weekday::Mon)
    }

    /// The `[min, max]` epoch window derived from the filter-day options,
    /// or `None` when no filtering was requested.
    pub(crate) fn window(&self) -> Option<(i64, i64)> {
        if self.filter_days_before.is_none() && self.filter_days_after.is_none() {
            return None;
        }
        let now = Utc::now();
        let min = self
            .filter_days_before
            .map(|d| (now - Duration::days(i64::from(d))).timestamp())
            .unwrap_or(i64::MIN);
        let max = self
            .filter_days_after
            .map(|d| (now + Duration::days(i64::from(d))).timestamp())
            .unwrap_or(i64::MAX);
        Some((min, max))
    }
}
