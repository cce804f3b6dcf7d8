// Calendar moment model
// A wall-clock point in a concrete zone, plus the ISO 8601 duration record.

use chrono::{DateTime, Datelike, Duration, LocalResult, NaiveDate, NaiveDateTime, NaiveTime, TimeZone};
use chrono_tz::Tz;
use serde::Serialize;

/// A parsed iCalendar date or date-time. Date-only moments have no time
/// component and convert as midnight in their zone. UTC moments always
/// carry `zone == Tz::UTC`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Moment {
    pub date: NaiveDate,
    pub time: Option<NaiveTime>,
    pub zone: Tz,
    pub utc: bool,
}

impl Moment {
    pub fn is_date_only(&self) -> bool {
        self.time.is_none()
    }

    /// Wall-clock representation; midnight for date-only moments.
    pub fn naive(&self) -> NaiveDateTime {
        self.date.and_time(self.time.unwrap_or(NaiveTime::MIN))
    }

    /// The moment anchored in its zone.
    pub fn resolved(&self) -> DateTime<Tz> {
        resolve_local(self.zone, self.naive())
    }

    pub fn epoch(&self) -> i64 {
        self.resolved().timestamp()
    }
}

/// Anchor a wall-clock time in a zone. Ambiguous times (autumn fold-back)
/// take the earlier instant; times inside a spring-forward gap are pushed
/// past the transition.
pub(crate) fn resolve_local(zone: Tz, naive: NaiveDateTime) -> DateTime<Tz> {
    match zone.from_local_datetime(&naive) {
        LocalResult::Single(dt) => dt,
        LocalResult::Ambiguous(first, _) => first,
        LocalResult::None => {
            let shifted = naive + Duration::hours(1);
            match zone.from_local_datetime(&shifted) {
                LocalResult::Single(dt) => dt,
                LocalResult::Ambiguous(first, _) => first,
                LocalResult::None => zone.from_utc_datetime(&naive),
            }
        }
    }
}

/// Move a date by whole months, clamping the day to the target month's
/// length (31 Jan + 1 month = 28/29 Feb).
pub(crate) fn shift_months(date: NaiveDate, months: i32) -> NaiveDate {
    let total = i64::from(date.year()) * 12 + i64::from(date.month()) - 1 + i64::from(months);
    let year = total.div_euclid(12) as i32;
    let month = (total.rem_euclid(12) + 1) as u32;
    let day = date.day().min(days_in_month(year, month));
    NaiveDate::from_ymd_opt(year, month, day).unwrap_or(date)
}

pub(crate) fn days_in_month(year: i32, month: u32) -> u32 {
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|d| d.pred_opt())
        .map(|d| d.day())
        .unwrap_or(30)
}

/// An ISO 8601 duration with signed calendar fields. Applied by field
/// addition in the order years, months, days, hours, minutes, seconds;
/// the year and month steps clamp the day like [`shift_months`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IcsDuration {
    pub years: i32,
    pub months: i32,
    pub days: i64,
    pub hours: i64,
    pub minutes: i64,
    pub seconds: i64,
}

impl IcsDuration {
    pub fn apply(&self, start: NaiveDateTime) -> NaiveDateTime {
        let date = shift_months(start.date(), self.years * 12 + self.months);
        date.and_time(start.time())
            + Duration::days(self.days)
            + Duration::hours(self.hours)
            + Duration::minutes(self.minutes)
            + Duration::seconds(self.seconds)
    }
}
