// Shared calendar arithmetic for the frequency generators.

use chrono::{Datelike, Duration, NaiveDate, Weekday};

use crate::models::moment::{days_in_month, shift_months};
use crate::models::rrule::ByDay;

/// Advance the cursor by whole months. The day of month is clamped to
/// the target month's length, so a cursor on 31 January lands on 28 or
/// 29 February rather than overflowing into March.
pub(super) fn advance_month(date: NaiveDate, interval: u32) -> NaiveDate {
    shift_months(date, interval as i32)
}

pub(super) fn advance_years(date: NaiveDate, interval: u32) -> NaiveDate {
    shift_months(date, interval as i32 * 12)
}

/// Resolve a BYMONTHDAY list against a concrete month. Negative entries
/// count back from the month's last day; entries that do not exist in
/// the month are dropped.
pub(super) fn resolve_month_days(by_month_day: &[i32], year: i32, month: u32) -> Vec<u32> {
    let len = days_in_month(year, month) as i32;
    let mut days: Vec<u32> = by_month_day
        .iter()
        .filter_map(|&entry| {
            let day = if entry > 0 { entry } else { len + entry + 1 };
            (day >= 1 && day <= len).then_some(day as u32)
        })
        .collect();
    days.sort_unstable();
    days.dedup();
    days
}

/// Days of a month matching a BYDAY list. Ordinal entries pick the nth
/// matching weekday from the start (positive) or end (negative) of the
/// month.
pub(super) fn byday_days_in_month(by_day: &[ByDay], year: i32, month: u32) -> Vec<u32> {
    let len = days_in_month(year, month);
    let mut days: Vec<u32> = Vec::new();
    for entry in by_day {
        match entry.ordinal {
            None => {
                for day in 1..=len {
                    if weekday_of(year, month, day) == Some(entry.weekday) {
                        days.push(day);
                    }
                }
            }
            Some(ordinal) if ordinal > 0 => {
                if let Some(first) = (1..=7).find(|&d| weekday_of(year, month, d) == Some(entry.weekday)) {
                    let day = first + (ordinal as u32 - 1) * 7;
                    if day <= len {
                        days.push(day);
                    }
                }
            }
            Some(ordinal) => {
                let start = len.saturating_sub(6).max(1);
                if let Some(last) = (start..=len)
                    .rev()
                    .find(|&d| weekday_of(year, month, d) == Some(entry.weekday))
                {
                    let back = (ordinal.unsigned_abs() - 1) * 7;
                    if last > back {
                        days.push(last - back);
                    }
                }
            }
        }
    }
    days.sort_unstable();
    days.dedup();
    days
}

/// Dates of a year matching a BYDAY list; ordinals count matching
/// weekdays from the start or end of the year.
pub(super) fn byday_dates_in_year(by_day: &[ByDay], year: i32) -> Vec<NaiveDate> {
    let mut dates: Vec<NaiveDate> = Vec::new();
    for entry in by_day {
        let matching = weekday_dates_in_year(year, entry.weekday);
        match entry.ordinal {
            None => dates.extend(&matching),
            Some(ordinal) if ordinal > 0 => {
                if let Some(&date) = matching.get(ordinal as usize - 1) {
                    dates.push(date);
                }
            }
            Some(ordinal) => {
                let back = ordinal.unsigned_abs() as usize;
                if back <= matching.len() {
                    dates.push(matching[matching.len() - back]);
                }
            }
        }
    }
    dates.sort_unstable();
    dates.dedup();
    dates
}

fn weekday_dates_in_year(year: i32, weekday: Weekday) -> Vec<NaiveDate> {
    let Some(jan1) = NaiveDate::from_ymd_opt(year, 1, 1) else {
        return Vec::new();
    };
    let offset = (7 + weekday.num_days_from_monday() as i64
        - jan1.weekday().num_days_from_monday() as i64)
        % 7;
    let mut date = jan1 + Duration::days(offset);
    let mut dates = Vec::with_capacity(53);
    while date.year() == year {
        dates.push(date);
        date += Duration::days(7);
    }
    dates
}

/// Number of ISO weeks in a year: 53 when the year starts on a Thursday
/// (or on a Wednesday in a leap year), 52 otherwise.
pub(super) fn iso_weeks_in_year(year: i32) -> u32 {
    let jan1 = match NaiveDate::from_ymd_opt(year, 1, 1) {
        Some(d) => d,
        None => return 52,
    };
    let leap = days_in_month(year, 2) == 29;
    match jan1.weekday() {
        Weekday::Thu => 53,
        Weekday::Wed if leap => 53,
        _ => 52,
    }
}

/// Expand BYWEEKNO entries into concrete dates. Negative week numbers
/// count back from the year's week total.
pub(super) fn week_no_dates(by_week_no: &[i32], year: i32) -> Vec<NaiveDate> {
    let total = iso_weeks_in_year(year) as i32;
    let mut dates: Vec<NaiveDate> = Vec::new();
    for &entry in by_week_no {
        let week = if entry > 0 { entry } else { total + entry + 1 };
        if week < 1 || week > total {
            continue;
        }
        for weekday in [
            Weekday::Mon,
            Weekday::Tue,
            Weekday::Wed,
            Weekday::Thu,
            Weekday::Fri,
            Weekday::Sat,
            Weekday::Sun,
        ] {
            if let Some(date) = NaiveDate::from_isoywd_opt(year, week as u32, weekday) {
                dates.push(date);
            }
        }
    }
    dates.sort_unstable();
    dates.dedup();
    dates
}

/// Expand BYYEARDAY entries into concrete dates; negatives count back
/// from the last day of the year.
pub(super) fn year_day_dates(by_year_day: &[i32], year: i32) -> Vec<NaiveDate> {
    let Some(jan1) = NaiveDate::from_ymd_opt(year, 1, 1) else {
        return Vec::new();
    };
    let total = if days_in_month(year, 2) == 29 { 366 } else { 365 };
    let mut dates: Vec<NaiveDate> = Vec::new();
    for &entry in by_year_day {
        let ordinal = if entry > 0 { entry } else { total + entry + 1 };
        if ordinal >= 1 && ordinal <= total {
            dates.push(jan1 + Duration::days(i64::from(ordinal) - 1));
        }
    }
    dates.sort_unstable();
    dates.dedup();
    dates
}

/// Positional selection: 1-based indices into the sorted candidate list,
/// negatives from the end. Out-of-range positions are ignored and the
/// selection is returned in ascending order.
pub(super) fn apply_set_pos<T: Copy + Ord>(items: Vec<T>, positions: &[i32]) -> Vec<T> {
    if positions.is_empty() {
        return items;
    }
    let mut picked: Vec<T> = Vec::with_capacity(positions.len());
    for &position in positions {
        let index = if position > 0 {
            position as usize - 1
        } else {
            let back = position.unsigned_abs() as usize;
            if back > items.len() {
                continue;
            }
            items.len() - back
        };
        if let Some(&item) = items.get(index) {
            picked.push(item);
        }
    }
    picked.sort_unstable();
    picked.dedup();
    picked
}

fn weekday_of(year: i32, month: u32, day: u32) -> Option<Weekday> {
    NaiveDate::from_ymd_opt(year, month, day).map(|d| d.weekday())
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn ymd(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    #[test]
    fn test_advance_month_pins_month_end() {
        assert_eq!(advance_month(ymd(2000, 1, 31), 1), ymd(2000, 2, 29));
        assert_eq!(advance_month(ymd(2001, 1, 31), 1), ymd(2001, 2, 28));
        assert_eq!(advance_month(ymd(2000, 12, 15), 2), ymd(2001, 2, 15));
    }

    #[test]
    fn test_resolve_month_days_negative() {
        assert_eq!(resolve_month_days(&[-1], 2000, 2), vec![29]);
        assert_eq!(resolve_month_days(&[-1], 2001, 2), vec![28]);
        assert_eq!(resolve_month_days(&[-1, 1], 2001, 4), vec![1, 30]);
    }

    #[test]
    fn test_resolve_month_days_drops_impossible() {
        // February has no 31st, so nothing is produced for it.
        assert_eq!(resolve_month_days(&[31], 2000, 2), Vec::<u32>::new());
        assert_eq!(resolve_month_days(&[30, 31], 2000, 4), vec![30]);
    }

    #[test]
    fn test_byday_plain_weekdays() {
        // Wednesdays of March 2000: 1, 8, 15, 22, 29.
        let days = byday_days_in_month(
            &[ByDay {
                ordinal: None,
                weekday: Weekday::Wed,
            }],
            2000,
            3,
        );
        assert_eq!(days, vec![1, 8, 15, 22, 29]);
    }

    #[test]
    fn test_byday_ordinals() {
        let second_monday = byday_days_in_month(
            &[ByDay {
                ordinal: Some(2),
                weekday: Weekday::Mon,
            }],
            2000,
            3,
        );
        assert_eq!(second_monday, vec![13]);

        let last_sunday = byday_days_in_month(
            &[ByDay {
                ordinal: Some(-1),
                weekday: Weekday::Sun,
            }],
            2000,
            3,
        );
        assert_eq!(last_sunday, vec![26]);
    }

    #[test]
    fn test_byday_fifth_weekday_absent() {
        // February 2001 has only four Mondays.
        let days = byday_days_in_month(
            &[ByDay {
                ordinal: Some(5),
                weekday: Weekday::Mon,
            }],
            2001,
            2,
        );
        assert!(days.is_empty());
    }

    #[test]
    fn test_byday_dates_in_year_ordinals() {
        let twentieth_monday = byday_dates_in_year(
            &[ByDay {
                ordinal: Some(20),
                weekday: Weekday::Mon,
            }],
            1997,
        );
        assert_eq!(twentieth_monday, vec![ymd(1997, 5, 19)]);

        let last_sunday = byday_dates_in_year(
            &[ByDay {
                ordinal: Some(-1),
                weekday: Weekday::Sun,
            }],
            2000,
        );
        assert_eq!(last_sunday, vec![ymd(2000, 12, 31)]);
    }

    // 2004 began on a Thursday; 1992 was a leap year beginning Wednesday.
    #[test_case(2004, 53)]
    #[test_case(1992, 53)]
    #[test_case(2015, 53)]
    #[test_case(2000, 52)]
    #[test_case(2001, 52)]
    fn test_iso_weeks_in_year(year: i32, weeks: u32) {
        assert_eq!(iso_weeks_in_year(year), weeks);
    }

    #[test]
    fn test_week_no_dates_negative_resolves_from_total() {
        let dates = week_no_dates(&[-1], 2004);
        assert_eq!(dates.len(), 7);
        assert_eq!(dates[0], NaiveDate::from_isoywd_opt(2004, 53, Weekday::Mon).unwrap());
    }

    #[test]
    fn test_year_day_dates() {
        assert_eq!(year_day_dates(&[1], 2000), vec![ymd(2000, 1, 1)]);
        assert_eq!(year_day_dates(&[-1], 2000), vec![ymd(2000, 12, 31)]);
        assert_eq!(year_day_dates(&[60], 2000), vec![ymd(2000, 2, 29)]);
        assert_eq!(year_day_dates(&[366], 2001), Vec::<NaiveDate>::new());
    }

    #[test]
    fn test_apply_set_pos() {
        let days = vec![4, 6, 11, 13, 18, 20, 25, 27];
        assert_eq!(apply_set_pos(days.clone(), &[2, 4, -2]), vec![6, 13, 25]);
        assert_eq!(apply_set_pos(days.clone(), &[-1]), vec![27]);
        assert_eq!(apply_set_pos(days.clone(), &[99]), Vec::<i32>::new());
        assert_eq!(apply_set_pos(days.clone(), &[]), days);
    }
}
