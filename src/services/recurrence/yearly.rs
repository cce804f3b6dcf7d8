use chrono::{Datelike, NaiveDate};

use super::utils::{
    advance_years, apply_set_pos, byday_dates_in_year, byday_days_in_month, resolve_month_days,
    week_no_dates, year_day_dates,
};
use super::Expansion;
use crate::models::moment::days_in_month;

pub(super) fn generate(expansion: &mut Expansion<'_>) {
    let interval = expansion.rule.interval;
    let mut cursor = expansion.start_date;

    while expansion.should_continue(cursor) {
        for date in year_candidates(expansion, cursor) {
            expansion.consider(date);
            if expansion.stopped() {
                return;
            }
        }
        cursor = advance_years(cursor, interval);
    }
}

/// Candidate dates within the cursor's year, in stanza priority order:
/// BYMONTH (with per-month BYMONTHDAY/BYDAY), then BYWEEKNO, BYYEARDAY,
/// and BYMONTHDAY across all months. A BYDAY list not already consumed
/// per month intersects whatever another stanza produced, or stands
/// alone as the full year expansion. BYSETPOS selects last.
fn year_candidates(expansion: &Expansion<'_>, cursor: NaiveDate) -> Vec<NaiveDate> {
    let rule = &expansion.rule;
    let year = cursor.year();

    let mut dates: Vec<NaiveDate> = Vec::new();
    let mut contributed = false;
    let mut byday_consumed = false;

    if !rule.by_month.is_empty() {
        contributed = true;
        for &month in &rule.by_month {
            let days: Vec<u32> = if !rule.by_month_day.is_empty() {
                resolve_month_days(&rule.by_month_day, year, month)
            } else if !rule.by_day.is_empty() {
                byday_consumed = true;
                byday_days_in_month(&rule.by_day, year, month)
            } else if cursor.day() <= days_in_month(year, month) {
                vec![cursor.day()]
            } else {
                Vec::new()
            };
            for day in days {
                if let Some(date) = NaiveDate::from_ymd_opt(year, month, day) {
                    dates.push(date);
                }
            }
        }
    } else if !rule.by_week_no.is_empty() {
        contributed = true;
        dates = week_no_dates(&rule.by_week_no, year);
    } else if !rule.by_year_day.is_empty() {
        contributed = true;
        dates = year_day_dates(&rule.by_year_day, year);
    } else if !rule.by_month_day.is_empty() {
        contributed = true;
        for month in 1..=12 {
            for day in resolve_month_days(&rule.by_month_day, year, month) {
                if let Some(date) = NaiveDate::from_ymd_opt(year, month, day) {
                    dates.push(date);
                }
            }
        }
    }

    if !rule.by_day.is_empty() && !byday_consumed {
        let year_dates = byday_dates_in_year(&rule.by_day, year);
        if contributed {
            dates.retain(|date| year_dates.binary_search(date).is_ok());
        } else {
            dates = year_dates;
        }
    } else if !contributed && !byday_consumed {
        dates = vec![cursor];
    }

    dates.sort_unstable();
    dates.dedup();
    apply_set_pos(dates, &rule.by_set_pos)
}
