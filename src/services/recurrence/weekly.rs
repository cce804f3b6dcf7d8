use chrono::{Datelike, Duration, NaiveDate, Weekday};

use super::Expansion;
use crate::models::rrule::RRule;

pub(super) fn generate(expansion: &mut Expansion<'_>) {
    let interval = i64::from(expansion.rule.interval);
    let mut cursor = expansion.start_date;

    while expansion.should_continue(cursor) {
        for date in week_candidates(cursor, &expansion.rule) {
            expansion.consider(date);
            if expansion.stopped() {
                return;
            }
        }
        cursor += Duration::weeks(interval);
    }
}

/// Candidate dates within the cursor's ISO week. Without BYDAY the
/// cursor itself is the only candidate. With BYDAY, weekdays are mapped
/// through Sunday-first indices: a day earlier in the week than the
/// cursor wraps to the following week, and days at or past the WKST
/// transition move to the final week of the interval block so that a
/// shifted week axis does not over-emit.
fn week_candidates(cursor: NaiveDate, rule: &RRule) -> Vec<NaiveDate> {
    if rule.by_day.is_empty() {
        return vec![cursor];
    }

    let initial = i64::from(cursor.weekday().number_from_monday());
    let interval = i64::from(rule.interval);
    let transition = match rule.wkst {
        Weekday::Mon => 7,
        other => i64::from(other.num_days_from_sunday()),
    };

    let mut days: Vec<i64> = rule
        .by_day
        .iter()
        .map(|entry| {
            let mut day = i64::from(entry.weekday.num_days_from_sunday());
            if day < initial {
                day += 7;
            }
            if day >= transition {
                day += 7 * (interval - 1);
            }
            day
        })
        .collect();
    days.sort_unstable();
    days.dedup();

    let week = cursor.iso_week();
    let Some(monday) = NaiveDate::from_isoywd_opt(week.year(), week.week(), Weekday::Mon) else {
        return vec![cursor];
    };
    days.into_iter()
        .map(|day| monday + Duration::days(day - 1))
        .collect()
}
