use chrono::{Datelike, NaiveDate};

use super::utils::{advance_month, apply_set_pos, byday_days_in_month, resolve_month_days};
use super::Expansion;
use crate::models::moment::days_in_month;

pub(super) fn generate(expansion: &mut Expansion<'_>) {
    let interval = expansion.rule.interval;
    let mut cursor = expansion.start_date;

    while expansion.should_continue(cursor) {
        let year = cursor.year();
        let month = cursor.month();
        let length = days_in_month(year, month);

        let mut days: Vec<u32> = if !expansion.rule.by_month_day.is_empty() {
            let mut days = resolve_month_days(&expansion.rule.by_month_day, year, month);
            if !expansion.rule.by_day.is_empty() {
                let matching = byday_days_in_month(&expansion.rule.by_day, year, month);
                days.retain(|day| matching.contains(day));
            }
            days
        } else if !expansion.rule.by_day.is_empty() {
            byday_days_in_month(&expansion.rule.by_day, year, month)
        } else {
            vec![cursor.day()]
        };
        days.sort_unstable();
        days.dedup();

        for day in apply_set_pos(days, &expansion.rule.by_set_pos) {
            if day > length {
                continue;
            }
            if let Some(date) = NaiveDate::from_ymd_opt(year, month, day) {
                expansion.consider(date);
            }
            if expansion.stopped() {
                return;
            }
        }

        cursor = advance_month(cursor, interval);
    }
}
