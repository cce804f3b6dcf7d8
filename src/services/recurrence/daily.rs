use chrono::{Datelike, Duration};

use super::utils::resolve_month_days;
use super::Expansion;

pub(super) fn generate(expansion: &mut Expansion<'_>) {
    let interval = i64::from(expansion.rule.interval);
    let mut cursor = expansion.start_date;
    // The month-day set is recomputed only when the cursor leaves the
    // month it was built for.
    let mut month_days: Option<((i32, u32), Vec<u32>)> = None;

    while expansion.should_continue(cursor) {
        if expansion.rule.by_month_day.is_empty() {
            expansion.consider(cursor);
        } else {
            let key = (cursor.year(), cursor.month());
            let stale = month_days.as_ref().map(|(k, _)| *k != key).unwrap_or(true);
            if stale {
                month_days = Some((
                    key,
                    resolve_month_days(&expansion.rule.by_month_day, key.0, key.1),
                ));
            }
            let matched = month_days
                .as_ref()
                .map(|(_, days)| days.contains(&cursor.day()))
                .unwrap_or(false);
            if matched {
                expansion.consider(cursor);
            }
        }
        cursor += Duration::days(interval);
    }
}

#[cfg(test)]
mod tests {
    use crate::config::ParserConfig;
    use crate::services::icalendar::IcsParser;

    fn starts(ics: &str) -> Vec<String> {
        IcsParser::with_config(ParserConfig::default())
            .parse(ics)
            .unwrap()
            .events
            .iter()
            .map(|e| e.dtstart.as_ref().unwrap().raw.clone())
            .collect()
    }

    #[test]
    fn test_plain_daily_count() {
        let ics = "BEGIN:VCALENDAR\r\nBEGIN:VEVENT\r\nUID:d\r\nDTSTART:20200110T080000Z\r\nRRULE:FREQ=DAILY;COUNT=3\r\nEND:VEVENT\r\nEND:VCALENDAR\r\n";
        assert_eq!(
            starts(ics),
            vec!["20200110T080000Z", "20200111T080000Z", "20200112T080000Z"]
        );
    }

    #[test]
    fn test_daily_interval() {
        let ics = "BEGIN:VCALENDAR\r\nBEGIN:VEVENT\r\nUID:d\r\nDTSTART:20200110T080000Z\r\nRRULE:FREQ=DAILY;INTERVAL=10;COUNT=3\r\nEND:VEVENT\r\nEND:VCALENDAR\r\n";
        assert_eq!(
            starts(ics),
            vec!["20200110T080000Z", "20200120T080000Z", "20200130T080000Z"]
        );
    }

    #[test]
    fn test_daily_bymonthday_filters_cursor() {
        let ics = "BEGIN:VCALENDAR\r\nBEGIN:VEVENT\r\nUID:d\r\nDTSTART:20200105T080000Z\r\nRRULE:FREQ=DAILY;BYMONTHDAY=5,10;COUNT=4\r\nEND:VEVENT\r\nEND:VCALENDAR\r\n";
        assert_eq!(
            starts(ics),
            vec![
                "20200105T080000Z",
                "20200110T080000Z",
                "20200205T080000Z",
                "20200210T080000Z"
            ]
        );
    }
}
