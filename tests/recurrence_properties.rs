// Property-based checks for the recurrence expansion invariants

mod fixtures;

use fixtures::{calendar, event_block, parser_with_zone, start_epochs};
use proptest::prelude::*;

fn parse_starts(event_lines: &[String]) -> Vec<i64> {
    let body: Vec<&str> = event_lines.iter().map(String::as_str).collect();
    let block = event_block(&body);
    let lines: Vec<&str> = block.iter().map(String::as_str).collect();
    let events = parser_with_zone("UTC")
        .parse(&calendar(&lines))
        .expect("calendar should parse")
        .events;
    start_epochs(&events)
}

fn freq_name(index: usize) -> &'static str {
    ["DAILY", "WEEKLY", "MONTHLY", "YEARLY"][index % 4]
}

proptest! {
    /// COUNT bounds the whole sequence including the base event, and the
    /// output is ordered with the base event first.
    #[test]
    fn prop_count_bounds_emission(
        day in 1..=28u32,
        month in 1..=12u32,
        hour in 0..24u32,
        freq_index in 0usize..4,
        interval in 1..=4u32,
        count in 1..=20u32,
    ) {
        let dtstart = format!("DTSTART:2019{month:02}{day:02}T{hour:02}0000Z");
        let rrule = format!(
            "RRULE:FREQ={};INTERVAL={interval};COUNT={count}",
            freq_name(freq_index)
        );
        let epochs = parse_starts(&[
            "UID:prop-count".to_string(),
            dtstart,
            rrule,
        ]);

        prop_assert!(!epochs.is_empty());
        prop_assert!(epochs.len() <= count as usize);
        let mut sorted = epochs.clone();
        sorted.sort_unstable();
        prop_assert_eq!(&sorted, &epochs);
        for window in epochs.windows(2) {
            prop_assert!(window[0] < window[1]);
        }
    }

    /// With an UNTIL stanza no occurrence starts after it, and none start
    /// before the base event.
    #[test]
    fn prop_until_bounds_emission(
        day in 1..=28u32,
        freq_index in 0usize..4,
        horizon_days in 1..=600i64,
    ) {
        let until = chrono::NaiveDate::from_ymd_opt(2019, 1, day)
            .unwrap()
            .checked_add_signed(chrono::Duration::days(horizon_days))
            .unwrap();
        let dtstart = format!("DTSTART:201901{day:02}T090000Z");
        let rrule = format!(
            "RRULE:FREQ={};UNTIL={}T090000Z",
            freq_name(freq_index),
            until.format("%Y%m%d")
        );
        let epochs = parse_starts(&[
            "UID:prop-until".to_string(),
            dtstart,
            rrule,
        ]);

        let base = epochs[0];
        let until_epoch = chrono::NaiveDateTime::new(
            until,
            chrono::NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
        )
        .and_utc()
        .timestamp();
        for &epoch in &epochs {
            prop_assert!(epoch >= base);
            prop_assert!(epoch <= until_epoch);
        }
    }

    /// An excluded occurrence never appears in the output, but it still
    /// consumes a COUNT slot.
    #[test]
    fn prop_exdate_excludes_and_still_counts(
        day in 1..=28u32,
        hour in 0..24u32,
        count in 3..=15u32,
        skip in 1..=2usize,
    ) {
        let base = chrono::NaiveDate::from_ymd_opt(2019, 5, day).unwrap();
        let excluded = base + chrono::Duration::days(skip as i64);
        let dtstart = format!("DTSTART:{}T{hour:02}0000Z", base.format("%Y%m%d"));
        let exdate = format!("EXDATE:{}T{hour:02}0000Z", excluded.format("%Y%m%d"));
        let rrule = format!("RRULE:FREQ=DAILY;COUNT={count}");
        let epochs = parse_starts(&[
            "UID:prop-exdate".to_string(),
            dtstart,
            rrule,
            exdate,
        ]);

        let excluded_epoch = chrono::NaiveDateTime::new(
            excluded,
            chrono::NaiveTime::from_hms_opt(hour, 0, 0).unwrap(),
        )
        .and_utc()
        .timestamp();
        prop_assert!(!epochs.contains(&excluded_epoch));
        // One slot went to the exclusion, so one fewer event is emitted.
        prop_assert_eq!(epochs.len(), count as usize - 1);
    }
}
