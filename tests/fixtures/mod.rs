// Test fixtures - reusable calendar builders shared across test files
#![allow(dead_code)]

use ics_events::{Event, IcsParser, ParserConfig};

/// Wrap event body lines in the calendar envelope.
pub fn calendar(body: &[&str]) -> String {
    let mut ics = String::from("BEGIN:VCALENDAR\r\nVERSION:2.0\r\nPRODID:-//Tests//EN\r\n");
    for line in body {
        ics.push_str(line);
        ics.push_str("\r\n");
    }
    ics.push_str("END:VCALENDAR\r\n");
    ics
}

/// One VEVENT with the given property lines.
pub fn event_block(lines: &[&str]) -> Vec<String> {
    let mut block = vec!["BEGIN:VEVENT".to_string()];
    block.extend(lines.iter().map(|l| l.to_string()));
    block.push("END:VEVENT".to_string());
    block
}

pub fn parser_with_zone(zone: &str) -> IcsParser {
    IcsParser::with_config(ParserConfig {
        default_time_zone: zone.to_string(),
        ..ParserConfig::default()
    })
}

/// Parse and return the events of a single-event calendar body.
pub fn parse_events(zone: &str, event_lines: &[&str]) -> Vec<Event> {
    let block = event_block(event_lines);
    let body: Vec<&str> = block.iter().map(String::as_str).collect();
    parser_with_zone(zone)
        .parse(&calendar(&body))
        .expect("calendar should parse")
        .events
}

pub fn start_raws(events: &[Event]) -> Vec<String> {
    events
        .iter()
        .map(|e| e.dtstart.as_ref().expect("event has a start").raw.clone())
        .collect()
}

pub fn start_epochs(events: &[Event]) -> Vec<i64> {
    events
        .iter()
        .map(|e| e.start_epoch().expect("event has a start"))
        .collect()
}
