// Calendar assembly
// Walks the logical lines through a component state machine and collects
// VEVENT properties into raw event records.

use std::collections::BTreeMap;

use log::{debug, warn};

use super::datetime::{parse_duration, parse_moment};
use super::postprocess::reconstruct;
use super::timezone::ZoneResolver;
use super::tokenizer::tokenize;
use crate::models::event::{ComponentCounts, ExceptionDates, RawEvent, RawProperty};
use crate::models::line::ContentLine;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Frame {
    Calendar,
    Event,
    Alarm,
    Todo,
    FreeBusy,
    Timezone,
    Standard,
    Daylight,
    Other,
}

impl Frame {
    fn from_name(name: &str) -> Frame {
        match name {
            "VCALENDAR" => Frame::Calendar,
            "VEVENT" => Frame::Event,
            "VALARM" => Frame::Alarm,
            "VTODO" => Frame::Todo,
            "VFREEBUSY" => Frame::FreeBusy,
            "VTIMEZONE" => Frame::Timezone,
            "STANDARD" => Frame::Standard,
            "DAYLIGHT" => Frame::Daylight,
            _ => Frame::Other,
        }
    }
}

#[derive(Debug, Default)]
pub(crate) struct AssembledCalendar {
    pub properties: BTreeMap<String, String>,
    pub events: Vec<RawEvent>,
    pub counts: ComponentCounts,
}

/// Run the component state machine over unfolded lines. Only VEVENT
/// payloads are collected; VTODO, VFREEBUSY, VALARM, and VTIMEZONE are
/// recognised at the framing level and counted.
pub(crate) fn assemble(
    lines: &[String],
    resolver: &ZoneResolver,
    window: Option<(i64, i64)>,
) -> AssembledCalendar {
    let mut out = AssembledCalendar::default();
    let mut stack: Vec<Frame> = Vec::new();
    let mut current: Option<RawEvent> = None;
    let mut last_keyword: Option<String> = None;

    for raw_line in lines {
        let Some(line) = tokenize(raw_line) else {
            debug!("skipping content line without separator: {raw_line}");
            continue;
        };

        match line.name.as_str() {
            "BEGIN" => {
                let frame = Frame::from_name(&line.value);
                stack.push(frame);
                last_keyword = None;
                match frame {
                    Frame::Event => {
                        out.counts.events += 1;
                        current = Some(RawEvent::default());
                    }
                    Frame::Todo => out.counts.todos += 1,
                    Frame::FreeBusy => out.counts.freebusy += 1,
                    Frame::Alarm => out.counts.alarms += 1,
                    _ => {}
                }
            }
            "END" => {
                let frame = Frame::from_name(&line.value);
                if stack.last() == Some(&frame) {
                    stack.pop();
                }
                last_keyword = None;
                if frame == Frame::Event {
                    if let Some(event) = current.take() {
                        if keep_within_window(&event, resolver, window) {
                            out.events.push(event);
                        }
                    }
                }
            }
            _ => match stack.last() {
                Some(Frame::Event) => {
                    if let Some(event) = current.as_mut() {
                        store_property(event, line, &mut last_keyword);
                    }
                }
                Some(Frame::Calendar) => {
                    if !line.name.is_empty() {
                        out.properties.insert(line.name.clone(), line.value.clone());
                        last_keyword = Some(line.name);
                    }
                }
                _ => {}
            },
        }
    }

    out
}

fn store_property(event: &mut RawEvent, line: ContentLine, last_keyword: &mut Option<String>) {
    if line.name.is_empty() {
        // Pathological value-only line: attribute it to the property seen
        // before it in this component.
        if let Some(previous) = last_keyword.as_ref() {
            if let Some(existing) = event.scalars.get_mut(previous) {
                existing.push_str(&line.value);
            }
        }
        return;
    }

    let name = line.name.clone();
    match name.as_str() {
        "EXDATE" => {
            event.exdates.push(ExceptionDates {
                params: line.params,
                values: line
                    .value
                    .split(',')
                    .map(|v| v.trim().to_string())
                    .filter(|v| !v.is_empty())
                    .collect(),
            });
            event.scalars.insert(name.clone(), line.value);
        }
        "DURATION" => {
            match parse_duration(&line.value) {
                Ok(duration) => event.duration = Some(duration),
                Err(err) => warn!("ignoring malformed duration: {err}"),
            }
            event.scalars.insert(name.clone(), line.value);
        }
        _ => {
            let had_scalar = event.scalars.contains_key(&name);
            if !line.params.is_empty() || had_scalar {
                let entry = event.arrays.entry(name.clone()).or_default();
                if entry.is_empty() && had_scalar {
                    if let Some(previous) = event.scalars.get(&name) {
                        entry.push(RawProperty {
                            params: Vec::new(),
                            value: previous.clone(),
                        });
                    }
                }
                entry.push(RawProperty {
                    params: line.params,
                    value: line.value.clone(),
                });
            }
            event.scalars.insert(name.clone(), line.value);
        }
    }
    *last_keyword = Some(name);
}

/// Applied when a VEVENT closes: non-recurring events whose start falls
/// outside the configured window are dropped immediately.
fn keep_within_window(
    event: &RawEvent,
    resolver: &ZoneResolver,
    window: Option<(i64, i64)>,
) -> bool {
    let Some((min, max)) = window else {
        return true;
    };
    if event.scalars.contains_key("RRULE") {
        return true;
    }
    let Some(dtstart) = event.property("DTSTART") else {
        return true;
    };
    match parse_moment(&reconstruct(&dtstart), resolver) {
        Ok(moment) => {
            let epoch = moment.epoch();
            epoch >= min && epoch <= max
        }
        Err(_) => false,
    }
}
