// Recurrence expansion
// Turns each event with an RRULE into its concrete occurrence sequence,
// honouring exclusion dates and modified instances.

use chrono::{Datelike, Duration, NaiveDate, NaiveTime, Utc};
use chrono_tz::Tz;
use log::warn;

mod daily;
mod monthly;
mod parser;
mod utils;
mod weekly;
mod yearly;

use crate::config::ParserConfig;
use crate::models::event::{DateTimeProperty, Event, RawProperty};
use crate::models::moment::{resolve_local, shift_months, IcsDuration};
use crate::models::rrule::{Frequency, RRule};
use crate::services::icalendar::{
    format_datetime, parse_moment, quote_if_needed, reconstruct_property, OverrideIndex,
    ZoneResolver,
};

/// Expand every recurring event in the list. Non-recurring events pass
/// through untouched; a base event whose own start is excluded (by an
/// EXDATE or by a modified instance) is dropped while its later
/// occurrences survive.
pub(crate) fn expand(
    events: Vec<Event>,
    overrides: &OverrideIndex,
    config: &ParserConfig,
    resolver: &ZoneResolver,
) -> Vec<Event> {
    let mut out: Vec<Event> = Vec::with_capacity(events.len());
    for event in events {
        let rule_text = match event.rrule.as_deref() {
            Some(text) if !text.trim().is_empty() => text.to_string(),
            _ => {
                out.push(event);
                continue;
            }
        };

        let rule = parser::parse_rrule(&rule_text, config.week_start(), resolver)
            .and_then(|rule| parser::validate(&rule, &rule_text).map(|()| rule));
        let rule = match rule {
            Ok(rule) => rule,
            Err(err) => {
                // The recurrence is skipped; the event itself stays.
                warn!("{err}");
                out.push(event);
                continue;
            }
        };

        match Expansion::plan(&event, rule, overrides, config, resolver) {
            Some(mut expansion) => {
                let keep_base = !expansion.base_excluded;
                run(&mut expansion);
                let occurrences = expansion.occurrences;
                if keep_base {
                    out.push(event);
                }
                out.extend(occurrences);
            }
            None => out.push(event),
        }
    }
    out
}

fn run(expansion: &mut Expansion<'_>) {
    match expansion.rule.freq {
        Frequency::Daily => daily::generate(expansion),
        Frequency::Weekly => weekly::generate(expansion),
        Frequency::Monthly => monthly::generate(expansion),
        Frequency::Yearly => yearly::generate(expansion),
    }
}

enum EventLength {
    Fixed(i64),
    Calendar(IcsDuration),
}

/// Per-event expansion state shared by the frequency generators. The
/// candidate counter starts at one for the base event; every candidate
/// past the start counts against COUNT whether it is emitted or
/// excluded.
pub(super) struct Expansion<'a> {
    event: &'a Event,
    pub(super) rule: RRule,
    pub(super) start_date: NaiveDate,
    zone: Tz,
    time: NaiveTime,
    utc: bool,
    tzid: Option<String>,
    start_epoch: i64,
    until_epoch: i64,
    counter: u32,
    exdates: Vec<i64>,
    overridden: Vec<i64>,
    length: EventLength,
    base_excluded: bool,
    stopped: bool,
    occurrences: Vec<Event>,
}

impl<'a> Expansion<'a> {
    fn plan(
        event: &'a Event,
        rule: RRule,
        overrides: &OverrideIndex,
        config: &ParserConfig,
        resolver: &ZoneResolver,
    ) -> Option<Self> {
        let dtstart = event.dtstart.as_ref()?;
        let start = match parse_moment(&dtstart.reconstructed, resolver) {
            Ok(moment) => moment,
            Err(err) => {
                warn!("cannot expand recurrence without a start: {err}");
                return None;
            }
        };

        let tzid = dtstart
            .params
            .iter()
            .find(|(name, _)| name == "TZID")
            .map(|(_, value)| value.first().to_string())
            .filter(|tzid| !start.utc && resolver.recognises(tzid));

        let mut exdates: Vec<i64> = Vec::new();
        for block in &event.exdates {
            // The block zone comes from its own TZID parameter and does not
            // leak into the next block.
            for value in &block.values {
                let prop = RawProperty {
                    params: block.params.clone(),
                    value: value.clone(),
                };
                match parse_moment(&reconstruct_property(&prop), resolver) {
                    Ok(moment) => exdates.push(moment.epoch()),
                    Err(err) => warn!("ignoring malformed exclusion date: {err}"),
                }
            }
        }
        exdates.sort_unstable();
        exdates.dedup();

        let overridden = event
            .uid
            .as_deref()
            .map(|uid| overrides.epochs(uid))
            .unwrap_or_default();

        let start_epoch = dtstart.epoch;
        let base_excluded = exdates.binary_search(&start_epoch).is_ok()
            || overridden.binary_search(&start_epoch).is_ok();

        let until_epoch = expansion_cutoff(&rule, config);

        let length = if let Some(duration) = event.duration {
            EventLength::Calendar(duration)
        } else if let Some(dtend) = event.dtend.as_ref() {
            EventLength::Fixed(dtend.epoch - start_epoch)
        } else {
            EventLength::Calendar(IcsDuration {
                days: 1,
                ..IcsDuration::default()
            })
        };

        Some(Self {
            event,
            rule,
            start_date: start.date,
            zone: start.zone,
            time: start.time.unwrap_or(NaiveTime::MIN),
            utc: start.utc,
            tzid,
            start_epoch,
            until_epoch,
            counter: 1,
            exdates,
            overridden,
            length,
            base_excluded,
            stopped: false,
            occurrences: Vec::new(),
        })
    }

    /// Whether the outer loop may take another step at this cursor.
    pub(super) fn should_continue(&self, cursor: NaiveDate) -> bool {
        if self.stopped {
            return false;
        }
        if let Some(limit) = self.rule.count {
            if self.counter >= limit {
                return false;
            }
        }
        // Guard against cursors drifting outside the calendar range.
        if cursor.year() > 9000 {
            return false;
        }
        resolve_local(self.zone, cursor.and_time(self.time)).timestamp() <= self.until_epoch
    }

    pub(super) fn stopped(&self) -> bool {
        self.stopped
    }

    /// Evaluate one candidate. Candidates at or before the start are
    /// skipped without counting; everything after that counts against
    /// COUNT, excluded or not.
    pub(super) fn consider(&mut self, date: NaiveDate) {
        if self.stopped {
            return;
        }
        let start = resolve_local(self.zone, date.and_time(self.time));
        let epoch = start.timestamp();
        if epoch <= self.start_epoch {
            return;
        }
        if epoch > self.until_epoch {
            self.stopped = true;
            return;
        }

        let excluded = self.exdates.binary_search(&epoch).is_ok()
            || self.overridden.binary_search(&epoch).is_ok();
        if !excluded {
            let occurrence = self.occurrence_at(date, epoch);
            self.occurrences.push(occurrence);
        }

        self.counter += 1;
        if let Some(limit) = self.rule.count {
            if self.counter >= limit {
                self.stopped = true;
            }
        }
    }

    fn occurrence_at(&self, date: NaiveDate, start_epoch: i64) -> Event {
        let start_naive = date.and_time(self.time);
        let start_anchored = resolve_local(self.zone, start_naive);

        let (end_naive, end_epoch) = match &self.length {
            EventLength::Calendar(duration) => {
                let naive = duration.apply(start_naive);
                (naive, resolve_local(self.zone, naive).timestamp())
            }
            EventLength::Fixed(seconds) => {
                let end = start_anchored + Duration::seconds(*seconds);
                (end.naive_local(), end.timestamp())
            }
        };

        let mut occurrence = self.event.clone();
        occurrence.dtstart = Some(self.rebuild(start_naive, start_epoch));
        occurrence.dtend = Some(self.rebuild(end_naive, end_epoch));
        occurrence.dtstart_tz = Some(start_anchored);
        occurrence.dtend_tz = chrono::DateTime::from_timestamp(end_epoch, 0)
            .map(|dt| dt.with_timezone(&self.zone));
        occurrence
    }

    /// Regenerate a date tuple for an occurrence: UTC starts keep their
    /// `Z`, starts with a recognised TZID keep the parameter and get a
    /// rebuilt zone-prefixed form.
    fn rebuild(&self, naive: chrono::NaiveDateTime, epoch: i64) -> DateTimeProperty {
        let mut raw = format_datetime(&naive);
        if self.utc {
            raw.push('Z');
        }
        match &self.tzid {
            Some(tzid) => DateTimeProperty {
                params: self
                    .event
                    .dtstart
                    .as_ref()
                    .map(|p| p.params.clone())
                    .unwrap_or_default(),
                reconstructed: format!("TZID={}:{}", quote_if_needed(tzid), raw),
                raw,
                epoch,
            },
            None => DateTimeProperty {
                params: Vec::new(),
                reconstructed: raw.clone(),
                raw,
                epoch,
            },
        }
    }
}

/// The moment expansion stops: `defaultSpan` years from now (at the end
/// of that day), or the rule's UNTIL when that comes sooner.
fn expansion_cutoff(rule: &RRule, config: &ParserConfig) -> i64 {
    let today = Utc::now().with_timezone(&config.zone()).date_naive();
    let horizon = shift_months(today, config.default_span as i32 * 12);
    let cap = resolve_local(
        config.zone(),
        horizon.and_time(NaiveTime::from_hms_opt(23, 59, 59).unwrap_or(NaiveTime::MIN)),
    )
    .timestamp();
    match rule.until.as_ref() {
        Some(until) => cap.min(until.epoch()),
        None => cap,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::icalendar::ZoneTables;
    use chrono::{TimeZone, Weekday};

    fn resolver() -> ZoneResolver {
        ZoneResolver::new(chrono_tz::UTC, ZoneTables::default())
    }

    fn rule(text: &str) -> RRule {
        parser::parse_rrule(text, Weekday::Mon, &resolver()).unwrap()
    }

    #[test]
    fn test_cutoff_prefers_earlier_until() {
        let config = ParserConfig::default();
        let bounded = rule("FREQ=DAILY;UNTIL=20200101T000000Z");
        let until_epoch = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap().timestamp();
        assert_eq!(expansion_cutoff(&bounded, &config), until_epoch);
    }

    #[test]
    fn test_cutoff_defaults_to_span_years_ahead() {
        let config = ParserConfig::default();
        let unbounded = rule("FREQ=DAILY");
        let cutoff = expansion_cutoff(&unbounded, &config);
        let two_years = (Utc::now() + Duration::days(365 * 2 + 2)).timestamp();
        assert!(cutoff > Utc::now().timestamp());
        assert!(cutoff <= two_years);
    }
}
