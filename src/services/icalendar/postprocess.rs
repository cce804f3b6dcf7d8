// Event post-processing
// Materialises the date-valued properties of each raw event, indexes
// modified recurrence instances by UID, and resolves collisions between
// overrides and the base events they shadow.

use std::collections::{BTreeSet, HashMap};

use chrono::Duration;
use log::warn;

use super::datetime::parse_moment;
use super::timezone::ZoneResolver;
use super::tokenizer::quote_if_needed;
use super::utils::{format_datetime, prepare_custom_value, unescape_text};
use crate::error::IcsError;
use crate::models::event::{DateTimeProperty, Event, RawEvent, RawProperty};
use crate::models::moment::{resolve_local, Moment};

/// Modified recurrence instances, keyed by UID and the original start
/// epoch named in RECURRENCE-ID. The expander suppresses generated
/// occurrences at these epochs; the override events themselves stay in
/// the event list.
#[derive(Debug, Default)]
pub(crate) struct OverrideIndex {
    by_uid: HashMap<String, BTreeSet<i64>>,
}

impl OverrideIndex {
    fn insert(&mut self, uid: &str, epoch: i64) {
        self.by_uid.entry(uid.to_string()).or_default().insert(epoch);
    }

    pub(crate) fn contains(&self, uid: &str, epoch: i64) -> bool {
        self.by_uid
            .get(uid)
            .map(|epochs| epochs.contains(&epoch))
            .unwrap_or(false)
    }

    pub(crate) fn epochs(&self, uid: &str) -> Vec<i64> {
        self.by_uid
            .get(uid)
            .map(|epochs| epochs.iter().copied().collect())
            .unwrap_or_default()
    }
}

/// The TZID-prefixed form handed to the date parser. The zone id is
/// quoted iff it contains a structural boundary character.
pub(crate) fn reconstruct(prop: &RawProperty) -> String {
    match prop
        .params
        .iter()
        .find(|(name, _)| name == "TZID")
        .map(|(_, value)| value.first())
    {
        Some(tzid) if !tzid.is_empty() => {
            format!("TZID={}:{}", quote_if_needed(tzid), prop.value)
        }
        _ => prop.value.clone(),
    }
}

/// Turn raw events into `Event` records and build the override index.
/// Events without a parseable DTSTART are skipped with a diagnostic.
pub(crate) fn process(
    raws: Vec<RawEvent>,
    resolver: &ZoneResolver,
) -> (Vec<Event>, OverrideIndex) {
    let mut events: Vec<Event> = raws
        .into_iter()
        .filter_map(|raw| build_event(raw, resolver))
        .collect();

    let mut index = OverrideIndex::default();
    for event in &events {
        if let (Some(uid), Some(rid)) = (&event.uid, &event.recurrence_id) {
            index.insert(uid, rid.epoch);
        }
    }

    // An override whose RECURRENCE-ID names the base DTSTART wins over the
    // base record. Recurring bases are suppressed later by the expander so
    // their other occurrences survive; non-recurring bases go now.
    events.retain(|event| {
        if event.recurrence_id.is_some() || event.rrule.is_some() {
            return true;
        }
        match (&event.uid, event.start_epoch()) {
            (Some(uid), Some(epoch)) => !index.contains(uid, epoch),
            _ => true,
        }
    });

    (events, index)
}

fn build_event(raw: RawEvent, resolver: &ZoneResolver) -> Option<Event> {
    let (dtstart, start_moment) = match raw.property("DTSTART") {
        Some(prop) => match materialise(&prop, resolver) {
            Ok(pair) => pair,
            Err(err) => {
                warn!("skipping event with unparseable start: {err}");
                return None;
            }
        },
        None => {
            warn!(
                "skipping event without DTSTART (uid {})",
                raw.scalar("UID").unwrap_or("unknown")
            );
            return None;
        }
    };

    let dtend = match raw.property("DTEND") {
        Some(prop) => match materialise(&prop, resolver) {
            Ok((tuple, _)) => Some(tuple),
            Err(err) => {
                warn!("dropping unparseable end date: {err}");
                None
            }
        },
        None => None,
    };
    let dtend = dtend.or_else(|| {
        // DTEND from DURATION when present, else a one-day span. The raw
        // event is left untouched either way.
        let end_naive = match raw.duration {
            Some(duration) => duration.apply(start_moment.naive()),
            None => start_moment.naive() + Duration::days(1),
        };
        Some(derive_tuple(&dtstart, &start_moment, end_naive))
    });

    let recurrence_id = match raw.property("RECURRENCE-ID") {
        Some(prop) => match materialise(&prop, resolver) {
            Ok((tuple, _)) => Some(tuple),
            Err(err) => {
                warn!("ignoring unparseable recurrence id: {err}");
                None
            }
        },
        None => None,
    };

    let attendees = raw
        .arrays
        .get("ATTENDEE")
        .map(|stored| stored.iter().map(|p| p.value.clone()).collect())
        .unwrap_or_else(|| {
            raw.scalar("ATTENDEE")
                .map(|v| vec![v.to_string()])
                .unwrap_or_default()
        });

    let custom = raw
        .scalars
        .iter()
        .filter(|(name, _)| !KNOWN_PROPERTIES.contains(&name.as_str()))
        .map(|(name, value)| (name.clone(), prepare_custom_value(value)))
        .collect();

    let dtend_tz = dtend.as_ref().and_then(|tuple| {
        chrono::DateTime::from_timestamp(tuple.epoch, 0)
            .map(|dt| dt.with_timezone(&start_moment.zone))
    });

    Some(Event {
        uid: raw.scalar("UID").map(str::to_string),
        summary: raw.scalar("SUMMARY").map(unescape_text),
        description: raw.scalar("DESCRIPTION").map(unescape_text),
        location: raw.scalar("LOCATION").map(unescape_text),
        dtstart_tz: Some(start_moment.resolved()),
        dtend_tz,
        dtstart: Some(dtstart),
        dtend,
        recurrence_id,
        duration: raw.duration,
        dtstamp: raw.scalar("DTSTAMP").map(str::to_string),
        created: raw.scalar("CREATED").map(str::to_string),
        last_modified: raw.scalar("LAST-MODIFIED").map(str::to_string),
        sequence: raw.scalar("SEQUENCE").map(str::to_string),
        status: raw.scalar("STATUS").map(str::to_string),
        transp: raw.scalar("TRANSP").map(str::to_string),
        organizer: raw.scalar("ORGANIZER").map(str::to_string),
        attendees,
        rrule: raw.scalar("RRULE").map(str::to_string),
        exdates: raw.exdates,
        custom,
    })
}

fn materialise(
    prop: &RawProperty,
    resolver: &ZoneResolver,
) -> Result<(DateTimeProperty, Moment), IcsError> {
    let reconstructed = reconstruct(prop);
    let moment = parse_moment(&reconstructed, resolver)?;
    Ok((
        DateTimeProperty {
            params: prop.params.clone(),
            raw: prop.value.clone(),
            epoch: moment.epoch(),
            reconstructed,
        },
        moment,
    ))
}

/// A derived end tuple in the same zone and parameter form as the start.
fn derive_tuple(
    start: &DateTimeProperty,
    start_moment: &Moment,
    end_naive: chrono::NaiveDateTime,
) -> DateTimeProperty {
    let mut raw = format_datetime(&end_naive);
    if start_moment.utc {
        raw.push('Z');
    }
    let reconstructed = match start
        .params
        .iter()
        .find(|(name, _)| name == "TZID")
        .map(|(_, value)| value.first())
    {
        Some(tzid) if !tzid.is_empty() => format!("TZID={}:{}", quote_if_needed(tzid), raw),
        _ => raw.clone(),
    };
    DateTimeProperty {
        params: start.params.clone(),
        epoch: resolve_local(start_moment.zone, end_naive).timestamp(),
        raw,
        reconstructed,
    }
}

const KNOWN_PROPERTIES: &[&str] = &[
    "UID",
    "SUMMARY",
    "DESCRIPTION",
    "LOCATION",
    "DTSTART",
    "DTEND",
    "DTSTAMP",
    "CREATED",
    "LAST-MODIFIED",
    "SEQUENCE",
    "STATUS",
    "TRANSP",
    "ORGANIZER",
    "ATTENDEE",
    "RRULE",
    "EXDATE",
    "DURATION",
    "RECURRENCE-ID",
];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::line::ParamValue;
    use crate::services::icalendar::timezone::ZoneTables;

    fn resolver() -> ZoneResolver {
        ZoneResolver::new(chrono_tz::Europe::Berlin, ZoneTables::default())
    }

    fn raw_with(entries: &[(&str, &str)]) -> RawEvent {
        let mut raw = RawEvent::default();
        for (name, value) in entries {
            raw.scalars.insert(name.to_string(), value.to_string());
        }
        raw
    }

    #[test]
    fn test_reconstruct_plain_tzid() {
        let prop = RawProperty {
            params: vec![(
                "TZID".to_string(),
                ParamValue::Single("Europe/London".to_string()),
            )],
            value: "20190911T095000".to_string(),
        };
        assert_eq!(reconstruct(&prop), "TZID=Europe/London:20190911T095000");
    }

    #[test]
    fn test_reconstruct_quotes_exotic_tzid() {
        let prop = RawProperty {
            params: vec![(
                "TZID".to_string(),
                ParamValue::Single("UTC+10:30".to_string()),
            )],
            value: "20190911T095000".to_string(),
        };
        assert_eq!(reconstruct(&prop), "TZID=\"UTC+10:30\":20190911T095000");
    }

    #[test]
    fn test_event_without_dtstart_is_skipped() {
        let (events, _) = process(vec![raw_with(&[("UID", "x")])], &resolver());
        assert!(events.is_empty());
    }

    #[test]
    fn test_dtend_synthesised_from_duration() {
        let raw = {
            let mut raw = raw_with(&[("UID", "d"), ("DTSTART", "20200101T100000")]);
            raw.duration = Some(crate::models::moment::IcsDuration {
                hours: 2,
                ..Default::default()
            });
            raw
        };
        let (events, _) = process(vec![raw], &resolver());
        let dtend = events[0].dtend.as_ref().unwrap();
        assert_eq!(dtend.raw, "20200101T120000");
        assert_eq!(
            dtend.epoch - events[0].dtstart.as_ref().unwrap().epoch,
            7200
        );
    }

    #[test]
    fn test_dtend_defaults_to_one_day() {
        let raw = raw_with(&[("UID", "d"), ("DTSTART", "20200101")]);
        let (events, _) = process(vec![raw], &resolver());
        let event = &events[0];
        assert_eq!(
            event.dtend.as_ref().unwrap().epoch - event.dtstart.as_ref().unwrap().epoch,
            86400
        );
    }

    #[test]
    fn test_override_indexed_and_base_collision_removed() {
        let base = raw_with(&[("UID", "u"), ("DTSTART", "20200101T100000"), ("SUMMARY", "base")]);
        let moved = raw_with(&[
            ("UID", "u"),
            ("DTSTART", "20200101T150000"),
            ("RECURRENCE-ID", "20200101T100000"),
            ("SUMMARY", "moved"),
        ]);
        let (events, index) = process(vec![base, moved], &resolver());
        // The non-recurring base collides with the override and is gone.
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].summary.as_deref(), Some("moved"));
        let rid_epoch = events[0].recurrence_id.as_ref().unwrap().epoch;
        assert!(index.contains("u", rid_epoch));
    }

    #[test]
    fn test_recurring_base_survives_collision_for_expansion() {
        let mut base = raw_with(&[("UID", "u"), ("DTSTART", "20200101T100000")]);
        base.scalars
            .insert("RRULE".to_string(), "FREQ=DAILY;COUNT=3".to_string());
        let moved = raw_with(&[
            ("UID", "u"),
            ("DTSTART", "20200101T150000"),
            ("RECURRENCE-ID", "20200101T100000"),
        ]);
        let (events, _) = process(vec![base, moved], &resolver());
        assert_eq!(events.len(), 2);
    }

    #[test]
    fn test_unknown_properties_normalised_into_custom() {
        let raw = raw_with(&[
            ("UID", "c"),
            ("DTSTART", "20200101T100000"),
            ("X-NOTES", " first\\nsecond "),
        ]);
        let (events, _) = process(vec![raw], &resolver());
        assert_eq!(
            events[0].custom,
            vec![("X-NOTES".to_string(), "first\nsecond".to_string())]
        );
    }
}
