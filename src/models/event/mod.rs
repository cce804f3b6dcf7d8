// Event records
// Raw per-component property collections and the finished Event output.

use std::collections::BTreeMap;

use chrono::DateTime;
use chrono_tz::Tz;
use serde::Serialize;

use crate::models::line::ParamValue;
use crate::models::moment::IcsDuration;

/// One stored occurrence of a parameterised or repeated property.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RawProperty {
    pub params: Vec<(String, ParamValue)>,
    pub value: String,
}

/// One EXDATE content line: its parameters and the ordered, comma-split
/// values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExceptionDates {
    pub params: Vec<(String, ParamValue)>,
    pub values: Vec<String>,
}

/// Properties collected for one VEVENT before post-processing. Scalars
/// keep the last value seen per keyword (unknown keywords included);
/// `arrays` keeps every occurrence of parameterised or repeated
/// properties in order.
#[derive(Debug, Clone, Default)]
pub struct RawEvent {
    pub scalars: BTreeMap<String, String>,
    pub arrays: BTreeMap<String, Vec<RawProperty>>,
    pub exdates: Vec<ExceptionDates>,
    pub duration: Option<IcsDuration>,
}

impl RawEvent {
    pub fn scalar(&self, name: &str) -> Option<&str> {
        self.scalars.get(name).map(String::as_str)
    }

    /// The last stored occurrence of a property, falling back to the bare
    /// scalar when it was never seen with parameters.
    pub fn property(&self, name: &str) -> Option<RawProperty> {
        if let Some(stored) = self.arrays.get(name).and_then(|v| v.last()) {
            return Some(stored.clone());
        }
        self.scalars.get(name).map(|value| RawProperty {
            params: Vec::new(),
            value: value.clone(),
        })
    }
}

/// A date-valued property carried through to the output: the original
/// parameters, the verbatim value, the resolved epoch, and the
/// TZID-prefixed form the date parser consumed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DateTimeProperty {
    pub params: Vec<(String, ParamValue)>,
    pub raw: String,
    pub epoch: i64,
    pub reconstructed: String,
}

/// A concrete calendar event. Produced by the assembler, cloned and
/// rewritten by the recurrence expander.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Event {
    pub uid: Option<String>,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub dtstart: Option<DateTimeProperty>,
    pub dtend: Option<DateTimeProperty>,
    pub recurrence_id: Option<DateTimeProperty>,
    pub duration: Option<IcsDuration>,
    pub dtstamp: Option<String>,
    pub created: Option<String>,
    pub last_modified: Option<String>,
    pub sequence: Option<String>,
    pub status: Option<String>,
    pub transp: Option<String>,
    pub organizer: Option<String>,
    pub attendees: Vec<String>,
    pub rrule: Option<String>,
    pub exdates: Vec<ExceptionDates>,
    /// Unknown properties, normalised (trimmed, newline-unescaped).
    pub custom: Vec<(String, String)>,
    /// Start and end anchored in the event's zone.
    pub dtstart_tz: Option<DateTime<Tz>>,
    pub dtend_tz: Option<DateTime<Tz>>,
}

impl Event {
    pub fn start_epoch(&self) -> Option<i64> {
        self.dtstart.as_ref().map(|p| p.epoch)
    }
}

/// Component totals seen during assembly.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ComponentCounts {
    pub events: u32,
    pub todos: u32,
    pub freebusy: u32,
    pub alarms: u32,
}

/// A fully parsed calendar: the flat event list (recurrences expanded,
/// sorted by start) plus calendar-level properties and component counts.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Calendar {
    pub properties: BTreeMap<String, String>,
    pub events: Vec<Event>,
    pub counts: ComponentCounts,
}
