// Service module exports

pub mod icalendar;
pub(crate) mod recurrence;
