//! RFC 5545 (.ics) parsing service with recurrence expansion.

mod assembler;
mod datetime;
mod postprocess;
mod timezone;
mod tokenizer;
mod unfold;
mod utils;

pub use timezone::{ZoneResolver, ZoneTables};
pub use tokenizer::{compose, tokenize};
pub use unfold::unfold;

use std::fs;
use std::path::Path;

use anyhow::Context;

use crate::config::ParserConfig;
use crate::error::IcsError;
use crate::models::event::{Calendar, Event};
use crate::services::recurrence;

pub(crate) use datetime::parse_moment;
pub(crate) use postprocess::{reconstruct as reconstruct_property, OverrideIndex};
pub(crate) use tokenizer::quote_if_needed;
pub(crate) use utils::format_datetime;

/// Service turning iCalendar text into a flat list of concrete events.
pub struct IcsParser {
    config: ParserConfig,
    tables: ZoneTables,
}

impl IcsParser {
    pub fn new() -> Self {
        Self::with_config(ParserConfig::default())
    }

    pub fn with_config(config: ParserConfig) -> Self {
        Self {
            config,
            tables: ZoneTables::default(),
        }
    }

    /// Replace the built-in CLDR/Windows display-name tables.
    pub fn with_zone_tables(mut self, tables: ZoneTables) -> Self {
        self.tables = tables;
        self
    }

    /// Parse a calendar stream. Malformed lines, dates, and rules are
    /// skipped with diagnostics; only configuration problems are fatal.
    pub fn parse(&self, content: &str) -> Result<Calendar, IcsError> {
        self.config.validate()?;
        let resolver = ZoneResolver::new(self.config.zone(), self.tables.clone());

        let cleaned;
        let content = if self.config.disable_character_replacement {
            content
        } else {
            cleaned = utils::clean_characters(content);
            &cleaned
        };

        let window = self.config.window();
        let lines = unfold(content);
        let assembled = assembler::assemble(&lines, &resolver, window);
        let (events, overrides) = postprocess::process(assembled.events, &resolver);

        let events = if self.config.skip_recurrence {
            events
        } else {
            recurrence::expand(events, &overrides, &self.config, &resolver)
        };

        let mut events = apply_window(events, window);
        events.sort_by_key(|event| event.start_epoch().unwrap_or(i64::MAX));

        Ok(Calendar {
            properties: assembled.properties,
            counts: assembled.counts,
            events,
        })
    }

    /// Parse a calendar from a .ics file on disk.
    pub fn parse_file(&self, path: &Path) -> anyhow::Result<Calendar> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read .ics file: {path:?}"))?;
        self.parse(&content)
            .with_context(|| format!("Failed to parse .ics file: {path:?}"))
    }
}

impl Default for IcsParser {
    fn default() -> Self {
        Self::new()
    }
}

/// Second window pass: recurring events were already bounded by the
/// expansion cutoff, so only recurrence-free events are pruned here.
fn apply_window(events: Vec<Event>, window: Option<(i64, i64)>) -> Vec<Event> {
    let Some((min, max)) = window else {
        return events;
    };
    events
        .into_iter()
        .filter(|event| {
            if event.rrule.is_some() {
                return true;
            }
            match event.start_epoch() {
                Some(epoch) => epoch >= min && epoch <= max,
                None => false,
            }
        })
        .collect()
}
