// iCalendar parsing and recurrence expansion library

pub mod config;
pub mod error;
pub mod models;
pub mod services;

pub use config::ParserConfig;
pub use error::IcsError;
pub use models::event::{Calendar, ComponentCounts, DateTimeProperty, Event};
pub use services::icalendar::{IcsParser, ZoneTables};
