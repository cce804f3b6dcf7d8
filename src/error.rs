use thiserror::Error;

/// Errors produced while parsing a calendar stream.
///
/// Only `Configuration` is fatal to a parse; the other variants are
/// recovered from locally by skipping the offending line, event, or
/// recurrence and logging a diagnostic.
#[derive(Debug, Error)]
pub enum IcsError {
    #[error("invalid date-time value '{0}'")]
    InvalidMoment(String),

    #[error("invalid duration value '{0}'")]
    InvalidDuration(String),

    #[error("invalid recurrence rule '{rule}': {reason}")]
    InvalidRRule { rule: String, reason: String },

    #[error("configuration error: {0}")]
    Configuration(String),
}

impl IcsError {
    pub(crate) fn rrule(rule: &str, reason: impl Into<String>) -> Self {
        Self::InvalidRRule {
            rule: rule.to_string(),
            reason: reason.into(),
        }
    }
}
