// Content line model
// The structured form of one unfolded RFC 5545 line.

use serde::Serialize;

/// A property parameter value. Comma-separated values at the top level of
/// a parameter are kept as an ordered list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ParamValue {
    Single(String),
    List(Vec<String>),
}

impl ParamValue {
    /// The first (or only) value.
    pub fn first(&self) -> &str {
        match self {
            ParamValue::Single(v) => v,
            ParamValue::List(vs) => vs.first().map(String::as_str).unwrap_or(""),
        }
    }

    pub fn values(&self) -> Vec<&str> {
        match self {
            ParamValue::Single(v) => vec![v.as_str()],
            ParamValue::List(vs) => vs.iter().map(String::as_str).collect(),
        }
    }
}

/// One logical content line: property name, ordered parameters, and the
/// verbatim value. Parameter keys are unique per line; order is kept as a
/// convenience only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentLine {
    pub name: String,
    pub params: Vec<(String, ParamValue)>,
    pub value: String,
}

impl ContentLine {
    pub fn param(&self, name: &str) -> Option<&ParamValue> {
        self.params
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v)
    }
}
