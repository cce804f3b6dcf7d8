use chrono::NaiveDateTime;

pub(crate) fn format_datetime(dt: &NaiveDateTime) -> String {
    dt.format("%Y%m%dT%H%M%S").to_string()
}

pub(crate) fn unescape_text(text: &str) -> String {
    text.replace("\\n", "\n")
        .replace("\\N", "\n")
        .replace("\\,", ",")
        .replace("\\;", ";")
        .replace("\\\\", "\\")
}

/// Normalise an unknown property value: trim and undo text escaping.
pub(crate) fn prepare_custom_value(value: &str) -> String {
    unescape_text(value.trim())
}

/// Replace typographic quotes, dashes, and ellipses with their ASCII
/// equivalents. Some calendar producers emit these inside property
/// values, where they confuse downstream consumers.
pub(crate) fn clean_characters(content: &str) -> String {
    content
        .chars()
        .flat_map(|c| match c {
            '\u{2018}' | '\u{2019}' | '\u{201A}' | '\u{201B}' => vec!['\''],
            '\u{201C}' | '\u{201D}' | '\u{201E}' | '\u{201F}' => vec!['"'],
            '\u{2013}' | '\u{2014}' => vec!['-'],
            '\u{2026}' => vec!['.', '.', '.'],
            other => vec![other],
        })
        .collect()
}
