// Content-line tokenizing
// Splits one logical line into name, parameters, and value. Inside a
// double-quoted run the characters `; : , =` are literal.

use crate::models::line::{ContentLine, ParamValue};

/// Tokenize a logical line. Returns `None` for lines with no unquoted
/// `:` separator, which are deliberately ignored. A line starting with
/// `:` yields an empty name; the assembler attributes it to the last
/// keyword seen.
pub fn tokenize(line: &str) -> Option<ContentLine> {
    let (head, value) = split_unquoted(line, ':')?;

    let mut segments = split_all_unquoted(head, ';').into_iter();
    let name = segments.next().unwrap_or_default().trim().to_ascii_uppercase();

    let mut params: Vec<(String, ParamValue)> = Vec::new();
    for segment in segments {
        let (param_name, param_value) = match split_unquoted(segment, '=') {
            Some((n, v)) => (n, v),
            None => (segment, ""),
        };
        let param_name = param_name.trim().to_ascii_uppercase();
        let values: Vec<String> = split_all_unquoted(param_value, ',')
            .into_iter()
            .map(unquote)
            .collect();
        let value = if values.len() == 1 {
            ParamValue::Single(values.into_iter().next().unwrap_or_default())
        } else {
            ParamValue::List(values)
        };
        if !params.iter().any(|(n, _)| *n == param_name) {
            params.push((param_name, value));
        }
    }

    Some(ContentLine {
        name,
        params,
        value: value.to_string(),
    })
}

/// Rebuild a content line from its parts. Parameter values containing
/// `:`, `;`, or `,` are wrapped in double quotes; already-safe values are
/// left untouched, so composing is idempotent.
pub fn compose(line: &ContentLine) -> String {
    let mut out = line.name.clone();
    for (name, value) in &line.params {
        out.push(';');
        out.push_str(name);
        out.push('=');
        let quoted: Vec<String> = value.values().iter().map(|v| quote_if_needed(v)).collect();
        out.push_str(&quoted.join(","));
    }
    out.push(':');
    out.push_str(&line.value);
    out
}

/// Wrap a parameter value in double quotes iff it contains a structural
/// boundary character.
pub(crate) fn quote_if_needed(value: &str) -> String {
    if value.contains([':', ';', ',']) {
        format!("\"{value}\"")
    } else {
        value.to_string()
    }
}

/// Split at the first occurrence of `sep` outside double quotes.
fn split_unquoted(input: &str, sep: char) -> Option<(&str, &str)> {
    let mut in_quotes = false;
    for (idx, c) in input.char_indices() {
        if c == '"' {
            in_quotes = !in_quotes;
        } else if c == sep && !in_quotes {
            return Some((&input[..idx], &input[idx + 1..]));
        }
    }
    None
}

/// Split at every occurrence of `sep` outside double quotes.
fn split_all_unquoted(input: &str, sep: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut in_quotes = false;
    let mut start = 0;
    for (idx, c) in input.char_indices() {
        if c == '"' {
            in_quotes = !in_quotes;
        } else if c == sep && !in_quotes {
            parts.push(&input[start..idx]);
            start = idx + 1;
        }
    }
    parts.push(&input[start..]);
    parts
}

fn unquote(value: &str) -> String {
    let trimmed = value.trim();
    if trimmed.len() >= 2 && trimmed.starts_with('"') && trimmed.ends_with('"') {
        trimmed[1..trimmed.len() - 1].to_string()
    } else {
        trimmed.to_string()
    }
}
