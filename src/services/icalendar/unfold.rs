// Line unfolding
// Folded physical lines are joined back into logical content lines
// before tokenizing.

/// Join folded lines into logical lines. Newline conventions are
/// normalised first; a physical line starting with one space or tab
/// continues the previous logical line. Trailing whitespace and
/// unprintable control characters are stripped, and empty lines dropped.
pub fn unfold(content: &str) -> Vec<String> {
    let normalised = content
        .replace("\r\n", "\n")
        .replace("\n\r", "\n")
        .replace('\r', "\n");

    let mut lines: Vec<String> = Vec::new();
    for physical in normalised.split('\n') {
        match (continuation(physical), lines.last_mut()) {
            (Some(rest), Some(last)) => last.push_str(rest),
            (Some(rest), None) => lines.push(rest.to_string()),
            (None, _) => lines.push(physical.to_string()),
        }
    }

    lines
        .into_iter()
        .map(|line| strip_unprintable(line.trim_end()))
        .filter(|line| !line.is_empty())
        .collect()
}

fn continuation(line: &str) -> Option<&str> {
    line.strip_prefix(' ').or_else(|| line.strip_prefix('\t'))
}

fn strip_unprintable(line: &str) -> String {
    line.chars()
        .filter(|&c| {
            let code = c as u32;
            code > 0x1F && code != 0x7F && code != 0xA0
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unfold_joins_continuation_lines() {
        let lines = unfold("SUMMARY:Hello\r\n  World\r\nUID:1\r\n");
        assert_eq!(lines, vec!["SUMMARY:Hello World", "UID:1"]);
    }

    #[test]
    fn test_unfold_tab_continuation() {
        let lines = unfold("DESCRIPTION:part one\n\tpart two");
        assert_eq!(lines, vec!["DESCRIPTION:part onepart two"]);
    }

    #[test]
    fn test_unfold_mixed_newlines() {
        let lines = unfold("A:1\rB:2\n\rC:3\r\nD:4");
        assert_eq!(lines, vec!["A:1", "B:2", "C:3", "D:4"]);
    }

    #[test]
    fn test_unfold_drops_empty_and_control() {
        let lines = unfold("A:1\n\n\u{0}B:2\u{7f}\nC:3  ");
        assert_eq!(lines, vec!["A:1", "B:2", "C:3"]);
    }

    #[test]
    fn test_unfold_leading_continuation_without_previous_line() {
        // A pathological continuation at the top of the stream stands alone.
        let lines = unfold(" stray\nA:1");
        assert_eq!(lines, vec!["stray", "A:1"]);
    }
}
