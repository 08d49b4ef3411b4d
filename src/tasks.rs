//! Maps rendered task markers back to raw body lines and toggles them.
//!
//! A task line starts with `[ ]` or `[x]` (either case on read) followed by
//! one whitespace character. Toggling rewrites only that leading marker,
//! canonicalizing to a lower-case `x` and a single space; the remainder of
//! the line is preserved byte-for-byte.

/// Matches a checked task prefix, returning the text after the marker.
pub fn parse_checked(line: &str) -> Option<&str> {
    let rest = line
        .strip_prefix("[x]")
        .or_else(|| line.strip_prefix("[X]"))?;
    strip_one_whitespace(rest)
}

/// Matches an unchecked task prefix, returning the text after the marker.
pub fn parse_unchecked(line: &str) -> Option<&str> {
    strip_one_whitespace(line.strip_prefix("[ ]")?)
}

fn strip_one_whitespace(rest: &str) -> Option<&str> {
    let mut chars = rest.chars();
    match chars.next() {
        Some(c) if c.is_whitespace() => Some(chars.as_str()),
        _ => None,
    }
}

/// Whether a raw line satisfies the task pattern used for ordinal mapping.
pub fn is_task_line(line: &str) -> bool {
    parse_checked(line).is_some() || parse_unchecked(line).is_some()
}

/// Flips a task line's leading marker, leaving the rest of the line
/// untouched. Returns `None` for lines without a task marker.
pub fn toggle_marker(line: &str) -> Option<String> {
    if let Some(rest) = parse_unchecked(line) {
        return Some(format!("[x] {rest}"));
    }
    if let Some(rest) = parse_checked(line) {
        return Some(format!("[ ] {rest}"));
    }
    None
}

/// Plain mode: rendered body blocks map 1:1 to raw body lines, so the
/// clicked block index addresses the raw line directly (offset past the
/// title line). Returns the rewritten body, or `None` when the addressed
/// line is not a task line.
pub fn toggle_at_block(body: &str, block_index: usize) -> Option<String> {
    toggle_line(body, block_index + 1)
}

/// Rich-text mode: markup restructures lines, so the N-th rendered marker
/// is matched against the N-th raw line satisfying the task pattern,
/// scanning from the first body line after the title.
pub fn toggle_at_ordinal(body: &str, ordinal: usize) -> Option<String> {
    let mut seen = 0;
    for (index, line) in body.split('\n').enumerate().skip(1) {
        if is_task_line(line) {
            if seen == ordinal {
                return toggle_line(body, index);
            }
            seen += 1;
        }
    }
    None
}

fn toggle_line(body: &str, line_index: usize) -> Option<String> {
    let mut lines: Vec<String> = body.split('\n').map(str::to_string).collect();
    let toggled = toggle_marker(lines.get(line_index)?)?;
    lines[line_index] = toggled;
    Some(lines.join("\n"))
}
