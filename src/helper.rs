use chrono::{DateTime, Local};

/// Splits a comma-separated tag string, trimming each entry and dropping
/// empty ones. Duplicates are kept as the user entered them.
pub fn parse_tags(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Formats the timestamp that seeds new notes, e.g. `2024/01/01 00:00`.
pub fn format_note_timestamp(now: DateTime<Local>) -> String {
    now.format("%Y/%m/%d %H:%M").to_string()
}

/// Splits a body into its title line and the remaining body text. A body
/// without a newline has no body text at all, as opposed to an empty one.
pub fn split_body(body: &str) -> (&str, Option<&str>) {
    match body.split_once('\n') {
        Some((title, rest)) => (title, Some(rest)),
        None => (body, None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_tags_trims_and_drops_empty_entries() {
        assert_eq!(parse_tags("work, , work"), vec!["work", "work"]);
        assert_eq!(parse_tags("  a ,b,, c  "), vec!["a", "b", "c"]);
        assert!(parse_tags("").is_empty());
        assert!(parse_tags(" , ,").is_empty());
    }

    #[test]
    fn split_body_distinguishes_missing_and_empty_body_text() {
        assert_eq!(split_body("title"), ("title", None));
        assert_eq!(split_body("title\n"), ("title", Some("")));
        assert_eq!(split_body("title\na\nb"), ("title", Some("a\nb")));
        assert_eq!(split_body(""), ("", None));
    }
}
