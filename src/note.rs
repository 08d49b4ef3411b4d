//! The note entity and its mutation rules.
//!
//! A note's `body` is the single source of truth: line 0 is the title line,
//! everything after it is the body text. The `title` field is a cached copy
//! of the first line kept in sync on every mutation.

use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{format_note_timestamp, parse_tags, split_body};

/// A saved historical copy of a note's body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// The full body at the time the snapshot was taken
    pub body: String,
    /// When the snapshot was taken
    pub timestamp: DateTime<Utc>,
}

/// Represents a single note in our system
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Note {
    /// Unique identifier for the note
    pub id: String,
    /// Cached copy of the body's first line, for list display
    pub title: String,
    /// Full note text; the first line is the title line
    pub body: String,
    /// When the note was created
    pub created_at: DateTime<Utc>,
    /// Last modification time
    pub updated_at: DateTime<Utc>,
    /// Pins the note to the top of lists
    #[serde(default)]
    pub favorite: bool,
    /// Tags for organization; duplicates are permitted
    #[serde(default)]
    pub tags: Vec<String>,
    /// Selects rich-text rendering for the body
    #[serde(default)]
    pub markdown_enabled: bool,
    /// Bounded history of body snapshots, oldest first
    #[serde(default)]
    pub history: Vec<Snapshot>,
}

impl Note {
    /// Creates a new note stamped with the given local time. The formatted
    /// timestamp becomes the title line and the first body line.
    pub fn new(now: DateTime<Local>) -> Self {
        let stamp = format_note_timestamp(now);
        let created = now.with_timezone(&Utc);

        Note {
            id: Uuid::new_v4().to_string(),
            title: stamp.clone(),
            body: format!("{stamp}\n{stamp}"),
            created_at: created,
            updated_at: created,
            favorite: false,
            tags: Vec::new(),
            markdown_enabled: false,
            history: Vec::new(),
        }
    }

    /// The title line of the body.
    pub fn title_line(&self) -> &str {
        split_body(&self.body).0
    }

    /// Everything after the title line.
    pub fn body_text(&self) -> &str {
        split_body(&self.body).1.unwrap_or("")
    }

    /// Recomputes the body from an edited title and body text. Returns
    /// `false` without touching anything when the result is unchanged, so
    /// callers can skip persistence and debounce restarts.
    pub fn set_body(&mut self, title: &str, body_text: &str, now: DateTime<Utc>) -> bool {
        let full = format!("{title}\n{body_text}");
        if self.body == full {
            return false;
        }
        self.body = full;
        self.title = title.to_string();
        self.updated_at = now;
        true
    }

    /// Replaces the whole body string, re-deriving the title cache.
    pub fn replace_body(&mut self, body: String, now: DateTime<Utc>) {
        self.title = split_body(&body).0.to_string();
        self.body = body;
        self.updated_at = now;
    }

    /// Parses and stores a raw comma-separated tag string. Returns `false`
    /// when the parsed list equals the current one.
    pub fn set_tags(&mut self, raw: &str, now: DateTime<Utc>) -> bool {
        let tags = parse_tags(raw);
        if self.tags == tags {
            return false;
        }
        self.tags = tags;
        self.updated_at = now;
        true
    }

    /// Flips the favorite pin.
    pub fn toggle_favorite(&mut self, now: DateTime<Utc>) {
        self.favorite = !self.favorite;
        self.updated_at = now;
    }

    /// Switches between plain and rich-text rendering for this note.
    pub fn set_markdown_enabled(&mut self, enabled: bool, now: DateTime<Utc>) {
        self.markdown_enabled = enabled;
        self.updated_at = now;
    }

    /// Search predicate: case-insensitive substring match against the body
    /// or any tag. An empty query matches every note.
    pub fn matches_query(&self, query: &str) -> bool {
        let needle = query.to_lowercase();
        self.body.to_lowercase().contains(&needle)
            || self.tags.iter().any(|t| t.to_lowercase().contains(&needle))
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn fixed_local() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    fn fixed_utc(secs: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, secs).unwrap()
    }

    #[test]
    fn new_note_seeds_title_and_body_with_the_timestamp() {
        let note = Note::new(fixed_local());
        assert_eq!(note.body, "2024/01/01 00:00\n2024/01/01 00:00");
        assert_eq!(note.title, "2024/01/01 00:00");
        assert_eq!(note.title, note.title_line());
        assert!(!note.favorite);
        assert!(!note.markdown_enabled);
        assert!(note.tags.is_empty());
        assert!(note.history.is_empty());
    }

    #[test]
    fn set_body_is_a_noop_for_identical_content() {
        let mut note = Note::new(fixed_local());
        let before = note.updated_at;
        let changed = note.set_body("2024/01/01 00:00", "2024/01/01 00:00", fixed_utc(30));
        assert!(!changed);
        assert_eq!(note.updated_at, before);
    }

    #[test]
    fn set_body_keeps_the_title_cache_in_sync() {
        let mut note = Note::new(fixed_local());
        assert!(note.set_body("Groceries", "[ ] milk", fixed_utc(30)));
        assert_eq!(note.body, "Groceries\n[ ] milk");
        assert_eq!(note.title, "Groceries");
        assert_eq!(note.title, note.title_line());
        assert_eq!(note.body_text(), "[ ] milk");
        assert_eq!(note.updated_at, fixed_utc(30));
    }

    #[test]
    fn set_tags_permits_duplicates_and_skips_identical_lists() {
        let mut note = Note::new(fixed_local());
        assert!(note.set_tags("work, , work", fixed_utc(1)));
        assert_eq!(note.tags, vec!["work", "work"]);

        let before = note.updated_at;
        assert!(!note.set_tags(" work ,work", fixed_utc(2)));
        assert_eq!(note.updated_at, before);
    }

    #[test]
    fn replace_body_rederives_the_title() {
        let mut note = Note::new(fixed_local());
        note.replace_body("New title\nrest".to_string(), fixed_utc(5));
        assert_eq!(note.title, "New title");
    }

    #[test]
    fn query_matches_body_and_tags_case_insensitively() {
        let mut note = Note::new(fixed_local());
        note.set_body("Shopping", "Buy Milk", fixed_utc(1));
        note.set_tags("Errands", fixed_utc(2));

        assert!(note.matches_query("milk"));
        assert!(note.matches_query("shopping"));
        assert!(note.matches_query("errands"));
        assert!(note.matches_query(""));
        assert!(!note.matches_query("meeting"));
    }

    #[test]
    fn migration_fills_defaults_for_missing_optional_fields() {
        let raw = r#"{
            "id": "n1",
            "title": "old",
            "body": "old\ncontent",
            "created_at": "2023-05-01T00:00:00Z",
            "updated_at": "2023-05-02T00:00:00Z",
            "unknown_extra": 42
        }"#;
        let note: Note = serde_json::from_str(raw).unwrap();
        assert!(!note.favorite);
        assert!(note.tags.is_empty());
        assert!(!note.markdown_enabled);
        assert!(note.history.is_empty());
    }
}
