//! Owns the note collection, its persistence and schema migration.
//!
//! The store is the only holder of the in-memory collection; every mutation
//! happens in place here and is persisted immediately. The collection is
//! serialized as one value under a well-known key of the storage area.

use chrono::{DateTime, Local, Utc};
use log::{debug, info, warn};

use crate::{
    history, split_body, tasks, Config, JotterError, Note, Result, StorageArea,
};

/// Well-known storage-area key holding the serialized note collection.
pub const NOTES_KEY: &str = "notes";

/// Manages the collection of notes, the active selection and persistence.
pub struct NoteStore {
    /// Engine configuration
    config: Config,

    /// Backing storage area
    area: StorageArea,

    /// The single in-memory collection, in persisted order
    notes: Vec<Note>,

    /// Currently selected note, if the collection is non-empty
    active_id: Option<String>,
}

impl NoteStore {
    /// Opens the store, loading whatever collection the storage area holds.
    /// Absent or corrupt data yields an empty collection, never an error.
    pub fn open(config: Config) -> Self {
        let area = StorageArea::load(&config.data_file);
        let notes = Self::load_notes(&area);
        let active_id = notes.first().map(|n| n.id.clone());

        info!("Opened note store with {} notes", notes.len());
        Self {
            config,
            area,
            notes,
            active_id,
        }
    }

    fn load_notes(area: &StorageArea) -> Vec<Note> {
        let raw = match area.get(NOTES_KEY) {
            Some(raw) => raw,
            None => return Vec::new(),
        };

        match serde_json::from_str::<Vec<Note>>(raw) {
            Ok(mut notes) => {
                // Serde defaults already filled favorite, tags, history and
                // markdown_enabled for records persisted before those fields
                // existed. The title cache is re-derived in case the stored
                // copy drifted from the body.
                for note in &mut notes {
                    note.title = split_body(&note.body).0.to_string();
                }
                debug!("Loaded {} notes from storage", notes.len());
                notes
            }
            Err(e) => {
                warn!("Stored note collection is unreadable, starting empty: {}", e);
                Vec::new()
            }
        }
    }

    /// Serializes the collection back under the well-known key and persists
    /// the storage area. Called after every mutating operation.
    pub fn save(&mut self) -> Result<()> {
        let json = serde_json::to_string(&self.notes)?;
        self.area.set(NOTES_KEY, json)?;
        debug!("Saved {} notes", self.notes.len());
        Ok(())
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    /// All notes in persisted order.
    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    pub fn get(&self, id: &str) -> Option<&Note> {
        self.notes.iter().find(|n| n.id == id)
    }

    fn note_mut(&mut self, id: &str) -> Result<&mut Note> {
        self.notes
            .iter_mut()
            .find(|n| n.id == id)
            .ok_or_else(|| JotterError::NoteNotFound { id: id.to_string() })
    }

    pub fn active_id(&self) -> Option<&str> {
        self.active_id.as_deref()
    }

    pub fn active(&self) -> Option<&Note> {
        let id = self.active_id.as_deref()?;
        self.notes.iter().find(|n| n.id == id)
    }

    /// Selects a note. Returns `false` when no note with that id exists.
    pub fn set_active(&mut self, id: &str) -> bool {
        if self.notes.iter().any(|n| n.id == id) {
            self.active_id = Some(id.to_string());
            true
        } else {
            false
        }
    }

    /// Creates a note stamped with `now`, inserts it at the front of the
    /// collection and makes it active.
    pub fn create(&mut self, now: DateTime<Local>) -> Result<&Note> {
        let note = Note::new(now);
        info!("Created note {}", note.id);

        self.active_id = Some(note.id.clone());
        self.notes.insert(0, note);
        self.save()?;
        Ok(&self.notes[0])
    }

    /// Deletes a note. When the active note is removed, the first remaining
    /// note in stored order becomes active. Returns `false` when no note
    /// with that id exists.
    pub fn delete(&mut self, id: &str) -> Result<bool> {
        let before = self.notes.len();
        self.notes.retain(|n| n.id != id);
        if self.notes.len() == before {
            debug!("Delete ignored, no note {}", id);
            return Ok(false);
        }

        if self.active_id.as_deref() == Some(id) {
            self.active_id = self.notes.first().map(|n| n.id.clone());
        }
        self.save()?;
        info!("Deleted note {}", id);
        Ok(true)
    }

    /// Notes in display order: favorites first, then most recently updated.
    /// Recomputed on every call, never cached.
    pub fn sorted(&self) -> Vec<&Note> {
        let mut view: Vec<&Note> = self.notes.iter().collect();
        view.sort_by(|a, b| {
            b.favorite
                .cmp(&a.favorite)
                .then(b.updated_at.cmp(&a.updated_at))
        });
        view
    }

    /// Display order filtered by the search predicate: case-insensitive
    /// substring of the body or of any tag. An empty query matches all.
    pub fn search(&self, query: &str) -> Vec<&Note> {
        self.sorted()
            .into_iter()
            .filter(|n| n.matches_query(query))
            .collect()
    }

    /// Applies an edited title and body to a note. A no-change edit is a
    /// complete no-op: no timestamp bump and no persistence.
    pub fn update_body(
        &mut self,
        id: &str,
        title: &str,
        body_text: &str,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        let note = self.note_mut(id)?;
        if !note.set_body(title, body_text, now) {
            return Ok(false);
        }
        self.save()?;
        Ok(true)
    }

    /// Applies a raw comma-separated tag string to a note. No-op when the
    /// parsed list equals the current one.
    pub fn update_tags(&mut self, id: &str, raw: &str, now: DateTime<Utc>) -> Result<bool> {
        let note = self.note_mut(id)?;
        if !note.set_tags(raw, now) {
            return Ok(false);
        }
        self.save()?;
        Ok(true)
    }

    /// Flips a note's favorite pin, returning the new state.
    pub fn toggle_favorite(&mut self, id: &str, now: DateTime<Utc>) -> Result<bool> {
        let note = self.note_mut(id)?;
        note.toggle_favorite(now);
        let favorite = note.favorite;
        self.save()?;
        Ok(favorite)
    }

    /// Switches a note between plain and rich-text rendering.
    pub fn set_markdown_enabled(
        &mut self,
        id: &str,
        enabled: bool,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let note = self.note_mut(id)?;
        note.set_markdown_enabled(enabled, now);
        self.save()
    }

    /// Toggles the task marker on the raw line behind a rendered plain-mode
    /// body block. Returns `false` when that block is not a task line.
    pub fn toggle_task_block(
        &mut self,
        id: &str,
        block_index: usize,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        self.toggle_task_with(id, now, |body| tasks::toggle_at_block(body, block_index))
    }

    /// Toggles the N-th task line, counted the way rich-text rendering
    /// counts markers. Returns `false` when there is no such task line.
    pub fn toggle_task_ordinal(
        &mut self,
        id: &str,
        ordinal: usize,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        self.toggle_task_with(id, now, |body| tasks::toggle_at_ordinal(body, ordinal))
    }

    fn toggle_task_with(
        &mut self,
        id: &str,
        now: DateTime<Utc>,
        toggle: impl FnOnce(&str) -> Option<String>,
    ) -> Result<bool> {
        let note = self.note_mut(id)?;
        let Some(body) = toggle(&note.body) else {
            debug!("Task toggle ignored for note {}", id);
            return Ok(false);
        };
        note.replace_body(body, now);
        self.save()?;
        Ok(true)
    }

    /// Records a history snapshot of the note's current body, unless it
    /// matches the latest snapshot. The debounce may fire after the note it
    /// was armed against was deleted; that is not an error.
    pub fn snapshot(&mut self, id: &str, now: DateTime<Utc>) -> Result<bool> {
        let capacity = self.config.history_capacity;
        let Some(note) = self.notes.iter_mut().find(|n| n.id == id) else {
            debug!("Snapshot skipped, note {} is gone", id);
            return Ok(false);
        };
        if !history::push_snapshot(note, capacity, now) {
            debug!("Snapshot skipped for note {}, body unchanged", id);
            return Ok(false);
        }
        self.save()?;
        Ok(true)
    }

    /// Replaces a note's body with one of its history snapshots, stamping
    /// `now` as the modification time.
    pub fn restore_snapshot(&mut self, id: &str, index: usize, now: DateTime<Utc>) -> Result<()> {
        let note = self.note_mut(id)?;
        let Some(snapshot) = note.history.get(index) else {
            return Err(JotterError::SnapshotNotFound {
                id: id.to_string(),
                index,
            });
        };
        let body = snapshot.body.clone();
        note.replace_body(body, now);
        info!("Restored note {} from history snapshot {}", id, index);
        self.save()
    }

    /// Dumps the entire storage area to a snapshot file.
    pub fn export_area(&self, path: &std::path::Path) -> Result<()> {
        self.area.export_to(path)
    }

    /// Restores the storage area from a snapshot file and reloads the
    /// collection from it. A malformed snapshot is rejected with both the
    /// area and the collection untouched.
    pub fn import_area(&mut self, path: &std::path::Path) -> Result<()> {
        self.area.import_from(path)?;
        self.notes = Self::load_notes(&self.area);
        self.active_id = self.notes.first().map(|n| n.id.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use chrono::{Duration, TimeZone};
    use tempfile::TempDir;

    use super::*;

    fn test_config(dir: &TempDir) -> Config {
        Config {
            data_file: dir.path().join("notes.json"),
            ..Config::default()
        }
    }

    fn local(min: u32) -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 1, 1, 0, min, 0).unwrap()
    }

    fn at(secs: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap() + Duration::seconds(secs.into())
    }

    #[test]
    fn open_on_missing_file_yields_an_empty_collection() {
        let dir = TempDir::new().unwrap();
        let store = NoteStore::open(test_config(&dir));
        assert!(store.is_empty());
        assert!(store.active().is_none());
    }

    #[test]
    fn create_inserts_at_the_front_and_activates() {
        let dir = TempDir::new().unwrap();
        let mut store = NoteStore::open(test_config(&dir));

        let first = store.create(local(0)).unwrap().id.clone();
        let second = store.create(local(1)).unwrap().id.clone();

        assert_eq!(store.notes()[0].id, second);
        assert_eq!(store.notes()[1].id, first);
        assert_eq!(store.active_id(), Some(second.as_str()));
    }

    #[test]
    fn collection_survives_a_reload() {
        let dir = TempDir::new().unwrap();
        let id = {
            let mut store = NoteStore::open(test_config(&dir));
            let id = store.create(local(0)).unwrap().id.clone();
            store.update_body(&id, "Title", "content", at(1)).unwrap();
            id
        };

        let store = NoteStore::open(test_config(&dir));
        assert_eq!(store.len(), 1);
        let note = store.get(&id).unwrap();
        assert_eq!(note.body, "Title\ncontent");
        assert_eq!(note.title, "Title");
    }

    #[test]
    fn load_migrates_records_missing_optional_fields() {
        let dir = TempDir::new().unwrap();
        let config = test_config(&dir);

        // A collection persisted by an older schema: no favorite, tags,
        // markdown flag or history, and a stale title cache.
        let legacy = r#"[{
            "id": "old-1",
            "title": "stale",
            "body": "Fresh title\nbody",
            "created_at": "2023-05-01T00:00:00Z",
            "updated_at": "2023-05-02T00:00:00Z"
        }]"#;
        let area = serde_json::json!({ "notes": legacy });
        fs::write(&config.data_file, serde_json::to_string(&area).unwrap()).unwrap();

        let store = NoteStore::open(config);
        let note = store.get("old-1").unwrap();
        assert!(!note.favorite);
        assert!(note.tags.is_empty());
        assert!(!note.markdown_enabled);
        assert!(note.history.is_empty());
        assert_eq!(note.title, "Fresh title");
    }

    #[test]
    fn corrupt_collection_value_yields_an_empty_collection() {
        let dir = TempDir::new().unwrap();
        let config = test_config(&dir);
        let area = serde_json::json!({ "notes": "not a collection" });
        fs::write(&config.data_file, serde_json::to_string(&area).unwrap()).unwrap();

        let store = NoteStore::open(config);
        assert!(store.is_empty());
    }

    #[test]
    fn delete_of_the_active_note_activates_the_first_remaining() {
        let dir = TempDir::new().unwrap();
        let mut store = NoteStore::open(test_config(&dir));
        let a = store.create(local(0)).unwrap().id.clone();
        let b = store.create(local(1)).unwrap().id.clone();
        let c = store.create(local(2)).unwrap().id.clone();

        // Stored order is [c, b, a]; c is active.
        assert_eq!(store.active_id(), Some(c.as_str()));
        assert!(store.delete(&c).unwrap());
        assert_eq!(store.active_id(), Some(b.as_str()));

        // Deleting an inactive note leaves the selection alone.
        assert!(store.delete(&a).unwrap());
        assert_eq!(store.active_id(), Some(b.as_str()));

        assert!(store.delete(&b).unwrap());
        assert_eq!(store.active_id(), None);
        assert!(!store.delete(&b).unwrap());
    }

    #[test]
    fn sorted_puts_favorites_before_newer_notes() {
        let dir = TempDir::new().unwrap();
        let mut store = NoteStore::open(test_config(&dir));
        let older = store.create(local(0)).unwrap().id.clone();
        let newer = store.create(local(1)).unwrap().id.clone();

        store.update_body(&older, "older", "", at(10)).unwrap();
        store.update_body(&newer, "newer", "", at(20)).unwrap();
        store.toggle_favorite(&older, at(5)).unwrap();

        let order: Vec<&str> = store.sorted().iter().map(|n| n.id.as_str()).collect();
        assert_eq!(order, vec![older.as_str(), newer.as_str()]);
    }

    #[test]
    fn update_body_and_tags_are_idempotent_for_identical_input() {
        let dir = TempDir::new().unwrap();
        let mut store = NoteStore::open(test_config(&dir));
        let id = store.create(local(0)).unwrap().id.clone();

        assert!(store.update_body(&id, "T", "b", at(1)).unwrap());
        assert!(!store.update_body(&id, "T", "b", at(2)).unwrap());

        assert!(store.update_tags(&id, "work, home", at(3)).unwrap());
        assert!(!store.update_tags(&id, " work ,home ", at(4)).unwrap());

        let note = store.get(&id).unwrap();
        assert_eq!(note.updated_at, at(3));
    }

    #[test]
    fn search_matches_body_or_tags() {
        let dir = TempDir::new().unwrap();
        let mut store = NoteStore::open(test_config(&dir));
        let a = store.create(local(0)).unwrap().id.clone();
        let b = store.create(local(1)).unwrap().id.clone();
        store.update_body(&a, "Meeting notes", "agenda", at(1)).unwrap();
        store.update_tags(&b, "groceries", at(2)).unwrap();

        let hits: Vec<&str> = store.search("AGENDA").iter().map(|n| n.id.as_str()).collect();
        assert_eq!(hits, vec![a.as_str()]);

        let hits: Vec<&str> = store.search("grocer").iter().map(|n| n.id.as_str()).collect();
        assert_eq!(hits, vec![b.as_str()]);

        assert_eq!(store.search("").len(), 2);
    }

    #[test]
    fn snapshot_and_restore_round_trip() {
        let dir = TempDir::new().unwrap();
        let mut store = NoteStore::open(test_config(&dir));
        let id = store.create(local(0)).unwrap().id.clone();

        store.update_body(&id, "T", "first", at(1)).unwrap();
        assert!(store.snapshot(&id, at(61)).unwrap());
        store.update_body(&id, "T", "second", at(100)).unwrap();

        store.restore_snapshot(&id, 0, at(200)).unwrap();
        let note = store.get(&id).unwrap();
        assert_eq!(note.body, "T\nfirst");
        assert_eq!(note.updated_at, at(200));

        let err = store.restore_snapshot(&id, 5, at(201)).unwrap_err();
        assert!(matches!(err, JotterError::SnapshotNotFound { .. }));
    }

    #[test]
    fn snapshot_for_a_deleted_note_is_a_quiet_noop() {
        let dir = TempDir::new().unwrap();
        let mut store = NoteStore::open(test_config(&dir));
        let id = store.create(local(0)).unwrap().id.clone();
        store.delete(&id).unwrap();
        assert!(!store.snapshot(&id, at(61)).unwrap());
    }

    #[test]
    fn history_capacity_holds_under_repeated_snapshots() {
        let dir = TempDir::new().unwrap();
        let mut store = NoteStore::open(test_config(&dir));
        let id = store.create(local(0)).unwrap().id.clone();

        for i in 0..15u32 {
            store
                .update_body(&id, "T", &format!("rev {i}"), at(i))
                .unwrap();
            store.snapshot(&id, at(i) + Duration::seconds(60)).unwrap();
        }
        assert_eq!(store.get(&id).unwrap().history.len(), 10);
    }

    #[test]
    fn import_reloads_the_collection_from_the_snapshot() {
        let dir = TempDir::new().unwrap();
        let mut store = NoteStore::open(test_config(&dir));
        let id = store.create(local(0)).unwrap().id.clone();
        store.update_body(&id, "Kept", "around", at(1)).unwrap();

        let snapshot = dir.path().join("backup.json");
        store.export_area(&snapshot).unwrap();
        store.delete(&id).unwrap();
        assert!(store.is_empty());

        store.import_area(&snapshot).unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(store.get(&id).unwrap().title, "Kept");
        assert_eq!(store.active_id(), Some(id.as_str()));
    }
}
