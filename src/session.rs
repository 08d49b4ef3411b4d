//! The view/edit mode state machine and the application session state.
//!
//! A `Session` is the single application-state value: the store, the current
//! mode, the editor field buffers and the snapshot debounce all live here,
//! so there are no module-level singletons. Every entry point is a discrete
//! user action or the timer poll; nothing runs concurrently with anything
//! else.

use chrono::{DateTime, Local, Utc};
use log::debug;

use crate::{
    render_note, ClickTarget, Note, NoteStore, RenderCapabilities, RenderedNote, Result,
    SnapshotTimer,
};

/// The four display modes: plain or markdown family, view or edit variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    PlainView,
    PlainEdit,
    MarkdownView,
    MarkdownEdit,
}

impl Mode {
    /// The view variant matching a note's markdown flag. `PlainView` when
    /// there is no note at all.
    pub fn view_for(note: Option<&Note>) -> Mode {
        match note {
            Some(n) if n.markdown_enabled => Mode::MarkdownView,
            _ => Mode::PlainView,
        }
    }

    pub fn is_edit(self) -> bool {
        matches!(self, Mode::PlainEdit | Mode::MarkdownEdit)
    }

    pub fn is_markdown(self) -> bool {
        matches!(self, Mode::MarkdownView | Mode::MarkdownEdit)
    }

    /// The edit variant of the same family.
    pub fn to_edit(self) -> Mode {
        match self {
            Mode::PlainView | Mode::PlainEdit => Mode::PlainEdit,
            Mode::MarkdownView | Mode::MarkdownEdit => Mode::MarkdownEdit,
        }
    }

    /// The view variant of the same family.
    pub fn to_view(self) -> Mode {
        match self {
            Mode::PlainView | Mode::PlainEdit => Mode::PlainView,
            Mode::MarkdownView | Mode::MarkdownEdit => Mode::MarkdownView,
        }
    }

    /// The same view/edit variant in the other family.
    pub fn with_markdown(self, enabled: bool) -> Mode {
        match (enabled, self.is_edit()) {
            (true, true) => Mode::MarkdownEdit,
            (true, false) => Mode::MarkdownView,
            (false, true) => Mode::PlainEdit,
            (false, false) => Mode::PlainView,
        }
    }
}

/// Editable surface buffers, populated from the active note whenever the
/// selection changes or edit mode is entered.
#[derive(Debug, Clone, Default)]
pub struct EditorFields {
    /// Title field contents
    pub title: String,
    /// Body field contents (everything after the title line)
    pub body: String,
    /// Raw tag field contents, applied to the model on flush
    pub tags: String,
}

/// All mutable application state. One instance per running app.
pub struct Session {
    store: NoteStore,
    caps: RenderCapabilities,
    mode: Mode,
    fields: EditorFields,
    timer: SnapshotTimer,
}

impl Session {
    /// Builds a session over an opened store. The initial mode is the view
    /// variant for the active note.
    pub fn new(store: NoteStore, caps: RenderCapabilities) -> Self {
        let mode = Mode::view_for(store.active());
        let mut session = Self {
            store,
            caps,
            mode,
            fields: EditorFields::default(),
            timer: SnapshotTimer::new(),
        };
        session.populate_fields();
        session
    }

    pub fn store(&self) -> &NoteStore {
        &self.store
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn fields(&self) -> &EditorFields {
        &self.fields
    }

    fn populate_fields(&mut self) {
        self.fields = match self.store.active() {
            Some(note) => EditorFields {
                title: note.title_line().to_string(),
                body: note.body_text().to_string(),
                tags: note.tags.join(", "),
            },
            None => EditorFields::default(),
        };
    }

    fn active_note_id(&self) -> Option<String> {
        self.store.active_id().map(str::to_string)
    }

    /// Renders the active note for display.
    pub fn render_active(&self) -> Option<RenderedNote> {
        self.store.active().map(|note| render_note(note, &self.caps))
    }

    /// Creates a note stamped with `now` and enters edit mode on it.
    pub fn create_note(&mut self, now: DateTime<Local>) -> Result<String> {
        let id = self.store.create(now)?.id.clone();
        self.populate_fields();
        self.mode = Mode::view_for(self.store.active()).to_edit();
        Ok(id)
    }

    /// Deletes the active note; the first remaining note in stored order
    /// becomes active, shown in its own view variant. No-op when nothing is
    /// active.
    pub fn delete_active(&mut self) -> Result<()> {
        let Some(id) = self.active_note_id() else {
            return Ok(());
        };
        if self.timer.pending_note() == Some(id.as_str()) {
            self.timer.cancel();
        }
        self.store.delete(&id)?;
        self.populate_fields();
        self.mode = Mode::view_for(self.store.active());
        Ok(())
    }

    /// Switches the active note (a sidebar list click), showing it in its
    /// own view variant. Returns `false` for an unknown id.
    pub fn select_note(&mut self, id: &str) -> bool {
        if !self.store.set_active(id) {
            return false;
        }
        self.populate_fields();
        self.mode = Mode::view_for(self.store.active());
        true
    }

    /// A click on the display surface: task-marker clicks toggle the
    /// addressed task, anything else activates edit mode. No-op when
    /// nothing is active.
    pub fn click_display(&mut self, target: ClickTarget, now: DateTime<Utc>) -> Result<()> {
        let Some(id) = self.active_note_id() else {
            return Ok(());
        };
        match target {
            ClickTarget::TaskBlock(index) => {
                if self.store.toggle_task_block(&id, index, now)? {
                    self.after_body_mutation(&id, now);
                }
            }
            ClickTarget::TaskMarker(ordinal) => {
                if self.store.toggle_task_ordinal(&id, ordinal, now)? {
                    self.after_body_mutation(&id, now);
                }
            }
            ClickTarget::Text => {
                self.populate_fields();
                self.mode = self.mode.to_edit();
                debug!("Display click entered {:?}", self.mode);
            }
        }
        Ok(())
    }

    fn after_body_mutation(&mut self, id: &str, now: DateTime<Utc>) {
        self.timer
            .arm(id, now, self.store.config().snapshot_debounce());
        self.populate_fields();
    }

    /// Applies editor field input (title + body). Unchanged content is a
    /// complete no-op; a change bumps the timestamp, persists and restarts
    /// the snapshot debounce.
    pub fn edit_fields(&mut self, title: &str, body: &str, now: DateTime<Utc>) -> Result<bool> {
        let Some(id) = self.active_note_id() else {
            return Ok(false);
        };
        self.fields.title = title.to_string();
        self.fields.body = body.to_string();

        let changed = self.store.update_body(&id, title, body, now)?;
        if changed {
            self.timer
                .arm(&id, now, self.store.config().snapshot_debounce());
        }
        Ok(changed)
    }

    /// Stores raw tag-field text without applying it; it reaches the model
    /// on blur or when returning to view mode.
    pub fn set_tags_field(&mut self, raw: &str) {
        self.fields.tags = raw.to_string();
    }

    /// Flushes the tag field into the model. No-op when parsing yields the
    /// current tag list, or when nothing is active.
    pub fn flush_tags(&mut self, now: DateTime<Utc>) -> Result<bool> {
        let Some(id) = self.active_note_id() else {
            return Ok(false);
        };
        self.store.update_tags(&id, &self.fields.tags, now)
    }

    /// Loss of focus from every editing surface, after the settle delay.
    pub fn blur_editors(&mut self, now: DateTime<Utc>) -> Result<()> {
        if !self.mode.is_edit() {
            return Ok(());
        }
        self.enter_view(now)
    }

    /// A click on the main header while editing returns to view mode.
    pub fn header_click(&mut self, now: DateTime<Utc>) -> Result<()> {
        if !self.mode.is_edit() {
            return Ok(());
        }
        self.enter_view(now)
    }

    fn enter_view(&mut self, now: DateTime<Utc>) -> Result<()> {
        // Pending tag edits reach the model before the display re-renders.
        self.flush_tags(now)?;
        self.mode = self.mode.to_view();
        Ok(())
    }

    /// Toggles the markdown flag: the note's field and timestamp update and
    /// the mode moves to the other family, preserving view/edit-ness.
    /// No-op when nothing is active.
    pub fn toggle_markdown(&mut self, enabled: bool, now: DateTime<Utc>) -> Result<()> {
        let Some(id) = self.active_note_id() else {
            return Ok(());
        };
        self.store.set_markdown_enabled(&id, enabled, now)?;
        self.mode = self.mode.with_markdown(enabled);
        Ok(())
    }

    /// Flips the favorite pin of any note (a sidebar star click).
    pub fn toggle_favorite(&mut self, id: &str, now: DateTime<Utc>) -> Result<bool> {
        self.store.toggle_favorite(id, now)
    }

    /// Fires the snapshot debounce if its quiet period has elapsed. Returns
    /// `true` when a snapshot was recorded.
    pub fn poll_snapshots(&mut self, now: DateTime<Utc>) -> Result<bool> {
        let Some(note_id) = self.timer.take_due(now) else {
            return Ok(false);
        };
        self.store.snapshot(&note_id, now)
    }

    /// Restores a history snapshot into the active note. No-op when nothing
    /// is active.
    pub fn restore_snapshot(&mut self, index: usize, now: DateTime<Utc>) -> Result<()> {
        let Some(id) = self.active_note_id() else {
            return Ok(());
        };
        self.store.restore_snapshot(&id, index, now)?;
        self.populate_fields();
        Ok(())
    }

    /// Whether a snapshot is pending, and for which note.
    pub fn pending_snapshot_note(&self) -> Option<&str> {
        self.timer.pending_note()
    }
}
