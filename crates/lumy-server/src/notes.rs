//! Per-page notes storage.

use std::collections::HashMap;

use lumy_types::messages::Note;
use parking_lot::RwLock;

/// Notes keyed by page id.
pub trait NotesStore: Send + Sync {
    fn get_notes(&self, step_id: &str) -> Vec<Note>;

    fn add_note(&self, step_id: &str, note: Note);

    /// Replace content and title of the note with the same id. Returns
    /// whether a note was updated.
    fn update_note(&self, step_id: &str, note: Note) -> bool;

    /// Returns whether a note was removed.
    fn delete_note(&self, step_id: &str, note_id: &str) -> bool;
}

/// Process-local notes, lost on exit.
#[derive(Debug, Default)]
pub struct InMemoryNotesStore {
    notes: RwLock<HashMap<String, Vec<Note>>>,
}

impl InMemoryNotesStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl NotesStore for InMemoryNotesStore {
    fn get_notes(&self, step_id: &str) -> Vec<Note> {
        self.notes.read().get(step_id).cloned().unwrap_or_default()
    }

    fn add_note(&self, step_id: &str, note: Note) {
        self.notes
            .write()
            .entry(step_id.to_string())
            .or_default()
            .push(note);
    }

    fn update_note(&self, step_id: &str, note: Note) -> bool {
        let mut notes = self.notes.write();
        let Some(existing) = notes
            .get_mut(step_id)
            .and_then(|notes| notes.iter_mut().find(|n| n.id == note.id))
        else {
            return false;
        };
        existing.content = note.content;
        existing.title = note.title;
        true
    }

    fn delete_note(&self, step_id: &str, note_id: &str) -> bool {
        let mut notes = self.notes.write();
        let Some(page) = notes.get_mut(step_id) else {
            return false;
        };
        let before = page.len();
        page.retain(|n| n.id != note_id);
        page.len() != before
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn note(id: &str, content: &str) -> Note {
        Note {
            id: id.into(),
            content: content.into(),
            created_at: "2024-01-01T00:00:00+00:00".into(),
            title: None,
        }
    }

    #[test]
    fn test_add_update_delete() {
        let store = InMemoryNotesStore::new();
        store.add_note("P", note("1", "first"));
        store.add_note("P", note("2", "second"));
        store.add_note("Q", note("3", "other page"));

        let mut changed = note("1", "edited");
        changed.title = Some("Title".into());
        changed.created_at = "ignored".into();
        assert!(store.update_note("P", changed));

        let notes = store.get_notes("P");
        assert_eq!(notes.len(), 2);
        assert_eq!(notes[0].content, "edited");
        assert_eq!(notes[0].title.as_deref(), Some("Title"));
        assert_eq!(notes[0].created_at, "2024-01-01T00:00:00+00:00");

        assert!(store.delete_note("P", "2"));
        assert!(!store.delete_note("P", "2"));
        assert_eq!(store.get_notes("P").len(), 1);
        assert_eq!(store.get_notes("Q").len(), 1);
    }

    #[test]
    fn test_unknown_page_is_empty() {
        let store = InMemoryNotesStore::new();
        assert!(store.get_notes("nope").is_empty());
        assert!(!store.update_note("nope", note("1", "x")));
    }
}
