//! Guest-mode local store
//!
//! Mirrors browser local storage on disk: one JSON file per
//! `(guest context, collection key)` holding the full serialized array of
//! that entity's records. Reads fail soft (a missing or corrupt file is an
//! empty collection, never an error) and every mutation rewrites the whole
//! list, matching the storage model the guest experience is built around.

use crate::errors::Result;
use serde::{de::DeserializeOwned, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Collection keys, one per entity type
pub const NOTES_KEY: &str = "guest_notes";
pub const FLASHCARDS_KEY: &str = "guest_flashcards";
pub const QUIZ_QUESTIONS_KEY: &str = "guest_quiz_questions";
pub const COMICS_KEY: &str = "guest_comics";
pub const EXAMS_KEY: &str = "guest_exams";
pub const STUDY_SESSIONS_KEY: &str = "guest_study_sessions";

/// File-backed store for unauthenticated guest contexts
#[derive(Clone)]
pub struct LocalStore {
    root: PathBuf,
}

impl LocalStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn collection_path(&self, guest_id: &str, key: &str) -> PathBuf {
        // Guest ids are validated at the auth boundary; the join here can
        // only produce paths under the guest's own directory.
        self.root.join(guest_id).join(format!("{}.json", key))
    }

    /// Read a collection, degrading to an empty list on any failure
    pub fn read<T: DeserializeOwned>(&self, guest_id: &str, key: &str) -> Vec<T> {
        let path = self.collection_path(guest_id, key);
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(_) => return Vec::new(),
        };

        match serde_json::from_str(&raw) {
            Ok(items) => items,
            Err(e) => {
                warn!(
                    path = %path.display(),
                    error = %e,
                    "Corrupt guest collection, degrading to empty list"
                );
                Vec::new()
            }
        }
    }

    /// Persist the whole collection, creating the guest directory on demand
    pub fn write<T: Serialize>(&self, guest_id: &str, key: &str, items: &[T]) -> Result<()> {
        let path = self.collection_path(guest_id, key);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let raw = serde_json::to_string(items)?;
        write_atomic(&path, raw.as_bytes())?;
        Ok(())
    }

    /// Remove every collection belonging to a guest context
    pub fn clear(&self, guest_id: &str) -> Result<()> {
        let dir = self.root.join(guest_id);
        if dir.exists() {
            fs::remove_dir_all(dir)?;
        }
        Ok(())
    }
}

/// Write via a sibling temp file + rename so a crash mid-write leaves the
/// previous list intact rather than a truncated file
fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, bytes)?;
    fs::rename(&tmp, path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Note, NoteDraft};
    use chrono::Utc;
    use uuid::Uuid;

    fn note(title: &str) -> Note {
        let draft = NoteDraft {
            title: title.into(),
            content: "content".into(),
            subject: None,
            tags: vec!["tag".into()],
            is_synthesis: false,
        };
        Note {
            id: Uuid::new_v4().to_string(),
            title: draft.title,
            content: draft.content,
            subject: draft.subject,
            tags: draft.tags,
            is_synthesis: draft.is_synthesis,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_missing_collection_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::new(dir.path());

        let notes: Vec<Note> = store.read("guest-1", NOTES_KEY);
        assert!(notes.is_empty());
    }

    #[test]
    fn test_round_trip_preserves_order() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::new(dir.path());

        let notes = vec![note("first"), note("second"), note("third")];
        store.write("guest-1", NOTES_KEY, &notes).unwrap();

        let back: Vec<Note> = store.read("guest-1", NOTES_KEY);
        assert_eq!(back, notes);
    }

    #[test]
    fn test_corrupt_file_degrades_to_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::new(dir.path());

        store.write("guest-1", NOTES_KEY, &[note("a")]).unwrap();
        let path = dir.path().join("guest-1").join(format!("{}.json", NOTES_KEY));
        fs::write(&path, b"{not json").unwrap();

        let back: Vec<Note> = store.read("guest-1", NOTES_KEY);
        assert!(back.is_empty());
    }

    #[test]
    fn test_collections_are_namespaced_per_guest() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::new(dir.path());

        store.write("guest-1", NOTES_KEY, &[note("mine")]).unwrap();

        let other: Vec<Note> = store.read("guest-2", NOTES_KEY);
        assert!(other.is_empty());
    }

    #[test]
    fn test_clear_removes_all_collections() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::new(dir.path());

        store.write("guest-1", NOTES_KEY, &[note("a")]).unwrap();
        store.clear("guest-1").unwrap();

        let back: Vec<Note> = store.read("guest-1", NOTES_KEY);
        assert!(back.is_empty());
    }
}
