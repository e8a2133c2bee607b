//! Upload-area storage
//!
//! Large files are uploaded out of band into a staging directory and
//! referenced by storage path. Paths are confined to the upload root, and
//! successfully processed objects are deleted so the staging area never
//! accumulates.

use crate::errors::{AppError, Result};
use std::fs;
use std::path::{Component, Path, PathBuf};

/// Access to the upload staging directory
#[derive(Clone)]
pub struct UploadStore {
    root: PathBuf,
}

impl UploadStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Resolve a client-supplied storage path, rejecting anything that
    /// would escape the upload root
    fn resolve(&self, storage_path: &str) -> Result<PathBuf> {
        let relative = Path::new(storage_path);
        let escapes = relative.is_absolute()
            || relative
                .components()
                .any(|c| matches!(c, Component::ParentDir | Component::Prefix(_)));
        if escapes {
            return Err(AppError::Validation {
                message: format!("invalid storage path {:?}", storage_path),
                field: Some("storagePath".into()),
            });
        }
        Ok(self.root.join(relative))
    }

    /// Read an uploaded object
    pub fn read(&self, storage_path: &str) -> Result<Vec<u8>> {
        let path = self.resolve(storage_path)?;
        fs::read(&path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => AppError::NotFound {
                resource_type: "upload".to_string(),
                id: storage_path.to_string(),
            },
            _ => AppError::Storage {
                message: format!("read failed for {:?}: {}", storage_path, e),
            },
        })
    }

    /// Delete an uploaded object after successful processing
    pub fn delete(&self, storage_path: &str) -> Result<()> {
        let path = self.resolve(storage_path)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            // Already gone is fine; deletion is best-effort cleanup
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AppError::Storage {
                message: format!("delete failed for {:?}: {}", storage_path, e),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_and_delete() {
        let dir = tempfile::tempdir().unwrap();
        let store = UploadStore::new(dir.path());

        fs::write(dir.path().join("doc.pdf"), b"payload").unwrap();

        assert_eq!(store.read("doc.pdf").unwrap(), b"payload");
        store.delete("doc.pdf").unwrap();
        assert!(matches!(
            store.read("doc.pdf"),
            Err(AppError::NotFound { .. })
        ));
        // Deleting again is a no-op
        store.delete("doc.pdf").unwrap();
    }

    #[test]
    fn test_traversal_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = UploadStore::new(dir.path());

        assert!(store.read("../outside.pdf").is_err());
        assert!(store.read("/etc/passwd").is_err());
    }
}
