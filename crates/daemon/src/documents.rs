// Document store: open note buffers that may hold unsaved edits.
//
// The sync coordinator flushes dirty buffers under the notebook before it
// stages anything, so the working tree matches what the user sees.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use thiserror::Error;
use tracing::debug;

/// What the coordinator needs to know about an open document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenDocument {
    pub path: PathBuf,
    pub is_dirty: bool,
}

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("document is not open: {0}")]
    NotOpen(PathBuf),

    #[error("failed to read {path}: {source}")]
    Read { path: PathBuf, source: std::io::Error },

    #[error("failed to write {path}: {source}")]
    Write { path: PathBuf, source: std::io::Error },
}

pub trait DocumentStore: Send + Sync {
    /// Every open document, saved or not.
    fn open_documents(&self) -> Vec<OpenDocument>;

    /// Persist one document's buffer to disk.
    fn save(&self, path: &Path) -> Result<(), DocumentError>;
}

struct Buffer {
    text: String,
    dirty: bool,
}

/// In-process document buffers keyed by file path.
#[derive(Default)]
pub struct DocumentRegistry {
    buffers: Mutex<BTreeMap<PathBuf, Buffer>>,
}

impl DocumentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load `path` into a buffer. Re-opening keeps the existing buffer.
    pub fn open(&self, path: &Path) -> Result<(), DocumentError> {
        let mut buffers = self.lock();
        if buffers.contains_key(path) {
            return Ok(());
        }
        let text = fs::read_to_string(path)
            .map_err(|source| DocumentError::Read { path: path.to_path_buf(), source })?;
        buffers.insert(path.to_path_buf(), Buffer { text, dirty: false });
        Ok(())
    }

    /// Current buffer contents.
    pub fn text(&self, path: &Path) -> Option<String> {
        self.lock().get(path).map(|b| b.text.clone())
    }

    /// Replace the buffer contents.
    pub fn edit(&self, path: &Path, text: impl Into<String>) -> Result<(), DocumentError> {
        self.with_buffer(path, |buffer| buffer.text = text.into())
    }

    /// Append to the end of the buffer.
    pub fn append(&self, path: &Path, text: &str) -> Result<(), DocumentError> {
        self.with_buffer(path, |buffer| buffer.text.push_str(text))
    }

    /// Drop a buffer without saving it.
    pub fn close(&self, path: &Path) -> bool {
        self.lock().remove(path).is_some()
    }

    fn with_buffer(&self, path: &Path, f: impl FnOnce(&mut Buffer)) -> Result<(), DocumentError> {
        let mut buffers = self.lock();
        let buffer =
            buffers.get_mut(path).ok_or_else(|| DocumentError::NotOpen(path.to_path_buf()))?;
        f(buffer);
        buffer.dirty = true;
        Ok(())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<PathBuf, Buffer>> {
        self.buffers.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl DocumentStore for DocumentRegistry {
    fn open_documents(&self) -> Vec<OpenDocument> {
        self.lock()
            .iter()
            .map(|(path, buffer)| OpenDocument { path: path.clone(), is_dirty: buffer.dirty })
            .collect()
    }

    fn save(&self, path: &Path) -> Result<(), DocumentError> {
        let mut buffers = self.lock();
        let buffer =
            buffers.get_mut(path).ok_or_else(|| DocumentError::NotOpen(path.to_path_buf()))?;
        fs::write(path, &buffer.text)
            .map_err(|source| DocumentError::Write { path: path.to_path_buf(), source })?;
        buffer.dirty = false;
        debug!(path = %path.display(), "document saved");
        Ok(())
    }
}

/// Dirty documents whose path lies under `root` (component-wise, so
/// `/notes-old` is not under `/notes`).
pub fn dirty_documents_under(store: &dyn DocumentStore, root: &Path) -> Vec<PathBuf> {
    store
        .open_documents()
        .into_iter()
        .filter(|doc| doc.is_dirty && doc.path.starts_with(root))
        .map(|doc| doc.path)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn edits_mark_dirty_and_save_clears() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("2024-01-01.md");
        fs::write(&path, "# 2024-01-01 Mon\n").unwrap();

        let registry = DocumentRegistry::new();
        registry.open(&path).unwrap();
        assert_eq!(registry.open_documents(), vec![OpenDocument { path: path.clone(), is_dirty: false }]);

        registry.append(&path, "- call mom\n").unwrap();
        assert!(registry.open_documents()[0].is_dirty);
        assert_eq!(fs::read_to_string(&path).unwrap(), "# 2024-01-01 Mon\n");

        registry.save(&path).unwrap();
        assert!(!registry.open_documents()[0].is_dirty);
        assert_eq!(fs::read_to_string(&path).unwrap(), "# 2024-01-01 Mon\n- call mom\n");
    }

    #[test]
    fn reopening_keeps_unsaved_buffer() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("a.md");
        fs::write(&path, "disk").unwrap();

        let registry = DocumentRegistry::new();
        registry.open(&path).unwrap();
        registry.edit(&path, "buffer").unwrap();
        registry.open(&path).unwrap();
        assert_eq!(registry.text(&path).as_deref(), Some("buffer"));
    }

    #[test]
    fn operations_on_unopened_document_fail() {
        let registry = DocumentRegistry::new();
        let path = Path::new("/nowhere/x.md");
        assert!(matches!(registry.append(path, "x"), Err(DocumentError::NotOpen(_))));
        assert!(matches!(registry.save(path), Err(DocumentError::NotOpen(_))));
        assert!(matches!(registry.open(path), Err(DocumentError::Read { .. })));
        assert!(!registry.close(path));
    }

    #[test]
    fn dirty_filter_is_component_wise() {
        let tmp = TempDir::new().unwrap();
        let notes = tmp.path().join("notes");
        let sibling = tmp.path().join("notes-old");
        fs::create_dir_all(notes.join("2024")).unwrap();
        fs::create_dir_all(&sibling).unwrap();

        let nested = notes.join("2024").join("a.md");
        let outside = sibling.join("b.md");
        let clean = notes.join("c.md");
        for p in [&nested, &outside, &clean] {
            fs::write(p, "").unwrap();
        }

        let registry = DocumentRegistry::new();
        for p in [&nested, &outside, &clean] {
            registry.open(p).unwrap();
        }
        registry.append(&nested, "x").unwrap();
        registry.append(&outside, "y").unwrap();

        assert_eq!(dirty_documents_under(&registry, &notes), vec![nested]);
    }
}
