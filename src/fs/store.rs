//! File store — exclusive owner of the markdown tree on disk.
//!
//! All writes go through a temp file in the target directory, are fsynced,
//! and renamed into place, so readers only ever observe complete documents.
//! Content is normalized to LF line endings on write.

use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{debug, info};
use walkdir::WalkDir;

use crate::error::{MemoryError, Result};
use crate::types::{sha256_hex, word_count};

/// Outcome of a committed write, reported to the memory manager.
#[derive(Debug, Clone)]
pub struct WriteReceipt {
    pub file_path: String,
    pub old_hash: Option<String>,
    pub new_hash: String,
    pub word_count: usize,
}

pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// Open a file store rooted at `root`, creating the directory if needed.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn exists(&self, file_path: &str) -> bool {
        self.full_path(file_path)
            .map(|p| p.is_file())
            .unwrap_or(false)
    }

    /// Read a file's content as UTF-8.
    pub fn read(&self, file_path: &str) -> Result<String> {
        let full = self.full_path(file_path)?;
        match std::fs::read_to_string(&full) {
            Ok(content) => {
                debug!(path = %file_path, size = content.len(), "file read");
                Ok(content)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(MemoryError::NotFound(format!("file not found: {file_path}")))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Atomically write a file, creating parent directories as needed.
    pub fn write(&self, file_path: &str, content: &str) -> Result<WriteReceipt> {
        let full = self.full_path(file_path)?;
        let parent = full
            .parent()
            .ok_or_else(|| MemoryError::Internal(format!("no parent dir for {file_path}")))?;
        std::fs::create_dir_all(parent)?;

        let old_hash = std::fs::read_to_string(&full).ok().map(|c| sha256_hex(&c));

        let normalized = content.replace("\r\n", "\n");
        let mut tmp = tempfile::NamedTempFile::new_in(parent)
            .map_err(|e| MemoryError::Internal(format!("temp file: {e}")))?;
        tmp.write_all(normalized.as_bytes())?;
        tmp.flush()?;
        tmp.as_file().sync_all()?;
        tmp.persist(&full)
            .map_err(|e| MemoryError::Internal(format!("atomic rename: {e}")))?;

        let receipt = WriteReceipt {
            file_path: file_path.to_string(),
            old_hash,
            new_hash: sha256_hex(&normalized),
            word_count: word_count(&normalized),
        };
        info!(path = %file_path, size = normalized.len(), "file written");
        Ok(receipt)
    }

    /// Delete a file. Returns false when it did not exist.
    pub fn delete(&self, file_path: &str) -> Result<bool> {
        let full = self.full_path(file_path)?;
        match std::fs::remove_file(&full) {
            Ok(()) => {
                info!(path = %file_path, "file deleted");
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// All markdown files under the root as sorted relative paths.
    pub fn list_markdown(&self) -> Result<Vec<String>> {
        let mut files = Vec::new();
        for entry in WalkDir::new(&self.root).follow_links(true) {
            let entry = entry.map_err(|e| MemoryError::Internal(e.to_string()))?;
            if !entry.file_type().is_file() {
                continue;
            }
            let is_md = entry
                .path()
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|ext| ext == "md" || ext == "markdown");
            if !is_md {
                continue;
            }
            let relative = entry
                .path()
                .strip_prefix(&self.root)
                .map_err(|e| MemoryError::Internal(e.to_string()))?;
            files.push(relative.to_string_lossy().replace('\\', "/"));
        }
        files.sort();
        debug!(count = files.len(), "files listed");
        Ok(files)
    }

    /// Resolve a relative path against the root, rejecting traversal.
    fn full_path(&self, file_path: &str) -> Result<PathBuf> {
        if file_path.is_empty() {
            return Err(MemoryError::InvalidArgument("empty file path".into()));
        }
        let rel = Path::new(file_path);
        if rel.is_absolute()
            || rel
                .components()
                .any(|c| matches!(c, std::path::Component::ParentDir))
        {
            return Err(MemoryError::InvalidArgument(format!(
                "file path must be relative and inside the memory root: {file_path}"
            )));
        }
        Ok(self.root.join(rel))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store() -> (FileStore, TempDir) {
        let tmp = TempDir::new().unwrap();
        let store = FileStore::new(tmp.path()).unwrap();
        (store, tmp)
    }

    #[test]
    fn write_then_read_round_trips() {
        let (store, _tmp) = store();
        let receipt = store.write("projects/p1.md", "# P1\n\nAlpha.").unwrap();
        assert_eq!(receipt.word_count, 2);
        assert!(receipt.old_hash.is_none());
        assert_eq!(receipt.new_hash, sha256_hex("# P1\n\nAlpha."));

        let content = store.read("projects/p1.md").unwrap();
        assert_eq!(content, "# P1\n\nAlpha.");
    }

    #[test]
    fn rewrite_reports_old_hash() {
        let (store, _tmp) = store();
        let first = store.write("notes.md", "one").unwrap();
        let second = store.write("notes.md", "two").unwrap();
        assert_eq!(second.old_hash.as_deref(), Some(first.new_hash.as_str()));
        assert_ne!(second.new_hash, first.new_hash);
    }

    #[test]
    fn crlf_normalized_on_write() {
        let (store, _tmp) = store();
        store.write("a.md", "line one\r\nline two\r\n").unwrap();
        assert_eq!(store.read("a.md").unwrap(), "line one\nline two\n");
    }

    #[test]
    fn read_missing_is_not_found() {
        let (store, _tmp) = store();
        let err = store.read("missing.md").unwrap_err();
        assert!(matches!(err, MemoryError::NotFound(_)));
    }

    #[test]
    fn delete_is_idempotent() {
        let (store, _tmp) = store();
        store.write("x.md", "content").unwrap();
        assert!(store.delete("x.md").unwrap());
        assert!(!store.delete("x.md").unwrap());
    }

    #[test]
    fn list_returns_sorted_relative_paths() {
        let (store, _tmp) = store();
        store.write("main.md", "m").unwrap();
        store.write("projects/b.md", "b").unwrap();
        store.write("projects/a.md", "a").unwrap();
        store.write("concepts/c.md", "c").unwrap();
        store.write("notes.txt", "not markdown").unwrap();

        let files = store.list_markdown().unwrap();
        assert_eq!(
            files,
            vec!["concepts/c.md", "main.md", "projects/a.md", "projects/b.md"]
        );
    }

    #[test]
    fn path_traversal_rejected() {
        let (store, _tmp) = store();
        assert!(matches!(
            store.read("../escape.md"),
            Err(MemoryError::InvalidArgument(_))
        ));
        assert!(matches!(
            store.write("/abs.md", "x"),
            Err(MemoryError::InvalidArgument(_))
        ));
    }
}
