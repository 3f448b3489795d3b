//! The `files_index.json` metadata mirror.
//!
//! A single JSON document, replaced atomically on every change, so readers
//! observe either the prior or the next fully-valid document. The index is
//! rebuildable from the markdown tree at any time; startup recovery
//! regenerates it when the file is missing or fails to parse.

use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{MemoryError, Result};
use crate::fs::store::FileStore;
use crate::types::{
    extract_description, title_from_slug, word_count, Category, FileEntry, MAIN_FILE,
};

pub const INDEX_FILE: &str = "files_index.json";
const INDEX_VERSION: &str = "1.0";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexDocument {
    pub version: String,
    pub last_updated: String,
    pub files: Vec<FileEntry>,
}

impl Default for IndexDocument {
    fn default() -> Self {
        Self {
            version: INDEX_VERSION.into(),
            last_updated: Utc::now().to_rfc3339(),
            files: Vec::new(),
        }
    }
}

/// Single-writer view over `files_index.json`. Readers take a filesystem
/// snapshot; writers serialize through the internal mutex.
pub struct JsonIndex {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonIndex {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Read the current document, falling back to an empty one when the
    /// file is missing or corrupt.
    pub fn read(&self) -> IndexDocument {
        match self.try_read() {
            Ok(doc) => doc,
            Err(e) => {
                warn!(error = %e, "json index unreadable, using empty document");
                IndexDocument::default()
            }
        }
    }

    /// Read the current document, surfacing parse failures to the caller.
    pub fn try_read(&self) -> Result<IndexDocument> {
        if !self.path.exists() {
            return Ok(IndexDocument::default());
        }
        let content = std::fs::read_to_string(&self.path)?;
        let doc: IndexDocument = serde_json::from_str(&content)
            .map_err(|e| MemoryError::Internal(format!("invalid index JSON: {e}")))?;
        Ok(doc)
    }

    /// Add or update one entry. `created_at` of an existing entry is
    /// preserved.
    pub fn upsert(&self, mut entry: FileEntry) -> Result<()> {
        let _guard = self.write_lock.lock().expect("index lock poisoned");
        let mut doc = self.read();
        if let Some(existing) = doc.files.iter_mut().find(|f| f.file_path == entry.file_path) {
            entry.created_at = existing.created_at.clone();
            *existing = entry;
        } else {
            doc.files.push(entry);
        }
        self.write(doc)
    }

    /// Apply a partial update to an existing entry. Returns `NotFound` when
    /// the path has no entry.
    pub fn update_with<F>(&self, file_path: &str, apply: F) -> Result<FileEntry>
    where
        F: FnOnce(&mut FileEntry),
    {
        let _guard = self.write_lock.lock().expect("index lock poisoned");
        let mut doc = self.read();
        let entry = doc
            .files
            .iter_mut()
            .find(|f| f.file_path == file_path)
            .ok_or_else(|| {
                MemoryError::NotFound(format!("no index entry for {file_path}"))
            })?;
        apply(entry);
        entry.updated_at = Utc::now().to_rfc3339();
        let updated = entry.clone();
        self.write(doc)?;
        Ok(updated)
    }

    /// Remove one entry. Returns false when the path had no entry.
    pub fn remove(&self, file_path: &str) -> Result<bool> {
        let _guard = self.write_lock.lock().expect("index lock poisoned");
        let mut doc = self.read();
        let before = doc.files.len();
        doc.files.retain(|f| f.file_path != file_path);
        let removed = doc.files.len() < before;
        if removed {
            self.write(doc)?;
        }
        Ok(removed)
    }

    pub fn get(&self, file_path: &str) -> Option<FileEntry> {
        self.read()
            .files
            .into_iter()
            .find(|f| f.file_path == file_path)
    }

    pub fn all(&self) -> Vec<FileEntry> {
        self.read().files
    }

    /// Drop every entry but keep the document structure.
    pub fn clear(&self) -> Result<()> {
        let _guard = self.write_lock.lock().expect("index lock poisoned");
        let mut doc = self.read();
        doc.files.clear();
        self.write(doc)
    }

    /// Regenerate the index from the markdown tree. Entry metadata that only
    /// lives in the index (tags, metadata, original timestamps) is derived
    /// fresh, so this is a recovery path, not a routine one.
    pub fn rebuild(&self, store: &FileStore) -> Result<usize> {
        let _guard = self.write_lock.lock().expect("index lock poisoned");
        let mut files = Vec::new();
        for file_path in store.list_markdown()? {
            let content = store.read(&file_path)?;
            let category = Category::from_path(&file_path);
            let slug = file_path
                .rsplit('/')
                .next()
                .unwrap_or(&file_path)
                .trim_end_matches(".md");
            let title = if file_path == MAIN_FILE {
                "Agent Memory - Main Notes".to_string()
            } else {
                title_from_slug(slug)
            };
            let now = Utc::now().to_rfc3339();
            files.push(FileEntry {
                file_path: file_path.clone(),
                title: title.clone(),
                category,
                description: extract_description(&content).unwrap_or(title),
                tags: Vec::new(),
                metadata: serde_json::Map::new(),
                created_at: now.clone(),
                updated_at: now,
                word_count: word_count(&content),
            });
        }
        let count = files.len();
        self.write(IndexDocument {
            version: INDEX_VERSION.into(),
            last_updated: Utc::now().to_rfc3339(),
            files,
        })?;
        info!(count, "json index rebuilt from filesystem");
        Ok(count)
    }

    /// Startup recovery: rebuild when the index is missing or invalid.
    pub fn ensure_valid(&self, store: &FileStore) -> Result<()> {
        match self.try_read() {
            Ok(_) if self.exists() => Ok(()),
            _ => {
                warn!("files_index.json missing or invalid, rebuilding");
                self.rebuild(store).map(|_| ())
            }
        }
    }

    /// Atomic replace: serialize to a temp file in the same directory, then
    /// rename over the target.
    fn write(&self, mut doc: IndexDocument) -> Result<()> {
        doc.last_updated = Utc::now().to_rfc3339();
        let parent = self
            .path
            .parent()
            .ok_or_else(|| MemoryError::Internal("index path has no parent".into()))?;
        std::fs::create_dir_all(parent)?;

        let json = serde_json::to_string_pretty(&doc)?;
        let mut tmp = tempfile::NamedTempFile::new_in(parent)
            .map_err(|e| MemoryError::Internal(format!("temp file: {e}")))?;
        tmp.write_all(json.as_bytes())?;
        tmp.flush()?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path)
            .map_err(|e| MemoryError::Internal(format!("atomic rename: {e}")))?;
        Ok(())
    }
}
