//! Memory manager — orchestrates the file store, JSON index, and sync
//! service for every high-level operation.
//!
//! Every mutation runs File Store → JSON Index → Sync Service in that
//! order under the target's path lock, so writes to one file are totally
//! ordered and a read after a completed write observes its bytes. In
//! file-only mode (`sync` absent) the filesystem side works unchanged and
//! index work is skipped.

use std::str::FromStr;
use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use crate::editor::{self, InsertPosition, SectionInfo};
use crate::error::{MemoryError, Result};
use crate::fs::{main_doc, FileStore, JsonIndex};
use crate::sync::SyncService;
use crate::types::{
    extract_description, slugify, word_count, Category, FileEntry, UpdateMode, MAIN_FILE,
};

pub struct MemoryManager {
    files: Arc<FileStore>,
    json_index: Arc<JsonIndex>,
    sync: Option<Arc<SyncService>>,
    locks: crate::locks::PathLocks,
}

#[derive(Debug, Serialize)]
pub struct FileOpResult {
    pub file_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
    pub sync_pending: bool,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ReadResult {
    pub file_path: String,
    pub content: String,
}

#[derive(Debug, Serialize)]
pub struct MoveResult {
    pub old_file_path: String,
    pub new_file_path: String,
    pub sync_pending: bool,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ListResult {
    pub files: Vec<FileEntry>,
    pub total: usize,
    pub tree: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Serialize)]
pub struct TagsResult {
    pub file_path: String,
    pub tags: Vec<String>,
    pub total: usize,
}

#[derive(Debug, Serialize)]
pub struct EditResult {
    pub file_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replacements_made: Option<usize>,
    pub sync_pending: bool,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ExtractResult {
    pub file_path: String,
    pub section_header: String,
    pub content: String,
}

#[derive(Debug, Serialize)]
pub struct SectionsResult {
    pub file_path: String,
    pub sections: Vec<SectionInfo>,
    pub total: usize,
}

#[derive(Debug, Serialize)]
pub struct MemoryOpResult {
    pub message: String,
}

impl MemoryManager {
    pub fn new(
        files: Arc<FileStore>,
        json_index: Arc<JsonIndex>,
        sync: Option<Arc<SyncService>>,
    ) -> Self {
        Self {
            files,
            json_index,
            sync,
            locks: crate::locks::PathLocks::new(),
        }
    }

    pub fn files(&self) -> &Arc<FileStore> {
        &self.files
    }

    pub fn json_index(&self) -> &Arc<JsonIndex> {
        &self.json_index
    }

    pub fn sync(&self) -> Option<&Arc<SyncService>> {
        self.sync.as_ref()
    }

    fn sync_pending(&self) -> bool {
        self.sync.is_some()
    }

    fn schedule_sync(&self, path: &str) {
        if let Some(sync) = &self.sync {
            sync.schedule(path, true);
        }
    }

    /// Block until every scheduled reconcile has drained. No-op in
    /// file-only mode.
    pub async fn flush_sync(&self) {
        if let Some(sync) = &self.sync {
            sync.wait_idle().await;
        }
    }

    // ── Lifecycle ────────────────────────────────────────────────────────────

    /// Create the base structure: category directories, `main.md` with the
    /// canonical skeleton, and `files_index.json`.
    pub async fn initialize(&self) -> Result<MemoryOpResult> {
        let lock = self.locks.get(MAIN_FILE);
        let _guard = lock.lock().await;

        for category in Category::subdirs() {
            std::fs::create_dir_all(self.files.root().join(category.dir_name()))?;
        }

        let created = if self.files.exists(MAIN_FILE) {
            false
        } else {
            let template = main_doc::base_template();
            self.files.write(MAIN_FILE, &template)?;
            self.json_index.upsert(FileEntry::new(
                MAIN_FILE,
                "Agent Memory - Main Notes",
                Category::Main,
                &template,
            ))?;
            true
        };
        self.json_index.ensure_valid(&self.files)?;
        self.schedule_sync(MAIN_FILE);

        info!(created, "memory initialized");
        Ok(MemoryOpResult {
            message: if created {
                "Memory initialized".into()
            } else {
                "Memory already initialized".into()
            },
        })
    }

    /// Delete every file except the sentinels, truncate the index store,
    /// and rewrite `main.md` to its base template.
    pub async fn reset(&self) -> Result<MemoryOpResult> {
        let all_files = self.files.list_markdown()?;
        // Hold every per-path lock (sorted order) so in-flight writes
        // finish before their files disappear.
        let handles = self.locks.get_all(&all_files);
        let mut guards = Vec::with_capacity(handles.len());
        for handle in &handles {
            guards.push(handle.lock().await);
        }

        let mut deleted = 0usize;
        for path in &all_files {
            if path == MAIN_FILE {
                continue;
            }
            if self.files.delete(path)? {
                deleted += 1;
            }
        }
        for category in Category::subdirs() {
            let dir = self.files.root().join(category.dir_name());
            if dir.is_dir() {
                // Only empty category dirs are removed; stray files stay put.
                let _ = std::fs::remove_dir(dir);
            }
        }

        let template = main_doc::base_template();
        self.files.write(MAIN_FILE, &template)?;
        self.json_index.clear()?;
        self.json_index.upsert(FileEntry::new(
            MAIN_FILE,
            "Agent Memory - Main Notes",
            Category::Main,
            &template,
        ))?;

        drop(guards);

        if let Some(sync) = &self.sync {
            sync.clear_index().await?;
            sync.schedule(MAIN_FILE, true);
        }

        info!(deleted, "memory reset");
        Ok(MemoryOpResult {
            message: format!("Memory reset: {deleted} files removed"),
        })
    }

    // ── File CRUD ────────────────────────────────────────────────────────────

    pub async fn create_file(
        &self,
        title: &str,
        category: &str,
        content: &str,
        tags: Vec<String>,
        metadata: serde_json::Map<String, serde_json::Value>,
    ) -> Result<FileOpResult> {
        let category = Category::from_str(category)?;
        if category == Category::Main {
            return Err(MemoryError::InvalidArgument(
                "main.md cannot be created through the files tool".into(),
            ));
        }
        let slug = slugify(title);
        if slug.is_empty() {
            return Err(MemoryError::InvalidArgument(format!(
                "title produces an empty slug: {title:?}"
            )));
        }
        let file_path = format!("{}/{slug}.md", category.dir_name());

        let paths = vec![file_path.clone(), MAIN_FILE.to_string()];
        let handles = self.locks.get_all(&paths);
        let mut guards = Vec::with_capacity(handles.len());
        for handle in &handles {
            guards.push(handle.lock().await);
        }

        if self.files.exists(&file_path) {
            return Err(MemoryError::AlreadyExists(format!(
                "file already exists: {file_path}"
            )));
        }

        self.files.write(&file_path, content)?;

        let mut entry = FileEntry::new(&file_path, title, category, content);
        entry.tags = normalize_tags(tags);
        entry.metadata = metadata;
        self.json_index.upsert(entry)?;

        // The File Index link carries the title; the extracted description
        // stays in the JSON index only, so it cannot pollute search results
        // for main.md.
        self.update_main_link(&file_path, title, title, category)?;

        self.schedule_sync(&file_path);
        self.schedule_sync(MAIN_FILE);

        info!(path = %file_path, title, "memory file created");
        Ok(FileOpResult {
            file_path: file_path.clone(),
            title: Some(title.to_string()),
            category: Some(category),
            sync_pending: self.sync_pending(),
            message: format!("Memory file created at {file_path}"),
        })
    }

    pub async fn read_file(&self, file_path: &str) -> Result<ReadResult> {
        let lock = self.locks.get(file_path);
        let _guard = lock.lock().await;
        let content = self.files.read(file_path)?;
        Ok(ReadResult {
            file_path: file_path.to_string(),
            content,
        })
    }

    pub async fn update_file(
        &self,
        file_path: &str,
        content: &str,
        mode: UpdateMode,
    ) -> Result<FileOpResult> {
        let lock = self.locks.get(file_path);
        let _guard = lock.lock().await;

        let existing = self.files.read(file_path)?;
        let updated = match mode {
            UpdateMode::Replace => content.to_string(),
            UpdateMode::Append => format!("{existing}\n\n{content}"),
            UpdateMode::Prepend => format!("{content}\n\n{existing}"),
        };
        self.files.write(file_path, &updated)?;
        self.refresh_index_entry(file_path, &updated)?;
        self.schedule_sync(file_path);

        info!(path = %file_path, mode = ?mode, "memory file updated");
        Ok(FileOpResult {
            file_path: file_path.to_string(),
            title: None,
            category: None,
            sync_pending: self.sync_pending(),
            message: format!("File updated using {} mode", mode_name(mode)),
        })
    }

    pub async fn delete_file(&self, file_path: &str) -> Result<FileOpResult> {
        if file_path == MAIN_FILE {
            return Err(MemoryError::InvalidArgument(
                "main.md cannot be deleted; use memory reset".into(),
            ));
        }
        let paths = vec![file_path.to_string(), MAIN_FILE.to_string()];
        let handles = self.locks.get_all(&paths);
        let mut guards = Vec::with_capacity(handles.len());
        for handle in &handles {
            guards.push(handle.lock().await);
        }

        if !self.files.delete(file_path)? {
            return Err(MemoryError::NotFound(format!(
                "file not found: {file_path}"
            )));
        }
        self.json_index.remove(file_path)?;
        self.remove_main_link(file_path)?;

        if let Some(sync) = &self.sync {
            if let Err(e) = sync.remove_file(file_path).await {
                warn!(path = %file_path, error = %e, "index removal failed, orphan remains");
            }
            sync.schedule(MAIN_FILE, true);
        }

        info!(path = %file_path, "memory file deleted");
        Ok(FileOpResult {
            file_path: file_path.to_string(),
            title: None,
            category: None,
            sync_pending: self.sync_pending(),
            message: "File deleted".into(),
        })
    }

    /// Change category, keeping the slug.
    pub async fn move_file(&self, file_path: &str, new_category: &str) -> Result<MoveResult> {
        let new_category = Category::from_str(new_category)?;
        if new_category == Category::Main {
            return Err(MemoryError::InvalidArgument(
                "files cannot be moved into the main category".into(),
            ));
        }
        let file_name = file_path
            .rsplit('/')
            .next()
            .ok_or_else(|| MemoryError::InvalidArgument(format!("bad path: {file_path}")))?;
        let new_path = format!("{}/{file_name}", new_category.dir_name());
        self.relocate(file_path, &new_path, None, new_category)
            .await
    }

    /// Recompute the slug from a new title, staying in the same category.
    pub async fn rename_file(&self, file_path: &str, new_title: &str) -> Result<MoveResult> {
        let category = Category::from_path(file_path);
        if category == Category::Main {
            return Err(MemoryError::InvalidArgument(
                "main.md cannot be renamed".into(),
            ));
        }
        let slug = slugify(new_title);
        if slug.is_empty() {
            return Err(MemoryError::InvalidArgument(format!(
                "title produces an empty slug: {new_title:?}"
            )));
        }
        let new_path = format!("{}/{slug}.md", category.dir_name());
        self.relocate(file_path, &new_path, Some(new_title), category)
            .await
    }

    /// Duplicate a file under a new title and optional new category.
    pub async fn copy_file(
        &self,
        source_file_path: &str,
        new_title: &str,
        new_category: Option<&str>,
    ) -> Result<FileOpResult> {
        let (content, source_entry) = {
            let lock = self.locks.get(source_file_path);
            let _guard = lock.lock().await;
            (
                self.files.read(source_file_path)?,
                self.json_index.get(source_file_path),
            )
        };
        let category = match new_category {
            Some(c) => c.to_string(),
            None => Category::from_path(source_file_path).as_str().to_string(),
        };
        let (tags, metadata) = source_entry
            .map(|e| (e.tags, e.metadata))
            .unwrap_or_default();
        self.create_file(new_title, &category, &content, tags, metadata)
            .await
    }

    async fn relocate(
        &self,
        old_path: &str,
        new_path: &str,
        new_title: Option<&str>,
        new_category: Category,
    ) -> Result<MoveResult> {
        if old_path == new_path {
            return Err(MemoryError::InvalidArgument(format!(
                "source and destination are the same: {old_path}"
            )));
        }
        let paths = vec![
            old_path.to_string(),
            new_path.to_string(),
            MAIN_FILE.to_string(),
        ];
        let handles = self.locks.get_all(&paths);
        let mut guards = Vec::with_capacity(handles.len());
        for handle in &handles {
            guards.push(handle.lock().await);
        }

        let content = self.files.read(old_path)?;
        if self.files.exists(new_path) {
            return Err(MemoryError::AlreadyExists(format!(
                "file already exists: {new_path}"
            )));
        }

        self.files.write(new_path, &content)?;
        self.files.delete(old_path)?;

        let old_entry = self.json_index.get(old_path);
        self.json_index.remove(old_path)?;
        let title = match (new_title, &old_entry) {
            (Some(t), _) => t.to_string(),
            (None, Some(e)) => e.title.clone(),
            (None, None) => crate::types::title_from_slug(
                new_path
                    .rsplit('/')
                    .next()
                    .unwrap_or(new_path)
                    .trim_end_matches(".md"),
            ),
        };
        let mut entry = FileEntry::new(new_path, &title, new_category, &content);
        if let Some(old) = old_entry {
            entry.tags = old.tags;
            entry.metadata = old.metadata;
            entry.created_at = old.created_at;
        }
        self.json_index.upsert(entry)?;

        self.remove_main_link(old_path)?;
        self.update_main_link(new_path, &title, &title, new_category)?;

        if let Some(sync) = &self.sync {
            if let Err(e) = sync.remove_file(old_path).await {
                warn!(path = %old_path, error = %e, "index removal failed during relocate");
            }
            sync.schedule(new_path, true);
            sync.schedule(MAIN_FILE, true);
        }

        info!(from = %old_path, to = %new_path, "memory file relocated");
        Ok(MoveResult {
            old_file_path: old_path.to_string(),
            new_file_path: new_path.to_string(),
            sync_pending: self.sync_pending(),
            message: format!("File moved from {old_path} to {new_path}"),
        })
    }

    /// Flat list plus category tree, from the JSON index. The sentinel is
    /// excluded.
    pub fn list_files(&self, category: Option<&str>) -> Result<ListResult> {
        let category = category.map(Category::from_str).transpose()?;
        let mut files: Vec<FileEntry> = self
            .json_index
            .all()
            .into_iter()
            .filter(|entry| entry.category != Category::Main)
            .filter(|entry| category.map(|c| entry.category == c).unwrap_or(true))
            .collect();
        files.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));

        let mut tree = serde_json::Map::new();
        for entry in &files {
            let bucket = tree
                .entry(entry.category.as_str().to_string())
                .or_insert_with(|| serde_json::Value::Array(Vec::new()));
            if let serde_json::Value::Array(items) = bucket {
                items.push(serde_json::json!({
                    "file_path": entry.file_path,
                    "title": entry.title,
                    "description": entry.description,
                    "tags": entry.tags,
                    "updated_at": entry.updated_at,
                    "word_count": entry.word_count,
                }));
            }
        }

        Ok(ListResult {
            total: files.len(),
            files,
            tree,
        })
    }

    // ── Tags ─────────────────────────────────────────────────────────────────

    pub async fn add_tags(&self, file_path: &str, tags: Vec<String>) -> Result<TagsResult> {
        let lock = self.locks.get(file_path);
        let _guard = lock.lock().await;
        self.require_file(file_path)?;

        let entry = self.json_index.update_with(file_path, |entry| {
            for tag in normalize_tags(tags) {
                if !entry.tags.contains(&tag) {
                    entry.tags.push(tag);
                }
            }
        })?;
        self.schedule_sync(file_path);

        info!(path = %file_path, "tags added");
        Ok(TagsResult {
            file_path: file_path.to_string(),
            total: entry.tags.len(),
            tags: entry.tags,
        })
    }

    pub async fn remove_tags(&self, file_path: &str, tags: Vec<String>) -> Result<TagsResult> {
        let lock = self.locks.get(file_path);
        let _guard = lock.lock().await;
        self.require_file(file_path)?;

        let entry = self.json_index.update_with(file_path, |entry| {
            entry.tags.retain(|tag| !tags.contains(tag));
        })?;
        self.schedule_sync(file_path);

        info!(path = %file_path, "tags removed");
        Ok(TagsResult {
            file_path: file_path.to_string(),
            total: entry.tags.len(),
            tags: entry.tags,
        })
    }

    pub fn get_tags(&self, file_path: &str) -> Result<TagsResult> {
        let entry = self.json_index.get(file_path).ok_or_else(|| {
            MemoryError::NotFound(format!("no index entry for {file_path}"))
        })?;
        Ok(TagsResult {
            file_path: file_path.to_string(),
            total: entry.tags.len(),
            tags: entry.tags,
        })
    }

    // ── Editing ──────────────────────────────────────────────────────────────

    pub async fn edit_section(
        &self,
        file_path: &str,
        section_header: &str,
        new_content: &str,
        mode: UpdateMode,
    ) -> Result<EditResult> {
        let lock = self.locks.get(file_path);
        let _guard = lock.lock().await;

        let content = self.files.read(file_path)?;
        let updated = editor::edit_section(&content, section_header, new_content, mode)?;
        self.files.write(file_path, &updated)?;
        self.refresh_index_entry(file_path, &updated)?;
        self.schedule_sync(file_path);

        Ok(EditResult {
            file_path: file_path.to_string(),
            replacements_made: None,
            sync_pending: self.sync_pending(),
            message: format!("Section '{section_header}' updated"),
        })
    }

    pub async fn find_replace(
        &self,
        file_path: &str,
        find: &str,
        replace: &str,
        use_regex: bool,
        max_replacements: i64,
    ) -> Result<EditResult> {
        let lock = self.locks.get(file_path);
        let _guard = lock.lock().await;

        let content = self.files.read(file_path)?;
        let (updated, count) =
            editor::find_and_replace(&content, find, replace, use_regex, max_replacements)?;

        // Zero matches: leave the file and its sync state untouched.
        if count > 0 {
            self.files.write(file_path, &updated)?;
            self.refresh_index_entry(file_path, &updated)?;
            self.schedule_sync(file_path);
        }

        Ok(EditResult {
            file_path: file_path.to_string(),
            replacements_made: Some(count),
            sync_pending: count > 0 && self.sync_pending(),
            message: format!("Made {count} replacement(s)"),
        })
    }

    pub async fn insert_content(
        &self,
        file_path: &str,
        content: &str,
        position: InsertPosition,
        marker: Option<&str>,
    ) -> Result<EditResult> {
        let lock = self.locks.get(file_path);
        let _guard = lock.lock().await;

        let existing = self.files.read(file_path)?;
        let updated = editor::insert_at_position(&existing, content, position, marker)?;
        self.files.write(file_path, &updated)?;
        self.refresh_index_entry(file_path, &updated)?;
        self.schedule_sync(file_path);

        Ok(EditResult {
            file_path: file_path.to_string(),
            replacements_made: None,
            sync_pending: self.sync_pending(),
            message: "Content inserted".into(),
        })
    }

    pub async fn extract_section(
        &self,
        file_path: &str,
        section_header: &str,
    ) -> Result<ExtractResult> {
        let lock = self.locks.get(file_path);
        let _guard = lock.lock().await;
        let content = self.files.read(file_path)?;
        let body = editor::extract_section(&content, section_header)?;
        Ok(ExtractResult {
            file_path: file_path.to_string(),
            section_header: section_header.to_string(),
            content: body,
        })
    }

    pub async fn list_sections(&self, file_path: &str) -> Result<SectionsResult> {
        let lock = self.locks.get(file_path);
        let _guard = lock.lock().await;
        let content = self.files.read(file_path)?;
        let sections = editor::list_sections(&content);
        Ok(SectionsResult {
            file_path: file_path.to_string(),
            total: sections.len(),
            sections,
        })
    }

    // ── main.md operations ───────────────────────────────────────────────────

    pub async fn main_append(&self, content: &str, section: &str) -> Result<MemoryOpResult> {
        self.mutate_main(|doc| main_doc::append_to_section(doc, section, content))
            .await?;
        Ok(MemoryOpResult {
            message: format!("Content appended to {section} section"),
        })
    }

    pub async fn main_goal(&self, goal: &str, action: &str) -> Result<MemoryOpResult> {
        let message = match action {
            "add" => {
                self.mutate_main(|doc| main_doc::add_goal(doc, goal)).await?;
                format!("Goal added: {goal}")
            }
            "complete" => {
                self.mutate_main(|doc| main_doc::complete_goal(doc, goal))
                    .await?;
                format!("Goal completed: {goal}")
            }
            "remove" => {
                self.mutate_main(|doc| main_doc::remove_goal(doc, goal))
                    .await?;
                format!("Goal removed: {goal}")
            }
            other => {
                return Err(MemoryError::InvalidArgument(format!(
                    "unknown goal action: {other} (expected add, complete, or remove)"
                )))
            }
        };
        Ok(MemoryOpResult { message })
    }

    pub async fn main_task(&self, task: &str) -> Result<MemoryOpResult> {
        self.mutate_main(|doc| main_doc::add_task(doc, task)).await?;
        Ok(MemoryOpResult {
            message: format!("Task added: {task}"),
        })
    }

    pub async fn main_plan(&self, plan: &str, action: &str) -> Result<MemoryOpResult> {
        let message = match action {
            "add" => {
                self.mutate_main(|doc| main_doc::add_plan(doc, plan)).await?;
                format!("Plan added: {plan}")
            }
            "complete" => {
                self.mutate_main(|doc| main_doc::complete_plan(doc, plan))
                    .await?;
                format!("Plan completed: {plan}")
            }
            other => {
                return Err(MemoryError::InvalidArgument(format!(
                    "unknown plan action: {other} (expected add or complete)"
                )))
            }
        };
        Ok(MemoryOpResult { message })
    }

    async fn mutate_main<F>(&self, transform: F) -> Result<()>
    where
        F: FnOnce(&str) -> Result<String>,
    {
        let lock = self.locks.get(MAIN_FILE);
        let _guard = lock.lock().await;

        let content = self.files.read(MAIN_FILE).map_err(|_| {
            MemoryError::NotFound("main.md not found; run memory initialize first".into())
        })?;
        let updated = transform(&content)?;
        self.files.write(MAIN_FILE, &updated)?;
        self.refresh_index_entry(MAIN_FILE, &updated)?;
        self.schedule_sync(MAIN_FILE);
        Ok(())
    }

    // ── Internal helpers ─────────────────────────────────────────────────────

    fn require_file(&self, file_path: &str) -> Result<()> {
        if self.files.exists(file_path) {
            Ok(())
        } else {
            Err(MemoryError::NotFound(format!(
                "file not found: {file_path}"
            )))
        }
    }

    /// Refresh the derived fields of a file's index entry after a content
    /// change. Files unknown to the index get a fresh entry.
    fn refresh_index_entry(&self, file_path: &str, content: &str) -> Result<()> {
        let updated = self.json_index.update_with(file_path, |entry| {
            entry.word_count = word_count(content);
            if let Some(description) = extract_description(content) {
                entry.description = description;
            }
        });
        match updated {
            Ok(_) => Ok(()),
            Err(MemoryError::NotFound(_)) => {
                let slug = file_path
                    .rsplit('/')
                    .next()
                    .unwrap_or(file_path)
                    .trim_end_matches(".md");
                let entry = FileEntry::new(
                    file_path,
                    &crate::types::title_from_slug(slug),
                    Category::from_path(file_path),
                    content,
                );
                self.json_index.upsert(entry)
            }
            Err(e) => Err(e),
        }
    }

    /// Keep `main.md`'s File Index pointing at the file. Failures are
    /// logged, not fatal: the write already committed.
    fn update_main_link(
        &self,
        file_path: &str,
        title: &str,
        description: &str,
        category: Category,
    ) -> Result<()> {
        match self.files.read(MAIN_FILE) {
            Ok(main) => {
                let updated =
                    main_doc::upsert_file_link(&main, file_path, title, description, category)?;
                self.files.write(MAIN_FILE, &updated)?;
                Ok(())
            }
            Err(MemoryError::NotFound(_)) => {
                warn!("main.md missing, file index link skipped");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    fn remove_main_link(&self, file_path: &str) -> Result<()> {
        match self.files.read(MAIN_FILE) {
            Ok(main) => {
                let updated = main_doc::remove_file_link(&main, file_path);
                self.files.write(MAIN_FILE, &updated)?;
                Ok(())
            }
            Err(MemoryError::NotFound(_)) => Ok(()),
            Err(e) => Err(e),
        }
    }
}

fn mode_name(mode: UpdateMode) -> &'static str {
    match mode {
        UpdateMode::Replace => "replace",
        UpdateMode::Append => "append",
        UpdateMode::Prepend => "prepend",
    }
}

fn normalize_tags(tags: Vec<String>) -> Vec<String> {
    let mut seen = Vec::new();
    for tag in tags {
        let tag = tag.trim().to_string();
        if !tag.is_empty() && !seen.contains(&tag) {
            seen.push(tag);
        }
    }
    seen
}
