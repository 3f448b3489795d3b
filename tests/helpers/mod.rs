#![allow(dead_code)]

//! Shared test fixtures: an in-memory [`IndexStore`] that mimics the
//! Postgres store's ranking contracts, a deterministic keyword-spike
//! embedder, and a builder for a fully wired memory stack over a temp
//! directory.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tempfile::TempDir;

use engram::chunker::Chunker;
use engram::config::SyncConfig;
use engram::embedding::{Embedder, EmbeddingProvider};
use engram::error::{MemoryError, Result};
use engram::fs::json_index::INDEX_FILE;
use engram::fs::{FileStore, JsonIndex};
use engram::index::{
    ChunkHit, ChunkRecord, FileMeta, IndexStore, SearchFilters, SyncRecord, SyncState,
};
use engram::manager::MemoryManager;
use engram::search::SearchEngine;
use engram::sync::SyncService;

// ── In-memory index store ─────────────────────────────────────────────────────

struct StoredFile {
    id: i64,
    meta: FileMeta,
    chunks: Vec<(i64, ChunkRecord)>,
    sync: SyncRecord,
}

#[derive(Default)]
struct State {
    next_file_id: i64,
    next_chunk_id: i64,
    files: HashMap<String, StoredFile>,
}

/// Brute-force implementation of the index store contracts: cosine
/// ranking for vectors, all-terms matching with occurrence scoring for
/// full text, 1-based ranks, deterministic tie-breaks on chunk id.
#[derive(Default)]
pub struct MemoryIndexStore {
    state: Mutex<State>,
}

impl MemoryIndexStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn chunk_count(&self, file_path: &str) -> usize {
        let state = self.state.lock().unwrap();
        state
            .files
            .get(file_path)
            .map(|f| f.chunks.len())
            .unwrap_or(0)
    }

    pub fn chunk_ids(&self, file_path: &str) -> Vec<i64> {
        let state = self.state.lock().unwrap();
        state
            .files
            .get(file_path)
            .map(|f| f.chunks.iter().map(|(id, _)| *id).collect())
            .unwrap_or_default()
    }

    pub fn chunk_contents(&self, file_path: &str) -> Vec<String> {
        let state = self.state.lock().unwrap();
        state
            .files
            .get(file_path)
            .map(|f| f.chunks.iter().map(|(_, c)| c.content.clone()).collect())
            .unwrap_or_default()
    }

    pub fn chunk_header_paths(&self, file_path: &str) -> Vec<Vec<String>> {
        let state = self.state.lock().unwrap();
        state
            .files
            .get(file_path)
            .map(|f| f.chunks.iter().map(|(_, c)| c.header_path.clone()).collect())
            .unwrap_or_default()
    }

    pub fn file_count(&self) -> usize {
        self.state.lock().unwrap().files.len()
    }

    pub fn stored_hash(&self, file_path: &str) -> Option<String> {
        let state = self.state.lock().unwrap();
        state.files.get(file_path).map(|f| f.meta.file_hash.clone())
    }

    fn matches(meta: &FileMeta, filters: &SearchFilters) -> bool {
        if let Some(category) = filters.category {
            if meta.category != category {
                return false;
            }
        }
        if let Some(path) = &filters.file_path {
            if &meta.file_path != path {
                return false;
            }
        }
        filters.tags.iter().all(|tag| meta.tags.contains(tag))
    }
}

fn cosine(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let na: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let nb: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if na == 0.0 || nb == 0.0 {
        0.0
    } else {
        dot / (na * nb)
    }
}

fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_string())
        .collect()
}

#[async_trait]
impl IndexStore for MemoryIndexStore {
    async fn upsert_file(&self, meta: &FileMeta) -> Result<i64> {
        let mut state = self.state.lock().unwrap();
        if let Some(file) = state.files.get_mut(&meta.file_path) {
            file.meta = meta.clone();
            return Ok(file.id);
        }
        state.next_file_id += 1;
        let id = state.next_file_id;
        state.files.insert(
            meta.file_path.clone(),
            StoredFile {
                id,
                meta: meta.clone(),
                chunks: Vec::new(),
                sync: SyncRecord {
                    file_id: id,
                    last_synced_hash: None,
                    last_synced_at: None,
                    status: SyncState::Pending,
                    error_message: None,
                },
            },
        );
        Ok(id)
    }

    async fn replace_chunks(&self, file_id: i64, chunks: &[ChunkRecord]) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        let mut next_chunk_id = state.next_chunk_id;
        let file = state
            .files
            .values_mut()
            .find(|f| f.id == file_id)
            .ok_or_else(|| MemoryError::NotFound(format!("no file with id {file_id}")))?;
        file.chunks = chunks
            .iter()
            .map(|chunk| {
                next_chunk_id += 1;
                (next_chunk_id, chunk.clone())
            })
            .collect();
        state.next_chunk_id = next_chunk_id;
        Ok(())
    }

    async fn delete_file(&self, file_path: &str) -> Result<bool> {
        Ok(self.state.lock().unwrap().files.remove(file_path).is_some())
    }

    async fn sync_record(&self, file_path: &str) -> Result<Option<SyncRecord>> {
        let state = self.state.lock().unwrap();
        Ok(state.files.get(file_path).map(|f| f.sync.clone()))
    }

    async fn mark_sync(
        &self,
        file_id: i64,
        status: SyncState,
        synced_hash: Option<&str>,
        error_message: Option<&str>,
    ) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        let file = state
            .files
            .values_mut()
            .find(|f| f.id == file_id)
            .ok_or_else(|| MemoryError::NotFound(format!("no file with id {file_id}")))?;
        file.sync.status = status;
        match status {
            SyncState::Completed => {
                file.sync.last_synced_hash = synced_hash.map(|h| h.to_string());
                file.sync.last_synced_at = Some(chrono::Utc::now().to_rfc3339());
                file.sync.error_message = None;
            }
            SyncState::Failed => {
                file.sync.error_message = error_message.map(|m| m.to_string());
            }
            _ => {}
        }
        Ok(())
    }

    async fn vector_search(
        &self,
        query: &[f32],
        k: usize,
        filters: &SearchFilters,
    ) -> Result<Vec<ChunkHit>> {
        let state = self.state.lock().unwrap();
        let mut scored: Vec<(i64, f32, ChunkHit)> = Vec::new();
        for file in state.files.values() {
            if !Self::matches(&file.meta, filters) {
                continue;
            }
            for (chunk_id, chunk) in &file.chunks {
                let Some(embedding) = &chunk.embedding else {
                    continue;
                };
                let similarity = cosine(query, embedding);
                scored.push((
                    *chunk_id,
                    similarity,
                    ChunkHit {
                        chunk_id: *chunk_id,
                        file_path: file.meta.file_path.clone(),
                        title: file.meta.title.clone(),
                        category: file.meta.category.as_str().to_string(),
                        content: chunk.content.clone(),
                        header_path: chunk.header_path.clone(),
                        rank: 0,
                        score: similarity,
                    },
                ));
            }
        }
        scored.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.0.cmp(&b.0))
        });
        Ok(scored
            .into_iter()
            .take(k)
            .enumerate()
            .map(|(i, (_, _, mut hit))| {
                hit.rank = i + 1;
                hit
            })
            .collect())
    }

    async fn fulltext_search(
        &self,
        query: &str,
        k: usize,
        filters: &SearchFilters,
    ) -> Result<Vec<ChunkHit>> {
        let terms = tokenize(query);
        if terms.is_empty() {
            return Ok(Vec::new());
        }
        let state = self.state.lock().unwrap();
        let mut scored: Vec<(i64, f32, ChunkHit)> = Vec::new();
        for file in state.files.values() {
            if !Self::matches(&file.meta, filters) {
                continue;
            }
            for (chunk_id, chunk) in &file.chunks {
                let tokens = tokenize(&chunk.content);
                // plainto_tsquery semantics: every term must match.
                if !terms.iter().all(|t| tokens.contains(t)) {
                    continue;
                }
                let occurrences: usize = terms
                    .iter()
                    .map(|t| tokens.iter().filter(|tok| *tok == t).count())
                    .sum();
                let score = occurrences as f32 / (tokens.len().max(1) as f32);
                scored.push((
                    *chunk_id,
                    score,
                    ChunkHit {
                        chunk_id: *chunk_id,
                        file_path: file.meta.file_path.clone(),
                        title: file.meta.title.clone(),
                        category: file.meta.category.as_str().to_string(),
                        content: chunk.content.clone(),
                        header_path: chunk.header_path.clone(),
                        rank: 0,
                        score,
                    },
                ));
            }
        }
        scored.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.0.cmp(&b.0))
        });
        Ok(scored
            .into_iter()
            .take(k)
            .enumerate()
            .map(|(i, (_, _, mut hit))| {
                hit.rank = i + 1;
                hit
            })
            .collect())
    }

    async fn clear(&self) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.files.clear();
        Ok(())
    }
}

// ── Mock embedders ────────────────────────────────────────────────────────────

pub const KEYWORDS: [&str; 8] = [
    "rust", "python", "database", "memory", "search", "network", "cooking", "music",
];

pub fn keyword_embedding(text: &str) -> Vec<f32> {
    let lower = text.to_lowercase();
    KEYWORDS
        .iter()
        .map(|kw| if lower.contains(kw) { 1.0 } else { 0.0 })
        .collect()
}

/// Deterministic bag-of-keywords embedder: each of 8 dimensions flags one
/// keyword, so vector search can separate topics without a model.
pub struct MockEmbedder;

#[async_trait]
impl EmbeddingProvider for MockEmbedder {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| keyword_embedding(t)).collect())
    }

    fn dimension(&self) -> usize {
        KEYWORDS.len()
    }

    fn name(&self) -> &str {
        "mock"
    }
}

/// Embedder that succeeds for a fixed number of batches, then fails
/// permanently. Lets tests exercise the sync failure path after a
/// successful first pass.
pub struct CountdownEmbedder {
    remaining: AtomicU32,
}

impl CountdownEmbedder {
    pub fn new(successful_batches: u32) -> Self {
        Self {
            remaining: AtomicU32::new(successful_batches),
        }
    }
}

#[async_trait]
impl EmbeddingProvider for CountdownEmbedder {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if self
            .remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_err()
        {
            return Err(MemoryError::ProviderInvalid("provider exhausted".into()));
        }
        Ok(texts.iter().map(|t| keyword_embedding(t)).collect())
    }

    fn dimension(&self) -> usize {
        KEYWORDS.len()
    }

    fn name(&self) -> &str {
        "countdown"
    }
}

// ── Wired test environment ────────────────────────────────────────────────────

pub struct TestEnv {
    pub tmp: TempDir,
    pub manager: Arc<MemoryManager>,
    pub search: Arc<SearchEngine>,
    pub sync: Arc<SyncService>,
    pub index: Arc<MemoryIndexStore>,
}

impl TestEnv {
    /// Create, initialize, and flush sync so the sentinel is indexed.
    pub async fn create_file(&self, title: &str, category: &str, content: &str) {
        self.manager
            .create_file(title, category, content, vec![], Default::default())
            .await
            .unwrap();
        self.manager.flush_sync().await;
    }
}

fn test_sync_config() -> SyncConfig {
    SyncConfig {
        workers: 2,
        queue_capacity: 64,
        // Long enough that the periodic sweep never fires mid-test.
        sweep_interval_seconds: 3600,
    }
}

/// Full indexed-mode stack: temp tree + in-memory index + mock embedder.
pub async fn indexed_env() -> TestEnv {
    indexed_env_with(Box::new(MockEmbedder)).await
}

/// Indexed-mode stack with a caller-supplied embedding provider.
pub async fn indexed_env_with(provider: Box<dyn EmbeddingProvider>) -> TestEnv {
    let tmp = TempDir::new().unwrap();
    let files = Arc::new(FileStore::new(tmp.path()).unwrap());
    let json_index = Arc::new(JsonIndex::new(tmp.path().join(INDEX_FILE)));
    let index = MemoryIndexStore::new();
    let embedder = Arc::new(Embedder::new(provider, 0));

    let sync = SyncService::start(
        files.clone(),
        json_index.clone(),
        index.clone() as Arc<dyn IndexStore>,
        Some(embedder.clone()),
        Chunker::new(800, 200),
        &test_sync_config(),
    );

    let search = Arc::new(SearchEngine::new(
        index.clone() as Arc<dyn IndexStore>,
        Some(embedder),
        60,
    ));
    let manager = Arc::new(MemoryManager::new(files, json_index, Some(sync.clone())));
    manager.initialize().await.unwrap();
    manager.flush_sync().await;

    TestEnv {
        tmp,
        manager,
        search,
        sync,
        index,
    }
}

/// Indexed-mode stack without an embedding provider (fulltext-only).
pub async fn fulltext_only_env() -> TestEnv {
    let tmp = TempDir::new().unwrap();
    let files = Arc::new(FileStore::new(tmp.path()).unwrap());
    let json_index = Arc::new(JsonIndex::new(tmp.path().join(INDEX_FILE)));
    let index = MemoryIndexStore::new();

    let sync = SyncService::start(
        files.clone(),
        json_index.clone(),
        index.clone() as Arc<dyn IndexStore>,
        None,
        Chunker::new(800, 200),
        &test_sync_config(),
    );

    let search = Arc::new(SearchEngine::new(
        index.clone() as Arc<dyn IndexStore>,
        None,
        60,
    ));
    let manager = Arc::new(MemoryManager::new(files, json_index, Some(sync.clone())));
    manager.initialize().await.unwrap();
    manager.flush_sync().await;

    TestEnv {
        tmp,
        manager,
        search,
        sync,
        index,
    }
}
