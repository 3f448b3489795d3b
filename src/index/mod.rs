//! Index store — the vector + full-text mirror of the markdown tree.
//!
//! [`IndexStore`] is the seam between the sync/search pipeline and the
//! database. [`postgres::PgIndexStore`] backs it with Postgres + pgvector;
//! [`NullIndexStore`] is the file-only implementation selected when
//! `USE_DATABASE=false`: writes are no-ops and searches report
//! `StorageUnavailable`.

pub mod postgres;

use async_trait::async_trait;
use serde::Serialize;

use crate::error::{MemoryError, Result};
use crate::types::Category;

/// File metadata as the index store persists it.
#[derive(Debug, Clone)]
pub struct FileMeta {
    pub file_path: String,
    pub title: String,
    pub category: Category,
    pub file_hash: String,
    pub word_count: usize,
    pub tags: Vec<String>,
    pub metadata: serde_json::Value,
}

/// One chunk row ready for insertion.
#[derive(Debug, Clone)]
pub struct ChunkRecord {
    pub chunk_index: i32,
    pub content: String,
    pub content_hash: String,
    /// Absent when running without an embedding provider.
    pub embedding: Option<Vec<f32>>,
    pub header_path: Vec<String>,
    pub section_level: i32,
}

/// Per-file sync bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncState {
    Pending,
    Syncing,
    Completed,
    Failed,
}

impl SyncState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Syncing => "syncing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl std::str::FromStr for SyncState {
    type Err = MemoryError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "pending" => Ok(Self::Pending),
            "syncing" => Ok(Self::Syncing),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            _ => Err(MemoryError::Internal(format!("unknown sync state: {s}"))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SyncRecord {
    pub file_id: i64,
    pub last_synced_hash: Option<String>,
    pub last_synced_at: Option<String>,
    pub status: SyncState,
    pub error_message: Option<String>,
}

/// Filters applied inside both search backends.
#[derive(Debug, Clone, Default)]
pub struct SearchFilters {
    pub category: Option<Category>,
    /// Files must carry every listed tag.
    pub tags: Vec<String>,
    /// Scope to a single file.
    pub file_path: Option<String>,
}

/// One ranked chunk from a search backend. `rank` is the 1-based position
/// in that backend's result list; `score` is the backend's raw relevance
/// (cosine similarity or `ts_rank_cd`).
#[derive(Debug, Clone)]
pub struct ChunkHit {
    pub chunk_id: i64,
    pub file_path: String,
    pub title: String,
    pub category: String,
    pub content: String,
    pub header_path: Vec<String>,
    pub rank: usize,
    pub score: f32,
}

#[async_trait]
pub trait IndexStore: Send + Sync {
    /// Create or update a file row, returning its id. Ensures a sync
    /// record exists.
    async fn upsert_file(&self, meta: &FileMeta) -> Result<i64>;

    /// Atomically replace every chunk of a file.
    async fn replace_chunks(&self, file_id: i64, chunks: &[ChunkRecord]) -> Result<()>;

    /// Delete a file row; chunks and the sync record cascade. Returns false
    /// when the path was not indexed.
    async fn delete_file(&self, file_path: &str) -> Result<bool>;

    async fn sync_record(&self, file_path: &str) -> Result<Option<SyncRecord>>;

    async fn mark_sync(
        &self,
        file_id: i64,
        status: SyncState,
        synced_hash: Option<&str>,
        error_message: Option<&str>,
    ) -> Result<()>;

    /// Top-k chunks by cosine similarity to the query vector.
    async fn vector_search(
        &self,
        query: &[f32],
        k: usize,
        filters: &SearchFilters,
    ) -> Result<Vec<ChunkHit>>;

    /// Top-k chunks by English full-text relevance.
    async fn fulltext_search(
        &self,
        query: &str,
        k: usize,
        filters: &SearchFilters,
    ) -> Result<Vec<ChunkHit>>;

    /// Drop every row (memory reset).
    async fn clear(&self) -> Result<()>;
}

/// File-only mode: sync writes vanish, searches are unavailable.
pub struct NullIndexStore;

#[async_trait]
impl IndexStore for NullIndexStore {
    async fn upsert_file(&self, _meta: &FileMeta) -> Result<i64> {
        Ok(0)
    }

    async fn replace_chunks(&self, _file_id: i64, _chunks: &[ChunkRecord]) -> Result<()> {
        Ok(())
    }

    async fn delete_file(&self, _file_path: &str) -> Result<bool> {
        Ok(false)
    }

    async fn sync_record(&self, _file_path: &str) -> Result<Option<SyncRecord>> {
        Ok(None)
    }

    async fn mark_sync(
        &self,
        _file_id: i64,
        _status: SyncState,
        _synced_hash: Option<&str>,
        _error_message: Option<&str>,
    ) -> Result<()> {
        Ok(())
    }

    async fn vector_search(
        &self,
        _query: &[f32],
        _k: usize,
        _filters: &SearchFilters,
    ) -> Result<Vec<ChunkHit>> {
        Err(MemoryError::StorageUnavailable(
            "search requires USE_DATABASE=true".into(),
        ))
    }

    async fn fulltext_search(
        &self,
        _query: &str,
        _k: usize,
        _filters: &SearchFilters,
    ) -> Result<Vec<ChunkHit>> {
        Err(MemoryError::StorageUnavailable(
            "search requires USE_DATABASE=true".into(),
        ))
    }

    async fn clear(&self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn null_store_accepts_writes_and_rejects_search() {
        let store = NullIndexStore;
        let meta = FileMeta {
            file_path: "projects/p1.md".into(),
            title: "P1".into(),
            category: Category::Project,
            file_hash: "hash".into(),
            word_count: 2,
            tags: vec![],
            metadata: serde_json::json!({}),
        };
        assert_eq!(store.upsert_file(&meta).await.unwrap(), 0);
        assert!(store.replace_chunks(0, &[]).await.is_ok());
        assert!(!store.delete_file("projects/p1.md").await.unwrap());
        assert!(store.sync_record("projects/p1.md").await.unwrap().is_none());

        let err = store
            .fulltext_search("query", 10, &SearchFilters::default())
            .await
            .unwrap_err();
        assert!(matches!(err, MemoryError::StorageUnavailable(_)));
    }

    #[test]
    fn sync_state_round_trips() {
        for state in [
            SyncState::Pending,
            SyncState::Syncing,
            SyncState::Completed,
            SyncState::Failed,
        ] {
            assert_eq!(state.as_str().parse::<SyncState>().unwrap(), state);
        }
    }
}
