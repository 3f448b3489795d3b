//! Postgres + pgvector implementation of the index store.
//!
//! Three tables mirror the markdown tree: `memory_files` (metadata),
//! `memory_chunks` (content, embedding, generated tsvector), and
//! `sync_status` (per-file reconcile bookkeeping). Vector search runs
//! through the IVFFlat cosine index; full-text search runs
//! `plainto_tsquery('english')` ranked by `ts_rank_cd`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pgvector::Vector;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};
use tracing::info;

use super::{ChunkHit, ChunkRecord, FileMeta, IndexStore, SearchFilters, SyncRecord, SyncState};
use crate::config::DatabaseConfig;
use crate::error::Result;

pub struct PgIndexStore {
    pool: PgPool,
}

impl PgIndexStore {
    /// Connect a pool sized from config. The schema is not touched; call
    /// [`PgIndexStore::init_schema`] once at startup.
    pub async fn connect(config: &DatabaseConfig) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .min_connections(config.pool_min_size)
            .max_connections(config.pool_max_size)
            .connect(&config.url)
            .await?;
        info!(
            min = config.pool_min_size,
            max = config.pool_max_size,
            "postgres pool connected"
        );
        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create the extension, tables, indexes, and the `rrf_score` helper.
    /// Idempotent. `dimension` sizes the embedding column.
    pub async fn init_schema(&self, dimension: usize) -> anyhow::Result<()> {
        let ddl = schema_sql(dimension);
        for statement in ddl.split(";\n\n") {
            let trimmed = statement.trim();
            if trimmed.is_empty() {
                continue;
            }
            sqlx::query(sqlx::AssertSqlSafe(trimmed.to_string()))
                .execute(&self.pool)
                .await?;
        }
        info!(dimension, "index store schema ready");
        Ok(())
    }

    pub async fn health_check(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

fn schema_sql(dimension: usize) -> String {
    format!(
        r#"CREATE EXTENSION IF NOT EXISTS vector;

CREATE TABLE IF NOT EXISTS memory_files (
    id BIGSERIAL PRIMARY KEY,
    file_path VARCHAR(512) UNIQUE NOT NULL,
    title VARCHAR(255) NOT NULL,
    category VARCHAR(100) NOT NULL DEFAULT 'other'
        CHECK (category IN ('main', 'project', 'concept', 'conversation', 'preference', 'other')),
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    file_hash VARCHAR(64) NOT NULL,
    word_count INTEGER NOT NULL DEFAULT 0,
    tags TEXT[] NOT NULL DEFAULT '{{}}',
    metadata JSONB NOT NULL DEFAULT '{{}}'
);

CREATE INDEX IF NOT EXISTS idx_memory_files_category ON memory_files (category);

CREATE INDEX IF NOT EXISTS idx_memory_files_updated ON memory_files (updated_at DESC);

CREATE INDEX IF NOT EXISTS idx_memory_files_tags ON memory_files USING gin (tags);

CREATE INDEX IF NOT EXISTS idx_memory_files_metadata ON memory_files USING gin (metadata);

CREATE TABLE IF NOT EXISTS memory_chunks (
    id BIGSERIAL PRIMARY KEY,
    file_id BIGINT NOT NULL REFERENCES memory_files(id) ON DELETE CASCADE,
    chunk_index INTEGER NOT NULL,
    content TEXT NOT NULL,
    content_hash VARCHAR(64) NOT NULL,
    embedding vector({dimension}),
    header_path TEXT[] NOT NULL DEFAULT '{{}}',
    section_level INTEGER NOT NULL DEFAULT 0,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    content_tsvector tsvector GENERATED ALWAYS AS (to_tsvector('english', content)) STORED,
    UNIQUE (file_id, chunk_index)
);

CREATE INDEX IF NOT EXISTS idx_chunks_file_id ON memory_chunks (file_id);

CREATE INDEX IF NOT EXISTS idx_chunks_tsvector ON memory_chunks USING gin (content_tsvector);

CREATE INDEX IF NOT EXISTS idx_chunks_header ON memory_chunks USING gin (header_path);

CREATE INDEX IF NOT EXISTS idx_chunks_embedding_ivfflat ON memory_chunks
    USING ivfflat (embedding vector_cosine_ops) WITH (lists = 100);

CREATE TABLE IF NOT EXISTS sync_status (
    id BIGSERIAL PRIMARY KEY,
    file_id BIGINT NOT NULL UNIQUE REFERENCES memory_files(id) ON DELETE CASCADE,
    last_synced_at TIMESTAMPTZ,
    last_synced_hash VARCHAR(64),
    sync_status VARCHAR(20) NOT NULL DEFAULT 'pending'
        CHECK (sync_status IN ('pending', 'syncing', 'completed', 'failed')),
    error_message TEXT
);

CREATE OR REPLACE FUNCTION rrf_score(rank bigint, k int DEFAULT 60)
    RETURNS numeric
    LANGUAGE sql
    IMMUTABLE
    PARALLEL SAFE
    AS 'SELECT 1.0 / (rank + k)'"#
    )
}

/// Append filter clauses and collect their bind values. Bind numbering
/// starts after the fixed parameters.
fn filter_clauses(filters: &SearchFilters, first_bind: usize) -> (String, Vec<FilterBind>) {
    let mut clause = String::new();
    let mut binds = Vec::new();
    let mut n = first_bind;
    if let Some(category) = filters.category {
        clause.push_str(&format!(" AND mf.category = ${n}"));
        binds.push(FilterBind::Text(category.as_str().to_string()));
        n += 1;
    }
    if let Some(path) = &filters.file_path {
        clause.push_str(&format!(" AND mf.file_path = ${n}"));
        binds.push(FilterBind::Text(path.clone()));
        n += 1;
    }
    if !filters.tags.is_empty() {
        clause.push_str(&format!(" AND mf.tags @> ${n}"));
        binds.push(FilterBind::TextArray(filters.tags.clone()));
    }
    (clause, binds)
}

enum FilterBind {
    Text(String),
    TextArray(Vec<String>),
}

fn bind_filters<'q>(
    mut query: sqlx::query::Query<'q, sqlx::Postgres, sqlx::postgres::PgArguments>,
    binds: &'q [FilterBind],
) -> sqlx::query::Query<'q, sqlx::Postgres, sqlx::postgres::PgArguments> {
    for bind in binds {
        query = match bind {
            FilterBind::Text(value) => query.bind(value),
            FilterBind::TextArray(values) => query.bind(values),
        };
    }
    query
}

fn hit_from_row(row: &sqlx::postgres::PgRow, rank: usize) -> Result<ChunkHit> {
    Ok(ChunkHit {
        chunk_id: row.try_get::<i64, _>("id")?,
        file_path: row.try_get("file_path")?,
        title: row.try_get("title")?,
        category: row.try_get("category")?,
        content: row.try_get("content")?,
        header_path: row.try_get::<Vec<String>, _>("header_path")?,
        rank,
        score: row.try_get::<f64, _>("score")? as f32,
    })
}

#[async_trait]
impl IndexStore for PgIndexStore {
    async fn upsert_file(&self, meta: &FileMeta) -> Result<i64> {
        let row = sqlx::query(
            "INSERT INTO memory_files (file_path, title, category, file_hash, word_count, tags, metadata) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             ON CONFLICT (file_path) DO UPDATE SET \
                 title = EXCLUDED.title, \
                 category = EXCLUDED.category, \
                 file_hash = EXCLUDED.file_hash, \
                 word_count = EXCLUDED.word_count, \
                 tags = EXCLUDED.tags, \
                 metadata = EXCLUDED.metadata, \
                 updated_at = now() \
             RETURNING id",
        )
        .bind(&meta.file_path)
        .bind(&meta.title)
        .bind(meta.category.as_str())
        .bind(&meta.file_hash)
        .bind(meta.word_count as i32)
        .bind(&meta.tags)
        .bind(&meta.metadata)
        .fetch_one(&self.pool)
        .await?;
        let file_id: i64 = row.try_get("id")?;

        sqlx::query(
            "INSERT INTO sync_status (file_id) VALUES ($1) ON CONFLICT (file_id) DO NOTHING",
        )
        .bind(file_id)
        .execute(&self.pool)
        .await?;

        Ok(file_id)
    }

    async fn replace_chunks(&self, file_id: i64, chunks: &[ChunkRecord]) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM memory_chunks WHERE file_id = $1")
            .bind(file_id)
            .execute(&mut *tx)
            .await?;

        for chunk in chunks {
            sqlx::query(
                "INSERT INTO memory_chunks \
                 (file_id, chunk_index, content, content_hash, embedding, header_path, section_level) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7)",
            )
            .bind(file_id)
            .bind(chunk.chunk_index)
            .bind(&chunk.content)
            .bind(&chunk.content_hash)
            .bind(chunk.embedding.clone().map(Vector::from))
            .bind(&chunk.header_path)
            .bind(chunk.section_level)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        info!(file_id, count = chunks.len(), "chunks replaced");
        Ok(())
    }

    async fn delete_file(&self, file_path: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM memory_files WHERE file_path = $1")
            .bind(file_path)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn sync_record(&self, file_path: &str) -> Result<Option<SyncRecord>> {
        let row = sqlx::query(
            "SELECT ss.file_id, ss.last_synced_hash, ss.last_synced_at, ss.sync_status, ss.error_message \
             FROM sync_status ss \
             JOIN memory_files mf ON ss.file_id = mf.id \
             WHERE mf.file_path = $1",
        )
        .bind(file_path)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| {
            let status: String = row.try_get("sync_status")?;
            Ok(SyncRecord {
                file_id: row.try_get("file_id")?,
                last_synced_hash: row.try_get("last_synced_hash")?,
                last_synced_at: row
                    .try_get::<Option<DateTime<Utc>>, _>("last_synced_at")?
                    .map(|t| t.to_rfc3339()),
                status: status.parse()?,
                error_message: row.try_get("error_message")?,
            })
        })
        .transpose()
    }

    async fn mark_sync(
        &self,
        file_id: i64,
        status: SyncState,
        synced_hash: Option<&str>,
        error_message: Option<&str>,
    ) -> Result<()> {
        match status {
            SyncState::Completed => {
                sqlx::query(
                    "UPDATE sync_status SET sync_status = $2, last_synced_at = now(), \
                     last_synced_hash = $3, error_message = NULL WHERE file_id = $1",
                )
                .bind(file_id)
                .bind(status.as_str())
                .bind(synced_hash)
                .execute(&self.pool)
                .await?;
            }
            SyncState::Failed => {
                sqlx::query(
                    "UPDATE sync_status SET sync_status = $2, error_message = $3 WHERE file_id = $1",
                )
                .bind(file_id)
                .bind(status.as_str())
                .bind(error_message)
                .execute(&self.pool)
                .await?;
            }
            _ => {
                sqlx::query("UPDATE sync_status SET sync_status = $2 WHERE file_id = $1")
                    .bind(file_id)
                    .bind(status.as_str())
                    .execute(&self.pool)
                    .await?;
            }
        }
        Ok(())
    }

    async fn vector_search(
        &self,
        query: &[f32],
        k: usize,
        filters: &SearchFilters,
    ) -> Result<Vec<ChunkHit>> {
        let (clause, binds) = filter_clauses(filters, 3);
        let sql = format!(
            "SELECT mc.id, mf.file_path, mf.title, mf.category, mc.content, mc.header_path, \
                    (1 - (mc.embedding <=> $1))::float8 AS score \
             FROM memory_chunks mc \
             JOIN memory_files mf ON mc.file_id = mf.id \
             WHERE mc.embedding IS NOT NULL{clause} \
             ORDER BY mc.embedding <=> $1 \
             LIMIT $2"
        );

        let query_vec = Vector::from(query.to_vec());
        let stmt = sqlx::query(sqlx::AssertSqlSafe(sql))
            .bind(query_vec)
            .bind(k as i64);
        let rows = bind_filters(stmt, &binds).fetch_all(&self.pool).await?;

        rows.iter()
            .enumerate()
            .map(|(i, row)| hit_from_row(row, i + 1))
            .collect()
    }

    async fn fulltext_search(
        &self,
        query: &str,
        k: usize,
        filters: &SearchFilters,
    ) -> Result<Vec<ChunkHit>> {
        let (clause, binds) = filter_clauses(filters, 3);
        let sql = format!(
            "SELECT mc.id, mf.file_path, mf.title, mf.category, mc.content, mc.header_path, \
                    ts_rank_cd(mc.content_tsvector, plainto_tsquery('english', $1))::float8 AS score \
             FROM memory_chunks mc \
             JOIN memory_files mf ON mc.file_id = mf.id \
             WHERE mc.content_tsvector @@ plainto_tsquery('english', $1){clause} \
             ORDER BY score DESC, mc.id ASC \
             LIMIT $2"
        );

        let stmt = sqlx::query(sqlx::AssertSqlSafe(sql)).bind(query).bind(k as i64);
        let rows = bind_filters(stmt, &binds).fetch_all(&self.pool).await?;

        rows.iter()
            .enumerate()
            .map(|(i, row)| hit_from_row(row, i + 1))
            .collect()
    }

    async fn clear(&self) -> Result<()> {
        sqlx::query("TRUNCATE memory_files, memory_chunks, sync_status RESTART IDENTITY CASCADE")
            .execute(&self.pool)
            .await?;
        info!("index store cleared");
        Ok(())
    }
}
