//! Retrieval — vector, full-text, and hybrid search over the index store.
//!
//! Hybrid mode runs both backends concurrently and fuses their rankings by
//! Reciprocal Rank Fusion. When one backend fails (or no embedding
//! provider is configured) the surviving ranking is returned with
//! `degraded_mode` set instead of failing the query.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::embedding::Embedder;
use crate::error::{MemoryError, Result};
use crate::index::{ChunkHit, IndexStore, SearchFilters};

/// Backends have at least this much headroom over the requested limit so
/// fusion has candidates to work with.
const FUSION_FLOOR: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SearchMode {
    #[default]
    Hybrid,
    Vector,
    Fulltext,
}

impl SearchMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hybrid => "hybrid",
            Self::Vector => "vector",
            Self::Fulltext => "fulltext",
        }
    }
}

impl std::str::FromStr for SearchMode {
    type Err = MemoryError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "hybrid" => Ok(Self::Hybrid),
            "vector" => Ok(Self::Vector),
            "fulltext" => Ok(Self::Fulltext),
            _ => Err(MemoryError::InvalidArgument(format!(
                "unknown search mode: {s} (expected hybrid, vector, or fulltext)"
            ))),
        }
    }
}

/// One search result as returned to callers.
#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    pub chunk_id: i64,
    pub file_path: String,
    pub title: String,
    pub category: String,
    pub content: String,
    pub header_path: Vec<String>,
    pub score: f64,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub search_mode: SearchMode,
    pub results: Vec<SearchHit>,
    pub total_results: usize,
    /// True when hybrid fell back to a single modality.
    pub degraded_mode: bool,
}

pub struct SearchEngine {
    index: Arc<dyn IndexStore>,
    embedder: Option<Arc<Embedder>>,
    rrf_k: u32,
}

impl SearchEngine {
    pub fn new(index: Arc<dyn IndexStore>, embedder: Option<Arc<Embedder>>, rrf_k: u32) -> Self {
        Self {
            index,
            embedder,
            rrf_k,
        }
    }

    pub async fn search(
        &self,
        query: &str,
        mode: SearchMode,
        limit: usize,
        filters: &SearchFilters,
    ) -> Result<SearchResponse> {
        if query.trim().is_empty() {
            return Err(MemoryError::InvalidArgument(
                "search query must not be empty".into(),
            ));
        }
        if limit == 0 {
            return Ok(SearchResponse {
                query: query.to_string(),
                search_mode: mode,
                results: Vec::new(),
                total_results: 0,
                degraded_mode: false,
            });
        }

        // Without an embedding provider, only the lexical backend exists.
        let (mode, mut degraded) = match (mode, &self.embedder) {
            (SearchMode::Fulltext, _) => (SearchMode::Fulltext, false),
            (requested, None) => {
                warn!(requested = requested.as_str(), "no embedding provider, using fulltext");
                (SearchMode::Fulltext, requested != SearchMode::Fulltext)
            }
            (requested, Some(_)) => (requested, false),
        };

        let k = limit.max(FUSION_FLOOR);
        let results = match mode {
            SearchMode::Vector => {
                let hits = self.vector_hits(query, k, filters).await?;
                hits.into_iter()
                    .take(limit)
                    .map(|hit| to_search_hit(&hit, rescale_cosine(hit.score)))
                    .collect()
            }
            SearchMode::Fulltext => {
                let hits = self.index.fulltext_search(query, k, filters).await?;
                hits.into_iter()
                    .take(limit)
                    .map(|hit| to_search_hit(&hit, hit.score as f64))
                    .collect()
            }
            SearchMode::Hybrid => {
                let (vector, fulltext) = tokio::join!(
                    self.vector_hits(query, k, filters),
                    self.index.fulltext_search(query, k, filters)
                );
                match (vector, fulltext) {
                    (Ok(vector), Ok(fulltext)) => {
                        fuse_rrf(&vector, &fulltext, self.rrf_k, limit)
                    }
                    (Err(e), Ok(fulltext)) => {
                        warn!(error = %e, "vector search failed, degrading to fulltext");
                        degraded = true;
                        fulltext
                            .into_iter()
                            .take(limit)
                            .map(|hit| to_search_hit(&hit, hit.score as f64))
                            .collect()
                    }
                    (Ok(vector), Err(e)) => {
                        warn!(error = %e, "fulltext search failed, degrading to vector");
                        degraded = true;
                        vector
                            .into_iter()
                            .take(limit)
                            .map(|hit| to_search_hit(&hit, rescale_cosine(hit.score)))
                            .collect()
                    }
                    (Err(_), Err(e)) => return Err(e),
                }
            }
        };

        info!(
            query,
            mode = mode.as_str(),
            results = results.len(),
            degraded,
            "search completed"
        );
        Ok(SearchResponse {
            query: query.to_string(),
            search_mode: mode,
            total_results: results.len(),
            results,
            degraded_mode: degraded,
        })
    }

    async fn vector_hits(
        &self,
        query: &str,
        k: usize,
        filters: &SearchFilters,
    ) -> Result<Vec<ChunkHit>> {
        let embedder = self.embedder.as_ref().ok_or_else(|| {
            MemoryError::StorageUnavailable("no embedding provider configured".into())
        })?;
        let query_vec = embedder.embed_one(query).await?;
        self.index.vector_search(&query_vec, k, filters).await
    }
}

/// Cosine similarity in [-1, 1] rescaled to [0, 1].
fn rescale_cosine(similarity: f32) -> f64 {
    ((similarity as f64) + 1.0) / 2.0
}

fn to_search_hit(hit: &ChunkHit, score: f64) -> SearchHit {
    SearchHit {
        chunk_id: hit.chunk_id,
        file_path: hit.file_path.clone(),
        title: hit.title.clone(),
        category: hit.category.clone(),
        content: hit.content.clone(),
        header_path: hit.header_path.clone(),
        score,
    }
}

/// Reciprocal Rank Fusion.
///
/// Each chunk scores the sum of `1 / (k + rank)` over the lists that
/// contain it. Ordering is score descending, then the smaller of the two
/// ranks, then chunk id, so equal inputs always produce equal output.
fn fuse_rrf(
    vector: &[ChunkHit],
    fulltext: &[ChunkHit],
    rrf_k: u32,
    limit: usize,
) -> Vec<SearchHit> {
    struct Fused<'a> {
        hit: &'a ChunkHit,
        score: f64,
        best_rank: usize,
    }

    let mut fused: HashMap<i64, Fused> = HashMap::new();
    let k = rrf_k as f64;

    for hit in vector {
        let term = 1.0 / (k + hit.rank as f64);
        fused.insert(
            hit.chunk_id,
            Fused {
                hit,
                score: term,
                best_rank: hit.rank,
            },
        );
    }
    for hit in fulltext {
        let term = 1.0 / (k + hit.rank as f64);
        fused
            .entry(hit.chunk_id)
            .and_modify(|f| {
                f.score += term;
                f.best_rank = f.best_rank.min(hit.rank);
            })
            .or_insert(Fused {
                hit,
                score: term,
                best_rank: hit.rank,
            });
    }

    let mut merged: Vec<Fused> = fused.into_values().collect();
    merged.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.best_rank.cmp(&b.best_rank))
            .then(a.hit.chunk_id.cmp(&b.hit.chunk_id))
    });

    merged
        .into_iter()
        .take(limit)
        .map(|f| to_search_hit(f.hit, f.score))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn hit(chunk_id: i64, rank: usize, score: f32) -> ChunkHit {
        ChunkHit {
            chunk_id,
            file_path: format!("projects/file_{chunk_id}.md"),
            title: format!("File {chunk_id}"),
            category: "project".into(),
            content: format!("content {chunk_id}"),
            header_path: vec![],
            rank,
            score,
        }
    }

    #[test]
    fn mode_parse_round_trips() {
        for mode in [SearchMode::Hybrid, SearchMode::Vector, SearchMode::Fulltext] {
            assert_eq!(SearchMode::from_str(mode.as_str()).unwrap(), mode);
        }
        assert!(SearchMode::from_str("fuzzy").is_err());
    }

    #[test]
    fn rrf_rewards_presence_in_both_lists() {
        let vector = vec![hit(1, 1, 0.9), hit(2, 2, 0.8), hit(3, 3, 0.7)];
        let fulltext = vec![hit(2, 1, 5.0), hit(4, 2, 4.0)];

        let fused = fuse_rrf(&vector, &fulltext, 60, 10);
        // Chunk 2 appears in both lists and must outrank everything.
        assert_eq!(fused[0].chunk_id, 2);
        let expected = 1.0 / 62.0 + 1.0 / 61.0;
        assert!((fused[0].score - expected).abs() < 1e-9);
    }

    #[test]
    fn rrf_single_list_chunks_keep_single_term() {
        let vector = vec![hit(1, 1, 0.9)];
        let fulltext: Vec<ChunkHit> = vec![];
        let fused = fuse_rrf(&vector, &fulltext, 60, 10);
        assert_eq!(fused.len(), 1);
        assert!((fused[0].score - 1.0 / 61.0).abs() < 1e-9);
    }

    #[test]
    fn rrf_ties_break_on_best_rank_then_chunk_id() {
        // Two chunks each present in exactly one list at the same rank:
        // identical scores, identical best rank, so chunk id decides.
        let vector = vec![hit(9, 1, 0.9)];
        let fulltext = vec![hit(3, 1, 5.0)];
        let fused = fuse_rrf(&vector, &fulltext, 60, 10);
        assert_eq!(fused[0].chunk_id, 3);
        assert_eq!(fused[1].chunk_id, 9);
    }

    #[test]
    fn rrf_respects_limit() {
        let vector: Vec<ChunkHit> = (1..=10).map(|i| hit(i, i as usize, 0.5)).collect();
        let fused = fuse_rrf(&vector, &[], 60, 3);
        assert_eq!(fused.len(), 3);
    }

    #[test]
    fn cosine_rescale_maps_to_unit_interval() {
        assert!((rescale_cosine(1.0) - 1.0).abs() < 1e-9);
        assert!((rescale_cosine(-1.0)).abs() < 1e-9);
        assert!((rescale_cosine(0.0) - 0.5).abs() < 1e-9);
    }

    #[tokio::test]
    async fn empty_query_is_invalid() {
        let engine = SearchEngine::new(Arc::new(crate::index::NullIndexStore), None, 60);
        let err = engine
            .search("  ", SearchMode::Fulltext, 5, &SearchFilters::default())
            .await
            .unwrap_err();
        assert!(matches!(err, MemoryError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn zero_limit_returns_empty() {
        let engine = SearchEngine::new(Arc::new(crate::index::NullIndexStore), None, 60);
        let response = engine
            .search("query", SearchMode::Hybrid, 0, &SearchFilters::default())
            .await
            .unwrap();
        assert!(response.results.is_empty());
        assert_eq!(response.total_results, 0);
    }

    #[tokio::test]
    async fn file_only_mode_surfaces_storage_unavailable() {
        let engine = SearchEngine::new(Arc::new(crate::index::NullIndexStore), None, 60);
        let err = engine
            .search("query", SearchMode::Fulltext, 5, &SearchFilters::default())
            .await
            .unwrap_err();
        assert!(matches!(err, MemoryError::StorageUnavailable(_)));
    }
}
