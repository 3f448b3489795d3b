//! End-to-end retrieval: create markdown files, let the sync pipeline
//! chunk and embed them, then search through every mode.

mod helpers;

use std::sync::Arc;

use engram::embedding::Embedder;
use engram::error::MemoryError;
use engram::index::{ChunkRecord, FileMeta, IndexStore, SearchFilters};
use engram::search::{SearchEngine, SearchMode};
use engram::types::Category;
use helpers::{indexed_env, fulltext_only_env, CountdownEmbedder, MemoryIndexStore};

#[tokio::test]
async fn fulltext_finds_created_file() {
    let env = indexed_env().await;
    env.create_file("P1", "project", "# P1\n\nAlpha.").await;

    let response = env
        .search
        .search("Alpha", SearchMode::Fulltext, 5, &SearchFilters::default())
        .await
        .unwrap();

    assert_eq!(response.total_results, 1);
    assert_eq!(response.results[0].file_path, "projects/p1.md");
    assert!(!response.degraded_mode);
}

#[tokio::test]
async fn edit_moves_content_between_queries() {
    let env = indexed_env().await;
    env.create_file("P1", "project", "# P1\n\nAlpha.").await;

    let result = env
        .manager
        .find_replace("projects/p1.md", "Alpha", "Beta", false, -1)
        .await
        .unwrap();
    assert_eq!(result.replacements_made, Some(1));
    env.manager.flush_sync().await;

    let gone = env
        .search
        .search("Alpha", SearchMode::Fulltext, 5, &SearchFilters::default())
        .await
        .unwrap();
    assert!(gone.results.is_empty());

    let found = env
        .search
        .search("Beta", SearchMode::Fulltext, 5, &SearchFilters::default())
        .await
        .unwrap();
    assert_eq!(found.total_results, 1);
    assert_eq!(found.results[0].file_path, "projects/p1.md");
}

#[tokio::test]
async fn tag_filter_scopes_results() {
    let env = indexed_env().await;
    env.create_file("P1", "project", "# P1\n\nAlpha.").await;

    env.manager
        .add_tags("projects/p1.md", vec!["x".into(), "y".into()])
        .await
        .unwrap();
    env.manager.flush_sync().await;

    let tags = env.manager.get_tags("projects/p1.md").unwrap();
    assert_eq!(tags.tags, vec!["x", "y"]);

    let with_x = env
        .search
        .search(
            "Alpha",
            SearchMode::Fulltext,
            5,
            &SearchFilters {
                tags: vec!["x".into()],
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(with_x.total_results, 1);

    let with_z = env
        .search
        .search(
            "Alpha",
            SearchMode::Fulltext,
            5,
            &SearchFilters {
                tags: vec!["z".into()],
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert!(with_z.results.is_empty());
}

#[tokio::test]
async fn category_and_file_filters() {
    let env = indexed_env().await;
    env.create_file("Rust Notes", "project", "Notes about rust systems.")
        .await;
    env.create_file("Cooking Log", "conversation", "Talked about rust removal while cooking.")
        .await;

    let projects_only = env
        .search
        .search(
            "rust",
            SearchMode::Fulltext,
            10,
            &SearchFilters {
                category: Some(Category::Project),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(projects_only.total_results, 1);
    assert_eq!(projects_only.results[0].file_path, "projects/rust_notes.md");

    let scoped = env
        .search
        .search(
            "rust",
            SearchMode::Fulltext,
            10,
            &SearchFilters {
                file_path: Some("conversations/cooking_log.md".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(scoped.total_results, 1);
    assert_eq!(
        scoped.results[0].file_path,
        "conversations/cooking_log.md"
    );
}

#[tokio::test]
async fn vector_search_separates_topics() {
    let env = indexed_env().await;
    env.create_file("Rust File", "project", "All about rust programming.")
        .await;
    env.create_file("Cooking File", "other", "A cooking recipe collection.")
        .await;

    let response = env
        .search
        .search("rust", SearchMode::Vector, 5, &SearchFilters::default())
        .await
        .unwrap();
    assert!(!response.results.is_empty());
    assert_eq!(response.results[0].file_path, "projects/rust_file.md");
    // Cosine similarity rescaled into [0, 1].
    assert!(response.results[0].score >= 0.0 && response.results[0].score <= 1.0);
}

#[tokio::test]
async fn hybrid_ranks_both_signal_sources() {
    let env = indexed_env().await;
    env.create_file("Rust File", "project", "All about rust programming.")
        .await;
    env.create_file("Music File", "other", "Jazz and classical music notes.")
        .await;

    let response = env
        .search
        .search("rust", SearchMode::Hybrid, 5, &SearchFilters::default())
        .await
        .unwrap();
    assert!(!response.degraded_mode);
    assert!(!response.results.is_empty());
    assert_eq!(response.results[0].file_path, "projects/rust_file.md");
}

#[tokio::test]
async fn zero_limit_returns_empty_list() {
    let env = indexed_env().await;
    env.create_file("P1", "project", "# P1\n\nAlpha.").await;

    let response = env
        .search
        .search("Alpha", SearchMode::Fulltext, 0, &SearchFilters::default())
        .await
        .unwrap();
    assert!(response.results.is_empty());
    assert_eq!(response.total_results, 0);
}

#[tokio::test]
async fn no_matches_is_empty_not_error() {
    let env = indexed_env().await;
    env.create_file("P1", "project", "# P1\n\nAlpha.").await;

    let response = env
        .search
        .search("zzzqqq", SearchMode::Fulltext, 5, &SearchFilters::default())
        .await
        .unwrap();
    assert!(response.results.is_empty());
}

#[tokio::test]
async fn empty_query_is_invalid_argument() {
    let env = indexed_env().await;
    let err = env
        .search
        .search("   ", SearchMode::Hybrid, 5, &SearchFilters::default())
        .await
        .unwrap_err();
    assert!(matches!(err, MemoryError::InvalidArgument(_)));
}

#[tokio::test]
async fn hybrid_without_embedder_degrades_to_fulltext() {
    let env = fulltext_only_env().await;
    env.create_file("P1", "project", "# P1\n\nAlpha.").await;

    let response = env
        .search
        .search("Alpha", SearchMode::Hybrid, 5, &SearchFilters::default())
        .await
        .unwrap();
    assert!(response.degraded_mode);
    assert_eq!(response.search_mode, SearchMode::Fulltext);
    assert_eq!(response.total_results, 1);
}

#[tokio::test]
async fn hybrid_with_failing_vector_backend_degrades() {
    // Populate an index directly, then search with an embedder that can no
    // longer produce query vectors.
    let index = MemoryIndexStore::new();
    let file_id = index
        .upsert_file(&FileMeta {
            file_path: "projects/p1.md".into(),
            title: "P1".into(),
            category: Category::Project,
            file_hash: "hash".into(),
            word_count: 2,
            tags: vec![],
            metadata: serde_json::json!({}),
        })
        .await
        .unwrap();
    index
        .replace_chunks(
            file_id,
            &[ChunkRecord {
                chunk_index: 0,
                content: "Alpha content".into(),
                content_hash: "h".into(),
                embedding: Some(vec![1.0; 8]),
                header_path: vec![],
                section_level: 0,
            }],
        )
        .await
        .unwrap();

    let dead_embedder = Arc::new(Embedder::new(Box::new(CountdownEmbedder::new(0)), 0));
    let engine = SearchEngine::new(index as Arc<dyn IndexStore>, Some(dead_embedder), 60);

    let response = engine
        .search("Alpha", SearchMode::Hybrid, 5, &SearchFilters::default())
        .await
        .unwrap();
    assert!(response.degraded_mode);
    assert_eq!(response.total_results, 1);
    assert_eq!(response.results[0].file_path, "projects/p1.md");
}
