//! Lifecycle: initialize and reset round trips.

mod helpers;

use engram::index::SearchFilters;
use engram::search::SearchMode;
use helpers::indexed_env;

#[tokio::test]
async fn reset_leaves_only_sentinels() {
    let env = indexed_env().await;
    for i in 0..5 {
        env.create_file(&format!("File {i}"), "project", "# File\n\nSome searchable body.")
            .await;
    }
    assert_eq!(env.manager.list_files(None).unwrap().total, 5);

    env.manager.reset().await.unwrap();
    env.manager.flush_sync().await;

    // Exactly main.md and files_index.json remain on disk.
    let mut remaining: Vec<String> = std::fs::read_dir(env.tmp.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    remaining.sort();
    assert_eq!(remaining, vec!["files_index.json", "main.md"]);

    // Listing excludes the sentinel, so the tree reads as empty.
    assert_eq!(env.manager.list_files(None).unwrap().total, 0);

    // The index store kept nothing but the re-synced sentinel.
    assert_eq!(env.index.file_count(), 1);
    let response = env
        .search
        .search("searchable", SearchMode::Fulltext, 10, &SearchFilters::default())
        .await
        .unwrap();
    assert!(response.results.is_empty());
}

#[tokio::test]
async fn reset_then_initialize_restores_base_state() {
    let env = indexed_env().await;
    env.create_file("Something", "concept", "content").await;

    env.manager.reset().await.unwrap();
    let result = env.manager.initialize().await.unwrap();
    env.manager.flush_sync().await;
    assert!(result.message.contains("already"));

    // main.md is back to the canonical skeleton.
    let main = env.manager.read_file("main.md").await.unwrap().content;
    assert!(main.contains("## File Index"));
    assert!(main.contains("## Current Goals"));
    assert!(!main.contains("something"));

    // Category directories exist again for new files.
    let created = env
        .manager
        .create_file("Fresh", "project", "fresh start", vec![], Default::default())
        .await
        .unwrap();
    assert_eq!(created.file_path, "projects/fresh.md");
}

#[tokio::test]
async fn reset_clears_goals_and_plans() {
    let env = indexed_env().await;
    env.manager.main_goal("Old goal", "add").await.unwrap();
    env.manager.main_plan("Old plan", "add").await.unwrap();

    env.manager.reset().await.unwrap();

    let main = env.manager.read_file("main.md").await.unwrap().content;
    assert!(!main.contains("Old goal"));
    assert!(!main.contains("Old plan"));
}
