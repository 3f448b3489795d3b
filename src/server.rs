//! MCP server initialization for the stdio transport.
//!
//! [`serve_stdio`] wires the file store, JSON index, optional Postgres
//! index store, embedding provider, sync workers, and MCP tool handler
//! into a running server. With `USE_DATABASE=false` the search and sync
//! subsystems are replaced by their file-only implementations.

use std::sync::Arc;

use anyhow::{Context, Result};
use rmcp::ServiceExt;

use crate::chunker::Chunker;
use crate::config::EngramConfig;
use crate::embedding::{create_embedder, Embedder};
use crate::fs::json_index::INDEX_FILE;
use crate::fs::{FileStore, JsonIndex};
use crate::index::postgres::PgIndexStore;
use crate::index::{IndexStore, NullIndexStore};
use crate::manager::MemoryManager;
use crate::search::SearchEngine;
use crate::sync::SyncService;
use crate::tools::EngramTools;
use crate::types::MAIN_FILE;

struct SharedState {
    manager: Arc<MemoryManager>,
    search: Arc<SearchEngine>,
    sync: Option<Arc<SyncService>>,
    config: Arc<EngramConfig>,
}

/// Open every subsystem and run the startup sweep.
async fn setup_shared_state(config: EngramConfig) -> Result<SharedState> {
    let root = config.resolved_files_path();
    let files = Arc::new(FileStore::new(&root).context("failed to open memory files root")?);
    tracing::info!(root = %root.display(), "file store ready");

    let json_index = Arc::new(JsonIndex::new(root.join(INDEX_FILE)));
    if files.exists(MAIN_FILE) {
        json_index
            .ensure_valid(&files)
            .context("failed to recover files_index.json")?;
    }

    // Embedding provider: a failure here degrades to fulltext-only search
    // rather than refusing to start.
    let embedder: Option<Arc<Embedder>> = if config.database.enabled {
        match config
            .validate_provider_config()
            .and_then(|()| create_embedder(&config.embedding))
        {
            Ok(embedder) => {
                tracing::info!(
                    provider = embedder.name(),
                    dimension = embedder.dimension(),
                    "embedding provider ready"
                );
                Some(Arc::new(embedder))
            }
            Err(e) => {
                tracing::warn!(error = %e, "embedding provider unavailable, fulltext-only search");
                None
            }
        }
    } else {
        None
    };

    let (index, sync): (Arc<dyn IndexStore>, Option<Arc<SyncService>>) = if config.database.enabled
    {
        let store = PgIndexStore::connect(&config.database)
            .await
            .context("failed to connect to Postgres")?;
        let dimension = embedder
            .as_ref()
            .map(|e| e.dimension())
            .unwrap_or(config.embedding.dimension);
        store
            .init_schema(dimension)
            .await
            .context("failed to initialize index schema")?;
        let index: Arc<dyn IndexStore> = Arc::new(store);

        let sync = SyncService::start(
            files.clone(),
            json_index.clone(),
            index.clone(),
            embedder.clone(),
            Chunker::new(config.search.chunk_size, config.search.chunk_overlap),
            &config.sync,
        );

        tracing::info!("performing initial sync");
        sync.sync_all().await.context("initial sync failed")?;

        (index, Some(sync))
    } else {
        tracing::info!("database disabled, running in file-only mode");
        (Arc::new(NullIndexStore), None)
    };

    let search = Arc::new(SearchEngine::new(
        index,
        embedder,
        config.search.rrf_k,
    ));
    let manager = Arc::new(MemoryManager::new(files, json_index, sync.clone()));

    Ok(SharedState {
        manager,
        search,
        sync,
        config: Arc::new(config),
    })
}

/// Start the MCP server over stdio transport.
pub async fn serve_stdio(config: EngramConfig) -> Result<()> {
    tracing::info!(name = %config.server.name, "starting memory MCP server on stdio");

    let state = setup_shared_state(config).await?;

    let tools = EngramTools::new(
        state.manager.clone(),
        state.search.clone(),
        state.config.clone(),
    );
    let transport = rmcp::transport::stdio();

    let server = tools.serve(transport).await?;
    tracing::info!("MCP server running — waiting for client");

    server.waiting().await?;

    if let Some(sync) = &state.sync {
        sync.shutdown();
    }
    tracing::info!("MCP server shut down");

    Ok(())
}
