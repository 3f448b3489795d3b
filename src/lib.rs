//! Persistent markdown memory for AI agents — hybrid retrieval over an
//! on-disk note tree, exposed via MCP.
//!
//! Engram is an [MCP](https://modelcontextprotocol.io/) server that gives
//! agents durable, human-readable memory. Notes are markdown files in a
//! categorized tree; a Postgres + pgvector index mirrors them for
//! retrieval, kept consistent by an asynchronous file→index sync pipeline.
//!
//! # Architecture
//!
//! - **Storage**: markdown files under `MEMORY_FILES_PATH` (the source of
//!   truth) plus a `files_index.json` metadata mirror
//! - **Index**: Postgres with pgvector for cosine search and an English
//!   tsvector for full-text search
//! - **Search**: vector + full-text merged via Reciprocal Rank Fusion
//! - **Sync**: per-file reconcile pipeline (hash check → chunk → embed →
//!   replace) behind a bounded worker pool
//! - **Transport**: MCP over stdio
//!
//! # Modules
//!
//! - [`config`] — configuration from TOML files and environment variables
//! - [`fs`] — file store, JSON index, and `main.md` operations
//! - [`chunker`] — markdown-aware chunking with header context
//! - [`embedding`] — pluggable embedding providers
//! - [`index`] — the Postgres/pgvector index store (and file-only stub)
//! - [`search`] — vector / full-text / hybrid retrieval
//! - [`sync`] — file→index reconciliation
//! - [`manager`] — the orchestrating memory manager
//! - [`tools`] — the unified batch MCP tools

pub mod chunker;
pub mod config;
pub mod editor;
pub mod embedding;
pub mod error;
pub mod fs;
pub mod index;
pub mod locks;
pub mod manager;
pub mod search;
pub mod server;
pub mod sync;
pub mod tools;
pub mod types;
