//! The unified MCP tool surface.
//!
//! Nine batch-oriented tools: every tool takes an array of items and
//! returns an equal-length array of `{ok, value | error}` results in input
//! order. Items run concurrently; writes to the same file serialize
//! through the manager's per-path locks, and one item's failure never
//! aborts the rest of the batch.

pub mod edit;
pub mod extract;
pub mod files;
pub mod help;
pub mod list;
pub mod main_ops;
pub mod memory_ops;
pub mod search;
pub mod tags;

use std::future::Future;
use std::str::FromStr;
use std::sync::Arc;

use futures::future::join_all;
use rmcp::handler::server::tool::ToolRouter;
use rmcp::handler::server::tool::Parameters;
use rmcp::{tool, tool_handler, tool_router, ServerHandler};
use serde::Serialize;

use crate::config::EngramConfig;
use crate::editor::InsertPosition;
use crate::error::{ErrorPayload, MemoryError, Result as MemResult};
use crate::index::SearchFilters;
use crate::manager::MemoryManager;
use crate::search::{SearchEngine, SearchMode};
use crate::types::UpdateMode;

use edit::{EditOperation, EditParams};
use extract::ExtractParams;
use files::{FileItem, FilesParams};
use help::HelpParams;
use list::{ListParams, ListRequest};
use main_ops::{MainItem, MainParams};
use memory_ops::MemoryParams;
use search::{SearchParams, SearchQuery};
use tags::TagsParams;

/// Result of one batch item.
#[derive(Debug, Serialize)]
pub struct ItemResult {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorPayload>,
}

impl ItemResult {
    fn from<T: Serialize>(result: MemResult<T>) -> Self {
        match result.and_then(|value| Ok(serde_json::to_value(value)?)) {
            Ok(value) => Self {
                ok: true,
                value: Some(value),
                error: None,
            },
            Err(e) => Self {
                ok: false,
                value: None,
                error: Some(ErrorPayload::from(&e)),
            },
        }
    }
}

/// Response envelope shared by the batch tools.
#[derive(Debug, Serialize)]
struct BatchEnvelope {
    #[serde(skip_serializing_if = "Option::is_none")]
    operation: Option<String>,
    success_count: usize,
    error_count: usize,
    results: Vec<ItemResult>,
}

impl BatchEnvelope {
    fn new(operation: Option<String>, results: Vec<ItemResult>) -> Self {
        let success_count = results.iter().filter(|r| r.ok).count();
        Self {
            operation,
            success_count,
            error_count: results.len() - success_count,
            results,
        }
    }

    fn to_json(&self) -> std::result::Result<String, String> {
        serde_json::to_string(self).map_err(|e| format!("serialization failed: {e}"))
    }
}

fn required<T>(value: Option<T>, field: &str) -> MemResult<T> {
    value.ok_or_else(|| MemoryError::InvalidArgument(format!("missing required field: {field}")))
}

fn metadata_map(
    value: Option<serde_json::Value>,
) -> MemResult<serde_json::Map<String, serde_json::Value>> {
    match value {
        None | Some(serde_json::Value::Null) => Ok(serde_json::Map::new()),
        Some(serde_json::Value::Object(map)) => Ok(map),
        Some(other) => Err(MemoryError::InvalidArgument(format!(
            "metadata must be a JSON object, got {other}"
        ))),
    }
}

/// The MCP tool handler. Holds shared state (memory manager, search
/// engine, config) and exposes all tools via the `#[tool_router]` macro.
#[derive(Clone)]
pub struct EngramTools {
    tool_router: ToolRouter<Self>,
    manager: Arc<MemoryManager>,
    search: Arc<SearchEngine>,
    config: Arc<EngramConfig>,
}

#[tool_router]
impl EngramTools {
    pub fn new(
        manager: Arc<MemoryManager>,
        search: Arc<SearchEngine>,
        config: Arc<EngramConfig>,
    ) -> Self {
        Self {
            tool_router: Self::tool_router(),
            manager,
            search,
            config,
        }
    }

    /// Batch file management.
    #[tool(
        description = "Manage memory files in batch. operation: create, read, update, delete, move, copy, rename, or list; items: one entry per file. Returns one result per item in input order."
    )]
    pub async fn files(
        &self,
        Parameters(params): Parameters<FilesParams>,
    ) -> std::result::Result<String, String> {
        let operation = params.operation.as_str();
        if !matches!(
            operation,
            "create" | "read" | "update" | "delete" | "move" | "copy" | "rename" | "list"
        ) {
            return Err(format!("unknown files operation: {operation}"));
        }
        tracing::info!(operation, items = params.items.len(), "files tool called");

        let results = join_all(
            params
                .items
                .into_iter()
                .map(|item| self.run_file_item(operation, item)),
        )
        .await;
        BatchEnvelope::new(Some(params.operation), results).to_json()
    }

    /// Batch search.
    #[tool(
        description = "Search memory. Each query supports search_mode (hybrid/vector/fulltext), limit, file_path, category_filter, and tag_filter. Returns one result per query in input order."
    )]
    pub async fn search(
        &self,
        Parameters(params): Parameters<SearchParams>,
    ) -> std::result::Result<String, String> {
        tracing::info!(queries = params.queries.len(), "search tool called");
        let results = join_all(
            params
                .queries
                .into_iter()
                .map(|query| self.run_search_query(query)),
        )
        .await;
        BatchEnvelope::new(None, results).to_json()
    }

    /// Batch editing.
    #[tool(
        description = "Edit memory files in batch. edit_type: section (replace/append/prepend a section body), find_replace (literal or regex), or insert (start/end/after_marker). Returns one result per operation in input order."
    )]
    pub async fn edit(
        &self,
        Parameters(params): Parameters<EditParams>,
    ) -> std::result::Result<String, String> {
        tracing::info!(operations = params.operations.len(), "edit tool called");
        let results = join_all(
            params
                .operations
                .into_iter()
                .map(|op| self.run_edit_operation(op)),
        )
        .await;
        BatchEnvelope::new(None, results).to_json()
    }

    /// Batch tag management.
    #[tool(
        description = "Manage tags in batch. operation: add, remove, or get. Tags are a set: adding an existing tag or removing an absent one succeeds without change."
    )]
    pub async fn tags(
        &self,
        Parameters(params): Parameters<TagsParams>,
    ) -> std::result::Result<String, String> {
        let operation = params.operation.as_str();
        if !matches!(operation, "add" | "remove" | "get") {
            return Err(format!("unknown tags operation: {operation}"));
        }
        tracing::info!(operation, items = params.items.len(), "tags tool called");

        let results = join_all(params.items.into_iter().map(|item| async move {
            let tags = item.tags.unwrap_or_default();
            match operation {
                "add" => ItemResult::from(self.manager.add_tags(&item.file_path, tags).await),
                "remove" => {
                    ItemResult::from(self.manager.remove_tags(&item.file_path, tags).await)
                }
                _ => ItemResult::from(self.manager.get_tags(&item.file_path)),
            }
        }))
        .await;
        BatchEnvelope::new(Some(params.operation), results).to_json()
    }

    /// Batch main.md operations.
    #[tool(
        description = "Update main.md in batch. operation: append (content into a section), goal (add/complete/remove), task (record completed work), or plan (add/complete)."
    )]
    pub async fn main(
        &self,
        Parameters(params): Parameters<MainParams>,
    ) -> std::result::Result<String, String> {
        let operation = params.operation.as_str();
        if !matches!(operation, "append" | "goal" | "task" | "plan") {
            return Err(format!("unknown main operation: {operation}"));
        }
        tracing::info!(operation, items = params.items.len(), "main tool called");

        let results = join_all(
            params
                .items
                .into_iter()
                .map(|item| self.run_main_item(operation, item)),
        )
        .await;
        BatchEnvelope::new(Some(params.operation), results).to_json()
    }

    /// Memory lifecycle.
    #[tool(
        description = "Memory lifecycle. initialize creates main.md and files_index.json; reset deletes all other files and truncates the search index."
    )]
    pub async fn memory(
        &self,
        Parameters(params): Parameters<MemoryParams>,
    ) -> std::result::Result<String, String> {
        tracing::info!(operation = %params.operation, "memory tool called");
        let result = match params.operation.as_str() {
            "initialize" => self.manager.initialize().await,
            "reset" => self.manager.reset().await,
            other => return Err(format!("unknown memory operation: {other}")),
        };
        serde_json::to_string(&ItemResult::from(result))
            .map_err(|e| format!("serialization failed: {e}"))
    }

    /// Batch section extraction.
    #[tool(
        description = "Extract the body of a named section from files. Returns one result per request in input order; a missing section fails that item with NotFound."
    )]
    pub async fn extract(
        &self,
        Parameters(params): Parameters<ExtractParams>,
    ) -> std::result::Result<String, String> {
        tracing::info!(requests = params.requests.len(), "extract tool called");
        let results = join_all(params.requests.into_iter().map(|req| async move {
            ItemResult::from(
                self.manager
                    .extract_section(&req.file_path, &req.section_header)
                    .await,
            )
        }))
        .await;
        BatchEnvelope::new(None, results).to_json()
    }

    /// Batch listings.
    #[tool(
        description = "List memory contents. type=files returns the flat list plus a category tree; type=sections returns the header outline of one file."
    )]
    pub async fn list(
        &self,
        Parameters(params): Parameters<ListParams>,
    ) -> std::result::Result<String, String> {
        tracing::info!(requests = params.requests.len(), "list tool called");
        let results = join_all(
            params
                .requests
                .into_iter()
                .map(|req| self.run_list_request(req)),
        )
        .await;
        BatchEnvelope::new(None, results).to_json()
    }

    /// Usage guidance.
    #[tool(
        description = "Usage guide for the memory tools. Pass a topic (files, search, edit, tags, main, memory, extract, list) for focused help, or omit it for the full guide."
    )]
    pub async fn help(
        &self,
        Parameters(params): Parameters<HelpParams>,
    ) -> std::result::Result<String, String> {
        let topic = params.topic.as_deref().unwrap_or("all");
        let body = match help::TOPICS.iter().find(|(name, _)| *name == topic) {
            Some((name, guide)) => serde_json::json!({
                "topic": name,
                "guide": guide,
                "full_guide": help::FULL_GUIDE,
            }),
            None => serde_json::json!({
                "topic": "all",
                "full_guide": help::FULL_GUIDE,
                "topics": help::TOPICS.iter().map(|(name, _)| *name).collect::<Vec<_>>(),
            }),
        };
        serde_json::to_string(&body).map_err(|e| format!("serialization failed: {e}"))
    }
}

impl EngramTools {
    async fn run_file_item(&self, operation: &str, item: FileItem) -> ItemResult {
        match operation {
            "create" => {
                let result = async {
                    let title = required(item.title, "title")?;
                    let category = required(item.category, "category")?;
                    let content = required(item.content, "content")?;
                    let metadata = metadata_map(item.metadata)?;
                    self.manager
                        .create_file(
                            &title,
                            &category,
                            &content,
                            item.tags.unwrap_or_default(),
                            metadata,
                        )
                        .await
                }
                .await;
                ItemResult::from(result)
            }
            "read" => {
                let result = async {
                    let path = required(item.file_path, "file_path")?;
                    self.manager.read_file(&path).await
                }
                .await;
                ItemResult::from(result)
            }
            "update" => {
                let result = async {
                    let path = required(item.file_path, "file_path")?;
                    let content = required(item.content, "content")?;
                    let mode = match item.update_mode.as_deref() {
                        Some(mode) => UpdateMode::from_str(mode)?,
                        None => UpdateMode::Replace,
                    };
                    self.manager.update_file(&path, &content, mode).await
                }
                .await;
                ItemResult::from(result)
            }
            "delete" => {
                let result = async {
                    let path = required(item.file_path, "file_path")?;
                    self.manager.delete_file(&path).await
                }
                .await;
                ItemResult::from(result)
            }
            "move" => {
                let result = async {
                    let path = required(item.file_path, "file_path")?;
                    let category = required(item.new_category, "new_category")?;
                    self.manager.move_file(&path, &category).await
                }
                .await;
                ItemResult::from(result)
            }
            "copy" => {
                let result = async {
                    let source = required(item.source_file_path, "source_file_path")?;
                    let title = required(item.new_title, "new_title")?;
                    self.manager
                        .copy_file(&source, &title, item.new_category.as_deref())
                        .await
                }
                .await;
                ItemResult::from(result)
            }
            "rename" => {
                let result = async {
                    let path = required(item.old_file_path, "old_file_path")?;
                    let title = required(item.new_title, "new_title")?;
                    self.manager.rename_file(&path, &title).await
                }
                .await;
                ItemResult::from(result)
            }
            // "list": validated by the caller
            _ => ItemResult::from(self.manager.list_files(item.category.as_deref())),
        }
    }

    async fn run_search_query(&self, query: SearchQuery) -> ItemResult {
        let result = async {
            let mode = match query.search_mode.as_deref() {
                Some(mode) => SearchMode::from_str(mode)?,
                None => SearchMode::Hybrid,
            };
            let limit = query.limit.unwrap_or(self.config.search.limit);
            let filters = SearchFilters {
                category: query
                    .category_filter
                    .as_deref()
                    .map(crate::types::Category::from_str)
                    .transpose()?,
                tags: query.tag_filter.unwrap_or_default(),
                file_path: query.file_path,
            };
            self.search.search(&query.query, mode, limit, &filters).await
        }
        .await;
        ItemResult::from(result)
    }

    async fn run_edit_operation(&self, op: EditOperation) -> ItemResult {
        let result = async {
            match op.edit_type.as_str() {
                "section" => {
                    let header = required(op.section_header, "section_header")?;
                    let new_content = required(op.new_content, "new_content")?;
                    let mode = match op.mode.as_deref() {
                        Some(mode) => UpdateMode::from_str(mode)?,
                        None => UpdateMode::Replace,
                    };
                    self.manager
                        .edit_section(&op.file_path, &header, &new_content, mode)
                        .await
                }
                "find_replace" => {
                    let find = required(op.find, "find")?;
                    let replace = required(op.replace, "replace")?;
                    self.manager
                        .find_replace(
                            &op.file_path,
                            &find,
                            &replace,
                            op.regex.unwrap_or(false),
                            op.max_replacements.unwrap_or(-1),
                        )
                        .await
                }
                "insert" => {
                    let content = required(op.content, "content")?;
                    let position = match op.position.as_deref() {
                        Some(position) => InsertPosition::from_str(position)?,
                        None => InsertPosition::End,
                    };
                    self.manager
                        .insert_content(&op.file_path, &content, position, op.marker.as_deref())
                        .await
                }
                other => Err(MemoryError::InvalidArgument(format!(
                    "unknown edit type: {other} (expected section, find_replace, or insert)"
                ))),
            }
        }
        .await;
        ItemResult::from(result)
    }

    async fn run_main_item(&self, operation: &str, item: MainItem) -> ItemResult {
        let action = item.action.unwrap_or_else(|| "add".into());
        let result = match operation {
            "append" => {
                let section = item.section.unwrap_or_else(|| "Recent Notes".into());
                match required(item.content, "content") {
                    Ok(content) => self.manager.main_append(&content, &section).await,
                    Err(e) => Err(e),
                }
            }
            "goal" => match required(item.goal, "goal") {
                Ok(goal) => self.manager.main_goal(&goal, &action).await,
                Err(e) => Err(e),
            },
            "task" => match required(item.task, "task") {
                Ok(task) => self.manager.main_task(&task).await,
                Err(e) => Err(e),
            },
            // "plan": validated by the caller
            _ => match required(item.plan, "plan") {
                Ok(plan) => self.manager.main_plan(&plan, &action).await,
                Err(e) => Err(e),
            },
        };
        ItemResult::from(result)
    }

    async fn run_list_request(&self, req: ListRequest) -> ItemResult {
        match req.r#type.as_str() {
            "files" => ItemResult::from(self.manager.list_files(req.category.as_deref())),
            "sections" => {
                let result = async {
                    let path = required(req.file_path, "file_path")?;
                    self.manager.list_sections(&path).await
                }
                .await;
                ItemResult::from(result)
            }
            other => ItemResult::from(Err::<(), _>(MemoryError::InvalidArgument(format!(
                "unknown list type: {other} (expected files or sections)"
            )))),
        }
    }
}

#[tool_handler]
impl ServerHandler for EngramTools {
    fn get_info(&self) -> rmcp::model::ServerInfo {
        rmcp::model::ServerInfo {
            instructions: Some(
                "Persistent markdown memory with hybrid search. Use files to store notes, \
                 search to recall them, edit/tags/main to keep them current, and help for \
                 the full guide."
                    .into(),
            ),
            capabilities: rmcp::model::ServerCapabilities::builder()
                .enable_tools()
                .build(),
            ..Default::default()
        }
    }
}
