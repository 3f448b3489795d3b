//! MCP `files` tool parameter definitions.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Parameters for the `files` MCP tool.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct FilesParams {
    /// Operation applied to every item: `create`, `read`, `update`,
    /// `delete`, `move`, `copy`, `rename`, or `list`.
    #[schemars(
        description = "Operation applied to every item: create, read, update, delete, move, copy, rename, or list"
    )]
    pub operation: String,

    /// One entry per file operation; fields depend on the operation.
    #[schemars(description = "One entry per file operation; fields depend on the operation")]
    pub items: Vec<FileItem>,
}

/// One `files` batch item. Which fields are required depends on the
/// operation; missing fields fail that item with `InvalidArgument`.
#[derive(Debug, Default, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct FileItem {
    /// Title of the file (`create`, `copy`, `rename`).
    pub title: Option<String>,

    /// Category: `project`, `concept`, `conversation`, `preference`, or
    /// `other` (`create`; optional filter for `list`).
    pub category: Option<String>,

    /// Markdown content (`create`, `update`).
    pub content: Option<String>,

    /// Tags attached at creation.
    pub tags: Option<Vec<String>>,

    /// Arbitrary JSON object stored alongside the file.
    pub metadata: Option<serde_json::Value>,

    /// Target path (`read`, `update`, `delete`, `move`).
    pub file_path: Option<String>,

    /// `replace`, `append`, or `prepend` (`update`; default `replace`).
    pub update_mode: Option<String>,

    /// Destination category (`move`, optional for `copy`).
    pub new_category: Option<String>,

    /// New title (`rename`, `copy`).
    pub new_title: Option<String>,

    /// Source path (`copy`).
    pub source_file_path: Option<String>,

    /// Current path (`rename`).
    pub old_file_path: Option<String>,
}
