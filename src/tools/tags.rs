//! MCP `tags` tool parameter definitions.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Parameters for the `tags` MCP tool.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct TagsParams {
    /// `add`, `remove`, or `get`.
    #[schemars(description = "Tag operation: add, remove, or get")]
    pub operation: String,

    /// One entry per file.
    #[schemars(description = "One entry per file")]
    pub items: Vec<TagsItem>,
}

/// One `tags` batch item.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct TagsItem {
    /// Path of the file whose tags change.
    #[schemars(description = "Path of the file whose tags change")]
    pub file_path: String,

    /// Tags to add or remove. Tags form a set: adding an existing tag or
    /// removing an absent one is a no-op success.
    #[schemars(description = "Tags to add or remove (unused for get)")]
    pub tags: Option<Vec<String>>,
}
