//! MCP `edit` tool parameter definitions.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Parameters for the `edit` MCP tool.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct EditParams {
    /// Edit operations, applied per item; edits to the same file are
    /// serialized in input order.
    #[schemars(description = "Edit operations; edits to the same file apply in input order")]
    pub operations: Vec<EditOperation>,
}

/// One edit operation. `edit_type` selects which other fields apply.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct EditOperation {
    /// Path of the file to edit.
    #[schemars(description = "Path of the file to edit")]
    pub file_path: String,

    /// `section`, `find_replace`, or `insert`.
    #[schemars(description = "Edit type: section, find_replace, or insert")]
    pub edit_type: String,

    /// Section header to locate, e.g. `## Status` (`section`).
    pub section_header: Option<String>,

    /// Replacement body for the section (`section`).
    pub new_content: Option<String>,

    /// `replace` (default), `append`, or `prepend` (`section`).
    pub mode: Option<String>,

    /// Text or pattern to find (`find_replace`).
    pub find: Option<String>,

    /// Replacement text (`find_replace`).
    pub replace: Option<String>,

    /// Treat `find` as a regular expression (`find_replace`).
    pub regex: Option<bool>,

    /// Maximum replacements; `-1` (default) means unlimited (`find_replace`).
    pub max_replacements: Option<i64>,

    /// Content to insert (`insert`).
    pub content: Option<String>,

    /// `start`, `end` (default), or `after_marker` (`insert`).
    pub position: Option<String>,

    /// Marker text to insert after (`insert` with `after_marker`).
    pub marker: Option<String>,
}
