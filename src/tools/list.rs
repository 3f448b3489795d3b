//! MCP `list` tool parameter definitions.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Parameters for the `list` MCP tool.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct ListParams {
    /// Listing requests; one result per request in input order.
    #[schemars(description = "Listing requests; one result per request in input order")]
    pub requests: Vec<ListRequest>,
}

/// One listing request.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct ListRequest {
    /// `files` for the flat list + category tree, `sections` for the
    /// header outline of one file.
    #[schemars(description = "Listing type: files or sections")]
    pub r#type: String,

    /// Optional category filter (`files`).
    pub category: Option<String>,

    /// File whose outline to return (`sections`).
    pub file_path: Option<String>,
}
