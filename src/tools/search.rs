//! MCP `search` tool parameter definitions.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Parameters for the `search` MCP tool.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct SearchParams {
    /// Queries to run; results come back in the same order.
    #[schemars(description = "Queries to run; results come back in the same order")]
    pub queries: Vec<SearchQuery>,
}

/// One search query.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct SearchQuery {
    /// Natural language or keyword query text.
    #[schemars(description = "Natural language or keyword query text")]
    pub query: String,

    /// `hybrid` (default), `vector`, or `fulltext`.
    #[schemars(description = "Search mode: hybrid (default), vector, or fulltext")]
    pub search_mode: Option<String>,

    /// Maximum results to return (default from SEARCH_LIMIT).
    #[schemars(description = "Maximum results to return")]
    pub limit: Option<usize>,

    /// Scope the search to a single file.
    #[schemars(description = "Scope the search to a single file path")]
    pub file_path: Option<String>,

    /// Only return chunks from files in this category.
    #[schemars(description = "Only return chunks from files in this category")]
    pub category_filter: Option<String>,

    /// Files must carry every listed tag.
    #[schemars(description = "Files must carry every listed tag")]
    pub tag_filter: Option<Vec<String>>,
}
