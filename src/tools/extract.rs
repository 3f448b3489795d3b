//! MCP `extract` tool parameter definitions.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Parameters for the `extract` MCP tool.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct ExtractParams {
    /// Sections to pull; one result per request in input order.
    #[schemars(description = "Sections to pull; one result per request in input order")]
    pub requests: Vec<ExtractRequest>,
}

/// One section extraction request.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct ExtractRequest {
    /// Path of the file to read.
    #[schemars(description = "Path of the file to read")]
    pub file_path: String,

    /// Section header to extract, e.g. `## Status`.
    #[schemars(description = "Section header to extract, e.g. '## Status'")]
    pub section_header: String,
}
