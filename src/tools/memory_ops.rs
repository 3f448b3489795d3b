//! MCP `memory` tool parameter definitions.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Parameters for the `memory` MCP tool.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct MemoryParams {
    /// `initialize` creates the base structure; `reset` deletes everything
    /// except `main.md` and `files_index.json` and truncates the index.
    #[schemars(description = "Operation: initialize or reset")]
    pub operation: String,
}
