//! MCP `main` tool parameter definitions.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Parameters for the `main` MCP tool, which mutates fixed sections of
/// `main.md`.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct MainParams {
    /// `append`, `goal`, `task`, or `plan`.
    #[schemars(description = "Operation: append, goal, task, or plan")]
    pub operation: String,

    /// One entry per mutation.
    #[schemars(description = "One entry per mutation")]
    pub items: Vec<MainItem>,
}

/// One `main` batch item.
#[derive(Debug, Default, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct MainItem {
    /// Content to append (`append`).
    pub content: Option<String>,

    /// Target section for `append` (default `Recent Notes`).
    pub section: Option<String>,

    /// Goal text (`goal`).
    pub goal: Option<String>,

    /// Task text (`task`).
    pub task: Option<String>,

    /// Plan text (`plan`).
    pub plan: Option<String>,

    /// `add` (default), `complete`, or `remove` for goals; `add` or
    /// `complete` for plans.
    pub action: Option<String>,
}
