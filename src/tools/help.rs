//! MCP `help` tool — parameter definition and the static guidance text.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Parameters for the `help` MCP tool.
#[derive(Debug, Default, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct HelpParams {
    /// Topic to focus on: `files`, `search`, `edit`, `tags`, `main`,
    /// `memory`, `extract`, or `list`. Omit for the full guide.
    #[schemars(
        description = "Topic: files, search, edit, tags, main, memory, extract, or list. Omit for the full guide."
    )]
    pub topic: Option<String>,
}

pub const TOPICS: &[(&str, &str)] = &[
    (
        "files",
        "File management: create, read, update, delete, move, copy, rename, list. \
         Every operation takes an array of items and returns one result per item.",
    ),
    (
        "search",
        "Search across memory: hybrid (vector + fulltext fused by reciprocal rank), \
         vector (semantic similarity), or fulltext (keyword). Takes an array of queries; \
         each supports limit, file_path, category_filter, and tag_filter.",
    ),
    (
        "edit",
        "Targeted edits: section (replace/append/prepend a section body by header), \
         find_replace (literal or regex), insert (start, end, or after_marker). \
         Takes an array of operations.",
    ),
    (
        "tags",
        "Tag management: add, remove, get. Tags are a set, so adding an existing tag \
         or removing an absent one succeeds without change.",
    ),
    (
        "main",
        "main.md operations: append (notes into a section), goal (add/complete/remove), \
         task (record a completed task), plan (add/complete).",
    ),
    (
        "memory",
        "Memory lifecycle: initialize creates main.md and files_index.json; reset \
         deletes every other file and truncates the search index.",
    ),
    (
        "extract",
        "Pull the body of a named section from any file, located the same way as \
         edit/section.",
    ),
    (
        "list",
        "Listings: files (flat list plus category tree) or sections (header outline \
         of one file).",
    ),
];

pub const FULL_GUIDE: &str = "\
# Agent Memory Guide

Persistent markdown memory with hybrid search. Notes live as markdown files \
under category directories (projects, concepts, conversations, preferences, \
other); main.md is the root index with goals, plans, and recent notes.

## Recommended workflow

1. `memory(initialize)` once to create the base structure.
2. `files(create, ...)` for durable topic notes; keep one file per project, \
concept, or conversation thread.
3. `search([...])` before answering questions that may touch stored context; \
hybrid mode is the default and usually the right choice.
4. `edit` / `tags` / `main` to keep notes current instead of appending \
duplicates.
5. `memory(reset)` only when the user explicitly asks to wipe memory.

## Batch semantics

Every tool takes an array and returns one result per input, in order. A \
failed item reports `{ok: false, error: {kind, message}}` and never aborts \
the rest of the batch.

## Examples

files(operation=\"create\", items=[{\"title\": \"Project Alpha\", \
\"category\": \"project\", \"content\": \"# Project Alpha\\n\\nKickoff notes.\"}])

search(queries=[{\"query\": \"alpha kickoff\", \"search_mode\": \"hybrid\", \
\"limit\": 10}])

edit(operations=[{\"file_path\": \"projects/project_alpha.md\", \
\"edit_type\": \"section\", \"section_header\": \"## Status\", \
\"new_content\": \"In progress\", \"mode\": \"replace\"}])

tags(operation=\"add\", items=[{\"file_path\": \"projects/project_alpha.md\", \
\"tags\": [\"active\"]}])

main(operation=\"goal\", items=[{\"goal\": \"Ship alpha\", \"action\": \"add\"}])
";
