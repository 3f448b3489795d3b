//! Core domain type definitions.
//!
//! Defines [`Category`] (the fixed set of memory file categories), the
//! [`FileEntry`] metadata record mirrored in `files_index.json`, and the
//! small derivation helpers (slug, word count, description) every layer
//! shares.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::error::MemoryError;

/// Name of the sentinel file at the memory root.
pub const MAIN_FILE: &str = "main.md";

/// The fixed set of memory file categories. Also determines the on-disk
/// directory a file lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// The `main.md` sentinel — never created through the files tool.
    Main,
    Project,
    Concept,
    Conversation,
    Preference,
    Other,
}

impl Category {
    /// SQL-compatible string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Main => "main",
            Self::Project => "project",
            Self::Concept => "concept",
            Self::Conversation => "conversation",
            Self::Preference => "preference",
            Self::Other => "other",
        }
    }

    /// Directory segment this category's files live under.
    pub fn dir_name(&self) -> &'static str {
        match self {
            Self::Main => "",
            Self::Project => "projects",
            Self::Concept => "concepts",
            Self::Conversation => "conversations",
            Self::Preference => "preferences",
            Self::Other => "other",
        }
    }

    /// Categories that own a subdirectory under the memory root.
    pub fn subdirs() -> [Category; 5] {
        [
            Self::Project,
            Self::Concept,
            Self::Conversation,
            Self::Preference,
            Self::Other,
        ]
    }

    /// Derive the category from a relative file path. `main.md` maps to
    /// `Main`; unknown directories map to `Other`.
    pub fn from_path(file_path: &str) -> Category {
        if file_path == MAIN_FILE {
            return Self::Main;
        }
        match file_path.split('/').next() {
            Some("projects") => Self::Project,
            Some("concepts") => Self::Concept,
            Some("conversations") => Self::Conversation,
            Some("preferences") => Self::Preference,
            _ => Self::Other,
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Category {
    type Err = MemoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "main" => Ok(Self::Main),
            "project" => Ok(Self::Project),
            "concept" => Ok(Self::Concept),
            "conversation" => Ok(Self::Conversation),
            "preference" => Ok(Self::Preference),
            "other" => Ok(Self::Other),
            _ => Err(MemoryError::InvalidArgument(format!(
                "unknown category: {s} (expected project, concept, conversation, preference, or other)"
            ))),
        }
    }
}

/// How new content combines with existing content on update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum UpdateMode {
    #[default]
    Replace,
    Append,
    Prepend,
}

impl std::str::FromStr for UpdateMode {
    type Err = MemoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "replace" => Ok(Self::Replace),
            "append" => Ok(Self::Append),
            "prepend" => Ok(Self::Prepend),
            _ => Err(MemoryError::InvalidArgument(format!(
                "unknown update mode: {s} (expected replace, append, or prepend)"
            ))),
        }
    }
}

/// Metadata for one memory file, as stored in `files_index.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileEntry {
    pub file_path: String,
    pub title: String,
    pub category: Category,
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
    pub created_at: String,
    pub updated_at: String,
    pub word_count: usize,
}

impl FileEntry {
    /// Build a fresh entry with both timestamps set to now.
    pub fn new(file_path: &str, title: &str, category: Category, content: &str) -> Self {
        let now = Utc::now().to_rfc3339();
        Self {
            file_path: file_path.to_string(),
            title: title.to_string(),
            category,
            description: extract_description(content).unwrap_or_else(|| title.to_string()),
            tags: Vec::new(),
            metadata: serde_json::Map::new(),
            created_at: now.clone(),
            updated_at: now,
            word_count: word_count(content),
        }
    }
}

/// Derive a filesystem slug from a title: lowercased, every run of
/// non-alphanumeric characters collapsed to a single underscore.
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut last_was_sep = true;
    for c in title.chars() {
        if c.is_alphanumeric() {
            slug.extend(c.to_lowercase());
            last_was_sep = false;
        } else if !last_was_sep {
            slug.push('_');
            last_was_sep = true;
        }
    }
    slug.trim_end_matches('_').to_string()
}

/// Count words: whitespace-separated tokens that contain at least one
/// alphanumeric character. Bare markdown punctuation (`#`, `---`) does not
/// count.
pub fn word_count(content: &str) -> usize {
    content
        .split_whitespace()
        .filter(|token| token.chars().any(|c| c.is_alphanumeric()))
        .count()
}

/// First non-header paragraph of a markdown document, used as the short
/// description in the JSON index.
pub fn extract_description(content: &str) -> Option<String> {
    let mut paragraph: Vec<&str> = Vec::new();
    for line in content.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            if !paragraph.is_empty() {
                break;
            }
            continue;
        }
        if trimmed.starts_with('#') || trimmed.starts_with("<!--") || trimmed == "---" {
            if !paragraph.is_empty() {
                break;
            }
            continue;
        }
        paragraph.push(trimmed);
    }
    if paragraph.is_empty() {
        None
    } else {
        Some(paragraph.join(" "))
    }
}

/// SHA-256 of a UTF-8 string as a lowercase hex digest.
pub fn sha256_hex(data: &str) -> String {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(data.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Derive a display title from a slug (`project_alpha` → `Project Alpha`).
pub fn title_from_slug(slug: &str) -> String {
    slug.split('_')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
