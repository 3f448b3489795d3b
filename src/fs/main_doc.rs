//! The `main.md` sentinel document.
//!
//! Holds the canonical section skeleton written by `initialize`/`reset`
//! and the section-level operations behind the `main` tool: appending
//! notes, goal/task/plan bookkeeping, and the File Index links that point
//! at every other memory file.

use chrono::Utc;
use regex::Regex;

use crate::editor;
use crate::error::{MemoryError, Result};
use crate::types::{Category, UpdateMode};

pub const FILE_INDEX_SECTION: &str = "## File Index";
pub const GOALS_SECTION: &str = "## Current Goals";
pub const COMPLETED_SECTION: &str = "## Completed Tasks";
pub const FUTURE_PLANS_SECTION: &str = "## Future Plans";
pub const PLANS_SECTION: &str = "## Plans";
pub const NOTES_SECTION: &str = "## Recent Notes";
pub const REFERENCE_SECTION: &str = "## Quick Reference";

/// The base `main.md` skeleton, stamped with today's date.
pub fn base_template() -> String {
    let today = Utc::now().format("%Y-%m-%d");
    format!(
        "# Agent Memory - Main Notes\n\
         \n\
         Last Updated: {today}\n\
         \n\
         ## File Index\n\
         \n\
         This section maintains an index of all specialized memory files with descriptions.\n\
         \n\
         ### Projects\n\
         <!-- Add project files here -->\n\
         \n\
         ### Concepts\n\
         <!-- Add concept files here -->\n\
         \n\
         ### Conversations\n\
         <!-- Add conversation files here -->\n\
         \n\
         ### Preferences\n\
         <!-- Add preference files here -->\n\
         \n\
         ### Other\n\
         <!-- Add other files here -->\n\
         \n\
         ---\n\
         \n\
         ## Current Goals\n\
         \n\
         <!-- Active goals that the agent is working towards -->\n\
         \n\
         ---\n\
         \n\
         ## Completed Tasks\n\
         \n\
         <!-- Tasks that have been completed with dates -->\n\
         \n\
         ---\n\
         \n\
         ## Plans\n\
         \n\
         <!-- Active plans being tracked -->\n\
         \n\
         ---\n\
         \n\
         ## Future Plans\n\
         \n\
         <!-- Long-term plans and ideas for the future -->\n\
         \n\
         ---\n\
         \n\
         ## Recent Notes\n\
         \n\
         <!-- Recent session notes and important observations -->\n\
         \n\
         ---\n\
         \n\
         ## Quick Reference\n\
         \n\
         <!-- Quick access to frequently needed information -->\n"
    )
}

/// Append content to a named section and refresh the `Last Updated:` line.
pub fn append_to_section(content: &str, section: &str, addition: &str) -> Result<String> {
    let updated = editor::edit_section(content, section, addition, UpdateMode::Append)?;
    Ok(touch_last_updated(&updated))
}

/// Add a goal as an unchecked item under Current Goals.
pub fn add_goal(content: &str, goal: &str) -> Result<String> {
    append_to_section(content, GOALS_SECTION, &format!("- [ ] {goal}"))
}

/// Move a goal from Current Goals to Completed Tasks with today's date.
pub fn complete_goal(content: &str, goal: &str) -> Result<String> {
    let line = format!("- [ ] {goal}");
    if !has_line(content, &line) {
        return Err(MemoryError::NotFound(format!("goal not found: {goal}")));
    }
    let without = remove_line(content, &line);
    let today = Utc::now().format("%Y-%m-%d");
    append_to_section(
        &without,
        COMPLETED_SECTION,
        &format!("- [x] {goal} (completed {today})"),
    )
}

/// Remove a goal from Current Goals.
pub fn remove_goal(content: &str, goal: &str) -> Result<String> {
    let line = format!("- [ ] {goal}");
    if !has_line(content, &line) {
        return Err(MemoryError::NotFound(format!("goal not found: {goal}")));
    }
    Ok(touch_last_updated(&remove_line(content, &line)))
}

/// Record a completed task with today's date.
pub fn add_task(content: &str, task: &str) -> Result<String> {
    let today = Utc::now().format("%Y-%m-%d");
    append_to_section(
        content,
        COMPLETED_SECTION,
        &format!("- [x] {task} (completed {today})"),
    )
}

/// Add a plan as an unchecked item under Plans.
pub fn add_plan(content: &str, plan: &str) -> Result<String> {
    append_to_section(content, PLANS_SECTION, &format!("- [ ] {plan}"))
}

/// Check off a plan in place.
pub fn complete_plan(content: &str, plan: &str) -> Result<String> {
    let open = format!("- [ ] {plan}");
    if !has_line(content, &open) {
        return Err(MemoryError::NotFound(format!("plan not found: {plan}")));
    }
    let updated = content.replacen(&open, &format!("- [x] {plan}"), 1);
    Ok(touch_last_updated(&updated))
}

/// Add or update a file's link in the File Index category subsection.
pub fn upsert_file_link(
    content: &str,
    file_path: &str,
    title: &str,
    description: &str,
    category: Category,
) -> Result<String> {
    let subsection = category_subsection(category)?;
    let link = format!("- [{title}](/memory_files/{file_path}) - {description}");

    let lines: Vec<&str> = content.lines().collect();
    let Some(header_line) = lines.iter().position(|l| l.trim() == subsection) else {
        // Older trees may predate a category subsection; leave the index as is.
        tracing::warn!(category = %category, "category subsection missing from main.md");
        return Ok(content.to_string());
    };

    let needle = format!("(/memory_files/{file_path})");
    let mut out: Vec<String> = lines.iter().map(|l| l.to_string()).collect();

    // Subsection body ends at the next header or horizontal rule.
    let mut body_end = out.len();
    for (offset, line) in lines[header_line + 1..].iter().enumerate() {
        let t = line.trim();
        if t.starts_with('#') || t == "---" {
            body_end = header_line + 1 + offset;
            break;
        }
    }

    if let Some(existing) = out[header_line..body_end]
        .iter()
        .position(|l| l.contains(&needle))
    {
        out[header_line + existing] = link;
    } else {
        // Insert before the blank lines that pad the next header.
        let mut insert_at = body_end;
        while insert_at > header_line + 1 && out[insert_at - 1].trim().is_empty() {
            insert_at -= 1;
        }
        out.insert(insert_at, link);
    }

    Ok(touch_last_updated(&ensure_newline(out.join("\n"))))
}

/// Drop a file's link from the File Index, wherever it is.
pub fn remove_file_link(content: &str, file_path: &str) -> String {
    let needle = format!("(/memory_files/{file_path})");
    let kept: Vec<&str> = content
        .lines()
        .filter(|line| !line.contains(&needle))
        .collect();
    touch_last_updated(&ensure_newline(kept.join("\n")))
}

fn category_subsection(category: Category) -> Result<&'static str> {
    match category {
        Category::Project => Ok("### Projects"),
        Category::Concept => Ok("### Concepts"),
        Category::Conversation => Ok("### Conversations"),
        Category::Preference => Ok("### Preferences"),
        Category::Other => Ok("### Other"),
        Category::Main => Err(MemoryError::InvalidArgument(
            "main.md is not indexed in its own File Index".into(),
        )),
    }
}

fn has_line(content: &str, line: &str) -> bool {
    content.lines().any(|l| l.trim() == line)
}

fn remove_line(content: &str, line: &str) -> String {
    let kept: Vec<&str> = content.lines().filter(|l| l.trim() != line).collect();
    ensure_newline(kept.join("\n"))
}

fn touch_last_updated(content: &str) -> String {
    let today = Utc::now().format("%Y-%m-%d").to_string();
    let re = Regex::new(r"Last Updated: .*").expect("static regex");
    re.replace(content, format!("Last Updated: {today}"))
        .into_owned()
}

fn ensure_newline(mut content: String) -> String {
    if !content.ends_with('\n') {
        content.push('\n');
    }
    content
}
