//! Markdown editing primitives.
//!
//! Pure functions over document text: section-scoped edits, literal and
//! regex find/replace, positional inserts, section extraction, and the
//! header outline. A section spans from its header line to the next header
//! of equal or shallower depth.

use regex::Regex;
use serde::Serialize;

use crate::error::{MemoryError, Result};
use crate::types::UpdateMode;

/// One entry in a document's header outline.
#[derive(Debug, Clone, Serialize)]
pub struct SectionInfo {
    pub level: usize,
    pub header: String,
    pub full_header: String,
}

/// Where to place inserted content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertPosition {
    Start,
    End,
    AfterMarker,
}

impl std::str::FromStr for InsertPosition {
    type Err = MemoryError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "start" => Ok(Self::Start),
            "end" => Ok(Self::End),
            "after_marker" => Ok(Self::AfterMarker),
            _ => Err(MemoryError::InvalidArgument(format!(
                "unknown insert position: {s} (expected start, end, or after_marker)"
            ))),
        }
    }
}

/// Replace, append to, or prepend to the body of a named section.
///
/// The header must exist; the body runs to the next header of equal or
/// shallower depth.
pub fn edit_section(
    content: &str,
    section_header: &str,
    new_content: &str,
    mode: UpdateMode,
) -> Result<String> {
    let header = normalize_header(section_header);
    let bounds = locate_section(content, &header)
        .ok_or_else(|| MemoryError::NotFound(format!("section not found: {header}")))?;

    let lines: Vec<&str> = content.lines().collect();
    let existing_body = lines[bounds.body_start..bounds.body_end].join("\n");
    let existing_body = existing_body.trim();

    let body = match mode {
        UpdateMode::Replace => new_content.trim().to_string(),
        UpdateMode::Append if existing_body.is_empty() => new_content.trim().to_string(),
        UpdateMode::Append => format!("{existing_body}\n\n{}", new_content.trim()),
        UpdateMode::Prepend if existing_body.is_empty() => new_content.trim().to_string(),
        UpdateMode::Prepend => format!("{}\n\n{existing_body}", new_content.trim()),
    };

    let mut out: Vec<String> = Vec::with_capacity(lines.len() + 4);
    out.extend(lines[..=bounds.header_line].iter().map(|l| l.to_string()));
    out.push(String::new());
    out.extend(body.lines().map(|l| l.to_string()));
    if bounds.body_end < lines.len() {
        out.push(String::new());
        out.extend(lines[bounds.body_end..].iter().map(|l| l.to_string()));
    }
    Ok(ensure_trailing_newline(out.join("\n")))
}

/// Extract a section body. `NotFound` when the header is absent.
pub fn extract_section(content: &str, section_header: &str) -> Result<String> {
    let header = normalize_header(section_header);
    let bounds = locate_section(content, &header)
        .ok_or_else(|| MemoryError::NotFound(format!("section not found: {header}")))?;
    let lines: Vec<&str> = content.lines().collect();
    Ok(lines[bounds.body_start..bounds.body_end]
        .join("\n")
        .trim()
        .to_string())
}

/// Literal or regex find/replace. `max_replacements = -1` means unlimited.
///
/// Returns the updated content and the number of replacements made.
pub fn find_and_replace(
    content: &str,
    find: &str,
    replace: &str,
    use_regex: bool,
    max_replacements: i64,
) -> Result<(String, usize)> {
    if find.is_empty() {
        return Err(MemoryError::InvalidArgument(
            "find pattern must not be empty".into(),
        ));
    }
    if max_replacements == 0 {
        return Ok((content.to_string(), 0));
    }

    if use_regex {
        let re = Regex::new(find)
            .map_err(|e| MemoryError::InvalidArgument(format!("invalid regex: {e}")))?;
        let total = re.find_iter(content).count();
        let count = if max_replacements < 0 {
            total
        } else {
            total.min(max_replacements as usize)
        };
        let updated = if max_replacements < 0 {
            re.replace_all(content, replace).into_owned()
        } else {
            re.replacen(content, max_replacements as usize, replace)
                .into_owned()
        };
        Ok((updated, count))
    } else {
        let total = content.matches(find).count();
        if max_replacements < 0 {
            Ok((content.replace(find, replace), total))
        } else {
            let count = total.min(max_replacements as usize);
            Ok((content.replacen(find, replace, count), count))
        }
    }
}

/// Insert content at the start, end, or after a literal marker.
///
/// `after_marker` requires `marker` and fails `NotFound` when the marker is
/// absent.
pub fn insert_at_position(
    content: &str,
    insert_content: &str,
    position: InsertPosition,
    marker: Option<&str>,
) -> Result<String> {
    match position {
        InsertPosition::Start => Ok(format!("{insert_content}\n\n{content}")),
        InsertPosition::End => Ok(format!(
            "{}\n\n{insert_content}\n",
            content.trim_end_matches('\n')
        )),
        InsertPosition::AfterMarker => {
            let marker = marker.ok_or_else(|| {
                MemoryError::InvalidArgument(
                    "marker is required for after_marker insertion".into(),
                )
            })?;
            if marker.is_empty() {
                return Err(MemoryError::InvalidArgument(
                    "marker must not be empty".into(),
                ));
            }
            let Some(pos) = content.find(marker) else {
                return Err(MemoryError::NotFound(format!("marker not found: {marker}")));
            };
            let (before, after) = content.split_at(pos + marker.len());
            Ok(format!("{before}\n\n{insert_content}\n{after}"))
        }
    }
}

/// Outline of every header in the document, in order.
pub fn list_sections(content: &str) -> Vec<SectionInfo> {
    content
        .lines()
        .filter_map(|line| {
            header_level(line).map(|level| SectionInfo {
                level,
                header: line.trim_start_matches('#').trim().to_string(),
                full_header: line.trim().to_string(),
            })
        })
        .collect()
}

// ── Internal helpers ──────────────────────────────────────────────────────────

struct SectionBounds {
    header_line: usize,
    body_start: usize,
    /// Exclusive line index where the body ends.
    body_end: usize,
}

/// Bare section names get the `## ` prefix so callers can pass "Goals" or
/// "## Goals" interchangeably.
fn normalize_header(section_header: &str) -> String {
    let trimmed = section_header.trim();
    if trimmed.starts_with('#') {
        trimmed.to_string()
    } else {
        format!("## {trimmed}")
    }
}

fn header_level(line: &str) -> Option<usize> {
    let trimmed = line.trim_start();
    let hashes = trimmed.chars().take_while(|&c| c == '#').count();
    if hashes == 0 || hashes > 6 {
        return None;
    }
    let rest = &trimmed[hashes..];
    if rest.starts_with(' ') && !rest.trim().is_empty() {
        Some(hashes)
    } else {
        None
    }
}

fn locate_section(content: &str, header: &str) -> Option<SectionBounds> {
    let depth = header_level(header)?;
    let lines: Vec<&str> = content.lines().collect();
    let header_line = lines.iter().position(|line| line.trim() == header)?;

    let mut body_end = lines.len();
    for (offset, line) in lines[header_line + 1..].iter().enumerate() {
        if let Some(level) = header_level(line) {
            if level <= depth {
                body_end = header_line + 1 + offset;
                break;
            }
        }
    }

    Some(SectionBounds {
        header_line,
        body_start: header_line + 1,
        body_end,
    })
}

fn ensure_trailing_newline(mut content: String) -> String {
    if !content.ends_with('\n') {
        content.push('\n');
    }
    content
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = "# Title\n\nintro\n\n## Goals\n\n- goal one\n- goal two\n\n### Detail\n\nnested\n\n## Notes\n\nsome notes\n";

    #[test]
    fn replace_section_body() {
        let updated = edit_section(DOC, "## Goals", "- new goal", UpdateMode::Replace).unwrap();
        assert!(updated.contains("## Goals\n\n- new goal"));
        assert!(!updated.contains("goal one"));
        // Deeper subsection is part of the body and is replaced with it.
        assert!(!updated.contains("### Detail"));
        // Sibling section untouched.
        assert!(updated.contains("## Notes\n\nsome notes"));
    }

    #[test]
    fn append_keeps_existing_body() {
        let updated = edit_section(DOC, "## Notes", "more notes", UpdateMode::Append).unwrap();
        assert!(updated.contains("some notes\n\nmore notes"));
    }

    #[test]
    fn prepend_puts_new_content_first() {
        let updated = edit_section(DOC, "## Notes", "urgent", UpdateMode::Prepend).unwrap();
        assert!(updated.contains("## Notes\n\nurgent\n\nsome notes"));
    }

    #[test]
    fn section_body_stops_at_equal_or_shallower_header() {
        // Editing "### Detail" must not consume the following "## Notes".
        let updated = edit_section(DOC, "### Detail", "changed", UpdateMode::Replace).unwrap();
        assert!(updated.contains("### Detail\n\nchanged"));
        assert!(updated.contains("## Notes"));
    }

    #[test]
    fn missing_section_is_not_found() {
        let err = edit_section(DOC, "## Absent", "x", UpdateMode::Replace).unwrap_err();
        assert!(matches!(err, MemoryError::NotFound(_)));
    }

    #[test]
    fn bare_section_name_gets_h2_prefix() {
        let body = extract_section(DOC, "Goals").unwrap();
        assert!(body.contains("goal one"));
    }

    #[test]
    fn extract_returns_trimmed_body() {
        let body = extract_section(DOC, "## Notes").unwrap();
        assert_eq!(body, "some notes");
        assert!(matches!(
            extract_section(DOC, "## Nope"),
            Err(MemoryError::NotFound(_))
        ));
    }

    #[test]
    fn find_replace_literal_all() {
        let (updated, n) = find_and_replace("a b a b a", "a", "x", false, -1).unwrap();
        assert_eq!(updated, "x b x b x");
        assert_eq!(n, 3);
    }

    #[test]
    fn find_replace_respects_max() {
        let (updated, n) = find_and_replace("a a a", "a", "x", false, 2).unwrap();
        assert_eq!(updated, "x x a");
        assert_eq!(n, 2);
    }

    #[test]
    fn find_replace_regex() {
        let (updated, n) =
            find_and_replace("item-1 item-2 item-30", r"item-\d+", "item", true, -1).unwrap();
        assert_eq!(updated, "item item item");
        assert_eq!(n, 3);
    }

    #[test]
    fn find_replace_empty_pattern_is_invalid() {
        let err = find_and_replace("text", "", "x", false, -1).unwrap_err();
        assert!(matches!(err, MemoryError::InvalidArgument(_)));
    }

    #[test]
    fn find_replace_bad_regex_is_invalid() {
        let err = find_and_replace("text", "[unclosed", "x", true, -1).unwrap_err();
        assert!(matches!(err, MemoryError::InvalidArgument(_)));
    }

    #[test]
    fn find_replace_no_matches_is_zero_not_error() {
        let (updated, n) = find_and_replace("text", "absent", "x", false, -1).unwrap();
        assert_eq!(updated, "text");
        assert_eq!(n, 0);
    }

    #[test]
    fn insert_start_and_end() {
        let updated =
            insert_at_position("body\n", "top", InsertPosition::Start, None).unwrap();
        assert!(updated.starts_with("top\n\nbody"));

        let updated = insert_at_position("body\n", "tail", InsertPosition::End, None).unwrap();
        assert_eq!(updated, "body\n\ntail\n");
    }

    #[test]
    fn insert_after_marker() {
        let updated = insert_at_position(
            "before MARK after",
            "inserted",
            InsertPosition::AfterMarker,
            Some("MARK"),
        )
        .unwrap();
        assert!(updated.contains("MARK\n\ninserted\n after"));
    }

    #[test]
    fn insert_after_missing_marker_is_not_found() {
        let err = insert_at_position("text", "x", InsertPosition::AfterMarker, Some("NOPE"))
            .unwrap_err();
        assert!(matches!(err, MemoryError::NotFound(_)));
    }

    #[test]
    fn insert_after_marker_without_marker_is_invalid() {
        let err = insert_at_position("text", "x", InsertPosition::AfterMarker, None).unwrap_err();
        assert!(matches!(err, MemoryError::InvalidArgument(_)));
    }

    #[test]
    fn outline_lists_headers_in_order() {
        let sections = list_sections(DOC);
        let headers: Vec<&str> = sections.iter().map(|s| s.header.as_str()).collect();
        assert_eq!(headers, vec!["Title", "Goals", "Detail", "Notes"]);
        assert_eq!(sections[0].level, 1);
        assert_eq!(sections[2].level, 3);
        assert_eq!(sections[1].full_header, "## Goals");
    }
}
