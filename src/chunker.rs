//! Markdown-aware chunking with header context preservation.
//!
//! Documents are split at header boundaries first, then oversized sections
//! are cut down to `chunk_size` characters with a graded break preference:
//! paragraph break, then line break, then sentence end, then word boundary,
//! then a hard cut. Successive chunks of the same section share
//! `chunk_overlap` trailing characters; overlap never crosses a header
//! transition. Identical input and parameters always produce the identical
//! chunk sequence.

use crate::types::sha256_hex;

/// One contiguous slice of a document, the unit of embedding and retrieval.
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    /// Dense 0-based position within the file.
    pub chunk_index: usize,
    pub content: String,
    /// SHA-256 of `content`.
    pub content_hash: String,
    /// Titles of the enclosing headers, outermost first.
    pub header_path: Vec<String>,
    /// Depth of the header stack (0 for text before any header).
    pub section_level: usize,
}

#[derive(Debug, Clone)]
pub struct Chunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

/// A run of text under one header stack.
struct Section {
    header_path: Vec<String>,
    level: usize,
    text: String,
    /// Char length of the leading header line, when the section starts with one.
    header_line_chars: Option<usize>,
}

impl Chunker {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        let chunk_size = chunk_size.max(1);
        // Overlap must leave room to make progress.
        let chunk_overlap = chunk_overlap.min(chunk_size.saturating_sub(1));
        Self {
            chunk_size,
            chunk_overlap,
        }
    }

    /// Split a markdown document into chunks in document order.
    pub fn chunk(&self, content: &str) -> Vec<Chunk> {
        let mut chunks = Vec::new();
        for section in parse_sections(content) {
            for piece in self.split_section(&section) {
                let trimmed = piece.trim();
                if trimmed.is_empty() {
                    continue;
                }
                chunks.push(Chunk {
                    chunk_index: chunks.len(),
                    content: trimmed.to_string(),
                    content_hash: sha256_hex(trimmed),
                    header_path: section.header_path.clone(),
                    section_level: section.level,
                });
            }
        }
        chunks
    }

    /// Split one section's text into pieces of at most `chunk_size` chars.
    fn split_section(&self, section: &Section) -> Vec<String> {
        let chars: Vec<char> = section.text.chars().collect();
        if chars.len() <= self.chunk_size {
            return vec![section.text.clone()];
        }

        let mut pieces = Vec::new();
        let mut start = 0usize;

        // A header line longer than the chunk size is emitted whole; hard
        // cuts never land inside a header line.
        if let Some(header_len) = section.header_line_chars {
            if header_len > self.chunk_size {
                pieces.push(chars[..header_len].iter().collect());
                start = header_len;
                if start < chars.len() && chars[start] == '\n' {
                    start += 1;
                }
            }
        }

        // Every chunk must end strictly past the previous chunk's end, so
        // that a break landing inside the overlap region cannot stall the
        // loop or emit pure-overlap chunks.
        let mut prev_end = start;

        while start < chars.len() {
            let end = (start + self.chunk_size).min(chars.len());
            if end == chars.len() {
                pieces.push(chars[start..].iter().collect());
                break;
            }

            let min_offset = prev_end.saturating_sub(start);
            let split = pick_break(&chars[start..end], min_offset)
                .map(|offset| start + offset)
                .unwrap_or(end);

            pieces.push(chars[start..split].iter().collect());
            prev_end = split;

            // Carry the tail of this chunk into the next one, but always
            // advance by at least one character.
            start = (split.saturating_sub(self.chunk_overlap)).max(start + 1);
        }

        pieces
    }
}

/// Choose the best break offset within a window, or `None` for a hard cut.
///
/// Preference: double newline > single newline > sentence end > word
/// boundary. The returned offset points just past the separator. Offsets
/// at or below `min_offset` are ignored.
fn pick_break(window: &[char], min_offset: usize) -> Option<usize> {
    let mut last_para = None;
    let mut last_line = None;
    let mut last_sentence = None;
    let mut last_word = None;

    for i in 0..window.len() {
        match window[i] {
            '\n' => {
                if i + 1 < window.len() && window[i + 1] == '\n' && i + 2 > min_offset {
                    last_para = Some(i + 2);
                }
                if i + 1 > min_offset {
                    last_line = Some(i + 1);
                }
            }
            '.' | '!' | '?' => {
                if i + 1 < window.len() && window[i + 1] == ' ' && i + 2 > min_offset {
                    last_sentence = Some(i + 2);
                }
            }
            ' ' => {
                if i + 1 > min_offset {
                    last_word = Some(i + 1);
                }
            }
            _ => {}
        }
    }

    last_para.or(last_line).or(last_sentence).or(last_word)
}

/// Parse a document into sections, one per header transition, tracking the
/// running header stack. Text before the first header forms a level-0
/// section.
fn parse_sections(content: &str) -> Vec<Section> {
    let mut sections: Vec<Section> = Vec::new();
    let mut stack: Vec<(usize, String)> = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    let mut current_header_chars: Option<usize> = None;

    let flush = |sections: &mut Vec<Section>,
                 stack: &[(usize, String)],
                 lines: &mut Vec<&str>,
                 header_chars: &mut Option<usize>| {
        if lines.is_empty() {
            return;
        }
        sections.push(Section {
            header_path: stack.iter().map(|(_, title)| title.clone()).collect(),
            level: stack.len(),
            text: lines.join("\n"),
            header_line_chars: header_chars.take(),
        });
        lines.clear();
    };

    for line in content.lines() {
        if let Some((level, title)) = parse_header(line) {
            flush(&mut sections, &stack, &mut current, &mut current_header_chars);
            while stack.last().is_some_and(|(l, _)| *l >= level) {
                stack.pop();
            }
            stack.push((level, title));
            current_header_chars = Some(line.chars().count());
            current.push(line);
        } else {
            current.push(line);
        }
    }
    flush(&mut sections, &stack, &mut current, &mut current_header_chars);

    sections
}

/// Parse a markdown ATX header line into (level, title).
fn parse_header(line: &str) -> Option<(usize, String)> {
    let trimmed = line.trim_start();
    let hashes = trimmed.chars().take_while(|&c| c == '#').count();
    if hashes == 0 || hashes > 6 {
        return None;
    }
    let rest = &trimmed[hashes..];
    if !rest.starts_with(' ') && !rest.is_empty() {
        return None;
    }
    let title = rest.trim().to_string();
    if title.is_empty() {
        return None;
    }
    Some((hashes, title))
}
