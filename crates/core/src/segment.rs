//! Splits raw lesson text into prose and `table` fence segments.
//!
//! Ad-hoc pipe tables outside fences are removed (or, with
//! [`TableOptions::wrap_pipe_tables`], promoted to table segments) so the
//! markdown parser never produces an unstyled default table.

use crate::options::TableOptions;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SegmentKind {
    Prose,
    Table,
}

/// A contiguous region of the input. Table segments hold the fence's inner
/// lines only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub kind: SegmentKind,
    pub content: String,
}

impl Segment {
    fn new(kind: SegmentKind, content: String) -> Self {
        Self { kind, content }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct CodeFence {
    marker: char,
    len: usize,
}

impl CodeFence {
    fn open(trimmed: &str) -> Option<Self> {
        let marker = trimmed.chars().next().filter(|c| *c == '`' || *c == '~')?;
        let len = trimmed.chars().take_while(|c| *c == marker).count();
        (len >= 3).then_some(Self { marker, len })
    }

    fn closes(&self, trimmed: &str) -> bool {
        trimmed.chars().all(|c| c == self.marker)
            && trimmed.chars().count() >= self.len
    }
}

fn opens_table_fence(trimmed: &str) -> bool {
    trimmed
        .strip_prefix("```")
        .is_some_and(|rest| rest.trim() == "table")
}

fn closes_table_fence(trimmed: &str) -> bool {
    trimmed.len() >= 3 && trimmed.chars().all(|c| c == '`')
}

fn is_table_row(line: &str) -> bool {
    let trimmed = line.trim();
    trimmed.len() >= 2 && trimmed.starts_with('|') && trimmed.ends_with('|')
}

fn is_separator_row(line: &str) -> bool {
    let trimmed = line.trim();
    is_table_row(line)
        && trimmed.contains('-')
        && trimmed
            .chars()
            .all(|c| matches!(c, '|' | '-' | ':' | ' ' | '\t'))
}

/// Splits `input` into ordered segments.
///
/// Prose segments are never empty. An unterminated `table` fence runs to the
/// end of the input. Pipe tables inside any fence are left alone.
pub fn split_segments(input: &str, options: &TableOptions) -> Vec<Segment> {
    let lines: Vec<&str> = input.split_inclusive('\n').collect();
    let mut segments = Vec::new();
    let mut prose = String::new();
    let mut code_fence: Option<CodeFence> = None;
    let mut i = 0;

    while i < lines.len() {
        let line = lines[i];
        let trimmed = line.trim();

        if let Some(fence) = code_fence {
            if fence.closes(trimmed) {
                code_fence = None;
            }
            prose.push_str(line);
            i += 1;
            continue;
        }

        if opens_table_fence(trimmed) {
            flush(&mut segments, &mut prose);
            let mut table = String::new();
            i += 1;
            while i < lines.len() && !closes_table_fence(lines[i].trim()) {
                table.push_str(lines[i]);
                i += 1;
            }
            if i == lines.len() {
                tracing::debug!("unterminated table fence, treating rest of input as table");
            }
            segments.push(Segment::new(SegmentKind::Table, table));
            i += 1;
            continue;
        }

        if let Some(fence) = CodeFence::open(trimmed) {
            code_fence = Some(fence);
            prose.push_str(line);
            i += 1;
            continue;
        }

        if is_table_row(line) && lines.get(i + 1).is_some_and(|next| is_separator_row(next)) {
            let end = lines[i + 2..]
                .iter()
                .position(|row| !is_table_row(row))
                .map_or(lines.len(), |offset| i + 2 + offset);
            if options.wrap_pipe_tables {
                flush(&mut segments, &mut prose);
                segments.push(Segment::new(SegmentKind::Table, lines[i..end].concat()));
            } else {
                tracing::debug!(rows = end - i, "stripped ad-hoc markdown table");
            }
            i = end;
            continue;
        }

        prose.push_str(line);
        i += 1;
    }

    flush(&mut segments, &mut prose);
    tracing::trace!(segments = segments.len(), "split lesson content");
    segments
}

fn flush(segments: &mut Vec<Segment>, prose: &mut String) {
    if !prose.is_empty() {
        segments.push(Segment::new(SegmentKind::Prose, std::mem::take(prose)));
    }
}
