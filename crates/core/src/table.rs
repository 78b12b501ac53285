//! The `table` fence mini-language.
//!
//! One row per line. Lines with `|` outside math are pipe-delimited (outer
//! pipes optional, separator rows skipped); other lines are comma-delimited.
//! Delimiters inside `$…$` never split a cell. The first row is the header.

use crate::node::{Node, Table, TableCell};
use crate::options::MarkdownOptions;
use crate::tokenize::math_spans;
use crate::tree_builder::{TagRewrites, build_prose};

fn is_separator(line: &str) -> bool {
    line.contains('-') && line.chars().all(|c| matches!(c, '|' | '-' | ':' | ' ' | '\t'))
}

/// Splits on `delimiter` outside `$…$` / `$$…$$` runs.
fn split_outside_math(line: &str, delimiter: char) -> Vec<&str> {
    let spans: Vec<_> = math_spans(line).collect();
    let mut cells = Vec::new();
    let mut start = 0;
    for (at, ch) in line.char_indices() {
        if ch == delimiter && !spans.iter().any(|span| span.contains(&at)) {
            cells.push(line[start..at].trim());
            start = at + ch.len_utf8();
        }
    }
    cells.push(line[start..].trim());
    cells
}

fn split_row(line: &str) -> Vec<&str> {
    let pipes = split_outside_math(line, '|');
    if pipes.len() == 1 {
        return split_outside_math(line, ',');
    }
    let mut cells = pipes.as_slice();
    if line.starts_with('|') {
        cells = &cells[1..];
    }
    if line.ends_with('|') {
        cells = &cells[..cells.len().saturating_sub(1)];
    }
    cells.to_vec()
}

/// Parses table rows into string cells.
pub fn parse_rows(content: &str) -> Vec<Vec<&str>> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !is_separator(line))
        .map(split_row)
        .collect()
}

/// Inline markdown of one cell. Anything that does not parse to exactly one
/// paragraph (lists, headings, …) is kept as literal text.
fn cell_content(cell: &str, markdown: &MarkdownOptions, rewrites: &TagRewrites) -> Vec<Node> {
    if cell.is_empty() {
        return Vec::new();
    }
    let mut nodes = build_prose(cell, markdown, rewrites);
    if let [Node::Element(paragraph)] = nodes.as_mut_slice() {
        if paragraph.tag == rewrites.paragraph.tag && paragraph.attributes.is_empty() {
            return std::mem::take(&mut paragraph.children);
        }
    }
    vec![Node::text(cell)]
}

/// Builds the synthesized table node for a table segment.
///
/// Returns `None` when the segment has no rows.
pub fn build_table(content: &str, markdown: &MarkdownOptions, rewrites: &TagRewrites) -> Option<Node> {
    let mut rows = parse_rows(content).into_iter();
    let Some(header) = rows.next() else {
        tracing::debug!("empty table segment skipped");
        return None;
    };

    let cell = |text: &str| TableCell {
        children: vec![Node::Element(rewrites.table_cell.apply(cell_content(text, markdown, rewrites)))],
    };
    let header_cell = |text: &str| TableCell {
        children: vec![Node::Element(
            rewrites
                .table_header_cell
                .apply(cell_content(text, markdown, rewrites)),
        )],
    };

    Some(Node::Table(Table {
        head: header.into_iter().map(header_cell).collect(),
        rows: rows
            .map(|row| row.into_iter().map(&cell).collect())
            .collect(),
    }))
}
