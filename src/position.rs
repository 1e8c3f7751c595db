//! Coarse coordinate mapping from raw offsets to page positions.
//!
//! This is approximate, deterministic layout inference, not a structural
//! parse. Paragraph ordinals come from counting paragraph-start markers
//! before an offset; table context from bounded linear backward scans; and
//! the point geometry from a fixed-leading, fixed-advance model with no
//! per-run font metrics. Given the same layout and offset, the result is
//! always the same.

use crate::layout::DocumentLayout;
use memchr::memmem;
use serde::{Deserialize, Serialize};

/// Default font size (points) for width estimation.
pub const DEFAULT_FONT_SIZE: f64 = 12.0;

/// Paragraph and table context for a raw offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParagraphContext {
    /// 1-based paragraph ordinal up to the offset
    pub index: u32,
    /// Whether the offset sits inside a table
    pub in_table: bool,
    /// 1-based row estimate when inside a table, 0 otherwise
    pub table_row: u32,
    /// 1-based cell estimate when inside a table, 0 otherwise
    pub table_col: u32,
}

/// Point geometry for a token on the page.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TokenGeometry {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    /// 1-based page number
    pub page: u32,
}

/// Count occurrences of an element-start marker in `text`.
///
/// `prefix` is an opening like `<w:p`; a hit only counts when the next byte
/// closes the name (`>`, whitespace, or `/`), so `<w:p` never matches
/// `<w:pPr`.
fn count_starts(text: &[u8], prefix: &str) -> u32 {
    let finder = memmem::Finder::new(prefix);
    let mut count = 0;
    for hit in finder.find_iter(text) {
        if text.get(hit + prefix.len()).is_some_and(ends_name) {
            count += 1;
        }
    }
    count
}

/// Whether a byte terminates an element name. XML permits any whitespace
/// between the name and the first attribute, not just a space.
fn ends_name(byte: &u8) -> bool {
    matches!(byte, b'>' | b'/' | b' ' | b'\t' | b'\r' | b'\n')
}

/// Find the last element-start marker at or before the end of `text`.
fn last_start(text: &[u8], prefix: &str) -> Option<usize> {
    let finder = memmem::Finder::new(prefix);
    let mut last = None;
    for hit in finder.find_iter(text) {
        if text.get(hit + prefix.len()).is_some_and(ends_name) {
            last = Some(hit);
        }
    }
    last
}

/// Derive the paragraph and table context for a raw byte offset.
///
/// The paragraph ordinal counts `<w:p>` starts strictly before the offset
/// (1-based, so an offset before the first paragraph is still paragraph 1).
/// A position is inside a table when the nearest preceding table start is
/// closer than the nearest preceding table end; row and cell are estimated
/// by counting `<w:tr>`/`<w:tc>` starts since the table start.
pub fn paragraph_context(raw: &str, offset: usize) -> ParagraphContext {
    let offset = offset.min(raw.len());
    let before = &raw.as_bytes()[..offset];

    // A token inside paragraph N has N start markers before it, its own
    // paragraph's included. An offset before any paragraph is still 1.
    let index = count_starts(before, "<w:p").max(1);

    let table_start = last_start(before, "<w:tbl");
    let table_end = memmem::rfind(before, b"</w:tbl>");
    let in_table = match (table_start, table_end) {
        (Some(start), Some(end)) => start > end,
        (Some(_), None) => true,
        _ => false,
    };

    let (table_row, table_col) = if in_table {
        let start = table_start.unwrap_or(0);
        let since_table = &before[start..];
        let row = count_starts(since_table, "<w:tr").max(1);
        let last_row = last_start(since_table, "<w:tr").unwrap_or(0);
        let col = count_starts(&since_table[last_row..], "<w:tc").max(1);
        (row, col)
    } else {
        (0, 0)
    };

    ParagraphContext {
        index,
        in_table,
        table_row,
        table_col,
    }
}

/// Compute point geometry for a token from its paragraph context.
///
/// `text_chars` is the token literal's length in characters; `font_size`
/// drives the fixed-advance width estimate (0.6 em per character) and the
/// line box height (1.2 em).
pub fn locate(
    layout: &DocumentLayout,
    context: &ParagraphContext,
    text_chars: usize,
    font_size: f64,
) -> TokenGeometry {
    let line = context.index as f64;
    let y_raw = layout.margin_top + (line - 1.0) * layout.line_height;
    let page = ((y_raw / layout.page_height).floor() as u32 + 1).max(1);
    let y = y_raw - (page - 1) as f64 * layout.page_height;

    TokenGeometry {
        x: layout.margin_left,
        y,
        width: text_chars as f64 * font_size * 0.6,
        height: font_size * 1.2,
        page,
    }
}
