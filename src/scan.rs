//! Placeholder scanning over a tag-free view of the document text.
//!
//! Placeholders are `{{...}}` spans in the document's visible text, but the
//! raw part interleaves that text with markup, so a single token may be split
//! across several runs. The scanner therefore works on a "clean text" view
//! with everything between `<` and `>` removed, keeping a byte-accurate map
//! back to raw offsets. The map is built in one pass per document; deriving
//! it per token would degrade quadratically with token count.

use memchr::memmem;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// A placeholder token found in the document.
///
/// `text` is the literal including both brace pairs. Clean offsets index the
/// tag-free view; raw offsets index the original part bytes. Geometry fields
/// (`x`/`y`/`width`/`height`, `page`, `paragraph`) are filled in by the
/// coordinate mapper; the scanner leaves them zeroed.
///
/// Tokens are invalidated the moment the part is mutated; any extraction
/// after a replacement must re-scan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaceholderToken {
    /// Literal text, `{{...}}` inclusive of braces
    pub text: String,
    /// Byte offset of `{{` in the clean text
    pub clean_start: usize,
    /// Byte offset just past `}}` in the clean text
    pub clean_end: usize,
    /// 1-based line in the clean text (`\n` delimited)
    pub line: u32,
    /// 1-based column in the clean text, in characters
    pub column: u32,
    /// Byte offset of `{{` in the raw part text
    pub raw_start: usize,
    /// Byte offset just past the final `}` in the raw part text
    pub raw_end: usize,
    /// Left edge on the page, points
    pub x: f64,
    /// Top edge on the page, points
    pub y: f64,
    /// Estimated width, points
    pub width: f64,
    /// Estimated height, points
    pub height: f64,
    /// 1-based page number
    pub page: u32,
    /// 1-based paragraph ordinal
    pub paragraph: u32,
}

/// Tag-free view of a raw part, with a per-byte map back to raw offsets.
#[derive(Debug)]
pub struct CleanText {
    text: String,
    /// `raw_offsets[i]` is the raw byte offset of clean-text byte `i`.
    raw_offsets: Vec<usize>,
}

impl CleanText {
    /// Build the clean view in a single pass over the raw text.
    ///
    /// Everything between `<` and `>` (inclusive) is removed; every other
    /// character is retained in its original relative order, and each of its
    /// bytes is recorded against its raw offset.
    pub fn from_raw(raw: &str) -> Self {
        let mut text = String::with_capacity(raw.len());
        let mut raw_offsets = Vec::with_capacity(raw.len());
        let mut in_tag = false;

        for (offset, ch) in raw.char_indices() {
            match ch {
                '<' => in_tag = true,
                '>' => in_tag = false,
                _ if !in_tag => {
                    text.push(ch);
                    for k in 0..ch.len_utf8() {
                        raw_offsets.push(offset + k);
                    }
                },
                _ => {},
            }
        }

        Self { text, raw_offsets }
    }

    /// The tag-free text.
    #[inline]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Map a clean-text byte offset to its raw byte offset.
    #[inline]
    pub fn raw_offset(&self, clean_offset: usize) -> usize {
        self.raw_offsets[clean_offset]
    }

    /// Find all placeholder tokens, left to right.
    ///
    /// The earliest unmatched `{{` pairs with the nearest following `}}`;
    /// the inclusive span between them is one token, tokens never overlap,
    /// and scanning resumes strictly after each one. A trailing `{{` without
    /// a closing `}}` is not a token.
    pub fn find_tokens(&self) -> Vec<PlaceholderToken> {
        let open = memmem::Finder::new("{{");
        let close = memmem::Finder::new("}}");
        let bytes = self.text.as_bytes();

        let mut tokens = Vec::new();
        let mut cursor = 0;
        // Running line bookkeeping so line/column stay one pass overall.
        let mut line: u32 = 1;
        let mut line_start = 0;

        while let Some(rel_start) = open.find(&bytes[cursor..]) {
            let mut start = cursor + rel_start;
            // Braces do not nest: when another `{{` appears before the
            // close, the opener nearest the close is the real one.
            let end = loop {
                let Some(rel_close) = close.find(&bytes[start + 2..]) else {
                    break None;
                };
                let close_at = start + 2 + rel_close;
                match open.find(&bytes[start + 1..close_at]) {
                    Some(inner) => start = start + 1 + inner,
                    None => break Some(close_at + 2),
                }
            };
            let Some(end) = end else {
                break;
            };

            for (i, &b) in bytes[cursor..start].iter().enumerate() {
                if b == b'\n' {
                    line += 1;
                    line_start = cursor + i + 1;
                }
            }
            let column = self.text[line_start..start].chars().count() as u32 + 1;
            let (token_line, token_column) = (line, column);
            // Newlines inside the token span still advance the bookkeeping.
            for (i, &b) in bytes[start..end].iter().enumerate() {
                if b == b'\n' {
                    line += 1;
                    line_start = start + i + 1;
                }
            }

            tokens.push(PlaceholderToken {
                text: self.text[start..end].to_string(),
                clean_start: start,
                clean_end: end,
                line: token_line,
                column: token_column,
                raw_start: self.raw_offsets[start],
                // `}` is ASCII, so the raw end is one past its offset.
                raw_end: self.raw_offsets[end - 1] + 1,
                x: 0.0,
                y: 0.0,
                width: 0.0,
                height: 0.0,
                page: 0,
                paragraph: 0,
            });

            cursor = end;
        }

        tokens
    }
}

/// Deduplicate token literals, preserving first-occurrence order.
pub fn unique_literals(tokens: &[PlaceholderToken]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut literals = Vec::new();
    for token in tokens {
        if seen.insert(token.text.as_str()) {
            literals.push(token.text.clone());
        }
    }
    literals
}
