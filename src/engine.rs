//! The processing pipeline: unpack, scan, layout, replace, repack.
//!
//! One [`Engine`] call processes exactly one document, synchronously and
//! single-threaded: each stage consumes the previous stage's output, so
//! nothing overlaps within a job. The extraction workspace is exclusively
//! owned by the call and released on every exit path. Distinct concurrent
//! invocations share no mutable state, so an external caller may drive many
//! jobs at once without locking.

use crate::archive;
use crate::error::Result;
use crate::layout::{self, DocumentLayout};
use crate::position::{self, DEFAULT_FONT_SIZE};
use crate::replace::{self, DEFAULT_SCAN_BUDGET_FACTOR, ReplaceOutcome};
use crate::scan::{CleanText, PlaceholderToken, unique_literals};
use crate::workspace::Workspace;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, warn};

/// Archive path of the primary text part in a word-processing container.
pub const PRIMARY_PART: &str = "word/document.xml";

/// Tuning knobs for the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineOptions {
    /// Font size (points) used for token width estimation
    pub font_size: f64,
    /// Multiple of a token's length a tag-aware match attempt may consume
    /// before it is abandoned
    pub scan_budget_factor: usize,
    /// Archive path of the primary text part
    pub primary_part: String,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            font_size: DEFAULT_FONT_SIZE,
            scan_budget_factor: DEFAULT_SCAN_BUDGET_FACTOR,
            primary_part: PRIMARY_PART.to_string(),
        }
    }
}

/// Cooperative cancellation signal, checked between top-level stages.
///
/// Cancellation is observed before each of unpack, scan, replace, and
/// repack, never inside the per-character scan loops, so mid-scan
/// cancellation is not a guaranteed contract. A cancelled job still releases
/// its workspace before returning [`DocError::Cancelled`].
///
/// [`DocError::Cancelled`]: crate::error::DocError::Cancelled
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// Create a token in the not-cancelled state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    /// Whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(crate::error::DocError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Placeholder-substitution engine for OOXML word documents.
///
/// # Examples
///
/// ```rust,no_run
/// use docstamp::Engine;
/// use std::collections::HashMap;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let container = std::fs::read("template.docx")?;
/// let engine = Engine::new();
///
/// // List the placeholders with their page positions
/// for token in engine.extract_placeholders(&container)? {
///     println!("{} on page {} at ({:.1}, {:.1})", token.text, token.page, token.x, token.y);
/// }
///
/// // Fill them in
/// let mut values = HashMap::new();
/// values.insert("{{name}}".to_string(), "Ada".to_string());
/// let filled = engine.substitute(&container, &values)?;
/// std::fs::write("filled.docx", filled)?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct Engine {
    options: EngineOptions,
    cancel: Option<CancelToken>,
}

impl Engine {
    /// Create an engine with default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an engine with explicit options.
    pub fn with_options(options: EngineOptions) -> Self {
        Self {
            options,
            cancel: None,
        }
    }

    /// Attach a cancellation token, checked before each top-level stage.
    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// The engine's options.
    #[inline]
    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    fn check_cancel(&self) -> Result<()> {
        match &self.cancel {
            Some(token) => token.check(),
            None => Ok(()),
        }
    }

    /// Find all placeholders in a container, with position metadata.
    ///
    /// Unpacks the container, builds the clean-text view, analyzes the page
    /// layout, and coordinate-maps every token. Literals are deduplicated in
    /// first-occurrence order. The workspace is released before this
    /// returns, on success and on error alike.
    pub fn extract_placeholders(&self, container: &[u8]) -> Result<Vec<PlaceholderToken>> {
        self.check_cancel()?;
        let workspace = Workspace::create()?;
        archive::unpack(container, &workspace)?;
        debug!(root = %workspace.root().display(), "container unpacked");

        self.check_cancel()?;
        let raw = self.read_primary_part(&workspace)?;
        let layout = layout::analyze(&raw);
        let tokens = self.scan_and_map(&raw, &layout);
        debug!(count = tokens.len(), "placeholders extracted");
        Ok(tokens)
    }

    /// Substitute placeholder values and return the repacked container.
    ///
    /// Every placeholder found in the document is substituted: tokens absent
    /// from `values` resolve to the empty string by policy, never an error.
    /// A token occurrence abandoned by the scan-budget guard is left
    /// untouched and logged; it never fails the call. The result is either
    /// a complete repacked container or an error; there is no partial output.
    /// Parts the substitutions do not change, including a primary part that
    /// is not valid UTF-8, are carried through byte-for-byte.
    pub fn substitute(
        &self,
        container: &[u8],
        values: &HashMap<String, String>,
    ) -> Result<Vec<u8>> {
        self.check_cancel()?;
        let workspace = Workspace::create()?;
        archive::unpack(container, &workspace)?;

        self.check_cancel()?;
        let bytes = workspace.read_part(&self.options.primary_part)?;
        // Only a valid UTF-8 part is rewritten. Anything else (and any part
        // the substitutions leave unchanged) keeps its exact bytes on disk,
        // so repacking preserves it verbatim.
        match String::from_utf8(bytes) {
            Ok(raw) => {
                let clean = CleanText::from_raw(&raw);
                let literals = unique_literals(&clean.find_tokens());
                debug!(count = literals.len(), "placeholders found for substitution");

                self.check_cancel()?;
                let mut text = raw.clone();
                let mut totals = ReplaceOutcome::default();
                for literal in &literals {
                    let value = values.get(literal).map(String::as_str).unwrap_or("");
                    let (next, outcome) = replace::replace_token(
                        &text,
                        literal,
                        value,
                        self.options.scan_budget_factor,
                    );
                    debug!(
                        token = literal.as_str(),
                        replaced = outcome.replaced,
                        abandoned = outcome.abandoned,
                        "token processed"
                    );
                    totals.replaced += outcome.replaced;
                    totals.abandoned += outcome.abandoned;
                    text = next;
                }
                if text != raw {
                    workspace.write_part(&self.options.primary_part, text.as_bytes())?;
                }
                debug!(
                    replaced = totals.replaced,
                    abandoned = totals.abandoned,
                    "substitution complete"
                );
            }
            Err(_) => {
                warn!(
                    part = self.options.primary_part.as_str(),
                    "primary part is not valid UTF-8, leaving it untouched"
                );
            }
        }

        self.check_cancel()?;
        archive::pack(&workspace)
    }

    /// Report whether the document's governing section is landscape.
    pub fn detect_orientation(&self, container: &[u8]) -> Result<bool> {
        self.check_cancel()?;
        let workspace = Workspace::create()?;
        archive::unpack(container, &workspace)?;

        self.check_cancel()?;
        let raw = self.read_primary_part(&workspace)?;
        Ok(layout::analyze(&raw).landscape)
    }

    /// Read the primary part as text for the analysis paths. The lossy view
    /// is never written back, so it cannot alter the container.
    fn read_primary_part(&self, workspace: &Workspace) -> Result<String> {
        let bytes = workspace.read_part(&self.options.primary_part)?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Scan the raw part and coordinate-map every deduplicated token.
    fn scan_and_map(&self, raw: &str, layout: &DocumentLayout) -> Vec<PlaceholderToken> {
        let clean = CleanText::from_raw(raw);
        let mut seen = HashSet::new();
        let mut tokens = Vec::new();

        for mut token in clean.find_tokens() {
            if !seen.insert(token.text.clone()) {
                continue;
            }
            let context = position::paragraph_context(raw, token.raw_start);
            let geometry = position::locate(
                layout,
                &context,
                token.text.chars().count(),
                self.options.font_size,
            );
            token.x = geometry.x;
            token.y = geometry.y;
            token.width = geometry.width;
            token.height = geometry.height;
            token.page = geometry.page;
            token.paragraph = context.index;
            tokens.push(token);
        }

        tokens
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancel_token_round_trip() {
        let token = CancelToken::new();
        assert!(!token.is_cancelled());
        token.cancel();
        assert!(token.is_cancelled());
        // Clones observe the same signal.
        let clone = token.clone();
        assert!(clone.is_cancelled());
    }

    #[test]
    fn test_options_defaults() {
        let options = EngineOptions::default();
        assert_eq!(options.font_size, 12.0);
        assert_eq!(options.scan_budget_factor, 10);
        assert_eq!(options.primary_part, "word/document.xml");
    }

    #[test]
    fn test_cancelled_engine_rejects_work_immediately() {
        let token = CancelToken::new();
        token.cancel();
        let engine = Engine::new().with_cancel_token(token);
        let err = engine.detect_orientation(&[]).unwrap_err();
        assert!(matches!(err, crate::error::DocError::Cancelled));
    }
}
