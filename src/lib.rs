//! Docstamp - placeholder substitution for OOXML word-processing documents
//!
//! This library unpacks a `.docx` container, finds `{{...}}` placeholder
//! tokens in the document text, even tokens split across formatting runs by
//! interior markup, substitutes supplied values without disturbing the rest
//! of the document, and repacks the container.
//!
//! # Features
//!
//! - **Tag-aware matching**: placeholders split by interior XML markup are
//!   still matched; the markup inside a matched span is discarded with it
//! - **Position metadata**: each token carries coarse page coordinates
//!   derived from the document's section properties
//! - **Containment**: archive entries that try to escape the extraction
//!   root (zip-slip) are rejected
//! - **Guaranteed cleanup**: the per-job workspace is removed on every exit
//!   path, success or failure
//!
//! # Example - Filling a template
//!
//! ```no_run
//! use std::collections::HashMap;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let container = std::fs::read("template.docx")?;
//!
//! let mut values = HashMap::new();
//! values.insert("{{name}}".to_string(), "Ada Lovelace".to_string());
//! values.insert("{{date}}".to_string(), "29 August 2026".to_string());
//!
//! // Placeholders absent from the map resolve to the empty string.
//! let filled = docstamp::substitute(&container, &values)?;
//! std::fs::write("filled.docx", filled)?;
//! # Ok(())
//! # }
//! ```
//!
//! # Example - Listing placeholders with positions
//!
//! ```no_run
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let container = std::fs::read("template.docx")?;
//!
//! for token in docstamp::extract_placeholders(&container)? {
//!     println!(
//!         "{}: page {}, paragraph {}, ({:.1}pt, {:.1}pt)",
//!         token.text, token.page, token.paragraph, token.x, token.y
//!     );
//! }
//! # Ok(())
//! # }
//! ```
//!
//! The position metadata is a coarse, deterministic approximation (fixed
//! line leading, fixed character advance, no per-run font metrics) intended
//! for overlay consumers, not typesetting.

pub mod archive;
pub mod engine;
pub mod error;
pub mod layout;
pub mod position;
pub mod replace;
pub mod scan;
pub mod unit;
pub mod workspace;

pub use engine::{CancelToken, Engine, EngineOptions};
pub use error::{ArchiveError, DocError, Result};
pub use layout::DocumentLayout;
pub use position::{ParagraphContext, TokenGeometry};
pub use scan::PlaceholderToken;
pub use workspace::Workspace;

use std::collections::HashMap;

/// Find all placeholders in a container, with position metadata.
///
/// Convenience wrapper over [`Engine::extract_placeholders`] with default
/// options.
pub fn extract_placeholders(container: &[u8]) -> Result<Vec<PlaceholderToken>> {
    Engine::new().extract_placeholders(container)
}

/// Substitute placeholder values and return the repacked container.
///
/// Convenience wrapper over [`Engine::substitute`] with default options.
pub fn substitute(container: &[u8], values: &HashMap<String, String>) -> Result<Vec<u8>> {
    Engine::new().substitute(container, values)
}

/// Report whether the document's governing section is landscape.
///
/// Convenience wrapper over [`Engine::detect_orientation`] with default
/// options.
pub fn detect_orientation(container: &[u8]) -> Result<bool> {
    Engine::new().detect_orientation(container)
}
