//! Page layout inference from section properties.
//!
//! The analyzer reads the raw text of the primary document part, locates the
//! last `<w:sectPr>` block (a document's final section governs the default
//! page for unplaced content), and derives page geometry from its `pgSz` and
//! `pgMar` elements. It is a total function: absent or malformed attributes
//! fall back to defaults field by field, never failing the whole analysis.

use crate::unit::twip_to_pt;
use quick_xml::Reader;
use quick_xml::events::Event;
use serde::{Deserialize, Serialize};

/// Default page width in points (US Letter, 8.5 in).
pub const DEFAULT_PAGE_WIDTH: f64 = 612.0;
/// Default page height in points (US Letter, 11 in).
pub const DEFAULT_PAGE_HEIGHT: f64 = 792.0;
/// Default margin on all four sides, in points.
pub const DEFAULT_MARGIN: f64 = 72.0;
/// Default line height in points (12pt type at 1.2 leading).
pub const DEFAULT_LINE_HEIGHT: f64 = 14.4;

/// Page geometry for a document, in points (1/72 inch).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DocumentLayout {
    /// Page width
    pub page_width: f64,
    /// Page height
    pub page_height: f64,
    /// Top margin
    pub margin_top: f64,
    /// Right margin
    pub margin_right: f64,
    /// Bottom margin
    pub margin_bottom: f64,
    /// Left margin
    pub margin_left: f64,
    /// Default line height
    pub line_height: f64,
    /// Whether the page is in landscape orientation
    pub landscape: bool,
}

impl Default for DocumentLayout {
    fn default() -> Self {
        Self {
            page_width: DEFAULT_PAGE_WIDTH,
            page_height: DEFAULT_PAGE_HEIGHT,
            margin_top: DEFAULT_MARGIN,
            margin_right: DEFAULT_MARGIN,
            margin_bottom: DEFAULT_MARGIN,
            margin_left: DEFAULT_MARGIN,
            line_height: DEFAULT_LINE_HEIGHT,
            landscape: false,
        }
    }
}

/// Derive the page layout from the raw text of the primary document part.
///
/// Dimensions in `pgSz`/`pgMar` are stored in twips and converted to points.
/// An explicit `orient` attribute is authoritative; without one, landscape
/// is inferred when width exceeds height.
pub fn analyze(document_xml: &str) -> DocumentLayout {
    let mut layout = DocumentLayout::default();

    let Some(sect_pr) = last_section_properties(document_xml) else {
        return layout;
    };

    // Explicit orientation, when present, wins over the width/height ratio.
    let mut explicit_orientation: Option<bool> = None;

    let mut reader = Reader::from_reader(sect_pr.as_bytes());
    reader.config_mut().trim_text(true);

    loop {
        match reader.read_event() {
            Ok(Event::Empty(e)) | Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"pgSz" => {
                    for attr in e.attributes().flatten() {
                        let Ok(value) = attr.decode_and_unescape_value(reader.decoder()) else {
                            continue;
                        };
                        match attr.key.local_name().as_ref() {
                            b"w" => {
                                if let Ok(twips) = value.parse::<f64>() {
                                    layout.page_width = twip_to_pt(twips);
                                }
                            },
                            b"h" => {
                                if let Ok(twips) = value.parse::<f64>() {
                                    layout.page_height = twip_to_pt(twips);
                                }
                            },
                            b"orient" => {
                                explicit_orientation = Some(value.as_ref() == "landscape");
                            },
                            _ => {},
                        }
                    }
                },
                b"pgMar" => {
                    for attr in e.attributes().flatten() {
                        let Ok(value) = attr.decode_and_unescape_value(reader.decoder()) else {
                            continue;
                        };
                        let Ok(twips) = value.parse::<f64>() else {
                            continue;
                        };
                        match attr.key.local_name().as_ref() {
                            b"top" => layout.margin_top = twip_to_pt(twips),
                            b"right" => layout.margin_right = twip_to_pt(twips),
                            b"bottom" => layout.margin_bottom = twip_to_pt(twips),
                            b"left" => layout.margin_left = twip_to_pt(twips),
                            _ => {},
                        }
                    }
                },
                _ => {},
            },
            Ok(Event::Eof) => break,
            Err(_) => break,
            _ => {},
        }
    }

    layout.landscape =
        explicit_orientation.unwrap_or(layout.page_width > layout.page_height);
    layout
}

/// Slice out the last `<w:sectPr>` block (or un-prefixed `<sectPr>`).
///
/// The block runs to its closing tag when present, otherwise to the end of
/// the document (the trailing sectPr of a body is followed only by closing
/// markup anyway).
fn last_section_properties(document_xml: &str) -> Option<&str> {
    let start = document_xml
        .rfind("<w:sectPr")
        .or_else(|| document_xml.rfind("<sectPr"))?;
    let tail = &document_xml[start..];
    let end = tail
        .find("</w:sectPr>")
        .map(|i| i + "</w:sectPr>".len())
        .or_else(|| tail.find("</sectPr>").map(|i| i + "</sectPr>".len()))
        .unwrap_or(tail.len());
    Some(&tail[..end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_without_section_properties() {
        let layout = analyze("<w:document><w:body/></w:document>");
        assert_eq!(layout, DocumentLayout::default());
    }

    #[test]
    fn test_page_size_and_margins() {
        let xml = r#"<w:body><w:sectPr>
            <w:pgSz w:w="12240" w:h="15840"/>
            <w:pgMar w:top="1440" w:right="1800" w:bottom="1440" w:left="1800"/>
        </w:sectPr></w:body>"#;
        let layout = analyze(xml);
        assert_eq!(layout.page_width, 612.0);
        assert_eq!(layout.page_height, 792.0);
        assert_eq!(layout.margin_top, 72.0);
        assert_eq!(layout.margin_right, 90.0);
        assert_eq!(layout.margin_bottom, 72.0);
        assert_eq!(layout.margin_left, 90.0);
        assert!(!layout.landscape);
    }

    #[test]
    fn test_landscape_inferred_from_dimensions() {
        let xml = r#"<w:sectPr><w:pgSz w:w="15840" w:h="12240"/></w:sectPr>"#;
        let layout = analyze(xml);
        assert_eq!(layout.page_width, 792.0);
        assert_eq!(layout.page_height, 612.0);
        assert!(layout.landscape);
    }

    #[test]
    fn test_explicit_orientation_is_authoritative() {
        // Dimensions say portrait; the attribute says landscape and wins.
        let xml = r#"<w:sectPr><w:pgSz w:w="12240" w:h="15840" w:orient="landscape"/></w:sectPr>"#;
        assert!(analyze(xml).landscape);

        let xml = r#"<w:sectPr><w:pgSz w:w="15840" w:h="12240" w:orient="portrait"/></w:sectPr>"#;
        assert!(!analyze(xml).landscape);
    }

    #[test]
    fn test_last_section_governs() {
        let xml = concat!(
            r#"<w:sectPr><w:pgSz w:w="15840" w:h="12240"/></w:sectPr>"#,
            r#"<w:p>more content</w:p>"#,
            r#"<w:sectPr><w:pgSz w:w="12240" w:h="15840"/></w:sectPr>"#,
        );
        let layout = analyze(xml);
        assert_eq!(layout.page_width, 612.0);
        assert!(!layout.landscape);
    }

    #[test]
    fn test_malformed_attributes_fall_back_field_by_field() {
        let xml = r#"<w:sectPr>
            <w:pgSz w:w="garbage" w:h="15840"/>
            <w:pgMar w:top="2880" w:left="nope"/>
        </w:sectPr>"#;
        let layout = analyze(xml);
        assert_eq!(layout.page_width, DEFAULT_PAGE_WIDTH);
        assert_eq!(layout.page_height, 792.0);
        assert_eq!(layout.margin_top, 144.0);
        assert_eq!(layout.margin_left, DEFAULT_MARGIN);
    }

    #[test]
    fn test_missing_margins_keep_defaults() {
        let xml = r#"<w:sectPr><w:pgMar w:top="720"/></w:sectPr>"#;
        let layout = analyze(xml);
        assert_eq!(layout.margin_top, 36.0);
        assert_eq!(layout.margin_bottom, DEFAULT_MARGIN);
    }
}
