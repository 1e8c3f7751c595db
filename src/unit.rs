//! Unit conversion utilities.
//!
//! OOXML stores page geometry in twentieths of a point ("twips");
//! everything in this crate works in points (1/72 inch).

/// Twips per point.
pub const TWIPS_PER_PT: f64 = 20.0;

/// Points per inch.
pub const PT_PER_INCH: f64 = 72.0;

/// Convert a twip value to points.
#[inline]
pub fn twip_to_pt(twips: f64) -> f64 {
    twips / TWIPS_PER_PT
}

/// Convert a point value to twips.
#[inline]
pub fn pt_to_twip(pt: f64) -> f64 {
    pt * TWIPS_PER_PT
}
