//! Shared constants for card imposition
//!
//! This module centralizes magic numbers used by the renderer and the page
//! builder.

// =============================================================================
// Unit Conversion
// =============================================================================

/// Points per millimeter (1 inch = 72 points, 1 inch = 25.4mm)
pub const POINTS_PER_MM: f32 = 72.0 / 25.4; // ≈ 2.83465

/// Convert millimeters to points
#[inline]
pub fn mm_to_pt(mm: f32) -> f32 {
    mm * POINTS_PER_MM
}

/// Convert points to millimeters
#[inline]
pub fn pt_to_mm(pt: f32) -> f32 {
    pt / POINTS_PER_MM
}

/// Pixels covering `mm` at `dpi`
#[inline]
pub fn mm_to_px_at(mm: f32, dpi: f32) -> f32 {
    mm / 25.4 * dpi
}

// =============================================================================
// Imposition Defaults
// =============================================================================

/// Bleed added around every card when bleed is enabled (mm)
pub const DEFAULT_BLEED_MM: f32 = 3.0;

/// Gap between neighbouring cards (mm)
pub const DEFAULT_CARD_SPACING_MM: f32 = 5.0;

// =============================================================================
// Printer's Marks
// =============================================================================

/// Line width for crop marks (points)
pub const CROP_MARK_WIDTH: f32 = 0.25;

/// Distance from the trim edge where a crop mark starts (mm)
pub const CROP_MARK_GAP_MM: f32 = 2.0;

/// Distance from the trim edge where a crop mark ends (mm)
pub const CROP_MARK_EXTENT_MM: f32 = 5.0;

/// Font size for serial numbers (points)
pub const SERIAL_FONT_SIZE: f32 = 6.0;

/// Baseline of the serial number below the trim edge (mm)
pub const SERIAL_OFFSET_MM: f32 = 4.0;

// =============================================================================
// Page Numbers
// =============================================================================

/// Default font size for page numbers (points)
pub const PAGE_NUMBER_FONT_SIZE: f32 = 8.0;

/// Vertical offset for page numbers from the page bottom (points)
pub const PAGE_NUMBER_OFFSET: f32 = 10.0;

/// Approximate character width ratio for Helvetica
pub const HELVETICA_CHAR_WIDTH_RATIO: f32 = 0.5;

// =============================================================================
// Rendering
// =============================================================================

/// Upper bound on a single photo or symbol fetch (milliseconds)
pub const DEFAULT_FETCH_TIMEOUT_MS: u64 = 10_000;

/// Fill drawn for a photo slot that has no photo
pub const PLACEHOLDER_FILL: &str = "#e5e7eb";

/// Outline drawn around an empty photo slot
pub const PLACEHOLDER_STROKE: &str = "#9ca3af";

/// Share of a barcode's height given to its human-readable value
pub const BARCODE_TEXT_SHARE: f32 = 0.2;

/// Font size precision of the auto-fit search (points)
pub const FIT_PRECISION: f32 = 0.5;

/// User agent sent with photo requests
pub const USER_AGENT: &str = concat!("cardt/", env!("CARGO_PKG_VERSION"));
