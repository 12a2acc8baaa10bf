//! Shared constants for template editing and rendering.

// =============================================================================
// Resolution
// =============================================================================

/// Resolution the editor canvas works at (CSS pixels)
pub const EDIT_DPI: f32 = 96.0;

/// Resolution cards are rasterized at for print
pub const EXPORT_DPI: f32 = 300.0;

/// Millimeters per inch
pub const MM_PER_INCH: f32 = 25.4;

/// Convert millimeters to editor pixels
#[inline]
pub fn mm_to_px(mm: f32) -> f32 {
    mm * EDIT_DPI / MM_PER_INCH
}

/// Convert editor pixels to millimeters
#[inline]
pub fn px_to_mm(px: f32) -> f32 {
    px * MM_PER_INCH / EDIT_DPI
}

// =============================================================================
// History
// =============================================================================

/// Maximum number of snapshots kept per side
pub const HISTORY_CAPACITY: usize = 50;

/// Quiet period before a burst of edits is captured (milliseconds)
pub const HISTORY_DEBOUNCE_MS: u64 = 300;

// =============================================================================
// Text
// =============================================================================

/// Smallest font size auto-fit will shrink to
pub const MIN_READABLE_FONT_SIZE: f32 = 10.0;

/// Default line height multiplier for wrapped text
pub const DEFAULT_LINE_HEIGHT: f32 = 1.2;

/// Default inner padding of a variable box
pub const DEFAULT_BOX_PADDING: f32 = 8.0;

// =============================================================================
// Masks
// =============================================================================

/// Corner radius used for rounded-rect masks
pub const ROUNDED_RECT_RADIUS: f32 = 15.0;

/// Inner/outer radius ratio for stars
pub const STAR_INNER_RATIO: f32 = 0.5;

/// Line segments used when flattening each Bezier curve
pub const CURVE_SEGMENTS: usize = 16;

// =============================================================================
// Editing
// =============================================================================

/// Distance moved by an arrow-key nudge
pub const NUDGE_STEP: f32 = 1.0;

/// Distance moved by a shift+arrow nudge
pub const NUDGE_STEP_LARGE: f32 = 10.0;
