//! Page packing
//!
//! Decides how many cards fit on a page and how many pages a batch needs.

use crate::options::BatchOptions;
use crate::types::{Orientation, PageMode, SheetMargins};
use card_template::SideSize;

// =============================================================================
// Inputs
// =============================================================================

/// Everything the packer needs to know, all lengths in millimeters
#[derive(Debug, Clone, PartialEq)]
pub struct PackRequest {
    pub card_width_mm: f32,
    pub card_height_mm: f32,
    pub bleed_mm: f32,
    pub page_mode: PageMode,
    pub orientation: Orientation,
    pub margins: SheetMargins,
    pub spacing_mm: f32,
    pub cards_per_row: Option<usize>,
    pub cards_per_column: Option<usize>,
    pub record_count: usize,
}

impl PackRequest {
    /// Build a request for a card of `size` under the batch options
    pub fn new(size: SideSize, options: &BatchOptions, record_count: usize) -> Self {
        Self {
            card_width_mm: size.width_mm,
            card_height_mm: size.height_mm,
            bleed_mm: options.bleed_mm,
            page_mode: options.page_mode,
            orientation: options.orientation,
            margins: options.margins,
            spacing_mm: options.card_spacing_mm,
            cards_per_row: options.cards_per_row,
            cards_per_column: options.cards_per_column,
            record_count,
        }
    }
}

// =============================================================================
// Plan
// =============================================================================

/// Derived page layout of a batch
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutPlan {
    pub cards_per_row: usize,
    pub cards_per_column: usize,
    pub cards_per_page: usize,
    /// Pages needed for one pass over the records
    pub total_pages: usize,
    pub page_width_mm: f32,
    pub page_height_mm: f32,
    pub card_width_mm: f32,
    pub card_height_mm: f32,
    pub bleed_mm: f32,
    pub spacing_mm: f32,
    /// Margins the grid starts from; zero for single-card pages
    pub margins: SheetMargins,
    pub single_card: bool,
}

impl LayoutPlan {
    /// Card width including bleed on both sides
    pub fn cell_width_mm(&self) -> f32 {
        self.card_width_mm + self.bleed_mm * 2.0
    }

    /// Card height including bleed on both sides
    pub fn cell_height_mm(&self) -> f32 {
        self.card_height_mm + self.bleed_mm * 2.0
    }

    /// Width of the filled grid
    pub fn grid_width_mm(&self) -> f32 {
        let n = self.cards_per_row as f32;
        n * self.cell_width_mm() + (n - 1.0) * self.spacing_mm
    }

    /// Height of the filled grid
    pub fn grid_height_mm(&self) -> f32 {
        let n = self.cards_per_column as f32;
        n * self.cell_height_mm() + (n - 1.0) * self.spacing_mm
    }

    /// Whether the grid spills past the usable page area
    pub fn overflows(&self) -> bool {
        if self.single_card {
            return false;
        }
        let usable_w = self.page_width_mm - self.margins.left_mm - self.margins.right_mm;
        let usable_h = self.page_height_mm - self.margins.top_mm - self.margins.bottom_mm;
        self.grid_width_mm() > usable_w + f32::EPSILON
            || self.grid_height_mm() > usable_h + f32::EPSILON
    }
}

/// Compute the layout plan for a batch.
///
/// Rows and columns are floored to at least one, so a card larger than the
/// usable area still yields one card per page (overflowing the margins).
pub fn plan(request: &PackRequest) -> LayoutPlan {
    let cell_w = request.card_width_mm + request.bleed_mm * 2.0;
    let cell_h = request.card_height_mm + request.bleed_mm * 2.0;

    let paper = match request.page_mode {
        PageMode::SingleCard => {
            return LayoutPlan {
                cards_per_row: 1,
                cards_per_column: 1,
                cards_per_page: 1,
                total_pages: request.record_count,
                page_width_mm: cell_w,
                page_height_mm: cell_h,
                card_width_mm: request.card_width_mm,
                card_height_mm: request.card_height_mm,
                bleed_mm: request.bleed_mm,
                spacing_mm: 0.0,
                margins: SheetMargins::none(),
                single_card: true,
            };
        }
        PageMode::Sheet(paper) => paper,
    };

    let (page_w, page_h) = paper.dimensions_with_orientation(request.orientation);
    let margins = request.margins;
    let spacing = request.spacing_mm;

    let usable_w = page_w - margins.left_mm - margins.right_mm;
    let usable_h = page_h - margins.top_mm - margins.bottom_mm;

    let cards_per_row = request
        .cards_per_row
        .filter(|&n| n > 0)
        .unwrap_or_else(|| fit_count(usable_w, cell_w, spacing))
        .max(1);
    let cards_per_column = request
        .cards_per_column
        .filter(|&n| n > 0)
        .unwrap_or_else(|| fit_count(usable_h, cell_h, spacing))
        .max(1);

    let cards_per_page = cards_per_row * cards_per_column;
    let total_pages = request.record_count.div_ceil(cards_per_page);

    LayoutPlan {
        cards_per_row,
        cards_per_column,
        cards_per_page,
        total_pages,
        page_width_mm: page_w,
        page_height_mm: page_h,
        card_width_mm: request.card_width_mm,
        card_height_mm: request.card_height_mm,
        bleed_mm: request.bleed_mm,
        spacing_mm: spacing,
        margins,
        single_card: false,
    }
}

/// How many cells of `cell` length fit in `usable` with `spacing` between them
fn fit_count(usable: f32, cell: f32, spacing: f32) -> usize {
    let pitch = cell + spacing;
    if pitch <= 0.0 {
        return 1;
    }
    // A negative or NaN quotient saturates to 0 and is lifted to 1 by the caller
    ((usable + spacing) / pitch).floor() as usize
}

// =============================================================================
// Tests
// =============================================================================
