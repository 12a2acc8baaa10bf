//! Layout data types for card imposition

/// A rectangular area in points, PDF coordinates (origin bottom-left)
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    /// X position (left edge)
    pub x: f32,
    /// Y position (bottom edge)
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Right edge x coordinate
    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    /// Top edge y coordinate
    pub fn top(&self) -> f32 {
        self.y + self.height
    }

    /// Center x coordinate
    pub fn center_x(&self) -> f32 {
        self.x + self.width / 2.0
    }

    /// Shrink on every side by `amount`
    pub fn inset(&self, amount: f32) -> Self {
        Self {
            x: self.x + amount,
            y: self.y + amount,
            width: (self.width - amount * 2.0).max(0.0),
            height: (self.height - amount * 2.0).max(0.0),
        }
    }
}

/// Which pass over the records a page belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pass {
    Front,
    Back,
}

/// A card's slot on the output, addressed by page, row and column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotPosition {
    /// Page index within the pass (0-based)
    pub page: usize,
    /// Row index (0 = top row)
    pub row: usize,
    /// Column index (0 = leftmost column)
    pub col: usize,
}

impl SlotPosition {
    pub fn new(page: usize, row: usize, col: usize) -> Self {
        Self { page, row, col }
    }

    /// Whether this slot opens a new page
    pub fn starts_page(&self) -> bool {
        self.row == 0 && self.col == 0
    }
}

/// Final placement of one card on its output page
#[derive(Debug, Clone, PartialEq)]
pub struct CardPlacement {
    /// Index of the record in the batch
    pub record_index: usize,
    pub pass: Pass,
    pub slot: SlotPosition,
    /// Area covered by the card image, bleed included
    pub bleed_box: Rect,
    /// Finished card edge
    pub trim_box: Rect,
}
