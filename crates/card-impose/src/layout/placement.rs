//! Slot addressing and card placement
//!
//! Records fill pages row-major; a new page starts exactly when the position
//! within the page wraps back to zero.

use super::{CardPlacement, LayoutPlan, Pass, Rect, SlotPosition};
use crate::constants::mm_to_pt;

impl LayoutPlan {
    /// Slot of the record at `index` within one pass
    pub fn slot(&self, index: usize) -> SlotPosition {
        let per_page = self.cards_per_page.max(1);
        let per_row = self.cards_per_row.max(1);
        let in_page = index % per_page;
        SlotPosition::new(index / per_page, in_page / per_row, in_page % per_row)
    }

    /// Column a back-side card uses so it lines up with its front after a
    /// physical flip. Applying it twice returns the original column.
    pub fn mirror_col(&self, col: usize) -> usize {
        self.cards_per_row.saturating_sub(1).saturating_sub(col)
    }

    /// Page size in points
    pub fn page_size_pt(&self) -> (f32, f32) {
        (mm_to_pt(self.page_width_mm), mm_to_pt(self.page_height_mm))
    }

    /// Bleed box of the cell at (`row`, `col`), in PDF points.
    ///
    /// Cells start at the top-left margin and step by cell size plus spacing.
    pub fn cell_rect(&self, row: usize, col: usize) -> Rect {
        let cell_w = self.cell_width_mm();
        let cell_h = self.cell_height_mm();
        let x_mm = self.margins.left_mm + col as f32 * (cell_w + self.spacing_mm);
        let top_mm = self.margins.top_mm + row as f32 * (cell_h + self.spacing_mm);
        let y_mm = self.page_height_mm - top_mm - cell_h;
        Rect::new(mm_to_pt(x_mm), mm_to_pt(y_mm), mm_to_pt(cell_w), mm_to_pt(cell_h))
    }

    /// Place the record at `index` for the given pass
    pub fn place(&self, index: usize, pass: Pass, mirror_back: bool) -> CardPlacement {
        let mut slot = self.slot(index);
        if pass == Pass::Back && mirror_back {
            slot.col = self.mirror_col(slot.col);
        }
        let bleed_box = self.cell_rect(slot.row, slot.col);
        let trim_box = bleed_box.inset(mm_to_pt(self.bleed_mm));
        CardPlacement {
            record_index: index,
            pass,
            slot,
            bleed_box,
            trim_box,
        }
    }

    /// Placements of `count` records grouped by output page
    pub fn pages(&self, count: usize, pass: Pass, mirror_back: bool) -> Vec<Vec<CardPlacement>> {
        let mut pages: Vec<Vec<CardPlacement>> = Vec::new();
        for index in 0..count {
            let placement = self.place(index, pass, mirror_back);
            if index % self.cards_per_page.max(1) == 0 {
                pages.push(Vec::with_capacity(self.cards_per_page));
            }
            if let Some(page) = pages.last_mut() {
                page.push(placement);
            }
        }
        pages
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{PackRequest, plan};
    use crate::types::{Orientation, PageMode, PaperSize, SheetMargins};

    fn id_card_plan(record_count: usize) -> LayoutPlan {
        plan(&PackRequest {
            card_width_mm: 85.6,
            card_height_mm: 54.0,
            bleed_mm: 3.0,
            page_mode: PageMode::Sheet(PaperSize::A4),
            orientation: Orientation::Portrait,
            margins: SheetMargins::uniform(10.0),
            spacing_mm: 5.0,
            cards_per_row: None,
            cards_per_column: None,
            record_count,
        })
    }

    #[test]
    fn test_row_major_slots() {
        let plan = id_card_plan(37);
        assert_eq!(plan.slot(0), SlotPosition::new(0, 0, 0));
        assert_eq!(plan.slot(1), SlotPosition::new(0, 0, 1));
        assert_eq!(plan.slot(2), SlotPosition::new(0, 1, 0));
        assert_eq!(plan.slot(7), SlotPosition::new(0, 3, 1));
        assert_eq!(plan.slot(8), SlotPosition::new(1, 0, 0));
        assert!(plan.slot(8).starts_page());
        assert_eq!(plan.slot(36), SlotPosition::new(4, 2, 0));
    }

    #[test]
    fn test_mirror_is_involution() {
        let plan = id_card_plan(8);
        for col in 0..plan.cards_per_row {
            assert_eq!(plan.mirror_col(plan.mirror_col(col)), col);
        }
        assert_eq!(plan.mirror_col(0), 1);
        assert_eq!(plan.mirror_col(1), 0);
    }

    #[test]
    fn test_first_cell_position() {
        let plan = id_card_plan(1);
        let rect = plan.cell_rect(0, 0);
        assert!((rect.x - mm_to_pt(10.0)).abs() < 1e-3);
        assert!((rect.top() - mm_to_pt(287.0)).abs() < 1e-2);
        assert!((rect.width - mm_to_pt(91.6)).abs() < 1e-3);
    }

    #[test]
    fn test_back_pass_mirrors_columns() {
        let plan = id_card_plan(3);
        let front = plan.place(0, Pass::Front, true);
        let back = plan.place(0, Pass::Back, true);
        assert_eq!(front.slot.col, 0);
        assert_eq!(back.slot.col, 1);
        assert_eq!(front.slot.row, back.slot.row);
        assert_eq!(front.bleed_box.y, back.bleed_box.y);

        let unmirrored = plan.place(0, Pass::Back, false);
        assert_eq!(unmirrored.slot.col, 0);
    }

    #[test]
    fn test_trim_inside_bleed() {
        let plan = id_card_plan(1);
        let placed = plan.place(0, Pass::Front, false);
        assert!(placed.trim_box.x > placed.bleed_box.x);
        assert!((placed.trim_box.width - mm_to_pt(85.6)).abs() < 1e-3);
    }

    #[test]
    fn test_pages_grouping() {
        let plan = id_card_plan(37);
        let pages = plan.pages(37, Pass::Front, false);
        assert_eq!(pages.len(), plan.total_pages);
        assert_eq!(pages[0].len(), 8);
        assert_eq!(pages[4].len(), 5);
        assert_eq!(pages[4][0].record_index, 32);
    }
}
