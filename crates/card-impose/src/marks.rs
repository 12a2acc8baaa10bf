//! Printer's marks for imposed card pages
//!
//! This module produces PDF content stream operations for crop marks, serial
//! numbers and page numbers. Text is set in the base-14 Helvetica font, which
//! the page builder registers as `/F1`.

use crate::constants::{
    CROP_MARK_EXTENT_MM, CROP_MARK_GAP_MM, CROP_MARK_WIDTH, HELVETICA_CHAR_WIDTH_RATIO,
    PAGE_NUMBER_FONT_SIZE, PAGE_NUMBER_OFFSET, SERIAL_FONT_SIZE, SERIAL_OFFSET_MM, mm_to_pt,
};
use crate::layout::Rect;

/// Generate crop marks for every trim box on a page
pub fn generate_crop_marks(trim_boxes: &[Rect]) -> String {
    if trim_boxes.is_empty() {
        return String::new();
    }

    let mut ops = String::new();
    ops.push_str("q\n");
    ops.push_str("0 0 0 RG\n");
    ops.push_str(&format!("{} w\n", CROP_MARK_WIDTH));
    ops.push_str("[] 0 d\n");

    let gap = mm_to_pt(CROP_MARK_GAP_MM);
    let extent = mm_to_pt(CROP_MARK_EXTENT_MM);

    for trim in trim_boxes {
        for (x, y, dx, dy) in [
            (trim.x, trim.top(), -1.0, 1.0),
            (trim.right(), trim.top(), 1.0, 1.0),
            (trim.x, trim.y, -1.0, -1.0),
            (trim.right(), trim.y, 1.0, -1.0),
        ] {
            // Horizontal mark level with the trim edge, pointing outward
            ops.push_str(&format!(
                "{} {} m {} {} l S\n",
                x + dx * gap,
                y,
                x + dx * extent,
                y
            ));
            // Vertical mark
            ops.push_str(&format!(
                "{} {} m {} {} l S\n",
                x,
                y + dy * gap,
                x,
                y + dy * extent
            ));
        }
    }

    ops.push_str("Q\n");
    ops
}

/// Serial number centered under a card's trim edge
pub fn generate_serial(serial: &str, trim: &Rect) -> String {
    let width = text_width(serial, SERIAL_FONT_SIZE);
    let x = trim.center_x() - width / 2.0;
    let y = trim.y - mm_to_pt(SERIAL_OFFSET_MM);
    text_op(serial, SERIAL_FONT_SIZE, x, y)
}

/// "Page N of M" centered at the bottom of the page
pub fn generate_page_number(page: usize, total: usize, page_width_pt: f32) -> String {
    let label = format!("Page {} of {}", page, total);
    let width = text_width(&label, PAGE_NUMBER_FONT_SIZE);
    let x = (page_width_pt - width) / 2.0;
    text_op(&label, PAGE_NUMBER_FONT_SIZE, x, PAGE_NUMBER_OFFSET)
}

/// A single Helvetica text run with its baseline at (`x`, `y`)
pub fn text_op(text: &str, font_size: f32, x: f32, y: f32) -> String {
    format!(
        "BT /F1 {} Tf {} {} Td ({}) Tj ET\n",
        font_size,
        x,
        y,
        escape_pdf_string(text)
    )
}

/// Approximate Helvetica advance of `text`
pub fn text_width(text: &str, font_size: f32) -> f32 {
    text.chars().count() as f32 * font_size * HELVETICA_CHAR_WIDTH_RATIO
}

/// Characters the standard font cannot show, each listed once
pub fn unencodable_chars(text: &str) -> String {
    let mut out = String::new();
    for ch in text.chars().filter(|c| (*c as u32) > 0xFF) {
        if !out.contains(ch) {
            out.push(ch);
        }
    }
    out
}

/// Escape a string for a PDF literal. Characters outside Latin-1 cannot be
/// shown by the standard font and become `?`.
pub fn escape_pdf_string(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '(' | ')' | '\\' => {
                out.push('\\');
                out.push(ch);
            }
            '\n' | '\r' | '\t' => out.push(' '),
            c if (c as u32) < 0x20 => {}
            c if c.is_ascii() => out.push(c),
            c if (c as u32) <= 0xFF => out.push_str(&format!("\\{:03o}", c as u32)),
            _ => out.push('?'),
        }
    }
    out
}

// =============================================================================
// Tests
// =============================================================================
