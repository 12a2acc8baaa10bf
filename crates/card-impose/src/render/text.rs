//! Text measurement, wrapping and auto-fit.
//!
//! Glyph rasterization is a capability of the [`TextShaper`] in use. A
//! shaper that cannot draw still measures, and the renderer hands its lines
//! to the page builder as vector text instead.

use crate::constants::{FIT_PRECISION, HELVETICA_CHAR_WIDTH_RATIO};
use crate::types::{ImposeError, Result};
use ab_glyph::{Font, FontArc, ScaleFont};
use std::path::Path;

/// Measures, and optionally draws, text at a pixel size
pub trait TextShaper: Send + Sync {
    /// Advance width of `text` at `size` pixels
    fn measure(&self, text: &str, size: f32) -> f32;

    /// Distance from the top of a line to its baseline
    fn ascent(&self, size: f32) -> f32 {
        size * 0.8
    }

    /// Rasterize `text` with its baseline starting at (`x`, `baseline`),
    /// reporting coverage per pixel. Returns false when this shaper cannot
    /// draw glyphs.
    fn draw(
        &self,
        _text: &str,
        _size: f32,
        _x: f32,
        _baseline: f32,
        _plot: &mut dyn FnMut(i32, i32, f32),
    ) -> bool {
        false
    }

    fn can_draw(&self) -> bool {
        false
    }
}

// =============================================================================
// Shapers
// =============================================================================

/// Fixed-ratio measurement matching the Helvetica overlay; draws nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct ApproxShaper;

impl TextShaper for ApproxShaper {
    fn measure(&self, text: &str, size: f32) -> f32 {
        text.chars().count() as f32 * size * HELVETICA_CHAR_WIDTH_RATIO
    }
}

/// TrueType/OpenType shaper backed by `ab_glyph`
#[derive(Clone)]
pub struct FontShaper {
    font: FontArc,
}

impl std::fmt::Debug for FontShaper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FontShaper")
            .field("glyphs", &self.font.glyph_count())
            .finish()
    }
}

impl FontShaper {
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        let font = FontArc::try_from_vec(bytes)
            .map_err(|e| ImposeError::Config(format!("Invalid font: {}", e)))?;
        Ok(Self { font })
    }

    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let bytes = tokio::fs::read(path.as_ref()).await?;
        Self::from_bytes(bytes)
    }
}

impl TextShaper for FontShaper {
    fn measure(&self, text: &str, size: f32) -> f32 {
        let scaled = self.font.as_scaled(size);
        text.chars()
            .map(|ch| scaled.h_advance(self.font.glyph_id(ch)))
            .sum()
    }

    fn ascent(&self, size: f32) -> f32 {
        self.font.as_scaled(size).ascent()
    }

    fn draw(
        &self,
        text: &str,
        size: f32,
        x: f32,
        baseline: f32,
        plot: &mut dyn FnMut(i32, i32, f32),
    ) -> bool {
        let scaled = self.font.as_scaled(size);
        let mut caret = x;
        for ch in text.chars() {
            let glyph_id = self.font.glyph_id(ch);
            let glyph = glyph_id.with_scale_and_position(size, ab_glyph::point(caret, baseline));
            caret += scaled.h_advance(glyph_id);

            if let Some(outlined) = self.font.outline_glyph(glyph) {
                let bounds = outlined.px_bounds();
                outlined.draw(|px, py, coverage| {
                    plot(
                        px as i32 + bounds.min.x as i32,
                        py as i32 + bounds.min.y as i32,
                        coverage,
                    );
                });
            }
        }
        true
    }

    fn can_draw(&self) -> bool {
        true
    }
}

// =============================================================================
// Layout
// =============================================================================

/// One laid-out line
#[derive(Debug, Clone, PartialEq)]
pub struct TextLine {
    pub text: String,
    pub width: f32,
}

/// Text broken into lines at a given size
#[derive(Debug, Clone, PartialEq)]
pub struct TextLayout {
    pub lines: Vec<TextLine>,
    pub font_size: f32,
    /// Distance between consecutive baselines
    pub line_advance: f32,
}

impl TextLayout {
    pub fn width(&self) -> f32 {
        self.lines.iter().map(|l| l.width).fold(0.0, f32::max)
    }

    pub fn height(&self) -> f32 {
        self.lines.len() as f32 * self.line_advance
    }

    pub fn fits(&self, max_width: f32, max_height: f32) -> bool {
        self.width() <= max_width + 0.01 && self.height() <= max_height + 0.01
    }
}

/// Break `text` into lines. Explicit newlines always break; with a
/// `max_width` lines also wrap greedily on spaces. A single word wider than
/// the limit keeps its own line.
pub fn layout_text(
    shaper: &dyn TextShaper,
    text: &str,
    font_size: f32,
    line_height: f32,
    max_width: Option<f32>,
) -> TextLayout {
    let mut lines = Vec::new();
    let space = shaper.measure(" ", font_size);

    for paragraph in text.split('\n') {
        let Some(limit) = max_width else {
            lines.push(TextLine {
                text: paragraph.to_string(),
                width: shaper.measure(paragraph, font_size),
            });
            continue;
        };

        let mut current = String::new();
        let mut current_width = 0.0;
        for word in paragraph.split_whitespace() {
            let word_width = shaper.measure(word, font_size);
            if current.is_empty() {
                current.push_str(word);
                current_width = word_width;
            } else if current_width + space + word_width <= limit {
                current.push(' ');
                current.push_str(word);
                current_width += space + word_width;
            } else {
                lines.push(TextLine {
                    text: std::mem::take(&mut current),
                    width: current_width,
                });
                current.push_str(word);
                current_width = word_width;
            }
        }
        lines.push(TextLine {
            text: current,
            width: current_width,
        });
    }

    TextLayout {
        lines,
        font_size,
        line_advance: font_size * line_height,
    }
}

/// Largest font size in [`min_size`, `max_size`] whose layout fits the box.
///
/// Binary search down to [`FIT_PRECISION`]; returns `min_size` when even the
/// smallest size overflows and `max_size` when the authored size fits.
#[allow(clippy::too_many_arguments)]
pub fn fit_font_size(
    shaper: &dyn TextShaper,
    text: &str,
    max_size: f32,
    min_size: f32,
    line_height: f32,
    box_width: f32,
    box_height: f32,
    wrap: bool,
) -> f32 {
    let fits = |size: f32| {
        let max_width = wrap.then_some(box_width);
        layout_text(shaper, text, size, line_height, max_width).fits(box_width, box_height)
    };

    if max_size <= min_size || fits(max_size) {
        return max_size;
    }
    if !fits(min_size) {
        return min_size;
    }

    let (mut lo, mut hi) = (min_size, max_size);
    while hi - lo > FIT_PRECISION {
        let mid = (lo + hi) / 2.0;
        if fits(mid) {
            lo = mid;
        } else {
            hi = mid;
        }
    }
    lo
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_approx_measure() {
        assert_eq!(ApproxShaper.measure("abcd", 10.0), 20.0);
        assert!(!ApproxShaper.can_draw());
    }

    #[test]
    fn test_wrap_greedy() {
        // Each char is 5 wide at size 10; limit 50 fits "aaa bbb" (35)
        let layout = layout_text(&ApproxShaper, "aaa bbb ccc ddd", 10.0, 1.2, Some(50.0));
        let lines: Vec<&str> = layout.lines.iter().map(|l| l.text.as_str()).collect();
        assert_eq!(lines, vec!["aaa bbb", "ccc ddd"]);
        assert!((layout.height() - 24.0).abs() < 1e-4);
    }

    #[test]
    fn test_newlines_always_break() {
        let layout = layout_text(&ApproxShaper, "a\nb", 10.0, 1.0, None);
        assert_eq!(layout.lines.len(), 2);
    }

    #[test]
    fn test_long_word_keeps_own_line() {
        let layout = layout_text(&ApproxShaper, "x supercalifragilistic y", 10.0, 1.0, Some(30.0));
        assert_eq!(layout.lines.len(), 3);
        assert_eq!(layout.lines[1].text, "supercalifragilistic");
    }

    #[test]
    fn test_fit_keeps_authored_size_when_it_fits() {
        let size = fit_font_size(&ApproxShaper, "Hi", 18.0, 10.0, 1.2, 200.0, 50.0, true);
        assert_eq!(size, 18.0);
    }

    #[test]
    fn test_fit_shrinks_long_text() {
        // 20 chars * 0.5 = 10 units per point of size; 150 wide -> 15
        let text = "ABCDEFGHIJKLMNOPQRST";
        let size = fit_font_size(&ApproxShaper, text, 30.0, 10.0, 1.2, 150.0, 100.0, false);
        assert!(size <= 15.0 && size >= 15.0 - FIT_PRECISION, "{}", size);
    }

    #[test]
    fn test_fit_floors_at_minimum() {
        let text = "A very long name that will never fit in a tiny box";
        let size = fit_font_size(&ApproxShaper, text, 30.0, 10.0, 1.2, 20.0, 10.0, true);
        assert_eq!(size, 10.0);
    }
}
