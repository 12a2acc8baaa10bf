//! Rasterizing a resolved side onto a [`Surface`].
//!
//! Coordinates coming out of the template are editor pixels; everything here
//! works in surface pixels at the export resolution, shifted by the bleed.

use super::color::{color_or, mix, parse_color};
use super::surface::{ObjectFrame, Surface};
use super::symbols::{encode_barcode, encode_qr};
use super::text::{TextShaper, layout_text};
use crate::constants::{BARCODE_TEXT_SHARE, PLACEHOLDER_FILL, PLACEHOLDER_STROKE};
use crate::marks::unencodable_chars;
use crate::stats::RecordIssue;
use card_template::{
    Background, BarcodeProps, DesignObject, ImageFit, MaskConfig, MaskGeometry, MaskShape,
    ObjectKind, Point, QrProps, Side, TextAlign, TextProps, mask_points,
};
use image::{Rgba, RgbaImage};
use std::collections::HashMap;
use std::sync::Arc;

const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);
const BLACK: Rgba<u8> = Rgba([0, 0, 0, 255]);

/// Decoded images by URL
pub type ImageMap = HashMap<String, Arc<RgbaImage>>;

/// Text left for the page builder to set as vector text
#[derive(Debug, Clone, PartialEq)]
pub struct TextRun {
    pub text: String,
    /// Line origin from the left of the bleed box (mm)
    pub x_mm: f32,
    /// Baseline from the top of the bleed box (mm)
    pub baseline_mm: f32,
    pub size_mm: f32,
    pub color: Rgba<u8>,
    /// Degrees clockwise
    pub angle: f32,
}

/// Inputs shared by every object on one card
pub struct DrawContext<'a> {
    /// Surface pixels per editor pixel
    pub scale: f32,
    /// Bleed in surface pixels
    pub offset: f32,
    /// Surface pixels per millimeter
    pub px_per_mm: f32,
    pub shared_images: &'a ImageMap,
    pub record_images: &'a ImageMap,
    pub shaper: &'a dyn TextShaper,
}

impl DrawContext<'_> {
    fn image(&self, url: &str) -> Option<&RgbaImage> {
        self.record_images
            .get(url)
            .or_else(|| self.shared_images.get(url))
            .map(|image| image.as_ref())
    }

    fn frame(&self, object: &DesignObject, surface: &Surface) -> ObjectFrame {
        if object.data.is_background {
            let mut frame = ObjectFrame::full(surface.width(), surface.height());
            frame.opacity = object.style.opacity.clamp(0.0, 1.0);
            return frame;
        }
        ObjectFrame::from_transform(
            &object.transform,
            self.scale,
            self.offset,
            object.style.opacity,
        )
    }
}

/// Draw a whole side: background first, then objects in z-order
pub fn draw_side(
    surface: &mut Surface,
    side: &Side,
    ctx: &DrawContext<'_>,
    runs: &mut Vec<TextRun>,
    issues: &mut Vec<RecordIssue>,
) {
    let full = ObjectFrame::full(surface.width(), surface.height());
    paint_background(surface, &full, &side.background, ctx);

    for object in side.objects.iter().filter(|o| o.visible) {
        draw_object(surface, object, ctx, runs, issues);
    }
}

/// Draw one object
pub fn draw_object(
    surface: &mut Surface,
    object: &DesignObject,
    ctx: &DrawContext<'_>,
    runs: &mut Vec<TextRun>,
    issues: &mut Vec<RecordIssue>,
) {
    let frame = ctx.frame(object, surface);
    if frame.width < 0.5 || frame.height < 0.5 {
        return;
    }

    match &object.kind {
        ObjectKind::Shape(props) => {
            let fill = object.style.fill.as_deref().and_then(parse_color);
            let stroke = object.style.stroke.as_deref().and_then(parse_color);
            let shape = if props.shape == MaskShape::Custom {
                MaskShape::Rect
            } else {
                props.shape
            };
            paint_shape(
                surface,
                &frame,
                shape,
                fill,
                stroke,
                object.style.stroke_width * ctx.scale,
            );
        }
        ObjectKind::VariableBox(props) => {
            let fill = object.style.fill.as_deref().and_then(parse_color);
            let stroke = object.style.stroke.as_deref().and_then(parse_color);
            let geometry = rounded(&frame, props.corner_radius * ctx.scale);
            let inner = stroke_inner(&frame, object.style.stroke_width * ctx.scale, |w, h| {
                Some(rounded_wh(w, h, props.corner_radius * ctx.scale))
            });
            paint_regions(surface, &frame, &geometry, inner.as_ref(), fill, stroke);
        }
        ObjectKind::Text(props) | ObjectKind::VariableText(props) => {
            draw_text(surface, &frame, props, ctx, runs);
            if !ctx.shaper.can_draw() {
                let chars = unencodable_chars(&props.text);
                if !chars.is_empty() {
                    issues.push(RecordIssue::GlyphsDropped {
                        object: object.id.clone(),
                        chars,
                    });
                }
            }
        }
        ObjectKind::PhotoPlaceholder(_) => {
            let shape = object.data.mask.unwrap_or(MaskShape::Rect);
            draw_placeholder(surface, &frame, shape, ctx.scale);
        }
        ObjectKind::MaskedPhoto(config) => {
            draw_masked_photo(surface, &frame, object, config, ctx);
        }
        ObjectKind::Image(props) => {
            let Some(image) = ctx.image(&props.src) else {
                return;
            };
            let clip = props.clip.unwrap_or(MaskShape::Rect);
            let custom = object
                .data
                .custom_mask_src
                .as_deref()
                .and_then(|src| ctx.image(src));
            let geometry = geometry_for(clip, &frame);
            let sampler = ImageSampler::new(image, &frame, props.fit, props.position, 1.0);
            surface.paint(&frame, |u, v| {
                if !geometry.contains(Point::new(u, v)) {
                    return None;
                }
                let color = sampler.sample(u, v)?;
                Some(apply_custom_mask(color, custom, &frame, u, v))
            });
        }
        ObjectKind::Barcode(props) => {
            if let Err(reason) = draw_barcode(surface, &frame, props, ctx, runs) {
                issues.push(RecordIssue::SymbolFailed {
                    object: object.id.clone(),
                    reason,
                });
            }
        }
        ObjectKind::Qrcode(props) => {
            if let Err(reason) = draw_qr(surface, &frame, props) {
                issues.push(RecordIssue::SymbolFailed {
                    object: object.id.clone(),
                    reason,
                });
            }
        }
        ObjectKind::GroupBackground(props) => {
            paint_background(surface, &frame, &props.paint, ctx);
        }
    }
}

// =============================================================================
// Regions
// =============================================================================

fn geometry_for(shape: MaskShape, frame: &ObjectFrame) -> MaskGeometry {
    mask_points(shape, frame.width, frame.height).unwrap_or(MaskGeometry::External)
}

fn rounded_wh(width: f32, height: f32, radius: f32) -> MaskGeometry {
    MaskGeometry::RoundedRect {
        width,
        height,
        radius: radius.clamp(0.0, width.min(height) / 2.0),
    }
}

fn rounded(frame: &ObjectFrame, radius: f32) -> MaskGeometry {
    rounded_wh(frame.width, frame.height, radius)
}

/// Region left after removing a stroke band of `width` from the outside.
///
/// `None` means the stroke covers everything; a zero width yields no band.
fn stroke_inner<F>(frame: &ObjectFrame, width: f32, make: F) -> Option<MaskGeometry>
where
    F: Fn(f32, f32) -> Option<MaskGeometry>,
{
    if width <= 0.0 {
        return make(frame.width, frame.height);
    }
    let (w, h) = (frame.width - width * 2.0, frame.height - width * 2.0);
    if w <= 0.0 || h <= 0.0 {
        return None;
    }
    make(w, h)
}

/// Fill the inside of `outer` and stroke the band between `outer` and `inner`
fn paint_regions(
    surface: &mut Surface,
    frame: &ObjectFrame,
    outer: &MaskGeometry,
    inner: Option<&MaskGeometry>,
    fill: Option<Rgba<u8>>,
    stroke: Option<Rgba<u8>>,
) {
    surface.paint(frame, |u, v| {
        let p = Point::new(u, v);
        if !outer.contains(p) {
            return None;
        }
        let in_band = inner.is_none_or(|inner| !inner.contains(p));
        match (in_band, stroke) {
            (true, Some(stroke)) => Some(stroke),
            _ => fill,
        }
    });
}

fn paint_shape(
    surface: &mut Surface,
    frame: &ObjectFrame,
    shape: MaskShape,
    fill: Option<Rgba<u8>>,
    stroke: Option<Rgba<u8>>,
    stroke_width: f32,
) {
    let outer = geometry_for(shape, frame);
    let band = if stroke.is_some() { stroke_width } else { 0.0 };
    let inner = stroke_inner(frame, band, |w, h| mask_points(shape, w, h).ok());
    if band <= 0.0 {
        paint_regions(surface, frame, &outer, Some(&outer), fill, None);
    } else {
        paint_regions(surface, frame, &outer, inner.as_ref(), fill, stroke);
    }
}

fn draw_placeholder(surface: &mut Surface, frame: &ObjectFrame, shape: MaskShape, scale: f32) {
    let shape = if shape == MaskShape::Custom {
        MaskShape::Rect
    } else {
        shape
    };
    paint_shape(
        surface,
        frame,
        shape,
        parse_color(PLACEHOLDER_FILL),
        parse_color(PLACEHOLDER_STROKE),
        scale,
    );
}

// =============================================================================
// Images
// =============================================================================

/// Maps frame-local points into an image placed with a fit mode
struct ImageSampler<'a> {
    image: &'a RgbaImage,
    origin: (f32, f32),
    scale: (f32, f32),
}

impl<'a> ImageSampler<'a> {
    /// `position` aligns the image inside the frame in percent (50/50 =
    /// centered); `zoom` enlarges it on top of the fit.
    fn new(image: &'a RgbaImage, frame: &ObjectFrame, fit: ImageFit, position: Point, zoom: f32) -> Self {
        let (iw, ih) = (image.width().max(1) as f32, image.height().max(1) as f32);
        let (sx, sy) = match fit {
            ImageFit::Cover => {
                let s = (frame.width / iw).max(frame.height / ih) * zoom;
                (s, s)
            }
            ImageFit::Contain => {
                let s = (frame.width / iw).min(frame.height / ih) * zoom;
                (s, s)
            }
            ImageFit::Stretch => (frame.width / iw * zoom, frame.height / ih * zoom),
        };
        let (dw, dh) = (iw * sx, ih * sy);
        let px = position.x.clamp(0.0, 100.0) / 100.0;
        let py = position.y.clamp(0.0, 100.0) / 100.0;
        let origin = (
            -frame.width / 2.0 + (frame.width - dw) * px,
            -frame.height / 2.0 + (frame.height - dh) * py,
        );
        Self {
            image,
            origin,
            scale: (sx, sy),
        }
    }

    fn sample(&self, u: f32, v: f32) -> Option<Rgba<u8>> {
        let ix = ((u - self.origin.0) / self.scale.0).floor();
        let iy = ((v - self.origin.1) / self.scale.1).floor();
        if ix < 0.0 || iy < 0.0 {
            return None;
        }
        let (ix, iy) = (ix as u32, iy as u32);
        (ix < self.image.width() && iy < self.image.height()).then(|| *self.image.get_pixel(ix, iy))
    }
}

/// Scale a colour's alpha by the luminance and alpha of a mask image
/// stretched over the frame
fn apply_custom_mask(
    mut color: Rgba<u8>,
    mask: Option<&RgbaImage>,
    frame: &ObjectFrame,
    u: f32,
    v: f32,
) -> Rgba<u8> {
    let Some(mask) = mask else {
        return color;
    };
    let (mw, mh) = mask.dimensions();
    if mw == 0 || mh == 0 {
        return color;
    }
    let mx = (((u / frame.width) + 0.5) * mw as f32) as u32;
    let my = (((v / frame.height) + 0.5) * mh as f32) as u32;
    let m = mask.get_pixel(mx.min(mw - 1), my.min(mh - 1));
    let luminance = 0.299 * m[0] as f32 + 0.587 * m[1] as f32 + 0.114 * m[2] as f32;
    let coverage = luminance / 255.0 * (m[3] as f32 / 255.0);
    color[3] = (color[3] as f32 * coverage).round() as u8;
    color
}

fn draw_masked_photo(
    surface: &mut Surface,
    frame: &ObjectFrame,
    object: &DesignObject,
    config: &MaskConfig,
    ctx: &DrawContext<'_>,
) {
    let photo = config.photo_src.as_deref().and_then(|src| ctx.image(src));
    let custom = config
        .custom_mask_src
        .as_deref()
        .or(object.data.custom_mask_src.as_deref())
        .and_then(|src| ctx.image(src));

    let Some(photo) = photo else {
        draw_placeholder(surface, frame, config.shape, ctx.scale);
        return;
    };

    let geometry = geometry_for(config.shape, frame);
    let zoom = (config.photo_scale / 100.0).max(0.01);
    let sampler = ImageSampler::new(photo, frame, ImageFit::Cover, config.photo_position, zoom);
    surface.paint(frame, |u, v| {
        if !geometry.contains(Point::new(u, v)) {
            return None;
        }
        let color = sampler.sample(u, v)?;
        Some(apply_custom_mask(color, custom, frame, u, v))
    });

    let border = config.border_width * ctx.scale;
    if border > 0.0 && config.shape != MaskShape::Custom {
        let color = color_or(config.border_color.as_deref(), WHITE);
        let inner = stroke_inner(frame, border, |w, h| mask_points(config.shape, w, h).ok());
        surface.paint(frame, |u, v| {
            let p = Point::new(u, v);
            let in_band = geometry.contains(p) && inner.as_ref().is_none_or(|i| !i.contains(p));
            in_band.then_some(color)
        });
    }
}

// =============================================================================
// Backgrounds
// =============================================================================

fn paint_background(
    surface: &mut Surface,
    frame: &ObjectFrame,
    paint: &Background,
    ctx: &DrawContext<'_>,
) {
    match paint {
        Background::Solid { color } => {
            if let Some(color) = parse_color(color) {
                surface.paint(frame, |_, _| Some(color));
            }
        }
        Background::LinearGradient { from, to, angle } => {
            let from = color_or(Some(from), WHITE);
            let to = color_or(Some(to), WHITE);
            let (dy, dx) = angle.to_radians().sin_cos();
            // Half-extent of the frame along the gradient direction
            let reach = (frame.width / 2.0 * dx.abs() + frame.height / 2.0 * dy.abs()).max(1e-3);
            surface.paint(frame, |u, v| {
                let t = ((u * dx + v * dy) / reach + 1.0) / 2.0;
                Some(mix(from, to, t))
            });
        }
        Background::Image { src } => {
            if let Some(image) = ctx.image(src) {
                let sampler =
                    ImageSampler::new(image, frame, ImageFit::Cover, Point::new(50.0, 50.0), 1.0);
                surface.paint(frame, |u, v| sampler.sample(u, v));
            }
        }
    }
}

// =============================================================================
// Text
// =============================================================================

fn draw_text(
    surface: &mut Surface,
    frame: &ObjectFrame,
    props: &TextProps,
    ctx: &DrawContext<'_>,
    runs: &mut Vec<TextRun>,
) {
    if props.text.trim().is_empty() {
        return;
    }
    let color = color_or(Some(&props.fill), BLACK);
    let size = props.font_size * ctx.scale;
    let max_width = props.wrap.then_some(frame.width);
    let layout = layout_text(ctx.shaper, &props.text, size, props.line_height, max_width);
    let ascent = ctx.shaper.ascent(size);

    for (i, line) in layout.lines.iter().enumerate() {
        if line.text.is_empty() {
            continue;
        }
        let x = match props.text_align {
            TextAlign::Left => 0.0,
            TextAlign::Center => (frame.width - line.width) / 2.0,
            TextAlign::Right => frame.width - line.width,
        };
        let baseline = ascent + i as f32 * layout.line_advance;
        set_line(surface, frame, &line.text, size, x, baseline, color, ctx, runs);
    }
}

/// Draw one line at (`x`, `baseline`) measured from the frame's top-left
#[allow(clippy::too_many_arguments)]
fn set_line(
    surface: &mut Surface,
    frame: &ObjectFrame,
    text: &str,
    size: f32,
    x: f32,
    baseline: f32,
    color: Rgba<u8>,
    ctx: &DrawContext<'_>,
    runs: &mut Vec<TextRun>,
) {
    let (hw, hh) = (frame.width / 2.0, frame.height / 2.0);
    let color = Rgba([
        color[0],
        color[1],
        color[2],
        (color[3] as f32 * frame.opacity).round() as u8,
    ]);

    if ctx.shaper.can_draw() {
        ctx.shaper.draw(text, size, x, baseline, &mut |px, py, coverage| {
            let (sx, sy) = frame.to_surface(px as f32 + 0.5 - hw, py as f32 + 0.5 - hh);
            surface.blend(sx.floor() as i32, sy.floor() as i32, color, coverage);
        });
        return;
    }

    let (sx, sy) = frame.to_surface(x - hw, baseline - hh);
    runs.push(TextRun {
        text: text.to_string(),
        x_mm: sx / ctx.px_per_mm,
        baseline_mm: sy / ctx.px_per_mm,
        size_mm: size / ctx.px_per_mm,
        color,
        angle: frame.angle,
    });
}

// =============================================================================
// Symbols
// =============================================================================

fn draw_barcode(
    surface: &mut Surface,
    frame: &ObjectFrame,
    props: &BarcodeProps,
    ctx: &DrawContext<'_>,
    runs: &mut Vec<TextRun>,
) -> Result<(), String> {
    let Some(value) = props.value.as_deref() else {
        return Ok(());
    };
    let modules = encode_barcode(props.format, value)?;
    if modules.is_empty() {
        return Ok(());
    }

    let bar_height = if props.show_value {
        frame.height * (1.0 - BARCODE_TEXT_SHARE)
    } else {
        frame.height
    };
    let module_width = frame.width / modules.len() as f32;
    let (hw, hh) = (frame.width / 2.0, frame.height / 2.0);

    surface.paint(frame, |u, v| {
        let (lx, ly) = (u + hw, v + hh);
        if ly >= bar_height {
            return Some(WHITE);
        }
        let index = ((lx / module_width) as usize).min(modules.len() - 1);
        Some(if modules[index] { BLACK } else { WHITE })
    });

    if props.show_value {
        let size = frame.height * BARCODE_TEXT_SHARE * 0.8;
        let width = ctx.shaper.measure(value, size);
        let x = (frame.width - width) / 2.0;
        let baseline = frame.height - frame.height * BARCODE_TEXT_SHARE * 0.15;
        set_line(surface, frame, value, size, x, baseline, BLACK, ctx, runs);
    }
    Ok(())
}

fn draw_qr(surface: &mut Surface, frame: &ObjectFrame, props: &QrProps) -> Result<(), String> {
    let Some(value) = props.value.as_deref() else {
        return Ok(());
    };
    let matrix = encode_qr(value, props.margin)?;
    let side = frame.width.min(frame.height);
    let module = side / matrix.width() as f32;
    let half = side / 2.0;

    surface.paint(frame, |u, v| {
        if u < -half || u >= half || v < -half || v >= half {
            return None;
        }
        let mx = ((u + half) / module) as usize;
        let my = ((v + half) / module) as usize;
        Some(if matrix.is_dark(mx, my) { BLACK } else { WHITE })
    });
    Ok(())
}
