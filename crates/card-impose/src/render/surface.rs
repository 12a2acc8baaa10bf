//! A reusable RGBA drawing surface.
//!
//! Cards in a batch share one pixel buffer; it is only reallocated when the
//! card size changes.

use card_template::Transform;
use image::{Rgb, RgbImage, Rgba, RgbaImage};

/// Placement of one object on the surface, in surface pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ObjectFrame {
    pub cx: f32,
    pub cy: f32,
    pub width: f32,
    pub height: f32,
    /// Degrees clockwise
    pub angle: f32,
    pub opacity: f32,
}

impl ObjectFrame {
    /// Frame of an object whose transform is in editor pixels.
    ///
    /// `left`/`top` is the top-left of the unrotated box; rotation turns the
    /// box about its center.
    pub fn from_transform(transform: &Transform, scale: f32, offset: f32, opacity: f32) -> Self {
        let width = transform.scaled_width() * scale;
        let height = transform.scaled_height() * scale;
        Self {
            cx: transform.left * scale + offset + width / 2.0,
            cy: transform.top * scale + offset + height / 2.0,
            width,
            height,
            angle: transform.angle,
            opacity: opacity.clamp(0.0, 1.0),
        }
    }

    /// Axis-aligned frame covering a whole surface
    pub fn full(width: u32, height: u32) -> Self {
        Self {
            cx: width as f32 / 2.0,
            cy: height as f32 / 2.0,
            width: width as f32,
            height: height as f32,
            angle: 0.0,
            opacity: 1.0,
        }
    }

    /// Surface point to frame-local coordinates (origin at the frame center)
    pub fn to_local(&self, x: f32, y: f32) -> (f32, f32) {
        let (dx, dy) = (x - self.cx, y - self.cy);
        if self.angle == 0.0 {
            return (dx, dy);
        }
        let (sin, cos) = (-self.angle.to_radians()).sin_cos();
        (dx * cos - dy * sin, dx * sin + dy * cos)
    }

    /// Frame-local point to surface coordinates
    pub fn to_surface(&self, u: f32, v: f32) -> (f32, f32) {
        if self.angle == 0.0 {
            return (u + self.cx, v + self.cy);
        }
        let (sin, cos) = self.angle.to_radians().sin_cos();
        (u * cos - v * sin + self.cx, u * sin + v * cos + self.cy)
    }

    /// Pixel bounds of the rotated frame: (x0, y0, x1, y1), exclusive end
    fn pixel_bounds(&self) -> (i32, i32, i32, i32) {
        let (hw, hh) = (self.width / 2.0, self.height / 2.0);
        let corners = [(-hw, -hh), (hw, -hh), (hw, hh), (-hw, hh)];
        let mut min = (f32::MAX, f32::MAX);
        let mut max = (f32::MIN, f32::MIN);
        for (u, v) in corners {
            let (x, y) = self.to_surface(u, v);
            min = (min.0.min(x), min.1.min(y));
            max = (max.0.max(x), max.1.max(y));
        }
        (
            min.0.floor() as i32,
            min.1.floor() as i32,
            max.0.ceil() as i32,
            max.1.ceil() as i32,
        )
    }
}

/// RGBA canvas with source-over blending
#[derive(Debug, Clone)]
pub struct Surface {
    pixels: RgbaImage,
}

impl Default for Surface {
    fn default() -> Self {
        Self::new()
    }
}

impl Surface {
    pub fn new() -> Self {
        Self {
            pixels: RgbaImage::new(1, 1),
        }
    }

    /// Clear to transparent, resizing only when the dimensions change
    pub fn reset(&mut self, width: u32, height: u32) {
        let (width, height) = (width.max(1), height.max(1));
        if self.pixels.dimensions() == (width, height) {
            for pixel in self.pixels.pixels_mut() {
                *pixel = Rgba([0, 0, 0, 0]);
            }
        } else {
            self.pixels = RgbaImage::new(width, height);
        }
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn pixel(&self, x: u32, y: u32) -> Rgba<u8> {
        *self.pixels.get_pixel(x, y)
    }

    /// Blend `color` at (`x`, `y`) scaled by `coverage`; out-of-range is a no-op
    pub fn blend(&mut self, x: i32, y: i32, color: Rgba<u8>, coverage: f32) {
        if x < 0 || y < 0 || x >= self.width() as i32 || y >= self.height() as i32 {
            return;
        }
        let alpha = color[3] as f32 / 255.0 * coverage.clamp(0.0, 1.0);
        if alpha <= 0.0 {
            return;
        }
        let dst = self.pixels.get_pixel_mut(x as u32, y as u32);
        let dst_alpha = dst[3] as f32 / 255.0;
        let out_alpha = alpha + dst_alpha * (1.0 - alpha);
        for c in 0..3 {
            let src = color[c] as f32;
            let below = dst[c] as f32;
            let value = (src * alpha + below * dst_alpha * (1.0 - alpha)) / out_alpha;
            dst[c] = value.round().clamp(0.0, 255.0) as u8;
        }
        dst[3] = (out_alpha * 255.0).round() as u8;
    }

    /// Paint every pixel inside `frame`, asking `shader` for the colour at
    /// each frame-local pixel center. `None` leaves the pixel untouched.
    pub fn paint<F>(&mut self, frame: &ObjectFrame, mut shader: F)
    where
        F: FnMut(f32, f32) -> Option<Rgba<u8>>,
    {
        if frame.width <= 0.0 || frame.height <= 0.0 || frame.opacity <= 0.0 {
            return;
        }
        let (hw, hh) = (frame.width / 2.0, frame.height / 2.0);
        let (x0, y0, x1, y1) = frame.pixel_bounds();
        let x0 = x0.max(0);
        let y0 = y0.max(0);
        let x1 = x1.min(self.width() as i32);
        let y1 = y1.min(self.height() as i32);

        for y in y0..y1 {
            for x in x0..x1 {
                let (u, v) = frame.to_local(x as f32 + 0.5, y as f32 + 0.5);
                if u < -hw || u > hw || v < -hh || v > hh {
                    continue;
                }
                if let Some(color) = shader(u, v) {
                    self.blend(x, y, color, frame.opacity);
                }
            }
        }
    }

    /// Composite another image into `frame`, stretched to fill it
    pub fn draw_image(&mut self, frame: &ObjectFrame, image: &RgbaImage) {
        let (iw, ih) = image.dimensions();
        if iw == 0 || ih == 0 {
            return;
        }
        self.paint(frame, |u, v| {
            let sx = ((u / frame.width + 0.5) * iw as f32) as u32;
            let sy = ((v / frame.height + 0.5) * ih as f32) as u32;
            Some(*image.get_pixel(sx.min(iw - 1), sy.min(ih - 1)))
        });
    }

    /// Flatten onto white for embedding as an opaque image
    pub fn to_rgb(&self) -> RgbImage {
        let mut out = RgbImage::new(self.width(), self.height());
        for (x, y, pixel) in self.pixels.enumerate_pixels() {
            let alpha = pixel[3] as f32 / 255.0;
            let channel = |c: u8| (c as f32 * alpha + 255.0 * (1.0 - alpha)).round() as u8;
            out.put_pixel(x, y, Rgb([channel(pixel[0]), channel(pixel[1]), channel(pixel[2])]));
        }
        out
    }
}
