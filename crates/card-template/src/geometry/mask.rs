//! Clip-region generation for parametric shapes.
//!
//! Every region is centered on (0, 0) so it can be used directly as a clip
//! path for an object whose origin is its center.

use super::Point;
use crate::constants::{CURVE_SEGMENTS, ROUNDED_RECT_RADIUS, STAR_INNER_RATIO};
use crate::types::{Result, TemplateError};
use serde::{Deserialize, Serialize};
use std::f32::consts::PI;

/// Shape kinds available for shapes and photo masks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MaskShape {
    #[default]
    Rect,
    RoundedRect,
    Circle,
    Ellipse,
    Triangle,
    Pentagon,
    Hexagon,
    Octagon,
    Diamond,
    Star,
    Heart,
    /// An external image supplies the mask
    Custom,
}

impl MaskShape {
    pub fn name(self) -> &'static str {
        match self {
            MaskShape::Rect => "rect",
            MaskShape::RoundedRect => "rounded-rect",
            MaskShape::Circle => "circle",
            MaskShape::Ellipse => "ellipse",
            MaskShape::Triangle => "triangle",
            MaskShape::Pentagon => "pentagon",
            MaskShape::Hexagon => "hexagon",
            MaskShape::Octagon => "octagon",
            MaskShape::Diamond => "diamond",
            MaskShape::Star => "star",
            MaskShape::Heart => "heart",
            MaskShape::Custom => "custom",
        }
    }

    /// True when the shape clips anything away from its bounding box
    pub fn is_clipping(self) -> bool {
        self != MaskShape::Rect
    }
}

/// A clip region produced by [`mask_points`]
#[derive(Debug, Clone, PartialEq)]
pub enum MaskGeometry {
    /// Closed polygon, first point not repeated at the end
    Polygon(Vec<Point>),
    Circle { radius: f32 },
    Ellipse { rx: f32, ry: f32 },
    RoundedRect { width: f32, height: f32, radius: f32 },
    /// Mask comes from an external image rather than derived geometry
    External,
}

impl MaskGeometry {
    /// Whether a point (relative to the mask center) lies inside the region.
    ///
    /// External masks cover everything; the caller applies the image alpha.
    pub fn contains(&self, p: Point) -> bool {
        match self {
            MaskGeometry::Polygon(points) => polygon_contains(points, p),
            MaskGeometry::Circle { radius } => p.x * p.x + p.y * p.y <= radius * radius,
            MaskGeometry::Ellipse { rx, ry } => {
                let nx = p.x / rx;
                let ny = p.y / ry;
                nx * nx + ny * ny <= 1.0
            }
            MaskGeometry::RoundedRect {
                width,
                height,
                radius,
            } => rounded_rect_contains(*width, *height, *radius, p),
            MaskGeometry::External => true,
        }
    }

    /// Vertices of the region, if it is polygonal
    pub fn points(&self) -> Option<&[Point]> {
        match self {
            MaskGeometry::Polygon(points) => Some(points),
            _ => None,
        }
    }
}

/// Generate the clip region for `shape` sized to a `width` x `height` box.
///
/// Fails with [`TemplateError::InvalidGeometry`] when either dimension is not
/// a positive finite number.
pub fn mask_points(shape: MaskShape, width: f32, height: f32) -> Result<MaskGeometry> {
    if !(width.is_finite() && height.is_finite()) || width <= 0.0 || height <= 0.0 {
        return Err(TemplateError::InvalidGeometry(format!(
            "{} mask needs a positive size, got {}x{}",
            shape.name(),
            width,
            height
        )));
    }

    let min_radius = width.min(height) / 2.0;
    let (hw, hh) = (width / 2.0, height / 2.0);

    let geometry = match shape {
        MaskShape::Rect => MaskGeometry::Polygon(vec![
            Point::new(-hw, -hh),
            Point::new(hw, -hh),
            Point::new(hw, hh),
            Point::new(-hw, hh),
        ]),
        MaskShape::RoundedRect => MaskGeometry::RoundedRect {
            width,
            height,
            radius: ROUNDED_RECT_RADIUS.min(min_radius),
        },
        MaskShape::Circle => MaskGeometry::Circle { radius: min_radius },
        MaskShape::Ellipse => MaskGeometry::Ellipse { rx: hw, ry: hh },
        MaskShape::Triangle => MaskGeometry::Polygon(vec![
            Point::new(0.0, -min_radius),
            Point::new(min_radius, min_radius),
            Point::new(-min_radius, min_radius),
        ]),
        MaskShape::Pentagon => MaskGeometry::Polygon(regular_polygon(5, min_radius, -PI / 2.0)),
        MaskShape::Hexagon => MaskGeometry::Polygon(regular_polygon(6, min_radius, -PI / 2.0)),
        MaskShape::Octagon => MaskGeometry::Polygon(regular_polygon(8, min_radius, -PI / 8.0)),
        MaskShape::Diamond => MaskGeometry::Polygon(vec![
            Point::new(0.0, -hh),
            Point::new(hw, 0.0),
            Point::new(0.0, hh),
            Point::new(-hw, 0.0),
        ]),
        MaskShape::Star => {
            let outer = width.max(height) / 2.0;
            MaskGeometry::Polygon(star_polygon(5, outer, outer * STAR_INNER_RATIO))
        }
        MaskShape::Heart => MaskGeometry::Polygon(heart_polygon(width, height)),
        MaskShape::Custom => MaskGeometry::External,
    };

    Ok(geometry)
}

/// Vertices of a regular `sides`-gon, first vertex at `rotation` radians
pub fn regular_polygon(sides: usize, radius: f32, rotation: f32) -> Vec<Point> {
    (0..sides)
        .map(|i| {
            let angle = rotation + (i as f32 * 2.0 * PI) / sides as f32;
            Point::new(radius * angle.cos(), radius * angle.sin())
        })
        .collect()
}

/// Vertices of a star alternating between outer and inner radius, first tip up
pub fn star_polygon(tips: usize, outer: f32, inner: f32) -> Vec<Point> {
    (0..tips * 2)
        .map(|i| {
            let angle = (i as f32 * PI) / tips as f32 - PI / 2.0;
            let radius = if i % 2 == 0 { outer } else { inner };
            Point::new(radius * angle.cos(), radius * angle.sin())
        })
        .collect()
}

/// Heart outline: four cubic curves spanning x in [-25, 25], y in [-27.5, 27.5]
const HEART_CURVES: [[(f32, f32); 4]; 4] = [
    [(0.0, 27.5), (0.0, 27.5), (-25.0, 12.5), (-25.0, -12.5)],
    [(-25.0, -12.5), (-25.0, -32.5), (0.0, -32.5), (0.0, -12.5)],
    [(0.0, -12.5), (0.0, -32.5), (25.0, -32.5), (25.0, -12.5)],
    [(25.0, -12.5), (25.0, 12.5), (0.0, 27.5), (0.0, 27.5)],
];
const HEART_WIDTH: f32 = 50.0;
const HEART_HEIGHT: f32 = 55.0;

fn heart_polygon(width: f32, height: f32) -> Vec<Point> {
    let sx = width / HEART_WIDTH;
    let sy = height / HEART_HEIGHT;
    let mut points = Vec::with_capacity(HEART_CURVES.len() * CURVE_SEGMENTS);

    for [p0, p1, p2, p3] in HEART_CURVES {
        // The last point of each curve is the first of the next
        for step in 0..CURVE_SEGMENTS {
            let t = step as f32 / CURVE_SEGMENTS as f32;
            let (x, y) = cubic_bezier(p0, p1, p2, p3, t);
            points.push(Point::new(x * sx, y * sy));
        }
    }

    points
}

fn cubic_bezier(
    p0: (f32, f32),
    p1: (f32, f32),
    p2: (f32, f32),
    p3: (f32, f32),
    t: f32,
) -> (f32, f32) {
    let mt = 1.0 - t;
    let a = mt * mt * mt;
    let b = 3.0 * mt * mt * t;
    let c = 3.0 * mt * t * t;
    let d = t * t * t;
    (
        a * p0.0 + b * p1.0 + c * p2.0 + d * p3.0,
        a * p0.1 + b * p1.1 + c * p2.1 + d * p3.1,
    )
}

/// Even-odd point-in-polygon test
fn polygon_contains(points: &[Point], p: Point) -> bool {
    let mut inside = false;
    let n = points.len();
    if n < 3 {
        return false;
    }

    let mut j = n - 1;
    for i in 0..n {
        let (a, b) = (points[i], points[j]);
        if (a.y > p.y) != (b.y > p.y) {
            let x_cross = (b.x - a.x) * (p.y - a.y) / (b.y - a.y) + a.x;
            if p.x < x_cross {
                inside = !inside;
            }
        }
        j = i;
    }

    inside
}

fn rounded_rect_contains(width: f32, height: f32, radius: f32, p: Point) -> bool {
    let (hw, hh) = (width / 2.0, height / 2.0);
    let (ax, ay) = (p.x.abs(), p.y.abs());
    if ax > hw || ay > hh {
        return false;
    }

    // Distance into the corner region
    let cx = ax - (hw - radius);
    let cy = ay - (hh - radius);
    if cx <= 0.0 || cy <= 0.0 {
        return true;
    }
    cx * cx + cy * cy <= radius * radius
}

#[cfg(test)]
mod tests {
    use super::*;

    fn within(points: &[Point], hw: f32, hh: f32) -> bool {
        const EPS: f32 = 1e-3;
        points
            .iter()
            .all(|p| p.x.abs() <= hw + EPS && p.y.abs() <= hh + EPS)
    }

    #[test]
    fn test_degenerate_dimensions_rejected() {
        for (w, h) in [(0.0, 10.0), (10.0, 0.0), (-5.0, 10.0), (f32::NAN, 10.0)] {
            let result = mask_points(MaskShape::Circle, w, h);
            assert!(matches!(result, Err(TemplateError::InvalidGeometry(_))));
        }
    }

    #[test]
    fn test_star_vertices() {
        let geometry = mask_points(MaskShape::Star, 100.0, 100.0).unwrap();
        let points = geometry.points().unwrap();
        assert_eq!(points.len(), 10);
        assert!(within(points, 50.0, 50.0));

        // Alternating outer and inner radius
        let radius = |p: &Point| (p.x * p.x + p.y * p.y).sqrt();
        assert!((radius(&points[0]) - 50.0).abs() < 1e-3);
        assert!((radius(&points[1]) - 25.0).abs() < 1e-3);
        // First tip points straight up
        assert!(points[0].x.abs() < 1e-3);
        assert!(points[0].y < 0.0);
    }

    #[test]
    fn test_star_uses_larger_side() {
        let geometry = mask_points(MaskShape::Star, 200.0, 100.0).unwrap();
        let points = geometry.points().unwrap();
        let max_r = points
            .iter()
            .map(|p| (p.x * p.x + p.y * p.y).sqrt())
            .fold(0.0f32, f32::max);
        assert!((max_r - 100.0).abs() < 1e-3);
    }

    #[test]
    fn test_polygons_fit_box() {
        for shape in [
            MaskShape::Rect,
            MaskShape::Triangle,
            MaskShape::Pentagon,
            MaskShape::Hexagon,
            MaskShape::Octagon,
            MaskShape::Diamond,
            MaskShape::Heart,
        ] {
            let geometry = mask_points(shape, 120.0, 80.0).unwrap();
            let points = geometry.points().unwrap();
            assert!(within(points, 60.0, 40.0), "{} exceeds its box", shape.name());
        }
    }

    #[test]
    fn test_regular_polygon_vertex_counts() {
        let count = |shape| match mask_points(shape, 50.0, 50.0).unwrap() {
            MaskGeometry::Polygon(points) => points.len(),
            _ => 0,
        };
        assert_eq!(count(MaskShape::Triangle), 3);
        assert_eq!(count(MaskShape::Pentagon), 5);
        assert_eq!(count(MaskShape::Hexagon), 6);
        assert_eq!(count(MaskShape::Octagon), 8);
    }

    #[test]
    fn test_primitives() {
        assert_eq!(
            mask_points(MaskShape::Circle, 80.0, 40.0).unwrap(),
            MaskGeometry::Circle { radius: 20.0 }
        );
        assert_eq!(
            mask_points(MaskShape::Ellipse, 80.0, 40.0).unwrap(),
            MaskGeometry::Ellipse { rx: 40.0, ry: 20.0 }
        );
        assert_eq!(
            mask_points(MaskShape::Custom, 80.0, 40.0).unwrap(),
            MaskGeometry::External
        );
    }

    #[test]
    fn test_rounded_rect_radius_clamped() {
        match mask_points(MaskShape::RoundedRect, 20.0, 10.0).unwrap() {
            MaskGeometry::RoundedRect { radius, .. } => assert_eq!(radius, 5.0),
            other => panic!("unexpected geometry {:?}", other),
        }
    }

    #[test]
    fn test_contains() {
        let circle = mask_points(MaskShape::Circle, 100.0, 100.0).unwrap();
        assert!(circle.contains(Point::new(0.0, 0.0)));
        assert!(!circle.contains(Point::new(45.0, 45.0)));

        let star = mask_points(MaskShape::Star, 100.0, 100.0).unwrap();
        assert!(star.contains(Point::new(0.0, 0.0)));
        assert!(star.contains(Point::new(0.0, -45.0)));
        assert!(!star.contains(Point::new(45.0, -45.0)));

        let rounded = mask_points(MaskShape::RoundedRect, 100.0, 100.0).unwrap();
        assert!(rounded.contains(Point::new(40.0, 0.0)));
        assert!(!rounded.contains(Point::new(49.5, 49.5)));

        let heart = mask_points(MaskShape::Heart, 100.0, 110.0).unwrap();
        assert!(heart.contains(Point::new(0.0, 20.0)));
        assert!(!heart.contains(Point::new(0.0, -50.0)));
    }
}
