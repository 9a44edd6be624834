//! Greedy grid-scan rectangle packing in the unit square.

use crate::types::SubUvIndex;
use glam::Vec2;

/// Slack for float comparisons on the scan grid.
const EPSILON: f64 = 1e-9;

/// The packed footprint of one sub-UV set, in normalized atlas space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UvRectangle {
    pub sub_uv: SubUvIndex,
    /// Bottom-left corner; `None` until packed.
    pub position: Option<[f64; 2]>,
    pub width: f64,
    pub height: f64,
}

impl UvRectangle {
    pub fn new(sub_uv: SubUvIndex, width: f64, height: f64) -> Self {
        Self {
            sub_uv,
            position: None,
            width,
            height,
        }
    }

    pub fn area(&self) -> f64 {
        self.width * self.height
    }

    /// Would this rectangle, placed at `(x, y)`, overlap `other`?
    ///
    /// Intervals are half-open, so rectangles sharing an edge do not overlap.
    /// An unplaced `other` never overlaps.
    pub fn could_overlap(&self, x: f64, y: f64, other: &UvRectangle) -> bool {
        let Some([ox, oy]) = other.position else {
            return false;
        };

        let horizontal = x < ox + other.width - EPSILON && ox < x + self.width - EPSILON;
        let vertical = y < oy + other.height - EPSILON && oy < y + self.height - EPSILON;

        horizontal && vertical
    }

    pub fn overlaps(&self, other: &UvRectangle) -> bool {
        match self.position {
            Some([x, y]) => self.could_overlap(x, y, other),
            None => false,
        }
    }

    /// Map a UV in the island's own [0, 1] space into this rectangle.
    /// An unplaced rectangle maps from the origin.
    pub fn transform_uv(&self, uv: Vec2) -> Vec2 {
        let [x, y] = self.position.unwrap_or([0.0, 0.0]);
        Vec2::new(
            (uv.x as f64 * self.width + x) as f32,
            (uv.y as f64 * self.height + y) as f32,
        )
    }
}

/// Grid coordinates `0, stride, 2 * stride, ...` up to and including `limit`.
fn scan_steps(limit: f64, stride: f64) -> impl Iterator<Item = f64> {
    let count = if limit < -EPSILON {
        0
    } else {
        (limit / stride + EPSILON).floor() as usize + 1
    };
    (0..count).map(move |i| i as f64 * stride)
}

/// Try to place `rects[index]` against the already placed `rects[..index]`.
fn place_rect(rects: &mut [UvRectangle], index: usize, stride_x: f64, stride_y: f64) -> bool {
    let (placed, rest) = rects.split_at_mut(index);
    let rect = &mut rest[0];

    // Rows bottom to top, columns left to right.
    for y in scan_steps(1.0 - rect.height, stride_y) {
        for x in scan_steps(1.0 - rect.width, stride_x) {
            if !placed.iter().any(|other| rect.could_overlap(x, y, other)) {
                rect.position = Some([x, y]);
                return true;
            }
        }
    }

    false
}

/// Pack rectangles into the unit square, largest first.
///
/// Rectangles are sorted by descending area in place and positioned on a
/// grid whose stride is the smallest width and height among them. Returns
/// false, leaving positions partially assigned, as soon as one rectangle
/// finds no free spot. Rectangles with a non-positive side cannot be packed.
///
/// Candidate positions on each axis cover the closed range `[0, 1 - size]`.
/// The far edge is included so that a rectangle spanning the whole axis, or
/// one that only fits flush against the right or top border, still finds its
/// spot. Overlap tests are half-open, so touching edges do not collide.
pub fn pack_rects(rects: &mut [UvRectangle]) -> bool {
    rects.sort_by(|a, b| b.area().total_cmp(&a.area()));

    for rect in rects.iter_mut() {
        rect.position = None;
    }

    let stride_x = rects.iter().map(|r| r.width).fold(1.0f64, f64::min);
    let stride_y = rects.iter().map(|r| r.height).fold(1.0f64, f64::min);
    if stride_x <= 0.0 || stride_y <= 0.0 {
        return false;
    }

    for index in 0..rects.len() {
        if !place_rect(rects, index, stride_x, stride_y) {
            log::debug!(
                "No room for {:.4}x{:.4} rectangle of set {}",
                rects[index].width,
                rects[index].height,
                rects[index].sub_uv
            );
            return false;
        }
    }

    true
}
