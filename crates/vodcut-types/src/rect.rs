use std::fmt;
use std::ops::{BitAnd, BitAndAssign};

use serde::{Deserialize, Serialize};

/// Height and width of a video frame in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameShape {
    pub height: u32,
    pub width: u32,
}

impl FrameShape {
    pub fn new(height: u32, width: u32) -> Self {
        Self { height, width }
    }

    pub fn pixel_count(&self) -> usize {
        self.height as usize * self.width as usize
    }

    pub fn bounds(&self) -> Rect {
        Rect::new(0.0, 0.0, self.height as f64, self.width as f64)
    }
}

/// Axis-aligned rectangle in pixel units.
///
/// Coordinates stay fractional while detectors reason about layout ratios and
/// are only rounded when a consumer turns the rect into pixel ranges with
/// [`Rect::pixel_span`]. A rect with zero area means "no region".
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub top: f64,
    pub left: f64,
    pub height: f64,
    pub width: f64,
}

/// Integer pixel ranges covered by a [`Rect`] after rounding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelSpan {
    pub top: usize,
    pub left: usize,
    pub height: usize,
    pub width: usize,
}

impl PixelSpan {
    pub fn bottom(&self) -> usize {
        self.top + self.height
    }

    pub fn right(&self) -> usize {
        self.left + self.width
    }
}

impl Rect {
    pub fn new(top: f64, left: f64, height: f64, width: f64) -> Self {
        Self {
            top,
            left,
            height,
            width,
        }
    }

    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }

    pub fn right(&self) -> f64 {
        self.left + self.width
    }

    pub fn area(&self) -> f64 {
        self.height.max(0.0) * self.width.max(0.0)
    }

    pub fn is_empty(&self) -> bool {
        self.area() <= 0.0
    }

    /// Absolute `(y, x)` position of the fractional coordinate `(fy, fx)`.
    pub fn at(&self, fy: f64, fx: f64) -> (f64, f64) {
        (self.top + fy * self.height, self.left + fx * self.width)
    }

    pub fn intersect(&self, other: &Rect) -> Rect {
        let top = self.top.max(other.top);
        let left = self.left.max(other.left);
        let bottom = self.bottom().min(other.bottom());
        let right = self.right().min(other.right());
        Rect {
            top,
            left,
            height: (bottom - top).max(0.0),
            width: (right - left).max(0.0),
        }
    }

    /// Rounds the rect to whole pixels, clamped at the origin.
    ///
    /// Returns `None` when the rounded rect covers no pixel.
    pub fn pixel_span(&self) -> Option<PixelSpan> {
        if !self.top.is_finite()
            || !self.left.is_finite()
            || !self.height.is_finite()
            || !self.width.is_finite()
        {
            return None;
        }
        let top = self.top.round().max(0.0);
        let left = self.left.round().max(0.0);
        let bottom = self.bottom().round();
        let right = self.right().round();
        if bottom <= top || right <= left {
            return None;
        }
        Some(PixelSpan {
            top: top as usize,
            left: left as usize,
            height: (bottom - top) as usize,
            width: (right - left) as usize,
        })
    }
}

impl fmt::Display for Rect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Rect(top={:.1}, left={:.1}, height={:.1}, width={:.1})",
            self.top, self.left, self.height, self.width
        )
    }
}

impl BitAnd for Rect {
    type Output = Rect;

    fn bitand(self, rhs: Rect) -> Rect {
        self.intersect(&rhs)
    }
}

impl BitAnd<FrameShape> for Rect {
    type Output = Rect;

    fn bitand(self, rhs: FrameShape) -> Rect {
        self.intersect(&rhs.bounds())
    }
}

impl BitAndAssign for Rect {
    fn bitand_assign(&mut self, rhs: Rect) {
        *self = self.intersect(&rhs);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn samples() -> Vec<Rect> {
        vec![
            Rect::new(0.0, 0.0, 10.0, 10.0),
            Rect::new(5.5, -3.0, 20.0, 7.25),
            Rect::new(30.0, 30.0, 4.0, 4.0),
            Rect::new(-10.0, 2.0, 15.0, 100.0),
            Rect::new(8.0, 8.0, 0.0, 5.0),
        ]
    }

    #[test]
    fn intersection_is_commutative() {
        for a in samples() {
            for b in samples() {
                assert_eq!(a & b, b & a, "{a} & {b}");
            }
        }
    }

    #[test]
    fn intersection_is_idempotent() {
        for a in samples() {
            for b in samples() {
                let once = a & b;
                assert_eq!(once & b, once, "{a} & {b}");
            }
        }
    }

    #[test]
    fn disjoint_rects_intersect_to_empty() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        let b = Rect::new(30.0, 30.0, 4.0, 4.0);
        let both = a & b;
        assert!(both.is_empty());
        assert!(both.height >= 0.0 && both.width >= 0.0);
        assert_eq!(both.pixel_span(), None);
    }

    #[test]
    fn intersection_with_shape_clamps_to_frame() {
        let rect = Rect::new(-5.0, 600.0, 100.0, 100.0);
        let clipped = rect & FrameShape::new(480, 640);
        assert_eq!(clipped, Rect::new(0.0, 600.0, 95.0, 40.0));
    }

    #[test]
    fn fractional_lookup_stays_inside_rect() {
        let rect = Rect::new(12.5, 40.0, 411.0, 548.0);
        for fy in [0.0, 0.25, 0.5, 0.87, 1.0] {
            for fx in [0.0, 0.2, 0.4381, 0.9, 1.0] {
                let (y, x) = rect.at(fy, fx);
                assert!(y >= rect.top && y <= rect.bottom());
                assert!(x >= rect.left && x <= rect.right());
            }
        }
        assert_eq!(rect.at(0.0, 0.0), (12.5, 40.0));
        assert_eq!(rect.at(1.0, 1.0), (rect.bottom(), rect.right()));
    }

    #[test]
    fn pixel_span_rounds_edges() {
        let span = Rect::new(1.4, 2.6, 3.2, 4.0).pixel_span().unwrap();
        assert_eq!(
            span,
            PixelSpan {
                top: 1,
                left: 3,
                height: 4,
                width: 4
            }
        );
        assert_eq!(span.bottom(), 5);
        assert_eq!(span.right(), 7);
    }
}
