use kurbo::{BezPath, Point, Rect, Shape};
use skrifa::outline::OutlinePen;

/// Collects an outline as a kurbo path, in font units.
#[derive(Default)]
pub(crate) struct PathPen {
    path: BezPath,
}

impl PathPen {
    /// Signed area enclosed by all contours.
    pub fn area(&self) -> f64 {
        self.path.area()
    }

    /// Bounds of the outline, or `None` for an empty glyph.
    pub fn bounds(&self) -> Option<Rect> {
        (!self.path.elements().is_empty()).then(|| self.path.bounding_box())
    }
}

impl OutlinePen for PathPen {
    fn move_to(&mut self, x: f32, y: f32) {
        self.path.move_to(point(x, y));
    }

    fn line_to(&mut self, x: f32, y: f32) {
        self.path.line_to(point(x, y));
    }

    fn quad_to(&mut self, cx0: f32, cy0: f32, x: f32, y: f32) {
        self.path.quad_to(point(cx0, cy0), point(x, y));
    }

    fn curve_to(&mut self, cx0: f32, cy0: f32, cx1: f32, cy1: f32, x: f32, y: f32) {
        self.path
            .curve_to(point(cx0, cy0), point(cx1, cy1), point(x, y));
    }

    fn close(&mut self) {
        self.path.close_path();
    }
}

fn point(x: f32, y: f32) -> Point {
    Point::new(x as f64, y as f64)
}

/// Feeds an outline into a tiny-skia path.
///
/// Coordinates are scaled, moved to the glyph's pen position and flipped
/// so that y grows downwards.
pub(crate) struct SkiaPen<'a> {
    builder: &'a mut tiny_skia::PathBuilder,
    scale: f32,
    x: f32,
    y: f32,
}

impl<'a> SkiaPen<'a> {
    pub fn new(builder: &'a mut tiny_skia::PathBuilder, scale: f32, x: f32, y: f32) -> Self {
        Self {
            builder,
            scale,
            x,
            y,
        }
    }

    fn map(&self, x: f32, y: f32) -> (f32, f32) {
        ((self.x + x) * self.scale, -(self.y + y) * self.scale)
    }
}

impl OutlinePen for SkiaPen<'_> {
    fn move_to(&mut self, x: f32, y: f32) {
        let (x, y) = self.map(x, y);
        self.builder.move_to(x, y);
    }

    fn line_to(&mut self, x: f32, y: f32) {
        let (x, y) = self.map(x, y);
        self.builder.line_to(x, y);
    }

    fn quad_to(&mut self, cx0: f32, cy0: f32, x: f32, y: f32) {
        let (cx0, cy0) = self.map(cx0, cy0);
        let (x, y) = self.map(x, y);
        self.builder.quad_to(cx0, cy0, x, y);
    }

    fn curve_to(&mut self, cx0: f32, cy0: f32, cx1: f32, cy1: f32, x: f32, y: f32) {
        let (cx0, cy0) = self.map(cx0, cy0);
        let (cx1, cy1) = self.map(cx1, cy1);
        let (x, y) = self.map(x, y);
        self.builder.cubic_to(cx0, cy0, cx1, cy1, x, y);
    }

    fn close(&mut self) {
        self.builder.close();
    }
}
