//! Scoring differences between two glyph shapes.

use crate::{error::DiffError, signature::Glyph, source::FontSource};

/// An 8-bit alpha bitmap, stored row by row.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Bitmap {
    width: usize,
    height: usize,
    data: Vec<u8>,
}

impl Bitmap {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            data: vec![0; width * height],
        }
    }

    /// Wraps existing pixels. Returns `None` if the length does not match
    /// the dimensions.
    pub fn from_data(width: usize, height: usize, data: Vec<u8>) -> Option<Self> {
        (data.len() == width * height).then_some(Self {
            width,
            height,
            data,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn get(&self, x: usize, y: usize) -> Option<u8> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.data.get(y * self.width + x).copied()
    }

    pub fn set(&mut self, x: usize, y: usize, value: u8) {
        if x < self.width && y < self.height {
            self.data[y * self.width + x] = value;
        }
    }
}

/// How glyph outlines are compared.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ShapeMode {
    /// Compare the area enclosed by each outline.
    #[default]
    Area,
    /// Shape and rasterize each glyph, then compare pixels.
    Render,
}

pub(crate) fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

/// Absolute difference between the magnitudes of two areas.
pub fn diff_area(area_a: f64, area_b: f64) -> f64 {
    (area_b.abs() - area_a.abs()).abs()
}

/// Relative difference between two areas, rounded to four places.
///
/// Two empty outlines are identical.
pub fn diff_area_ratio(area_a: f64, area_b: f64) -> f64 {
    let (a, b) = (area_a.abs(), area_b.abs());
    let largest = a.max(b);
    if largest == 0.0 {
        return 0.0;
    }
    round4((a.min(b) / largest - 1.0).abs())
}

/// Rescales an area measured in `from_upm` units into `to_upm` units.
pub fn scale_area(area: f64, from_upm: u16, to_upm: u16) -> f64 {
    if from_upm == 0 || from_upm == to_upm {
        return area;
    }
    let factor = to_upm as f64 / from_upm as f64;
    area * factor * factor
}

/// Ratio of mismatched pixels between two bitmaps.
///
/// Both bitmaps are centered on a canvas as large as the larger of the
/// two in each dimension. A canvas pixel that falls outside either bitmap
/// counts as a mismatch. The result is rounded to four places.
pub fn diff_images(a: &Bitmap, b: &Bitmap) -> f64 {
    let width = a.width.max(b.width);
    let height = a.height.max(b.height);
    if width == 0 || height == 0 {
        return 0.0;
    }
    let (offset_ax, offset_ay) = ((width - a.width) / 2, (height - a.height) / 2);
    let (offset_bx, offset_by) = ((width - b.width) / 2, (height - b.height) / 2);
    let mut mismatched = 0usize;
    for y in 0..height {
        for x in 0..width {
            let pixel_a = x
                .checked_sub(offset_ax)
                .zip(y.checked_sub(offset_ay))
                .and_then(|(x, y)| a.get(x, y));
            let pixel_b = x
                .checked_sub(offset_bx)
                .zip(y.checked_sub(offset_by))
                .and_then(|(x, y)| b.get(x, y));
            match (pixel_a, pixel_b) {
                (Some(pa), Some(pb)) if pa == pb => {}
                _ => mismatched += 1,
            }
        }
    }
    round4(mismatched as f64 / (width * height) as f64)
}

/// Shapes the glyph's signature with the font and rasterizes the result.
pub fn render_glyph(font: &dyn FontSource, glyph: &Glyph, ppem: f32) -> Result<Bitmap, DiffError> {
    let (shaper, rasterizer) = font
        .shaper()
        .zip(font.rasterizer())
        .ok_or(DiffError::NoRenderer)?;
    let run = shaper.shape(&glyph.shaping_text(), &glyph.feature_tags())?;
    rasterizer.render(&run, ppem)
}
