use skrifa::{
    outline::DrawSettings,
    prelude::{LocationRef, Size},
    raw::{types::F2Dot14, FontRef},
    GlyphId, MetadataProvider,
};
use tiny_skia::{FillRule, Paint, PathBuilder, Pixmap, Transform};

use super::{pen::SkiaPen, SharedFontData};
use crate::{
    error::DiffError,
    source::{Rasterizer, ShapedGlyph},
    shape::Bitmap,
};

/// Fills glyph outlines into an anti-aliased coverage bitmap.
///
/// The bitmap is cropped to the ink of the run.
pub(crate) struct OutlineRasterizer {
    data: SharedFontData,
    coords: Vec<F2Dot14>,
    units_per_em: u16,
}

impl OutlineRasterizer {
    pub fn new(data: SharedFontData, coords: Vec<F2Dot14>, units_per_em: u16) -> Self {
        Self {
            data,
            coords,
            units_per_em,
        }
    }
}

impl Rasterizer for OutlineRasterizer {
    fn render(&self, run: &[ShapedGlyph], ppem: f32) -> Result<Bitmap, DiffError> {
        let font = FontRef::from_index(self.data.as_bytes(), 0)?;
        let outlines = font.outline_glyphs();
        let location = LocationRef::new(&self.coords);
        let scale = ppem / self.units_per_em.max(1) as f32;

        let mut builder = PathBuilder::new();
        let (mut x, mut y) = (0.0, 0.0);
        for glyph in run {
            if let Some(outline) = outlines.get(GlyphId::new(glyph.glyph_id)) {
                let mut pen = SkiaPen::new(
                    &mut builder,
                    scale,
                    x + glyph.x_offset as f32,
                    y + glyph.y_offset as f32,
                );
                outline.draw(DrawSettings::unhinted(Size::unscaled(), location), &mut pen)?;
            }
            x += glyph.x_advance as f32;
            y += glyph.y_advance as f32;
        }

        let Some(path) = builder.finish() else {
            return Ok(Bitmap::new(0, 0));
        };
        let bounds = path.bounds();
        let (left, top) = (bounds.left().floor(), bounds.top().floor());
        let width = (bounds.right().ceil() - left).max(1.0) as u32;
        let height = (bounds.bottom().ceil() - top).max(1.0) as u32;
        let mut pixmap = Pixmap::new(width, height)
            .ok_or_else(|| DiffError::Render(format!("invalid canvas size {width}x{height}")))?;

        let mut paint = Paint::default();
        paint.set_color_rgba8(0, 0, 0, 255);
        paint.anti_alias = true;
        pixmap.fill_path(
            &path,
            &paint,
            FillRule::Winding,
            Transform::from_translate(-left, -top),
            None,
        );

        let coverage = pixmap.pixels().iter().map(|pixel| pixel.alpha()).collect();
        Bitmap::from_data(width as usize, height as usize, coverage)
            .ok_or_else(|| DiffError::Render("bitmap size mismatch".into()))
    }
}
