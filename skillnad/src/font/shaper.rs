use harfrust::{Feature, ShaperData, ShaperInstance, UnicodeBuffer, Variation};
use skrifa::raw::types::Tag;

use super::SharedFontData;
use crate::{
    error::DiffError,
    source::{ShapedGlyph, Shaper},
};

fn harfrust_tag(tag: Tag) -> harfrust::Tag {
    harfrust::Tag::new(&tag.to_be_bytes())
}

/// Shapes text with harfrust at a fixed variation location.
pub(crate) struct HarfrustShaper {
    data: SharedFontData,
    shaper_data: ShaperData,
    instance: ShaperInstance,
}

impl HarfrustShaper {
    pub fn new(data: SharedFontData, location: &[(Tag, f32)]) -> Result<Self, DiffError> {
        let font = harfrust::FontRef::from_index(data.as_bytes(), 0)
            .map_err(|e| DiffError::Render(e.to_string()))?;
        let variations: Vec<_> = location
            .iter()
            .map(|(tag, value)| Variation {
                tag: harfrust_tag(*tag),
                value: *value,
            })
            .collect();
        let shaper_data = ShaperData::new(&font);
        let instance = ShaperInstance::from_variations(&font, variations.as_slice());
        Ok(Self {
            data,
            shaper_data,
            instance,
        })
    }
}

impl Shaper for HarfrustShaper {
    fn shape(&self, text: &str, features: &[Tag]) -> Result<Vec<ShapedGlyph>, DiffError> {
        let font = harfrust::FontRef::from_index(self.data.as_bytes(), 0)
            .map_err(|e| DiffError::Render(e.to_string()))?;
        let shaper = self
            .shaper_data
            .shaper(&font)
            .instance(Some(&self.instance))
            .build();
        let features: Vec<_> = features
            .iter()
            .map(|tag| Feature::new(harfrust_tag(*tag), 1, ..))
            .collect();

        let mut buffer = UnicodeBuffer::new();
        buffer.push_str(text);
        buffer.guess_segment_properties();
        let output = shaper.shape(buffer, &features);

        Ok(output
            .glyph_infos()
            .iter()
            .zip(output.glyph_positions())
            .map(|(info, pos)| ShapedGlyph {
                glyph_id: info.glyph_id,
                x_advance: pos.x_advance,
                y_advance: pos.y_advance,
                x_offset: pos.x_offset,
                y_offset: pos.y_offset,
            })
            .collect())
    }
}
