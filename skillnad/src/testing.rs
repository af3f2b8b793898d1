//! An in-memory font for tests.

use skrifa::raw::types::Tag;

use crate::{
    error::DiffError,
    shape::Bitmap,
    source::{
        Anchor, AxisInfo, BaseAnchors, Bounds, ClassKerning, FontSource, FontTables, GlyphInfo,
        HeadAttribs, HheaAttribs, KernPair, MarkAnchor, MarkAttachment, MarkLookup, MarkSubtable,
        NameRecord, NamedInstanceInfo, Os2Attribs, PairPosSubtable, Rasterizer, ShapedGlyph,
        Shaper, SubstitutionKind, SubstitutionRule,
    },
};

/// Outline used for every glyph: x 100..500, y 100..1000.
const TEST_BOUNDS: Bounds = Bounds {
    x_min: 100.0,
    y_min: 100.0,
    x_max: 500.0,
    y_max: 1000.0,
};
const TEST_AREA: f64 = 346_666.0;

pub(crate) fn tag(s: &str) -> Tag {
    Tag::new_checked(s.as_bytes()).unwrap()
}

/// A small font with the glyphs
/// `.notdef .null A Aacute V acutecomb gravecomb A.alt`.
///
/// Variable instances widen every glyph by a tenth of the distance from
/// the default `wght` value, which is enough to observe recalculation.
#[derive(Clone, Debug)]
pub(crate) struct MockFont {
    pub tables: FontTables,
    pub renders: bool,
}

impl MockFont {
    pub fn new() -> Self {
        let glyphs = [
            (".notdef", None, 600),
            (".null", None, 600),
            ("A", Some(0x41), 600),
            ("Aacute", Some(0xC0), 600),
            ("V", Some(0x56), 600),
            ("acutecomb", Some(0x301), 0),
            ("gravecomb", Some(0x300), 0),
            ("A.alt", None, 600),
        ];
        let mut font = MockFont {
            tables: FontTables {
                units_per_em: 1000,
                head: Some(HeadAttribs {
                    font_revision: 1.0,
                    units_per_em: 1000,
                    ..Default::default()
                }),
                hhea: Some(HheaAttribs::default()),
                os2: Some(Os2Attribs {
                    version: 4,
                    us_weight_class: 400,
                    us_width_class: 5,
                    ul_code_page_range: Some([0; 2]),
                    sx_height: Some(0),
                    s_cap_height: Some(0),
                    us_default_char: Some(0),
                    us_break_char: Some(0x20),
                    us_max_context: Some(0),
                    ..Default::default()
                }),
                table_tags: ["OS/2", "cmap", "glyf", "head", "hhea", "hmtx", "loca", "maxp", "name", "post"]
                    .into_iter()
                    .map(tag)
                    .collect(),
                ..Default::default()
            },
            renders: false,
        };
        for (name, codepoint, advance) in glyphs {
            font.add_glyph(name, codepoint, advance);
        }
        font.set_name(1, "HelloTestFont");
        font.set_name(2, "TotallyNormal");
        font.set_name(6, "HelloTestFont-TotallyNormal");
        font
    }

    pub fn add_glyph(&mut self, name: &str, codepoint: Option<u32>, advance: i32) -> &mut Self {
        self.tables.glyph_order.push(name.to_string());
        self.tables.glyphs.push(GlyphInfo {
            name: name.to_string(),
            advance,
            bounds: Some(TEST_BOUNDS),
            area: TEST_AREA,
        });
        if let Some(codepoint) = codepoint {
            self.map_codepoint(codepoint, name);
        }
        self
    }

    pub fn remove_glyph(&mut self, name: &str) -> &mut Self {
        self.tables.glyph_order.retain(|g| g != name);
        self.tables.glyphs.retain(|g| g.name != name);
        self.tables.cmap.retain(|(_, g)| g != name);
        self
    }

    pub fn map_codepoint(&mut self, codepoint: u32, name: &str) -> &mut Self {
        self.tables.cmap.push((codepoint, name.to_string()));
        self.tables.cmap.sort();
        self
    }

    pub fn glyph_mut(&mut self, name: &str) -> &mut GlyphInfo {
        self.tables
            .glyphs
            .iter_mut()
            .find(|g| g.name == name)
            .unwrap()
    }

    pub fn set_upm(&mut self, upm: u16) -> &mut Self {
        self.tables.units_per_em = upm;
        if let Some(head) = self.tables.head.as_mut() {
            head.units_per_em = upm;
        }
        self
    }

    pub fn os2_mut(&mut self) -> &mut Os2Attribs {
        self.tables.os2.get_or_insert_with(Default::default)
    }

    pub fn set_name(&mut self, name_id: u16, string: &str) -> &mut Self {
        self.tables.names.retain(|rec| rec.name_id != name_id);
        self.tables.names.push(NameRecord {
            name_id,
            platform_id: 3,
            encoding_id: 1,
            language_id: 0x409,
            string: string.to_string(),
        });
        self
    }

    pub fn substitute(
        &mut self,
        feature: &str,
        kind: SubstitutionKind,
        inputs: &[&str],
        outputs: &[&str],
    ) -> &mut Self {
        self.tables.substitutions.push(SubstitutionRule {
            feature: tag(feature),
            kind,
            inputs: inputs.iter().map(|s| s.to_string()).collect(),
            outputs: outputs.iter().map(|s| s.to_string()).collect(),
        });
        self
    }

    /// Adds a pair to the first format 1 kerning subtable.
    pub fn kern(&mut self, left: &str, right: &str, value: i32) -> &mut Self {
        let pair = KernPair {
            left: left.to_string(),
            right: right.to_string(),
            value,
        };
        let subtables = self.tables.kerning.get_or_insert_with(Vec::new);
        match subtables
            .iter_mut()
            .find(|sub| matches!(sub, PairPosSubtable::Pairs(_)))
        {
            Some(PairPosSubtable::Pairs(pairs)) => pairs.push(pair),
            _ => subtables.push(PairPosSubtable::Pairs(vec![pair])),
        }
        self
    }

    pub fn class_kern(&mut self, classes: ClassKerning) -> &mut Self {
        self.tables
            .kerning
            .get_or_insert_with(Vec::new)
            .push(PairPosSubtable::Classes(classes));
        self
    }

    /// Adds a single subtable lookup attaching one mark class.
    ///
    /// Every mark in `marks` uses class 0 with the given anchor, and every
    /// base gets one anchor for that class.
    pub fn attach(
        &mut self,
        kind: MarkAttachment,
        marks: &[&str],
        mark_anchor: (i32, i32),
        bases: &[&str],
        base_anchor: (i32, i32),
    ) -> &mut Self {
        let subtable = MarkSubtable {
            bases: bases
                .iter()
                .map(|glyph| BaseAnchors {
                    glyph: glyph.to_string(),
                    anchors: vec![Some(Anchor::new(base_anchor.0, base_anchor.1))],
                })
                .collect(),
            marks: marks
                .iter()
                .map(|glyph| MarkAnchor {
                    glyph: glyph.to_string(),
                    class: 0,
                    anchor: Some(Anchor::new(mark_anchor.0, mark_anchor.1)),
                })
                .collect(),
        };
        let lookup_index = self.tables.mark_lookups.len() as u16;
        self.tables.mark_lookups.push(MarkLookup {
            lookup_index,
            kind,
            subtables: vec![subtable],
        });
        self
    }

    pub fn set_gdef_class(&mut self, glyph: &str, class: u16) -> &mut Self {
        let classes = self.tables.gdef_classes.get_or_insert_with(Vec::new);
        classes.retain(|(g, _)| g != glyph);
        classes.push((glyph.to_string(), class));
        self
    }

    pub fn make_variable(&mut self) -> &mut Self {
        self.tables.axes = vec![AxisInfo {
            tag: tag("wght"),
            min: 100.0,
            default: 400.0,
            max: 900.0,
        }];
        self.tables.instances = [("Thin", 100.0), ("Regular", 400.0), ("Bold", 700.0)]
            .into_iter()
            .map(|(subfamily, wght)| NamedInstanceInfo {
                subfamily: subfamily.to_string(),
                coords: vec![wght],
            })
            .collect();
        self
    }
}

impl FontSource for MockFont {
    fn tables(&self) -> &FontTables {
        &self.tables
    }

    fn instantiate(&self, location: &[(Tag, f32)]) -> Result<Box<dyn FontSource>, DiffError> {
        let mut instance = self.clone();
        for (axis_tag, value) in location {
            let axis = self
                .tables
                .axes
                .iter()
                .find(|axis| axis.tag == *axis_tag)
                .ok_or(DiffError::UnknownAxis(*axis_tag))?;
            let delta = ((value.clamp(axis.min, axis.max) - axis.default) / 10.0) as i32;
            for glyph in instance.tables.glyphs.iter_mut() {
                glyph.advance += delta;
            }
        }
        Ok(Box::new(instance))
    }

    fn shaper(&self) -> Option<&dyn Shaper> {
        self.renders.then_some(self as &dyn Shaper)
    }

    fn rasterizer(&self) -> Option<&dyn Rasterizer> {
        self.renders.then_some(self as &dyn Rasterizer)
    }
}

/// Maps each character through the cmap and applies single
/// substitutions for the requested features.
impl Shaper for MockFont {
    fn shape(&self, text: &str, features: &[Tag]) -> Result<Vec<ShapedGlyph>, DiffError> {
        let mut run = Vec::new();
        for ch in text.chars() {
            let mut name = self
                .tables
                .cmap
                .iter()
                .find(|(cp, _)| *cp == ch as u32)
                .map(|(_, name)| name.as_str())
                .unwrap_or(".notdef");
            for rule in &self.tables.substitutions {
                if features.contains(&rule.feature) && rule.inputs.len() == 1 && rule.inputs[0] == name
                {
                    name = rule.outputs[0].as_str();
                }
            }
            let glyph_id = self
                .tables
                .glyph_order
                .iter()
                .position(|g| g == name)
                .unwrap_or_default();
            let advance = self.tables.glyphs[glyph_id].advance;
            run.push(ShapedGlyph {
                glyph_id: glyph_id as u32,
                x_advance: advance,
                ..Default::default()
            });
        }
        Ok(run)
    }
}

/// Fills each glyph's bounding box.
impl Rasterizer for MockFont {
    fn render(&self, run: &[ShapedGlyph], ppem: f32) -> Result<Bitmap, DiffError> {
        let scale = ppem as f64 / self.tables.units_per_em as f64;
        let total_advance: i32 = run.iter().map(|g| g.x_advance).sum();
        let width = (total_advance as f64 * scale).ceil().max(1.0) as usize;
        let height = ppem.ceil() as usize;
        let mut bitmap = Bitmap::new(width, height);
        let mut pen_x = 0.0;
        for glyph in run {
            if let Some(bounds) = self.tables.glyphs[glyph.glyph_id as usize].bounds {
                let x0 = ((pen_x + bounds.x_min) * scale) as usize;
                let x1 = ((pen_x + bounds.x_max) * scale) as usize;
                let y0 = (bounds.y_min * scale) as usize;
                let y1 = (bounds.y_max * scale) as usize;
                for y in y0..y1.min(height) {
                    for x in x0..x1.min(width) {
                        bitmap.set(x, height - 1 - y, 255);
                    }
                }
            }
            pen_x += glyph.x_advance as f64;
        }
        Ok(bitmap)
    }
}
