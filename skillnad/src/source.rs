//! The parsed view of a font that the comparison engine consumes.
//!
//! Everything here is an owned value. A [`FontSource`] implementation reads
//! the binary tables once and hands out a [`FontTables`] snapshot, so rows
//! derived from it never borrow from the underlying file.

use skrifa::raw::types::Tag;

use crate::{error::DiffError, shape::Bitmap};

/// A loaded font, as seen by the comparison engine.
pub trait FontSource {
    /// The tables of the font at its current location.
    fn tables(&self) -> &FontTables;

    /// Returns a new source positioned at the given user space location.
    ///
    /// Axes that are not mentioned keep their default value.
    fn instantiate(&self, location: &[(Tag, f32)]) -> Result<Box<dyn FontSource>, DiffError>;

    /// Text shaping for render mode comparisons.
    fn shaper(&self) -> Option<&dyn Shaper> {
        None
    }

    /// Rasterization for render mode comparisons.
    fn rasterizer(&self) -> Option<&dyn Rasterizer> {
        None
    }
}

/// Maps a string and a set of features to positioned glyphs.
pub trait Shaper {
    fn shape(&self, text: &str, features: &[Tag]) -> Result<Vec<ShapedGlyph>, DiffError>;
}

/// Renders a run of positioned glyphs to an 8-bit alpha bitmap.
pub trait Rasterizer {
    fn render(&self, run: &[ShapedGlyph], ppem: f32) -> Result<Bitmap, DiffError>;
}

/// Output of the shaper, in font units.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ShapedGlyph {
    pub glyph_id: u32,
    pub x_advance: i32,
    pub y_advance: i32,
    pub x_offset: i32,
    pub y_offset: i32,
}

#[derive(Clone, Debug, Default)]
pub struct FontTables {
    pub glyph_order: Vec<String>,
    pub units_per_em: u16,
    /// Codepoint to glyph name, sorted by codepoint.
    pub cmap: Vec<(u32, String)>,
    pub substitutions: Vec<SubstitutionRule>,
    /// Subtables of the lookups referenced by the GPOS `kern` feature.
    ///
    /// `None` when the font has no GPOS table or no `kern` feature.
    pub kerning: Option<Vec<PairPosSubtable>>,
    /// Pairs from a legacy `kern` table.
    pub legacy_kerning: Vec<KernPair>,
    /// Lookups referenced by the GPOS `mark` and `mkmk` features.
    pub mark_lookups: Vec<MarkLookup>,
    /// One entry per glyph, in glyph order.
    pub glyphs: Vec<GlyphInfo>,
    pub head: Option<HeadAttribs>,
    pub hhea: Option<HheaAttribs>,
    pub os2: Option<Os2Attribs>,
    pub gasp: Option<GaspAttribs>,
    pub names: Vec<NameRecord>,
    /// GDEF glyph classes, `None` if the font has no GDEF class definition.
    pub gdef_classes: Option<Vec<(String, u16)>>,
    pub table_tags: Vec<Tag>,
    pub axes: Vec<AxisInfo>,
    pub instances: Vec<NamedInstanceInfo>,
}

impl FontTables {
    pub fn is_variable(&self) -> bool {
        !self.axes.is_empty()
    }

    pub fn glyph(&self, name: &str) -> Option<&GlyphInfo> {
        self.glyphs.iter().find(|info| info.name == name)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SubstitutionKind {
    Single,
    Multiple,
    Alternate,
    Ligature,
}

/// A single GSUB rule, expanded to glyph names.
///
/// Alternate substitutions produce one rule per alternate.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubstitutionRule {
    pub feature: Tag,
    pub kind: SubstitutionKind,
    pub inputs: Vec<String>,
    pub outputs: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KernPair {
    pub left: String,
    pub right: String,
    pub value: i32,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PairPosSubtable {
    /// PairPos format 1.
    Pairs(Vec<KernPair>),
    /// PairPos format 2.
    Classes(ClassKerning),
}

/// Class based kerning, with class 0 left implicit as in the font.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ClassKerning {
    pub coverage: Vec<String>,
    pub class_def1: Vec<(String, u16)>,
    pub class_def2: Vec<(String, u16)>,
    pub class1_count: u16,
    pub class2_count: u16,
    /// X advance adjustments, indexed by `class1 * class2_count + class2`.
    pub values: Vec<i32>,
}

impl ClassKerning {
    pub fn value(&self, class1: u16, class2: u16) -> i32 {
        let idx = class1 as usize * self.class2_count as usize + class2 as usize;
        self.values.get(idx).copied().unwrap_or_default()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MarkAttachment {
    /// GPOS lookup type 4.
    Base,
    /// GPOS lookup type 6.
    Mark,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MarkLookup {
    pub lookup_index: u16,
    pub kind: MarkAttachment,
    pub subtables: Vec<MarkSubtable>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MarkSubtable {
    /// Base glyphs (or mark2 glyphs) with one anchor slot per mark class.
    pub bases: Vec<BaseAnchors>,
    /// Attaching marks (or mark1 glyphs).
    pub marks: Vec<MarkAnchor>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BaseAnchors {
    pub glyph: String,
    /// Indexed by mark class; `None` for a null anchor offset.
    pub anchors: Vec<Option<Anchor>>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MarkAnchor {
    pub glyph: String,
    pub class: u16,
    pub anchor: Option<Anchor>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Anchor {
    pub x: i32,
    pub y: i32,
}

impl Anchor {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Horizontal metrics and outline summary for one glyph.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GlyphInfo {
    pub name: String,
    pub advance: i32,
    /// `None` for glyphs without contours.
    pub bounds: Option<Bounds>,
    /// Signed area enclosed by the outline.
    pub area: f64,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Bounds {
    pub x_min: f64,
    pub y_min: f64,
    pub x_max: f64,
    pub y_max: f64,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct HeadAttribs {
    pub font_revision: f64,
    pub flags: u16,
    pub units_per_em: u16,
    /// Seconds since 1904-01-01.
    pub created: i64,
    pub modified: i64,
    pub x_min: i16,
    pub y_min: i16,
    pub x_max: i16,
    pub y_max: i16,
    pub mac_style: u16,
    pub lowest_rec_ppem: u16,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct HheaAttribs {
    pub ascender: i16,
    pub descender: i16,
    pub line_gap: i16,
    pub caret_slope_rise: i16,
    pub caret_slope_run: i16,
    pub caret_offset: i16,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Os2Attribs {
    pub version: u16,
    pub us_weight_class: u16,
    pub us_width_class: u16,
    pub fs_type: u16,
    pub y_subscript_x_size: i16,
    pub y_subscript_y_size: i16,
    pub y_subscript_x_offset: i16,
    pub y_subscript_y_offset: i16,
    pub y_superscript_x_size: i16,
    pub y_superscript_y_size: i16,
    pub y_superscript_x_offset: i16,
    pub y_superscript_y_offset: i16,
    pub y_strikeout_size: i16,
    pub y_strikeout_position: i16,
    pub s_family_class: i16,
    pub panose: [u8; 10],
    pub ul_unicode_range: [u32; 4],
    pub fs_selection: u16,
    pub us_first_char_index: u16,
    pub us_last_char_index: u16,
    pub s_typo_ascender: i16,
    pub s_typo_descender: i16,
    pub s_typo_line_gap: i16,
    pub us_win_ascent: u16,
    pub us_win_descent: u16,
    /// Version 1 and later.
    pub ul_code_page_range: Option<[u32; 2]>,
    /// Version 2 and later.
    pub sx_height: Option<i16>,
    pub s_cap_height: Option<i16>,
    pub us_default_char: Option<u16>,
    pub us_break_char: Option<u16>,
    pub us_max_context: Option<u16>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GaspAttribs {
    pub version: u16,
    /// (rangeMaxPPEM, rangeGaspBehavior)
    pub ranges: Vec<(u16, u16)>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NameRecord {
    pub name_id: u16,
    pub platform_id: u16,
    pub encoding_id: u16,
    pub language_id: u16,
    pub string: String,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AxisInfo {
    pub tag: Tag,
    pub min: f32,
    pub default: f32,
    pub max: f32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct NamedInstanceInfo {
    pub subfamily: String,
    /// User space coordinates, in axis order.
    pub coords: Vec<f32>,
}
