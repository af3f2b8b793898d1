//! A loaded font and the rows computed from it.

use std::path::Path;

use skrifa::raw::types::Tag;

use crate::{
    error::DiffError,
    extract::{
        dump_attribs, dump_gdef_classes, dump_glyph_areas, dump_metrics, dump_names, AttribRow,
        GdefRow, GlyphRow, MetricRow, NameRow, GDEF_BASE_CLASS, GDEF_MARK_CLASS,
    },
    flatten::{flatten_kerning, flatten_marks, KernRow, MarkRow},
    font::OpenTypeFont,
    signature::GlyphSet,
    source::{FontSource, FontTables},
};

/// Words that make up style names, used to pick variable font instances.
pub const STYLE_TERMS: &[&str] = &[
    "Hairline",
    "Thin",
    "ExtraLight",
    "UltraLight",
    "Light",
    "Regular",
    "Book",
    "Medium",
    "SemiBold",
    "Bold",
    "ExtraBold",
    "Black",
    "Italic",
    "Oblique",
    "SemiCondensed",
    "ExtraCondensed",
    "Condensed",
    "Expanded",
    "SemiExpanded",
    "Narrow",
    "Compressed",
    "Semi",
    "Demi",
    "Extra",
    "Ultra",
];

/// Keeps the words of `name` that are style terms.
///
/// `"Roboto Condensed SemiBold"` becomes `"Condensed SemiBold"`.
pub fn stylename_from_name(name: &str) -> String {
    name.split_whitespace()
        .filter(|word| {
            STYLE_TERMS
                .iter()
                .any(|term| term.eq_ignore_ascii_case(word))
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SnapshotState {
    Unloaded,
    Loaded,
    TablesComputed,
}

#[derive(Clone, Debug, Default)]
struct ComputedTables {
    glyphs: GlyphSet,
    kerns: Vec<KernRow>,
    marks: Vec<MarkRow>,
    mkmks: Vec<MarkRow>,
    metrics: Vec<MetricRow>,
    glyph_areas: Vec<GlyphRow>,
    attribs: Vec<AttribRow>,
    names: Vec<NameRow>,
    gdef_bases: Vec<GdefRow>,
    gdef_marks: Vec<GdefRow>,
}

/// Owns a font and caches every row table derived from it.
///
/// Tables are only available after [`recalc_tables`](Self::recalc_tables);
/// changing the variation location recomputes all of them.
#[derive(Default)]
pub struct FontSnapshot {
    source: Option<Box<dyn FontSource>>,
    instance: Option<Box<dyn FontSource>>,
    location: Vec<(Tag, f32)>,
    computed: Option<ComputedTables>,
}

impl FontSnapshot {
    /// Creates a snapshot with no font loaded.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads a font file and computes its tables.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, DiffError> {
        let mut snapshot = Self::from_source(OpenTypeFont::open(path)?);
        snapshot.recalc_tables()?;
        Ok(snapshot)
    }

    /// Creates a loaded snapshot. Tables are not computed yet.
    pub fn from_source(source: impl FontSource + 'static) -> Self {
        let mut snapshot = Self::new();
        snapshot.load(Box::new(source));
        snapshot
    }

    /// Replaces the font, discarding any computed tables.
    pub fn load(&mut self, source: Box<dyn FontSource>) {
        self.source = Some(source);
        self.instance = None;
        self.location.clear();
        self.computed = None;
    }

    pub fn state(&self) -> SnapshotState {
        match (&self.source, &self.computed) {
            (None, _) => SnapshotState::Unloaded,
            (Some(_), None) => SnapshotState::Loaded,
            (Some(_), Some(_)) => SnapshotState::TablesComputed,
        }
    }

    /// The font at the current variation location.
    pub fn source(&self) -> Result<&dyn FontSource, DiffError> {
        self.instance
            .as_deref()
            .or(self.source.as_deref())
            .ok_or(DiffError::NotLoaded)
    }

    pub fn font_tables(&self) -> Result<&FontTables, DiffError> {
        Ok(self.source()?.tables())
    }

    /// The current variation location, in user space.
    pub fn location(&self) -> &[(Tag, f32)] {
        &self.location
    }

    /// Recomputes glyph signatures and every row table.
    pub fn recalc_tables(&mut self) -> Result<(), DiffError> {
        let tables = self.font_tables()?;
        let glyphs = GlyphSet::build(tables);
        let marks = flatten_marks(tables, &glyphs);
        let computed = ComputedTables {
            kerns: flatten_kerning(tables, &glyphs),
            marks: marks.marks,
            mkmks: marks.mkmks,
            metrics: dump_metrics(tables, &glyphs),
            glyph_areas: dump_glyph_areas(tables, &glyphs),
            attribs: dump_attribs(tables),
            names: dump_names(tables),
            gdef_bases: dump_gdef_classes(tables, &glyphs, GDEF_BASE_CLASS),
            gdef_marks: dump_gdef_classes(tables, &glyphs, GDEF_MARK_CLASS),
            glyphs,
        };
        log::info!(
            "computed tables for {} glyphs, {} kerns, {} marks, {} mkmks",
            computed.glyphs.len(),
            computed.kerns.len(),
            computed.marks.len(),
            computed.mkmks.len()
        );
        self.computed = Some(computed);
        Ok(())
    }

    fn computed(&self) -> Result<&ComputedTables, DiffError> {
        self.computed.as_ref().ok_or(DiffError::NotComputed)
    }

    pub fn glyphs(&self) -> Result<&GlyphSet, DiffError> {
        Ok(&self.computed()?.glyphs)
    }

    pub fn kerns(&self) -> Result<&[KernRow], DiffError> {
        Ok(&self.computed()?.kerns)
    }

    pub fn marks(&self) -> Result<&[MarkRow], DiffError> {
        Ok(&self.computed()?.marks)
    }

    pub fn mkmks(&self) -> Result<&[MarkRow], DiffError> {
        Ok(&self.computed()?.mkmks)
    }

    pub fn metrics(&self) -> Result<&[MetricRow], DiffError> {
        Ok(&self.computed()?.metrics)
    }

    pub fn glyph_areas(&self) -> Result<&[GlyphRow], DiffError> {
        Ok(&self.computed()?.glyph_areas)
    }

    pub fn attribs(&self) -> Result<&[AttribRow], DiffError> {
        Ok(&self.computed()?.attribs)
    }

    pub fn names(&self) -> Result<&[NameRow], DiffError> {
        Ok(&self.computed()?.names)
    }

    pub fn gdef_bases(&self) -> Result<&[GdefRow], DiffError> {
        Ok(&self.computed()?.gdef_bases)
    }

    pub fn gdef_marks(&self) -> Result<&[GdefRow], DiffError> {
        Ok(&self.computed()?.gdef_marks)
    }

    pub fn units_per_em(&self) -> Result<u16, DiffError> {
        self.computed()?;
        Ok(self.font_tables()?.units_per_em)
    }

    pub fn is_variable(&self) -> bool {
        self.source
            .as_ref()
            .is_some_and(|source| source.tables().is_variable())
    }

    /// Moves a variable font to the given user space location and
    /// recomputes all tables.
    pub fn set_variations(&mut self, location: &[(Tag, f32)]) -> Result<(), DiffError> {
        let source = self.source.as_ref().ok_or(DiffError::NotLoaded)?;
        let axes = &source.tables().axes;
        if axes.is_empty() {
            return Err(DiffError::NotVariable);
        }
        if let Some((tag, _)) = location
            .iter()
            .find(|(tag, _)| !axes.iter().any(|axis| axis.tag == *tag))
        {
            return Err(DiffError::UnknownAxis(*tag));
        }
        log::info!("instantiating at {location:?}");
        self.instance = Some(source.instantiate(location)?);
        self.location = location.to_vec();
        self.recalc_tables()
    }

    /// Matches the weight of a static font.
    ///
    /// The `wght` axis is set from the other font's `OS/2.usWeightClass`.
    pub fn set_variations_from_static(&mut self, other: &FontSnapshot) -> Result<(), DiffError> {
        let weight = other
            .font_tables()?
            .os2
            .as_ref()
            .map(|os2| os2.us_weight_class)
            .unwrap_or(400);
        self.set_variations(&[(Tag::new(b"wght"), weight as f32)])
    }

    /// Selects a named instance by its style name.
    ///
    /// Words that are not style terms are dropped first, so a full name
    /// such as `"Roboto Bold Italic"` selects the `"Bold Italic"` instance.
    pub fn set_instance(&mut self, name: &str) -> Result<(), DiffError> {
        let tables = self.source.as_ref().ok_or(DiffError::NotLoaded)?.tables();
        if !tables.is_variable() {
            return Err(DiffError::NotVariable);
        }
        let style = stylename_from_name(name);
        let instance = tables
            .instances
            .iter()
            .find(|instance| instance.subfamily == style || instance.subfamily == name)
            .ok_or_else(|| DiffError::InstanceNotFound {
                name: style.clone(),
                available: tables
                    .instances
                    .iter()
                    .map(|instance| instance.subfamily.clone())
                    .collect(),
            })?;
        let location: Vec<_> = tables
            .axes
            .iter()
            .zip(&instance.coords)
            .map(|(axis, value)| (axis.tag, *value))
            .collect();
        self.set_variations(&location)
    }
}
