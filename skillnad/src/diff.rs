//! Comparing the row tables of two fonts.
//!
//! Every category goes through [`diff_tables`], which matches rows by key
//! and splits them into new, missing and modified rows. The category
//! functions supply the key, the comparison and any filtering of the
//! new and missing rows.

use std::{collections::BTreeMap, hash::Hash};

use hashbrown::HashMap;
use serde::Serialize;

use crate::{
    error::DiffError,
    extract::{AttribRow, AttribValue, GdefRow, GlyphRow, MetricRow, NameId, NameRow},
    flatten::{KernRow, MarkRow},
    settings::{Category, DiffSettings, UPM_INDEPENDENT_ATTRIBS},
    shape::{diff_area, diff_area_ratio, diff_images, render_glyph, scale_area, ShapeMode},
    signature::{Glyph, GlyphSet},
    snapshot::FontSnapshot,
};

/// Rows added in font B, rows lost from font A, and rows that changed.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DiffResult<T, M> {
    pub new: Vec<T>,
    pub missing: Vec<T>,
    pub modified: Vec<M>,
}

impl<T, M> Default for DiffResult<T, M> {
    fn default() -> Self {
        Self {
            new: Vec::new(),
            missing: Vec::new(),
            modified: Vec::new(),
        }
    }
}

impl<T, M> DiffResult<T, M> {
    pub fn is_empty(&self) -> bool {
        self.new.is_empty() && self.missing.is_empty() && self.modified.is_empty()
    }
}

/// A row that can be reported as new or missing.
pub trait DiffRow: Clone {
    type Order: Ord;

    /// Sort order within the new and missing lists.
    fn order(&self) -> Self::Order;
}

/// A modified row.
pub trait Modification {
    /// Size of the change; larger changes are listed first.
    fn magnitude(&self) -> f64;
}

/// Classifies two row tables by key.
///
/// When several rows of one table share a key, the last one wins.
/// `compare` is called for every key present in both tables and returns
/// `Some` when the pair counts as modified.
pub fn diff_tables<T, K, M>(
    rows_a: &[T],
    rows_b: &[T],
    key_fn: impl Fn(&T) -> K,
    mut compare: impl FnMut(&T, &T) -> Option<M>,
) -> DiffResult<T, M>
where
    T: DiffRow,
    K: Eq + Hash + Ord,
    M: Modification,
{
    let table_a: HashMap<K, &T> = rows_a.iter().map(|row| (key_fn(row), row)).collect();
    let table_b: HashMap<K, &T> = rows_b.iter().map(|row| (key_fn(row), row)).collect();

    let mut shared: Vec<_> = table_a
        .iter()
        .filter_map(|(key, row_a)| table_b.get(key).map(|row_b| (key, *row_a, *row_b)))
        .collect();
    shared.sort_unstable_by(|a, b| a.0.cmp(b.0));
    let mut modified: Vec<M> = shared
        .into_iter()
        .filter_map(|(_, row_a, row_b)| compare(row_a, row_b))
        .collect();
    modified.sort_by(|a, b| b.magnitude().total_cmp(&a.magnitude()));

    DiffResult {
        new: only_in(&table_b, &table_a),
        missing: only_in(&table_a, &table_b),
        modified,
    }
}

fn only_in<K: Eq + Hash + Ord, T: DiffRow>(
    table: &HashMap<K, &T>,
    other: &HashMap<K, &T>,
) -> Vec<T> {
    let mut rows: Vec<_> = table
        .iter()
        .filter(|(key, _)| !other.contains_key(*key))
        .collect();
    rows.sort_unstable_by(|(key_a, a), (key_b, b)| {
        a.order().cmp(&b.order()).then_with(|| key_a.cmp(key_b))
    });
    rows.into_iter().map(|(_, row)| (*row).clone()).collect()
}

/// Converts font units of font A into font units of font B.
#[derive(Clone, Copy, Debug)]
struct UpmScale {
    factor: f64,
}

impl UpmScale {
    fn new(a: &FontSnapshot, b: &FontSnapshot, settings: &DiffSettings) -> Result<Self, DiffError> {
        let (upm_a, upm_b) = (a.units_per_em()?, b.units_per_em()?);
        let factor = if settings.scale_upm && upm_a != 0 && upm_a != upm_b {
            upm_b as f64 / upm_a as f64
        } else {
            1.0
        };
        Ok(Self { factor })
    }

    fn apply(self, value: i32) -> f64 {
        value as f64 * self.factor
    }

    fn is_identity(self) -> bool {
        self.factor == 1.0
    }
}

impl DiffRow for KernRow {
    type Order = (String, String);

    fn order(&self) -> Self::Order {
        (self.left.name.clone(), self.right.name.clone())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct KernChange {
    pub left: Glyph,
    pub right: Glyph,
    pub value_a: i32,
    pub value_b: i32,
    pub diff: f64,
}

impl Modification for KernChange {
    fn magnitude(&self) -> f64 {
        self.diff.abs()
    }
}

pub fn diff_kerning(
    a: &FontSnapshot,
    b: &FontSnapshot,
    settings: &DiffSettings,
) -> Result<DiffResult<KernRow, KernChange>, DiffError> {
    let scale = UpmScale::new(a, b, settings)?;
    let threshold = settings.kern_threshold;
    let mut result = diff_tables(
        a.kerns()?,
        b.kerns()?,
        |row| (row.left.key(), row.right.key()),
        |row_a, row_b| {
            let diff = row_b.value as f64 - scale.apply(row_a.value);
            (diff.abs() > threshold).then(|| KernChange {
                left: row_b.left.clone(),
                right: row_b.right.clone(),
                value_a: row_a.value,
                value_b: row_b.value,
                diff,
            })
        },
    );
    // unpaired rows are judged in their own font's units
    let (glyphs_a, glyphs_b) = (a.glyphs()?, b.glyphs()?);
    let exceeds = |row: &KernRow| (row.value as f64).abs() > threshold;
    result
        .missing
        .retain(|row| exceeds(row) && both_present(glyphs_b, &row.left, &row.right));
    result
        .new
        .retain(|row| exceeds(row) && both_present(glyphs_a, &row.left, &row.right));
    Ok(result)
}

fn both_present(glyphs: &GlyphSet, first: &Glyph, second: &Glyph) -> bool {
    glyphs.contains_key(&first.key()) && glyphs.contains_key(&second.key())
}

impl DiffRow for MarkRow {
    type Order = (String, String);

    fn order(&self) -> Self::Order {
        (self.base.name.clone(), self.mark.name.clone())
    }
}

/// A mark whose position relative to its base moved.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MarkChange {
    pub base: Glyph,
    pub mark: Glyph,
    pub offset_a: (i32, i32),
    pub offset_b: (i32, i32),
    pub diff_x: f64,
    pub diff_y: f64,
}

impl Modification for MarkChange {
    fn magnitude(&self) -> f64 {
        self.diff_x.abs().max(self.diff_y.abs())
    }
}

pub fn diff_marks(
    a: &FontSnapshot,
    b: &FontSnapshot,
    settings: &DiffSettings,
) -> Result<DiffResult<MarkRow, MarkChange>, DiffError> {
    Ok(diff_mark_rows(
        (a.marks()?, a.glyphs()?),
        (b.marks()?, b.glyphs()?),
        UpmScale::new(a, b, settings)?,
        settings.marks_threshold,
    ))
}

pub fn diff_mkmks(
    a: &FontSnapshot,
    b: &FontSnapshot,
    settings: &DiffSettings,
) -> Result<DiffResult<MarkRow, MarkChange>, DiffError> {
    Ok(diff_mark_rows(
        (a.mkmks()?, a.glyphs()?),
        (b.mkmks()?, b.glyphs()?),
        UpmScale::new(a, b, settings)?,
        settings.mkmks_threshold,
    ))
}

fn diff_mark_rows(
    (rows_a, glyphs_a): (&[MarkRow], &GlyphSet),
    (rows_b, glyphs_b): (&[MarkRow], &GlyphSet),
    scale: UpmScale,
    threshold: f64,
) -> DiffResult<MarkRow, MarkChange> {
    let mut result = diff_tables(
        rows_a,
        rows_b,
        |row| (row.base.key(), row.mark.key()),
        |row_a, row_b| {
            let (ax, ay) = row_a.offset();
            let (ax, ay) = (scale.apply(ax), scale.apply(ay));
            let (bx, by) = row_b.offset();
            let (diff_x, diff_y) = (bx as f64 - ax, by as f64 - ay);
            (diff_x.abs() > threshold || diff_y.abs() > threshold).then(|| MarkChange {
                base: row_b.base.clone(),
                mark: row_b.mark.clone(),
                offset_a: row_a.offset(),
                offset_b: row_b.offset(),
                diff_x,
                diff_y,
            })
        },
    );
    let exceeds = |row: &MarkRow| {
        let (x, y) = row.offset();
        x.abs() as f64 > threshold || y.abs() as f64 > threshold
    };
    result
        .missing
        .retain(|row| exceeds(row) && both_present(glyphs_b, &row.base, &row.mark));
    result
        .new
        .retain(|row| exceeds(row) && both_present(glyphs_a, &row.base, &row.mark));
    result
}

impl DiffRow for MetricRow {
    type Order = String;

    fn order(&self) -> Self::Order {
        self.glyph.name.clone()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MetricChange {
    pub glyph: Glyph,
    pub advance_a: i32,
    pub advance_b: i32,
    pub diff_advance: f64,
    pub diff_lsb: f64,
    pub diff_rsb: f64,
}

impl Modification for MetricChange {
    fn magnitude(&self) -> f64 {
        self.diff_advance.abs()
    }
}

/// Advance width changes beyond the metrics threshold.
pub fn diff_metrics(
    a: &FontSnapshot,
    b: &FontSnapshot,
    settings: &DiffSettings,
) -> Result<DiffResult<MetricRow, MetricChange>, DiffError> {
    let scale = UpmScale::new(a, b, settings)?;
    let threshold = settings.metrics_threshold;
    Ok(diff_tables(
        a.metrics()?,
        b.metrics()?,
        |row| row.glyph.key(),
        |row_a, row_b| {
            let diff_advance = row_b.advance as f64 - scale.apply(row_a.advance);
            (diff_advance.abs() > threshold).then(|| MetricChange {
                glyph: row_b.glyph.clone(),
                advance_a: row_a.advance,
                advance_b: row_b.advance,
                diff_advance,
                diff_lsb: row_b.lsb as f64 - scale.apply(row_a.lsb),
                diff_rsb: row_b.rsb as f64 - scale.apply(row_a.rsb),
            })
        },
    ))
}

impl DiffRow for AttribRow {
    type Order = (&'static str, &'static str);

    fn order(&self) -> Self::Order {
        (self.table, self.attrib)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AttribChange {
    pub table: &'static str,
    pub attrib: &'static str,
    pub value_a: AttribValue,
    pub value_b: AttribValue,
    pub diff: f64,
}

impl Modification for AttribChange {
    fn magnitude(&self) -> f64 {
        self.diff.abs()
    }
}

/// Header fields that differ.
///
/// Integer fields are rescaled to font B's units per em unless they are
/// listed in [`UPM_INDEPENDENT_ATTRIBS`]. There is no threshold.
pub fn diff_attribs(
    a: &FontSnapshot,
    b: &FontSnapshot,
    settings: &DiffSettings,
) -> Result<DiffResult<AttribRow, AttribChange>, DiffError> {
    let scale = UpmScale::new(a, b, settings)?;
    Ok(diff_tables(
        a.attribs()?,
        b.attribs()?,
        |row| (row.table, row.attrib),
        |row_a, row_b| {
            let diff = match (&row_a.value, &row_b.value) {
                (AttribValue::Int(value_a), AttribValue::Int(value_b)) => {
                    let value_a = if scale.is_identity()
                        || UPM_INDEPENDENT_ATTRIBS.contains(&row_a.attrib)
                    {
                        *value_a
                    } else {
                        (*value_a as f64 * scale.factor).round() as i64
                    };
                    (*value_b - value_a) as f64
                }
                (AttribValue::Float(value_a), AttribValue::Float(value_b)) => value_b - value_a,
                (value_a, value_b) if value_a != value_b => f64::NAN,
                _ => 0.0,
            };
            (diff != 0.0).then(|| AttribChange {
                table: row_b.table,
                attrib: row_b.attrib,
                value_a: row_a.value.clone(),
                value_b: row_b.value.clone(),
                // text changes sort after numeric ones
                diff: if diff.is_nan() { 0.0 } else { diff },
            })
        },
    ))
}

impl DiffRow for NameRow {
    type Order = NameId;

    fn order(&self) -> Self::Order {
        self.id
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct NameChange {
    pub id: NameId,
    pub string_a: String,
    pub string_b: String,
}

impl Modification for NameChange {
    fn magnitude(&self) -> f64 {
        0.0
    }
}

pub fn diff_nametable(
    a: &FontSnapshot,
    b: &FontSnapshot,
) -> Result<DiffResult<NameRow, NameChange>, DiffError> {
    Ok(diff_tables(
        a.names()?,
        b.names()?,
        |row| row.id,
        |row_a, row_b| {
            (row_a.string != row_b.string).then(|| NameChange {
                id: row_b.id,
                string_a: row_a.string.clone(),
                string_b: row_b.string.clone(),
            })
        },
    ))
}

impl DiffRow for GlyphRow {
    type Order = String;

    fn order(&self) -> Self::Order {
        self.glyph.name.clone()
    }
}

/// A glyph whose shape changed.
///
/// `diff` is the normalized area difference in area mode and the
/// fraction of mismatched pixels in render mode.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct GlyphChange {
    pub glyph: Glyph,
    pub diff: f64,
}

impl Modification for GlyphChange {
    fn magnitude(&self) -> f64 {
        self.diff
    }
}

pub fn diff_glyphs(
    a: &FontSnapshot,
    b: &FontSnapshot,
    settings: &DiffSettings,
) -> Result<DiffResult<GlyphRow, GlyphChange>, DiffError> {
    let (rows_a, rows_b) = (a.glyph_areas()?, b.glyph_areas()?);
    let threshold = settings.glyphs_threshold;
    match settings.shape_mode {
        ShapeMode::Area => {
            let (upm_a, upm_b) = (a.units_per_em()?, b.units_per_em()?);
            let scale_upm = settings.scale_upm;
            Ok(diff_tables(
                rows_a,
                rows_b,
                |row| row.glyph.key(),
                |row_a, row_b| {
                    let area_a = if scale_upm {
                        scale_area(row_a.area, upm_a, upm_b)
                    } else {
                        row_a.area
                    };
                    if diff_area(area_a, row_b.area) == 0.0 {
                        return None;
                    }
                    let diff = diff_area_ratio(area_a, row_b.area);
                    (diff > threshold).then(|| GlyphChange {
                        glyph: row_b.glyph.clone(),
                        diff,
                    })
                },
            ))
        }
        ShapeMode::Render => {
            let ratios = render_ratios(a, b, settings.render_ppem)?;
            Ok(diff_tables(
                rows_a,
                rows_b,
                |row| row.glyph.key(),
                |_, row_b| {
                    let diff = *ratios.get(&row_b.glyph.key())?;
                    (diff > threshold).then(|| GlyphChange {
                        glyph: row_b.glyph.clone(),
                        diff,
                    })
                },
            ))
        }
    }
}

/// Pixel mismatch ratios for every resolved glyph the fonts share.
fn render_ratios(
    a: &FontSnapshot,
    b: &FontSnapshot,
    ppem: f32,
) -> Result<HashMap<String, f64>, DiffError> {
    let (source_a, source_b) = (a.source()?, b.source()?);
    let glyphs_b: HashMap<String, &Glyph> = b
        .glyphs()?
        .iter()
        .filter(|glyph| glyph.has_signature())
        .map(|glyph| (glyph.key(), glyph))
        .collect();
    let mut ratios = HashMap::new();
    for glyph_a in a.glyphs()?.iter().filter(|glyph| glyph.has_signature()) {
        let key = glyph_a.key();
        let Some(glyph_b) = glyphs_b.get(&key) else {
            continue;
        };
        let image_a = render_glyph(source_a, glyph_a, ppem)?;
        let image_b = render_glyph(source_b, glyph_b, ppem)?;
        ratios.insert(key, diff_images(&image_a, &image_b));
    }
    log::debug!("rendered {} shared glyphs", ratios.len());
    Ok(ratios)
}

impl DiffRow for GdefRow {
    type Order = String;

    fn order(&self) -> Self::Order {
        self.glyph.name.clone()
    }
}

/// Never constructed; categories without modified rows use it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub enum Unchanged {}

impl Modification for Unchanged {
    fn magnitude(&self) -> f64 {
        match *self {}
    }
}

pub fn diff_gdef_base(
    a: &FontSnapshot,
    b: &FontSnapshot,
) -> Result<DiffResult<GdefRow, Unchanged>, DiffError> {
    Ok(diff_gdef_rows(
        (a.gdef_bases()?, a.glyphs()?),
        (b.gdef_bases()?, b.glyphs()?),
    ))
}

pub fn diff_gdef_mark(
    a: &FontSnapshot,
    b: &FontSnapshot,
) -> Result<DiffResult<GdefRow, Unchanged>, DiffError> {
    Ok(diff_gdef_rows(
        (a.gdef_marks()?, a.glyphs()?),
        (b.gdef_marks()?, b.glyphs()?),
    ))
}

fn diff_gdef_rows(
    (rows_a, glyphs_a): (&[GdefRow], &GlyphSet),
    (rows_b, glyphs_b): (&[GdefRow], &GlyphSet),
) -> DiffResult<GdefRow, Unchanged> {
    let mut result = diff_tables(rows_a, rows_b, |row| row.glyph.key(), |_, _| None);
    result
        .missing
        .retain(|row| glyphs_b.contains_key(&row.glyph.key()));
    result
        .new
        .retain(|row| glyphs_a.contains_key(&row.glyph.key()));
    result
}

/// A table tag or a glyph name present in only one font.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Entry(pub String);

impl DiffRow for Entry {
    type Order = String;

    fn order(&self) -> Self::Order {
        self.0.clone()
    }
}

pub fn diff_tables_directory(
    a: &FontSnapshot,
    b: &FontSnapshot,
) -> Result<DiffResult<Entry, Unchanged>, DiffError> {
    let tags = |snapshot: &FontSnapshot| -> Result<Vec<Entry>, DiffError> {
        Ok(snapshot
            .font_tables()?
            .table_tags
            .iter()
            .map(|tag| Entry(tag.to_string()))
            .collect())
    };
    Ok(diff_tables(&tags(a)?, &tags(b)?, Entry::clone, |_, _| None))
}

/// Glyph names present in only one font.
pub fn diff_charset(
    a: &FontSnapshot,
    b: &FontSnapshot,
) -> Result<DiffResult<Entry, Unchanged>, DiffError> {
    let names = |snapshot: &FontSnapshot| -> Result<Vec<Entry>, DiffError> {
        Ok(snapshot
            .font_tables()?
            .glyph_order
            .iter()
            .cloned()
            .map(Entry)
            .collect())
    };
    Ok(diff_tables(&names(a)?, &names(b)?, Entry::clone, |_, _| None))
}

/// The result of one category.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CategoryDiff {
    Names(DiffResult<NameRow, NameChange>),
    Attribs(DiffResult<AttribRow, AttribChange>),
    Metrics(DiffResult<MetricRow, MetricChange>),
    Glyphs(DiffResult<GlyphRow, GlyphChange>),
    Kerns(DiffResult<KernRow, KernChange>),
    Marks(DiffResult<MarkRow, MarkChange>),
    Gdef(DiffResult<GdefRow, Unchanged>),
    Entries(DiffResult<Entry, Unchanged>),
}

impl CategoryDiff {
    /// Number of new, missing and modified rows.
    pub fn counts(&self) -> (usize, usize, usize) {
        fn counts<T, M>(result: &DiffResult<T, M>) -> (usize, usize, usize) {
            (result.new.len(), result.missing.len(), result.modified.len())
        }
        match self {
            CategoryDiff::Names(result) => counts(result),
            CategoryDiff::Attribs(result) => counts(result),
            CategoryDiff::Metrics(result) => counts(result),
            CategoryDiff::Glyphs(result) => counts(result),
            CategoryDiff::Kerns(result) => counts(result),
            CategoryDiff::Marks(result) => counts(result),
            CategoryDiff::Gdef(result) => counts(result),
            CategoryDiff::Entries(result) => counts(result),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.counts() == (0, 0, 0)
    }
}

/// The comparison of two fonts over the selected categories.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct FontDiff {
    categories: BTreeMap<Category, CategoryDiff>,
}

impl FontDiff {
    /// Compares every category named in `settings`.
    ///
    /// Both snapshots must have their tables computed.
    pub fn new(
        a: &FontSnapshot,
        b: &FontSnapshot,
        settings: &DiffSettings,
    ) -> Result<Self, DiffError> {
        let mut categories = BTreeMap::new();
        for category in &settings.categories {
            let result = match category {
                Category::Names => CategoryDiff::Names(diff_nametable(a, b)?),
                Category::Attribs => CategoryDiff::Attribs(diff_attribs(a, b, settings)?),
                Category::Metrics => CategoryDiff::Metrics(diff_metrics(a, b, settings)?),
                Category::Glyphs => CategoryDiff::Glyphs(diff_glyphs(a, b, settings)?),
                Category::Kerns => CategoryDiff::Kerns(diff_kerning(a, b, settings)?),
                Category::Marks => CategoryDiff::Marks(diff_marks(a, b, settings)?),
                Category::Mkmks => CategoryDiff::Marks(diff_mkmks(a, b, settings)?),
                Category::GdefBase => CategoryDiff::Gdef(diff_gdef_base(a, b)?),
                Category::GdefMark => CategoryDiff::Gdef(diff_gdef_mark(a, b)?),
                Category::Tables => CategoryDiff::Entries(diff_tables_directory(a, b)?),
                Category::Charset => CategoryDiff::Entries(diff_charset(a, b)?),
            };
            let (new, missing, modified) = result.counts();
            log::info!("{category}: {new} new, {missing} missing, {modified} modified");
            categories.insert(*category, result);
        }
        Ok(Self { categories })
    }

    pub fn get(&self, category: Category) -> Option<&CategoryDiff> {
        self.categories.get(&category)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Category, &CategoryDiff)> + '_ {
        self.categories
            .iter()
            .map(|(category, result)| (*category, result))
    }

    pub fn is_empty(&self) -> bool {
        self.categories.values().all(CategoryDiff::is_empty)
    }
}
