//! Comparison settings.

use std::{fmt, str::FromStr};

use serde::Serialize;
use skrifa::raw::types::Tag;

use crate::{error::DiffError, shape::ShapeMode};

/// Header attributes whose values do not depend on units per em.
///
/// These are compared verbatim when the two fonts have a different
/// `unitsPerEm`; every other integer attribute is rescaled first.
pub const UPM_INDEPENDENT_ATTRIBS: &[&str] = &[
    "unitsPerEm",
    "created",
    "modified",
    "flags",
    "fontRevision",
    "lowestRecPPEM",
    "macStyle",
    "version",
    "fsSelection",
    "fsType",
    "panose",
    "sFamilyClass",
    "ulCodePageRange1",
    "ulCodePageRange2",
    "ulUnicodeRange1",
    "ulUnicodeRange2",
    "ulUnicodeRange3",
    "ulUnicodeRange4",
    "usBreakChar",
    "usDefaultChar",
    "usFirstCharIndex",
    "usLastCharIndex",
    "usMaxContext",
    "usWeightClass",
    "usWidthClass",
    "caretSlopeRise",
    "caretSlopeRun",
    "gaspRange",
];

/// A group of rows compared between two fonts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Names,
    Attribs,
    Metrics,
    Glyphs,
    Kerns,
    Marks,
    Mkmks,
    GdefBase,
    GdefMark,
    Tables,
    Charset,
}

impl Category {
    pub const ALL: [Category; 11] = [
        Category::Names,
        Category::Attribs,
        Category::Metrics,
        Category::Glyphs,
        Category::Kerns,
        Category::Marks,
        Category::Mkmks,
        Category::GdefBase,
        Category::GdefMark,
        Category::Tables,
        Category::Charset,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Category::Names => "names",
            Category::Attribs => "attribs",
            Category::Metrics => "metrics",
            Category::Glyphs => "glyphs",
            Category::Kerns => "kerns",
            Category::Marks => "marks",
            Category::Mkmks => "mkmks",
            Category::GdefBase => "gdef_base",
            Category::GdefMark => "gdef_mark",
            Category::Tables => "tables",
            Category::Charset => "charset",
        }
    }

    /// Parses a list of category names. `*` selects every category.
    pub fn parse_list<S: AsRef<str>>(names: &[S]) -> Result<Vec<Category>, DiffError> {
        let mut categories = Vec::new();
        for name in names {
            if name.as_ref() == "*" {
                categories.extend(Category::ALL);
            } else {
                categories.push(name.as_ref().parse()?);
            }
        }
        categories.sort();
        categories.dedup();
        Ok(categories)
    }
}

impl FromStr for Category {
    type Err = DiffError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|category| category.name() == s)
            .ok_or_else(|| DiffError::UnknownCategory(s.to_string()))
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Thresholds and switches for a comparison.
#[derive(Clone, Debug, PartialEq)]
pub struct DiffSettings {
    /// Kerning changes at or below this many units are ignored.
    pub kern_threshold: f64,
    pub marks_threshold: f64,
    pub mkmks_threshold: f64,
    pub metrics_threshold: f64,
    pub glyphs_threshold: f64,
    /// Normalize values of fonts with a different units per em.
    pub scale_upm: bool,
    pub shape_mode: ShapeMode,
    /// Pixels per em used by [`ShapeMode::Render`].
    pub render_ppem: f32,
    pub categories: Vec<Category>,
}

impl Default for DiffSettings {
    fn default() -> Self {
        Self {
            kern_threshold: 2.0,
            marks_threshold: 4.0,
            mkmks_threshold: 4.0,
            metrics_threshold: 1.0,
            glyphs_threshold: 0.0,
            scale_upm: true,
            shape_mode: ShapeMode::Area,
            render_ppem: 64.0,
            categories: Category::ALL.to_vec(),
        }
    }
}

/// Parses a `tag=value` user space axis setting, such as `wght=700`.
pub fn parse_axis_setting(setting: &str) -> Result<(Tag, f32), DiffError> {
    let invalid = || DiffError::InvalidAxisSetting(setting.to_string());
    let (tag, value) = setting.split_once('=').ok_or_else(invalid)?;
    let tag: Tag = tag.trim().parse().map_err(|_| invalid())?;
    let value: f32 = value.trim().parse().map_err(|_| invalid())?;
    Ok((tag, value))
}
