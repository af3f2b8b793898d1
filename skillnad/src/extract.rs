//! Turning font tables into rows.

use std::fmt;

use serde::Serialize;

use crate::{
    signature::{Glyph, GlyphSet},
    source::{FontTables, GaspAttribs, HeadAttribs, HheaAttribs, Os2Attribs},
};

/// Seconds between the OpenType epoch (1904) and the unix epoch.
const EPOCH_1904_OFFSET: i64 = 2_082_844_800;

pub const GDEF_BASE_CLASS: u16 = 1;
pub const GDEF_MARK_CLASS: u16 = 3;

/// Horizontal metrics of one glyph, in font units.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MetricRow {
    pub glyph: Glyph,
    pub advance: i32,
    pub lsb: i32,
    pub rsb: i32,
}

/// Outline area of one glyph, in square font units.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct GlyphRow {
    pub glyph: Glyph,
    pub area: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AttribValue {
    Int(i64),
    Float(f64),
    Text(String),
}

impl fmt::Display for AttribValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttribValue::Int(value) => write!(f, "{value}"),
            AttribValue::Float(value) => write!(f, "{value}"),
            AttribValue::Text(value) => f.write_str(value),
        }
    }
}

/// A scalar header field.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AttribRow {
    pub table: &'static str,
    pub attrib: &'static str,
    pub value: AttribValue,
}

/// `(nameID, platformID, encodingID, languageID)`
pub type NameId = (u16, u16, u16, u16);

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct NameRow {
    pub id: NameId,
    pub string: String,
}

/// A glyph carrying a given GDEF glyph class.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct GdefRow {
    pub glyph: Glyph,
    pub class: u16,
}

/// Advance and side bearings for every glyph.
///
/// Glyphs without contours report zero side bearings.
pub fn dump_metrics(tables: &FontTables, glyphs: &GlyphSet) -> Vec<MetricRow> {
    tables
        .glyphs
        .iter()
        .filter_map(|info| {
            let glyph = glyphs.get(&info.name)?;
            let (lsb, rsb) = info
                .bounds
                .map(|bounds| {
                    (
                        bounds.x_min.round() as i32,
                        info.advance - bounds.x_max.round() as i32,
                    )
                })
                .unwrap_or_default();
            Some(MetricRow {
                glyph: glyph.clone(),
                advance: info.advance,
                lsb,
                rsb,
            })
        })
        .collect()
}

pub fn dump_glyph_areas(tables: &FontTables, glyphs: &GlyphSet) -> Vec<GlyphRow> {
    tables
        .glyphs
        .iter()
        .filter_map(|info| {
            Some(GlyphRow {
                glyph: glyphs.get(&info.name)?.clone(),
                area: info.area,
            })
        })
        .collect()
}

pub fn dump_names(tables: &FontTables) -> Vec<NameRow> {
    tables
        .names
        .iter()
        .map(|rec| NameRow {
            id: (rec.name_id, rec.platform_id, rec.encoding_id, rec.language_id),
            string: rec.string.clone(),
        })
        .collect()
}

/// Glyphs assigned the given GDEF class.
pub fn dump_gdef_classes(tables: &FontTables, glyphs: &GlyphSet, class: u16) -> Vec<GdefRow> {
    let Some(classes) = tables.gdef_classes.as_ref() else {
        log::warn!("font has no GDEF glyph class definition");
        return Vec::new();
    };
    classes
        .iter()
        .filter(|(_, glyph_class)| *glyph_class == class)
        .filter_map(|(name, _)| {
            Some(GdefRow {
                glyph: glyphs.get(name)?.clone(),
                class,
            })
        })
        .collect()
}

/// Scalar fields of the OS/2, hhea, gasp and head tables.
pub fn dump_attribs(tables: &FontTables) -> Vec<AttribRow> {
    let mut rows = Vec::new();
    if let Some(os2) = tables.os2.as_ref() {
        dump_os2(os2, &mut rows);
    }
    if let Some(hhea) = tables.hhea.as_ref() {
        dump_hhea(hhea, &mut rows);
    }
    if let Some(gasp) = tables.gasp.as_ref() {
        dump_gasp(gasp, &mut rows);
    }
    if let Some(head) = tables.head.as_ref() {
        dump_head(head, &mut rows);
    }
    rows
}

struct Rows<'a> {
    table: &'static str,
    rows: &'a mut Vec<AttribRow>,
}

impl Rows<'_> {
    fn push(&mut self, attrib: &'static str, value: AttribValue) {
        self.rows.push(AttribRow {
            table: self.table,
            attrib,
            value,
        });
    }

    fn int(&mut self, attrib: &'static str, value: impl Into<i64>) {
        self.push(attrib, AttribValue::Int(value.into()));
    }

    fn opt_int(&mut self, attrib: &'static str, value: Option<impl Into<i64>>) {
        if let Some(value) = value {
            self.int(attrib, value);
        } else {
            log::info!("{} missing attrib {attrib}", self.table);
        }
    }
}

fn dump_os2(os2: &Os2Attribs, rows: &mut Vec<AttribRow>) {
    let mut rows = Rows {
        table: "OS/2",
        rows,
    };
    rows.int("fsSelection", os2.fs_selection);
    rows.int("fsType", os2.fs_type);
    rows.push("panose", AttribValue::Text(format_panose(&os2.panose)));
    rows.opt_int("sCapHeight", os2.s_cap_height);
    rows.int("sFamilyClass", os2.s_family_class);
    rows.int("sTypoAscender", os2.s_typo_ascender);
    rows.int("sTypoDescender", os2.s_typo_descender);
    rows.int("sTypoLineGap", os2.s_typo_line_gap);
    rows.opt_int("sxHeight", os2.sx_height);
    let code_pages = os2.ul_code_page_range;
    rows.opt_int("ulCodePageRange1", code_pages.map(|r| r[0]));
    rows.opt_int("ulCodePageRange2", code_pages.map(|r| r[1]));
    rows.int("ulUnicodeRange1", os2.ul_unicode_range[0]);
    rows.int("ulUnicodeRange2", os2.ul_unicode_range[1]);
    rows.int("ulUnicodeRange3", os2.ul_unicode_range[2]);
    rows.int("ulUnicodeRange4", os2.ul_unicode_range[3]);
    rows.opt_int("usBreakChar", os2.us_break_char);
    rows.opt_int("usDefaultChar", os2.us_default_char);
    rows.int("usFirstCharIndex", os2.us_first_char_index);
    rows.int("usLastCharIndex", os2.us_last_char_index);
    rows.opt_int("usMaxContext", os2.us_max_context);
    rows.int("usWeightClass", os2.us_weight_class);
    rows.int("usWidthClass", os2.us_width_class);
    rows.int("usWinAscent", os2.us_win_ascent);
    rows.int("usWinDescent", os2.us_win_descent);
    rows.int("version", os2.version);
    rows.int("yStrikeoutPosition", os2.y_strikeout_position);
    rows.int("yStrikeoutSize", os2.y_strikeout_size);
    rows.int("ySubscriptXOffset", os2.y_subscript_x_offset);
    rows.int("ySubscriptXSize", os2.y_subscript_x_size);
    rows.int("ySubscriptYOffset", os2.y_subscript_y_offset);
    rows.int("ySubscriptYSize", os2.y_subscript_y_size);
    rows.int("ySuperscriptXOffset", os2.y_superscript_x_offset);
    rows.int("ySuperscriptXSize", os2.y_superscript_x_size);
    rows.int("ySuperscriptYOffset", os2.y_superscript_y_offset);
    rows.int("ySuperscriptYSize", os2.y_superscript_y_size);
}

fn dump_hhea(hhea: &HheaAttribs, rows: &mut Vec<AttribRow>) {
    let mut rows = Rows {
        table: "hhea",
        rows,
    };
    rows.int("ascender", hhea.ascender);
    rows.int("caretOffset", hhea.caret_offset);
    rows.int("caretSlopeRise", hhea.caret_slope_rise);
    rows.int("caretSlopeRun", hhea.caret_slope_run);
    rows.int("descender", hhea.descender);
    rows.int("lineGap", hhea.line_gap);
}

fn dump_gasp(gasp: &GaspAttribs, rows: &mut Vec<AttribRow>) {
    let mut rows = Rows {
        table: "gasp",
        rows,
    };
    let ranges = gasp
        .ranges
        .iter()
        .map(|(ppem, behavior)| format!("{ppem}:{behavior}"))
        .collect::<Vec<_>>()
        .join(" ");
    rows.push("gaspRange", AttribValue::Text(ranges));
    rows.int("version", gasp.version);
}

fn dump_head(head: &HeadAttribs, rows: &mut Vec<AttribRow>) {
    let mut rows = Rows {
        table: "head",
        rows,
    };
    rows.push("created", AttribValue::Text(format_timestamp(head.created)));
    rows.int("flags", head.flags);
    rows.push("fontRevision", AttribValue::Float(head.font_revision));
    rows.int("lowestRecPPEM", head.lowest_rec_ppem);
    rows.int("macStyle", head.mac_style);
    rows.push("modified", AttribValue::Text(format_timestamp(head.modified)));
    rows.int("unitsPerEm", head.units_per_em);
    rows.int("xMax", head.x_max);
    rows.int("xMin", head.x_min);
    rows.int("yMax", head.y_max);
    rows.int("yMin", head.y_min);
}

fn format_panose(panose: &[u8; 10]) -> String {
    panose
        .iter()
        .map(u8::to_string)
        .collect::<Vec<_>>()
        .join("-")
}

/// Formats a 1904 based timestamp.
fn format_timestamp(secs: i64) -> String {
    chrono::DateTime::from_timestamp(secs.saturating_sub(EPOCH_1904_OFFSET), 0)
        .map(|date| date.format("%Y/%m/%d %H:%M:%S").to_string())
        .unwrap_or_else(|| secs.to_string())
}
