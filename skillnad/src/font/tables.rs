//! Header tables, names, character map and per glyph metrics.

use hashbrown::HashMap;
use skrifa::{
    outline::DrawSettings,
    prelude::{LocationRef, Size},
    raw::{
        types::{F2Dot14, Tag},
        FontRef, ReadError, TableProvider,
    },
    GlyphId, GlyphNames, MetadataProvider,
};

use super::pen::PathPen;
use crate::source::{
    AxisInfo, Bounds, GaspAttribs, GlyphInfo, HeadAttribs, HheaAttribs, NameRecord,
    NamedInstanceInfo, Os2Attribs,
};

/// Unique glyph names in glyph id order.
///
/// Repeated names get a `#n` suffix so that names can be used as keys.
pub(crate) fn glyph_order(font: &FontRef) -> Result<Vec<String>, ReadError> {
    let count = font.maxp()?.num_glyphs() as u32;
    let names = GlyphNames::new(font);
    let mut seen: HashMap<String, usize> = HashMap::new();
    let mut order = Vec::with_capacity(count as usize);
    for gid in 0..count {
        let name = names
            .get(GlyphId::new(gid))
            .map(|name| name.as_str().to_string())
            .unwrap_or_else(|| format!("glyph{gid:05}"));
        let repeats = seen.entry(name.clone()).or_default();
        if *repeats == 0 {
            order.push(name);
        } else {
            order.push(format!("{name}#{repeats}"));
        }
        *repeats += 1;
    }
    Ok(order)
}

/// Codepoint to glyph name mappings, sorted by codepoint.
pub(crate) fn cmap(font: &FontRef, order: &[String]) -> Vec<(u32, String)> {
    let mut mappings: Vec<_> = font
        .charmap()
        .mappings()
        .filter_map(|(codepoint, gid)| {
            order
                .get(gid.to_u32() as usize)
                .map(|name| (codepoint, name.clone()))
        })
        .collect();
    mappings.sort();
    mappings
}

/// Advance, bounds and outline area of every glyph at the given location.
pub(crate) fn glyph_infos(font: &FontRef, order: &[String], coords: &[F2Dot14]) -> Vec<GlyphInfo> {
    let location = LocationRef::new(coords);
    let metrics = font.glyph_metrics(Size::unscaled(), location);
    let outlines = font.outline_glyphs();
    order
        .iter()
        .enumerate()
        .map(|(gid, name)| {
            let gid = GlyphId::new(gid as u32);
            let mut pen = PathPen::default();
            if let Some(outline) = outlines.get(gid) {
                let settings = DrawSettings::unhinted(Size::unscaled(), location);
                if let Err(e) = outline.draw(settings, &mut pen) {
                    log::warn!("unable to draw '{name}': {e}");
                    pen = PathPen::default();
                }
            }
            GlyphInfo {
                name: name.clone(),
                advance: metrics
                    .advance_width(gid)
                    .map(|advance| advance.round() as i32)
                    .unwrap_or_default(),
                bounds: pen.bounds().map(|rect| Bounds {
                    x_min: rect.x0,
                    y_min: rect.y0,
                    x_max: rect.x1,
                    y_max: rect.y1,
                }),
                area: pen.area(),
            }
        })
        .collect()
}

pub(crate) fn head(font: &FontRef) -> Option<HeadAttribs> {
    let head = font.head().ok()?;
    Some(HeadAttribs {
        font_revision: head.font_revision().to_f64(),
        flags: head.flags().bits(),
        units_per_em: head.units_per_em(),
        created: head.created().as_secs(),
        modified: head.modified().as_secs(),
        x_min: head.x_min(),
        y_min: head.y_min(),
        x_max: head.x_max(),
        y_max: head.y_max(),
        mac_style: head.mac_style().bits(),
        lowest_rec_ppem: head.lowest_rec_ppem(),
    })
}

pub(crate) fn hhea(font: &FontRef) -> Option<HheaAttribs> {
    let hhea = font.hhea().ok()?;
    Some(HheaAttribs {
        ascender: hhea.ascender().to_i16(),
        descender: hhea.descender().to_i16(),
        line_gap: hhea.line_gap().to_i16(),
        caret_slope_rise: hhea.caret_slope_rise(),
        caret_slope_run: hhea.caret_slope_run(),
        caret_offset: hhea.caret_offset(),
    })
}

pub(crate) fn os2(font: &FontRef) -> Option<Os2Attribs> {
    let os2 = font.os2().ok()?;
    let mut panose = [0u8; 10];
    for (dst, src) in panose.iter_mut().zip(os2.panose_10()) {
        *dst = *src;
    }
    Some(Os2Attribs {
        version: os2.version(),
        us_weight_class: os2.us_weight_class(),
        us_width_class: os2.us_width_class(),
        fs_type: os2.fs_type(),
        y_subscript_x_size: os2.y_subscript_x_size(),
        y_subscript_y_size: os2.y_subscript_y_size(),
        y_subscript_x_offset: os2.y_subscript_x_offset(),
        y_subscript_y_offset: os2.y_subscript_y_offset(),
        y_superscript_x_size: os2.y_superscript_x_size(),
        y_superscript_y_size: os2.y_superscript_y_size(),
        y_superscript_x_offset: os2.y_superscript_x_offset(),
        y_superscript_y_offset: os2.y_superscript_y_offset(),
        y_strikeout_size: os2.y_strikeout_size(),
        y_strikeout_position: os2.y_strikeout_position(),
        s_family_class: os2.s_family_class(),
        panose,
        ul_unicode_range: [
            os2.ul_unicode_range_1(),
            os2.ul_unicode_range_2(),
            os2.ul_unicode_range_3(),
            os2.ul_unicode_range_4(),
        ],
        fs_selection: os2.fs_selection().bits(),
        us_first_char_index: os2.us_first_char_index(),
        us_last_char_index: os2.us_last_char_index(),
        s_typo_ascender: os2.s_typo_ascender(),
        s_typo_descender: os2.s_typo_descender(),
        s_typo_line_gap: os2.s_typo_line_gap(),
        us_win_ascent: os2.us_win_ascent(),
        us_win_descent: os2.us_win_descent(),
        ul_code_page_range: os2
            .ul_code_page_range_1()
            .zip(os2.ul_code_page_range_2())
            .map(|(first, second)| [first, second]),
        sx_height: os2.sx_height(),
        s_cap_height: os2.s_cap_height(),
        us_default_char: os2.us_default_char(),
        us_break_char: os2.us_break_char(),
        us_max_context: os2.us_max_context(),
    })
}

pub(crate) fn gasp(font: &FontRef) -> Option<GaspAttribs> {
    let gasp = font.gasp().ok()?;
    Some(GaspAttribs {
        version: gasp.version(),
        ranges: gasp
            .gasp_ranges()
            .iter()
            .map(|range| (range.range_max_ppem(), range.range_gasp_behavior().bits()))
            .collect(),
    })
}

/// Every decodable name record, in table order.
pub(crate) fn names(font: &FontRef) -> Vec<NameRecord> {
    let Ok(name) = font.name() else {
        return Vec::new();
    };
    name.name_record()
        .iter()
        .filter_map(|record| {
            let string = record.string(name.string_data()).ok()?;
            Some(NameRecord {
                name_id: record.name_id().to_u16(),
                platform_id: record.platform_id(),
                encoding_id: record.encoding_id(),
                language_id: record.language_id(),
                string: string.to_string(),
            })
        })
        .collect()
}

pub(crate) fn table_tags(font: &FontRef) -> Vec<Tag> {
    let mut tags: Vec<_> = font
        .table_directory
        .table_records()
        .iter()
        .map(|record| record.tag())
        .collect();
    tags.sort();
    tags
}

pub(crate) fn axes(font: &FontRef) -> Vec<AxisInfo> {
    font.axes()
        .iter()
        .map(|axis| AxisInfo {
            tag: axis.tag(),
            min: axis.min_value(),
            default: axis.default_value(),
            max: axis.max_value(),
        })
        .collect()
}

pub(crate) fn instances(font: &FontRef) -> Vec<NamedInstanceInfo> {
    font.named_instances()
        .iter()
        .map(|instance| NamedInstanceInfo {
            subfamily: font
                .localized_strings(instance.subfamily_name_id())
                .english_or_first()
                .map(|name| name.to_string())
                .unwrap_or_default(),
            coords: instance.user_coords().collect(),
        })
        .collect()
}
