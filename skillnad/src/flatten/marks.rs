//! Flattening mark attachment lookups into explicit anchor pairs.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::{
    signature::{Glyph, GlyphSet},
    source::{Anchor, FontTables, MarkAttachment, MarkSubtable},
};

/// A mark attached to a base (or to another mark), with both anchors.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MarkRow {
    pub base: Glyph,
    pub base_x: i32,
    pub base_y: i32,
    pub mark: Glyph,
    pub mark_x: i32,
    pub mark_y: i32,
}

impl MarkRow {
    /// Position of the mark origin relative to the base origin.
    pub fn offset(&self) -> (i32, i32) {
        (self.base_x - self.mark_x, self.base_y - self.mark_y)
    }
}

/// Flattened mark-to-base and mark-to-mark attachments.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MarkTables {
    pub marks: Vec<MarkRow>,
    pub mkmks: Vec<MarkRow>,
}

/// Cross joins base and mark anchors that share a class within a subtable.
///
/// Mark-to-base rows are kept when the attaching mark is a combining
/// character; mark-to-mark rows need both glyphs to be combining.
pub fn flatten_marks(tables: &FontTables, glyphs: &GlyphSet) -> MarkTables {
    if tables.mark_lookups.is_empty() {
        log::warn!("font has no GPOS mark or mkmk lookups");
    }
    let mut result = MarkTables::default();
    for lookup in &tables.mark_lookups {
        let table = match lookup.kind {
            MarkAttachment::Base => &mut result.marks,
            MarkAttachment::Mark => &mut result.mkmks,
        };
        let before = table.len();
        for subtable in &lookup.subtables {
            let rows = join_anchors(subtable, glyphs);
            match lookup.kind {
                MarkAttachment::Base => table.extend(rows.filter(|row| row.mark.is_combining)),
                MarkAttachment::Mark => {
                    table.extend(rows.filter(|row| row.mark.is_combining && row.base.is_combining))
                }
            }
        }
        log::debug!(
            "lookup {} ({:?}) gave {} rows",
            lookup.lookup_index,
            lookup.kind,
            table.len() - before
        );
    }
    result
}

type AnchorGroups<'a> = BTreeMap<u16, Vec<(&'a Glyph, Anchor)>>;

fn join_anchors<'a>(
    subtable: &'a MarkSubtable,
    glyphs: &'a GlyphSet,
) -> impl Iterator<Item = MarkRow> + 'a {
    let mut bases = AnchorGroups::new();
    for base in &subtable.bases {
        let Some(glyph) = resolved(glyphs, &base.glyph) else {
            continue;
        };
        for (class, anchor) in base.anchors.iter().enumerate() {
            if let Some(anchor) = anchor {
                bases.entry(class as u16).or_default().push((glyph, *anchor));
            }
        }
    }
    let mut marks = AnchorGroups::new();
    for mark in &subtable.marks {
        let (Some(glyph), Some(anchor)) = (resolved(glyphs, &mark.glyph), mark.anchor) else {
            continue;
        };
        marks.entry(mark.class).or_default().push((glyph, anchor));
    }
    bases.into_iter().flat_map(move |(class, base_anchors)| {
        let mark_anchors = marks.get(&class).cloned().unwrap_or_default();
        base_anchors.into_iter().flat_map(move |(base, base_anchor)| {
            mark_anchors
                .clone()
                .into_iter()
                .map(move |(mark, mark_anchor)| MarkRow {
                    base: base.clone(),
                    base_x: base_anchor.x,
                    base_y: base_anchor.y,
                    mark: mark.clone(),
                    mark_x: mark_anchor.x,
                    mark_y: mark_anchor.y,
                })
        })
    })
}

fn resolved<'a>(glyphs: &'a GlyphSet, name: &str) -> Option<&'a Glyph> {
    glyphs.get(name).filter(|glyph| glyph.has_signature())
}
