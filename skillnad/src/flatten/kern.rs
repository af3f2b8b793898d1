//! Flattening pair and class kerning into explicit glyph pairs.

use std::collections::BTreeMap;

use hashbrown::HashSet;
use serde::Serialize;

use crate::{
    signature::{Glyph, GlyphSet},
    source::{ClassKerning, FontTables, KernPair, PairPosSubtable},
};

/// A kerning adjustment between two glyphs, in font units.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct KernRow {
    pub left: Glyph,
    pub right: Glyph,
    pub value: i32,
}

/// Returns one row per kerned glyph pair.
///
/// GPOS kerning is preferred; the legacy `kern` table is only consulted
/// when the font has no GPOS `kern` feature. The first value seen for a
/// pair wins, and pairs with a glyph lacking a signature are dropped.
pub fn flatten_kerning(tables: &FontTables, glyphs: &GlyphSet) -> Vec<KernRow> {
    let pairs = match tables.kerning.as_deref() {
        Some(subtables) if !subtables.is_empty() => flatten_gpos(subtables, &tables.glyph_order),
        _ if !tables.legacy_kerning.is_empty() => tables.legacy_kerning.clone(),
        _ => {
            log::warn!("font has no GPOS kern feature or kern table, no kerns found");
            return Vec::new();
        }
    };
    let mut seen = HashSet::new();
    let mut rows = Vec::with_capacity(pairs.len());
    for pair in pairs {
        if !seen.insert((pair.left.clone(), pair.right.clone())) {
            continue;
        }
        let (Some(left), Some(right)) = (glyphs.get(&pair.left), glyphs.get(&pair.right)) else {
            continue;
        };
        if !left.has_signature() || !right.has_signature() {
            log::debug!("dropping kern {}/{}, no signature", pair.left, pair.right);
            continue;
        }
        rows.push(KernRow {
            left: left.clone(),
            right: right.clone(),
            value: pair.value,
        });
    }
    rows
}

fn flatten_gpos(subtables: &[PairPosSubtable], glyph_order: &[String]) -> Vec<KernPair> {
    let mut pairs = Vec::new();
    for subtable in subtables {
        match subtable {
            PairPosSubtable::Pairs(explicit) => pairs.extend(explicit.iter().cloned()),
            PairPosSubtable::Classes(classes) => flatten_classes(classes, glyph_order, &mut pairs),
        }
    }
    pairs
}

fn flatten_classes(kerning: &ClassKerning, glyph_order: &[String], out: &mut Vec<KernPair>) {
    // class 0 is implicit: for the first glyph it holds covered glyphs
    // without a class, for the second glyph every unclassed glyph
    let classes1 = group_by_class(&kerning.class_def1, kerning.coverage.iter());
    let classes2 = group_by_class(&kerning.class_def2, glyph_order.iter());
    for (class1, lefts) in &classes1 {
        for (class2, rights) in &classes2 {
            let value = kerning.value(*class1, *class2);
            if value == 0 {
                continue;
            }
            for left in lefts {
                for right in rights {
                    out.push(KernPair {
                        left: left.to_string(),
                        right: right.to_string(),
                        value,
                    });
                }
            }
        }
    }
}

fn group_by_class<'a>(
    class_def: &'a [(String, u16)],
    class_zero_candidates: impl Iterator<Item = &'a String>,
) -> BTreeMap<u16, Vec<&'a str>> {
    let mut classes: BTreeMap<u16, Vec<&str>> = BTreeMap::new();
    let mut classed = HashSet::new();
    for (glyph, class) in class_def.iter().filter(|(_, class)| *class != 0) {
        classes.entry(*class).or_default().push(glyph.as_str());
        classed.insert(glyph.as_str());
    }
    let class_zero: Vec<_> = class_zero_candidates
        .map(String::as_str)
        .filter(|glyph| !classed.contains(glyph))
        .collect();
    if !class_zero.is_empty() {
        classes.insert(0, class_zero);
    }
    classes
}
