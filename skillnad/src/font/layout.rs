//! Reading of the layout tables into owned rules.

use hashbrown::HashSet;
use skrifa::raw::{
    tables::{
        gpos::{AnchorTable, MarkBasePosFormat1, MarkMarkPosFormat1, PairPos, PositionSubtables},
        gsub::{SingleSubst, SubstitutionSubtables},
        kern::SubtableKind,
        layout::ClassDef,
    },
    types::{GlyphId, GlyphId16, Tag},
    FontRef, ReadError, TableProvider,
};

use crate::source::{
    Anchor, BaseAnchors, ClassKerning, KernPair, MarkAnchor, MarkAttachment, MarkLookup,
    MarkSubtable, PairPosSubtable, SubstitutionKind, SubstitutionRule,
};

const KERN: Tag = Tag::new(b"kern");
const MARK_FEATURES: [Tag; 2] = [Tag::new(b"mark"), Tag::new(b"mkmk")];

/// Glyph names indexed by glyph id.
#[derive(Clone, Copy)]
pub(crate) struct GlyphOrder<'a>(pub &'a [String]);

impl GlyphOrder<'_> {
    fn name(&self, gid: impl Into<GlyphId>) -> Option<String> {
        self.0.get(gid.into().to_u32() as usize).cloned()
    }

    fn names(&self, gids: impl IntoIterator<Item = GlyphId16>) -> Option<Vec<String>> {
        gids.into_iter().map(|gid| self.name(gid)).collect()
    }

    /// Every glyph with a non zero class.
    fn classes(&self, class_def: &ClassDef) -> Vec<(String, u16)> {
        self.0
            .iter()
            .enumerate()
            .filter_map(|(gid, name)| {
                let class = class_def.get(GlyphId16::new(u16::try_from(gid).ok()?));
                (class != 0).then(|| (name.clone(), class))
            })
            .collect()
    }
}

/// Expands every substitution lookup reachable from a GSUB feature.
pub(crate) fn read_substitutions(
    font: &FontRef,
    order: GlyphOrder,
) -> Result<Vec<SubstitutionRule>, ReadError> {
    let Ok(gsub) = font.gsub() else {
        return Ok(Vec::new());
    };
    let feature_list = gsub.feature_list()?;
    let lookups = gsub.lookup_list()?.lookups();
    let mut seen = HashSet::new();
    let mut rules = Vec::new();
    for record in feature_list.feature_records() {
        let tag = record.feature_tag();
        let feature = record.feature(feature_list.offset_data())?;
        for index in feature.lookup_list_indices() {
            if !seen.insert((tag, index.get())) {
                continue;
            }
            let lookup = lookups.get(index.get() as usize)?;
            let mut push = |kind, inputs: Option<Vec<String>>, outputs: Option<Vec<String>>| {
                if let Some((inputs, outputs)) = inputs.zip(outputs) {
                    rules.push(SubstitutionRule {
                        feature: tag,
                        kind,
                        inputs,
                        outputs,
                    });
                }
            };
            match lookup.subtables()? {
                SubstitutionSubtables::Single(subtables) => {
                    for subtable in subtables.iter() {
                        for (input, output) in single_substitutions(&subtable?)? {
                            push(
                                SubstitutionKind::Single,
                                order.names([input]),
                                order.names([output]),
                            );
                        }
                    }
                }
                SubstitutionSubtables::Reverse(subtables) => {
                    for subtable in subtables.iter() {
                        let subtable = subtable?;
                        let outputs = subtable.substitute_glyph_ids();
                        for (input, output) in subtable.coverage()?.iter().zip(outputs) {
                            push(
                                SubstitutionKind::Single,
                                order.names([input]),
                                order.names([output.get()]),
                            );
                        }
                    }
                }
                SubstitutionSubtables::Multiple(subtables) => {
                    for subtable in subtables.iter() {
                        let subtable = subtable?;
                        let sequences = subtable.sequences();
                        for (i, input) in subtable.coverage()?.iter().enumerate() {
                            let sequence = sequences.get(i)?;
                            let outputs = sequence.substitute_glyph_ids().iter().map(|g| g.get());
                            push(
                                SubstitutionKind::Multiple,
                                order.names([input]),
                                order.names(outputs),
                            );
                        }
                    }
                }
                SubstitutionSubtables::Alternate(subtables) => {
                    for subtable in subtables.iter() {
                        let subtable = subtable?;
                        let sets = subtable.alternate_sets();
                        for (i, input) in subtable.coverage()?.iter().enumerate() {
                            let set = sets.get(i)?;
                            for alternate in set.alternate_glyph_ids() {
                                push(
                                    SubstitutionKind::Alternate,
                                    order.names([input]),
                                    order.names([alternate.get()]),
                                );
                            }
                        }
                    }
                }
                SubstitutionSubtables::Ligature(subtables) => {
                    for subtable in subtables.iter() {
                        let subtable = subtable?;
                        let sets = subtable.ligature_sets();
                        for (i, first) in subtable.coverage()?.iter().enumerate() {
                            let set = sets.get(i)?;
                            for ligature in set.ligatures().iter() {
                                let ligature = ligature?;
                                let inputs = std::iter::once(first).chain(
                                    ligature.component_glyph_ids().iter().map(|g| g.get()),
                                );
                                push(
                                    SubstitutionKind::Ligature,
                                    order.names(inputs),
                                    order.names([ligature.ligature_glyph()]),
                                );
                            }
                        }
                    }
                }
                SubstitutionSubtables::Contextual(_) | SubstitutionSubtables::ChainContextual(_) => {
                    log::debug!("skipping contextual lookup {} in '{tag}'", index.get());
                }
            }
        }
    }
    Ok(rules)
}

fn single_substitutions(subtable: &SingleSubst) -> Result<Vec<(GlyphId16, GlyphId16)>, ReadError> {
    Ok(match subtable {
        SingleSubst::Format1(table) => {
            let delta = table.delta_glyph_id();
            table
                .coverage()?
                .iter()
                .map(|gid| {
                    let output = (gid.to_u16() as i32 + delta as i32) as u16;
                    (gid, GlyphId16::new(output))
                })
                .collect()
        }
        SingleSubst::Format2(table) => table
            .coverage()?
            .iter()
            .zip(table.substitute_glyph_ids())
            .map(|(input, output)| (input, output.get()))
            .collect(),
    })
}

/// Lookup indices referenced by the given features, in first seen order.
fn feature_lookups(font: &FontRef, features: &[Tag]) -> Result<Option<Vec<u16>>, ReadError> {
    let gpos = font.gpos()?;
    let feature_list = gpos.feature_list()?;
    let mut found = false;
    let mut seen = HashSet::new();
    let mut indices = Vec::new();
    for record in feature_list.feature_records() {
        if !features.contains(&record.feature_tag()) {
            continue;
        }
        found = true;
        let feature = record.feature(feature_list.offset_data())?;
        for index in feature.lookup_list_indices() {
            if seen.insert(index.get()) {
                indices.push(index.get());
            }
        }
    }
    Ok(found.then_some(indices))
}

/// Pair adjustment subtables of the GPOS `kern` feature.
pub(crate) fn read_gpos_kerning(
    font: &FontRef,
    order: GlyphOrder,
) -> Result<Option<Vec<PairPosSubtable>>, ReadError> {
    if font.gpos().is_err() {
        return Ok(None);
    }
    let Some(indices) = feature_lookups(font, &[KERN])? else {
        return Ok(None);
    };
    let lookups = font.gpos()?.lookup_list()?.lookups();
    let mut subtables = Vec::new();
    for index in indices {
        let PositionSubtables::Pair(pair_subtables) = lookups.get(index as usize)?.subtables()?
        else {
            log::debug!("kern feature lookup {index} is not a pair adjustment");
            continue;
        };
        for subtable in pair_subtables.iter() {
            subtables.push(match subtable? {
                PairPos::Format1(table) => {
                    let mut pairs = Vec::new();
                    let pair_sets = table.pair_sets();
                    for (i, first) in table.coverage()?.iter().enumerate() {
                        let Some(left) = order.name(first) else {
                            continue;
                        };
                        for record in pair_sets.get(i)?.pair_value_records().iter() {
                            let record = record?;
                            let Some(right) = order.name(record.second_glyph()) else {
                                continue;
                            };
                            pairs.push(KernPair {
                                left: left.clone(),
                                right,
                                value: record.value_record1().x_advance().unwrap_or_default() as i32,
                            });
                        }
                    }
                    PairPosSubtable::Pairs(pairs)
                }
                PairPos::Format2(table) => {
                    let mut values = Vec::new();
                    for class1 in table.class1_records().iter() {
                        for class2 in class1?.class2_records().iter() {
                            values.push(
                                class2?.value_record1().x_advance().unwrap_or_default() as i32,
                            );
                        }
                    }
                    PairPosSubtable::Classes(ClassKerning {
                        coverage: table
                            .coverage()?
                            .iter()
                            .filter_map(|gid| order.name(gid))
                            .collect(),
                        class_def1: order.classes(&table.class_def1()?),
                        class_def2: order.classes(&table.class_def2()?),
                        class1_count: table.class1_count(),
                        class2_count: table.class2_count(),
                        values,
                    })
                }
            });
        }
    }
    Ok(Some(subtables))
}

/// Mark attachment lookups of the GPOS `mark` and `mkmk` features.
///
/// The attachment kind follows the lookup type rather than the feature.
pub(crate) fn read_mark_lookups(
    font: &FontRef,
    order: GlyphOrder,
) -> Result<Vec<MarkLookup>, ReadError> {
    if font.gpos().is_err() {
        return Ok(Vec::new());
    }
    let indices = feature_lookups(font, &MARK_FEATURES)?.unwrap_or_default();
    let lookups = font.gpos()?.lookup_list()?.lookups();
    let mut result = Vec::new();
    for lookup_index in indices {
        let (kind, subtables) = match lookups.get(lookup_index as usize)?.subtables()? {
            PositionSubtables::MarkToBase(subtables) => (
                MarkAttachment::Base,
                subtables
                    .iter()
                    .map(|subtable| mark_base(&subtable?, order))
                    .collect::<Result<Vec<_>, _>>()?,
            ),
            PositionSubtables::MarkToMark(subtables) => (
                MarkAttachment::Mark,
                subtables
                    .iter()
                    .map(|subtable| mark_mark(&subtable?, order))
                    .collect::<Result<Vec<_>, _>>()?,
            ),
            _ => {
                log::debug!("mark feature lookup {lookup_index} is not a mark attachment");
                continue;
            }
        };
        result.push(MarkLookup {
            lookup_index,
            kind,
            subtables,
        });
    }
    Ok(result)
}

fn mark_base(table: &MarkBasePosFormat1, order: GlyphOrder) -> Result<MarkSubtable, ReadError> {
    let mark_array = table.mark_array()?;
    let mark_records = mark_array.mark_records();
    let mut marks = Vec::new();
    for (i, gid) in table.mark_coverage()?.iter().enumerate() {
        let (Some(glyph), Some(record)) = (order.name(gid), mark_records.get(i)) else {
            continue;
        };
        marks.push(MarkAnchor {
            glyph,
            class: record.mark_class(),
            anchor: record
                .mark_anchor(mark_array.offset_data())
                .ok()
                .map(|anchor| anchor_xy(&anchor)),
        });
    }

    let class_count = table.mark_class_count() as usize;
    let base_array = table.base_array()?;
    let base_records = base_array.base_records();
    let mut bases = Vec::new();
    for (i, gid) in table.base_coverage()?.iter().enumerate() {
        let Some(glyph) = order.name(gid) else {
            continue;
        };
        let record = base_records.get(i)?;
        let offsets = record.base_anchors(base_array.offset_data());
        bases.push(BaseAnchors {
            glyph,
            anchors: (0..class_count)
                .map(|class| offsets.get(class).and_then(Result::ok).map(|a| anchor_xy(&a)))
                .collect(),
        });
    }
    Ok(MarkSubtable { bases, marks })
}

fn mark_mark(table: &MarkMarkPosFormat1, order: GlyphOrder) -> Result<MarkSubtable, ReadError> {
    let mark1_array = table.mark1_array()?;
    let mark1_records = mark1_array.mark_records();
    let mut marks = Vec::new();
    for (i, gid) in table.mark1_coverage()?.iter().enumerate() {
        let (Some(glyph), Some(record)) = (order.name(gid), mark1_records.get(i)) else {
            continue;
        };
        marks.push(MarkAnchor {
            glyph,
            class: record.mark_class(),
            anchor: record
                .mark_anchor(mark1_array.offset_data())
                .ok()
                .map(|anchor| anchor_xy(&anchor)),
        });
    }

    let class_count = table.mark_class_count() as usize;
    let mark2_array = table.mark2_array()?;
    let mark2_records = mark2_array.mark2_records();
    let mut bases = Vec::new();
    for (i, gid) in table.mark2_coverage()?.iter().enumerate() {
        let Some(glyph) = order.name(gid) else {
            continue;
        };
        let record = mark2_records.get(i)?;
        let offsets = record.mark2_anchors(mark2_array.offset_data());
        bases.push(BaseAnchors {
            glyph,
            anchors: (0..class_count)
                .map(|class| offsets.get(class).and_then(Result::ok).map(|a| anchor_xy(&a)))
                .collect(),
        });
    }
    Ok(MarkSubtable { bases, marks })
}

fn anchor_xy(anchor: &AnchorTable) -> Anchor {
    match anchor {
        AnchorTable::Format1(table) => Anchor::new(
            table.x_coordinate() as i32,
            table.y_coordinate() as i32,
        ),
        AnchorTable::Format2(table) => Anchor::new(
            table.x_coordinate() as i32,
            table.y_coordinate() as i32,
        ),
        AnchorTable::Format3(table) => Anchor::new(
            table.x_coordinate() as i32,
            table.y_coordinate() as i32,
        ),
    }
}

/// GDEF glyph classes, `None` when the font carries no class definition.
pub(crate) fn read_gdef_classes(
    font: &FontRef,
    order: GlyphOrder,
) -> Result<Option<Vec<(String, u16)>>, ReadError> {
    let Ok(gdef) = font.gdef() else {
        return Ok(None);
    };
    match gdef.glyph_class_def() {
        Some(class_def) => Ok(Some(order.classes(&class_def?))),
        None => Ok(None),
    }
}

/// Format 0 horizontal pairs of a legacy `kern` table.
///
/// Both the OpenType and the Apple layout are read. Cross stream, variation
/// and state machine subtables are skipped.
pub(crate) fn read_legacy_kerning(
    font: &FontRef,
    order: GlyphOrder,
) -> Result<Vec<KernPair>, ReadError> {
    let Ok(kern) = font.kern() else {
        return Ok(Vec::new());
    };
    let mut pairs = Vec::new();
    for subtable in kern.subtables() {
        let subtable = subtable?;
        if !subtable.is_horizontal() || subtable.is_cross_stream() || subtable.is_variable() {
            log::debug!("skipping kern subtable that is not horizontal");
            continue;
        }
        let SubtableKind::Format0(format0) = subtable.kind()? else {
            log::debug!("skipping kern subtable that is not format 0");
            continue;
        };
        pairs.extend(format0.pairs().iter().filter_map(|pair| {
            Some(KernPair {
                left: order.name(pair.left())?,
                right: order.name(pair.right())?,
                value: pair.value() as i32,
            })
        }));
    }
    Ok(pairs)
}
