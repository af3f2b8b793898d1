//! Glyph signatures.
//!
//! A signature is the smallest input, a string plus a set of OpenType
//! features, that makes a shaper produce a given glyph. Signatures let us
//! match glyphs between two builds of a font even when glyph names or
//! glyph ids have changed.

use hashbrown::{HashMap, HashSet};
use icu_properties::{maps, CanonicalCombiningClass};
use serde::Serialize;
use skrifa::raw::types::Tag;

use crate::source::{FontTables, SubstitutionRule};

/// The shaping input for a glyph.
///
/// Ordering compares features before text, which is what makes the choice
/// between competing inputs deterministic.
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Signature {
    pub features: Vec<Tag>,
    pub text: String,
}

/// Computes signatures for the glyphs of one font.
///
/// Results are memoized for the lifetime of the resolver.
pub struct SignatureResolver<'a> {
    reverse_cmap: HashMap<&'a str, u32>,
    producers: HashMap<&'a str, Vec<&'a SubstitutionRule>>,
    advances: HashMap<&'a str, i32>,
    ink_widths: HashMap<&'a str, f64>,
    space_width: i32,
    memo: HashMap<&'a str, Signature>,
}

impl<'a> SignatureResolver<'a> {
    pub fn new(tables: &'a FontTables) -> Self {
        // the lowest codepoint wins when several map to one glyph
        let mut reverse_cmap = HashMap::new();
        for (codepoint, glyph) in &tables.cmap {
            reverse_cmap.entry(glyph.as_str()).or_insert(*codepoint);
        }
        let mut producers: HashMap<&str, Vec<&SubstitutionRule>> = HashMap::new();
        for rule in &tables.substitutions {
            for output in &rule.outputs {
                let rules = producers.entry(output.as_str()).or_default();
                if !rules.iter().any(|r| std::ptr::eq(*r, rule)) {
                    rules.push(rule);
                }
            }
        }
        let advances: HashMap<_, _> = tables
            .glyphs
            .iter()
            .map(|info| (info.name.as_str(), info.advance))
            .collect();
        let ink_widths = tables
            .glyphs
            .iter()
            .filter_map(|info| {
                let bounds = info.bounds?;
                Some((info.name.as_str(), bounds.x_max - bounds.x_min))
            })
            .collect();
        let space_width = tables
            .cmap
            .iter()
            .find(|(codepoint, _)| *codepoint == 0x20)
            .and_then(|(_, glyph)| advances.get(glyph.as_str()).copied())
            .unwrap_or_default();
        Self {
            reverse_cmap,
            producers,
            advances,
            ink_widths,
            space_width,
            memo: HashMap::new(),
        }
    }

    /// Returns the signature of the named glyph, if one can be derived.
    pub fn resolve(&mut self, name: &'a str) -> Option<Signature> {
        let mut seen = HashSet::new();
        self.resolve_with(name, &mut seen)
    }

    /// Like [`resolve`](Self::resolve), also returning the number of
    /// spaces to place before the text when rendering.
    ///
    /// Zero width glyphs, usually combining marks, get enough spaces to
    /// cover their ink, and at least one so they have something to attach
    /// to. Fonts without a space glyph get no padding.
    pub fn resolve_padded(&mut self, name: &'a str) -> Option<(Signature, usize)> {
        let signature = self.resolve(name)?;
        let advance = self.advances.get(name).copied().unwrap_or_default();
        if advance != 0 || self.space_width <= 0 {
            return Some((signature, 0));
        }
        let ink = self.ink_widths.get(name).copied().unwrap_or_default();
        let padding = (ink / self.space_width as f64).ceil().max(1.0) as usize;
        Some((signature, padding))
    }

    fn resolve_with(&mut self, name: &'a str, seen: &mut HashSet<&'a str>) -> Option<Signature> {
        if let Some(signature) = self.memo.get(name) {
            return Some(signature.clone());
        }
        if !seen.insert(name) {
            return None;
        }
        let mut candidates = Vec::new();
        if let Some(codepoint) = self.reverse_cmap.get(name).copied() {
            if let Some(ch) = char::from_u32(codepoint).filter(|ch| *ch != '\0') {
                candidates.push(Signature {
                    features: Vec::new(),
                    text: ch.to_string(),
                });
            }
        }
        let rules = self.producers.get(name).cloned().unwrap_or_default();
        for rule in rules {
            if let Some(candidate) = self.candidate_from_rule(rule, seen) {
                candidates.push(candidate);
            }
        }
        seen.remove(name);

        let best = candidates.into_iter().min()?;
        self.memo.insert(name, best.clone());
        Some(best)
    }

    fn candidate_from_rule(
        &mut self,
        rule: &'a SubstitutionRule,
        seen: &mut HashSet<&'a str>,
    ) -> Option<Signature> {
        let mut features = vec![rule.feature];
        let mut text = String::new();
        for input in &rule.inputs {
            let resolved = self.resolve_with(input.as_str(), seen)?;
            features.extend(resolved.features);
            text.push_str(&resolved.text);
        }
        features.sort();
        features.dedup();
        Some(Signature { features, text })
    }
}

/// A glyph together with its signature.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Glyph {
    pub name: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub features: Vec<String>,
    pub text: String,
    #[serde(skip)]
    pub padding: usize,
    #[serde(skip)]
    pub is_combining: bool,
    #[serde(skip)]
    resolved: bool,
}

impl Glyph {
    pub fn new(name: impl Into<String>, signature: Option<(Signature, usize)>) -> Self {
        let name = name.into();
        match signature {
            Some((signature, padding)) => Self {
                name,
                features: signature.features.iter().map(Tag::to_string).collect(),
                is_combining: signature.text.chars().next().is_some_and(is_combining),
                text: signature.text,
                padding,
                resolved: true,
            },
            None => Self {
                name,
                features: Vec::new(),
                text: String::new(),
                padding: 0,
                is_combining: false,
                resolved: false,
            },
        }
    }

    pub fn has_signature(&self) -> bool {
        self.resolved
    }

    /// The key used to match this glyph against glyphs of another font.
    ///
    /// Glyphs without a signature fall back to their name.
    pub fn key(&self) -> String {
        if self.resolved {
            let mut key = self.text.clone();
            for feature in &self.features {
                key.push_str(feature);
            }
            key
        } else {
            self.name.clone()
        }
    }

    /// The string to hand to a shaper to reproduce this glyph.
    pub fn shaping_text(&self) -> String {
        let mut text = " ".repeat(self.padding);
        text.push_str(&self.text);
        text
    }

    pub fn feature_tags(&self) -> Vec<Tag> {
        self.features
            .iter()
            .filter_map(|feature| Tag::new_checked(feature.as_bytes()).ok())
            .collect()
    }
}

pub(crate) fn is_combining(ch: char) -> bool {
    maps::canonical_combining_class().get(ch) != CanonicalCombiningClass::NotReordered
}

/// Every glyph of a font, in glyph order.
#[derive(Clone, Debug, Default)]
pub struct GlyphSet {
    glyphs: Vec<Glyph>,
    by_name: HashMap<String, usize>,
    keys: HashSet<String>,
}

impl GlyphSet {
    pub fn build(tables: &FontTables) -> Self {
        let mut resolver = SignatureResolver::new(tables);
        let mut glyphs = Vec::with_capacity(tables.glyph_order.len());
        for name in &tables.glyph_order {
            let signature = resolver.resolve_padded(name);
            if signature.is_none() {
                log::debug!("no signature for glyph '{name}'");
            }
            glyphs.push(Glyph::new(name.as_str(), signature));
        }
        let by_name = glyphs
            .iter()
            .enumerate()
            .map(|(idx, glyph)| (glyph.name.clone(), idx))
            .collect();
        let keys = glyphs.iter().map(Glyph::key).collect();
        Self {
            glyphs,
            by_name,
            keys,
        }
    }

    pub fn get(&self, name: &str) -> Option<&Glyph> {
        self.by_name.get(name).map(|idx| &self.glyphs[*idx])
    }

    /// Returns true if some glyph in the set has the given key.
    pub fn contains_key(&self, key: &str) -> bool {
        self.keys.contains(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Glyph> + '_ {
        self.glyphs.iter()
    }

    pub fn len(&self) -> usize {
        self.glyphs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.glyphs.is_empty()
    }
}
