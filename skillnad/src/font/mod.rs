//! Loading OpenType and TrueType binaries.
//!
//! Parsing is done with skrifa and its `read-fonts` tables. Shaping for
//! render mode comparisons goes through harfrust, rasterization through
//! tiny-skia.

use std::{fs::File, path::Path, sync::Arc};

use memmap2::Mmap;
use skrifa::{
    raw::{
        types::{F2Dot14, Tag},
        FontRef, TableProvider,
    },
    MetadataProvider,
};

use crate::{
    error::DiffError,
    source::{FontSource, FontTables, Rasterizer, Shaper},
};

mod layout;
mod pen;
mod raster;
mod shaper;
mod tables;
#[cfg(test)]
mod test_font;

use layout::GlyphOrder;
use raster::OutlineRasterizer;
use shaper::HarfrustShaper;

/// Font bytes shared between a font and its instances.
#[derive(Clone)]
pub struct SharedFontData(Arc<dyn AsRef<[u8]> + Send + Sync>);

impl SharedFontData {
    pub fn as_bytes(&self) -> &[u8] {
        (*self.0).as_ref()
    }
}

/// A font file positioned at one location of its design space.
pub struct OpenTypeFont {
    data: SharedFontData,
    location: Vec<(Tag, f32)>,
    tables: FontTables,
    shaper: Option<HarfrustShaper>,
    rasterizer: OutlineRasterizer,
}

impl OpenTypeFont {
    /// Memory maps and parses the font at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, DiffError> {
        let path = path.as_ref();
        let io_error = |source| DiffError::Io {
            path: path.to_owned(),
            source,
        };
        let file = File::open(path).map_err(io_error)?;
        // Safety: the mapping is read only and we never hand out a mutable view.
        let mmap = unsafe { Mmap::map(&file) }.map_err(io_error)?;
        log::info!("loading {}", path.display());
        Self::with_data(SharedFontData(Arc::new(mmap)), &[])
    }

    pub fn from_data(data: Vec<u8>) -> Result<Self, DiffError> {
        Self::with_data(SharedFontData(Arc::new(data)), &[])
    }

    fn with_data(data: SharedFontData, location: &[(Tag, f32)]) -> Result<Self, DiffError> {
        let font = FontRef::from_index(data.as_bytes(), 0)?;
        let axes = font.axes();
        if let Some((tag, _)) = location
            .iter()
            .find(|(tag, _)| !axes.iter().any(|axis| axis.tag() == *tag))
        {
            return Err(DiffError::UnknownAxis(*tag));
        }
        let mut coords = vec![F2Dot14::default(); axes.len()];
        axes.location_to_slice(location.iter().copied(), &mut coords);
        let tables = read_tables(&font, &coords)?;

        let shaper = match HarfrustShaper::new(data.clone(), location) {
            Ok(shaper) => Some(shaper),
            Err(e) => {
                log::warn!("text shaping unavailable: {e}");
                None
            }
        };
        let rasterizer = OutlineRasterizer::new(data.clone(), coords, tables.units_per_em);
        Ok(Self {
            data,
            location: location.to_vec(),
            tables,
            shaper,
            rasterizer,
        })
    }

    /// The user space location this font was instantiated at.
    pub fn location(&self) -> &[(Tag, f32)] {
        &self.location
    }
}

fn read_tables(font: &FontRef, coords: &[F2Dot14]) -> Result<FontTables, DiffError> {
    let glyph_order = tables::glyph_order(font)?;
    let order = GlyphOrder(&glyph_order);
    log::debug!("reading {} glyphs at {coords:?}", glyph_order.len());
    let font_tables = FontTables {
        units_per_em: font.head()?.units_per_em(),
        cmap: tables::cmap(font, &glyph_order),
        substitutions: layout::read_substitutions(font, order)?,
        kerning: layout::read_gpos_kerning(font, order)?,
        legacy_kerning: layout::read_legacy_kerning(font, order)?,
        mark_lookups: layout::read_mark_lookups(font, order)?,
        glyphs: tables::glyph_infos(font, &glyph_order, coords),
        head: tables::head(font),
        hhea: tables::hhea(font),
        os2: tables::os2(font),
        gasp: tables::gasp(font),
        names: tables::names(font),
        gdef_classes: layout::read_gdef_classes(font, order)?,
        table_tags: tables::table_tags(font),
        axes: tables::axes(font),
        instances: tables::instances(font),
        glyph_order,
    };
    Ok(font_tables)
}

impl FontSource for OpenTypeFont {
    fn tables(&self) -> &FontTables {
        &self.tables
    }

    fn instantiate(&self, location: &[(Tag, f32)]) -> Result<Box<dyn FontSource>, DiffError> {
        Ok(Box::new(Self::with_data(self.data.clone(), location)?))
    }

    fn shaper(&self) -> Option<&dyn Shaper> {
        self.shaper.as_ref().map(|shaper| shaper as &dyn Shaper)
    }

    fn rasterizer(&self) -> Option<&dyn Rasterizer> {
        Some(&self.rasterizer)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::{test_font::TestFont, *};
    use crate::{
        diff::{CategoryDiff, FontDiff},
        settings::{Category, DiffSettings},
        snapshot::FontSnapshot,
        source::{
            Anchor, BaseAnchors, KernPair, MarkAnchor, MarkAttachment, MarkLookup, MarkSubtable,
            PairPosSubtable, SubstitutionKind, SubstitutionRule,
        },
    };

    fn test_font() -> OpenTypeFont {
        OpenTypeFont::from_data(TestFont::default().build()).unwrap()
    }

    fn pair(left: &str, right: &str, value: i32) -> KernPair {
        KernPair {
            left: left.into(),
            right: right.into(),
            value,
        }
    }

    #[test]
    fn glyph_order_and_cmap() {
        let font = test_font();
        let tables = font.tables();
        assert_eq!(tables.glyph_order, [".notdef", "A", "V", "acutecomb"]);
        assert_eq!(
            tables.cmap,
            vec![
                (0x41, "A".to_string()),
                (0x56, "V".to_string()),
                (0x301, "acutecomb".to_string()),
            ]
        );
        assert_eq!(tables.units_per_em, 1000);
    }

    #[test]
    fn table_tags_are_sorted() {
        let font = test_font();
        let tags: Vec<_> = font.tables().table_tags.iter().map(|t| t.to_string()).collect();
        assert_eq!(
            tags,
            [
                "GDEF", "GPOS", "GSUB", "OS/2", "cmap", "glyf", "head", "hhea", "hmtx", "kern",
                "loca", "maxp", "name", "post"
            ]
        );
    }

    #[test]
    fn substitutions() {
        let font = test_font();
        assert_eq!(
            font.tables().substitutions,
            vec![SubstitutionRule {
                feature: Tag::new(b"salt"),
                kind: SubstitutionKind::Single,
                inputs: vec!["A".into()],
                outputs: vec!["V".into()],
            }]
        );
    }

    #[test]
    fn gpos_kerning() {
        let font = test_font();
        assert_eq!(
            font.tables().kerning,
            Some(vec![PairPosSubtable::Pairs(vec![pair("A", "V", -80)])])
        );
    }

    #[test]
    fn legacy_kerning_is_horizontal_only() {
        let font = test_font();
        assert_eq!(font.tables().legacy_kerning, vec![pair("V", "A", -40)]);
    }

    #[test]
    fn mark_attachment() {
        let font = test_font();
        assert_eq!(
            font.tables().mark_lookups,
            vec![MarkLookup {
                lookup_index: 1,
                kind: MarkAttachment::Base,
                subtables: vec![MarkSubtable {
                    bases: vec![BaseAnchors {
                        glyph: "A".into(),
                        anchors: vec![Some(Anchor::new(300, 700))],
                    }],
                    marks: vec![MarkAnchor {
                        glyph: "acutecomb".into(),
                        class: 0,
                        anchor: Some(Anchor::new(150, -10)),
                    }],
                }],
            }]
        );
    }

    #[test]
    fn gdef_classes() {
        let font = test_font();
        assert_eq!(
            font.tables().gdef_classes,
            Some(vec![
                ("A".to_string(), 1),
                ("V".to_string(), 1),
                ("acutecomb".to_string(), 3),
            ])
        );
    }

    #[test]
    fn glyph_metrics_and_areas() {
        let font = test_font();
        let tables = font.tables();
        let advances: Vec<_> = tables.glyphs.iter().map(|g| g.advance).collect();
        assert_eq!(advances, [500, 600, 600, 0]);

        let a = tables.glyph("A").unwrap();
        assert_eq!(a.area.abs(), 280_000.0);
        let bounds = a.bounds.unwrap();
        assert_eq!((bounds.x_min, bounds.x_max), (100.0, 500.0));
        assert_eq!((bounds.y_min, bounds.y_max), (0.0, 700.0));

        let notdef = tables.glyph(".notdef").unwrap();
        assert_eq!(notdef.bounds, None);
        assert_eq!(notdef.area, 0.0);
    }

    #[test]
    fn header_tables() {
        let font = test_font();
        let tables = font.tables();
        let head = tables.head.as_ref().unwrap();
        assert_eq!(head.font_revision, 1.5);
        assert_eq!(head.lowest_rec_ppem, 8);
        assert_eq!(head.created, 0xD5E8_4F00);
        let hhea = tables.hhea.as_ref().unwrap();
        assert_eq!((hhea.ascender, hhea.descender), (800, -200));
        let os2 = tables.os2.as_ref().unwrap();
        assert_eq!(os2.version, 4);
        assert_eq!(os2.us_weight_class, 400);
        assert_eq!(os2.panose, [2, 0, 5, 3, 0, 0, 0, 0, 0, 0]);
        assert_eq!(os2.ul_code_page_range, Some([1, 0]));
        assert_eq!(os2.s_cap_height, Some(700));
        assert_eq!(os2.us_max_context, Some(2));
        assert!(tables.gasp.is_none());
    }

    #[test]
    fn name_records() {
        let font = test_font();
        let names: Vec<_> = font
            .tables()
            .names
            .iter()
            .map(|r| (r.name_id, r.platform_id, r.string.as_str()))
            .collect();
        assert_eq!(names, [(1, 3, "Skillnad Test"), (2, 3, "Regular")]);
    }

    #[test]
    fn static_font_has_no_axes() {
        let font = test_font();
        assert!(!font.tables().is_variable());
        assert!(font.instantiate(&[]).is_ok());
        assert!(matches!(
            font.instantiate(&[(Tag::new(b"wght"), 700.0)]),
            Err(DiffError::UnknownAxis(tag)) if tag == Tag::new(b"wght")
        ));
    }

    #[test]
    fn shapes_with_kerning() {
        let font = test_font();
        let run = font.shaper().unwrap().shape("AV", &[]).unwrap();
        let glyphs: Vec<_> = run.iter().map(|g| (g.glyph_id, g.x_advance)).collect();
        assert_eq!(glyphs, [(1, 520), (2, 600)]);
    }

    #[test]
    fn shapes_with_features() {
        let font = test_font();
        let run = font
            .shaper()
            .unwrap()
            .shape("A", &[Tag::new(b"salt")])
            .unwrap();
        assert_eq!(run.len(), 1);
        assert_eq!(run[0].glyph_id, 2);
    }

    #[test]
    fn renders_outlines() {
        let font = test_font();
        let run = font.shaper().unwrap().shape("A", &[]).unwrap();
        let bitmap = font.rasterizer().unwrap().render(&run, 100.0).unwrap();
        assert!((40..=41).contains(&bitmap.width()), "{}", bitmap.width());
        assert!((70..=71).contains(&bitmap.height()), "{}", bitmap.height());
        assert_eq!(bitmap.get(20, 35), Some(255));
    }

    #[test]
    fn empty_run_renders_nothing() {
        let font = test_font();
        let bitmap = font.rasterizer().unwrap().render(&[], 64.0).unwrap();
        assert_eq!((bitmap.width(), bitmap.height()), (0, 0));
    }

    fn snapshot(font: TestFont) -> FontSnapshot {
        let mut snapshot = FontSnapshot::from_source(OpenTypeFont::from_data(font.build()).unwrap());
        snapshot.recalc_tables().unwrap();
        snapshot
    }

    #[test]
    fn diff_between_builds() {
        let before = snapshot(TestFont::default());
        let after = snapshot(TestFont {
            kern_av: -120,
            v_x_max: 600,
            mark_x: 170,
            family: "Skillnad Test Two",
            ..Default::default()
        });
        let diff = FontDiff::new(&before, &after, &DiffSettings::default()).unwrap();
        let counts = |category| diff.get(category).unwrap().counts();
        assert_eq!(counts(Category::Kerns), (0, 0, 1));
        assert_eq!(counts(Category::Marks), (0, 0, 1));
        assert_eq!(counts(Category::Names), (0, 0, 1));
        assert_eq!(counts(Category::Metrics), (0, 0, 0));
        assert_eq!(counts(Category::Tables), (0, 0, 0));
        assert_eq!(counts(Category::Charset), (0, 0, 0));

        let Some(CategoryDiff::Glyphs(glyphs)) = diff.get(Category::Glyphs) else {
            panic!("no glyph results");
        };
        let changed: Vec<_> = glyphs.modified.iter().map(|c| c.glyph.name.as_str()).collect();
        assert!(changed.contains(&"V"), "{changed:?}");
        assert!(!changed.contains(&"A"), "{changed:?}");
    }

    #[test]
    fn same_build_has_no_differences() {
        let diff = FontDiff::new(
            &snapshot(TestFont::default()),
            &snapshot(TestFont::default()),
            &DiffSettings::default(),
        )
        .unwrap();
        assert!(diff.is_empty());
    }

    #[test]
    fn missing_file() {
        let result = OpenTypeFont::open("/nonexistent/font.ttf");
        assert!(matches!(result, Err(DiffError::Io { .. })));
    }

    #[test]
    fn garbage_data() {
        let result = OpenTypeFont::from_data(b"not a font".to_vec());
        assert!(matches!(result, Err(DiffError::Read(_))));
    }
}
