//! Regression checks between two builds of a font.
//!
//! A [`FontSnapshot`] turns a font into flat, comparable tables: kerning
//! and mark attachment pairs, glyph metrics, header attributes, names and
//! outline areas. Glyphs are keyed by the text that produces them rather
//! than by name or id, so renamed or reordered glyphs still line up.
//! [`FontDiff`] then reports which rows are new, missing or modified.
//!
//! ```no_run
//! use skillnad::{DiffSettings, FontDiff, FontSnapshot};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let before = FontSnapshot::open("before/Font-Regular.ttf")?;
//! let after = FontSnapshot::open("after/Font-Regular.ttf")?;
//! let diff = FontDiff::new(&before, &after, &DiffSettings::default())?;
//! println!("{}", serde_json::to_string_pretty(&diff)?);
//! # Ok(())
//! # }
//! ```

pub mod diff;
pub mod error;
pub mod extract;
pub mod flatten;
pub mod font;
pub mod settings;
pub mod shape;
pub mod signature;
pub mod snapshot;
pub mod source;

#[cfg(test)]
mod testing;

pub use diff::{CategoryDiff, DiffResult, FontDiff};
pub use error::DiffError;
pub use font::OpenTypeFont;
pub use settings::{Category, DiffSettings};
pub use shape::ShapeMode;
pub use snapshot::FontSnapshot;
pub use source::FontSource;
