//! Expanding class based GPOS data into explicit per glyph rows.

mod kern;
mod marks;

pub use kern::{flatten_kerning, KernRow};
pub use marks::{flatten_marks, MarkRow, MarkTables};
