//! Errors raised while loading or comparing fonts.

use std::path::PathBuf;

use skrifa::{
    outline::DrawError,
    raw::{types::Tag, ReadError},
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DiffError {
    #[error("Unable to read '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed font data: {0}")]
    Read(#[from] ReadError),

    #[error("Unable to draw outline: {0}")]
    Draw(#[from] DrawError),

    #[error("No font has been loaded")]
    NotLoaded,

    #[error("Font tables have not been computed")]
    NotComputed,

    #[error("Font is not variable")]
    NotVariable,

    #[error("Font has no axis '{0}'")]
    UnknownAxis(Tag),

    #[error("Instance '{name}' not found. Available [{}]", available.join(", "))]
    InstanceNotFound { name: String, available: Vec<String> },

    #[error("Unknown diff category '{0}'")]
    UnknownCategory(String),

    #[error("Invalid axis setting '{0}', expected tag=value")]
    InvalidAxisSetting(String),

    #[error("Font has no shaper or rasterizer attached")]
    NoRenderer,

    #[error("Rendering failed: {0}")]
    Render(String),
}
