//! Error types shared by every level.

use std::io;

/// Top-level error for level setup and persistence.
#[derive(thiserror::Error, Debug)]
pub enum GameError {
    /// A requested feature variant (e.g. a background theme) does not exist.
    #[error("Feature {key} has not been implemented yet.")]
    Unimplemented { key: String },

    #[error("Level data error: {0}")]
    Level(#[from] LevelError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Config error: {0}")]
    Config(String),
}

impl GameError {
    pub fn unimplemented(key: impl Into<String>) -> Self {
        GameError::Unimplemented { key: key.into() }
    }
}

/// Malformed level data.
#[derive(thiserror::Error, Debug)]
pub enum LevelError {
    #[error("Level JSON could not be parsed: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Level grid is empty")]
    EmptyGrid,

    #[error("Row {row} has width {found}, expected {expected}")]
    RaggedRow {
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("Unknown tile glyph {glyph:?} at ({x}, {y})")]
    UnknownGlyph { glyph: char, x: usize, y: usize },

    #[error("Level has no {0} object")]
    MissingObject(&'static str),
}

/// High-score persistence failures.
#[derive(thiserror::Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}
