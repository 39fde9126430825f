//! Error types for Trellis core.

use thiserror::Error;

use trellis_engine::engine::{Coord, GridBounds};

/// Errors that can occur in the document model and storage layers.
///
/// Cell-level evaluation failures are not here: those are cached
/// [`trellis_engine::engine::CellError`] values, rendered as markers.
#[derive(Error, Debug)]
pub enum TrellisError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error at line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("Coordinate {coord} outside grid bounds {bounds}")]
    OutOfBounds { coord: Coord, bounds: GridBounds },

    #[error("Table {table} outside grid bounds {bounds}")]
    InvalidTable { table: usize, bounds: GridBounds },

    #[error("Grid bounds must be at least 1 along every axis, got {0}")]
    InvalidBounds(GridBounds),

    #[error("No file path set")]
    NoFilePath,

    #[error("Nothing to undo")]
    NothingToUndo,

    #[error("Nothing to redo")]
    NothingToRedo,

    #[error("Config error: {0}")]
    Config(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, TrellisError>;
