//! trellis-core - UI-agnostic document model + storage.

pub mod config;
pub mod document;
pub mod error;
pub mod storage;

pub use config::Settings;
pub use document::{CellChange, Document, Transaction, Viewport};
pub use error::{Result, TrellisError};

pub use trellis_engine::engine::{
    Cell, CellError, Coord, GridBounds, Value, absolute_ref, format_value, relative_ref,
};
