//! Grid evaluation engine API.
//!
//! This module provides the core computation engine for the grid:
//!
//! - [`Coord`], [`GridBounds`] - Coordinate model and bounds checks
//! - [`AxisSlice`], [`RangeRef`] - Slice-based range addressing
//! - [`Cell`], [`Value`], [`CellError`] - Cell storage and result types
//! - [`EvalContext`] - Shared handles between document and interpreter
//! - [`preprocess`] - Grid-index rewriting for Rhai evaluation
//! - [`build_scope`] - Per-evaluation scope with magics and bindings
//! - [`create_engine`] / [`eval_cell`] - Engine setup and pull evaluation
//! - [`format_value`] - Display formatting

mod cell;
mod coord;
mod eval;
mod format;
mod preprocess;
mod range;
mod scope;

pub use cell::{
    Bindings, Cell, CellError, EvalContext, EvalStack, Grid, SharedBounds, Value, ValueCache,
};
pub use coord::{Coord, GridAxis, GridBounds};
pub use eval::{create_engine, eval_cell};
pub use format::{format_number, format_value};
pub use preprocess::{absolute_ref, preprocess, relative_ref};
pub use range::{AxisSlice, AxisSpec, RangeRef, ResolvedRange};
pub use scope::{build_scope, is_reserved_name, GRID_NAME, MAGIC_NAMES};

pub use rhai::{Dynamic, Engine};
