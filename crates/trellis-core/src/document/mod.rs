//! Document model: grid state, mutation operations, undo/redo, and file I/O.

mod io;
mod ops;
mod state;

pub use state::{CellChange, Document, Transaction, Viewport};
