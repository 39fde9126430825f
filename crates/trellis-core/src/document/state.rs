use rhai::Engine;
use std::path::PathBuf;

use crate::config::Settings;
use trellis_engine::engine::{Cell, Coord, EvalContext, GridBounds, create_engine};

/// The grid region a consumer currently displays. Mutations invalidate
/// every cached value inside this region; off-screen cells may serve stale
/// cached values until they become visible again.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Viewport {
    pub table: usize,
    pub top: usize,
    pub left: usize,
    pub rows: usize,
    pub cols: usize,
}

impl Viewport {
    /// A viewport covering one whole table.
    pub fn full_table(table: usize) -> Viewport {
        Viewport {
            table,
            top: 0,
            left: 0,
            rows: usize::MAX,
            cols: usize::MAX,
        }
    }

    pub fn contains(&self, coord: &Coord) -> bool {
        coord.table == self.table
            && coord.row >= self.top
            && coord.row - self.top < self.rows
            && coord.col >= self.left
            && coord.col - self.left < self.cols
    }
}

/// Before/after snapshot of one cell. `None` means the cell was absent.
#[derive(Clone, Debug, PartialEq)]
pub struct CellChange {
    pub coord: Coord,
    pub before: Option<Cell>,
    pub after: Option<Cell>,
}

/// One invertible unit of grid mutation. Each variant stores enough prior
/// state to restore it exactly; undo replays `before`, redo replays `after`.
#[derive(Clone, Debug, PartialEq)]
pub enum Transaction {
    /// A single-cell expression edit (or deletion).
    Edit(CellChange),
    /// A bulk paste; one undo reverts every pasted cell.
    Paste(Vec<CellChange>),
    /// A bounds change, with the cells it dropped.
    Resize {
        before: GridBounds,
        after: GridBounds,
        dropped: Vec<(Coord, Cell)>,
    },
}

/// UI-agnostic document state: the sparse grid plus the engine evaluating
/// it, with undo/redo and viewport-scoped invalidation on top.
pub struct Document {
    /// Shared evaluation handles (grid, cache, bindings, bounds). The
    /// engine's builtins hold Arc-clones of the same maps.
    pub ctx: EvalContext,
    /// Rhai engine with the grid builtins registered.
    pub engine: Engine,
    /// Current file path.
    pub file_path: Option<PathBuf>,
    /// Whether the grid has been modified since the last save.
    pub modified: bool,
    /// Region whose cached values are invalidated on every mutation.
    pub viewport: Viewport,
    pub(crate) undo_limit: usize,
    pub undo_stack: Vec<Transaction>,
    pub redo_stack: Vec<Transaction>,
}

impl Document {
    /// Create an empty document with default settings.
    ///
    /// This constructor is side-effect free: it does not touch the
    /// filesystem.
    pub fn new() -> Self {
        Self::with_settings(&Settings::default())
    }

    pub fn with_settings(settings: &Settings) -> Self {
        let ctx = EvalContext::new(settings.bounds());
        let engine = create_engine(ctx.clone());

        Document {
            ctx,
            engine,
            file_path: None,
            modified: false,
            viewport: Viewport::full_table(0),
            undo_limit: settings.undo_limit,
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
        }
    }

    /// Create a document and load a file if provided.
    pub fn with_file(path: Option<PathBuf>, settings: &Settings) -> crate::error::Result<Self> {
        let mut doc = Self::with_settings(settings);
        if let Some(ref p) = path {
            if p.exists() {
                doc.load_file(p)?;
            } else {
                doc.file_path = Some(p.clone());
                doc.modified = false;
            }
        }
        Ok(doc)
    }

    /// Current grid bounds.
    pub fn bounds(&self) -> GridBounds {
        self.ctx.bounds()
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}
