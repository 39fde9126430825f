use tracing::debug;

use super::state::{CellChange, Document, Transaction, Viewport};
use crate::error::{Result, TrellisError};
use trellis_engine::engine::{Cell, Coord, GridBounds, Value, eval_cell, format_value};

/// Which side of a transaction's snapshots to apply.
#[derive(Copy, Clone)]
enum Replay {
    Undo,
    Redo,
}

impl Document {
    // ---- reads -----------------------------------------------------------

    /// Raw expression text at a coordinate (empty if absent).
    pub fn expression(&self, coord: Coord) -> String {
        self.ctx
            .grid
            .get(&coord)
            .map(|entry| entry.text.clone())
            .unwrap_or_default()
    }

    /// Cached value, present only while the cache entry is valid.
    pub fn cached_value(&self, coord: Coord) -> Option<Value> {
        self.ctx.cache.get(&coord).map(|value| value.clone())
    }

    /// Evaluate a coordinate, pulling referenced cells as needed.
    pub fn evaluate(&self, coord: Coord) -> Value {
        eval_cell(&self.engine, &self.ctx, coord)
    }

    /// Display text for a coordinate: formatted value or an error marker.
    pub fn display(&self, coord: Coord) -> String {
        format_value(&self.evaluate(coord))
    }

    // ---- mutations -------------------------------------------------------

    /// Store expression text at a coordinate. Blank text deletes the cell.
    /// The edited cell's cache entry is cleared, along with every cached
    /// value in the current viewport; off-screen caches are left alone.
    pub fn set_expression(&mut self, coord: Coord, text: &str) -> Result<()> {
        let bounds = self.bounds();
        if !bounds.contains(&coord) {
            return Err(TrellisError::OutOfBounds { coord, bounds });
        }

        let after = Cell::from_text(text);
        let before = self.ctx.grid.get(&coord).map(|entry| entry.clone());
        if before == after {
            return Ok(());
        }

        self.record(Transaction::Edit(CellChange {
            coord,
            before,
            after: after.clone(),
        }));
        self.apply_cell_state(coord, after);
        self.invalidate_visible();
        self.modified = true;
        debug!(coord = %coord, "cell edited");
        Ok(())
    }

    /// Clear the specified cell.
    pub fn delete_cell(&mut self, coord: Coord) -> Result<()> {
        self.set_expression(coord, "")
    }

    /// Paste cell texts at row/col offsets from a base coordinate, as one
    /// transaction. Text is applied verbatim: references written against
    /// the position magics stay relative by re-binding at the target, and
    /// absolute indexes stay absolute.
    pub fn paste_cells(&mut self, base: Coord, cells: &[(usize, usize, String)]) -> Result<usize> {
        let bounds = self.bounds();

        // Validate every target before mutating anything.
        let mut prepared = Vec::with_capacity(cells.len());
        for (row_off, col_off, text) in cells {
            let coord = Coord::new(base.row + row_off, base.col + col_off, base.table);
            if !bounds.contains(&coord) {
                return Err(TrellisError::OutOfBounds { coord, bounds });
            }
            prepared.push((coord, Cell::from_text(text)));
        }
        if prepared.is_empty() {
            return Ok(0);
        }

        let mut changes = Vec::with_capacity(prepared.len());
        for (coord, after) in prepared {
            let before = self.ctx.grid.get(&coord).map(|entry| entry.clone());
            self.apply_cell_state(coord, after.clone());
            changes.push(CellChange {
                coord,
                before,
                after,
            });
        }

        let count = changes.len();
        self.record(Transaction::Paste(changes));
        self.invalidate_visible();
        self.modified = true;
        debug!(base = %base, count, "cells pasted");
        Ok(count)
    }

    /// Change the grid bounds. Cells falling outside the new bounds are
    /// dropped (and recorded for undo); no cells are ever created.
    pub fn resize(&mut self, new_bounds: GridBounds) -> Result<()> {
        if new_bounds.rows == 0 || new_bounds.cols == 0 || new_bounds.tables == 0 {
            return Err(TrellisError::InvalidBounds(new_bounds));
        }
        let before = self.bounds();
        if new_bounds == before {
            return Ok(());
        }

        let dropped: Vec<(Coord, Cell)> = self
            .ctx
            .grid
            .iter()
            .filter(|entry| !new_bounds.contains(entry.key()))
            .map(|entry| (*entry.key(), entry.value().clone()))
            .collect();
        for (coord, _) in &dropped {
            self.apply_cell_state(*coord, None);
        }
        *self.ctx.bounds.write().unwrap() = new_bounds;

        self.record(Transaction::Resize {
            before,
            after: new_bounds,
            dropped,
        });
        self.invalidate_visible();
        self.modified = true;
        debug!(bounds = %new_bounds, "grid resized");
        Ok(())
    }

    /// Declare the visible region. Entering a region re-evaluates it, which
    /// is what clears any staleness accumulated while it was off-screen.
    pub fn set_viewport(&mut self, viewport: Viewport) {
        if viewport != self.viewport {
            self.viewport = viewport;
            self.invalidate_visible();
        }
    }

    // ---- undo/redo -------------------------------------------------------

    /// Undo the last transaction.
    pub fn undo(&mut self) -> Result<()> {
        let txn = self.undo_stack.pop().ok_or(TrellisError::NothingToUndo)?;
        self.replay(&txn, Replay::Undo);
        self.redo_stack.push(txn);
        Ok(())
    }

    /// Reapply the last undone transaction.
    pub fn redo(&mut self) -> Result<()> {
        let txn = self.redo_stack.pop().ok_or(TrellisError::NothingToRedo)?;
        self.replay(&txn, Replay::Redo);
        self.undo_stack.push(txn);
        Ok(())
    }

    fn record(&mut self, txn: Transaction) {
        self.undo_stack.push(txn);
        self.redo_stack.clear();
        if self.undo_stack.len() > self.undo_limit {
            self.undo_stack.remove(0);
        }
    }

    fn replay(&mut self, txn: &Transaction, replay: Replay) {
        match txn {
            Transaction::Edit(change) => {
                let state = match replay {
                    Replay::Undo => change.before.clone(),
                    Replay::Redo => change.after.clone(),
                };
                self.apply_cell_state(change.coord, state);
            }
            Transaction::Paste(changes) => match replay {
                Replay::Undo => {
                    for change in changes.iter().rev() {
                        self.apply_cell_state(change.coord, change.before.clone());
                    }
                }
                Replay::Redo => {
                    for change in changes {
                        self.apply_cell_state(change.coord, change.after.clone());
                    }
                }
            },
            Transaction::Resize {
                before,
                after,
                dropped,
            } => match replay {
                Replay::Undo => {
                    *self.ctx.bounds.write().unwrap() = *before;
                    for (coord, cell) in dropped {
                        self.apply_cell_state(*coord, Some(cell.clone()));
                    }
                }
                Replay::Redo => {
                    for (coord, _) in dropped {
                        self.apply_cell_state(*coord, None);
                    }
                    *self.ctx.bounds.write().unwrap() = *after;
                }
            },
        }
        self.invalidate_visible();
        self.modified = true;
    }

    // ---- invalidation ----------------------------------------------------

    /// Write one cell state into the grid, keeping the cache entry and the
    /// binding namespace consistent with it.
    fn apply_cell_state(&mut self, coord: Coord, state: Option<Cell>) {
        let previous = match &state {
            Some(cell) => self.ctx.grid.insert(coord, cell.clone()),
            None => self.ctx.grid.remove(&coord).map(|(_, cell)| cell),
        };

        // A binding disappears when its defining cell stops defining it;
        // any other definer re-asserts its value on its next evaluation.
        if let Some(prev) = previous {
            if let Some(name) = prev.binding {
                let still_defined = state
                    .as_ref()
                    .is_some_and(|cell| cell.binding.as_deref() == Some(name.as_str()));
                if !still_defined {
                    self.ctx.bindings.remove(&name);
                }
            }
        }

        self.ctx.cache.remove(&coord);
    }

    /// Pull-based recompute: no dependency graph is kept, so every mutation
    /// drops the cached values of all visible cells and lets the next pull
    /// re-derive them.
    fn invalidate_visible(&self) {
        let viewport = self.viewport;
        self.ctx.cache.retain(|coord, _| !viewport.contains(coord));
    }
}
