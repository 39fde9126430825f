use std::path::{Path, PathBuf};
use tracing::info;

use super::Document;
use crate::error::{Result, TrellisError};
use crate::storage::{parse_csv_content, parse_sheet, write_csv, write_sheet};
use trellis_engine::engine::{Cell, Coord};

impl Document {
    /// Save to the current file path. Returns the path saved to.
    pub fn save_file(&mut self) -> Result<PathBuf> {
        let Some(path) = self.file_path.clone() else {
            return Err(TrellisError::NoFilePath);
        };
        write_sheet(&path, &self.ctx.grid, self.bounds())?;
        self.modified = false;
        info!(path = %path.display(), "sheet saved");
        Ok(path)
    }

    /// Save to a new path and adopt it as the current file path.
    pub fn save_file_as(&mut self, path: &Path) -> Result<PathBuf> {
        self.file_path = Some(path.to_path_buf());
        self.save_file()
    }

    /// Load a sheet, replacing the current grid and bounds.
    ///
    /// The file is parsed completely before any state changes, so a parse
    /// error leaves the document untouched. Loading clears the caches, the
    /// binding namespace, and the undo history.
    pub fn load_file(&mut self, path: &Path) -> Result<()> {
        let (bounds, cells) = parse_sheet(path)?;

        self.ctx.grid.clear();
        self.ctx.cache.clear();
        self.ctx.bindings.clear();
        *self.ctx.bounds.write().unwrap() = bounds;

        let count = cells.len();
        for (coord, text) in cells {
            if let Some(cell) = Cell::from_text(&text) {
                self.ctx.grid.insert(coord, cell);
            }
        }

        self.file_path = Some(path.to_path_buf());
        self.modified = false;
        self.undo_stack.clear();
        self.redo_stack.clear();
        info!(path = %path.display(), cells = count, "sheet loaded");
        Ok(())
    }

    /// Export one table's evaluated values to CSV.
    pub fn export_csv(&self, path: &Path, table: usize) -> Result<()> {
        write_csv(path, self, table)
    }

    /// Import CSV fields as expression text starting at a base coordinate,
    /// as a single paste-granularity transaction. Returns the number of
    /// cells imported.
    pub fn import_csv(&mut self, path: &Path, base: Coord) -> Result<usize> {
        let content = std::fs::read_to_string(path)?;
        let mut cells = Vec::new();
        for (row_off, fields) in parse_csv_content(&content).into_iter().enumerate() {
            for (col_off, field) in fields.into_iter().enumerate() {
                if field.trim().is_empty() {
                    continue;
                }
                cells.push((row_off, col_off, field));
            }
        }
        self.paste_cells(base, &cells)
    }
}
