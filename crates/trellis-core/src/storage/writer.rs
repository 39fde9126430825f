//! Writer for the .trl sheet format.

use std::fs;
use std::path::Path;

use crate::error::Result;
use trellis_engine::engine::{Grid, GridBounds};

/// Write a grid to a .trl file.
pub fn write_sheet(path: &Path, grid: &Grid, bounds: GridBounds) -> Result<()> {
    let content = write_sheet_content(grid, bounds);
    fs::write(path, content)?;
    Ok(())
}

/// Write a grid to a .trl format string. Cells are sorted by table, then
/// row, then column, for stable diff-friendly output.
pub fn write_sheet_content(grid: &Grid, bounds: GridBounds) -> String {
    let mut lines = vec![
        "# Trellis sheet".to_string(),
        "[shape]".to_string(),
        format!("{}\t{}\t{}", bounds.rows, bounds.cols, bounds.tables),
        "[grid]".to_string(),
    ];

    let mut cells: Vec<_> = grid
        .iter()
        .map(|entry| (*entry.key(), entry.value().text.clone()))
        .collect();
    cells.sort_by_key(|(coord, _)| (coord.table, coord.row, coord.col));

    for (coord, text) in cells {
        if text.trim().is_empty() {
            continue;
        }
        lines.push(format!(
            "{}\t{}\t{}\t{}",
            coord.row,
            coord.col,
            coord.table,
            escape_text(&text)
        ));
    }

    lines.join("\n") + "\n"
}

fn escape_text(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            _ => out.push(ch),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::write_sheet_content;
    use crate::storage::parser::parse_sheet_content;
    use dashmap::DashMap;
    use std::sync::Arc;
    use trellis_engine::engine::{Cell, Coord, Grid, GridBounds};

    fn grid_with(cells: &[(Coord, &str)]) -> Grid {
        let grid: Grid = Arc::new(DashMap::new());
        for (coord, text) in cells {
            grid.insert(*coord, Cell::from_text(text).unwrap());
        }
        grid
    }

    #[test]
    fn test_output_is_sorted_table_major() {
        let grid = grid_with(&[
            (Coord::new(1, 0, 1), "b"),
            (Coord::new(0, 2, 0), "a"),
            (Coord::new(0, 1, 0), "c"),
        ]);
        let content = write_sheet_content(&grid, GridBounds::new(10, 10, 2));
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines[4], "0\t1\t0\tc");
        assert_eq!(lines[5], "0\t2\t0\ta");
        assert_eq!(lines[6], "1\t0\t1\tb");
    }

    #[test]
    fn test_escapes_survive_a_parse() {
        let grid = grid_with(&[(Coord::new(0, 0, 0), "\"tab\there\" + \"line\nbreak\"")]);
        let bounds = GridBounds::new(5, 5, 1);
        let content = write_sheet_content(&grid, bounds);
        let (parsed_bounds, cells) = parse_sheet_content(&content).unwrap();
        assert_eq!(parsed_bounds, bounds);
        assert_eq!(cells[0].1, "\"tab\there\" + \"line\nbreak\"");
    }
}
