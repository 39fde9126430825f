//! CSV import/export for a single table.
//!
//! Export writes evaluated display values (never raw expressions), since
//! CSV consumers expect data. Import loads fields as expression text, so a
//! numeric field becomes a numeric cell and anything else evaluates or
//! shows an error marker like a typed-in cell would.

use std::fs;
use std::path::Path;

use crate::document::Document;
use crate::error::{Result, TrellisError};
use trellis_engine::engine::Coord;

/// Export one table's evaluated values to a CSV file.
pub fn write_csv(path: &Path, doc: &Document, table: usize) -> Result<()> {
    let content = csv_content(doc, table)?;
    fs::write(path, content)?;
    Ok(())
}

/// Build CSV content covering the table out to its last non-empty row and
/// column. An empty table produces empty output.
pub fn csv_content(doc: &Document, table: usize) -> Result<String> {
    let bounds = doc.bounds();
    if table >= bounds.tables {
        return Err(TrellisError::InvalidTable { table, bounds });
    }

    let mut extent: Option<(usize, usize)> = None;
    for entry in doc.ctx.grid.iter() {
        let coord = entry.key();
        if coord.table != table {
            continue;
        }
        let (rows, cols) = extent.unwrap_or((0, 0));
        extent = Some((rows.max(coord.row), cols.max(coord.col)));
    }
    let Some((max_row, max_col)) = extent else {
        return Ok(String::new());
    };

    let mut out = String::new();
    for row in 0..=max_row {
        let fields: Vec<String> = (0..=max_col)
            .map(|col| csv_field(&doc.display(Coord::new(row, col, table))))
            .collect();
        out.push_str(&fields.join(","));
        out.push('\n');
    }
    Ok(out)
}

/// Parse CSV content into per-row field lists.
pub fn parse_csv_content(content: &str) -> Vec<Vec<String>> {
    content.lines().map(parse_csv_line).collect()
}

/// Parse one CSV line, honoring quoted fields and doubled quotes.
pub fn parse_csv_line(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(ch) = chars.next() {
        if in_quotes {
            if ch == '"' {
                if chars.peek() == Some(&'"') {
                    current.push('"');
                    chars.next();
                } else {
                    in_quotes = false;
                }
            } else {
                current.push(ch);
            }
        } else {
            match ch {
                '"' => in_quotes = true,
                ',' => {
                    fields.push(current.clone());
                    current.clear();
                }
                _ => current.push(ch),
            }
        }
    }
    fields.push(current);
    fields
}

fn csv_field(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
