//! Parser for the .trl sheet format.
//!
//! The format persists exactly what is needed to re-derive a sheet: the
//! grid bounds and the (coordinate, raw expression) pairs. Cached values
//! are never stored.
//!
//! ```text
//! # Trellis sheet
//! [shape]
//! 1000<TAB>100<TAB>3
//! [grid]
//! 0<TAB>0<TAB>0<TAB>1 + 5*2
//! ```

use std::fs;
use std::path::Path;

use crate::error::{Result, TrellisError};
use trellis_engine::engine::{Coord, GridBounds};

#[derive(PartialEq)]
enum Section {
    Preamble,
    Shape,
    Grid,
}

/// Parse a .trl file into bounds plus cell texts.
pub fn parse_sheet(path: &Path) -> Result<(GridBounds, Vec<(Coord, String)>)> {
    let content = fs::read_to_string(path)?;
    parse_sheet_content(&content)
}

/// Parse .trl content from a string.
pub fn parse_sheet_content(content: &str) -> Result<(GridBounds, Vec<(Coord, String)>)> {
    let mut section = Section::Preamble;
    let mut bounds: Option<GridBounds> = None;
    let mut cells = Vec::new();

    for (line_idx, line) in content.lines().enumerate() {
        let line_num = line_idx + 1;

        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        match line {
            "[shape]" => {
                section = Section::Shape;
                continue;
            }
            "[grid]" => {
                if bounds.is_none() {
                    return Err(parse_err(line_num, "[grid] section before [shape]"));
                }
                section = Section::Grid;
                continue;
            }
            _ => {}
        }

        match section {
            Section::Preamble => {
                return Err(parse_err(line_num, "Expected [shape] section"));
            }
            Section::Shape => {
                if bounds.is_some() {
                    return Err(parse_err(line_num, "Duplicate shape line"));
                }
                let fields: Vec<&str> = line.split('\t').collect();
                if fields.len() != 3 {
                    return Err(parse_err(line_num, "Shape must be rows<TAB>cols<TAB>tables"));
                }
                let parse = |s: &str, label: &str| {
                    s.trim().parse::<usize>().map_err(|_| {
                        parse_err(line_num, &format!("Invalid {}: {}", label, s))
                    })
                };
                let shape = GridBounds::new(
                    parse(fields[0], "row count")?,
                    parse(fields[1], "column count")?,
                    parse(fields[2], "table count")?,
                );
                if shape.rows == 0 || shape.cols == 0 || shape.tables == 0 {
                    return Err(parse_err(line_num, "Shape axes must be at least 1"));
                }
                bounds = Some(shape);
            }
            Section::Grid => {
                let shape = bounds.expect("grid section requires shape");
                let fields: Vec<&str> = line.splitn(4, '\t').collect();
                if fields.len() != 4 {
                    return Err(parse_err(
                        line_num,
                        "Cell must be row<TAB>col<TAB>table<TAB>expression",
                    ));
                }
                let parse = |s: &str, label: &str| {
                    s.parse::<usize>().map_err(|_| {
                        parse_err(line_num, &format!("Invalid {} index: {}", label, s))
                    })
                };
                let coord = Coord::new(
                    parse(fields[0], "row")?,
                    parse(fields[1], "column")?,
                    parse(fields[2], "table")?,
                );
                if !shape.contains(&coord) {
                    return Err(parse_err(
                        line_num,
                        &format!("Cell {} outside shape {}", coord, shape),
                    ));
                }
                let text = unescape_text(fields[3]);
                if !text.trim().is_empty() {
                    cells.push((coord, text));
                }
            }
        }
    }

    let bounds = bounds.ok_or_else(|| parse_err(content.lines().count(), "Missing [shape] section"))?;
    Ok((bounds, cells))
}

fn parse_err(line: usize, message: &str) -> TrellisError {
    TrellisError::Parse {
        line,
        message: message.to_string(),
    }
}

/// Reverse the writer's escaping: `\n`, `\t`, `\\`.
pub(crate) fn unescape_text(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars();
    while let Some(ch) = chars.next() {
        if ch == '\\' {
            match chars.next() {
                Some('n') => out.push('\n'),
                Some('t') => out.push('\t'),
                Some('\\') => out.push('\\'),
                Some(other) => {
                    out.push('\\');
                    out.push(other);
                }
                None => out.push('\\'),
            }
        } else {
            out.push(ch);
        }
    }
    out
}
