//! Grid-index preprocessing and reference text helpers.
//!
//! Before a cell expression reaches the interpreter, grid indexes are
//! rewritten into builtin calls:
//!
//! - `S[r, c, t]` with three scalar axes becomes `CELL(r, c, t)`
//! - any axis written as a slice (`start:stop`, `start:stop:step`, `:`)
//!   turns the index into `CELLS(..)` with slice axes packed as
//!   `SLICE(start, stop, step)` and omitted parts as `()`
//!
//! Axis expressions are arbitrary (they may reference the magics or contain
//! nested `S[...]` indexes, which are rewritten recursively), so the scan is
//! bracket-aware rather than regex-based. Text inside string literals is
//! left untouched.

use super::coord::Coord;
use super::scope::GRID_NAME;

/// Rewrite every grid index in an expression into builtin calls.
/// Malformed indexes (wrong axis count, empty axis) are left unchanged and
/// surface later as interpreter faults.
pub fn preprocess(expr: &str) -> String {
    let chars: Vec<char> = expr.chars().collect();
    let mut out = String::with_capacity(expr.len());
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];

        if c == '"' {
            let end = skip_string(&chars, i);
            out.extend(&chars[i..end]);
            i = end;
            continue;
        }

        if starts_grid_index(&chars, i) {
            let open = i + GRID_NAME.chars().count();
            if let Some(close) = matching_bracket(&chars, open) {
                let inner: String = chars[open + 1..close].iter().collect();
                if let Some(rewritten) = rewrite_index(&inner) {
                    out.push_str(&rewritten);
                    i = close + 1;
                    continue;
                }
            }
        }

        out.push(c);
        i += 1;
    }

    out
}

/// True when position `i` begins a `S[` grid index that is not part of a
/// longer identifier.
fn starts_grid_index(chars: &[char], i: usize) -> bool {
    let grid: Vec<char> = GRID_NAME.chars().collect();
    if chars.len() < i + grid.len() + 1 {
        return false;
    }
    if chars[i..i + grid.len()] != grid[..] {
        return false;
    }
    if chars[i + grid.len()] != '[' {
        return false;
    }
    if i > 0 {
        let prev = chars[i - 1];
        if prev.is_alphanumeric() || prev == '_' {
            return false;
        }
    }
    true
}

/// Advance past a double-quoted string literal starting at `start`.
/// Returns the index one past the closing quote (or the end of input).
fn skip_string(chars: &[char], start: usize) -> usize {
    let mut i = start + 1;
    while i < chars.len() {
        match chars[i] {
            '\\' => i += 2,
            '"' => return i + 1,
            _ => i += 1,
        }
    }
    chars.len()
}

/// Find the `]` matching the `[` at `open`, skipping nested brackets and
/// string literals.
fn matching_bracket(chars: &[char], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut i = open;
    while i < chars.len() {
        match chars[i] {
            '"' => {
                i = skip_string(chars, i);
                continue;
            }
            '[' | '(' | '{' => depth += 1,
            ']' | ')' | '}' => {
                depth -= 1;
                if depth == 0 {
                    return (chars[i] == ']').then_some(i);
                }
            }
            _ => {}
        }
        i += 1;
    }
    None
}

/// Split on a separator at bracket depth zero, outside string literals.
fn split_top_level(text: &str, sep: char) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        match c {
            '"' => {
                let end = skip_string(&chars, i);
                current.extend(&chars[i..end]);
                i = end;
                continue;
            }
            '[' | '(' | '{' => depth += 1,
            ']' | ')' | '}' => depth = depth.saturating_sub(1),
            _ => {}
        }
        if c == sep && depth == 0 {
            parts.push(current.clone());
            current.clear();
        } else {
            current.push(c);
        }
        i += 1;
    }
    parts.push(current);
    parts
}

enum Axis {
    Scalar(String),
    Slice(Vec<String>),
}

/// Rewrite the inside of one `S[...]` index, or `None` if it is not a
/// well-formed three-axis index.
fn rewrite_index(inner: &str) -> Option<String> {
    let raw_axes = split_top_level(inner, ',');
    if raw_axes.len() != 3 {
        return None;
    }

    let mut axes = Vec::with_capacity(3);
    for raw in &raw_axes {
        let parts = split_top_level(raw, ':');
        match parts.len() {
            1 => {
                let scalar = preprocess(parts[0].trim());
                if scalar.is_empty() {
                    return None;
                }
                axes.push(Axis::Scalar(scalar));
            }
            2 | 3 => {
                let mut pieces: Vec<String> = parts
                    .iter()
                    .map(|p| {
                        let trimmed = p.trim();
                        if trimmed.is_empty() {
                            "()".to_string()
                        } else {
                            preprocess(trimmed)
                        }
                    })
                    .collect();
                if pieces.len() == 2 {
                    pieces.push("()".to_string());
                }
                axes.push(Axis::Slice(pieces));
            }
            _ => return None,
        }
    }

    let all_scalar = axes.iter().all(|a| matches!(a, Axis::Scalar(_)));
    let args: Vec<String> = axes
        .into_iter()
        .map(|axis| match axis {
            Axis::Scalar(s) => s,
            Axis::Slice(pieces) => format!("SLICE({})", pieces.join(", ")),
        })
        .collect();

    let callee = if all_scalar { "CELL" } else { "CELLS" };
    Some(format!("{}({})", callee, args.join(", ")))
}

/// Absolute reference text for a coordinate: `S[r, c, t]`.
pub fn absolute_ref(coord: Coord) -> String {
    format!("S[{}, {}, {}]", coord.row, coord.col, coord.table)
}

/// Relative reference text from the cell at `anchor` to `target`, written
/// in terms of the position magics so it survives copy/paste at an offset.
pub fn relative_ref(anchor: Coord, target: Coord) -> String {
    format!(
        "S[{}, {}, {}]",
        axis_term("X", anchor.row, target.row),
        axis_term("Y", anchor.col, target.col),
        axis_term("Z", anchor.table, target.table),
    )
}

fn axis_term(magic: &str, anchor: usize, target: usize) -> String {
    let delta = target as i64 - anchor as i64;
    if delta == 0 {
        magic.to_string()
    } else if delta > 0 {
        format!("{} + {}", magic, delta)
    } else {
        format!("{} - {}", magic, -delta)
    }
}

#[cfg(test)]
mod tests {
    use super::{absolute_ref, preprocess, relative_ref};
    use crate::engine::Coord;

    #[test]
    fn test_plain_expressions_pass_through() {
        assert_eq!(preprocess("1 + 5*2"), "1 + 5*2");
    }

    #[test]
    fn test_scalar_index_rewrites_to_cell() {
        assert_eq!(preprocess("S[0, 0, 0]"), "CELL(0, 0, 0)");
        assert_eq!(preprocess("S[X-1, Y, Z] + 1"), "CELL(X-1, Y, Z) + 1");
    }

    #[test]
    fn test_slice_axis_rewrites_to_cells() {
        assert_eq!(
            preprocess("SUM(S[0:5, 2, 0])"),
            "SUM(CELLS(SLICE(0, 5, ()), 2, 0))"
        );
        assert_eq!(
            preprocess("S[:, 0, 0]"),
            "CELLS(SLICE((), (), ()), 0, 0)"
        );
        assert_eq!(
            preprocess("S[0:10:2, 0, 0]"),
            "CELLS(SLICE(0, 10, 2), 0, 0)"
        );
    }

    #[test]
    fn test_nested_index_rewrites_recursively() {
        assert_eq!(
            preprocess("S[S[0, 0, 0], 0, 0]"),
            "CELL(CELL(0, 0, 0), 0, 0)"
        );
    }

    #[test]
    fn test_string_literals_are_untouched() {
        assert_eq!(preprocess(r#""S[0, 0, 0]""#), r#""S[0, 0, 0]""#);
        assert_eq!(
            preprocess(r#"S[0, 0, 0] + "S[1, 1, 1]""#),
            r#"CELL(0, 0, 0) + "S[1, 1, 1]""#
        );
    }

    #[test]
    fn test_longer_identifiers_are_not_grid_indexes() {
        assert_eq!(preprocess("XS[0, 0, 0]"), "XS[0, 0, 0]");
        assert_eq!(preprocess("vals[0]"), "vals[0]");
    }

    #[test]
    fn test_malformed_indexes_are_left_unchanged() {
        assert_eq!(preprocess("S[0, 0]"), "S[0, 0]");
        assert_eq!(preprocess("S[, 0, 0]"), "S[, 0, 0]");
        assert_eq!(preprocess("S[0, 0, 0"), "S[0, 0, 0");
    }

    #[test]
    fn test_array_literal_axes_survive() {
        // Commas inside nested brackets must not split the axis list.
        assert_eq!(
            preprocess("S[len([1, 2]), 0, 0]"),
            "CELL(len([1, 2]), 0, 0)"
        );
    }

    #[test]
    fn test_reference_builders() {
        assert_eq!(absolute_ref(Coord::new(2, 3, 0)), "S[2, 3, 0]");
        assert_eq!(
            relative_ref(Coord::new(2, 1, 2), Coord::new(1, 1, 2)),
            "S[X - 1, Y, Z]"
        );
        assert_eq!(
            relative_ref(Coord::new(0, 0, 0), Coord::new(2, 3, 1)),
            "S[X + 2, Y + 3, Z + 1]"
        );
    }
}
