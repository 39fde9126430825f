//! Evaluation scope construction.
//!
//! Every evaluation call gets a fresh scope: the three magic position values
//! bound to the coordinate of the cell currently being evaluated, plus every
//! named binding as a constant. Nested evaluation builds a new scope per
//! level, so the innermost cell always sees its own position.

use rhai::Scope;

use super::cell::Bindings;
use super::coord::Coord;

/// Name the preprocessor recognizes as the grid handle.
pub const GRID_NAME: &str = "S";
/// The position magics: row, column, table of the evaluating cell.
pub const MAGIC_NAMES: [&str; 3] = ["X", "Y", "Z"];

/// Names that cells cannot bind: the grid handle and the position magics.
pub fn is_reserved_name(name: &str) -> bool {
    name == GRID_NAME || MAGIC_NAMES.contains(&name)
}

/// Build the transient scope for evaluating the cell at `coord`.
/// Pure construction, no side effects.
pub fn build_scope(coord: Coord, bindings: &Bindings) -> Scope<'static> {
    let mut scope = Scope::new();
    scope.push_constant(MAGIC_NAMES[0], coord.row as i64);
    scope.push_constant(MAGIC_NAMES[1], coord.col as i64);
    scope.push_constant(MAGIC_NAMES[2], coord.table as i64);
    for entry in bindings.iter() {
        scope.push_constant_dynamic(entry.key().clone(), entry.value().to_dynamic());
    }
    scope
}
