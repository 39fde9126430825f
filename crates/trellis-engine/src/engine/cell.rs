//! Cell storage types, evaluated values, and the shared evaluation handles.
//!
//! The grid is a sparse `DashMap` behind an `Arc`, so the document and the
//! interpreter builtins observe the same cells through cheap clones. The
//! value cache is a second map keyed by coordinate; presence of a key is the
//! cached-value validity flag.

use dashmap::DashMap;
use regex::Regex;
use rhai::Dynamic;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, Mutex, OnceLock, RwLock};

use super::coord::{Coord, GridAxis, GridBounds};
use super::scope::is_reserved_name;

/// Shared sparse cell store (DashMap is internally Arc-based, clones are cheap).
pub type Grid = Arc<DashMap<Coord, Cell>>;
/// Cached evaluation results. A present key means the cache is valid.
pub type ValueCache = Arc<DashMap<Coord, Value>>;
/// Grid-wide named bindings produced by `name = expr` cells. Last writer wins.
pub type Bindings = Arc<DashMap<String, Value>>;
/// Coordinates currently being evaluated on the active call chain.
pub type EvalStack = Arc<Mutex<Vec<Coord>>>;
/// Mutable grid bounds, shared with the interpreter builtins.
pub type SharedBounds = Arc<RwLock<GridBounds>>;

/// One stored cell: the raw expression text plus the binding name extracted
/// from a `name = expr` form. Cached values live in the [`ValueCache`], not
/// here, so snapshotting a cell for undo never captures derived state.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Cell {
    pub text: String,
    pub binding: Option<String>,
}

fn binding_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\s*([A-Za-z_][A-Za-z0-9_]*)\s*=(.*)$")
            .expect("binding name regex must compile")
    })
}

impl Cell {
    /// Build a cell from raw input text. Returns `None` for blank input,
    /// which callers treat as cell deletion.
    pub fn from_text(text: &str) -> Option<Cell> {
        if text.trim().is_empty() {
            return None;
        }
        Some(Cell {
            text: text.to_string(),
            binding: extract_binding(text),
        })
    }

    /// The expression to hand to the interpreter: raw text with any leading
    /// `name =` stripped.
    pub fn body(&self) -> &str {
        match &self.binding {
            Some(_) => {
                let eq = self.text.find('=').unwrap_or(0);
                &self.text[eq + 1..]
            }
            None => &self.text,
        }
    }
}

/// Extract the binding name from a `name = expr` expression.
///
/// `==` comparisons, blank right-hand sides, and the reserved scope names
/// are not binding forms.
fn extract_binding(text: &str) -> Option<String> {
    let caps = binding_re().captures(text)?;
    let rest = caps.get(2).map_or("", |m| m.as_str());
    if rest.starts_with('=') || rest.trim().is_empty() {
        return None;
    }
    let name = &caps[1];
    if is_reserved_name(name) {
        return None;
    }
    Some(name.to_string())
}

/// An evaluated cell result.
///
/// Errors are values here, not `Err` returns: a failing cell caches its
/// error and consumers render a marker instead of unwinding.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Empty,
    Int(i64),
    Num(f64),
    Bool(bool),
    Text(String),
    Seq(Vec<Value>),
    Error(CellError),
}

impl Value {
    pub fn is_error(&self) -> bool {
        matches!(self, Value::Error(_))
    }

    /// Convert an interpreter result into a cacheable value.
    pub fn from_dynamic(value: &Dynamic) -> Value {
        if value.is_unit() {
            return Value::Empty;
        }
        if let Ok(n) = value.as_int() {
            return Value::Int(n);
        }
        if let Ok(n) = value.as_float() {
            return Value::Num(n);
        }
        if let Ok(b) = value.as_bool() {
            return Value::Bool(b);
        }
        if value.is_string() {
            return Value::Text(value.clone().into_string().unwrap_or_default());
        }
        if value.is_array() {
            let items = value.clone().into_array().unwrap_or_default();
            return Value::Seq(items.iter().map(Value::from_dynamic).collect());
        }
        if let Some(err) = value.clone().try_cast::<CellError>() {
            return Value::Error(err);
        }
        // Maps, chars, custom types: keep their display form.
        Value::Text(value.to_string())
    }

    /// Convert back into an interpreter value, e.g. when a referencing cell
    /// consumes a cached result.
    pub fn to_dynamic(&self) -> Dynamic {
        match self {
            Value::Empty => Dynamic::UNIT,
            Value::Int(n) => (*n).into(),
            Value::Num(n) => (*n).into(),
            Value::Bool(b) => (*b).into(),
            Value::Text(s) => s.clone().into(),
            Value::Seq(items) => {
                let array: rhai::Array = items.iter().map(Value::to_dynamic).collect();
                Dynamic::from(array)
            }
            Value::Error(err) => Dynamic::from(err.clone()),
        }
    }
}

/// Why a cell failed to evaluate. Cached like any other value until the
/// cell's own text changes.
#[derive(Clone, Debug, PartialEq)]
pub enum CellError {
    OutOfBounds {
        axis: GridAxis,
        index: i64,
        bounds: GridBounds,
    },
    CircularReference {
        coord: Coord,
    },
    UndefinedBinding {
        name: String,
    },
    Fault {
        message: String,
    },
}

impl CellError {
    /// Short marker rendered in the grid; the full cause is the `Display`
    /// form, available on inspection.
    pub fn marker(&self) -> &'static str {
        match self {
            CellError::OutOfBounds { .. } => "#REF!",
            CellError::CircularReference { .. } => "#CYCLE!",
            CellError::UndefinedBinding { .. } => "#NAME!",
            CellError::Fault { .. } => "#ERR!",
        }
    }
}

impl fmt::Display for CellError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellError::OutOfBounds {
                axis,
                index,
                bounds,
            } => write!(f, "{} index {} outside grid bounds {}", axis, index, bounds),
            CellError::CircularReference { coord } => {
                write!(f, "circular reference through {}", coord)
            }
            CellError::UndefinedBinding { name } => {
                write!(f, "name '{}' is not defined by any cell", name)
            }
            CellError::Fault { message } => write!(f, "{}", message),
        }
    }
}

impl std::error::Error for CellError {}

/// The shared handles threaded through every interpreter builtin.
///
/// All members are Arc-cloned; the document and the engine closures observe
/// the same maps. Evaluation stays on one logical thread: the `Mutex` and
/// `RwLock` exist to satisfy rhai's `sync` bounds, not to allow concurrent
/// evaluation.
#[derive(Clone)]
pub struct EvalContext {
    pub grid: Grid,
    pub cache: ValueCache,
    pub bindings: Bindings,
    pub stack: EvalStack,
    pub bounds: SharedBounds,
}

impl EvalContext {
    pub fn new(bounds: GridBounds) -> EvalContext {
        EvalContext {
            grid: Arc::new(DashMap::new()),
            cache: Arc::new(DashMap::new()),
            bindings: Arc::new(DashMap::new()),
            stack: Arc::new(Mutex::new(Vec::new())),
            bounds: Arc::new(RwLock::new(bounds)),
        }
    }

    pub fn bounds(&self) -> GridBounds {
        *self.bounds.read().unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::{Cell, Value};
    use rhai::Dynamic;

    #[test]
    fn test_binding_extraction() {
        let cell = Cell::from_text("a = 15").unwrap();
        assert_eq!(cell.binding.as_deref(), Some("a"));
        assert_eq!(cell.body().trim(), "15");
    }

    #[test]
    fn test_comparison_is_not_a_binding() {
        let cell = Cell::from_text("a == 15").unwrap();
        assert_eq!(cell.binding, None);
        assert_eq!(cell.body(), "a == 15");
    }

    #[test]
    fn test_reserved_names_are_not_bindings() {
        for text in ["X = 5", "Y = 5", "Z = 5", "S = 5"] {
            let cell = Cell::from_text(text).unwrap();
            assert_eq!(cell.binding, None, "{} must not bind", text);
        }
    }

    #[test]
    fn test_blank_rhs_is_not_a_binding() {
        let cell = Cell::from_text("a =   ").unwrap();
        assert_eq!(cell.binding, None);
    }

    #[test]
    fn test_blank_text_is_no_cell() {
        assert!(Cell::from_text("").is_none());
        assert!(Cell::from_text("   ").is_none());
    }

    #[test]
    fn test_value_round_trips_through_dynamic() {
        let values = [
            Value::Empty,
            Value::Int(11),
            Value::Num(2.5),
            Value::Bool(true),
            Value::Text("hi".to_string()),
            Value::Seq(vec![Value::Int(1), Value::Seq(vec![Value::Int(2)])]),
        ];
        for value in values {
            let round = Value::from_dynamic(&value.to_dynamic());
            assert_eq!(round, value);
        }
    }

    #[test]
    fn test_unknown_dynamic_becomes_text() {
        let value = Value::from_dynamic(&Dynamic::from('x'));
        assert_eq!(value, Value::Text("x".to_string()));
    }
}
