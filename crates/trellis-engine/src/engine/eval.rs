//! Engine construction and pull-based cell evaluation.
//!
//! Evaluation is memoized and cycle-safe: a cached value returns
//! immediately, a coordinate re-entered while still on the evaluation stack
//! fails with a circular-reference error, and every other outcome
//! (including faults) is cached until the cell's own text changes. Errors
//! never unwind past [`eval_cell`]; they come back as [`Value::Error`].

use rhai::{Dynamic, Engine, EvalAltResult};
use tracing::{debug, trace};

use super::cell::{Cell, CellError, EvalContext, EvalStack, Value};
use super::coord::Coord;
use super::preprocess::preprocess;
use super::scope::{build_scope, is_reserved_name};

/// Create a Rhai engine with the grid builtins registered over the shared
/// evaluation handles.
pub fn create_engine(ctx: EvalContext) -> Engine {
    let mut engine = Engine::new();
    crate::builtins::register_builtins(&mut engine, ctx);
    engine
}

/// Evaluate one coordinate, pulling referenced cells recursively.
///
/// Empty coordinates evaluate to [`Value::Empty`] without taking a cache
/// slot, so sweeping reads over blank regions stay cheap.
pub fn eval_cell(engine: &Engine, ctx: &EvalContext, coord: Coord) -> Value {
    if let Some(hit) = ctx.cache.get(&coord) {
        trace!(coord = %coord, "cache hit");
        return hit.clone();
    }

    let Some(cell) = ctx.grid.get(&coord).map(|entry| entry.clone()) else {
        return Value::Empty;
    };

    // Re-entering a coordinate already on the call chain is a cycle. The
    // detection point itself caches nothing; each frame unwinding from it
    // caches its own error below, so a later edit re-evaluates cleanly.
    let _guard = match StackGuard::push(&ctx.stack, coord) {
        Some(guard) => guard,
        None => return Value::Error(CellError::CircularReference { coord }),
    };

    let value = run_cell(engine, ctx, coord, &cell);
    if let Value::Error(err) = &value {
        debug!(coord = %coord, error = %err, "cell evaluation failed");
    }
    ctx.cache.insert(coord, value.clone());
    value
}

fn run_cell(engine: &Engine, ctx: &EvalContext, coord: Coord, cell: &Cell) -> Value {
    let processed = preprocess(cell.body());
    let mut scope = build_scope(coord, &ctx.bindings);
    match engine.eval_with_scope::<Dynamic>(&mut scope, &processed) {
        Ok(result) => {
            let value = Value::from_dynamic(&result);
            if let Some(name) = &cell.binding {
                ctx.bindings.insert(name.clone(), value.clone());
            }
            value
        }
        Err(err) => Value::Error(classify_error(&err)),
    }
}

/// Scoped stack frame: pushed on entry, popped on every exit path.
struct StackGuard {
    stack: EvalStack,
}

impl StackGuard {
    /// Push `coord`, or `None` if it is already being evaluated.
    fn push(stack: &EvalStack, coord: Coord) -> Option<StackGuard> {
        let mut frames = stack.lock().unwrap();
        if frames.contains(&coord) {
            return None;
        }
        frames.push(coord);
        Some(StackGuard {
            stack: stack.clone(),
        })
    }
}

impl Drop for StackGuard {
    fn drop(&mut self) {
        self.stack.lock().unwrap().pop();
    }
}

/// Map an interpreter failure onto a cell error. Errors raised by the grid
/// builtins carry a [`CellError`] payload, which is propagated unchanged so
/// a chain of references reports the original cause.
pub(crate) fn classify_error(err: &EvalAltResult) -> CellError {
    match err {
        EvalAltResult::ErrorRuntime(payload, _) => payload
            .clone()
            .try_cast::<CellError>()
            .unwrap_or_else(|| CellError::Fault {
                message: err.to_string(),
            }),
        EvalAltResult::ErrorVariableNotFound(name, _) if !is_reserved_name(name) => {
            CellError::UndefinedBinding { name: name.clone() }
        }
        EvalAltResult::ErrorInFunctionCall(_, _, inner, _) => classify_error(inner),
        _ => CellError::Fault {
            message: err.to_string(),
        },
    }
}
