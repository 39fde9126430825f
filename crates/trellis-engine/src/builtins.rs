//! Built-in functions registered into the cell-expression interpreter.
//!
//! Conventions:
//! - Builtin names are ALL CAPS; the preprocessor rewrites grid indexes
//!   into `CELL`/`CELLS`/`SLICE` calls, the rest are callable directly.
//! - Grid access builtins capture Arc-clones of the shared evaluation
//!   handles, so they observe the same grid and caches as the document.
//! - Failures carry a [`CellError`] payload so the evaluator can classify
//!   them without string matching.

use chrono::Local;
use rand::Rng;
use rhai::{Array, Dynamic, Engine, EvalAltResult, NativeCallContext, Position};

use crate::engine::{
    AxisSlice, AxisSpec, CellError, Coord, EvalContext, RangeRef, ResolvedRange, Value, eval_cell,
};

fn invalid_arg(message: &str) -> Box<EvalAltResult> {
    EvalAltResult::ErrorRuntime(message.into(), Position::NONE).into()
}

fn cell_error(err: CellError, pos: Position) -> Box<EvalAltResult> {
    EvalAltResult::ErrorRuntime(Dynamic::from(err), pos).into()
}

/// Register all builtins into the interpreter.
pub fn register_builtins(engine: &mut Engine, ctx: EvalContext) {
    engine.register_type_with_name::<AxisSlice>("Slice");

    // SLICE(start, stop, step): axis slice constructor; `()` marks an
    // omitted part. Emitted by the preprocessor for `start:stop:step` axes.
    engine.register_fn(
        "SLICE",
        |start: Dynamic, stop: Dynamic, step: Dynamic| -> Result<AxisSlice, Box<EvalAltResult>> {
            Ok(AxisSlice {
                start: slice_part(start, "start")?,
                stop: slice_part(stop, "stop")?,
                step: slice_part(step, "step")?,
            })
        },
    );

    // CELL(row, col, table): evaluate one coordinate and return its value.
    // An explicit index outside the grid bounds is an error; an
    // error-valued referent propagates its own error.
    let cell_ctx = ctx.clone();
    engine.register_fn(
        "CELL",
        move |call: NativeCallContext,
              row: i64,
              col: i64,
              table: i64|
              -> Result<Dynamic, Box<EvalAltResult>> {
            let spec = RangeRef {
                rows: AxisSpec::Index(row),
                cols: AxisSpec::Index(col),
                tables: AxisSpec::Index(table),
            };
            let resolved = spec
                .resolve(cell_ctx.bounds())
                .map_err(|err| cell_error(err, call.position()))?;
            let coord = Coord::new(resolved.rows[0], resolved.cols[0], resolved.tables[0]);
            match eval_cell(call.engine(), &cell_ctx, coord) {
                Value::Error(err) => Err(cell_error(err, call.position())),
                value => Ok(value.to_dynamic()),
            }
        },
    );

    // CELLS(rows, cols, tables): resolve a range and return nested arrays,
    // one dimension per slice axis, row-major. Per-element errors are
    // embedded as values; aggregates fault when they meet one.
    let cells_ctx = ctx.clone();
    engine.register_fn(
        "CELLS",
        move |call: NativeCallContext,
              rows: Dynamic,
              cols: Dynamic,
              tables: Dynamic|
              -> Result<Dynamic, Box<EvalAltResult>> {
            let spec = RangeRef {
                rows: axis_spec(rows, "row")?,
                cols: axis_spec(cols, "column")?,
                tables: axis_spec(tables, "table")?,
            };
            let resolved = spec
                .resolve(cells_ctx.bounds())
                .map_err(|err| cell_error(err, call.position()))?;
            Ok(nested_values(&call, &cells_ctx, &resolved))
        },
    );

    // Flattening aggregates: nested range results reduce across all axes.
    engine.register_fn("SUM", |values: Array| -> Result<f64, Box<EvalAltResult>> {
        Ok(numeric_elements(&values)?.iter().sum())
    });

    engine.register_fn("AVG", |values: Array| -> Result<f64, Box<EvalAltResult>> {
        let nums = numeric_elements(&values)?;
        if nums.is_empty() {
            return Err(invalid_arg("AVG over no numeric values"));
        }
        Ok(nums.iter().sum::<f64>() / nums.len() as f64)
    });

    engine.register_fn("MIN", |values: Array| -> Result<f64, Box<EvalAltResult>> {
        numeric_elements(&values)?
            .into_iter()
            .fold(None, |acc: Option<f64>, n| {
                Some(acc.map_or(n, |a| a.min(n)))
            })
            .ok_or_else(|| invalid_arg("MIN over no numeric values"))
    });

    engine.register_fn("MAX", |values: Array| -> Result<f64, Box<EvalAltResult>> {
        numeric_elements(&values)?
            .into_iter()
            .fold(None, |acc: Option<f64>, n| {
                Some(acc.map_or(n, |a| a.max(n)))
            })
            .ok_or_else(|| invalid_arg("MAX over no numeric values"))
    });

    // COUNT: non-empty elements after flattening.
    engine.register_fn(
        "COUNT",
        |values: Array| -> Result<i64, Box<EvalAltResult>> {
            let flat = flat_elements(&values)?;
            Ok(flat.iter().filter(|v| !v.is_unit()).count() as i64)
        },
    );

    // FLAT: explicit flattening helper for user expressions.
    engine.register_fn("FLAT", |values: Array| -> Result<Array, Box<EvalAltResult>> {
        flat_elements(&values)
    });

    engine.register_fn("NOW", || -> String {
        Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
    });

    engine.register_fn("TODAY", || -> String {
        Local::now().format("%Y-%m-%d").to_string()
    });

    engine.register_fn("RAND", || -> f64 { rand::thread_rng().gen_range(0.0..1.0) });

    engine.register_fn(
        "RANDINT",
        |lo: i64, hi: i64| -> Result<i64, Box<EvalAltResult>> {
            if lo > hi {
                return Err(invalid_arg("RANDINT lower bound exceeds upper bound"));
            }
            Ok(rand::thread_rng().gen_range(lo..=hi))
        },
    );
}

fn slice_part(value: Dynamic, label: &str) -> Result<Option<i64>, Box<EvalAltResult>> {
    if value.is_unit() {
        return Ok(None);
    }
    value
        .as_int()
        .map(Some)
        .map_err(|_| invalid_arg(&format!("slice {} must be an integer", label)))
}

fn axis_spec(value: Dynamic, label: &str) -> Result<AxisSpec, Box<EvalAltResult>> {
    if let Ok(index) = value.as_int() {
        return Ok(AxisSpec::Index(index));
    }
    value
        .try_cast::<AxisSlice>()
        .map(AxisSpec::Slice)
        .ok_or_else(|| invalid_arg(&format!("{} axis must be an index or a slice", label)))
}

/// Assemble a resolved range into nested arrays. Collapsed axes contribute
/// no nesting level; spread axes nest row-major (row outermost).
fn nested_values(call: &NativeCallContext, ctx: &EvalContext, range: &ResolvedRange) -> Dynamic {
    let mut cursor = [0usize; 3];
    build_axis(call, ctx, range, 0, &mut cursor)
}

fn build_axis(
    call: &NativeCallContext,
    ctx: &EvalContext,
    range: &ResolvedRange,
    axis: usize,
    cursor: &mut [usize; 3],
) -> Dynamic {
    if axis == 3 {
        let coord = Coord::new(
            range.rows[cursor[0]],
            range.cols[cursor[1]],
            range.tables[cursor[2]],
        );
        return eval_cell(call.engine(), ctx, coord).to_dynamic();
    }

    let axis_len = match axis {
        0 => range.rows.len(),
        1 => range.cols.len(),
        _ => range.tables.len(),
    };

    if !range.spread[axis] {
        cursor[axis] = 0;
        return build_axis(call, ctx, range, axis + 1, cursor);
    }

    let mut values = Array::with_capacity(axis_len);
    for i in 0..axis_len {
        cursor[axis] = i;
        values.push(build_axis(call, ctx, range, axis + 1, cursor));
    }
    Dynamic::from(values)
}

/// Flatten nested arrays into a single list. An embedded cell error faults
/// the whole operation with that error, chaining the original cause.
fn flat_elements(values: &Array) -> Result<Array, Box<EvalAltResult>> {
    let mut out = Array::new();
    flatten_into(values, &mut out)?;
    Ok(out)
}

fn flatten_into(values: &Array, out: &mut Array) -> Result<(), Box<EvalAltResult>> {
    for value in values {
        if value.is_array() {
            let inner = value.clone().into_array().unwrap_or_default();
            flatten_into(&inner, out)?;
        } else if let Some(err) = value.clone().try_cast::<CellError>() {
            return Err(cell_error(err, Position::NONE));
        } else {
            out.push(value.clone());
        }
    }
    Ok(())
}

/// Numeric elements after flattening; text, booleans and empties are
/// ignored, matching the aggregate conventions of the builtin registry.
fn numeric_elements(values: &Array) -> Result<Vec<f64>, Box<EvalAltResult>> {
    let flat = flat_elements(values)?;
    Ok(flat
        .iter()
        .filter_map(|v| {
            v.as_int()
                .ok()
                .map(|n| n as f64)
                .or_else(|| v.as_float().ok())
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use crate::engine::{create_engine, Cell, Coord, EvalContext, GridBounds};
    use rhai::Engine;

    fn harness() -> (Engine, EvalContext) {
        let ctx = EvalContext::new(GridBounds::new(50, 20, 3));
        let engine = create_engine(ctx.clone());
        (engine, ctx)
    }

    fn set(ctx: &EvalContext, coord: Coord, text: &str) {
        ctx.grid
            .insert(coord, Cell::from_text(text).expect("non-empty cell"));
    }

    #[test]
    fn test_sum_flattens_across_all_axes() {
        let (engine, ctx) = harness();
        for row in 0..2 {
            for col in 0..2 {
                set(&ctx, Coord::new(row, col, 0), "1");
            }
        }
        // Rank-2 range: a naive per-axis sum would not be scalar.
        let total: f64 = engine.eval("SUM(CELLS(SLICE(0, 2, ()), SLICE(0, 2, ()), 0))").unwrap();
        assert_eq!(total, 4.0);
    }

    #[test]
    fn test_aggregates_skip_text_and_empties() {
        let (engine, ctx) = harness();
        set(&ctx, Coord::new(0, 0, 0), "2");
        set(&ctx, Coord::new(1, 0, 0), "\"label\"");
        let total: f64 = engine
            .eval("SUM(CELLS(SLICE(0, 5, ()), 0, 0))")
            .unwrap();
        assert_eq!(total, 2.0);
        let count: i64 = engine
            .eval("COUNT(CELLS(SLICE(0, 5, ()), 0, 0))")
            .unwrap();
        assert_eq!(count, 2);
    }

    #[test]
    fn test_aggregate_over_error_cell_faults() {
        let (engine, ctx) = harness();
        set(&ctx, Coord::new(0, 0, 0), "1 / 0");
        let result = engine.eval::<f64>("SUM(CELLS(SLICE(0, 2, ()), 0, 0))");
        assert!(result.is_err());
    }

    #[test]
    fn test_flat_unnests_everything() {
        let (engine, _ctx) = harness();
        let flat: rhai::Array = engine.eval("FLAT([[1, 2], [3, [4]]])").unwrap();
        assert_eq!(flat.len(), 4);
    }

    #[test]
    fn test_randint_stays_in_range() {
        let (engine, _ctx) = harness();
        for _ in 0..20 {
            let n: i64 = engine.eval("RANDINT(3, 5)").unwrap();
            assert!((3..=5).contains(&n));
        }
        assert!(engine.eval::<i64>("RANDINT(5, 3)").is_err());
    }

    #[test]
    fn test_min_max() {
        let (engine, ctx) = harness();
        set(&ctx, Coord::new(0, 0, 0), "4");
        set(&ctx, Coord::new(1, 0, 0), "9");
        set(&ctx, Coord::new(2, 0, 0), "2");
        let min: f64 = engine.eval("MIN(CELLS(SLICE(0, 3, ()), 0, 0))").unwrap();
        let max: f64 = engine.eval("MAX(CELLS(SLICE(0, 3, ()), 0, 0))").unwrap();
        assert_eq!(min, 2.0);
        assert_eq!(max, 9.0);
    }
}
