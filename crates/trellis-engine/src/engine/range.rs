//! Slice-based range addressing.
//!
//! A grid index has one spec per axis: either a single collapsing index or
//! a `start:stop:step` slice. Slice endpoints are clamped to the axis bound
//! (never rejected); explicit scalar indices outside the bounds raise
//! `OutOfBounds`. A resolved range yields coordinates in row-major order:
//! row varies slowest, then column, then table.

use super::cell::CellError;
use super::coord::{Coord, GridAxis, GridBounds};

/// One axis of a grid index.
#[derive(Clone, Debug, PartialEq)]
pub enum AxisSpec {
    /// A single index; collapses the axis out of the result shape.
    Index(i64),
    /// A slice; the axis survives as one dimension of the result.
    Slice(AxisSlice),
}

/// A `start:stop:step` slice with any part omitted.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AxisSlice {
    pub start: Option<i64>,
    pub stop: Option<i64>,
    pub step: Option<i64>,
}

impl AxisSlice {
    /// Resolve against an axis bound. Endpoints clamp to `[0, bound]`;
    /// a step below 1 is a fault.
    fn resolve(&self, bound: usize) -> Result<Vec<usize>, CellError> {
        let clamp = |endpoint: i64| -> usize {
            if endpoint < 0 {
                0
            } else {
                (endpoint as usize).min(bound)
            }
        };
        let start = self.start.map_or(0, clamp);
        let stop = self.stop.map_or(bound, clamp);
        let step = self.step.unwrap_or(1);
        if step < 1 {
            return Err(CellError::Fault {
                message: format!("slice step must be >= 1, got {}", step),
            });
        }
        Ok((start..stop).step_by(step as usize).collect())
    }
}

/// A full three-axis range, constructed per evaluation and never persisted.
#[derive(Clone, Debug, PartialEq)]
pub struct RangeRef {
    pub rows: AxisSpec,
    pub cols: AxisSpec,
    pub tables: AxisSpec,
}

impl RangeRef {
    /// Resolve every axis against the grid bounds.
    pub fn resolve(&self, bounds: GridBounds) -> Result<ResolvedRange, CellError> {
        let rows = resolve_axis(&self.rows, bounds.rows, GridAxis::Row, bounds)?;
        let cols = resolve_axis(&self.cols, bounds.cols, GridAxis::Col, bounds)?;
        let tables = resolve_axis(&self.tables, bounds.tables, GridAxis::Table, bounds)?;
        Ok(ResolvedRange {
            spread: [
                matches!(self.rows, AxisSpec::Slice(_)),
                matches!(self.cols, AxisSpec::Slice(_)),
                matches!(self.tables, AxisSpec::Slice(_)),
            ],
            rows,
            cols,
            tables,
        })
    }
}

fn resolve_axis(
    spec: &AxisSpec,
    bound: usize,
    axis: GridAxis,
    bounds: GridBounds,
) -> Result<Vec<usize>, CellError> {
    match spec {
        AxisSpec::Index(index) => match usize::try_from(*index) {
            Ok(i) if i < bound => Ok(vec![i]),
            _ => Err(CellError::OutOfBounds {
                axis,
                index: *index,
                bounds,
            }),
        },
        AxisSpec::Slice(slice) => slice.resolve(bound),
    }
}

/// Per-axis index lists plus which axes survive as result dimensions.
/// Collapsed axes hold exactly one index.
#[derive(Clone, Debug, PartialEq)]
pub struct ResolvedRange {
    pub rows: Vec<usize>,
    pub cols: Vec<usize>,
    pub tables: Vec<usize>,
    pub spread: [bool; 3],
}

impl ResolvedRange {
    /// Number of coordinates the range covers after clamping.
    pub fn len(&self) -> usize {
        self.rows.len() * self.cols.len() * self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Result rank: the number of surviving (slice) axes.
    pub fn rank(&self) -> usize {
        self.spread.iter().filter(|s| **s).count()
    }

    /// Lazily yield coordinates row-major: row outermost, then column,
    /// then table.
    pub fn coords(&self) -> impl Iterator<Item = Coord> + '_ {
        self.rows.iter().flat_map(move |&row| {
            self.cols.iter().flat_map(move |&col| {
                self.tables
                    .iter()
                    .map(move |&table| Coord::new(row, col, table))
            })
        })
    }
}
