//! Dynamically growing sparse count matrix
//!
//! Physical capacity and logical shape are tracked separately:
//! - **Capacity**: starts at `INITIAL_CAPACITY` per axis and doubles until it
//!   covers the touched index
//! - **Logical shape**: `max(shape, index + 1)` per axis, i.e. the region that
//!   has actually been addressed
//!
//! Storage is one ordered map per physical row, so absent cells read as zero
//! and growth never moves stored counts. `export` crops to a requested shape.

pub mod market;

use crate::errors::{FeatureError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Per-axis capacity of a fresh matrix
pub const INITIAL_CAPACITY: usize = 8;

#[derive(Debug, Clone)]
pub struct SparseCountMatrix {
    rows: Vec<BTreeMap<usize, u64>>,
    col_capacity: usize,
    logical_rows: usize,
    logical_cols: usize,
}

impl Default for SparseCountMatrix {
    fn default() -> Self {
        Self::new()
    }
}

impl SparseCountMatrix {
    pub fn new() -> Self {
        Self {
            rows: vec![BTreeMap::new(); INITIAL_CAPACITY],
            col_capacity: INITIAL_CAPACITY,
            logical_rows: 0,
            logical_cols: 0,
        }
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Mutation
    // ═══════════════════════════════════════════════════════════════════════

    /// Add `delta` to cell `(row, col)`, growing either axis as needed
    ///
    /// # Errors
    ///
    /// `Consistency` if the cell count would overflow `u64`.
    pub fn increment(&mut self, row: usize, col: usize, delta: u64) -> Result<()> {
        self.ensure_row(row);
        self.ensure_col(col);

        if delta > 0 {
            let cell = self.rows[row].entry(col).or_insert(0);
            *cell = cell.checked_add(delta).ok_or_else(|| {
                FeatureError::consistency(format!("count overflow at ({}, {})", row, col))
            })?;
        }
        Ok(())
    }

    /// Make `row` part of the logical shape without writing a cell
    pub fn open_row(&mut self, row: usize) {
        self.ensure_row(row);
    }

    #[inline]
    fn ensure_row(&mut self, row: usize) {
        let capacity = grown_capacity(self.rows.len(), row);
        if capacity > self.rows.len() {
            self.rows.resize_with(capacity, BTreeMap::new);
        }
        self.logical_rows = self.logical_rows.max(row + 1);
    }

    #[inline]
    fn ensure_col(&mut self, col: usize) {
        self.col_capacity = grown_capacity(self.col_capacity, col);
        self.logical_cols = self.logical_cols.max(col + 1);
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Queries
    // ═══════════════════════════════════════════════════════════════════════

    pub fn get(&self, row: usize, col: usize) -> u64 {
        self.rows
            .get(row)
            .and_then(|cells| cells.get(&col))
            .copied()
            .unwrap_or(0)
    }

    /// (rows, cols) that have been addressed
    pub fn shape(&self) -> (usize, usize) {
        (self.logical_rows, self.logical_cols)
    }

    /// Physical (rows, cols) capacity
    pub fn capacity(&self) -> (usize, usize) {
        (self.rows.len(), self.col_capacity)
    }

    pub fn nnz(&self) -> usize {
        self.rows.iter().map(BTreeMap::len).sum()
    }

    /// Cropped copy of the top-left `rows x cols` region, row-major
    pub fn export(&self, rows: usize, cols: usize) -> CooMatrix {
        let entries = self
            .rows
            .iter()
            .take(rows)
            .enumerate()
            .flat_map(|(r, cells)| {
                cells
                    .range(..cols)
                    .map(move |(&c, &count)| (r, c, count))
            })
            .collect();
        CooMatrix { rows, cols, entries }
    }
}

/// Smallest doubling of `capacity` that covers `index`
#[inline]
fn grown_capacity(capacity: usize, index: usize) -> usize {
    let mut capacity = capacity.max(INITIAL_CAPACITY);
    while index >= capacity {
        capacity *= 2;
    }
    capacity
}

/// Coordinate-format snapshot of a matrix
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CooMatrix {
    pub rows: usize,
    pub cols: usize,
    /// (row, col, count), zero-based, row-major, no zero counts
    pub entries: Vec<(usize, usize, u64)>,
}

impl CooMatrix {
    pub fn nnz(&self) -> usize {
        self.entries.len()
    }

    pub fn to_dense(&self) -> Vec<Vec<u64>> {
        let mut dense = vec![vec![0; self.cols]; self.rows];
        for &(r, c, count) in &self.entries {
            dense[r][c] = count;
        }
        dense
    }
}
