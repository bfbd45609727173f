// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

use crate::error::{FmmError, Result};

/// Initial huge value for times not yet computed.
///
/// This is the largest finite `f32`, not `f32::INFINITY`, so that arithmetic
/// on unreached cells never produces infinities or NaNs on its own.
pub const INFINITY: f32 = f32::MAX;

/// Validate a grid shape, returning an error naming the first empty axis.
pub(crate) fn check_shape(n1: usize, n2: usize) -> Result<()> {
    if n1 == 0 {
        return Err(FmmError::InvalidGridShape { axis: 0, size: n1 });
    }
    if n2 == 0 {
        return Err(FmmError::InvalidGridShape { axis: 1, size: n2 });
    }
    Ok(())
}

/// A 2D grid of arrival times.
///
/// Cell `(i1, i2)` is stored at flat index `i2 * n1 + i1`, so the 1st
/// dimension is the fast axis. Every cell starts at [`INFINITY`].
#[derive(Debug, Clone, PartialEq)]
pub struct TimeGrid {
    n1: usize,
    n2: usize,
    data: Box<[f32]>,
}

impl TimeGrid {
    /// Create a grid of `n1 * n2` cells, all at [`INFINITY`].
    ///
    /// # Errors
    /// Returns an error if either dimension is zero.
    pub fn new(n1: usize, n2: usize) -> Result<Self> {
        check_shape(n1, n2)?;
        Ok(TimeGrid {
            n1,
            n2,
            data: vec![INFINITY; n1 * n2].into_boxed_slice(),
        })
    }

    /// Wrap existing times given in row-major order (`i1` fastest).
    ///
    /// # Errors
    /// Returns an error if either dimension is zero or if the length of
    /// `data` is not `n1 * n2`.
    pub fn from_vec(n1: usize, n2: usize, data: Vec<f32>) -> Result<Self> {
        check_shape(n1, n2)?;
        if data.len() != n1 * n2 {
            return Err(FmmError::ShapeMismatch {
                expected: vec![n2, n1],
                got: vec![data.len()],
            });
        }
        Ok(TimeGrid {
            n1,
            n2,
            data: data.into_boxed_slice(),
        })
    }

    /// Number of samples in the 1st dimension.
    pub fn n1(&self) -> usize {
        self.n1
    }

    /// Number of samples in the 2nd dimension.
    pub fn n2(&self) -> usize {
        self.n2
    }

    /// Total number of cells.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Always false; grids have at least one cell.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Whether `(i1, i2)` is inside the grid.
    pub fn contains(&self, i1: usize, i2: usize) -> bool {
        i1 < self.n1 && i2 < self.n2
    }

    /// Flat index of `(i1, i2)`. The caller must pass in-bounds indices.
    #[inline]
    pub fn index(&self, i1: usize, i2: usize) -> usize {
        i2 * self.n1 + i1
    }

    /// Time at `(i1, i2)`.
    ///
    /// # Panics
    /// Panics if the cell is outside the grid.
    #[inline]
    pub fn get(&self, i1: usize, i2: usize) -> f32 {
        assert!(self.contains(i1, i2), "({}, {}) out of bounds", i1, i2);
        self.data[self.index(i1, i2)]
    }

    /// Overwrite the time at `(i1, i2)`.
    ///
    /// # Panics
    /// Panics if the cell is outside the grid.
    #[inline]
    pub fn set(&mut self, i1: usize, i2: usize, t: f32) {
        assert!(self.contains(i1, i2), "({}, {}) out of bounds", i1, i2);
        let idx = self.index(i1, i2);
        self.data[idx] = t;
    }

    /// Whether the cell has a time below [`INFINITY`].
    pub fn is_reached(&self, i1: usize, i2: usize) -> bool {
        self.get(i1, i2) < INFINITY
    }

    /// Raw times in row-major order.
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    /// Consume the grid and return its raw times.
    pub fn into_vec(self) -> Vec<f32> {
        self.data.into_vec()
    }
}

impl std::ops::Index<usize> for TimeGrid {
    type Output = f32;

    fn index(&self, flat: usize) -> &f32 {
        &self.data[flat]
    }
}

impl std::ops::IndexMut<usize> for TimeGrid {
    fn index_mut(&mut self, flat: usize) -> &mut f32 {
        &mut self.data[flat]
    }
}

/// State of a cell during wavefront expansion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Mark {
    /// No candidate time yet.
    Far,
    /// In the heap with a tentative time.
    Trial,
    /// Time is final for the current solve.
    Known,
}

/// Per-cell marks with O(1) clearing.
///
/// Marks are stored as integers and interpreted against three moving
/// thresholds. Clearing adds 2 to every threshold, which turns every stored
/// value into something below `trial`, i.e. Far. Only when the thresholds
/// would overflow is the storage rewritten.
#[derive(Debug, Clone)]
pub(crate) struct MarkGrid {
    marks: Box<[u32]>,
    far: u32,
    trial: u32,
    known: u32,
}

impl MarkGrid {
    pub(crate) fn new(num_cells: usize) -> Self {
        MarkGrid {
            marks: vec![0; num_cells].into_boxed_slice(),
            far: 0,
            trial: 1,
            known: 2,
        }
    }

    /// Start with thresholds near overflow, to exercise the rewrite path.
    #[cfg(test)]
    fn with_epoch(num_cells: usize, far: u32) -> Self {
        MarkGrid {
            marks: vec![far; num_cells].into_boxed_slice(),
            far,
            trial: far + 1,
            known: far + 2,
        }
    }

    /// Turn every cell Far.
    pub(crate) fn clear(&mut self) {
        match self.known.checked_add(2) {
            Some(known) => {
                self.far += 2;
                self.trial += 2;
                self.known = known;
            }
            None => {
                tracing::trace!(cells = self.marks.len(), "mark epoch overflow, rewriting marks");
                self.far = 0;
                self.trial = 1;
                self.known = 2;
                self.marks.fill(self.far);
            }
        }
    }

    #[inline]
    pub(crate) fn get(&self, flat: usize) -> Mark {
        let m = self.marks[flat];
        if m == self.known {
            Mark::Known
        } else if m == self.trial {
            Mark::Trial
        } else {
            Mark::Far
        }
    }

    #[inline]
    pub(crate) fn is_known(&self, flat: usize) -> bool {
        self.marks[flat] == self.known
    }

    #[inline]
    pub(crate) fn set(&mut self, flat: usize, mark: Mark) {
        self.marks[flat] = match mark {
            Mark::Far => self.far,
            Mark::Trial => self.trial,
            Mark::Known => self.known,
        };
    }

    /// Number of cells currently carrying `mark`. O(n); used by tests.
    #[cfg(test)]
    pub(crate) fn count(&self, mark: Mark) -> usize {
        (0..self.marks.len())
            .filter(|&i| self.get(i) == mark)
            .count()
    }
}
