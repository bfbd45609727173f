// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

use std::time::{Duration, Instant};

use tracing::debug;

use crate::core::{check_shape, Mark, MarkGrid, TimeGrid};
use crate::error::{FmmError, Result};
use crate::heap::TimeHeap;
use crate::stencil::{Offset, Stencil};
use crate::tensors::{IdentityTensors, Tensors};
use crate::update_kernels::{edge_time, vertex_time};

/// Information passed to the optional commit callback each time a cell
/// becomes known.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CommitInfo {
    /// Index in the 1st dimension.
    pub i1: usize,
    /// Index in the 2nd dimension.
    pub i2: usize,
    /// Final time of the cell.
    pub time: f32,
    /// Number of cells committed so far in this solve, including this one.
    pub commits: u64,
    /// Number of trial cells left in the heap.
    pub heap_len: usize,
}

/// Counters for the most recent solve.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SolveStats {
    /// Cells frozen known, including the seed.
    pub commits: u64,
    /// Candidate times computed from a single known vertex.
    pub vertex_updates: u64,
    /// Candidate times computed from a known edge.
    pub edge_updates: u64,
    /// Wall-clock time of the solve.
    pub elapsed: Duration,
}

/// Anisotropic fast marching solver on a 2D grid.
///
/// The solver owns the time grid. Each [`zero_at`](FmmSolver::zero_at) call
/// zeros one cell and lowers times elsewhere to the first arrival from that
/// cell, so successive calls leave the minimum over all seeds. Borrowing
/// rules make the solver the only writer while a solve runs; between solves
/// the grid can be read with [`times`](FmmSolver::times), edited with
/// [`times_mut`](FmmSolver::times_mut), or taken back with
/// [`into_times`](FmmSolver::into_times).
///
/// Stencil triangles are never unfolded. With strongly anisotropic tensors
/// some triangles are obtuse in the tensor metric, and times there can be
/// slightly too large and committed out of order.
pub struct FmmSolver<T: Tensors> {
    n1: usize,
    n2: usize,
    stencil: Stencil,
    tensors: T,
    times: TimeGrid,
    marks: MarkGrid,
    heap: TimeHeap,
    stats: SolveStats,
}

impl FmmSolver<IdentityTensors> {
    /// Create a solver with identity tensors (isotropic, unit speed).
    ///
    /// # Errors
    /// Returns an error if either dimension is zero.
    pub fn isotropic(n1: usize, n2: usize, stencil: Stencil) -> Result<Self> {
        Self::new(n1, n2, stencil, IdentityTensors)
    }
}

impl<T: Tensors> FmmSolver<T> {
    /// Create a solver for an `n1` by `n2` grid. All times start at
    /// [`INFINITY`](crate::core::INFINITY).
    ///
    /// # Errors
    /// Returns an error if either dimension is zero, or if the tensor source
    /// has a different shape.
    pub fn new(n1: usize, n2: usize, stencil: Stencil, tensors: T) -> Result<Self> {
        Self::with_times(TimeGrid::new(n1, n2)?, stencil, tensors)
    }

    /// Create a solver that updates an existing time grid in place.
    ///
    /// Existing times act as upper bounds: a cell is only changed when a
    /// seed reaches it sooner.
    ///
    /// # Errors
    /// Returns an error if either dimension of `times` is zero, or if the
    /// tensor source has a shape that differs from the grid.
    pub fn with_times(times: TimeGrid, stencil: Stencil, tensors: T) -> Result<Self> {
        let (n1, n2) = (times.n1(), times.n2());
        check_shape(n1, n2)?;
        if let Some((m1, m2)) = tensors.shape() {
            if (m1, m2) != (n1, n2) {
                return Err(FmmError::ShapeMismatch {
                    expected: vec![n2, n1],
                    got: vec![m2, m1],
                });
            }
        }
        debug!(n1, n2, %stencil, "created fast marching solver");
        Ok(FmmSolver {
            n1,
            n2,
            stencil,
            tensors,
            marks: MarkGrid::new(n1 * n2),
            heap: TimeHeap::new(n1, n2),
            times,
            stats: SolveStats::default(),
        })
    }

    /// Grid shape as `(n1, n2)`.
    pub fn shape(&self) -> (usize, usize) {
        (self.n1, self.n2)
    }

    /// The stencil chosen at construction.
    pub fn stencil(&self) -> Stencil {
        self.stencil
    }

    /// The tensor source.
    pub fn tensors(&self) -> &T {
        &self.tensors
    }

    /// The times computed so far.
    pub fn times(&self) -> &TimeGrid {
        &self.times
    }

    /// Mutable access to the times between solves.
    pub fn times_mut(&mut self) -> &mut TimeGrid {
        &mut self.times
    }

    /// Consume the solver and return its time grid.
    pub fn into_times(self) -> TimeGrid {
        self.times
    }

    /// Counters for the most recent solve.
    pub fn stats(&self) -> &SolveStats {
        &self.stats
    }

    /// Mark of cell `(i1, i2)` as left by the most recent solve.
    ///
    /// # Errors
    /// Returns an error if the cell is outside the grid.
    pub fn mark(&self, i1: usize, i2: usize) -> Result<Mark> {
        self.check_cell(i1, i2)?;
        Ok(self.marks.get(self.times.index(i1, i2)))
    }

    /// Zero the time at `(i1, i2)` and update times elsewhere.
    ///
    /// Returns the updated times, by reference.
    ///
    /// # Errors
    /// Returns an error if the cell is outside the grid.
    pub fn zero_at(&mut self, i1: usize, i2: usize) -> Result<&TimeGrid> {
        self.zero_at_with(i1, i2, None)
    }

    /// Like [`zero_at`](FmmSolver::zero_at), calling `on_commit` each time a
    /// cell becomes known, in commit order, starting with the seed.
    ///
    /// # Errors
    /// Returns an error if the cell is outside the grid.
    pub fn zero_at_with(
        &mut self,
        i1: usize,
        i2: usize,
        mut on_commit: Option<&mut dyn FnMut(CommitInfo)>,
    ) -> Result<&TimeGrid> {
        self.check_cell(i1, i2)?;
        let start = Instant::now();

        let seed = self.seed(i1, i2)?;
        if let Some(cb) = on_commit.as_deref_mut() {
            cb(seed);
        }
        while let Some(info) = self.advance()? {
            if let Some(cb) = on_commit.as_deref_mut() {
                cb(info);
            }
        }

        self.stats.elapsed = start.elapsed();
        debug!(
            i1,
            i2,
            commits = self.stats.commits,
            vertex_updates = self.stats.vertex_updates,
            edge_updates = self.stats.edge_updates,
            elapsed_ms = self.stats.elapsed.as_secs_f64() * 1e3,
            "fast marching converged"
        );
        Ok(&self.times)
    }

    fn check_cell(&self, i1: usize, i2: usize) -> Result<()> {
        if i1 < self.n1 && i2 < self.n2 {
            Ok(())
        } else {
            Err(FmmError::OutOfBounds {
                i1,
                i2,
                shape: (self.n1, self.n2),
            })
        }
    }

    /// Reset marks and heap, freeze the seed at time zero and push its
    /// neighbors.
    fn seed(&mut self, i1: usize, i2: usize) -> Result<CommitInfo> {
        self.marks.clear();
        self.heap.clear();
        self.stats = SolveStats::default();

        let flat = self.times.index(i1, i2);
        self.marks.set(flat, Mark::Known);
        self.times[flat] = 0.0;
        self.stats.commits = 1;
        self.update_nabors(i1, i2)?;

        Ok(CommitInfo {
            i1,
            i2,
            time: 0.0,
            commits: self.stats.commits,
            heap_len: self.heap.len(),
        })
    }

    /// Freeze the trial cell with the smallest time and update its
    /// neighbors. Returns `None` once the heap is empty.
    fn advance(&mut self) -> Result<Option<CommitInfo>> {
        let Some(entry) = self.heap.extract_min() else {
            return Ok(None);
        };
        let (i1, i2) = (entry.i1, entry.i2);
        let flat = self.times.index(i1, i2);
        self.marks.set(flat, Mark::Known);
        self.stats.commits += 1;
        self.update_nabors(i1, i2)?;

        Ok(Some(CommitInfo {
            i1,
            i2,
            time: self.times[flat],
            commits: self.stats.commits,
            heap_len: self.heap.len(),
        }))
    }

    /// Cell at `offset` from `(i1, i2)`, if inside the grid.
    #[inline]
    fn offset(&self, i1: usize, i2: usize, (d1, d2): Offset) -> Option<(usize, usize)> {
        let j1 = i1.checked_add_signed(d1).filter(|&j| j < self.n1)?;
        let j2 = i2.checked_add_signed(d2).filter(|&j| j < self.n2)?;
        Some((j1, j2))
    }

    /// Flat index of the triangle vertex at `offset` from `(j1, j2)` if it
    /// is inside the grid and known. Vertices outside the grid count as not
    /// known, so edge cells still get vertex updates.
    #[inline]
    fn known_vertex(&self, j1: usize, j2: usize, offset: Offset) -> Option<usize> {
        let (k1, k2) = self.offset(j1, j2, offset)?;
        let flat = self.times.index(k1, k2);
        self.marks.is_known(flat).then_some(flat)
    }

    fn update_nabors(&mut self, i1: usize, i2: usize) -> Result<()> {
        let stencil = self.stencil;
        for (k, &sample) in stencil.samples().iter().enumerate() {
            let Some((j1, j2)) = self.offset(i1, i2, sample) else {
                continue;
            };
            if !self.marks.is_known(self.times.index(j1, j2)) {
                self.update_time(j1, j2, stencil.triangles_for(k))?;
            }
        }
        Ok(())
    }

    /// Lower the time of cell `(j1, j2)` using the known vertices of the
    /// listed triangles, and push or reduce it in the heap if it improved.
    fn update_time(&mut self, j1: usize, j2: usize, tris: [usize; 2]) -> Result<()> {
        let s = self.tensors.tensor(j1, j2);
        let flat = self.times.index(j1, j2);
        let mut tmin = self.times[flat];
        let mut smaller_time_found = false;

        for t in tris {
            let (o1, o2) = self.stencil.triangle(t);
            let known1 = self.known_vertex(j1, j2, o1);
            let known2 = self.known_vertex(j1, j2, o2);

            // Displacements relative to X0 follow from the stencil offsets.
            let x0_x1 = [-o1.0 as f32, -o1.1 as f32];
            let x0_x2 = [-o2.0 as f32, -o2.1 as f32];
            let t0 = match (known1, known2) {
                (Some(f1), Some(f2)) => {
                    self.stats.edge_updates += 1;
                    let (t1, t2) = (self.times[f1], self.times[f2]);
                    let x1_x2 = [(o1.0 - o2.0) as f32, (o1.1 - o2.1) as f32];
                    edge_time(&s, t1 - t2, t2, x1_x2, x0_x2)
                }
                (Some(f1), None) => {
                    self.stats.vertex_updates += 1;
                    vertex_time(&s, self.times[f1], x0_x1)
                }
                (None, Some(f2)) => {
                    self.stats.vertex_updates += 1;
                    vertex_time(&s, self.times[f2], x0_x2)
                }
                (None, None) => continue,
            };

            // NaN never compares smaller.
            if t0 < tmin {
                tmin = t0;
                smaller_time_found = true;
            }
        }

        if smaller_time_found {
            if self.marks.get(flat) == Mark::Trial {
                self.heap.reduce(j1, j2, tmin)?;
            } else {
                self.marks.set(flat, Mark::Trial);
                self.heap.insert(j1, j2, tmin)?;
            }
            self.times[flat] = tmin;
        }
        Ok(())
    }
}
