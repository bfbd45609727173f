// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

//! Neighbor samples and triangles used by the solver.
//!
//! Triangles are numbered counter-clockwise around the updated vertex X0:
//!
//! ```text
//!     4 neighbors           8 neighbors
//!       2 ^                    2 ^
//!         *                * - - * - - *
//!       / | \              | \ 2 | 1 / |
//!     / 1 | 0 \            | 3 \ | / 0 |
//!   * - - X - - * >        * - - X - - * >
//!     \ 2 | 3 /   1        | 4 / | \ 7 | 1
//!       \ | /              | / 5 | 6 \ |
//!         *                * - - * - - *
//! ```
//!
//! Each `*` is a vertex X1 or X2 of some triangle. When a cell becomes known,
//! each of its neighbor samples is updated using only the two triangles that
//! have the known cell as a vertex.

use std::fmt;
use std::str::FromStr;

use crate::error::FmmError;

/// A grid offset `(d1, d2)`.
pub type Offset = (isize, isize);

const SAMPLES_4: [Offset; 4] = [(1, 0), (0, 1), (-1, 0), (0, -1)];
const X2_4: [Offset; 4] = [(0, 1), (-1, 0), (0, -1), (1, 0)];
const TRIS_4: [[usize; 2]; 4] = [[1, 2], [2, 3], [3, 0], [0, 1]];

const SAMPLES_8: [Offset; 8] = [
    (1, 0),
    (1, 1),
    (0, 1),
    (-1, 1),
    (-1, 0),
    (-1, -1),
    (0, -1),
    (1, -1),
];
const X2_8: [Offset; 8] = [
    (1, 1),
    (0, 1),
    (-1, 1),
    (-1, 0),
    (-1, -1),
    (0, -1),
    (1, -1),
    (1, 0),
];
const TRIS_8: [[usize; 2]; 8] = [
    [3, 4],
    [4, 5],
    [5, 6],
    [6, 7],
    [7, 0],
    [0, 1],
    [1, 2],
    [2, 3],
];

/// Finite-difference stencil: 4 or 8 neighbor samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stencil {
    /// Axis neighbors only; four right triangles.
    Four,
    /// Axis and diagonal neighbors; eight half-square triangles.
    Eight,
}

impl Stencil {
    /// Stencil with the given number of neighbor samples.
    ///
    /// # Errors
    /// Returns [`FmmError::InvalidStencil`] unless `n` is 4 or 8.
    pub fn from_neighbors(n: usize) -> Result<Self, FmmError> {
        match n {
            4 => Ok(Stencil::Four),
            8 => Ok(Stencil::Eight),
            other => Err(FmmError::InvalidStencil(other.to_string())),
        }
    }

    /// Number of neighbor samples.
    pub fn neighbors(self) -> usize {
        self.samples().len()
    }

    /// Offsets from a known cell to the neighbors it updates.
    pub fn samples(self) -> &'static [Offset] {
        match self {
            Stencil::Four => &SAMPLES_4,
            Stencil::Eight => &SAMPLES_8,
        }
    }

    /// Triangles used to update the neighbor reached by sample `k`.
    #[inline]
    pub fn triangles_for(self, k: usize) -> [usize; 2] {
        match self {
            Stencil::Four => TRIS_4[k],
            Stencil::Eight => TRIS_8[k],
        }
    }

    /// Offsets of vertices X1 and X2 of triangle `t`, relative to X0.
    #[inline]
    pub fn triangle(self, t: usize) -> (Offset, Offset) {
        match self {
            Stencil::Four => (SAMPLES_4[t], X2_4[t]),
            Stencil::Eight => (SAMPLES_8[t], X2_8[t]),
        }
    }
}

impl FromStr for Stencil {
    type Err = FmmError;

    fn from_str(s: &str) -> Result<Self, FmmError> {
        match s.trim().to_ascii_lowercase().as_str() {
            "4" | "four" => Ok(Stencil::Four),
            "8" | "eight" => Ok(Stencil::Eight),
            other => Err(FmmError::InvalidStencil(other.to_string())),
        }
    }
}

impl fmt::Display for Stencil {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.neighbors())
    }
}
