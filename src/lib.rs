// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

//! An anisotropic eikonal solver using the Fast Marching Method (FMM).
//!
//! This library computes first-arrival times on 2D Cartesian grids by
//! propagating a wavefront outward from seed cells. The local propagation
//! metric is a symmetric positive-definite 2x2 tensor supplied per cell by a
//! [`Tensors`] implementation, so the arrival time between neighbors is
//! `sqrt(y' S y)` rather than the Euclidean step length. Cells are frozen in
//! order of increasing time with an indexed min-heap, and each candidate time
//! is the minimum over the stencil triangles that touch already-known cells.

#![warn(missing_docs)]

/// Time and mark grids.
pub mod core;
/// Error types for the library.
pub mod error;
/// Indexed min-heap over grid cells.
pub mod heap;
/// File I/O for time grids and tensor fields.
pub mod io;
/// Fast marching solver.
pub mod solver;
/// 4- and 8-neighbor stencils.
pub mod stencil;
/// Tensor field sources.
pub mod tensors;
/// Vertex and edge update kernels.
pub mod update_kernels;

pub use crate::core::{Mark, TimeGrid, INFINITY};
pub use crate::error::{FmmError, Result};
pub use crate::solver::{CommitInfo, FmmSolver, SolveStats};
pub use crate::stencil::Stencil;
pub use crate::tensors::{ConstantTensors, FieldTensors, IdentityTensors, Tensor, Tensors};
