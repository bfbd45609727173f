// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

use std::fmt;

/// Errors that can occur during solver setup, I/O, or execution.
#[derive(Debug)]
pub enum FmmError {
    /// Grid shape is invalid (dimension is zero).
    InvalidGridShape {
        /// The axis index (0 for n1, 1 for n2).
        axis: usize,
        /// The size provided.
        size: usize,
    },
    /// Stencil selector is not 4 or 8 neighbors.
    InvalidStencil(String),
    /// Cell coordinate lies outside the grid.
    OutOfBounds {
        /// Index in the 1st dimension.
        i1: usize,
        /// Index in the 2nd dimension.
        i2: usize,
        /// Grid size as (n1, n2).
        shape: (usize, usize),
    },
    /// Array shape does not match expected shape.
    ShapeMismatch {
        /// The expected shape.
        expected: Vec<usize>,
        /// The actual shape encountered.
        got: Vec<usize>,
    },
    /// Priority queue used against its contract (duplicate insert, missing
    /// entry, or key increase).
    HeapContract {
        /// Index in the 1st dimension.
        i1: usize,
        /// Index in the 2nd dimension.
        i2: usize,
        /// What was violated.
        reason: &'static str,
    },
    /// Unsupported data type in file.
    UnsupportedDtype(String),
    /// Unsupported file format (unrecognized extension).
    UnsupportedFileFormat(String),
    /// Expected MAT variable not found in file.
    MatVariableNotFound {
        /// The variable name that was requested.
        expected: String,
        /// The variable names that are available.
        available: Vec<String>,
    },
    /// I/O error occurred.
    IoError(std::io::Error),
    /// Other error with a descriptive message.
    Other(String),
}

impl fmt::Display for FmmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FmmError::InvalidGridShape { axis, size } => {
                write!(
                    f,
                    "invalid grid shape: axis {} has size {} (must be >= 1)",
                    axis, size
                )
            }
            FmmError::InvalidStencil(sel) => {
                write!(f, "invalid stencil: {} (expected 4 or 8 neighbors)", sel)
            }
            FmmError::OutOfBounds { i1, i2, shape } => {
                write!(
                    f,
                    "cell ({}, {}) is outside the {}x{} grid",
                    i1, i2, shape.0, shape.1
                )
            }
            FmmError::ShapeMismatch { expected, got } => {
                write!(f, "shape mismatch: expected {:?}, got {:?}", expected, got)
            }
            FmmError::HeapContract { i1, i2, reason } => {
                write!(f, "heap contract violated at ({}, {}): {}", i1, i2, reason)
            }
            FmmError::UnsupportedDtype(dtype) => {
                write!(f, "unsupported dtype: {}", dtype)
            }
            FmmError::UnsupportedFileFormat(ext) => {
                write!(f, "unsupported file format: {}", ext)
            }
            FmmError::MatVariableNotFound {
                expected,
                available,
            } => {
                write!(
                    f,
                    "MAT variable '{}' not found; available variables: {:?}",
                    expected, available
                )
            }
            FmmError::IoError(e) => write!(f, "I/O error: {}", e),
            FmmError::Other(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for FmmError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FmmError::IoError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for FmmError {
    fn from(e: std::io::Error) -> Self {
        FmmError::IoError(e)
    }
}

/// Convenience type alias for Results with FmmError.
pub type Result<T> = std::result::Result<T, FmmError>;
