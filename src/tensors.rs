// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

use std::sync::Arc;

use crate::core::check_shape;
use crate::error::{FmmError, Result};

/// A symmetric 2x2 tensor `{{s11, s12}, {s12, s22}}`.
///
/// The solver treats it as a metric: the time to move by `y` is
/// `sqrt(y' S y)`. It should be positive-semidefinite; this is not checked.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tensor {
    /// Element (1,1).
    pub s11: f32,
    /// Off-diagonal element.
    pub s12: f32,
    /// Element (2,2).
    pub s22: f32,
}

impl Tensor {
    /// The identity tensor.
    pub const IDENTITY: Tensor = Tensor {
        s11: 1.0,
        s12: 0.0,
        s22: 1.0,
    };

    /// Create a tensor from its three distinct elements.
    pub const fn new(s11: f32, s12: f32, s22: f32) -> Self {
        Tensor { s11, s12, s22 }
    }

    /// Tensor with eigenvalue `su` along the unit vector at `angle` (radians,
    /// measured from the 1st axis toward the 2nd) and eigenvalue `sv` along
    /// the orthogonal direction.
    pub fn oriented(angle: f32, su: f32, sv: f32) -> Self {
        let (sina, cosa) = angle.sin_cos();
        Tensor {
            s11: su * cosa * cosa + sv * sina * sina,
            s12: (su - sv) * sina * cosa,
            s22: sv * cosa * cosa + su * sina * sina,
        }
    }

    /// The bilinear form `a' S b`.
    #[inline]
    pub fn form(&self, a: [f32; 2], b: [f32; 2]) -> f32 {
        let z1 = self.s11 * b[0] + self.s12 * b[1];
        let z2 = self.s12 * b[0] + self.s22 * b[1];
        a[0] * z1 + a[1] * z2
    }

    /// Determinant `s11 * s22 - s12^2`.
    pub fn determinant(&self) -> f32 {
        self.s11 * self.s22 - self.s12 * self.s12
    }
}

impl Default for Tensor {
    fn default() -> Self {
        Tensor::IDENTITY
    }
}

/// A source of per-cell tensors.
///
/// The solver queries the tensor of a cell each time it recomputes that
/// cell's time, so implementations should be cheap and must not depend on
/// call order.
pub trait Tensors {
    /// Tensor at cell `(i1, i2)`.
    fn tensor(&self, i1: usize, i2: usize) -> Tensor;

    /// Shape `(n1, n2)` the source is defined on, or `None` if it covers
    /// any grid.
    fn shape(&self) -> Option<(usize, usize)> {
        None
    }
}

impl<T: Tensors + ?Sized> Tensors for &T {
    fn tensor(&self, i1: usize, i2: usize) -> Tensor {
        (**self).tensor(i1, i2)
    }

    fn shape(&self) -> Option<(usize, usize)> {
        (**self).shape()
    }
}

impl<T: Tensors + ?Sized> Tensors for Box<T> {
    fn tensor(&self, i1: usize, i2: usize) -> Tensor {
        (**self).tensor(i1, i2)
    }

    fn shape(&self) -> Option<(usize, usize)> {
        (**self).shape()
    }
}

impl<T: Tensors + ?Sized> Tensors for Arc<T> {
    fn tensor(&self, i1: usize, i2: usize) -> Tensor {
        (**self).tensor(i1, i2)
    }

    fn shape(&self) -> Option<(usize, usize)> {
        (**self).shape()
    }
}

/// Identity tensors everywhere (isotropic, unit speed).
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityTensors;

impl Tensors for IdentityTensors {
    fn tensor(&self, _i1: usize, _i2: usize) -> Tensor {
        Tensor::IDENTITY
    }
}

/// The same tensor at every cell.
#[derive(Debug, Clone, Copy)]
pub struct ConstantTensors {
    tensor: Tensor,
}

impl ConstantTensors {
    /// Constant tensor `{{s11, s12}, {s12, s22}}`.
    pub fn new(s11: f32, s12: f32, s22: f32) -> Self {
        ConstantTensors {
            tensor: Tensor::new(s11, s12, s22),
        }
    }

    /// Constant tensor built by [`Tensor::oriented`].
    pub fn oriented(angle: f32, su: f32, sv: f32) -> Self {
        ConstantTensors {
            tensor: Tensor::oriented(angle, su, sv),
        }
    }
}

impl From<Tensor> for ConstantTensors {
    fn from(tensor: Tensor) -> Self {
        ConstantTensors { tensor }
    }
}

impl Tensors for ConstantTensors {
    fn tensor(&self, _i1: usize, _i2: usize) -> Tensor {
        self.tensor
    }
}

/// A tensor stored per cell, row-major with `i1` fastest.
#[derive(Debug, Clone)]
pub struct FieldTensors {
    n1: usize,
    n2: usize,
    data: Box<[Tensor]>,
}

impl FieldTensors {
    /// Build a field from three element arrays, each of length `n1 * n2`.
    ///
    /// # Errors
    /// Returns an error if a dimension is zero or an array has the wrong
    /// length.
    pub fn new(n1: usize, n2: usize, s11: &[f32], s12: &[f32], s22: &[f32]) -> Result<Self> {
        check_shape(n1, n2)?;
        let num = n1 * n2;
        for arr in [s11, s12, s22] {
            if arr.len() != num {
                return Err(FmmError::ShapeMismatch {
                    expected: vec![n2, n1],
                    got: vec![arr.len()],
                });
            }
        }
        let data = s11
            .iter()
            .zip(s12)
            .zip(s22)
            .map(|((&a, &b), &c)| Tensor::new(a, b, c))
            .collect::<Vec<_>>()
            .into_boxed_slice();
        Ok(FieldTensors { n1, n2, data })
    }

    /// Build a field by evaluating `f(i1, i2)` at every cell.
    ///
    /// # Errors
    /// Returns an error if a dimension is zero.
    pub fn from_fn<F>(n1: usize, n2: usize, mut f: F) -> Result<Self>
    where
        F: FnMut(usize, usize) -> Tensor,
    {
        check_shape(n1, n2)?;
        let mut data = Vec::with_capacity(n1 * n2);
        for i2 in 0..n2 {
            for i1 in 0..n1 {
                data.push(f(i1, i2));
            }
        }
        Ok(FieldTensors {
            n1,
            n2,
            data: data.into_boxed_slice(),
        })
    }

    /// Field shape as `(n1, n2)`.
    pub fn shape(&self) -> (usize, usize) {
        (self.n1, self.n2)
    }

    /// Tensors in row-major order with `i1` fastest.
    pub fn as_slice(&self) -> &[Tensor] {
        &self.data
    }
}

impl Tensors for FieldTensors {
    /// # Panics
    /// Panics if `(i1, i2)` is outside the field.
    fn tensor(&self, i1: usize, i2: usize) -> Tensor {
        assert!(
            i1 < self.n1 && i2 < self.n2,
            "({}, {}) outside {}x{} tensor field",
            i1,
            i2,
            self.n1,
            self.n2
        );
        self.data[i2 * self.n1 + i1]
    }

    fn shape(&self) -> Option<(usize, usize)> {
        Some((self.n1, self.n2))
    }
}
