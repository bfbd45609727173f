// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

use crate::tensors::Tensor;

/// Time at X0 reached in a straight line from a single known vertex.
///
/// Returns `t + sqrt(y' S y)`, where `y` is the displacement from the known
/// vertex to X0. A negative quadratic form (non-PSD tensor) is clamped to
/// zero; a NaN form stays NaN so the candidate is never accepted.
#[inline]
pub fn vertex_time(s: &Tensor, t: f32, y: [f32; 2]) -> f32 {
    t + clamp_radicand(s.form(y, y)).sqrt()
}

/// Clamp negative values to zero. Unlike `f32::max`, NaN passes through.
#[inline]
fn clamp_radicand(dd: f32) -> f32 {
    if dd < 0.0 {
        0.0
    } else {
        dd
    }
}

/// Time at X0 reached through the edge between two known vertices X1, X2.
///
/// The wavefront is assumed planar across the edge: the point
/// `X2 + a * y1` on the edge is reached at `u2 + a * u1`, and from there the
/// time to X0 is the anisotropic length of `y2 - a * y1`. Returns the minimum
///
/// `t(a) = u2 + a*u1 + sqrt((y2 - a*y1)' S (y2 - a*y1))`
///
/// subject to `0 <= a <= 1`, where `u1 = T1 - T2`, `u2 = T2`, `y1 = X1 - X2`
/// and `y2 = X0 - X2`. At `a = 0` and `a = 1` this equals [`vertex_time`]
/// from X2 and X1 respectively.
#[inline]
pub fn edge_time(s: &Tensor, u1: f32, u2: f32, y1: [f32; 2], y2: [f32; 2]) -> f32 {
    let d11 = s.form(y1, y1);
    let d12 = s.form(y1, y2);
    let d22 = s.form(y2, y2);
    let alpha = compute_alpha(u1, d11, d12, d22);
    let dd = d22 - 2.0 * alpha * d12 + alpha * alpha * d11;
    u2 + alpha * u1 + clamp_radicand(dd).sqrt()
}

/// The `a` in `[0, 1]` that minimizes `a*u1 + sqrt(d22 - 2*a*d12 + a*a*d11)`.
///
/// The stationary point of the unconstrained problem is
/// `(d12 - u1 * sqrt(det / (d11 - u1^2))) / d11`. When `d11 - u1^2 <= 0` the
/// time difference along the edge is at least as steep as the metric allows,
/// so the minimum lies on the endpoint with the smaller time. NaN inputs
/// yield NaN.
#[inline]
pub fn compute_alpha(u1: f32, d11: f32, d12: f32, d22: f32) -> f32 {
    let det = clamp_radicand(d11 * d22 - d12 * d12);
    let du = d11 - u1 * u1;
    if du <= 0.0 {
        return if u1 >= 0.0 { 0.0 } else { 1.0 };
    }
    let alpha = (d12 - u1 * (det / du).sqrt()) / d11;
    if alpha <= 0.0 {
        0.0
    } else if alpha >= 1.0 {
        1.0
    } else {
        alpha
    }
}
