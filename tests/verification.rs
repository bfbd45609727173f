// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

use approx::assert_relative_eq;

use eikonal_fmm::io;
use eikonal_fmm::{
    CommitInfo, ConstantTensors, FieldTensors, FmmSolver, IdentityTensors, Mark, Stencil, Tensor,
    Tensors, TimeGrid, INFINITY,
};

/// Largest absolute difference between computed times and `exact(i1, i2)`.
fn max_error(times: &TimeGrid, exact: impl Fn(usize, usize) -> f64) -> f64 {
    let mut max_err = 0.0_f64;
    for i2 in 0..times.n2() {
        for i1 in 0..times.n1() {
            let err = (times.get(i1, i2) as f64 - exact(i1, i2)).abs();
            max_err = max_err.max(err);
        }
    }
    max_err
}

fn distance(i1: usize, i2: usize, s1: usize, s2: usize) -> f64 {
    let d1 = i1 as f64 - s1 as f64;
    let d2 = i2 as f64 - s2 as f64;
    (d1 * d1 + d2 * d2).sqrt()
}

/// Solve and return the commit sequence as (i1, i2, time).
fn commit_order<T: Tensors>(solver: &mut FmmSolver<T>, i1: usize, i2: usize) -> Vec<CommitInfo> {
    let mut order = Vec::new();
    let mut record = |info: CommitInfo| order.push(info);
    solver.zero_at_with(i1, i2, Some(&mut record)).unwrap();
    order
}

/// 5x5, identity tensors, 4 neighbors, seed at the center.
///
/// Axis neighbors are reached by the vertex update. Diagonal neighbors are
/// reached by the planar update across the edge between two axis neighbors,
/// which gives 1 + 1/sqrt(2) rather than the Euclidean sqrt(2).
#[test]
fn five_by_five_four_neighbors() {
    let mut solver = FmmSolver::isotropic(5, 5, Stencil::Four).unwrap();
    let times = solver.zero_at(2, 2).unwrap();

    assert_eq!(times.get(2, 2), 0.0);
    for (i1, i2) in [(3, 2), (1, 2), (2, 3), (2, 1)] {
        assert_eq!(times.get(i1, i2), 1.0, "axis neighbor ({}, {})", i1, i2);
    }
    for (i1, i2) in [(1, 1), (3, 1), (1, 3), (3, 3)] {
        assert_relative_eq!(times.get(i1, i2), 1.707_106_8, epsilon = 1e-5);
    }
    assert_relative_eq!(times.get(0, 2), 2.0, epsilon = 1e-5);
    assert_relative_eq!(times.get(1, 0), 2.545_329, epsilon = 1e-4);
    assert_relative_eq!(times.get(0, 0), 3.252_436, epsilon = 1e-4);
}

#[test]
fn five_by_five_eight_neighbors() {
    let mut solver = FmmSolver::isotropic(5, 5, Stencil::Eight).unwrap();
    let times = solver.zero_at(2, 2).unwrap();

    assert_eq!(times.get(3, 2), 1.0);
    assert_relative_eq!(times.get(1, 1), 2.0_f32.sqrt(), epsilon = 1e-6);
    assert_relative_eq!(times.get(3, 4), 2.3244, epsilon = 1e-3);
    assert_relative_eq!(times.get(4, 4), 2.0 * 2.0_f32.sqrt(), epsilon = 1e-5);
}

/// Homogeneous isotropic medium: errors against Euclidean distance stay
/// bounded, and the 8-neighbor stencil is more accurate than 4 neighbors.
#[test]
fn isotropic_point_source_accuracy() {
    let n = 41;
    let c = n / 2;

    let mut err = [0.0; 2];
    for (k, stencil) in [Stencil::Four, Stencil::Eight].into_iter().enumerate() {
        let mut solver = FmmSolver::isotropic(n, n, stencil).unwrap();
        let times = solver.zero_at(c, c).unwrap();
        err[k] = max_error(times, |i1, i2| distance(i1, i2, c, c));
    }

    assert!(err[1] < 0.3, "8-neighbor max error = {}", err[1]);
    assert!(err[0] < 1.2, "4-neighbor max error = {}", err[0]);
    assert!(
        err[1] < err[0],
        "8 neighbors ({}) should beat 4 neighbors ({})",
        err[1],
        err[0]
    );
}

#[test]
fn corner_seed_accuracy() {
    let n = 33;
    let mut solver = FmmSolver::isotropic(n, n, Stencil::Eight).unwrap();
    let times = solver.zero_at(0, 0).unwrap();
    let err = max_error(times, |i1, i2| distance(i1, i2, 0, 0));
    assert!(err < 0.32, "max error = {}", err);

    // Along the axes the vertex update is exact.
    for i in 0..n {
        assert_eq!(times.get(i, 0), i as f32);
        assert_eq!(times.get(0, i), i as f32);
    }
}

/// Axis-aligned anisotropy: the time to move by (d1, d2) is
/// sqrt(s11 d1^2 + s22 d2^2).
#[test]
fn diagonal_tensor_accuracy() {
    let (n1, n2) = (31, 17);
    let (s1, s2) = (3, 5);
    let tensors = ConstantTensors::new(2.0, 0.0, 0.5);
    let mut solver = FmmSolver::new(n1, n2, Stencil::Eight, tensors).unwrap();
    let times = solver.zero_at(s1, s2).unwrap();

    let err = max_error(times, |i1, i2| {
        let d1 = i1 as f64 - s1 as f64;
        let d2 = i2 as f64 - s2 as f64;
        (2.0 * d1 * d1 + 0.5 * d2 * d2).sqrt()
    });
    assert!(err < 0.45, "max error = {}", err);
    assert_relative_eq!(times.get(s1 + 4, s2), 4.0 * 2.0_f32.sqrt(), epsilon = 1e-5);
    assert_relative_eq!(times.get(s1, s2 + 4), 4.0 * 0.5_f32.sqrt(), epsilon = 1e-5);
}

#[test]
fn multiple_seeds_take_the_minimum() {
    let n = 41;
    let seeds = [(10, 20), (30, 20)];
    let mut solver = FmmSolver::isotropic(n, n, Stencil::Eight).unwrap();
    for &(i1, i2) in &seeds {
        solver.zero_at(i1, i2).unwrap();
    }
    let times = solver.times();
    for &(i1, i2) in &seeds {
        assert_eq!(times.get(i1, i2), 0.0);
    }
    let err = max_error(times, |i1, i2| {
        seeds
            .iter()
            .map(|&(s1, s2)| distance(i1, i2, s1, s2))
            .fold(f64::INFINITY, f64::min)
    });
    assert!(err < 0.3, "max error = {}", err);
}

#[test]
fn seeding_twice_is_idempotent() {
    let tensors = ConstantTensors::oriented(0.4, 0.3, 1.0);
    let mut solver = FmmSolver::new(23, 19, Stencil::Eight, tensors).unwrap();
    let first = solver.zero_at(7, 11).unwrap().clone();
    let second = solver.zero_at(7, 11).unwrap();
    assert_eq!(&first, second);
}

/// For isotropic and axis-aligned tensors, cells are committed in
/// nondecreasing time order, up to rounding.
#[test]
fn commit_order_is_monotone() {
    let cases: [(Tensor, Stencil); 4] = [
        (Tensor::IDENTITY, Stencil::Four),
        (Tensor::IDENTITY, Stencil::Eight),
        (Tensor::new(2.0, 0.0, 0.5), Stencil::Four),
        (Tensor::new(2.0, 0.0, 0.5), Stencil::Eight),
    ];
    for (tensor, stencil) in cases {
        let mut solver = FmmSolver::new(31, 17, stencil, ConstantTensors::from(tensor)).unwrap();
        let order = commit_order(&mut solver, 3, 5);
        assert_eq!(order.len(), 31 * 17);

        let mut last = 0.0_f32;
        for info in &order {
            let tol = 1e-5 * last.max(1.0);
            assert!(
                info.time >= last - tol,
                "{:?} {}: ({}, {}) committed at {} after {}",
                tensor,
                stencil,
                info.i1,
                info.i2,
                info.time,
                last
            );
            last = last.max(info.time);
        }
    }
}

/// Strongly anisotropic tensors can produce triangles that are obtuse in the
/// tensor metric. The solve still reaches every cell with finite times.
#[test]
fn strong_anisotropy_reaches_every_cell() {
    let tensors = ConstantTensors::oriented(110.0_f32.to_radians(), 0.01, 1.0);
    let mut solver = FmmSolver::new(40, 30, Stencil::Eight, tensors).unwrap();
    let order = commit_order(&mut solver, 20, 15);
    assert_eq!(order.len(), 40 * 30);
    assert!(solver
        .times()
        .as_slice()
        .iter()
        .all(|&t| t.is_finite() && t >= 0.0 && t < INFINITY));
}

#[test]
fn times_before_seeding_are_infinite() {
    let solver = FmmSolver::isotropic(6, 4, Stencil::Four).unwrap();
    assert!(solver.times().as_slice().iter().all(|&t| t == INFINITY));
    assert_eq!(solver.mark(5, 3).unwrap(), Mark::Far);
}

#[test]
fn single_cell_grid() {
    for stencil in [Stencil::Four, Stencil::Eight] {
        let mut solver = FmmSolver::isotropic(1, 1, stencil).unwrap();
        let times = solver.zero_at(0, 0).unwrap();
        assert_eq!(times.as_slice(), &[0.0]);
        assert_eq!(solver.stats().commits, 1);
        assert!(solver.zero_at(1, 0).is_err());
    }
}

#[test]
fn one_dimensional_grids_propagate() {
    let expected = [2.0, 1.0, 0.0, 1.0, 2.0, 3.0, 4.0];
    for stencil in [Stencil::Four, Stencil::Eight] {
        let mut row = FmmSolver::isotropic(7, 1, stencil).unwrap();
        assert_eq!(row.zero_at(2, 0).unwrap().as_slice(), &expected);

        let mut column = FmmSolver::isotropic(1, 7, stencil).unwrap();
        assert_eq!(column.zero_at(0, 2).unwrap().as_slice(), &expected);
    }
}

/// A column of infinite tensors blocks the wavefront; cells behind it are
/// never reached.
#[test]
fn wall_of_infinite_tensors_is_impassable() {
    let (n1, n2) = (12, 7);
    let wall = 6;
    let tensors = FieldTensors::from_fn(n1, n2, |i1, _| {
        if i1 == wall {
            Tensor::new(f32::INFINITY, 0.0, f32::INFINITY)
        } else {
            Tensor::IDENTITY
        }
    })
    .unwrap();

    let mut solver = FmmSolver::new(n1, n2, Stencil::Eight, tensors).unwrap();
    solver.zero_at(2, 3).unwrap();
    let times = solver.times();
    for i2 in 0..n2 {
        for i1 in 0..n1 {
            let t = times.get(i1, i2);
            assert!(!t.is_nan());
            if i1 < wall {
                assert!(t < INFINITY, "({}, {}) should be reached", i1, i2);
            } else {
                assert_eq!(t, INFINITY, "({}, {}) should be unreached", i1, i2);
                assert_ne!(solver.mark(i1, i2).unwrap(), Mark::Known);
            }
        }
    }
}

#[test]
fn field_tensors_match_constant_tensors() {
    let tensor = Tensor::oriented(0.7, 0.4, 1.5);
    let field = FieldTensors::from_fn(15, 12, |_, _| tensor).unwrap();

    let mut a = FmmSolver::new(15, 12, Stencil::Eight, ConstantTensors::from(tensor)).unwrap();
    let mut b = FmmSolver::new(15, 12, Stencil::Eight, field).unwrap();
    assert_eq!(a.zero_at(4, 9).unwrap(), b.zero_at(4, 9).unwrap());
}

/// Times written to disk can be fed back as upper bounds for further seeds.
#[test]
fn saved_times_resume_a_multi_seed_solve() {
    let n = 21;
    let tmp = std::env::temp_dir().join(format!("eikonal_fmm_resume_{}.npy", std::process::id()));

    let mut direct = FmmSolver::isotropic(n, n, Stencil::Eight).unwrap();
    direct.zero_at(3, 4).unwrap();
    direct.zero_at(17, 15).unwrap();

    let mut first = FmmSolver::isotropic(n, n, Stencil::Eight).unwrap();
    first.zero_at(3, 4).unwrap();
    io::save_times(first.times(), &tmp).unwrap();

    let loaded = io::load_times(&tmp, n, n).unwrap();
    let mut resumed = FmmSolver::with_times(loaded, Stencil::Eight, IdentityTensors).unwrap();
    resumed.zero_at(17, 15).unwrap();

    assert_eq!(resumed.times(), direct.times());
    std::fs::remove_file(&tmp).ok();
}
