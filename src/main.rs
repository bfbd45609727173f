// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use eikonal_fmm::io;
use eikonal_fmm::{ConstantTensors, FmmSolver, IdentityTensors, Stencil, Tensors, INFINITY};

#[derive(Parser)]
#[command(
    name = "eikonal-fmm",
    about = "Anisotropic fast marching eikonal solver on 2D grids"
)]
struct Cli {
    /// Grid size as n1,n2 (n1 is the fast axis)
    #[arg(short = 's', long)]
    size: String,

    /// Stencil: 4 or 8 neighbors
    #[arg(long, default_value = "8")]
    stencil: Stencil,

    /// Tensor field: "identity", "constant:<s11>,<s12>,<s22>",
    /// "oriented:<degrees>,<su>,<sv>", or "file:<path>"
    #[arg(long, default_value = "identity")]
    tensors: String,

    /// Seed cell as i1,i2 (repeatable; seeds are applied in order)
    #[arg(long, num_args = 1)]
    seed: Vec<String>,

    /// Initial times (.npy or .mat); cells are only lowered
    #[arg(long)]
    times_in: Option<PathBuf>,

    /// Output file path (.npy or .mat)
    #[arg(short = 'o', long, default_value = "times.npy")]
    output: PathBuf,

    /// Log solver progress at debug level
    #[arg(short = 'v', long)]
    verbose: bool,
}

fn parse_pair(s: &str, what: &str) -> Result<(usize, usize)> {
    let parts: Vec<usize> = s
        .split(',')
        .map(|p| p.trim().parse::<usize>())
        .collect::<std::result::Result<Vec<_>, _>>()
        .with_context(|| format!("invalid {}: expected two comma-separated integers", what))?;
    if parts.len() != 2 {
        bail!("{} has {} components, expected 2", what, parts.len());
    }
    Ok((parts[0], parts[1]))
}

fn parse_floats(s: &str, what: &str) -> Result<[f32; 3]> {
    let parts: Vec<f32> = s
        .split(',')
        .map(|p| p.trim().parse::<f32>())
        .collect::<std::result::Result<Vec<_>, _>>()
        .with_context(|| format!("invalid {} parameters '{}'", what, s))?;
    match parts[..] {
        [a, b, c] => Ok([a, b, c]),
        _ => bail!("{} expects 3 comma-separated values, got {}", what, parts.len()),
    }
}

fn build_tensors(mode: &str, n1: usize, n2: usize) -> Result<Box<dyn Tensors>> {
    if mode == "identity" {
        return Ok(Box::new(IdentityTensors));
    }

    if let Some(params) = mode.strip_prefix("constant:") {
        let [s11, s12, s22] = parse_floats(params, "constant")?;
        return Ok(Box::new(ConstantTensors::new(s11, s12, s22)));
    }

    if let Some(params) = mode.strip_prefix("oriented:") {
        let [degrees, su, sv] = parse_floats(params, "oriented")?;
        if su < 0.0 || sv < 0.0 {
            bail!("oriented: eigenvalues must be non-negative, got {}, {}", su, sv);
        }
        return Ok(Box::new(ConstantTensors::oriented(
            degrees.to_radians(),
            su,
            sv,
        )));
    }

    if let Some(path_str) = mode.strip_prefix("file:") {
        let field = io::load_tensor_field(Path::new(path_str), n1, n2)
            .with_context(|| format!("failed to load tensor field from {}", path_str))?;
        return Ok(Box::new(field));
    }

    bail!(
        "unknown --tensors mode: '{}'. Expected 'identity', 'constant:<s11>,<s12>,<s22>', \
         'oriented:<degrees>,<su>,<sv>', or 'file:<path>'",
        mode
    );
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    if cli.seed.is_empty() {
        bail!("at least one --seed must be specified");
    }

    let (n1, n2) = parse_pair(&cli.size, "--size")?;
    let seeds = cli
        .seed
        .iter()
        .map(|s| parse_pair(s, "--seed"))
        .collect::<Result<Vec<_>>>()?;
    let tensors = build_tensors(&cli.tensors, n1, n2)?;

    let mut solver = match &cli.times_in {
        Some(path) => {
            let times = io::load_times(path, n1, n2)
                .with_context(|| format!("failed to load times from {}", path.display()))?;
            FmmSolver::with_times(times, cli.stencil, tensors)?
        }
        None => FmmSolver::new(n1, n2, cli.stencil, tensors)?,
    };

    for &(i1, i2) in &seeds {
        solver
            .zero_at(i1, i2)
            .with_context(|| format!("failed to solve from seed ({}, {})", i1, i2))?;
        let stats = solver.stats();
        info!(
            i1,
            i2,
            commits = stats.commits,
            elapsed_ms = stats.elapsed.as_secs_f64() * 1e3,
            "seed applied"
        );
    }

    let times = solver.times();
    let reached = times.as_slice().iter().filter(|&&t| t < INFINITY).count();
    let max_time = times
        .as_slice()
        .iter()
        .copied()
        .filter(|&t| t < INFINITY)
        .fold(0.0_f32, f32::max);
    info!(
        reached,
        cells = times.len(),
        max_time,
        "solve complete"
    );

    io::save_times(times, &cli.output)
        .with_context(|| format!("failed to write {}", cli.output.display()))?;
    info!(path = %cli.output.display(), "wrote times");

    Ok(())
}
