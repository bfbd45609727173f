// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

//! Reading and writing time grids and tensor fields.
//!
//! Grids are stored with shape `[n2, n1]`, so the 1st dimension is the
//! fastest-varying (last) axis of the file array. Tensor fields are stored
//! either as one `.npy` array of shape `[n2, n1, 3]` holding `s11, s12, s22`
//! per cell, or as three `.mat` variables `s11`, `s12`, `s22` of shape
//! `[n2, n1]`.

use std::io::Write;
use std::path::Path;

use ndarray::{Array2, Array3, ArrayD, IxDyn, ShapeBuilder};

use crate::core::TimeGrid;
use crate::error::{FmmError, Result};
use crate::tensors::{FieldTensors, Tensor};

/// Variable name used for time grids in `.mat` files.
pub const TIMES_VAR: &str = "times";

/// Supported file formats for grid I/O.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FileFormat {
    /// NumPy .npy format.
    Npy,
    /// MATLAB .mat format (Level 5).
    Mat,
}

/// Infer file format from extension.
pub fn infer_format(path: &Path) -> Result<FileFormat> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("npy") => Ok(FileFormat::Npy),
        Some("mat") => Ok(FileFormat::Mat),
        Some(ext) => Err(FmmError::UnsupportedFileFormat(ext.to_string())),
        None => Err(FmmError::UnsupportedFileFormat(
            "(no extension)".to_string(),
        )),
    }
}

/// Save a time grid, inferring the format from the extension.
pub fn save_times(times: &TimeGrid, path: &Path) -> Result<()> {
    match infer_format(path)? {
        FileFormat::Npy => save_npy_times(times, path),
        FileFormat::Mat => {
            let data = to_f64(times.as_slice());
            let dims = [times.n2(), times.n1()];
            write_mat_level5(path, &[(TIMES_VAR, &dims[..], &data[..])])
        }
    }
}

/// Load a time grid of shape `n1` by `n2`, inferring the format from the
/// extension.
pub fn load_times(path: &Path, n1: usize, n2: usize) -> Result<TimeGrid> {
    let data = match infer_format(path)? {
        FileFormat::Npy => load_npy_f32(path, &[n2, n1])?,
        FileFormat::Mat => load_mat_field(path, TIMES_VAR, &[n2, n1])?,
    };
    TimeGrid::from_vec(n1, n2, data)
}

/// Save a tensor field, inferring the format from the extension.
pub fn save_tensor_field(field: &FieldTensors, path: &Path) -> Result<()> {
    let (n1, n2) = field.shape();
    match infer_format(path)? {
        FileFormat::Npy => {
            let flat: Vec<f32> = field
                .as_slice()
                .iter()
                .flat_map(|t| [t.s11, t.s12, t.s22])
                .collect();
            let arr = Array3::from_shape_vec((n2, n1, 3), flat)
                .map_err(|e| FmmError::Other(format!("shape error: {}", e)))?;
            ndarray_npy::write_npy(path, &arr)
                .map_err(|e| FmmError::Other(format!("npy write error: {}", e)))
        }
        FileFormat::Mat => {
            let element = |f: fn(&Tensor) -> f32| -> Vec<f64> {
                field.as_slice().iter().map(|t| f64::from(f(t))).collect()
            };
            let (s11, s12, s22) = (element(|t| t.s11), element(|t| t.s12), element(|t| t.s22));
            let dims = [n2, n1];
            write_mat_level5(
                path,
                &[
                    ("s11", &dims[..], &s11[..]),
                    ("s12", &dims[..], &s12[..]),
                    ("s22", &dims[..], &s22[..]),
                ],
            )
        }
    }
}

/// Load a tensor field of shape `n1` by `n2`, inferring the format from the
/// extension.
pub fn load_tensor_field(path: &Path, n1: usize, n2: usize) -> Result<FieldTensors> {
    match infer_format(path)? {
        FileFormat::Npy => {
            let flat = load_npy_f32(path, &[n2, n1, 3])?;
            FieldTensors::from_fn(n1, n2, |i1, i2| {
                let k = 3 * (i2 * n1 + i1);
                Tensor::new(flat[k], flat[k + 1], flat[k + 2])
            })
        }
        FileFormat::Mat => {
            let s11 = load_mat_field(path, "s11", &[n2, n1])?;
            let s12 = load_mat_field(path, "s12", &[n2, n1])?;
            let s22 = load_mat_field(path, "s22", &[n2, n1])?;
            FieldTensors::new(n1, n2, &s11, &s12, &s22)
        }
    }
}

/// Save a time grid to a .npy file as an `f32` array of shape `[n2, n1]`.
pub fn save_npy_times(times: &TimeGrid, path: &Path) -> Result<()> {
    let arr = Array2::from_shape_vec((times.n2(), times.n1()), times.as_slice().to_vec())
        .map_err(|e| FmmError::Other(format!("shape error: {}", e)))?;
    ndarray_npy::write_npy(path, &arr)
        .map_err(|e| FmmError::Other(format!("npy write error: {}", e)))
}

/// Load an `f32` or `f64` array from a .npy file, checking its shape, and
/// return its elements in row-major order as `f32`.
pub fn load_npy_f32(path: &Path, expected_shape: &[usize]) -> Result<Vec<f32>> {
    let arr: ArrayD<f32> = match ndarray_npy::read_npy(path) {
        Ok(a) => a,
        Err(_) => {
            let arr64: ArrayD<f64> = ndarray_npy::read_npy(path)
                .map_err(|e| FmmError::UnsupportedDtype(format!("{}", e)))?;
            arr64.mapv(|v| v as f32)
        }
    };

    if arr.shape() != expected_shape {
        return Err(FmmError::ShapeMismatch {
            expected: expected_shape.to_vec(),
            got: arr.shape().to_vec(),
        });
    }

    // Logical iteration order is row-major even for Fortran-order files.
    Ok(arr.iter().copied().collect())
}

/// Load a numeric variable from a .mat file, checking its shape, and return
/// its elements in row-major order as `f32`.
///
/// A variable stored with the reversed shape is transposed.
pub fn load_mat_field(
    path: &Path,
    variable_name: &str,
    expected_shape: &[usize],
) -> Result<Vec<f32>> {
    let file = std::fs::File::open(path)?;
    let mut reader = std::io::BufReader::new(file);
    let mat = matfile::MatFile::parse(&mut reader)
        .map_err(|e| FmmError::Other(format!("MAT parse error: {}", e)))?;

    let array = mat
        .find_by_name(variable_name)
        .ok_or_else(|| FmmError::MatVariableNotFound {
            expected: variable_name.to_string(),
            available: mat.arrays().iter().map(|a| a.name().to_string()).collect(),
        })?;

    let data: Vec<f32> = match array.data() {
        matfile::NumericData::Double { real, imag: _ } => {
            real.iter().map(|&v| v as f32).collect()
        }
        matfile::NumericData::Single { real, imag: _ } => real.clone(),
        _ => {
            return Err(FmmError::UnsupportedDtype(format!(
                "MAT variable '{}' is not f64 or f32",
                variable_name
            )))
        }
    };

    let mat_shape: Vec<usize> = array.size().to_vec();
    let reversed: Vec<usize> = expected_shape.iter().rev().copied().collect();
    let transpose = if mat_shape == expected_shape {
        false
    } else if mat_shape == reversed {
        true
    } else {
        return Err(FmmError::ShapeMismatch {
            expected: expected_shape.to_vec(),
            got: mat_shape,
        });
    };

    // MAT data is column-major in the file's own shape.
    let arr = ArrayD::from_shape_vec(IxDyn(&mat_shape).f(), data)
        .map_err(|e| FmmError::Other(format!("shape error: {}", e)))?;
    let arr = if transpose { arr.reversed_axes() } else { arr };
    Ok(arr.iter().copied().collect())
}

fn to_f64(data: &[f32]) -> Vec<f64> {
    data.iter().map(|&v| f64::from(v)).collect()
}

// MAT-File Level 5 data types and array classes.
const MI_INT8: u32 = 1;
const MI_INT32: u32 = 5;
const MI_UINT32: u32 = 6;
const MI_DOUBLE: u32 = 9;
const MI_MATRIX: u32 = 14;
const MX_DOUBLE_CLASS: u32 = 6;

/// Bytes a data element occupies: 8-byte tag plus payload padded to 8.
fn element_len(payload: usize) -> usize {
    8 + payload.div_ceil(8) * 8
}

fn to_u32(n: usize) -> Result<u32> {
    u32::try_from(n).map_err(|_| FmmError::Other(format!("MAT element too large: {} bytes", n)))
}

fn write_element<W: Write>(w: &mut W, data_type: u32, payload: &[u8]) -> Result<()> {
    w.write_all(&data_type.to_le_bytes())?;
    w.write_all(&to_u32(payload.len())?.to_le_bytes())?;
    w.write_all(payload)?;
    let pad = element_len(payload.len()) - 8 - payload.len();
    w.write_all(&[0u8; 8][..pad])?;
    Ok(())
}

/// Minimal uncompressed MAT-File Level 5 writer for real `f64` arrays.
///
/// Each variable is `(name, dims, data)` with `data` in row-major order for
/// `dims`; it is written column-major as MATLAB expects. The `matfile` crate
/// only reads, so writing is done here.
fn write_mat_level5(path: &Path, vars: &[(&str, &[usize], &[f64])]) -> Result<()> {
    let file = std::fs::File::create(path)?;
    let mut w = std::io::BufWriter::new(file);

    // 116 bytes of text, 8 bytes subsystem offset, version 0x0100, "IM".
    let mut header = [b' '; 116];
    let desc = b"MATLAB 5.0 MAT-file, created by eikonal-fmm";
    header[..desc.len()].copy_from_slice(desc);
    w.write_all(&header)?;
    w.write_all(&[0u8; 8])?;
    w.write_all(&0x0100u16.to_le_bytes())?;
    w.write_all(b"IM")?;

    for &(name, dims, data) in vars {
        let expected: usize = dims.iter().product();
        if data.len() != expected {
            return Err(FmmError::ShapeMismatch {
                expected: dims.to_vec(),
                got: vec![data.len()],
            });
        }

        let flags: Vec<u8> = [MX_DOUBLE_CLASS, 0]
            .iter()
            .flat_map(|v| v.to_le_bytes())
            .collect();
        let mut dim_bytes = Vec::with_capacity(4 * dims.len());
        for &d in dims {
            let d = i32::try_from(d)
                .map_err(|_| FmmError::Other(format!("MAT dimension too large: {}", d)))?;
            dim_bytes.extend_from_slice(&d.to_le_bytes());
        }
        let arr = ArrayD::from_shape_vec(IxDyn(dims), data.to_vec())
            .map_err(|e| FmmError::Other(format!("shape error: {}", e)))?;
        let real: Vec<u8> = arr.t().iter().flat_map(|v| v.to_le_bytes()).collect();

        let matrix_len = element_len(flags.len())
            + element_len(dim_bytes.len())
            + element_len(name.len())
            + element_len(real.len());
        w.write_all(&MI_MATRIX.to_le_bytes())?;
        w.write_all(&to_u32(matrix_len)?.to_le_bytes())?;
        write_element(&mut w, MI_UINT32, &flags)?;
        write_element(&mut w, MI_INT32, &dim_bytes)?;
        write_element(&mut w, MI_INT8, name.as_bytes())?;
        write_element(&mut w, MI_DOUBLE, &real)?;
    }

    w.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::INFINITY;
    use crate::tensors::Tensors;

    fn temp_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("eikonal_fmm_{}_{}", std::process::id(), name))
    }

    /// A 3x2 grid with distinct values and one unreached cell.
    fn make_test_times() -> TimeGrid {
        let mut times = TimeGrid::new(3, 2).unwrap();
        for i2 in 0..2 {
            for i1 in 0..3 {
                times.set(i1, i2, (10 * i2 + i1) as f32 * 0.5);
            }
        }
        times.set(2, 1, INFINITY);
        times
    }

    fn make_test_field() -> FieldTensors {
        FieldTensors::from_fn(3, 2, |i1, i2| {
            Tensor::new(1.0 + i1 as f32, 0.25 * i2 as f32, 2.0 + i1 as f32 + i2 as f32)
        })
        .unwrap()
    }

    #[test]
    fn npy_times_roundtrip() {
        let times = make_test_times();
        let tmp = temp_path("times.npy");
        save_times(&times, &tmp).unwrap();
        let loaded = load_times(&tmp, 3, 2).unwrap();
        assert_eq!(loaded, times);
        std::fs::remove_file(&tmp).ok();
    }

    #[test]
    fn npy_shape_mismatch() {
        let times = make_test_times();
        let tmp = temp_path("mismatch.npy");
        save_times(&times, &tmp).unwrap();
        let result = load_times(&tmp, 2, 3);
        assert!(matches!(result, Err(FmmError::ShapeMismatch { .. })));
        std::fs::remove_file(&tmp).ok();
    }

    #[test]
    fn npy_f64_is_accepted() {
        let tmp = temp_path("f64.npy");
        let arr = Array2::from_shape_vec((2, 2), vec![0.0f64, 1.0, 2.0, 3.5]).unwrap();
        ndarray_npy::write_npy(&tmp, &arr).unwrap();
        let loaded = load_times(&tmp, 2, 2).unwrap();
        assert_eq!(loaded.get(1, 1), 3.5);
        assert_eq!(loaded.get(0, 1), 2.0);
        std::fs::remove_file(&tmp).ok();
    }

    #[test]
    fn mat_times_readable_by_matfile() {
        let times = make_test_times();
        let tmp = temp_path("times.mat");
        save_times(&times, &tmp).unwrap();

        let file = std::fs::File::open(&tmp).unwrap();
        let mut reader = std::io::BufReader::new(file);
        let mat = matfile::MatFile::parse(&mut reader).unwrap();
        let arr = mat.find_by_name(TIMES_VAR).unwrap();
        assert_eq!(arr.size(), &vec![2, 3]);
        match arr.data() {
            matfile::NumericData::Double { real, imag: _ } => {
                // Column-major: (i2=0,i1=0), (i2=1,i1=0), (i2=0,i1=1), ...
                assert_eq!(real[0], 0.0);
                assert_eq!(real[1], 5.0);
                assert_eq!(real[2], 0.5);
            }
            _ => panic!("Expected double data"),
        }
        std::fs::remove_file(&tmp).ok();
    }

    #[test]
    fn mat_times_roundtrip() {
        let times = make_test_times();
        let tmp = temp_path("roundtrip.mat");
        save_times(&times, &tmp).unwrap();
        let loaded = load_times(&tmp, 3, 2).unwrap();
        assert_eq!(loaded, times);
        std::fs::remove_file(&tmp).ok();
    }

    #[test]
    fn mat_transposed_variable_is_reoriented() {
        // Stored as [n1, n2] = [3, 2] instead of [n2, n1].
        let tmp = temp_path("transposed.mat");
        let row_major_n1_n2: Vec<f64> = vec![0.0, 5.0, 0.5, 5.5, 1.0, 6.0];
        write_mat_level5(&tmp, &[(TIMES_VAR, &[3, 2][..], &row_major_n1_n2[..])]).unwrap();
        let loaded = load_times(&tmp, 3, 2).unwrap();
        assert_eq!(loaded.get(1, 0), 0.5);
        assert_eq!(loaded.get(0, 1), 5.0);
        assert_eq!(loaded.get(2, 1), 6.0);
        std::fs::remove_file(&tmp).ok();
    }

    #[test]
    fn mat_missing_variable() {
        let times = make_test_times();
        let tmp = temp_path("missing.mat");
        save_times(&times, &tmp).unwrap();
        let result = load_tensor_field(&tmp, 3, 2);
        assert!(matches!(
            result,
            Err(FmmError::MatVariableNotFound { ref expected, .. }) if expected == "s11"
        ));
        std::fs::remove_file(&tmp).ok();
    }

    #[test]
    fn tensor_field_roundtrip_both_formats() {
        let field = make_test_field();
        for name in ["field.npy", "field.mat"] {
            let tmp = temp_path(name);
            save_tensor_field(&field, &tmp).unwrap();
            let loaded = load_tensor_field(&tmp, 3, 2).unwrap();
            for i2 in 0..2 {
                for i1 in 0..3 {
                    assert_eq!(loaded.tensor(i1, i2), field.tensor(i1, i2), "{}", name);
                }
            }
            std::fs::remove_file(&tmp).ok();
        }
    }

    #[test]
    fn tensor_field_npy_wrong_shape() {
        let tmp = temp_path("field_bad.npy");
        let arr = Array2::from_shape_vec((2, 3), vec![1.0f32; 6]).unwrap();
        ndarray_npy::write_npy(&tmp, &arr).unwrap();
        let result = load_tensor_field(&tmp, 3, 2);
        assert!(matches!(result, Err(FmmError::ShapeMismatch { .. })));
        std::fs::remove_file(&tmp).ok();
    }

    #[test]
    fn unsupported_format() {
        let result = save_times(&make_test_times(), Path::new("times.xyz"));
        assert!(matches!(result, Err(FmmError::UnsupportedFileFormat(_))));
        assert!(matches!(
            infer_format(Path::new("times")),
            Err(FmmError::UnsupportedFileFormat(_))
        ));
    }
}
