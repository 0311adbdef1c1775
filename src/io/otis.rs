//! OTIS binary model files.
//!
//! Readers and writers for the Oregon State University tidal-inversion
//! binary layouts: grid files (bathymetry + land/water mask + open-boundary
//! indices), elevation files (complex tidal height per constituent) and
//! transport files (complex zonal/meridional transport per constituent).
//!
//! All multi-byte fields are big-endian; integers and floats are 4 bytes.
//! Axis values are cell centers derived from the stored cell-edge limits.
//!
//! # Example
//!
//! ```ignore
//! use tmd_rs::io::{read_otis_grid, read_constituents, read_otis_elevation};
//!
//! let grid = read_otis_grid(Path::new("grid_tpxo9"))?;
//! let names = read_constituents(Path::new("h_tpxo9"))?;
//! let m2 = read_otis_elevation(Path::new("h_tpxo9"), 0)?;
//! println!("{} constituents on a {}x{} grid", names.len(), grid.y.len(), grid.x.len());
//! ```

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use ndarray::{Array1, Array2};

use crate::error::{Result, TideModelError};
use crate::grid::axis::cell_centers;
use crate::grid::field::{Complex64, GridValue, MaskedArray2};

use super::records::{RecordReader, RecordWriter};

/// Contents of an OTIS grid file.
#[derive(Debug, Clone)]
pub struct OtisGrid {
    /// x-coordinates of cell centers (longitude or projected-x)
    pub x: Array1<f64>,
    /// y-coordinates of cell centers (latitude or projected-y)
    pub y: Array1<f64>,
    /// Model bathymetry at cell centers, meters
    pub hz: Array2<f64>,
    /// Land/water mask (1 = water, 0 = land)
    pub mz: Array2<i32>,
    /// Open-boundary indices, shape (nob, 2)
    pub iob: Array2<i32>,
    /// Model time step
    pub dt: f64,
}

fn check_exists(path: &Path) -> Result<()> {
    if !path.exists() {
        return Err(TideModelError::FileNotFound(path.to_path_buf()));
    }
    Ok(())
}

fn read_dim(r: &mut RecordReader<BufReader<File>>, name: &str) -> Result<usize> {
    let v = r.read_i32()?;
    if v <= 0 {
        return Err(TideModelError::Decode {
            offset: r.position()?,
            message: format!("non-positive dimension {}: {}", name, v),
        });
    }
    Ok(v as usize)
}

/// Read an OTIS grid file: model coordinates, bathymetry, mask and
/// open-boundary indices.
///
/// Longitude limits that are both negative while the time step is positive
/// are shifted by +360 degrees (legacy convention fix).
pub fn read_otis_grid(path: &Path) -> Result<OtisGrid> {
    check_exists(path)?;
    let mut r = RecordReader::new(BufReader::new(File::open(path)?));

    r.expect_marker(32)?;
    let nx = read_dim(&mut r, "nx")?;
    let ny = read_dim(&mut r, "ny")?;
    let ylim = [f64::from(r.read_f32()?), f64::from(r.read_f32()?)];
    let mut xlim = [f64::from(r.read_f32()?), f64::from(r.read_f32()?)];
    let dt = f64::from(r.read_f32()?);
    // legacy convention: negative longitude limits with a positive time step
    if xlim[0] < 0.0 && xlim[1] < 0.0 && dt > 0.0 {
        xlim[0] += 360.0;
        xlim[1] += 360.0;
    }
    let nob = r.read_i32()?;
    r.expect_marker(32)?;

    let iob = if nob == 0 {
        r.expect_marker(4)?;
        let _ = r.read_i32()?;
        r.expect_marker(4)?;
        Array2::zeros((0, 2))
    } else {
        let reclen = 8 * nob;
        r.expect_marker(reclen)?;
        let flat = r.read_i32_vec(2 * nob as usize)?;
        r.expect_marker(reclen)?;
        Array2::from_shape_vec((nob as usize, 2), flat).map_err(|e| TideModelError::Decode {
            offset: 0,
            message: format!("open-boundary index shape: {}", e),
        })?
    };

    let reclen = (4 * nx * ny) as i32;
    r.expect_marker(reclen)?;
    let hz_flat = r.read_f32_vec(nx * ny)?;
    r.expect_marker(reclen)?;
    let hz = Array2::from_shape_vec((ny, nx), hz_flat.iter().map(|&v| f64::from(v)).collect())
        .map_err(|e| TideModelError::Decode {
            offset: 0,
            message: format!("bathymetry shape: {}", e),
        })?;

    r.expect_marker(reclen)?;
    let mz_flat = r.read_i32_vec(nx * ny)?;
    r.expect_marker(reclen)?;
    let mz = Array2::from_shape_vec((ny, nx), mz_flat).map_err(|e| TideModelError::Decode {
        offset: 0,
        message: format!("mask shape: {}", e),
    })?;

    let x = cell_centers(xlim[0], xlim[1], nx);
    let y = cell_centers(ylim[0], ylim[1], ny);
    log::debug!(
        "read OTIS grid {}: {}x{} cells, dt = {}",
        path.display(),
        nx,
        ny,
        dt
    );
    Ok(OtisGrid {
        x,
        y,
        hz,
        mz,
        iob,
        dt,
    })
}

/// Read the ordered constituent names from an OTIS/ATLAS elevation or
/// transport file header.
pub fn read_constituents(path: &Path) -> Result<Vec<String>> {
    check_exists(path)?;
    let mut r = RecordReader::new(BufReader::new(File::open(path)?));
    let _ll = r.read_i32()?;
    let _nx = read_dim(&mut r, "nx")?;
    let _ny = read_dim(&mut r, "ny")?;
    let nc = read_dim(&mut r, "nc")?;
    r.skip(16)?; // ylim + xlim
    let raw = r.read_bytes(nc * 4)?;
    let names = raw
        .chunks(4)
        .map(|c| String::from_utf8_lossy(c).trim().to_string())
        .collect();
    Ok(names)
}

fn complex_rows_to_field(
    r: &mut RecordReader<BufReader<File>>,
    ny: usize,
    nx: usize,
) -> Result<MaskedArray2<Complex64>> {
    let mut data = Array2::from_elem((ny, nx), Complex64::new(0.0, 0.0));
    let mut mask = Array2::from_elem((ny, nx), false);
    for j in 0..ny {
        let row = r.read_f32_vec(2 * nx)?;
        for i in 0..nx {
            let re = f64::from(row[2 * i]);
            let im = f64::from(row[2 * i + 1]);
            let v = Complex64::new(re, im);
            if v.is_nan() {
                mask[[j, i]] = true;
                data[[j, i]] = Complex64::nan();
            } else {
                data[[j, i]] = v;
            }
        }
    }
    Ok(MaskedArray2::new(data, mask))
}

/// Read one constituent's complex elevation from an OTIS elevation file.
///
/// The constituent block is located by index with a computed byte offset;
/// decoded NaN cells are masked and replaced by the NaN sentinel.
pub fn read_otis_elevation(path: &Path, ic: usize) -> Result<MaskedArray2<Complex64>> {
    check_exists(path)?;
    let mut r = RecordReader::new(BufReader::new(File::open(path)?));
    let ll = i64::from(r.read_i32()?);
    let nx = read_dim(&mut r, "nx")?;
    let ny = read_dim(&mut r, "ny")?;
    let nc = read_dim(&mut r, "nc")?;
    if ic >= nc {
        return Err(TideModelError::InvalidParameter {
            param: "constituent".to_string(),
            message: format!("index {} out of range for {} constituents", ic, nc),
        });
    }
    r.skip(16)?; // ylim + xlim
    let reclen = (8 * nx * ny) as i64;
    // remaining names, trailing header marker, prior constituent records,
    // then this record's leading marker
    let nskip = ic as i64 * (reclen + 8) + 8 + ll - 28;
    r.skip(nskip - 4)?;
    r.expect_marker(reclen as i32)?;
    let h = complex_rows_to_field(&mut r, ny, nx)?;
    r.expect_marker(reclen as i32)?;
    Ok(h)
}

/// Read one constituent's complex (u, v) transport from an OTIS transport
/// file.
///
/// Each cell stores four floats interleaved as u-real, u-imag, v-real,
/// v-imag; rows are de-interleaved into the two fields.
pub fn read_otis_transport(
    path: &Path,
    ic: usize,
) -> Result<(MaskedArray2<Complex64>, MaskedArray2<Complex64>)> {
    check_exists(path)?;
    let mut r = RecordReader::new(BufReader::new(File::open(path)?));
    let ll = i64::from(r.read_i32()?);
    let nx = read_dim(&mut r, "nx")?;
    let ny = read_dim(&mut r, "ny")?;
    let nc = read_dim(&mut r, "nc")?;
    if ic >= nc {
        return Err(TideModelError::InvalidParameter {
            param: "constituent".to_string(),
            message: format!("index {} out of range for {} constituents", ic, nc),
        });
    }
    r.skip(16)?;
    let reclen = (16 * nx * ny) as i64;
    let nskip = ic as i64 * (reclen + 8) + 8 + ll - 28;
    r.skip(nskip - 4)?;
    r.expect_marker(reclen as i32)?;

    let mut u = MaskedArray2::new(
        Array2::from_elem((ny, nx), Complex64::new(0.0, 0.0)),
        Array2::from_elem((ny, nx), false),
    );
    let mut v = u.clone();
    for j in 0..ny {
        let row = r.read_f32_vec(4 * nx)?;
        for i in 0..nx {
            let uu = Complex64::new(f64::from(row[4 * i]), f64::from(row[4 * i + 1]));
            let vv = Complex64::new(f64::from(row[4 * i + 2]), f64::from(row[4 * i + 3]));
            if uu.is_nan() {
                u.mask[[j, i]] = true;
                u.data[[j, i]] = Complex64::nan();
            } else {
                u.data[[j, i]] = uu;
            }
            if vv.is_nan() {
                v.mask[[j, i]] = true;
                v.data[[j, i]] = Complex64::nan();
            } else {
                v.data[[j, i]] = vv;
            }
        }
    }
    r.expect_marker(reclen as i32)?;
    Ok((u, v))
}

fn name_bytes(name: &str) -> [u8; 4] {
    let mut out = [b' '; 4];
    for (i, b) in name.bytes().take(4).enumerate() {
        out[i] = b;
    }
    out
}

/// Write an OTIS-format grid file.
///
/// `xlim`/`ylim` are the cell-edge limits of the grid; `hz` and `mz` are
/// row-major (y, x).
pub fn output_otis_grid(
    path: &Path,
    xlim: [f64; 2],
    ylim: [f64; 2],
    hz: &Array2<f64>,
    mz: &Array2<i32>,
    iob: &Array2<i32>,
    dt: f64,
) -> Result<()> {
    assert_eq!(hz.dim(), mz.dim(), "bathymetry/mask shape mismatch");
    let (ny, nx) = hz.dim();
    let nob = iob.nrows();
    let mut w = RecordWriter::new(BufWriter::new(File::create(path)?));

    w.write_marker(32)?;
    w.write_i32(nx as i32)?;
    w.write_i32(ny as i32)?;
    w.write_f32(ylim[0] as f32)?;
    w.write_f32(ylim[1] as f32)?;
    w.write_f32(xlim[0] as f32)?;
    w.write_f32(xlim[1] as f32)?;
    w.write_f32(dt as f32)?;
    w.write_i32(nob as i32)?;
    w.write_marker(32)?;

    if nob == 0 {
        w.write_marker(4)?;
        w.write_i32(0)?;
        w.write_marker(4)?;
    } else {
        let reclen = (8 * nob) as i32;
        w.write_marker(reclen)?;
        for row in iob.rows() {
            w.write_i32(row[0])?;
            w.write_i32(row[1])?;
        }
        w.write_marker(reclen)?;
    }

    let reclen = (4 * nx * ny) as i32;
    w.write_marker(reclen)?;
    for j in 0..ny {
        for i in 0..nx {
            w.write_f32(hz[[j, i]] as f32)?;
        }
    }
    w.write_marker(reclen)?;

    w.write_marker(reclen)?;
    for j in 0..ny {
        for i in 0..nx {
            w.write_i32(mz[[j, i]])?;
        }
    }
    w.write_marker(reclen)?;
    Ok(())
}

/// Write an OTIS-format elevation file, one complex field per constituent.
pub fn output_otis_elevation(
    path: &Path,
    h: &[Array2<Complex64>],
    xlim: [f64; 2],
    ylim: [f64; 2],
    constituents: &[String],
) -> Result<()> {
    assert_eq!(
        h.len(),
        constituents.len(),
        "one field per constituent required"
    );
    assert!(!h.is_empty(), "at least one constituent required");
    let (ny, nx) = h[0].dim();
    let nc = h.len();
    let mut w = RecordWriter::new(BufWriter::new(File::create(path)?));

    // header allows one 4-character id per constituent
    let header_length = (4 * (7 + nc)) as i32;
    w.write_marker(header_length)?;
    w.write_i32(nx as i32)?;
    w.write_i32(ny as i32)?;
    w.write_i32(nc as i32)?;
    w.write_f32(ylim[0] as f32)?;
    w.write_f32(ylim[1] as f32)?;
    w.write_f32(xlim[0] as f32)?;
    w.write_f32(xlim[1] as f32)?;
    for name in constituents {
        w.write_bytes(&name_bytes(name))?;
    }
    w.write_marker(header_length)?;

    let reclen = (8 * nx * ny) as i32;
    for field in h {
        assert_eq!(field.dim(), (ny, nx), "constituent field shape mismatch");
        w.write_marker(reclen)?;
        for j in 0..ny {
            for i in 0..nx {
                w.write_f32(field[[j, i]].re as f32)?;
                w.write_f32(field[[j, i]].im as f32)?;
            }
        }
        w.write_marker(reclen)?;
    }
    Ok(())
}

/// Write an OTIS-format transport file, complex (u, v) per constituent.
pub fn output_otis_transport(
    path: &Path,
    u: &[Array2<Complex64>],
    v: &[Array2<Complex64>],
    xlim: [f64; 2],
    ylim: [f64; 2],
    constituents: &[String],
) -> Result<()> {
    assert_eq!(u.len(), v.len(), "u/v constituent count mismatch");
    assert_eq!(
        u.len(),
        constituents.len(),
        "one field pair per constituent required"
    );
    assert!(!u.is_empty(), "at least one constituent required");
    let (ny, nx) = u[0].dim();
    let nc = u.len();
    let mut w = RecordWriter::new(BufWriter::new(File::create(path)?));

    let header_length = (4 * (7 + nc)) as i32;
    w.write_marker(header_length)?;
    w.write_i32(nx as i32)?;
    w.write_i32(ny as i32)?;
    w.write_i32(nc as i32)?;
    w.write_f32(ylim[0] as f32)?;
    w.write_f32(ylim[1] as f32)?;
    w.write_f32(xlim[0] as f32)?;
    w.write_f32(xlim[1] as f32)?;
    for name in constituents {
        w.write_bytes(&name_bytes(name))?;
    }
    w.write_marker(header_length)?;

    let reclen = (16 * nx * ny) as i32;
    for ic in 0..nc {
        assert_eq!(u[ic].dim(), (ny, nx), "u field shape mismatch");
        assert_eq!(v[ic].dim(), (ny, nx), "v field shape mismatch");
        w.write_marker(reclen)?;
        for j in 0..ny {
            for i in 0..nx {
                w.write_f32(u[ic][[j, i]].re as f32)?;
                w.write_f32(u[ic][[j, i]].im as f32)?;
                w.write_f32(v[ic][[j, i]].re as f32)?;
                w.write_f32(v[ic][[j, i]].im as f32)?;
            }
        }
        w.write_marker(reclen)?;
    }
    Ok(())
}
