//! ATLAS-compact binary model files.
//!
//! The ATLAS layout stores one coarse global solution in the OTIS layout,
//! followed by an arbitrary number of local-patch records until end of
//! file. Each patch carries its own grid extent, a sparse list of
//! (column, row) indices and per-index values, and is decoded into a dense
//! masked array sized to its local extent: the mask starts all-invalid and
//! is cleared exactly at the supplied indices.
//!
//! Elevation and transport files key their patches by a per-patch
//! constituent subset; patches that omit the requested constituent are
//! skip-seeked with a computed byte offset rather than parsed.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use ndarray::{Array1, Array2};

use crate::error::{Result, TideModelError};
use crate::grid::axis::cell_centers;
use crate::grid::field::{Complex64, GridValue, MaskedArray2};

use super::records::RecordReader;

/// A localized high-resolution solution overlaying the global grid.
#[derive(Debug, Clone)]
pub struct LocalPatch<T> {
    /// 20-byte patch name, trimmed
    pub name: String,
    /// Latitude limits of the patch
    pub lat: [f64; 2],
    /// Longitude limits of the patch
    pub lon: [f64; 2],
    /// Dense local field; invalid outside the sparse index list
    pub field: MaskedArray2<T>,
}

/// A localized transport solution holding both velocity components.
#[derive(Debug, Clone)]
pub struct TransportPatch {
    /// 20-byte patch name, trimmed
    pub name: String,
    /// Latitude limits of the patch
    pub lat: [f64; 2],
    /// Longitude limits of the patch
    pub lon: [f64; 2],
    /// Zonal transport on the patch grid
    pub u: MaskedArray2<Complex64>,
    /// Meridional transport on the patch grid
    pub v: MaskedArray2<Complex64>,
}

impl TransportPatch {
    /// View this patch as a u-component patch.
    pub fn into_u(self) -> LocalPatch<Complex64> {
        LocalPatch {
            name: self.name,
            lat: self.lat,
            lon: self.lon,
            field: self.u,
        }
    }

    /// View this patch as a v-component patch.
    pub fn into_v(self) -> LocalPatch<Complex64> {
        LocalPatch {
            name: self.name,
            lat: self.lat,
            lon: self.lon,
            field: self.v,
        }
    }
}

/// Contents of an ATLAS grid file.
#[derive(Debug, Clone)]
pub struct AtlasGrid {
    /// x-coordinates of the coarse global grid (cell centers)
    pub x: Array1<f64>,
    /// y-coordinates of the coarse global grid (cell centers)
    pub y: Array1<f64>,
    /// Coarse global bathymetry
    pub hz: Array2<f64>,
    /// Coarse global land/water mask (1 = water)
    pub mz: Array2<i32>,
    /// Open-boundary indices, shape (nob, 2)
    pub iob: Array2<i32>,
    /// Model time step
    pub dt: f64,
    /// Global patch-coverage mask
    pub pmask: Array2<i32>,
    /// Local bathymetry patches, in file order
    pub local: Vec<LocalPatch<f64>>,
}

fn check_exists(path: &Path) -> Result<()> {
    if !path.exists() {
        return Err(TideModelError::FileNotFound(path.to_path_buf()));
    }
    Ok(())
}

fn trimmed_name(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes)
        .trim_matches(|c: char| c == '\0' || c.is_whitespace())
        .to_string()
}

fn read_dim(r: &mut RecordReader<BufReader<File>>, name: &str) -> Result<usize> {
    let v = r.read_i32()?;
    if v < 0 {
        return Err(TideModelError::Decode {
            offset: r.position()?,
            message: format!("negative dimension {}: {}", name, v),
        });
    }
    Ok(v as usize)
}

/// Place sparse values at 1-based (column, row) index pairs in a dense
/// masked array, clearing the mask exactly there.
fn scatter<T: GridValue>(
    ny: usize,
    nx: usize,
    iz: &[i32],
    jz: &[i32],
    values: impl Iterator<Item = T>,
) -> Result<MaskedArray2<T>> {
    let mut field = MaskedArray2::<T>::invalid(ny, nx);
    for ((&i, &j), v) in iz.iter().zip(jz.iter()).zip(values) {
        if i < 1 || j < 1 || i as usize > nx || j as usize > ny {
            return Err(TideModelError::Decode {
                offset: 0,
                message: format!(
                    "sparse index ({}, {}) outside local extent {}x{}",
                    i, j, ny, nx
                ),
            });
        }
        field.data[[j as usize - 1, i as usize - 1]] = v;
        field.mask[[j as usize - 1, i as usize - 1]] = false;
    }
    Ok(field)
}

/// Read an ATLAS grid file: the coarse global solution plus its local
/// bathymetry patches.
pub fn read_atlas_grid(path: &Path) -> Result<AtlasGrid> {
    check_exists(path)?;
    let mut r = RecordReader::new(BufReader::new(File::open(path)?));
    let file_len = r.stream_len()?;

    r.expect_marker(32)?;
    let nx = read_dim(&mut r, "nx")?;
    let ny = read_dim(&mut r, "ny")?;
    let lats = [f64::from(r.read_f32()?), f64::from(r.read_f32()?)];
    let lons = [f64::from(r.read_f32()?), f64::from(r.read_f32()?)];
    let dt = f64::from(r.read_f32()?);
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
        .expect("bathymetry shape checked by record length");

    r.expect_marker(reclen)?;
    let mz_flat = r.read_i32_vec(nx * ny)?;
    r.expect_marker(reclen)?;
    let mz = Array2::from_shape_vec((ny, nx), mz_flat).expect("mask shape checked");

    r.expect_marker(reclen)?;
    let pmask_flat = r.read_i32_vec(nx * ny)?;
    r.expect_marker(reclen)?;
    let pmask = Array2::from_shape_vec((ny, nx), pmask_flat).expect("pmask shape checked");

    // one local-patch record per remaining file segment
    let mut local = Vec::new();
    while r.position()? < file_len {
        let _lead = r.read_marker()?;
        let nx1 = read_dim(&mut r, "nx1")?;
        let ny1 = read_dim(&mut r, "ny1")?;
        let nd = read_dim(&mut r, "nd")?;
        let lat = [f64::from(r.read_f32()?), f64::from(r.read_f32()?)];
        let lon = [f64::from(r.read_f32()?), f64::from(r.read_f32()?)];
        let name = trimmed_name(&r.read_bytes(20)?);
        r.skip(8)?;
        let iz = r.read_i32_vec(nd)?;
        let jz = r.read_i32_vec(nd)?;
        r.skip(8)?;
        let depth_vals = r.read_f32_vec(nd)?;
        r.skip(4)?;
        let field = scatter(ny1, nx1, &iz, &jz, depth_vals.iter().map(|&v| f64::from(v)))?;
        local.push(LocalPatch {
            name,
            lat,
            lon,
            field,
        });
    }
    log::debug!(
        "read ATLAS grid {}: {}x{} global cells, {} local solutions",
        path.display(),
        nx,
        ny,
        local.len()
    );

    let x = cell_centers(lons[0], lons[1], nx);
    let y = cell_centers(lats[0], lats[1], ny);
    Ok(AtlasGrid {
        x,
        y,
        hz,
        mz,
        iob,
        dt,
        pmask,
        local,
    })
}

/// Split a whitespace-delimited 4-characters-per-name constituent block.
fn patch_constituents(raw: &[u8]) -> Vec<String> {
    raw.chunks(4)
        .map(trimmed_name)
        .filter(|s| !s.is_empty())
        .collect()
}

/// Read one constituent's global elevation plus its local patches from an
/// ATLAS elevation file.
///
/// `ic` indexes the global constituent block; `constituent` selects within
/// each patch's own (possibly smaller) constituent list. Patches without
/// the constituent are skipped by byte offset.
pub fn read_atlas_elevation(
    path: &Path,
    ic: usize,
    constituent: &str,
) -> Result<(MaskedArray2<Complex64>, Vec<LocalPatch<Complex64>>)> {
    check_exists(path)?;
    let mut r = RecordReader::new(BufReader::new(File::open(path)?));
    let file_len = r.stream_len()?;

    let _ll = r.read_i32()?;
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
    // constituent names, trailing header marker, prior records, leading marker
    r.skip(8 + nc as i64 * 4 + ic as i64 * (reclen + 8) - 4)?;
    r.expect_marker(reclen as i32)?;
    let mut h = MaskedArray2::new(
        Array2::from_elem((ny, nx), Complex64::new(0.0, 0.0)),
        Array2::from_elem((ny, nx), false),
    );
    for j in 0..ny {
        let row = r.read_f32_vec(2 * nx)?;
        for i in 0..nx {
            let v = Complex64::new(f64::from(row[2 * i]), f64::from(row[2 * i + 1]));
            if v.is_nan() {
                h.mask[[j, i]] = true;
                h.data[[j, i]] = Complex64::nan();
            } else {
                h.data[[j, i]] = v;
            }
        }
    }
    // remaining global records and the trailing marker of this one
    r.skip((nc - ic - 1) as i64 * (reclen + 8) + 4)?;

    let mut local = Vec::new();
    while r.position()? < file_len {
        let _lead = r.read_marker()?;
        let nx1 = read_dim(&mut r, "nx1")?;
        let ny1 = read_dim(&mut r, "ny1")?;
        let nc1 = read_dim(&mut r, "nc1")?;
        let nz = read_dim(&mut r, "nz")?;
        let lat = [f64::from(r.read_f32()?), f64::from(r.read_f32()?)];
        let lon = [f64::from(r.read_f32()?), f64::from(r.read_f32()?)];
        let cons = patch_constituents(&r.read_bytes(nc1 * 4)?);
        let block = 8 * nz as i64 + 8;
        if let Some(ic1) = cons.iter().position(|c| c == constituent) {
            let name = trimmed_name(&r.read_bytes(20)?);
            r.skip(8)?;
            let iz = r.read_i32_vec(nz)?;
            let jz = r.read_i32_vec(nz)?;
            r.skip(4)?; // trailing marker of the index record
            r.skip(ic1 as i64 * block)?;
            r.expect_marker((8 * nz) as i32)?;
            let vals = r.read_f32_vec(2 * nz)?;
            r.expect_marker((8 * nz) as i32)?;
            let field = scatter(
                ny1,
                nx1,
                &iz,
                &jz,
                (0..nz).map(|k| {
                    Complex64::new(f64::from(vals[2 * k]), f64::from(vals[2 * k + 1]))
                }),
            )?;
            r.skip((nc1 - ic1 - 1) as i64 * block)?;
            local.push(LocalPatch {
                name,
                lat,
                lon,
                field,
            });
        } else {
            log::debug!("skipping local solution without constituent {}", constituent);
            r.skip(40 + 16 * nz as i64 + (nc1 as i64 - 1) * block)?;
        }
    }
    Ok((h, local))
}

/// Read one constituent's global (u, v) transport plus its local patches
/// from an ATLAS transport file.
pub fn read_atlas_transport(
    path: &Path,
    ic: usize,
    constituent: &str,
) -> Result<(
    MaskedArray2<Complex64>,
    MaskedArray2<Complex64>,
    Vec<TransportPatch>,
)> {
    check_exists(path)?;
    let mut r = RecordReader::new(BufReader::new(File::open(path)?));
    let file_len = r.stream_len()?;

    let _ll = r.read_i32()?;
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
    r.skip(8 + nc as i64 * 4 + ic as i64 * (reclen + 8) - 4)?;
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
    r.skip((nc - ic - 1) as i64 * (reclen + 8) + 4)?;

    let mut local = Vec::new();
    while r.position()? < file_len {
        let _lead = r.read_marker()?;
        let nx1 = read_dim(&mut r, "nx1")?;
        let ny1 = read_dim(&mut r, "ny1")?;
        let nc1 = read_dim(&mut r, "nc1")?;
        let nu = read_dim(&mut r, "nu")?;
        let nv = read_dim(&mut r, "nv")?;
        let lat = [f64::from(r.read_f32()?), f64::from(r.read_f32()?)];
        let lon = [f64::from(r.read_f32()?), f64::from(r.read_f32()?)];
        let cons = patch_constituents(&r.read_bytes(nc1 * 4)?);
        let block = 8 * nu as i64 + 8 * nv as i64 + 16;
        if let Some(ic1) = cons.iter().position(|c| c == constituent) {
            let name = trimmed_name(&r.read_bytes(20)?);
            r.skip(8)?;
            let iu = r.read_i32_vec(nu)?;
            let ju = r.read_i32_vec(nu)?;
            r.skip(8)?;
            let iv = r.read_i32_vec(nv)?;
            let jv = r.read_i32_vec(nv)?;
            r.skip(4)?; // trailing marker of the index record
            r.skip(ic1 as i64 * block)?;
            r.expect_marker((8 * nu) as i32)?;
            let uvals = r.read_f32_vec(2 * nu)?;
            r.expect_marker((8 * nu) as i32)?;
            r.expect_marker((8 * nv) as i32)?;
            let vvals = r.read_f32_vec(2 * nv)?;
            r.expect_marker((8 * nv) as i32)?;
            let u1 = scatter(
                ny1,
                nx1,
                &iu,
                &ju,
                (0..nu).map(|k| {
                    Complex64::new(f64::from(uvals[2 * k]), f64::from(uvals[2 * k + 1]))
                }),
            )?;
            let v1 = scatter(
                ny1,
                nx1,
                &iv,
                &jv,
                (0..nv).map(|k| {
                    Complex64::new(f64::from(vvals[2 * k]), f64::from(vvals[2 * k + 1]))
                }),
            )?;
            r.skip((nc1 - ic1 - 1) as i64 * block)?;
            local.push(TransportPatch {
                name,
                lat,
                lon,
                u: u1,
                v: v1,
            });
        } else {
            log::debug!("skipping local solution without constituent {}", constituent);
            r.skip(56 + 16 * nu as i64 + 16 * nv as i64 + (nc1 as i64 - 1) * block)?;
        }
    }
    Ok((u, v, local))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::records::RecordWriter;
    use std::io::BufWriter;
    use tempfile::NamedTempFile;

    /// Write a minimal ATLAS grid file: a 4x4 global solution and one
    /// 2x2 local patch with two wet cells.
    fn write_atlas_grid_fixture(path: &Path) {
        let mut w = RecordWriter::new(BufWriter::new(File::create(path).unwrap()));
        let (nx, ny) = (4usize, 4usize);
        w.write_marker(32).unwrap();
        w.write_i32(nx as i32).unwrap();
        w.write_i32(ny as i32).unwrap();
        w.write_f32(-90.0).unwrap();
        w.write_f32(90.0).unwrap();
        w.write_f32(0.0).unwrap();
        w.write_f32(360.0).unwrap();
        w.write_f32(12.0).unwrap();
        w.write_i32(0).unwrap();
        w.write_marker(32).unwrap();
        // empty open-boundary record
        w.write_marker(4).unwrap();
        w.write_i32(0).unwrap();
        w.write_marker(4).unwrap();
        let reclen = (4 * nx * ny) as i32;
        // hz
        w.write_marker(reclen).unwrap();
        for k in 0..nx * ny {
            w.write_f32(100.0 + k as f32).unwrap();
        }
        w.write_marker(reclen).unwrap();
        // mz: all water
        w.write_marker(reclen).unwrap();
        for _ in 0..nx * ny {
            w.write_i32(1).unwrap();
        }
        w.write_marker(reclen).unwrap();
        // pmask
        w.write_marker(reclen).unwrap();
        for _ in 0..nx * ny {
            w.write_i32(1).unwrap();
        }
        w.write_marker(reclen).unwrap();
        // one local patch: 2x2 grid, 2 defined cells
        let nd = 2i32;
        w.write_marker(48).unwrap();
        w.write_i32(2).unwrap(); // nx1
        w.write_i32(2).unwrap(); // ny1
        w.write_i32(nd).unwrap();
        w.write_f32(10.0).unwrap(); // lat limits
        w.write_f32(12.0).unwrap();
        w.write_f32(20.0).unwrap(); // lon limits
        w.write_f32(22.0).unwrap();
        w.write_bytes(b"test_patch          ").unwrap();
        w.write_marker(48).unwrap();
        w.write_marker(8 * nd).unwrap();
        w.write_i32(1).unwrap(); // iz
        w.write_i32(2).unwrap();
        w.write_i32(1).unwrap(); // jz
        w.write_i32(2).unwrap();
        w.write_marker(8 * nd).unwrap();
        w.write_marker(4 * nd).unwrap();
        w.write_f32(55.0).unwrap();
        w.write_f32(66.0).unwrap();
        w.write_marker(4 * nd).unwrap();
    }

    /// Write an ATLAS elevation file with two global constituents and one
    /// local patch that only carries "m2".
    fn write_atlas_elevation_fixture(path: &Path) {
        let mut w = RecordWriter::new(BufWriter::new(File::create(path).unwrap()));
        let (nx, ny, nc) = (4usize, 4usize, 2usize);
        let header = (4 * (7 + nc)) as i32;
        w.write_marker(header).unwrap();
        w.write_i32(nx as i32).unwrap();
        w.write_i32(ny as i32).unwrap();
        w.write_i32(nc as i32).unwrap();
        w.write_f32(-90.0).unwrap();
        w.write_f32(90.0).unwrap();
        w.write_f32(0.0).unwrap();
        w.write_f32(360.0).unwrap();
        w.write_bytes(b"m2  s2  ").unwrap();
        w.write_marker(header).unwrap();
        let reclen = (8 * nx * ny) as i32;
        for c in 0..nc {
            w.write_marker(reclen).unwrap();
            for k in 0..nx * ny {
                w.write_f32((c * 100 + k) as f32).unwrap();
                w.write_f32(-(k as f32)).unwrap();
            }
            w.write_marker(reclen).unwrap();
        }
        // local patch: 2x2, one constituent (m2), 2 defined cells
        let (nc1, nz) = (1i32, 2i32);
        let header1 = 52 + 4 * nc1;
        w.write_marker(header1).unwrap();
        w.write_i32(2).unwrap(); // nx1
        w.write_i32(2).unwrap(); // ny1
        w.write_i32(nc1).unwrap();
        w.write_i32(nz).unwrap();
        w.write_f32(10.0).unwrap();
        w.write_f32(12.0).unwrap();
        w.write_f32(20.0).unwrap();
        w.write_f32(22.0).unwrap();
        w.write_bytes(b"m2  ").unwrap();
        w.write_bytes(b"local_z             ").unwrap();
        w.write_marker(header1).unwrap();
        w.write_marker(8 * nz).unwrap();
        w.write_i32(1).unwrap(); // iz
        w.write_i32(2).unwrap();
        w.write_i32(1).unwrap(); // jz
        w.write_i32(2).unwrap();
        w.write_marker(8 * nz).unwrap();
        w.write_marker(8 * nz).unwrap();
        w.write_f32(7.0).unwrap();
        w.write_f32(-1.0).unwrap();
        w.write_f32(9.0).unwrap();
        w.write_f32(-2.0).unwrap();
        w.write_marker(8 * nz).unwrap();
    }

    #[test]
    fn test_read_atlas_grid() {
        let file = NamedTempFile::new().unwrap();
        write_atlas_grid_fixture(file.path());
        let grid = read_atlas_grid(file.path()).unwrap();

        assert_eq!(grid.hz.dim(), (4, 4));
        assert_eq!(grid.hz[[0, 0]], 100.0);
        assert!(grid.mz.iter().all(|&m| m == 1));
        assert_eq!(grid.local.len(), 1);

        let patch = &grid.local[0];
        assert_eq!(patch.name, "test_patch");
        assert_eq!(patch.lat, [10.0, 12.0]);
        assert_eq!(patch.lon, [20.0, 22.0]);
        // sparse cells (1,1) and (2,2) are valid, the rest masked
        assert!(!patch.field.mask[[0, 0]]);
        assert!(!patch.field.mask[[1, 1]]);
        assert!(patch.field.mask[[0, 1]]);
        assert!(patch.field.mask[[1, 0]]);
        assert_eq!(patch.field.data[[0, 0]], 55.0);
        assert_eq!(patch.field.data[[1, 1]], 66.0);
    }

    #[test]
    fn test_read_atlas_elevation_with_patch() {
        let file = NamedTempFile::new().unwrap();
        write_atlas_elevation_fixture(file.path());
        let (h, local) = read_atlas_elevation(file.path(), 0, "m2").unwrap();

        assert_eq!(h.dim(), (4, 4));
        assert_eq!(h.data[[0, 1]], Complex64::new(1.0, -1.0));
        assert_eq!(local.len(), 1);
        assert_eq!(local[0].name, "local_z");
        assert_eq!(local[0].field.data[[0, 0]], Complex64::new(7.0, -1.0));
        assert_eq!(local[0].field.data[[1, 1]], Complex64::new(9.0, -2.0));
        assert!(local[0].field.mask[[0, 1]]);
    }

    #[test]
    fn test_atlas_patch_skipped_for_absent_constituent() {
        let file = NamedTempFile::new().unwrap();
        write_atlas_elevation_fixture(file.path());
        // second global constituent exists, but the patch only carries m2
        let (h, local) = read_atlas_elevation(file.path(), 1, "s2").unwrap();
        assert_eq!(h.data[[0, 0]], Complex64::new(100.0, 0.0));
        assert!(local.is_empty());
    }

    #[test]
    fn test_missing_file() {
        let err = read_atlas_grid(Path::new("/nonexistent/atlas")).unwrap_err();
        assert!(matches!(err, TideModelError::FileNotFound(_)));
    }
}
