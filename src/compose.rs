//! ATLAS grid composition.
//!
//! Merges a coarse global solution with an arbitrary number of
//! irregularly-placed local patches into one coherent high-resolution
//! raster: the global field is resampled to a fixed fine grid with a
//! degree-1 bivariate spline, then each patch overwrites the fine cells it
//! covers by nearest-index placement. Patches apply in file order with no
//! conflict resolution, so a later patch wins on coincident cells.

use ndarray::{Array1, Array2};

use crate::grid::field::GridValue;
use crate::interpolate::cell_index;
use crate::io::atlas::LocalPatch;

/// Fine-grid spacing of composed ATLAS solutions: 2 arc-minutes.
pub const ATLAS_SPACING: f64 = 1.0 / 30.0;

/// Fine-grid axes for a given spacing: cell centers covering longitude
/// `[0, 360)` and latitude `[-90, 90)`.
fn atlas_axes(spacing: f64) -> (Array1<f64>, Array1<f64>) {
    let nxs = (360.0 / spacing).round() as usize;
    let nys = (180.0 / spacing).round() as usize;
    let xs = Array1::from_shape_fn(nxs, |i| spacing / 2.0 + i as f64 * spacing);
    let ys = Array1::from_shape_fn(nys, |j| -90.0 + spacing / 2.0 + j as f64 * spacing);
    (xs, ys)
}

/// Resample a coarse global field to the fine ATLAS grid.
///
/// Fits a degree-1 bivariate spline over the original coarse axes and
/// evaluates it at the fine axes: deterministic, exact at the coarse
/// samples, linear in between and linearly extrapolated past the outermost
/// coarse centers.
pub fn interpolate_atlas_model<T: GridValue>(
    xi: &Array1<f64>,
    yi: &Array1<f64>,
    zi: &Array2<T>,
    spacing: f64,
) -> (Array1<f64>, Array1<f64>, Array2<T>) {
    let (xs, ys) = atlas_axes(spacing);
    // per-axis cell locations are reused across the whole tensor product
    let xloc: Vec<(usize, f64)> = xs.iter().map(|&x| cell_index(xi, x)).collect();
    let yloc: Vec<(usize, f64)> = ys.iter().map(|&y| cell_index(yi, y)).collect();

    let zs = Array2::from_shape_fn((ys.len(), xs.len()), |(j, i)| {
        let (ci, tx) = xloc[i];
        let (cj, ty) = yloc[j];
        zi[[cj, ci]] * ((1.0 - tx) * (1.0 - ty))
            + zi[[cj, ci + 1]] * (tx * (1.0 - ty))
            + zi[[cj + 1, ci]] * ((1.0 - tx) * ty)
            + zi[[cj + 1, ci + 1]] * (tx * ty)
    });
    (xs, ys, zs)
}

/// Iterate the valid cells of a patch as fine-grid indices and values.
fn for_each_patch_cell<T: GridValue>(
    patch: &LocalPatch<T>,
    xs0: f64,
    ys0: f64,
    spacing: f64,
    nxs: usize,
    nys: usize,
    mut f: impl FnMut(usize, usize, T),
) {
    let (ny1, nx1) = patch.field.dim();
    // re-anchor the patch's lower-left corner to the fine grid
    let lon0 = (patch.lon[0] / spacing).floor() * spacing;
    let lat0 = (patch.lat[0] / spacing).floor() * spacing;
    for r in 0..ny1 {
        for c in 0..nx1 {
            if patch.field.mask[[r, c]] {
                continue;
            }
            let lon = lon0 + c as f64 * spacing;
            let lat = lat0 + r as f64 * spacing;
            // map patch longitudes into the [0, 360) convention
            let x = if lon <= 0.0 { lon + 360.0 } else { lon };
            let ii = ((x - xs0) / spacing).floor() as i64;
            let jj = ((lat - ys0) / spacing).floor() as i64;
            let ii = ii.rem_euclid(nxs as i64) as usize;
            if jj < 0 || jj >= nys as i64 {
                log::warn!(
                    "patch {} cell at latitude {} falls outside the fine grid",
                    patch.name,
                    lat
                );
                continue;
            }
            f(jj as usize, ii, patch.field.data[[r, c]]);
        }
    }
}

/// Combine a coarse global field with local patches into one seamless
/// fine-grid field.
///
/// Patches overwrite the resampled global field in iteration (file) order;
/// overlapping patches resolve by last write.
pub fn combine_atlas_model<T: GridValue>(
    xi: &Array1<f64>,
    yi: &Array1<f64>,
    zi: &Array2<T>,
    patches: &[LocalPatch<T>],
    spacing: f64,
) -> (Array1<f64>, Array1<f64>, Array2<T>) {
    let (xs, ys, mut zs) = interpolate_atlas_model(xi, yi, zi, spacing);
    let (nys, nxs) = zs.dim();
    for patch in patches {
        for_each_patch_cell(patch, xs[0], ys[0], spacing, nxs, nys, |jj, ii, v| {
            zs[[jj, ii]] = v;
        });
    }
    (xs, ys, zs)
}

/// Build the fine-grid land/water mask from the coarse global mask and the
/// patch coverage.
///
/// The global mask is resampled by nearest index (half-to-even rounding);
/// every cell any patch declares coverage for is seeded as water.
pub fn create_atlas_mask<T: GridValue>(
    xi: &Array1<f64>,
    yi: &Array1<f64>,
    mz: &Array2<i32>,
    patches: &[LocalPatch<T>],
    spacing: f64,
) -> Array2<u8> {
    let (xs, ys) = atlas_axes(spacing);
    let (nxi, nyi) = (xi.len(), yi.len());
    let xspan = xi[nxi - 1] - xi[0];
    let yspan = yi[nyi - 1] - yi[0];

    let xidx: Vec<usize> = xs
        .iter()
        .map(|&x| {
            let c = ((nxi - 1) as f64 * (x - xi[0]) / xspan).clamp(0.0, (nxi - 1) as f64);
            round_half_even(c) as usize
        })
        .collect();
    let yidx: Vec<usize> = ys
        .iter()
        .map(|&y| {
            let c = ((nyi - 1) as f64 * (y - yi[0]) / yspan).clamp(0.0, (nyi - 1) as f64);
            round_half_even(c) as usize
        })
        .collect();

    let mut m30 = Array2::from_shape_fn((ys.len(), xs.len()), |(j, i)| {
        u8::from(mz[[yidx[j], xidx[i]]] != 0)
    });
    let (nys, nxs) = m30.dim();
    for patch in patches {
        for_each_patch_cell(patch, xs[0], ys[0], spacing, nxs, nys, |jj, ii, _| {
            m30[[jj, ii]] = 1;
        });
    }
    m30
}

/// Round to nearest with ties to even, the convention used for
/// nearest-index resampling of the global mask.
fn round_half_even(v: f64) -> f64 {
    let floor = v.floor();
    let diff = v - floor;
    if diff > 0.5 {
        floor + 1.0
    } else if diff < 0.5 {
        floor
    } else if (floor as i64) % 2 == 0 {
        floor
    } else {
        floor + 1.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::axis::cell_centers;
    use crate::grid::field::MaskedArray2;

    const TOL: f64 = 1e-10;

    fn coarse_axes() -> (Array1<f64>, Array1<f64>) {
        (cell_centers(0.0, 360.0, 36), cell_centers(-90.0, 90.0, 18))
    }

    fn patch_at(lon0: f64, lat0: f64, value: f64) -> LocalPatch<f64> {
        let mut field = MaskedArray2::invalid(2, 2);
        field.data[[0, 0]] = value;
        field.mask[[0, 0]] = false;
        LocalPatch {
            name: "patch".to_string(),
            lat: [lat0, lat0 + 2.0],
            lon: [lon0, lon0 + 2.0],
            field,
        }
    }

    #[test]
    fn test_resample_constant_field() {
        let (xi, yi) = coarse_axes();
        let zi = Array2::from_elem((18, 36), 7.5);
        let (xs, ys, zs) = interpolate_atlas_model(&xi, &yi, &zi, 1.0);
        assert_eq!(xs.len(), 360);
        assert_eq!(ys.len(), 180);
        assert!((xs[0] - 0.5).abs() < TOL);
        assert!((ys[0] + 89.5).abs() < TOL);
        assert!(zs.iter().all(|&v| (v - 7.5).abs() < TOL));
    }

    #[test]
    fn test_composition_idempotent_without_patches() {
        let (xi, yi) = coarse_axes();
        let zi = Array2::from_shape_fn((18, 36), |(j, i)| (j * 36 + i) as f64);
        let (_, _, plain) = interpolate_atlas_model(&xi, &yi, &zi, 1.0);
        let (_, _, combined) = combine_atlas_model(&xi, &yi, &zi, &[], 1.0);
        assert_eq!(plain, combined);
    }

    #[test]
    fn test_patch_overlay_is_local() {
        let (xi, yi) = coarse_axes();
        let zi = Array2::from_elem((18, 36), 1.0);
        let patch = patch_at(20.0, 10.0, 99.0);
        let (xs, ys, combined) = combine_atlas_model(&xi, &yi, &zi, &[patch], 1.0);
        let (_, _, plain) = interpolate_atlas_model(&xi, &yi, &zi, 1.0);

        // the single valid patch cell lands at its nearest-index location
        let ii = ((20.0 - xs[0]) / 1.0).floor() as usize;
        let jj = ((10.0 - ys[0]) / 1.0).floor() as usize;
        assert_eq!(combined[[jj, ii]], 99.0);

        // every other cell equals the plain resample
        let mut diffs = 0;
        for j in 0..combined.nrows() {
            for i in 0..combined.ncols() {
                if combined[[j, i]] != plain[[j, i]] {
                    diffs += 1;
                }
            }
        }
        assert_eq!(diffs, 1);
    }

    #[test]
    fn test_overlapping_patches_last_write_wins() {
        let (xi, yi) = coarse_axes();
        let zi = Array2::from_elem((18, 36), 1.0);
        let first = patch_at(20.0, 10.0, 11.0);
        let second = patch_at(20.0, 10.0, 22.0);
        let (xs, ys, combined) =
            combine_atlas_model(&xi, &yi, &zi, &[first, second], 1.0);
        let ii = ((20.0 - xs[0]) / 1.0).floor() as usize;
        let jj = ((10.0 - ys[0]) / 1.0).floor() as usize;
        assert_eq!(combined[[jj, ii]], 22.0);
    }

    #[test]
    fn test_negative_longitude_patch_wraps() {
        let (xi, yi) = coarse_axes();
        let zi = Array2::from_elem((18, 36), 1.0);
        // patch on the -180..180 convention maps into 0..360
        let patch = patch_at(-10.0, 0.0, 42.0);
        let (xs, ys, combined) = combine_atlas_model(&xi, &yi, &zi, &[patch], 1.0);
        let ii = ((350.0 - xs[0]) / 1.0).floor() as usize;
        let jj = ((0.0 - ys[0]) / 1.0).floor() as usize;
        assert_eq!(combined[[jj, ii]], 42.0);
    }

    #[test]
    fn test_atlas_mask_global_water() {
        let (xi, yi) = coarse_axes();
        let mz = Array2::from_elem((18, 36), 1);
        let m30 = create_atlas_mask::<f64>(&xi, &yi, &mz, &[], 1.0);
        assert_eq!(m30.dim(), (180, 360));
        assert!(m30.iter().all(|&m| m == 1));
    }

    #[test]
    fn test_atlas_mask_patch_coverage() {
        let (xi, yi) = coarse_axes();
        let mz = Array2::zeros((18, 36));
        let patch = patch_at(20.0, 10.0, 5.0);
        let m30 = create_atlas_mask(&xi, &yi, &mz, &[patch], 1.0);
        let ii = ((20.0_f64 - 0.5) / 1.0).floor() as usize;
        let jj = ((10.0_f64 - (-89.5)) / 1.0).floor() as usize;
        assert_eq!(m30[[jj, ii]], 1);
        // land elsewhere
        assert_eq!(m30[[0, 0]], 0);
        assert_eq!(m30.iter().map(|&m| m as usize).sum::<usize>(), 1);
    }

    #[test]
    fn test_round_half_even() {
        assert_eq!(round_half_even(0.5), 0.0);
        assert_eq!(round_half_even(1.5), 2.0);
        assert_eq!(round_half_even(2.5), 2.0);
        assert_eq!(round_half_even(2.4), 2.0);
        assert_eq!(round_half_even(2.6), 3.0);
    }
}
