//! Domain adapter: crop, shift and extend model grids.
//!
//! - **Crop** selects the contiguous index range of a field inside a
//!   buffered bounding box, re-anchoring the longitude origin first when the
//!   box and grid use mismatched -180/180 vs 0/360 conventions.
//! - **Shift** rotates a periodic longitude axis (and the field's columns)
//!   to start near a new base longitude.
//! - **Extend** appends one wrap column on each side of a full global belt
//!   so interpolation at the date line never leaves the covered domain.

use ndarray::{s, Array1, Array2};

use crate::error::{Result, TideModelError};
use crate::grid::field::MaskedArray2;
use crate::types::Bounds2D;

/// Direction for rotating a periodic grid to a new base longitude.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShiftDirection {
    /// Add one full cycle to the wrapped tail (result starts near `x0`,
    /// increasing past `x0 + cyclic`)
    East,
    /// Subtract one full cycle from the wrapped head (result starts near
    /// `x0 - cyclic`)
    West,
}

/// Extend an ascending uniform axis by one step on each side.
///
/// The result has length `n + 2` with `out[0] == x[0] - step` and
/// `out[n + 1] == x[n - 1] + step`.
pub fn extend_array(x: &Array1<f64>, step: f64) -> Array1<f64> {
    let n = x.len();
    let mut out = Array1::zeros(n + 2);
    out[0] = x[0] - step;
    out.slice_mut(s![1..n + 1]).assign(x);
    out[n + 1] = x[n - 1] + step;
    out
}

/// Extend a global matrix by one wrap column on each side.
///
/// The new first column copies the old last column and vice versa, so a
/// field spanning `360 - dx` of longitude becomes seamlessly interpolable
/// across the date line.
pub fn extend_matrix_array<T: Copy>(m: &Array2<T>) -> Array2<T> {
    let (ny, nx) = m.dim();
    Array2::from_shape_fn((ny, nx + 2), |(j, i)| {
        if i == 0 {
            m[[j, nx - 1]]
        } else if i == nx + 1 {
            m[[j, 0]]
        } else {
            m[[j, i - 1]]
        }
    })
}

/// Extend a masked global field by one wrap column on each side.
pub fn extend_matrix<T: Copy>(field: &MaskedArray2<T>) -> MaskedArray2<T> {
    MaskedArray2 {
        data: extend_matrix_array(&field.data),
        mask: extend_matrix_array(&field.mask),
    }
}

/// Shift a periodic grid east or west to a new base longitude.
///
/// Rotates the axis so it starts at the element closest to `x0` and rotates
/// the field's columns by the same offset. `East` adds `cyclic` to the
/// wrapped tail; `West` subtracts it from the head. Both preserve the
/// monotonicity of the shifted axis.
///
/// Grids whose axis spans exactly `cyclic` carry a duplicated seam column;
/// the wrapped segment then skips the duplicate.
pub fn shift<T: Copy>(
    field: &MaskedArray2<T>,
    x: &Array1<f64>,
    x0: f64,
    cyclic: f64,
    direction: ShiftDirection,
) -> (MaskedArray2<T>, Array1<f64>) {
    let n = x.len();
    // duplicated seam column when the axis spans the full cycle
    let offset = if (x[n - 1] - x[0] - cyclic).abs() > 1e-4 {
        0
    } else {
        1
    };
    // index of the new base longitude
    let mut i0 = 0;
    let mut best = f64::INFINITY;
    for (i, &xv) in x.iter().enumerate() {
        let d = (xv - x0).abs();
        if d < best {
            best = d;
            i0 = i;
        }
    }
    if i0 == 0 {
        return (field.clone(), x.clone());
    }

    let mut xs = Array1::zeros(n);
    for k in 0..n - i0 {
        xs[k] = x[i0 + k];
    }
    for k in 0..i0 {
        xs[n - i0 + k] = x[offset + k];
    }
    match direction {
        ShiftDirection::East => {
            for k in n - i0..n {
                xs[k] += cyclic;
            }
        }
        ShiftDirection::West => {
            for k in 0..n - i0 {
                xs[k] -= cyclic;
            }
        }
    }

    let rotate = |m: &Array2<T>| -> Array2<T> {
        let (ny, _) = m.dim();
        Array2::from_shape_fn((ny, n), |(j, k)| {
            if k < n - i0 {
                m[[j, i0 + k]]
            } else {
                m[[j, offset + k - (n - i0)]]
            }
        })
    };
    let shifted = MaskedArray2 {
        data: rotate(&field.data),
        mask: Array2::from_shape_fn(field.mask.dim(), |(j, k)| {
            if k < n - i0 {
                field.mask[[j, i0 + k]]
            } else {
                field.mask[[j, offset + k - (n - i0)]]
            }
        }),
    };
    (shifted, xs)
}

/// Crop a field to a buffered bounding box.
///
/// When the box and a geographic grid use different longitude conventions
/// the grid is first re-anchored with [`shift`]. Returns the sliced field
/// and the two sliced axes.
///
/// # Errors
///
/// [`TideModelError::Domain`] if the box lies entirely outside the grid.
pub fn crop<T: Copy>(
    field: &MaskedArray2<T>,
    x: &Array1<f64>,
    y: &Array1<f64>,
    bounds: &Bounds2D,
    buffer: f64,
    is_geographic: bool,
) -> Result<(MaskedArray2<T>, Array1<f64>, Array1<f64>)> {
    let x_max = x.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let x_min = x.iter().copied().fold(f64::INFINITY, f64::min);

    // reconcile -180/180 vs 0/360 conventions before slicing
    let (work, wx) = if is_geographic && bounds.x_min < 0.0 && x_max > 180.0 {
        shift(field, x, 180.0, 360.0, ShiftDirection::West)
    } else if is_geographic && bounds.x_max > 180.0 && x_min < 0.0 {
        shift(field, x, 0.0, 360.0, ShiftDirection::East)
    } else {
        (field.clone(), x.clone())
    };

    let b = bounds.buffered(buffer);
    let xind: Vec<usize> = wx
        .iter()
        .enumerate()
        .filter(|(_, &v)| v >= b.x_min && v <= b.x_max)
        .map(|(i, _)| i)
        .collect();
    let yind: Vec<usize> = y
        .iter()
        .enumerate()
        .filter(|(_, &v)| v >= b.y_min && v <= b.y_max)
        .map(|(i, _)| i)
        .collect();
    if xind.is_empty() || yind.is_empty() {
        return Err(TideModelError::Domain(format!(
            "bounds {} do not overlap the model grid",
            bounds
        )));
    }
    let (c0, c1) = (xind[0], xind[xind.len() - 1]);
    let (r0, r1) = (yind[0], yind[yind.len() - 1]);

    let cropped = MaskedArray2 {
        data: work.data.slice(s![r0..=r1, c0..=c1]).to_owned(),
        mask: work.mask.slice(s![r0..=r1, c0..=c1]).to_owned(),
    };
    let cx = wx.slice(s![c0..=c1]).to_owned();
    let cy = y.slice(s![r0..=r1]).to_owned();
    Ok((cropped, cx, cy))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::axis::cell_centers;

    const TOL: f64 = 1e-10;

    #[test]
    fn test_extend_array() {
        let x = cell_centers(0.0, 360.0, 360);
        let dx = 1.0;
        let e = extend_array(&x, dx);
        assert_eq!(e.len(), x.len() + 2);
        assert!((e[0] - (x[0] - dx)).abs() < TOL);
        assert!((e[e.len() - 1] - (x[x.len() - 1] + dx)).abs() < TOL);
    }

    #[test]
    fn test_extend_matrix() {
        let data = ndarray::array![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]];
        let e = extend_matrix_array(&data);
        assert_eq!(e.dim(), (2, 5));
        assert_eq!(e[[0, 0]], 3.0);
        assert_eq!(e[[0, 4]], 1.0);
        assert_eq!(e[[1, 0]], 6.0);
        assert_eq!(e[[1, 2]], 5.0);
    }

    #[test]
    fn test_shift_west() {
        // 0..360 global belt rotated to start at -180
        let x = cell_centers(0.0, 360.0, 8); // dx = 45, centers 22.5..337.5
        let data = Array2::from_shape_fn((1, 8), |(_, i)| i as f64);
        let field = MaskedArray2::from_data(data);
        let (shifted, xs) = shift(&field, &x, 180.0, 360.0, ShiftDirection::West);
        // 157.5 and 202.5 tie for distance to 180; the first wins (index 3)
        assert!((xs[0] - (157.5 - 360.0)).abs() < TOL);
        assert!((xs[7] - 112.5).abs() < TOL);
        assert_eq!(shifted.data[[0, 0]], 3.0);
        assert_eq!(shifted.data[[0, 7]], 2.0);
        // shifted axis stays strictly increasing
        for k in 1..8 {
            assert!(xs[k] > xs[k - 1]);
        }
    }

    #[test]
    fn test_shift_east() {
        // -180..180 belt rotated to start at 0
        let x = cell_centers(-180.0, 180.0, 8);
        let data = Array2::from_shape_fn((1, 8), |(_, i)| i as f64);
        let field = MaskedArray2::from_data(data);
        let (shifted, xs) = shift(&field, &x, 0.0, 360.0, ShiftDirection::East);
        // -22.5 and 22.5 tie for distance to 0; the first wins (index 3)
        assert!((xs[0] + 22.5).abs() < TOL);
        assert!((xs[7] - (112.5 + 180.0)).abs() < TOL);
        assert_eq!(shifted.data[[0, 0]], 3.0);
        for k in 1..8 {
            assert!(xs[k] > xs[k - 1]);
        }
    }

    #[test]
    fn test_crop_basic() {
        let x = cell_centers(0.0, 10.0, 10);
        let y = cell_centers(0.0, 6.0, 6);
        let data = Array2::from_shape_fn((6, 10), |(j, i)| (j * 10 + i) as f64);
        let field = MaskedArray2::from_data(data);
        let bounds = Bounds2D::new(2.0, 5.0, 1.0, 3.0);
        let (c, cx, cy) = crop(&field, &x, &y, &bounds, 0.0, true).unwrap();
        assert_eq!(cx.to_vec(), vec![2.5, 3.5, 4.5]);
        assert_eq!(cy.to_vec(), vec![1.5, 2.5]);
        assert_eq!(c.dim(), (2, 3));
        assert_eq!(c.data[[0, 0]], 12.0);
    }

    #[test]
    fn test_crop_convention_mismatch() {
        // grid on 0..360, bounds on -180..180: grid re-anchors west
        let x = cell_centers(0.0, 360.0, 36);
        let y = cell_centers(-90.0, 90.0, 18);
        let field = MaskedArray2::from_data(Array2::from_shape_fn((18, 36), |(_, i)| i as f64));
        let bounds = Bounds2D::new(-20.0, -10.0, -5.0, 5.0);
        let (c, cx, _) = crop(&field, &x, &y, &bounds, 0.0, true).unwrap();
        assert!(cx.iter().all(|&v| (-20.0..=-10.0).contains(&v)));
        assert!(!cx.is_empty());
        // column values come from the 340..350 degree range of the grid
        let first_col = c.data[[0, 0]];
        assert_eq!(first_col, 34.0);
    }

    #[test]
    fn test_crop_outside_domain() {
        let x = cell_centers(0.0, 10.0, 10);
        let y = cell_centers(0.0, 6.0, 6);
        let field = MaskedArray2::from_data(Array2::<f64>::zeros((6, 10)));
        let bounds = Bounds2D::new(50.0, 60.0, 50.0, 60.0);
        let result = crop(&field, &x, &y, &bounds, 0.0, false);
        assert!(matches!(result, Err(TideModelError::Domain(_))));
    }
}
