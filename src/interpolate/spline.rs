//! Degree-1 bivariate spline interpolation.
//!
//! A deterministic interpolant that is exact at the sample points and
//! extrapolates linearly from the outermost cell beyond the axis range.
//! The validity mask is interpolated as a 0/1 real field and reduced with
//! a ceiling, so any masked contribution taints the output point.

use ndarray::{Array1, Array2};

use crate::grid::field::{GridValue, MaskedArray1, MaskedArray2};

use super::cell_index;

/// Degree-1 bivariate spline interpolation of a masked field.
///
/// Unlike [`super::bilinear`], queries outside the axis range are not
/// rejected: values extrapolate linearly from the nearest cell. Callers
/// mask out-of-domain points separately.
pub fn spline<T: GridValue>(
    x: &Array1<f64>,
    y: &Array1<f64>,
    field: &MaskedArray2<T>,
    xq: &[f64],
    yq: &[f64],
) -> MaskedArray1<T> {
    assert_eq!(xq.len(), yq.len(), "query coordinate length mismatch");
    // masked cells contribute zero to the value channel; validity travels
    // through the separately interpolated mask channel
    let mut values = field.data.clone();
    ndarray::Zip::from(&mut values)
        .and(&field.mask)
        .for_each(|v, &m| {
            if m {
                *v = T::zero();
            }
        });
    let mask_real: Array2<f64> =
        field.mask.map(|&m| if m { 1.0 } else { 0.0 });

    let n = xq.len();
    let mut data = Array1::from_elem(n, T::zero());
    let mut mask = Array1::from_elem(n, false);

    for k in 0..n {
        let (i, tx) = cell_index(x, xq[k]);
        let (j, ty) = cell_index(y, yq[k]);
        let w00 = (1.0 - tx) * (1.0 - ty);
        let w01 = tx * (1.0 - ty);
        let w10 = (1.0 - tx) * ty;
        let w11 = tx * ty;
        data[k] = values[[j, i]] * w00
            + values[[j, i + 1]] * w01
            + values[[j + 1, i]] * w10
            + values[[j + 1, i + 1]] * w11;
        let m = mask_real[[j, i]] * w00
            + mask_real[[j, i + 1]] * w01
            + mask_real[[j + 1, i]] * w10
            + mask_real[[j + 1, i + 1]] * w11;
        mask[k] = m.ceil() > 0.0;
    }

    MaskedArray1::new(data, mask)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::axis::cell_centers;
    use ndarray::{array, Array2};

    const TOL: f64 = 1e-12;

    #[test]
    fn test_exact_at_samples() {
        let x = cell_centers(0.0, 3.0, 3);
        let y = cell_centers(0.0, 3.0, 3);
        let field = MaskedArray2::from_data(Array2::from_shape_fn((3, 3), |(j, i)| {
            (j * 3 + i) as f64
        }));
        for j in 0..3 {
            for i in 0..3 {
                let out = spline(&x, &y, &field, &[x[i]], &[y[j]]);
                assert!(
                    (out.data[0] - field.data[[j, i]]).abs() < TOL,
                    "not exact at sample ({}, {})",
                    j,
                    i
                );
                assert!(!out.mask[0]);
            }
        }
    }

    #[test]
    fn test_linear_extrapolation_at_edges() {
        // values 1, 3, 5 along x: one step past the last center gives 7
        let x = cell_centers(0.0, 3.0, 3);
        let y = cell_centers(0.0, 2.0, 2);
        let data = array![[1.0, 3.0, 5.0], [1.0, 3.0, 5.0]];
        let field = MaskedArray2::from_data(data);
        let out = spline(&x, &y, &field, &[x[2] + 1.0], &[1.0]);
        assert!((out.data[0] - 7.0).abs() < TOL);
        assert!(!out.mask[0]);
    }

    #[test]
    fn test_masked_contribution_taints() {
        let x = cell_centers(0.0, 2.0, 2);
        let y = cell_centers(0.0, 2.0, 2);
        let field = MaskedArray2::new(
            array![[1.0, 2.0], [3.0, 4.0]],
            array![[false, false], [true, false]],
        );
        // midpoint touches all four corners
        let out = spline(&x, &y, &field, &[1.0], &[1.0]);
        assert!(out.mask[0]);
        // a query on the fully valid row stays valid
        let out = spline(&x, &y, &field, &[1.0], &[y[0]]);
        assert!(!out.mask[0]);
    }
}
