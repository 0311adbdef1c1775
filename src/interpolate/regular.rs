//! Regular-grid interpolation.
//!
//! Linear and nearest-neighbor lookups on a regular coordinate grid with
//! strict bounds handling: queries outside the grid come back masked rather
//! than raising an error.

use ndarray::{Array1, Array2};

use crate::grid::field::{GridValue, MaskedArray1, MaskedArray2};

use super::{cell_index, in_bounds};

/// Method selector for [`regulargrid`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RegularGridMethod {
    /// Multilinear interpolation from the containing cell
    Linear,
    /// Value of the nearest grid node
    Nearest,
}

/// Regular-grid interpolation of a masked field at query points.
///
/// Out-of-bounds queries are masked. For `Linear`, the mask channel is
/// interpolated as 0/1 reals and reduced with a ceiling; for `Nearest`,
/// the nearest node's mask is returned directly.
pub fn regulargrid<T: GridValue>(
    x: &Array1<f64>,
    y: &Array1<f64>,
    field: &MaskedArray2<T>,
    xq: &[f64],
    yq: &[f64],
    method: RegularGridMethod,
) -> MaskedArray1<T> {
    assert_eq!(xq.len(), yq.len(), "query coordinate length mismatch");
    let n = xq.len();
    let mut data = Array1::from_elem(n, T::zero());
    let mut mask = Array1::from_elem(n, true);

    match method {
        RegularGridMethod::Linear => {
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
            for k in 0..n {
                if !in_bounds(x, xq[k]) || !in_bounds(y, yq[k]) {
                    continue;
                }
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
        }
        RegularGridMethod::Nearest => {
            for k in 0..n {
                if !in_bounds(x, xq[k]) || !in_bounds(y, yq[k]) {
                    continue;
                }
                let (i, tx) = cell_index(x, xq[k]);
                let (j, ty) = cell_index(y, yq[k]);
                let i = if tx > 0.5 { i + 1 } else { i };
                let j = if ty > 0.5 { j + 1 } else { j };
                data[k] = field.data[[j, i]];
                mask[k] = field.mask[[j, i]];
            }
        }
    }

    MaskedArray1::new(data, mask)
}
