//! Quick bilinear interpolation.
//!
//! Linear interpolation in two dimensions from the four corners of the
//! containing grid cell. Masked corners are treated as NaN and propagate,
//! so any query touching an invalid cell comes back masked.

use ndarray::Array1;

use crate::grid::field::{GridValue, MaskedArray1, MaskedArray2};

use super::{cell_index, in_bounds};

/// Bilinear interpolation of a masked field at query points.
///
/// Queries outside the axis ranges are masked. A query whose cell has any
/// masked corner with nonzero weight is masked through NaN propagation.
pub fn bilinear<T: GridValue>(
    x: &Array1<f64>,
    y: &Array1<f64>,
    field: &MaskedArray2<T>,
    xq: &[f64],
    yq: &[f64],
) -> MaskedArray1<T> {
    assert_eq!(xq.len(), yq.len(), "query coordinate length mismatch");
    let src = field.nan_where_masked();
    let n = xq.len();
    let mut data = Array1::from_elem(n, T::nan());
    let mut mask = Array1::from_elem(n, true);

    for k in 0..n {
        if !in_bounds(x, xq[k]) || !in_bounds(y, yq[k]) {
            continue;
        }
        let (i, tx) = cell_index(x, xq[k]);
        let (j, ty) = cell_index(y, yq[k]);
        let z00 = src.data[[j, i]];
        let z01 = src.data[[j, i + 1]];
        let z10 = src.data[[j + 1, i]];
        let z11 = src.data[[j + 1, i + 1]];
        let v = z00 * ((1.0 - tx) * (1.0 - ty))
            + z01 * (tx * (1.0 - ty))
            + z10 * ((1.0 - tx) * ty)
            + z11 * (tx * ty);
        data[k] = v;
        mask[k] = v.is_nan();
    }

    MaskedArray1::new(data, mask)
}
