//! Nearest-neighbor extrapolation with a distance cutoff.
//!
//! Fills points that interpolation left masked (typically coastal queries
//! just off the wet grid) with the value of the nearest valid model cell,
//! as long as that cell lies within a caller-supplied distance in
//! kilometers. `f64::INFINITY` disables the cutoff.

use ndarray::Array1;

use crate::grid::field::{GridValue, MaskedArray1, MaskedArray2};

/// Mean Earth radius in kilometers, for great-circle distances.
const EARTH_RADIUS_KM: f64 = 6371.0;

/// Great-circle distance between two geographic points in kilometers.
fn haversine_km(lon1: f64, lat1: f64, lon2: f64, lat2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let dphi = (lat2 - lat1).to_radians();
    let dlambda = (lon2 - lon1).to_radians();
    let a = (dphi / 2.0).sin().powi(2)
        + phi1.cos() * phi2.cos() * (dlambda / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * a.sqrt().min(1.0).asin()
}

/// Nearest-neighbor extrapolation of a masked field to query points.
///
/// Only valid (unmasked, finite) source cells participate. Distances are
/// great-circle kilometers for geographic grids and native-unit Euclidean
/// otherwise (polar model grids are defined in kilometers). Queries with no
/// valid source within `cutoff` kilometers stay masked.
pub fn extrapolate<T: GridValue>(
    x: &Array1<f64>,
    y: &Array1<f64>,
    field: &MaskedArray2<T>,
    xq: &[f64],
    yq: &[f64],
    cutoff: f64,
    is_geographic: bool,
) -> MaskedArray1<T> {
    assert_eq!(xq.len(), yq.len(), "query coordinate length mismatch");
    let (ny, nx) = field.dim();
    // gather valid source cells once
    let mut sx = Vec::new();
    let mut sy = Vec::new();
    let mut sv = Vec::new();
    for j in 0..ny {
        for i in 0..nx {
            let v = field.data[[j, i]];
            if !field.mask[[j, i]] && !v.is_nan() {
                sx.push(x[i]);
                sy.push(y[j]);
                sv.push(v);
            }
        }
    }

    let n = xq.len();
    let mut data = Array1::from_elem(n, T::zero());
    let mut mask = Array1::from_elem(n, true);
    if sv.is_empty() {
        return MaskedArray1::new(data, mask);
    }

    for k in 0..n {
        let mut best = f64::INFINITY;
        let mut best_idx = 0;
        for s in 0..sv.len() {
            let d = if is_geographic {
                haversine_km(xq[k], yq[k], sx[s], sy[s])
            } else {
                (xq[k] - sx[s]).hypot(yq[k] - sy[s])
            };
            if d < best {
                best = d;
                best_idx = s;
            }
        }
        if best <= cutoff {
            data[k] = sv[best_idx];
            mask[k] = false;
        }
    }

    MaskedArray1::new(data, mask)
}
