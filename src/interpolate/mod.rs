//! Masked interpolation primitives for regular model grids.
//!
//! All methods operate on an ascending coordinate pair `(x, y)`, a masked
//! 2D field and query point lists, and return per-point values with a
//! validity mask. Invalid cells never leak into valid outputs: they either
//! propagate NaN (bilinear) or taint the result through the interpolated
//! mask channel (spline, regular-grid).
//!
//! Methods:
//! - [`bilinear`]: quick cell-local bilinear interpolation
//! - [`spline`]: degree-1 bivariate spline, exact at samples, linear
//!   extrapolation beyond the axis range
//! - [`regulargrid`]: regular-grid linear or nearest-neighbor lookup
//! - [`extrapolate`]: nearest-neighbor extrapolation with a kilometer
//!   cutoff, for filling masked points near coastlines

mod bilinear;
mod extrapolate;
mod regular;
mod spline;

pub use bilinear::bilinear;
pub use extrapolate::extrapolate;
pub use regular::{regulargrid, RegularGridMethod};
pub use spline::spline;

use ndarray::Array1;

/// Locate the grid cell containing `q` on an ascending uniform axis.
///
/// Returns the lower cell index (clamped to `[0, n-2]`) and the fractional
/// offset from that cell's coordinate. For queries outside the axis range
/// the fraction falls outside `[0, 1]`, which the spline method uses for
/// linear extrapolation.
pub(crate) fn cell_index(axis: &Array1<f64>, q: f64) -> (usize, f64) {
    let n = axis.len();
    debug_assert!(n >= 2, "axis needs at least two elements");
    let dx = axis[1] - axis[0];
    let raw = ((q - axis[0]) / dx).floor();
    let i = raw.max(0.0).min((n - 2) as f64) as usize;
    let t = (q - axis[i]) / dx;
    (i, t)
}

/// True if `q` lies within the closed range of an ascending axis.
pub(crate) fn in_bounds(axis: &Array1<f64>, q: f64) -> bool {
    q >= axis[0] && q <= axis[axis.len() - 1]
}
