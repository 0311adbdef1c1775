//! Grid axis construction.
//!
//! Model axes hold cell-center coordinates with a uniform step implied by
//! the first two elements. Binary headers store cell-edge limits; centers
//! are derived as `start + step/2 + i*step`.

use ndarray::Array1;

/// Build cell-center coordinates for `n` cells spanning `[min, max]`.
///
/// The step is `(max - min) / n` and values are strictly increasing.
pub fn cell_centers(min: f64, max: f64, n: usize) -> Array1<f64> {
    let step = (max - min) / n as f64;
    Array1::from_shape_fn(n, |i| min + step / 2.0 + i as f64 * step)
}

/// Uniform step of an axis, from its first two elements.
///
/// # Panics
///
/// Panics if the axis has fewer than two elements.
pub fn step(axis: &Array1<f64>) -> f64 {
    assert!(axis.len() >= 2, "axis needs at least two elements");
    axis[1] - axis[0]
}

/// Minimum (first) and maximum (last) value of an ascending axis.
pub fn limits(axis: &Array1<f64>) -> (f64, f64) {
    (axis[0], axis[axis.len() - 1])
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOL: f64 = 1e-12;

    #[test]
    fn test_cell_centers() {
        let x = cell_centers(0.0, 4.0, 4);
        assert_eq!(x.len(), 4);
        assert!((x[0] - 0.5).abs() < TOL);
        assert!((x[3] - 3.5).abs() < TOL);
        assert!((step(&x) - 1.0).abs() < TOL);
    }

    #[test]
    fn test_cell_centers_global() {
        // A 360-cell, 1-degree global belt: span is 360 - dx
        let x = cell_centers(0.0, 360.0, 360);
        let (lo, hi) = limits(&x);
        assert!((hi - lo - (360.0 - 1.0)).abs() < TOL);
    }

    #[test]
    fn test_cell_centers_negative_origin() {
        let y = cell_centers(-90.0, 90.0, 180);
        assert!((y[0] + 89.5).abs() < TOL);
        assert!((y[179] - 89.5).abs() < TOL);
    }
}
