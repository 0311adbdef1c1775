//! Arakawa C-grid node masks and interpolation.
//!
//! Scalar (zeta) quantities live at cell centers; current and transport
//! variables live at staggered u nodes (x-shifted by half a cell) and
//! v nodes (y-shifted by half a cell). This module derives the u/v node
//! masks and values from the center field.
//!
//! The x-direction boundary uses periodic wrap when the grid is global in
//! longitude and edge replication otherwise; the y-direction boundary always
//! uses edge replication.

use ndarray::Array2;

/// Construct binary wet/dry masks for u and v nodes from center bathymetry.
///
/// A center cell is wet where `hz > 0`. A u node is wet only where both
/// horizontally adjacent centers are wet; a v node only where both
/// vertically adjacent centers are wet.
pub fn mask_nodes(hz: &Array2<f64>, is_global: bool) -> (Array2<u8>, Array2<u8>) {
    let mz = hz.map(|&h| u8::from(h > 0.0));
    interpolate_mask(&mz, is_global)
}

/// Interpolate a binary center mask to u and v nodes.
///
/// Invariants:
/// - `mu[j, i] = mz[j, i] & mz[j, i-1]` with the `i-1` neighbor wrapped
///   (global) or edge-replicated (regional) at `i == 0`
/// - `mv[j, i] = mz[j, i] & mz[j-1, i]` with the `j-1` neighbor
///   edge-replicated at `j == 0`
pub fn interpolate_mask(mz: &Array2<u8>, is_global: bool) -> (Array2<u8>, Array2<u8>) {
    let (ny, nx) = mz.dim();
    let mu = Array2::from_shape_fn((ny, nx), |(j, i)| {
        let left = if i == 0 {
            if is_global {
                mz[[j, nx - 1]]
            } else {
                mz[[j, 0]]
            }
        } else {
            mz[[j, i - 1]]
        };
        mz[[j, i]] * left
    });
    let mv = Array2::from_shape_fn((ny, nx), |(j, i)| {
        let below = if j == 0 { mz[[0, i]] } else { mz[[j - 1, i]] };
        mz[[j, i]] * below
    });
    (mu, mv)
}

/// Interpolate center values to u and v nodes.
///
/// Each node takes the arithmetic mean of its two adjacent centers, scaled
/// by the binary node mask so that dry neighbor pairs contribute zero rather
/// than a biased average.
pub fn interpolate_zeta(hz: &Array2<f64>, is_global: bool) -> (Array2<f64>, Array2<f64>) {
    let (ny, nx) = hz.dim();
    let (mu, mv) = mask_nodes(hz, is_global);
    let hu = Array2::from_shape_fn((ny, nx), |(j, i)| {
        let left = if i == 0 {
            if is_global {
                hz[[j, nx - 1]]
            } else {
                hz[[j, 0]]
            }
        } else {
            hz[[j, i - 1]]
        };
        0.5 * f64::from(mu[[j, i]]) * (left + hz[[j, i]])
    });
    let hv = Array2::from_shape_fn((ny, nx), |(j, i)| {
        let below = if j == 0 { hz[[0, i]] } else { hz[[j - 1, i]] };
        0.5 * f64::from(mv[[j, i]]) * (below + hz[[j, i]])
    });
    (hu, hv)
}
