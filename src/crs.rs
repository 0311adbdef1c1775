//! Coordinate reference handling for model grids.
//!
//! Tide model grids are defined either in geographic coordinates
//! (longitude/latitude degrees) or in a projected plane (polar models, in
//! kilometers). Query coordinates always arrive as longitude/latitude and
//! are transformed into the grid's native reference before interpolation.
//!
//! # Example
//!
//! ```
//! use tmd_rs::crs::{CoordinateReference, Direction, PolarStereographic};
//!
//! let proj = PolarStereographic::antarctic();
//! let (x, y) = proj.transform(-70.0, -72.0, Direction::Forward);
//! let (lon, lat) = proj.transform(x, y, Direction::Inverse);
//! assert!((lon + 70.0).abs() < 1e-9);
//! assert!((lat + 72.0).abs() < 1e-9);
//! ```

use std::f64::consts::{FRAC_PI_2, FRAC_PI_4, PI};

/// Transform direction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    /// Longitude/latitude into the grid's native coordinates
    Forward,
    /// Native coordinates back to longitude/latitude
    Inverse,
}

/// Coordinate reference of a model grid.
///
/// `Forward` maps `(lon, lat)` to native `(x, y)`; `Inverse` maps native
/// `(x, y)` back to `(lon, lat)`. The `is_geographic` flag drives the
/// longitude-wrap heuristics and cyclic-extension eligibility of the
/// extraction pipeline.
pub trait CoordinateReference {
    /// Transform a coordinate pair.
    fn transform(&self, x: f64, y: f64, direction: Direction) -> (f64, f64);

    /// True if the native coordinates are longitude/latitude degrees.
    fn is_geographic(&self) -> bool;
}

/// Geographic (identity) reference for global and regional lat/lon grids.
#[derive(Debug, Clone, Copy, Default)]
pub struct Geographic;

impl CoordinateReference for Geographic {
    fn transform(&self, x: f64, y: f64, _direction: Direction) -> (f64, f64) {
        (x, y)
    }

    fn is_geographic(&self) -> bool {
        true
    }
}

/// Hemisphere of a polar stereographic projection.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Hemisphere {
    North,
    South,
}

/// Ellipsoidal polar stereographic projection (WGS84), in kilometers.
///
/// Polar OTIS grids store coordinates in a projected plane with kilometer
/// units; this projection covers both the Arctic and Antarctic conventions.
/// The inverse transform iterates the conformal-latitude relation to
/// convergence.
#[derive(Debug, Clone, Copy)]
pub struct PolarStereographic {
    /// Central meridian in degrees
    central_meridian: f64,
    /// Standard parallel (latitude of true scale) in degrees, signed
    standard_parallel: f64,
    /// Projection hemisphere
    hemisphere: Hemisphere,
}

impl PolarStereographic {
    /// WGS84 equatorial radius in meters
    const A: f64 = 6_378_137.0;
    /// WGS84 flattening
    const F: f64 = 1.0 / 298.257_223_563;

    /// Create a polar stereographic projection.
    ///
    /// The hemisphere follows the sign of `standard_parallel`.
    pub fn new(central_meridian: f64, standard_parallel: f64) -> Self {
        let hemisphere = if standard_parallel < 0.0 {
            Hemisphere::South
        } else {
            Hemisphere::North
        };
        Self {
            central_meridian,
            standard_parallel,
            hemisphere,
        }
    }

    /// Antarctic convention used by circum-Antarctic tide models
    /// (true scale at 71°S, central meridian 70°W).
    pub fn antarctic() -> Self {
        Self::new(-70.0, -71.0)
    }

    /// Arctic convention used by Arctic Ocean tide models
    /// (true scale at 70°N, central meridian 45°W).
    pub fn arctic() -> Self {
        Self::new(-45.0, 70.0)
    }

    /// Get the central meridian in degrees.
    pub fn central_meridian(&self) -> f64 {
        self.central_meridian
    }

    /// Get the standard parallel in degrees.
    pub fn standard_parallel(&self) -> f64 {
        self.standard_parallel
    }

    fn eccentricity() -> f64 {
        let e2 = 2.0 * Self::F - Self::F * Self::F;
        e2.sqrt()
    }

    /// Isometric ratio t(phi) for the north-pole form, phi in radians.
    fn t(phi: f64, e: f64) -> f64 {
        let sin_phi = phi.sin();
        (FRAC_PI_4 - phi / 2.0).tan()
            * ((1.0 + e * sin_phi) / (1.0 - e * sin_phi)).powf(e / 2.0)
    }

    /// Parallel radius factor m(phi), phi in radians.
    fn m(phi: f64, e: f64) -> f64 {
        let sin_phi = phi.sin();
        phi.cos() / (1.0 - e * e * sin_phi * sin_phi).sqrt()
    }

    /// North-pole forward: relative longitude and latitude in radians to
    /// meters.
    fn forward_north(&self, lambda_rel: f64, phi: f64) -> (f64, f64) {
        let e = Self::eccentricity();
        let phi_c = self.standard_parallel.abs() * PI / 180.0;
        let rho = Self::A * Self::m(phi_c, e) * Self::t(phi, e) / Self::t(phi_c, e);
        (rho * lambda_rel.sin(), -rho * lambda_rel.cos())
    }

    /// North-pole inverse: meters to relative longitude and latitude in
    /// radians.
    fn inverse_north(&self, x: f64, y: f64) -> (f64, f64) {
        let e = Self::eccentricity();
        let phi_c = self.standard_parallel.abs() * PI / 180.0;
        let rho = x.hypot(y);
        if rho == 0.0 {
            return (0.0, FRAC_PI_2);
        }
        let ts = rho * Self::t(phi_c, e) / (Self::A * Self::m(phi_c, e));
        // iterate the conformal-latitude relation
        let mut phi = FRAC_PI_2 - 2.0 * ts.atan();
        for _ in 0..25 {
            let sin_phi = phi.sin();
            let next = FRAC_PI_2
                - 2.0
                    * (ts * ((1.0 - e * sin_phi) / (1.0 + e * sin_phi)).powf(e / 2.0)).atan();
            if (next - phi).abs() < 1e-12 {
                phi = next;
                break;
            }
            phi = next;
        }
        let lambda_rel = x.atan2(-y);
        (lambda_rel, phi)
    }
}

impl CoordinateReference for PolarStereographic {
    fn transform(&self, x: f64, y: f64, direction: Direction) -> (f64, f64) {
        match direction {
            Direction::Forward => {
                let (lon, lat) = (x, y);
                let lambda_rel = (lon - self.central_meridian) * PI / 180.0;
                let phi = lat * PI / 180.0;
                let (xm, ym) = match self.hemisphere {
                    Hemisphere::North => self.forward_north(lambda_rel, phi),
                    Hemisphere::South => {
                        let (xm, ym) = self.forward_north(lambda_rel, -phi);
                        (xm, -ym)
                    }
                };
                (xm / 1000.0, ym / 1000.0)
            }
            Direction::Inverse => {
                let (xm, ym) = (x * 1000.0, y * 1000.0);
                let (lambda_rel, phi) = match self.hemisphere {
                    Hemisphere::North => self.inverse_north(xm, ym),
                    Hemisphere::South => {
                        let (l, p) = self.inverse_north(xm, -ym);
                        (l, -p)
                    }
                };
                let lon = self.central_meridian + lambda_rel * 180.0 / PI;
                let lat = phi * 180.0 / PI;
                (lon, lat)
            }
        }
    }

    fn is_geographic(&self) -> bool {
        false
    }
}
