//! # tmd-rs
//!
//! A tide-model-driver library for OTIS, ATLAS-compact and TMD3 ocean-tide
//! solutions.
//!
//! This crate provides the building blocks for extracting tidal harmonic
//! constants at arbitrary coordinates:
//! - Binary and netCDF4 model readers (grid, elevation, transport)
//! - ATLAS composition of a coarse global solution with local patches
//! - Arakawa C-grid node masks and staggering
//! - Domain adaptation (crop, longitude shift, date-line extension)
//! - Masked bilinear/spline/regular-grid interpolation with
//!   nearest-neighbor extrapolation near coastlines
//! - The extraction pipeline (`extract_constants`, `read_constants`,
//!   `interpolate_constants`)
//!
//! Tidal prediction (constituents into a time series) is out of scope;
//! the outputs here are the amplitude/phase fields a prediction step
//! consumes.

pub mod compose;
pub mod constituents;
pub mod crs;
pub mod error;
pub mod extract;
pub mod grid;
pub mod interpolate;
pub mod io;
pub mod types;

// Re-export main types for convenience
pub use constituents::ConstituentCollection;
pub use crs::{CoordinateReference, Direction, Geographic, PolarStereographic};
pub use error::{Result, TideModelError};
pub use extract::{
    extract_constants, interpolate_constants, read_constants, ExtractConfig, HarmonicConstants,
};
pub use grid::{Complex64, MaskedArray1, MaskedArray2, FILL_VALUE_F64};
pub use types::{Bounds2D, GridFormat, InterpMethod, TideVariable};
