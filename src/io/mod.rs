//! I/O for tide model files.
//!
//! This module provides:
//! - **OTIS binary**: grid, elevation and transport readers and writers
//!   (big-endian Fortran records)
//! - **ATLAS-compact binary**: global solution plus local-patch readers
//! - **TMD3 netCDF4**: grid and constituent readers (requires the `netcdf`
//!   feature)
//! - **Record access**: the big-endian record cursor shared by the binary
//!   readers
//!
//! # File Formats
//!
//! OTIS grid files carry cell-edge limits, bathymetry, a land/water mask
//! and open-boundary indices. Elevation and transport files carry one
//! complex field (or u/v pair) per named constituent, seekable by
//! constituent index. ATLAS files append local-patch records with sparse
//! index/value lists after the global solution.

pub mod atlas;
#[cfg(feature = "netcdf")]
pub mod netcdf_io;
pub mod otis;
pub mod records;

pub use atlas::{
    read_atlas_elevation, read_atlas_grid, read_atlas_transport, AtlasGrid, LocalPatch,
    TransportPatch,
};
#[cfg(feature = "netcdf")]
pub use netcdf_io::{
    read_netcdf_constituents, read_netcdf_file, read_netcdf_grid, NetcdfGrid,
};
pub use otis::{
    output_otis_elevation, output_otis_grid, output_otis_transport, read_constituents,
    read_otis_elevation, read_otis_grid, read_otis_transport, OtisGrid,
};
pub use records::{RecordReader, RecordWriter};
