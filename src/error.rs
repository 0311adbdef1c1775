//! Error types for tide model operations.
//!
//! All readers and the extraction pipeline report failures through a single
//! [`TideModelError`] enum. Invalid numeric results (land points, NaN cells,
//! out-of-bounds queries) are never errors: they travel through the mask
//! channel of the output arrays instead.

use std::path::PathBuf;

use thiserror::Error;

/// The main error type for tide model operations.
#[derive(Debug, Error)]
pub enum TideModelError {
    /// Model or grid file does not exist
    #[error("file not found: {0}")]
    FileNotFound(PathBuf),

    /// File I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed or truncated binary record
    #[error("decode error at byte {offset}: {message}")]
    Decode { offset: u64, message: String },

    /// Query region or bounding box entirely outside the model domain
    #[error("domain error: {0}")]
    Domain(String),

    /// Unsupported option value (variable kind, grid format, method)
    #[error("invalid parameter {param}: {message}")]
    InvalidParameter { param: String, message: String },

    /// Expected variable missing from a netCDF file
    #[error("missing variable: {0}")]
    MissingVariable(String),

    /// NetCDF library error
    #[cfg(feature = "netcdf")]
    #[error("netCDF error: {0}")]
    NetCdf(#[from] netcdf::Error),
}

/// Convenience alias for results with [`TideModelError`].
pub type Result<T> = std::result::Result<T, TideModelError>;
