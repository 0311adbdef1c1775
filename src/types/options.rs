//! Closed option enumerations for the extraction pipeline.
//!
//! The string-valued `type`/`grid`/`method` options of legacy tide model
//! drivers are dispatched once at entry through these enums. Unknown strings
//! are rejected before any file I/O.

use std::str::FromStr;

use crate::error::TideModelError;

/// Tidal variable to read from a model.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TideVariable {
    /// Tidal heights (`z`), on grid-center (zeta) nodes
    Elevation,
    /// Zonal current velocity (`u`), cm/s, on u nodes
    UVelocity,
    /// Zonal depth-averaged transport (`U`), m²/s, on u nodes
    UTransport,
    /// Meridional current velocity (`v`), cm/s, on v nodes
    VVelocity,
    /// Meridional depth-averaged transport (`V`), m²/s, on v nodes
    VTransport,
}

impl TideVariable {
    /// True for variables living on u nodes (x-staggered).
    pub fn is_u_node(&self) -> bool {
        matches!(self, TideVariable::UVelocity | TideVariable::UTransport)
    }

    /// True for variables living on v nodes (y-staggered).
    pub fn is_v_node(&self) -> bool {
        matches!(self, TideVariable::VVelocity | TideVariable::VTransport)
    }

    /// True for current velocities, which are depth-normalized on output.
    pub fn is_current(&self) -> bool {
        matches!(self, TideVariable::UVelocity | TideVariable::VVelocity)
    }
}

impl FromStr for TideVariable {
    type Err = TideModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "z" => Ok(TideVariable::Elevation),
            "u" => Ok(TideVariable::UVelocity),
            "U" => Ok(TideVariable::UTransport),
            "v" => Ok(TideVariable::VVelocity),
            "V" => Ok(TideVariable::VTransport),
            _ => Err(TideModelError::InvalidParameter {
                param: "type".to_string(),
                message: format!("unknown tidal variable: {}", s),
            }),
        }
    }
}

/// Tide model file format.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GridFormat {
    /// Combined global or local OTIS binary solution
    Otis,
    /// Global binary solution with localized solutions (ATLAS-compact)
    Atlas,
    /// Combined global or local netCDF4 solution (TMD3)
    Tmd3,
}

impl FromStr for GridFormat {
    type Err = TideModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "OTIS" => Ok(GridFormat::Otis),
            "ATLAS" => Ok(GridFormat::Atlas),
            "TMD3" => Ok(GridFormat::Tmd3),
            _ => Err(TideModelError::InvalidParameter {
                param: "grid".to_string(),
                message: format!("unknown grid format: {}", s),
            }),
        }
    }
}

/// Spatial interpolation method.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InterpMethod {
    /// Quick cell-local bilinear interpolation
    Bilinear,
    /// Degree-1 bivariate spline interpolation
    Spline,
    /// Regular-grid linear interpolation
    Linear,
    /// Regular-grid nearest-neighbor interpolation
    Nearest,
}

impl FromStr for InterpMethod {
    type Err = TideModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "bilinear" => Ok(InterpMethod::Bilinear),
            "spline" => Ok(InterpMethod::Spline),
            "linear" => Ok(InterpMethod::Linear),
            "nearest" => Ok(InterpMethod::Nearest),
            _ => Err(TideModelError::InvalidParameter {
                param: "method".to_string(),
                message: format!("unknown interpolation method: {}", s),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_variable_from_str() {
        assert_eq!("z".parse::<TideVariable>().unwrap(), TideVariable::Elevation);
        assert_eq!("u".parse::<TideVariable>().unwrap(), TideVariable::UVelocity);
        assert_eq!("U".parse::<TideVariable>().unwrap(), TideVariable::UTransport);
        assert!("w".parse::<TideVariable>().is_err());
    }

    #[test]
    fn test_variable_node_kind() {
        assert!(TideVariable::UVelocity.is_u_node());
        assert!(TideVariable::UTransport.is_u_node());
        assert!(TideVariable::VVelocity.is_v_node());
        assert!(!TideVariable::Elevation.is_u_node());
        assert!(!TideVariable::Elevation.is_v_node());
        assert!(TideVariable::UVelocity.is_current());
        assert!(!TideVariable::UTransport.is_current());
    }

    #[test]
    fn test_format_from_str() {
        assert_eq!("OTIS".parse::<GridFormat>().unwrap(), GridFormat::Otis);
        assert_eq!("ATLAS".parse::<GridFormat>().unwrap(), GridFormat::Atlas);
        assert_eq!("TMD3".parse::<GridFormat>().unwrap(), GridFormat::Tmd3);
        assert!("GOT".parse::<GridFormat>().is_err());
    }

    #[test]
    fn test_method_from_str() {
        assert_eq!(
            "bilinear".parse::<InterpMethod>().unwrap(),
            InterpMethod::Bilinear
        );
        assert_eq!("spline".parse::<InterpMethod>().unwrap(), InterpMethod::Spline);
        assert!("cubic".parse::<InterpMethod>().is_err());
    }
}
