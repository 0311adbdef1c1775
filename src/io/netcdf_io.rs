//! TMD3 netCDF4 model files.
//!
//! Readers for the combined global/local netCDF4 solution layout: a grid
//! file carrying coordinates, water-column thickness, the land/water mask
//! and the ice-flexure scale factor, and constituent files carrying the
//! real/imaginary components per constituent.
//!
//! The `y` axis and all field rows are stored north-up and flipped to
//! ascending order on read; imaginary components are negated on read.

use std::path::Path;

use ndarray::{Array1, Array2};

use crate::error::{Result, TideModelError};
use crate::grid::field::{Complex64, MaskedArray2};
use crate::types::TideVariable;

/// Contents of a TMD3 grid file.
#[derive(Debug, Clone)]
pub struct NetcdfGrid {
    /// x-coordinates of cell centers
    pub x: Array1<f64>,
    /// y-coordinates of cell centers, ascending
    pub y: Array1<f64>,
    /// Water-column thickness (bathymetry); zero cells masked
    pub hz: MaskedArray2<f64>,
    /// Land/water mask (1 = water)
    pub mz: Array2<i32>,
    /// Ice-flexure scale factor (stored as percent, converted); zero cells
    /// masked
    pub sf: MaskedArray2<f64>,
}

fn check_exists(path: &Path) -> Result<()> {
    if !path.exists() {
        return Err(TideModelError::FileNotFound(path.to_path_buf()));
    }
    Ok(())
}

fn coord_values(file: &netcdf::File, name: &str) -> Result<Vec<f64>> {
    let var = file
        .variable(name)
        .ok_or_else(|| TideModelError::MissingVariable(name.to_string()))?;
    Ok(var.get_values::<f64, _>(..)?)
}

/// Read a flat (y, x) variable and flip its rows to ascending y.
fn field_values(file: &netcdf::File, name: &str, ny: usize, nx: usize) -> Result<Array2<f64>> {
    let var = file
        .variable(name)
        .ok_or_else(|| TideModelError::MissingVariable(name.to_string()))?;
    let flat = var.get_values::<f64, _>(..)?;
    if flat.len() != ny * nx {
        return Err(TideModelError::Decode {
            offset: 0,
            message: format!(
                "variable {} has {} values, expected {}x{}",
                name,
                flat.len(),
                ny,
                nx
            ),
        });
    }
    Ok(Array2::from_shape_fn((ny, nx), |(j, i)| {
        flat[(ny - 1 - j) * nx + i]
    }))
}

/// Read a TMD3 grid file: coordinates, bathymetry, mask and flexure
/// scale factors.
pub fn read_netcdf_grid(path: &Path) -> Result<NetcdfGrid> {
    check_exists(path)?;
    let file = netcdf::open(path)?;

    let x = Array1::from(coord_values(&file, "x")?);
    let mut y_vals = coord_values(&file, "y")?;
    y_vals.reverse();
    let y = Array1::from(y_vals);
    let (ny, nx) = (y.len(), x.len());

    let hz_data = field_values(&file, "wct", ny, nx)?;
    let mz = field_values(&file, "mask", ny, nx)?.map(|&v| v as i32);
    // flexure is stored in percent
    let sf_data = field_values(&file, "flexure", ny, nx)?.map(|&v| v / 100.0);

    let hz_mask = hz_data.map(|&v| v == 0.0);
    let sf_mask = sf_data.map(|&v| v == 0.0);
    log::debug!(
        "read TMD3 grid {}: {}x{} cells",
        path.display(),
        nx,
        ny
    );
    Ok(NetcdfGrid {
        x,
        y,
        hz: MaskedArray2::new(hz_data, hz_mask),
        mz,
        sf: MaskedArray2::new(sf_data, sf_mask),
    })
}

/// Read the ordered constituent names of a TMD3 constituent file.
pub fn read_netcdf_constituents(path: &Path) -> Result<Vec<String>> {
    check_exists(path)?;
    let file = netcdf::open(path)?;
    let var = file
        .variable("constituents")
        .ok_or_else(|| TideModelError::MissingVariable("constituents".to_string()))?;
    let order = var
        .attribute_value("constituent_order")
        .and_then(|r| r.ok())
        .and_then(|v| match v {
            netcdf::AttributeValue::Str(s) => Some(s),
            _ => None,
        })
        .ok_or_else(|| TideModelError::MissingVariable("constituent_order".to_string()))?;
    Ok(order.split_whitespace().map(|s| s.to_string()).collect())
}

/// Read one constituent's complex field from a TMD3 file.
///
/// Rows are flipped to ascending y and the imaginary component is negated
/// to match the OTIS phase convention.
pub fn read_netcdf_file(
    path: &Path,
    ic: usize,
    variable: TideVariable,
) -> Result<MaskedArray2<Complex64>> {
    check_exists(path)?;
    let file = netcdf::open(path)?;
    let nx = file
        .dimension("x")
        .ok_or_else(|| TideModelError::MissingVariable("x".to_string()))?
        .len();
    let ny = file
        .dimension("y")
        .ok_or_else(|| TideModelError::MissingVariable("y".to_string()))?
        .len();

    let (re_name, im_name) = match variable {
        TideVariable::Elevation => ("hRe", "hIm"),
        TideVariable::UVelocity | TideVariable::UTransport => ("URe", "UIm"),
        TideVariable::VVelocity | TideVariable::VTransport => ("VRe", "VIm"),
    };
    let re_var = file
        .variable(re_name)
        .ok_or_else(|| TideModelError::MissingVariable(re_name.to_string()))?;
    let im_var = file
        .variable(im_name)
        .ok_or_else(|| TideModelError::MissingVariable(im_name.to_string()))?;
    let re: Vec<f64> = re_var.get_values::<f64, _>((ic, .., ..))?;
    let im: Vec<f64> = im_var.get_values::<f64, _>((ic, .., ..))?;
    if re.len() != ny * nx || im.len() != ny * nx {
        return Err(TideModelError::Decode {
            offset: 0,
            message: format!(
                "constituent slab has {}x{} values, expected {}x{}",
                re.len(),
                im.len(),
                ny,
                nx
            ),
        });
    }

    let data = Array2::from_shape_fn((ny, nx), |(j, i)| {
        let k = (ny - 1 - j) * nx + i;
        Complex64::new(re[k], -im[k])
    });
    let mask = Array2::from_elem((ny, nx), false);
    Ok(MaskedArray2::new(data, mask))
}
