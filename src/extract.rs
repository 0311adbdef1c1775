//! Extraction pipeline: from model files to interpolated constants.
//!
//! The three entry points mirror the classic tide-model-driver workflow:
//! - [`extract_constants`]: load grid → adjust domain → interpolate
//!   bathymetry → per constituent: load/compose/crop/extend/interpolate/
//!   extrapolate → emit amplitude and phase arrays
//! - [`read_constants`]: same grid handling, but stage the complex
//!   constituent fields in a [`ConstituentCollection`] for reuse
//! - [`interpolate_constants`]: interpolate a staged collection at query
//!   points without touching the filesystem
//!
//! Options arrive through [`ExtractConfig`], a builder-style struct with
//! documented defaults; unsupported option strings are rejected by the
//! closed enums in [`crate::types`] before any I/O happens.
//!
//! # Example
//!
//! ```ignore
//! use tmd_rs::extract::{extract_constants, ExtractConfig};
//! use tmd_rs::crs::Geographic;
//!
//! let config = ExtractConfig::default().with_method(InterpMethod::Bilinear);
//! let out = extract_constants(
//!     &[5.32], &[60.39],
//!     Path::new("grid_tpxo9"), &[PathBuf::from("h_tpxo9")],
//!     &Geographic, &config,
//! )?;
//! for (i, name) in out.constituents.iter().enumerate() {
//!     println!("{}: {:.3} m @ {:.1} deg", name, out.amplitude.data[[0, i]], out.phase.data[[0, i]]);
//! }
//! ```

use std::path::{Path, PathBuf};

use ndarray::{Array1, Array2};

use crate::compose::{combine_atlas_model, create_atlas_mask, ATLAS_SPACING};
use crate::constituents::ConstituentCollection;
use crate::crs::{CoordinateReference, Direction};
use crate::error::{Result, TideModelError};
use crate::grid::domain::{crop, extend_array, extend_matrix};
use crate::grid::field::{Complex64, GridValue, MaskedArray1, MaskedArray2, FILL_VALUE_F64};
use crate::grid::cgrid;
use crate::interpolate::{self, RegularGridMethod};
use crate::io::atlas;
use crate::io::otis;
use crate::types::{Bounds2D, GridFormat, InterpMethod, TideVariable};

/// Tolerance when testing whether a (possibly cropped) grid spans a full
/// global longitude belt (`x[-1] - x[0] == 360 - dx`).
const GLOBAL_BELT_TOL: f64 = 1e-3;

/// Configuration for the extraction pipeline, with documented defaults.
///
/// Construct with [`Default`] and refine with the `with_*` builders.
#[derive(Debug, Clone)]
pub struct ExtractConfig {
    /// Tidal variable to read (default: elevation)
    pub variable: TideVariable,
    /// Model file format (default: OTIS)
    pub format: GridFormat,
    /// Crop model data to (buffered) bounds (default: off)
    pub crop: bool,
    /// Bounds for cropping; defaults to the query-point bounding box
    pub bounds: Option<Bounds2D>,
    /// Crop buffer; defaults to four grid cells
    pub buffer: Option<f64>,
    /// Interpolation method (default: spline)
    pub method: InterpMethod,
    /// Fill masked results by nearest-neighbor extrapolation (default: off)
    pub extrapolate: bool,
    /// Extrapolation cutoff in kilometers; `f64::INFINITY` disables
    /// (default: 10 km)
    pub cutoff: f64,
    /// Apply the ice-flexure scale factor to elevations (TMD3 only,
    /// default: off)
    pub apply_flexure: bool,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            variable: TideVariable::Elevation,
            format: GridFormat::Otis,
            crop: false,
            bounds: None,
            buffer: None,
            method: InterpMethod::Spline,
            extrapolate: false,
            cutoff: 10.0,
            apply_flexure: false,
        }
    }
}

impl ExtractConfig {
    /// Set the tidal variable to read.
    pub fn with_variable(mut self, variable: TideVariable) -> Self {
        self.variable = variable;
        self
    }

    /// Set the model file format.
    pub fn with_format(mut self, format: GridFormat) -> Self {
        self.format = format;
        self
    }

    /// Enable or disable cropping to (buffered) bounds.
    pub fn with_crop(mut self, crop: bool) -> Self {
        self.crop = crop;
        self
    }

    /// Set explicit crop bounds.
    pub fn with_bounds(mut self, bounds: Bounds2D) -> Self {
        self.bounds = Some(bounds);
        self
    }

    /// Set the crop buffer in grid units.
    pub fn with_buffer(mut self, buffer: f64) -> Self {
        self.buffer = Some(buffer);
        self
    }

    /// Set the interpolation method.
    pub fn with_method(mut self, method: InterpMethod) -> Self {
        self.method = method;
        self
    }

    /// Enable or disable nearest-neighbor extrapolation.
    pub fn with_extrapolate(mut self, extrapolate: bool) -> Self {
        self.extrapolate = extrapolate;
        self
    }

    /// Set the extrapolation cutoff in kilometers.
    pub fn with_cutoff(mut self, cutoff: f64) -> Self {
        self.cutoff = cutoff;
        self
    }

    /// Enable or disable the ice-flexure scale factor.
    pub fn with_flexure(mut self, apply_flexure: bool) -> Self {
        self.apply_flexure = apply_flexure;
        self
    }
}

/// Interpolated harmonic constants at the query points.
#[derive(Debug, Clone)]
pub struct HarmonicConstants {
    /// Amplitude per point and constituent, shape (npts, nc)
    pub amplitude: MaskedArray2<f64>,
    /// Phase in degrees, wrapped to `[0, 360)`, shape (npts, nc)
    pub phase: MaskedArray2<f64>,
    /// Interpolated model bathymetry per point
    pub bathymetry: MaskedArray1<f64>,
    /// Constituent names in file order
    pub constituents: Vec<String>,
}

/// A model grid loaded (and, for ATLAS, composed) onto its working axes.
struct LoadedGrid {
    x: Array1<f64>,
    y: Array1<f64>,
    /// Center-node bathymetry with the inverted land mask
    center: MaskedArray2<f64>,
    /// Coarse global axes, kept for composing ATLAS constituents
    coarse: Option<(Array1<f64>, Array1<f64>)>,
    /// Ice-flexure scale factor (TMD3 grids)
    #[cfg(feature = "netcdf")]
    sf: Option<MaskedArray2<f64>>,
}

fn load_grid(grid_file: &Path, config: &ExtractConfig) -> Result<LoadedGrid> {
    if !grid_file.exists() {
        return Err(TideModelError::FileNotFound(grid_file.to_path_buf()));
    }
    match config.format {
        GridFormat::Otis => {
            let g = otis::read_otis_grid(grid_file)?;
            // invert the land/water mask so true means invalid
            let invalid = g.mz.map(|&m| m == 0);
            Ok(LoadedGrid {
                x: g.x,
                y: g.y,
                center: MaskedArray2::new(g.hz, invalid),
                coarse: None,
                #[cfg(feature = "netcdf")]
                sf: None,
            })
        }
        GridFormat::Atlas => {
            let g = atlas::read_atlas_grid(grid_file)?;
            let (xs, ys, hz30) =
                combine_atlas_model(&g.x, &g.y, &g.hz, &g.local, ATLAS_SPACING);
            let m30 = create_atlas_mask(&g.x, &g.y, &g.mz, &g.local, ATLAS_SPACING);
            let invalid = m30.map(|&m| m == 0);
            Ok(LoadedGrid {
                x: xs,
                y: ys,
                center: MaskedArray2::new(hz30, invalid),
                coarse: Some((g.x, g.y)),
                #[cfg(feature = "netcdf")]
                sf: None,
            })
        }
        GridFormat::Tmd3 => {
            #[cfg(feature = "netcdf")]
            {
                let g = crate::io::netcdf_io::read_netcdf_grid(grid_file)?;
                let invalid = g.mz.map(|&m| m == 0);
                Ok(LoadedGrid {
                    x: g.x,
                    y: g.y,
                    center: MaskedArray2::new(g.hz.data, invalid),
                    coarse: None,
                    sf: Some(g.sf),
                })
            }
            #[cfg(not(feature = "netcdf"))]
            {
                Err(TideModelError::InvalidParameter {
                    param: "grid".to_string(),
                    message: "TMD3 support requires the netcdf feature".to_string(),
                })
            }
        }
    }
}

/// Stage the center grid onto the node set of the requested variable,
/// extending global grids across the date-line seam.
///
/// Returns the staged bathymetry (zero cells masked) and shifts the axes
/// by half a cell for staggered variables.
fn stage_nodes(
    center: MaskedArray2<f64>,
    xi: &mut Array1<f64>,
    yi: &mut Array1<f64>,
    dx: f64,
    dy: f64,
    variable: TideVariable,
    is_global: bool,
) -> MaskedArray2<f64> {
    match variable {
        TideVariable::Elevation => {
            let staged = if is_global {
                extend_matrix(&center)
            } else {
                center
            };
            staged.with_zero_masked()
        }
        v if v.is_u_node() => {
            let (mu, _) = cgrid::mask_nodes(&center.data, is_global);
            let (hu, _) = cgrid::interpolate_zeta(&center.data, is_global);
            let mu_invalid = mu.map(|&m| m == 0);
            let mut staged = MaskedArray2::new(hu, mu_invalid);
            if is_global {
                staged = extend_matrix(&staged);
            }
            // u nodes sit half a cell west of the centers
            for x in xi.iter_mut() {
                *x -= dx / 2.0;
            }
            staged.with_zero_masked()
        }
        _ => {
            let (_, mv) = cgrid::mask_nodes(&center.data, is_global);
            let (_, hv) = cgrid::interpolate_zeta(&center.data, is_global);
            let mv_invalid = mv.map(|&m| m == 0);
            let mut staged = MaskedArray2::new(hv, mv_invalid);
            if is_global {
                staged = extend_matrix(&staged);
            }
            // v nodes sit half a cell south of the centers
            for y in yi.iter_mut() {
                *y -= dy / 2.0;
            }
            staged.with_zero_masked()
        }
    }
}

/// Interpolate a masked field to query points with the configured method.
fn interp_field<T: GridValue>(
    xi: &Array1<f64>,
    yi: &Array1<f64>,
    field: &MaskedArray2<T>,
    x: &[f64],
    y: &[f64],
    method: InterpMethod,
) -> MaskedArray1<T> {
    match method {
        InterpMethod::Bilinear => interpolate::bilinear(xi, yi, field, x, y),
        InterpMethod::Spline => interpolate::spline(xi, yi, field, x, y),
        InterpMethod::Linear => {
            interpolate::regulargrid(xi, yi, field, x, y, RegularGridMethod::Linear)
        }
        InterpMethod::Nearest => {
            interpolate::regulargrid(xi, yi, field, x, y, RegularGridMethod::Nearest)
        }
    }
}

/// Interpolate one constituent and fold in the bathymetry mask.
///
/// Zero constituent values are in-band missing markers for the cell-local
/// methods; the spline relies on the mask channel alone.
fn interp_constituent(
    xi: &Array1<f64>,
    yi: &Array1<f64>,
    hc: &MaskedArray2<Complex64>,
    x: &[f64],
    y: &[f64],
    method: InterpMethod,
    d: &MaskedArray1<f64>,
) -> MaskedArray1<Complex64> {
    let mut hci = match method {
        InterpMethod::Spline => interpolate::spline(xi, yi, hc, x, y),
        _ => interp_field(xi, yi, &hc.with_zero_masked(), x, y, method),
    };
    hci.or_mask(&d.mask);
    hci
}

/// Fill still-masked points by nearest-neighbor extrapolation within the
/// distance cutoff.
fn extrapolate_masked(
    xi: &Array1<f64>,
    yi: &Array1<f64>,
    hc: &MaskedArray2<Complex64>,
    x: &[f64],
    y: &[f64],
    hci: &mut MaskedArray1<Complex64>,
    cutoff: f64,
    is_geographic: bool,
) {
    let inv: Vec<usize> = (0..hci.len()).filter(|&k| hci.mask[k]).collect();
    if inv.is_empty() {
        return;
    }
    let xq: Vec<f64> = inv.iter().map(|&k| x[k]).collect();
    let yq: Vec<f64> = inv.iter().map(|&k| y[k]).collect();
    let src = hc.with_zero_masked();
    let filled = interpolate::extrapolate(xi, yi, &src, &xq, &yq, cutoff, is_geographic);
    for (slot, &k) in inv.iter().enumerate() {
        if !filled.mask[slot] {
            hci.data[k] = filled.data[slot];
            hci.mask[k] = false;
        }
    }
}

/// Convert one interpolated constituent to amplitude/phase columns.
fn polar_columns(
    hci: &MaskedArray1<Complex64>,
    d: &MaskedArray1<f64>,
    invalid: &[bool],
    variable: TideVariable,
) -> (Vec<f64>, Vec<f64>, Vec<bool>) {
    let npts = hci.len();
    let mut amp = vec![0.0; npts];
    let mut phase = vec![0.0; npts];
    let mut mask = vec![false; npts];
    for k in 0..npts {
        // current velocities are depth-normalized from transport, in cm/s
        let conv = if variable.is_current() {
            d.data[k] / 100.0
        } else {
            1.0
        };
        amp[k] = hci.data[k].magnitude() / conv;
        let ph = (-hci.data[k].im).atan2(hci.data[k].re).to_degrees();
        phase[k] = if ph < 0.0 { ph + 360.0 } else { ph };
        mask[k] = hci.mask[k] || invalid[k];
    }
    (amp, phase, mask)
}

/// Load one constituent's field, composing ATLAS patches where needed.
fn load_constituent(
    model_files: &[PathBuf],
    index: usize,
    name: &str,
    config: &ExtractConfig,
    grid: &LoadedGrid,
) -> Result<MaskedArray2<Complex64>> {
    let multi = model_files.len() > 1;
    let (file, ic) = if multi {
        (&model_files[index], 0)
    } else {
        (&model_files[0], index)
    };
    match config.format {
        GridFormat::Atlas => {
            let (coarse_x, coarse_y) = grid
                .coarse
                .as_ref()
                .expect("ATLAS grids keep their coarse axes");
            if config.variable == TideVariable::Elevation {
                let (z0, zlocal) = atlas::read_atlas_elevation(file, ic, name)?;
                let (_, _, z30) =
                    combine_atlas_model(coarse_x, coarse_y, &z0.data, &zlocal, ATLAS_SPACING);
                Ok(MaskedArray2::from_data(z30))
            } else {
                let (u0, v0, patches) = atlas::read_atlas_transport(file, ic, name)?;
                let (global, local): (_, Vec<_>) = if config.variable.is_u_node() {
                    (u0, patches.into_iter().map(|p| p.into_u()).collect())
                } else {
                    (v0, patches.into_iter().map(|p| p.into_v()).collect())
                };
                let (_, _, z30) =
                    combine_atlas_model(coarse_x, coarse_y, &global.data, &local, ATLAS_SPACING);
                Ok(MaskedArray2::from_data(z30))
            }
        }
        GridFormat::Tmd3 => {
            #[cfg(feature = "netcdf")]
            {
                let mut hc =
                    crate::io::netcdf_io::read_netcdf_file(file, ic, config.variable)?;
                if config.apply_flexure && config.variable == TideVariable::Elevation {
                    if let Some(sf) = &grid.sf {
                        ndarray::Zip::from(&mut hc.data)
                            .and(&sf.data)
                            .for_each(|v, &s| *v = *v * s);
                        hc.or_mask(&sf.mask);
                    }
                }
                Ok(hc)
            }
            #[cfg(not(feature = "netcdf"))]
            {
                Err(TideModelError::InvalidParameter {
                    param: "grid".to_string(),
                    message: "TMD3 support requires the netcdf feature".to_string(),
                })
            }
        }
        GridFormat::Otis => match config.variable {
            TideVariable::Elevation => otis::read_otis_elevation(file, ic),
            v if v.is_u_node() => otis::read_otis_transport(file, ic).map(|(u, _)| u),
            _ => otis::read_otis_transport(file, ic).map(|(_, v)| v),
        },
    }
}

/// Read the constituent names for the given model files.
fn model_constituents(model_files: &[PathBuf], config: &ExtractConfig) -> Result<Vec<String>> {
    if model_files.is_empty() {
        return Err(TideModelError::InvalidParameter {
            param: "model_file".to_string(),
            message: "at least one model file is required".to_string(),
        });
    }
    if model_files.len() > 1 {
        // one single-constituent file per entry
        let mut names = Vec::with_capacity(model_files.len());
        for file in model_files {
            let cons = otis::read_constituents(file)?;
            let name = cons.last().cloned().ok_or_else(|| TideModelError::Decode {
                offset: 0,
                message: format!("no constituents in {}", file.display()),
            })?;
            names.push(name);
        }
        return Ok(names);
    }
    match config.format {
        GridFormat::Tmd3 => {
            #[cfg(feature = "netcdf")]
            {
                crate::io::netcdf_io::read_netcdf_constituents(&model_files[0])
            }
            #[cfg(not(feature = "netcdf"))]
            {
                Err(TideModelError::InvalidParameter {
                    param: "grid".to_string(),
                    message: "TMD3 support requires the netcdf feature".to_string(),
                })
            }
        }
        _ => otis::read_constituents(&model_files[0]),
    }
}

/// Prepared domain state shared by the extraction entry points.
struct StagedDomain {
    xi: Array1<f64>,
    yi: Array1<f64>,
    bathymetry: MaskedArray2<f64>,
    /// Query x after longitude-convention reconciliation
    x: Vec<f64>,
    y: Vec<f64>,
    /// Uncropped axes for cropping constituents the same way
    mx: Array1<f64>,
    my: Array1<f64>,
    bounds: Bounds2D,
    buffer: f64,
    cropped: bool,
    is_global: bool,
    invalid: Vec<bool>,
}

/// Steps 2-6 of the pipeline: mask inversion happened at load; reconcile
/// the longitude convention or crop, extend global belts, stage the node
/// set and flag out-of-domain queries.
fn stage_domain(
    grid: &LoadedGrid,
    ilon: &[f64],
    ilat: &[f64],
    crs: &dyn CoordinateReference,
    config: &ExtractConfig,
) -> Result<StagedDomain> {
    let is_geographic = crs.is_geographic();
    let mut x = Vec::with_capacity(ilon.len());
    let mut y = Vec::with_capacity(ilat.len());
    for (&lon, &lat) in ilon.iter().zip(ilat.iter()) {
        let (px, py) = crs.transform(lon, lat, Direction::Forward);
        x.push(px);
        y.push(py);
    }

    let mut xi = grid.x.clone();
    let mut yi = grid.y.clone();
    let dx = xi[1] - xi[0];
    let dy = yi[1] - yi[0];
    let bounds = match config.bounds {
        Some(b) => b,
        None if !x.is_empty() => Bounds2D::from_points(&x, &y),
        // no points and no explicit bounds: cropping never selects
        None => Bounds2D {
            x_min: f64::NEG_INFINITY,
            x_max: f64::INFINITY,
            y_min: f64::NEG_INFINITY,
            y_max: f64::INFINITY,
        },
    };
    let buffer = config.buffer.unwrap_or(4.0 * dx);

    let mut center = grid.center.clone();
    let mx = grid.x.clone();
    let my = grid.y.clone();
    let cropped = config.crop;
    if cropped {
        let (c, cx, cy) = crop(&center, &xi, &yi, &bounds, buffer, is_geographic)?;
        center = c;
        xi = cx;
        yi = cy;
    } else if is_geographic {
        // input points on -180:180 against a 0:360 grid
        let x_min = x.iter().copied().fold(f64::INFINITY, f64::min);
        if x_min < xi[0] {
            for v in x.iter_mut() {
                if *v < 0.0 {
                    *v += 360.0;
                }
            }
        }
    }
    if is_geographic {
        // input points on 0:360 against a -180:180 grid
        let x_max = x.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        if x_max > xi[xi.len() - 1] {
            for v in x.iter_mut() {
                if *v > 180.0 {
                    *v -= 360.0;
                }
            }
        }
    }

    // a full global belt gains one seam column on each side
    let span = xi[xi.len() - 1] - xi[0];
    let is_global = is_geographic && (span - (360.0 - dx)).abs() < GLOBAL_BELT_TOL;
    if is_global {
        xi = extend_array(&xi, dx);
    }

    let invalid: Vec<bool> = x
        .iter()
        .zip(y.iter())
        .map(|(&px, &py)| {
            px < xi[0] || px > xi[xi.len() - 1] || py < yi[0] || py > yi[yi.len() - 1]
        })
        .collect();

    let bathymetry = stage_nodes(center, &mut xi, &mut yi, dx, dy, config.variable, is_global);

    Ok(StagedDomain {
        xi,
        yi,
        bathymetry,
        x,
        y,
        mx,
        my,
        bounds,
        buffer,
        cropped,
        is_global,
        invalid,
    })
}

/// Prepare one constituent field onto the staged domain: crop and extend
/// like the bathymetry, then fold in its mask.
fn stage_constituent(
    mut hc: MaskedArray2<Complex64>,
    domain: &StagedDomain,
    is_geographic: bool,
    bathymetry_mask: &Array2<bool>,
) -> Result<MaskedArray2<Complex64>> {
    if domain.cropped {
        let (c, _, _) = crop(
            &hc,
            &domain.mx,
            &domain.my,
            &domain.bounds,
            domain.buffer,
            is_geographic,
        )?;
        hc = c;
    }
    if domain.is_global {
        hc = extend_matrix(&hc);
    }
    hc.or_mask(bathymetry_mask);
    Ok(hc)
}

/// Extract harmonic constants from a tide model at query coordinates.
///
/// Reads the grid and model files, spatially interpolates each constituent
/// to the query points, and returns amplitude, phase (degrees in
/// `[0, 360)`), bathymetry and the constituent list. Points outside the
/// model domain are masked in every output channel.
///
/// `model_files` holds either one combined multi-constituent file or one
/// single-constituent file per constituent.
pub fn extract_constants(
    ilon: &[f64],
    ilat: &[f64],
    grid_file: &Path,
    model_files: &[PathBuf],
    crs: &dyn CoordinateReference,
    config: &ExtractConfig,
) -> Result<HarmonicConstants> {
    assert_eq!(ilon.len(), ilat.len(), "query coordinate length mismatch");
    let grid = load_grid(grid_file, config)?;
    let domain = stage_domain(&grid, ilon, ilat, crs, config)?;
    let is_geographic = crs.is_geographic();

    // interpolate bathymetry and its mask to the query points
    let mut d = interp_field(
        &domain.xi,
        &domain.yi,
        &domain.bathymetry,
        &domain.x,
        &domain.y,
        config.method,
    );

    let names = model_constituents(model_files, config)?;
    let nc = names.len();
    let npts = domain.x.len();
    let mut amplitude = MaskedArray2::new(
        Array2::zeros((npts, nc)),
        Array2::from_elem((npts, nc), false),
    );
    let mut phase = amplitude.clone();

    for (i, name) in names.iter().enumerate() {
        let raw = load_constituent(model_files, i, name, config, &grid)?;
        let hc = stage_constituent(raw, &domain, is_geographic, &domain.bathymetry.mask)?;
        let mut hci = interp_constituent(
            &domain.xi,
            &domain.yi,
            &hc,
            &domain.x,
            &domain.y,
            config.method,
            &d,
        );
        if config.extrapolate && hci.any_masked() {
            extrapolate_masked(
                &domain.xi,
                &domain.yi,
                &hc,
                &domain.x,
                &domain.y,
                &mut hci,
                config.cutoff,
                is_geographic,
            );
        }
        let (amp_col, ph_col, mask_col) =
            polar_columns(&hci, &d, &domain.invalid, config.variable);
        for k in 0..npts {
            amplitude.data[[k, i]] = amp_col[k];
            phase.data[[k, i]] = ph_col[k];
            amplitude.mask[[k, i]] = mask_col[k];
            phase.mask[[k, i]] = mask_col[k];
        }
    }

    amplitude.fill_masked(FILL_VALUE_F64);
    phase.fill_masked(FILL_VALUE_F64);
    d.fill_masked(FILL_VALUE_F64);
    Ok(HarmonicConstants {
        amplitude,
        phase,
        bathymetry: d,
        constituents: names,
    })
}

/// Read harmonic constants from a tide model into a reusable collection.
///
/// Performs the same grid staging as [`extract_constants`] but stores the
/// complex constituent fields instead of interpolating them, so repeated
/// queries can go through [`interpolate_constants`] without re-reading the
/// model.
pub fn read_constants(
    grid_file: &Path,
    model_files: &[PathBuf],
    crs: Box<dyn CoordinateReference + Send + Sync>,
    config: &ExtractConfig,
) -> Result<ConstituentCollection> {
    let grid = load_grid(grid_file, config)?;
    // staging without query points: cropping requires explicit bounds
    let stage_config = if config.bounds.is_none() {
        config.clone().with_crop(false)
    } else {
        config.clone().with_buffer(config.buffer.unwrap_or(0.0))
    };
    let domain = stage_domain(&grid, &[], &[], crs.as_ref(), &stage_config)?;
    let is_geographic = crs.is_geographic();

    // geographic coordinates of the staged grid
    let (ny, nx) = domain.bathymetry.dim();
    let mut longitude = Array2::zeros((ny, nx));
    let mut latitude = Array2::zeros((ny, nx));
    for j in 0..ny {
        for i in 0..nx {
            let (lon, lat) =
                crs.transform(domain.xi[i], domain.yi[j], Direction::Inverse);
            longitude[[j, i]] = lon;
            latitude[[j, i]] = lat;
        }
    }

    let names = model_constituents(model_files, &stage_config)?;
    let mut collection = ConstituentCollection::new(
        domain.xi.clone(),
        domain.yi.clone(),
        domain.bathymetry.data.clone(),
        domain.bathymetry.mask.clone(),
        longitude,
        latitude,
        crs,
    );
    for (i, name) in names.iter().enumerate() {
        let raw = load_constituent(model_files, i, name, &stage_config, &grid)?;
        let hc = stage_constituent(raw, &domain, is_geographic, &domain.bathymetry.mask)?;
        collection.append(name.clone(), hc);
    }
    Ok(collection)
}

/// Interpolate staged harmonic constants at query coordinates.
///
/// Only the `variable`, `method`, `extrapolate` and `cutoff` options of the
/// configuration apply here; the collection fixes the grid, format and
/// crop state.
pub fn interpolate_constants(
    ilon: &[f64],
    ilat: &[f64],
    collection: &ConstituentCollection,
    config: &ExtractConfig,
) -> Result<HarmonicConstants> {
    assert_eq!(ilon.len(), ilat.len(), "query coordinate length mismatch");
    let crs = collection.crs();
    let is_geographic = crs.is_geographic();
    let xi = &collection.x;
    let yi = &collection.y;

    let mut x = Vec::with_capacity(ilon.len());
    let mut y = Vec::with_capacity(ilat.len());
    for (&lon, &lat) in ilon.iter().zip(ilat.iter()) {
        let (px, py) = crs.transform(lon, lat, Direction::Forward);
        x.push(px);
        y.push(py);
    }
    if is_geographic {
        let x_min = x.iter().copied().fold(f64::INFINITY, f64::min);
        if x_min < xi[0] {
            for v in x.iter_mut() {
                if *v < 0.0 {
                    *v += 360.0;
                }
            }
        }
        let x_max = x.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        if x_max > xi[xi.len() - 1] {
            for v in x.iter_mut() {
                if *v > 180.0 {
                    *v -= 360.0;
                }
            }
        }
    }
    let invalid: Vec<bool> = x
        .iter()
        .zip(y.iter())
        .map(|(&px, &py)| {
            px < xi[0] || px > xi[xi.len() - 1] || py < yi[0] || py > yi[yi.len() - 1]
        })
        .collect();

    let bathymetry = MaskedArray2::new(collection.bathymetry.clone(), collection.mask.clone());
    let mut d = interp_field(xi, yi, &bathymetry, &x, &y, config.method);

    let fields: Vec<(&str, &MaskedArray2<Complex64>)> = collection.iter().collect();
    let columns = interpolate_columns(
        &fields,
        xi,
        yi,
        &x,
        &y,
        &d,
        &invalid,
        config,
        is_geographic,
    );

    let nc = fields.len();
    let npts = x.len();
    let mut amplitude = MaskedArray2::new(
        Array2::zeros((npts, nc)),
        Array2::from_elem((npts, nc), false),
    );
    let mut phase = amplitude.clone();
    for (i, (amp_col, ph_col, mask_col)) in columns.into_iter().enumerate() {
        for k in 0..npts {
            amplitude.data[[k, i]] = amp_col[k];
            phase.data[[k, i]] = ph_col[k];
            amplitude.mask[[k, i]] = mask_col[k];
            phase.mask[[k, i]] = mask_col[k];
        }
    }

    amplitude.fill_masked(FILL_VALUE_F64);
    phase.fill_masked(FILL_VALUE_F64);
    d.fill_masked(FILL_VALUE_F64);
    Ok(HarmonicConstants {
        amplitude,
        phase,
        bathymetry: d,
        constituents: collection.names().iter().map(|s| s.to_string()).collect(),
    })
}

type PolarColumns = (Vec<f64>, Vec<f64>, Vec<bool>);

fn one_constituent_columns(
    hc: &MaskedArray2<Complex64>,
    xi: &Array1<f64>,
    yi: &Array1<f64>,
    x: &[f64],
    y: &[f64],
    d: &MaskedArray1<f64>,
    invalid: &[bool],
    config: &ExtractConfig,
    is_geographic: bool,
) -> PolarColumns {
    let mut hci = interp_constituent(xi, yi, hc, x, y, config.method, d);
    if config.extrapolate && hci.any_masked() {
        extrapolate_masked(xi, yi, hc, x, y, &mut hci, config.cutoff, is_geographic);
    }
    polar_columns(&hci, d, invalid, config.variable)
}

/// Interpolate every staged constituent; constituents are independent, so
/// the loop parallelizes when the `parallel` feature is enabled.
#[cfg(feature = "parallel")]
fn interpolate_columns(
    fields: &[(&str, &MaskedArray2<Complex64>)],
    xi: &Array1<f64>,
    yi: &Array1<f64>,
    x: &[f64],
    y: &[f64],
    d: &MaskedArray1<f64>,
    invalid: &[bool],
    config: &ExtractConfig,
    is_geographic: bool,
) -> Vec<PolarColumns> {
    use rayon::prelude::*;
    fields
        .par_iter()
        .map(|(_, hc)| {
            one_constituent_columns(hc, xi, yi, x, y, d, invalid, config, is_geographic)
        })
        .collect()
}

#[cfg(not(feature = "parallel"))]
fn interpolate_columns(
    fields: &[(&str, &MaskedArray2<Complex64>)],
    xi: &Array1<f64>,
    yi: &Array1<f64>,
    x: &[f64],
    y: &[f64],
    d: &MaskedArray1<f64>,
    invalid: &[bool],
    config: &ExtractConfig,
    is_geographic: bool,
) -> Vec<PolarColumns> {
    fields
        .iter()
        .map(|(_, hc)| {
            one_constituent_columns(hc, xi, yi, x, y, d, invalid, config, is_geographic)
        })
        .collect()
}
