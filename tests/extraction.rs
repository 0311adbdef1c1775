//! Integration tests for the full extraction pipeline.
//!
//! Builds small synthetic OTIS models on disk, runs the extraction entry
//! points end to end, and checks the spatial properties the pipeline
//! guarantees: exactness at cell centers, longitude-convention handling,
//! date-line seam continuity and mask propagation.

use std::path::PathBuf;

use ndarray::Array2;
use tempfile::TempDir;

use tmd_rs::io::{output_otis_elevation, output_otis_grid};
use tmd_rs::{
    extract_constants, read_constants, interpolate_constants, Complex64, ExtractConfig,
    Geographic, InterpMethod,
};

const TOL: f64 = 1e-5;

/// Global one-constituent model: 10-degree cells, all wet, smooth field.
fn write_global_model(dir: &TempDir) -> (PathBuf, PathBuf) {
    let grid_path = dir.path().join("grid_global");
    let model_path = dir.path().join("h_global");
    let (ny, nx) = (18, 36);
    let hz = Array2::from_elem((ny, nx), 4000.0);
    let mz = Array2::from_elem((ny, nx), 1);
    output_otis_grid(
        &grid_path,
        [0.0, 360.0],
        [-90.0, 90.0],
        &hz,
        &mz,
        &Array2::zeros((0, 2)),
        12.0,
    )
    .unwrap();
    // in-phase component varies smoothly with longitude
    let h = Array2::from_shape_fn((ny, nx), |(_, i)| {
        let lon = 5.0 + 10.0 * i as f64;
        Complex64::new(1.0 + 0.001 * lon, -0.5)
    });
    output_otis_elevation(
        &model_path,
        &[h],
        [0.0, 360.0],
        [-90.0, 90.0],
        &["m2".to_string()],
    )
    .unwrap();
    (grid_path, model_path)
}

#[test]
fn amplitude_matches_cell_value_at_center() {
    let dir = TempDir::new().unwrap();
    let (grid_path, model_path) = write_global_model(&dir);
    let config = ExtractConfig::default().with_method(InterpMethod::Bilinear);

    // cell center at lon 125, lat 5
    let out = extract_constants(
        &[125.0],
        &[5.0],
        &grid_path,
        &[model_path],
        &Geographic,
        &config,
    )
    .unwrap();
    let expect = Complex64::new(1.0 + 0.001 * 125.0, -0.5).norm();
    assert!(!out.amplitude.mask[[0, 0]]);
    assert!(
        (out.amplitude.data[[0, 0]] - expect).abs() < 1e-3,
        "amplitude {} != {}",
        out.amplitude.data[[0, 0]],
        expect
    );
    assert!((out.bathymetry.data[0] - 4000.0).abs() < TOL);
}

#[test]
fn both_longitude_conventions_agree() {
    let dir = TempDir::new().unwrap();
    let (grid_path, model_path) = write_global_model(&dir);
    let config = ExtractConfig::default().with_method(InterpMethod::Bilinear);

    // the same physical point expressed both ways
    let west = extract_constants(
        &[-90.0],
        &[15.0],
        &grid_path,
        &[model_path.clone()],
        &Geographic,
        &config,
    )
    .unwrap();
    let east = extract_constants(
        &[270.0],
        &[15.0],
        &grid_path,
        &[model_path],
        &Geographic,
        &config,
    )
    .unwrap();
    assert!(!west.amplitude.mask[[0, 0]]);
    assert!(!east.amplitude.mask[[0, 0]]);
    assert!(
        (west.amplitude.data[[0, 0]] - east.amplitude.data[[0, 0]]).abs() < TOL,
        "conventions disagree: {} vs {}",
        west.amplitude.data[[0, 0]],
        east.amplitude.data[[0, 0]]
    );
}

#[test]
fn dateline_is_seamless_for_all_methods() {
    let dir = TempDir::new().unwrap();
    let (grid_path, model_path) = write_global_model(&dir);

    for method in [
        InterpMethod::Bilinear,
        InterpMethod::Spline,
        InterpMethod::Linear,
        InterpMethod::Nearest,
    ] {
        let config = ExtractConfig::default().with_method(method);
        let out = extract_constants(
            &[359.9, 0.1],
            &[5.0, 5.0],
            &grid_path,
            &[model_path.clone()],
            &Geographic,
            &config,
        )
        .unwrap();
        for k in 0..2 {
            assert!(
                !out.amplitude.mask[[k, 0]],
                "{:?}: point {} masked at the seam",
                method,
                k
            );
            assert!(
                (0.0..360.0).contains(&out.phase.data[[k, 0]]),
                "{:?}: phase out of range",
                method
            );
        }
    }
}

#[test]
fn staged_collection_reproduces_direct_extraction() {
    let dir = TempDir::new().unwrap();
    let (grid_path, model_path) = write_global_model(&dir);
    let config = ExtractConfig::default().with_method(InterpMethod::Spline);

    let lons = vec![12.3, 155.0, 300.5];
    let lats = vec![-42.0, 7.7, 63.1];

    let direct = extract_constants(
        &lons,
        &lats,
        &grid_path,
        &[model_path.clone()],
        &Geographic,
        &config,
    )
    .unwrap();

    let collection =
        read_constants(&grid_path, &[model_path], Box::new(Geographic), &config).unwrap();
    let staged = interpolate_constants(&lons, &lats, &collection, &config).unwrap();

    assert_eq!(direct.constituents, staged.constituents);
    for k in 0..lons.len() {
        assert_eq!(direct.amplitude.mask[[k, 0]], staged.amplitude.mask[[k, 0]]);
        assert!(
            (direct.amplitude.data[[k, 0]] - staged.amplitude.data[[k, 0]]).abs() < TOL,
            "amplitude mismatch at point {}",
            k
        );
        assert!(
            (direct.phase.data[[k, 0]] - staged.phase.data[[k, 0]]).abs() < TOL,
            "phase mismatch at point {}",
            k
        );
        assert!(
            (direct.bathymetry.data[k] - staged.bathymetry.data[k]).abs() < TOL,
            "bathymetry mismatch at point {}",
            k
        );
    }
}

#[test]
fn coastal_mask_respected_and_extrapolation_fills() {
    let dir = TempDir::new().unwrap();
    let grid_path = dir.path().join("grid_coast");
    let model_path = dir.path().join("h_coast");
    // a 6x6 regional grid with a dry northwest quadrant
    let (ny, nx) = (6, 6);
    let dry = |j: usize, i: usize| j >= 3 && i < 3;
    let hz = Array2::from_shape_fn((ny, nx), |(j, i)| if dry(j, i) { 0.0 } else { 50.0 });
    let mz = Array2::from_shape_fn((ny, nx), |(j, i)| i32::from(!dry(j, i)));
    output_otis_grid(
        &grid_path,
        [0.0, 6.0],
        [0.0, 6.0],
        &hz,
        &mz,
        &Array2::zeros((0, 2)),
        0.0,
    )
    .unwrap();
    let h = Array2::from_shape_fn((ny, nx), |(j, i)| {
        if dry(j, i) {
            Complex64::new(0.0, 0.0)
        } else {
            Complex64::new(3.0, 0.0)
        }
    });
    output_otis_elevation(
        &model_path,
        &[h],
        [0.0, 6.0],
        [0.0, 6.0],
        &["m2".to_string()],
    )
    .unwrap();

    // deep inside the dry quadrant vs open water
    let config = ExtractConfig::default().with_method(InterpMethod::Bilinear);
    let out = extract_constants(
        &[0.5, 4.5],
        &[5.5, 1.5],
        &grid_path,
        &[model_path.clone()],
        &Geographic,
        &config,
    )
    .unwrap();
    assert!(out.amplitude.mask[[0, 0]], "dry-quadrant point must mask");
    assert!(!out.amplitude.mask[[1, 0]]);
    assert!((out.amplitude.data[[1, 0]] - 3.0).abs() < TOL);

    // a tight cutoff refuses the fill, a loose one accepts it
    let config = config.with_extrapolate(true).with_cutoff(1.0);
    let out = extract_constants(
        &[0.5],
        &[5.5],
        &grid_path,
        &[model_path.clone()],
        &Geographic,
        &config,
    )
    .unwrap();
    assert!(out.amplitude.mask[[0, 0]], "1 km cutoff cannot reach water");

    let config = config.with_cutoff(f64::INFINITY);
    let out = extract_constants(
        &[0.5],
        &[5.5],
        &grid_path,
        &[model_path],
        &Geographic,
        &config,
    )
    .unwrap();
    assert!(!out.amplitude.mask[[0, 0]]);
    assert!((out.amplitude.data[[0, 0]] - 3.0).abs() < TOL);
}
