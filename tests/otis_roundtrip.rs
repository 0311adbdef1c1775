//! Round-trip tests for the OTIS binary writers and readers.
//!
//! Writing a grid/elevation/transport file and reading it back must
//! reproduce axes, bathymetry, masks and constituent fields bit-exact,
//! subject to float32 storage precision.

use ndarray::Array2;
use tempfile::TempDir;

use tmd_rs::io::{
    output_otis_elevation, output_otis_grid, output_otis_transport, read_constituents,
    read_otis_elevation, read_otis_grid, read_otis_transport,
};
use tmd_rs::Complex64;

/// Values chosen exactly representable in f32 so the round trip is
/// bit-exact.
fn f32_exact(k: usize) -> f64 {
    k as f64 * 0.25 - 3.5
}

#[test]
fn grid_roundtrip_bit_exact() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("grid_test");
    let (ny, nx) = (6, 9);
    let hz = Array2::from_shape_fn((ny, nx), |(j, i)| f32_exact(j * nx + i).abs());
    let mz = Array2::from_shape_fn((ny, nx), |(j, i)| i32::from((i + 2 * j) % 3 != 0));
    let iob = ndarray::array![[1, 1], [9, 6], [5, 3]];

    output_otis_grid(&path, [0.0, 9.0], [-3.0, 3.0], &hz, &mz, &iob, 30.0).unwrap();
    let grid = read_otis_grid(&path).unwrap();

    assert_eq!(grid.hz, hz);
    assert_eq!(grid.mz, mz);
    assert_eq!(grid.iob, iob);
    assert_eq!(grid.dt, 30.0);
    // cell centers derived from the stored edge limits
    assert_eq!(grid.x.len(), nx);
    assert_eq!(grid.y.len(), ny);
    assert!((grid.x[0] - 0.5).abs() < 1e-9);
    assert!((grid.x[nx - 1] - 8.5).abs() < 1e-9);
    assert!((grid.y[0] + 2.5).abs() < 1e-9);
}

#[test]
fn elevation_roundtrip_bit_exact() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("h_test");
    let (ny, nx) = (5, 7);
    let names = vec!["m2".to_string(), "s2".to_string(), "k1".to_string()];
    let fields: Vec<Array2<Complex64>> = (0..names.len())
        .map(|c| {
            Array2::from_shape_fn((ny, nx), |(j, i)| {
                Complex64::new(f32_exact(c * 100 + j * nx + i), f32_exact(i + c))
            })
        })
        .collect();

    output_otis_elevation(&path, &fields, [0.0, 7.0], [0.0, 5.0], &names).unwrap();

    assert_eq!(read_constituents(&path).unwrap(), names);
    for (c, expect) in fields.iter().enumerate() {
        let h = read_otis_elevation(&path, c).unwrap();
        assert_eq!(&h.data, expect, "constituent {} not reproduced", names[c]);
        assert!(!h.any_masked());
    }
}

#[test]
fn transport_roundtrip_bit_exact() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("uv_test");
    let (ny, nx) = (4, 6);
    let names = vec!["m2".to_string(), "o1".to_string()];
    let u: Vec<Array2<Complex64>> = (0..2)
        .map(|c| {
            Array2::from_shape_fn((ny, nx), |(j, i)| {
                Complex64::new(f32_exact(j * nx + i + c), -f32_exact(i))
            })
        })
        .collect();
    let v: Vec<Array2<Complex64>> = (0..2)
        .map(|c| {
            Array2::from_shape_fn((ny, nx), |(j, i)| {
                Complex64::new(f32_exact(2 * i + c), f32_exact(3 * j))
            })
        })
        .collect();

    output_otis_transport(&path, &u, &v, [0.0, 6.0], [0.0, 4.0], &names).unwrap();

    assert_eq!(read_constituents(&path).unwrap(), names);
    for c in 0..2 {
        let (ru, rv) = read_otis_transport(&path, c).unwrap();
        assert_eq!(&ru.data, &u[c], "u constituent {} not reproduced", names[c]);
        assert_eq!(&rv.data, &v[c], "v constituent {} not reproduced", names[c]);
    }
}

#[test]
fn constituent_blocks_seekable_in_any_order() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("h_seek");
    let names = vec!["q1".to_string(), "o1".to_string(), "p1".to_string()];
    let fields: Vec<Array2<Complex64>> = (0..3)
        .map(|c| Array2::from_elem((3, 3), Complex64::new(c as f64 + 1.0, 0.0)))
        .collect();
    output_otis_elevation(&path, &fields, [0.0, 3.0], [0.0, 3.0], &names).unwrap();

    // read back out of order: each block is located by byte offset
    for &c in &[2usize, 0, 1] {
        let h = read_otis_elevation(&path, c).unwrap();
        assert_eq!(h.data[[0, 0]], Complex64::new(c as f64 + 1.0, 0.0));
    }
}
