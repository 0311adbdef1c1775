//! Constituent collection: staged model constituents in complex form.
//!
//! [`ConstituentCollection`] holds the shared grid (axes, bathymetry,
//! mask, geographic coordinates, coordinate reference) plus one complex
//! field per constituent, in file order. It is built incrementally by
//! `read_constants` and consumed read-only by `interpolate_constants`,
//! which avoids re-reading model files for repeated queries.

use ndarray::{Array1, Array2};

use crate::crs::CoordinateReference;
use crate::grid::field::{Complex64, MaskedArray2};

/// Tide model constituents staged on a common grid.
///
/// Invariant: every appended field shares the collection's grid shape and
/// axis values.
pub struct ConstituentCollection {
    /// x-coordinates of the staged grid
    pub x: Array1<f64>,
    /// y-coordinates of the staged grid
    pub y: Array1<f64>,
    /// Bathymetry on the staged grid (node set of the requested variable)
    pub bathymetry: Array2<f64>,
    /// Combined validity mask, `true` = invalid
    pub mask: Array2<bool>,
    /// Grid-cell longitudes (from the inverse coordinate transform)
    pub longitude: Array2<f64>,
    /// Grid-cell latitudes (from the inverse coordinate transform)
    pub latitude: Array2<f64>,
    crs: Box<dyn CoordinateReference + Send + Sync>,
    fields: Vec<(String, MaskedArray2<Complex64>)>,
}

impl ConstituentCollection {
    /// Create an empty collection over a staged grid.
    ///
    /// # Panics
    ///
    /// Panics if bathymetry, mask and coordinate grids disagree in shape,
    /// or the shape does not match the axes.
    pub fn new(
        x: Array1<f64>,
        y: Array1<f64>,
        bathymetry: Array2<f64>,
        mask: Array2<bool>,
        longitude: Array2<f64>,
        latitude: Array2<f64>,
        crs: Box<dyn CoordinateReference + Send + Sync>,
    ) -> Self {
        let shape = (y.len(), x.len());
        assert_eq!(bathymetry.dim(), shape, "bathymetry shape mismatch");
        assert_eq!(mask.dim(), shape, "mask shape mismatch");
        assert_eq!(longitude.dim(), shape, "longitude shape mismatch");
        assert_eq!(latitude.dim(), shape, "latitude shape mismatch");
        Self {
            x,
            y,
            bathymetry,
            mask,
            longitude,
            latitude,
            crs,
            fields: Vec::new(),
        }
    }

    /// Append one constituent field.
    ///
    /// # Panics
    ///
    /// Panics if the field's shape differs from the collection grid.
    pub fn append(&mut self, name: impl Into<String>, field: MaskedArray2<Complex64>) {
        assert_eq!(
            field.dim(),
            (self.y.len(), self.x.len()),
            "constituent field shape mismatch"
        );
        self.fields.push((name.into(), field));
    }

    /// Look up a constituent by name.
    pub fn get(&self, name: &str) -> Option<&MaskedArray2<Complex64>> {
        self.fields
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, f)| f)
    }

    /// Constituent names in file order.
    pub fn names(&self) -> Vec<&str> {
        self.fields.iter().map(|(n, _)| n.as_str()).collect()
    }

    /// Iterate constituents in file order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &MaskedArray2<Complex64>)> {
        self.fields.iter().map(|(n, f)| (n.as_str(), f))
    }

    /// Number of constituents.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// True if no constituent has been appended.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// The coordinate reference of the staged grid.
    pub fn crs(&self) -> &(dyn CoordinateReference + Send + Sync) {
        self.crs.as_ref()
    }
}
