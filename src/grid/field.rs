//! Masked 2D fields and the scalar abstraction used by interpolation.
//!
//! Tide model fields are modeled as explicit `(values, mask)` pairs with
//! `true` meaning *invalid* (land, missing, out of coverage). Masks combine
//! by logical OR wherever fields combine. Real bathymetry and complex
//! constituent fields share the same machinery through [`GridValue`].

use std::ops::{Add, Mul, Sub};

use ndarray::{Array1, Array2};
use num_complex::Complex;
use num_traits::Zero;

/// Complex scalar used for constituent fields (real = in-phase,
/// imaginary = quadrature).
pub type Complex64 = Complex<f64>;

/// Fill value for invalid data in real-valued outputs (CF-conventions).
pub const FILL_VALUE_F64: f64 = 9.96920996838687e+36;

/// Scalar types that can live on a model grid.
///
/// Implemented for `f64` (bathymetry, scale factors, masks-as-reals) and
/// [`Complex64`] (constituent oscillations). Provides the NaN sentinel used
/// to flag invalid cells in-band during interpolation, and the linear
/// arithmetic the interpolators need.
pub trait GridValue:
    Copy
    + PartialEq
    + Zero
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<f64, Output = Self>
    + std::fmt::Debug
    + 'static
{
    /// The invalid-cell sentinel.
    fn nan() -> Self;

    /// True if any component of the value is NaN.
    fn is_nan(&self) -> bool;

    /// Magnitude of the value (absolute value / complex modulus).
    fn magnitude(&self) -> f64;
}

impl GridValue for f64 {
    #[inline]
    fn nan() -> Self {
        f64::NAN
    }

    #[inline]
    fn is_nan(&self) -> bool {
        f64::is_nan(*self)
    }

    #[inline]
    fn magnitude(&self) -> f64 {
        self.abs()
    }
}

impl GridValue for Complex64 {
    #[inline]
    fn nan() -> Self {
        Complex::new(f64::NAN, f64::NAN)
    }

    #[inline]
    fn is_nan(&self) -> bool {
        self.re.is_nan() || self.im.is_nan()
    }

    #[inline]
    fn magnitude(&self) -> f64 {
        self.norm()
    }
}

/// A 2D field with an explicit validity mask (rows = y, cols = x).
///
/// `mask[[j, i]] == true` marks cell `(j, i)` invalid.
#[derive(Debug, Clone, PartialEq)]
pub struct MaskedArray2<T> {
    /// Field values
    pub data: Array2<T>,
    /// Validity mask, `true` = invalid
    pub mask: Array2<bool>,
}

impl<T> MaskedArray2<T> {
    /// Create a masked field from data and mask.
    ///
    /// # Panics
    ///
    /// Panics if the shapes differ.
    pub fn new(data: Array2<T>, mask: Array2<bool>) -> Self {
        assert_eq!(
            data.dim(),
            mask.dim(),
            "data shape {:?} does not match mask shape {:?}",
            data.dim(),
            mask.dim()
        );
        Self { data, mask }
    }

    /// Create a fully valid field from data.
    pub fn from_data(data: Array2<T>) -> Self {
        let mask = Array2::from_elem(data.dim(), false);
        Self { data, mask }
    }

    /// Field shape as (ny, nx).
    #[inline]
    pub fn dim(&self) -> (usize, usize) {
        self.data.dim()
    }

    /// OR another mask into this field's mask.
    ///
    /// # Panics
    ///
    /// Panics if the shapes differ.
    pub fn or_mask(&mut self, other: &Array2<bool>) {
        assert_eq!(self.mask.dim(), other.dim(), "mask shape mismatch");
        ndarray::Zip::from(&mut self.mask)
            .and(other)
            .for_each(|m, &o| *m |= o);
    }

    /// True if any cell is masked.
    pub fn any_masked(&self) -> bool {
        self.mask.iter().any(|&m| m)
    }
}

impl<T: GridValue> MaskedArray2<T> {
    /// Create a zeroed, fully invalid field of the given shape.
    pub fn invalid(ny: usize, nx: usize) -> Self {
        Self {
            data: Array2::from_elem((ny, nx), T::zero()),
            mask: Array2::from_elem((ny, nx), true),
        }
    }

    /// Copy with exact-zero cells additionally masked.
    ///
    /// Legacy OTIS solutions use zero as an in-band missing marker for both
    /// bathymetry and constituent values.
    pub fn with_zero_masked(&self) -> Self {
        let mut out = self.clone();
        ndarray::Zip::from(&mut out.mask)
            .and(&self.data)
            .for_each(|m, v| *m |= v.is_zero());
        out
    }

    /// Copy with masked cells replaced by the NaN sentinel.
    pub fn nan_where_masked(&self) -> Self {
        let mut out = self.clone();
        ndarray::Zip::from(&mut out.data)
            .and(&self.mask)
            .for_each(|v, &m| {
                if m {
                    *v = T::nan();
                }
            });
        out
    }

    /// Replace the data of masked cells with `value`.
    pub fn fill_masked(&mut self, value: T) {
        ndarray::Zip::from(&mut self.data)
            .and(&self.mask)
            .for_each(|v, &m| {
                if m {
                    *v = value;
                }
            });
    }
}

/// A 1D series of values with an explicit validity mask.
///
/// Used for per-query-point interpolation results.
#[derive(Debug, Clone, PartialEq)]
pub struct MaskedArray1<T> {
    /// Series values
    pub data: Array1<T>,
    /// Validity mask, `true` = invalid
    pub mask: Array1<bool>,
}

impl<T> MaskedArray1<T> {
    /// Create a masked series from data and mask.
    ///
    /// # Panics
    ///
    /// Panics if the lengths differ.
    pub fn new(data: Array1<T>, mask: Array1<bool>) -> Self {
        assert_eq!(data.len(), mask.len(), "data/mask length mismatch");
        Self { data, mask }
    }

    /// Number of points.
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// True if the series has no points.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// True if any point is masked.
    pub fn any_masked(&self) -> bool {
        self.mask.iter().any(|&m| m)
    }

    /// OR another mask into this series' mask.
    ///
    /// # Panics
    ///
    /// Panics if the lengths differ.
    pub fn or_mask(&mut self, other: &Array1<bool>) {
        assert_eq!(self.mask.len(), other.len(), "mask length mismatch");
        ndarray::Zip::from(&mut self.mask)
            .and(other)
            .for_each(|m, &o| *m |= o);
    }
}

impl<T: GridValue> MaskedArray1<T> {
    /// Create a zeroed, fully invalid series of the given length.
    pub fn invalid(n: usize) -> Self {
        Self {
            data: Array1::from_elem(n, T::zero()),
            mask: Array1::from_elem(n, true),
        }
    }

    /// Replace the data of masked points with `value`.
    pub fn fill_masked(&mut self, value: T) {
        ndarray::Zip::from(&mut self.data)
            .and(&self.mask)
            .for_each(|v, &m| {
                if m {
                    *v = value;
                }
            });
    }
}
