//! Grid primitives: axes, masked fields, C-grid staggering and the
//! crop/shift/extend domain adapter.

pub mod axis;
pub mod cgrid;
pub mod domain;
pub mod field;

pub use domain::ShiftDirection;
pub use field::{Complex64, GridValue, MaskedArray1, MaskedArray2, FILL_VALUE_F64};
