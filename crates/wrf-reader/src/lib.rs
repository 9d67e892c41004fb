//! Reader for gridded atmospheric model output (WRF `wrfout` files).
//!
//! This crate exposes a dataset as a set of named, shaped variables through
//! the [`GridSource`] trait. Consumers only ever ask three questions of a
//! dataset: which variables exist, what shape a variable has, and what values
//! lie inside a hyperslab of it.
//!
//! # Implementations
//!
//! - [`NetCdfSource`] reads NetCDF-4 files with the native netcdf library
//!   (enabled by the default `netcdf` feature).
//! - [`MemorySource`] holds variables in memory and backs the test suites.
//!
//! # Layouts
//!
//! WRF variables come in three shapes that matter here, captured by
//! [`GridLayout`]: `(Time, bottom_top, south_north, west_east)`,
//! `(Time, south_north, west_east)` and time-invariant
//! `(south_north, west_east)`.

use std::ops::Range;

pub mod error;
pub mod layout;
pub mod memory;
#[cfg(feature = "netcdf")]
pub mod native;

pub use error::{ReaderError, ReaderResult};
pub use layout::GridLayout;
pub use memory::MemorySource;
#[cfg(feature = "netcdf")]
pub use native::{silence_hdf5_errors, NetCdfSource};

/// Named-variable, shaped-array access to a gridded dataset.
///
/// Extents are given as one half-open range per dimension, outermost first.
/// Values come back flattened in row-major order.
pub trait GridSource {
    /// Names of every variable in the dataset.
    fn variable_names(&self) -> Vec<String>;

    /// Shape of a variable, or `None` if it does not exist.
    fn variable_shape(&self, name: &str) -> Option<Vec<usize>>;

    /// Read a hyperslab as 32-bit floats.
    fn read_f32(&self, name: &str, extents: &[Range<usize>]) -> ReaderResult<Vec<f32>>;

    /// Read a hyperslab as 64-bit floats.
    fn read_f64(&self, name: &str, extents: &[Range<usize>]) -> ReaderResult<Vec<f64>>;

    /// Read a 2D character variable as raw byte rows (one row per outer index).
    fn read_text_rows(&self, name: &str) -> ReaderResult<Vec<Vec<u8>>>;

    /// Whether the dataset has a variable with this name.
    fn has_variable(&self, name: &str) -> bool {
        self.variable_shape(name).is_some()
    }
}

/// Check that `extents` fits inside `shape` and return the element count.
pub fn checked_extent_len(
    name: &str,
    shape: &[usize],
    extents: &[Range<usize>],
) -> ReaderResult<usize> {
    if shape.len() != extents.len() {
        return Err(ReaderError::invalid_extents(
            name,
            format!("rank {} does not match {} extents", shape.len(), extents.len()),
        ));
    }

    let mut count = 1usize;
    for (axis, (range, &len)) in extents.iter().zip(shape).enumerate() {
        if range.start > range.end || range.end > len {
            return Err(ReaderError::invalid_extents(
                name,
                format!("axis {} range {:?} outside 0..{}", axis, range, len),
            ));
        }
        count *= range.end - range.start;
    }
    Ok(count)
}
