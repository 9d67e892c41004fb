//! Native NetCDF access using the netcdf library.
//!
//! WRF writes `wrfout` files as NetCDF-4 (HDF5 underneath). The file handle is
//! opened once per run and kept for the lifetime of the [`NetCdfSource`];
//! every read is a hyperslab request, so only the planes a run actually
//! touches are pulled off disk.

use std::ops::Range;
use std::path::{Path, PathBuf};
use std::sync::Once;

use tracing::{debug, info};

use crate::error::{ReaderError, ReaderResult};
use crate::{checked_extent_len, GridSource};

/// Silence HDF5's automatic error printing to stderr.
///
/// The HDF5 C library prints verbose `HDF5-DIAG` messages to stderr even when
/// errors are handled gracefully on the Rust side (e.g. probing for optional
/// attributes). This disables that output by calling H5Eset_auto2 with null
/// handlers. Safe to call more than once; only the first call has an effect.
///
/// Call this early, before any HDF5/NetCDF operation.
pub fn silence_hdf5_errors() {
    static INIT: Once = Once::new();

    INIT.call_once(|| {
        // SAFETY: H5Eset_auto2 is thread-safe and we're passing null pointers
        // to disable error output, which is a documented valid use.
        unsafe {
            hdf5_metno_sys::h5e::H5Eset_auto2(
                hdf5_metno_sys::h5e::H5E_DEFAULT,
                None,
                std::ptr::null_mut(),
            );
        }
    });
}

/// A WRF output file opened with libnetcdf.
pub struct NetCdfSource {
    path: PathBuf,
    file: netcdf::File,
}

impl NetCdfSource {
    /// Open a dataset for reading.
    ///
    /// Fails if the path does not exist or is not a NetCDF file.
    pub fn open<P: AsRef<Path>>(path: P) -> ReaderResult<Self> {
        let path = path.as_ref();
        silence_hdf5_errors();

        if !path.is_file() {
            return Err(ReaderError::OpenFailed {
                path: path.to_path_buf(),
                reason: "no such file".to_string(),
            });
        }

        let file = netcdf::open(path).map_err(|e| ReaderError::OpenFailed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        info!(path = %path.display(), variables = file.variables().count(), "Opened dataset");

        Ok(Self {
            path: path.to_path_buf(),
            file,
        })
    }

    /// Path the dataset was opened from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn variable(&self, name: &str) -> ReaderResult<netcdf::Variable<'_>> {
        self.file
            .variable(name)
            .ok_or_else(|| ReaderError::MissingVariable(name.to_string()))
    }

    fn checked_variable(
        &self,
        name: &str,
        extents: &[Range<usize>],
    ) -> ReaderResult<netcdf::Variable<'_>> {
        let var = self.variable(name)?;
        let shape: Vec<usize> = var.dimensions().iter().map(|d| d.len()).collect();
        checked_extent_len(name, &shape, extents)?;
        Ok(var)
    }
}

impl GridSource for NetCdfSource {
    fn variable_names(&self) -> Vec<String> {
        self.file.variables().map(|v| v.name()).collect()
    }

    fn variable_shape(&self, name: &str) -> Option<Vec<usize>> {
        self.file
            .variable(name)
            .map(|v| v.dimensions().iter().map(|d| d.len()).collect())
    }

    fn read_f32(&self, name: &str, extents: &[Range<usize>]) -> ReaderResult<Vec<f32>> {
        let var = self.checked_variable(name, extents)?;
        let values: Vec<f32> = var
            .get_values(extents)
            .map_err(|e| ReaderError::read_failed(name, e))?;
        debug!(variable = name, extents = ?extents, len = values.len(), "Read hyperslab");
        Ok(values)
    }

    fn read_f64(&self, name: &str, extents: &[Range<usize>]) -> ReaderResult<Vec<f64>> {
        let var = self.checked_variable(name, extents)?;
        var.get_values(extents)
            .map_err(|e| ReaderError::read_failed(name, e))
    }

    fn read_text_rows(&self, name: &str) -> ReaderResult<Vec<Vec<u8>>> {
        let var = self.variable(name)?;
        let shape: Vec<usize> = var.dimensions().iter().map(|d| d.len()).collect();
        let [rows, width] = shape[..] else {
            return Err(ReaderError::read_failed(
                name,
                format!("expected a 2D character variable, got shape {:?}", shape),
            ));
        };

        // NC_CHAR is one byte per element, so the raw buffer is the text itself.
        let raw = var
            .get_raw_values(..)
            .map_err(|e| ReaderError::read_failed(name, e))?;
        if raw.len() != rows * width {
            return Err(ReaderError::read_failed(
                name,
                format!("expected {} bytes, got {}", rows * width, raw.len()),
            ));
        }

        Ok(raw.chunks(width.max(1)).map(<[u8]>::to_vec).collect())
    }
}
