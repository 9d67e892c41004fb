//! Field and grid types shared across the pipeline.

use serde::Serialize;

/// One variable at one timestep: `levels` stacked `ny × nx` planes, row-major.
///
/// NaN marks a missing value.
#[derive(Debug, Clone, PartialEq)]
pub struct GridField {
    pub data: Vec<f32>,
    pub levels: usize,
    pub ny: usize,
    pub nx: usize,
}

impl GridField {
    /// Create a single-level field.
    ///
    /// # Panics
    ///
    /// Panics if `data.len() != ny * nx`.
    pub fn new(data: Vec<f32>, ny: usize, nx: usize) -> Self {
        Self::with_levels(data, 1, ny, nx)
    }

    /// Create a field with `levels` stacked planes.
    ///
    /// # Panics
    ///
    /// Panics if `data.len() != levels * ny * nx`.
    pub fn with_levels(data: Vec<f32>, levels: usize, ny: usize, nx: usize) -> Self {
        assert_eq!(data.len(), levels * ny * nx, "field data does not match its shape");
        Self { data, levels, ny, nx }
    }

    /// Shape as `(levels, ny, nx)`.
    pub fn shape(&self) -> (usize, usize, usize) {
        (self.levels, self.ny, self.nx)
    }

    /// Number of cells in one plane.
    pub fn plane_len(&self) -> usize {
        self.ny * self.nx
    }

    /// Values of one vertical level.
    pub fn level(&self, level: usize) -> Option<&[f32]> {
        let len = self.plane_len();
        (level < self.levels).then(|| &self.data[level * len..(level + 1) * len])
    }

    /// Lowest level, which is the whole field for single-level variables.
    ///
    /// Empty when the field has no levels.
    pub fn surface(&self) -> &[f32] {
        &self.data[..self.plane_len().min(self.data.len())]
    }

    /// True if every value is NaN.
    pub fn all_missing(&self) -> bool {
        self.data.iter().all(|v| v.is_nan())
    }

    /// Count of non-NaN values.
    pub fn valid_count(&self) -> usize {
        self.data.iter().filter(|v| !v.is_nan()).count()
    }

    /// NaN-ignoring `(min, max)`, `None` if the field is entirely missing.
    pub fn nan_min_max(&self) -> Option<(f32, f32)> {
        nan_min_max(&self.data)
    }
}

/// NaN-ignoring `(min, max)` of a slice.
pub fn nan_min_max(values: &[f32]) -> Option<(f32, f32)> {
    values
        .iter()
        .copied()
        .filter(|v| !v.is_nan())
        .fold(None, |acc, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
}

/// Latitude/longitude of every grid cell, plus the cells that carry data.
///
/// Computed once per run. The valid-point list is the index space of every
/// quantized array in every archive of that run.
#[derive(Debug, Clone)]
pub struct GridCoordinates {
    lats: Vec<f32>,
    lons: Vec<f32>,
    ny: usize,
    nx: usize,
    valid_points: Vec<usize>,
}

/// Grid placement written to each archive.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GridInfo {
    /// `[min_lat, min_lon]`
    pub corner: [f64; 2],
    /// `[lat_step, lon_step]`
    pub steps: [f64; 2],
    /// `[ny, nx]`
    pub size: [usize; 2],
}

impl GridCoordinates {
    /// Build from latitude and longitude planes of the same shape.
    ///
    /// Returns `None` if the two planes disagree in shape.
    pub fn new(lat: GridField, lon: GridField) -> Option<Self> {
        if (lat.ny, lat.nx) != (lon.ny, lon.nx) {
            return None;
        }
        let (ny, nx) = (lat.ny, lat.nx);
        let lats = lat.surface().to_vec();
        let lons = lon.surface().to_vec();

        let valid_points = lats
            .iter()
            .zip(&lons)
            .enumerate()
            .filter(|(_, (la, lo))| la.is_finite() && lo.is_finite())
            .map(|(i, _)| i)
            .collect();

        Some(Self {
            lats,
            lons,
            ny,
            nx,
            valid_points,
        })
    }

    /// Grid shape `(ny, nx)`.
    pub fn shape(&self) -> (usize, usize) {
        (self.ny, self.nx)
    }

    /// Row-major indices of cells with finite latitude and longitude.
    pub fn valid_points(&self) -> &[usize] {
        &self.valid_points
    }

    /// Number of valid cells.
    pub fn valid_count(&self) -> usize {
        self.valid_points.len()
    }

    /// NaN-ignoring latitude range.
    pub fn lat_range(&self) -> Option<(f32, f32)> {
        nan_min_max(&self.lats)
    }

    /// NaN-ignoring longitude range.
    pub fn lon_range(&self) -> Option<(f32, f32)> {
        nan_min_max(&self.lons)
    }

    /// Restrict a plane to the valid cells, in valid-point order.
    pub fn select(&self, plane: &[f32]) -> Vec<f32> {
        self.valid_points.iter().map(|&i| plane[i]).collect()
    }

    /// Corner, step and size of the grid.
    ///
    /// Steps assume a uniform grid: `(max - min) / (n - 1)`, or zero for a
    /// single-row/column axis.
    pub fn grid_info(&self) -> GridInfo {
        let (lat_min, lat_max) = self.lat_range().unwrap_or((f32::NAN, f32::NAN));
        let (lon_min, lon_max) = self.lon_range().unwrap_or((f32::NAN, f32::NAN));

        let step = |lo: f32, hi: f32, n: usize| -> f64 {
            if n > 1 {
                ((hi - lo) / (n - 1) as f32) as f64
            } else {
                0.0
            }
        };

        GridInfo {
            corner: [lat_min as f64, lon_min as f64],
            steps: [step(lat_min, lat_max, self.ny), step(lon_min, lon_max, self.nx)],
            size: [self.ny, self.nx],
        }
    }
}
