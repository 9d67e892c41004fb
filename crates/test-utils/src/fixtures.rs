//! Synthetic WRF datasets for tests.
//!
//! [`WrfFixture`] builds a `MemorySource` with the variables a `wrfout` file
//! carries for the default export set, on a small regular grid.

use wrf_reader::MemorySource;

use crate::generators::*;

/// Common domain definitions for testing.
pub mod domain {
    /// A small regular lat/lon domain.
    #[derive(Debug, Clone, Copy)]
    pub struct DomainSpec {
        pub ny: usize,
        pub nx: usize,
        /// `(min_lat, min_lon)`
        pub corner: (f32, f32),
        /// `(lat_step, lon_step)`
        pub step: (f32, f32),
    }

    impl DomainSpec {
        pub fn size(&self) -> usize {
            self.ny * self.nx
        }
    }

    /// 4 x 5 cells over the Arabian Sea.
    pub const SMALL: DomainSpec = DomainSpec {
        ny: 4,
        nx: 5,
        corner: (20.0, 60.0),
        step: (0.5, 0.5),
    };

    /// Single cell.
    pub const POINT: DomainSpec = DomainSpec {
        ny: 1,
        nx: 1,
        corner: (25.0, 55.0),
        step: (0.0, 0.0),
    };
}

/// Common timing values for testing.
pub mod time {
    /// Forecast initialization used by default fixtures.
    pub const INITIAL_TIMESTAMP: &str = "2025-05-14_00:00:00";

    /// Output directory name for [`INITIAL_TIMESTAMP`].
    pub const INITIAL_DATE: &str = "20250514";
}

/// Builder for a synthetic WRF dataset.
///
/// ```
/// use test_utils::{domain, WrfFixture};
///
/// let source = WrfFixture::new(domain::SMALL, 3).vertical_levels(2).build();
/// ```
#[derive(Debug, Clone)]
pub struct WrfFixture {
    domain: domain::DomainSpec,
    steps: usize,
    levels: usize,
    start: Option<String>,
    rain_rate: f32,
    invalid_cells: Vec<usize>,
    omitted: Vec<&'static str>,
}

impl WrfFixture {
    /// `steps` hourly outputs on `domain`, with timestamps from
    /// [`time::INITIAL_TIMESTAMP`].
    pub fn new(domain: domain::DomainSpec, steps: usize) -> Self {
        Self {
            domain,
            steps,
            levels: 3,
            start: Some(time::INITIAL_TIMESTAMP.to_string()),
            rain_rate: 1.25,
            invalid_cells: Vec::new(),
            omitted: Vec::new(),
        }
    }

    /// Number of vertical levels of the 4D variables.
    pub fn vertical_levels(mut self, levels: usize) -> Self {
        self.levels = levels;
        self
    }

    /// First timestamp; later ones follow hourly.
    pub fn starting_at(mut self, start: &str) -> Self {
        self.start = Some(start.to_string());
        self
    }

    /// Leave out the `Times` variable.
    pub fn without_timestamps(mut self) -> Self {
        self.start = None;
        self
    }

    /// Hourly rain added to each of RAINC and RAINNC.
    pub fn rain_rate(mut self, rate: f32) -> Self {
        self.rain_rate = rate;
        self
    }

    /// Give a cell a NaN latitude (row-major index).
    pub fn invalid_cell(mut self, index: usize) -> Self {
        self.invalid_cells.push(index);
        self
    }

    /// Leave a variable out of the dataset.
    pub fn omit(mut self, name: &'static str) -> Self {
        self.omitted.push(name);
        self
    }

    /// Build the dataset.
    pub fn build(&self) -> MemorySource {
        let (nt, nz) = (self.steps, self.levels);
        let domain::DomainSpec { ny, nx, .. } = self.domain;
        let series = [nt, ny, nx];
        let levels = [nt, nz, ny, nx];

        let (mut lats, lons) = create_lat_lon_grid(ny, nx, self.domain.corner, self.domain.step);
        for &i in &self.invalid_cells {
            lats[i] = f32::NAN;
        }

        let mut fields: Vec<(&'static str, Vec<usize>, Vec<f32>)> = vec![
            ("XLAT", series.to_vec(), repeat_plane(&lats, nt)),
            ("XLONG", series.to_vec(), repeat_plane(&lons, nt)),
            ("T2", series.to_vec(), create_temperature_series(nt, ny, nx)),
            ("TSK", series.to_vec(), create_temperature_series(nt, ny, nx)),
            ("SST", series.to_vec(), create_temperature_series(nt, ny, nx)),
            ("U10", series.to_vec(), create_wind_series(nt, ny, nx)),
            ("V10", series.to_vec(), create_wind_series(nt, ny, nx)),
            ("PSFC", series.to_vec(), create_pressure_series(nt, ny, nx)),
            (
                "RAINC",
                series.to_vec(),
                create_accumulated_rain(nt, ny, nx, self.rain_rate),
            ),
            (
                "RAINNC",
                series.to_vec(),
                create_accumulated_rain(nt, ny, nx, self.rain_rate),
            ),
            (
                "QVAPOR",
                levels.to_vec(),
                create_mixing_ratio_levels(nt, nz, ny, nx),
            ),
            (
                "P",
                levels.to_vec(),
                (0..nt * nz * ny * nx).map(|i| 500.0 + i as f32).collect(),
            ),
            ("HGT", vec![ny, nx], create_test_grid(nx, ny)),
        ];
        fields.retain(|(name, _, _)| !self.omitted.contains(name));

        let mut source = MemorySource::new();
        for (name, shape, values) in fields {
            source = source.with_f32(name, &shape, values);
        }

        if !self.omitted.contains(&"XTIME") {
            source = source.with_f64("XTIME", &[nt], create_xtime_minutes(nt));
        }
        if let Some(start) = &self.start {
            let times = create_wrf_timestamps(start, nt);
            let rows: Vec<&str> = times.iter().map(String::as_str).collect();
            source = source.with_text_rows("Times", &rows, 19);
        }
        source
    }
}
