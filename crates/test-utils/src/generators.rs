//! Test data generators for synthetic WRF-like fields.
//!
//! Every generator returns row-major data in the same `(time, [level,]
//! south_north, west_east)` order WRF uses, so the output can be passed
//! straight to `MemorySource::with_f32`.

/// Creates a test grid with predictable values.
///
/// Each cell value is calculated as: `col * 1000 + row`
///
/// # Example
///
/// ```
/// use test_utils::create_test_grid;
///
/// let grid = create_test_grid(10, 5);
/// assert_eq!(grid.len(), 50);
/// assert_eq!(grid[1], 1000.0); // col=1, row=0
/// assert_eq!(grid[10], 1.0);   // col=0, row=1
/// ```
pub fn create_test_grid(width: usize, height: usize) -> Vec<f32> {
    let mut data = Vec::with_capacity(width * height);
    for row in 0..height {
        for col in 0..width {
            data.push((col * 1000 + row) as f32);
        }
    }
    data
}

/// Latitude and longitude planes of a regular grid.
///
/// Latitude grows with the row, longitude with the column.
///
/// ```
/// use test_utils::create_lat_lon_grid;
///
/// let (lats, lons) = create_lat_lon_grid(2, 3, (10.0, 70.0), (0.5, 0.25));
/// assert_eq!(lats, vec![10.0, 10.0, 10.0, 10.5, 10.5, 10.5]);
/// assert_eq!(lons[..3], [70.0, 70.25, 70.5]);
/// ```
pub fn create_lat_lon_grid(
    ny: usize,
    nx: usize,
    corner: (f32, f32),
    step: (f32, f32),
) -> (Vec<f32>, Vec<f32>) {
    let mut lats = Vec::with_capacity(ny * nx);
    let mut lons = Vec::with_capacity(ny * nx);
    for row in 0..ny {
        for col in 0..nx {
            lats.push(corner.0 + row as f32 * step.0);
            lons.push(corner.1 + col as f32 * step.1);
        }
    }
    (lats, lons)
}

/// Repeats one plane `nt` times, as WRF does for XLAT/XLONG.
pub fn repeat_plane(plane: &[f32], nt: usize) -> Vec<f32> {
    plane.repeat(nt)
}

/// Temperature in Kelvin, `(nt, ny, nx)`.
///
/// A 250–310 K gradient across the grid that warms by 1 K per step.
pub fn create_temperature_series(nt: usize, ny: usize, nx: usize) -> Vec<f32> {
    let mut data = Vec::with_capacity(nt * ny * nx);
    for t in 0..nt {
        for row in 0..ny {
            for col in 0..nx {
                let x_factor = col as f32 / nx.max(1) as f32;
                let y_factor = row as f32 / ny.max(1) as f32;
                data.push(250.0 + x_factor * 30.0 + y_factor * 30.0 + t as f32);
            }
        }
    }
    data
}

/// Wind component in m/s, `(nt, ny, nx)`, alternating sign by column.
pub fn create_wind_series(nt: usize, ny: usize, nx: usize) -> Vec<f32> {
    let mut data = Vec::with_capacity(nt * ny * nx);
    for t in 0..nt {
        for row in 0..ny {
            for col in 0..nx {
                let speed = 2.0 + row as f32 * 0.5 + t as f32 * 0.25;
                data.push(if col % 2 == 0 { speed } else { -speed });
            }
        }
    }
    data
}

/// Accumulated precipitation in mm, `(nt, ny, nx)`.
///
/// Grows linearly by `rate` per step, so the difference between
/// consecutive steps is `rate` everywhere.
pub fn create_accumulated_rain(nt: usize, ny: usize, nx: usize, rate: f32) -> Vec<f32> {
    (0..nt)
        .flat_map(|t| std::iter::repeat(t as f32 * rate).take(ny * nx))
        .collect()
}

/// Surface pressure in Pa, `(nt, ny, nx)`.
pub fn create_pressure_series(nt: usize, ny: usize, nx: usize) -> Vec<f32> {
    let mut data = Vec::with_capacity(nt * ny * nx);
    for _ in 0..nt {
        for row in 0..ny {
            for _ in 0..nx {
                data.push(101_325.0 - row as f32 * 100.0);
            }
        }
    }
    data
}

/// Water vapor mixing ratio in kg/kg, `(nt, nz, ny, nx)`.
///
/// Decreases with height: level `k` holds `0.012 / (k + 1)`.
pub fn create_mixing_ratio_levels(nt: usize, nz: usize, ny: usize, nx: usize) -> Vec<f32> {
    let mut data = Vec::with_capacity(nt * nz * ny * nx);
    for _ in 0..nt {
        for k in 0..nz {
            let q = 0.012 / (k + 1) as f32;
            data.extend(std::iter::repeat(q).take(ny * nx));
        }
    }
    data
}

/// `XTIME` values: minutes since simulation start, one per hour.
pub fn create_xtime_minutes(nt: usize) -> Vec<f64> {
    (0..nt).map(|t| (t * 60) as f64).collect()
}

/// Hourly WRF timestamps (`YYYY-MM-DD_HH:MM:SS`) starting at `start`.
///
/// ```
/// use test_utils::create_wrf_timestamps;
///
/// let times = create_wrf_timestamps("2025-05-14_22:00:00", 3);
/// assert_eq!(times[2], "2025-05-15_00:00:00");
/// ```
pub fn create_wrf_timestamps(start: &str, nt: usize) -> Vec<String> {
    let start = chrono::NaiveDateTime::parse_from_str(start, WRF_TIME_FORMAT)
        .unwrap_or_else(|e| panic!("invalid WRF timestamp {start:?}: {e}"));
    (0..nt)
        .map(|t| {
            (start + chrono::Duration::hours(t as i64))
                .format(WRF_TIME_FORMAT)
                .to_string()
        })
        .collect()
}

/// `Times` format used by WRF.
pub const WRF_TIME_FORMAT: &str = "%Y-%m-%d_%H:%M:%S";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_test_grid() {
        let grid = create_test_grid(3, 2);
        assert_eq!(grid, vec![0.0, 1000.0, 2000.0, 1.0, 1001.0, 2001.0]);
    }

    #[test]
    fn test_temperature_series_is_plausible() {
        let data = create_temperature_series(2, 4, 4);
        assert_eq!(data.len(), 32);
        assert!(data.iter().all(|&t| (250.0..=320.0).contains(&t)));
        assert_eq!(data[16], data[0] + 1.0);
    }

    #[test]
    fn test_accumulated_rain_differences() {
        let data = create_accumulated_rain(3, 1, 2, 1.5);
        assert_eq!(data, vec![0.0, 0.0, 1.5, 1.5, 3.0, 3.0]);
    }

    #[test]
    fn test_mixing_ratio_levels() {
        let data = create_mixing_ratio_levels(1, 2, 1, 1);
        assert_eq!(data, vec![0.012, 0.006]);
    }

    #[test]
    fn test_xtime_and_timestamps() {
        assert_eq!(create_xtime_minutes(3), vec![0.0, 60.0, 120.0]);
        let times = create_wrf_timestamps("2025-05-14_00:00:00", 2);
        assert_eq!(times, vec!["2025-05-14_00:00:00", "2025-05-14_01:00:00"]);
    }
}
