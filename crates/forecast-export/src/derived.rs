//! Derived variables: relative humidity and hourly precipitation.
//!
//! Neither is stored in `wrfout` files directly. Relative humidity is computed
//! from 2 m temperature, surface pressure and water vapor mixing ratio;
//! hourly precipitation is the difference of the accumulated convective and
//! non-convective rain totals between consecutive output times.

use tracing::{debug, warn};
use wrf_reader::GridSource;

use crate::extract::extract_surface;
use crate::field::GridField;
use crate::sanitize;

/// Ratio of molecular weights of water vapor and dry air.
pub const EPS: f32 = 0.622;
/// Saturation vapor pressure at the reference temperature (Pa).
pub const SVP1: f32 = 611.2;
/// Magnus coefficient (dimensionless).
pub const SVP2: f32 = 17.67;
/// Reference temperature (K).
pub const SVPT0: f32 = 273.15;
/// Magnus temperature offset (K).
pub const SVP3: f32 = 29.65;

const ONE_MINUS_EPS: f32 = (1.0f64 - 0.622f64) as f32;

/// Name under which the rain difference is sanitized.
pub const HOURLY_RAIN: &str = "HOURLY_RAIN";

/// Variables computed from other fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DerivedVariable {
    /// `RH`
    RelativeHumidity,
    /// `TOTAL_RAIN`
    TotalRain,
}

impl DerivedVariable {
    /// Map a variable name to its derivation.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "RH" => Some(Self::RelativeHumidity),
            "TOTAL_RAIN" => Some(Self::TotalRain),
            _ => None,
        }
    }
}

// ============================================================================
// Relative humidity
// ============================================================================

/// Relative humidity (%) at `time_index`.
///
/// Uses QVAPOR (lowest level), T2 and PSFC. When temperature or pressure is
/// unavailable, falls back to humidity rescaled to 0–100 over its own range.
pub fn relative_humidity(source: &dyn GridSource, time_index: usize) -> Option<GridField> {
    let Some(qvapor) = extract_surface(source, "QVAPOR", time_index) else {
        warn!(time_index, "QVAPOR is missing, cannot compute RH");
        return None;
    };
    let temperature = extract_surface(source, "T2", time_index);
    let pressure = extract_surface(source, "PSFC", time_index);

    match (temperature, pressure) {
        (Some(t), Some(p)) => rh_from_fields(&qvapor, &t, &p),
        _ => {
            debug!(
                time_index,
                "Missing temperature or pressure, using simplified RH from QVAPOR only"
            );
            rh_fallback(&qvapor)
        }
    }
}

/// Normalized humidity estimate: `100 * (q - min) / (max - min)`.
///
/// `None` when q is constant or entirely missing.
pub fn rh_fallback(qvapor: &GridField) -> Option<GridField> {
    let (min_q, max_q) = qvapor.nan_min_max()?;
    if max_q <= min_q {
        warn!(min = min_q, max = max_q, "Invalid QVAPOR range for fallback RH calculation");
        return None;
    }

    let data = qvapor
        .data
        .iter()
        .map(|&q| 100.0 * (q - min_q) / (max_q - min_q))
        .collect();
    Some(GridField::with_levels(data, qvapor.levels, qvapor.ny, qvapor.nx))
}

/// Relative humidity from mixing ratio `q` (kg/kg), temperature `t` (K) and
/// pressure `p` (Pa), clamped to 0–100.
pub fn rh_from_fields(q: &GridField, t: &GridField, p: &GridField) -> Option<GridField> {
    if q.all_missing() || t.all_missing() || p.all_missing() {
        warn!("All values are NaN in one or more RH inputs");
        return None;
    }
    if q.shape() != t.shape() || q.shape() != p.shape() {
        warn!(
            qvapor = ?q.shape(),
            temperature = ?t.shape(),
            pressure = ?p.shape(),
            "RH: shape mismatch among inputs"
        );
        return None;
    }

    let data: Vec<f32> = q
        .data
        .iter()
        .zip(&t.data)
        .zip(&p.data)
        .map(|((&q, &t), &p)| {
            let svp = SVP1 * (SVP2 * (t - SVPT0) / (t - SVP3)).exp();
            let vapor_pressure = p * q / (q * ONE_MINUS_EPS + EPS);
            // clamp keeps NaN
            (100.0 * vapor_pressure / svp).clamp(0.0, 100.0)
        })
        .collect();

    if data.iter().all(|v| v.is_nan()) {
        warn!("All RH values are NaN after calculation, check input data ranges");
        return None;
    }

    Some(GridField::with_levels(data, q.levels, q.ny, q.nx))
}

// ============================================================================
// Hourly precipitation
// ============================================================================

/// Accumulated rain totals at one time step.
#[derive(Debug, Clone)]
pub struct RainTotals {
    pub time_index: usize,
    pub convective: GridField,
    pub non_convective: GridField,
}

impl RainTotals {
    /// Extract RAINC and RAINNC; `None` if either is missing.
    pub fn extract(source: &dyn GridSource, time_index: usize) -> Option<Self> {
        let convective = extract_surface(source, "RAINC", time_index)?;
        let non_convective = extract_surface(source, "RAINNC", time_index)?;
        Some(Self {
            time_index,
            convective,
            non_convective,
        })
    }
}

/// Rain accumulated between `prev` and `now` (mm), sanitized.
///
/// `None` if the four source fields do not all share a shape.
pub fn rain_difference(now: &RainTotals, prev: &RainTotals) -> Option<GridField> {
    let shape = now.convective.shape();
    if now.non_convective.shape() != shape
        || prev.convective.shape() != shape
        || prev.non_convective.shape() != shape
    {
        warn!(
            rainc_now = ?shape,
            rainnc_now = ?now.non_convective.shape(),
            rainc_prev = ?prev.convective.shape(),
            rainnc_prev = ?prev.non_convective.shape(),
            "HOURLY_RAIN: shape mismatch among rain components"
        );
        return None;
    }

    let mut data: Vec<f32> = now
        .convective
        .data
        .iter()
        .zip(&now.non_convective.data)
        .zip(prev.convective.data.iter().zip(&prev.non_convective.data))
        .map(|((&c_now, &nc_now), (&c_prev, &nc_prev))| (c_now + nc_now) - (c_prev + nc_prev))
        .collect();
    sanitize::clean(&mut data, HOURLY_RAIN);

    let (levels, ny, nx) = shape;
    Some(GridField::with_levels(data, levels, ny, nx))
}

/// Hourly precipitation at `time_index`, re-extracting both time steps.
///
/// Always `None` at the first time step.
pub fn total_rain(source: &dyn GridSource, time_index: usize) -> Option<GridField> {
    if time_index == 0 {
        return None;
    }
    let now = RainTotals::extract(source, time_index)?;
    let prev = RainTotals::extract(source, time_index - 1)?;
    rain_difference(&now, &prev)
}

// ============================================================================
// Engine
// ============================================================================

/// Computes derived variables across a run.
///
/// Keeps the previous step's rain totals so a sequential pass reads each
/// accumulation field once. A lookback for a different time index is
/// discarded and the previous step is read again.
#[derive(Debug, Default)]
pub struct DerivedEngine {
    rain_lookback: Option<RainTotals>,
}

impl DerivedEngine {
    /// Create an engine with an empty lookback.
    pub fn new() -> Self {
        Self::default()
    }

    /// Compute a derived variable by name. Unknown names yield `None`.
    pub fn compute(
        &mut self,
        source: &dyn GridSource,
        name: &str,
        time_index: usize,
    ) -> Option<GridField> {
        match DerivedVariable::from_name(name) {
            Some(DerivedVariable::RelativeHumidity) => relative_humidity(source, time_index),
            Some(DerivedVariable::TotalRain) => self.total_rain(source, time_index),
            None => {
                warn!(variable = name, "Unknown custom variable");
                None
            }
        }
    }

    /// Hourly precipitation, using the lookback for the previous step.
    pub fn total_rain(&mut self, source: &dyn GridSource, time_index: usize) -> Option<GridField> {
        let now = RainTotals::extract(source, time_index);
        if time_index == 0 {
            self.rain_lookback = now;
            return None;
        }

        let prev = match self.rain_lookback.take() {
            Some(prev) if prev.time_index == time_index - 1 => Some(prev),
            _ => RainTotals::extract(source, time_index - 1),
        };

        let result = match (&now, &prev) {
            (Some(now), Some(prev)) => rain_difference(now, prev),
            _ => None,
        };
        self.rain_lookback = now;
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wrf_reader::MemorySource;

    fn field(values: &[f32]) -> GridField {
        GridField::new(values.to_vec(), 1, values.len())
    }

    fn rain_source() -> MemorySource {
        // (time=3, lat=1, lon=1)
        MemorySource::new()
            .with_f32("RAINC", &[3, 1, 1], vec![0.0, 2.0, 5.0])
            .with_f32("RAINNC", &[3, 1, 1], vec![0.0, 1.0, 3.0])
    }

    #[test]
    fn test_rain_at_first_step_is_none() {
        assert!(total_rain(&rain_source(), 0).is_none());
        assert!(DerivedEngine::new().total_rain(&rain_source(), 0).is_none());
    }

    #[test]
    fn test_rain_difference() {
        let rain = total_rain(&rain_source(), 2).unwrap();
        assert_eq!(rain.data, vec![5.0]);
    }

    #[test]
    fn test_rain_requires_all_components() {
        let source = MemorySource::new().with_f32("RAINC", &[2, 1, 1], vec![0.0, 1.0]);
        assert!(total_rain(&source, 1).is_none());
    }

    #[test]
    fn test_rain_shape_mismatch() {
        let now = RainTotals {
            time_index: 1,
            convective: field(&[1.0, 2.0]),
            non_convective: field(&[1.0, 2.0]),
        };
        let prev = RainTotals {
            time_index: 0,
            convective: field(&[1.0]),
            non_convective: field(&[1.0, 2.0]),
        };
        assert!(rain_difference(&now, &prev).is_none());
    }

    #[test]
    fn test_engine_lookback_matches_recompute() {
        let source = rain_source();
        let mut engine = DerivedEngine::new();
        assert!(engine.total_rain(&source, 0).is_none());
        assert_eq!(engine.total_rain(&source, 1).unwrap().data, vec![3.0]);
        assert_eq!(engine.total_rain(&source, 2).unwrap().data, vec![5.0]);
        // out of order: lookback is stale and gets re-read
        assert_eq!(engine.total_rain(&source, 1).unwrap().data, vec![3.0]);
    }

    #[test]
    fn test_rh_fallback_rescales() {
        let rh = rh_fallback(&field(&[0.001, 0.002, 0.003])).unwrap();
        assert!((rh.data[0] - 0.0).abs() < 1e-3);
        assert!((rh.data[1] - 50.0).abs() < 1e-3);
        assert!((rh.data[2] - 100.0).abs() < 1e-3);
    }

    #[test]
    fn test_rh_fallback_constant_is_none() {
        assert!(rh_fallback(&field(&[0.002, 0.002])).is_none());
        assert!(rh_fallback(&field(&[f32::NAN, f32::NAN])).is_none());
    }

    #[test]
    fn test_rh_from_source_uses_fallback() {
        let source = MemorySource::new().with_f32("QVAPOR", &[1, 1, 1, 3], vec![0.001, 0.002, 0.003]);
        let rh = relative_humidity(&source, 0).unwrap();
        assert!((rh.data[1] - 50.0).abs() < 1e-3);
    }

    #[test]
    fn test_rh_without_qvapor() {
        let source = MemorySource::new()
            .with_f32("T2", &[1, 1, 1], vec![300.0])
            .with_f32("PSFC", &[1, 1, 1], vec![100000.0]);
        assert!(relative_humidity(&source, 0).is_none());
    }

    #[test]
    fn test_rh_formula() {
        // 20 °C, 1000 hPa, 10 g/kg → about 68 %
        let rh = rh_from_fields(&field(&[0.010]), &field(&[293.15]), &field(&[100000.0])).unwrap();
        let svp = 611.2 * (17.67f64 * 20.0 / (293.15 - 29.65)).exp();
        let e = 100000.0 * 0.010 / (0.010 * 0.378 + 0.622);
        let expected = 100.0 * e / svp;
        assert!((rh.data[0] as f64 - expected).abs() < 0.01, "{} vs {}", rh.data[0], expected);
    }

    #[test]
    fn test_rh_is_clamped_and_keeps_nan() {
        let rh = rh_from_fields(
            &field(&[0.09, 0.0, f32::NAN]),
            &field(&[250.0, 300.0, 300.0]),
            &field(&[100000.0, 100000.0, 100000.0]),
        )
        .unwrap();
        assert_eq!(rh.data[0], 100.0);
        assert_eq!(rh.data[1], 0.0);
        assert!(rh.data[2].is_nan());
    }

    #[test]
    fn test_rh_all_missing_input() {
        let nan = field(&[f32::NAN]);
        assert!(rh_from_fields(&field(&[0.01]), &nan, &field(&[1e5])).is_none());
    }

    #[test]
    fn test_rh_without_overlapping_cells() {
        // each input has data, but no cell has all three
        let rh = rh_from_fields(
            &field(&[0.01, f32::NAN, f32::NAN]),
            &field(&[f32::NAN, 293.15, f32::NAN]),
            &field(&[f32::NAN, f32::NAN, 1e5]),
        );
        assert!(rh.is_none());
    }

    #[test]
    fn test_derived_names() {
        assert_eq!(DerivedVariable::from_name("RH"), Some(DerivedVariable::RelativeHumidity));
        assert_eq!(DerivedVariable::from_name("TOTAL_RAIN"), Some(DerivedVariable::TotalRain));
        assert_eq!(DerivedVariable::from_name("T2"), None);
        let mut engine = DerivedEngine::new();
        assert!(engine.compute(&MemorySource::new(), "WIND_SPEED", 0).is_none());
    }
}
