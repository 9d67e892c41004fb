//! Value sanitizer.
//!
//! Model output mixes real values with encoding artifacts: fill values such as
//! `1e20` or `-9999999`, numerically blown-up cells, and infinities. Every
//! field is passed through [`clean`] before it is used, which converts all of
//! these to NaN. This is data hygiene, not an error path.

use tracing::debug;

use crate::tables::valid_range;

/// Magnitudes above this are treated as fill values.
pub const FILL_ABS_THRESHOLD: f32 = 1e10;

/// Values below this are treated as fill values.
pub const FILL_NEG_THRESHOLD: f32 = -1e6;

/// Replace fill, out-of-range and non-finite values with NaN, in place.
///
/// Variables without a registered range only get the fill-value and
/// infinity passes. Returns the number of values converted to NaN.
pub fn clean(values: &mut [f32], name: &str) -> usize {
    let mut cleaned = 0usize;

    // NetCDF writers use values like -9999999 or 1e+20 as fill values.
    for v in values.iter_mut() {
        if v.abs() > FILL_ABS_THRESHOLD || *v < FILL_NEG_THRESHOLD {
            *v = f32::NAN;
            cleaned += 1;
        }
    }

    if let Some(range) = valid_range(name) {
        let mut out_of_range = 0usize;
        for v in values.iter_mut() {
            if !v.is_nan() && !range.is_valid(*v) {
                *v = f32::NAN;
                out_of_range += 1;
            }
        }
        if out_of_range > 0 {
            debug!(
                variable = name,
                count = out_of_range,
                min = range.min,
                max = range.max,
                "Cleaned out-of-range values"
            );
        }
        cleaned += out_of_range;
    }

    for v in values.iter_mut() {
        if v.is_infinite() {
            *v = f32::NAN;
            cleaned += 1;
        }
    }

    cleaned
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fill_values_become_nan() {
        let mut values = vec![1e21, -1e7, 15.0, -9999.0];
        clean(&mut values, "UNREGISTERED");
        assert!(values[0].is_nan());
        assert!(values[1].is_nan());
        assert_eq!(values[2], 15.0);
        // -9999 is above the negative fill threshold and nothing else applies
        assert_eq!(values[3], -9999.0);
    }

    #[test]
    fn test_registered_range() {
        let mut values = vec![500.0, 20.0, -151.0, 350.0];
        let cleaned = clean(&mut values, "T2");
        assert!(values[0].is_nan());
        assert_eq!(values[1], 20.0);
        assert!(values[2].is_nan());
        assert_eq!(values[3], 350.0);
        assert_eq!(cleaned, 2);
    }

    #[test]
    fn test_fractional_range() {
        let mut values = vec![0.5, 1.1, 1.2, -0.01];
        clean(&mut values, "CLDFRA");
        assert_eq!(values[0], 0.5);
        assert_eq!(values[1], 1.1);
        assert!(values[2].is_nan());
        assert!(values[3].is_nan());
    }

    #[test]
    fn test_infinities_become_nan() {
        let mut values = vec![f32::INFINITY, f32::NEG_INFINITY, 1.0];
        clean(&mut values, "PSFC");
        assert!(values[0].is_nan());
        assert!(values[1].is_nan());
        assert_eq!(values[2], 1.0);
    }

    #[test]
    fn test_existing_nan_is_untouched() {
        let mut values = vec![f32::NAN, 3.0];
        assert_eq!(clean(&mut values, "QVAPOR"), 1);
        assert!(values[0].is_nan());
        assert!(values[1].is_nan(), "3.0 kg/kg is out of range");
    }
}
