//! Per-variable policy tables.
//!
//! Two fixed lookups drive the pipeline:
//!
//! - [`valid_range`]: physical bounds used by the sanitizer. Values outside
//!   the range are converted to NaN.
//! - [`VariablePolicy::lookup`]: the fixed-point encoding of each exported
//!   variable (scale factor, integer width, Kelvin→Celsius conversion).
//!
//! Both tables are part of the archive wire format. Downstream readers decode
//! values with the same scales, so entries must not change without a
//! coordinated reader release.

// ============================================================================
// Valid ranges
// ============================================================================

/// Valid data range for a variable. Values outside this range are converted to NaN.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValidRange {
    /// Minimum valid value (inclusive).
    pub min: f32,
    /// Maximum valid value (inclusive).
    pub max: f32,
}

impl ValidRange {
    /// Create a new valid range.
    pub const fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    /// Check if a value is within the valid range.
    #[inline]
    pub fn is_valid(&self, value: f32) -> bool {
        value >= self.min && value <= self.max
    }
}

/// Bounds are applied to values as read from the file.
const VALID_RANGES: &[(&str, ValidRange)] = &[
    ("T2", ValidRange::new(-150.0, 350.0)),
    ("TSK", ValidRange::new(-150.0, 350.0)),
    ("SST", ValidRange::new(-150.0, 350.0)),
    ("U10", ValidRange::new(-200.0, 200.0)),
    ("V10", ValidRange::new(-200.0, 200.0)),
    ("P", ValidRange::new(0.0, 110000.0)),
    ("QVAPOR", ValidRange::new(0.0, 0.1)),
    ("RAINC", ValidRange::new(0.0, 1000.0)),
    ("RAINNC", ValidRange::new(0.0, 1000.0)),
    ("PBLH", ValidRange::new(0.0, 5000.0)),
    ("CLDFRA", ValidRange::new(0.0, 1.1)),
    ("ALBEDO", ValidRange::new(0.0, 1.1)),
    ("VEGFRA", ValidRange::new(0.0, 1.1)),
    ("EMISS", ValidRange::new(0.0, 1.1)),
    ("TKE_PBL", ValidRange::new(0.0, 100.0)),
];

/// Get the registered valid range for a variable, if any.
pub fn valid_range(name: &str) -> Option<ValidRange> {
    VALID_RANGES
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, range)| *range)
}

// ============================================================================
// Encoding policy
// ============================================================================

/// Storage type of a quantized variable in the archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputDtype {
    Int16,
    Uint16,
    Uint32,
    Float32,
}

impl OutputDtype {
    /// Type name as used by numpy-style readers.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Int16 => "int16",
            Self::Uint16 => "uint16",
            Self::Uint32 => "uint32",
            Self::Float32 => "float32",
        }
    }

    /// Whether values are stored as scaled integers.
    pub fn is_integer(&self) -> bool {
        !matches!(self, Self::Float32)
    }

    /// Smallest and largest representable values, `None` for float32.
    pub fn integer_bounds(&self) -> Option<(i64, i64)> {
        match self {
            Self::Int16 => Some((i16::MIN as i64, i16::MAX as i64)),
            Self::Uint16 => Some((0, u16::MAX as i64)),
            Self::Uint32 => Some((0, u32::MAX as i64)),
            Self::Float32 => None,
        }
    }

    /// Reserved "missing" code: the type's maximum value.
    pub fn sentinel(&self) -> Option<i64> {
        self.integer_bounds().map(|(_, max)| max)
    }
}

impl std::fmt::Display for OutputDtype {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How one variable is encoded in the archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VariablePolicy {
    /// Descriptive output name.
    pub label: &'static str,
    /// Multiplier applied before integer truncation.
    pub scale: u32,
    /// Archive storage type.
    pub dtype: OutputDtype,
    /// Subtract 273.15 (Kelvin→Celsius) before scaling.
    pub convert_temp: bool,
    /// Computed from other fields rather than read from the dataset.
    pub custom: bool,
    /// Read with every vertical level; the archive keeps the lowest one.
    pub multi_level: bool,
}

impl VariablePolicy {
    const fn stored(label: &'static str, scale: u32, dtype: OutputDtype) -> Self {
        Self {
            label,
            scale,
            dtype,
            convert_temp: false,
            custom: false,
            multi_level: false,
        }
    }

    const fn temperature(label: &'static str) -> Self {
        Self {
            convert_temp: true,
            ..Self::stored(label, 100, OutputDtype::Int16)
        }
    }

    const fn levels(self) -> Self {
        Self {
            multi_level: true,
            ..self
        }
    }

    const fn derived(label: &'static str) -> Self {
        Self {
            custom: true,
            ..Self::stored(label, 100, OutputDtype::Uint16)
        }
    }

    /// Look up the policy for a variable, falling back to [`DEFAULT_POLICY`].
    pub fn lookup(name: &str) -> &'static VariablePolicy {
        POLICIES
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, policy)| policy)
            .unwrap_or(&DEFAULT_POLICY)
    }

    /// Whether the variable has an explicit table entry.
    pub fn is_known(name: &str) -> bool {
        POLICIES.iter().any(|(n, _)| *n == name)
    }
}

/// Policy for variables without a table entry: unscaled float32.
pub const DEFAULT_POLICY: VariablePolicy = VariablePolicy::stored("unknown", 1, OutputDtype::Float32);

use OutputDtype::*;

const POLICIES: &[(&str, VariablePolicy)] = &[
    ("ALBEDO", VariablePolicy::stored("albedo", 10000, Uint16)),
    ("CLDFRA", VariablePolicy::stored("cloud_fraction", 10000, Uint16).levels()),
    ("EMISS", VariablePolicy::stored("surface_emissivity", 10000, Uint16)),
    ("P", VariablePolicy::stored("pressure", 1, Float32).levels()),
    ("PBLH", VariablePolicy::stored("planetary_boundary_layer_height", 10, Uint16)),
    ("QVAPOR", VariablePolicy::stored("specific_humidity", 1_000_000, Uint32).levels()),
    ("RAINC", VariablePolicy::stored("convective_rain", 100, Uint16)),
    ("RAINNC", VariablePolicy::stored("non_convective_rain", 100, Uint16)),
    ("SST", VariablePolicy::temperature("sea_surface_temperature")),
    ("T2", VariablePolicy::temperature("temperature_2m")),
    ("TKE_PBL", VariablePolicy::stored("turbulent_kinetic_energy", 1000, Uint32).levels()),
    ("TSK", VariablePolicy::temperature("skin_temperature")),
    ("U10", VariablePolicy::stored("eastward_wind_10m", 100, Int16)),
    ("V10", VariablePolicy::stored("northward_wind_10m", 100, Int16)),
    ("VEGFRA", VariablePolicy::stored("vegetation_fraction", 10000, Uint16)),
    // Derived
    ("RH", VariablePolicy::derived("relative_humidity")),
    ("TOTAL_RAIN", VariablePolicy::derived("total_precipitation")),
];

/// Variables exported by default, in archive order.
pub const DEFAULT_VARIABLES: &[&str] = &["T2", "TSK", "SST", "U10", "V10", "RH", "TOTAL_RAIN"];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_range_lookup() {
        let t2 = valid_range("T2").unwrap();
        assert!(t2.is_valid(20.0));
        assert!(!t2.is_valid(500.0));
        assert!(t2.is_valid(350.0), "bounds are inclusive");
        assert_eq!(valid_range("PSFC"), None);
        assert_eq!(valid_range("HOURLY_RAIN"), None);
    }

    #[test]
    fn test_policy_table() {
        let t2 = VariablePolicy::lookup("T2");
        assert_eq!(t2.label, "temperature_2m");
        assert_eq!(t2.scale, 100);
        assert_eq!(t2.dtype, OutputDtype::Int16);
        assert!(t2.convert_temp);

        let q = VariablePolicy::lookup("QVAPOR");
        assert_eq!(q.scale, 1_000_000);
        assert_eq!(q.dtype, OutputDtype::Uint32);
        assert!(q.multi_level);

        let rh = VariablePolicy::lookup("RH");
        assert!(rh.custom);
        assert_eq!(rh.dtype, OutputDtype::Uint16);
    }

    #[test]
    fn test_unknown_variable_defaults() {
        assert!(!VariablePolicy::is_known("SNOWH"));
        let policy = VariablePolicy::lookup("SNOWH");
        assert_eq!(policy.scale, 1);
        assert_eq!(policy.dtype, OutputDtype::Float32);
        assert!(!policy.convert_temp);
        assert!(!policy.custom);
    }

    #[test]
    fn test_sentinels() {
        assert_eq!(OutputDtype::Int16.sentinel(), Some(32767));
        assert_eq!(OutputDtype::Uint16.sentinel(), Some(65535));
        assert_eq!(OutputDtype::Uint32.sentinel(), Some(4_294_967_295));
        assert_eq!(OutputDtype::Float32.sentinel(), None);
    }

    #[test]
    fn test_default_variables_have_policies() {
        for name in DEFAULT_VARIABLES {
            assert!(VariablePolicy::is_known(name), "{} missing from table", name);
        }
    }
}
