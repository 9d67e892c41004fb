//! Export configuration.
//!
//! Settings are layered: built-in defaults, then an optional YAML file, then
//! `POSTWRF_*` environment variables. The CLI applies its own flags last.
//!
//! YAML files may reference environment variables with `${VAR}` or
//! `${VAR:-default}`.

use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{ExportError, Result};
use crate::tables::{VariablePolicy, DEFAULT_VARIABLES};

/// Environment variable naming the YAML configuration file.
pub const ENV_CONFIG: &str = "POSTWRF_CONFIG";
/// Environment variable overriding [`ExportConfig::output_base`].
pub const ENV_OUTPUT_DIR: &str = "POSTWRF_OUTPUT_DIR";
/// Environment variable overriding [`ExportConfig::batch_size`].
pub const ENV_BATCH_SIZE: &str = "POSTWRF_BATCH_SIZE";
/// Environment variable overriding [`ExportConfig::variables`] (comma separated).
pub const ENV_VARIABLES: &str = "POSTWRF_VARIABLES";
/// Environment variable overriding [`ExportConfig::compression_level`].
pub const ENV_COMPRESSION_LEVEL: &str = "POSTWRF_COMPRESSION_LEVEL";

/// Settings for one export run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Parent of the per-date output directories.
    pub output_base: PathBuf,
    /// Maximum timesteps per archive.
    pub batch_size: usize,
    /// Variables to export, in archive order.
    pub variables: Vec<String>,
    /// gzip level, 0–9.
    pub compression_level: u32,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            output_base: PathBuf::from("data"),
            batch_size: 5,
            variables: DEFAULT_VARIABLES.iter().map(|v| v.to_string()).collect(),
            compression_level: 9,
        }
    }
}

impl ExportConfig {
    /// Parse a YAML document, expanding `${VAR}` references first.
    pub fn from_yaml_str(content: &str) -> anyhow::Result<Self> {
        let expanded = expand_env_vars(content)?;
        let config: ExportConfig =
            serde_yaml::from_str(&expanded).context("Failed to parse export config YAML")?;
        Ok(config)
    }

    /// Load a YAML config file. Missing keys keep their defaults.
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read export config from {:?}", path.as_ref()))?;
        Self::from_yaml_str(&content)
            .with_context(|| format!("Invalid export config {:?}", path.as_ref()))
    }

    /// Apply overrides from an arbitrary key lookup.
    ///
    /// Unparsable values are ignored with a warning.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = lookup(ENV_OUTPUT_DIR).filter(|v| !v.is_empty()) {
            self.output_base = PathBuf::from(dir);
        }

        if let Some(raw) = lookup(ENV_BATCH_SIZE) {
            match raw.trim().parse() {
                Ok(size) => self.batch_size = size,
                Err(_) => warn!(key = ENV_BATCH_SIZE, value = %raw, "Ignoring invalid override"),
            }
        }

        if let Some(raw) = lookup(ENV_VARIABLES) {
            let variables = parse_variable_list(&raw);
            if variables.is_empty() {
                warn!(key = ENV_VARIABLES, "Ignoring empty variable list");
            } else {
                self.variables = variables;
            }
        }

        if let Some(raw) = lookup(ENV_COMPRESSION_LEVEL) {
            match raw.trim().parse() {
                Ok(level) => self.compression_level = level,
                Err(_) => warn!(key = ENV_COMPRESSION_LEVEL, value = %raw, "Ignoring invalid override"),
            }
        }
    }

    /// Reject settings that cannot produce a run.
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(ExportError::InvalidConfig(
                "batch_size must be greater than 0".into(),
            ));
        }
        if self.variables.is_empty() {
            return Err(ExportError::InvalidConfig(
                "at least one variable must be selected".into(),
            ));
        }
        if self.compression_level > 9 {
            return Err(ExportError::InvalidConfig(format!(
                "compression_level must be 0-9, got {}",
                self.compression_level
            )));
        }

        for name in &self.variables {
            if !VariablePolicy::is_known(name) {
                debug!(variable = %name, "No encoding policy, exporting as unscaled float32");
            }
        }
        Ok(())
    }
}

/// Split a comma-separated variable list, dropping blanks.
pub fn parse_variable_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .collect()
}

// ============================================================================
// Environment Variable Expansion
// ============================================================================

/// Expand `${VAR}` and `${VAR:-default}` references.
fn expand_env_vars(content: &str) -> anyhow::Result<String> {
    let mut result = String::with_capacity(content.len());
    let mut rest = content;

    while let Some(start) = rest.find("${") {
        result.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let end = after
            .find('}')
            .with_context(|| format!("Unclosed variable substitution: ${{{}", after))?;
        result.push_str(&resolve_var_expr(&after[..end])?);
        rest = &after[end + 1..];
    }
    result.push_str(rest);

    Ok(result)
}

fn resolve_var_expr(expr: &str) -> anyhow::Result<String> {
    if let Some((var_name, default)) = expr.split_once(":-") {
        match std::env::var(var_name.trim()) {
            Ok(val) if !val.is_empty() => Ok(val),
            _ => Ok(default.to_string()),
        }
    } else {
        std::env::var(expr.trim()).with_context(|| format!("Environment variable {} not set", expr))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = ExportConfig::default();
        assert_eq!(config.output_base, PathBuf::from("data"));
        assert_eq!(config.batch_size, 5);
        assert_eq!(config.variables, vec!["T2", "TSK", "SST", "U10", "V10", "RH", "TOTAL_RAIN"]);
        assert_eq!(config.compression_level, 9);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config = ExportConfig::from_yaml_str("batch_size: 3\nvariables: [T2, P]\n").unwrap();
        assert_eq!(config.batch_size, 3);
        assert_eq!(config.variables, vec!["T2", "P"]);
        assert_eq!(config.compression_level, 9);
    }

    #[test]
    fn test_yaml_env_expansion() {
        std::env::set_var("POSTWRF_TEST_BASE", "/srv/forecast");
        std::env::remove_var("POSTWRF_TEST_UNSET");
        let config = ExportConfig::from_yaml_str(
            "output_base: ${POSTWRF_TEST_BASE}\nbatch_size: ${POSTWRF_TEST_UNSET:-7}\n",
        )
        .unwrap();
        assert_eq!(config.output_base, PathBuf::from("/srv/forecast"));
        assert_eq!(config.batch_size, 7);
    }

    #[test]
    fn test_yaml_missing_required_var() {
        std::env::remove_var("POSTWRF_TEST_REQUIRED");
        assert!(ExportConfig::from_yaml_str("output_base: ${POSTWRF_TEST_REQUIRED}").is_err());
        assert!(expand_env_vars("${UNCLOSED").is_err());
    }

    #[test]
    fn test_yaml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("postwrf.yaml");
        std::fs::write(&path, "compression_level: 6\n").unwrap();
        assert_eq!(ExportConfig::from_yaml_file(&path).unwrap().compression_level, 6);
        assert!(ExportConfig::from_yaml_file(dir.path().join("missing.yaml")).is_err());
    }

    #[test]
    fn test_overrides() {
        let env: HashMap<&str, &str> = [
            (ENV_OUTPUT_DIR, "out"),
            (ENV_BATCH_SIZE, "2"),
            (ENV_VARIABLES, " T2, RH ,,"),
            (ENV_COMPRESSION_LEVEL, "not-a-number"),
        ]
        .into_iter()
        .collect();

        let mut config = ExportConfig::default();
        config.apply_overrides(|key| env.get(key).map(|v| v.to_string()));
        assert_eq!(config.output_base, PathBuf::from("out"));
        assert_eq!(config.batch_size, 2);
        assert_eq!(config.variables, vec!["T2", "RH"]);
        assert_eq!(config.compression_level, 9);
    }

    #[test]
    fn test_validate_rejects() {
        let config = ExportConfig {
            batch_size: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ExportError::InvalidConfig(_))));

        let config = ExportConfig {
            variables: vec![],
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = ExportConfig {
            compression_level: 10,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
