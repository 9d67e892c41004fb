//! Output directory layout.
//!
//! Archives for a run go to `<base>/<YYYYMMDD>/`, named after the forecast's
//! initial date. A rerun for the same date replaces the directory.

use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDate};
use tracing::{debug, info};

use crate::error::{ExportError, Result};
use crate::time_axis::TimeAxis;

const DATE_FORMAT: &str = "%Y%m%d";

/// Forecast initial date as `YYYYMMDD`.
///
/// Taken from the date part of the first timestamp (`2025-05-14_00:00:00` →
/// `20250514`). Falls back to today's local date when there are no
/// timestamps or the date part is not a calendar date.
pub fn initial_date(axis: &TimeAxis) -> String {
    axis.timestamps()
        .and_then(|ts| ts.first())
        .and_then(|first| date_from_timestamp(first))
        .unwrap_or_else(|| {
            debug!("No usable initial timestamp, using current date");
            Local::now().format(DATE_FORMAT).to_string()
        })
}

fn date_from_timestamp(timestamp: &str) -> Option<String> {
    let date_part = timestamp.split('_').next()?.replace('-', "");
    NaiveDate::parse_from_str(&date_part, DATE_FORMAT)
        .ok()
        .map(|_| date_part)
}

/// Directory for a run's archives under `base`.
pub fn output_directory(base: &Path, axis: &TimeAxis) -> PathBuf {
    base.join(initial_date(axis))
}

/// Create `dir` empty, removing any previous contents.
pub fn prepare_output_directory(dir: &Path) -> Result<()> {
    let dir_err = |source: std::io::Error| ExportError::OutputDirectory {
        path: dir.to_path_buf(),
        source,
    };

    if dir.exists() {
        std::fs::remove_dir_all(dir).map_err(dir_err)?;
        info!(path = %dir.display(), "Removed existing output directory");
    }
    std::fs::create_dir_all(dir).map_err(dir_err)?;
    info!(path = %dir.display(), "Created output directory");
    Ok(())
}
