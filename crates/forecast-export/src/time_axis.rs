//! Time axis resolution.
//!
//! WRF files carry two time descriptions: `XTIME`, minutes since simulation
//! start, and `Times`, a `(Time, DateStrLen)` character array such as
//! `2025-05-14_00:00:00`. Neither is required; a file without usable time
//! metadata is treated as a single time step.

use tracing::{debug, info, warn};
use wrf_reader::GridSource;

/// Name of the numeric time coordinate (minutes).
pub const TIME_COORDINATE: &str = "XTIME";

/// Name of the text timestamp variable.
pub const TIMESTAMP_VARIABLE: &str = "Times";

/// Hour indices of every time step, with optional timestamp labels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeAxis {
    hours: Vec<i64>,
    timestamps: Option<Vec<String>>,
}

impl TimeAxis {
    /// Build an axis, truncating or dropping timestamps that disagree in length.
    pub fn new(hours: Vec<i64>, timestamps: Option<Vec<String>>) -> Self {
        let timestamps = timestamps.and_then(|mut ts| {
            if ts.len() > hours.len() {
                ts.truncate(hours.len());
                Some(ts)
            } else if ts.len() < hours.len() {
                warn!(
                    timestamps = ts.len(),
                    steps = hours.len(),
                    "Fewer timestamps than time steps, ignoring timestamps"
                );
                None
            } else {
                Some(ts)
            }
        });
        Self { hours, timestamps }
    }

    /// Axis for a dataset without time metadata.
    pub fn single_step() -> Self {
        Self {
            hours: vec![0],
            timestamps: None,
        }
    }

    /// Hour index of each time step.
    pub fn hours(&self) -> &[i64] {
        &self.hours
    }

    /// Timestamp labels, if the dataset provided a consistent set.
    pub fn timestamps(&self) -> Option<&[String]> {
        self.timestamps.as_deref()
    }

    /// Number of time steps.
    pub fn len(&self) -> usize {
        self.hours.len()
    }

    /// Always false for axes built by this module.
    pub fn is_empty(&self) -> bool {
        self.hours.is_empty()
    }

    /// Label of the first step: its timestamp, or `hour_<n>`.
    pub fn first_label(&self) -> String {
        match self.timestamps() {
            Some(ts) if !ts.is_empty() => ts[0].clone(),
            _ => format!("hour_{}", self.hours.first().copied().unwrap_or(0)),
        }
    }

    /// Label of the last step: its timestamp, or `hour_<n>`.
    pub fn last_label(&self) -> String {
        match self.timestamps() {
            Some(ts) if !ts.is_empty() => ts[ts.len() - 1].clone(),
            _ => format!("hour_{}", self.hours.last().copied().unwrap_or(0)),
        }
    }

    /// Timestamp count when timestamps are present, step count otherwise.
    pub fn label_count(&self) -> usize {
        self.timestamps().map_or(self.hours.len(), <[String]>::len)
    }
}

/// Resolve the time axis of a dataset. Never fails.
pub fn resolve_time_axis(source: &dyn GridSource) -> TimeAxis {
    let hours = match read_hours(source) {
        Some(hours) if !hours.is_empty() => hours,
        _ => {
            warn!("Could not determine time information, using single time step");
            return TimeAxis::new(vec![0], read_timestamps(source));
        }
    };

    let axis = TimeAxis::new(hours, read_timestamps(source));
    if let Some(ts) = axis.timestamps() {
        info!(
            steps = axis.len(),
            initial = %axis.first_label(),
            last = %axis.last_label(),
            "Resolved time axis with timestamps"
        );
        debug!(count = ts.len(), "Extracted timestamps");
    } else {
        info!(steps = axis.len(), "Resolved time axis without timestamps");
    }
    axis
}

fn read_hours(source: &dyn GridSource) -> Option<Vec<i64>> {
    let shape = source.variable_shape(TIME_COORDINATE)?;
    let extents: Vec<_> = shape.iter().map(|&n| 0..n).collect();
    match source.read_f64(TIME_COORDINATE, &extents) {
        Ok(minutes) if minutes.iter().any(|m| !m.is_finite()) => {
            warn!("{} has non-finite values", TIME_COORDINATE);
            None
        }
        // Minutes → whole hours, floor division of the truncated value.
        Ok(minutes) => Some(minutes.iter().map(|&m| (m as i64).div_euclid(60)).collect()),
        Err(e) => {
            warn!(error = %e, "{} access failed", TIME_COORDINATE);
            None
        }
    }
}

fn read_timestamps(source: &dyn GridSource) -> Option<Vec<String>> {
    let shape = source.variable_shape(TIMESTAMP_VARIABLE)?;
    if shape.len() != 2 {
        debug!(shape = ?shape, "{} is not a 2D character array", TIMESTAMP_VARIABLE);
        return None;
    }

    match source.read_text_rows(TIMESTAMP_VARIABLE) {
        Ok(rows) => Some(rows.iter().map(|row| decode_row(row)).collect()),
        Err(e) => {
            warn!(error = %e, "{} access failed", TIMESTAMP_VARIABLE);
            None
        }
    }
}

/// Decode one fixed-width row: drop NUL padding, trim whitespace.
fn decode_row(row: &[u8]) -> String {
    let bytes: Vec<u8> = row.iter().copied().filter(|&b| b != 0).collect();
    String::from_utf8_lossy(&bytes).trim().to_string()
}
