//! Run summary written next to the batch archives.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::batch::OUTPUT_FORMAT;
use crate::error::{ExportError, Result};

/// File name of the run summary.
pub const SUMMARY_FILENAME: &str = "batch_summary.json";

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Totals for one export run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub total_batches: usize,
    /// Configured maximum timesteps per batch.
    pub batch_size: usize,
    pub total_timesteps: usize,
    pub total_files_created: usize,
    pub total_size_mb: f64,
    pub output_format: String,
    pub variables_processed: Vec<String>,
    /// Archives actually written, in batch order.
    pub batch_files: Vec<String>,
    /// Archives that could not be written.
    pub failed_batches: Vec<String>,
}

impl RunSummary {
    /// Start a summary for a run; file lists are filled in as batches finish.
    pub fn new(
        total_batches: usize,
        batch_size: usize,
        total_timesteps: usize,
        variables: &[String],
    ) -> Self {
        Self {
            total_batches,
            batch_size,
            total_timesteps,
            total_files_created: 0,
            total_size_mb: 0.0,
            output_format: OUTPUT_FORMAT.to_string(),
            variables_processed: variables.to_vec(),
            batch_files: Vec::new(),
            failed_batches: Vec::new(),
        }
    }

    /// Record a written archive of `size` bytes.
    pub fn record_written(&mut self, filename: String, size: u64) {
        self.total_files_created += 1;
        self.total_size_mb += size as f64 / BYTES_PER_MB;
        self.batch_files.push(filename);
    }

    /// Record an archive that failed to write.
    pub fn record_failed(&mut self, filename: String) {
        self.failed_batches.push(filename);
    }

    /// Mean archive size in MB, zero when nothing was written.
    pub fn average_size_mb(&self) -> f64 {
        if self.total_files_created == 0 {
            0.0
        } else {
            self.total_size_mb / self.total_files_created as f64
        }
    }
}

#[derive(Serialize, Deserialize)]
struct SummaryFile {
    summary: RunSummary,
}

/// Write `batch_summary.json` (2-space indented) into `dir`.
pub fn write_summary(dir: &Path, summary: &RunSummary) -> Result<PathBuf> {
    let path = dir.join(SUMMARY_FILENAME);
    let write_err = |source: std::io::Error| ExportError::Write {
        path: path.clone(),
        source,
    };

    let file = File::create(&path).map_err(write_err)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(
        &mut writer,
        &SummaryFile {
            summary: summary.clone(),
        },
    )?;
    writer.flush().map_err(write_err)?;
    Ok(path)
}

/// Read a summary previously written by [`write_summary`].
pub fn read_summary(path: &Path) -> Result<RunSummary> {
    let file = File::open(path).map_err(|source| ExportError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let parsed: SummaryFile = serde_json::from_reader(file)?;
    Ok(parsed.summary)
}
