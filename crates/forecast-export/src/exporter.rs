//! Export orchestration: dataset → batch archives + summary.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};
use wrf_reader::GridSource;

use crate::batch::{
    plan_batches, write_compressed_json, ArchiveMetadata, BatchArchive, BatchInfo, BatchRange,
    OrderedMap, TimeStep,
};
use crate::config::ExportConfig;
use crate::derived::DerivedEngine;
use crate::error::{ExportError, Result};
use crate::extract::{extract, extract_surface, LevelSelection};
use crate::field::{GridCoordinates, GridField, GridInfo};
use crate::output::{output_directory, prepare_output_directory};
use crate::quantize::quantize;
use crate::summary::{write_summary, RunSummary};
use crate::tables::VariablePolicy;
use crate::time_axis::{resolve_time_axis, TimeAxis};

/// Latitude variable.
pub const LATITUDE: &str = "XLAT";
/// Longitude variable.
pub const LONGITUDE: &str = "XLONG";

/// Outcome of a completed run.
#[derive(Debug, Clone)]
pub struct ExportReport {
    /// Directory holding the archives and summary.
    pub output_dir: PathBuf,
    pub summary: RunSummary,
    /// `None` if the summary could not be written.
    pub summary_path: Option<PathBuf>,
    pub elapsed: Duration,
}

/// Writes one archive to `path` at the given compression level and returns
/// the file size in bytes.
pub type ArchiveWriter = fn(&Path, &BatchArchive, u32) -> Result<u64>;

/// Converts one dataset into batch archives.
///
/// A run is a single sequential pass over the time axis. Only an unusable
/// coordinate grid or output directory aborts it; missing variables and
/// failed batch writes are logged and skipped.
pub struct Exporter<'a> {
    source: &'a dyn GridSource,
    config: ExportConfig,
    writer: ArchiveWriter,
}

/// Run-wide state shared by every batch.
struct RunContext<'r> {
    axis: &'r TimeAxis,
    grid: &'r GridCoordinates,
    grid_info: &'r GridInfo,
    total_batches: usize,
    variable_scales: &'r OrderedMap<u32>,
}

impl<'a> Exporter<'a> {
    /// Create an exporter. Fails if the configuration is invalid.
    pub fn new(source: &'a dyn GridSource, config: ExportConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            source,
            config,
            writer: write_compressed_json::<BatchArchive>,
        })
    }

    /// Replace the gzip JSON archive writer.
    pub fn with_writer(mut self, writer: ArchiveWriter) -> Self {
        self.writer = writer;
        self
    }

    pub fn config(&self) -> &ExportConfig {
        &self.config
    }

    /// Run the export.
    pub fn run(&self) -> Result<ExportReport> {
        let started = Instant::now();

        let axis = resolve_time_axis(self.source);
        let grid = self.load_coordinates()?;
        log_grid_extent(&grid);

        let output_dir = output_directory(&self.config.output_base, &axis);
        prepare_output_directory(&output_dir)?;

        let plan = plan_batches(axis.len(), self.config.batch_size);
        info!(
            valid_points = grid.valid_count(),
            steps = axis.len(),
            batches = plan.len(),
            batch_size = self.config.batch_size,
            variables = self.config.variables.len(),
            "Processing time steps"
        );

        let variable_scales: OrderedMap<u32> = self
            .config
            .variables
            .iter()
            .map(|name| (name.as_str(), VariablePolicy::lookup(name).scale))
            .collect();
        let grid_info = grid.grid_info();
        let ctx = RunContext {
            axis: &axis,
            grid: &grid,
            grid_info: &grid_info,
            total_batches: plan.len(),
            variable_scales: &variable_scales,
        };

        let mut summary = RunSummary::new(
            plan.len(),
            self.config.batch_size,
            axis.len(),
            &self.config.variables,
        );
        let mut engine = DerivedEngine::new();

        for batch in &plan {
            info!(
                batch = batch.ordinal,
                total = plan.len(),
                first_step = batch.start + 1,
                last_step = batch.end,
                "Processing batch"
            );

            let archive = self.build_batch(&ctx, batch, &mut engine);
            let filename = batch.filename();
            let path = output_dir.join(&filename);

            match (self.writer)(&path, &archive, self.config.compression_level) {
                Ok(size) => {
                    let raw_bytes =
                        grid.valid_count() * batch.len() * self.config.variables.len() * 4;
                    info!(
                        file = %filename,
                        size_mb = %format!("{:.2}", size as f64 / (1024.0 * 1024.0)),
                        compression_ratio = %format!("{:.1}", raw_bytes as f64 / size.max(1) as f64),
                        "Batch saved"
                    );
                    summary.record_written(filename, size);
                }
                Err(e) => {
                    warn!(batch = batch.ordinal, error = %e, "Error creating batch file");
                    summary.record_failed(filename);
                }
            }
        }

        let summary_path = match write_summary(&output_dir, &summary) {
            Ok(path) => {
                info!(path = %path.display(), "Summary file created");
                Some(path)
            }
            Err(e) => {
                warn!(error = %e, "Could not create summary file");
                None
            }
        };

        let elapsed = started.elapsed();
        info!(
            files = summary.total_files_created,
            batches = summary.total_batches,
            total_mb = %format!("{:.2}", summary.total_size_mb),
            average_mb = %format!("{:.2}", summary.average_size_mb()),
            steps = summary.total_timesteps,
            elapsed_secs = %format!("{:.2}", elapsed.as_secs_f64()),
            "Batch processing complete"
        );

        Ok(ExportReport {
            output_dir,
            summary,
            summary_path,
            elapsed,
        })
    }

    /// Latitude and longitude at the first time step. Both are required.
    fn load_coordinates(&self) -> Result<GridCoordinates> {
        let lat = extract_surface(self.source, LATITUDE, 0)
            .ok_or_else(|| ExportError::MissingCoordinates(format!("{} not available", LATITUDE)))?;
        let lon = extract_surface(self.source, LONGITUDE, 0).ok_or_else(|| {
            ExportError::MissingCoordinates(format!("{} not available", LONGITUDE))
        })?;

        GridCoordinates::new(lat, lon).ok_or_else(|| {
            ExportError::MissingCoordinates(format!(
                "{} and {} have different shapes",
                LATITUDE, LONGITUDE
            ))
        })
    }

    fn build_batch(
        &self,
        ctx: &RunContext<'_>,
        batch: &BatchRange,
        engine: &mut DerivedEngine,
    ) -> BatchArchive {
        let time_series = (batch.start..batch.end)
            .map(|t| self.build_timestep(ctx, t, engine))
            .collect();

        BatchArchive {
            metadata: ArchiveMetadata {
                batch_info: BatchInfo {
                    batch_number: batch.ordinal,
                    total_batches: ctx.total_batches,
                    batch_size: batch.len(),
                },
                initial_timestamp: ctx.axis.first_label(),
                final_timestamp: ctx.axis.last_label(),
                total_timestamps: ctx.axis.label_count(),
                points_per_time: ctx.grid.valid_count(),
                variable_scales: ctx.variable_scales.clone(),
            },
            grid_info: ctx.grid_info.clone(),
            time_series,
        }
    }

    fn build_timestep(
        &self,
        ctx: &RunContext<'_>,
        time_index: usize,
        engine: &mut DerivedEngine,
    ) -> TimeStep {
        let hour = ctx.axis.hours()[time_index];
        debug!(step = time_index + 1, total = ctx.axis.len(), hour, "Processing time step");

        let mut variables = OrderedMap::new();
        for name in &self.config.variables {
            let Some(field) = self.variable_field(engine, name, time_index) else {
                debug!(variable = %name, time_index, "No data returned");
                continue;
            };

            if (field.ny, field.nx) != ctx.grid.shape() {
                warn!(
                    variable = %name,
                    shape = ?field.shape(),
                    grid = ?ctx.grid.shape(),
                    "Field does not match the coordinate grid, skipping"
                );
                continue;
            }

            // Multi-level fields contribute their lowest level.
            let Some(surface) = field.level(0) else {
                warn!(variable = %name, time_index, "Field has no levels, skipping");
                continue;
            };
            let values = ctx.grid.select(surface);
            let valid = values.iter().filter(|v| !v.is_nan()).count();
            if valid == 0 {
                warn!(variable = %name, time_index, "All values are NaN, skipping");
                continue;
            }

            let policy = VariablePolicy::lookup(name);
            variables.push(name.as_str(), quantize(&values, policy));
            debug!(
                variable = %name,
                points = values.len(),
                valid,
                levels = field.levels,
                "Quantized variable"
            );
        }

        TimeStep {
            time: hour as f64,
            variables,
        }
    }

    fn variable_field(
        &self,
        engine: &mut DerivedEngine,
        name: &str,
        time_index: usize,
    ) -> Option<GridField> {
        let policy = VariablePolicy::lookup(name);
        if policy.custom {
            engine.compute(self.source, name, time_index)
        } else if policy.multi_level {
            extract(self.source, name, time_index, LevelSelection::All)
        } else {
            extract_surface(self.source, name, time_index)
        }
    }
}

fn log_grid_extent(grid: &GridCoordinates) {
    let (ny, nx) = grid.shape();
    match (grid.lat_range(), grid.lon_range()) {
        (Some((lat_min, lat_max)), Some((lon_min, lon_max))) => info!(
            ny,
            nx,
            lat_min,
            lat_max,
            lon_min,
            lon_max,
            valid_points = grid.valid_count(),
            "Grid extent"
        ),
        _ => warn!(ny, nx, "Grid has no valid coordinates"),
    }
}
