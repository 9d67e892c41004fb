//! WRF forecast export library.
//!
//! Turns a WRF `wrfout` dataset into compact, time-batched archives for
//! downstream forecast consumers.
//!
//! # Pipeline
//!
//! For every timestep and every configured variable:
//!
//! 1. Extract the 2D slice ([`extract`]), or compute it ([`derived`]) for
//!    relative humidity and hourly precipitation.
//! 2. Replace fill values, out-of-range values and infinities with NaN
//!    ([`sanitize`]).
//! 3. Keep only grid cells with valid coordinates and encode them with the
//!    variable's fixed-point policy ([`quantize`], [`tables`]).
//! 4. Group timesteps into gzip-compressed JSON archives ([`batch`]) under
//!    a per-forecast-date directory ([`output`]), with a run summary
//!    ([`summary`]).
//!
//! [`Exporter`] drives the whole run over any [`wrf_reader::GridSource`].

pub mod batch;
pub mod config;
pub mod derived;
pub mod error;
pub mod exporter;
pub mod extract;
pub mod field;
pub mod output;
pub mod quantize;
pub mod sanitize;
pub mod summary;
pub mod tables;
pub mod time_axis;

// Re-exports
pub use batch::{batch_filename, plan_batches, BatchArchive, BatchRange, OUTPUT_FORMAT};
pub use config::ExportConfig;
pub use derived::{DerivedEngine, DerivedVariable};
pub use error::{ExportError, Result};
pub use exporter::{ArchiveWriter, ExportReport, Exporter};
pub use extract::{extract, extract_surface, LevelSelection};
pub use field::{GridCoordinates, GridField, GridInfo};
pub use quantize::{dequantize, quantize, QuantizedField};
pub use summary::{RunSummary, SUMMARY_FILENAME};
pub use tables::{valid_range, OutputDtype, ValidRange, VariablePolicy, DEFAULT_VARIABLES};
pub use time_axis::{resolve_time_axis, TimeAxis};
