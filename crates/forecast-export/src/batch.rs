//! Batch archives: planning, layout and gzip-compressed JSON writing.
//!
//! A run's timesteps are split into consecutive batches and each batch is
//! written as one `NNN.json_gz` file:
//!
//! ```text
//! {"metadata":{"batch_info":{...},"initial_timestamp":...,"variable_scales":{...}},
//!  "grid_info":{"corner":[..],"steps":[..],"size":[..]},
//!  "time_series":[{"time":0.0,"variables":{"T2":[...],...}},...]}
//! ```
//!
//! Key order is part of the format, so maps are serialized from ordered
//! vectors rather than hash maps.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use flate2::write::GzEncoder;
use flate2::Compression;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use crate::error::{ExportError, Result};
use crate::field::GridInfo;
use crate::quantize::QuantizedField;

/// File extension of batch archives.
pub const OUTPUT_FORMAT: &str = "json_gz";

/// File name of a batch archive, e.g. `001.json_gz` for ordinal 1.
pub fn batch_filename(ordinal: usize) -> String {
    format!("{:03}.{}", ordinal, OUTPUT_FORMAT)
}

/// A contiguous range of timesteps written to one archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchRange {
    /// 1-based batch number.
    pub ordinal: usize,
    /// First timestep (inclusive).
    pub start: usize,
    /// Last timestep (exclusive).
    pub end: usize,
}

impl BatchRange {
    /// Number of timesteps in this batch.
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn filename(&self) -> String {
        batch_filename(self.ordinal)
    }
}

/// Number of batches needed for `steps` timesteps.
pub fn total_batches(steps: usize, batch_size: usize) -> usize {
    if batch_size == 0 {
        return 0;
    }
    steps.div_ceil(batch_size)
}

/// Split `steps` timesteps into batches of at most `batch_size`.
pub fn plan_batches(steps: usize, batch_size: usize) -> Vec<BatchRange> {
    (0..total_batches(steps, batch_size))
        .map(|i| {
            let start = i * batch_size;
            BatchRange {
                ordinal: i + 1,
                start,
                end: (start + batch_size).min(steps),
            }
        })
        .collect()
}

/// String-keyed map serialized in insertion order.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderedMap<V>(Vec<(String, V)>);

impl<V> OrderedMap<V> {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Append an entry. Keys are not deduplicated.
    pub fn push(&mut self, key: impl Into<String>, value: V) {
        self.0.push((key.into(), value));
    }

    pub fn get(&self, key: &str) -> Option<&V> {
        self.0.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<V> Default for OrderedMap<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Into<String>, V> FromIterator<(K, V)> for OrderedMap<V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

impl<V: Serialize> Serialize for OrderedMap<V> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (key, value) in &self.0 {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

/// Position of an archive within its run.
#[derive(Debug, Clone, Serialize)]
pub struct BatchInfo {
    pub batch_number: usize,
    pub total_batches: usize,
    /// Timesteps actually contained in this archive.
    pub batch_size: usize,
}

/// Run-level metadata repeated in every archive.
#[derive(Debug, Clone, Serialize)]
pub struct ArchiveMetadata {
    pub batch_info: BatchInfo,
    pub initial_timestamp: String,
    pub final_timestamp: String,
    pub total_timestamps: usize,
    pub points_per_time: usize,
    pub variable_scales: OrderedMap<u32>,
}

/// One timestep of quantized variables.
#[derive(Debug, Clone, Serialize)]
pub struct TimeStep {
    /// Hour index.
    pub time: f64,
    pub variables: OrderedMap<QuantizedField>,
}

/// A complete batch archive.
#[derive(Debug, Clone, Serialize)]
pub struct BatchArchive {
    pub metadata: ArchiveMetadata,
    pub grid_info: GridInfo,
    pub time_series: Vec<TimeStep>,
}

/// Serialize `value` as compact JSON into a gzip file.
///
/// Returns the compressed size in bytes.
pub fn write_compressed_json<T: Serialize>(path: &Path, value: &T, level: u32) -> Result<u64> {
    let write_err = |source: std::io::Error| ExportError::Write {
        path: path.to_path_buf(),
        source,
    };

    let json = serde_json::to_vec(value)?;
    let file = File::create(path).map_err(write_err)?;
    let mut encoder = GzEncoder::new(BufWriter::new(file), Compression::new(level));
    encoder.write_all(&json).map_err(write_err)?;
    let mut writer = encoder.finish().map_err(write_err)?;
    writer.flush().map_err(write_err)?;

    let size = std::fs::metadata(path).map_err(write_err)?.len();
    Ok(size)
}
