//! In-memory grid source.
//!
//! Holds variables as flat row-major buffers. Used to build synthetic
//! datasets for tests and for callers that already have model fields loaded.

use std::collections::BTreeMap;
use std::ops::Range;

use crate::error::{ReaderError, ReaderResult};
use crate::{checked_extent_len, GridSource};

#[derive(Debug, Clone)]
enum MemoryData {
    Numeric(Vec<f64>),
    Text(Vec<Vec<u8>>),
    /// Present in the variable listing, but every read fails.
    Unreadable,
}

#[derive(Debug, Clone)]
struct MemoryVariable {
    shape: Vec<usize>,
    data: MemoryData,
}

/// A dataset held entirely in memory.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    variables: BTreeMap<String, MemoryVariable>,
}

impl MemorySource {
    /// Create an empty source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a numeric variable from f32 values.
    ///
    /// # Panics
    ///
    /// Panics if `values.len()` does not equal the product of `shape`.
    pub fn with_f32(self, name: &str, shape: &[usize], values: Vec<f32>) -> Self {
        self.with_f64(name, shape, values.into_iter().map(f64::from).collect())
    }

    /// Add a numeric variable from f64 values.
    ///
    /// # Panics
    ///
    /// Panics if `values.len()` does not equal the product of `shape`.
    pub fn with_f64(mut self, name: &str, shape: &[usize], values: Vec<f64>) -> Self {
        let expected: usize = shape.iter().product();
        assert_eq!(
            values.len(),
            expected,
            "{} has {} values but shape {:?} needs {}",
            name,
            values.len(),
            shape,
            expected
        );
        self.variables.insert(
            name.to_string(),
            MemoryVariable {
                shape: shape.to_vec(),
                data: MemoryData::Numeric(values),
            },
        );
        self
    }

    /// Add a 2D character variable, one fixed-width row per string.
    ///
    /// Rows shorter than `width` are padded with NUL bytes.
    pub fn with_text_rows(mut self, name: &str, rows: &[&str], width: usize) -> Self {
        let padded = rows
            .iter()
            .map(|row| {
                let mut bytes = row.as_bytes().to_vec();
                bytes.resize(width.max(bytes.len()), 0);
                bytes
            })
            .collect::<Vec<_>>();
        let width = padded.iter().map(Vec::len).max().unwrap_or(width);
        self.variables.insert(
            name.to_string(),
            MemoryVariable {
                shape: vec![padded.len(), width],
                data: MemoryData::Text(padded),
            },
        );
        self
    }

    /// Add a variable that is listed with a shape but fails on every read.
    pub fn with_unreadable(mut self, name: &str, shape: &[usize]) -> Self {
        self.variables.insert(
            name.to_string(),
            MemoryVariable {
                shape: shape.to_vec(),
                data: MemoryData::Unreadable,
            },
        );
        self
    }

    fn numeric(&self, name: &str) -> ReaderResult<(&[usize], &[f64])> {
        let var = self
            .variables
            .get(name)
            .ok_or_else(|| ReaderError::MissingVariable(name.to_string()))?;
        match &var.data {
            MemoryData::Numeric(values) => Ok((&var.shape, values)),
            MemoryData::Text(_) => Err(ReaderError::read_failed(name, "variable is text")),
            MemoryData::Unreadable => Err(ReaderError::read_failed(name, "variable is unreadable")),
        }
    }

    fn gather(&self, name: &str, extents: &[Range<usize>]) -> ReaderResult<Vec<f64>> {
        let (shape, values) = self.numeric(name)?;
        let count = checked_extent_len(name, shape, extents)?;
        let mut out = Vec::with_capacity(count);
        if count == 0 {
            return Ok(out);
        }

        // Row-major strides of the source buffer.
        let mut strides = vec![1usize; shape.len()];
        for axis in (0..shape.len().saturating_sub(1)).rev() {
            strides[axis] = strides[axis + 1] * shape[axis + 1];
        }

        let mut index: Vec<usize> = extents.iter().map(|r| r.start).collect();
        loop {
            let offset: usize = index.iter().zip(&strides).map(|(i, s)| i * s).sum();
            out.push(values[offset]);

            // Odometer increment, innermost axis fastest.
            let mut axis = index.len();
            loop {
                if axis == 0 {
                    return Ok(out);
                }
                axis -= 1;
                index[axis] += 1;
                if index[axis] < extents[axis].end {
                    break;
                }
                index[axis] = extents[axis].start;
            }
        }
    }
}

impl GridSource for MemorySource {
    fn variable_names(&self) -> Vec<String> {
        self.variables.keys().cloned().collect()
    }

    fn variable_shape(&self, name: &str) -> Option<Vec<usize>> {
        self.variables.get(name).map(|v| v.shape.clone())
    }

    fn read_f32(&self, name: &str, extents: &[Range<usize>]) -> ReaderResult<Vec<f32>> {
        Ok(self
            .gather(name, extents)?
            .into_iter()
            .map(|v| v as f32)
            .collect())
    }

    fn read_f64(&self, name: &str, extents: &[Range<usize>]) -> ReaderResult<Vec<f64>> {
        self.gather(name, extents)
    }

    fn read_text_rows(&self, name: &str) -> ReaderResult<Vec<Vec<u8>>> {
        let var = self
            .variables
            .get(name)
            .ok_or_else(|| ReaderError::MissingVariable(name.to_string()))?;
        match &var.data {
            MemoryData::Text(rows) => Ok(rows.clone()),
            _ => Err(ReaderError::read_failed(name, "variable is not text")),
        }
    }
}
