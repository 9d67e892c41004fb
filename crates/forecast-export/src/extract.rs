//! Per-timestep variable extraction.

use tracing::{debug, warn};
use wrf_reader::{GridLayout, GridSource};

use crate::field::GridField;
use crate::sanitize;

/// Which part of the vertical axis to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LevelSelection {
    /// One level (index into the level axis).
    Single(usize),
    /// Every level.
    All,
}

impl LevelSelection {
    /// The lowest model level.
    pub const SURFACE: Self = Self::Single(0);
}

/// Extract one time slice of a variable and sanitize it.
///
/// Returns `None` if the variable is absent, has an unsupported rank or an
/// empty level axis, the indices are out of range, or the read fails. Time-invariant 2D variables
/// are returned whole for any `time_index`.
pub fn extract(
    source: &dyn GridSource,
    name: &str,
    time_index: usize,
    levels: LevelSelection,
) -> Option<GridField> {
    let shape = source.variable_shape(name)?;
    let Some(layout) = GridLayout::from_shape(&shape) else {
        warn!(variable = name, shape = ?shape, "Unexpected dimensions, skipping variable");
        return None;
    };

    let (extents, level_count) = match levels {
        LevelSelection::All => (layout.stack_extents(time_index), layout.level_len()),
        LevelSelection::Single(level) => (layout.plane_extents(time_index, level), 1),
    };
    if level_count == 0 {
        warn!(variable = name, shape = ?shape, "Empty level axis, skipping variable");
        return None;
    }
    let Some(extents) = extents else {
        warn!(
            variable = name,
            time_index,
            levels = ?levels,
            shape = ?shape,
            "Slice indices out of range"
        );
        return None;
    };

    let mut data = match source.read_f32(name, &extents) {
        Ok(data) => data,
        Err(e) => {
            warn!(variable = name, error = %e, "Error during extraction");
            return None;
        }
    };

    let (ny, nx) = layout.plane_shape();
    debug!(
        variable = name,
        layout = ?layout,
        extents = ?extents,
        "Extracted slice"
    );

    sanitize::clean(&mut data, name);
    Some(GridField::with_levels(data, level_count, ny, nx))
}

/// Extract the lowest level at `time_index`.
pub fn extract_surface(source: &dyn GridSource, name: &str, time_index: usize) -> Option<GridField> {
    extract(source, name, time_index, LevelSelection::SURFACE)
}
