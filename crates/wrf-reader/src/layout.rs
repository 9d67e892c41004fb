//! Source array layouts.

use std::ops::Range;

/// Axis arrangement of a gridded variable, classified by rank.
///
/// The spatial axes are always the two innermost dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GridLayout {
    /// `(lat, lon)`: time-invariant field
    Static2D { ny: usize, nx: usize },
    /// `(time, lat, lon)`
    Series3D { nt: usize, ny: usize, nx: usize },
    /// `(time, level, lat, lon)`
    Levels4D {
        nt: usize,
        nz: usize,
        ny: usize,
        nx: usize,
    },
}

impl GridLayout {
    /// Classify a shape. Ranks other than 2, 3 and 4 are unsupported.
    pub fn from_shape(shape: &[usize]) -> Option<Self> {
        match *shape {
            [ny, nx] => Some(Self::Static2D { ny, nx }),
            [nt, ny, nx] => Some(Self::Series3D { nt, ny, nx }),
            [nt, nz, ny, nx] => Some(Self::Levels4D { nt, nz, ny, nx }),
            _ => None,
        }
    }

    /// Grid shape `(ny, nx)` of one horizontal plane.
    pub fn plane_shape(&self) -> (usize, usize) {
        match *self {
            Self::Static2D { ny, nx }
            | Self::Series3D { ny, nx, .. }
            | Self::Levels4D { ny, nx, .. } => (ny, nx),
        }
    }

    /// Number of time steps, `None` for static fields.
    pub fn time_len(&self) -> Option<usize> {
        match *self {
            Self::Static2D { .. } => None,
            Self::Series3D { nt, .. } | Self::Levels4D { nt, .. } => Some(nt),
        }
    }

    /// Number of vertical levels (1 for anything without a level axis).
    pub fn level_len(&self) -> usize {
        match *self {
            Self::Levels4D { nz, .. } => nz,
            _ => 1,
        }
    }

    /// Extents selecting one plane at `time` and `level`.
    ///
    /// Static fields ignore `time`; fields without a level axis ignore `level`.
    /// Returns `None` when an index is out of range.
    pub fn plane_extents(&self, time: usize, level: usize) -> Option<Vec<Range<usize>>> {
        match *self {
            Self::Static2D { ny, nx } => Some(vec![0..ny, 0..nx]),
            Self::Series3D { nt, ny, nx } => {
                (time < nt).then(|| vec![time..time + 1, 0..ny, 0..nx])
            }
            Self::Levels4D { nt, nz, ny, nx } => (time < nt && level < nz)
                .then(|| vec![time..time + 1, level..level + 1, 0..ny, 0..nx]),
        }
    }

    /// Extents selecting every level at `time`.
    pub fn stack_extents(&self, time: usize) -> Option<Vec<Range<usize>>> {
        match *self {
            Self::Levels4D { nt, nz, ny, nx } => {
                (time < nt).then(|| vec![time..time + 1, 0..nz, 0..ny, 0..nx])
            }
            _ => self.plane_extents(time, 0),
        }
    }
}
