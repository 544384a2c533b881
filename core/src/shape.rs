//! Footprint geometry for multi-cell buildings.
//!
//! A [`Layout`] is the authored boolean matrix of a building together with
//! its pivot. [`compute_footprint`] turns a layout and a [`Rotation`] into the
//! set of cell offsets the building covers relative to the pivot, which is
//! what the grid validates and commits.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::CellCoord;

/// Quarter-turn orientation applied to a layout.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Rotation {
    /// Authored orientation.
    #[default]
    Deg0,
    /// One clockwise quarter turn.
    Deg90,
    /// Half turn.
    Deg180,
    /// Three clockwise quarter turns.
    Deg270,
}

impl Rotation {
    /// All rotations in ascending quarter-turn order.
    pub const ALL: [Rotation; 4] = [Self::Deg0, Self::Deg90, Self::Deg180, Self::Deg270];

    /// Converts a quarter-turn index in `0..4` into a rotation.
    pub const fn from_quarter_turns(turns: u8) -> Result<Self, ShapeError> {
        match turns {
            0 => Ok(Self::Deg0),
            1 => Ok(Self::Deg90),
            2 => Ok(Self::Deg180),
            3 => Ok(Self::Deg270),
            other => Err(ShapeError::InvalidRotation(other)),
        }
    }

    /// Number of clockwise quarter turns represented by the rotation.
    #[must_use]
    pub const fn quarter_turns(self) -> u8 {
        match self {
            Self::Deg0 => 0,
            Self::Deg90 => 1,
            Self::Deg180 => 2,
            Self::Deg270 => 3,
        }
    }

    /// Rotation angle in degrees.
    #[must_use]
    pub const fn degrees(self) -> u16 {
        self.quarter_turns() as u16 * 90
    }

    /// Composes two rotations; `r.then(Deg90)` turns one step further than `r`.
    #[must_use]
    pub const fn then(self, other: Rotation) -> Self {
        match (self.quarter_turns() + other.quarter_turns()) % 4 {
            0 => Self::Deg0,
            1 => Self::Deg90,
            2 => Self::Deg180,
            _ => Self::Deg270,
        }
    }

    /// The next clockwise orientation.
    #[must_use]
    pub const fn next(self) -> Self {
        self.then(Self::Deg90)
    }

    /// Rotates a single offset about the origin.
    ///
    /// A quarter turn maps `(x, y)` to `(y, -x)`.
    #[must_use]
    pub const fn apply(self, offset: CellCoord) -> CellCoord {
        let (x, y) = (offset.x(), offset.y());
        match self {
            Self::Deg0 => CellCoord::new(x, y),
            Self::Deg90 => CellCoord::new(y, -x),
            Self::Deg180 => CellCoord::new(-x, -y),
            Self::Deg270 => CellCoord::new(-y, x),
        }
    }
}

/// Reasons a shape cannot be built or oriented.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Error)]
pub enum ShapeError {
    /// The layout is empty, all-false, malformed, or its pivot lies outside it.
    #[error("layout does not describe a valid shape")]
    InvalidShape,
    /// The rotation index is not in `0..4`.
    #[error("rotation index {0} is not a quarter turn in 0..4")]
    InvalidRotation(u8),
}

/// Immutable occupancy matrix of a building plus its pivot.
///
/// Column `c`, row `r` of the matrix maps to offset `(c - pivot.x, r - pivot.y)`
/// before rotation.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "LayoutRecord", into = "LayoutRecord")]
pub struct Layout {
    width: u32,
    height: u32,
    cells: Vec<bool>,
    pivot: CellCoord,
}

impl Layout {
    /// Creates a layout from a row-major occupancy matrix.
    pub fn new(
        width: u32,
        height: u32,
        cells: Vec<bool>,
        pivot: CellCoord,
    ) -> Result<Self, ShapeError> {
        let expected = usize::try_from(u64::from(width) * u64::from(height))
            .map_err(|_| ShapeError::InvalidShape)?;
        if expected == 0 || cells.len() != expected || !cells.iter().any(|cell| *cell) {
            return Err(ShapeError::InvalidShape);
        }

        let pivot_inside = u32::try_from(pivot.x()).map_or(false, |x| x < width)
            && u32::try_from(pivot.y()).map_or(false, |y| y < height);
        if !pivot_inside {
            return Err(ShapeError::InvalidShape);
        }

        Ok(Self {
            width,
            height,
            cells,
            pivot,
        })
    }

    /// Parses rows of `#` (occupied) and `.` (empty); row `0` is the first string.
    ///
    /// Every row must have the same length.
    pub fn from_rows(rows: &[&str], pivot: CellCoord) -> Result<Self, ShapeError> {
        let width = rows.first().map_or(0, |row| row.chars().count());
        let mut cells = Vec::with_capacity(width * rows.len());
        for row in rows {
            if row.chars().count() != width {
                return Err(ShapeError::InvalidShape);
            }
            for symbol in row.chars() {
                match symbol {
                    '#' => cells.push(true),
                    '.' => cells.push(false),
                    _ => return Err(ShapeError::InvalidShape),
                }
            }
        }

        let width = u32::try_from(width).map_err(|_| ShapeError::InvalidShape)?;
        let height = u32::try_from(rows.len()).map_err(|_| ShapeError::InvalidShape)?;
        Self::new(width, height, cells, pivot)
    }

    /// A single occupied cell with the pivot on it.
    #[must_use]
    pub fn single_cell() -> Self {
        Self {
            width: 1,
            height: 1,
            cells: vec![true],
            pivot: CellCoord::new(0, 0),
        }
    }

    /// Number of matrix columns.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Number of matrix rows.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Layout-local pivot cell.
    #[must_use]
    pub const fn pivot(&self) -> CellCoord {
        self.pivot
    }

    /// Row-major occupancy matrix.
    #[must_use]
    pub fn cells(&self) -> &[bool] {
        &self.cells
    }

    /// Number of occupied matrix entries.
    #[must_use]
    pub fn occupied_count(&self) -> usize {
        self.cells.iter().filter(|cell| **cell).count()
    }

    fn occupied_offsets(&self) -> impl Iterator<Item = CellCoord> + '_ {
        let width = self.width as usize;
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, occupied)| **occupied)
            .map(move |(index, _)| {
                let local = CellCoord::new((index % width) as i32, (index / width) as i32);
                local.delta(self.pivot)
            })
    }
}

#[derive(Serialize, Deserialize)]
struct LayoutRecord {
    width: u32,
    height: u32,
    cells: Vec<bool>,
    pivot: CellCoord,
}

impl TryFrom<LayoutRecord> for Layout {
    type Error = ShapeError;

    fn try_from(record: LayoutRecord) -> Result<Self, Self::Error> {
        Self::new(record.width, record.height, record.cells, record.pivot)
    }
}

impl From<Layout> for LayoutRecord {
    fn from(layout: Layout) -> Self {
        Self {
            width: layout.width,
            height: layout.height,
            cells: layout.cells,
            pivot: layout.pivot,
        }
    }
}

/// Computes the offsets a layout covers at the provided rotation.
#[must_use]
pub fn compute_footprint(layout: &Layout, rotation: Rotation) -> Footprint {
    Footprint {
        offsets: layout
            .occupied_offsets()
            .map(|offset| rotation.apply(offset))
            .collect(),
    }
}

/// Concrete set of pivot-relative offsets occupied by a shape.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Footprint {
    offsets: BTreeSet<CellCoord>,
}

impl Footprint {
    /// Offsets in ascending order.
    pub fn offsets(&self) -> impl Iterator<Item = CellCoord> + '_ {
        self.offsets.iter().copied()
    }

    /// Number of occupied offsets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    /// Reports whether the footprint covers no cells.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    /// Reports whether the offset belongs to the footprint.
    #[must_use]
    pub fn contains(&self, offset: CellCoord) -> bool {
        self.offsets.contains(&offset)
    }

    /// Rotates the footprint about its pivot by a further rotation.
    #[must_use]
    pub fn rotated(&self, rotation: Rotation) -> Self {
        Self {
            offsets: self.offsets.iter().map(|offset| rotation.apply(*offset)).collect(),
        }
    }

    /// Grid cells covered when the pivot sits on `anchor`.
    pub fn cells_at(&self, anchor: CellCoord) -> impl Iterator<Item = CellCoord> + '_ {
        self.offsets.iter().map(move |offset| anchor.offset(*offset))
    }

    /// Reports whether an offset lies on the shape's own perimeter.
    #[must_use]
    pub fn is_edge(&self, offset: CellCoord) -> bool {
        self.contains(offset)
            && offset
                .neighbors()
                .iter()
                .any(|neighbor| !self.offsets.contains(neighbor))
    }

    /// Offsets with at least one 4-neighbour outside the footprint.
    pub fn edge_offsets(&self) -> impl Iterator<Item = CellCoord> + '_ {
        self.offsets().filter(|offset| self.is_edge(*offset))
    }

    /// Axis-aligned bounds of the offsets, or `None` for an empty footprint.
    #[must_use]
    pub fn bounds(&self) -> Option<FootprintBounds> {
        let first = self.offsets.iter().next()?;
        let mut bounds = FootprintBounds {
            min: *first,
            max: *first,
        };
        for offset in &self.offsets {
            bounds.min = CellCoord::new(
                bounds.min.x().min(offset.x()),
                bounds.min.y().min(offset.y()),
            );
            bounds.max = CellCoord::new(
                bounds.max.x().max(offset.x()),
                bounds.max.y().max(offset.y()),
            );
        }
        Some(bounds)
    }
}

/// Inclusive bounding box of a footprint in pivot-relative cells.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FootprintBounds {
    min: CellCoord,
    max: CellCoord,
}

impl FootprintBounds {
    /// Minimum corner.
    #[must_use]
    pub const fn min(&self) -> CellCoord {
        self.min
    }

    /// Maximum corner, inclusive.
    #[must_use]
    pub const fn max(&self) -> CellCoord {
        self.max
    }

    /// Width and height in cells.
    #[must_use]
    pub fn size(&self) -> (u32, u32) {
        (
            self.min.x().abs_diff(self.max.x()) + 1,
            self.min.y().abs_diff(self.max.y()) + 1,
        )
    }

    /// Centre of the covered area relative to the pivot cell's centre.
    ///
    /// Rotating the footprint rotates this point with it, so visuals can be
    /// centred for any orientation without per-rotation corrections.
    #[must_use]
    pub fn center(&self) -> (f32, f32) {
        (
            (self.min.x() as f32 + self.max.x() as f32) / 2.0,
            (self.min.y() as f32 + self.max.y() as f32) / 2.0,
        )
    }
}

/// Shop entry describing a purchasable building.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BuildingDefinition {
    /// Display name of the building.
    pub name: String,
    /// Price charged when the building is purchased.
    pub cost: u32,
    /// Rotation-agnostic shape of the building.
    pub layout: Layout,
}
