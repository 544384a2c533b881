#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Hamlet city builder.
//!
//! This crate defines the message surface that connects adapters, the
//! authoritative world, and pure systems. Adapters submit [`Command`] values
//! describing desired grid mutations, the world executes those commands via
//! its `apply` entry point, and then broadcasts [`Event`] values for systems
//! to react to deterministically. Systems such as the reachability scanner
//! and the outcome state machine consume event streams and query immutable
//! views; they never mutate the grid directly.

pub mod shape;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use shape::{
    compute_footprint, BuildingDefinition, Footprint, FootprintBounds, Layout, Rotation,
    ShapeError,
};

/// Location of a single grid cell, or an offset between two cells.
///
/// Grid cells live in the non-negative quadrant; footprint offsets relative to
/// a pivot may be negative, so both share the signed representation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellCoord {
    x: i32,
    y: i32,
}

impl CellCoord {
    /// Creates a new cell coordinate.
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Column component of the coordinate.
    #[must_use]
    pub const fn x(&self) -> i32 {
        self.x
    }

    /// Row component of the coordinate.
    #[must_use]
    pub const fn y(&self) -> i32 {
        self.y
    }

    /// Translates the coordinate by the provided offset, saturating at the
    /// numeric bounds.
    #[must_use]
    pub const fn offset(self, by: CellCoord) -> Self {
        Self {
            x: self.x.saturating_add(by.x),
            y: self.y.saturating_add(by.y),
        }
    }

    /// Difference `self - other`, saturating at the numeric bounds.
    #[must_use]
    pub const fn delta(self, other: CellCoord) -> Self {
        Self {
            x: self.x.saturating_sub(other.x),
            y: self.y.saturating_sub(other.y),
        }
    }

    /// Returns the adjacent cell in the provided direction.
    #[must_use]
    pub const fn step(self, direction: Direction) -> Self {
        self.offset(direction.unit())
    }

    /// The four edge-adjacent neighbours in north, east, south, west order.
    #[must_use]
    pub fn neighbors(self) -> [CellCoord; 4] {
        Direction::ALL.map(|direction| self.step(direction))
    }
}

/// Cardinal directions used for edge adjacency.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Toward increasing row indices.
    North,
    /// Toward increasing column indices.
    East,
    /// Toward decreasing row indices.
    South,
    /// Toward decreasing column indices.
    West,
}

impl Direction {
    /// All directions in clockwise order starting at north.
    pub const ALL: [Direction; 4] = [Self::North, Self::East, Self::South, Self::West];

    /// Unit offset for a single step in this direction.
    #[must_use]
    pub const fn unit(self) -> CellCoord {
        match self {
            Self::North => CellCoord::new(0, 1),
            Self::East => CellCoord::new(1, 0),
            Self::South => CellCoord::new(0, -1),
            Self::West => CellCoord::new(-1, 0),
        }
    }
}

/// Unique handle identifying an object that may occupy grid cells.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectId(u32);

impl ObjectId {
    /// Creates a new object identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Distinguishes player buildings from world decoration placed at setup.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObjectKind {
    /// Building purchased and placed by the player.
    Player,
    /// Obstacle or decoration present before play started.
    Preplaced,
}

/// Identity-independent attributes of a grid object.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectProfile {
    /// Whether the object is a player building or pre-placed decoration.
    pub kind: ObjectKind,
    /// Whether the object may be lifted and moved after placement.
    pub movable: bool,
    /// Whether the object may be destroyed to free its cells.
    pub destructible: bool,
}

impl ObjectProfile {
    /// Profile of a freshly purchased building: movable, not destructible.
    #[must_use]
    pub const fn building() -> Self {
        Self {
            kind: ObjectKind::Player,
            movable: true,
            destructible: false,
        }
    }

    /// Profile of a pre-placed obstacle that can never be moved.
    #[must_use]
    pub const fn obstacle(destructible: bool) -> Self {
        Self {
            kind: ObjectKind::Preplaced,
            movable: false,
            destructible,
        }
    }

    /// Reports whether the object counts toward connectivity and reachability.
    #[must_use]
    pub const fn is_player(&self) -> bool {
        matches!(self.kind, ObjectKind::Player)
    }

    /// Reports whether a placement scan may treat the object's cells as free.
    #[must_use]
    pub const fn is_clearable(&self) -> bool {
        matches!(self.kind, ObjectKind::Preplaced) && self.destructible
    }
}

/// How a reachability query treats cells held by clearable obstacles.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ClearancePolicy {
    /// Only empty, placeable cells are usable.
    Strict,
    /// Cells held by destructible pre-placed objects are usable as well.
    #[default]
    ClearDestructible,
}

/// World-space position of the grid's minimum corner.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GridOrigin {
    /// Horizontal world coordinate.
    pub x: f32,
    /// Depth world coordinate.
    pub z: f32,
}

/// Rules and world-space mapping applied to a grid.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GridConfig {
    /// Edge length of a single square cell in world units.
    pub cell_size: f32,
    /// World-space position of cell `(0, 0)`'s minimum corner.
    pub origin: GridOrigin,
    /// Whether placements after the first must share an edge with a building.
    pub require_connectivity: bool,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            cell_size: 1.0,
            origin: GridOrigin::default(),
            require_connectivity: true,
        }
    }
}

impl GridConfig {
    /// World-space centre of the provided cell.
    #[must_use]
    pub fn cell_center(&self, cell: CellCoord) -> (f32, f32) {
        (
            self.origin.x + (cell.x() as f32 + 0.5) * self.cell_size,
            self.origin.z + (cell.y() as f32 + 0.5) * self.cell_size,
        )
    }

    /// Cell containing the provided world-space point.
    ///
    /// Returns `None` when the configured cell size is not positive.
    #[must_use]
    pub fn cell_at(&self, x: f32, z: f32) -> Option<CellCoord> {
        if self.cell_size <= 0.0 {
            return None;
        }

        let column = ((x - self.origin.x) / self.cell_size).floor();
        let row = ((z - self.origin.z) / self.cell_size).floor();
        if !column.is_finite() || !row.is_finite() {
            return None;
        }

        Some(CellCoord::new(column as i32, row as i32))
    }
}

/// Boolean mask describing which cells of a `width × depth` grid exist and
/// accept buildings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "GridLayoutRecord", into = "GridLayoutRecord")]
pub struct GridLayout {
    width: u32,
    depth: u32,
    placeable: Vec<bool>,
}

#[derive(Serialize, Deserialize)]
struct GridLayoutRecord {
    width: u32,
    depth: u32,
    placeable: Vec<bool>,
}

impl TryFrom<GridLayoutRecord> for GridLayout {
    type Error = LayoutError;

    fn try_from(record: GridLayoutRecord) -> Result<Self, Self::Error> {
        Self::new(record.width, record.depth, record.placeable)
    }
}

impl From<GridLayout> for GridLayoutRecord {
    fn from(layout: GridLayout) -> Self {
        Self {
            width: layout.width,
            depth: layout.depth,
            placeable: layout.placeable,
        }
    }
}

impl GridLayout {
    /// Creates a layout from a row-major placeable mask.
    pub fn new(width: u32, depth: u32, placeable: Vec<bool>) -> Result<Self, LayoutError> {
        let expected = usize::try_from(u64::from(width) * u64::from(depth))
            .map_err(|_| LayoutError::TooLarge { width, depth })?;
        if placeable.len() != expected {
            return Err(LayoutError::DimensionMismatch {
                expected,
                actual: placeable.len(),
            });
        }

        Ok(Self {
            width,
            depth,
            placeable,
        })
    }

    /// Creates a fully placeable rectangular layout.
    #[must_use]
    pub fn rectangular(width: u32, depth: u32) -> Self {
        let count = usize::try_from(u64::from(width) * u64::from(depth)).unwrap_or(0);
        Self {
            width,
            depth,
            placeable: vec![true; count],
        }
    }

    /// Number of columns.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Number of rows.
    #[must_use]
    pub const fn depth(&self) -> u32 {
        self.depth
    }

    /// Row-major placeable mask.
    #[must_use]
    pub fn placeable(&self) -> &[bool] {
        &self.placeable
    }

    /// Placeable flag of an in-bounds cell.
    #[must_use]
    pub fn is_placeable(&self, cell: CellCoord) -> Option<bool> {
        let column = u32::try_from(cell.x()).ok()?;
        let row = u32::try_from(cell.y()).ok()?;
        if column >= self.width || row >= self.depth {
            return None;
        }

        let index = usize::try_from(u64::from(row) * u64::from(self.width) + u64::from(column))
            .ok()?;
        self.placeable.get(index).copied()
    }

    /// Iterates every cell of the layout with its placeable flag, row by row.
    pub fn cells(&self) -> impl Iterator<Item = (CellCoord, bool)> + '_ {
        let width = self.width.max(1) as usize;
        self.placeable.iter().enumerate().map(move |(index, placeable)| {
            let column = (index % width) as i32;
            let row = (index / width) as i32;
            (CellCoord::new(column, row), *placeable)
        })
    }
}

/// Snapshot of the pending shop item handed to the outcome state machine.
#[derive(Clone, Copy, Debug)]
pub struct ShopStatus<'a> {
    /// Building the player must be able to place next, if any remain.
    pub upcoming: Option<&'a BuildingDefinition>,
    /// Whether a non-looping sequence has sold every building.
    pub exhausted: bool,
}

/// Commands that express all permissible world mutations.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Clears the world and rebuilds the cell store from a layout.
    ConfigureGrid {
        /// Rules and world-space mapping for the rebuilt grid.
        config: GridConfig,
        /// Placeable mask describing which cells exist.
        layout: GridLayout,
    },
    /// Inserts or re-flags a single cell.
    AddCell {
        /// Cell to insert.
        cell: CellCoord,
        /// Whether buildings may occupy the cell.
        placeable: bool,
    },
    /// Removes a single cell from the store.
    RemoveCell {
        /// Cell to remove.
        cell: CellCoord,
    },
    /// Places an object during setup without the connectivity rule.
    SeedObject {
        /// Handle assigned to the object.
        object: ObjectId,
        /// Attributes applied to the object.
        profile: ObjectProfile,
        /// Cells the object occupies.
        cells: Vec<CellCoord>,
    },
    /// Marks an object as the one currently being dragged for placement.
    ///
    /// An object already on the grid is lifted off its cells.
    BeginPlacement {
        /// Handle of the object being picked up.
        object: ObjectId,
        /// Attributes used when the object is not yet on the grid.
        profile: ObjectProfile,
    },
    /// Commits an object's footprint onto the grid.
    PlaceObject {
        /// Handle of the object being placed.
        object: ObjectId,
        /// Cells the object will occupy.
        cells: Vec<CellCoord>,
    },
    /// Drops the pending object, restoring a lifted object to its cells.
    CancelPlacement {
        /// Handle of the pending object.
        object: ObjectId,
    },
    /// Retracts an object's footprint from the grid.
    RemoveObject {
        /// Handle of the object being removed.
        object: ObjectId,
        /// Cells the caller believes the object occupies.
        cells: Vec<CellCoord>,
    },
    /// Destroys a destructible object, freeing its cells.
    DestroyObject {
        /// Handle of the object to destroy.
        object: ObjectId,
    },
    /// Permanently prevents an object from being lifted.
    MarkImmovable {
        /// Handle of the object to pin.
        object: ObjectId,
    },
    /// Permanently prevents an object from being destroyed.
    MarkIndestructible {
        /// Handle of the object to protect.
        object: ObjectId,
    },
}

/// Events broadcast by the world after processing commands.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    /// Announces that the grid was cleared and rebuilt.
    GridConfigured {
        /// Number of columns in the rebuilt grid.
        width: u32,
        /// Number of rows in the rebuilt grid.
        depth: u32,
    },
    /// Notifies presentation that a cell's placeable flag or occupant changed.
    CellStateChanged {
        /// Cell whose state changed.
        cell: CellCoord,
    },
    /// Reports that a cell edit was rejected.
    CellEditRejected {
        /// Cell targeted by the edit.
        cell: CellCoord,
        /// Specific reason the edit failed.
        reason: CellError,
    },
    /// Confirms that an object became the pending placement.
    PlacementBegan {
        /// Handle of the pending object.
        object: ObjectId,
    },
    /// Confirms that the pending placement was abandoned.
    PlacementCancelled {
        /// Handle of the abandoned object.
        object: ObjectId,
        /// Whether a lifted object returned to its previous cells.
        restored: bool,
    },
    /// Confirms that an object now occupies its footprint.
    ObjectPlaced {
        /// Handle of the placed object.
        object: ObjectId,
        /// Whether the object is a player building or decoration.
        kind: ObjectKind,
        /// Cells occupied by the object.
        cells: Vec<CellCoord>,
    },
    /// Reports that a placement request was rejected without side effects.
    PlacementRejected {
        /// Handle named in the request.
        object: ObjectId,
        /// Specific reason the placement failed.
        reason: PlacementError,
    },
    /// Confirms that an object's footprint was retracted.
    ObjectRemoved {
        /// Handle of the removed object.
        object: ObjectId,
        /// Cells released by the removal.
        cells: Vec<CellCoord>,
    },
    /// Confirms that a destructible object was destroyed.
    ObjectDestroyed {
        /// Handle of the destroyed object.
        object: ObjectId,
        /// Cells released by the destruction.
        cells: Vec<CellCoord>,
    },
    /// Reports that a removal, destruction or flag change was rejected.
    RemovalRejected {
        /// Handle named in the request.
        object: ObjectId,
        /// Specific reason the request failed.
        reason: RemovalError,
    },
    /// Confirms that an object's profile flags changed.
    ObjectProfileChanged {
        /// Handle of the updated object.
        object: ObjectId,
        /// Profile after the change.
        profile: ObjectProfile,
    },
    /// Signals that a placement or removal completed and nothing is pending.
    PlacementSettled,
}

/// Reasons a placement request may be rejected by the world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Error)]
pub enum PlacementError {
    /// The footprint contains no cells.
    #[error("footprint is empty")]
    EmptyFootprint,
    /// A footprint cell lies outside the grid extents.
    #[error("cell ({}, {}) is outside the grid", .0.x(), .0.y())]
    OutOfBounds(CellCoord),
    /// A footprint cell is missing or does not accept buildings.
    #[error("cell ({}, {}) does not accept buildings", .0.x(), .0.y())]
    CellNotPlaceable(CellCoord),
    /// A footprint cell already holds another object.
    #[error("cell ({}, {}) is already occupied", .0.x(), .0.y())]
    CellOccupied(CellCoord),
    /// No footprint cell shares an edge with an existing building.
    #[error("placement must touch an existing building")]
    NoConnectivity,
    /// Another object is still pending placement.
    #[error("another object is pending placement")]
    AlreadyPending,
    /// The object already occupies cells on the grid.
    #[error("object is already placed")]
    AlreadyPlaced,
    /// The object is not the pending placement.
    #[error("object is not pending placement")]
    NotPending,
}

/// Reasons a removal, destruction or flag change may be rejected.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Error)]
pub enum RemovalError {
    /// No placed object carries the provided handle.
    #[error("no placed object with that handle")]
    MissingObject,
    /// The object's destructible flag is cleared.
    #[error("object cannot be destroyed")]
    NotDestructible,
    /// The object's movable flag is cleared.
    #[error("object cannot be moved")]
    NotMovable,
    /// Another object is still pending placement.
    #[error("another object is pending placement")]
    AlreadyPending,
}

/// Reasons a single-cell edit may be rejected.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Error)]
pub enum CellError {
    /// The cell lies outside the grid extents.
    #[error("cell is outside the grid")]
    OutOfBounds,
    /// The cell holds an occupant that the edit would orphan.
    #[error("cell is occupied")]
    Occupied,
    /// The cell does not exist in the store.
    #[error("cell does not exist")]
    Missing,
}

/// Reasons a grid layout cannot be constructed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum LayoutError {
    /// The placeable mask length disagrees with `width × depth`.
    #[error("layout expects {expected} cells but {actual} were provided")]
    DimensionMismatch {
        /// Cell count implied by the dimensions.
        expected: usize,
        /// Cell count actually provided.
        actual: usize,
    },
    /// The dimensions cannot be addressed on this platform.
    #[error("layout of {width}x{depth} cells is too large")]
    TooLarge {
        /// Requested column count.
        width: u32,
        /// Requested row count.
        depth: u32,
    },
}
