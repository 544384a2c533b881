//! Sparse cell storage keyed by grid coordinate.

use std::collections::BTreeMap;

use hamlet_core::{CellCoord, CellError, GridLayout, ObjectId};

/// State tracked for a single existing cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct CellState {
    /// Whether buildings may occupy the cell.
    pub(crate) placeable: bool,
    /// Object currently covering the cell, if any.
    pub(crate) occupant: Option<ObjectId>,
}

/// Bounded sparse map from coordinates to cell state.
///
/// A cell holding an occupant is always placeable; every mutator preserves
/// that.
#[derive(Clone, Debug)]
pub(crate) struct CellStore {
    width: u32,
    depth: u32,
    cells: BTreeMap<CellCoord, CellState>,
}

impl CellStore {
    /// Builds a store containing every cell listed by the layout.
    pub(crate) fn from_layout(layout: &GridLayout) -> Self {
        let cells = layout
            .cells()
            .map(|(cell, placeable)| {
                (
                    cell,
                    CellState {
                        placeable,
                        occupant: None,
                    },
                )
            })
            .collect();

        Self {
            width: layout.width(),
            depth: layout.depth(),
            cells,
        }
    }

    pub(crate) fn dimensions(&self) -> (u32, u32) {
        (self.width, self.depth)
    }

    pub(crate) fn is_within_bounds(&self, cell: CellCoord) -> bool {
        u32::try_from(cell.x()).map_or(false, |x| x < self.width)
            && u32::try_from(cell.y()).map_or(false, |y| y < self.depth)
    }

    pub(crate) fn get(&self, cell: CellCoord) -> Option<CellState> {
        self.cells.get(&cell).copied()
    }

    pub(crate) fn occupant(&self, cell: CellCoord) -> Option<ObjectId> {
        self.cells.get(&cell).and_then(|state| state.occupant)
    }

    /// True iff the cell exists, is placeable and is unoccupied.
    pub(crate) fn is_cell_valid(&self, cell: CellCoord) -> bool {
        self.cells
            .get(&cell)
            .map_or(false, |state| state.placeable && state.occupant.is_none())
    }

    /// Inserts a cell or re-flags an existing one.
    pub(crate) fn add_cell(&mut self, cell: CellCoord, placeable: bool) -> Result<(), CellError> {
        if !self.is_within_bounds(cell) {
            return Err(CellError::OutOfBounds);
        }

        match self.cells.get_mut(&cell) {
            Some(state) => {
                if !placeable && state.occupant.is_some() {
                    return Err(CellError::Occupied);
                }
                state.placeable = placeable;
            }
            None => {
                let _ = self.cells.insert(
                    cell,
                    CellState {
                        placeable,
                        occupant: None,
                    },
                );
            }
        }
        Ok(())
    }

    /// Removes an unoccupied cell.
    pub(crate) fn remove_cell(&mut self, cell: CellCoord) -> Result<(), CellError> {
        match self.cells.get(&cell) {
            None => Err(CellError::Missing),
            Some(state) if state.occupant.is_some() => Err(CellError::Occupied),
            Some(_) => {
                let _ = self.cells.remove(&cell);
                Ok(())
            }
        }
    }

    /// Claims a cell for an object. Callers validate beforehand.
    pub(crate) fn occupy(&mut self, cell: CellCoord, object: ObjectId) {
        if let Some(state) = self.cells.get_mut(&cell) {
            state.occupant = Some(object);
        }
    }

    /// Releases a cell only when it is held by `object`.
    pub(crate) fn vacate_if(&mut self, cell: CellCoord, object: ObjectId) -> bool {
        match self.cells.get_mut(&cell) {
            Some(state) if state.occupant == Some(object) => {
                state.occupant = None;
                true
            }
            _ => false,
        }
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = (CellCoord, CellState)> + '_ {
        self.cells.iter().map(|(cell, state)| (*cell, *state))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> CellStore {
        CellStore::from_layout(&GridLayout::rectangular(3, 2))
    }

    #[test]
    fn layout_populates_every_cell() {
        let store = store();
        assert_eq!(store.iter().count(), 6);
        assert_eq!(store.dimensions(), (3, 2));
        assert!(store.is_cell_valid(CellCoord::new(2, 1)));
        assert!(!store.is_within_bounds(CellCoord::new(3, 0)));
        assert!(!store.is_within_bounds(CellCoord::new(0, -1)));
    }

    #[test]
    fn validity_requires_existing_placeable_free_cell() {
        let mut store = store();
        let cell = CellCoord::new(1, 1);
        store.occupy(cell, ObjectId::new(4));
        assert!(!store.is_cell_valid(cell));

        store.add_cell(CellCoord::new(0, 0), false).expect("re-flag");
        assert!(!store.is_cell_valid(CellCoord::new(0, 0)));

        store.remove_cell(CellCoord::new(2, 0)).expect("remove");
        assert!(!store.is_cell_valid(CellCoord::new(2, 0)));
    }

    #[test]
    fn occupied_cells_cannot_be_unflagged_or_removed() {
        let mut store = store();
        let cell = CellCoord::new(0, 1);
        store.occupy(cell, ObjectId::new(1));
        assert_eq!(store.add_cell(cell, false), Err(CellError::Occupied));
        assert_eq!(store.remove_cell(cell), Err(CellError::Occupied));
        assert_eq!(store.get(cell).map(|state| state.placeable), Some(true));
    }

    #[test]
    fn edits_outside_bounds_or_missing_cells_fail() {
        let mut store = store();
        assert_eq!(
            store.add_cell(CellCoord::new(5, 5), true),
            Err(CellError::OutOfBounds)
        );
        assert_eq!(
            store.remove_cell(CellCoord::new(5, 5)),
            Err(CellError::Missing)
        );
    }

    #[test]
    fn vacate_only_releases_matching_occupant() {
        let mut store = store();
        let cell = CellCoord::new(1, 0);
        store.occupy(cell, ObjectId::new(1));
        assert!(!store.vacate_if(cell, ObjectId::new(2)));
        assert_eq!(store.occupant(cell), Some(ObjectId::new(1)));
        assert!(store.vacate_if(cell, ObjectId::new(1)));
        assert_eq!(store.occupant(cell), None);
    }
}
