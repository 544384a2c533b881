//! Placement validation rules shared by interactive placement and scans.

use std::collections::BTreeSet;

use hamlet_core::{CellCoord, ClearancePolicy, ObjectId, PlacementError};

use crate::{cells::CellStore, objects::ObjectRegistry};

/// Read-only pairing of the cell store and object registry.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Validator<'a> {
    pub(crate) cells: &'a CellStore,
    pub(crate) objects: &'a ObjectRegistry,
    pub(crate) require_connectivity: bool,
}

impl Validator<'_> {
    /// Checks a footprint against bounds, occupancy and connectivity.
    ///
    /// Cells are checked in the order given, so the first offending cell is
    /// the one reported.
    pub(crate) fn validate(
        &self,
        footprint: &[CellCoord],
        clearance: ClearancePolicy,
    ) -> Result<(), PlacementError> {
        if footprint.is_empty() {
            return Err(PlacementError::EmptyFootprint);
        }

        for &cell in footprint {
            self.check_cell(cell, clearance)?;
        }

        if !self.require_connectivity || self.objects.player_count() == 0 {
            return Ok(());
        }

        if self.touches_building(footprint) {
            Ok(())
        } else {
            Err(PlacementError::NoConnectivity)
        }
    }

    /// Cell-level validity without the connectivity rule.
    pub(crate) fn check_cell(
        &self,
        cell: CellCoord,
        clearance: ClearancePolicy,
    ) -> Result<(), PlacementError> {
        if !self.cells.is_within_bounds(cell) {
            return Err(PlacementError::OutOfBounds(cell));
        }

        let Some(state) = self.cells.get(cell) else {
            return Err(PlacementError::CellNotPlaceable(cell));
        };
        if !state.placeable {
            return Err(PlacementError::CellNotPlaceable(cell));
        }

        match state.occupant {
            None => Ok(()),
            Some(occupant)
                if clearance == ClearancePolicy::ClearDestructible
                    && self.is_clearable(occupant) =>
            {
                Ok(())
            }
            Some(_) => Err(PlacementError::CellOccupied(cell)),
        }
    }

    /// Empty (or clearable) in-bounds cells adjacent to any player building.
    pub(crate) fn frontier(&self, clearance: ClearancePolicy, out: &mut BTreeSet<CellCoord>) {
        out.clear();
        for (_, state) in self.objects.iter().filter(|(_, state)| state.profile.is_player()) {
            for cell in &state.cells {
                for neighbor in cell.neighbors() {
                    if self.check_cell(neighbor, clearance).is_ok() {
                        let _ = out.insert(neighbor);
                    }
                }
            }
        }
    }

    fn touches_building(&self, footprint: &[CellCoord]) -> bool {
        footprint.iter().any(|cell| {
            cell.neighbors().iter().any(|neighbor| {
                !footprint.contains(neighbor)
                    && self
                        .cells
                        .occupant(*neighbor)
                        .and_then(|occupant| self.objects.get(occupant))
                        .map_or(false, |state| state.profile.is_player())
            })
        })
    }

    fn is_clearable(&self, occupant: ObjectId) -> bool {
        self.objects
            .get(occupant)
            .map_or(false, |state| state.profile.is_clearable())
    }
}

#[cfg(test)]
mod tests {
    use hamlet_core::{GridLayout, ObjectProfile};

    use super::*;
    use crate::objects::ObjectState;

    struct Fixture {
        cells: CellStore,
        objects: ObjectRegistry,
    }

    impl Fixture {
        fn new(width: u32, depth: u32) -> Self {
            Self {
                cells: CellStore::from_layout(&GridLayout::rectangular(width, depth)),
                objects: ObjectRegistry::new(),
            }
        }

        fn put(&mut self, id: u32, profile: ObjectProfile, cells: &[CellCoord]) {
            let object = ObjectId::new(id);
            for cell in cells {
                self.cells.occupy(*cell, object);
            }
            self.objects.insert(
                object,
                ObjectState {
                    profile,
                    cells: cells.to_vec(),
                },
            );
        }

        fn validator(&self) -> Validator<'_> {
            Validator {
                cells: &self.cells,
                objects: &self.objects,
                require_connectivity: true,
            }
        }
    }

    #[test]
    fn empty_footprint_is_rejected() {
        let fixture = Fixture::new(3, 3);
        assert_eq!(
            fixture.validator().validate(&[], ClearancePolicy::Strict),
            Err(PlacementError::EmptyFootprint)
        );
    }

    #[test]
    fn first_building_needs_no_neighbour() {
        let fixture = Fixture::new(3, 3);
        assert_eq!(
            fixture
                .validator()
                .validate(&[CellCoord::new(2, 2)], ClearancePolicy::Strict),
            Ok(())
        );
    }

    #[test]
    fn obstacles_do_not_satisfy_connectivity() {
        let mut fixture = Fixture::new(4, 4);
        fixture.put(1, ObjectProfile::building(), &[CellCoord::new(0, 0)]);
        fixture.put(2, ObjectProfile::obstacle(false), &[CellCoord::new(3, 2)]);

        let validator = fixture.validator();
        assert_eq!(
            validator.validate(&[CellCoord::new(3, 3)], ClearancePolicy::Strict),
            Err(PlacementError::NoConnectivity)
        );
        assert_eq!(
            validator.validate(&[CellCoord::new(1, 0)], ClearancePolicy::Strict),
            Ok(())
        );
    }

    #[test]
    fn own_cells_do_not_count_as_neighbours() {
        let mut fixture = Fixture::new(4, 4);
        fixture.put(1, ObjectProfile::building(), &[CellCoord::new(0, 0)]);
        let footprint = [CellCoord::new(2, 2), CellCoord::new(2, 3)];
        assert_eq!(
            fixture.validator().validate(&footprint, ClearancePolicy::Strict),
            Err(PlacementError::NoConnectivity)
        );
    }

    #[test]
    fn clearable_obstacles_pass_only_under_clearing_policy() {
        let mut fixture = Fixture::new(3, 1);
        fixture.put(1, ObjectProfile::building(), &[CellCoord::new(0, 0)]);
        fixture.put(2, ObjectProfile::obstacle(true), &[CellCoord::new(1, 0)]);
        fixture.put(3, ObjectProfile::obstacle(false), &[CellCoord::new(2, 0)]);

        let validator = fixture.validator();
        let rubble = [CellCoord::new(1, 0)];
        assert_eq!(
            validator.validate(&rubble, ClearancePolicy::Strict),
            Err(PlacementError::CellOccupied(CellCoord::new(1, 0)))
        );
        assert_eq!(validator.validate(&rubble, ClearancePolicy::ClearDestructible), Ok(()));
        assert_eq!(
            validator.validate(&[CellCoord::new(2, 0)], ClearancePolicy::ClearDestructible),
            Err(PlacementError::CellOccupied(CellCoord::new(2, 0)))
        );
    }

    #[test]
    fn frontier_lists_free_cells_around_buildings() {
        let mut fixture = Fixture::new(3, 3);
        fixture.put(1, ObjectProfile::building(), &[CellCoord::new(1, 1)]);
        fixture.put(2, ObjectProfile::obstacle(true), &[CellCoord::new(1, 2)]);

        let mut frontier = BTreeSet::new();
        fixture.validator().frontier(ClearancePolicy::Strict, &mut frontier);
        assert_eq!(
            frontier.iter().copied().collect::<Vec<_>>(),
            vec![CellCoord::new(0, 1), CellCoord::new(1, 0), CellCoord::new(2, 1)]
        );

        fixture
            .validator()
            .frontier(ClearancePolicy::ClearDestructible, &mut frontier);
        assert!(frontier.contains(&CellCoord::new(1, 2)));
    }
}
