#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative grid state management for Hamlet.
//!
//! The [`World`] owns the sparse cell store and the registry of placed
//! objects. All mutation flows through [`apply`], which validates a command
//! completely before touching any cell so that rejected commands leave the
//! grid untouched.

mod cells;
mod objects;
mod placement;

use hamlet_core::{
    CellCoord, ClearancePolicy, Command, Event, GridConfig, GridLayout, ObjectId, ObjectProfile,
    PlacementError, RemovalError,
};

use crate::{
    cells::CellStore,
    objects::{ObjectRegistry, ObjectState},
    placement::Validator,
};

const DEFAULT_GRID_WIDTH: u32 = 10;
const DEFAULT_GRID_DEPTH: u32 = 10;

/// Represents the authoritative Hamlet grid state.
#[derive(Debug)]
pub struct World {
    config: GridConfig,
    cells: CellStore,
    objects: ObjectRegistry,
    pending: Option<PendingPlacement>,
}

impl World {
    /// Creates a world with a fully placeable default grid.
    #[must_use]
    pub fn new() -> Self {
        Self::with_layout(
            GridConfig::default(),
            &GridLayout::rectangular(DEFAULT_GRID_WIDTH, DEFAULT_GRID_DEPTH),
        )
    }

    /// Creates a world from an explicit configuration and layout.
    #[must_use]
    pub fn with_layout(config: GridConfig, layout: &GridLayout) -> Self {
        Self {
            config,
            cells: CellStore::from_layout(layout),
            objects: ObjectRegistry::new(),
            pending: None,
        }
    }

    fn validator(&self, profile: ObjectProfile) -> Validator<'_> {
        Validator {
            cells: &self.cells,
            objects: &self.objects,
            require_connectivity: self.config.require_connectivity && profile.is_player(),
        }
    }

    fn pending_object(&self) -> Option<ObjectId> {
        self.pending.as_ref().map(|pending| pending.object)
    }

    fn take_pending(&mut self, object: ObjectId) -> Option<PendingPlacement> {
        if self.pending_object() == Some(object) {
            self.pending.take()
        } else {
            None
        }
    }

    fn commit(
        &mut self,
        object: ObjectId,
        profile: ObjectProfile,
        cells: Vec<CellCoord>,
        out_events: &mut Vec<Event>,
    ) {
        for &cell in &cells {
            self.cells.occupy(cell, object);
            out_events.push(Event::CellStateChanged { cell });
        }
        self.objects.insert(
            object,
            ObjectState {
                profile,
                cells: cells.clone(),
            },
        );
        log::debug!("object {} placed on {} cells", object.get(), cells.len());
        out_events.push(Event::ObjectPlaced {
            object,
            kind: profile.kind,
            cells,
        });
    }

    /// Releases every cell held by `object` among its recorded cells and the
    /// caller-provided ones, and drops its registry entry.
    fn release(
        &mut self,
        object: ObjectId,
        extra: &[CellCoord],
        out_events: &mut Vec<Event>,
    ) -> Option<(ObjectState, Vec<CellCoord>)> {
        let state = self.objects.remove(object)?;
        let mut released = Vec::with_capacity(state.cells.len());
        for &cell in extra.iter().chain(state.cells.iter()) {
            if self.cells.vacate_if(cell, object) {
                released.push(cell);
                out_events.push(Event::CellStateChanged { cell });
            }
        }
        Some((state, released))
    }

    fn settle(&self, out_events: &mut Vec<Event>) {
        if self.pending.is_none() {
            out_events.push(Event::PlacementSettled);
        }
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone, Debug)]
struct PendingPlacement {
    object: ObjectId,
    profile: ObjectProfile,
    lifted_from: Option<Vec<CellCoord>>,
}

/// Applies the provided command to the world, mutating state deterministically.
pub fn apply(world: &mut World, command: Command, out_events: &mut Vec<Event>) {
    match command {
        Command::ConfigureGrid { config, layout } => {
            world.config = config;
            world.cells = CellStore::from_layout(&layout);
            world.objects = ObjectRegistry::new();
            world.pending = None;
            log::info!(
                "grid rebuilt with {}x{} cells",
                layout.width(),
                layout.depth()
            );
            out_events.push(Event::GridConfigured {
                width: layout.width(),
                depth: layout.depth(),
            });
        }
        Command::AddCell { cell, placeable } => {
            let result = world.cells.add_cell(cell, placeable);
            push_cell_edit(cell, result, out_events);
        }
        Command::RemoveCell { cell } => {
            let result = world.cells.remove_cell(cell);
            push_cell_edit(cell, result, out_events);
        }
        Command::SeedObject {
            object,
            profile,
            cells,
        } => {
            if world.objects.contains(object) || world.pending_object() == Some(object) {
                reject_placement(object, PlacementError::AlreadyPlaced, out_events);
                return;
            }

            let cells = dedup(cells);
            let validator = Validator {
                require_connectivity: false,
                ..world.validator(profile)
            };
            match validator.validate(&cells, ClearancePolicy::Strict) {
                Ok(()) => world.commit(object, profile, cells, out_events),
                Err(reason) => reject_placement(object, reason, out_events),
            }
        }
        Command::BeginPlacement { object, profile } => {
            if world.pending.is_some() {
                reject_placement(object, PlacementError::AlreadyPending, out_events);
                return;
            }

            let lifted = match world.objects.get(object).map(|state| state.profile.movable) {
                Some(false) => {
                    reject_removal(object, RemovalError::NotMovable, out_events);
                    return;
                }
                Some(true) => world.release(object, &[], out_events),
                None => None,
            };

            let (profile, lifted_from) = match lifted {
                Some((state, released)) => (state.profile, Some(released)),
                None => (profile, None),
            };
            world.pending = Some(PendingPlacement {
                object,
                profile,
                lifted_from,
            });
            log::debug!("object {} pending placement", object.get());
            out_events.push(Event::PlacementBegan { object });
        }
        Command::PlaceObject { object, cells } => {
            let profile = match &world.pending {
                Some(pending) if pending.object == object => pending.profile,
                Some(_) => {
                    reject_placement(object, PlacementError::AlreadyPending, out_events);
                    return;
                }
                None => ObjectProfile::building(),
            };
            if world.objects.contains(object) {
                reject_placement(object, PlacementError::AlreadyPlaced, out_events);
                return;
            }

            let cells = dedup(cells);
            if let Err(reason) = world
                .validator(profile)
                .validate(&cells, ClearancePolicy::Strict)
            {
                reject_placement(object, reason, out_events);
                return;
            }

            world.pending = None;
            world.commit(object, profile, cells, out_events);
            world.settle(out_events);
        }
        Command::CancelPlacement { object } => {
            let Some(pending) = world.take_pending(object) else {
                reject_placement(object, PlacementError::NotPending, out_events);
                return;
            };

            let mut restored = false;
            if let Some(cells) = pending.lifted_from {
                let validator = Validator {
                    require_connectivity: false,
                    ..world.validator(pending.profile)
                };
                if validator.validate(&cells, ClearancePolicy::Strict).is_ok() {
                    world.commit(object, pending.profile, cells, out_events);
                    restored = true;
                } else {
                    log::warn!(
                        "object {} could not return to its previous cells",
                        object.get()
                    );
                }
            }

            out_events.push(Event::PlacementCancelled { object, restored });
            world.settle(out_events);
        }
        Command::RemoveObject { object, cells } => {
            if world.pending.is_some() {
                reject_removal(object, RemovalError::AlreadyPending, out_events);
                return;
            }

            match world.release(object, &cells, out_events) {
                Some((_, released)) => {
                    log::debug!("object {} removed", object.get());
                    out_events.push(Event::ObjectRemoved {
                        object,
                        cells: released,
                    });
                    world.settle(out_events);
                }
                None => reject_removal(object, RemovalError::MissingObject, out_events),
            }
        }
        Command::DestroyObject { object } => {
            if world.pending.is_some() {
                reject_removal(object, RemovalError::AlreadyPending, out_events);
                return;
            }

            match world.objects.get(object).map(|state| state.profile.destructible) {
                None => reject_removal(object, RemovalError::MissingObject, out_events),
                Some(false) => {
                    reject_removal(object, RemovalError::NotDestructible, out_events);
                }
                Some(true) => {
                    if let Some((_, released)) = world.release(object, &[], out_events) {
                        log::debug!("object {} destroyed", object.get());
                        out_events.push(Event::ObjectDestroyed {
                            object,
                            cells: released,
                        });
                        world.settle(out_events);
                    }
                }
            }
        }
        Command::MarkImmovable { object } => {
            update_profile(world, object, |profile| profile.movable = false, out_events);
        }
        Command::MarkIndestructible { object } => {
            update_profile(world, object, |profile| profile.destructible = false, out_events);
        }
    }
}

fn update_profile(
    world: &mut World,
    object: ObjectId,
    update: impl Fn(&mut ObjectProfile),
    out_events: &mut Vec<Event>,
) {
    let changed = match world.pending.as_mut() {
        Some(pending) if pending.object == object => {
            let before = pending.profile;
            update(&mut pending.profile);
            Some((before, pending.profile))
        }
        _ => world
            .objects
            .get(object)
            .map(|state| state.profile)
            .and_then(|before| {
                world
                    .objects
                    .update_profile(object, &update)
                    .map(|after| (before, after))
            }),
    };

    match changed {
        Some((before, after)) if before != after => {
            out_events.push(Event::ObjectProfileChanged {
                object,
                profile: after,
            });
        }
        Some(_) => {}
        None => reject_removal(object, RemovalError::MissingObject, out_events),
    }
}

fn push_cell_edit(
    cell: CellCoord,
    result: Result<(), hamlet_core::CellError>,
    out_events: &mut Vec<Event>,
) {
    match result {
        Ok(()) => out_events.push(Event::CellStateChanged { cell }),
        Err(reason) => {
            log::warn!("cell edit at ({}, {}) rejected: {reason}", cell.x(), cell.y());
            out_events.push(Event::CellEditRejected { cell, reason });
        }
    }
}

fn reject_placement(object: ObjectId, reason: PlacementError, out_events: &mut Vec<Event>) {
    log::warn!("placement of object {} rejected: {reason}", object.get());
    out_events.push(Event::PlacementRejected { object, reason });
}

fn reject_removal(object: ObjectId, reason: RemovalError, out_events: &mut Vec<Event>) {
    log::warn!("request for object {} rejected: {reason}", object.get());
    out_events.push(Event::RemovalRejected { object, reason });
}

fn dedup(cells: Vec<CellCoord>) -> Vec<CellCoord> {
    let mut unique = Vec::with_capacity(cells.len());
    for cell in cells {
        if !unique.contains(&cell) {
            unique.push(cell);
        }
    }
    unique
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use std::collections::BTreeSet;

    use hamlet_core::{
        CellCoord, ClearancePolicy, GridConfig, ObjectId, ObjectProfile, PlacementError,
    };

    use super::World;
    use crate::placement::Validator;

    /// Provides read-only access to the grid's rules and world mapping.
    #[must_use]
    pub fn config(world: &World) -> &GridConfig {
        &world.config
    }

    /// Captures a read-only view of the grid for validators and scanners.
    #[must_use]
    pub fn grid_view(world: &World) -> GridView<'_> {
        GridView { world }
    }

    /// Handle of the object currently pending placement, if any.
    #[must_use]
    pub fn pending(world: &World) -> Option<ObjectId> {
        world.pending_object()
    }

    /// Object occupying the provided cell, if any.
    #[must_use]
    pub fn object_at(world: &World, cell: CellCoord) -> Option<ObjectId> {
        world.cells.occupant(cell)
    }

    /// Captures the placed object with the provided handle.
    #[must_use]
    pub fn object(world: &World, object: ObjectId) -> Option<ObjectSnapshot> {
        world.objects.get(object).map(|state| ObjectSnapshot {
            id: object,
            profile: state.profile,
            cells: state.cells.clone(),
        })
    }

    /// Captures every placed object in ascending handle order.
    #[must_use]
    pub fn objects(world: &World) -> Vec<ObjectSnapshot> {
        grid_view(world).objects().collect()
    }

    /// Reports whether a player building could occupy the provided cells.
    #[must_use]
    pub fn is_valid_placement(world: &World, cells: &[CellCoord]) -> bool {
        grid_view(world).is_valid_placement(cells)
    }

    /// Reports why a player building could not occupy the provided cells.
    pub fn validate_placement(world: &World, cells: &[CellCoord]) -> Result<(), PlacementError> {
        grid_view(world).validate_placement(cells)
    }

    /// Reports whether a player building could occupy the cells once
    /// destructible obstacles on them were cleared.
    #[must_use]
    pub fn can_clear_and_place(world: &World, cells: &[CellCoord]) -> bool {
        grid_view(world).can_clear_and_place(cells)
    }

    /// Immutable representation of a single cell.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct CellSnapshot {
        /// Coordinate of the cell.
        pub cell: CellCoord,
        /// Whether buildings may occupy the cell.
        pub placeable: bool,
        /// Object covering the cell, if any.
        pub occupant: Option<ObjectId>,
    }

    /// Immutable representation of a placed object.
    #[derive(Clone, Debug, PartialEq, Eq)]
    pub struct ObjectSnapshot {
        /// Handle of the object.
        pub id: ObjectId,
        /// Attributes of the object.
        pub profile: ObjectProfile,
        /// Cells occupied by the object.
        pub cells: Vec<CellCoord>,
    }

    /// Read-only view over the cell store and object registry.
    #[derive(Clone, Copy, Debug)]
    pub struct GridView<'a> {
        world: &'a World,
    }

    impl<'a> GridView<'a> {
        fn validator(&self) -> Validator<'a> {
            self.world.validator(ObjectProfile::building())
        }

        /// Number of columns and rows of the grid.
        #[must_use]
        pub fn dimensions(&self) -> (u32, u32) {
            self.world.cells.dimensions()
        }

        /// Rules and world mapping of the grid.
        #[must_use]
        pub fn config(&self) -> &'a GridConfig {
            &self.world.config
        }

        /// Reports whether the coordinate lies inside the grid extents.
        #[must_use]
        pub fn is_within_bounds(&self, cell: CellCoord) -> bool {
            self.world.cells.is_within_bounds(cell)
        }

        /// True iff the cell exists, is placeable and is unoccupied.
        #[must_use]
        pub fn is_cell_valid(&self, cell: CellCoord) -> bool {
            self.world.cells.is_cell_valid(cell)
        }

        /// Captures the state of an existing cell.
        #[must_use]
        pub fn cell(&self, cell: CellCoord) -> Option<CellSnapshot> {
            self.world.cells.get(cell).map(|state| CellSnapshot {
                cell,
                placeable: state.placeable,
                occupant: state.occupant,
            })
        }

        /// Iterates existing cells in ascending coordinate order.
        pub fn cells(&self) -> impl Iterator<Item = CellSnapshot> + 'a {
            self.world.cells.iter().map(|(cell, state)| CellSnapshot {
                cell,
                placeable: state.placeable,
                occupant: state.occupant,
            })
        }

        /// Object occupying the provided cell, if any.
        #[must_use]
        pub fn occupant(&self, cell: CellCoord) -> Option<ObjectId> {
            self.world.cells.occupant(cell)
        }

        /// Iterates placed objects in ascending handle order.
        pub fn objects(&self) -> impl Iterator<Item = ObjectSnapshot> + 'a {
            self.world.objects.iter().map(|(id, state)| ObjectSnapshot {
                id,
                profile: state.profile,
                cells: state.cells.clone(),
            })
        }

        /// Number of player buildings currently on the grid.
        #[must_use]
        pub fn player_building_count(&self) -> usize {
            self.world.objects.player_count()
        }

        /// Handle of the object currently pending placement, if any.
        #[must_use]
        pub fn pending(&self) -> Option<ObjectId> {
            self.world.pending_object()
        }

        /// Reports why a player building could not occupy the provided cells.
        pub fn validate_placement(&self, cells: &[CellCoord]) -> Result<(), PlacementError> {
            self.validator().validate(cells, ClearancePolicy::Strict)
        }

        /// Reports whether a player building could occupy the provided cells.
        #[must_use]
        pub fn is_valid_placement(&self, cells: &[CellCoord]) -> bool {
            self.validate_placement(cells).is_ok()
        }

        /// Reports whether a player building could occupy the cells once
        /// destructible obstacles on them were cleared.
        #[must_use]
        pub fn can_clear_and_place(&self, cells: &[CellCoord]) -> bool {
            self.validator()
                .validate(cells, ClearancePolicy::ClearDestructible)
                .is_ok()
        }

        /// Validity check under an explicit clearance policy.
        #[must_use]
        pub fn check_placement(&self, cells: &[CellCoord], policy: ClearancePolicy) -> bool {
            self.validator().validate(cells, policy).is_ok()
        }

        /// Collects the cells adjacent to player buildings that a new building
        /// could cover under the provided policy.
        pub fn frontier(&self, policy: ClearancePolicy, out: &mut BTreeSet<CellCoord>) {
            self.validator().frontier(policy, out);
        }
    }
}

#[cfg(test)]
mod tests {
    use hamlet_core::{ObjectKind, PlacementError};

    use super::*;

    fn world(width: u32, depth: u32) -> World {
        World::with_layout(GridConfig::default(), &GridLayout::rectangular(width, depth))
    }

    fn cells(coords: &[(i32, i32)]) -> Vec<CellCoord> {
        coords.iter().map(|(x, y)| CellCoord::new(*x, *y)).collect()
    }

    #[test]
    fn configure_grid_clears_objects_and_pending() {
        let mut world = world(3, 3);
        let mut events = Vec::new();
        apply(
            &mut world,
            Command::PlaceObject {
                object: ObjectId::new(1),
                cells: cells(&[(0, 0)]),
            },
            &mut events,
        );
        apply(
            &mut world,
            Command::BeginPlacement {
                object: ObjectId::new(2),
                profile: ObjectProfile::building(),
            },
            &mut events,
        );

        events.clear();
        apply(
            &mut world,
            Command::ConfigureGrid {
                config: GridConfig::default(),
                layout: GridLayout::rectangular(4, 2),
            },
            &mut events,
        );

        assert_eq!(events, vec![Event::GridConfigured { width: 4, depth: 2 }]);
        assert!(query::objects(&world).is_empty());
        assert_eq!(query::pending(&world), None);
        assert_eq!(query::grid_view(&world).dimensions(), (4, 2));
    }

    #[test]
    fn duplicate_cells_are_committed_once() {
        let mut world = world(3, 3);
        let mut events = Vec::new();
        apply(
            &mut world,
            Command::PlaceObject {
                object: ObjectId::new(1),
                cells: cells(&[(1, 1), (1, 1), (1, 2)]),
            },
            &mut events,
        );

        let snapshot = query::object(&world, ObjectId::new(1)).expect("placed");
        assert_eq!(snapshot.cells, cells(&[(1, 1), (1, 2)]));
        assert_eq!(snapshot.profile.kind, ObjectKind::Player);
    }

    #[test]
    fn seeded_obstacles_ignore_connectivity_but_not_occupancy() {
        let mut world = world(4, 4);
        let mut events = Vec::new();
        apply(
            &mut world,
            Command::PlaceObject {
                object: ObjectId::new(1),
                cells: cells(&[(0, 0)]),
            },
            &mut events,
        );
        events.clear();

        apply(
            &mut world,
            Command::SeedObject {
                object: ObjectId::new(9),
                profile: ObjectProfile::obstacle(true),
                cells: cells(&[(3, 3)]),
            },
            &mut events,
        );
        assert!(events.contains(&Event::ObjectPlaced {
            object: ObjectId::new(9),
            kind: ObjectKind::Preplaced,
            cells: cells(&[(3, 3)]),
        }));
        assert!(!events.contains(&Event::PlacementSettled));

        events.clear();
        apply(
            &mut world,
            Command::SeedObject {
                object: ObjectId::new(10),
                profile: ObjectProfile::obstacle(false),
                cells: cells(&[(3, 3)]),
            },
            &mut events,
        );
        assert_eq!(
            events,
            vec![Event::PlacementRejected {
                object: ObjectId::new(10),
                reason: PlacementError::CellOccupied(CellCoord::new(3, 3)),
            }]
        );
    }

    #[test]
    fn flag_transitions_are_one_way_and_reported_once() {
        let mut world = world(3, 3);
        let mut events = Vec::new();
        let object = ObjectId::new(1);
        apply(
            &mut world,
            Command::SeedObject {
                object,
                profile: ObjectProfile::obstacle(true),
                cells: cells(&[(1, 1)]),
            },
            &mut events,
        );

        events.clear();
        apply(&mut world, Command::MarkIndestructible { object }, &mut events);
        apply(&mut world, Command::MarkIndestructible { object }, &mut events);
        assert_eq!(
            events,
            vec![Event::ObjectProfileChanged {
                object,
                profile: ObjectProfile::obstacle(false),
            }]
        );

        events.clear();
        apply(
            &mut world,
            Command::MarkImmovable {
                object: ObjectId::new(5),
            },
            &mut events,
        );
        assert_eq!(
            events,
            vec![Event::RemovalRejected {
                object: ObjectId::new(5),
                reason: RemovalError::MissingObject,
            }]
        );
    }

    #[test]
    fn cell_edits_report_state_changes() {
        let mut world = world(2, 2);
        let mut events = Vec::new();
        apply(
            &mut world,
            Command::RemoveCell {
                cell: CellCoord::new(1, 1),
            },
            &mut events,
        );
        apply(
            &mut world,
            Command::AddCell {
                cell: CellCoord::new(2, 0),
                placeable: true,
            },
            &mut events,
        );

        assert_eq!(
            events,
            vec![
                Event::CellStateChanged {
                    cell: CellCoord::new(1, 1)
                },
                Event::CellEditRejected {
                    cell: CellCoord::new(2, 0),
                    reason: hamlet_core::CellError::OutOfBounds,
                },
            ]
        );
        assert!(query::grid_view(&world).cell(CellCoord::new(1, 1)).is_none());
        assert_eq!(
            query::validate_placement(&world, &cells(&[(1, 1)])),
            Err(PlacementError::CellNotPlaceable(CellCoord::new(1, 1)))
        );
    }
}
