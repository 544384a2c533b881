#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Win/lose state machine driven by settled placements.

use hamlet_core::{ClearancePolicy, Event, ShopStatus};
use hamlet_system_reachability::Reachability;
use hamlet_world::query::GridView;

/// Progress of a play session.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum GameState {
    /// The player still has buildings to place.
    #[default]
    Playing,
    /// Every building of the sequence was placed.
    Won,
    /// The upcoming building fits nowhere on the grid.
    Lost,
}

impl GameState {
    /// Reports whether the state can no longer change.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::Playing)
    }
}

/// State machine deciding the session outcome after each settled placement.
#[derive(Debug, Default)]
pub struct Outcome {
    state: GameState,
    scanner: Reachability,
}

impl Outcome {
    /// Creates a state machine whose scans use the provided clearance policy.
    #[must_use]
    pub fn new(policy: ClearancePolicy) -> Self {
        Self {
            state: GameState::Playing,
            scanner: Reachability::new(policy),
        }
    }

    /// Current state of the session.
    #[must_use]
    pub const fn state(&self) -> GameState {
        self.state
    }

    /// Consumes world events and re-evaluates the session once a placement
    /// has settled.
    ///
    /// Returns the new state when a transition happened.
    pub fn handle(
        &mut self,
        events: &[Event],
        grid: &GridView<'_>,
        shop: ShopStatus<'_>,
    ) -> Option<GameState> {
        if self.state.is_terminal() {
            return None;
        }

        let settled = events
            .iter()
            .any(|event| matches!(event, Event::PlacementSettled));
        if !settled {
            return None;
        }

        let previous = self.state;
        let next = self.evaluate(grid, shop);
        (next != previous).then_some(next)
    }

    /// Checks the win and lose conditions against the current grid.
    ///
    /// Terminal states are returned unchanged.
    pub fn evaluate(&mut self, grid: &GridView<'_>, shop: ShopStatus<'_>) -> GameState {
        if self.state.is_terminal() || grid.pending().is_some() {
            return self.state;
        }

        if shop.exhausted {
            self.state = GameState::Won;
            log::info!("every building was placed, the session is won");
        } else if let Some(upcoming) = shop.upcoming {
            if !self.scanner.can_place_somewhere(grid, &upcoming.layout) {
                self.state = GameState::Lost;
                log::info!("{} fits nowhere, the session is lost", upcoming.name);
            }
        }

        self.state
    }
}

#[cfg(test)]
mod tests {
    use hamlet_core::{
        BuildingDefinition, CellCoord, Command, GridConfig, GridLayout, Layout, ObjectId,
        ObjectProfile,
    };
    use hamlet_world::{apply, query, World};

    use super::*;

    fn hut() -> BuildingDefinition {
        BuildingDefinition {
            name: "hut".to_owned(),
            cost: 0,
            layout: Layout::single_cell(),
        }
    }

    #[test]
    fn events_without_settlement_are_ignored() {
        let world = World::new();
        let mut outcome = Outcome::default();
        let status = ShopStatus {
            upcoming: None,
            exhausted: true,
        };

        assert_eq!(outcome.handle(&[], &query::grid_view(&world), status), None);
        assert_eq!(outcome.state(), GameState::Playing);
    }

    #[test]
    fn pending_objects_defer_the_verdict() {
        let mut world = World::new();
        let mut events = Vec::new();
        apply(
            &mut world,
            Command::BeginPlacement {
                object: ObjectId::new(1),
                profile: ObjectProfile::building(),
            },
            &mut events,
        );

        let mut outcome = Outcome::default();
        let status = ShopStatus {
            upcoming: None,
            exhausted: true,
        };
        assert_eq!(
            outcome.evaluate(&query::grid_view(&world), status),
            GameState::Playing
        );
    }

    #[test]
    fn terminal_states_stick() {
        let mut world = World::with_layout(GridConfig::default(), &GridLayout::rectangular(1, 1));
        let mut outcome = Outcome::new(ClearancePolicy::Strict);
        let definition = hut();
        let mut events = Vec::new();
        apply(
            &mut world,
            Command::PlaceObject {
                object: ObjectId::new(1),
                cells: vec![CellCoord::new(0, 0)],
            },
            &mut events,
        );

        let status = ShopStatus {
            upcoming: Some(&definition),
            exhausted: false,
        };
        assert_eq!(
            outcome.handle(&events, &query::grid_view(&world), status),
            Some(GameState::Lost)
        );

        let won = ShopStatus {
            upcoming: None,
            exhausted: true,
        };
        assert_eq!(outcome.handle(&events, &query::grid_view(&world), won), None);
        assert_eq!(outcome.evaluate(&query::grid_view(&world), won), GameState::Lost);
        assert!(outcome.state().is_terminal());
    }
}
