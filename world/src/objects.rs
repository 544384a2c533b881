//! Registry of objects currently occupying grid cells.

use std::collections::BTreeMap;

use hamlet_core::{CellCoord, ObjectId, ObjectProfile};

/// Snapshot of an object stored inside the world.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct ObjectState {
    /// Attributes controlling connectivity, moving and destruction.
    pub(crate) profile: ObjectProfile,
    /// Cells occupied by the object, in placement order.
    pub(crate) cells: Vec<CellCoord>,
}

/// Registry mapping handles to the cells they occupy.
#[derive(Debug, Default)]
pub(crate) struct ObjectRegistry {
    entries: BTreeMap<ObjectId, ObjectState>,
    player_count: usize,
}

impl ObjectRegistry {
    /// Creates an empty registry.
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn get(&self, object: ObjectId) -> Option<&ObjectState> {
        self.entries.get(&object)
    }

    pub(crate) fn contains(&self, object: ObjectId) -> bool {
        self.entries.contains_key(&object)
    }

    /// Records an object, replacing any previous entry under the same handle.
    pub(crate) fn insert(&mut self, object: ObjectId, state: ObjectState) {
        if state.profile.is_player() {
            self.player_count += 1;
        }
        if let Some(previous) = self.entries.insert(object, state) {
            if previous.profile.is_player() {
                self.player_count -= 1;
            }
        }
    }

    pub(crate) fn remove(&mut self, object: ObjectId) -> Option<ObjectState> {
        let removed = self.entries.remove(&object)?;
        if removed.profile.is_player() {
            self.player_count -= 1;
        }
        Some(removed)
    }

    /// Rewrites an object's profile; the kind never changes after placement.
    pub(crate) fn update_profile(
        &mut self,
        object: ObjectId,
        update: impl FnOnce(&mut ObjectProfile),
    ) -> Option<ObjectProfile> {
        let state = self.entries.get_mut(&object)?;
        let kind = state.profile.kind;
        update(&mut state.profile);
        state.profile.kind = kind;
        Some(state.profile)
    }

    /// Number of placed player buildings.
    pub(crate) fn player_count(&self) -> usize {
        self.player_count
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = (ObjectId, &ObjectState)> {
        self.entries.iter().map(|(id, state)| (*id, state))
    }
}
