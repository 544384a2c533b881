#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pure system answering whether a building shape fits anywhere on the grid.
//!
//! Before the first player building, or on grids that do not require
//! connectivity, every in-bounds coordinate is tried as an anchor. Otherwise
//! only anchors that put a footprint cell onto the frontier are tried, since
//! any other anchor would fail the connectivity rule anyway.

use std::collections::BTreeSet;

use hamlet_core::{compute_footprint, CellCoord, ClearancePolicy, Footprint, Layout, Rotation};
use hamlet_world::query::GridView;

/// Witness placement discovered by a scan.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlacementCandidate {
    /// Rotation applied to the layout.
    pub rotation: Rotation,
    /// Grid coordinate the layout pivot lands on.
    pub anchor: CellCoord,
    /// Cells the building would occupy.
    pub cells: Vec<CellCoord>,
}

/// Reachability scanner reusing its scratch buffers between scans.
#[derive(Debug, Default)]
pub struct Reachability {
    policy: ClearancePolicy,
    frontier: BTreeSet<CellCoord>,
    anchors: BTreeSet<CellCoord>,
    cells: Vec<CellCoord>,
}

impl Reachability {
    /// Creates a scanner that judges occupied cells with the provided policy.
    #[must_use]
    pub fn new(policy: ClearancePolicy) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }

    /// Policy used when a scanned cell is occupied.
    #[must_use]
    pub const fn policy(&self) -> ClearancePolicy {
        self.policy
    }

    /// Reports whether the layout fits somewhere under any rotation.
    pub fn can_place_somewhere(&mut self, grid: &GridView<'_>, layout: &Layout) -> bool {
        self.find_placement(grid, layout).is_some()
    }

    /// Finds the first valid placement in rotation-then-anchor order.
    pub fn find_placement(
        &mut self,
        grid: &GridView<'_>,
        layout: &Layout,
    ) -> Option<PlacementCandidate> {
        let whole_grid =
            grid.player_building_count() == 0 || !grid.config().require_connectivity;
        if !whole_grid {
            grid.frontier(self.policy, &mut self.frontier);
            if self.frontier.is_empty() {
                log::debug!("no free cell borders the existing buildings");
                return None;
            }
        }

        for rotation in Rotation::ALL {
            let footprint = compute_footprint(layout, rotation);
            self.collect_anchors(grid, &footprint, whole_grid);

            for &anchor in &self.anchors {
                self.cells.clear();
                self.cells.extend(footprint.cells_at(anchor));
                if grid.check_placement(&self.cells, self.policy) {
                    return Some(PlacementCandidate {
                        rotation,
                        anchor,
                        cells: self.cells.clone(),
                    });
                }
            }
        }

        None
    }

    fn collect_anchors(&mut self, grid: &GridView<'_>, footprint: &Footprint, whole_grid: bool) {
        self.anchors.clear();
        if whole_grid {
            let (width, depth) = grid.dimensions();
            let (Ok(width), Ok(depth)) = (i32::try_from(width), i32::try_from(depth)) else {
                return;
            };
            for y in 0..depth {
                for x in 0..width {
                    let _ = self.anchors.insert(CellCoord::new(x, y));
                }
            }
            return;
        }

        for &cell in &self.frontier {
            for offset in footprint.offsets() {
                let _ = self.anchors.insert(cell.delta(offset));
            }
        }
    }
}
