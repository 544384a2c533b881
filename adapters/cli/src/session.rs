//! Scripted play sessions that greedily place every building the shop sells.

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{bail, Context, Result};
use hamlet_core::{
    BuildingDefinition, CellCoord, ClearancePolicy, Command, Event, Layout, ObjectId,
    ObjectProfile, Rotation,
};
use hamlet_system_outcome::{GameState, Outcome};
use hamlet_system_reachability::Reachability;
use hamlet_system_shop::{Shop, ShopConfig, ShopError};
use hamlet_world::{apply, query, World};
use serde::Deserialize;

use crate::{layout_files::GridFile, layout_transfer::CityLayoutSnapshot};

/// Handles at or above this value are reserved for seeded obstacles.
const OBSTACLE_ID_BASE: u32 = 10_000;

/// Session description stored as TOML.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct SessionFile {
    /// Grid file, relative to the session file.
    pub(crate) grid: PathBuf,
    /// Money available before the first purchase.
    #[serde(default)]
    pub(crate) balance: u32,
    /// Restarts the shop sequence after the last building.
    #[serde(default)]
    pub(crate) looping: bool,
    /// Seed for shuffling the shop sequence.
    #[serde(default)]
    pub(crate) shuffle_seed: Option<u64>,
    /// Treats destructible obstacles as blocking.
    #[serde(default)]
    pub(crate) strict: bool,
    /// Obstacles seeded before play starts.
    #[serde(default)]
    pub(crate) obstacles: Vec<ObstacleEntry>,
    /// Buildings offered by the shop in authored order.
    pub(crate) buildings: Vec<BuildingEntry>,
}

/// Pre-placed obstacle listed in a session.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct ObstacleEntry {
    /// Cells covered by the obstacle as `[x, y]` pairs.
    pub(crate) cells: Vec<[i32; 2]>,
    /// Whether the obstacle may be cleared to make room.
    #[serde(default)]
    pub(crate) destructible: bool,
}

/// Shop entry listed in a session.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct BuildingEntry {
    /// Display name of the building.
    pub(crate) name: String,
    /// Price of the building.
    #[serde(default)]
    pub(crate) cost: u32,
    /// Shape rows using `#` for occupied and `.` for empty cells.
    pub(crate) rows: Vec<String>,
    /// Layout-local pivot as `[column, row]`.
    #[serde(default)]
    pub(crate) pivot: [i32; 2],
}

impl SessionFile {
    /// Reads a session file and the grid file it points at.
    pub(crate) fn load(path: &Path) -> Result<(Self, GridFile)> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read session file {}", path.display()))?;
        let session = Self::parse(&contents)
            .with_context(|| format!("invalid session file {}", path.display()))?;

        let base = path.parent().unwrap_or_else(|| Path::new("."));
        let grid = GridFile::load(&base.join(&session.grid))?;
        Ok((session, grid))
    }

    pub(crate) fn parse(contents: &str) -> Result<Self> {
        toml::from_str(contents).context("failed to parse session toml")
    }

    fn catalog(&self) -> Result<Vec<BuildingDefinition>> {
        self.buildings
            .iter()
            .map(|entry| {
                let rows: Vec<&str> = entry.rows.iter().map(String::as_str).collect();
                let [x, y] = entry.pivot;
                let layout = Layout::from_rows(&rows, CellCoord::new(x, y))
                    .with_context(|| format!("building `{}` has an invalid shape", entry.name))?;
                Ok(BuildingDefinition {
                    name: entry.name.clone(),
                    cost: entry.cost,
                    layout,
                })
            })
            .collect()
    }

    fn policy(&self) -> ClearancePolicy {
        if self.strict {
            ClearancePolicy::Strict
        } else {
            ClearancePolicy::ClearDestructible
        }
    }
}

/// Building committed by the auto-player.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct PlacedBuilding {
    /// Name of the building.
    pub(crate) name: String,
    /// Rotation the building was placed with.
    pub(crate) rotation: Rotation,
    /// Grid coordinate of the building's pivot.
    pub(crate) anchor: CellCoord,
}

/// Summary of a finished session.
#[derive(Debug)]
pub(crate) struct SessionReport {
    /// Final state of the outcome state machine.
    pub(crate) state: GameState,
    /// Buildings placed in order.
    pub(crate) placed: Vec<PlacedBuilding>,
    /// Money left at the end.
    pub(crate) balance: u32,
    /// Purchase failure that ended the session early.
    pub(crate) stopped: Option<ShopError>,
    /// Transfer string of the final city.
    pub(crate) transfer: String,
}

/// Applies commands in order, failing on the first rejection.
pub(crate) fn apply_checked(
    world: &mut World,
    commands: impl IntoIterator<Item = Command>,
) -> Result<Vec<Event>> {
    let mut events = Vec::new();
    for command in commands {
        apply(world, command, &mut events);
        for event in &events {
            match event {
                Event::PlacementRejected { object, reason } => {
                    bail!("object {} could not be placed: {reason}", object.get())
                }
                Event::RemovalRejected { object, reason } => {
                    bail!("object {} could not be removed: {reason}", object.get())
                }
                Event::CellEditRejected { cell, reason } => {
                    bail!("cell ({}, {}) could not be edited: {reason}", cell.x(), cell.y())
                }
                _ => {}
            }
        }
    }
    Ok(events)
}

/// Builds the world described by the session and plays it to completion.
pub(crate) fn play(session: &SessionFile, grid: &GridFile) -> Result<SessionReport> {
    let mut world = World::new();
    let _ = apply_checked(&mut world, grid.to_commands()?)?;

    let obstacles = session.obstacles.iter().zip(OBSTACLE_ID_BASE..).map(|(entry, id)| {
        Command::SeedObject {
            object: ObjectId::new(id),
            profile: ObjectProfile::obstacle(entry.destructible),
            cells: entry
                .cells
                .iter()
                .map(|[x, y]| CellCoord::new(*x, *y))
                .collect(),
        }
    });
    let _ = apply_checked(&mut world, obstacles).context("failed to seed obstacles")?;

    let mut shop = Shop::new(
        session.catalog()?,
        ShopConfig {
            looping: session.looping,
            shuffle_seed: session.shuffle_seed,
        },
    );
    let policy = session.policy();
    let mut outcome = Outcome::new(policy);
    let mut scanner = Reachability::new(policy);
    let mut balance = session.balance;
    let mut placed = Vec::new();
    let mut stopped = None;
    let mut next_id = 1;

    let mut state = outcome.evaluate(&query::grid_view(&world), shop.status());
    while !state.is_terminal() {
        let purchase = match shop.purchase(balance) {
            Ok(purchase) => purchase,
            Err(error) => {
                log::warn!("session stopped: {error}");
                stopped = Some(error);
                break;
            }
        };
        balance = purchase.remaining_balance;
        let definition = purchase.definition;

        let candidate = scanner
            .find_placement(&query::grid_view(&world), &definition.layout)
            .with_context(|| format!("no room left for {}", definition.name))?;

        let mut clearing = Vec::new();
        for cell in &candidate.cells {
            if let Some(occupant) = query::object_at(&world, *cell) {
                if !clearing.contains(&occupant) {
                    clearing.push(occupant);
                }
            }
        }
        let _ = apply_checked(
            &mut world,
            clearing
                .into_iter()
                .map(|object| Command::DestroyObject { object }),
        )?;

        let object = ObjectId::new(next_id);
        next_id += 1;
        let events = apply_checked(
            &mut world,
            [
                Command::BeginPlacement {
                    object,
                    profile: ObjectProfile::building(),
                },
                Command::PlaceObject {
                    object,
                    cells: candidate.cells,
                },
            ],
        )?;
        log::info!(
            "placed {} at ({}, {}) rotated {} degrees",
            definition.name,
            candidate.anchor.x(),
            candidate.anchor.y(),
            candidate.rotation.degrees()
        );
        placed.push(PlacedBuilding {
            name: definition.name,
            rotation: candidate.rotation,
            anchor: candidate.anchor,
        });

        if let Some(next) = outcome.handle(&events, &query::grid_view(&world), shop.status()) {
            state = next;
        }
    }

    let transfer = CityLayoutSnapshot::capture(&world).encode()?;
    Ok(SessionReport {
        state,
        placed,
        balance,
        stopped,
        transfer,
    })
}
