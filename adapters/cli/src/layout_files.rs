//! JSON documents describing grids and building shapes.

use std::{fs, path::Path};

use anyhow::{bail, ensure, Context, Result};
use hamlet_core::{CellCoord, Command, GridConfig, GridLayout, GridOrigin, Layout, Rotation};
use serde::Deserialize;

/// Grid description stored on disk.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct GridFile {
    /// Number of cell columns.
    pub(crate) width: u32,
    /// Number of cell rows.
    pub(crate) depth: u32,
    /// Edge length of a single cell in world units.
    #[serde(default = "default_cell_size")]
    pub(crate) cell_size: f32,
    /// World-space position of the grid's minimum corner.
    #[serde(default)]
    pub(crate) origin: GridOrigin,
    /// Whether placements must touch an existing building.
    #[serde(default = "default_connectivity")]
    pub(crate) require_connectivity: bool,
    /// Row-major `0`/`1` placeable flags; omitted means every cell accepts buildings.
    #[serde(default)]
    pub(crate) placeable: Option<Vec<u8>>,
    /// Cells missing from the grid altogether.
    #[serde(default)]
    pub(crate) holes: Vec<[i32; 2]>,
}

fn default_cell_size() -> f32 {
    1.0
}

fn default_connectivity() -> bool {
    true
}

impl GridFile {
    /// Reads and parses a grid file.
    pub(crate) fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read grid file {}", path.display()))?;
        Self::parse(&contents).with_context(|| format!("invalid grid file {}", path.display()))
    }

    pub(crate) fn parse(contents: &str) -> Result<Self> {
        serde_json::from_str(contents).context("failed to parse grid json")
    }

    /// Commands that configure a world to match the file.
    pub(crate) fn to_commands(&self) -> Result<Vec<Command>> {
        ensure!(
            self.cell_size.is_finite() && self.cell_size > 0.0,
            "cell size {} must be positive",
            self.cell_size
        );

        let layout = match &self.placeable {
            None => GridLayout::rectangular(self.width, self.depth),
            Some(flags) => GridLayout::new(self.width, self.depth, parse_flags(flags)?)?,
        };
        let config = GridConfig {
            cell_size: self.cell_size,
            origin: self.origin,
            require_connectivity: self.require_connectivity,
        };

        let mut commands = vec![Command::ConfigureGrid { config, layout }];
        commands.extend(self.holes.iter().map(|[x, y]| Command::RemoveCell {
            cell: CellCoord::new(*x, *y),
        }));
        Ok(commands)
    }
}

/// Building shape stored on disk.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct ShapeFile {
    /// Number of matrix columns.
    pub(crate) width: u32,
    /// Number of matrix rows.
    pub(crate) height: u32,
    /// Layout-local pivot cell as `[column, row]`.
    pub(crate) pivot: [i32; 2],
    /// Quarter turns applied to the authored orientation.
    #[serde(default)]
    pub(crate) rotation: u8,
    /// Row-major `0`/`1` occupancy flags.
    pub(crate) cells: Vec<u8>,
}

impl ShapeFile {
    /// Reads and parses a shape file.
    pub(crate) fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read shape file {}", path.display()))?;
        Self::parse(&contents).with_context(|| format!("invalid shape file {}", path.display()))
    }

    pub(crate) fn parse(contents: &str) -> Result<Self> {
        serde_json::from_str(contents).context("failed to parse shape json")
    }

    /// Validated layout together with the authored rotation.
    pub(crate) fn to_layout(&self) -> Result<(Layout, Rotation)> {
        let [x, y] = self.pivot;
        let layout = Layout::new(
            self.width,
            self.height,
            parse_flags(&self.cells)?,
            CellCoord::new(x, y),
        )?;
        let rotation = Rotation::from_quarter_turns(self.rotation)?;
        Ok((layout, rotation))
    }
}

fn parse_flags(flags: &[u8]) -> Result<Vec<bool>> {
    flags
        .iter()
        .enumerate()
        .map(|(index, flag)| match flag {
            0 => Ok(false),
            1 => Ok(true),
            other => bail!("flag {other} at index {index} must be 0 or 1"),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grid_defaults_fill_in_missing_fields() {
        let file = GridFile::parse(r#"{ "width": 3, "depth": 2 }"#).expect("grid parses");
        let commands = file.to_commands().expect("valid grid");
        assert_eq!(
            commands,
            vec![Command::ConfigureGrid {
                config: GridConfig::default(),
                layout: GridLayout::rectangular(3, 2),
            }]
        );
    }

    #[test]
    fn grid_flags_and_holes_become_commands() {
        let file = GridFile::parse(
            r#"{
                "width": 2,
                "depth": 2,
                "cell_size": 2.5,
                "origin": { "x": -1.0, "z": 4.0 },
                "require_connectivity": false,
                "placeable": [1, 0, 1, 1],
                "holes": [[1, 1]]
            }"#,
        )
        .expect("grid parses");
        let commands = file.to_commands().expect("valid grid");

        assert_eq!(commands.len(), 2);
        let Command::ConfigureGrid { config, layout } = &commands[0] else {
            panic!("first command should configure the grid");
        };
        assert!(!config.require_connectivity);
        assert_eq!(config.origin, GridOrigin { x: -1.0, z: 4.0 });
        assert_eq!(layout.is_placeable(CellCoord::new(1, 0)), Some(false));
        assert_eq!(
            commands[1],
            Command::RemoveCell {
                cell: CellCoord::new(1, 1)
            }
        );
    }

    #[test]
    fn malformed_grids_are_rejected() {
        let wrong_length = GridFile::parse(r#"{ "width": 2, "depth": 2, "placeable": [1, 1] }"#)
            .expect("grid parses");
        assert!(wrong_length.to_commands().is_err());

        let bad_flag = GridFile::parse(r#"{ "width": 1, "depth": 1, "placeable": [2] }"#)
            .expect("grid parses");
        assert!(bad_flag.to_commands().is_err());

        assert!(GridFile::parse(r#"{ "width": 1, "depth": 1, "colour": "red" }"#).is_err());
    }

    #[test]
    fn shape_file_builds_layout_and_rotation() {
        let file = ShapeFile::parse(
            r#"{ "width": 2, "height": 2, "pivot": [0, 1], "rotation": 3, "cells": [1, 0, 1, 1] }"#,
        )
        .expect("shape parses");
        let (layout, rotation) = file.to_layout().expect("valid shape");
        assert_eq!(layout.occupied_count(), 3);
        assert_eq!(layout.pivot(), CellCoord::new(0, 1));
        assert_eq!(rotation, Rotation::Deg270);
    }

    #[test]
    fn shape_file_rejects_bad_rotation_and_empty_cells() {
        let rotated = ShapeFile::parse(
            r#"{ "width": 1, "height": 1, "pivot": [0, 0], "rotation": 4, "cells": [1] }"#,
        )
        .expect("shape parses");
        assert!(rotated.to_layout().is_err());

        let empty = ShapeFile::parse(
            r#"{ "width": 2, "height": 1, "pivot": [0, 0], "cells": [0, 0] }"#,
        )
        .expect("shape parses");
        assert!(empty.to_layout().is_err());
    }
}
