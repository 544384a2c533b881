#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter for checking and playing Hamlet city layouts.

mod layout_files;
mod layout_transfer;
mod logger;
mod session;

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use hamlet_core::{compute_footprint, ClearancePolicy};
use hamlet_system_outcome::GameState;
use hamlet_system_reachability::Reachability;
use hamlet_world::{query, World};

use crate::{
    layout_files::{GridFile, ShapeFile},
    layout_transfer::CityLayoutSnapshot,
    session::SessionFile,
};

/// Checks building shapes against city grids and plays scripted sessions.
#[derive(Parser)]
#[command(name = "hamlet")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Raises log verbosity; repeat for more detail.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
    #[command(subcommand)]
    command: CliCommand,
}

#[derive(Subcommand)]
enum CliCommand {
    /// Report whether a shape still fits somewhere on a grid.
    Scan {
        /// Grid layout JSON file.
        grid: PathBuf,
        /// Shape JSON file.
        shape: PathBuf,
        /// City transfer string whose objects are placed before scanning.
        #[arg(long)]
        city: Option<String>,
        /// Treat destructible obstacles as blocking.
        #[arg(long)]
        strict: bool,
    },
    /// Auto-play a session file until it is won, lost or out of money.
    Play {
        /// Session TOML file.
        session: PathBuf,
    },
    /// Decode a city transfer string.
    Inspect {
        /// Transfer string to decode.
        layout: String,
    },
}

/// Entry point for the Hamlet command-line interface.
fn main() -> Result<()> {
    let cli = Cli::parse();
    logger::init(cli.verbose).context("failed to install logger")?;

    match cli.command {
        CliCommand::Scan {
            grid,
            shape,
            city,
            strict,
        } => run_scan(&grid, &shape, city.as_deref(), strict),
        CliCommand::Play { session } => run_play(&session),
        CliCommand::Inspect { layout } => run_inspect(&layout),
    }
}

fn run_scan(grid: &Path, shape: &Path, city: Option<&str>, strict: bool) -> Result<()> {
    let grid = GridFile::load(grid)?;
    let mut world = World::new();
    let _ = session::apply_checked(&mut world, grid.to_commands()?)?;

    if let Some(city) = city {
        let snapshot = CityLayoutSnapshot::decode(city).context("invalid city string")?;
        let dimensions = query::grid_view(&world).dimensions();
        if (snapshot.width, snapshot.depth) != dimensions {
            bail!(
                "city is {}x{} but the grid is {}x{}",
                snapshot.width,
                snapshot.depth,
                dimensions.0,
                dimensions.1
            );
        }
        let _ = session::apply_checked(&mut world, snapshot.seed_commands())
            .context("city does not fit the grid")?;
    }

    let (layout, rotation) = ShapeFile::load(shape)?.to_layout()?;
    let footprint = compute_footprint(&layout, rotation);
    if let Some(bounds) = footprint.bounds() {
        let (width, height) = bounds.size();
        let (center_x, center_y) = bounds.center();
        println!(
            "shape at {} degrees covers {} cells in a {width}x{height} box centred at ({center_x}, {center_y})",
            rotation.degrees(),
            footprint.len()
        );
    }

    let policy = if strict {
        ClearancePolicy::Strict
    } else {
        ClearancePolicy::ClearDestructible
    };
    let mut scanner = Reachability::new(policy);
    match scanner.find_placement(&query::grid_view(&world), &layout) {
        Some(candidate) => {
            let (x, z) = query::config(&world).cell_center(candidate.anchor);
            println!(
                "fits: rotate {} degrees, pivot on ({}, {}) at world ({x}, {z})",
                candidate.rotation.degrees(),
                candidate.anchor.x(),
                candidate.anchor.y()
            );
        }
        None => println!("no placement available"),
    }
    Ok(())
}

fn run_play(path: &Path) -> Result<()> {
    let (session, grid) = SessionFile::load(path)?;
    let report = session::play(&session, &grid)?;

    for (turn, building) in report.placed.iter().enumerate() {
        println!(
            "{:>3}. {} at ({}, {}) rotated {} degrees",
            turn + 1,
            building.name,
            building.anchor.x(),
            building.anchor.y(),
            building.rotation.degrees()
        );
    }
    if let Some(reason) = &report.stopped {
        println!("stopped: {reason}");
    }

    let verdict = match report.state {
        GameState::Playing => "unfinished",
        GameState::Won => "won",
        GameState::Lost => "lost",
    };
    println!("outcome: {verdict}, balance left: {}", report.balance);
    println!("{}", report.transfer);
    Ok(())
}

fn run_inspect(layout: &str) -> Result<()> {
    let snapshot = CityLayoutSnapshot::decode(layout).context("invalid city string")?;
    println!("grid: {}x{}", snapshot.width, snapshot.depth);
    for object in &snapshot.objects {
        let cells: Vec<String> = object
            .cells
            .iter()
            .map(|cell| format!("({}, {})", cell.x(), cell.y()))
            .collect();
        println!(
            "object {} [{:?}, movable: {}, destructible: {}]: {}",
            object.object.get(),
            object.profile.kind,
            object.profile.movable,
            object.profile.destructible,
            cells.join(" ")
        );
    }
    Ok(())
}
