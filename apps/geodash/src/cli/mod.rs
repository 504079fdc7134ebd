//! # Geodash CLI Module
//!
//! This module implements the CLI interface for Geodash.
//!
//! ## Available Commands
//!
//! - `run` - Build the layers for a map file and print them
//! - `snap` - Find the nearest suggestion to a cursor position
//! - `generators` - List the registered generators and their settings
//! - `init` - Write a starter `geodash.toml`

mod commands;

use crate::config::PipelineOverrides;
use clap::{Parser, Subcommand, ValueEnum};
use geodash_core::{GeodashError, ViewMode};
use std::path::PathBuf;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// Geodash - derived geometry suggestions for timed 2D maps
///
/// Runs the layered generator pipeline over the objects of a map and reports
/// the points, lines and circles it derives.
#[derive(Parser, Debug)]
#[command(name = "geodash")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress banner output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to the configuration file
    #[arg(short = 'c', long, global = true, default_value = "geodash.toml")]
    pub config: PathBuf,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json_mode: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Which layers to print.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ViewArg {
    /// Only the deepest layer
    #[default]
    LastLayer,
    /// Every layer, inputs included
    AllLayers,
}

impl From<ViewArg> for ViewMode {
    fn from(view: ViewArg) -> Self {
        match view {
            ViewArg::LastLayer => ViewMode::LastLayer,
            ViewArg::AllLayers => ViewMode::AllLayers,
        }
    }
}

/// Pipeline values that override the config file.
#[derive(clap::Args, Debug, Clone, Copy, Default)]
pub struct PipelineArgs {
    /// Node budget per layer
    #[arg(short = 'm', long)]
    pub max_objects: Option<usize>,

    /// Merge tolerance
    #[arg(short = 't', long)]
    pub tolerance: Option<f64>,

    /// Number of generated layers
    #[arg(short = 'l', long)]
    pub levels: Option<usize>,
}

impl From<PipelineArgs> for PipelineOverrides {
    fn from(args: PipelineArgs) -> Self {
        Self {
            max_objects: args.max_objects,
            acceptable_difference: args.tolerance,
            inception_levels: args.levels,
        }
    }
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build every layer for a map file and print the result
    Run {
        /// Path to the map elements file (JSON array)
        #[arg(short, long)]
        file: PathBuf,

        /// Layers to print
        #[arg(long, value_enum, default_value_t = ViewArg::LastLayer)]
        view: ViewArg,

        #[command(flatten)]
        pipeline: PipelineArgs,
    },

    /// Find the suggestion nearest to a position
    Snap {
        /// Path to the map elements file (JSON array)
        #[arg(short, long)]
        file: PathBuf,

        /// Cursor x coordinate
        #[arg(short, long, allow_negative_numbers = true)]
        x: f64,

        /// Cursor y coordinate
        #[arg(short, long, allow_negative_numbers = true)]
        y: f64,

        /// Maximum snapping distance
        #[arg(short = 'd', long, default_value = "10")]
        max_distance: f64,

        /// Layers to snap to
        #[arg(long, value_enum, default_value_t = ViewArg::LastLayer)]
        view: ViewArg,

        #[command(flatten)]
        pipeline: PipelineArgs,
    },

    /// List the generators and their effective settings
    Generators,

    /// Write a starter configuration file
    Init {
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Execute the CLI with parsed arguments.
pub fn execute(cli: Cli) -> Result<(), GeodashError> {
    let json_mode = cli.json_mode;

    match cli.command {
        Some(Commands::Run {
            file,
            view,
            pipeline,
        }) => cmd_run(&cli.config, pipeline.into(), json_mode, &file, view.into()),
        Some(Commands::Snap {
            file,
            x,
            y,
            max_distance,
            view,
            pipeline,
        }) => cmd_snap(
            &cli.config,
            pipeline.into(),
            json_mode,
            &file,
            SnapQuery {
                x,
                y,
                max_distance,
                view: view.into(),
            },
        ),
        Some(Commands::Init { force }) => cmd_init(&cli.config, force),
        Some(Commands::Generators) | None => cmd_generators(&cli.config, json_mode),
    }
}
