// src/cli/mod.rs
//! CLI definitions for pantry
//!
//! This module contains the command-line interface definitions using clap.
//! The command implementations are in the `commands` module.
//!
//! - `inspect` - Parse and validate a recipe
//! - `package-id` - Compute the package id of a recipe under a profile
//! - `graph` - Show the build order of a set of recipes
//! - `cook` - Build, package and publish a set of recipes

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "pantry")]
#[command(author = "Pantry Contributors")]
#[command(version)]
#[command(about = "Recipe-driven native package builder", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Profile selection shared by every command that resolves configurations
#[derive(Args, Debug, Clone, Default)]
pub struct ProfileArgs {
    /// Profile file (TOML with [settings] and [options]); host settings if omitted
    #[arg(short, long)]
    pub profile: Option<PathBuf>,

    /// Setting override, e.g. -s build_type=Debug
    #[arg(short = 's', long = "setting", value_name = "KEY=VALUE")]
    pub settings: Vec<String>,

    /// Option override, e.g. -o glad/*:shared=True
    #[arg(short = 'o', long = "option", value_name = "KEY=VALUE")]
    pub options: Vec<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Parse and validate a recipe
    Inspect {
        /// Recipe file or directory containing recipe.toml
        recipe: PathBuf,

        /// Print the parsed recipe as JSON
        #[arg(long)]
        json: bool,
    },

    /// Compute the package id of a recipe
    PackageId {
        /// Recipe file or directory containing recipe.toml
        recipe: PathBuf,

        #[command(flatten)]
        profile: ProfileArgs,

        /// Also print the canonical text the id is hashed from
        #[arg(long)]
        verbose: bool,
    },

    /// Show the build order of a set of recipes
    Graph {
        /// Recipe files or directories
        #[arg(required = true)]
        recipes: Vec<PathBuf>,

        /// Group recipes into levels that can be cooked in parallel
        #[arg(long)]
        levels: bool,

        /// List every recipe that must be rebuilt when this one changes
        #[arg(long, value_name = "NAME", conflicts_with = "levels")]
        affected: Option<String>,
    },

    /// Build, package and publish a set of recipes
    Cook {
        /// Recipe files or directories
        #[arg(required = true)]
        recipes: Vec<PathBuf>,

        #[command(flatten)]
        profile: ProfileArgs,

        /// Pantry root for exports, layouts and the cache
        #[arg(long)]
        root: Option<PathBuf>,

        /// Parallel jobs (default: available CPUs)
        #[arg(short, long)]
        jobs: Option<usize>,

        /// Timeout for a single toolchain step, in seconds
        #[arg(long)]
        timeout: Option<u64>,

        /// cmake executable (default: found on PATH)
        #[arg(long)]
        cmake: Option<PathBuf>,

        /// CMake generator, e.g. Ninja
        #[arg(short = 'G', long)]
        generator: Option<String>,

        /// Neither read nor write the build cache
        #[arg(long)]
        no_cache: bool,
    },

    /// Remove every record from the build cache
    CacheClear {
        /// Pantry root for exports, layouts and the cache
        #[arg(long)]
        root: Option<PathBuf>,
    },
}
