// src/commands/mod.rs
//! Command handlers for the pantry CLI

mod cache;
mod cook;
mod graph;
mod inspect;
mod package_id;

pub use cache::cmd_cache_clear;
pub use cook::{CookOptions, cmd_cook};
pub use graph::cmd_graph;
pub use inspect::cmd_inspect;
pub use package_id::cmd_package_id;

use crate::cli::ProfileArgs;
use anyhow::{Context, Result};
use pantry::{LoadedRecipe, Profile};
use std::path::PathBuf;

/// Load the selected profile and apply command-line overrides
pub(crate) fn load_profile(args: &ProfileArgs) -> Result<Profile> {
    let mut profile = match &args.profile {
        Some(path) => Profile::load(path)
            .with_context(|| format!("Failed to load profile: {}", path.display()))?,
        None => Profile::detect(),
    };
    profile
        .apply_overrides(&args.settings, &args.options)
        .context("Invalid -s/-o override")?;
    Ok(profile)
}

/// Load every recipe named on the command line
pub(crate) fn load_recipes(paths: &[PathBuf]) -> Result<Vec<LoadedRecipe>> {
    paths
        .iter()
        .map(|path| {
            LoadedRecipe::from_file(path)
                .with_context(|| format!("Failed to load recipe: {}", path.display()))
        })
        .collect()
}

/// Root for exports, layouts and the cache
pub(crate) fn pantry_root(root: Option<PathBuf>) -> PathBuf {
    root.unwrap_or_else(|| pantry::KitchenConfig::default().root)
}
