// src/commands/package_id.rs

//! Package-id command - fingerprint a recipe under a profile

use super::load_profile;
use crate::cli::ProfileArgs;
use anyhow::{Context, Result};
use pantry::{EffectiveConfig, LoadedRecipe, SettingsSchema, compute_package_id};
use std::collections::BTreeMap;
use std::path::Path;

/// Print the package id of a single recipe, treated as a root
///
/// Requirements are hashed by reference only. `cook` plans the whole graph
/// and folds each dependency's own id into its consumers.
pub fn cmd_package_id(
    recipe_path: &Path,
    profile_args: &ProfileArgs,
    verbose: bool,
) -> Result<()> {
    let loaded = LoadedRecipe::from_file(recipe_path)
        .with_context(|| format!("Failed to load recipe: {}", recipe_path.display()))?;
    let profile = load_profile(profile_args)?;

    let config = EffectiveConfig::resolve(
        &loaded.recipe,
        &profile,
        &BTreeMap::new(),
        true,
        &SettingsSchema::default(),
    )
    .with_context(|| format!("Failed to resolve configuration of {}", loaded.reference()))?;

    let identity = compute_package_id(&loaded, &config)
        .with_context(|| format!("Failed to compute package id of {}", loaded.reference()))?;

    println!("{}:{}", loaded.reference(), identity.id);
    if verbose {
        print!("{}", identity.info.canonical());
    }
    Ok(())
}
