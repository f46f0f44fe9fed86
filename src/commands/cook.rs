// src/commands/cook.rs

//! Cook command - build, package and publish recipes

use super::{load_profile, load_recipes, pantry_root};
use crate::cli::ProfileArgs;
use anyhow::{Context, Result, bail};
use pantry::{BuildCache, Kitchen, KitchenConfig, NodeStatus, Orchestrator};
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

/// Kitchen settings given on the command line
#[derive(Debug, Default)]
pub struct CookOptions {
    pub root: Option<PathBuf>,
    pub jobs: Option<usize>,
    pub timeout: Option<u64>,
    pub cmake: Option<PathBuf>,
    pub generator: Option<String>,
    pub no_cache: bool,
}

/// Cook a set of recipes and their requirements
pub fn cmd_cook(
    recipe_paths: &[PathBuf],
    profile_args: &ProfileArgs,
    opts: CookOptions,
) -> Result<()> {
    let recipes = load_recipes(recipe_paths)?;
    let profile = load_profile(profile_args)?;

    let mut config = KitchenConfig::with_root(pantry_root(opts.root));
    if let Some(jobs) = opts.jobs {
        config.jobs = jobs;
    }
    if let Some(secs) = opts.timeout {
        config.timeout = Duration::from_secs(secs);
    }
    if opts.cmake.is_some() {
        config.cmake = opts.cmake;
    }
    config.generator = opts.generator;
    info!("Pantry root: {}", config.root.display());

    let cache_dir = config.cache_dir();
    let kitchen = Kitchen::with_cmake(config).context("Failed to set up the kitchen")?;
    let mut orchestrator = Orchestrator::new(kitchen, profile);
    if !opts.no_cache {
        let cache = BuildCache::open(&cache_dir)
            .with_context(|| format!("Failed to open build cache: {}", cache_dir.display()))?;
        orchestrator = orchestrator.with_cache(cache);
    }

    let plan = orchestrator.plan(recipes).context("Failed to plan the build")?;
    println!("Cooking {} recipe(s)", plan.len());
    let report = orchestrator.execute(&plan);

    for outcome in &report.outcomes {
        let id = outcome.package_id.short();
        match &outcome.status {
            NodeStatus::Built => println!("  [built]   {}:{}", outcome.reference, id),
            NodeStatus::Cached => println!("  [cached]  {}:{}", outcome.reference, id),
            NodeStatus::Skipped(blocker) => {
                println!("  [skipped] {}:{} ({} failed)", outcome.reference, id, blocker)
            }
            NodeStatus::Failed(e) => println!("  [FAILED]  {}", e),
        }
        if let Some(package) = &outcome.package {
            println!("            {}", package.package_folder.display());
        }
    }

    let failed = report.failures().count();
    if failed > 0 {
        bail!("{} recipe(s) failed to cook", failed);
    }
    Ok(())
}
