// src/commands/cache.rs

//! Cache command - manage the local build cache

use super::pantry_root;
use anyhow::{Context, Result};
use pantry::BuildCache;
use std::path::PathBuf;

pub fn cmd_cache_clear(root: Option<PathBuf>) -> Result<()> {
    let cache_dir = pantry_root(root).join("cache");
    let cache = BuildCache::open(&cache_dir)
        .with_context(|| format!("Failed to open build cache: {}", cache_dir.display()))?;
    let removed = cache.clear().context("Failed to clear the build cache")?;
    println!("Removed {} cache record(s) from {}", removed, cache_dir.display());
    Ok(())
}
