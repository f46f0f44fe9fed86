// src/recipe/kitchen/config.rs

//! Configuration types for the Kitchen

use super::state::LifecycleState;
use crate::error::{Error, Result};
use crate::layout::Layout;
use crate::package_id::PackageId;
use crate::publish::PublishedPackage;
use crate::recipe::RecipeRef;
use crate::toolchain::CMakeToolchain;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Configuration for the Kitchen
#[derive(Debug, Clone)]
pub struct KitchenConfig {
    /// Pantry root holding exports, layouts and the build cache
    pub root: PathBuf,
    /// Timeout for a single toolchain step
    pub timeout: Duration,
    /// Parallel jobs passed to the toolchain and used for graph levels
    pub jobs: usize,
    /// cmake executable; discovered on PATH by default
    pub cmake: Option<PathBuf>,
    /// CMake generator (`-G`), if not the platform default
    pub generator: Option<String>,
}

impl Default for KitchenConfig {
    fn default() -> Self {
        let jobs = std::thread::available_parallelism()
            .map(|p| p.get())
            .unwrap_or(4);

        let root = dirs::cache_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join("pantry");

        Self {
            root,
            timeout: Duration::from_secs(3600), // 1 hour
            jobs,
            cmake: which::which("cmake").ok(),
            generator: None,
        }
    }
}

impl KitchenConfig {
    /// Default configuration rooted somewhere else
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Self::default()
        }
    }

    /// Directory of the build cache under the root
    pub fn cache_dir(&self) -> PathBuf {
        self.root.join("cache")
    }

    /// Build the CMake toolchain this configuration describes
    pub fn cmake_toolchain(&self) -> Result<CMakeToolchain> {
        let program = self.cmake.clone().ok_or_else(|| {
            Error::NotFound("cmake executable not found on PATH".to_string())
        })?;

        let mut toolchain = CMakeToolchain::new(program)
            .with_jobs(self.jobs)
            .with_timeout(self.timeout);
        if let Some(generator) = &self.generator {
            toolchain = toolchain.with_generator(generator.clone());
        }
        Ok(toolchain)
    }
}

/// Result of cooking a recipe
#[derive(Debug)]
pub struct CookResult {
    pub reference: RecipeRef,
    pub package_id: PackageId,
    /// Directories the cook used
    pub layout: Layout,
    /// The published package
    pub package: Arc<PublishedPackage>,
    /// Every state the cook passed through, in order
    pub history: Vec<LifecycleState>,
    /// Cook log
    pub log: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kitchen_config_default() {
        let config = KitchenConfig::default();
        assert!(config.jobs > 0);
        assert_eq!(config.timeout, Duration::from_secs(3600));
        assert!(config.root.ends_with("pantry"));
        assert!(config.generator.is_none());
    }

    #[test]
    fn test_kitchen_config_with_root() {
        let config = KitchenConfig::with_root("/tmp/pantry-test");
        assert_eq!(config.root, PathBuf::from("/tmp/pantry-test"));
        assert_eq!(config.cache_dir(), PathBuf::from("/tmp/pantry-test/cache"));
    }

    #[test]
    fn test_missing_cmake() {
        let config = KitchenConfig {
            cmake: None,
            ..KitchenConfig::default()
        };
        assert!(matches!(config.cmake_toolchain(), Err(Error::NotFound(_))));

        let config = KitchenConfig {
            cmake: Some(PathBuf::from("/usr/bin/cmake")),
            generator: Some("Ninja".to_string()),
            ..KitchenConfig::default()
        };
        let cmake = config.cmake_toolchain().unwrap();
        assert_eq!(cmake.program(), std::path::Path::new("/usr/bin/cmake"));
    }
}
