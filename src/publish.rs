// src/publish.rs

//! Consumption publishing
//!
//! After a package is built, its `package_info` hook fills a [`CppInfo`]
//! describing how to consume it. The registry stores each identity once
//! and hands out shared read-only records to dependents.

use crate::error::{Error, Result};
use crate::package_id::PackageId;
use crate::recipe::{PackageType, RecipeRef};
use crate::settings::EffectiveConfig;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use strum_macros::{Display, EnumString};
use tracing::info;

/// Build information exposed to consumers
///
/// Directory entries are relative to the package folder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CppInfo {
    /// Libraries in link order
    pub libs: Vec<String>,
    pub includedirs: Vec<String>,
    pub libdirs: Vec<String>,
    pub bindirs: Vec<String>,
    pub defines: Vec<String>,
    pub cflags: Vec<String>,
    pub cxxflags: Vec<String>,
    pub sharedlinkflags: Vec<String>,
    pub exelinkflags: Vec<String>,
    pub system_libs: Vec<String>,
    /// References this package's consumers also need
    pub requires: Vec<String>,
}

impl Default for CppInfo {
    fn default() -> Self {
        Self {
            libs: Vec::new(),
            includedirs: vec!["include".to_string()],
            libdirs: vec!["lib".to_string()],
            bindirs: vec!["bin".to_string()],
            defines: Vec::new(),
            cflags: Vec::new(),
            cxxflags: Vec::new(),
            sharedlinkflags: Vec::new(),
            exelinkflags: Vec::new(),
            system_libs: Vec::new(),
            requires: Vec::new(),
        }
    }
}

/// How consumers link against a package
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum LinkKind {
    Static,
    Shared,
    HeaderOnly,
    Application,
}

impl LinkKind {
    pub fn resolve(package_type: PackageType, config: &EffectiveConfig) -> Self {
        match package_type {
            PackageType::HeaderLibrary => Self::HeaderOnly,
            PackageType::Application => Self::Application,
            PackageType::Library if config.is_shared() => Self::Shared,
            PackageType::Library => Self::Static,
        }
    }
}

/// A packaged, consumable build result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublishedPackage {
    pub reference: RecipeRef,
    pub package_id: PackageId,
    pub package_folder: PathBuf,
    pub link_kind: LinkKind,
    pub cpp_info: CppInfo,
}

impl PublishedPackage {
    /// Absolute include directories
    pub fn include_paths(&self) -> Vec<PathBuf> {
        absolute(&self.package_folder, &self.cpp_info.includedirs)
    }

    /// Absolute library directories
    pub fn lib_paths(&self) -> Vec<PathBuf> {
        absolute(&self.package_folder, &self.cpp_info.libdirs)
    }

    /// Absolute binary directories
    pub fn bin_paths(&self) -> Vec<PathBuf> {
        absolute(&self.package_folder, &self.cpp_info.bindirs)
    }
}

fn absolute(root: &Path, dirs: &[String]) -> Vec<PathBuf> {
    dirs.iter().map(|d| root.join(d)).collect()
}

type RegistryKey = (String, PackageId);

/// Write-once store of published packages
#[derive(Debug, Default)]
pub struct PackageRegistry {
    packages: RwLock<HashMap<RegistryKey, Arc<PublishedPackage>>>,
}

impl PackageRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish a package; each identity can be published only once
    pub fn publish(&self, package: PublishedPackage) -> Result<Arc<PublishedPackage>> {
        let key = (package.reference.to_string(), package.package_id.clone());
        let mut packages = self.packages.write();

        if packages.contains_key(&key) {
            return Err(Error::AlreadyPublished {
                reference: key.0,
                package_id: key.1.to_string(),
            });
        }

        info!(
            "Published {}:{} ({})",
            package.reference,
            package.package_id.short(),
            package.link_kind
        );
        let package = Arc::new(package);
        packages.insert(key, Arc::clone(&package));
        Ok(package)
    }

    pub fn get(
        &self,
        reference: &RecipeRef,
        package_id: &PackageId,
    ) -> Option<Arc<PublishedPackage>> {
        self.packages
            .read()
            .get(&(reference.to_string(), package_id.clone()))
            .cloned()
    }

    /// All published packages, sorted by reference
    pub fn list(&self) -> Vec<Arc<PublishedPackage>> {
        let mut all: Vec<_> = self.packages.read().values().cloned().collect();
        all.sort_by(|a, b| {
            a.reference
                .cmp(&b.reference)
                .then_with(|| a.package_id.cmp(&b.package_id))
        });
        all
    }

    pub fn len(&self) -> usize {
        self.packages.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.read().is_empty()
    }
}

/// Published information of everything a recipe requires
#[derive(Debug, Clone, Default)]
pub struct Dependencies {
    /// Direct requirements in declaration order
    pub direct: Vec<Arc<PublishedPackage>>,
    /// Indirect requirements, each after all of its consumers
    pub transitive: Vec<Arc<PublishedPackage>>,
}

impl Dependencies {
    /// Look up a dependency by recipe name
    pub fn get(&self, name: &str) -> Option<&Arc<PublishedPackage>> {
        self.iter().find(|p| p.reference.name == name)
    }

    /// All dependencies in link order
    pub fn iter(&self) -> impl Iterator<Item = &Arc<PublishedPackage>> {
        self.direct.iter().chain(self.transitive.iter())
    }

    pub fn is_empty(&self) -> bool {
        self.direct.is_empty() && self.transitive.is_empty()
    }

    /// Merge the build information of the whole closure
    ///
    /// Libraries are concatenated in link order. Paths and flags keep
    /// their first occurrence.
    pub fn aggregate(&self) -> AggregatedInfo {
        let mut agg = AggregatedInfo::default();
        for package in self.iter() {
            let info = &package.cpp_info;
            extend_unique(&mut agg.include_paths, package.include_paths());
            extend_unique(&mut agg.lib_paths, package.lib_paths());
            extend_unique(&mut agg.bin_paths, package.bin_paths());
            agg.libs.extend(info.libs.iter().cloned());
            extend_unique(&mut agg.system_libs, info.system_libs.iter().cloned());
            extend_unique(&mut agg.defines, info.defines.iter().cloned());
            extend_unique(&mut agg.cflags, info.cflags.iter().cloned());
            extend_unique(&mut agg.cxxflags, info.cxxflags.iter().cloned());
            extend_unique(&mut agg.sharedlinkflags, info.sharedlinkflags.iter().cloned());
            extend_unique(&mut agg.exelinkflags, info.exelinkflags.iter().cloned());
        }
        agg
    }
}

fn extend_unique<T: PartialEq>(into: &mut Vec<T>, items: impl IntoIterator<Item = T>) {
    for item in items {
        if !into.contains(&item) {
            into.push(item);
        }
    }
}

/// Build information of a dependency closure with absolute paths
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AggregatedInfo {
    pub include_paths: Vec<PathBuf>,
    pub lib_paths: Vec<PathBuf>,
    pub bin_paths: Vec<PathBuf>,
    pub libs: Vec<String>,
    pub system_libs: Vec<String>,
    pub defines: Vec<String>,
    pub cflags: Vec<String>,
    pub cxxflags: Vec<String>,
    pub sharedlinkflags: Vec<String>,
    pub exelinkflags: Vec<String>,
}
