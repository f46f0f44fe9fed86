// src/recipe/kitchen/cook.rs

//! Cook: one recipe under one configuration, driven through the lifecycle

use super::Kitchen;
use super::config::CookResult;
use super::state::{LifecycleState, Stage};
use crate::error::{Error, Result};
use crate::hash::sha256_file;
use crate::layout::{Folders, Layout, LayoutLock};
use crate::package_id::PackageIdentity;
use crate::publish::{CppInfo, Dependencies, LinkKind, PublishedPackage};
use crate::recipe::hooks::{Capabilities, HookContext, LoadedRecipe};
use crate::settings::EffectiveConfig;
use std::cell::RefCell;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Identity record written into every package folder
pub const PACKAGE_INFO_FILE: &str = "pantryinfo.txt";

/// SHA-256 manifest of the package folder
pub const PACKAGE_MANIFEST_FILE: &str = "pantrymanifest.txt";

/// A single cook operation
pub struct Cook<'a> {
    kitchen: &'a Kitchen,
    recipe: &'a LoadedRecipe,
    config: &'a EffectiveConfig,
    identity: &'a PackageIdentity,
    dependencies: &'a Dependencies,
    capabilities: Capabilities,
    state: LifecycleState,
    history: Vec<LifecycleState>,
    layout: Option<Layout>,
    /// Shared exports lock, held while building straight from the exports
    exports_lock: Option<LayoutLock>,
    cpp_info: CppInfo,
    /// Build log accumulator
    log: RefCell<String>,
}

impl<'a> Cook<'a> {
    pub(super) fn new(
        kitchen: &'a Kitchen,
        recipe: &'a LoadedRecipe,
        config: &'a EffectiveConfig,
        identity: &'a PackageIdentity,
        dependencies: &'a Dependencies,
    ) -> Self {
        Self {
            kitchen,
            recipe,
            config,
            identity,
            dependencies,
            capabilities: recipe.capabilities(),
            state: LifecycleState::Declared,
            history: vec![LifecycleState::Declared],
            layout: None,
            exports_lock: None,
            cpp_info: CppInfo::default(),
            log: RefCell::new(String::new()),
        }
    }

    /// Current lifecycle state
    pub fn state(&self) -> LifecycleState {
        self.state
    }

    /// Run every stage in order, stopping at the first failure
    pub(super) fn run(mut self) -> Result<CookResult> {
        self.guard(Stage::Layout, Self::lay_out)?;
        self.guard(Stage::Configure, Self::configure)?;
        self.guard(Stage::Build, Self::build)?;
        self.guard(Stage::Package, Self::package)?;
        self.guard(Stage::PackageInfo, Self::package_info)?;
        let package = self.guard(Stage::Publish, Self::publish)?;
        if let Some(lock) = self.exports_lock.take() {
            debug!("Releasing {}", lock.path().display());
        }

        let layout = self.layout.take().ok_or_else(|| {
            Error::IoError("cook finished without a layout".to_string())
        })?;

        Ok(CookResult {
            reference: self.recipe.reference(),
            package_id: self.identity.id.clone(),
            layout,
            package,
            history: self.history,
            log: self.log.into_inner(),
        })
    }

    /// Run one stage, recording the transition or the failure
    fn guard<T>(&mut self, stage: Stage, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        let outcome = if self.kitchen.cancel.is_cancelled() {
            Err(Error::Cancelled)
        } else {
            info!(
                "{}:{} {}",
                self.recipe.reference(),
                self.identity.id.short(),
                stage
            );
            self.log_line(&format!("=== {} ===", stage));
            f(self)
        };

        match outcome {
            Ok(value) => {
                if let Some(next) = stage.completes() {
                    self.transition(next);
                }
                Ok(value)
            }
            Err(e) => {
                warn!(
                    "{}:{} failed during {}: {}",
                    self.recipe.reference(),
                    self.identity.id.short(),
                    stage,
                    e
                );
                self.log_line(&format!("FAILED: {}", e));
                self.transition(LifecycleState::Failed);
                Err(Error::Lifecycle {
                    reference: self.recipe.reference().to_string(),
                    package_id: self.identity.id.to_string(),
                    stage,
                    source: Box::new(e),
                    history: self.history.clone(),
                })
            }
        }
    }

    fn transition(&mut self, next: LifecycleState) {
        debug!("{} -> {}", self.state, next);
        self.state = next;
        self.history.push(next);
    }

    fn layout(&self) -> Result<&Layout> {
        self.layout
            .as_ref()
            .ok_or_else(|| Error::IoError("layout stage has not run".to_string()))
    }

    fn context<'c>(&'c self, layout: &'c Layout) -> HookContext<'c> {
        HookContext::new(
            &self.recipe.recipe,
            self.recipe.recipe_dir.as_deref(),
            self.config,
            layout,
            self.dependencies,
            self.kitchen.toolchain.as_ref(),
            &self.kitchen.cancel,
            &self.log,
        )
    }

    /// Stage 1: resolve folders, export and copy sources
    fn lay_out(&mut self) -> Result<()> {
        let recipe = &self.recipe.recipe;
        let resolver = &self.kitchen.resolver;

        let mut folders = Folders::default();
        if self.capabilities.layout {
            self.recipe.hooks.layout(&mut folders, self.config)?;
        }

        let exported = resolver.export_sources(recipe, self.recipe.recipe_dir.as_deref())?;
        let layout = resolver.resolve(recipe, &self.identity.id, &folders)?;
        let copied = resolver.copy_sources(recipe, &layout)?;
        if !layout.copy_source {
            self.exports_lock = Some(resolver.lock_exports(&recipe.reference(), false)?);
        }

        self.log_line(&format!(
            "exported {} file(s), copied {} into {}",
            exported,
            copied,
            layout.source_root.display()
        ));
        self.layout = Some(layout);
        Ok(())
    }

    /// Stage 2: configure the native build
    fn configure(&mut self) -> Result<()> {
        if !self.capabilities.configure {
            return Ok(());
        }
        let layout = self.layout()?;
        self.recipe.hooks.configure(&self.context(layout))
    }

    /// Stage 3: build
    fn build(&mut self) -> Result<()> {
        if !self.capabilities.build {
            return Ok(());
        }
        let layout = self.layout()?;
        self.recipe.hooks.build(&self.context(layout))
    }

    /// Stage 4: package into a fresh package folder and record it
    fn package(&mut self) -> Result<()> {
        let layout = self.layout()?;
        let package_folder = &layout.package_folder;

        // A package folder only ever holds the output of one complete cook
        if package_folder.exists() {
            fs::remove_dir_all(package_folder).map_err(|e| Error::layout(package_folder, e))?;
        }
        fs::create_dir_all(package_folder).map_err(|e| Error::layout(package_folder, e))?;

        if self.capabilities.package {
            self.recipe.hooks.package(&self.context(layout))?;
        }

        if !has_files(package_folder) {
            return Err(Error::PackagingFailure(format!(
                "package folder {} is empty",
                package_folder.display()
            )));
        }

        write_package_info(package_folder, &self.recipe.reference().to_string(), self.identity)?;
        let files = write_manifest(package_folder)?;
        self.log_line(&format!("packaged {} file(s)", files));
        Ok(())
    }

    /// Stage 5: collect consumer build information
    fn package_info(&mut self) -> Result<()> {
        let mut info = CppInfo::default();
        if self.capabilities.package_info {
            let layout = self.layout()?;
            self.recipe.hooks.package_info(&self.context(layout), &mut info)?;
        }
        self.cpp_info = info;
        Ok(())
    }

    /// Stage 6: publish to the registry
    fn publish(&mut self) -> Result<Arc<PublishedPackage>> {
        let layout = self.layout()?;
        let package = PublishedPackage {
            reference: self.recipe.reference(),
            package_id: self.identity.id.clone(),
            package_folder: layout.package_folder.clone(),
            cpp_info: self.cpp_info.clone(),
            link_kind: LinkKind::resolve(self.recipe.recipe.package.package_type, self.config),
        };
        self.kitchen.registry.publish(package)
    }

    fn log_line(&self, line: &str) {
        let mut log = self.log.borrow_mut();
        log.push_str(line);
        log.push('\n');
    }
}

fn has_files(dir: &Path) -> bool {
    WalkDir::new(dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .any(|e| e.file_type().is_file())
}

fn write_package_info(folder: &Path, reference: &str, identity: &PackageIdentity) -> Result<()> {
    let content = format!(
        "[reference]\n{}\n[package_id]\n{}\n{}",
        reference,
        identity.id,
        identity.info.canonical()
    );
    let path = folder.join(PACKAGE_INFO_FILE);
    fs::write(&path, content)
        .map_err(|e| Error::IoError(format!("Failed to write {}: {}", path.display(), e)))
}

/// Write `<sha256>  <relative path>` for every file; returns the file count
fn write_manifest(folder: &Path) -> Result<usize> {
    let mut lines = Vec::new();
    for entry in WalkDir::new(folder).sort_by_file_name() {
        let entry = entry
            .map_err(|e| Error::IoError(format!("Failed to walk {}: {}", folder.display(), e)))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let Ok(relative) = entry.path().strip_prefix(folder) else {
            continue;
        };
        if relative == Path::new(PACKAGE_MANIFEST_FILE) {
            continue;
        }
        let digest = sha256_file(entry.path())?;
        lines.push(format!(
            "{}  {}\n",
            digest,
            relative.to_string_lossy().replace('\\', "/")
        ));
    }

    let path = folder.join(PACKAGE_MANIFEST_FILE);
    fs::write(&path, lines.concat())
        .map_err(|e| Error::IoError(format!("Failed to write {}: {}", path.display(), e)))?;
    Ok(lines.len())
}
