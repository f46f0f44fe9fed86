// src/recipe/kitchen/mod.rs

//! Kitchen: drives recipes through the package lifecycle
//!
//! The Kitchen owns the layout resolver, the package registry and the
//! toolchain. Each [`Cook`] runs one recipe under one configuration:
//! - `layout`: resolve folders, export and copy sources
//! - `configure` / `build`: run the toolchain
//! - `package`: fill the package folder and record its manifest
//! - `package_info`: describe the package to consumers
//! - publish into the registry
//!
//! The first failing stage moves the cook to `FAILED`; nothing is
//! published for that identity.

mod cancel;
mod config;
mod cook;
mod state;

pub use cancel::CancelToken;
pub use config::{CookResult, KitchenConfig};
pub use cook::{Cook, PACKAGE_INFO_FILE, PACKAGE_MANIFEST_FILE};
pub use state::{LifecycleState, Stage};

use crate::error::{Error, Result};
use crate::layout::LayoutResolver;
use crate::package_id::PackageIdentity;
use crate::publish::{Dependencies, PackageRegistry};
use crate::recipe::hooks::LoadedRecipe;
use crate::settings::EffectiveConfig;
use crate::toolchain::Toolchain;
use std::sync::Arc;
use tracing::{debug, info};

/// The Kitchen: where recipes are cooked
pub struct Kitchen {
    pub(crate) config: KitchenConfig,
    resolver: LayoutResolver,
    registry: Arc<PackageRegistry>,
    toolchain: Arc<dyn Toolchain>,
    cancel: CancelToken,
}

impl Kitchen {
    /// Create a new Kitchen with the given configuration and toolchain
    pub fn new(config: KitchenConfig, toolchain: Arc<dyn Toolchain>) -> Self {
        let resolver = LayoutResolver::new(&config.root);
        Self {
            config,
            resolver,
            registry: Arc::new(PackageRegistry::new()),
            toolchain,
            cancel: CancelToken::new(),
        }
    }

    /// Create a Kitchen that builds with cmake
    pub fn with_cmake(config: KitchenConfig) -> Result<Self> {
        let cmake = config.cmake_toolchain()?;
        Ok(Self::new(config, Arc::new(cmake)))
    }

    /// Share a registry with other kitchens
    pub fn with_registry(mut self, registry: Arc<PackageRegistry>) -> Self {
        self.registry = registry;
        self
    }

    pub fn config(&self) -> &KitchenConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<PackageRegistry> {
        &self.registry
    }

    pub fn layout_resolver(&self) -> &LayoutResolver {
        &self.resolver
    }

    pub fn toolchain(&self) -> &dyn Toolchain {
        self.toolchain.as_ref()
    }

    /// Token that cancels every cook of this kitchen
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Cook a recipe under a resolved configuration and identity
    ///
    /// Holds the identity's lock for the whole cook.
    pub fn cook(
        &self,
        recipe: &LoadedRecipe,
        config: &EffectiveConfig,
        identity: &PackageIdentity,
        dependencies: &Dependencies,
    ) -> Result<CookResult> {
        let reference = recipe.reference();
        if self.registry.get(&reference, &identity.id).is_some() {
            return Err(Error::AlreadyPublished {
                reference: reference.to_string(),
                package_id: identity.id.to_string(),
            });
        }

        let lock = self.resolver.lock(&reference, &identity.id)?;
        debug!("Locked {}", lock.path().display());

        info!("Cooking {}:{}", reference, identity.id.short());
        let result = Cook::new(self, recipe, config, identity, dependencies).run()?;
        info!(
            "Cooked {}:{} -> {}",
            reference,
            identity.id.short(),
            result.package.package_folder.display()
        );
        Ok(result)
    }
}
