// src/recipe/hooks.rs

//! Lifecycle hooks
//!
//! A recipe implements any subset of the lifecycle hooks and declares which
//! ones through [`Capabilities`]; the kitchen skips the rest. TOML recipes
//! get their hooks from [`DeclarativeHooks`], and Rust code can supply any
//! other [`RecipeHooks`] implementation.

use crate::error::{Error, Result};
use crate::layout::{Folders, Layout};
use crate::package_id::PackageIdInfo;
use crate::publish::{CppInfo, Dependencies};
use crate::recipe::format::Recipe;
use crate::recipe::kitchen::CancelToken;
use crate::recipe::parser::{parse_recipe_file, validate_recipe};
use crate::recipe::reference::RecipeRef;
use crate::settings::EffectiveConfig;
use crate::toolchain::{CopyRoot, Toolchain, ToolchainStep, copy_files, write_dependency_file};
use std::cell::RefCell;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// File name looked up when a recipe path is a directory
pub const RECIPE_FILE_NAME: &str = "recipe.toml";

/// Which lifecycle hooks a recipe implements
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Capabilities {
    pub layout: bool,
    pub configure: bool,
    pub build: bool,
    pub package: bool,
    pub package_id: bool,
    pub package_info: bool,
}

impl Capabilities {
    /// Every hook implemented
    pub fn all() -> Self {
        Self {
            layout: true,
            configure: true,
            build: true,
            package: true,
            package_id: true,
            package_info: true,
        }
    }
}

/// Read-only view handed to the stage hooks of one cook
pub struct HookContext<'a> {
    pub recipe: &'a Recipe,
    pub recipe_dir: Option<&'a Path>,
    pub config: &'a EffectiveConfig,
    pub layout: &'a Layout,
    pub dependencies: &'a Dependencies,
    pub toolchain: &'a dyn Toolchain,
    pub cancel: &'a CancelToken,
    log: &'a RefCell<String>,
}

impl<'a> HookContext<'a> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        recipe: &'a Recipe,
        recipe_dir: Option<&'a Path>,
        config: &'a EffectiveConfig,
        layout: &'a Layout,
        dependencies: &'a Dependencies,
        toolchain: &'a dyn Toolchain,
        cancel: &'a CancelToken,
        log: &'a RefCell<String>,
    ) -> Self {
        Self {
            recipe,
            recipe_dir,
            config,
            layout,
            dependencies,
            toolchain,
            cancel,
            log,
        }
    }

    /// Append text to the cook log
    pub fn log(&self, text: &str) {
        let mut log = self.log.borrow_mut();
        log.push_str(text);
        if !text.ends_with('\n') {
            log.push('\n');
        }
    }

    /// A toolchain step over this context's layout and configuration
    pub fn toolchain_step(&self) -> ToolchainStep<'a> {
        ToolchainStep::new(self.layout, self.config, self.cancel)
    }
}

/// The lifecycle hooks of a recipe
///
/// Every hook defaults to a no-op; only those reported by
/// [`capabilities`](RecipeHooks::capabilities) are called.
pub trait RecipeHooks: Send + Sync {
    fn capabilities(&self) -> Capabilities;

    /// Place folders below the layout roots; must not touch the filesystem
    fn layout(&self, _folders: &mut Folders, _config: &EffectiveConfig) -> Result<()> {
        Ok(())
    }

    fn configure(&self, _ctx: &HookContext<'_>) -> Result<()> {
        Ok(())
    }

    fn build(&self, _ctx: &HookContext<'_>) -> Result<()> {
        Ok(())
    }

    /// Put the artifacts into the package folder
    fn package(&self, _ctx: &HookContext<'_>) -> Result<()> {
        Ok(())
    }

    /// Reduce the configuration that feeds the package id
    fn package_id(&self, _info: &mut PackageIdInfo) -> Result<()> {
        Ok(())
    }

    /// Describe how consumers use the package
    fn package_info(&self, _ctx: &HookContext<'_>, _info: &mut CppInfo) -> Result<()> {
        Ok(())
    }
}

/// Hooks derived from the sections of a TOML recipe
#[derive(Debug, Clone)]
pub struct DeclarativeHooks {
    recipe: Arc<Recipe>,
}

impl DeclarativeHooks {
    pub fn new(recipe: Arc<Recipe>) -> Self {
        Self { recipe }
    }

    fn step<'a>(&self, ctx: &HookContext<'a>) -> ToolchainStep<'a> {
        let mut step = ctx.toolchain_step();
        if let Some(build) = &self.recipe.build {
            step.definitions = build
                .definitions
                .iter()
                .map(|(k, v)| (k.clone(), self.recipe.substitute(v, ctx.config)))
                .collect();
            step.target = build.target.clone();
        }
        step
    }
}

impl RecipeHooks for DeclarativeHooks {
    fn capabilities(&self) -> Capabilities {
        let recipe = &self.recipe;
        Capabilities {
            layout: recipe.layout.is_some(),
            configure: recipe.build.is_some(),
            build: recipe.build.is_some(),
            package: recipe.packaging.is_some(),
            package_id: recipe.package_id.is_some(),
            package_info: recipe.package_info.is_some(),
        }
    }

    fn layout(&self, folders: &mut Folders, config: &EffectiveConfig) -> Result<()> {
        let Some(section) = &self.recipe.layout else {
            return Ok(());
        };

        if section.cmake {
            *folders = Folders::cmake(config);
        }
        if let Some(source) = &section.source {
            folders.source = PathBuf::from(self.recipe.substitute(source, config));
        }
        if let Some(build) = &section.build {
            folders.build = PathBuf::from(self.recipe.substitute(build, config));
            if section.generators.is_none() && !section.cmake {
                folders.generators = folders.build.clone();
            }
        }
        if let Some(generators) = &section.generators {
            folders.generators = PathBuf::from(self.recipe.substitute(generators, config));
        }
        Ok(())
    }

    fn configure(&self, ctx: &HookContext<'_>) -> Result<()> {
        if let Some(build) = &self.recipe.build {
            if build.toolchain != ctx.toolchain.name() {
                warn!(
                    "{}: recipe targets toolchain '{}' but '{}' is in use",
                    self.recipe.reference(),
                    build.toolchain,
                    ctx.toolchain.name()
                );
            }
        }

        let deps_file = write_dependency_file(&ctx.layout.generators_folder, ctx.dependencies)?;
        let mut step = self.step(ctx);
        step.deps_file = Some(deps_file);

        let output = ctx.toolchain.configure(&step)?;
        ctx.log(&output);
        Ok(())
    }

    fn build(&self, ctx: &HookContext<'_>) -> Result<()> {
        let output = ctx.toolchain.build(&self.step(ctx))?;
        ctx.log(&output);
        Ok(())
    }

    fn package(&self, ctx: &HookContext<'_>) -> Result<()> {
        let Some(packaging) = &self.recipe.packaging else {
            return Ok(());
        };

        if packaging.install {
            let output = ctx.toolchain.install(&self.step(ctx))?;
            ctx.log(&output);
        }

        for rule in &packaging.copy {
            let root = match rule.from {
                CopyRoot::Source => &ctx.layout.source_folder,
                CopyRoot::Build => &ctx.layout.build_folder,
                CopyRoot::Package => &ctx.layout.package_folder,
            };
            let src = match &rule.src {
                Some(sub) => root.join(self.recipe.substitute(sub, ctx.config)),
                None => root.clone(),
            };
            let dst = match &rule.dst {
                Some(sub) => ctx.layout.package_folder.join(sub),
                None => ctx.layout.package_folder.clone(),
            };

            let copied = copy_files(&rule.pattern, &src, &dst, rule.keep_path)?;
            if copied.is_empty() && rule.required {
                return Err(Error::PackagingFailure(format!(
                    "required copy rule '{}' matched nothing in {}",
                    rule.pattern,
                    src.display()
                )));
            }
            ctx.log(&format!(
                "copied {} file(s) matching '{}' from {} to {}",
                copied.len(),
                rule.pattern,
                src.display(),
                dst.display()
            ));
        }
        Ok(())
    }

    fn package_id(&self, info: &mut PackageIdInfo) -> Result<()> {
        let Some(section) = &self.recipe.package_id else {
            return Ok(());
        };

        if section.clear {
            info.clear();
        }
        for setting in &section.remove_settings {
            info.remove_setting(setting);
        }
        for option in &section.remove_options {
            info.remove_option(option);
        }
        Ok(())
    }

    fn package_info(&self, _ctx: &HookContext<'_>, info: &mut CppInfo) -> Result<()> {
        if let Some(declared) = &self.recipe.package_info {
            *info = declared.clone();
        }
        Ok(())
    }
}

/// A recipe together with the hooks that drive it
#[derive(Clone)]
pub struct LoadedRecipe {
    pub recipe: Arc<Recipe>,
    pub hooks: Arc<dyn RecipeHooks>,
    /// Directory the recipe was loaded from; exported sources are relative to it
    pub recipe_dir: Option<PathBuf>,
}

impl LoadedRecipe {
    /// Load and validate a recipe file, or the `recipe.toml` inside a directory
    pub fn from_file(path: &Path) -> Result<Self> {
        let file = if path.is_dir() {
            path.join(RECIPE_FILE_NAME)
        } else {
            path.to_path_buf()
        };
        if !file.exists() {
            return Err(Error::NotFound(format!("recipe {}", file.display())));
        }

        let recipe = parse_recipe_file(&file)?;
        for warning in validate_recipe(&recipe)? {
            warn!("{}: {}", recipe.package.name, warning);
        }
        info!("Loaded recipe {} from {}", recipe.reference(), file.display());

        let mut loaded = Self::declarative(recipe);
        loaded.recipe_dir = file.parent().map(Path::to_path_buf);
        Ok(loaded)
    }

    /// Wrap a recipe with its declarative hooks
    pub fn declarative(recipe: Recipe) -> Self {
        let recipe = Arc::new(recipe);
        let hooks: Arc<dyn RecipeHooks> = Arc::new(DeclarativeHooks::new(Arc::clone(&recipe)));
        Self {
            recipe,
            hooks,
            recipe_dir: None,
        }
    }

    /// Wrap a recipe with custom hooks
    pub fn with_hooks(recipe: Recipe, hooks: Arc<dyn RecipeHooks>) -> Self {
        Self {
            recipe: Arc::new(recipe),
            hooks,
            recipe_dir: None,
        }
    }

    pub fn with_recipe_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.recipe_dir = Some(dir.into());
        self
    }

    pub fn reference(&self) -> RecipeRef {
        self.recipe.reference()
    }

    pub fn capabilities(&self) -> Capabilities {
        let caps = self.hooks.capabilities();
        debug!("{} capabilities: {:?}", self.recipe.package.name, caps);
        caps
    }
}

impl fmt::Debug for LoadedRecipe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadedRecipe")
            .field("reference", &self.recipe.reference())
            .field("capabilities", &self.hooks.capabilities())
            .field("recipe_dir", &self.recipe_dir)
            .finish()
    }
}
