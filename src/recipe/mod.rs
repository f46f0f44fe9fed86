// src/recipe/mod.rs

//! Recipe system for building native packages
//!
//! A recipe declares a package's metadata, the settings axes and options it
//! is sensitive to, its requirements, and which lifecycle hooks it
//! implements.
//!
//! # Culinary Terminology
//!
//! - **Recipe**: the declarative package description
//! - **Pantry**: the store of exported sources and cooked packages
//! - **Kitchen**: drives recipes through the lifecycle
//! - **Cook**: one recipe under one configuration moving from DECLARED
//!   to PUBLISHED (or FAILED)
//!
//! # Example Recipe
//!
//! ```toml
//! [package]
//! name = "glad"
//! version = "2.0.8"
//! license = "MIT"
//! type = "library"
//! settings = ["os", "arch", "compiler", "build_type"]
//! exports_sources = ["CMakeLists.txt", "src/*", "include/*"]
//!
//! [options]
//! shared = [true, false]
//!
//! [default_options]
//! shared = false
//!
//! [layout]
//! cmake = true
//!
//! [build]
//! toolchain = "cmake"
//!
//! [packaging]
//! install = true
//!
//! [package_info]
//! libs = ["glad"]
//! ```

pub mod cache;
mod format;
pub mod graph;
mod hooks;
pub mod kitchen;
pub mod parser;
mod reference;

pub use cache::BuildCache;
pub use format::{
    BuildSection, LayoutSection, PackageIdSection, PackageSection, PackageType, PackagingSection,
    Recipe,
};
pub use graph::RecipeGraph;
pub use hooks::{
    Capabilities, DeclarativeHooks, HookContext, LoadedRecipe, RECIPE_FILE_NAME, RecipeHooks,
};
pub use kitchen::{CancelToken, Cook, CookResult, Kitchen, KitchenConfig, LifecycleState, Stage};
pub use parser::{parse_recipe, parse_recipe_file, validate_recipe};
pub use reference::RecipeRef;
