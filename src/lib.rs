// src/lib.rs

//! Pantry: recipe-driven native package builder
//!
//! A recipe declares a component's settings, options, source layout,
//! build steps and packaging steps. Pantry resolves a set of recipes into a
//! dependency graph, computes a package id from each effective
//! configuration, drives every recipe through its lifecycle and exposes
//! the packaged headers, libraries and flags to the recipes that require
//! it.
//!
//! # Architecture
//!
//! - Recipes: TOML descriptors with declarative or custom lifecycle hooks
//! - Package ids: SHA-256 of the canonical effective configuration
//! - Layouts: one directory tree per (reference, package id)
//! - Kitchen: `layout` → `configure` → `build` → `package` → `package_info`
//! - Registry: write-once store of published packages
//! - Orchestrator: level-parallel cooking with a local build cache

mod error;
pub mod hash;
pub mod layout;
pub mod orchestrator;
pub mod package_id;
pub mod publish;
pub mod recipe;
pub mod settings;
pub mod toolchain;

pub use error::{Error, Result};
pub use layout::{Folders, Layout, LayoutResolver};
pub use orchestrator::{BuildPlan, BuildReport, NodeOutcome, NodeStatus, Orchestrator, PlannedNode};
pub use package_id::{
    PackageId, PackageIdInfo, PackageIdentity, compute_package_id, compute_package_id_with_deps,
};
pub use publish::{CppInfo, Dependencies, LinkKind, PackageRegistry, PublishedPackage};
pub use recipe::{
    BuildCache, CancelToken, Cook, CookResult, Kitchen, KitchenConfig, LifecycleState,
    LoadedRecipe, PackageType, Recipe, RecipeHooks, RecipeRef, Stage,
};
pub use settings::{EffectiveConfig, OptionValue, Profile, SettingsSchema};
pub use toolchain::{CMakeToolchain, Toolchain};
