// src/package_id.rs

//! Package identity computation
//!
//! A package id is the SHA-256 of a canonical text rendering of the
//! effective configuration, after the recipe's reduction rules have been
//! applied:
//!
//! ```text
//! [settings]
//! build_type=Release
//! compiler=gcc
//! [options]
//! shared=false
//! [requires]
//! glad/2.0.8@local:1d6171fd8af66ac3...
//! ```
//!
//! Keys are sorted within each section, so the id does not depend on
//! declaration order. Requirements carry the package id of the dependency
//! when it is known, so a dependency built under another configuration
//! gives its consumers new ids as well.

use crate::error::{Error, Result};
use crate::hash::sha256_hex;
use crate::recipe::{LoadedRecipe, RecipeRef};
use crate::settings::{EffectiveConfig, OptionValue};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use tracing::debug;

/// Opaque package identity (64 lowercase hex characters)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PackageId(String);

impl PackageId {
    /// Hash a canonical configuration text
    pub fn from_canonical(canonical: &str) -> Self {
        Self(sha256_hex(canonical.as_bytes()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First 16 characters, used in directory names and logs
    pub fn short(&self) -> &str {
        &self.0[..16.min(self.0.len())]
    }
}

impl fmt::Display for PackageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The configuration that feeds the package id
///
/// The `package_id` hook edits this before it is hashed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackageIdInfo {
    pub settings: BTreeMap<String, String>,
    pub options: BTreeMap<String, OptionValue>,
    pub requires: BTreeSet<String>,
}

impl PackageIdInfo {
    pub fn from_config(
        config: &EffectiveConfig,
        requires: impl IntoIterator<Item = String>,
    ) -> Self {
        Self {
            settings: config.settings.clone(),
            options: config.options.clone(),
            requires: requires.into_iter().collect(),
        }
    }

    /// Remove everything: one id for every configuration
    pub fn clear(&mut self) {
        self.clear_settings();
        self.clear_options();
        self.clear_requires();
    }

    pub fn clear_settings(&mut self) {
        self.settings.clear();
    }

    pub fn clear_options(&mut self) {
        self.options.clear();
    }

    pub fn clear_requires(&mut self) {
        self.requires.clear();
    }

    /// Remove a setting axis together with its sub-settings
    pub fn remove_setting(&mut self, axis: &str) {
        let prefix = format!("{}.", axis);
        self.settings
            .retain(|key, _| key != axis && !key.starts_with(&prefix));
    }

    pub fn remove_option(&mut self, option: &str) {
        self.options.remove(option);
    }

    /// Canonical text rendering
    pub fn canonical(&self) -> String {
        let mut out = String::from("[settings]\n");
        for (key, value) in &self.settings {
            out.push_str(&format!("{}={}\n", key, value));
        }
        out.push_str("[options]\n");
        for (key, value) in &self.options {
            out.push_str(&format!("{}={}\n", key, value));
        }
        out.push_str("[requires]\n");
        for requirement in &self.requires {
            out.push_str(requirement);
            out.push('\n');
        }
        out
    }

    pub fn package_id(&self) -> PackageId {
        PackageId::from_canonical(&self.canonical())
    }
}

/// A computed identity together with the text it was derived from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageIdentity {
    pub id: PackageId,
    pub info: PackageIdInfo,
}

/// Compute the package id of a recipe under a configuration
///
/// Requirements are hashed by reference only. Graph planning uses
/// [`compute_package_id_with_deps`] once the dependencies' ids are known.
pub fn compute_package_id(
    recipe: &LoadedRecipe,
    config: &EffectiveConfig,
) -> Result<PackageIdentity> {
    compute_package_id_with_deps(recipe, config, &BTreeMap::new())
}

/// Compute the package id of a recipe whose dependencies are resolved
///
/// `dependencies` maps a requirement name to the reference and package id
/// of the recipe providing it. Each such requirement is hashed as
/// `<reference>:<package id>`; requirements missing from the map fall back
/// to the reference as written.
pub fn compute_package_id_with_deps(
    recipe: &LoadedRecipe,
    config: &EffectiveConfig,
    dependencies: &BTreeMap<String, (RecipeRef, PackageId)>,
) -> Result<PackageIdentity> {
    let reference = recipe.reference();

    let missing = config.missing_settings(&recipe.recipe);
    if !missing.is_empty() {
        return Err(Error::ConfigurationError(format!(
            "{}: no value for setting(s) {}",
            reference,
            missing.join(", ")
        )));
    }

    let requires = recipe.recipe.package.requires.iter().map(|required| {
        match dependencies.get(&required.name) {
            Some((provided, id)) => format!("{}:{}", provided, id),
            None => required.to_string(),
        }
    });
    let mut info = PackageIdInfo::from_config(config, requires);

    if recipe.recipe.is_header_only() {
        info.clear();
    }

    if recipe.capabilities().package_id {
        recipe.hooks.package_id(&mut info).map_err(|e| match e {
            Error::IdentityComputationError(_) => e,
            other => Error::IdentityComputationError(format!("{}: {}", reference, other)),
        })?;
    }

    let id = info.package_id();
    debug!("{} -> {}", reference, id);
    Ok(PackageIdentity { id, info })
}
