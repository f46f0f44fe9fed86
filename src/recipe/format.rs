// src/recipe/format.rs

//! Recipe file format definitions
//!
//! Recipes are TOML files that declare a package's metadata, its settings
//! axes and options, and which lifecycle stages it implements. A section
//! that is absent means the matching hook is absent.

use crate::error::Result;
use crate::publish::CppInfo;
use crate::recipe::reference::RecipeRef;
use crate::settings::EffectiveConfig;
use crate::settings::options::{OptionValue, ScopedOption};
use crate::toolchain::CopyRule;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use strum_macros::{AsRefStr, Display, EnumString};

/// A complete recipe declaration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recipe {
    /// Package metadata
    pub package: PackageSection,

    /// Option name -> allowed values (`"ANY"` accepts anything)
    #[serde(default)]
    pub options: BTreeMap<String, Vec<OptionValue>>,

    /// Option defaults; `pattern:option` keys target dependencies
    #[serde(default)]
    pub default_options: BTreeMap<String, OptionValue>,

    /// Folder layout (the `layout` hook)
    #[serde(default)]
    pub layout: Option<LayoutSection>,

    /// Toolchain configure + build (the `configure` and `build` hooks)
    #[serde(default)]
    pub build: Option<BuildSection>,

    /// Install and copy rules (the `package` hook)
    #[serde(default)]
    pub packaging: Option<PackagingSection>,

    /// Identity reduction rules (the `package_id` hook)
    #[serde(default)]
    pub package_id: Option<PackageIdSection>,

    /// Consumer-facing build information (the `package_info` hook)
    #[serde(default)]
    pub package_info: Option<CppInfo>,

    /// Variables for substitution
    #[serde(default)]
    pub variables: BTreeMap<String, String>,
}

impl Recipe {
    /// The reference this recipe provides
    pub fn reference(&self) -> RecipeRef {
        RecipeRef {
            name: self.package.name.clone(),
            version: self.package.version.clone(),
            user: self.package.user.clone(),
            channel: self.package.channel.clone(),
        }
    }

    /// Check if this recipe only ships headers
    pub fn is_header_only(&self) -> bool {
        self.package.package_type == PackageType::HeaderLibrary
    }

    /// Default value for one of this recipe's own options
    pub fn own_default(&self, option: &str) -> Option<&OptionValue> {
        self.default_options.get(option)
    }

    /// Defaults that target dependencies (`pattern:option` keys)
    pub fn scoped_defaults(&self) -> Result<Vec<ScopedOption>> {
        let mut scoped = Vec::new();
        for (key, value) in &self.default_options {
            if let Some(option) = ScopedOption::from_key(key, value.clone())? {
                scoped.push(option);
            }
        }
        Ok(scoped)
    }

    /// Substitute variables in a string
    ///
    /// Replaces `%(name)s` patterns with their values from:
    /// 1. Built-in variables (name, version)
    /// 2. Resolved settings, e.g. `%(build_type)s`
    /// 3. Resolved options as `%(options.shared)s`
    /// 4. Custom variables from the [variables] section
    pub fn substitute(&self, template: &str, config: &EffectiveConfig) -> String {
        let mut result = template.to_string();

        result = result.replace("%(name)s", &self.package.name);
        if let Some(version) = &self.package.version {
            result = result.replace("%(version)s", version);
        }

        for (key, value) in &config.settings {
            result = result.replace(&format!("%({})s", key), value);
        }
        for (key, value) in &config.options {
            result = result.replace(&format!("%(options.{})s", key), &value.to_string());
        }
        for (key, value) in &self.variables {
            result = result.replace(&format!("%({})s", key), value);
        }

        result
    }
}

/// Package metadata section
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PackageSection {
    /// Package name (the only required field)
    pub name: String,

    #[serde(default)]
    pub version: Option<String>,

    /// Provider user for `@user` pinned references
    #[serde(default)]
    pub user: Option<String>,

    #[serde(default)]
    pub channel: Option<String>,

    #[serde(default)]
    pub description: Option<String>,

    /// License identifier (SPDX)
    #[serde(default)]
    pub license: Option<String>,

    /// Recipe source URL
    #[serde(default)]
    pub url: Option<String>,

    #[serde(default)]
    pub homepage: Option<String>,

    #[serde(rename = "type", default)]
    pub package_type: PackageType,

    /// Settings axes this recipe is sensitive to
    #[serde(default)]
    pub settings: Vec<String>,

    /// Requirements in declaration order
    #[serde(default)]
    pub requires: Vec<RecipeRef>,

    /// Globs of files, relative to the recipe directory, exported with the recipe
    #[serde(default)]
    pub exports_sources: Vec<String>,

    /// Build straight from the exported sources instead of a per-build copy
    #[serde(default)]
    pub no_copy_source: bool,
}

/// What kind of artifact a recipe produces
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum PackageType {
    #[default]
    Library,
    HeaderLibrary,
    Application,
}

/// Folder layout section
///
/// Folders are relative to the layout roots and support substitution,
/// e.g. `build = "%(build_type)s"`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LayoutSection {
    /// Use the CMake convention: `<build_type>` and `<build_type>/generators`
    #[serde(default)]
    pub cmake: bool,

    /// Source subfolder (relative to the source root)
    #[serde(default)]
    pub source: Option<String>,

    /// Build subfolder (relative to the build root)
    #[serde(default)]
    pub build: Option<String>,

    /// Generators subfolder (relative to the build root)
    #[serde(default)]
    pub generators: Option<String>,
}

/// Build section: drives the toolchain configure and build steps
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildSection {
    /// Toolchain the recipe was written for
    #[serde(default = "default_toolchain")]
    pub toolchain: String,

    /// Extra cache definitions passed to the configure step (`-DKEY=VALUE`)
    ///
    /// Supports `%(variable)s` substitution.
    #[serde(default)]
    pub definitions: BTreeMap<String, String>,

    /// Build only this target
    #[serde(default)]
    pub target: Option<String>,
}

fn default_toolchain() -> String {
    "cmake".to_string()
}

/// Packaging section: drives the toolchain install step and copy rules
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PackagingSection {
    /// Run the toolchain install step into the package root
    #[serde(default)]
    pub install: bool,

    /// Glob copy rules applied after install
    #[serde(default)]
    pub copy: Vec<CopyRule>,
}

/// Identity reduction rules
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PackageIdSection {
    /// Drop every setting, option and requirement from the identity
    #[serde(default)]
    pub clear: bool,

    #[serde(default)]
    pub remove_settings: Vec<String>,

    #[serde(default)]
    pub remove_options: Vec<String>,
}
