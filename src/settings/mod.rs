// src/settings/mod.rs

//! Settings, options and their resolution into an effective configuration
//!
//! Settings are global axes (os, arch, compiler, build_type) that come from
//! the profile. Options are recipe-specific and resolve, in increasing
//! precedence, from recipe defaults, consumer overrides and the profile.

pub mod options;
pub mod profile;
pub mod schema;

pub use options::{ANY_VALUE, OptionValue, ScopedOption, is_allowed};
pub use profile::Profile;
pub use schema::SettingsSchema;

use crate::error::{Error, Result};
use crate::recipe::Recipe;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Concrete settings and options for one recipe at one graph position
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectiveConfig {
    pub settings: BTreeMap<String, String>,
    pub options: BTreeMap<String, OptionValue>,
}

impl EffectiveConfig {
    /// Resolve the configuration of `recipe`
    ///
    /// `consumer_overrides` are the option values pushed down by the
    /// recipes that require this one, already reduced to a single value per
    /// option. Unscoped profile options apply only when `is_root` is set.
    pub fn resolve(
        recipe: &Recipe,
        profile: &Profile,
        consumer_overrides: &BTreeMap<String, OptionValue>,
        is_root: bool,
        schema: &SettingsSchema,
    ) -> Result<Self> {
        let reference = recipe.reference();
        let mut config = Self::default();

        for axis in &recipe.package.settings {
            for (key, value) in profile.axis_values(axis) {
                schema.validate(key, value)?;
                config.settings.insert(key.to_string(), value.to_string());
            }
        }

        for option in recipe.options.keys() {
            if let Some(value) = recipe.own_default(option) {
                config.options.insert(option.clone(), value.clone());
            }
        }

        for (option, value) in consumer_overrides {
            if recipe.options.contains_key(option) {
                config.options.insert(option.clone(), value.clone());
            } else {
                warn!(
                    "{}: ignoring override of undeclared option '{}'",
                    reference, option
                );
            }
        }

        for (key, value) in &profile.options {
            match ScopedOption::from_key(key, value.clone())? {
                None if is_root => {
                    if recipe.options.contains_key(key) {
                        config.options.insert(key.clone(), value.clone());
                    } else {
                        debug!("{}: profile option '{}' not declared", reference, key);
                    }
                }
                None => {}
                Some(scoped) => {
                    if scoped.matches(&reference) && recipe.options.contains_key(&scoped.option) {
                        config.options.insert(scoped.option, scoped.value);
                    }
                }
            }
        }

        for (option, allowed) in &recipe.options {
            let Some(value) = config.options.get(option) else {
                return Err(Error::ConfigurationError(format!(
                    "{}: option '{}' has no value",
                    reference, option
                )));
            };
            if !is_allowed(allowed, value) {
                let possible: Vec<String> = allowed.iter().map(|v| v.to_string()).collect();
                return Err(Error::ConfigurationError(format!(
                    "{}: invalid value '{}' for option '{}'. Possible values: {}",
                    reference,
                    value,
                    option,
                    possible.join(", ")
                )));
            }
        }

        Ok(config)
    }

    pub fn setting(&self, key: &str) -> Option<&str> {
        self.settings.get(key).map(String::as_str)
    }

    pub fn option(&self, name: &str) -> Option<&OptionValue> {
        self.options.get(name)
    }

    pub fn build_type(&self) -> Option<&str> {
        self.setting("build_type")
    }

    /// True when the recipe has a `shared` option set to true
    pub fn is_shared(&self) -> bool {
        self.option("shared")
            .and_then(OptionValue::as_bool)
            .unwrap_or(false)
    }

    /// Declared settings axes of `recipe` that have no value
    pub fn missing_settings(&self, recipe: &Recipe) -> Vec<String> {
        recipe
            .package
            .settings
            .iter()
            .filter(|axis| !self.settings.contains_key(axis.as_str()))
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn glad() -> Recipe {
        toml::from_str(
            r#"
[package]
name = "glad"
version = "2.0.8"
settings = ["os", "compiler", "build_type"]

[options]
shared = [true, false]
fPIC = [true, false]

[default_options]
shared = false
fPIC = true
"#,
        )
        .unwrap()
    }

    fn profile() -> Profile {
        Profile::default()
            .with_setting("os", "Linux")
            .with_setting("arch", "x86_64")
            .with_setting("compiler", "gcc")
            .with_setting("compiler.version", "13")
            .with_setting("build_type", "Release")
    }

    #[test]
    fn test_defaults_apply_without_overrides() {
        let config = EffectiveConfig::resolve(
            &glad(),
            &profile(),
            &BTreeMap::new(),
            true,
            &SettingsSchema::default(),
        )
        .unwrap();

        assert_eq!(config.option("shared"), Some(&OptionValue::Bool(false)));
        assert!(!config.is_shared());
        assert_eq!(config.build_type(), Some("Release"));
        assert_eq!(config.setting("compiler.version"), Some("13"));
        // arch is not declared by the recipe
        assert!(config.setting("arch").is_none());
    }

    #[test]
    fn test_profile_beats_consumer() {
        let mut consumer = BTreeMap::new();
        consumer.insert("shared".to_string(), OptionValue::Bool(true));

        let config = EffectiveConfig::resolve(
            &glad(),
            &profile(),
            &consumer,
            false,
            &SettingsSchema::default(),
        )
        .unwrap();
        assert!(config.is_shared());

        let pinned = profile().with_option("glad/*:shared", false);
        let config = EffectiveConfig::resolve(
            &glad(),
            &pinned,
            &consumer,
            false,
            &SettingsSchema::default(),
        )
        .unwrap();
        assert!(!config.is_shared());
    }

    #[test]
    fn test_unscoped_profile_options_only_for_roots() {
        let profile = profile().with_option("shared", true);
        let schema = SettingsSchema::default();

        let root =
            EffectiveConfig::resolve(&glad(), &profile, &BTreeMap::new(), true, &schema).unwrap();
        assert!(root.is_shared());

        let dep =
            EffectiveConfig::resolve(&glad(), &profile, &BTreeMap::new(), false, &schema).unwrap();
        assert!(!dep.is_shared());
    }

    #[test]
    fn test_invalid_option_value() {
        let profile = profile().with_option("glad/*:shared", "maybe");
        let err = EffectiveConfig::resolve(
            &glad(),
            &profile,
            &BTreeMap::new(),
            false,
            &SettingsSchema::default(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::ConfigurationError(_)));
    }

    #[test]
    fn test_option_without_value() {
        let mut recipe = glad();
        recipe.default_options.remove("fPIC");
        let err = EffectiveConfig::resolve(
            &recipe,
            &profile(),
            &BTreeMap::new(),
            true,
            &SettingsSchema::default(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("fPIC"));
    }

    #[test]
    fn test_invalid_setting_value() {
        let profile = profile().with_setting("build_type", "Fastest");
        assert!(
            EffectiveConfig::resolve(
                &glad(),
                &profile,
                &BTreeMap::new(),
                true,
                &SettingsSchema::default(),
            )
            .is_err()
        );
    }

    #[test]
    fn test_missing_settings() {
        let profile = Profile::default().with_setting("os", "Linux");
        let config = EffectiveConfig::resolve(
            &glad(),
            &profile,
            &BTreeMap::new(),
            true,
            &SettingsSchema::default(),
        )
        .unwrap();
        assert_eq!(config.missing_settings(&glad()), vec!["compiler", "build_type"]);
    }
}
