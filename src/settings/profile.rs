// src/settings/profile.rs

//! Profiles: the global settings and option overrides for a build
//!
//! ```toml
//! [settings]
//! os = "Linux"
//! arch = "x86_64"
//! compiler = "gcc"
//! "compiler.version" = "13"
//! build_type = "Release"
//!
//! [options]
//! "glad/*:shared" = true
//! shared = false        # unscoped: applies to the root recipes only
//! ```

use crate::error::{Error, Result};
use crate::settings::options::OptionValue;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// A build profile
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    #[serde(default)]
    pub settings: BTreeMap<String, String>,

    #[serde(default)]
    pub options: BTreeMap<String, OptionValue>,
}

impl Profile {
    /// Parse a profile from TOML
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::ParseError(format!("Invalid profile: {}", e)))
    }

    /// Load a profile from a file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::IoError(format!(
                "Failed to read profile {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::parse(&content)
    }

    /// Profile describing the host machine
    pub fn detect() -> Self {
        let os = match std::env::consts::OS {
            "linux" => "Linux",
            "macos" => "Macos",
            "windows" => "Windows",
            "freebsd" => "FreeBSD",
            "android" => "Android",
            "ios" => "iOS",
            other => other,
        };
        let arch = match std::env::consts::ARCH {
            "aarch64" => "armv8",
            "arm" => "armv7",
            "powerpc64" => "ppc64le",
            other => other,
        };
        let compiler = match std::env::consts::OS {
            "windows" => "msvc",
            "macos" | "ios" => "apple-clang",
            _ => "gcc",
        };

        Self::default()
            .with_setting("os", os)
            .with_setting("arch", arch)
            .with_setting("compiler", compiler)
            .with_setting("build_type", "Release")
    }

    pub fn with_setting(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.settings.insert(key.into(), value.into());
        self
    }

    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<OptionValue>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    /// Overlay another profile on top of this one
    pub fn merge(&mut self, other: &Profile) {
        for (key, value) in &other.settings {
            self.settings.insert(key.clone(), value.clone());
        }
        for (key, value) in &other.options {
            self.options.insert(key.clone(), value.clone());
        }
    }

    /// Apply `key=value` overrides from the command line
    pub fn apply_overrides(&mut self, settings: &[String], options: &[String]) -> Result<()> {
        for assignment in settings {
            let (key, value) = split_assignment(assignment)?;
            self.settings.insert(key.to_string(), value.to_string());
        }
        for assignment in options {
            let (key, value) = split_assignment(assignment)?;
            self.options.insert(key.to_string(), OptionValue::parse(value));
        }
        Ok(())
    }

    /// Values for a declared settings axis, including its sub-settings
    ///
    /// Declaring `compiler` pulls in `compiler.version`, `compiler.cppstd`
    /// and any other `compiler.*` key.
    pub fn axis_values(&self, axis: &str) -> Vec<(&str, &str)> {
        let prefix = format!("{}.", axis);
        self.settings
            .iter()
            .filter(|(key, _)| key.as_str() == axis || key.starts_with(&prefix))
            .map(|(key, value)| (key.as_str(), value.as_str()))
            .collect()
    }
}

fn split_assignment(assignment: &str) -> Result<(&str, &str)> {
    // Split on the last '=' so scoped keys stay intact
    match assignment.rsplit_once('=') {
        Some((key, value)) if !key.trim().is_empty() && !value.trim().is_empty() => {
            Ok((key.trim(), value.trim()))
        }
        _ => Err(Error::ConfigurationError(format!(
            "Invalid assignment '{}': expected key=value",
            assignment
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROFILE: &str = r#"
[settings]
os = "Linux"
arch = "x86_64"
compiler = "gcc"
"compiler.version" = "13"
build_type = "Debug"

[options]
"glad/*:shared" = true
"#;

    #[test]
    fn test_parse_profile() {
        let profile = Profile::parse(PROFILE).unwrap();
        assert_eq!(profile.settings.get("build_type").unwrap(), "Debug");
        assert_eq!(
            profile.options.get("glad/*:shared"),
            Some(&OptionValue::Bool(true))
        );
    }

    #[test]
    fn test_axis_values_include_subsettings() {
        let profile = Profile::parse(PROFILE).unwrap();
        let compiler = profile.axis_values("compiler");
        assert_eq!(compiler, vec![("compiler", "gcc"), ("compiler.version", "13")]);
        assert!(profile.axis_values("missing").is_empty());
    }

    #[test]
    fn test_apply_overrides() {
        let mut profile = Profile::parse(PROFILE).unwrap();
        profile
            .apply_overrides(
                &["build_type=Release".to_string()],
                &["glad/*:shared=False".to_string(), "fast=1".to_string()],
            )
            .unwrap();

        assert_eq!(profile.settings.get("build_type").unwrap(), "Release");
        assert_eq!(
            profile.options.get("glad/*:shared"),
            Some(&OptionValue::Bool(false))
        );
        assert_eq!(profile.options.get("fast"), Some(&OptionValue::Int(1)));

        assert!(profile.apply_overrides(&["nokey".to_string()], &[]).is_err());
        assert!(profile.apply_overrides(&["os=".to_string()], &[]).is_err());
    }

    #[test]
    fn test_merge_overlays() {
        let mut base = Profile::default()
            .with_setting("os", "Linux")
            .with_setting("build_type", "Release");
        let overlay = Profile::default().with_setting("build_type", "Debug");
        base.merge(&overlay);
        assert_eq!(base.settings.get("os").unwrap(), "Linux");
        assert_eq!(base.settings.get("build_type").unwrap(), "Debug");
    }

    #[test]
    fn test_detect_has_core_axes() {
        let profile = Profile::detect();
        for axis in ["os", "arch", "compiler", "build_type"] {
            assert!(profile.settings.contains_key(axis), "missing {}", axis);
        }
    }

    #[test]
    fn test_invalid_profile() {
        assert!(Profile::parse("[settings\nos=").is_err());
    }
}
