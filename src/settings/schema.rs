// src/settings/schema.rs

//! Allowed values for the well-known settings axes
//!
//! Settings not listed in the schema are accepted with any value, and
//! sub-settings (`compiler.version`, `compiler.cppstd`) are free-form.

use crate::error::{Error, Result};
use std::collections::BTreeMap;

/// Allowed values per settings axis
#[derive(Debug, Clone)]
pub struct SettingsSchema {
    axes: BTreeMap<String, Vec<String>>,
}

impl Default for SettingsSchema {
    fn default() -> Self {
        let mut schema = Self::permissive();
        schema.define(
            "os",
            &[
                "Windows", "Linux", "Macos", "FreeBSD", "Android", "iOS", "Emscripten",
            ],
        );
        schema.define(
            "arch",
            &["x86", "x86_64", "armv7", "armv8", "ppc64le", "riscv64", "wasm"],
        );
        schema.define(
            "build_type",
            &["Debug", "Release", "RelWithDebInfo", "MinSizeRel"],
        );
        schema.define("compiler", &["gcc", "clang", "apple-clang", "msvc"]);
        schema
    }
}

impl SettingsSchema {
    /// A schema that accepts any value for any axis
    pub fn permissive() -> Self {
        Self {
            axes: BTreeMap::new(),
        }
    }

    /// Define (or replace) the allowed values of an axis
    pub fn define(&mut self, axis: &str, values: &[&str]) {
        self.axes.insert(
            axis.to_string(),
            values.iter().map(|v| v.to_string()).collect(),
        );
    }

    /// Allowed values for an axis, if it is constrained
    pub fn allowed(&self, axis: &str) -> Option<&[String]> {
        self.axes.get(axis).map(|v| v.as_slice())
    }

    /// Validate one setting value
    pub fn validate(&self, key: &str, value: &str) -> Result<()> {
        if value.is_empty() || value.contains(['\n', '\r']) {
            return Err(Error::ConfigurationError(format!(
                "Invalid value {:?} for setting '{}'",
                value, key
            )));
        }

        match self.axes.get(key) {
            Some(allowed) if !allowed.iter().any(|a| a == value) => {
                Err(Error::ConfigurationError(format!(
                    "Invalid value '{}' for setting '{}'. Possible values: {}",
                    value,
                    key,
                    allowed.join(", ")
                )))
            }
            _ => Ok(()),
        }
    }
}
