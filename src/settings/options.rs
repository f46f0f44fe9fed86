// src/settings/options.rs

//! Option values and pattern-scoped option overrides
//!
//! Options are recipe-specific toggles such as `shared = false`. A key of
//! the form `pattern:option` (e.g. `glad/*:shared`) targets the options of
//! every recipe whose reference matches `pattern` instead of the declaring
//! recipe itself.

use crate::error::{Error, Result};
use crate::recipe::RecipeRef;
use glob::Pattern;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Allowed-value marker that accepts any value
pub const ANY_VALUE: &str = "ANY";

/// A single option value
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OptionValue {
    Bool(bool),
    Int(i64),
    Str(String),
}

impl OptionValue {
    /// Parse a value given on the command line or in a profile
    ///
    /// `true`/`false` (any case) become booleans, integers become
    /// integers, everything else stays a string.
    pub fn parse(s: &str) -> Self {
        let trimmed = s.trim();
        match trimmed.to_ascii_lowercase().as_str() {
            "true" => return Self::Bool(true),
            "false" => return Self::Bool(false),
            _ => {}
        }
        match trimmed.parse::<i64>() {
            Ok(n) => Self::Int(n),
            Err(_) => Self::Str(trimmed.to_string()),
        }
    }

    /// Compare by canonical text, so `1` and `"1"` are the same value
    pub fn same_as(&self, other: &OptionValue) -> bool {
        self.to_string() == other.to_string()
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    fn is_any_marker(&self) -> bool {
        matches!(self, Self::Str(s) if s == ANY_VALUE)
    }
}

impl fmt::Display for OptionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{}", b),
            Self::Int(n) => write!(f, "{}", n),
            Self::Str(s) => write!(f, "{}", s),
        }
    }
}

impl From<bool> for OptionValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<&str> for OptionValue {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

/// Check a value against an option's allowed-value set
pub fn is_allowed(allowed: &[OptionValue], value: &OptionValue) -> bool {
    allowed
        .iter()
        .any(|candidate| candidate.is_any_marker() || candidate.same_as(value))
}

/// An option assignment that targets other recipes by reference pattern
#[derive(Debug, Clone)]
pub struct ScopedOption {
    pub pattern: String,
    pub option: String,
    pub value: OptionValue,
    compiled: Pattern,
}

impl ScopedOption {
    /// Build a scoped option from a `pattern:option` key
    ///
    /// Returns `Ok(None)` when the key has no scope, i.e. it names an
    /// option of the declaring recipe.
    pub fn from_key(key: &str, value: OptionValue) -> Result<Option<Self>> {
        let Some((pattern, option)) = key.rsplit_once(':') else {
            return Ok(None);
        };

        let pattern = pattern.trim();
        let option = option.trim();
        if pattern.is_empty() || option.is_empty() {
            return Err(Error::ConfigurationError(format!(
                "Invalid scoped option '{}': expected 'pattern:option'",
                key
            )));
        }

        // A bare name scopes every version of that recipe
        let full_pattern = if pattern.contains('/') || pattern == "*" {
            pattern.to_string()
        } else {
            format!("{}/*", pattern)
        };

        let compiled = Pattern::new(&full_pattern).map_err(|e| {
            Error::ConfigurationError(format!("Invalid option pattern '{}': {}", pattern, e))
        })?;

        Ok(Some(Self {
            pattern: full_pattern,
            option: option.to_string(),
            value,
            compiled,
        }))
    }

    /// Check if this override applies to a recipe
    pub fn matches(&self, reference: &RecipeRef) -> bool {
        let full = reference.to_string();
        if self.compiled.matches(&full) {
            return true;
        }
        // `name/*` also covers references declared without a version
        reference.version.is_none() && self.compiled.matches(&format!("{}/", full))
    }
}
