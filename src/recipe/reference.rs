// src/recipe/reference.rs

//! Recipe references: `name[/version][@user[/channel]]`
//!
//! A reference names a recipe in a `requires` list. The optional
//! `@user/channel` suffix pins the requirement to a specific provider,
//! e.g. `glad/2.0.8@local` only resolves against a recipe published by
//! the `local` user.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A reference to a recipe
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RecipeRef {
    pub name: String,
    pub version: Option<String>,
    pub user: Option<String>,
    pub channel: Option<String>,
}

impl RecipeRef {
    /// Create a reference from a name and version
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: Some(version.into()),
            user: None,
            channel: None,
        }
    }

    /// Pin this reference to a provider user and optional channel
    pub fn with_user(mut self, user: impl Into<String>, channel: Option<String>) -> Self {
        self.user = Some(user.into());
        self.channel = channel;
        self
    }

    /// Parse a reference string like `glad/2.0.8@local` or `stb/cci.20210713`
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.is_empty() {
            return Err(Error::ParseError("Empty recipe reference".to_string()));
        }

        let (path, pin) = match s.split_once('@') {
            Some((path, pin)) => (path, Some(pin)),
            None => (s, None),
        };

        let (name, version) = match path.split_once('/') {
            Some((name, version)) => (name, Some(version)),
            None => (path, None),
        };

        validate_segment(s, "name", name)?;
        if let Some(version) = version {
            validate_segment(s, "version", version)?;
        }

        let (user, channel) = match pin {
            Some(pin) => {
                let (user, channel) = match pin.split_once('/') {
                    Some((user, channel)) => (user, Some(channel)),
                    None => (pin, None),
                };
                validate_segment(s, "user", user)?;
                if let Some(channel) = channel {
                    validate_segment(s, "channel", channel)?;
                }
                (Some(user.to_string()), channel.map(str::to_string))
            }
            None => (None, None),
        };

        Ok(Self {
            name: name.to_string(),
            version: version.map(str::to_string),
            user,
            channel,
        })
    }

    /// Check whether a recipe with reference `provided` satisfies this requirement
    ///
    /// Version, user and channel only constrain the match when this
    /// requirement names them.
    pub fn is_satisfied_by(&self, provided: &RecipeRef) -> bool {
        if self.name != provided.name {
            return false;
        }
        if self.version.is_some() && self.version != provided.version {
            return false;
        }
        if self.user.is_some() && self.user != provided.user {
            return false;
        }
        if self.channel.is_some() && self.channel != provided.channel {
            return false;
        }
        true
    }
}

/// Check one segment of a reference
///
/// Segments become directory names under the pantry root, so separators,
/// pattern characters and `..` are rejected.
pub(crate) fn validate_segment(full: &str, what: &str, segment: &str) -> Result<()> {
    if segment.is_empty() {
        return Err(Error::ParseError(format!(
            "Invalid recipe reference '{}': empty {}",
            full, what
        )));
    }
    if let Some(bad) = segment
        .chars()
        .find(|c| c.is_whitespace() || matches!(c, '/' | '\\' | '@' | ':' | '*'))
    {
        return Err(Error::ParseError(format!(
            "Invalid recipe reference '{}': {} contains '{}'",
            full, what, bad
        )));
    }
    if segment == "." || segment.contains("..") {
        return Err(Error::ParseError(format!(
            "Invalid recipe reference '{}': {} '{}' is not a plain path segment",
            full, what, segment
        )));
    }
    Ok(())
}

impl fmt::Display for RecipeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if let Some(version) = &self.version {
            write!(f, "/{}", version)?;
        }
        if let Some(user) = &self.user {
            write!(f, "@{}", user)?;
            if let Some(channel) = &self.channel {
                write!(f, "/{}", channel)?;
            }
        }
        Ok(())
    }
}

impl FromStr for RecipeRef {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        RecipeRef::parse(s)
    }
}

impl TryFrom<String> for RecipeRef {
    type Error = Error;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        RecipeRef::parse(&value)
    }
}

impl From<RecipeRef> for String {
    fn from(value: RecipeRef) -> Self {
        value.to_string()
    }
}
