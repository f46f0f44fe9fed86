// src/recipe/parser.rs

//! Recipe file parsing

use crate::error::{Error, Result};
use crate::recipe::format::Recipe;
use crate::recipe::reference::validate_segment;
use crate::settings::options::{ScopedOption, is_allowed};
use std::collections::HashSet;
use std::path::Path;

/// Parse a recipe from a TOML string
pub fn parse_recipe(content: &str) -> Result<Recipe> {
    toml::from_str(content).map_err(|e| Error::ParseError(format!("Invalid recipe: {}", e)))
}

/// Parse a recipe from a file
pub fn parse_recipe_file(path: &Path) -> Result<Recipe> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::IoError(format!(
            "Failed to read recipe file {}: {}",
            path.display(),
            e
        ))
    })?;

    parse_recipe(&content)
}

/// Validate a recipe for completeness and correctness
///
/// Returns the list of non-fatal warnings.
pub fn validate_recipe(recipe: &Recipe) -> Result<Vec<String>> {
    let mut warnings = Vec::new();
    let name = &recipe.package.name;

    if name.trim().is_empty() {
        return Err(Error::ParseError("Recipe package name cannot be empty".to_string()));
    }

    // The package's own reference names its directories under the pantry root
    let reference = recipe.reference().to_string();
    let package = &recipe.package;
    validate_segment(&reference, "name", name)?;
    for (what, segment) in [
        ("version", &package.version),
        ("user", &package.user),
        ("channel", &package.channel),
    ] {
        if let Some(segment) = segment {
            validate_segment(&reference, what, segment)?;
        }
    }
    if package.channel.is_some() && package.user.is_none() {
        return Err(Error::ParseError(format!(
            "{}: channel '{}' given without a user",
            name,
            package.channel.as_deref().unwrap_or_default()
        )));
    }

    for (option, allowed) in &recipe.options {
        if allowed.is_empty() {
            return Err(Error::ConfigurationError(format!(
                "{}: option '{}' has no allowed values",
                name, option
            )));
        }
    }

    // Every default either names a declared option or targets a dependency
    for (key, value) in &recipe.default_options {
        if ScopedOption::from_key(key, value.clone())?.is_some() {
            continue;
        }
        let Some(allowed) = recipe.options.get(key) else {
            return Err(Error::ConfigurationError(format!(
                "{}: default for undeclared option '{}'",
                name, key
            )));
        };
        if !is_allowed(allowed, value) {
            return Err(Error::ConfigurationError(format!(
                "{}: default '{}' is not an allowed value of option '{}'",
                name, value, key
            )));
        }
    }

    let mut seen = HashSet::new();
    for requirement in &recipe.package.requires {
        if !seen.insert(requirement.name.as_str()) {
            return Err(Error::ConfigurationError(format!(
                "{}: duplicate requirement '{}'",
                name, requirement.name
            )));
        }
        if requirement.name == *name {
            return Err(Error::ConfigurationError(format!(
                "{}: recipe requires itself",
                name
            )));
        }
    }

    // Warn about missing fields
    if recipe.package.version.is_none() {
        warnings.push("Missing package version".to_string());
    }
    if recipe.package.license.is_none() {
        warnings.push("Missing package license".to_string());
    }
    if recipe.package.url.is_none() {
        warnings.push("Missing package url".to_string());
    }

    if recipe.is_header_only() && recipe.build.is_some() {
        warnings.push("Header library declares a [build] section".to_string());
    }
    if recipe.package.no_copy_source && recipe.package.exports_sources.is_empty() {
        warnings.push("no_copy_source set but nothing in exports_sources".to_string());
    }
    if let Some(packaging) = &recipe.packaging {
        for rule in &packaging.copy {
            if glob::Pattern::new(&rule.pattern).is_err() {
                return Err(Error::ConfigurationError(format!(
                    "{}: invalid copy pattern '{}'",
                    name, rule.pattern
                )));
            }
        }
    }

    Ok(warnings)
}
