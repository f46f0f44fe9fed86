// src/commands/inspect.rs

//! Inspect command - parse, validate and describe a recipe

use anyhow::{Context, Result};
use pantry::LoadedRecipe;
use pantry::recipe::validate_recipe;
use std::path::Path;

pub fn cmd_inspect(recipe_path: &Path, json: bool) -> Result<()> {
    let loaded = LoadedRecipe::from_file(recipe_path)
        .with_context(|| format!("Failed to load recipe: {}", recipe_path.display()))?;
    let recipe = &loaded.recipe;

    if json {
        let out = serde_json::to_string_pretty(recipe.as_ref())
            .context("Failed to serialize recipe")?;
        println!("{}", out);
        return Ok(());
    }

    let pkg = &recipe.package;
    println!("Recipe: {}", recipe.reference());
    println!("  Type: {}", pkg.package_type);
    if let Some(license) = &pkg.license {
        println!("  License: {}", license);
    }
    if let Some(url) = &pkg.url {
        println!("  URL: {}", url);
    }
    if let Some(description) = &pkg.description {
        println!("  Description: {}", description);
    }
    if !pkg.settings.is_empty() {
        println!("  Settings: {}", pkg.settings.join(", "));
    }

    if !recipe.options.is_empty() {
        println!("  Options:");
        for (name, allowed) in &recipe.options {
            let values: Vec<String> = allowed.iter().map(|v| v.to_string()).collect();
            let default = recipe
                .own_default(name)
                .map(|v| v.to_string())
                .unwrap_or_else(|| "-".to_string());
            println!("    {} = {} [{}]", name, default, values.join(", "));
        }
    }

    let scoped = recipe.scoped_defaults()?;
    if !scoped.is_empty() {
        println!("  Dependency options:");
        for option in &scoped {
            println!("    {}:{} = {}", option.pattern, option.option, option.value);
        }
    }

    if !pkg.requires.is_empty() {
        println!("  Requires:");
        for required in &pkg.requires {
            println!("    {}", required);
        }
    }

    let caps = loaded.capabilities();
    let mut hooks = Vec::new();
    for (name, present) in [
        ("layout", caps.layout),
        ("configure", caps.configure),
        ("build", caps.build),
        ("package", caps.package),
        ("package_id", caps.package_id),
        ("package_info", caps.package_info),
    ] {
        if present {
            hooks.push(name);
        }
    }
    println!("  Hooks: {}", if hooks.is_empty() { "none".to_string() } else { hooks.join(", ") });

    let warnings = validate_recipe(recipe).context("Recipe validation failed")?;
    if warnings.is_empty() {
        println!("[OK] No issues found");
    } else {
        for warning in &warnings {
            println!("Warning: {}", warning);
        }
        println!("[OK] {} warning(s)", warnings.len());
    }
    Ok(())
}
