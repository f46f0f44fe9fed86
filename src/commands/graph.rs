// src/commands/graph.rs

//! Graph command - show the build order of a set of recipes

use super::load_recipes;
use anyhow::{Context, Result, bail};
use pantry::recipe::RecipeGraph;
use std::collections::BTreeSet;
use std::path::PathBuf;

/// Print the build order, the parallel levels, or the recipes affected by a change
pub fn cmd_graph(recipe_paths: &[PathBuf], levels: bool, affected: Option<&str>) -> Result<()> {
    let recipes = load_recipes(recipe_paths)?;

    let mut graph = RecipeGraph::new();
    for loaded in &recipes {
        graph.add_from_recipe(&loaded.recipe);
    }

    let missing: BTreeSet<&String> = recipes
        .iter()
        .flat_map(|r| r.recipe.package.requires.iter().map(|req| &req.name))
        .filter(|name| !recipes.iter().any(|r| &r.recipe.package.name == *name))
        .collect();
    for name in &missing {
        println!("Warning: {} is required but was not given", name);
    }

    if let Some(name) = affected {
        if !graph.contains(name) {
            bail!("{} is not part of the graph", name);
        }
        let rebuilt = graph.transitive_dependents(name);
        if rebuilt.is_empty() {
            println!("Nothing depends on {}", name);
        } else {
            println!("Changing {} rebuilds {} recipe(s):", name, rebuilt.len());
            for dependent in &rebuilt {
                println!("  {}", dependent);
            }
        }
        return Ok(());
    }

    if levels {
        let levels = graph.levels().context("Failed to order recipes")?;
        for (depth, level) in levels.iter().enumerate() {
            println!("Level {}: {}", depth, level.join(", "));
        }
        return Ok(());
    }

    let order = graph.topological_sort().context("Failed to order recipes")?;
    println!("Build order ({} recipes):", graph.recipe_count());
    for (i, name) in order.iter().enumerate() {
        println!("  {}. {}", i + 1, describe(&graph, name));
    }
    Ok(())
}

/// `glad (required by minecraft)`
fn describe(graph: &RecipeGraph, name: &str) -> String {
    let mut line = name.to_string();
    if let Some(deps) = graph.dependencies(name).filter(|d| !d.is_empty()) {
        line.push_str(&format!(" (requires {})", joined(deps)));
    }
    if let Some(users) = graph.dependents(name).filter(|d| !d.is_empty()) {
        line.push_str(&format!(" (required by {})", joined(users)));
    }
    line
}

fn joined(names: &BTreeSet<String>) -> String {
    names.iter().cloned().collect::<Vec<_>>().join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe() {
        let mut graph = RecipeGraph::new();
        graph.add_recipe("glad", &[]);
        graph.add_recipe("fastnoise-lite", &[]);
        graph.add_recipe("minecraft", &["glad", "fastnoise-lite"]);

        assert_eq!(describe(&graph, "glad"), "glad (required by minecraft)");
        assert_eq!(
            describe(&graph, "minecraft"),
            "minecraft (requires fastnoise-lite, glad)"
        );
        assert_eq!(graph.recipe_count(), 3);
        assert_eq!(
            graph.transitive_dependents("glad").into_iter().collect::<Vec<_>>(),
            vec!["minecraft"]
        );
    }
}
