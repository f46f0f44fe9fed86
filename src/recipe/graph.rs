// src/recipe/graph.rs

//! Recipe dependency graph for build ordering
//!
//! A directed graph of `requires` edges between recipes, used to reject
//! cycles, compute a deterministic build order and group recipes into
//! levels that can be cooked in parallel.
//!
//! # Example
//!
//! ```ignore
//! use pantry::recipe::RecipeGraph;
//!
//! let mut graph = RecipeGraph::new();
//! graph.add_recipe("minecraft", &["glad", "fastnoise-lite", "glfw"]);
//! graph.add_recipe("glad", &[]);
//! graph.add_recipe("fastnoise-lite", &[]);
//! graph.add_recipe("glfw", &[]);
//!
//! let order = graph.topological_sort().unwrap();
//! // order: ["fastnoise-lite", "glad", "glfw", "minecraft"]
//! ```

use crate::error::{Error, Result};
use crate::recipe::Recipe;
use std::collections::{BTreeMap, BTreeSet, VecDeque};

/// A directed graph representing recipe dependencies
#[derive(Debug, Default, Clone)]
pub struct RecipeGraph {
    /// Key: recipe name, Value: set of recipes this recipe depends on
    edges: BTreeMap<String, BTreeSet<String>>,
    /// Key: recipe name, Value: set of recipes that depend on this recipe
    reverse_edges: BTreeMap<String, BTreeSet<String>>,
}

impl RecipeGraph {
    /// Create a new empty recipe graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a recipe with its dependencies
    ///
    /// If the recipe already exists, this merges the dependencies.
    pub fn add_recipe(&mut self, name: &str, dependencies: &[&str]) {
        self.edges.entry(name.to_string()).or_default();
        self.reverse_edges.entry(name.to_string()).or_default();

        for dep in dependencies {
            self.edges.entry(dep.to_string()).or_default();
            self.reverse_edges
                .entry(dep.to_string())
                .or_default()
                .insert(name.to_string());
            self.edges
                .entry(name.to_string())
                .or_default()
                .insert(dep.to_string());
        }
    }

    /// Add a recipe and its `requires` edges
    pub fn add_from_recipe(&mut self, recipe: &Recipe) {
        let deps: Vec<&str> = recipe
            .package
            .requires
            .iter()
            .map(|r| r.name.as_str())
            .collect();
        self.add_recipe(&recipe.package.name, &deps);
    }

    /// Get the number of recipes in the graph
    pub fn recipe_count(&self) -> usize {
        self.edges.len()
    }

    /// Check if a recipe exists in the graph
    pub fn contains(&self, name: &str) -> bool {
        self.edges.contains_key(name)
    }

    /// Get the direct dependencies of a recipe
    pub fn dependencies(&self, name: &str) -> Option<&BTreeSet<String>> {
        self.edges.get(name)
    }

    /// Get the recipes that directly depend on this recipe
    pub fn dependents(&self, name: &str) -> Option<&BTreeSet<String>> {
        self.reverse_edges.get(name)
    }

    /// Recipes nothing depends on
    pub fn roots(&self) -> Vec<String> {
        self.reverse_edges
            .iter()
            .filter(|(_, dependents)| dependents.is_empty())
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// Perform topological sort using Kahn's algorithm
    ///
    /// Returns the recipes in build order (dependencies before dependents).
    /// Among recipes that are ready at the same time, names sort
    /// alphabetically, so the order is stable across runs.
    pub fn topological_sort(&self) -> Result<Vec<String>> {
        let mut in_degrees: BTreeMap<&str, usize> = self
            .edges
            .iter()
            .map(|(name, deps)| (name.as_str(), deps.len()))
            .collect();

        let mut ready: BTreeSet<&str> = in_degrees
            .iter()
            .filter(|&(_, deg)| *deg == 0)
            .map(|(name, _)| *name)
            .collect();
        let mut result = Vec::with_capacity(self.edges.len());

        while let Some(node) = ready.pop_first() {
            result.push(node.to_string());

            if let Some(dependents) = self.reverse_edges.get(node) {
                for dependent in dependents {
                    if let Some(deg) = in_degrees.get_mut(dependent.as_str()) {
                        *deg = deg.saturating_sub(1);
                        if *deg == 0 {
                            ready.insert(dependent.as_str());
                        }
                    }
                }
            }
        }

        if result.len() != self.edges.len() {
            let cycle = self
                .find_cycles()
                .into_iter()
                .next()
                .map(|mut cycle| {
                    if let Some(first) = cycle.first().cloned() {
                        cycle.push(first);
                    }
                    cycle.join(" -> ")
                })
                .unwrap_or_default();
            return Err(Error::CircularDependency(cycle));
        }

        Ok(result)
    }

    /// Group recipes into levels
    ///
    /// Level 0 has no dependencies; every recipe sits one level above its
    /// deepest dependency. Recipes in the same level are independent.
    pub fn levels(&self) -> Result<Vec<Vec<String>>> {
        let order = self.topological_sort()?;
        let mut depth: BTreeMap<&str, usize> = BTreeMap::new();
        let mut levels: Vec<Vec<String>> = Vec::new();

        for name in &order {
            let level = self.edges[name.as_str()]
                .iter()
                .filter_map(|dep| depth.get(dep.as_str()))
                .map(|d| d + 1)
                .max()
                .unwrap_or(0);
            depth.insert(name.as_str(), level);
            if levels.len() <= level {
                levels.resize_with(level + 1, Vec::new);
            }
            levels[level].push(name.clone());
        }

        Ok(levels)
    }

    /// Find all cycles in the graph
    ///
    /// Returns a list of cycles, where each cycle is a list of recipe names.
    pub fn find_cycles(&self) -> Vec<Vec<String>> {
        let mut cycles = Vec::new();
        let mut visited = BTreeSet::new();
        let mut rec_stack = BTreeSet::new();
        let mut path = Vec::new();

        for start in self.edges.keys() {
            if !visited.contains(start) {
                self.find_cycles_dfs(start, &mut visited, &mut rec_stack, &mut path, &mut cycles);
            }
        }

        cycles
    }

    fn find_cycles_dfs(
        &self,
        node: &str,
        visited: &mut BTreeSet<String>,
        rec_stack: &mut BTreeSet<String>,
        path: &mut Vec<String>,
        cycles: &mut Vec<Vec<String>>,
    ) {
        visited.insert(node.to_string());
        rec_stack.insert(node.to_string());
        path.push(node.to_string());

        if let Some(deps) = self.edges.get(node) {
            for dep in deps {
                if !visited.contains(dep) {
                    self.find_cycles_dfs(dep, visited, rec_stack, path, cycles);
                } else if rec_stack.contains(dep) {
                    if let Some(start) = path.iter().position(|x| x == dep) {
                        cycles.push(path[start..].to_vec());
                    }
                }
            }
        }

        path.pop();
        rec_stack.remove(node);
    }

    /// Fewest `requires` edges from `name` to each of its dependencies
    pub fn distances_from(&self, name: &str) -> BTreeMap<String, usize> {
        let mut distances = BTreeMap::new();
        let mut queue: VecDeque<(String, usize)> = VecDeque::new();

        if let Some(direct) = self.edges.get(name) {
            for dep in direct {
                queue.push_back((dep.clone(), 1));
            }
        }

        while let Some((dep, distance)) = queue.pop_front() {
            if distances.contains_key(&dep) {
                continue;
            }
            if let Some(indirect) = self.edges.get(&dep) {
                for next in indirect {
                    if !distances.contains_key(next) {
                        queue.push_back((next.clone(), distance + 1));
                    }
                }
            }
            distances.insert(dep, distance);
        }

        distances
    }

    /// Get all recipes that a given recipe transitively depends on
    pub fn transitive_dependencies(&self, name: &str) -> BTreeSet<String> {
        self.distances_from(name).into_keys().collect()
    }

    /// Get all recipes that transitively depend on a given recipe
    pub fn transitive_dependents(&self, name: &str) -> BTreeSet<String> {
        let mut dependents = BTreeSet::new();
        let mut queue: VecDeque<String> = VecDeque::new();

        if let Some(direct) = self.reverse_edges.get(name) {
            queue.extend(direct.iter().cloned());
        }

        while let Some(dep) = queue.pop_front() {
            if dependents.insert(dep.clone()) {
                if let Some(indirect) = self.reverse_edges.get(&dep) {
                    for ind in indirect {
                        if !dependents.contains(ind) {
                            queue.push_back(ind.clone());
                        }
                    }
                }
            }
        }

        dependents
    }
}
