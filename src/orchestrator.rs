// src/orchestrator.rs

//! Graph driver over a set of loaded recipes
//!
//! Planning validates the `requires` edges, rejects cycles, pushes
//! pattern-scoped option defaults from consumers down to their
//! dependencies, resolves every effective configuration and computes every
//! package id before anything is cooked. Execution walks the graph level by
//! level, cooking independent recipes in parallel and reusing cached
//! packages where the identity is already known.

use crate::error::{Error, Result};
use crate::package_id::{PackageId, PackageIdentity, compute_package_id_with_deps};
use crate::publish::{Dependencies, PublishedPackage};
use crate::recipe::cache::BuildCache;
use crate::recipe::graph::RecipeGraph;
use crate::recipe::kitchen::{Kitchen, LifecycleState};
use crate::recipe::{LoadedRecipe, RecipeRef, validate_recipe};
use crate::settings::{EffectiveConfig, OptionValue, Profile, SettingsSchema};
use rayon::prelude::*;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// One recipe of a plan, fully resolved
#[derive(Debug, Clone)]
pub struct PlannedNode {
    pub recipe: LoadedRecipe,
    pub config: EffectiveConfig,
    pub identity: PackageIdentity,
    /// Nothing in the plan requires this recipe
    pub is_root: bool,
}

impl PlannedNode {
    pub fn reference(&self) -> RecipeRef {
        self.recipe.reference()
    }
}

/// Resolved graph, ready to execute
#[derive(Debug, Clone)]
pub struct BuildPlan {
    graph: RecipeGraph,
    nodes: BTreeMap<String, PlannedNode>,
    order: Vec<String>,
    levels: Vec<Vec<String>>,
}

impl BuildPlan {
    /// Recipe names in build order
    pub fn order(&self) -> &[String] {
        &self.order
    }

    /// Groups of recipes that can be cooked at the same time
    pub fn levels(&self) -> &[Vec<String>] {
        &self.levels
    }

    pub fn node(&self, name: &str) -> Option<&PlannedNode> {
        self.nodes.get(name)
    }

    /// Nodes in build order
    pub fn nodes(&self) -> impl Iterator<Item = &PlannedNode> {
        self.order.iter().filter_map(|name| self.nodes.get(name))
    }

    pub fn graph(&self) -> &RecipeGraph {
        &self.graph
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// What happened to one recipe during execution
#[derive(Debug)]
pub enum NodeStatus {
    /// Cooked through the whole lifecycle
    Built,
    /// Reused a package already published or cached
    Cached,
    /// A lifecycle stage failed
    Failed(Error),
    /// Not attempted because the named dependency did not succeed
    Skipped(String),
}

#[derive(Debug)]
pub struct NodeOutcome {
    pub reference: RecipeRef,
    pub package_id: PackageId,
    pub status: NodeStatus,
    pub package: Option<Arc<PublishedPackage>>,
    /// Lifecycle states of a cook; empty when nothing was cooked
    pub history: Vec<LifecycleState>,
}

impl NodeOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self.status, NodeStatus::Built | NodeStatus::Cached)
    }
}

/// Outcome of every node, in build order
#[derive(Debug, Default)]
pub struct BuildReport {
    pub outcomes: Vec<NodeOutcome>,
}

impl BuildReport {
    pub fn get(&self, name: &str) -> Option<&NodeOutcome> {
        self.outcomes.iter().find(|o| o.reference.name == name)
    }

    pub fn is_success(&self) -> bool {
        self.outcomes.iter().all(NodeOutcome::is_success)
    }

    pub fn failures(&self) -> impl Iterator<Item = &NodeOutcome> {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.status, NodeStatus::Failed(_)))
    }

    pub fn count(&self, f: impl Fn(&NodeStatus) -> bool) -> usize {
        self.outcomes.iter().filter(|o| f(&o.status)).count()
    }
}

/// Plans and executes a recipe graph against one kitchen
pub struct Orchestrator {
    kitchen: Kitchen,
    cache: Option<BuildCache>,
    profile: Profile,
    schema: SettingsSchema,
}

impl Orchestrator {
    pub fn new(kitchen: Kitchen, profile: Profile) -> Self {
        Self {
            kitchen,
            cache: None,
            profile,
            schema: SettingsSchema::default(),
        }
    }

    pub fn with_cache(mut self, cache: BuildCache) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn with_schema(mut self, schema: SettingsSchema) -> Self {
        self.schema = schema;
        self
    }

    pub fn kitchen(&self) -> &Kitchen {
        &self.kitchen
    }

    pub fn profile(&self) -> &Profile {
        &self.profile
    }

    pub fn cache(&self) -> Option<&BuildCache> {
        self.cache.as_ref()
    }

    /// Resolve configurations and identities of a set of recipes
    pub fn plan(&self, recipes: Vec<LoadedRecipe>) -> Result<BuildPlan> {
        let mut by_name: BTreeMap<String, LoadedRecipe> = BTreeMap::new();
        for recipe in recipes {
            for warning in validate_recipe(&recipe.recipe)? {
                debug!("{}: {}", recipe.recipe.package.name, warning);
            }
            let name = recipe.recipe.package.name.clone();
            if by_name.contains_key(&name) {
                return Err(Error::ConfigurationError(format!(
                    "recipe '{}' was given more than once",
                    name
                )));
            }
            by_name.insert(name, recipe);
        }

        let mut graph = RecipeGraph::new();
        for recipe in by_name.values() {
            check_requires(recipe, &by_name)?;
            graph.add_from_recipe(&recipe.recipe);
        }

        let order = graph.topological_sort()?;
        let levels = graph.levels()?;
        let roots: BTreeSet<String> = graph.roots().into_iter().collect();
        let overrides = propagate_overrides(&graph, &by_name)?;

        // Build order puts every dependency's id in place before its consumers
        let mut resolved: BTreeMap<String, (RecipeRef, PackageId)> = BTreeMap::new();
        let mut nodes = BTreeMap::new();
        for name in &order {
            let Some(recipe) = by_name.remove(name) else {
                continue;
            };
            let is_root = roots.contains(name);
            let consumer_overrides = overrides.get(name).cloned().unwrap_or_default();

            let config = EffectiveConfig::resolve(
                &recipe.recipe,
                &self.profile,
                &consumer_overrides,
                is_root,
                &self.schema,
            )?;
            let identity = compute_package_id_with_deps(&recipe, &config, &resolved)?;
            info!("Planned {}:{}", recipe.reference(), identity.id.short());
            resolved.insert(name.clone(), (recipe.reference(), identity.id.clone()));

            nodes.insert(
                name.clone(),
                PlannedNode {
                    recipe,
                    config,
                    identity,
                    is_root,
                },
            );
        }

        Ok(BuildPlan {
            graph,
            nodes,
            order,
            levels,
        })
    }

    /// Cook every node of a plan
    ///
    /// A failure never stops independent nodes; it only skips the recipes
    /// that depend on the failed one.
    pub fn execute(&self, plan: &BuildPlan) -> BuildReport {
        let mut outcomes: BTreeMap<String, NodeOutcome> = BTreeMap::new();

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.kitchen.config().jobs.max(1))
            .build();

        for (depth, level) in plan.levels().iter().enumerate() {
            debug!("Level {}: {}", depth, level.join(", "));

            let run = || {
                level
                    .par_iter()
                    .filter_map(|name| plan.node(name))
                    .map(|node| self.run_node(plan, node, &outcomes))
                    .collect::<Vec<_>>()
            };
            let results = match &pool {
                Ok(pool) => pool.install(run),
                Err(e) => {
                    warn!("Falling back to the global thread pool: {}", e);
                    run()
                }
            };

            for outcome in results {
                outcomes.insert(outcome.reference.name.clone(), outcome);
            }
        }

        let report = BuildReport {
            outcomes: plan
                .order()
                .iter()
                .filter_map(|name| outcomes.remove(name))
                .collect(),
        };

        info!(
            "{} built, {} cached, {} failed, {} skipped",
            report.count(|s| matches!(s, NodeStatus::Built)),
            report.count(|s| matches!(s, NodeStatus::Cached)),
            report.count(|s| matches!(s, NodeStatus::Failed(_))),
            report.count(|s| matches!(s, NodeStatus::Skipped(_))),
        );
        report
    }

    /// Plan and execute
    pub fn build(&self, recipes: Vec<LoadedRecipe>) -> Result<BuildReport> {
        let plan = self.plan(recipes)?;
        Ok(self.execute(&plan))
    }

    fn run_node(
        &self,
        plan: &BuildPlan,
        node: &PlannedNode,
        done: &BTreeMap<String, NodeOutcome>,
    ) -> NodeOutcome {
        let reference = node.reference();
        let outcome = |status, package, history| NodeOutcome {
            reference: reference.clone(),
            package_id: node.identity.id.clone(),
            status,
            package,
            history,
        };

        let dependencies = match collect_dependencies(plan, node, done) {
            Ok(deps) => deps,
            Err(blocked) => {
                warn!("Skipping {}: {} did not build", reference, blocked);
                return outcome(NodeStatus::Skipped(blocked), None, Vec::new());
            }
        };

        let registry = self.kitchen.registry();
        if let Some(package) = registry.get(&reference, &node.identity.id) {
            return outcome(NodeStatus::Cached, Some(package), Vec::new());
        }

        if let Some(package) = self.from_cache(&reference, &node.identity.id) {
            return outcome(NodeStatus::Cached, Some(package), Vec::new());
        }

        match self
            .kitchen
            .cook(&node.recipe, &node.config, &node.identity, &dependencies)
        {
            Ok(result) => {
                if let Some(cache) = &self.cache {
                    if let Err(e) = cache.put(&result.package) {
                        warn!("Failed to cache {}: {}", reference, e);
                    }
                }
                outcome(NodeStatus::Built, Some(result.package), result.history)
            }
            Err(e) => {
                let history = e.history().map(<[_]>::to_vec).unwrap_or_default();
                warn!("{}", e);
                outcome(NodeStatus::Failed(e), None, history)
            }
        }
    }

    fn from_cache(
        &self,
        reference: &RecipeRef,
        id: &PackageId,
    ) -> Option<Arc<PublishedPackage>> {
        let cache = self.cache.as_ref()?;
        let entry = match cache.get(reference, id) {
            Ok(entry) => entry?,
            Err(e) => {
                warn!("Cache lookup failed for {}: {}", reference, e);
                return None;
            }
        };

        let registry = self.kitchen.registry();
        match registry.publish(entry.package) {
            Ok(package) => Some(package),
            Err(Error::AlreadyPublished { .. }) => registry.get(reference, id),
            Err(e) => {
                warn!("Failed to publish cached {}: {}", reference, e);
                None
            }
        }
    }
}

/// Every requirement must name a loaded recipe with a matching reference
fn check_requires(
    recipe: &LoadedRecipe,
    by_name: &BTreeMap<String, LoadedRecipe>,
) -> Result<()> {
    let reference = recipe.reference();
    for required in &recipe.recipe.package.requires {
        let Some(provider) = by_name.get(&required.name) else {
            return Err(Error::NotFound(format!(
                "{} requires {}, which is not among the loaded recipes",
                reference, required
            )));
        };
        let provided = provider.reference();
        if !required.is_satisfied_by(&provided) {
            return Err(Error::ConfigurationError(format!(
                "{} requires {}, but {} was loaded",
                reference, required, provided
            )));
        }
    }
    Ok(())
}

/// Reduce every consumer's scoped defaults to one value per dependency option
///
/// The nearest consumer wins; at equal distance the lexically smaller
/// consumer reference wins. The profile is applied later and beats both.
fn propagate_overrides(
    graph: &RecipeGraph,
    by_name: &BTreeMap<String, LoadedRecipe>,
) -> Result<BTreeMap<String, BTreeMap<String, OptionValue>>> {
    type Candidate = (usize, String, OptionValue);
    let mut candidates: BTreeMap<String, BTreeMap<String, Candidate>> = BTreeMap::new();

    for (consumer_name, consumer) in by_name {
        let scoped = consumer.recipe.scoped_defaults()?;
        if scoped.is_empty() {
            continue;
        }
        let consumer_ref = consumer.reference().to_string();

        for (dep_name, distance) in graph.distances_from(consumer_name) {
            let Some(dependency) = by_name.get(&dep_name) else {
                continue;
            };
            let dep_ref = dependency.reference();

            for option in scoped.iter().filter(|s| s.matches(&dep_ref)) {
                let key = (distance, consumer_ref.clone());
                let slot = candidates
                    .entry(dep_name.clone())
                    .or_default()
                    .entry(option.option.clone());
                slot.and_modify(|current| {
                    if key < (current.0, current.1.clone()) {
                        *current = (key.0, key.1.clone(), option.value.clone());
                    }
                })
                .or_insert_with(|| (distance, consumer_ref.clone(), option.value.clone()));
            }
        }
    }

    Ok(candidates
        .into_iter()
        .map(|(dep, options)| {
            let resolved = options
                .into_iter()
                .map(|(option, (distance, consumer, value))| {
                    debug!(
                        "{}: {}={} from {} ({} edge(s))",
                        dep, option, value, consumer, distance
                    );
                    (option, value)
                })
                .collect();
            (dep, resolved)
        })
        .collect())
}

/// Published packages a node needs, or the name of the first blocker
///
/// Direct requirements come in declaration order. Indirect ones follow in
/// reverse build order so every package precedes what it links against.
fn collect_dependencies(
    plan: &BuildPlan,
    node: &PlannedNode,
    done: &BTreeMap<String, NodeOutcome>,
) -> std::result::Result<Dependencies, String> {
    let name = &node.recipe.recipe.package.name;
    let published = |dep: &str| -> std::result::Result<Arc<PublishedPackage>, String> {
        done.get(dep)
            .and_then(|o| o.package.clone())
            .ok_or_else(|| dep.to_string())
    };

    let mut deps = Dependencies::default();
    let mut direct_names = BTreeSet::new();
    for required in &node.recipe.recipe.package.requires {
        deps.direct.push(published(&required.name)?);
        direct_names.insert(required.name.clone());
    }

    let closure = plan.graph().transitive_dependencies(name);
    for dep in plan.order().iter().rev() {
        if closure.contains(dep) && !direct_names.contains(dep) {
            deps.transitive.push(published(dep)?);
        }
    }

    Ok(deps)
}
