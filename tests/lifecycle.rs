// tests/lifecycle.rs

//! Cooking single recipes through the kitchen: stage order, packaging,
//! failures and cancellation.

mod common;

use common::{Script, ScriptedToolchain, Workspace, files_under, linux_profile};
use pantry::recipe::kitchen::{PACKAGE_INFO_FILE, PACKAGE_MANIFEST_FILE};
use pantry::{
    Dependencies, EffectiveConfig, Error, Folders, LifecycleState, LoadedRecipe, SettingsSchema,
    Stage, compute_package_id,
};
use std::collections::BTreeMap;
use std::fs;
use std::thread;
use std::time::Duration;

fn resolve(recipe: &LoadedRecipe, build_type: &str) -> EffectiveConfig {
    EffectiveConfig::resolve(
        &recipe.recipe,
        &linux_profile(build_type),
        &BTreeMap::new(),
        true,
        &SettingsSchema::default(),
    )
    .unwrap()
}

#[test]
fn test_cook_library_through_every_stage() {
    let ws = Workspace::new();
    let toolchain = ScriptedToolchain::new();
    let kitchen = ws.kitchen(toolchain.clone());
    let glad = ws.glad();
    let config = resolve(&glad, "Release");
    let identity = compute_package_id(&glad, &config).unwrap();

    let result = kitchen
        .cook(&glad, &config, &identity, &Dependencies::default())
        .unwrap();

    assert_eq!(
        result.history,
        vec![
            LifecycleState::Declared,
            LifecycleState::LaidOut,
            LifecycleState::Configured,
            LifecycleState::Built,
            LifecycleState::Packaged,
            LifecycleState::Published,
        ]
    );
    assert_eq!(
        toolchain.calls(),
        vec!["configure:glad", "build:glad", "install:glad"]
    );

    let package = &result.package;
    assert_eq!(package.cpp_info.libs, vec!["glad"]);
    assert_eq!(
        files_under(&package.package_folder),
        vec![
            "include/glad/gl.h",
            "lib/libglad.a",
            PACKAGE_INFO_FILE,
            PACKAGE_MANIFEST_FILE,
        ]
    );

    let info = fs::read_to_string(package.package_folder.join(PACKAGE_INFO_FILE)).unwrap();
    assert!(info.starts_with("[reference]\nglad/2.0.8@local\n[package_id]\n"));
    assert!(info.contains("build_type=Release"));
    assert!(info.contains("shared=false"));

    // cmake layout: build folder named after the build type
    assert!(result.layout.build_folder.ends_with("build/Release"));
    assert!(result.layout.generators_folder.ends_with("build/Release/generators"));
    assert!(
        result
            .layout
            .generators_folder
            .join(pantry::toolchain::DEPS_FILE_NAME)
            .exists()
    );

    assert!(
        kitchen
            .registry()
            .get(&glad.reference(), &identity.id)
            .is_some()
    );
}

#[test]
fn test_header_library_skips_toolchain() {
    let ws = Workspace::new();
    let toolchain = ScriptedToolchain::new();
    let kitchen = ws.kitchen(toolchain.clone());
    let fastnoise = ws.fastnoise();
    let config = resolve(&fastnoise, "Debug");
    let identity = compute_package_id(&fastnoise, &config).unwrap();

    let result = kitchen
        .cook(&fastnoise, &config, &identity, &Dependencies::default())
        .unwrap();

    assert!(toolchain.calls().is_empty());
    assert!(!result.layout.has_build_root());
    // no_copy_source: building straight from the exports
    assert_eq!(result.layout.source_root, result.layout.export_sources);
    assert!(
        result
            .package
            .package_folder
            .join("include/FastNoiseLite.h")
            .exists()
    );
    assert_eq!(result.package.link_kind, pantry::LinkKind::HeaderOnly);
    assert!(result.package.cpp_info.libs.is_empty());
    assert_eq!(result.package.cpp_info.includedirs, vec!["include"]);
}

#[test]
fn test_build_failure_publishes_nothing() {
    let ws = Workspace::new();
    let toolchain = ScriptedToolchain::new();
    toolchain.on("glad", "build", Script::Fail);
    let kitchen = ws.kitchen(toolchain.clone());
    let glad = ws.glad();
    let config = resolve(&glad, "Release");
    let identity = compute_package_id(&glad, &config).unwrap();

    let err = kitchen
        .cook(&glad, &config, &identity, &Dependencies::default())
        .unwrap_err();

    assert_eq!(err.stage(), Some(Stage::Build));
    assert!(matches!(err.root_cause(), Error::BuildFailure(_)));
    assert_eq!(err.history().unwrap().last(), Some(&LifecycleState::Failed));
    assert!(!err.history().unwrap().contains(&LifecycleState::Built));

    // No later hook ran
    assert_eq!(toolchain.calls(), vec!["configure:glad", "build:glad"]);
    assert!(kitchen.registry().is_empty());
}

#[test]
fn test_package_failure_publishes_nothing() {
    let ws = Workspace::new();
    let toolchain = ScriptedToolchain::new();
    toolchain.on("glad", "install", Script::Fail);
    let kitchen = ws.kitchen(toolchain);
    let glad = ws.glad();
    let config = resolve(&glad, "Release");
    let identity = compute_package_id(&glad, &config).unwrap();

    let err = kitchen
        .cook(&glad, &config, &identity, &Dependencies::default())
        .unwrap_err();

    assert_eq!(err.stage(), Some(Stage::Package));
    assert_eq!(
        err.history().unwrap(),
        &[
            LifecycleState::Declared,
            LifecycleState::LaidOut,
            LifecycleState::Configured,
            LifecycleState::Built,
            LifecycleState::Failed,
        ]
    );
    assert!(kitchen.registry().get(&glad.reference(), &identity.id).is_none());
}

#[test]
fn test_required_copy_rule_without_match_fails_packaging() {
    let ws = Workspace::new();
    let kitchen = ws.kitchen(ScriptedToolchain::new());
    // No FastNoiseLite.h among the exported sources
    let fastnoise = ws.recipe(
        "fastnoise-lite",
        common::FASTNOISE_RECIPE,
        &[("include/Other.h", "")],
    );
    let config = resolve(&fastnoise, "Release");
    let identity = compute_package_id(&fastnoise, &config).unwrap();

    let err = kitchen
        .cook(&fastnoise, &config, &identity, &Dependencies::default())
        .unwrap_err();
    assert_eq!(err.stage(), Some(Stage::Package));
    assert!(matches!(err.root_cause(), Error::PackagingFailure(_)));
}

#[test]
fn test_cook_twice_is_already_published() {
    let ws = Workspace::new();
    let kitchen = ws.kitchen(ScriptedToolchain::new());
    let glad = ws.glad();
    let config = resolve(&glad, "Release");
    let identity = compute_package_id(&glad, &config).unwrap();

    kitchen
        .cook(&glad, &config, &identity, &Dependencies::default())
        .unwrap();
    let err = kitchen
        .cook(&glad, &config, &identity, &Dependencies::default())
        .unwrap_err();
    assert!(matches!(err, Error::AlreadyPublished { .. }));
    assert_eq!(kitchen.registry().len(), 1);
}

#[test]
fn test_cancel_kills_running_step() {
    let ws = Workspace::new();
    let toolchain = ScriptedToolchain::new();
    toolchain.on("glad", "build", Script::WaitForCancel);
    let kitchen = ws.kitchen(toolchain);
    let glad = ws.glad();
    let config = resolve(&glad, "Release");
    let identity = compute_package_id(&glad, &config).unwrap();
    let cancel = kitchen.cancel_token();

    let err = thread::scope(|s| {
        let cook = s.spawn(|| kitchen.cook(&glad, &config, &identity, &Dependencies::default()));
        thread::sleep(Duration::from_millis(50));
        cancel.cancel();
        cook.join().unwrap()
    })
    .unwrap_err();

    assert_eq!(err.stage(), Some(Stage::Build));
    assert!(matches!(err.root_cause(), Error::Cancelled));
    assert_eq!(err.history().unwrap().last(), Some(&LifecycleState::Failed));
    assert!(kitchen.registry().is_empty());
}

#[test]
fn test_cancelled_before_start_runs_nothing() {
    let ws = Workspace::new();
    let toolchain = ScriptedToolchain::new();
    let kitchen = ws.kitchen(toolchain.clone());
    let glad = ws.glad();
    let config = resolve(&glad, "Release");
    let identity = compute_package_id(&glad, &config).unwrap();

    kitchen.cancel_token().cancel();
    let err = kitchen
        .cook(&glad, &config, &identity, &Dependencies::default())
        .unwrap_err();

    assert_eq!(err.stage(), Some(Stage::Layout));
    assert_eq!(
        err.history().unwrap(),
        &[LifecycleState::Declared, LifecycleState::Failed]
    );
    assert!(toolchain.calls().is_empty());
}

#[test]
fn test_layout_resolution_is_idempotent() {
    let ws = Workspace::new();
    let kitchen = ws.kitchen(ScriptedToolchain::new());
    let glad = ws.glad();
    let config = resolve(&glad, "Debug");
    let identity = compute_package_id(&glad, &config).unwrap();
    let resolver = kitchen.layout_resolver();

    let mut folders = Folders::default();
    glad.hooks.layout(&mut folders, &config).unwrap();

    let first = resolver.resolve(&glad.recipe, &identity.id, &folders).unwrap();
    fs::write(first.source_folder.join("keep.txt"), "x").unwrap();
    let second = resolver.resolve(&glad.recipe, &identity.id, &folders).unwrap();

    assert_eq!(first, second);
    assert!(second.source_folder.join("keep.txt").exists());
    assert!(first.base.starts_with(ws.root().join("p/glad/2.0.8/local/_")));
    assert!(first.build_folder.ends_with("build/Debug"));
}

#[test]
fn test_different_identities_use_disjoint_layouts() {
    let ws = Workspace::new();
    let kitchen = ws.kitchen(ScriptedToolchain::new());
    let glad = ws.glad();

    let release = resolve(&glad, "Release");
    let debug = resolve(&glad, "Debug");
    let release_id = compute_package_id(&glad, &release).unwrap();
    let debug_id = compute_package_id(&glad, &debug).unwrap();

    let a = kitchen
        .cook(&glad, &release, &release_id, &Dependencies::default())
        .unwrap();
    let b = kitchen
        .cook(&glad, &debug, &debug_id, &Dependencies::default())
        .unwrap();

    assert_ne!(a.layout.base, b.layout.base);
    assert_ne!(a.package.package_folder, b.package.package_folder);
    assert_eq!(kitchen.registry().len(), 2);
}

#[test]
fn test_removed_source_is_not_exported_again() {
    let ws = Workspace::new();
    let kitchen = ws.kitchen(ScriptedToolchain::new());
    let glad = ws.glad();
    let release = resolve(&glad, "Release");
    let release_id = compute_package_id(&glad, &release).unwrap();
    let first = kitchen
        .cook(&glad, &release, &release_id, &Dependencies::default())
        .unwrap();
    assert!(first.layout.source_root.join("src/gl.c").exists());

    let recipe_dir = ws.temp.path().join("recipes/glad");
    fs::remove_file(recipe_dir.join("src/gl.c")).unwrap();
    let glad = LoadedRecipe::from_file(&recipe_dir).unwrap();

    let debug = resolve(&glad, "Debug");
    let debug_id = compute_package_id(&glad, &debug).unwrap();
    let second = kitchen
        .cook(&glad, &debug, &debug_id, &Dependencies::default())
        .unwrap();

    assert!(second.layout.source_root.join("CMakeLists.txt").exists());
    assert!(!second.layout.source_root.join("src/gl.c").exists());
    assert!(!second.layout.export_sources.join("src/gl.c").exists());
}
