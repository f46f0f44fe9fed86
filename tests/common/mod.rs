// tests/common/mod.rs

//! Shared test utilities and helpers for integration tests.

#![allow(dead_code)]

use pantry::toolchain::{DEPS_FILE_NAME, ToolchainStep};
use pantry::{Error, Kitchen, KitchenConfig, Layout, LoadedRecipe, Profile, Result, Toolchain};
use parking_lot::Mutex;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tempfile::TempDir;

pub const GLAD_RECIPE: &str = r#"
[package]
name = "glad"
version = "2.0.8"
user = "local"
license = "MIT"
url = "https://github.com/Dav1dde/glad"
type = "library"
settings = ["os", "arch", "compiler", "build_type"]
exports_sources = ["CMakeLists.txt", "src/*", "include/*"]

[options]
shared = [true, false]

[default_options]
shared = false

[layout]
cmake = true

[build]

[packaging]
install = true

[[packaging.copy]]
pattern = "*.h"
from = "source"
src = "include"
dst = "include"

[package_info]
libs = ["glad"]
"#;

pub const FASTNOISE_RECIPE: &str = r#"
[package]
name = "fastnoise-lite"
version = "1.1.1"
user = "local"
license = "MIT"
url = "https://github.com/Auburn/FastNoiseLite"
type = "header-library"
settings = ["os", "compiler", "build_type", "arch"]
exports_sources = ["include/*"]
no_copy_source = true

[[packaging.copy]]
pattern = "FastNoiseLite.h"
from = "source"
src = "include"
dst = "include"
required = true

[package_id]
clear = true
"#;

pub const MINECRAFT_RECIPE: &str = r#"
[package]
name = "minecraft"
version = "0.1"
license = "MIT"
url = "https://example.invalid/minecraft"
type = "application"
settings = ["os", "compiler", "build_type", "arch"]
requires = ["fastnoise-lite/1.1.1@local", "glad/2.0.8@local"]
exports_sources = ["CMakeLists.txt", "src/*"]

[default_options]
"glad/*:shared" = false
"glfw/*:shared" = false

[layout]
cmake = true

[build]

[packaging]
install = true
"#;

/// Host-independent Linux/gcc profile
pub fn linux_profile(build_type: &str) -> Profile {
    Profile::default()
        .with_setting("os", "Linux")
        .with_setting("arch", "x86_64")
        .with_setting("compiler", "gcc")
        .with_setting("compiler.version", "13")
        .with_setting("build_type", build_type)
}

/// A recipes directory plus a pantry root, both removed on drop
pub struct Workspace {
    pub temp: TempDir,
}

impl Workspace {
    pub fn new() -> Self {
        Self {
            temp: tempfile::tempdir().unwrap(),
        }
    }

    pub fn root(&self) -> PathBuf {
        self.temp.path().join("pantry")
    }

    /// Write a recipe with its source files and load it
    pub fn recipe(&self, name: &str, toml: &str, sources: &[(&str, &str)]) -> LoadedRecipe {
        let dir = self.temp.path().join("recipes").join(name);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("recipe.toml"), toml).unwrap();
        for (path, content) in sources {
            let file = dir.join(path);
            fs::create_dir_all(file.parent().unwrap()).unwrap();
            fs::write(file, content).unwrap();
        }
        LoadedRecipe::from_file(&dir).unwrap()
    }

    pub fn glad(&self) -> LoadedRecipe {
        self.recipe(
            "glad",
            GLAD_RECIPE,
            &[
                ("CMakeLists.txt", "project(glad C)\n"),
                ("src/gl.c", "int glad_loaded = 1;\n"),
                ("include/glad/gl.h", "#pragma once\n"),
            ],
        )
    }

    pub fn fastnoise(&self) -> LoadedRecipe {
        self.recipe(
            "fastnoise-lite",
            FASTNOISE_RECIPE,
            &[("include/FastNoiseLite.h", "// FastNoiseLite\n")],
        )
    }

    pub fn minecraft(&self) -> LoadedRecipe {
        self.recipe(
            "minecraft",
            MINECRAFT_RECIPE,
            &[
                ("CMakeLists.txt", "project(minecraft CXX)\n"),
                ("src/main.cpp", "int main() { return 0; }\n"),
            ],
        )
    }

    pub fn kitchen(&self, toolchain: Arc<ScriptedToolchain>) -> Kitchen {
        let mut config = KitchenConfig::with_root(self.root());
        config.jobs = 2;
        Kitchen::new(config, toolchain)
    }
}

/// What the scripted toolchain should do on one step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Script {
    Succeed,
    Fail,
    /// Block until the cook is cancelled
    WaitForCancel,
}

/// A toolchain that never runs a process
///
/// `install` writes a header and a static library named after the recipe
/// into the package folder. Every call is recorded.
#[derive(Default)]
pub struct ScriptedToolchain {
    scripts: Mutex<Vec<(String, String, Script)>>,
    calls: Mutex<Vec<String>>,
    deps_files: Mutex<Vec<(String, String)>>,
}

impl ScriptedToolchain {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Script `step` ("configure", "build" or "install") for one recipe
    pub fn on(&self, recipe: &str, step: &str, script: Script) {
        self.scripts
            .lock()
            .push((recipe.to_string(), step.to_string(), script));
    }

    /// Calls as `step:recipe`, in order
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    /// Contents of the dependency file seen at configure time of a recipe
    pub fn deps_file(&self, recipe: &str) -> Option<String> {
        self.deps_files
            .lock()
            .iter()
            .find(|(name, _)| name == recipe)
            .map(|(_, content)| content.clone())
    }

    fn run(&self, step_name: &str, step: &ToolchainStep<'_>) -> Result<String> {
        let recipe = recipe_name(step.layout);
        self.calls.lock().push(format!("{}:{}", step_name, recipe));

        let script = self
            .scripts
            .lock()
            .iter()
            .find(|(r, s, _)| *r == recipe && s == step_name)
            .map(|(_, _, script)| *script)
            .unwrap_or(Script::Succeed);

        match script {
            Script::Succeed => Ok(format!("{} {} ok", step_name, recipe)),
            Script::Fail => Err(Error::BuildFailure(format!(
                "{} of {} exited with status 1",
                step_name, recipe
            ))),
            Script::WaitForCancel => {
                while !step.cancel.is_cancelled() {
                    thread::sleep(Duration::from_millis(10));
                }
                Err(Error::Cancelled)
            }
        }
    }
}

impl Toolchain for ScriptedToolchain {
    fn name(&self) -> &str {
        "cmake"
    }

    fn configure(&self, step: &ToolchainStep<'_>) -> Result<String> {
        if let Some(path) = &step.deps_file {
            let content = fs::read_to_string(path)?;
            self.deps_files
                .lock()
                .push((recipe_name(step.layout), content));
        }
        self.run("configure", step)
    }

    fn build(&self, step: &ToolchainStep<'_>) -> Result<String> {
        let output = self.run("build", step)?;
        fs::create_dir_all(&step.layout.build_folder)?;
        fs::write(step.layout.build_folder.join("built.stamp"), "ok")?;
        Ok(output)
    }

    fn install(&self, step: &ToolchainStep<'_>) -> Result<String> {
        let output = self.run("install", step)?;
        let recipe = recipe_name(step.layout);
        let package = &step.layout.package_folder;
        fs::create_dir_all(package.join("lib"))?;
        fs::write(package.join("lib").join(format!("lib{}.a", recipe)), "!<arch>\n")?;
        Ok(output)
    }
}

/// Recipe name of a layout: `<root>/p/<name>/...`
pub fn recipe_name(layout: &Layout) -> String {
    let mut components = layout.base.components().map(|c| c.as_os_str().to_string_lossy());
    while let Some(component) = components.next() {
        if component == "p" {
            if let Some(name) = components.next() {
                return name.into_owned();
            }
        }
    }
    String::new()
}

/// Relative file paths below a directory, sorted
pub fn files_under(dir: &Path) -> Vec<String> {
    let mut files: Vec<String> = walkdir::WalkDir::new(dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| {
            e.path()
                .strip_prefix(dir)
                .unwrap()
                .to_string_lossy()
                .replace('\\', "/")
        })
        .collect();
    files.sort();
    files
}
