// src/toolchain/cmake.rs

//! CMake toolchain: `cmake -S/-B`, `cmake --build`, `cmake --install`

use super::command::run_step;
use super::{Toolchain, ToolchainStep};
use crate::error::{Error, Result};
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;
use tracing::info;

/// Default timeout for a single cmake invocation (1 hour)
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(3600);

/// Drives a CMake project
#[derive(Debug, Clone)]
pub struct CMakeToolchain {
    program: PathBuf,
    generator: Option<String>,
    jobs: usize,
    timeout: Duration,
}

impl CMakeToolchain {
    /// Use a specific cmake executable
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            generator: None,
            jobs: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Find cmake on `PATH`
    pub fn discover() -> Result<Self> {
        let program = which::which("cmake")
            .map_err(|e| Error::NotFound(format!("cmake executable: {}", e)))?;
        Ok(Self::new(program))
    }

    pub fn with_generator(mut self, generator: impl Into<String>) -> Self {
        self.generator = Some(generator.into());
        self
    }

    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs.max(1);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Arguments of the configure step
    pub fn configure_args(&self, step: &ToolchainStep<'_>) -> Vec<String> {
        let layout = step.layout;
        let mut args = vec![
            "-S".to_string(),
            path_arg(&layout.source_folder),
            "-B".to_string(),
            path_arg(&layout.build_folder),
        ];

        if let Some(generator) = &self.generator {
            args.push("-G".to_string());
            args.push(generator.clone());
        }
        if let Some(build_type) = step.config.build_type() {
            args.push(format!("-DCMAKE_BUILD_TYPE={}", build_type));
        }
        args.push(format!(
            "-DCMAKE_INSTALL_PREFIX={}",
            path_arg(&layout.package_folder)
        ));
        if step.config.option("shared").is_some() {
            args.push(format!(
                "-DBUILD_SHARED_LIBS={}",
                if step.config.is_shared() { "ON" } else { "OFF" }
            ));
        }
        if let Some(fpic) = step.config.option("fPIC").and_then(|v| v.as_bool()) {
            args.push(format!(
                "-DCMAKE_POSITION_INDEPENDENT_CODE={}",
                if fpic { "ON" } else { "OFF" }
            ));
        }
        if let Some(deps_file) = &step.deps_file {
            args.push(format!("-DCMAKE_PROJECT_INCLUDE={}", path_arg(deps_file)));
        }
        for (key, value) in &step.definitions {
            args.push(format!("-D{}={}", key, value));
        }

        args
    }

    /// Arguments of the build step
    pub fn build_args(&self, step: &ToolchainStep<'_>) -> Vec<String> {
        let mut args = vec!["--build".to_string(), path_arg(&step.layout.build_folder)];
        if let Some(build_type) = step.config.build_type() {
            args.push("--config".to_string());
            args.push(build_type.to_string());
        }
        args.push("--parallel".to_string());
        args.push(self.jobs.to_string());
        if let Some(target) = &step.target {
            args.push("--target".to_string());
            args.push(target.clone());
        }
        args
    }

    /// Arguments of the install step
    pub fn install_args(&self, step: &ToolchainStep<'_>) -> Vec<String> {
        let mut args = vec![
            "--install".to_string(),
            path_arg(&step.layout.build_folder),
            "--prefix".to_string(),
            path_arg(&step.layout.package_folder),
        ];
        if let Some(build_type) = step.config.build_type() {
            args.push("--config".to_string());
            args.push(build_type.to_string());
        }
        args
    }

    fn run(&self, name: &str, args: Vec<String>, step: &ToolchainStep<'_>) -> Result<String> {
        info!("cmake {}", name);
        let mut command = Command::new(&self.program);
        command.args(&args);
        run_step(command, name, self.timeout, step.cancel)
    }
}

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

impl Toolchain for CMakeToolchain {
    fn name(&self) -> &str {
        "cmake"
    }

    fn configure(&self, step: &ToolchainStep<'_>) -> Result<String> {
        self.run("configure", self.configure_args(step), step)
    }

    fn build(&self, step: &ToolchainStep<'_>) -> Result<String> {
        self.run("build", self.build_args(step), step)
    }

    fn install(&self, step: &ToolchainStep<'_>) -> Result<String> {
        self.run("install", self.install_args(step), step)
    }
}
