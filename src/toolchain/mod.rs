// src/toolchain/mod.rs

//! Toolchain boundary
//!
//! The lifecycle only talks to the native build through the
//! configure / build / install triad of [`Toolchain`]. [`CMakeToolchain`]
//! is the default implementation; tests substitute a scripted one.

mod cmake;
mod command;
mod copy;
mod generate;

pub use cmake::CMakeToolchain;
pub use command::run_step;
pub use copy::{CopyRoot, CopyRule, copy_files};
pub use generate::{DEPS_FILE_NAME, render as render_dependency_file, write_dependency_file};

use crate::error::Result;
use crate::layout::Layout;
use crate::recipe::kitchen::CancelToken;
use crate::settings::EffectiveConfig;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Everything a toolchain step needs to know about one package identity
#[derive(Debug, Clone)]
pub struct ToolchainStep<'a> {
    pub layout: &'a Layout,
    pub config: &'a EffectiveConfig,
    /// Extra `-D` definitions, already substituted
    pub definitions: BTreeMap<String, String>,
    /// Build only this target
    pub target: Option<String>,
    /// Generated dependency file, if one was written
    pub deps_file: Option<PathBuf>,
    pub cancel: &'a CancelToken,
}

impl<'a> ToolchainStep<'a> {
    pub fn new(layout: &'a Layout, config: &'a EffectiveConfig, cancel: &'a CancelToken) -> Self {
        Self {
            layout,
            config,
            definitions: BTreeMap::new(),
            target: None,
            deps_file: None,
            cancel,
        }
    }
}

/// A native build system driven through configure, build and install
///
/// Each method returns the captured output of the step.
pub trait Toolchain: Send + Sync {
    fn name(&self) -> &str;

    fn configure(&self, step: &ToolchainStep<'_>) -> Result<String>;

    fn build(&self, step: &ToolchainStep<'_>) -> Result<String>;

    /// Install build artifacts into the layout's package folder
    fn install(&self, step: &ToolchainStep<'_>) -> Result<String>;
}
