// src/toolchain/generate.rs

//! Dependency information file for the native build
//!
//! Writes `pantry_deps.cmake` into the generators folder. The CMake
//! toolchain injects it with `CMAKE_PROJECT_INCLUDE`, so a project can use
//! `PANTRY_INCLUDE_DIRS`, `PANTRY_LIBS` and per-package variables such as
//! `PANTRY_GLAD_LIBS` without probing the filesystem.

use crate::error::{Error, Result};
use crate::publish::Dependencies;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use tracing::debug;

/// File name of the generated dependency file
pub const DEPS_FILE_NAME: &str = "pantry_deps.cmake";

/// Write the dependency file into `dir`
pub fn write_dependency_file(dir: &Path, deps: &Dependencies) -> Result<PathBuf> {
    std::fs::create_dir_all(dir).map_err(|e| Error::layout(dir, e.to_string()))?;

    let path = dir.join(DEPS_FILE_NAME);
    let content = render(deps);
    std::fs::write(&path, content)
        .map_err(|e| Error::IoError(format!("Failed to write {}: {}", path.display(), e)))?;

    debug!("Wrote {}", path.display());
    Ok(path)
}

/// Render the CMake dependency file
pub fn render(deps: &Dependencies) -> String {
    let agg = deps.aggregate();
    let mut out = String::from("# Generated by pantry. Do not edit.\n\n");

    for package in deps.iter() {
        let var = variable_name(&package.reference.name);
        let info = &package.cpp_info;
        let _ = writeln!(out, "# {} ({})", package.reference, package.link_kind);
        let _ = writeln!(
            out,
            "set(PANTRY_{}_ROOT {})",
            var,
            quote(&cmake_path(&package.package_folder))
        );
        set_list(
            &mut out,
            &format!("PANTRY_{}_INCLUDE_DIRS", var),
            cmake_paths(&package.include_paths()),
        );
        set_list(
            &mut out,
            &format!("PANTRY_{}_LIB_DIRS", var),
            cmake_paths(&package.lib_paths()),
        );
        set_list(&mut out, &format!("PANTRY_{}_LIBS", var), info.libs.iter().cloned());
        set_list(
            &mut out,
            &format!("PANTRY_{}_DEFINITIONS", var),
            info.defines.iter().cloned(),
        );
        out.push('\n');
    }

    set_list(&mut out, "PANTRY_INCLUDE_DIRS", cmake_paths(&agg.include_paths));
    set_list(&mut out, "PANTRY_LIB_DIRS", cmake_paths(&agg.lib_paths));
    set_list(&mut out, "PANTRY_BIN_DIRS", cmake_paths(&agg.bin_paths));
    set_list(&mut out, "PANTRY_LIBS", agg.libs.iter().cloned());
    set_list(&mut out, "PANTRY_SYSTEM_LIBS", agg.system_libs.iter().cloned());
    set_list(&mut out, "PANTRY_DEFINITIONS", agg.defines.iter().cloned());
    set_list(&mut out, "PANTRY_C_FLAGS", agg.cflags.iter().cloned());
    set_list(&mut out, "PANTRY_CXX_FLAGS", agg.cxxflags.iter().cloned());
    set_list(
        &mut out,
        "PANTRY_SHARED_LINK_FLAGS",
        agg.sharedlinkflags.iter().cloned(),
    );
    set_list(&mut out, "PANTRY_EXE_LINK_FLAGS", agg.exelinkflags.iter().cloned());

    let roots: Vec<String> = deps
        .iter()
        .map(|p| quote(&cmake_path(&p.package_folder)))
        .collect();
    if !roots.is_empty() {
        let _ = writeln!(out, "list(PREPEND CMAKE_PREFIX_PATH {})", roots.join(" "));
    }

    out
}

fn set_list(out: &mut String, name: &str, values: impl IntoIterator<Item = String>) {
    let quoted: Vec<String> = values.into_iter().map(|v| quote(&v)).collect();
    if quoted.is_empty() {
        let _ = writeln!(out, "set({} \"\")", name);
    } else {
        let _ = writeln!(out, "set({} {})", name, quoted.join(" "));
    }
}

/// Path with forward slashes, which CMake accepts on every platform
fn cmake_path(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

fn cmake_paths(paths: &[PathBuf]) -> Vec<String> {
    paths.iter().map(|p| cmake_path(p)).collect()
}

/// Quote a value as a CMake argument
fn quote(value: &str) -> String {
    let escaped = value
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('$', "\\$");
    format!("\"{}\"", escaped)
}

/// `fastnoise-lite` -> `FASTNOISE_LITE`
fn variable_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_uppercase()
            } else {
                '_'
            }
        })
        .collect()
}
