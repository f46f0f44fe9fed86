// src/layout.rs

//! Per-identity directory layout
//!
//! Every (recipe, package id) pair owns a directory under the pantry root:
//!
//! ```text
//! <root>/e/<name>/<version>/sources                  exported sources
//! <root>/p/<name>/<version>/<id[..16]>/source        per-build source copy
//! <root>/p/<name>/<version>/<id[..16]>/build         build root
//! <root>/p/<name>/<version>/<id[..16]>/package       package root
//! ```
//!
//! References pinned with `@user/channel` add `<user>/<channel>` after the
//! version. Header libraries get no build root, and `no_copy_source`
//! recipes read straight from the exported sources. The exports of a
//! reference are guarded by their own lock file next to `sources`.

use crate::error::{Error, Result};
use crate::hash::sha256_file;
use crate::package_id::PackageId;
use crate::recipe::{Recipe, RecipeRef};
use crate::settings::EffectiveConfig;
use crate::toolchain::copy_files;
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::path::{Component, Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Placeholder for a missing version, user or channel segment
const NO_SEGMENT: &str = "_";

/// Lock file name inside an identity or exports directory
const LOCK_FILE: &str = ".lock";

/// Folders a recipe's `layout` hook places below the layout roots
///
/// All paths are relative. Empty paths mean the root itself.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Folders {
    pub source: PathBuf,
    pub build: PathBuf,
    pub generators: PathBuf,
}

impl Folders {
    /// CMake convention: `<build_type>` and `<build_type>/generators`
    pub fn cmake(config: &EffectiveConfig) -> Self {
        let build = PathBuf::from(config.build_type().unwrap_or("build"));
        Self {
            source: PathBuf::new(),
            generators: build.join("generators"),
            build,
        }
    }

    fn validate(&self) -> Result<()> {
        for folder in [&self.source, &self.build, &self.generators] {
            let escapes = folder.components().any(|c| {
                matches!(
                    c,
                    Component::ParentDir | Component::RootDir | Component::Prefix(_)
                )
            });
            if escapes {
                return Err(Error::layout(
                    folder,
                    "layout folders must be relative and stay inside their root",
                ));
            }
        }
        Ok(())
    }
}

/// Absolute directories of one package identity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    /// Identity directory holding the roots and the lock file
    pub base: PathBuf,
    pub export_sources: PathBuf,
    pub source_root: PathBuf,
    /// Aliases the source root for header libraries
    pub build_root: PathBuf,
    pub source_folder: PathBuf,
    pub build_folder: PathBuf,
    pub generators_folder: PathBuf,
    pub package_folder: PathBuf,
    /// Sources are copied from the exports into the source root
    pub copy_source: bool,
}

impl Layout {
    /// Check if the build root is separate from the source root
    pub fn has_build_root(&self) -> bool {
        self.build_root != self.source_root
    }
}

/// Maps recipes and identities onto directories under a root
#[derive(Debug, Clone)]
pub struct LayoutResolver {
    root: PathBuf,
}

impl LayoutResolver {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory of exported sources for a reference
    pub fn exports_dir(&self, reference: &RecipeRef) -> PathBuf {
        self.reference_dir("e", reference).join("sources")
    }

    /// Identity directory for a reference and package id
    pub fn identity_dir(&self, reference: &RecipeRef, id: &PackageId) -> PathBuf {
        self.reference_dir("p", reference).join(id.short())
    }

    fn reference_dir(&self, kind: &str, reference: &RecipeRef) -> PathBuf {
        let mut dir = self
            .root
            .join(kind)
            .join(&reference.name)
            .join(reference.version.as_deref().unwrap_or(NO_SEGMENT));
        if let Some(user) = &reference.user {
            dir = dir
                .join(user)
                .join(reference.channel.as_deref().unwrap_or(NO_SEGMENT));
        }
        dir
    }

    /// Compute the layout without touching the filesystem
    pub fn plan(&self, recipe: &Recipe, id: &PackageId, folders: &Folders) -> Result<Layout> {
        folders.validate()?;

        let reference = recipe.reference();
        let base = self.identity_dir(&reference, id);
        let export_sources = self.exports_dir(&reference);

        let copy_source = !recipe.package.no_copy_source;
        let source_root = if copy_source {
            base.join("source")
        } else {
            export_sources.clone()
        };
        let build_root = if recipe.is_header_only() {
            source_root.clone()
        } else {
            base.join("build")
        };

        Ok(Layout {
            source_folder: join_folder(&source_root, &folders.source),
            build_folder: join_folder(&build_root, &folders.build),
            generators_folder: join_folder(&build_root, &folders.generators),
            package_folder: base.join("package"),
            base,
            export_sources,
            source_root,
            build_root,
            copy_source,
        })
    }

    /// Compute the layout and create its directories
    ///
    /// Existing directories and their contents are left untouched.
    pub fn resolve(&self, recipe: &Recipe, id: &PackageId, folders: &Folders) -> Result<Layout> {
        let layout = self.plan(recipe, id, folders)?;

        let mut dirs = vec![
            &layout.base,
            &layout.export_sources,
            &layout.source_folder,
            &layout.package_folder,
        ];
        if layout.has_build_root() {
            dirs.push(&layout.build_folder);
            dirs.push(&layout.generators_folder);
        }
        for dir in dirs {
            fs::create_dir_all(dir).map_err(|e| Error::layout(dir, e))?;
        }

        debug!(
            "Layout for {}: source={} build={} package={}",
            recipe.reference(),
            layout.source_folder.display(),
            layout.build_folder.display(),
            layout.package_folder.display()
        );
        Ok(layout)
    }

    /// Copy the recipe's `exports_sources` from `recipe_dir` into the exports directory
    ///
    /// The exports are staged next to the live directory and swapped in
    /// under the exports lock, so files dropped from the recipe disappear
    /// from later builds. Unchanged exports are left in place. Returns the
    /// number of files exported.
    pub fn export_sources(&self, recipe: &Recipe, recipe_dir: Option<&Path>) -> Result<usize> {
        let reference = recipe.reference();
        let dest = self.exports_dir(&reference);
        let _lock = self.lock_exports(&reference, true)?;

        let Some(recipe_dir) = recipe_dir else {
            if !recipe.package.exports_sources.is_empty() {
                warn!(
                    "{}: exports_sources declared but recipe has no directory",
                    reference
                );
            }
            fs::create_dir_all(&dest).map_err(|e| Error::layout(&dest, e))?;
            return Ok(0);
        };

        let staging = dest.with_file_name(format!("sources.{}.tmp", std::process::id()));
        if staging.exists() {
            fs::remove_dir_all(&staging).map_err(|e| Error::layout(&staging, e))?;
        }
        fs::create_dir_all(&staging).map_err(|e| Error::layout(&staging, e))?;

        let mut count = 0;
        for pattern in &recipe.package.exports_sources {
            count += copy_files(pattern, recipe_dir, &staging, true)?.len();
        }

        if dest.is_dir() && tree_digest(&dest)? == tree_digest(&staging)? {
            fs::remove_dir_all(&staging).map_err(|e| Error::layout(&staging, e))?;
            debug!("Exports of {} unchanged ({} file(s))", reference, count);
            return Ok(count);
        }

        if dest.exists() {
            fs::remove_dir_all(&dest).map_err(|e| Error::layout(&dest, e))?;
        }
        fs::rename(&staging, &dest).map_err(|e| Error::layout(&dest, e))?;
        debug!("Exported {} file(s) to {}", count, dest.display());
        Ok(count)
    }

    /// Copy exported sources into the per-build source root
    ///
    /// Holds the exports lock shared, so a concurrent export cannot swap
    /// the directory mid-copy.
    pub fn copy_sources(&self, recipe: &Recipe, layout: &Layout) -> Result<usize> {
        if !layout.copy_source {
            return Ok(0);
        }
        let _lock = self.lock_exports(&recipe.reference(), false)?;
        Ok(copy_files("*", &layout.export_sources, &layout.source_root, true)?.len())
    }

    /// Take the exclusive lock of an identity directory
    ///
    /// Blocks while another process holds it.
    pub fn lock(&self, reference: &RecipeRef, id: &PackageId) -> Result<LayoutLock> {
        let base = self.identity_dir(reference, id);
        LayoutLock::acquire(&base.join(LOCK_FILE), true)
    }

    /// Lock the exports of a reference: exclusive to write, shared to read
    pub fn lock_exports(&self, reference: &RecipeRef, exclusive: bool) -> Result<LayoutLock> {
        let dir = self.reference_dir("e", reference);
        LayoutLock::acquire(&dir.join(LOCK_FILE), exclusive)
    }
}

/// Relative path and SHA-256 of every file below `dir`, sorted
fn tree_digest(dir: &Path) -> Result<Vec<(PathBuf, String)>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry.map_err(|e| Error::layout(dir, e))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        let digest = sha256_file(path).map_err(|e| Error::layout(path, e))?;
        let relative = path.strip_prefix(dir).unwrap_or(path).to_path_buf();
        files.push((relative, digest));
    }
    Ok(files)
}

fn join_folder(root: &Path, folder: &Path) -> PathBuf {
    if folder.as_os_str().is_empty() {
        root.to_path_buf()
    } else {
        root.join(folder)
    }
}

/// Exclusive lock on an identity directory, released on drop
#[derive(Debug)]
pub struct LayoutLock {
    file: File,
    path: PathBuf,
}

impl LayoutLock {
    fn acquire(path: &Path, exclusive: bool) -> Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| Error::layout(parent, e))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(path)
            .map_err(|e| Error::layout(path, e))?;

        let locked = if exclusive {
            file.lock_exclusive()
        } else {
            FileExt::lock_shared(&file)
        };
        locked.map_err(|e| Error::layout(path, format!("failed to lock: {}", e)))?;

        Ok(Self {
            file,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for LayoutLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recipe::parse_recipe;
    use tempfile::TempDir;

    fn library() -> Recipe {
        parse_recipe("[package]\nname = \"glad\"\nversion = \"2.0.8\"\n").unwrap()
    }

    fn header_only() -> Recipe {
        parse_recipe(
            "[package]\nname = \"fastnoise-lite\"\nversion = \"1.1.1\"\n\
             type = \"header-library\"\nno_copy_source = true\n",
        )
        .unwrap()
    }

    fn id() -> PackageId {
        PackageId::from_canonical("[settings]\n")
    }

    #[test]
    fn test_plan_paths() {
        let resolver = LayoutResolver::new("/pantry");
        let layout = resolver.plan(&library(), &id(), &Folders::default()).unwrap();

        let base = PathBuf::from("/pantry/p/glad/2.0.8").join(id().short());
        assert_eq!(layout.base, base);
        assert_eq!(layout.source_folder, base.join("source"));
        assert_eq!(layout.build_folder, base.join("build"));
        assert_eq!(layout.package_folder, base.join("package"));
        assert_eq!(
            layout.export_sources,
            PathBuf::from("/pantry/e/glad/2.0.8/sources")
        );
        assert!(layout.copy_source);
        assert!(layout.has_build_root());
    }

    #[test]
    fn test_user_channel_segments() {
        let resolver = LayoutResolver::new("/pantry");
        let reference = RecipeRef::parse("glad/2.0.8@local").unwrap();
        assert_eq!(
            resolver.identity_dir(&reference, &id()),
            PathBuf::from("/pantry/p/glad/2.0.8/local/_").join(id().short())
        );
    }

    #[test]
    fn test_header_only_no_copy_source() {
        let resolver = LayoutResolver::new("/pantry");
        let layout = resolver.plan(&header_only(), &id(), &Folders::default()).unwrap();

        assert!(!layout.copy_source);
        assert!(!layout.has_build_root());
        assert_eq!(layout.source_root, layout.export_sources);
        assert_eq!(layout.build_folder, layout.source_folder);
    }

    #[test]
    fn test_cmake_folders() {
        let mut config = EffectiveConfig::default();
        config
            .settings
            .insert("build_type".to_string(), "Debug".to_string());

        let resolver = LayoutResolver::new("/pantry");
        let layout = resolver
            .plan(&library(), &id(), &Folders::cmake(&config))
            .unwrap();
        assert!(layout.build_folder.ends_with("build/Debug"));
        assert!(layout.generators_folder.ends_with("build/Debug/generators"));
    }

    #[test]
    fn test_escaping_folder_rejected() {
        let resolver = LayoutResolver::new("/pantry");
        let folders = Folders {
            build: PathBuf::from("../../elsewhere"),
            ..Folders::default()
        };
        let err = resolver.plan(&library(), &id(), &folders).unwrap_err();
        assert!(matches!(err, Error::LayoutError { .. }));
    }

    #[test]
    fn test_resolve_is_idempotent_and_preserves_contents() {
        let temp = TempDir::new().unwrap();
        let resolver = LayoutResolver::new(temp.path());

        let first = resolver.resolve(&library(), &id(), &Folders::default()).unwrap();
        fs::write(first.build_folder.join("CMakeCache.txt"), "cache").unwrap();

        let second = resolver.resolve(&library(), &id(), &Folders::default()).unwrap();
        assert_eq!(first, second);
        assert!(second.build_folder.join("CMakeCache.txt").exists());
        assert!(second.package_folder.is_dir());
    }

    #[test]
    fn test_export_and_copy_sources() {
        let temp = TempDir::new().unwrap();
        let recipe_dir = temp.path().join("recipe");
        fs::create_dir_all(recipe_dir.join("src")).unwrap();
        fs::write(recipe_dir.join("CMakeLists.txt"), "project(glad C)").unwrap();
        fs::write(recipe_dir.join("src/gl.c"), "int x;").unwrap();
        fs::write(recipe_dir.join("notes.md"), "not exported").unwrap();

        let mut recipe = library();
        recipe.package.exports_sources = vec!["CMakeLists.txt".to_string(), "src/*".to_string()];

        let resolver = LayoutResolver::new(temp.path().join("root"));
        assert_eq!(resolver.export_sources(&recipe, Some(&recipe_dir)).unwrap(), 2);

        let layout = resolver.resolve(&recipe, &id(), &Folders::default()).unwrap();
        assert_eq!(resolver.copy_sources(&recipe, &layout).unwrap(), 2);
        assert!(layout.source_root.join("src/gl.c").exists());
        assert!(!layout.source_root.join("notes.md").exists());
    }

    #[test]
    fn test_export_replaces_removed_files() {
        let temp = TempDir::new().unwrap();
        let recipe_dir = temp.path().join("recipe");
        fs::create_dir_all(recipe_dir.join("src")).unwrap();
        fs::write(recipe_dir.join("src/gl.c"), "int x;").unwrap();
        fs::write(recipe_dir.join("src/egl.c"), "int y;").unwrap();

        let mut recipe = library();
        recipe.package.exports_sources = vec!["src/*".to_string()];
        let resolver = LayoutResolver::new(temp.path().join("root"));
        let exports = resolver.exports_dir(&recipe.reference());

        assert_eq!(resolver.export_sources(&recipe, Some(&recipe_dir)).unwrap(), 2);
        fs::remove_file(recipe_dir.join("src/egl.c")).unwrap();
        assert_eq!(resolver.export_sources(&recipe, Some(&recipe_dir)).unwrap(), 1);

        assert!(exports.join("src/gl.c").exists());
        assert!(!exports.join("src/egl.c").exists());
        // No staging directory is left behind
        let siblings: Vec<_> = fs::read_dir(exports.parent().unwrap())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert!(siblings.iter().all(|name| !name.ends_with(".tmp")));
    }

    #[test]
    fn test_unchanged_export_kept_in_place() {
        let temp = TempDir::new().unwrap();
        let recipe_dir = temp.path().join("recipe");
        fs::create_dir_all(&recipe_dir).unwrap();
        fs::write(recipe_dir.join("CMakeLists.txt"), "project(glad C)").unwrap();

        let mut recipe = library();
        recipe.package.exports_sources = vec!["CMakeLists.txt".to_string()];
        let resolver = LayoutResolver::new(temp.path().join("root"));
        let exports = resolver.exports_dir(&recipe.reference());

        resolver.export_sources(&recipe, Some(&recipe_dir)).unwrap();
        let before = tree_digest(&exports).unwrap();
        resolver.export_sources(&recipe, Some(&recipe_dir)).unwrap();
        assert_eq!(tree_digest(&exports).unwrap(), before);

        fs::write(recipe_dir.join("CMakeLists.txt"), "project(glad C CXX)").unwrap();
        resolver.export_sources(&recipe, Some(&recipe_dir)).unwrap();
        assert_ne!(tree_digest(&exports).unwrap(), before);
    }

    #[test]
    fn test_shared_export_locks_coexist() {
        let temp = TempDir::new().unwrap();
        let resolver = LayoutResolver::new(temp.path());
        let reference = library().reference();

        let a = resolver.lock_exports(&reference, false).unwrap();
        let b = resolver.lock_exports(&reference, false).unwrap();
        assert_eq!(a.path(), b.path());
        drop((a, b));
        let _exclusive = resolver.lock_exports(&reference, true).unwrap();
    }

    #[test]
    fn test_lock_released_on_drop() {
        let temp = TempDir::new().unwrap();
        let resolver = LayoutResolver::new(temp.path());
        let reference = library().reference();

        {
            let lock = resolver.lock(&reference, &id()).unwrap();
            assert!(lock.path().exists());
        }
        // Re-acquiring after drop must not block
        let _again = resolver.lock(&reference, &id()).unwrap();
    }
}
