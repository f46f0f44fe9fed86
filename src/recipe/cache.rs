// src/recipe/cache.rs

//! Build cache for published packages
//!
//! Maps (reference, package id) to the record of a package that was
//! already cooked, so the orchestrator can skip the whole lifecycle. The
//! package folder itself stays in the layout; the cache only keeps the
//! published record and checks the folder still matches its manifest.

use crate::error::{Error, Result};
use crate::hash::{sha256_file, sha256_hex};
use crate::package_id::PackageId;
use crate::publish::PublishedPackage;
use crate::recipe::RecipeRef;
use crate::recipe::kitchen::PACKAGE_MANIFEST_FILE;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Configuration for the build cache
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Root directory for cache records
    pub cache_dir: PathBuf,
    /// Maximum age for cache entries (zero = no expiry)
    pub max_age: Duration,
    /// Re-hash package files against their manifest on lookup
    pub verify_integrity: bool,
}

impl CacheConfig {
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
            max_age: Duration::ZERO,
            verify_integrity: true,
        }
    }
}

/// What is stored per cache entry
#[derive(Debug, Clone, Serialize, Deserialize)]
struct CacheRecord {
    created: DateTime<Utc>,
    package: PublishedPackage,
}

/// A cache hit
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub package: PublishedPackage,
    pub cache_key: String,
    pub created: DateTime<Utc>,
}

/// Cache of published package records
#[derive(Debug)]
pub struct BuildCache {
    config: CacheConfig,
}

impl BuildCache {
    /// Create a new build cache with the given configuration
    pub fn new(config: CacheConfig) -> Result<Self> {
        fs::create_dir_all(&config.cache_dir).map_err(|e| Error::layout(&config.cache_dir, e))?;
        Ok(Self { config })
    }

    /// Open the cache at a directory with default settings
    pub fn open(cache_dir: impl Into<PathBuf>) -> Result<Self> {
        Self::new(CacheConfig::new(cache_dir))
    }

    /// Cache key for a reference and package id
    ///
    /// Header libraries share one package id across recipes, so the
    /// reference is part of the key.
    pub fn cache_key(reference: &RecipeRef, package_id: &PackageId) -> String {
        sha256_hex(format!("{}\n{}", reference, package_id).as_bytes())
    }

    /// Get the record path for a given key
    fn record_path(&self, key: &str) -> PathBuf {
        // Use first 2 chars as subdirectory for sharding
        let shard = &key[..2];
        self.config.cache_dir.join(shard).join(format!("{}.meta", key))
    }

    /// Look up a cooked package
    pub fn get(&self, reference: &RecipeRef, package_id: &PackageId) -> Result<Option<CacheEntry>> {
        let key = Self::cache_key(reference, package_id);
        let path = self.record_path(&key);

        if !path.exists() {
            debug!("Cache miss: {}", &key[..16]);
            return Ok(None);
        }

        let content = fs::read_to_string(&path)?;
        let record: CacheRecord = match toml::from_str(&content) {
            Ok(record) => record,
            Err(e) => {
                warn!("Unreadable cache record {}: {}", path.display(), e);
                self.remove_key(&key);
                return Ok(None);
            }
        };

        if !self.config.max_age.is_zero() {
            let age = Utc::now().signed_duration_since(record.created);
            let expired = age
                .to_std()
                .map(|age| age > self.config.max_age)
                .unwrap_or(false);
            if expired {
                debug!("Cache expired: {} (created {})", &key[..16], record.created);
                self.remove_key(&key);
                return Ok(None);
            }
        }

        if !self.verify_entry(&record.package)? {
            warn!(
                "Cache corruption detected for {}: {}",
                reference,
                record.package.package_folder.display()
            );
            self.remove_key(&key);
            return Ok(None);
        }

        info!("Cache hit: {}:{}", reference, package_id.short());
        Ok(Some(CacheEntry {
            package: record.package,
            cache_key: key,
            created: record.created,
        }))
    }

    /// Check that the package folder still holds what was packaged
    fn verify_entry(&self, package: &PublishedPackage) -> Result<bool> {
        let manifest_path = package.package_folder.join(PACKAGE_MANIFEST_FILE);
        let Ok(manifest) = fs::read_to_string(&manifest_path) else {
            return Ok(false);
        };

        if !self.config.verify_integrity {
            return Ok(true);
        }

        for line in manifest.lines() {
            let Some((digest, relative)) = line.split_once("  ") else {
                return Ok(false);
            };
            let file = package.package_folder.join(relative);
            match sha256_file(&file) {
                Ok(actual) if actual == digest => {}
                _ => {
                    debug!("Manifest mismatch: {}", file.display());
                    return Ok(false);
                }
            }
        }
        Ok(true)
    }

    /// Record a published package
    pub fn put(&self, package: &PublishedPackage) -> Result<CacheEntry> {
        let key = Self::cache_key(&package.reference, &package.package_id);
        let path = self.record_path(&key);

        // Create shard directory
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let record = CacheRecord {
            created: Utc::now(),
            package: package.clone(),
        };
        let content = toml::to_string(&record)
            .map_err(|e| Error::IoError(format!("Failed to serialize cache record: {}", e)))?;
        fs::write(&path, content)?;

        info!(
            "Cached: {}:{} as {}",
            package.reference,
            package.package_id.short(),
            &key[..16]
        );

        Ok(CacheEntry {
            package: record.package,
            cache_key: key,
            created: record.created,
        })
    }

    /// Forget a cooked package
    pub fn remove(&self, reference: &RecipeRef, package_id: &PackageId) -> bool {
        self.remove_key(&Self::cache_key(reference, package_id))
    }

    fn remove_key(&self, key: &str) -> bool {
        fs::remove_file(self.record_path(key)).is_ok()
    }

    /// Clear all cache records
    pub fn clear(&self) -> Result<u64> {
        let mut removed = 0u64;

        for entry in fs::read_dir(&self.config.cache_dir)? {
            let entry = entry?;
            let path = entry.path();

            if path.is_dir() {
                for file in fs::read_dir(&path)? {
                    let file = file?;
                    fs::remove_file(file.path())?;
                    removed += 1;
                }
                // Try to remove empty shard directory
                let _ = fs::remove_dir(&path);
            }
        }

        info!("Cleared {} cache entries", removed);
        Ok(removed)
    }

    /// Number of cache records
    pub fn len(&self) -> Result<usize> {
        let mut count = 0;
        for shard in fs::read_dir(&self.config.cache_dir)? {
            let shard = shard?;
            if !shard.file_type()?.is_dir() {
                continue;
            }
            count += fs::read_dir(shard.path())?
                .filter_map(|e| e.ok())
                .filter(|e| is_record(&e.path()))
                .count();
        }
        Ok(count)
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}

fn is_record(path: &Path) -> bool {
    path.extension().is_some_and(|e| e == "meta")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::publish::{CppInfo, LinkKind};
    use tempfile::TempDir;

    fn packaged(root: &Path, name: &str) -> PublishedPackage {
        let folder = root.join(name).join("package");
        fs::create_dir_all(folder.join("include")).unwrap();
        fs::write(folder.join("include/x.h"), "// x").unwrap();
        let digest = sha256_file(&folder.join("include/x.h")).unwrap();
        fs::write(
            folder.join(PACKAGE_MANIFEST_FILE),
            format!("{}  include/x.h\n", digest),
        )
        .unwrap();

        PublishedPackage {
            reference: RecipeRef::new(name, "1.0"),
            package_id: PackageId::from_canonical(name),
            package_folder: folder,
            link_kind: LinkKind::HeaderOnly,
            cpp_info: CppInfo {
                defines: vec!["X=1".to_string()],
                ..CppInfo::default()
            },
        }
    }

    #[test]
    fn test_cache_key_deterministic() {
        let r = RecipeRef::new("glad", "2.0.8");
        let id = PackageId::from_canonical("a");
        assert_eq!(BuildCache::cache_key(&r, &id), BuildCache::cache_key(&r, &id));
        assert_ne!(
            BuildCache::cache_key(&r, &id),
            BuildCache::cache_key(&RecipeRef::new("stb", "1"), &id)
        );
    }

    #[test]
    fn test_cache_miss() {
        let temp = TempDir::new().unwrap();
        let cache = BuildCache::open(temp.path().join("cache")).unwrap();
        let hit = cache
            .get(&RecipeRef::new("glad", "2.0.8"), &PackageId::from_canonical("a"))
            .unwrap();
        assert!(hit.is_none());
    }

    #[test]
    fn test_cache_put_and_get() {
        let temp = TempDir::new().unwrap();
        let cache = BuildCache::open(temp.path().join("cache")).unwrap();
        let package = packaged(temp.path(), "fastnoise-lite");

        cache.put(&package).unwrap();
        assert_eq!(cache.len().unwrap(), 1);

        let entry = cache
            .get(&package.reference, &package.package_id)
            .unwrap()
            .unwrap();
        assert_eq!(entry.package, package);
    }

    #[test]
    fn test_cache_corruption_evicts() {
        let temp = TempDir::new().unwrap();
        let cache = BuildCache::open(temp.path().join("cache")).unwrap();
        let package = packaged(temp.path(), "glad");
        cache.put(&package).unwrap();

        fs::write(package.package_folder.join("include/x.h"), "tampered").unwrap();
        assert!(
            cache
                .get(&package.reference, &package.package_id)
                .unwrap()
                .is_none()
        );
        assert!(cache.is_empty().unwrap());
    }

    #[test]
    fn test_cache_missing_folder_evicts() {
        let temp = TempDir::new().unwrap();
        let cache = BuildCache::open(temp.path().join("cache")).unwrap();
        let package = packaged(temp.path(), "glad");
        cache.put(&package).unwrap();

        fs::remove_dir_all(&package.package_folder).unwrap();
        assert!(
            cache
                .get(&package.reference, &package.package_id)
                .unwrap()
                .is_none()
        );
    }

    #[test]
    fn test_cache_remove_and_clear() {
        let temp = TempDir::new().unwrap();
        let cache = BuildCache::open(temp.path().join("cache")).unwrap();
        let a = packaged(temp.path(), "a");
        let b = packaged(temp.path(), "b");
        cache.put(&a).unwrap();
        cache.put(&b).unwrap();

        assert!(cache.remove(&a.reference, &a.package_id));
        assert!(!cache.remove(&a.reference, &a.package_id));
        assert_eq!(cache.clear().unwrap(), 1);
        assert!(cache.is_empty().unwrap());
    }

    #[test]
    fn test_cache_path_sharding() {
        let temp = TempDir::new().unwrap();
        let cache = BuildCache::open(temp.path()).unwrap();
        let key = "abcdef0123456789";
        let path = cache.record_path(key);
        assert!(path.parent().unwrap().ends_with("ab"));
        assert!(is_record(&path));
    }
}
