// On-disk analyzer cache
//
// Layout under the cache directory:
//   manifest.json          analyzer version, input-set hash, module hashes
//   modules/<name>.json    one snapshot-format entry per module

use crate::error::{Error, Result};
use crate::graph::Module;
use crate::snapshot::ModuleEntry;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

const MANIFEST_FILE: &str = "manifest.json";
const MODULES_DIR: &str = "modules";

/// Hex SHA-256 of a source text
pub fn content_hash(source: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(source.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Combined hash of an input set, independent of order
pub fn inputs_hash<'a>(inputs: impl IntoIterator<Item = (&'a str, &'a str)>) -> String {
    let mut pairs: Vec<(&str, &str)> = inputs.into_iter().collect();
    pairs.sort();

    let mut hasher = Sha256::new();
    for (module, hash) in pairs {
        hasher.update(module.as_bytes());
        hasher.update(b":");
        hasher.update(hash.as_bytes());
        hasher.update(b"\n");
    }
    format!("{:x}", hasher.finalize())
}

/// Summary of the last build written to a cache directory
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub version: String,
    pub inputs_hash: String,
    /// Module name -> content hash of its source
    pub modules: BTreeMap<String, String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct CacheEntry {
    version: String,
    hash: String,
    module: ModuleEntry,
}

/// Read/write access to one cache directory
#[derive(Debug, Clone)]
pub struct AnalysisCache {
    dir: PathBuf,
    version: String,
    skip_version_check: bool,
}

impl AnalysisCache {
    /// Open (creating if needed) the cache at `dir`
    pub fn open(dir: &Path, version: &str, skip_version_check: bool) -> Result<Self> {
        std::fs::create_dir_all(dir.join(MODULES_DIR))?;
        Ok(Self {
            dir: dir.to_path_buf(),
            version: version.to_string(),
            skip_version_check,
        })
    }

    fn entry_path(&self, module: &str) -> PathBuf {
        self.dir.join(MODULES_DIR).join(format!("{}.json", module))
    }

    fn version_matches(&self, version: &str) -> bool {
        self.skip_version_check || version == self.version
    }

    /// Read the manifest. A missing manifest is `None`; an unreadable one
    /// is `CacheCorruption`.
    pub fn load_manifest(&self) -> Result<Option<Manifest>> {
        let path = self.dir.join(MANIFEST_FILE);
        if !path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(&path)
            .map_err(|e| Error::CacheCorruption(format!("{}: {}", path.display(), e)))?;
        let manifest: Manifest = serde_json::from_str(&contents)
            .map_err(|e| Error::CacheCorruption(format!("{}: {}", path.display(), e)))?;

        if !self.version_matches(&manifest.version) {
            tracing::debug!(
                "Cache written by {}, current analyzer is {}; ignoring it",
                manifest.version,
                self.version
            );
            return Ok(None);
        }
        Ok(Some(manifest))
    }

    pub fn write_manifest(&self, manifest: &Manifest) -> Result<()> {
        let json = serde_json::to_string_pretty(manifest)?;
        std::fs::write(self.dir.join(MANIFEST_FILE), json)?;
        Ok(())
    }

    /// Cached module for `name`, if its entry is readable, current and
    /// matches `hash`. Corrupt entries are treated as misses.
    pub fn get(&self, name: &str, hash: &str) -> Option<Module> {
        let path = self.entry_path(name);
        let contents = std::fs::read_to_string(&path).ok()?;
        let entry: CacheEntry = match serde_json::from_str(&contents) {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!("Discarding corrupt cache entry {}: {}", path.display(), e);
                return None;
            }
        };

        if entry.hash != hash || !self.version_matches(&entry.version) {
            return None;
        }

        match entry.module.into_module() {
            Ok(module) if module.name == name => Some(module),
            Ok(_) => None,
            Err(e) => {
                tracing::warn!("Discarding cache entry {}: {}", path.display(), e);
                None
            }
        }
    }

    /// Store a freshly analyzed module
    pub fn put(&self, module: &Module, hash: &str) -> Result<()> {
        let entry = CacheEntry {
            version: self.version.clone(),
            hash: hash.to_string(),
            module: ModuleEntry::from_module(module),
        };
        std::fs::write(self.entry_path(&module.name), serde_json::to_string(&entry)?)?;
        Ok(())
    }

    /// Remove an entire cache directory
    pub fn invalidate(dir: &Path) -> Result<()> {
        if dir.exists() {
            tracing::info!("Invalidating cache at {}", dir.display());
            std::fs::remove_dir_all(dir)?;
        }
        Ok(())
    }
}
