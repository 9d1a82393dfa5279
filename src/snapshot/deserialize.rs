// First pass: turn snapshot entries back into skeleton modules

use crate::error::{Error, ModuleFailure, Result};
use crate::graph::{Module, ModuleSet};
use crate::snapshot::fixup::{fixup, UnresolvedReference};
use crate::snapshot::format::{ModuleEntry, Snapshot};
use std::path::Path;

/// Modules instantiated from a snapshot, plus the entries that failed
#[derive(Debug, Default)]
pub struct Instantiated {
    pub modules: ModuleSet,
    pub failures: Vec<ModuleFailure>,
}

/// Result of loading a snapshot through both passes
#[derive(Debug, Default)]
pub struct LoadResult {
    pub modules: ModuleSet,
    pub failures: Vec<ModuleFailure>,
    pub unresolved: Vec<UnresolvedReference>,
}

impl LoadResult {
    /// True when every entry loaded and every reference resolved
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty() && self.unresolved.is_empty()
    }
}

/// Instantiate a single entry stored under `name`
pub fn instantiate_entry(name: &str, value: &serde_json::Value) -> Result<Module> {
    let entry: ModuleEntry =
        serde_json::from_value(value.clone()).map_err(|e| Error::malformed(name, e.to_string()))?;
    if entry.name != name {
        return Err(Error::malformed(
            name,
            format!("entry is named '{}'", entry.name),
        ));
    }
    entry.into_module()
}

fn instantiate_into(result: &mut Instantiated, name: &str, value: &serde_json::Value) {
    match instantiate_entry(name, value) {
        Ok(module) => {
            tracing::debug!("Instantiated {} ({} declarations)", name, module.len());
            result.modules.insert(module);
        }
        Err(e) => {
            tracing::warn!("Skipping snapshot entry {}: {}", name, e);
            result
                .failures
                .push(ModuleFailure::new(Some(name.to_string()), None, e));
        }
    }
}

/// Instantiate every entry; malformed entries fail individually
pub fn instantiate(snapshot: &Snapshot) -> Instantiated {
    let mut result = Instantiated::default();
    for (name, value) in snapshot.entries() {
        instantiate_into(&mut result, name, value);
    }
    result
}

/// Instantiate only the named entries
pub fn instantiate_only(snapshot: &Snapshot, names: &[&str]) -> Instantiated {
    let mut result = Instantiated::default();
    for name in names {
        match snapshot.get(name) {
            Some(value) => instantiate_into(&mut result, name, value),
            None => result.failures.push(ModuleFailure::new(
                Some(name.to_string()),
                None,
                Error::other(format!("module '{}' is not in the snapshot", name)),
            )),
        }
    }
    result
}

/// Run both passes over an in-memory snapshot
pub fn load(snapshot: &Snapshot, previous: &ModuleSet) -> LoadResult {
    let Instantiated {
        mut modules,
        failures,
    } = instantiate(snapshot);
    let report = fixup(&mut modules, previous);
    LoadResult {
        modules,
        failures,
        unresolved: report.unresolved,
    }
}

/// Load a snapshot file, resolving references against itself and `previous`
pub fn load_snapshot(path: &Path, previous: &ModuleSet) -> Result<LoadResult> {
    let snapshot = Snapshot::read(path)?;
    let mut result = load(&snapshot, previous);
    for failure in &mut result.failures {
        failure.path.get_or_insert_with(|| path.to_path_buf());
    }
    tracing::info!(
        "Loaded {} modules from {}",
        result.modules.len(),
        path.display()
    );
    Ok(result)
}

/// Load a snapshot from JSON text
pub fn load_snapshot_str(json: &str, previous: &ModuleSet) -> Result<LoadResult> {
    let snapshot = Snapshot::from_json_str(json)?;
    Ok(load(&snapshot, previous))
}

/// Load a file holding exactly one module entry, without fixup
pub fn load_module_file(path: &Path) -> Result<Module> {
    let snapshot = Snapshot::read(path)?;
    let mut entries = snapshot.entries();
    match (entries.next(), entries.next()) {
        (Some((name, value)), None) => instantiate_entry(name, value),
        _ => Err(Error::other(format!(
            "{}: expected a single module entry, found {}",
            path.display(),
            snapshot.len()
        ))),
    }
}
