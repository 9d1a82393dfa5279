// Writing declaration graphs out as snapshots

use crate::analysis::{BuildResult, GraphBuilder};
use crate::error::{Error, Result};
use crate::graph::{Module, ModuleSet};
use crate::snapshot::format::Snapshot;
use std::path::{Path, PathBuf};

/// Serialize every module in the set
pub fn serialize_modules(modules: &ModuleSet) -> Result<Snapshot> {
    let mut snapshot = Snapshot::new();
    for module in modules.iter() {
        snapshot.insert_module(module)?;
    }
    Ok(snapshot)
}

/// Serialize a set of modules to a pretty-printed snapshot file
pub fn write_snapshot(modules: &ModuleSet, path: &Path) -> Result<()> {
    let snapshot = serialize_modules(modules)?;
    snapshot.write(path, true)?;
    tracing::info!("Wrote {} modules to {}", snapshot.len(), path.display());
    Ok(())
}

/// Write one live module as a single-entry snapshot
pub fn write_module(module: &Module, path: &Path) -> Result<()> {
    let mut snapshot = Snapshot::new();
    snapshot.insert_module(module)?;
    snapshot.write(path, true)
}

/// Write one already-serialized entry, keyed by its own `name` field
pub fn write_module_entry(entry: &serde_json::Value, path: &Path) -> Result<()> {
    let name = entry
        .get("name")
        .and_then(|n| n.as_str())
        .ok_or_else(|| Error::malformed("<unnamed>", "entry has no string `name` field"))?;
    let mut snapshot = Snapshot::new();
    snapshot.insert_entry(name, entry.clone());
    snapshot.write(path, true)
}

/// Render one module as a pretty-printed single-entry snapshot
pub fn module_to_string(module: &Module) -> Result<String> {
    let mut snapshot = Snapshot::new();
    snapshot.insert_module(module)?;
    snapshot.to_json(true)
}

/// Build the given sources and write the resulting modules to `snapshot_path`
pub fn build_and_write(
    builder: &GraphBuilder,
    paths: &[PathBuf],
    snapshot_path: &Path,
) -> Result<BuildResult> {
    let result = builder.build(paths)?;
    write_snapshot(&result.modules, snapshot_path)?;
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{ClassInfo, DeclKind, Declaration};
    use crate::snapshot::deserialize::load_module_file;
    use tempfile::TempDir;

    fn module(name: &str) -> Module {
        let mut module = Module::new(name, PathBuf::from(format!("/src/{}.py", name)));
        module.add_decl(
            None,
            Declaration::new(
                "Thing",
                &format!("{}.Thing", name),
                DeclKind::Class(ClassInfo::default()),
            ),
        );
        module
    }

    #[test]
    fn test_serialize_modules_keys() {
        let set: ModuleSet = vec![module("a"), module("b")].into_iter().collect();
        let snapshot = serialize_modules(&set).unwrap();
        assert_eq!(snapshot.names().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(snapshot.get("a").unwrap()["defs"][0]["fullname"], "a.Thing");
    }

    #[test]
    fn test_serialize_empty_set() {
        let snapshot = serialize_modules(&ModuleSet::new()).unwrap();
        assert!(snapshot.is_empty());
        assert_eq!(snapshot.to_json(true).unwrap(), "{}");
    }

    #[test]
    fn test_write_module_then_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out/a.json");
        write_module(&module("a"), &path).unwrap();
        let loaded = load_module_file(&path).unwrap();
        assert_eq!(loaded, module("a"));
    }

    #[test]
    fn test_write_module_entry_uses_entry_name() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("entry.json");
        let set: ModuleSet = std::iter::once(module("pkg.m")).collect();
        let snapshot = serialize_modules(&set).unwrap();
        write_module_entry(snapshot.get("pkg.m").unwrap(), &path).unwrap();

        let written = Snapshot::read(&path).unwrap();
        assert_eq!(written.names().collect::<Vec<_>>(), vec!["pkg.m"]);
    }

    #[test]
    fn test_write_module_entry_without_name() {
        let dir = TempDir::new().unwrap();
        let result = write_module_entry(&serde_json::json!({"defs": []}), &dir.path().join("x.json"));
        assert!(matches!(result, Err(Error::MalformedSnapshot { .. })));
    }

    #[test]
    fn test_module_to_string_is_pretty() {
        let text = module_to_string(&module("a")).unwrap();
        assert!(text.starts_with("{\n  \"a\": {\n    \".class\": \"Module\""));
    }

    #[test]
    fn test_write_to_unwritable_path() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, "").unwrap();
        let set: ModuleSet = std::iter::once(module("a")).collect();
        assert!(write_snapshot(&set, &blocker.join("snap.json")).is_err());
    }
}
