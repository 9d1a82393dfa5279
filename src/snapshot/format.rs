// Persisted snapshot format
//
// Every object carries a ".class" tag. Declarations nest under their parent,
// and references appear only as fully-qualified key strings.

use crate::error::{Error, Result};
use crate::graph::{
    AliasInfo, ClassInfo, DeclIndex, DeclKind, Declaration, FuncSig, ImportedSymbol, Module, Span,
    VarInfo,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Version stamped on every module entry
pub const FORMAT_VERSION: u32 = 1;

/// Tag of a module entry
pub const MODULE_CLASS: &str = "Module";

/// One serialized module
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleEntry {
    #[serde(rename = ".class")]
    pub class: String,
    pub version: u32,
    pub name: String,
    pub path: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub docstring: Option<String>,
    #[serde(default)]
    pub is_package: bool,
    #[serde(default)]
    pub imports: Vec<ImportedSymbol>,
    #[serde(default)]
    pub defs: Vec<DeclEntry>,
}

/// One serialized declaration with its subtree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeclEntry {
    pub name: String,
    pub fullname: String,
    #[serde(flatten)]
    pub kind: KindEntry,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub docstring: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub span: Option<Span>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<DeclEntry>,
}

/// Declaration payload, tagged by kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = ".class")]
pub enum KindEntry {
    FuncDef(FuncSig),
    ClassDef(ClassInfo),
    Var(VarInfo),
    TypeAlias(AliasInfo),
}

impl From<&DeclKind> for KindEntry {
    fn from(kind: &DeclKind) -> Self {
        match kind {
            DeclKind::Function(sig) => KindEntry::FuncDef(sig.clone()),
            DeclKind::Class(info) => KindEntry::ClassDef(info.clone()),
            DeclKind::Variable(var) => KindEntry::Var(var.clone()),
            DeclKind::TypeAlias(alias) => KindEntry::TypeAlias(alias.clone()),
        }
    }
}

impl From<KindEntry> for DeclKind {
    fn from(entry: KindEntry) -> Self {
        match entry {
            KindEntry::FuncDef(sig) => DeclKind::Function(sig),
            KindEntry::ClassDef(info) => DeclKind::Class(info),
            KindEntry::Var(var) => DeclKind::Variable(var),
            KindEntry::TypeAlias(alias) => DeclKind::TypeAlias(alias),
        }
    }
}

impl ModuleEntry {
    /// Serialize a live module; references are written as their keys
    pub fn from_module(module: &Module) -> Self {
        Self {
            class: MODULE_CLASS.to_string(),
            version: FORMAT_VERSION,
            name: module.name.clone(),
            path: module.path.clone(),
            docstring: module.docstring.clone(),
            is_package: module.is_package,
            imports: module.imports.clone(),
            defs: module
                .roots()
                .map(|(index, decl)| DeclEntry::from_decl(module, index, decl))
                .collect(),
        }
    }

    /// Rebuild a skeleton module; every reference comes back pending
    pub fn into_module(self) -> Result<Module> {
        if self.class != MODULE_CLASS {
            return Err(Error::malformed(
                &self.name,
                format!("expected .class '{}', found '{}'", MODULE_CLASS, self.class),
            ));
        }
        if self.version != FORMAT_VERSION {
            return Err(Error::malformed(
                &self.name,
                format!("unsupported format version {}", self.version),
            ));
        }

        let mut module = Module::new(&self.name, self.path);
        module.docstring = self.docstring;
        module.is_package = self.is_package;
        module.imports = self.imports;

        let mut stack: Vec<(Option<DeclIndex>, DeclEntry)> =
            self.defs.into_iter().rev().map(|d| (None, d)).collect();
        while let Some((parent, entry)) = stack.pop() {
            let DeclEntry {
                name,
                fullname,
                kind,
                docstring,
                span,
                children,
            } = entry;
            let mut decl = Declaration::new(&name, &fullname, kind.into());
            decl.docstring = docstring;
            decl.span = span;
            let index = module.add_decl(parent, decl);
            stack.extend(children.into_iter().rev().map(|c| (Some(index), c)));
        }

        Ok(module)
    }
}

impl DeclEntry {
    fn from_decl(module: &Module, index: DeclIndex, decl: &Declaration) -> Self {
        Self {
            name: decl.name.clone(),
            fullname: decl.fullname.clone(),
            kind: KindEntry::from(&decl.kind),
            docstring: decl.docstring.clone(),
            span: decl.span,
            children: module
                .children(index)
                .map(|(child, child_decl)| DeclEntry::from_decl(module, child, child_decl))
                .collect(),
        }
    }
}

/// A persisted mapping from module name to serialized module entry.
///
/// Entries stay as raw JSON until instantiated so one malformed module
/// cannot prevent the rest from loading.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Snapshot {
    entries: BTreeMap<String, serde_json::Value>,
}

impl Snapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a live module under its own name
    pub fn insert_module(&mut self, module: &Module) -> Result<()> {
        let value = serde_json::to_value(ModuleEntry::from_module(module))?;
        self.entries.insert(module.name.clone(), value);
        Ok(())
    }

    /// Add an already-serialized entry under the given key
    pub fn insert_entry(&mut self, name: impl Into<String>, entry: serde_json::Value) {
        self.entries.insert(name.into(), entry);
    }

    pub fn get(&self, name: &str) -> Option<&serde_json::Value> {
        self.entries.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(|k| k.as_str())
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, &serde_json::Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Parse a snapshot from JSON text
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read a snapshot file
    pub fn read(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            Error::Io(std::io::Error::new(
                e.kind(),
                format!("{}: {}", path.display(), e),
            ))
        })?;
        Self::from_json_str(&contents)
    }

    /// Render as JSON; pretty output uses a 2-space indent
    pub fn to_json(&self, pretty: bool) -> Result<String> {
        let json = if pretty {
            serde_json::to_string_pretty(self)?
        } else {
            serde_json::to_string(self)?
        };
        Ok(json)
    }

    /// Write to `path`, creating parent directories
    pub fn write(&self, path: &Path, pretty: bool) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_json(pretty)?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{ArgKind, Param, Reference, TypeExpr};

    fn sample_module() -> Module {
        let mut module = Module::new("b", PathBuf::from("/src/b.py"));
        module.docstring = Some("Module b.".to_string());
        module.imports.push(ImportedSymbol {
            name: "Base".to_string(),
            target: Reference::new("a.Base"),
        });
        let child = module.add_decl(
            None,
            Declaration::new(
                "Child",
                "b.Child",
                DeclKind::Class(ClassInfo {
                    bases: vec![TypeExpr::instance("a.Base")],
                    ..ClassInfo::default()
                }),
            ),
        );
        let mut param = Param::new("other", ArgKind::ArgPos);
        param.ty = Some(TypeExpr::instance("b.Child"));
        let mut method = Declaration::new(
            "merge",
            "b.Child.merge",
            DeclKind::Function(FuncSig {
                params: vec![Param::new("self", ArgKind::ArgPos), param],
                ret: Some(TypeExpr::NoneType),
                ..FuncSig::default()
            }),
        );
        method.span = Some(Span {
            line_start: 4,
            line_end: 5,
        });
        module.add_decl(Some(child), method);
        module.add_decl(
            None,
            Declaration::new("LIMIT", "b.LIMIT", DeclKind::Variable(VarInfo::default())),
        );
        module
    }

    #[test]
    fn test_entry_shape() {
        let value = serde_json::to_value(ModuleEntry::from_module(&sample_module())).unwrap();
        assert_eq!(value[".class"], "Module");
        assert_eq!(value["version"], FORMAT_VERSION);
        assert_eq!(value["imports"][0]["target"], "a.Base");
        assert_eq!(value["defs"][0][".class"], "ClassDef");
        assert_eq!(value["defs"][0]["bases"][0]["type_ref"], "a.Base");
        assert_eq!(value["defs"][0]["children"][0][".class"], "FuncDef");
        assert_eq!(value["defs"][0]["children"][0]["params"][1]["kind"], "ARG_POS");
        assert_eq!(value["defs"][1][".class"], "Var");
    }

    #[test]
    fn test_into_module_restores_arena_order() {
        let original = sample_module();
        let rebuilt = ModuleEntry::from_module(&original).into_module().unwrap();
        assert_eq!(rebuilt, original);
        assert_eq!(rebuilt.lookup("b.Child.merge"), Some(DeclIndex(1)));
        assert_eq!(rebuilt.lookup("b.LIMIT"), Some(DeclIndex(2)));
    }

    #[test]
    fn test_entry_json_round_trip() {
        let entry = ModuleEntry::from_module(&sample_module());
        let json = serde_json::to_string(&entry).unwrap();
        let back: ModuleEntry = serde_json::from_str(&json).unwrap();
        assert_eq!(back, entry);
    }

    #[test]
    fn test_unsupported_version() {
        let mut entry = ModuleEntry::from_module(&sample_module());
        entry.version = 99;
        match entry.into_module() {
            Err(Error::MalformedSnapshot { module, message }) => {
                assert_eq!(module, "b");
                assert!(message.contains("99"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_wrong_class_tag() {
        let mut entry = ModuleEntry::from_module(&sample_module());
        entry.class = "SourceFile".to_string();
        assert!(entry.into_module().is_err());
    }

    #[test]
    fn test_snapshot_write_creates_parents() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("nested/deeper/out.json");
        let mut snapshot = Snapshot::new();
        snapshot.insert_module(&sample_module()).unwrap();
        snapshot.write(&path, true).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("{\n  \"b\": {"));
        let back = Snapshot::read(&path).unwrap();
        assert_eq!(back, snapshot);
    }

    #[test]
    fn test_read_missing_snapshot() {
        assert!(Snapshot::read(Path::new("/nonexistent/snap.json")).is_err());
    }
}
