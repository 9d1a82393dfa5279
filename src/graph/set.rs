// A mapping from module name to module

use crate::graph::decl::Declaration;
use crate::graph::module::{DeclId, Module};
use crate::graph::types::{Reference, Target};
use std::collections::BTreeMap;
use std::path::Path;

/// Modules keyed by fully-qualified name
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModuleSet {
    modules: BTreeMap<String, Module>,
}

impl ModuleSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a module, returning the one it replaced
    pub fn insert(&mut self, module: Module) -> Option<Module> {
        self.modules.insert(module.name.clone(), module)
    }

    pub fn get(&self, name: &str) -> Option<&Module> {
        self.modules.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Module> {
        self.modules.get_mut(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<Module> {
        self.modules.remove(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.modules.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.modules.keys().map(|k| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Module> {
        self.modules.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Module> {
        self.modules.values_mut()
    }

    /// Move all modules from `other` into this set; `other` wins on clashes
    pub fn merge(&mut self, other: ModuleSet) {
        self.modules.extend(other.modules);
    }

    /// Dereference a live declaration identity
    pub fn declaration(&self, id: &DeclId) -> Option<&Declaration> {
        self.modules.get(&*id.module).and_then(|m| m.decl(id.index))
    }

    /// Follow a resolved reference to its declaration, if it points at one in this set
    pub fn resolve(&self, reference: &Reference) -> Option<&Declaration> {
        match reference.target()? {
            Target::Decl(id) => self.declaration(id),
            Target::Module(_) => None,
        }
    }

    /// Find a declaration by fully-qualified name, trying the longest module prefix first
    pub fn find(&self, fullname: &str) -> Option<&Declaration> {
        let mut end = fullname.len();
        while let Some(dot) = fullname[..end].rfind('.') {
            if let Some(module) = self.modules.get(&fullname[..dot]) {
                if let Some(index) = module.lookup(fullname) {
                    return module.decl(index);
                }
            }
            end = dot;
        }
        None
    }

    /// The module whose source file is `path`
    ///
    /// Paths are compared in absolute form. A file that was never analyzed,
    /// for instance one only reached through an unfollowed import, yields `None`.
    pub fn module_for_path(&self, path: &Path) -> Option<&Module> {
        let wanted = absolute(path);
        self.modules.values().find(|m| absolute(&m.path) == wanted)
    }
}

impl IntoIterator for ModuleSet {
    type Item = (String, Module);
    type IntoIter = std::collections::btree_map::IntoIter<String, Module>;

    fn into_iter(self) -> Self::IntoIter {
        self.modules.into_iter()
    }
}

impl FromIterator<Module> for ModuleSet {
    fn from_iter<I: IntoIterator<Item = Module>>(iter: I) -> Self {
        let mut set = ModuleSet::new();
        for module in iter {
            set.insert(module);
        }
        set
    }
}

/// Absolute, canonical where possible, form of a path
pub(crate) fn absolute(path: &Path) -> std::path::PathBuf {
    if let Ok(canonical) = path.canonicalize() {
        return canonical;
    }
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::decl::{ClassInfo, DeclKind};
    use std::path::PathBuf;

    fn module_with_class(name: &str, class: &str) -> Module {
        let mut module = Module::new(name, PathBuf::from(format!("/nowhere/{}.py", name)));
        module.add_decl(
            None,
            Declaration::new(
                class,
                &format!("{}.{}", name, class),
                DeclKind::Class(ClassInfo::default()),
            ),
        );
        module
    }

    #[test]
    fn test_insert_and_get() {
        let mut set = ModuleSet::new();
        assert!(set.insert(module_with_class("a", "Base")).is_none());
        assert!(set.contains("a"));
        assert_eq!(set.len(), 1);
        assert_eq!(set.names().collect::<Vec<_>>(), vec!["a"]);
    }

    #[test]
    fn test_find_prefers_longest_module() {
        let set: ModuleSet = vec![
            module_with_class("pkg", "Thing"),
            module_with_class("pkg.sub", "Thing"),
        ]
        .into_iter()
        .collect();

        assert_eq!(set.find("pkg.sub.Thing").unwrap().fullname, "pkg.sub.Thing");
        assert_eq!(set.find("pkg.Thing").unwrap().fullname, "pkg.Thing");
        assert!(set.find("other.Thing").is_none());
        assert!(set.find("Thing").is_none());
    }

    #[test]
    fn test_declaration_by_id() {
        let module = module_with_class("a", "Base");
        let id = module.decl_id(module.lookup("a.Base").unwrap());
        let set: ModuleSet = std::iter::once(module).collect();
        assert_eq!(set.declaration(&id).unwrap().name, "Base");
    }

    #[test]
    fn test_merge_other_wins() {
        let mut left: ModuleSet = std::iter::once(module_with_class("a", "Old")).collect();
        let right: ModuleSet = std::iter::once(module_with_class("a", "New")).collect();
        left.merge(right);
        assert!(left.get("a").unwrap().get("New").is_some());
        assert!(left.get("a").unwrap().get("Old").is_none());
    }

    #[test]
    fn test_module_for_path_miss() {
        let set: ModuleSet = std::iter::once(module_with_class("a", "Base")).collect();
        assert!(set.module_for_path(Path::new("/nowhere/b.py")).is_none());
        assert!(set.module_for_path(Path::new("/nowhere/a.py")).is_some());
    }
}
