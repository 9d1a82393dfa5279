// Analyzed modules and declaration identities

use crate::graph::decl::Declaration;
use crate::graph::types::Reference;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

/// Position of a declaration in its module's arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DeclIndex(pub u32);

/// Live identity of a declaration: owning module plus arena index.
///
/// Arena indices follow pre-order, so a module yields the same ids whether it
/// was built from source or instantiated from a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DeclId {
    pub module: Arc<str>,
    pub index: DeclIndex,
}

/// A module-level name bound by an import statement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportedSymbol {
    /// Name as bound in the importing module
    pub name: String,
    pub target: Reference,
}

/// Load state of a module
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadState {
    /// Fields populated, references not yet fixed up
    Skeleton,
    /// Fixup ran; some references may still be marked unresolved
    Resolved,
}

/// An analyzed source module holding its declaration tree
#[derive(Debug, Clone, PartialEq)]
pub struct Module {
    pub name: String,
    pub path: PathBuf,
    pub docstring: Option<String>,
    pub is_package: bool,
    pub imports: Vec<ImportedSymbol>,
    roots: Vec<DeclIndex>,
    decls: Vec<Declaration>,
    by_name: HashMap<String, DeclIndex>,
    state: LoadState,
}

impl Module {
    pub fn new(name: &str, path: PathBuf) -> Self {
        Self {
            name: name.to_string(),
            path,
            docstring: None,
            is_package: false,
            imports: Vec::new(),
            roots: Vec::new(),
            decls: Vec::new(),
            by_name: HashMap::new(),
            state: LoadState::Skeleton,
        }
    }

    /// Add a declaration under `parent` (or at top level) and return its index.
    ///
    /// Declarations must be added depth-first: a declaration's whole subtree
    /// before its next sibling.
    pub fn add_decl(&mut self, parent: Option<DeclIndex>, mut decl: Declaration) -> DeclIndex {
        let index = DeclIndex(self.decls.len() as u32);
        decl.parent = parent;
        decl.children.clear();

        match parent.and_then(|p| self.decls.get_mut(p.0 as usize)) {
            Some(parent_decl) => parent_decl.children.push(index),
            None => self.roots.push(index),
        }

        self.by_name.insert(decl.fullname.clone(), index);
        self.decls.push(decl);
        index
    }

    pub fn decl(&self, index: DeclIndex) -> Option<&Declaration> {
        self.decls.get(index.0 as usize)
    }

    /// Live identity of the declaration at `index`
    pub fn decl_id(&self, index: DeclIndex) -> DeclId {
        DeclId {
            module: Arc::from(self.name.as_str()),
            index,
        }
    }

    /// Top-level declarations in source order
    pub fn roots(&self) -> impl Iterator<Item = (DeclIndex, &Declaration)> {
        self.roots.iter().map(move |&i| (i, &self.decls[i.0 as usize]))
    }

    /// Direct children of a declaration
    pub fn children(&self, index: DeclIndex) -> impl Iterator<Item = (DeclIndex, &Declaration)> {
        self.decl(index)
            .map(|d| d.children.as_slice())
            .unwrap_or(&[])
            .iter()
            .map(move |&i| (i, &self.decls[i.0 as usize]))
    }

    /// All declarations in pre-order
    pub fn declarations(&self) -> impl Iterator<Item = (DeclIndex, &Declaration)> {
        self.decls
            .iter()
            .enumerate()
            .map(|(i, d)| (DeclIndex(i as u32), d))
    }

    pub fn len(&self) -> usize {
        self.decls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.decls.is_empty()
    }

    /// Find a declaration by fully-qualified name
    pub fn lookup(&self, fullname: &str) -> Option<DeclIndex> {
        self.by_name.get(fullname).copied()
    }

    /// Find a declaration by its name relative to the module, e.g. `C.m`
    pub fn get(&self, relative: &str) -> Option<&Declaration> {
        let fullname = format!("{}.{}", self.name, relative);
        self.lookup(&fullname).and_then(|i| self.decl(i))
    }

    /// Find an imported symbol by its local name
    pub fn imported(&self, name: &str) -> Option<&ImportedSymbol> {
        self.imports.iter().find(|s| s.name == name)
    }

    pub fn state(&self) -> LoadState {
        self.state
    }

    pub(crate) fn set_state(&mut self, state: LoadState) {
        self.state = state;
    }

    /// Visit every reference in the module with the fullname of its owner
    pub fn for_each_reference(&self, mut f: impl FnMut(&str, &Reference)) {
        for symbol in &self.imports {
            f(&self.name, &symbol.target);
        }
        for decl in &self.decls {
            let owner = decl.fullname.as_str();
            decl.kind.visit_refs(&mut |r| f(owner, r));
        }
    }

    /// Visit every reference in the module mutably with the fullname of its owner
    pub fn for_each_reference_mut(&mut self, mut f: impl FnMut(&str, &mut Reference)) {
        let module_name = self.name.as_str();
        for symbol in &mut self.imports {
            f(module_name, &mut symbol.target);
        }
        for decl in &mut self.decls {
            let owner = decl.fullname.as_str();
            decl.kind.visit_refs_mut(&mut |r| f(owner, r));
        }
    }

    /// Count references that fixup could not resolve
    pub fn unresolved_count(&self) -> usize {
        let mut count = 0;
        self.for_each_reference(|_, r| {
            if r.is_unresolved() {
                count += 1;
            }
        });
        count
    }

    /// Count references that have not been through fixup yet
    pub fn pending_count(&self) -> usize {
        let mut count = 0;
        self.for_each_reference(|_, r| {
            if r.is_pending() {
                count += 1;
            }
        });
        count
    }
}
