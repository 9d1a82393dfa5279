// Second pass: re-resolve reference keys into live identities

use crate::graph::{LoadState, ModuleSet, Resolution, Target};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;

/// Longest import chain followed through re-exports
const MAX_ALIAS_DEPTH: usize = 16;

/// A reference fixup could not resolve
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnresolvedReference {
    /// Module holding the reference
    pub module: String,
    /// Declaration (or module, for imports) holding the reference
    pub owner: String,
    /// Key that was looked up
    pub key: String,
}

impl std::fmt::Display for UnresolvedReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {} -> {}", self.module, self.owner, self.key)
    }
}

/// Outcome of a fixup pass
#[derive(Debug, Clone, Default)]
pub struct FixupReport {
    /// References newly resolved by this pass
    pub resolved: usize,
    /// References that are still unresolved after this pass
    pub unresolved: Vec<UnresolvedReference>,
}

impl FixupReport {
    pub fn is_complete(&self) -> bool {
        self.unresolved.is_empty()
    }
}

#[derive(Debug, Clone)]
enum Symbol {
    Decl(crate::graph::DeclId),
    Module(Arc<str>),
    /// Name bound by an import; holds the imported key
    Alias(String),
}

/// Fully-qualified name to live identity, over a set of modules
#[derive(Debug, Default)]
pub struct SymbolIndex {
    symbols: HashMap<String, Symbol>,
}

impl SymbolIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index `current` together with `previous`.
    ///
    /// A previous module that shares its name with a current one is left out
    /// entirely, so current modules win every clash.
    pub fn build(current: &ModuleSet, previous: &ModuleSet) -> Self {
        let mut index = Self::new();
        for module in previous.iter().filter(|m| !current.contains(&m.name)) {
            index.add_module(module);
        }
        for module in current.iter() {
            index.add_module(module);
        }
        index
    }

    /// Add one module's names.
    ///
    /// Modules and declarations replace existing entries. An import alias
    /// never replaces a module or declaration, whichever was added first.
    pub fn add_module(&mut self, module: &crate::graph::Module) {
        let name: Arc<str> = Arc::from(module.name.as_str());
        self.symbols
            .insert(module.name.clone(), Symbol::Module(name.clone()));

        for symbol in module.imports.iter().filter(|s| s.name != "*") {
            let key = format!("{}.{}", module.name, symbol.name);
            if matches!(
                self.symbols.get(&key),
                Some(Symbol::Decl(_)) | Some(Symbol::Module(_))
            ) {
                continue;
            }
            self.symbols
                .insert(key, Symbol::Alias(symbol.target.key().to_string()));
        }

        // Declarations shadow imports of the same name
        for (index, decl) in module.declarations() {
            self.symbols.insert(
                decl.fullname.clone(),
                Symbol::Decl(crate::graph::DeclId {
                    module: name.clone(),
                    index,
                }),
            );
        }
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Resolve a key, following import aliases and aliased prefixes
    pub fn lookup(&self, key: &str) -> Option<Target> {
        self.lookup_at(key, 0)
    }

    fn lookup_at(&self, key: &str, depth: usize) -> Option<Target> {
        if depth > MAX_ALIAS_DEPTH {
            tracing::debug!("alias chain too long at {}", key);
            return None;
        }

        match self.symbols.get(key) {
            Some(Symbol::Decl(id)) => return Some(Target::Decl(id.clone())),
            Some(Symbol::Module(name)) => return Some(Target::Module(name.clone())),
            Some(Symbol::Alias(target)) if target != key => {
                return self.lookup_at(target, depth + 1);
            }
            _ => {}
        }

        // `pkg.alias.Name` where `pkg.alias` was bound by an import
        let mut end = key.len();
        while let Some(dot) = key[..end].rfind('.') {
            if let Some(Symbol::Alias(target)) = self.symbols.get(&key[..dot]) {
                let rewritten = format!("{}{}", target, &key[dot..]);
                return self.lookup_at(&rewritten, depth + 1);
            }
            end = dot;
        }

        None
    }
}

/// Resolve every pending or unresolved reference in `modules`.
///
/// Lookups see `modules` and `previous` through one index built before the
/// pass. References that are already resolved are left alone, so the pass is
/// idempotent and can be re-run after more modules become available.
/// `previous` is never modified.
pub fn fixup(modules: &mut ModuleSet, previous: &ModuleSet) -> FixupReport {
    let index = SymbolIndex::build(modules, previous);
    let mut report = FixupReport::default();

    for module in modules.iter_mut() {
        let module_name = module.name.clone();
        let mut newly_resolved = 0;
        let mut missing = Vec::new();

        module.for_each_reference_mut(|owner, reference| {
            if reference.is_resolved() {
                return;
            }
            match index.lookup(reference.key()) {
                Some(target) => {
                    reference.set_resolution(Resolution::Resolved(target));
                    newly_resolved += 1;
                }
                None => {
                    reference.set_resolution(Resolution::Unresolved);
                    missing.push(UnresolvedReference {
                        module: module_name.clone(),
                        owner: owner.to_string(),
                        key: reference.key().to_string(),
                    });
                }
            }
        });

        module.set_state(LoadState::Resolved);
        if !missing.is_empty() {
            tracing::debug!("{}: {} unresolved references", module_name, missing.len());
        }
        report.resolved += newly_resolved;
        report.unresolved.extend(missing);
    }

    tracing::info!(
        "Fixup resolved {} references, {} unresolved",
        report.resolved,
        report.unresolved.len()
    );
    report
}
