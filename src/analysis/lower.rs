// Lowering: parsed syntax to declarations with bound names
//
// Every name in an annotation or class header becomes either a builtin, a
// typing special form, or a reference keyed by the fully-qualified name it
// is bound to. Binding is purely lexical; nothing is inferred.

use crate::analysis::imports::{absolute_module, is_stdlib_module};
use crate::config::BuildOptions;
use crate::graph::{
    AliasInfo, ArgKind, ClassInfo, DeclIndex, DeclKind, Declaration, FuncSig, ImportedSymbol,
    Module, Param, Reference, Span, TypeExpr, VarInfo,
};
use crate::parser::{
    Annotation, Assignment, Class, Function, ImportKind, ParameterKind, ParsedFile, Stmt,
};
use std::collections::{HashMap, HashSet};

const BUILTIN_TYPES: &[&str] = &[
    "int", "float", "complex", "str", "bytes", "bytearray", "bool", "object", "list", "dict",
    "set", "frozenset", "tuple", "type", "range", "slice", "memoryview", "BaseException",
    "Exception", "ValueError", "TypeError", "KeyError", "IndexError", "RuntimeError",
    "NotImplementedError", "AttributeError", "OSError", "IOError", "StopIteration",
];

const SPECIAL_FORMS: &[&str] = &[
    "Any", "Optional", "Union", "List", "Dict", "Set", "FrozenSet", "Tuple", "Type", "Callable",
    "Literal", "ClassVar", "Final", "Annotated", "TypeAlias",
];

const TYPING_MODULES: &[&str] = &["typing", "typing_extensions", "collections.abc"];

/// What a name in an annotation is bound to
#[derive(Debug, Clone, PartialEq)]
enum Binding {
    Builtin(String),
    /// Special form from `typing`, by bare name
    Special(String),
    /// Any other standard-library name, by full name
    External(String),
    Key(String),
}

struct Scope {
    prefix: String,
    names: HashSet<String>,
}

/// Lower one parsed file into a skeleton module
pub fn lower_module(file: &ParsedFile, options: &BuildOptions) -> Module {
    let is_package = file
        .path
        .file_stem()
        .map_or(false, |stem| stem == "__init__");

    let mut module = Module::new(&file.module_name, file.path.clone());
    module.is_package = is_package;
    if options.include_docstrings {
        module.docstring = file.docstring.clone();
    }

    let mut lowerer = Lowerer {
        options,
        bindings: HashMap::new(),
        star_modules: Vec::new(),
        scopes: vec![Scope {
            prefix: file.module_name.clone(),
            names: scope_names(&file.body),
        }],
    };
    lowerer.bind_imports(file, is_package, &mut module);
    lowerer.lower_body(&mut module, &file.body, None, &file.module_name);
    module
}

fn scope_names(body: &[Stmt]) -> HashSet<String> {
    body.iter()
        .map(|stmt| match stmt {
            Stmt::Class(c) => c.name.clone(),
            Stmt::Function(f) => f.name.clone(),
            Stmt::Assign(a) => a.target.clone(),
            Stmt::TypeAlias { name, .. } => name.clone(),
        })
        .collect()
}

/// Strip a typing module prefix from a key
fn typing_member(key: &str) -> Option<&str> {
    TYPING_MODULES.iter().find_map(|module| {
        key.strip_prefix(module)
            .and_then(|rest| rest.strip_prefix('.'))
    })
}

fn is_dotted_identifier(s: &str) -> bool {
    !s.is_empty()
        && s.split('.').all(|part| {
            let mut chars = part.chars();
            chars
                .next()
                .map_or(false, |c| c.is_alphabetic() || c == '_')
                && chars.all(|c| c.is_alphanumeric() || c == '_')
        })
}

/// Render an annotation back to source-like text
fn annotation_text(ann: &Annotation) -> String {
    match ann {
        Annotation::Name(n) => n.clone(),
        Annotation::Subscript { base, args } => {
            let args: Vec<String> = args.iter().map(annotation_text).collect();
            format!("{}[{}]", base, args.join(", "))
        }
        Annotation::Union(items) => items
            .iter()
            .map(annotation_text)
            .collect::<Vec<_>>()
            .join(" | "),
        Annotation::List(items) => {
            let items: Vec<String> = items.iter().map(annotation_text).collect();
            format!("[{}]", items.join(", "))
        }
        Annotation::None => "None".to_string(),
        Annotation::Ellipsis => "...".to_string(),
        Annotation::Str(s) => format!("'{}'", s),
        Annotation::Literal(t) | Annotation::Other(t) => t.clone(),
    }
}

struct Lowerer<'a> {
    options: &'a BuildOptions,
    /// Local name bound by an import -> imported key
    bindings: HashMap<String, String>,
    /// Modules pulled in with `from m import *`, in source order
    star_modules: Vec<String>,
    scopes: Vec<Scope>,
}

impl<'a> Lowerer<'a> {
    fn bind_imports(&mut self, file: &ParsedFile, is_package: bool, module: &mut Module) {
        for import in &file.imports {
            if import.module == "__future__" {
                continue;
            }
            let base = absolute_module(import, &file.module_name, is_package);

            for name in &import.names {
                let (local, key) = match import.kind {
                    ImportKind::Direct => match &name.alias {
                        Some(alias) => (alias.clone(), name.name.clone()),
                        None => {
                            // `import a.b` binds `a`, and keeps `a.b` reachable
                            if name.name.contains('.') && !is_stdlib_module(&name.name) {
                                module.imports.retain(|s| s.name != name.name);
                                module.imports.push(ImportedSymbol {
                                    name: name.name.clone(),
                                    target: Reference::new(name.name.clone()),
                                });
                            }
                            let top = name.name.split('.').next().unwrap_or(&name.name);
                            (top.to_string(), top.to_string())
                        }
                    },
                    ImportKind::From | ImportKind::Relative { .. } => {
                        if name.name == "*" {
                            self.star_modules.push(base.clone());
                            if !is_stdlib_module(&base) {
                                module.imports.push(ImportedSymbol {
                                    name: "*".to_string(),
                                    target: Reference::new(base.clone()),
                                });
                            }
                            continue;
                        }
                        let key = if base.is_empty() {
                            name.name.clone()
                        } else {
                            format!("{}.{}", base, name.name)
                        };
                        (name.used_name().to_string(), key)
                    }
                };

                // A later import of the same name rebinds it
                module.imports.retain(|s| s.name != local);
                // standard-library names are bound but never referenced
                if !is_stdlib_module(&key) {
                    module.imports.push(ImportedSymbol {
                        name: local.clone(),
                        target: Reference::new(key.clone()),
                    });
                }
                self.bindings.insert(local, key);
            }
        }
    }

    fn bind_name(&self, dotted: &str) -> Binding {
        let (head, rest) = match dotted.find('.') {
            Some(dot) => (&dotted[..dot], &dotted[dot..]),
            None => (dotted, ""),
        };

        for scope in self.scopes.iter().rev() {
            if scope.names.contains(head) {
                return Binding::Key(format!("{}.{}", scope.prefix, dotted));
            }
        }

        if let Some(key) = self.bindings.get(head) {
            return classify_key(format!("{}{}", key, rest));
        }

        if rest.is_empty() && BUILTIN_TYPES.contains(&head) {
            return Binding::Builtin(head.to_string());
        }

        if let Some(star) = self.star_modules.first() {
            return classify_key(format!("{}.{}", star, dotted));
        }

        classify_key(dotted.to_string())
    }

    fn type_of(&self, ann: &Annotation) -> TypeExpr {
        match ann {
            Annotation::Name(name) => match self.bind_name(name) {
                Binding::Builtin(b) => TypeExpr::builtin(b),
                Binding::Special(s) => bare_special(&s),
                Binding::External(full) => TypeExpr::builtin(full),
                Binding::Key(key) => TypeExpr::instance(key),
            },
            Annotation::Subscript { base, args } => self.subscript(base, args),
            Annotation::Union(items) => self.union(items.iter().map(|i| self.type_of(i)).collect()),
            Annotation::None => TypeExpr::NoneType,
            Annotation::Ellipsis => TypeExpr::unknown("..."),
            Annotation::Str(s) if is_dotted_identifier(s) => self.type_of(&Annotation::Name(s.clone())),
            Annotation::Str(s) => TypeExpr::unknown(s.clone()),
            Annotation::List(_) => TypeExpr::unknown(annotation_text(ann)),
            Annotation::Literal(t) | Annotation::Other(t) => TypeExpr::unknown(t.clone()),
        }
    }

    fn subscript(&self, base: &str, args: &[Annotation]) -> TypeExpr {
        let converted = || args.iter().map(|a| self.type_of(a)).collect::<Vec<_>>();

        match self.bind_name(base) {
            Binding::Special(form) => match form.as_str() {
                "Optional" => {
                    let mut items = converted();
                    items.push(TypeExpr::NoneType);
                    self.union(items)
                }
                "Union" => self.union(converted()),
                "Tuple" => TypeExpr::Tuple { items: converted() },
                "Callable" => self.callable(args),
                "Literal" => TypeExpr::Literal {
                    values: args.iter().map(annotation_text).collect(),
                },
                "ClassVar" | "Final" | "Annotated" => args
                    .first()
                    .map(|a| self.type_of(a))
                    .unwrap_or(TypeExpr::Any),
                "Any" | "TypeAlias" => TypeExpr::Any,
                other => TypeExpr::Builtin {
                    name: special_builtin_name(other),
                    args: converted(),
                },
            },
            Binding::Builtin(name) if name == "tuple" => TypeExpr::Tuple { items: converted() },
            Binding::Builtin(name) | Binding::External(name) => TypeExpr::Builtin {
                name,
                args: converted(),
            },
            Binding::Key(key) => TypeExpr::Instance {
                type_ref: Reference::new(key),
                args: converted(),
            },
        }
    }

    fn callable(&self, args: &[Annotation]) -> TypeExpr {
        match args {
            [params, ret] => TypeExpr::Callable {
                params: match params {
                    Annotation::Ellipsis => None,
                    Annotation::List(items) => Some(items.iter().map(|i| self.type_of(i)).collect()),
                    other => Some(vec![self.type_of(other)]),
                },
                ret: Box::new(self.type_of(ret)),
            },
            _ => TypeExpr::Callable {
                params: None,
                ret: Box::new(TypeExpr::Any),
            },
        }
    }

    /// Flatten, dedupe and apply the optional-strictness rule
    fn union(&self, items: Vec<TypeExpr>) -> TypeExpr {
        let mut flat: Vec<TypeExpr> = Vec::new();
        for item in items {
            let members = match item {
                TypeExpr::Union { items } => items,
                other => vec![other],
            };
            for member in members {
                if !flat.contains(&member) {
                    flat.push(member);
                }
            }
        }

        if !self.options.strict_optional && flat.iter().any(|t| *t != TypeExpr::NoneType) {
            flat.retain(|t| *t != TypeExpr::NoneType);
        }

        match flat.len() {
            1 => flat.remove(0),
            _ => TypeExpr::Union { items: flat },
        }
    }

    fn span(&self, line_start: usize, line_end: usize) -> Option<Span> {
        self.options
            .preserve_asts
            .then_some(Span { line_start, line_end })
    }

    fn docstring(&self, doc: &Option<String>) -> Option<String> {
        if self.options.include_docstrings {
            doc.clone()
        } else {
            None
        }
    }

    fn lower_body(&mut self, module: &mut Module, body: &[Stmt], parent: Option<DeclIndex>, prefix: &str) {
        let mut variables: HashSet<&str> = HashSet::new();

        for stmt in body {
            match stmt {
                Stmt::Class(class) => self.lower_class(module, class, parent, prefix),
                Stmt::Function(func) => {
                    let decl = self.lower_function(func, prefix);
                    module.add_decl(parent, decl);
                }
                Stmt::Assign(assign) => {
                    // first binding of a name is the declaration
                    if !variables.insert(assign.target.as_str()) {
                        continue;
                    }
                    let decl = self.lower_assignment(assign, parent.is_none(), prefix);
                    module.add_decl(parent, decl);
                }
                Stmt::TypeAlias { name, value, line } => {
                    let mut decl = Declaration::new(
                        name,
                        &format!("{}.{}", prefix, name),
                        DeclKind::TypeAlias(AliasInfo {
                            target: self.type_of(value),
                        }),
                    );
                    decl.span = self.span(*line, *line);
                    module.add_decl(parent, decl);
                }
            }
        }
    }

    fn lower_class(&mut self, module: &mut Module, class: &Class, parent: Option<DeclIndex>, prefix: &str) {
        let fullname = format!("{}.{}", prefix, class.name);
        let info = ClassInfo {
            bases: class.bases.iter().map(|b| self.type_of(b)).collect(),
            metaclass: class.metaclass().map(|m| self.type_of(m)),
            decorators: class.decorators.clone(),
        };

        let mut decl = Declaration::new(&class.name, &fullname, DeclKind::Class(info));
        decl.docstring = self.docstring(&class.docstring);
        decl.span = self.span(class.line_start, class.line_end);
        let index = module.add_decl(parent, decl);

        self.scopes.push(Scope {
            prefix: fullname.clone(),
            names: scope_names(&class.body),
        });
        self.lower_body(module, &class.body, Some(index), &fullname);
        self.scopes.pop();
    }

    fn lower_function(&self, func: &Function, prefix: &str) -> Declaration {
        let params = func
            .parameters
            .iter()
            .map(|p| {
                let has_default = p.default.is_some();
                let kind = match p.kind {
                    ParameterKind::Regular if has_default => ArgKind::ArgOpt,
                    ParameterKind::Regular => ArgKind::ArgPos,
                    ParameterKind::Args => ArgKind::ArgStar,
                    ParameterKind::Kwargs => ArgKind::ArgStar2,
                    ParameterKind::KeywordOnly if has_default => ArgKind::ArgNamedOpt,
                    ParameterKind::KeywordOnly => ArgKind::ArgNamed,
                };
                Param {
                    name: p.name.clone(),
                    kind,
                    ty: p.annotation.as_ref().map(|a| self.type_of(a)),
                    default: if self.options.preserve_asts {
                        p.default.clone()
                    } else {
                        None
                    },
                }
            })
            .collect();

        let sig = FuncSig {
            params,
            ret: func.return_type.as_ref().map(|r| self.type_of(r)),
            is_async: func.is_async,
            decorators: func.decorators.clone(),
            is_static: func.is_staticmethod(),
            is_class: func.is_classmethod(),
            is_property: func.is_property(),
            is_overload: func.is_overload(),
        };

        let mut decl = Declaration::new(
            &func.name,
            &format!("{}.{}", prefix, func.name),
            DeclKind::Function(sig),
        );
        decl.docstring = self.docstring(&func.docstring);
        decl.span = self.span(func.line_start, func.line_end);
        decl
    }

    /// Whether an unannotated right-hand side reads as a type alias
    fn looks_like_alias(&self, value: &Annotation) -> bool {
        match value {
            Annotation::Subscript { base, .. } => matches!(
                self.bind_name(base),
                Binding::Special(_) | Binding::External(_) | Binding::Builtin(_)
            ),
            Annotation::Union(items) => items.iter().all(|item| match item {
                Annotation::None => true,
                Annotation::Name(n) => {
                    !matches!(self.bind_name(n), Binding::Key(_))
                        || n.rsplit('.').next().map_or(false, |last| {
                            last.chars().next().map_or(false, char::is_uppercase)
                        })
                }
                other => self.looks_like_alias(other),
            }),
            _ => false,
        }
    }

    fn lower_assignment(&self, assign: &Assignment, module_level: bool, prefix: &str) -> Declaration {
        let fullname = format!("{}.{}", prefix, assign.target);
        let value = if self.options.preserve_asts {
            assign.value.clone()
        } else {
            None
        };

        let kind = match &assign.annotation {
            Some(Annotation::Name(n)) if self.bind_name(n) == Binding::Special("TypeAlias".into()) => {
                DeclKind::TypeAlias(AliasInfo {
                    target: match &assign.value_type {
                        Some(v) => self.type_of(v),
                        None => TypeExpr::unknown(assign.value.clone().unwrap_or_default()),
                    },
                })
            }
            Some(annotation) => DeclKind::Variable(self.variable(annotation, value)),
            None => match &assign.value_type {
                Some(v) if module_level && self.looks_like_alias(v) => {
                    DeclKind::TypeAlias(AliasInfo { target: self.type_of(v) })
                }
                _ => DeclKind::Variable(VarInfo {
                    value,
                    ..VarInfo::default()
                }),
            },
        };

        let mut decl = Declaration::new(&assign.target, &fullname, kind);
        decl.span = self.span(assign.line, assign.line);
        decl
    }

    /// Variable info from an annotation, peeling `ClassVar` and `Final`
    fn variable(&self, annotation: &Annotation, value: Option<String>) -> VarInfo {
        let mut info = VarInfo {
            value,
            ..VarInfo::default()
        };

        let mut current = Some(annotation);
        while let Some(ann) = current {
            let (form, inner) = match ann {
                Annotation::Name(n) => (self.bind_name(n), None),
                Annotation::Subscript { base, args } => (self.bind_name(base), args.first()),
                _ => (Binding::Key(String::new()), None),
            };
            match form {
                Binding::Special(s) if s == "ClassVar" => info.is_classvar = true,
                Binding::Special(s) if s == "Final" => info.is_final = true,
                _ => {
                    info.ty = Some(self.type_of(ann));
                    break;
                }
            }
            current = inner;
        }

        info
    }
}

fn classify_key(key: String) -> Binding {
    if let Some(builtin) = key.strip_prefix("builtins.") {
        return Binding::Builtin(builtin.to_string());
    }
    match typing_member(&key) {
        Some(member) if SPECIAL_FORMS.contains(&member) => Binding::Special(member.to_string()),
        Some(_) => Binding::External(key),
        None if is_stdlib_module(&key) => Binding::External(key),
        None => Binding::Key(key),
    }
}

/// Builtin spelled by a bare special form such as `List`
fn special_builtin_name(form: &str) -> String {
    match form {
        "List" => "list".to_string(),
        "Dict" => "dict".to_string(),
        "Set" => "set".to_string(),
        "FrozenSet" => "frozenset".to_string(),
        "Type" => "type".to_string(),
        other => format!("typing.{}", other),
    }
}

fn bare_special(form: &str) -> TypeExpr {
    match form {
        "Any" | "TypeAlias" => TypeExpr::Any,
        "Tuple" => TypeExpr::builtin("tuple"),
        "Callable" => TypeExpr::Callable {
            params: None,
            ret: Box::new(TypeExpr::Any),
        },
        other => TypeExpr::builtin(special_builtin_name(other)),
    }
}
