// Syntax-level view of a Python file
//
// These types carry names exactly as written in the source. Binding them to
// fully-qualified declarations happens in `analysis::lower`.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A parsed Python file
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedFile {
    /// Absolute source path
    pub path: PathBuf,
    /// Fully-qualified module name
    pub module_name: String,
    /// Module-level docstring
    pub docstring: Option<String>,
    /// All module-level imports, including those nested in `if`/`try` blocks
    pub imports: Vec<Import>,
    /// Module-level definitions in source order
    pub body: Vec<Stmt>,
    /// Line of the first syntax error, if the tree has any
    pub syntax_error: Option<usize>,
}

impl ParsedFile {
    pub fn new(path: PathBuf, module_name: String) -> Self {
        Self {
            path,
            module_name,
            docstring: None,
            imports: Vec::new(),
            body: Vec::new(),
            syntax_error: None,
        }
    }

    /// Check if file has any definitions
    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }

    pub fn classes(&self) -> impl Iterator<Item = &Class> {
        self.body.iter().filter_map(|s| match s {
            Stmt::Class(c) => Some(c),
            _ => None,
        })
    }

    pub fn functions(&self) -> impl Iterator<Item = &Function> {
        self.body.iter().filter_map(|s| match s {
            Stmt::Function(f) => Some(f),
            _ => None,
        })
    }
}

/// A definition statement at module or class level
#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Class(Class),
    Function(Function),
    Assign(Assignment),
    /// `type X = ...`
    TypeAlias { name: String, value: Annotation, line: usize },
}

/// An import statement
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Import {
    /// The module being imported from (empty for `from . import x`)
    pub module: String,
    /// Names imported; for `import a.b` this holds `a.b` itself
    pub names: Vec<ImportedName>,
    /// Import kind
    pub kind: ImportKind,
    /// Line number
    pub line: usize,
}

impl Import {
    /// Create a simple `import x` style import
    pub fn simple(module: &str, line: usize) -> Self {
        Self {
            module: module.to_string(),
            names: vec![ImportedName::new(module)],
            kind: ImportKind::Direct,
            line,
        }
    }

    /// Create a `from x import y` style import
    pub fn from_import(module: &str, names: Vec<ImportedName>, line: usize) -> Self {
        Self {
            module: module.to_string(),
            names,
            kind: ImportKind::From,
            line,
        }
    }

    /// Create a relative import
    pub fn relative(module: &str, names: Vec<ImportedName>, level: usize, line: usize) -> Self {
        Self {
            module: module.to_string(),
            names,
            kind: ImportKind::Relative { level },
            line,
        }
    }

    pub fn is_wildcard(&self) -> bool {
        self.names.iter().any(|n| n.name == "*")
    }
}

/// A single imported name with optional alias
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ImportedName {
    /// Original name
    pub name: String,
    /// Alias (from `as` clause)
    pub alias: Option<String>,
}

impl ImportedName {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            alias: None,
        }
    }

    pub fn with_alias(name: &str, alias: &str) -> Self {
        Self {
            name: name.to_string(),
            alias: Some(alias.to_string()),
        }
    }

    /// Get the name as used in code (alias if present, otherwise original)
    pub fn used_name(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }
}

/// Kind of import statement
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum ImportKind {
    /// `import x` or `import x as y`
    Direct,
    /// `from x import y`
    From,
    /// `from . import y` or `from ..x import y`
    Relative { level: usize },
}

impl ImportKind {
    pub fn is_relative(&self) -> bool {
        matches!(self, ImportKind::Relative { .. })
    }
}

/// A type annotation as written
#[derive(Debug, Clone, PartialEq)]
pub enum Annotation {
    /// Possibly dotted name: `int`, `a.Base`
    Name(String),
    /// `Base[arg, ...]`
    Subscript { base: String, args: Vec<Annotation> },
    /// `A | B`
    Union(Vec<Annotation>),
    /// `[A, B]` as in `Callable[[A, B], R]`
    List(Vec<Annotation>),
    None,
    Ellipsis,
    /// Quoted forward reference, unquoted
    Str(String),
    /// Numeric or boolean literal, as in `Literal[1]`
    Literal(String),
    /// Anything else, kept as source text
    Other(String),
}

/// A class definition
#[derive(Debug, Clone, PartialEq)]
pub struct Class {
    /// Class name
    pub name: String,
    /// Class docstring
    pub docstring: Option<String>,
    /// Base classes as written
    pub bases: Vec<Annotation>,
    /// Keyword arguments in the class header, e.g. `metaclass=ABCMeta`
    pub keywords: Vec<(String, Annotation)>,
    /// Decorators applied to the class
    pub decorators: Vec<String>,
    /// Class body definitions
    pub body: Vec<Stmt>,
    /// Starting line number
    pub line_start: usize,
    /// Ending line number
    pub line_end: usize,
}

impl Class {
    pub fn new(name: &str, line_start: usize) -> Self {
        Self {
            name: name.to_string(),
            docstring: None,
            bases: Vec::new(),
            keywords: Vec::new(),
            decorators: Vec::new(),
            body: Vec::new(),
            line_start,
            line_end: line_start,
        }
    }

    /// Metaclass keyword, if present
    pub fn metaclass(&self) -> Option<&Annotation> {
        self.keywords
            .iter()
            .find(|(k, _)| k == "metaclass")
            .map(|(_, v)| v)
    }

    /// Get methods defined directly in the body
    pub fn methods(&self) -> impl Iterator<Item = &Function> {
        self.body.iter().filter_map(|s| match s {
            Stmt::Function(f) => Some(f),
            _ => None,
        })
    }
}

/// A function or method definition
#[derive(Debug, Clone, PartialEq)]
pub struct Function {
    /// Function name
    pub name: String,
    /// Function docstring
    pub docstring: Option<String>,
    /// Parameters with types and defaults
    pub parameters: Vec<Parameter>,
    /// Return type annotation
    pub return_type: Option<Annotation>,
    /// Decorators applied
    pub decorators: Vec<String>,
    /// Whether this is an async function
    pub is_async: bool,
    /// Starting line number
    pub line_start: usize,
    /// Ending line number
    pub line_end: usize,
}

impl Function {
    pub fn new(name: &str, line_start: usize) -> Self {
        Self {
            name: name.to_string(),
            docstring: None,
            parameters: Vec::new(),
            return_type: None,
            decorators: Vec::new(),
            is_async: false,
            line_start,
            line_end: line_start,
        }
    }

    pub fn has_decorator(&self, name: &str) -> bool {
        self.decorators
            .iter()
            .any(|d| d == name || d.rsplit('.').next() == Some(name))
    }

    /// Check if this is a property
    pub fn is_property(&self) -> bool {
        self.has_decorator("property") || self.decorators.iter().any(|d| d.ends_with(".getter"))
    }

    /// Check if this is a classmethod
    pub fn is_classmethod(&self) -> bool {
        self.has_decorator("classmethod")
    }

    /// Check if this is a staticmethod
    pub fn is_staticmethod(&self) -> bool {
        self.has_decorator("staticmethod")
    }

    pub fn is_overload(&self) -> bool {
        self.has_decorator("overload")
    }
}

/// A function parameter
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    /// Parameter name
    pub name: String,
    /// Type annotation
    pub annotation: Option<Annotation>,
    /// Default value as source text
    pub default: Option<String>,
    /// Parameter kind
    pub kind: ParameterKind,
}

impl Parameter {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            annotation: None,
            default: None,
            kind: ParameterKind::Regular,
        }
    }
}

/// Kind of function parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParameterKind {
    /// Positional or keyword parameter
    Regular,
    /// *args
    Args,
    /// **kwargs
    Kwargs,
    /// Keyword-only (after `*` or `*args`)
    KeywordOnly,
}

/// An assignment to a plain name, `X = ...` or `x: T = ...`
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    pub target: String,
    pub annotation: Option<Annotation>,
    /// Right-hand side as source text
    pub value: Option<String>,
    /// Right-hand side read as a type, when it has that shape
    pub value_type: Option<Annotation>,
    pub line: usize,
}

impl Assignment {
    pub fn new(target: &str, line: usize) -> Self {
        Self {
            target: target.to_string(),
            annotation: None,
            value: None,
            value_type: None,
            line,
        }
    }
}
