// Import resolution for Python modules
//
// Classifies imports so the analyzer knows which ones to follow:
// - Standard library (never followed)
// - Local (found under a search root, followed)
// - Third-party (anything else, never followed)

use crate::parser::{Import, ImportKind};
use std::path::{Path, PathBuf};

/// Classification of an imported module
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportType {
    /// Python standard library module
    Stdlib,
    /// Not found under any search root
    ThirdParty,
    /// Module file found under a search root
    Local,
}

/// Where an imported module lives
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedModule {
    /// Fully-qualified module name
    pub module: String,
    pub import_type: ImportType,
    /// Source file (for local modules)
    pub path: Option<PathBuf>,
    /// Search root the file was found under
    pub root: Option<PathBuf>,
}

/// Absolute name of the module an import statement refers to.
///
/// `current` is the importing module; `is_package` tells whether it is an
/// `__init__` file, which anchors relative imports at the package itself.
pub fn absolute_module(import: &Import, current: &str, is_package: bool) -> String {
    let ImportKind::Relative { level } = import.kind else {
        return import.module.clone();
    };

    let mut parts: Vec<&str> = current.split('.').collect();
    let drop = if is_package { level - 1 } else { level };
    parts.truncate(parts.len().saturating_sub(drop));

    if !import.module.is_empty() {
        parts.push(&import.module);
    }
    parts.join(".")
}

/// Python 3.10+ stdlib modules (top-level only)
const STDLIB_MODULES: &[&str] = &[
    "abc", "aifc", "argparse", "array", "ast", "asynchat", "asyncio",
    "asyncore", "atexit", "audioop", "base64", "bdb", "binascii",
    "bisect", "builtins", "bz2", "calendar", "cgi", "cgitb", "chunk",
    "cmath", "cmd", "code", "codecs", "codeop", "collections",
    "colorsys", "compileall", "concurrent", "configparser", "contextlib",
    "contextvars", "copy", "copyreg", "cProfile", "crypt", "csv",
    "ctypes", "curses", "dataclasses", "datetime", "dbm", "decimal",
    "difflib", "dis", "distutils", "doctest", "email", "encodings",
    "enum", "errno", "faulthandler", "fcntl", "filecmp", "fileinput",
    "fnmatch", "fractions", "ftplib", "functools", "gc", "getopt",
    "getpass", "gettext", "glob", "graphlib", "grp", "gzip", "hashlib",
    "heapq", "hmac", "html", "http", "imaplib", "importlib", "inspect",
    "io", "ipaddress", "itertools", "json", "keyword", "linecache",
    "locale", "logging", "lzma", "mailbox", "marshal", "math",
    "mimetypes", "mmap", "multiprocessing", "netrc", "numbers",
    "operator", "optparse", "os", "pathlib", "pdb", "pickle",
    "pkgutil", "platform", "plistlib", "poplib", "posix", "posixpath",
    "pprint", "profile", "pstats", "pty", "pwd", "py_compile",
    "pyclbr", "pydoc", "queue", "quopri", "random", "re", "readline",
    "reprlib", "resource", "runpy", "sched", "secrets", "select",
    "selectors", "shelve", "shlex", "shutil", "signal", "site",
    "smtplib", "socket", "socketserver", "sqlite3", "ssl", "stat",
    "statistics", "string", "struct", "subprocess", "symtable", "sys",
    "sysconfig", "syslog", "tarfile", "tempfile", "termios", "textwrap",
    "threading", "time", "timeit", "tkinter", "token", "tokenize",
    "tomllib", "trace", "traceback", "tracemalloc", "tty", "types",
    "typing", "unicodedata", "unittest", "urllib", "uuid", "venv",
    "warnings", "wave", "weakref", "webbrowser", "wsgiref", "xml",
    "xmlrpc", "zipapp", "zipfile", "zipimport", "zlib", "zoneinfo",
    // Common typing extensions
    "typing_extensions",
    // Underscore modules
    "_thread", "__future__",
];

/// Whether a dotted module name belongs to the standard library
pub fn is_stdlib_module(module: &str) -> bool {
    let top_level = module.split('.').next().unwrap_or(module);
    STDLIB_MODULES.contains(&top_level)
}

/// Locates Python modules by name under a set of search roots
pub struct ImportResolver {
    /// Directories that hold top-level packages, in priority order
    search_roots: Vec<PathBuf>,
}

impl ImportResolver {
    /// Create a resolver over the given search roots
    pub fn new(search_roots: Vec<PathBuf>) -> Self {
        let mut roots: Vec<PathBuf> = Vec::new();
        for root in search_roots {
            if !roots.contains(&root) {
                roots.push(root);
            }
        }
        Self {
            search_roots: roots,
        }
    }

    /// Check if a module name is from the standard library
    pub fn is_stdlib(&self, module: &str) -> bool {
        is_stdlib_module(module)
    }

    /// Classify a module by fully-qualified name
    pub fn resolve(&self, module: &str) -> ResolvedModule {
        if self.is_stdlib(module) {
            return ResolvedModule {
                module: module.to_string(),
                import_type: ImportType::Stdlib,
                path: None,
                root: None,
            };
        }

        match self.find_module(module) {
            Some((path, root)) => ResolvedModule {
                module: module.to_string(),
                import_type: ImportType::Local,
                path: Some(path),
                root: Some(root),
            },
            None => ResolvedModule {
                module: module.to_string(),
                import_type: ImportType::ThirdParty,
                path: None,
                root: None,
            },
        }
    }

    /// Find the module that defines `key`: the key itself, or its longest
    /// dotted prefix that names a local module.
    pub fn resolve_key(&self, key: &str) -> Option<ResolvedModule> {
        if self.is_stdlib(key) {
            return None;
        }
        let mut candidate = key;
        loop {
            let resolved = self.resolve(candidate);
            if resolved.import_type == ImportType::Local {
                return Some(resolved);
            }
            match candidate.rfind('.') {
                Some(dot) => candidate = &candidate[..dot],
                None => return None,
            }
        }
    }

    /// Find the file for a module under the search roots
    pub fn find_module(&self, module: &str) -> Option<(PathBuf, PathBuf)> {
        if module.is_empty() {
            return None;
        }
        let relative = module.replace('.', "/");
        self.search_roots.iter().find_map(|root| {
            Self::find_module_file(&root.join(&relative)).map(|path| (path, root.clone()))
        })
    }

    /// Find the actual file for a module path
    fn find_module_file(module_path: &Path) -> Option<PathBuf> {
        for ext in ["py", "pyi"] {
            let file = module_path.with_extension(ext);
            if file.is_file() {
                return Some(file);
            }
        }

        // Try as a package (directory with __init__.py)
        let init_file = module_path.join("__init__.py");
        if init_file.is_file() {
            return Some(init_file);
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::ImportedName;
    use std::fs;
    use tempfile::TempDir;

    fn create_test_project() -> TempDir {
        let dir = TempDir::new().unwrap();

        // project/
        //   app/
        //     __init__.py
        //     main.py
        //     utils/
        //       __init__.py
        //       helpers.py
        let app = dir.path().join("app");
        let utils = app.join("utils");
        fs::create_dir_all(&utils).unwrap();

        fs::write(app.join("__init__.py"), "").unwrap();
        fs::write(app.join("main.py"), "# main").unwrap();
        fs::write(utils.join("__init__.py"), "").unwrap();
        fs::write(utils.join("helpers.py"), "# helpers").unwrap();

        dir
    }

    #[test]
    fn test_stdlib_detection() {
        let resolver = ImportResolver::new(vec![PathBuf::from("/tmp")]);

        assert!(resolver.is_stdlib("os"));
        assert!(resolver.is_stdlib("typing"));
        assert!(resolver.is_stdlib("os.path"));
        assert!(resolver.is_stdlib("collections.abc"));

        assert!(!resolver.is_stdlib("numpy"));
        assert!(!resolver.is_stdlib("requests"));
    }

    #[test]
    fn test_resolve_stdlib() {
        let resolver = ImportResolver::new(vec![PathBuf::from("/tmp")]);
        let resolved = resolver.resolve("json");
        assert_eq!(resolved.import_type, ImportType::Stdlib);
        assert!(resolved.path.is_none());
    }

    #[test]
    fn test_resolve_local_module_and_package() {
        let project = create_test_project();
        let resolver = ImportResolver::new(vec![project.path().to_path_buf()]);

        let main = resolver.resolve("app.main");
        assert_eq!(main.import_type, ImportType::Local);
        assert!(main.path.unwrap().ends_with("app/main.py"));

        let utils = resolver.resolve("app.utils");
        assert!(utils.path.unwrap().ends_with("app/utils/__init__.py"));
        assert_eq!(utils.root.as_deref(), Some(project.path()));
    }

    #[test]
    fn test_resolve_unknown_is_third_party() {
        let resolver = ImportResolver::new(vec![PathBuf::from("/nonexistent")]);
        let resolved = resolver.resolve("some_unknown_package");
        assert_eq!(resolved.import_type, ImportType::ThirdParty);
    }

    #[test]
    fn test_resolve_key_strips_symbol() {
        let project = create_test_project();
        let resolver = ImportResolver::new(vec![project.path().to_path_buf()]);

        let resolved = resolver.resolve_key("app.utils.helpers.format_name").unwrap();
        assert_eq!(resolved.module, "app.utils.helpers");
        assert!(resolver.resolve_key("os.path.join").is_none());
        assert!(resolver.resolve_key("elsewhere.Thing").is_none());
    }

    #[test]
    fn test_absolute_module_relative_forms() {
        let from_sibling = Import::relative("utils", vec![ImportedName::new("helpers")], 1, 1);
        assert_eq!(absolute_module(&from_sibling, "app.main", false), "app.utils");
        assert_eq!(absolute_module(&from_sibling, "app", true), "app.utils");

        let from_parent = Import::relative("", vec![ImportedName::new("main")], 2, 1);
        assert_eq!(absolute_module(&from_parent, "app.utils.helpers", false), "app");

        let plain = Import::simple("os.path", 1);
        assert_eq!(absolute_module(&plain, "app.main", false), "os.path");
    }
}
