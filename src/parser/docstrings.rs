// Docstring extraction straight from the syntax tree
//
// Independent of the declaration graph: no name binding, no imports.

use crate::error::{Error, Result};
use crate::parser::python::{block_docstring, first_error_line, read_source, PythonParser};
use std::collections::BTreeMap;
use std::path::Path;
use tree_sitter::Node;

/// Maps fully-qualified symbol names to cleaned docstrings
pub type DocstringIndex = BTreeMap<String, String>;

/// Extracts docstrings for every module, class and function in a file
pub struct DocstringExtractor {
    parser: PythonParser,
}

impl DocstringExtractor {
    pub fn new() -> Result<Self> {
        Ok(Self {
            parser: PythonParser::new()?,
        })
    }

    /// Extract docstrings from a file on disk
    pub fn extract_file(&mut self, path: &Path, module_name: &str) -> Result<DocstringIndex> {
        let source = read_source(path)?;
        self.extract_source(&source, path, module_name)
    }

    /// Extract docstrings from source text.
    ///
    /// The module itself is keyed by `module_name`; classes and functions by
    /// their nearest enclosing module, class or function plus their own name.
    pub fn extract_source(
        &mut self,
        source: &str,
        path: &Path,
        module_name: &str,
    ) -> Result<DocstringIndex> {
        let tree = self.parser.parse_tree(source)?;
        let root = tree.root_node();
        if let Some(line) = first_error_line(&root) {
            return Err(Error::analysis(path, format!("syntax error at line {}", line)));
        }

        let src = source.as_bytes();
        let mut index = DocstringIndex::new();
        record(&mut index, module_name, block_docstring(&root, src));
        visit_children(&root, module_name, src, &mut index);

        tracing::debug!("{} docstrings in {}", index.len(), module_name);
        Ok(index)
    }
}

/// Convenience wrapper: extract docstrings from one file
pub fn extract_docstrings(path: &Path, module_name: &str) -> Result<DocstringIndex> {
    DocstringExtractor::new()?.extract_file(path, module_name)
}

fn record(index: &mut DocstringIndex, name: &str, doc: Option<String>) {
    if let Some(doc) = doc.filter(|d| !d.is_empty()) {
        index.insert(name.to_string(), doc);
    }
}

fn visit_children(node: &Node, scope: &str, source: &[u8], index: &mut DocstringIndex) {
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        visit(&child, scope, source, index);
    }
}

fn visit(node: &Node, scope: &str, source: &[u8], index: &mut DocstringIndex) {
    match node.kind() {
        "class_definition" | "function_definition" => {
            let name = node
                .child_by_field_name("name")
                .and_then(|n| n.utf8_text(source).ok());
            let (Some(name), Some(body)) = (name, node.child_by_field_name("body")) else {
                return;
            };
            let qualified = format!("{}.{}", scope, name);
            record(index, &qualified, block_docstring(&body, source));
            visit_children(&body, &qualified, source, index);
        }
        _ => visit_children(node, scope, source, index),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn extract(source: &str, module: &str) -> DocstringIndex {
        DocstringExtractor::new()
            .unwrap()
            .extract_source(source, Path::new("/src/m.py"), module)
            .unwrap()
    }

    #[test]
    fn test_function_and_method() {
        let source = r#"
def f():
    """doc f"""

class C:
    def m(self):
        """doc m"""
"#;
        let index = extract(source, "m");
        assert_eq!(index.len(), 2);
        assert_eq!(index.get("m.f").map(String::as_str), Some("doc f"));
        assert_eq!(index.get("m.C.m").map(String::as_str), Some("doc m"));
        assert!(!index.contains_key("m.C"));
    }

    #[test]
    fn test_module_docstring_keyed_by_module_name() {
        let index = extract("'''Top level.'''\nx = 1\n", "pkg.mod");
        assert_eq!(index.get("pkg.mod").map(String::as_str), Some("Top level."));
    }

    #[test]
    fn test_nested_function_and_class() {
        let source = r#"
def outer():
    def inner():
        "inner doc"
    class Local:
        """local doc"""
"#;
        let index = extract(source, "m");
        assert_eq!(index.get("m.outer.inner").map(String::as_str), Some("inner doc"));
        assert_eq!(index.get("m.outer.Local").map(String::as_str), Some("local doc"));
    }

    #[test]
    fn test_conditional_def_uses_enclosing_scope() {
        let source = r#"
class C:
    if True:
        def m(self):
            """guarded"""
"#;
        let index = extract(source, "m");
        assert_eq!(index.get("m.C.m").map(String::as_str), Some("guarded"));
    }

    #[test]
    fn test_decorated_function() {
        let source = "@property\ndef value(self):\n    \"\"\"The value.\"\"\"\n";
        let index = extract(source, "m");
        assert_eq!(index.get("m.value").map(String::as_str), Some("The value."));
    }

    #[test]
    fn test_cleaned_indentation() {
        let source = "def f():\n    \"\"\"Summary.\n\n        Indented.\n    Back.\n    \"\"\"\n";
        let index = extract(source, "m");
        assert_eq!(index["m.f"], "Summary.\n\n    Indented.\nBack.");
    }

    #[test]
    fn test_empty_docstring_skipped() {
        let index = extract("def f():\n    \"\"\"   \"\"\"\n", "m");
        assert!(index.is_empty());
    }

    #[test]
    fn test_non_docstring_strings_ignored() {
        let source = "def f():\n    x = 1\n    \"\"\"not a docstring\"\"\"\n\ndef g():\n    f\"doc {x}\"\n";
        let index = extract(source, "m");
        assert!(index.is_empty());
    }

    #[test]
    fn test_concatenated_docstring() {
        let index = extract("class C:\n    \"\"\"Joined \"\"\" \"parts.\"\n", "m");
        assert_eq!(index["m.C"], "Joined parts.");
    }

    #[test]
    fn test_syntax_error() {
        let result = DocstringExtractor::new()
            .unwrap()
            .extract_source("def broken(:\n", Path::new("/src/bad.py"), "bad");
        assert!(matches!(result, Err(Error::Analysis { .. })));
    }

    #[test]
    fn test_extract_docstrings_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "class A:\n    \"\"\"Alpha.\"\"\"").unwrap();
        let index = extract_docstrings(file.path(), "a").unwrap();
        assert_eq!(index.get("a.A").map(String::as_str), Some("Alpha."));
    }

    #[test]
    fn test_missing_file() {
        let result = extract_docstrings(Path::new("/nonexistent/x.py"), "x");
        assert!(matches!(result, Err(Error::SourceNotFound(_))));
    }
}
