// Python parser using tree-sitter

use crate::error::{Error, Result};
use crate::parser::ast::*;
use std::path::{Path, PathBuf};
use tree_sitter::{Node, Parser, Tree};

/// Parser for Python source files
pub struct PythonParser {
    parser: Parser,
}

impl PythonParser {
    /// Create a new Python parser
    pub fn new() -> Result<Self> {
        let mut parser = Parser::new();
        let language = tree_sitter_python::language();
        parser
            .set_language(&language)
            .map_err(|e| Error::Parser(format!("Failed to set Python language: {}", e)))?;
        Ok(Self { parser })
    }

    /// Parse source into a raw syntax tree
    pub fn parse_tree(&mut self, source: &str) -> Result<Tree> {
        self.parser
            .parse(source, None)
            .ok_or_else(|| Error::parser("Failed to parse source"))
    }

    /// Parse Python source code
    pub fn parse_source(
        &mut self,
        source: &str,
        path: PathBuf,
        module_name: String,
    ) -> Result<ParsedFile> {
        let tree = self.parse_tree(source)?;
        let root = tree.root_node();
        let src = source.as_bytes();

        let mut file = ParsedFile::new(path, module_name);
        file.syntax_error = first_error_line(&root);
        file.docstring = block_docstring(&root, src);
        collect_statements(&root, src, &mut file.body, &mut file.imports);

        Ok(file)
    }
}

/// Read a source file, mapping a missing file to `SourceNotFound`
pub(crate) fn read_source(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => Error::SourceNotFound(path.to_path_buf()),
        _ => Error::Io(std::io::Error::new(
            e.kind(),
            format!("{}: {}", path.display(), e),
        )),
    })
}

/// Line of the first ERROR or MISSING node, if any
pub(crate) fn first_error_line(root: &Node) -> Option<usize> {
    if !root.has_error() {
        return None;
    }

    let mut stack = vec![*root];
    while let Some(node) = stack.pop() {
        if node.is_error() || node.is_missing() {
            return Some(node.start_position().row + 1);
        }
        if node.has_error() {
            let mut cursor = node.walk();
            let children: Vec<Node> = node.children(&mut cursor).collect();
            stack.extend(children.into_iter().rev());
        }
    }

    Some(root.start_position().row + 1)
}

/// Docstring of a module root or a block: a lone string as first statement
pub(crate) fn block_docstring(block: &Node, source: &[u8]) -> Option<String> {
    let mut cursor = block.walk();
    let first = block
        .named_children(&mut cursor)
        .find(|c| c.kind() != "comment")?;
    if first.kind() != "expression_statement" {
        return None;
    }

    let mut inner = first.walk();
    let exprs: Vec<Node> = first.named_children(&mut inner).collect();
    match exprs.as_slice() {
        [only] if only.kind() == "string" => string_literal_value(only, source).map(|s| cleandoc(&s)),
        [only] if only.kind() == "concatenated_string" => {
            concatenated_value(only, source).map(|s| cleandoc(&s))
        }
        _ => None,
    }
}

/// Value of implicitly concatenated plain literals such as `"a" "b"`
fn concatenated_value(node: &Node, source: &[u8]) -> Option<String> {
    let mut cursor = node.walk();
    let mut value = String::new();
    for part in node.named_children(&mut cursor) {
        match part.kind() {
            "string" => value.push_str(&string_literal_value(&part, source)?),
            "comment" => {}
            _ => return None,
        }
    }
    Some(value)
}

/// Value of a plain (non-f, non-bytes) string literal
pub(crate) fn string_literal_value(node: &Node, source: &[u8]) -> Option<String> {
    let text = node.utf8_text(source).ok()?;
    let prefix_len = text.chars().take_while(|c| c.is_ascii_alphabetic()).count();
    let prefix = text[..prefix_len].to_ascii_lowercase();
    if prefix.contains('f') || prefix.contains('b') {
        return None;
    }
    let raw = prefix.contains('r');
    let quoted = &text[prefix_len..];

    let body = if (quoted.starts_with("\"\"\"") || quoted.starts_with("'''")) && quoted.len() >= 6 {
        &quoted[3..quoted.len() - 3]
    } else if (quoted.starts_with('"') || quoted.starts_with('\'')) && quoted.len() >= 2 {
        &quoted[1..quoted.len() - 1]
    } else {
        return None;
    };

    Some(if raw { body.to_string() } else { unescape(body) })
}

/// Resolve the common backslash escapes of a Python string literal
fn unescape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('0') => out.push('\0'),
            Some('\\') => out.push('\\'),
            Some('\'') => out.push('\''),
            Some('"') => out.push('"'),
            // line continuation
            Some('\n') => {}
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

fn expand_tabs(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    let mut column = 0;
    for c in line.chars() {
        match c {
            '\t' => {
                let spaces = 8 - column % 8;
                out.extend(std::iter::repeat(' ').take(spaces));
                column += spaces;
            }
            '\n' | '\r' => {
                out.push(c);
                column = 0;
            }
            _ => {
                out.push(c);
                column += 1;
            }
        }
    }
    out
}

/// Normalize docstring indentation the way `inspect.cleandoc` does
pub fn cleandoc(doc: &str) -> String {
    let expanded = expand_tabs(doc);
    let mut lines: Vec<String> = expanded.split('\n').map(|l| l.to_string()).collect();

    let margin = lines
        .iter()
        .skip(1)
        .filter(|l| !l.trim_start().is_empty())
        .map(|l| l.len() - l.trim_start().len())
        .min();

    if let Some(first) = lines.first_mut() {
        *first = first.trim_start().to_string();
    }
    if let Some(margin) = margin {
        for line in lines.iter_mut().skip(1) {
            *line = line.chars().skip(margin).collect();
        }
    }

    while lines.last().map_or(false, |l| l.is_empty()) {
        lines.pop();
    }
    while lines.first().map_or(false, |l| l.is_empty()) {
        lines.remove(0);
    }

    lines.join("\n")
}

/// Collect definitions and imports from a module root or block.
///
/// Descends into `if`/`try`/`with` bodies so conditional definitions are kept.
fn collect_statements(node: &Node, source: &[u8], body: &mut Vec<Stmt>, imports: &mut Vec<Import>) {
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        match child.kind() {
            "import_statement" => {
                imports.extend(parse_import(&child, source));
            }
            "import_from_statement" => {
                if let Some(import) = parse_import_from(&child, source) {
                    imports.push(import);
                }
            }
            "class_definition" => {
                if let Some(class) = parse_class(&child, source, Vec::new()) {
                    body.push(Stmt::Class(class));
                }
            }
            "function_definition" => {
                if let Some(func) = parse_function(&child, source, Vec::new()) {
                    body.push(Stmt::Function(func));
                }
            }
            "decorated_definition" => {
                if let Some(stmt) = parse_decorated(&child, source) {
                    body.push(stmt);
                }
            }
            "expression_statement" => {
                if let Some(assign) = parse_assignment(&child, source) {
                    body.push(Stmt::Assign(assign));
                }
            }
            "type_alias_statement" => {
                if let Some(stmt) = parse_type_alias_statement(&child, source) {
                    body.push(stmt);
                }
            }
            "if_statement" | "try_statement" | "with_statement" => {
                for block in nested_blocks(&child) {
                    collect_statements(&block, source, body, imports);
                }
            }
            _ => {}
        }
    }
}

/// Blocks of a compound statement and its clauses
fn nested_blocks<'a>(node: &Node<'a>) -> Vec<Node<'a>> {
    let mut blocks = Vec::new();
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        if child.kind() == "block" {
            blocks.push(child);
        } else if child.kind().ends_with("_clause") {
            blocks.extend(nested_blocks(&child));
        }
    }
    blocks
}

/// Parse an import statement: `import a.b, c as d`
fn parse_import(node: &Node, source: &[u8]) -> Vec<Import> {
    let line = node.start_position().row + 1;
    let mut imports = Vec::new();

    let mut cursor = node.walk();
    for child in node.children_by_field_name("name", &mut cursor) {
        let name = match child.kind() {
            "dotted_name" => child.utf8_text(source).ok().map(ImportedName::new),
            "aliased_import" => aliased_name(&child, source),
            _ => None,
        };
        if let Some(name) = name {
            imports.push(Import {
                module: name.name.clone(),
                names: vec![name],
                kind: ImportKind::Direct,
                line,
            });
        }
    }

    imports
}

fn aliased_name(node: &Node, source: &[u8]) -> Option<ImportedName> {
    let name = node.child_by_field_name("name")?.utf8_text(source).ok()?;
    match node.child_by_field_name("alias") {
        Some(alias) => Some(ImportedName::with_alias(name, alias.utf8_text(source).ok()?)),
        None => Some(ImportedName::new(name)),
    }
}

/// Parse an import-from statement: `from x import y`
fn parse_import_from(node: &Node, source: &[u8]) -> Option<Import> {
    let line = node.start_position().row + 1;
    let module_node = node.child_by_field_name("module_name")?;

    let mut module = String::new();
    let mut relative_level = 0;
    if module_node.kind() == "relative_import" {
        let mut cursor = module_node.walk();
        for inner in module_node.named_children(&mut cursor) {
            match inner.kind() {
                "import_prefix" => {
                    relative_level = inner.utf8_text(source).ok()?.chars().filter(|c| *c == '.').count();
                }
                "dotted_name" => {
                    module = inner.utf8_text(source).ok()?.to_string();
                }
                _ => {}
            }
        }
    } else {
        module = module_node.utf8_text(source).ok()?.to_string();
    }

    let mut names = Vec::new();
    let mut cursor = node.walk();
    for child in node.children_by_field_name("name", &mut cursor) {
        match child.kind() {
            "dotted_name" => names.push(ImportedName::new(child.utf8_text(source).ok()?)),
            "aliased_import" => names.extend(aliased_name(&child, source)),
            _ => {}
        }
    }

    let mut cursor = node.walk();
    if node.named_children(&mut cursor).any(|c| c.kind() == "wildcard_import") {
        names.push(ImportedName::new("*"));
    }

    Some(if relative_level > 0 {
        Import::relative(&module, names, relative_level, line)
    } else {
        Import::from_import(&module, names, line)
    })
}

/// Parse a decorated class or function
fn parse_decorated(node: &Node, source: &[u8]) -> Option<Stmt> {
    let decorators = extract_decorators(node, source);
    let definition = node.child_by_field_name("definition")?;
    match definition.kind() {
        "class_definition" => parse_class(&definition, source, decorators).map(Stmt::Class),
        "function_definition" => parse_function(&definition, source, decorators).map(Stmt::Function),
        _ => None,
    }
}

/// Extract decorators from a decorated definition
fn extract_decorators(node: &Node, source: &[u8]) -> Vec<String> {
    let mut decorators = Vec::new();
    let mut cursor = node.walk();

    for child in node.children(&mut cursor) {
        if child.kind() == "decorator" {
            if let Ok(text) = child.utf8_text(source) {
                // Remove @ prefix and any arguments
                let dec = text.trim_start_matches('@');
                let dec = match dec.find('(') {
                    Some(idx) => &dec[..idx],
                    None => dec,
                };
                decorators.push(dec.trim().to_string());
            }
        }
    }

    decorators
}

/// Parse a class definition
fn parse_class(node: &Node, source: &[u8], decorators: Vec<String>) -> Option<Class> {
    let name = node.child_by_field_name("name")?.utf8_text(source).ok()?;
    let mut class = Class::new(name, node.start_position().row + 1);
    class.line_end = node.end_position().row + 1;
    class.decorators = decorators;

    if let Some(args) = node.child_by_field_name("superclasses") {
        let mut cursor = args.walk();
        for arg in args.named_children(&mut cursor) {
            match arg.kind() {
                "keyword_argument" => {
                    let key = arg.child_by_field_name("name").and_then(|n| n.utf8_text(source).ok());
                    let value = arg.child_by_field_name("value");
                    if let (Some(key), Some(value)) = (key, value) {
                        class.keywords.push((key.to_string(), parse_annotation(&value, source)));
                    }
                }
                "comment" | "list_splat" | "dictionary_splat" => {}
                _ => class.bases.push(parse_annotation(&arg, source)),
            }
        }
    }

    if let Some(body) = node.child_by_field_name("body") {
        class.docstring = block_docstring(&body, source);
        let mut ignored_imports = Vec::new();
        collect_statements(&body, source, &mut class.body, &mut ignored_imports);
    }

    Some(class)
}

/// Parse a function definition
fn parse_function(node: &Node, source: &[u8], decorators: Vec<String>) -> Option<Function> {
    let name = node.child_by_field_name("name")?.utf8_text(source).ok()?;
    let mut func = Function::new(name, node.start_position().row + 1);
    func.line_end = node.end_position().row + 1;
    func.decorators = decorators;
    func.is_async = has_async_keyword(node);

    if let Some(params) = node.child_by_field_name("parameters") {
        func.parameters = parse_parameters(&params, source);
    }
    if let Some(ret) = node.child_by_field_name("return_type") {
        func.return_type = Some(parse_annotation(&ret, source));
    }
    if let Some(body) = node.child_by_field_name("body") {
        func.docstring = block_docstring(&body, source);
    }

    Some(func)
}

/// Check if a function_definition node has an async keyword
fn has_async_keyword(node: &Node) -> bool {
    let mut cursor = node.walk();
    let found = node.children(&mut cursor).any(|c| c.kind() == "async");
    found
}

/// Parse function parameters
fn parse_parameters(node: &Node, source: &[u8]) -> Vec<Parameter> {
    let mut params = Vec::new();
    let mut seen_star = false;

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        let regular = if seen_star { ParameterKind::KeywordOnly } else { ParameterKind::Regular };
        match child.kind() {
            "identifier" => {
                if let Ok(name) = child.utf8_text(source) {
                    let mut param = Parameter::new(name);
                    param.kind = regular;
                    params.push(param);
                }
            }
            "typed_parameter" => {
                if let Some(param) = parse_typed_parameter(&child, source, regular) {
                    if param.kind == ParameterKind::Args {
                        seen_star = true;
                    }
                    params.push(param);
                }
            }
            "default_parameter" | "typed_default_parameter" => {
                let name = child.child_by_field_name("name").and_then(|n| n.utf8_text(source).ok());
                if let Some(name) = name {
                    let mut param = Parameter::new(name);
                    param.kind = regular;
                    param.annotation = child
                        .child_by_field_name("type")
                        .map(|t| parse_annotation(&t, source));
                    param.default = child
                        .child_by_field_name("value")
                        .and_then(|v| v.utf8_text(source).ok())
                        .map(|v| v.to_string());
                    params.push(param);
                }
            }
            "list_splat_pattern" | "dictionary_splat_pattern" => {
                let mut param = Parameter::new(&splat_name(&child, source));
                param.kind = if child.kind() == "list_splat_pattern" {
                    seen_star = true;
                    ParameterKind::Args
                } else {
                    ParameterKind::Kwargs
                };
                params.push(param);
            }
            "keyword_separator" | "*" => {
                seen_star = true;
            }
            _ => {}
        }
    }

    params
}

fn splat_name(node: &Node, source: &[u8]) -> String {
    let mut cursor = node.walk();
    let ident = node.named_children(&mut cursor).find(|c| c.kind() == "identifier");
    ident
        .and_then(|i| i.utf8_text(source).ok())
        .or_else(|| node.utf8_text(source).ok().map(|t| t.trim_start_matches('*')))
        .unwrap_or("?")
        .to_string()
}

fn parse_typed_parameter(node: &Node, source: &[u8], regular: ParameterKind) -> Option<Parameter> {
    let mut cursor = node.walk();
    let target = node.named_children(&mut cursor).next()?;

    let mut param = match target.kind() {
        "identifier" => {
            let mut p = Parameter::new(target.utf8_text(source).ok()?);
            p.kind = regular;
            p
        }
        "list_splat_pattern" => {
            let mut p = Parameter::new(&splat_name(&target, source));
            p.kind = ParameterKind::Args;
            p
        }
        "dictionary_splat_pattern" => {
            let mut p = Parameter::new(&splat_name(&target, source));
            p.kind = ParameterKind::Kwargs;
            p
        }
        _ => return None,
    };

    param.annotation = node
        .child_by_field_name("type")
        .map(|t| parse_annotation(&t, source));
    Some(param)
}

/// Parse an assignment to a plain name
fn parse_assignment(node: &Node, source: &[u8]) -> Option<Assignment> {
    let mut cursor = node.walk();
    let assign = node.named_children(&mut cursor).find(|c| c.kind() == "assignment")?;

    let left = assign.child_by_field_name("left")?;
    if left.kind() != "identifier" {
        return None;
    }

    let mut result = Assignment::new(left.utf8_text(source).ok()?, assign.start_position().row + 1);
    result.annotation = assign
        .child_by_field_name("type")
        .map(|t| parse_annotation(&t, source));

    if let Some(right) = assign.child_by_field_name("right") {
        result.value = right.utf8_text(source).ok().map(|v| v.to_string());
        if is_type_shaped(&right) {
            result.value_type = Some(parse_annotation(&right, source));
        }
    }

    Some(result)
}

/// `type X = ...`
fn parse_type_alias_statement(node: &Node, source: &[u8]) -> Option<Stmt> {
    let mut cursor = node.walk();
    let parts: Vec<Node> = node.named_children(&mut cursor).collect();
    let (name_node, value_node) = match parts.as_slice() {
        [name, value] => (*name, *value),
        [name, _params, value] => (*name, *value),
        _ => return None,
    };
    let name = match parse_annotation(&name_node, source) {
        Annotation::Name(n) => n,
        Annotation::Subscript { base, .. } => base,
        _ => return None,
    };
    Some(Stmt::TypeAlias {
        name,
        value: parse_annotation(&value_node, source),
        line: node.start_position().row + 1,
    })
}

fn is_type_shaped(node: &Node) -> bool {
    match node.kind() {
        "identifier" | "attribute" | "subscript" | "none" | "generic_type" => true,
        "binary_operator" => node
            .child_by_field_name("operator")
            .map_or(false, |op| op.kind() == "|"),
        _ => false,
    }
}

fn compact(text: &str) -> String {
    text.split_whitespace().collect()
}

/// Read an expression or `type` node as an annotation
pub(crate) fn parse_annotation(node: &Node, source: &[u8]) -> Annotation {
    let text = node.utf8_text(source).unwrap_or("");
    match node.kind() {
        "type" | "parenthesized_expression" => {
            let mut cursor = node.walk();
            let inner = node.named_children(&mut cursor).find(|c| c.kind() != "comment");
            match inner {
                Some(inner) => parse_annotation(&inner, source),
                None => Annotation::Other(compact(text)),
            }
        }
        "identifier" | "attribute" | "member_type" => Annotation::Name(compact(text)),
        "none" => Annotation::None,
        "ellipsis" => Annotation::Ellipsis,
        "string" => match string_literal_value(node, source) {
            Some(value) => Annotation::Str(value),
            None => Annotation::Other(text.to_string()),
        },
        "integer" | "float" | "true" | "false" | "unary_operator" => Annotation::Literal(compact(text)),
        "subscript" => {
            let base = node
                .child_by_field_name("value")
                .and_then(|v| v.utf8_text(source).ok())
                .map(compact)
                .unwrap_or_default();
            let mut cursor = node.walk();
            let args = node
                .children_by_field_name("subscript", &mut cursor)
                .flat_map(|arg| subscript_args(&arg, source))
                .collect();
            Annotation::Subscript { base, args }
        }
        "generic_type" => {
            let mut cursor = node.walk();
            let children: Vec<Node> = node.named_children(&mut cursor).collect();
            let base = children
                .first()
                .and_then(|b| b.utf8_text(source).ok())
                .map(compact)
                .unwrap_or_default();
            let mut args = Vec::new();
            for param in children.iter().filter(|c| c.kind() == "type_parameter") {
                let mut inner = param.walk();
                for arg in param.named_children(&mut inner) {
                    args.extend(subscript_args(&arg, source));
                }
            }
            Annotation::Subscript { base, args }
        }
        "binary_operator" if node.child_by_field_name("operator").map_or(false, |op| op.kind() == "|") => {
            let mut items = Vec::new();
            for side in ["left", "right"] {
                if let Some(child) = node.child_by_field_name(side) {
                    push_union_member(&mut items, parse_annotation(&child, source));
                }
            }
            Annotation::Union(items)
        }
        "union_type" => {
            let mut items = Vec::new();
            let mut cursor = node.walk();
            for child in node.named_children(&mut cursor) {
                push_union_member(&mut items, parse_annotation(&child, source));
            }
            Annotation::Union(items)
        }
        "list" => {
            let mut cursor = node.walk();
            let items = node
                .named_children(&mut cursor)
                .map(|c| parse_annotation(&c, source))
                .collect();
            Annotation::List(items)
        }
        _ => Annotation::Other(compact(text)),
    }
}

/// Subscript arguments; a bare tuple `X[a, b]` spreads into its elements
fn subscript_args(node: &Node, source: &[u8]) -> Vec<Annotation> {
    if node.kind() == "tuple" {
        let mut cursor = node.walk();
        let items = node
            .named_children(&mut cursor)
            .map(|c| parse_annotation(&c, source))
            .collect();
        items
    } else {
        vec![parse_annotation(node, source)]
    }
}

fn push_union_member(items: &mut Vec<Annotation>, member: Annotation) {
    match member {
        Annotation::Union(inner) => items.extend(inner),
        other => items.push(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(source: &str) -> ParsedFile {
        let mut parser = PythonParser::new().unwrap();
        parser
            .parse_source(source, PathBuf::from("/src/test.py"), "test".to_string())
            .unwrap()
    }

    fn only_function(file: &ParsedFile) -> &Function {
        file.functions().next().expect("expected a function")
    }

    #[test]
    fn test_parser_new() {
        assert!(PythonParser::new().is_ok());
    }

    #[test]
    fn test_empty_file() {
        let file = parse("");
        assert!(file.is_empty());
        assert!(file.syntax_error.is_none());
    }

    #[test]
    fn test_module_docstring() {
        let file = parse(r#""""Module docstring.""""#);
        assert_eq!(file.docstring, Some("Module docstring.".to_string()));
    }

    #[test]
    fn test_syntax_error_line() {
        let file = parse("def ok():\n    pass\n\nclass (:\n");
        assert!(file.syntax_error.is_some());
    }

    #[test]
    fn test_simple_import() {
        let file = parse("import os");
        assert_eq!(file.imports.len(), 1);
        assert_eq!(file.imports[0].module, "os");
        assert_eq!(file.imports[0].kind, ImportKind::Direct);
    }

    #[test]
    fn test_multiple_direct_imports() {
        let file = parse("import os.path, numpy as np");
        assert_eq!(file.imports.len(), 2);
        assert_eq!(file.imports[0].module, "os.path");
        assert_eq!(file.imports[1].names[0].used_name(), "np");
    }

    #[test]
    fn test_from_import() {
        let file = parse("from os import path, getcwd as cwd");
        assert_eq!(file.imports.len(), 1);
        assert_eq!(file.imports[0].module, "os");
        assert_eq!(file.imports[0].kind, ImportKind::From);
        assert_eq!(file.imports[0].names.len(), 2);
        assert_eq!(file.imports[0].names[1].used_name(), "cwd");
    }

    #[test]
    fn test_relative_import() {
        let file = parse("from ..utils import helper");
        assert_eq!(file.imports.len(), 1);
        assert_eq!(file.imports[0].module, "utils");
        assert_eq!(file.imports[0].kind, ImportKind::Relative { level: 2 });
    }

    #[test]
    fn test_wildcard_import() {
        let file = parse("from pkg.models import *");
        assert!(file.imports[0].is_wildcard());
    }

    #[test]
    fn test_conditional_import_collected() {
        let file = parse("from typing import TYPE_CHECKING\nif TYPE_CHECKING:\n    from a import Base\n");
        assert_eq!(file.imports.len(), 2);
        assert_eq!(file.imports[1].module, "a");
    }

    #[test]
    fn test_function_with_params() {
        let file = parse("def greet(name: str, age: int = 0) -> str: pass");
        let func = only_function(&file);
        assert_eq!(func.name, "greet");
        assert_eq!(func.parameters.len(), 2);
        assert_eq!(func.parameters[0].annotation, Some(Annotation::Name("str".to_string())));
        assert_eq!(func.parameters[1].default, Some("0".to_string()));
        assert_eq!(func.return_type, Some(Annotation::Name("str".to_string())));
    }

    #[test]
    fn test_star_parameters() {
        let file = parse("def f(a, *args, b, c=1, **kwargs): pass");
        let kinds: Vec<ParameterKind> = only_function(&file).parameters.iter().map(|p| p.kind).collect();
        assert_eq!(
            kinds,
            vec![
                ParameterKind::Regular,
                ParameterKind::Args,
                ParameterKind::KeywordOnly,
                ParameterKind::KeywordOnly,
                ParameterKind::Kwargs,
            ]
        );
    }

    #[test]
    fn test_bare_star_separator() {
        let file = parse("def f(a, *, named1, named2=10): pass");
        let params = &only_function(&file).parameters;
        assert_eq!(params.len(), 3);
        assert_eq!(params[1].kind, ParameterKind::KeywordOnly);
        assert_eq!(params[2].kind, ParameterKind::KeywordOnly);
    }

    #[test]
    fn test_async_function() {
        let file = parse("async def fetch(url): pass");
        assert!(only_function(&file).is_async);
    }

    #[test]
    fn test_decorated_function() {
        let file = parse("@staticmethod\ndef helper(): pass");
        assert!(only_function(&file).is_staticmethod());
    }

    #[test]
    fn test_function_docstring() {
        let file = parse("def f():\n    \"\"\"Do the thing.\n\n    More detail.\n    \"\"\"\n");
        assert_eq!(
            only_function(&file).docstring,
            Some("Do the thing.\n\nMore detail.".to_string())
        );
    }

    #[test]
    fn test_concatenated_docstring() {
        let file = parse("def f():\n    \"first \" 'second'\n\ndef g():\n    \"a\" f\"{b}\"\n");
        let docs: Vec<Option<String>> = file.functions().map(|f| f.docstring.clone()).collect();
        assert_eq!(docs, vec![Some("first second".to_string()), None]);
    }

    #[test]
    fn test_class_with_bases_and_metaclass() {
        let file = parse("class MyClass(a.Base, Mixin, metaclass=ABCMeta): pass");
        let class = file.classes().next().unwrap();
        assert_eq!(
            class.bases,
            vec![
                Annotation::Name("a.Base".to_string()),
                Annotation::Name("Mixin".to_string())
            ]
        );
        assert_eq!(class.metaclass(), Some(&Annotation::Name("ABCMeta".to_string())));
    }

    #[test]
    fn test_class_body() {
        let file = parse(
            "class C:\n    \"\"\"Doc.\"\"\"\n    x: int = 0\n    def m(self): pass\n    class Inner: pass\n",
        );
        let class = file.classes().next().unwrap();
        assert_eq!(class.docstring, Some("Doc.".to_string()));
        assert_eq!(class.body.len(), 3);
        assert_eq!(class.methods().next().unwrap().name, "m");
        assert!(matches!(&class.body[0], Stmt::Assign(a) if a.target == "x"));
        assert!(matches!(&class.body[2], Stmt::Class(c) if c.name == "Inner"));
    }

    #[test]
    fn test_annotated_assignment() {
        let file = parse("MAX_SIZE: int = 100\nname = 'x'\n");
        assert_eq!(file.body.len(), 2);
        match &file.body[0] {
            Stmt::Assign(a) => {
                assert_eq!(a.target, "MAX_SIZE");
                assert_eq!(a.annotation, Some(Annotation::Name("int".to_string())));
                assert_eq!(a.value, Some("100".to_string()));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_subscript_annotation() {
        let file = parse("def f(x: Dict[str, List[int]]) -> Optional[int]: pass");
        let func = only_function(&file);
        assert_eq!(
            func.parameters[0].annotation,
            Some(Annotation::Subscript {
                base: "Dict".to_string(),
                args: vec![
                    Annotation::Name("str".to_string()),
                    Annotation::Subscript {
                        base: "List".to_string(),
                        args: vec![Annotation::Name("int".to_string())]
                    },
                ],
            })
        );
        assert_eq!(
            func.return_type,
            Some(Annotation::Subscript {
                base: "Optional".to_string(),
                args: vec![Annotation::Name("int".to_string())],
            })
        );
    }

    #[test]
    fn test_union_operator_annotation() {
        let file = parse("def f(x: int | str | None): pass");
        assert_eq!(
            only_function(&file).parameters[0].annotation,
            Some(Annotation::Union(vec![
                Annotation::Name("int".to_string()),
                Annotation::Name("str".to_string()),
                Annotation::None,
            ]))
        );
    }

    #[test]
    fn test_forward_reference_annotation() {
        let file = parse("def f(x: 'Node') -> \"Node\": pass");
        let func = only_function(&file);
        assert_eq!(func.parameters[0].annotation, Some(Annotation::Str("Node".to_string())));
        assert_eq!(func.return_type, Some(Annotation::Str("Node".to_string())));
    }

    #[test]
    fn test_cleandoc() {
        assert_eq!(cleandoc("  Summary.\n\n    Body line\n      indented\n  "), "Summary.\n\nBody line\n  indented");
        assert_eq!(cleandoc("\n\n   Only.\n"), "Only.");
        assert_eq!(cleandoc(""), "");
    }

    #[test]
    fn test_unescape() {
        assert_eq!(unescape(r"a\nb\tc\\d\'"), "a\nb\tc\\d'");
        assert_eq!(unescape(r"keep \d"), "keep \\d");
    }
}
