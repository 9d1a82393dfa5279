// Declarations: functions, classes, variables and type aliases

use crate::graph::module::DeclIndex;
use crate::graph::types::{Reference, TypeExpr};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of a function argument
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ArgKind {
    /// Positional argument
    ArgPos,
    /// Positional argument with a default
    ArgOpt,
    /// `*args`
    ArgStar,
    /// Keyword-only argument
    ArgNamed,
    /// `**kwargs`
    ArgStar2,
    /// Keyword-only argument with a default
    ArgNamedOpt,
}

impl ArgKind {
    pub fn is_positional(&self, star: bool) -> bool {
        matches!(self, ArgKind::ArgPos | ArgKind::ArgOpt) || (star && *self == ArgKind::ArgStar)
    }

    pub fn is_named(&self, star: bool) -> bool {
        matches!(self, ArgKind::ArgNamed | ArgKind::ArgNamedOpt) || (star && *self == ArgKind::ArgStar2)
    }

    pub fn is_required(&self) -> bool {
        matches!(self, ArgKind::ArgPos | ArgKind::ArgNamed)
    }

    pub fn is_optional(&self) -> bool {
        matches!(self, ArgKind::ArgOpt | ArgKind::ArgNamedOpt)
    }

    pub fn is_star(&self) -> bool {
        matches!(self, ArgKind::ArgStar | ArgKind::ArgStar2)
    }
}

/// A function parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Param {
    pub name: String,
    pub kind: ArgKind,
    #[serde(default, rename = "type")]
    pub ty: Option<TypeExpr>,
    /// Default value as source text
    #[serde(default)]
    pub default: Option<String>,
}

impl Param {
    pub fn new(name: &str, kind: ArgKind) -> Self {
        Self {
            name: name.to_string(),
            kind,
            ty: None,
            default: None,
        }
    }
}

impl fmt::Display for Param {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            ArgKind::ArgStar => write!(f, "*")?,
            ArgKind::ArgStar2 => write!(f, "**")?,
            _ => {}
        }
        write!(f, "{}", self.name)?;
        if let Some(ty) = &self.ty {
            write!(f, ": {}", ty)?;
        }
        if self.kind.is_optional() {
            match (&self.default, &self.ty) {
                (Some(d), Some(_)) => write!(f, " = {}", d)?,
                (Some(d), None) => write!(f, "={}", d)?,
                (None, Some(_)) => write!(f, " = ...")?,
                (None, None) => write!(f, "=...")?,
            }
        }
        Ok(())
    }
}

/// Signature of a function or method
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FuncSig {
    pub params: Vec<Param>,
    #[serde(default)]
    pub ret: Option<TypeExpr>,
    #[serde(default)]
    pub is_async: bool,
    #[serde(default)]
    pub decorators: Vec<String>,
    #[serde(default)]
    pub is_static: bool,
    #[serde(default)]
    pub is_class: bool,
    #[serde(default)]
    pub is_property: bool,
    #[serde(default)]
    pub is_overload: bool,
}

/// Class header information; members are child declarations
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ClassInfo {
    pub bases: Vec<TypeExpr>,
    #[serde(default)]
    pub metaclass: Option<TypeExpr>,
    #[serde(default)]
    pub decorators: Vec<String>,
}

/// Module or class level variable
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct VarInfo {
    #[serde(default, rename = "type")]
    pub ty: Option<TypeExpr>,
    #[serde(default)]
    pub is_final: bool,
    #[serde(default)]
    pub is_classvar: bool,
    /// Initializer as source text
    #[serde(default)]
    pub value: Option<String>,
}

/// Type alias such as `UserId = Union[int, str]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AliasInfo {
    pub target: TypeExpr,
}

/// What a declaration is, with its signature
#[derive(Debug, Clone, PartialEq)]
pub enum DeclKind {
    Function(FuncSig),
    Class(ClassInfo),
    Variable(VarInfo),
    TypeAlias(AliasInfo),
}

impl DeclKind {
    /// Short tag used in snapshots and reports
    pub fn tag(&self) -> &'static str {
        match self {
            DeclKind::Function(_) => "function",
            DeclKind::Class(_) => "class",
            DeclKind::Variable(_) => "variable",
            DeclKind::TypeAlias(_) => "type_alias",
        }
    }

    pub fn is_class(&self) -> bool {
        matches!(self, DeclKind::Class(_))
    }

    pub fn is_function(&self) -> bool {
        matches!(self, DeclKind::Function(_))
    }

    /// Visit every reference held by this declaration's signature
    pub fn visit_refs(&self, f: &mut dyn FnMut(&Reference)) {
        match self {
            DeclKind::Function(sig) => {
                for param in &sig.params {
                    if let Some(ty) = &param.ty {
                        ty.visit_refs(f);
                    }
                }
                if let Some(ret) = &sig.ret {
                    ret.visit_refs(f);
                }
            }
            DeclKind::Class(info) => {
                for base in &info.bases {
                    base.visit_refs(f);
                }
                if let Some(meta) = &info.metaclass {
                    meta.visit_refs(f);
                }
            }
            DeclKind::Variable(var) => {
                if let Some(ty) = &var.ty {
                    ty.visit_refs(f);
                }
            }
            DeclKind::TypeAlias(alias) => alias.target.visit_refs(f),
        }
    }

    /// Visit every reference held by this declaration's signature mutably
    pub fn visit_refs_mut(&mut self, f: &mut dyn FnMut(&mut Reference)) {
        match self {
            DeclKind::Function(sig) => {
                for param in &mut sig.params {
                    if let Some(ty) = &mut param.ty {
                        ty.visit_refs_mut(f);
                    }
                }
                if let Some(ret) = &mut sig.ret {
                    ret.visit_refs_mut(f);
                }
            }
            DeclKind::Class(info) => {
                for base in &mut info.bases {
                    base.visit_refs_mut(f);
                }
                if let Some(meta) = &mut info.metaclass {
                    meta.visit_refs_mut(f);
                }
            }
            DeclKind::Variable(var) => {
                if let Some(ty) = &mut var.ty {
                    ty.visit_refs_mut(f);
                }
            }
            DeclKind::TypeAlias(alias) => alias.target.visit_refs_mut(f),
        }
    }
}

/// Source line range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub line_start: usize,
    pub line_end: usize,
}

/// A named entity inside a module
#[derive(Debug, Clone, PartialEq)]
pub struct Declaration {
    pub name: String,
    pub fullname: String,
    pub kind: DeclKind,
    pub docstring: Option<String>,
    pub span: Option<Span>,
    pub(crate) parent: Option<DeclIndex>,
    pub(crate) children: Vec<DeclIndex>,
}

impl Declaration {
    pub fn new(name: &str, fullname: &str, kind: DeclKind) -> Self {
        Self {
            name: name.to_string(),
            fullname: fullname.to_string(),
            kind,
            docstring: None,
            span: None,
            parent: None,
            children: Vec::new(),
        }
    }

    pub fn parent(&self) -> Option<DeclIndex> {
        self.parent
    }

    pub fn children(&self) -> &[DeclIndex] {
        &self.children
    }

    /// Signature rendered as Python-like text
    pub fn signature(&self) -> String {
        match &self.kind {
            DeclKind::Function(sig) => {
                let params: Vec<String> = sig.params.iter().map(|p| p.to_string()).collect();
                let ret = sig.ret.as_ref().map(|r| format!(" -> {}", r)).unwrap_or_default();
                let prefix = if sig.is_async { "async " } else { "" };
                format!("{}def {}({}){}", prefix, self.name, params.join(", "), ret)
            }
            DeclKind::Class(info) => {
                if info.bases.is_empty() {
                    format!("class {}", self.name)
                } else {
                    let bases: Vec<String> = info.bases.iter().map(|b| b.to_string()).collect();
                    format!("class {}({})", self.name, bases.join(", "))
                }
            }
            DeclKind::Variable(var) => match &var.ty {
                Some(ty) => format!("{}: {}", self.name, ty),
                None => self.name.clone(),
            },
            DeclKind::TypeAlias(alias) => format!("{} = {}", self.name, alias.target),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arg_kind_predicates() {
        assert!(ArgKind::ArgPos.is_positional(false));
        assert!(ArgKind::ArgOpt.is_positional(false));
        assert!(!ArgKind::ArgStar.is_positional(false));
        assert!(ArgKind::ArgStar.is_positional(true));

        assert!(ArgKind::ArgNamed.is_named(false));
        assert!(!ArgKind::ArgStar2.is_named(false));
        assert!(ArgKind::ArgStar2.is_named(true));

        assert!(ArgKind::ArgPos.is_required());
        assert!(ArgKind::ArgNamed.is_required());
        assert!(ArgKind::ArgNamedOpt.is_optional());
        assert!(ArgKind::ArgStar.is_star());
        assert!(!ArgKind::ArgOpt.is_star());
    }

    #[test]
    fn test_arg_kind_serialized_name() {
        assert_eq!(serde_json::to_string(&ArgKind::ArgStar2).unwrap(), r#""ARG_STAR2""#);
        assert_eq!(serde_json::to_string(&ArgKind::ArgNamedOpt).unwrap(), r#""ARG_NAMED_OPT""#);
    }

    #[test]
    fn test_function_signature() {
        let mut greet = Param::new("name", ArgKind::ArgPos);
        greet.ty = Some(TypeExpr::builtin("str"));
        let mut times = Param::new("times", ArgKind::ArgOpt);
        times.ty = Some(TypeExpr::builtin("int"));
        times.default = Some("1".to_string());
        let mut rest = Param::new("rest", ArgKind::ArgStar);
        rest.ty = None;

        let decl = Declaration::new(
            "greet",
            "m.greet",
            DeclKind::Function(FuncSig {
                params: vec![greet, times, rest],
                ret: Some(TypeExpr::builtin("str")),
                ..FuncSig::default()
            }),
        );
        assert_eq!(decl.signature(), "def greet(name: str, times: int = 1, *rest) -> str");
    }

    #[test]
    fn test_class_signature() {
        let decl = Declaration::new(
            "Child",
            "b.Child",
            DeclKind::Class(ClassInfo {
                bases: vec![TypeExpr::instance("a.Base")],
                ..ClassInfo::default()
            }),
        );
        assert_eq!(decl.signature(), "class Child(a.Base)");
        assert_eq!(decl.kind.tag(), "class");
    }

    #[test]
    fn test_visit_refs_in_signature() {
        let mut param = Param::new("x", ArgKind::ArgPos);
        param.ty = Some(TypeExpr::instance("a.A"));
        let kind = DeclKind::Function(FuncSig {
            params: vec![param],
            ret: Some(TypeExpr::instance("b.B")),
            ..FuncSig::default()
        });
        let mut keys = Vec::new();
        kind.visit_refs(&mut |r| keys.push(r.key().to_string()));
        assert_eq!(keys, vec!["a.A", "b.B"]);
    }
}
