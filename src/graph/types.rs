// Type expressions and cross-module references
//
// A reference is a lookup key plus a resolution state. It never owns the
// declaration it points to; the owning module does.

use crate::graph::module::DeclId;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::sync::Arc;

/// What a resolved reference points at
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Target {
    /// A declaration inside some module
    Decl(DeclId),
    /// A whole module (e.g. the `a` in `import a`)
    Module(Arc<str>),
}

impl Target {
    /// Name of the module that owns the target
    pub fn module(&self) -> &str {
        match self {
            Target::Decl(id) => &id.module,
            Target::Module(name) => name,
        }
    }
}

/// Resolution state of a reference
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Resolution {
    /// Freshly built or deserialized; fixup has not looked at it yet
    #[default]
    Pending,
    Resolved(Target),
    /// Fixup ran and found nothing under the key
    Unresolved,
}

/// A non-owning reference to a declaration or module, keyed by fully-qualified name.
///
/// Serializes as its bare key. Deserializing always yields a pending reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    key: String,
    resolution: Resolution,
}

impl Reference {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            resolution: Resolution::Pending,
        }
    }

    /// The stable key (fully-qualified name)
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn resolution(&self) -> &Resolution {
        &self.resolution
    }

    /// The live target, if resolved
    pub fn target(&self) -> Option<&Target> {
        match &self.resolution {
            Resolution::Resolved(target) => Some(target),
            _ => None,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.resolution, Resolution::Pending)
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self.resolution, Resolution::Resolved(_))
    }

    pub fn is_unresolved(&self) -> bool {
        matches!(self.resolution, Resolution::Unresolved)
    }

    pub(crate) fn set_resolution(&mut self, resolution: Resolution) {
        self.resolution = resolution;
    }
}

impl Serialize for Reference {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.key)
    }
}

impl<'de> Deserialize<'de> for Reference {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(Reference::new)
    }
}

/// A type as written in an annotation, after name binding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = ".class")]
pub enum TypeExpr {
    Any,
    NoneType,
    /// Builtin class such as `int` or `list[str]`
    Builtin {
        name: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        args: Vec<TypeExpr>,
    },
    /// Instance of a class declared in some module
    Instance {
        type_ref: Reference,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        args: Vec<TypeExpr>,
    },
    Union {
        items: Vec<TypeExpr>,
    },
    Tuple {
        items: Vec<TypeExpr>,
    },
    Callable {
        /// `None` for `Callable[..., R]`
        params: Option<Vec<TypeExpr>>,
        ret: Box<TypeExpr>,
    },
    Literal {
        values: Vec<String>,
    },
    /// Annotation with no structured form, kept as source text
    Unknown {
        text: String,
    },
}

impl TypeExpr {
    pub fn builtin(name: impl Into<String>) -> Self {
        TypeExpr::Builtin {
            name: name.into(),
            args: Vec::new(),
        }
    }

    pub fn instance(key: impl Into<String>) -> Self {
        TypeExpr::Instance {
            type_ref: Reference::new(key),
            args: Vec::new(),
        }
    }

    pub fn unknown(text: impl Into<String>) -> Self {
        TypeExpr::Unknown { text: text.into() }
    }

    /// Visit every reference inside this type
    pub fn visit_refs(&self, f: &mut dyn FnMut(&Reference)) {
        match self {
            TypeExpr::Instance { type_ref, args } => {
                f(type_ref);
                for arg in args {
                    arg.visit_refs(f);
                }
            }
            TypeExpr::Builtin { args, .. } => {
                for arg in args {
                    arg.visit_refs(f);
                }
            }
            TypeExpr::Union { items } | TypeExpr::Tuple { items } => {
                for item in items {
                    item.visit_refs(f);
                }
            }
            TypeExpr::Callable { params, ret } => {
                for param in params.iter().flatten() {
                    param.visit_refs(f);
                }
                ret.visit_refs(f);
            }
            TypeExpr::Any | TypeExpr::NoneType | TypeExpr::Literal { .. } | TypeExpr::Unknown { .. } => {}
        }
    }

    /// Visit every reference inside this type mutably
    pub fn visit_refs_mut(&mut self, f: &mut dyn FnMut(&mut Reference)) {
        match self {
            TypeExpr::Instance { type_ref, args } => {
                f(type_ref);
                for arg in args {
                    arg.visit_refs_mut(f);
                }
            }
            TypeExpr::Builtin { args, .. } => {
                for arg in args {
                    arg.visit_refs_mut(f);
                }
            }
            TypeExpr::Union { items } | TypeExpr::Tuple { items } => {
                for item in items {
                    item.visit_refs_mut(f);
                }
            }
            TypeExpr::Callable { params, ret } => {
                for param in params.iter_mut().flatten() {
                    param.visit_refs_mut(f);
                }
                ret.visit_refs_mut(f);
            }
            TypeExpr::Any | TypeExpr::NoneType | TypeExpr::Literal { .. } | TypeExpr::Unknown { .. } => {}
        }
    }
}

fn write_list(f: &mut fmt::Formatter<'_>, items: &[TypeExpr]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", item)?;
    }
    Ok(())
}

impl fmt::Display for TypeExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeExpr::Any => write!(f, "Any"),
            TypeExpr::NoneType => write!(f, "None"),
            TypeExpr::Builtin { name, args } => {
                write!(f, "{}", name)?;
                if !args.is_empty() {
                    write!(f, "[")?;
                    write_list(f, args)?;
                    write!(f, "]")?;
                }
                Ok(())
            }
            TypeExpr::Instance { type_ref, args } => {
                write!(f, "{}", type_ref.key())?;
                if !args.is_empty() {
                    write!(f, "[")?;
                    write_list(f, args)?;
                    write!(f, "]")?;
                }
                Ok(())
            }
            TypeExpr::Union { items } => {
                write!(f, "Union[")?;
                write_list(f, items)?;
                write!(f, "]")
            }
            TypeExpr::Tuple { items } => {
                write!(f, "tuple[")?;
                write_list(f, items)?;
                write!(f, "]")
            }
            TypeExpr::Callable { params, ret } => {
                write!(f, "Callable[")?;
                match params {
                    Some(params) => {
                        write!(f, "[")?;
                        write_list(f, params)?;
                        write!(f, "]")?;
                    }
                    None => write!(f, "...")?,
                }
                write!(f, ", {}]", ret)
            }
            TypeExpr::Literal { values } => write!(f, "Literal[{}]", values.join(", ")),
            TypeExpr::Unknown { text } => write!(f, "{}", text),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::module::DeclIndex;

    #[test]
    fn test_reference_starts_pending() {
        let r = Reference::new("a.Base");
        assert_eq!(r.key(), "a.Base");
        assert!(r.is_pending());
        assert!(r.target().is_none());
    }

    #[test]
    fn test_reference_serializes_as_key() {
        let mut r = Reference::new("a.Base");
        r.set_resolution(Resolution::Resolved(Target::Decl(DeclId {
            module: Arc::from("a"),
            index: DeclIndex(0),
        })));
        assert_eq!(serde_json::to_string(&r).unwrap(), r#""a.Base""#);

        let back: Reference = serde_json::from_str(r#""a.Base""#).unwrap();
        assert!(back.is_pending());
        assert_eq!(back.key(), "a.Base");
    }

    #[test]
    fn test_type_expr_tagged_json() {
        let ty = TypeExpr::Instance {
            type_ref: Reference::new("pkg.models.User"),
            args: vec![TypeExpr::builtin("int")],
        };
        let json = serde_json::to_value(&ty).unwrap();
        assert_eq!(json[".class"], "Instance");
        assert_eq!(json["type_ref"], "pkg.models.User");
        assert_eq!(json["args"][0]["name"], "int");
    }

    #[test]
    fn test_visit_refs_reaches_nested() {
        let ty = TypeExpr::Union {
            items: vec![
                TypeExpr::instance("a.A"),
                TypeExpr::Callable {
                    params: Some(vec![TypeExpr::instance("b.B")]),
                    ret: Box::new(TypeExpr::Builtin {
                        name: "list".to_string(),
                        args: vec![TypeExpr::instance("c.C")],
                    }),
                },
            ],
        };
        let mut keys = Vec::new();
        ty.visit_refs(&mut |r| keys.push(r.key().to_string()));
        assert_eq!(keys, vec!["a.A", "b.B", "c.C"]);
    }

    #[test]
    fn test_display() {
        let ty = TypeExpr::Callable {
            params: None,
            ret: Box::new(TypeExpr::Union {
                items: vec![TypeExpr::builtin("int"), TypeExpr::NoneType],
            }),
        };
        assert_eq!(ty.to_string(), "Callable[..., Union[int, None]]");
    }
}
