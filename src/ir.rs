// Fully resolved model handed to emitters. No raw schema values here.
use std::collections::BTreeSet;
use std::fmt;

use serde::{Serialize, Serializer};
use serde_json::Value;

use crate::spec::ApiType;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct QualifiedName {
    pub namespace: String,
    pub name: String,
}

/// Reference to a type, as written at a use site.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeRef {
    Void,
    String,
    Integer,
    Float,
    Boolean,
    /// Untyped object.
    Any,
    /// String-keyed map of untyped values.
    Map,
    List(Box<TypeRef>),
    Named(QualifiedName),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedType {
    pub ty: TypeRef,
    pub imports: BTreeSet<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeDecl {
    #[serde(flatten)]
    pub name: QualifiedName,
    #[serde(flatten)]
    pub body: TypeBody,
    pub imports: BTreeSet<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum TypeBody {
    Object { members: Vec<Member> },
    Enum { variants: Vec<EnumVariant> },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    pub wire_name: String,
    pub ident: String,
    #[serde(rename = "type")]
    pub ty: TypeRef,
    pub required: bool,
    pub nullable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnumVariant {
    pub ident: String,
    /// Value as it appears on the wire.
    pub literal: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedSpecification {
    pub id: String,
    pub name: String,
    pub namespace: String,
    pub unit_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub imports: BTreeSet<String>,
    #[serde(flatten)]
    pub members: SpecificationMembers,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum SpecificationMembers {
    #[serde(rename_all = "camelCase")]
    Function {
        flavour: FunctionKind,
        method_name: String,
        arguments: Vec<Member>,
        return_type: TypeRef,
    },
    #[serde(rename_all = "camelCase")]
    Variable { value_type: TypeRef, secret: bool },
    #[serde(rename_all = "camelCase")]
    Webhook { event_type: TypeRef },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum FunctionKind {
    Server,
    Client { language: Option<String> },
    #[serde(rename_all = "camelCase")]
    Api { api_type: ApiType },
    Auth { audience: bool },
    SubResourceAuth { path: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedContext {
    pub name: String,
    pub namespace: String,
    pub unit_name: String,
    pub imports: BTreeSet<String>,
    pub children: Vec<ResolvedContext>,
    pub specifications: Vec<ResolvedSpecification>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedDescriptor {
    pub id: String,
    pub name: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationOutput {
    /// One tree per generation root that received descriptors.
    pub contexts: Vec<ResolvedContext>,
    pub types: Vec<TypeDecl>,
    pub skipped: Vec<SkippedDescriptor>,
}

impl QualifiedName {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self { namespace: namespace.into(), name: name.into() }
    }
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.namespace.is_empty() {
            f.write_str(&self.name)
        } else {
            write!(f, "{}.{}", self.namespace, self.name)
        }
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeRef::Void => f.write_str("void"),
            TypeRef::String => f.write_str("string"),
            TypeRef::Integer => f.write_str("integer"),
            TypeRef::Float => f.write_str("float"),
            TypeRef::Boolean => f.write_str("boolean"),
            TypeRef::Any => f.write_str("any"),
            TypeRef::Map => f.write_str("map<string, any>"),
            TypeRef::List(elem) => write!(f, "list<{elem}>"),
            TypeRef::Named(name) => write!(f, "{name}"),
        }
    }
}

impl Serialize for TypeRef {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl TypeRef {
    pub fn list_of(elem: TypeRef) -> Self {
        TypeRef::List(Box::new(elem))
    }

    /// Every named type reachable through list wrappers.
    pub fn named(&self) -> Option<&QualifiedName> {
        match self {
            TypeRef::Named(name) => Some(name),
            TypeRef::List(elem) => elem.named(),
            _ => None,
        }
    }
}

impl ResolvedContext {
    pub fn qualified_name(&self) -> QualifiedName {
        QualifiedName::new(&self.namespace, &self.unit_name)
    }
}

impl ResolvedSpecification {
    pub fn qualified_name(&self) -> QualifiedName {
        QualifiedName::new(&self.namespace, &self.unit_name)
    }
}

impl GenerationOutput {
    pub fn find_type(&self, name: &str) -> Option<&TypeDecl> {
        self.types.iter().find(|decl| decl.name.name == name)
    }

    /// All resolved specifications, depth first.
    pub fn specifications(&self) -> Vec<&ResolvedSpecification> {
        fn walk<'a>(context: &'a ResolvedContext, out: &mut Vec<&'a ResolvedSpecification>) {
            out.extend(context.specifications.iter());
            for child in &context.children {
                walk(child, out);
            }
        }
        let mut out = Vec::new();
        for root in &self.contexts {
            walk(root, &mut out);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_refs_display_neutrally() {
        let ty = TypeRef::list_of(TypeRef::list_of(TypeRef::Named(QualifiedName::new("io.poly", "Coupon"))));
        assert_eq!(ty.to_string(), "list<list<io.poly.Coupon>>");
        assert_eq!(ty.named().map(|n| n.name.as_str()), Some("Coupon"));
        assert_eq!(TypeRef::list_of(TypeRef::Float).to_string(), "list<float>");
        assert_eq!(serde_json::to_value(TypeRef::Map).unwrap(), "map<string, any>");
    }
}
