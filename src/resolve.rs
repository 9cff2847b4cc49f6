//! Type naming and extraction.
//!
//! A [`ResolutionContext`] carries every piece of mutable state of one run:
//! the memo of already-named schema nodes, the name registry and the set of
//! descriptors assembled so far. Extractors borrow it for a single extraction
//! and are consumed by it.
//!
//! Naming of a declaration happens before its members are expanded, and the
//! memo is keyed by the node's canonical location, so a recursive schema
//! meets its own name on the way back down instead of recursing forever.
use std::collections::{HashMap, HashSet};

use serde_json::{Value, json};

use crate::error::{Error, Result};
use crate::imports;
use crate::ir::{EnumVariant, Member, QualifiedName, ResolvedType, TypeBody, TypeDecl, TypeRef};
use crate::naming;
use crate::property::{PrimitiveKind, Property, PropertyType};
use crate::registry::{Reservation, TypeRegistry};
use crate::schema::{self, Document, Normalized, Pointer};

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// Identity of a schema node across one run.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CanonicalRef {
    namespace: String,
    document: u64,
    pointer: Pointer,
}

#[derive(Debug, Default)]
pub struct ResolutionContext {
    memo: HashMap<CanonicalRef, QualifiedName>,
    registry: TypeRegistry,
    assembled: HashSet<String>,
}

/// Resolves one [`PropertyType`] into a [`ResolvedType`]. Single use.
pub struct TypeExtractor<'ctx> {
    context: &'ctx mut ResolutionContext,
    default_name: String,
    namespace: String,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl<'ctx> TypeExtractor<'ctx> {
    /// `default_name` names the outermost declaration when the shape itself
    /// carries no better name; `namespace` receives every declaration.
    pub fn new(
        context: &'ctx mut ResolutionContext,
        default_name: impl Into<String>,
        namespace: impl Into<String>,
    ) -> Self {
        Self { context, default_name: default_name.into(), namespace: namespace.into() }
    }

    pub fn extract(self, ty: &PropertyType) -> Result<ResolvedType> {
        let ty = self.context.resolve_property(ty, &self.default_name, &self.namespace)?;
        let imports = imports::type_imports(&ty);
        Ok(ResolvedType { ty, imports })
    }
}

impl ResolutionContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of declarations produced so far.
    pub fn type_count(&self) -> usize {
        self.registry.len()
    }

    pub fn into_types(self) -> Vec<TypeDecl> {
        self.registry.into_decls()
    }

    /// Records that `key` is being assembled; fails when it already was.
    pub(crate) fn begin_assembly(&mut self, key: String) -> Result<()> {
        if self.assembled.insert(key.clone()) {
            Ok(())
        } else {
            Err(Error::InvalidReuse { descriptor: key })
        }
    }

    /// Binds a generated unit name. `identity` distinguishes units that
    /// sanitize to the same name.
    pub(crate) fn reserve_unit(&mut self, namespace: &str, base: &str, identity: &str) -> String {
        let fingerprint = schema::fingerprint(&json!({ "unit": identity }));
        self.registry.reserve(namespace, base, fingerprint).into_name().name
    }

    fn resolve_property(&mut self, ty: &PropertyType, hint: &str, namespace: &str) -> Result<TypeRef> {
        match ty {
            PropertyType::Void => Ok(TypeRef::Void),
            PropertyType::Primitive(kind) => Ok(primitive(*kind)),
            PropertyType::Array(items) => {
                Ok(TypeRef::list_of(self.resolve_property(items, hint, namespace)?))
            }
            PropertyType::Map => Ok(TypeRef::Map),
            PropertyType::Plain(value) => Ok(match value.as_str() {
                "void" => TypeRef::Void,
                "any" => TypeRef::Map,
                _ => TypeRef::Any,
            }),
            PropertyType::Function { .. } | PropertyType::Opaque => Ok(TypeRef::Any),
            PropertyType::ObjectWithSchema(schema) => {
                let document = Document::new(schema.clone());
                self.resolve_schema(&document, &Pointer::root(), hint, namespace)
            }
            PropertyType::ObjectWithProperties(properties) => {
                self.resolve_properties(properties, hint, namespace)
            }
        }
    }

    fn resolve_schema(
        &mut self,
        document: &Document,
        at: &Pointer,
        hint: &str,
        namespace: &str,
    ) -> Result<TypeRef> {
        let normalized = document.normalize(at)?;
        self.resolve_normalized(document, normalized, hint, namespace)
    }

    fn resolve_normalized(
        &mut self,
        document: &Document,
        normalized: Normalized,
        hint: &str,
        namespace: &str,
    ) -> Result<TypeRef> {
        match normalized {
            Normalized::Opaque => Ok(TypeRef::Any),
            Normalized::Array(items) => {
                Ok(TypeRef::list_of(self.resolve_normalized(document, *items, hint, namespace)?))
            }
            Normalized::Object { pointer, ref_name } => {
                self.resolve_object(document, pointer, ref_name.as_deref(), hint, namespace)
            }
            Normalized::Scalar { pointer, ref_name } => {
                self.resolve_scalar(document, pointer, ref_name.as_deref(), hint, namespace)
            }
        }
    }

    fn resolve_object(
        &mut self,
        document: &Document,
        pointer: Pointer,
        ref_name: Option<&str>,
        hint: &str,
        namespace: &str,
    ) -> Result<TypeRef> {
        let key = CanonicalRef {
            namespace: namespace.to_owned(),
            document: document.fingerprint(),
            pointer,
        };
        if let Some(name) = self.memo.get(&key) {
            return Ok(TypeRef::Named(name.clone()));
        }
        let node = document.node(&key.pointer)?;
        let Some(properties) = node.get("properties").and_then(Value::as_object).filter(|p| !p.is_empty()) else {
            return Ok(TypeRef::Map);
        };

        let base = choose_name(node, ref_name, hint);
        let fingerprint = body_fingerprint(document, &key.pointer, node);
        let name = match self.registry.reserve(namespace, &base, fingerprint) {
            Reservation::Existing(name) => {
                self.memo.insert(key, name.clone());
                return Ok(TypeRef::Named(name));
            }
            Reservation::Fresh(name) => name,
        };
        tracing::debug!(name = %name, pointer = %key.pointer, "declaring object type");
        self.memo.insert(key.clone(), name.clone());
        self.registry.declare(name.clone());

        let required = required_fields(node);
        let mut members = Vec::with_capacity(properties.len());
        for (field, schema) in properties {
            let member_hint = format!("{}{}", name.name, naming::type_name(field));
            let at = key.pointer.child("properties").child(field.as_str());
            let ty = self.resolve_schema(document, &at, &member_hint, namespace)?;
            members.push(Member {
                wire_name: field.clone(),
                ident: naming::member_name(field),
                ty,
                required: required.contains(field.as_str()),
                nullable: is_nullable(schema),
                description: schema.get("description").and_then(Value::as_str).map(str::to_owned),
            });
        }
        dedupe_idents(&mut members);
        self.registry.define(name.clone(), TypeBody::Object { members });
        Ok(TypeRef::Named(name))
    }

    fn resolve_scalar(
        &mut self,
        document: &Document,
        pointer: Pointer,
        ref_name: Option<&str>,
        hint: &str,
        namespace: &str,
    ) -> Result<TypeRef> {
        let node = document.node(&pointer)?;
        if let Some(values) = node.get("enum").and_then(Value::as_array) {
            let literals: Vec<&Value> = values.iter().filter(|value| !value.is_null()).collect();
            if !literals.is_empty() {
                return Ok(self.resolve_enum(document, pointer, node, &literals, ref_name, hint, namespace));
            }
        }
        Ok(match schema::declared_type(node) {
            Some("string") => TypeRef::String,
            Some("integer") => TypeRef::Integer,
            Some("number") => TypeRef::Float,
            Some("boolean") => TypeRef::Boolean,
            Some("null") => TypeRef::Void,
            _ => TypeRef::Any,
        })
    }

    #[allow(clippy::too_many_arguments)]
    fn resolve_enum(
        &mut self,
        document: &Document,
        pointer: Pointer,
        node: &Value,
        literals: &[&Value],
        ref_name: Option<&str>,
        hint: &str,
        namespace: &str,
    ) -> TypeRef {
        let key = CanonicalRef {
            namespace: namespace.to_owned(),
            document: document.fingerprint(),
            pointer,
        };
        if let Some(name) = self.memo.get(&key) {
            return TypeRef::Named(name.clone());
        }
        let base = choose_name(node, ref_name, hint);
        let name = match self.registry.reserve(namespace, &base, schema::fingerprint(node)) {
            Reservation::Existing(name) => name,
            Reservation::Fresh(name) => {
                tracing::debug!(name = %name, "declaring enum type");
                self.registry.declare(name.clone());
                let idents = naming::dedupe(literals.iter().map(|literal| naming::enum_constant(&literal_text(literal))));
                let variants = idents
                    .into_iter()
                    .zip(literals)
                    .map(|(ident, literal)| EnumVariant { ident, literal: (*literal).clone() })
                    .collect();
                self.registry.define(name.clone(), TypeBody::Enum { variants });
                name
            }
        };
        self.memo.insert(key, name.clone());
        TypeRef::Named(name)
    }

    fn resolve_properties(&mut self, properties: &[Property], hint: &str, namespace: &str) -> Result<TypeRef> {
        if properties.is_empty() {
            return Ok(TypeRef::Map);
        }
        let wire = Value::Array(properties.iter().map(Property::to_wire).collect());
        let name = match self.registry.reserve(namespace, &naming::type_name(hint), schema::fingerprint(&wire)) {
            Reservation::Existing(name) => return Ok(TypeRef::Named(name)),
            Reservation::Fresh(name) => name,
        };
        tracing::debug!(name = %name, "declaring object type from properties");
        self.registry.declare(name.clone());
        let mut members = Vec::with_capacity(properties.len());
        for property in properties {
            let member_hint = format!("{}{}", name.name, naming::type_name(&property.name));
            let ty = self.resolve_property(&property.ty, &member_hint, namespace)?;
            members.push(Member {
                wire_name: property.name.clone(),
                ident: naming::member_name(&property.name),
                ty,
                required: property.required,
                nullable: property.nullable,
                description: property.description.clone(),
            });
        }
        dedupe_idents(&mut members);
        self.registry.define(name.clone(), TypeBody::Object { members });
        Ok(TypeRef::Named(name))
    }
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

fn primitive(kind: PrimitiveKind) -> TypeRef {
    match kind {
        PrimitiveKind::String => TypeRef::String,
        PrimitiveKind::Number => TypeRef::Float,
        PrimitiveKind::Boolean => TypeRef::Boolean,
    }
}

/// `title`, then the reference name, then the caller's hint.
fn choose_name(node: &Value, ref_name: Option<&str>, hint: &str) -> String {
    let title = node.get("title").and_then(Value::as_str).filter(|title| !title.trim().is_empty());
    naming::type_name(title.or(ref_name).unwrap_or(hint))
}

/// Nodes holding references are only equal to themselves: the same text can
/// point at different definitions in another document.
fn body_fingerprint(document: &Document, pointer: &Pointer, node: &Value) -> u64 {
    if contains_reference(node) {
        schema::fingerprint(&json!({
            "document": document.fingerprint().to_string(),
            "pointer": pointer.to_string(),
        }))
    } else {
        schema::fingerprint(node)
    }
}

fn contains_reference(node: &Value) -> bool {
    match node {
        Value::Object(fields) => fields.contains_key("$ref") || fields.values().any(contains_reference),
        Value::Array(items) => items.iter().any(contains_reference),
        _ => false,
    }
}

fn required_fields(node: &Value) -> HashSet<&str> {
    node.get("required")
        .and_then(Value::as_array)
        .map(|names| names.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default()
}

fn is_nullable(schema: &Value) -> bool {
    let in_type = schema
        .get("type")
        .and_then(Value::as_array)
        .is_some_and(|types| types.iter().any(|t| t.as_str() == Some("null")));
    in_type || schema.get("nullable").and_then(Value::as_bool).unwrap_or(false)
}

fn literal_text(literal: &Value) -> String {
    match literal {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

fn dedupe_idents(members: &mut [Member]) {
    let idents = naming::dedupe(members.iter().map(|member| member.ident.clone()));
    for (member, ident) in members.iter_mut().zip(idents) {
        member.ident = ident;
    }
}
