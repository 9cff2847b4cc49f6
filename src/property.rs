//! Structural data-shape descriptions attached to catalogue entries.
//!
//! Decoding is lenient: a shape with an unknown `kind` (or a known kind whose
//! payload is unusable) becomes [`PropertyType::Opaque`] instead of failing
//! the catalogue, and later resolves to the untyped reference.
use serde::Deserialize;
use serde_json::{Map, Value, json};

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(from = "Value")]
pub enum PropertyType {
    Void,
    Primitive(PrimitiveKind),
    Array(Box<PropertyType>),
    /// Raw JSON-schema fragment, kept verbatim for the normalizer.
    ObjectWithSchema(Value),
    ObjectWithProperties(Vec<Property>),
    Map,
    Function {
        name: Option<String>,
        spec: Option<Box<FunctionMetadata>>,
    },
    Plain(String),
    #[default]
    Opaque,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveKind {
    String,
    Number,
    Boolean,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct Property {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(rename = "type", default)]
    pub ty: PropertyType,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub nullable: bool,
}

/// Signature of a callable descriptor.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionMetadata {
    #[serde(default)]
    pub arguments: Vec<Property>,
    #[serde(default = "void_type")]
    pub return_type: PropertyType,
    #[serde(default)]
    pub synchronous: Option<bool>,
}

fn void_type() -> PropertyType {
    PropertyType::Void
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl PrimitiveKind {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "string" => Some(Self::String),
            "number" => Some(Self::Number),
            "boolean" => Some(Self::Boolean),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Boolean => "boolean",
        }
    }
}

impl From<Value> for PropertyType {
    fn from(value: Value) -> Self {
        let Value::Object(mut fields) = value else {
            return PropertyType::Opaque;
        };
        let kind = match fields.get("kind").and_then(Value::as_str) {
            Some(kind) => kind.to_owned(),
            None => return PropertyType::Opaque,
        };
        match kind.as_str() {
            "void" => PropertyType::Void,
            "primitive" => fields
                .get("type")
                .and_then(Value::as_str)
                .and_then(PrimitiveKind::parse)
                .map_or(PropertyType::Opaque, PropertyType::Primitive),
            "array" => {
                let items = fields.remove("items").map(PropertyType::from).unwrap_or_default();
                PropertyType::Array(Box::new(items))
            }
            "object" => decode_object(fields),
            "map" => PropertyType::Map,
            "function" => {
                let name = fields.get("name").and_then(Value::as_str).map(str::to_owned);
                let spec = fields
                    .remove("spec")
                    .filter(|spec| !spec.is_null())
                    .and_then(|spec| match serde_json::from_value::<FunctionMetadata>(spec) {
                        Ok(signature) => Some(signature),
                        Err(error) => {
                            tracing::debug!(%error, "unusable function signature, dropping it");
                            None
                        }
                    })
                    .map(Box::new);
                PropertyType::Function { name, spec }
            }
            "plain" => PropertyType::Plain(match fields.remove("value") {
                Some(Value::String(text)) => text,
                Some(Value::Null) | None => String::new(),
                Some(other) => other.to_string(),
            }),
            other => {
                tracing::debug!(kind = other, "unknown property kind, treating as opaque");
                PropertyType::Opaque
            }
        }
    }
}

impl PropertyType {
    /// Rebuilds the wire form. Used for structural fingerprints.
    pub fn to_wire(&self) -> Value {
        match self {
            PropertyType::Void => json!({ "kind": "void" }),
            PropertyType::Primitive(kind) => json!({ "kind": "primitive", "type": kind.as_str() }),
            PropertyType::Array(items) => json!({ "kind": "array", "items": items.to_wire() }),
            PropertyType::ObjectWithSchema(schema) => json!({ "kind": "object", "schema": schema }),
            PropertyType::ObjectWithProperties(properties) => json!({
                "kind": "object",
                "properties": properties.iter().map(Property::to_wire).collect::<Vec<_>>(),
            }),
            PropertyType::Map => json!({ "kind": "map" }),
            PropertyType::Function { name, spec } => json!({
                "kind": "function",
                "name": name,
                "spec": spec.as_deref().map(FunctionMetadata::to_wire),
            }),
            PropertyType::Plain(value) => json!({ "kind": "plain", "value": value }),
            PropertyType::Opaque => json!({ "kind": "opaque" }),
        }
    }

    /// Names of the top-level fields of an object shape, if it has any.
    pub fn object_field_names(&self) -> Vec<String> {
        match self {
            PropertyType::ObjectWithProperties(properties) => {
                properties.iter().map(|p| p.name.clone()).collect()
            }
            PropertyType::ObjectWithSchema(schema) => schema
                .get("properties")
                .and_then(Value::as_object)
                .map(|fields| fields.keys().cloned().collect())
                .unwrap_or_default(),
            _ => Vec::new(),
        }
    }
}

impl Property {
    pub fn to_wire(&self) -> Value {
        json!({
            "name": self.name,
            "type": self.ty.to_wire(),
            "required": self.required,
            "nullable": self.nullable,
        })
    }
}

impl FunctionMetadata {
    pub fn to_wire(&self) -> Value {
        json!({
            "arguments": self.arguments.iter().map(Property::to_wire).collect::<Vec<_>>(),
            "returnType": self.return_type.to_wire(),
        })
    }
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

/// `schema` wins over `properties`, which wins over `typeName`.
fn decode_object(mut fields: Map<String, Value>) -> PropertyType {
    match fields.remove("schema") {
        Some(Value::String(text)) => {
            return match serde_json::from_str::<Value>(&text) {
                Ok(schema) => PropertyType::ObjectWithSchema(schema),
                Err(error) => {
                    tracing::debug!(%error, "schema string is not JSON, treating as opaque");
                    PropertyType::Opaque
                }
            };
        }
        Some(Value::Null) | None => {}
        Some(schema) => return PropertyType::ObjectWithSchema(schema),
    }
    if let Some(properties) = fields.remove("properties").filter(|v| !v.is_null()) {
        return match serde_json::from_value::<Vec<Property>>(properties) {
            Ok(properties) => PropertyType::ObjectWithProperties(properties),
            Err(error) => {
                tracing::debug!(%error, "unusable object properties, treating as opaque");
                PropertyType::Opaque
            }
        };
    }
    if fields.get("typeName").is_some_and(|name| !name.is_null()) {
        return PropertyType::Map;
    }
    PropertyType::Opaque
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(value: Value) -> PropertyType {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn decodes_every_known_kind() {
        assert_eq!(decode(json!({"kind": "void"})), PropertyType::Void);
        assert_eq!(
            decode(json!({"kind": "primitive", "type": "number"})),
            PropertyType::Primitive(PrimitiveKind::Number)
        );
        assert_eq!(
            decode(json!({"kind": "array", "items": {"kind": "primitive", "type": "string"}})),
            PropertyType::Array(Box::new(PropertyType::Primitive(PrimitiveKind::String)))
        );
        assert_eq!(decode(json!({"kind": "map"})), PropertyType::Map);
        assert_eq!(decode(json!({"kind": "plain", "value": "any"})), PropertyType::Plain("any".into()));
    }

    #[test]
    fn unknown_kinds_become_opaque() {
        assert_eq!(decode(json!({"kind": "tuple"})), PropertyType::Opaque);
        assert_eq!(decode(json!({"type": "string"})), PropertyType::Opaque);
        assert_eq!(decode(json!({"kind": "primitive", "type": "bigint"})), PropertyType::Opaque);
        assert_eq!(decode(json!(null)), PropertyType::Opaque);
    }

    #[test]
    fn object_dispatch_prefers_schema() {
        let ty = decode(json!({
            "kind": "object",
            "schema": {"type": "object"},
            "properties": [{"name": "a", "type": {"kind": "void"}}],
        }));
        assert_eq!(ty, PropertyType::ObjectWithSchema(json!({"type": "object"})));

        let ty = decode(json!({
            "kind": "object",
            "properties": [{"name": "a", "type": {"kind": "primitive", "type": "boolean"}, "required": true}],
        }));
        let PropertyType::ObjectWithProperties(props) = ty else { panic!("expected properties") };
        assert_eq!(props[0].name, "a");
        assert!(props[0].required);

        assert_eq!(decode(json!({"kind": "object", "typeName": "Record<string, any>"})), PropertyType::Map);
        assert_eq!(decode(json!({"kind": "object"})), PropertyType::Opaque);
    }

    #[test]
    fn schema_may_arrive_as_a_string() {
        let ty = decode(json!({"kind": "object", "schema": "{\"type\": \"string\"}"}));
        assert_eq!(ty, PropertyType::ObjectWithSchema(json!({"type": "string"})));
        assert_eq!(decode(json!({"kind": "object", "schema": "{nope"})), PropertyType::Opaque);
    }

    #[test]
    fn function_kind_keeps_nested_signature() {
        let ty = decode(json!({
            "kind": "function",
            "spec": {
                "arguments": [{"name": "event", "type": {"kind": "primitive", "type": "string"}}],
            },
        }));
        let PropertyType::Function { spec: Some(spec), .. } = ty else { panic!("expected spec") };
        assert_eq!(spec.arguments.len(), 1);
        assert_eq!(spec.return_type, PropertyType::Void);
    }

    #[test]
    fn unusable_signature_keeps_the_function() {
        let ty = decode(json!({"kind": "function", "name": "cb", "spec": {"arguments": "nope"}}));
        assert_eq!(ty, PropertyType::Function { name: Some("cb".into()), spec: None });
    }

    #[test]
    fn field_names_cover_both_object_forms() {
        let schema = decode(json!({"kind": "object", "schema": {"properties": {"audience": {}, "scopes": {}}}}));
        assert_eq!(schema.object_field_names(), vec!["audience", "scopes"]);
        assert!(PropertyType::Map.object_field_names().is_empty());
    }
}
