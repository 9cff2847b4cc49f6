//! Catalogue descriptors: functions, variables and webhooks published under a
//! dotted context path.
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::property::{FunctionMetadata, PropertyType};

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "RawSpecification")]
pub struct Specification {
    pub id: String,
    /// Dot-delimited namespace path; empty means the root.
    pub context: String,
    pub name: String,
    pub description: Option<String>,
    pub visibility: VisibilityMetadata,
    pub kind: SpecificationKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SpecificationKind {
    ServerFunction {
        function: FunctionMetadata,
    },
    ClientFunction {
        function: FunctionMetadata,
        code: Option<String>,
        language: Option<String>,
        requirements: Vec<String>,
    },
    ApiFunction {
        function: FunctionMetadata,
        api_type: ApiType,
    },
    AuthFunction {
        function: FunctionMetadata,
        sub_resource: Option<String>,
    },
    WebhookHandle {
        function: FunctionMetadata,
    },
    ServerVariable {
        variable: ServerVariable,
    },
    /// Unrecognized or unusable descriptor. Kept so the caller can report it.
    Ignored {
        discriminant: String,
        reason: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApiType {
    #[default]
    Rest,
    Graphql,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisibilityMetadata {
    #[serde(default)]
    pub visibility: Visibility,
    #[serde(default)]
    pub foreign_tenant_name: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Visibility {
    #[default]
    Environment,
    Tenant,
    Public,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerVariable {
    #[serde(default)]
    pub environment_id: Option<String>,
    #[serde(default)]
    pub secret: bool,
    #[serde(default)]
    pub value_type: PropertyType,
    #[serde(default)]
    pub value: Option<Value>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSpecification {
    #[serde(default)]
    id: Option<String>,
    #[serde(rename = "type", default)]
    discriminant: Option<String>,
    #[serde(default)]
    context: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    visibility_metadata: Option<VisibilityMetadata>,
    #[serde(default)]
    function: Option<Value>,
    #[serde(default)]
    variable: Option<Value>,
    #[serde(default)]
    api_type: Option<ApiType>,
    #[serde(default)]
    sub_resource: Option<String>,
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    language: Option<String>,
    #[serde(default)]
    requirements: Option<Vec<String>>,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl Specification {
    pub fn function(&self) -> Option<&FunctionMetadata> {
        match &self.kind {
            SpecificationKind::ServerFunction { function }
            | SpecificationKind::ClientFunction { function, .. }
            | SpecificationKind::ApiFunction { function, .. }
            | SpecificationKind::AuthFunction { function, .. }
            | SpecificationKind::WebhookHandle { function } => Some(function),
            SpecificationKind::ServerVariable { .. } | SpecificationKind::Ignored { .. } => None,
        }
    }

    pub fn is_ignored(&self) -> bool {
        matches!(self.kind, SpecificationKind::Ignored { .. })
    }

    pub fn is_variable(&self) -> bool {
        matches!(self.kind, SpecificationKind::ServerVariable { .. })
    }

    /// Wire discriminant, for diagnostics.
    pub fn kind_label(&self) -> &str {
        match &self.kind {
            SpecificationKind::ServerFunction { .. } => "serverFunction",
            SpecificationKind::ClientFunction { .. } => "customFunction",
            SpecificationKind::ApiFunction { .. } => "apiFunction",
            SpecificationKind::AuthFunction { .. } => "authFunction",
            SpecificationKind::WebhookHandle { .. } => "webhookHandle",
            SpecificationKind::ServerVariable { .. } => "serverVariable",
            SpecificationKind::Ignored { discriminant, .. } => discriminant,
        }
    }
}

impl From<RawSpecification> for Specification {
    fn from(raw: RawSpecification) -> Self {
        let discriminant = raw.discriminant.unwrap_or_default();
        let kind = decode_kind(&discriminant, raw.function, raw.variable, RawExtras {
            api_type: raw.api_type,
            sub_resource: raw.sub_resource,
            code: raw.code,
            language: raw.language,
            requirements: raw.requirements.unwrap_or_default(),
        });
        Specification {
            id: raw.id.unwrap_or_default(),
            context: raw.context.unwrap_or_default(),
            name: raw.name.unwrap_or_default(),
            description: raw.description,
            visibility: raw.visibility_metadata.unwrap_or_default(),
            kind,
        }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

struct RawExtras {
    api_type: Option<ApiType>,
    sub_resource: Option<String>,
    code: Option<String>,
    language: Option<String>,
    requirements: Vec<String>,
}

fn decode_kind(
    discriminant: &str,
    function: Option<Value>,
    variable: Option<Value>,
    extras: RawExtras,
) -> SpecificationKind {
    let ignored = |reason: String| SpecificationKind::Ignored {
        discriminant: discriminant.to_owned(),
        reason,
    };
    if discriminant == "serverVariable" {
        return match decode_payload::<ServerVariable>("variable", variable) {
            Ok(variable) => SpecificationKind::ServerVariable { variable },
            Err(reason) => ignored(reason),
        };
    }
    let is_function_kind = matches!(
        discriminant,
        "serverFunction" | "customFunction" | "apiFunction" | "authFunction" | "webhookHandle"
    );
    if !is_function_kind {
        return ignored(format!("unknown descriptor type `{discriminant}`"));
    }
    let function = match decode_payload::<FunctionMetadata>("function", function) {
        Ok(function) => function,
        Err(reason) => return ignored(reason),
    };
    match discriminant {
        "serverFunction" => SpecificationKind::ServerFunction { function },
        "customFunction" => SpecificationKind::ClientFunction {
            function,
            code: extras.code,
            language: extras.language,
            requirements: extras.requirements,
        },
        "apiFunction" => SpecificationKind::ApiFunction {
            function,
            api_type: extras.api_type.unwrap_or_default(),
        },
        "authFunction" => SpecificationKind::AuthFunction {
            function,
            sub_resource: extras.sub_resource.filter(|s| !s.is_empty()),
        },
        _ => SpecificationKind::WebhookHandle { function },
    }
}

fn decode_payload<T: serde::de::DeserializeOwned>(field: &str, raw: Option<Value>) -> Result<T, String> {
    match raw {
        None | Some(Value::Null) => Err(format!("missing `{field}` payload")),
        Some(value) => {
            crate::decode::from_value_with_path(value).map_err(|error| format!("unusable `{field}` payload {error}"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::property::PrimitiveKind;
    use serde_json::json;

    fn decode(value: Value) -> Specification {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn decodes_function_variants() {
        let spec = decode(json!({
            "id": "f1",
            "type": "apiFunction",
            "context": "shipping.rates",
            "name": "getRate",
            "apiType": "graphql",
            "visibilityMetadata": {"visibility": "TENANT"},
            "function": {"arguments": [], "returnType": {"kind": "primitive", "type": "number"}},
        }));
        assert_eq!(spec.context, "shipping.rates");
        assert_eq!(spec.visibility.visibility, Visibility::Tenant);
        let SpecificationKind::ApiFunction { function, api_type } = &spec.kind else {
            panic!("expected api function, got {:?}", spec.kind)
        };
        assert_eq!(*api_type, ApiType::Graphql);
        assert_eq!(function.return_type, PropertyType::Primitive(PrimitiveKind::Number));
    }

    #[test]
    fn decodes_server_variable() {
        let spec = decode(json!({
            "id": "v1",
            "type": "serverVariable",
            "name": "apiKey",
            "variable": {"secret": true, "valueType": {"kind": "primitive", "type": "string"}},
        }));
        let SpecificationKind::ServerVariable { variable } = &spec.kind else { panic!() };
        assert!(variable.secret);
        assert!(spec.context.is_empty());
        assert!(spec.function().is_none());
    }

    #[test]
    fn unknown_type_is_ignored_not_fatal() {
        let spec = decode(json!({"id": "x", "type": "graphqlSubscription", "name": "onEvent"}));
        assert!(spec.is_ignored());
        assert_eq!(spec.kind_label(), "graphqlSubscription");
    }

    #[test]
    fn missing_payload_is_ignored() {
        let spec = decode(json!({"id": "x", "type": "serverFunction", "name": "run"}));
        let SpecificationKind::Ignored { reason, .. } = &spec.kind else { panic!() };
        assert!(reason.contains("function"));

        let spec = decode(json!({"id": "x", "type": "serverFunction", "name": "run", "function": {"arguments": 4}}));
        assert!(spec.is_ignored());
    }

    #[test]
    fn unknown_visibility_and_api_type_degrade() {
        let spec = decode(json!({
            "type": "apiFunction",
            "name": "x",
            "apiType": "soap",
            "visibilityMetadata": {"visibility": "GALAXY"},
            "function": {},
        }));
        assert_eq!(spec.visibility.visibility, Visibility::Unknown);
        assert!(matches!(spec.kind, SpecificationKind::ApiFunction { api_type: ApiType::Unknown, .. }));
    }
}
