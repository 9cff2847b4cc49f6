// descriptor + context node → resolved unit
use once_cell::sync::Lazy;
use regex::Regex;

use crate::context::{ContextId, ContextTree};
use crate::error::{Error, Result};
use crate::imports;
use crate::ir::{FunctionKind, Member, ResolvedSpecification, SpecificationMembers, TypeRef};
use crate::naming;
use crate::property::{FunctionMetadata, PropertyType};
use crate::resolve::{ResolutionContext, TypeExtractor};
use crate::spec::{Specification, SpecificationKind};

static CLASS_DECLARATION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"public\s+class\s+([A-Za-z_][A-Za-z0-9_]*)").expect("static regex"));

/// Single use: `assemble` consumes the assembler.
pub struct SpecificationAssembler<'ctx> {
    context: &'ctx mut ResolutionContext,
}

impl<'ctx> SpecificationAssembler<'ctx> {
    pub fn new(context: &'ctx mut ResolutionContext) -> Self {
        Self { context }
    }

    pub fn assemble(mut self, tree: &ContextTree, node: ContextId, spec: &Specification) -> Result<ResolvedSpecification> {
        let namespace = tree.member_namespace(node);
        self.context.begin_assembly(format!("{namespace}/{}/{}", spec.id, spec.name))?;

        let unit_name = self.context.reserve_unit(&namespace, &unit_base_name(spec), &spec.id);
        tracing::debug!(namespace = %namespace, unit = %unit_name, kind = spec.kind_label(), "assembling");

        let members = match &spec.kind {
            SpecificationKind::ServerFunction { function } => {
                self.function(function, FunctionKind::Server, spec, &unit_name, &namespace)?
            }
            SpecificationKind::ClientFunction { function, language, .. } => {
                let flavour = FunctionKind::Client { language: language.clone() };
                self.function(function, flavour, spec, &unit_name, &namespace)?
            }
            SpecificationKind::ApiFunction { function, api_type } => {
                let flavour = FunctionKind::Api { api_type: *api_type };
                self.function(function, flavour, spec, &unit_name, &namespace)?
            }
            SpecificationKind::AuthFunction { function, sub_resource } => {
                let flavour = match sub_resource {
                    Some(path) => FunctionKind::SubResourceAuth { path: path.clone() },
                    None => FunctionKind::Auth { audience: requests_audience(function) },
                };
                self.function(function, flavour, spec, &unit_name, &namespace)?
            }
            SpecificationKind::WebhookHandle { function } => {
                let event_type = match webhook_event(function) {
                    Some(event) => {
                        TypeExtractor::new(self.context, format!("{unit_name}Event"), &namespace)
                            .extract(event)?
                            .ty
                    }
                    None => {
                        tracing::warn!(id = %spec.id, name = %spec.name, "webhook has no event payload shape");
                        TypeRef::Any
                    }
                };
                SpecificationMembers::Webhook { event_type }
            }
            SpecificationKind::ServerVariable { variable } => {
                let value_type = TypeExtractor::new(self.context, naming::type_name(&spec.name), &namespace)
                    .extract(&variable.value_type)?
                    .ty;
                SpecificationMembers::Variable { value_type, secret: variable.secret }
            }
            SpecificationKind::Ignored { reason, .. } => {
                return Err(Error::Unsupported { descriptor: spec.id.clone(), reason: reason.clone() });
            }
        };

        let mut resolved = ResolvedSpecification {
            id: spec.id.clone(),
            name: spec.name.clone(),
            namespace,
            unit_name,
            description: spec.description.clone(),
            imports: Default::default(),
            members,
        };
        resolved.imports = imports::specification_imports(&resolved);
        Ok(resolved)
    }

    fn function(
        &mut self,
        function: &FunctionMetadata,
        flavour: FunctionKind,
        spec: &Specification,
        unit_name: &str,
        namespace: &str,
    ) -> Result<SpecificationMembers> {
        let mut arguments = Vec::with_capacity(function.arguments.len());
        for (index, argument) in function.arguments.iter().enumerate() {
            let ty = TypeExtractor::new(self.context, format!("{unit_name}Arg{index}"), namespace)
                .extract(&argument.ty)?
                .ty;
            arguments.push(Member {
                wire_name: argument.name.clone(),
                ident: naming::member_name(&argument.name),
                ty,
                required: argument.required,
                nullable: argument.nullable,
                description: argument.description.clone(),
            });
        }
        let idents = naming::dedupe(arguments.iter().map(|argument| argument.ident.clone()));
        for (argument, ident) in arguments.iter_mut().zip(idents) {
            argument.ident = ident;
        }
        let return_type = TypeExtractor::new(self.context, format!("{unit_name}Result"), namespace)
            .extract(&function.return_type)?
            .ty;
        Ok(SpecificationMembers::Function {
            flavour,
            method_name: naming::member_name(&spec.name),
            arguments,
            return_type,
        })
    }
}

/// Unit name before disambiguation.
pub fn unit_base_name(spec: &Specification) -> String {
    match &spec.kind {
        SpecificationKind::ClientFunction { code: Some(code), .. } => CLASS_DECLARATION
            .captures(code)
            .and_then(|captures| captures.get(1))
            .map(|class| class.as_str().to_owned())
            .unwrap_or_else(|| naming::type_name(&spec.name)),
        SpecificationKind::ServerVariable { .. } => format!("{}Handler", naming::type_name(&spec.name)),
        _ => naming::type_name(&spec.name),
    }
}

/// The event payload is the first argument of the callback passed as the
/// handle's first argument.
fn webhook_event(function: &FunctionMetadata) -> Option<&PropertyType> {
    let callback = function.arguments.first()?;
    let PropertyType::Function { spec: Some(signature), .. } = &callback.ty else {
        return None;
    };
    signature.arguments.first().map(|event| &event.ty)
}

fn requests_audience(function: &FunctionMetadata) -> bool {
    function
        .arguments
        .iter()
        .filter(|argument| argument.name.eq_ignore_ascii_case("options"))
        .any(|argument| {
            argument
                .ty
                .object_field_names()
                .iter()
                .any(|name| name.eq_ignore_ascii_case("audience"))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::TypeBody;
    use serde_json::{Value, json};

    fn spec(value: Value) -> Specification {
        serde_json::from_value(value).unwrap()
    }

    fn assemble_one(spec: Specification) -> (ResolvedSpecification, ResolutionContext) {
        let mut tree = ContextTree::new("Poly", "io.poly");
        let node = tree.insert(spec.clone()).unwrap();
        let mut context = ResolutionContext::new();
        let resolved = SpecificationAssembler::new(&mut context).assemble(&tree, node, &spec).unwrap();
        (resolved, context)
    }

    #[test]
    fn server_function_hints_arguments_and_result() {
        let (resolved, context) = assemble_one(spec(json!({
            "id": "f1",
            "type": "serverFunction",
            "context": "shipping",
            "name": "quote-rate",
            "function": {
                "arguments": [
                    {"name": "order", "required": true, "type": {"kind": "object", "schema": {
                        "type": "object", "properties": {"weight": {"type": "number"}},
                    }}},
                    {"name": "express", "type": {"kind": "primitive", "type": "boolean"}},
                ],
                "returnType": {"kind": "object", "schema": {"properties": {"total": {"type": "number"}}}},
            },
        })));
        assert_eq!(resolved.unit_name, "QuoteRate");
        assert_eq!(resolved.namespace, "io.poly.poly.shipping");
        let SpecificationMembers::Function { method_name, arguments, return_type, flavour } = &resolved.members else {
            panic!()
        };
        assert_eq!(method_name, "quoteRate");
        assert_eq!(*flavour, FunctionKind::Server);
        assert_eq!(arguments[0].ty.to_string(), "io.poly.poly.shipping.QuoteRateArg0");
        assert_eq!(arguments[1].ty, TypeRef::Boolean);
        assert_eq!(return_type.to_string(), "io.poly.poly.shipping.QuoteRateResult");
        assert!(resolved.imports.contains("io.poly.poly.shipping.QuoteRate"));
        assert!(resolved.imports.contains("io.poly.poly.shipping.QuoteRateArg0"));
        assert_eq!(context.type_count(), 2);
    }

    #[test]
    fn webhook_event_comes_from_callback_argument() {
        let (resolved, context) = assemble_one(spec(json!({
            "id": "w1",
            "type": "webhookHandle",
            "name": "orderCreated",
            "function": {"arguments": [{"name": "callback", "type": {"kind": "function", "spec": {
                "arguments": [{"name": "event", "type": {"kind": "object", "schema": {
                    "properties": {"orderId": {"type": "string"}},
                }}}],
            }}}]},
        })));
        let SpecificationMembers::Webhook { event_type } = &resolved.members else { panic!() };
        assert_eq!(event_type.to_string(), "io.poly.poly.OrderCreatedEvent");
        assert!(resolved.imports.contains(imports::HANDLE_SYMBOL));
        assert!(resolved.imports.contains(imports::CONSUMER_SYMBOL));
        let types = context.into_types();
        let TypeBody::Object { members } = &types[0].body else { panic!() };
        assert_eq!(members[0].ident, "orderId");
    }

    #[test]
    fn server_variable_uses_handler_unit() {
        let (resolved, _) = assemble_one(spec(json!({
            "id": "v1",
            "type": "serverVariable",
            "context": "config",
            "name": "retryPolicy",
            "variable": {"secret": true, "valueType": {"kind": "object", "schema": {
                "properties": {"attempts": {"type": "integer"}},
            }}},
        })));
        assert_eq!(resolved.unit_name, "RetryPolicyHandler");
        let SpecificationMembers::Variable { value_type, secret } = &resolved.members else { panic!() };
        assert!(*secret);
        assert_eq!(value_type.to_string(), "io.poly.poly.config.RetryPolicy");
    }

    #[test]
    fn client_function_takes_declared_class_name() {
        let spec = spec(json!({
            "id": "c1",
            "type": "customFunction",
            "name": "format",
            "language": "java",
            "code": "package x;\npublic class PriceFormatter {\n}",
            "function": {},
        }));
        assert_eq!(unit_base_name(&spec), "PriceFormatter");
    }

    #[test]
    fn auth_flavours() {
        let (resolved, _) = assemble_one(spec(json!({
            "id": "a1",
            "type": "authFunction",
            "name": "getToken",
            "function": {"arguments": [{"name": "options", "type": {"kind": "object", "properties": [
                {"name": "audience", "type": {"kind": "primitive", "type": "string"}},
            ]}}]},
        })));
        let SpecificationMembers::Function { flavour, .. } = &resolved.members else { panic!() };
        assert_eq!(*flavour, FunctionKind::Auth { audience: true });

        let (resolved, _) = assemble_one(spec(json!({
            "id": "a2",
            "type": "authFunction",
            "name": "revokeToken",
            "subResource": "/revoke",
            "function": {},
        })));
        let SpecificationMembers::Function { flavour, .. } = &resolved.members else { panic!() };
        assert_eq!(*flavour, FunctionKind::SubResourceAuth { path: "/revoke".into() });
    }

    #[test]
    fn auth_audience_ignores_case() {
        let (resolved, _) = assemble_one(spec(json!({
            "id": "a3",
            "type": "authFunction",
            "name": "getToken",
            "function": {"arguments": [{"name": "Options", "type": {"kind": "object", "properties": [
                {"name": "Audience", "type": {"kind": "primitive", "type": "string"}},
            ]}}]},
        })));
        let SpecificationMembers::Function { flavour, .. } = &resolved.members else { panic!() };
        assert_eq!(*flavour, FunctionKind::Auth { audience: true });

        let (resolved, _) = assemble_one(spec(json!({
            "id": "a4",
            "type": "authFunction",
            "name": "getToken",
            "function": {"arguments": [{"name": "settings", "type": {"kind": "object", "properties": [
                {"name": "audience", "type": {"kind": "primitive", "type": "string"}},
            ]}}]},
        })));
        let SpecificationMembers::Function { flavour, .. } = &resolved.members else { panic!() };
        assert_eq!(*flavour, FunctionKind::Auth { audience: false });
    }

    #[test]
    fn webhook_without_callback_shape_is_untyped() {
        let (resolved, context) = assemble_one(spec(json!({
            "id": "w2",
            "type": "webhookHandle",
            "name": "orderShipped",
            "function": {"arguments": [{"name": "callback", "type": {"kind": "primitive", "type": "string"}}]},
        })));
        let SpecificationMembers::Webhook { event_type } = &resolved.members else { panic!() };
        assert_eq!(*event_type, TypeRef::Any);
        assert_eq!(context.type_count(), 0);

        let (resolved, _) = assemble_one(spec(json!({
            "id": "w3",
            "type": "webhookHandle",
            "name": "orderPacked",
            "function": {},
        })));
        let SpecificationMembers::Webhook { event_type } = &resolved.members else { panic!() };
        assert_eq!(*event_type, TypeRef::Any);
    }

    #[test]
    fn ignored_descriptors_are_unsupported() {
        let spec = spec(json!({"id": "g1", "type": "graphqlSubscription", "name": "onEvent"}));
        assert!(spec.is_ignored());
        let mut tree = ContextTree::new("Poly", "io.poly");
        let node = tree.insert(spec.clone()).unwrap();
        let mut context = ResolutionContext::new();
        let err = SpecificationAssembler::new(&mut context).assemble(&tree, node, &spec).unwrap_err();
        let Error::Unsupported { descriptor, .. } = err else { panic!() };
        assert_eq!(descriptor, "g1");
    }

    #[test]
    fn reassembling_fails_fast() {
        let spec = spec(json!({"id": "f", "type": "serverFunction", "name": "run", "function": {}}));
        let mut tree = ContextTree::new("Poly", "io.poly");
        let node = tree.insert(spec.clone()).unwrap();
        let mut context = ResolutionContext::new();
        SpecificationAssembler::new(&mut context).assemble(&tree, node, &spec).unwrap();
        let err = SpecificationAssembler::new(&mut context).assemble(&tree, node, &spec).unwrap_err();
        assert!(matches!(err, Error::InvalidReuse { .. }));
    }

    #[test]
    fn units_with_clashing_names_are_disambiguated() {
        let first = spec(json!({"id": "1", "type": "serverFunction", "name": "get-user", "function": {}}));
        let second = spec(json!({"id": "2", "type": "serverFunction", "name": "getUser", "function": {}}));
        let mut tree = ContextTree::new("Poly", "io.poly");
        let node = tree.insert(first.clone()).unwrap();
        tree.insert(second.clone()).unwrap();
        let mut context = ResolutionContext::new();
        let a = SpecificationAssembler::new(&mut context).assemble(&tree, node, &first).unwrap();
        let b = SpecificationAssembler::new(&mut context).assemble(&tree, node, &second).unwrap();
        assert_eq!(a.unit_name, "GetUser");
        assert_eq!(b.unit_name, "GetUser_");
    }
}
