use std::collections::BTreeSet;

use crate::ir::{
    Member, QualifiedName, ResolvedContext, ResolvedSpecification, SpecificationMembers,
    TypeBody, TypeRef,
};

pub const LIST_SYMBOL: &str = "runtime.List";
pub const MAP_SYMBOL: &str = "runtime.Map";
pub const HANDLE_SYMBOL: &str = "runtime.webhook.Handle";
pub const CONSUMER_SYMBOL: &str = "runtime.webhook.Consumer";

#[derive(Debug, Default)]
pub struct ImportCollector {
    imports: BTreeSet<String>,
}

impl ImportCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn symbol(&mut self, symbol: impl Into<String>) -> &mut Self {
        self.imports.insert(symbol.into());
        self
    }

    pub fn qualified(&mut self, name: &QualifiedName) -> &mut Self {
        self.symbol(name.to_string())
    }

    pub fn type_ref(&mut self, ty: &TypeRef) -> &mut Self {
        match ty {
            TypeRef::List(elem) => {
                self.symbol(LIST_SYMBOL);
                self.type_ref(elem)
            }
            TypeRef::Map => self.symbol(MAP_SYMBOL),
            TypeRef::Named(name) => self.qualified(name),
            TypeRef::Void
            | TypeRef::String
            | TypeRef::Integer
            | TypeRef::Float
            | TypeRef::Boolean
            | TypeRef::Any => self,
        }
    }

    pub fn members(&mut self, members: &[Member]) -> &mut Self {
        for member in members {
            self.type_ref(&member.ty);
        }
        self
    }

    pub fn specification(&mut self, spec: &ResolvedSpecification) -> &mut Self {
        self.qualified(&spec.qualified_name());
        match &spec.members {
            SpecificationMembers::Function { arguments, return_type, .. } => {
                self.members(arguments).type_ref(return_type)
            }
            SpecificationMembers::Variable { value_type, .. } => self.type_ref(value_type),
            SpecificationMembers::Webhook { event_type } => self
                .symbol(HANDLE_SYMBOL)
                .symbol(CONSUMER_SYMBOL)
                .type_ref(event_type),
        }
    }

    pub fn finish(&mut self) -> BTreeSet<String> {
        std::mem::take(&mut self.imports)
    }
}

pub fn type_imports(ty: &TypeRef) -> BTreeSet<String> {
    ImportCollector::new().type_ref(ty).finish()
}

pub fn body_imports(body: &TypeBody) -> BTreeSet<String> {
    match body {
        TypeBody::Object { members } => ImportCollector::new().members(members).finish(),
        TypeBody::Enum { .. } => BTreeSet::new(),
    }
}

pub fn specification_imports(spec: &ResolvedSpecification) -> BTreeSet<String> {
    ImportCollector::new().specification(spec).finish()
}

/// Child units plus everything the attached specifications import.
pub fn context_imports(children: &[ResolvedContext], specs: &[ResolvedSpecification]) -> BTreeSet<String> {
    let mut collector = ImportCollector::new();
    for child in children {
        collector.qualified(&child.qualified_name());
    }
    for spec in specs {
        for symbol in &spec.imports {
            collector.symbol(symbol.clone());
        }
    }
    collector.finish()
}
