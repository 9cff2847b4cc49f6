// One registry per run. A name sticks to the fingerprint of whatever body
// claimed it first; other bodies get the marker appended until a slot fits.
use std::collections::HashMap;

use indexmap::IndexMap;

use crate::ir::{QualifiedName, TypeBody, TypeDecl};
use crate::imports;

pub const DISAMBIGUATION_MARKER: &str = "_";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reservation {
    /// Newly bound; the caller must define the body.
    Fresh(QualifiedName),
    /// Already bound to an identical body.
    Existing(QualifiedName),
}

#[derive(Debug, Default)]
pub struct TypeRegistry {
    bindings: HashMap<QualifiedName, u64>,
    /// Declarations in reservation order. `None` while members are expanding.
    decls: IndexMap<QualifiedName, Option<TypeBody>>,
}

impl Reservation {
    pub fn name(&self) -> &QualifiedName {
        match self {
            Reservation::Fresh(name) | Reservation::Existing(name) => name,
        }
    }

    pub fn into_name(self) -> QualifiedName {
        match self {
            Reservation::Fresh(name) | Reservation::Existing(name) => name,
        }
    }
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reserve(&mut self, namespace: &str, base: &str, fingerprint: u64) -> Reservation {
        let mut candidate = QualifiedName::new(namespace, base);
        loop {
            match self.bindings.get(&candidate) {
                None => {
                    self.bindings.insert(candidate.clone(), fingerprint);
                    return Reservation::Fresh(candidate);
                }
                Some(existing) if *existing == fingerprint => return Reservation::Existing(candidate),
                Some(_) => {
                    tracing::trace!(name = %candidate, "name taken by a different body");
                    candidate.name.push_str(DISAMBIGUATION_MARKER);
                }
            }
        }
    }

    /// Holds the declaration's output slot before its members are expanded.
    pub fn declare(&mut self, name: QualifiedName) {
        self.decls.entry(name).or_insert(None);
    }

    pub fn define(&mut self, name: QualifiedName, body: TypeBody) {
        self.decls.insert(name, Some(body));
    }

    pub fn is_bound(&self, name: &QualifiedName) -> bool {
        self.bindings.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.decls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.decls.is_empty()
    }

    /// Completed declarations in reservation order.
    pub fn into_decls(self) -> Vec<TypeDecl> {
        self.decls
            .into_iter()
            .filter_map(|(name, body)| {
                let body = body?;
                let imports = imports::body_imports(&body);
                Some(TypeDecl { name, body, imports })
            })
            .collect()
    }
}
