//! Namespace tree built from the dotted `context` of each descriptor.
//!
//! Nodes live in an arena and refer to their parent by index, so qualified
//! namespaces are computed on demand by walking upwards instead of being
//! stored on each node.
use indexmap::IndexMap;

use crate::naming;
use crate::spec::Specification;

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContextId(usize);

#[derive(Debug, Clone)]
pub struct ContextNode {
    pub name: String,
    parent: Option<ContextId>,
    children: IndexMap<String, ContextId>,
    specifications: Vec<Specification>,
}

#[derive(Debug, Clone)]
pub struct ContextTree {
    base_namespace: String,
    nodes: Vec<ContextNode>,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl ContextId {
    pub const ROOT: ContextId = ContextId(0);
}

impl ContextTree {
    pub fn new(root_name: impl Into<String>, base_namespace: impl Into<String>) -> Self {
        let root = ContextNode {
            name: root_name.into(),
            parent: None,
            children: IndexMap::new(),
            specifications: Vec::new(),
        };
        Self { base_namespace: base_namespace.into(), nodes: vec![root] }
    }

    pub fn root(&self) -> ContextId {
        ContextId::ROOT
    }

    /// Attaches `spec` under its context path, creating missing nodes.
    /// Returns `None` when a descriptor with the same name is already attached
    /// to that node; the later one is dropped.
    pub fn insert(&mut self, spec: Specification) -> Option<ContextId> {
        let mut current = self.root();
        for segment in split_context(&spec.context) {
            current = self.child_or_insert(current, segment);
        }
        let node = &mut self.nodes[current.0];
        if node.specifications.iter().any(|existing| existing.name == spec.name) {
            tracing::debug!(
                context = %spec.context,
                name = %spec.name,
                "dropping duplicate descriptor"
            );
            return None;
        }
        node.specifications.push(spec);
        Some(current)
    }

    /// Finds the node for a dotted path, if it exists.
    pub fn find(&self, context: &str) -> Option<ContextId> {
        let mut current = self.root();
        for segment in split_context(context) {
            current = *self.nodes[current.0].children.get(segment)?;
        }
        Some(current)
    }

    pub fn node(&self, id: ContextId) -> &ContextNode {
        &self.nodes[id.0]
    }

    pub fn parent(&self, id: ContextId) -> Option<ContextId> {
        self.nodes[id.0].parent
    }

    pub fn children(&self, id: ContextId) -> impl Iterator<Item = ContextId> + '_ {
        self.nodes[id.0].children.values().copied()
    }

    pub fn specifications(&self, id: ContextId) -> &[Specification] {
        &self.nodes[id.0].specifications
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() == 1 && self.nodes[0].specifications.is_empty()
    }

    /// Node names from the root down to `id`, both included.
    pub fn path(&self, id: ContextId) -> Vec<&str> {
        let mut path = Vec::new();
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            let node = &self.nodes[current.0];
            path.push(node.name.as_str());
            cursor = node.parent;
        }
        path.reverse();
        path
    }

    /// Namespace holding the node's own unit.
    pub fn namespace(&self, id: ContextId) -> String {
        match self.parent(id) {
            Some(parent) => self.member_namespace(parent),
            None => self.base_namespace.clone(),
        }
    }

    /// Namespace holding the node's descriptors and the types they reference.
    pub fn member_namespace(&self, id: ContextId) -> String {
        let mut namespace = self.base_namespace.clone();
        for segment in self.path(id) {
            let segment = segment.to_ascii_lowercase();
            if !namespace.is_empty() {
                namespace.push('.');
            }
            namespace.push_str(&segment);
        }
        namespace
    }

    pub fn unit_name(&self, id: ContextId) -> String {
        naming::type_name(&self.nodes[id.0].name)
    }

    /// Depth-first pre-order walk.
    pub fn walk(&self) -> Vec<ContextId> {
        let mut out = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![self.root()];
        while let Some(id) = stack.pop() {
            out.push(id);
            let children: Vec<ContextId> = self.children(id).collect();
            stack.extend(children.into_iter().rev());
        }
        out
    }

    fn child_or_insert(&mut self, parent: ContextId, segment: &str) -> ContextId {
        if let Some(existing) = self.nodes[parent.0].children.get(segment) {
            return *existing;
        }
        let id = ContextId(self.nodes.len());
        self.nodes.push(ContextNode {
            name: segment.to_owned(),
            parent: Some(parent),
            children: IndexMap::new(),
            specifications: Vec::new(),
        });
        self.nodes[parent.0].children.insert(segment.to_owned(), id);
        id
    }
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

/// `""`, `"."` and `"a..b"` all drop their empty segments.
pub fn split_context(context: &str) -> impl Iterator<Item = &str> {
    context.split('.').map(str::trim).filter(|segment| !segment.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn spec(context: &str, name: &str) -> Specification {
        serde_json::from_value(json!({
            "id": format!("{context}/{name}"),
            "type": "serverFunction",
            "context": context,
            "name": name,
            "function": {},
        }))
        .unwrap()
    }

    #[test]
    fn groups_descriptors_by_context_path() {
        let mut tree = ContextTree::new("Poly", "io.poly");
        tree.insert(spec("a.b", "one"));
        tree.insert(spec("a.c", "two"));
        tree.insert(spec("", "three"));

        let root = tree.root();
        assert_eq!(tree.specifications(root).len(), 1);
        let a: Vec<_> = tree.children(root).collect();
        assert_eq!(a.len(), 1);
        assert_eq!(tree.node(a[0]).name, "a");
        let names: Vec<_> = tree.children(a[0]).map(|id| tree.node(id).name.clone()).collect();
        assert_eq!(names, vec!["b", "c"]);
        assert_eq!(tree.specifications(tree.find("a.b").unwrap())[0].name, "one");
    }

    #[test]
    fn empty_segments_collapse() {
        let mut tree = ContextTree::new("Poly", "io.poly");
        assert_eq!(tree.insert(spec(".", "x")), Some(tree.root()));
        let id = tree.insert(spec("a..b.", "y")).unwrap();
        assert_eq!(tree.path(id), vec!["Poly", "a", "b"]);
        assert_eq!(tree.len(), 3);
    }

    #[test]
    fn duplicate_names_in_one_node_are_dropped() {
        let mut tree = ContextTree::new("Poly", "io.poly");
        assert!(tree.insert(spec("a", "x")).is_some());
        assert!(tree.insert(spec("a", "x")).is_none());
        assert!(tree.insert(spec("b", "x")).is_some());
        assert_eq!(tree.specifications(tree.find("a").unwrap()).len(), 1);
    }

    #[test]
    fn namespaces_follow_ancestry() {
        let mut tree = ContextTree::new("Poly", "io.poly");
        let id = tree.insert(spec("Shipping.rates", "quote")).unwrap();
        assert_eq!(tree.namespace(tree.root()), "io.poly");
        assert_eq!(tree.member_namespace(tree.root()), "io.poly.poly");
        assert_eq!(tree.namespace(id), "io.poly.poly.shipping");
        assert_eq!(tree.member_namespace(id), "io.poly.poly.shipping.rates");
        assert_eq!(tree.unit_name(id), "Rates");
    }

    #[test]
    fn walk_is_preorder_in_insertion_order() {
        let mut tree = ContextTree::new("Poly", "");
        tree.insert(spec("a.b", "x"));
        tree.insert(spec("c", "x"));
        tree.insert(spec("a.d", "x"));
        let names: Vec<_> = tree.walk().into_iter().map(|id| tree.node(id).name.clone()).collect();
        assert_eq!(names, vec!["Poly", "a", "b", "d", "c"]);
    }
}
