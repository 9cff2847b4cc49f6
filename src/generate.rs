//! One generation run: filter, build the context trees, resolve every node.
use crate::assemble::SpecificationAssembler;
use crate::config::GenerationConfig;
use crate::context::{ContextId, ContextTree};
use crate::error::Result;
use crate::imports;
use crate::ir::{GenerationOutput, ResolvedContext, SkippedDescriptor};
use crate::resolve::ResolutionContext;
use crate::spec::Specification;

/// Runs the whole batch. Nothing is returned unless every descriptor resolved.
pub fn generate(specs: Vec<Specification>, config: &GenerationConfig) -> Result<GenerationOutput> {
    let mut functions = ContextTree::new(&config.function_root, &config.base_namespace);
    let mut variables = ContextTree::new(&config.variable_root, &config.base_namespace);
    let mut skipped = Vec::new();

    for spec in specs {
        if let Some(reason) = config.exclusion_reason(&spec) {
            tracing::debug!(id = %spec.id, name = %spec.name, "skipping: {reason}");
            skipped.push(SkippedDescriptor { id: spec.id, name: spec.name, reason });
            continue;
        }
        let tree = if spec.is_variable() { &mut variables } else { &mut functions };
        let (id, name) = (spec.id.clone(), spec.name.clone());
        if tree.insert(spec).is_none() {
            skipped.push(SkippedDescriptor { id, name, reason: "duplicate name in context".to_owned() });
        }
    }

    let mut context = ResolutionContext::new();
    let mut contexts = Vec::new();
    for tree in [&functions, &variables] {
        if tree.is_empty() {
            continue;
        }
        let root = tree.root();
        let unit_name = context.reserve_unit(&tree.namespace(root), &tree.unit_name(root), &context_identity(tree, root));
        contexts.push(resolve_node(&mut context, tree, root, unit_name)?);
    }

    let types = context.into_types();
    tracing::info!(
        roots = contexts.len(),
        types = types.len(),
        skipped = skipped.len(),
        "resolution finished"
    );
    Ok(GenerationOutput { contexts, types, skipped })
}

fn resolve_node(
    context: &mut ResolutionContext,
    tree: &ContextTree,
    id: ContextId,
    unit_name: String,
) -> Result<ResolvedContext> {
    let member_namespace = tree.member_namespace(id);

    // child units share the member namespace with this node's descriptors and
    // types, so they are bound first
    let child_units: Vec<(ContextId, String)> = tree
        .children(id)
        .map(|child| {
            let unit = context.reserve_unit(&member_namespace, &tree.unit_name(child), &context_identity(tree, child));
            (child, unit)
        })
        .collect();

    let mut specifications = Vec::with_capacity(tree.specifications(id).len());
    for spec in tree.specifications(id) {
        specifications.push(SpecificationAssembler::new(context).assemble(tree, id, spec)?);
    }

    let mut children = Vec::with_capacity(child_units.len());
    for (child, unit) in child_units {
        children.push(resolve_node(context, tree, child, unit)?);
    }

    Ok(ResolvedContext {
        name: tree.node(id).name.clone(),
        namespace: tree.namespace(id),
        unit_name,
        imports: imports::context_imports(&children, &specifications),
        children,
        specifications,
    })
}

fn context_identity(tree: &ContextTree, id: ContextId) -> String {
    format!("context:{}", tree.path(id).join("."))
}
