//! Resolution of the target method an injector applies to.
//!
//! `@Inject(method = "tick", at = @At(...))` inside `@Mixin(Target.class)` selects
//! `Target#tick`. Every step is best-effort: ambiguity or missing pieces yield `None`.

use tree_sitter::Node;

use crate::index::{ClassId, MethodId, TYPE_DECLARATIONS};
use crate::member::MemberReference;
use crate::parse::{
    ancestor_of_kind, annotation_simple_name, annotations_in, class_literal_types,
    declared_attribute, enclosing_annotation, modifier_node, node_for_span, string_values,
};
use crate::{FileId, MixinWorkspace};

const METHOD_DECLARATIONS: &[&str] = &["method_declaration", "constructor_declaration"];

/// The method whose body an `@At` selector is matched against.
#[derive(Clone, Copy, Debug)]
pub(crate) struct TargetMethod<'w> {
    pub(crate) class: ClassId,
    pub(crate) method: MethodId,
    /// Declaration node in the target class's syntax tree.
    pub(crate) node: Node<'w>,
    pub(crate) body: Node<'w>,
}

/// Resolve the target method for the `@At` annotation `at` declared in `file`.
pub(crate) fn resolve_target_method<'w>(
    workspace: &'w MixinWorkspace,
    file: FileId,
    at: Node<'w>,
) -> Option<TargetMethod<'w>> {
    let source = workspace.file(file).text();
    let injector = enclosing_annotation(at)?;
    let selectors = declared_attribute(source, injector, "method")
        .map(|value| string_values(source, value))
        .unwrap_or_default();
    let [selector] = selectors.as_slice() else {
        tracing::debug!(
            injector = annotation_simple_name(source, injector).unwrap_or_default(),
            selectors = selectors.len(),
            "mixin injector does not name exactly one target method"
        );
        return None;
    };

    let class = mixin_target_class(workspace, file, at)?;
    let method = target_method(workspace, class, selector)?;

    let index = workspace.index();
    let def = index.method(method);
    if !def.has_body {
        tracing::debug!(method = %def.name, "mixin target method has no body");
        return None;
    }

    let root = workspace.file(index.class(class).file).tree().root_node();
    let node = node_for_span(root, def.decl_span, METHOD_DECLARATIONS)?;
    let body = node.child_by_field_name("body")?;
    Some(TargetMethod {
        class,
        method,
        node,
        body,
    })
}

/// The single class named by the `@Mixin` annotation of the class enclosing `node`.
fn mixin_target_class(workspace: &MixinWorkspace, file: FileId, node: Node<'_>) -> Option<ClassId> {
    let source = workspace.file(file).text();
    let index = workspace.index();
    let mixin_class = ancestor_of_kind(node, TYPE_DECLARATIONS)?;
    let mixin = annotations_in(modifier_node(mixin_class)?)
        .into_iter()
        .find(|annotation| annotation_simple_name(source, *annotation) == Some("Mixin"))?;

    let mut targets: Vec<ClassId> = Vec::new();
    if let Some(value) = declared_attribute(source, mixin, "value") {
        targets.extend(
            class_literal_types(source, value)
                .into_iter()
                .filter_map(|ty| index.resolve_type(file, ty)),
        );
    }
    if let Some(value) = declared_attribute(source, mixin, "targets") {
        targets.extend(
            string_values(source, value)
                .iter()
                .filter_map(|name| index.class_by_name(name)),
        );
    }
    targets.dedup();

    match targets.as_slice() {
        [class] => Some(*class),
        _ => {
            tracing::debug!(
                targets = targets.len(),
                "mixin does not resolve to exactly one indexed target class"
            );
            None
        }
    }
}

fn target_method(workspace: &MixinWorkspace, class: ClassId, selector: &str) -> Option<MethodId> {
    let index = workspace.index();
    let reference = MemberReference::parse(selector)?;
    let owner = index.class(class).internal_name();
    let mut candidates = index
        .methods_of(class)
        .filter(|(id, def)| reference.matches(&def.name, &index.method_descriptor(*id), &owner))
        .map(|(id, _)| id);

    let method = candidates.next();
    if method.is_none() || candidates.next().is_some() {
        tracing::debug!(selector, "mixin target method selector is not unique");
        return None;
    }
    method
}
