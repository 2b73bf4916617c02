//! IDE entry points for `@At(target = "...")` selectors.
//!
//! All queries take the workspace, the file containing the mixin and a byte
//! offset inside the `target` string literal. Queries never fail: anything that
//! cannot be resolved yields an empty result.

use std::path::Path;

use tree_sitter::Node;

use crate::handler::Handler;
use crate::parse::{
    annotation_simple_name, declared_attribute, declared_string_attribute, enclosing_annotation,
    node_text, string_literal_content_span, string_literal_value, visit_nodes,
};
use crate::scope::BodyScope;
use crate::target::{resolve_target_method, TargetMethod};
use crate::{
    CompletionVariant, Diagnostic, FileId, InjectionPointKind, MixinWorkspace, NavigationTarget,
    Span,
};

pub const MIXIN_UNRESOLVED_TARGET: &str = "MIXIN_UNRESOLVED_TARGET";

/// A `target` string literal of an `@At` annotation.
#[derive(Clone, Copy, Debug)]
struct ReferenceContext<'w> {
    file: FileId,
    source: &'w str,
    at: Node<'w>,
    literal: Node<'w>,
}

impl<'w> ReferenceContext<'w> {
    fn at_offset(workspace: &'w MixinWorkspace, path: &Path, offset: usize) -> Option<Self> {
        let file = workspace.file_id(path)?;
        let root = workspace.file(file).tree().root_node();
        let mut current = root.descendant_for_byte_range(offset, offset);
        while let Some(node) = current {
            if node.kind() == "string_literal" {
                return Self::from_literal(workspace, file, node);
            }
            if node.kind() == "element_value_pair" {
                return None;
            }
            current = node.parent();
        }
        None
    }

    fn from_literal(workspace: &'w MixinWorkspace, file: FileId, literal: Node<'w>) -> Option<Self> {
        let source = workspace.file(file).text();
        let at = enclosing_annotation(literal)?;
        if annotation_simple_name(source, at) != Some("At") {
            return None;
        }
        let target = declared_attribute(source, at, "target")?;
        if target.id() != literal.id() {
            return None;
        }
        Some(Self {
            file,
            source,
            at,
            literal,
        })
    }

    fn selector(&self) -> String {
        string_literal_value(node_text(self.source, self.literal))
    }

    fn handler(&self) -> Option<Handler> {
        let value = declared_string_attribute(self.source, self.at, "value");
        match value.as_deref().and_then(InjectionPointKind::from_at_value) {
            Some(kind) => Some(Handler::for_kind(kind)),
            None => {
                tracing::debug!(
                    value = value.as_deref().unwrap_or_default(),
                    "@At injection point has no target selector support"
                );
                None
            }
        }
    }
}

struct Resolved<'w> {
    target: TargetMethod<'w>,
    elements: Vec<Node<'w>>,
}

fn resolve<'w>(
    workspace: &'w MixinWorkspace,
    ctx: &ReferenceContext<'w>,
    check_only: bool,
) -> Option<Resolved<'w>> {
    let handler = ctx.handler()?;
    let target = resolve_target_method(workspace, ctx.file, ctx.at)?;
    let scope = BodyScope::new(workspace, target.method, target.node);
    let elements = handler.find_usages(&scope, target.body, &ctx.selector(), check_only)?;
    Some(Resolved { target, elements })
}

fn is_unresolved_at(workspace: &MixinWorkspace, ctx: &ReferenceContext<'_>) -> bool {
    resolve(workspace, ctx, true).is_some_and(|resolved| resolved.elements.is_empty())
}

/// Whether the selector applies to its injection point but matches nothing.
pub fn is_unresolved(workspace: &MixinWorkspace, path: &Path, offset: usize) -> bool {
    ReferenceContext::at_offset(workspace, path, offset)
        .is_some_and(|ctx| is_unresolved_at(workspace, &ctx))
}

/// Every element of the target body the selector matches.
pub fn resolve_reference(
    workspace: &MixinWorkspace,
    path: &Path,
    offset: usize,
) -> Vec<NavigationTarget> {
    let Some(ctx) = ReferenceContext::at_offset(workspace, path, offset) else {
        return Vec::new();
    };
    let Some(resolved) = resolve(workspace, &ctx, false) else {
        return Vec::new();
    };
    let index = workspace.index();
    let file = workspace
        .file(index.class(resolved.target.class).file)
        .path();
    resolved
        .elements
        .into_iter()
        .map(|node| NavigationTarget {
            file: file.to_path_buf(),
            span: Span::new(node.start_byte(), node.end_byte()),
        })
        .collect()
}

/// The matched element when the selector matches exactly one.
pub fn resolve_target(
    workspace: &MixinWorkspace,
    path: &Path,
    offset: usize,
) -> Option<NavigationTarget> {
    let mut targets = resolve_reference(workspace, path, offset);
    if targets.len() == 1 {
        targets.pop()
    } else {
        None
    }
}

/// Completion literals for every candidate in the target body.
pub fn collect_variants(
    workspace: &MixinWorkspace,
    path: &Path,
    offset: usize,
) -> Vec<CompletionVariant> {
    let Some(ctx) = ReferenceContext::at_offset(workspace, path, offset) else {
        return Vec::new();
    };
    let Some(handler) = ctx.handler() else {
        return Vec::new();
    };
    let Some(target) = resolve_target_method(workspace, ctx.file, ctx.at) else {
        return Vec::new();
    };
    let scope = BodyScope::new(workspace, target.method, target.node);
    let replace_span = string_literal_content_span(ctx.literal, ctx.source);
    handler
        .collect_variants(&scope, target.body)
        .into_iter()
        .map(|lookup| lookup.complete_to_literal(replace_span))
        .collect()
}

/// Whether the selector at `offset` names a class member.
///
/// `None` when the offset is not inside a supported `@At` target.
pub fn uses_member_reference(
    workspace: &MixinWorkspace,
    path: &Path,
    offset: usize,
) -> Option<bool> {
    let ctx = ReferenceContext::at_offset(workspace, path, offset)?;
    Some(ctx.handler()?.uses_member_reference())
}

/// Report every `@At` target selector in `path` that applies but matches nothing.
pub fn diagnostics_for_file(workspace: &MixinWorkspace, path: &Path) -> Vec<Diagnostic> {
    let Some(file) = workspace.file_id(path) else {
        return Vec::new();
    };
    let root = workspace.file(file).tree().root_node();

    let mut contexts = Vec::new();
    visit_nodes(root, &mut |node| {
        if node.kind() == "string_literal" {
            contexts.extend(ReferenceContext::from_literal(workspace, file, node));
        }
    });

    contexts
        .into_iter()
        .filter(|ctx| is_unresolved_at(workspace, ctx))
        .map(|ctx| {
            Diagnostic::error(
                MIXIN_UNRESOLVED_TARGET,
                format!("Cannot resolve target reference '{}'", ctx.selector()),
                Some(string_literal_content_span(ctx.literal, ctx.source)),
            )
        })
        .collect()
}
