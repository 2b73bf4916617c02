//! Per-injection-point matching and completion rendering.

use tree_sitter::Node;

use crate::index::{ClassId, ClassIndex, FieldId, MethodId};
use crate::member::{resolve_qualifier, Member, MemberReference, QualifiedMember};
use crate::parse::{is_field_child, node_text, string_literal_value};
use crate::scope::BodyScope;
use crate::{CompletionVariant, InjectionPointKind, Span};

/// Parents under which a bare identifier is read as an expression.
const EXPRESSION_PARENTS: &[&str] = &[
    "assignment_expression",
    "binary_expression",
    "unary_expression",
    "update_expression",
    "parenthesized_expression",
    "argument_list",
    "return_statement",
    "ternary_expression",
    "array_access",
    "array_initializer",
    "throw_statement",
    "dimensions_expr",
    "yield_statement",
    "assert_statement",
];

/// How the `target` selector of one injection-point kind is matched.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Handler {
    /// `INVOKE` and `INVOKE_ASSIGN`: method call expressions.
    MethodInvoke,
    /// `INVOKE_STRING`: string-literal arguments of method calls.
    StringConstant,
    /// `FIELD`: field reads and writes.
    FieldAccess,
    /// `NEW`: object creation expressions.
    Construction,
}

/// A completion candidate before it is bound to the literal being completed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Lookup {
    pub(crate) lookup_string: String,
    pub(crate) presentable: String,
    pub(crate) lookup_strings: Vec<String>,
    pub(crate) detail: Option<String>,
    pub(crate) bold: bool,
}

impl Lookup {
    pub(crate) fn complete_to_literal(self, replace_span: Span) -> CompletionVariant {
        CompletionVariant {
            label: self.presentable,
            insert_text: self.lookup_string,
            lookup_strings: self.lookup_strings,
            detail: self.detail,
            bold: self.bold,
            replace_span: Some(replace_span),
        }
    }
}

impl Handler {
    pub fn for_kind(kind: InjectionPointKind) -> Self {
        match kind {
            InjectionPointKind::MethodInvoke | InjectionPointKind::MethodInvokeAssign => {
                Handler::MethodInvoke
            }
            InjectionPointKind::InvokeStringConstant => Handler::StringConstant,
            InjectionPointKind::FieldAccess => Handler::FieldAccess,
            InjectionPointKind::ObjectConstruction => Handler::Construction,
        }
    }

    /// Whether selectors of this kind name a class member rather than a constant.
    pub fn uses_member_reference(self) -> bool {
        !matches!(self, Handler::StringConstant)
    }

    /// Elements of `body` matching `selector`.
    ///
    /// Returns `None` when the selector is not something this handler understands.
    pub(crate) fn find_usages<'w>(
        self,
        scope: &BodyScope<'w>,
        body: Node<'w>,
        selector: &str,
        check_only: bool,
    ) -> Option<Vec<Node<'w>>> {
        let mut visitor = crate::CollectVisitor::new(check_only);
        match self {
            Handler::StringConstant => {
                visitor.visit(body, |node| {
                    let value = match_string_argument(scope, node)?;
                    (value == selector).then_some(node)
                });
            }
            Handler::MethodInvoke => {
                let reference = MemberReference::parse(selector)?;
                visitor.visit(body, |node| {
                    match_calls(scope, node)
                        .iter()
                        .any(|member| member.matches(scope.index, &reference))
                        .then_some(node)
                });
            }
            Handler::FieldAccess => {
                let reference = MemberReference::parse(selector)?;
                visitor.visit(body, |node| {
                    let member = match_field(scope, node)?;
                    member.matches(scope.index, &reference).then_some(node)
                });
            }
            Handler::Construction => {
                let reference = MemberReference::parse(selector)?;
                visitor.visit(body, |node| {
                    match_constructions(scope, node)
                        .iter()
                        .any(|member| member.matches(scope.index, &reference))
                        .then_some(node)
                });
            }
        }
        Some(visitor.into_result())
    }

    /// Every candidate in `body`, rendered as a lookup, first occurrence first.
    pub(crate) fn collect_variants<'w>(self, scope: &BodyScope<'w>, body: Node<'w>) -> Vec<Lookup> {
        let index = scope.index;
        let target = scope.class;
        let lookups: Vec<Lookup> = match self {
            Handler::StringConstant => collect_usages(body, |node| {
                let value = match_string_argument(scope, node)?;
                Some((node, value))
            })
            .into_iter()
            .map(|(node, value)| string_lookup(scope, node, value))
            .collect(),
            Handler::MethodInvoke => collect_usages(body, |node| match_call(scope, node))
                .into_iter()
                .map(|member| method_lookup(index, target, member))
                .collect(),
            Handler::FieldAccess => collect_usages(body, |node| match_field(scope, node))
                .into_iter()
                .map(|member| field_lookup(index, target, member))
                .collect(),
            Handler::Construction => collect_usages(body, |node| match_construction(scope, node))
                .into_iter()
                .map(|member| method_lookup(index, target, member))
                .collect(),
        };

        let mut seen = std::collections::HashSet::new();
        lookups
            .into_iter()
            .filter(|lookup| seen.insert(lookup.lookup_string.clone()))
            .collect()
    }
}

fn collect_usages<'w, T>(body: Node<'w>, matcher: impl FnMut(Node<'w>) -> Option<T>) -> Vec<T> {
    let mut visitor = crate::CollectVisitor::new(false);
    visitor.visit(body, matcher);
    visitor.into_result()
}

/// Methods a call may invoke; several only when its overload is ambiguous.
fn match_calls<'w>(scope: &BodyScope<'w>, node: Node<'w>) -> Vec<QualifiedMember<MethodId>> {
    if node.kind() != "method_invocation" {
        return Vec::new();
    }
    let qualifier = resolve_qualifier(scope, node.child_by_field_name("object"));
    scope
        .call_candidates(node)
        .into_iter()
        .map(|method| QualifiedMember::new(method, qualifier))
        .collect()
}

fn match_call<'w>(scope: &BodyScope<'w>, node: Node<'w>) -> Option<QualifiedMember<MethodId>> {
    match_calls(scope, node).into_iter().next()
}

fn match_field<'w>(scope: &BodyScope<'w>, node: Node<'w>) -> Option<QualifiedMember<FieldId>> {
    match node.kind() {
        "field_access" => {
            let field = scope.resolve_field_access(node)?;
            Some(QualifiedMember::from_access(
                scope,
                field,
                node.child_by_field_name("object"),
            ))
        }
        "identifier" if is_expression_identifier(node) => {
            let name = scope.text(node);
            if scope.is_local(name, node) {
                return None;
            }
            let field = scope.resolve_field_name(name)?;
            Some(QualifiedMember::new(field, None))
        }
        _ => None,
    }
}

fn match_constructions<'w>(
    scope: &BodyScope<'w>,
    node: Node<'w>,
) -> Vec<QualifiedMember<MethodId>> {
    if node.kind() != "object_creation_expression" {
        return Vec::new();
    }
    scope
        .construction_candidates(node)
        .into_iter()
        .map(|constructor| QualifiedMember::new(constructor, None))
        .collect()
}

fn match_construction<'w>(
    scope: &BodyScope<'w>,
    node: Node<'w>,
) -> Option<QualifiedMember<MethodId>> {
    match_constructions(scope, node).into_iter().next()
}

/// Value of a string literal passed as an argument to a method call.
fn match_string_argument(scope: &BodyScope<'_>, node: Node<'_>) -> Option<String> {
    if node.kind() != "string_literal" {
        return None;
    }
    let args = node.parent().filter(|args| args.kind() == "argument_list")?;
    args.parent()
        .filter(|call| call.kind() == "method_invocation")?;
    Some(string_literal_value(node_text(scope.source, node)))
}

fn is_expression_identifier(node: Node<'_>) -> bool {
    let Some(parent) = node.parent() else {
        return false;
    };
    match parent.kind() {
        "field_access" | "method_invocation" => is_field_child(parent, "object", node),
        "variable_declarator" | "cast_expression" | "enhanced_for_statement" => {
            is_field_child(parent, "value", node)
        }
        "instanceof_expression" => is_field_child(parent, "left", node),
        "for_statement" => is_field_child(parent, "condition", node),
        kind => EXPRESSION_PARENTS.contains(&kind),
    }
}

fn method_lookup(index: &ClassIndex, target: ClassId, member: QualifiedMember<MethodId>) -> Lookup {
    // Constructors present as `<init>`, methods by their plain name.
    let name = member.member.name(index).to_string();
    member_lookup(index, target, member, name)
}

fn field_lookup(index: &ClassIndex, target: ClassId, member: QualifiedMember<FieldId>) -> Lookup {
    let name = member.member.name(index).to_string();
    member_lookup(index, target, member, name)
}

fn member_lookup<M: Member>(
    index: &ClassIndex,
    target: ClassId,
    member: QualifiedMember<M>,
    presentable: String,
) -> Lookup {
    let declaring = member.member.declaring_class();
    let lookup = Lookup {
        lookup_string: member.literal(index),
        lookup_strings: vec![presentable.clone()],
        presentable,
        detail: Some(member.member.descriptor(index)),
        bold: declaring == target,
    };
    qualify_lookup(index, lookup, target, declaring)
}

/// Prefix members declared outside the target class with their owner's short name.
fn qualify_lookup(index: &ClassIndex, lookup: Lookup, target: ClassId, owner: ClassId) -> Lookup {
    if owner == target {
        return lookup;
    }
    let owner_name = &index.class(owner).name;
    Lookup {
        presentable: format!("{owner_name}.{}", lookup.presentable),
        lookup_strings: lookup
            .lookup_strings
            .iter()
            .map(|s| format!("{owner_name}.{s}"))
            .collect(),
        ..lookup
    }
}

fn string_lookup(scope: &BodyScope<'_>, literal: Node<'_>, value: String) -> Lookup {
    let callee = literal
        .parent()
        .and_then(|args| args.parent())
        .and_then(|call| call.child_by_field_name("name"))
        .map(|name| format!("{}(...)", scope.text(name)));
    Lookup {
        lookup_strings: vec![value.clone()],
        presentable: value.clone(),
        lookup_string: value,
        detail: callee,
        bold: false,
    }
}
