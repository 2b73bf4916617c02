//! Name and static-type lookup inside a target method body.

use std::cell::Cell;

use tree_sitter::Node;

use crate::index::{ArgumentType, ClassId, ClassIndex, FieldId, MethodId};
use crate::member::resolve_qualifier;
use crate::parse::{ancestor_of_kind, clean_type, find_named_child, node_text, visit_nodes};
use crate::{FileId, MixinWorkspace};

/// Bounds expression typing, which recurses through qualifiers and `var` initializers.
const MAX_TYPING_DEPTH: u32 = 16;

const STRING_DESCRIPTOR: &str = "Ljava/lang/String;";

/// A method body being scanned, together with the class that declares it.
pub(crate) struct BodyScope<'w> {
    pub(crate) index: &'w ClassIndex,
    pub(crate) file: FileId,
    pub(crate) source: &'w str,
    /// The scanned (target) class.
    pub(crate) class: ClassId,
    pub(crate) method: MethodId,
    /// Declaration of the scanned method, used for parameter and local lookup.
    pub(crate) node: Node<'w>,
    typing_depth: Cell<u32>,
}

/// A local variable, parameter or resource declaration.
#[derive(Clone, Copy)]
struct LocalVar<'w> {
    /// Declared type as written; `None` for implicitly typed lambda parameters.
    ty: Option<&'w str>,
    init: Option<Node<'w>>,
    /// Region of the source the name is visible in.
    scope: Node<'w>,
    /// End of the declared name; uses must start after it.
    declared_at: usize,
}

impl<'w> LocalVar<'w> {
    fn is_visible_at(&self, use_site: Node<'_>) -> bool {
        self.declared_at <= use_site.start_byte()
            && self.scope.start_byte() <= use_site.start_byte()
            && use_site.end_byte() <= self.scope.end_byte()
    }
}

impl<'w> BodyScope<'w> {
    pub(crate) fn new(workspace: &'w MixinWorkspace, method: MethodId, node: Node<'w>) -> Self {
        let index = workspace.index();
        let file = index.class(method.class).file;
        Self {
            index,
            file,
            source: workspace.file(file).text(),
            class: method.class,
            method,
            node,
            typing_depth: Cell::new(0),
        }
    }

    pub(crate) fn text(&self, node: Node<'_>) -> &'w str {
        node_text(self.source, node)
    }

    /// Innermost declaration of `name` visible at `use_site`.
    fn local_variable(&self, name: &str, use_site: Node<'_>) -> Option<LocalVar<'w>> {
        let mut found = None;
        visit_nodes(self.node, &mut |node| {
            if let Some(local) = self.declared_local(node, name) {
                if local.is_visible_at(use_site) {
                    found = Some(local);
                }
            }
        });
        found
    }

    fn declared_local(&self, node: Node<'w>, name: &str) -> Option<LocalVar<'w>> {
        match node.kind() {
            "formal_parameter" | "enhanced_for_statement" | "resource" => {
                let decl_name = node.child_by_field_name("name")?;
                if self.text(decl_name) != name {
                    return None;
                }
                let ty = node.child_by_field_name("type")?;
                let (init, scope) = match node.kind() {
                    "resource" => (
                        node.child_by_field_name("value"),
                        ancestor_of_kind(node, &["try_with_resources_statement"])?,
                    ),
                    "enhanced_for_statement" => (None, node),
                    // formal_parameters -> method, constructor or lambda
                    _ => (None, node.parent()?.parent()?),
                };
                Some(LocalVar {
                    ty: Some(self.text(ty)),
                    init,
                    scope,
                    declared_at: decl_name.end_byte(),
                })
            }
            "catch_formal_parameter" => {
                let decl_name = node.child_by_field_name("name")?;
                if self.text(decl_name) != name {
                    return None;
                }
                let ty = find_named_child(node, "catch_type")?;
                Some(LocalVar {
                    ty: Some(self.text(ty)),
                    init: None,
                    scope: node.parent()?,
                    declared_at: decl_name.end_byte(),
                })
            }
            "lambda_expression" => {
                let params = node.child_by_field_name("parameters")?;
                let decl_name = match params.kind() {
                    "identifier" => Some(params),
                    "inferred_parameters" => {
                        let mut cursor = params.walk();
                        let found = params
                            .named_children(&mut cursor)
                            .find(|param| self.text(*param) == name);
                        found
                    }
                    _ => None,
                }
                .filter(|param| self.text(*param) == name)?;
                Some(LocalVar {
                    ty: None,
                    init: None,
                    scope: node,
                    declared_at: decl_name.end_byte(),
                })
            }
            "local_variable_declaration" => {
                let ty = node.child_by_field_name("type")?;
                let mut cursor = node.walk();
                for declarator in node.children_by_field_name("declarator", &mut cursor) {
                    let Some(declared) = declarator.child_by_field_name("name") else {
                        continue;
                    };
                    if self.text(declared) == name {
                        return Some(LocalVar {
                            ty: Some(self.text(ty)),
                            init: declarator.child_by_field_name("value"),
                            scope: node.parent()?,
                            declared_at: declared.end_byte(),
                        });
                    }
                }
                None
            }
            _ => None,
        }
    }

    /// Whether `name` denotes a local, parameter or field visible at `use_site`.
    pub(crate) fn is_variable(&self, name: &str, use_site: Node<'_>) -> bool {
        self.is_local(name, use_site) || self.resolve_field_name(name).is_some()
    }

    pub(crate) fn is_local(&self, name: &str, use_site: Node<'_>) -> bool {
        self.local_variable(name, use_site).is_some()
    }

    /// Field an unqualified name refers to: inherited first, then statically imported.
    pub(crate) fn resolve_field_name(&self, name: &str) -> Option<FieldId> {
        self.index.find_field(self.class, name).or_else(|| {
            self.index
                .static_import_owners(self.file, name)
                .into_iter()
                .find_map(|owner| self.index.find_field(owner, name))
        })
    }

    /// Resolve a name expression (`Foo`, `com.example.Foo`) that denotes a class.
    pub(crate) fn symbol_class(&self, node: Node<'w>) -> Option<ClassId> {
        if !matches!(
            node.kind(),
            "identifier"
                | "type_identifier"
                | "scoped_identifier"
                | "scoped_type_identifier"
                | "field_access"
        ) {
            return None;
        }
        let name = clean_type(self.text(node));
        if !name.chars().all(|c| c == '.' || c == '_' || c == '$' || c.is_alphanumeric()) {
            return None;
        }
        let head = name.split('.').next().unwrap_or(&name);
        if self.is_variable(head, node) {
            return None;
        }
        self.index.resolve_type(self.file, &name)
    }

    /// Runs `typing` one level deeper, or returns `None` past the depth limit.
    fn guarded<T>(&self, typing: impl FnOnce() -> Option<T>) -> Option<T> {
        let depth = self.typing_depth.get();
        if depth >= MAX_TYPING_DEPTH {
            return None;
        }
        self.typing_depth.set(depth + 1);
        let result = typing();
        self.typing_depth.set(depth);
        result
    }

    /// Static type of an expression, when it is an indexed class.
    pub(crate) fn expression_class(&self, expr: Node<'w>) -> Option<ClassId> {
        self.guarded(|| self.expression_type(expr))
    }

    fn expression_type(&self, expr: Node<'w>) -> Option<ClassId> {
        match expr.kind() {
            "this" => Some(self.class),
            "super" => self.index.superclass(self.class),
            "identifier" => {
                let name = self.text(expr);
                if let Some(local) = self.local_variable(name, expr) {
                    return match local.ty? {
                        "var" => self.expression_class(local.init?),
                        ty => self.index.resolve_type(self.file, ty),
                    };
                }
                let field = self.resolve_field_name(name)?;
                self.field_type(field)
            }
            "field_access" => {
                let field = self.resolve_field_access(expr)?;
                self.field_type(field)
            }
            "method_invocation" => {
                let method = self.resolve_call(expr)?;
                let ret = self.index.method(method).return_type.as_deref()?;
                self.index
                    .resolve_type(self.index.class(method.class).file, ret)
            }
            "object_creation_expression" | "cast_expression" => {
                let ty = expr.child_by_field_name("type")?;
                self.index.resolve_type(self.file, self.text(ty))
            }
            "parenthesized_expression" => self.expression_class(expr.named_child(0)?),
            "string_literal" => self.index.class_by_name("java.lang.String"),
            _ => None,
        }
    }

    fn field_type(&self, field: FieldId) -> Option<ClassId> {
        let declaring_file = self.index.class(field.class).file;
        self.index
            .resolve_type(declaring_file, &self.index.field(field).ty)
    }

    /// Static type of a call argument as a descriptor, for overload selection.
    fn argument_type(&self, expr: Node<'w>) -> ArgumentType {
        self.guarded(|| Some(self.expression_descriptor(expr)))
            .unwrap_or(ArgumentType::Unknown)
    }

    fn expression_descriptor(&self, expr: Node<'w>) -> ArgumentType {
        let known = |descriptor: &str| ArgumentType::Known(descriptor.to_string());
        let text = self.text(expr);
        match expr.kind() {
            "string_literal" => known(STRING_DESCRIPTOR),
            "character_literal" => known("C"),
            "true" | "false" | "instanceof_expression" => known("Z"),
            "null_literal" => ArgumentType::Null,
            "decimal_integer_literal"
            | "hex_integer_literal"
            | "octal_integer_literal"
            | "binary_integer_literal" => known(if text.ends_with(['l', 'L']) { "J" } else { "I" }),
            "decimal_floating_point_literal" | "hex_floating_point_literal" => {
                known(if text.ends_with(['f', 'F']) { "F" } else { "D" })
            }
            "class_literal" => known("Ljava/lang/Class;"),
            "this" => {
                let internal = self.index.class(self.class).internal_name();
                ArgumentType::Known(format!("L{internal};"))
            }
            "identifier" => {
                if let Some(local) = self.local_variable(text, expr) {
                    return match (local.ty, local.init) {
                        (Some("var"), Some(init)) => self.argument_type(init),
                        (Some("var") | None, _) => ArgumentType::Unknown,
                        (Some(ty), _) => {
                            ArgumentType::Known(self.index.method_type_descriptor(self.method, ty))
                        }
                    };
                }
                self.resolve_field_name(text)
                    .map_or(ArgumentType::Unknown, |field| {
                        ArgumentType::Known(self.index.field_descriptor(field))
                    })
            }
            "field_access" => self
                .resolve_field_access(expr)
                .map_or(ArgumentType::Unknown, |field| {
                    ArgumentType::Known(self.index.field_descriptor(field))
                }),
            "method_invocation" => self
                .resolve_call(expr)
                .map_or(ArgumentType::Unknown, |method| {
                    ArgumentType::Known(self.index.return_descriptor(method))
                }),
            "object_creation_expression" | "cast_expression" => expr
                .child_by_field_name("type")
                .map_or(ArgumentType::Unknown, |ty| {
                    let ty = self.text(ty);
                    ArgumentType::Known(self.index.method_type_descriptor(self.method, ty))
                }),
            "parenthesized_expression" => expr
                .named_child(0)
                .map_or(ArgumentType::Unknown, |inner| self.argument_type(inner)),
            "binary_expression" => {
                let operator = expr.child_by_field_name("operator").map(|op| self.text(op));
                match operator {
                    Some("==" | "!=" | "<" | ">" | "<=" | ">=" | "&&" | "||") => known("Z"),
                    Some("+") => {
                        let string = ArgumentType::Known(STRING_DESCRIPTOR.to_string());
                        let concatenates = ["left", "right"].iter().any(|side| {
                            expr.child_by_field_name(*side)
                                .is_some_and(|operand| self.argument_type(operand) == string)
                        });
                        if concatenates {
                            string
                        } else {
                            ArgumentType::Unknown
                        }
                    }
                    _ => ArgumentType::Unknown,
                }
            }
            _ => ArgumentType::Unknown,
        }
    }

    fn argument_types(&self, node: Node<'w>) -> Vec<ArgumentType> {
        arguments(node)
            .into_iter()
            .map(|arg| self.argument_type(arg))
            .collect()
    }

    /// Class a member access is looked up in.
    ///
    /// Unqualified and `this.` accesses use the scanned class. A qualifier whose
    /// class cannot be determined makes the access unresolvable.
    pub(crate) fn receiver_class(&self, object: Option<Node<'w>>) -> Option<ClassId> {
        match object {
            None => Some(self.class),
            Some(node) if node.kind() == "this" => Some(self.class),
            Some(node) if node.kind() == "super" => self.index.superclass(self.class),
            Some(node) => resolve_qualifier(self, Some(node)),
        }
    }

    /// Methods a call may invoke, best fit for its arguments first.
    ///
    /// Several are returned only when the argument types cannot tell them apart.
    pub(crate) fn call_candidates(&self, call: Node<'w>) -> Vec<MethodId> {
        let object = call.child_by_field_name("object");
        let Some(name) = call.child_by_field_name("name") else {
            return Vec::new();
        };
        let name = self.text(name);
        let arity = arguments(call).len();

        let mut candidates = self
            .receiver_class(object)
            .map(|receiver| self.index.methods_named(receiver, name, arity))
            .unwrap_or_default();
        if candidates.is_empty() && object.is_none() {
            candidates = self
                .index
                .static_import_owners(self.file, name)
                .into_iter()
                .flat_map(|owner| self.index.methods_named(owner, name, arity))
                .collect();
        }
        self.select_overloads(call, candidates)
    }

    pub(crate) fn resolve_call(&self, call: Node<'w>) -> Option<MethodId> {
        self.call_candidates(call).into_iter().next()
    }

    pub(crate) fn resolve_field_access(&self, access: Node<'w>) -> Option<FieldId> {
        let receiver = self.receiver_class(access.child_by_field_name("object"))?;
        let name = self.text(access.child_by_field_name("field")?);
        self.index.find_field(receiver, name)
    }

    pub(crate) fn construction_candidates(&self, creation: Node<'w>) -> Vec<MethodId> {
        let class = creation
            .child_by_field_name("type")
            .and_then(|ty| self.index.resolve_type(self.file, self.text(ty)));
        let Some(class) = class else {
            return Vec::new();
        };
        let candidates = self.index.constructors_of(class, arguments(creation).len());
        self.select_overloads(creation, candidates)
    }

    fn select_overloads(&self, node: Node<'w>, candidates: Vec<MethodId>) -> Vec<MethodId> {
        if candidates.len() < 2 {
            return candidates;
        }
        self.index
            .best_overloads(candidates, &self.argument_types(node))
    }
}

fn arguments(node: Node<'_>) -> Vec<Node<'_>> {
    let Some(args) = node.child_by_field_name("arguments") else {
        return Vec::new();
    };
    let mut cursor = args.walk();
    let args = args
        .named_children(&mut cursor)
        .filter(|arg| !arg.kind().ends_with("comment"))
        .collect();
    args
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::node_for_span;

    const TARGET: &str = r#"package p;
        class Target {
            int value;
            void tick(int count) {
                {
                    String value = "shadow";
                }
                try {
                    run(value);
                } catch (IllegalStateException value) {
                    run(value);
                }
                int late = value;
                java.util.function.Consumer<String> sink = value -> run(value);
            }
            void run(Object o) {}
        }"#;

    fn with_scope(check: impl for<'w> FnOnce(&BodyScope<'w>, Vec<Node<'w>>)) {
        let mut ws = MixinWorkspace::new();
        ws.add_file("Target.java", TARGET).unwrap();
        let index = ws.index();
        let class = index.class_by_name("p.Target").unwrap();
        let tick = index.find_method(class, "tick", 1).unwrap();
        let root = ws.file(index.class(class).file).tree().root_node();
        let node = node_for_span(root, index.method(tick).decl_span, &["method_declaration"]).unwrap();
        let scope = BodyScope::new(&ws, tick, node);

        let mut uses = Vec::new();
        visit_nodes(node, &mut |candidate| {
            let is_read = candidate.parent().is_some_and(|parent| {
                matches!(parent.kind(), "argument_list" | "variable_declarator")
            });
            if candidate.kind() == "identifier" && scope.text(candidate) == "value" && is_read {
                uses.push(candidate);
            }
        });
        check(&scope, uses);
    }

    #[test]
    fn locals_are_only_visible_inside_their_block() {
        with_scope(|scope, uses| {
            // Declaration, try read, catch read, trailing read, lambda read.
            assert_eq!(uses.len(), 5);
            assert!(!scope.is_local("value", uses[1]));
            assert!(scope.is_local("value", uses[2]));
            assert!(!scope.is_local("value", uses[3]));
            assert!(scope.is_local("value", uses[4]));
        });
    }

    #[test]
    fn parameters_are_visible_throughout_the_method() {
        with_scope(|scope, uses| {
            for use_site in uses {
                assert!(scope.is_local("count", use_site));
            }
        });
    }

    #[test]
    fn argument_types_follow_literals_locals_and_fields() {
        with_scope(|scope, uses| {
            assert_eq!(
                scope.argument_type(uses[1]),
                ArgumentType::Known("I".to_string())
            );
            assert_eq!(
                scope.argument_type(uses[2]),
                ArgumentType::Known("Ljava/lang/IllegalStateException;".to_string())
            );
            assert_eq!(scope.argument_type(uses[4]), ArgumentType::Unknown);
        });
    }
}
