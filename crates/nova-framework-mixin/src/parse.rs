//! tree-sitter helpers for Java sources and Mixin annotations.

use std::cell::RefCell;

use tree_sitter::{Node, Parser, Tree};

use crate::Span;

thread_local! {
    static JAVA_PARSER: RefCell<Result<Parser, String>> = RefCell::new({
        let mut parser = Parser::new();
        match parser.set_language(tree_sitter_java::language()) {
            Ok(()) => Ok(parser),
            Err(_) => Err("tree-sitter-java language load failed".to_string()),
        }
    });
}

/// Parse Java source text with `tree-sitter-java`.
pub fn parse_java(source: &str) -> Result<Tree, String> {
    JAVA_PARSER.with(|parser_cell| {
        let mut parser = parser_cell
            .try_borrow_mut()
            .map_err(|_| "tree-sitter parser is already in use".to_string())?;
        let parser = match parser.as_mut() {
            Ok(parser) => parser,
            Err(err) => return Err(err.clone()),
        };

        parser
            .parse(source, None)
            .ok_or_else(|| "tree-sitter failed to produce a syntax tree".to_string())
    })
}

/// Visit a node and all its descendants in pre-order.
pub fn visit_nodes<'a, F: FnMut(Node<'a>)>(node: Node<'a>, f: &mut F) {
    f(node);
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        visit_nodes(child, f);
    }
}

/// Find the first named child with the given kind.
pub fn find_named_child<'a>(node: Node<'a>, kind: &str) -> Option<Node<'a>> {
    let mut cursor = node.walk();
    let result = node
        .named_children(&mut cursor)
        .find(|child| child.kind() == kind);
    result
}

/// Best-effort helper to fetch a node's `modifiers` field, falling back to a named child.
pub fn modifier_node(node: Node<'_>) -> Option<Node<'_>> {
    node.child_by_field_name("modifiers")
        .or_else(|| find_named_child(node, "modifiers"))
}

/// Return the byte slice for `node` within `source`.
pub fn node_text<'a>(source: &'a str, node: Node<'_>) -> &'a str {
    &source[node.byte_range()]
}

/// Whether `child` is the node stored under `field` of `parent`.
pub fn is_field_child(parent: Node<'_>, field: &str, child: Node<'_>) -> bool {
    parent
        .child_by_field_name(field)
        .is_some_and(|node| node.id() == child.id())
}

/// Nearest ancestor of `node` whose kind is one of `kinds`.
pub fn ancestor_of_kind<'a>(node: Node<'a>, kinds: &[&str]) -> Option<Node<'a>> {
    let mut current = node.parent();
    while let Some(node) = current {
        if kinds.contains(&node.kind()) {
            return Some(node);
        }
        current = node.parent();
    }
    None
}

/// Smallest node of one of `kinds` covering exactly `span`.
pub fn node_for_span<'a>(root: Node<'a>, span: Span, kinds: &[&str]) -> Option<Node<'a>> {
    let mut current = root.descendant_for_byte_range(span.start, span.end);
    while let Some(node) = current {
        if node.start_byte() == span.start
            && node.end_byte() == span.end
            && kinds.contains(&node.kind())
        {
            return Some(node);
        }
        if node.start_byte() < span.start || node.end_byte() > span.end {
            return None;
        }
        current = node.parent();
    }
    None
}

pub fn is_annotation(node: Node<'_>) -> bool {
    matches!(node.kind(), "annotation" | "marker_annotation")
}

/// Simple name of an annotation node (`@org.spongepowered.asm.mixin.injection.At` is `At`).
pub fn annotation_simple_name<'a>(source: &'a str, annotation: Node<'_>) -> Option<&'a str> {
    if !is_annotation(annotation) {
        return None;
    }
    let name = node_text(source, annotation.child_by_field_name("name")?);
    Some(name.rsplit('.').next().unwrap_or(name).trim())
}

/// The nearest annotation enclosing `node`, looking through element-value arrays.
pub fn enclosing_annotation(node: Node<'_>) -> Option<Node<'_>> {
    let mut current = node.parent();
    while let Some(node) = current {
        if is_annotation(node) {
            return Some(node);
        }
        current = node.parent();
    }
    None
}

/// Annotations declared in a modifiers node.
pub fn annotations_in<'a>(modifiers: Node<'a>) -> Vec<Node<'a>> {
    let mut cursor = modifiers.walk();
    let annotations = modifiers
        .named_children(&mut cursor)
        .filter(|child| is_annotation(*child))
        .collect();
    annotations
}

/// The declared value node of an annotation attribute.
///
/// A single positional argument (`@At("HEAD")`) is the `value` attribute.
pub fn declared_attribute<'a>(source: &str, annotation: Node<'a>, name: &str) -> Option<Node<'a>> {
    let args = annotation.child_by_field_name("arguments")?;
    let mut cursor = args.walk();
    for child in args.named_children(&mut cursor) {
        match child.kind() {
            "comment" | "line_comment" | "block_comment" => continue,
            "element_value_pair" => {
                let key = child.child_by_field_name("key");
                if key.is_some_and(|key| node_text(source, key) == name) {
                    return child.child_by_field_name("value");
                }
            }
            _ if name == "value" => return Some(child),
            _ => {}
        }
    }
    None
}

/// Declared attribute value when it is a string literal.
pub fn declared_string_attribute(source: &str, annotation: Node<'_>, name: &str) -> Option<String> {
    let value = declared_attribute(source, annotation, name)?;
    (value.kind() == "string_literal").then(|| string_literal_value(node_text(source, value)))
}

/// String values of an element value: a single literal or a `{...}` array of literals.
pub fn string_values(source: &str, value: Node<'_>) -> Vec<String> {
    element_values(value)
        .into_iter()
        .filter(|node| node.kind() == "string_literal")
        .map(|node| string_literal_value(node_text(source, node)))
        .collect()
}

/// Type names of class literals in an element value (`Foo.class` or `{A.class, B.class}`).
pub fn class_literal_types<'a>(source: &'a str, value: Node<'_>) -> Vec<&'a str> {
    element_values(value)
        .into_iter()
        .filter(|node| node.kind() == "class_literal")
        .filter_map(|node| node.named_child(0))
        .map(|ty| node_text(source, ty))
        .collect()
}

fn element_values(value: Node<'_>) -> Vec<Node<'_>> {
    if value.kind() != "element_value_array_initializer" {
        return vec![value];
    }
    let mut cursor = value.walk();
    let values = value.named_children(&mut cursor).collect();
    values
}

/// Byte span of a string literal's contents, without the quotes.
pub fn string_literal_content_span(literal: Node<'_>, source: &str) -> Span {
    let quote = if node_text(source, literal).starts_with("\"\"\"") {
        3
    } else {
        1
    };
    let start = (literal.start_byte() + quote).min(literal.end_byte());
    let end = literal.end_byte().saturating_sub(quote).max(start);
    Span::new(start, end)
}

/// Decode the value of a Java string literal (including text blocks).
pub fn string_literal_value(text: &str) -> String {
    let text = text.trim();
    if let Some(block) = text
        .strip_prefix("\"\"\"")
        .and_then(|rest| rest.strip_suffix("\"\"\""))
    {
        // The opening delimiter is followed by a line terminator that is not part of the value.
        let content = block.split_once('\n').map_or(block, |(_, rest)| rest);
        return unescape(content);
    }
    let inner = text
        .strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
        .unwrap_or(text);
    unescape(inner)
}

fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('b') => out.push('\u{8}'),
            Some('r') => out.push('\r'),
            Some('f') => out.push('\u{c}'),
            Some('s') => out.push(' '),
            Some('\n') => {}
            Some('u') => {
                while chars.peek() == Some(&'u') {
                    chars.next();
                }
                let hex: String = chars.by_ref().take(4).collect();
                match u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32) {
                    Some(decoded) => out.push(decoded),
                    None => {
                        out.push_str("\\u");
                        out.push_str(&hex);
                    }
                }
            }
            Some(first @ '0'..='7') => {
                let max_len = if first <= '3' { 3 } else { 2 };
                let mut value = first.to_digit(8).unwrap_or(0);
                for _ in 1..max_len {
                    match chars.peek().and_then(|c| c.to_digit(8)) {
                        Some(digit) => {
                            value = value * 8 + digit;
                            chars.next();
                        }
                        None => break,
                    }
                }
                out.extend(char::from_u32(value));
            }
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

/// Remove all whitespace from a type-like string.
pub fn clean_type(raw: &str) -> String {
    raw.split_whitespace().collect::<String>()
}

/// Strip generic arguments (`List<String>` becomes `List`).
pub fn strip_generic_args(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut depth = 0u32;
    for ch in raw.chars() {
        match ch {
            '<' => depth += 1,
            '>' => depth = depth.saturating_sub(1),
            _ if depth == 0 => out.push(ch),
            _ => {}
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn first_of_kind<'a>(node: Node<'a>, kind: &str) -> Option<Node<'a>> {
        let mut found = None;
        visit_nodes(node, &mut |n| {
            if found.is_none() && n.kind() == kind {
                found = Some(n);
            }
        });
        found
    }

    #[test]
    fn parse_java_does_not_carry_error_state_between_parses() {
        let bad = parse_java("class A {").expect("parse bad source");
        assert!(bad.root_node().has_error());

        let good = parse_java("class B {}").expect("parse good source");
        assert!(!good.root_node().has_error());
    }

    #[test]
    fn parse_java_returns_error_if_parser_is_reentered_on_same_thread() {
        JAVA_PARSER.with(|cell| {
            let _borrow = cell.borrow_mut();
            let err = parse_java("class A {}").expect_err("expected re-entrancy error");
            assert_eq!(err, "tree-sitter parser is already in use");
        });
    }

    #[test]
    fn reads_positional_and_named_attributes() {
        let src = r#"class A { @At(value = "INVOKE", target = "foo") void a() {} @At("HEAD") void b() {} }"#;
        let tree = parse_java(src).unwrap();
        let mut annotations = Vec::new();
        visit_nodes(tree.root_node(), &mut |n| {
            if n.kind() == "annotation" {
                annotations.push(n);
            }
        });
        assert_eq!(annotations.len(), 2);
        assert_eq!(annotation_simple_name(src, annotations[0]), Some("At"));
        assert_eq!(
            declared_string_attribute(src, annotations[0], "value").as_deref(),
            Some("INVOKE")
        );
        assert_eq!(
            declared_string_attribute(src, annotations[0], "target").as_deref(),
            Some("foo")
        );
        assert_eq!(
            declared_string_attribute(src, annotations[1], "value").as_deref(),
            Some("HEAD")
        );
        assert_eq!(declared_string_attribute(src, annotations[1], "target"), None);
    }

    #[test]
    fn enclosing_annotation_looks_through_arrays() {
        let src = r#"class A { @Inject(method = {"tick"}, at = {@At("HEAD")}) void a() {} }"#;
        let tree = parse_java(src).unwrap();
        let at = first_of_kind(tree.root_node(), "annotation")
            .and_then(|inject| {
                let value = declared_attribute(src, inject, "at")?;
                value.named_child(0)
            })
            .expect("@At");
        assert_eq!(annotation_simple_name(src, at), Some("At"));
        let inject = enclosing_annotation(at).expect("@Inject");
        assert_eq!(annotation_simple_name(src, inject), Some("Inject"));
        let method = declared_attribute(src, inject, "method").unwrap();
        assert_eq!(string_values(src, method), vec!["tick".to_string()]);
    }

    #[test]
    fn reads_class_literals() {
        let src = "@Mixin({Foo.class, com.example.Bar.class}) class A {}";
        let tree = parse_java(src).unwrap();
        let mixin = first_of_kind(tree.root_node(), "annotation").unwrap();
        let value = declared_attribute(src, mixin, "value").unwrap();
        assert_eq!(class_literal_types(src, value), vec!["Foo", "com.example.Bar"]);
    }

    #[test]
    fn decodes_string_literals() {
        assert_eq!(string_literal_value(r#""plain""#), "plain");
        assert_eq!(string_literal_value(r#""a\"b\\c""#), "a\"b\\c");
        assert_eq!(string_literal_value(r#""tab\there""#), "tab\there");
        assert_eq!(string_literal_value(r#""A\101""#), "AA");
        assert_eq!(string_literal_value("\"\"\"\n  block\"\"\""), "  block");
    }

    #[test]
    fn content_span_excludes_quotes() {
        let src = r#"class A { String s = "value"; }"#;
        let tree = parse_java(src).unwrap();
        let literal = first_of_kind(tree.root_node(), "string_literal").unwrap();
        let span = string_literal_content_span(literal, src);
        assert_eq!(&src[span.start..span.end], "value");
    }

    #[test]
    fn strips_generic_arguments() {
        assert_eq!(strip_generic_args("Map<String,List<Integer>>"), "Map");
        assert_eq!(clean_type(" java.util.List < String > "), "java.util.List<String>");
    }
}
