use std::ops::ControlFlow;

use tree_sitter::Node;

/// Node kinds whose contents compile to separate methods and never hold
/// injection points of the enclosing method.
const SEPARATE_METHOD_KINDS: &[&str] = &["lambda_expression", "class_body"];

/// Depth-first collector over a method body.
///
/// The matcher decides what a node contributes. In check-only mode the walk
/// stops as soon as one element has been recorded.
#[derive(Debug)]
pub struct CollectVisitor<T> {
    check_only: bool,
    result: Vec<T>,
}

impl<T> CollectVisitor<T> {
    pub fn new(check_only: bool) -> Self {
        Self {
            check_only,
            result: Vec::new(),
        }
    }

    pub fn check_only(&self) -> bool {
        self.check_only
    }

    pub fn visit<'t, F>(&mut self, root: Node<'t>, mut matcher: F)
    where
        F: FnMut(Node<'t>) -> Option<T>,
    {
        let _ = self.walk(root, &mut matcher);
    }

    fn walk<'t, F>(&mut self, node: Node<'t>, matcher: &mut F) -> ControlFlow<()>
    where
        F: FnMut(Node<'t>) -> Option<T>,
    {
        if let Some(found) = matcher(node) {
            self.result.push(found);
            if self.check_only {
                return ControlFlow::Break(());
            }
        }

        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            if SEPARATE_METHOD_KINDS.contains(&child.kind()) {
                continue;
            }
            self.walk(child, matcher)?;
        }
        ControlFlow::Continue(())
    }

    pub fn result(&self) -> &[T] {
        &self.result
    }

    pub fn into_result(self) -> Vec<T> {
        self.result
    }
}
