//! Mixin injection-point intelligence for Nova.
//!
//! Mixin transformations select *where* inside a target method they apply with an
//! `@At` annotation, e.g. `@At(value = "INVOKE", target = "Lcom/example/Foo;bar()V")`.
//! This crate resolves the `target` selector of such an `@At` against the body of
//! the target method:
//! - resolve a selector to the matching call/field/construction/constant sites
//! - report selectors that are applicable but match nothing
//! - enumerate every element of the target body as a completion literal
//!
//! Java sources are parsed with tree-sitter and indexed by [`MixinWorkspace`]. All
//! queries are best-effort: anything the resolver does not understand degrades to
//! an empty result rather than an error.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

mod error;
mod handler;
mod index;
mod member;
pub mod parse;
mod reference;
mod scope;
mod target;
mod visitor;
mod workspace;

pub use error::{MixinError, Result};
pub use handler::Handler;
pub use index::{
    ClassDef, ClassId, ClassIndex, ClassKind, FieldDef, FieldId, MethodDef, MethodId, TypeParam,
    CONSTRUCTOR_NAME,
};
pub use member::{Member, MemberReference, QualifiedMember};
pub use reference::{
    collect_variants, diagnostics_for_file, is_unresolved, resolve_reference, resolve_target,
    uses_member_reference, MIXIN_UNRESOLVED_TARGET,
};
pub use visitor::CollectVisitor;
pub use workspace::{FileId, MixinWorkspace, SourceFile};

/// A byte-span into a source string.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    /// Inclusive containment; a cursor right after the last character still counts.
    pub fn contains_inclusive(&self, offset: usize) -> bool {
        self.start <= offset && offset <= self.end
    }
}

impl fmt::Debug for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Span({}..{})", self.start, self.end)
    }
}

/// Where inside a target method body an injector attaches.
///
/// Parsed from the `value` attribute of `@At`. Injection points without a
/// `target` selector (`HEAD`, `RETURN`, ...) are not represented.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InjectionPointKind {
    #[serde(rename = "INVOKE")]
    MethodInvoke,
    #[serde(rename = "INVOKE_ASSIGN")]
    MethodInvokeAssign,
    #[serde(rename = "INVOKE_STRING")]
    InvokeStringConstant,
    #[serde(rename = "FIELD")]
    FieldAccess,
    #[serde(rename = "NEW")]
    ObjectConstruction,
}

impl InjectionPointKind {
    pub const ALL: [InjectionPointKind; 5] = [
        InjectionPointKind::MethodInvoke,
        InjectionPointKind::MethodInvokeAssign,
        InjectionPointKind::InvokeStringConstant,
        InjectionPointKind::FieldAccess,
        InjectionPointKind::ObjectConstruction,
    ];

    /// Parse the `@At(value = ...)` string. Unknown values yield `None`.
    pub fn from_at_value(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == value)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            InjectionPointKind::MethodInvoke => "INVOKE",
            InjectionPointKind::MethodInvokeAssign => "INVOKE_ASSIGN",
            InjectionPointKind::InvokeStringConstant => "INVOKE_STRING",
            InjectionPointKind::FieldAccess => "FIELD",
            InjectionPointKind::ObjectConstruction => "NEW",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavigationTarget {
    pub file: PathBuf,
    pub span: Span,
}

/// A completion candidate for an `@At(target = "...")` selector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionVariant {
    /// Presentable text; owner-qualified when the member lives outside the target class.
    pub label: String,
    /// Selector literal inserted into the string.
    pub insert_text: String,
    /// Additional strings the candidate can be looked up by.
    pub lookup_strings: Vec<String>,
    pub detail: Option<String>,
    /// Member declared directly in the target class.
    pub bold: bool,
    /// Contents of the string literal the variant replaces.
    pub replace_span: Option<Span>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    Error,
    Warning,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub code: &'static str,
    pub message: String,
    pub span: Option<Span>,
}

impl Diagnostic {
    pub fn error(code: &'static str, message: impl Into<String>, span: Option<Span>) -> Self {
        Self {
            severity: Severity::Error,
            code,
            message: message.into(),
            span,
        }
    }
}
