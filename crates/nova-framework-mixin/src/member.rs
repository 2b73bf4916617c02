//! Members together with the class they were accessed through, and the
//! selector syntax used to refer to them.

use tree_sitter::Node;

use crate::index::{ClassId, ClassIndex, FieldId, MethodId, CONSTRUCTOR_NAME};
use crate::scope::BodyScope;

/// A resolved method or field plus the class it was accessed through.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct QualifiedMember<M> {
    pub member: M,
    /// Class named by the access qualifier. `None` for unqualified and `this.`
    /// accesses, meaning the member's declaring class.
    pub qualifier: Option<ClassId>,
}

pub trait Member: Copy {
    fn declaring_class(self) -> ClassId;
    fn name(self, index: &ClassIndex) -> &str;
    fn descriptor(self, index: &ClassIndex) -> String;
    fn is_field(self) -> bool;
}

impl Member for MethodId {
    fn declaring_class(self) -> ClassId {
        self.class
    }

    fn name(self, index: &ClassIndex) -> &str {
        &index.method(self).name
    }

    fn descriptor(self, index: &ClassIndex) -> String {
        index.method_descriptor(self)
    }

    fn is_field(self) -> bool {
        false
    }
}

impl Member for FieldId {
    fn declaring_class(self) -> ClassId {
        self.class
    }

    fn name(self, index: &ClassIndex) -> &str {
        &index.field(self).name
    }

    fn descriptor(self, index: &ClassIndex) -> String {
        index.field_descriptor(self)
    }

    fn is_field(self) -> bool {
        true
    }
}

impl<M: Member> QualifiedMember<M> {
    pub fn new(member: M, qualifier: Option<ClassId>) -> Self {
        Self { member, qualifier }
    }

    pub(crate) fn from_access<'w>(
        scope: &BodyScope<'w>,
        member: M,
        qualifier: Option<Node<'w>>,
    ) -> Self {
        Self::new(member, resolve_qualifier(scope, qualifier))
    }

    /// Class the member is referenced through: the qualifier, else the declaring class.
    pub fn owner(&self) -> ClassId {
        self.qualifier.unwrap_or(self.member.declaring_class())
    }

    pub fn matches(&self, index: &ClassIndex, reference: &MemberReference) -> bool {
        let owner = index.class(self.owner()).internal_name();
        reference.matches(
            self.member.name(index),
            &self.member.descriptor(index),
            &owner,
        )
    }

    /// Canonical selector literal, e.g. `Lcom/example/Foo;bar(I)V`.
    pub fn literal(&self, index: &ClassIndex) -> String {
        MemberReference {
            owner: Some(index.class(self.owner()).internal_name()),
            name: self.member.name(index).to_string(),
            descriptor: Some(self.member.descriptor(index)),
        }
        .render(self.member.is_field())
    }
}

type QualifierAttempt<'w> = fn(&BodyScope<'w>, Node<'w>) -> Option<ClassId>;

/// Class named by an access qualifier.
///
/// `this` normalizes to `None`. Otherwise the qualifier is first resolved as a
/// class name, then by its static type; when neither applies there is no qualifier.
pub(crate) fn resolve_qualifier<'w>(
    scope: &BodyScope<'w>,
    qualifier: Option<Node<'w>>,
) -> Option<ClassId> {
    let qualifier = qualifier?;
    if qualifier.kind() == "this" {
        return None;
    }
    let attempts: [QualifierAttempt<'w>; 2] =
        [BodyScope::symbol_class, BodyScope::expression_class];
    attempts
        .iter()
        .find_map(|attempt| attempt(scope, qualifier))
}

/// A parsed `target` selector.
///
/// Accepted forms: `name`, `name(desc)ret`, `name:desc`, `Lpkg/Owner;name...`,
/// `pkg/Owner.name...` and a bare owner `Lpkg/Owner;` (its constructors).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MemberReference {
    /// Owner internal name (`com/example/Foo`).
    pub owner: Option<String>,
    pub name: String,
    /// Method descriptor `(I)V` or field descriptor `I`.
    pub descriptor: Option<String>,
}

impl MemberReference {
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }

        let (owner, rest) = match split_descriptor_owner(text) {
            Some((owner, rest)) => (Some(owner.to_string()), rest),
            None => {
                let head_end = text.find(['(', ':']).unwrap_or(text.len());
                match text[..head_end].rfind(['.', '/']) {
                    Some(sep) => (Some(text[..sep].to_string()), &text[sep + 1..]),
                    None => (None, text),
                }
            }
        };

        let (name, descriptor) = if let Some(paren) = rest.find('(') {
            (&rest[..paren], Some(rest[paren..].to_string()))
        } else if let Some((name, desc)) = rest.split_once(':') {
            (name, Some(desc.to_string()))
        } else {
            (rest, None)
        };

        let name = match (name.trim(), &owner) {
            ("", Some(_)) => CONSTRUCTOR_NAME,
            ("", None) => return None,
            (name, _) => name,
        };

        Some(Self {
            owner: owner.map(|owner| owner.replace('.', "/")),
            name: name.to_string(),
            descriptor: descriptor.filter(|desc| !desc.is_empty()),
        })
    }

    pub fn matches(&self, name: &str, descriptor: &str, owner: &str) -> bool {
        self.name == name
            && self.descriptor.as_deref().is_none_or(|desc| desc == descriptor)
            && self.owner.as_deref().is_none_or(|expected| expected == owner)
    }

    pub fn render(&self, is_field: bool) -> String {
        let mut out = String::new();
        if let Some(owner) = &self.owner {
            out.push('L');
            out.push_str(owner);
            out.push(';');
        }
        out.push_str(&self.name);
        if let Some(desc) = &self.descriptor {
            if is_field {
                out.push(':');
            }
            out.push_str(desc);
        }
        out
    }
}

/// Split `Lpkg/Owner;rest` into `pkg/Owner` and `rest`.
fn split_descriptor_owner(text: &str) -> Option<(&str, &str)> {
    let rest = text.strip_prefix('L')?;
    let end = rest.find(';')?;
    let owner = &rest[..end];
    if owner.is_empty() || owner.contains(['(', ':', '.']) {
        return None;
    }
    Some((owner, &rest[end + 1..]))
}
