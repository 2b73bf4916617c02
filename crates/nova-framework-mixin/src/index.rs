//! Workspace-wide index of Java type declarations.
//!
//! The index records what the injection-point resolver needs from declarations:
//! names, supertypes, fields, methods and constructors. Type names are stored as
//! written and resolved lazily against the declaring file's package and imports,
//! so files can be added in any order.

use std::collections::{HashMap, HashSet, VecDeque};

use tree_sitter::Node;

use crate::parse::{clean_type, find_named_child, node_text, strip_generic_args};
use crate::{FileId, Span};

/// Binary name of instance initializers (constructors) in the JVM.
pub const CONSTRUCTOR_NAME: &str = "<init>";

pub(crate) const TYPE_DECLARATIONS: &[&str] = &[
    "class_declaration",
    "interface_declaration",
    "enum_declaration",
    "record_declaration",
    "annotation_type_declaration",
];

/// `java.lang` types commonly referenced without an import.
const JAVA_LANG: &[&str] = &[
    "Object",
    "String",
    "CharSequence",
    "Comparable",
    "Class",
    "Boolean",
    "Byte",
    "Character",
    "Short",
    "Integer",
    "Long",
    "Float",
    "Double",
    "Number",
    "Void",
    "Math",
    "System",
    "Thread",
    "Runnable",
    "Iterable",
    "Enum",
    "Record",
    "StringBuilder",
    "Throwable",
    "Exception",
    "RuntimeException",
    "Error",
    "IllegalArgumentException",
    "IllegalStateException",
    "NullPointerException",
    "UnsupportedOperationException",
];

const OBJECT_DESCRIPTOR: &str = "Ljava/lang/Object;";

/// Primitive descriptors and their box types.
const BOXES: &[(&str, &str)] = &[
    ("Z", "java/lang/Boolean"),
    ("B", "java/lang/Byte"),
    ("C", "java/lang/Character"),
    ("S", "java/lang/Short"),
    ("I", "java/lang/Integer"),
    ("J", "java/lang/Long"),
    ("F", "java/lang/Float"),
    ("D", "java/lang/Double"),
];

/// Supertypes of final JDK classes that are commonly passed as arguments.
const JDK_SUPERTYPES: &[(&str, &str)] = &[
    ("java/lang/String", "java/lang/CharSequence"),
    ("java/lang/String", "java/lang/Comparable"),
    ("java/lang/String", "java/io/Serializable"),
    ("java/lang/Integer", "java/lang/Number"),
    ("java/lang/Long", "java/lang/Number"),
    ("java/lang/Short", "java/lang/Number"),
    ("java/lang/Byte", "java/lang/Number"),
    ("java/lang/Float", "java/lang/Number"),
    ("java/lang/Double", "java/lang/Number"),
];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClassId(u32);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MethodId {
    pub class: ClassId,
    pub index: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FieldId {
    pub class: ClassId,
    pub index: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClassKind {
    Class,
    Interface,
    Enum,
    Record,
    Annotation,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClassDef {
    pub file: FileId,
    /// Simple name (`Inner`).
    pub name: String,
    /// Canonical source name (`com.example.Outer.Inner`).
    pub source_name: String,
    /// Binary name (`com.example.Outer$Inner`).
    pub binary_name: String,
    pub kind: ClassKind,
    pub name_span: Span,
    /// Lexically enclosing class of a nested declaration.
    pub outer: Option<ClassId>,
    pub type_params: Vec<TypeParam>,
    pub superclass: Option<String>,
    pub interfaces: Vec<String>,
    pub fields: Vec<FieldDef>,
    /// Methods and constructors in declaration order.
    pub methods: Vec<MethodDef>,
}

impl ClassDef {
    /// JVM internal name (`com/example/Outer$Inner`).
    pub fn internal_name(&self) -> String {
        self.binary_name.replace('.', "/")
    }
}

/// A declared type variable and its first bound as written.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TypeParam {
    pub name: String,
    pub bound: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldDef {
    pub name: String,
    pub ty: String,
    pub name_span: Span,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MethodDef {
    /// Source name, or [`CONSTRUCTOR_NAME`] for constructors.
    pub name: String,
    pub type_params: Vec<TypeParam>,
    /// Parameter types as written; varargs are recorded as arrays.
    pub params: Vec<String>,
    pub varargs: bool,
    /// `None` for constructors.
    pub return_type: Option<String>,
    pub name_span: Span,
    pub decl_span: Span,
    pub has_body: bool,
    /// Default constructor synthesized for a class without explicit constructors.
    pub implicit: bool,
}

impl MethodDef {
    pub fn is_constructor(&self) -> bool {
        self.name == CONSTRUCTOR_NAME
    }

    pub fn accepts_arity(&self, arity: usize) -> bool {
        self.params.len() == arity || (self.varargs && arity + 1 >= self.params.len())
    }
}

/// Static type of a call argument, as far as it can be inferred.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum ArgumentType {
    Unknown,
    Null,
    /// JVM descriptor (`I`, `Ljava/lang/String;`).
    Known(String),
}

#[derive(Clone, Debug, Default)]
struct FileScope {
    package: Option<String>,
    /// Simple name -> qualified name for single-type imports.
    single_imports: HashMap<String, String>,
    on_demand_imports: Vec<String>,
    /// `(member, class)` for `import static pkg.Class.member`.
    static_single_imports: Vec<(String, String)>,
    /// Classes of `import static pkg.Class.*`.
    static_on_demand_imports: Vec<String>,
}

#[derive(Debug, Default)]
pub struct ClassIndex {
    classes: Vec<ClassDef>,
    by_source_name: HashMap<String, ClassId>,
    scopes: HashMap<FileId, FileScope>,
}

impl ClassIndex {
    pub fn class(&self, class: ClassId) -> &ClassDef {
        &self.classes[class.0 as usize]
    }

    pub fn method(&self, method: MethodId) -> &MethodDef {
        &self.class(method.class).methods[method.index]
    }

    pub fn field(&self, field: FieldId) -> &FieldDef {
        &self.class(field.class).fields[field.index]
    }

    pub fn classes(&self) -> impl Iterator<Item = (ClassId, &ClassDef)> {
        self.classes
            .iter()
            .enumerate()
            .map(|(idx, class)| (ClassId(idx as u32), class))
    }

    /// Look up a class by fully qualified source, binary or internal name.
    pub fn class_by_name(&self, name: &str) -> Option<ClassId> {
        let normalized = name.trim().replace(['/', '$'], ".");
        self.by_source_name.get(&normalized).copied()
    }

    pub fn methods_of(&self, class: ClassId) -> impl Iterator<Item = (MethodId, &MethodDef)> {
        self.class(class)
            .methods
            .iter()
            .enumerate()
            .map(move |(index, def)| (MethodId { class, index }, def))
    }

    pub(crate) fn index_file(&mut self, file: FileId, source: &str, root: Node<'_>) {
        let scope = file_scope(source, root);
        let package = scope.package.clone();
        self.scopes.insert(file, scope);

        let mut cursor = root.walk();
        for child in root.named_children(&mut cursor) {
            if TYPE_DECLARATIONS.contains(&child.kind()) {
                self.index_type(file, source, child, package.as_deref(), None);
            }
        }
    }

    fn index_type(
        &mut self,
        file: FileId,
        source: &str,
        node: Node<'_>,
        package: Option<&str>,
        outer: Option<ClassId>,
    ) {
        let Some(name_node) = node.child_by_field_name("name") else {
            return;
        };
        let name = node_text(source, name_node).to_string();
        let (source_name, binary_name) = match outer {
            Some(outer) => {
                let outer = self.class(outer);
                (
                    format!("{}.{name}", outer.source_name),
                    format!("{}${name}", outer.binary_name),
                )
            }
            None => {
                let qualified = match package {
                    Some(pkg) => format!("{pkg}.{name}"),
                    None => name.clone(),
                };
                (qualified.clone(), qualified)
            }
        };

        let kind = match node.kind() {
            "interface_declaration" => ClassKind::Interface,
            "enum_declaration" => ClassKind::Enum,
            "record_declaration" => ClassKind::Record,
            "annotation_type_declaration" => ClassKind::Annotation,
            _ => ClassKind::Class,
        };

        let superclass = node
            .child_by_field_name("superclass")
            .and_then(|superclass| superclass.named_child(0))
            .map(|ty| clean_type(node_text(source, ty)));
        let interfaces = node
            .child_by_field_name("interfaces")
            .or_else(|| find_named_child(node, "super_interfaces"))
            .or_else(|| find_named_child(node, "extends_interfaces"))
            .and_then(|clause| find_named_child(clause, "type_list"))
            .map(|list| type_list(source, list))
            .unwrap_or_default();

        let mut fields = Vec::new();
        let mut methods = Vec::new();
        let mut nested = Vec::new();

        if kind == ClassKind::Record {
            if let Some(params) = node.child_by_field_name("parameters") {
                for param in parameters(source, params) {
                    fields.push(FieldDef {
                        name: param.name,
                        ty: param.ty,
                        name_span: param.name_span,
                    });
                }
            }
        }

        if let Some(body) = node.child_by_field_name("body") {
            for member in body_members(body) {
                match member.kind() {
                    "field_declaration" | "constant_declaration" => {
                        fields.extend(field_defs(source, member));
                    }
                    "method_declaration" | "constructor_declaration" => {
                        if let Some(method) = method_def(source, member) {
                            methods.push(method);
                        }
                    }
                    kind if TYPE_DECLARATIONS.contains(&kind) => nested.push(member),
                    _ => {}
                }
            }
        }

        let needs_default_constructor = matches!(
            kind,
            ClassKind::Class | ClassKind::Enum | ClassKind::Record
        ) && !methods.iter().any(MethodDef::is_constructor);
        if needs_default_constructor {
            let params = if kind == ClassKind::Record {
                fields.iter().map(|field| field.ty.clone()).collect()
            } else {
                Vec::new()
            };
            let name_span = Span::new(name_node.start_byte(), name_node.end_byte());
            methods.push(MethodDef {
                name: CONSTRUCTOR_NAME.to_string(),
                type_params: Vec::new(),
                params,
                varargs: false,
                return_type: None,
                name_span,
                decl_span: name_span,
                has_body: false,
                implicit: true,
            });
        }

        let id = ClassId(self.classes.len() as u32);
        self.by_source_name.insert(source_name.clone(), id);
        self.classes.push(ClassDef {
            file,
            name,
            source_name,
            binary_name,
            kind,
            name_span: Span::new(name_node.start_byte(), name_node.end_byte()),
            outer,
            type_params: type_parameters(source, node),
            superclass,
            interfaces,
            fields,
            methods,
        });

        for child in nested {
            self.index_type(file, source, child, package, Some(id));
        }
    }

    /// Resolve a type name as written in `file` to an indexed class.
    pub fn resolve_type(&self, file: FileId, raw: &str) -> Option<ClassId> {
        let name = erased_name(raw);
        if name.is_empty() || primitive_descriptor(&name).is_some() {
            return None;
        }
        if let Some((head, rest)) = name.split_once('.') {
            if let Some(id) = self.by_source_name.get(&name) {
                return Some(*id);
            }
            // `Outer.Inner` where `Outer` is visible by its simple name.
            let outer = self.resolve_simple(file, head)?;
            let nested = format!("{}.{rest}", self.class(outer).source_name);
            return self.by_source_name.get(&nested).copied();
        }
        self.resolve_simple(file, &name)
    }

    fn resolve_simple(&self, file: FileId, name: &str) -> Option<ClassId> {
        if let Some((id, _)) = self
            .classes()
            .find(|(_, class)| class.file == file && class.name == name)
        {
            return Some(id);
        }

        let scope = self.scopes.get(&file)?;
        if let Some(qualified) = scope.single_imports.get(name) {
            return self.by_source_name.get(qualified).copied();
        }

        let same_package = match &scope.package {
            Some(pkg) => format!("{pkg}.{name}"),
            None => name.to_string(),
        };
        std::iter::once(same_package)
            .chain(
                scope
                    .on_demand_imports
                    .iter()
                    .map(|pkg| format!("{pkg}.{name}")),
            )
            .chain(std::iter::once(format!("java.lang.{name}")))
            .find_map(|candidate| self.by_source_name.get(&candidate).copied())
    }

    /// Direct superclass of a class, if it is indexed.
    pub fn superclass(&self, class: ClassId) -> Option<ClassId> {
        let def = self.class(class);
        self.resolve_type(def.file, def.superclass.as_deref()?)
    }

    /// `class` followed by its indexed supertypes, breadth-first.
    pub fn supertypes(&self, class: ClassId) -> Vec<ClassId> {
        let mut out = Vec::new();
        let mut seen = HashSet::new();
        let mut queue = VecDeque::from([class]);
        while let Some(current) = queue.pop_front() {
            if !seen.insert(current) {
                continue;
            }
            out.push(current);
            let def = self.class(current);
            queue.extend(
                def.superclass
                    .iter()
                    .chain(def.interfaces.iter())
                    .filter_map(|raw| self.resolve_type(def.file, raw)),
            );
        }
        out
    }

    /// Closest method named `name` accepting `arity` arguments, searching supertypes.
    pub fn find_method(&self, class: ClassId, name: &str, arity: usize) -> Option<MethodId> {
        self.methods_named(class, name, arity).into_iter().next()
    }

    /// Constructor of `class` accepting `arity` arguments. Constructors are not inherited.
    pub fn find_constructor(&self, class: ClassId, arity: usize) -> Option<MethodId> {
        self.constructors_of(class, arity).into_iter().next()
    }

    /// Methods named `name` accepting `arity` arguments, closest declaration first.
    ///
    /// An inherited method is hidden by a closer one with the same descriptor.
    pub(crate) fn methods_named(&self, class: ClassId, name: &str, arity: usize) -> Vec<MethodId> {
        let mut descriptors = HashSet::new();
        let mut out = Vec::new();
        for owner in self.supertypes(class) {
            for (id, def) in self.methods_of(owner) {
                if def.name == name
                    && !def.is_constructor()
                    && def.accepts_arity(arity)
                    && descriptors.insert(self.method_descriptor(id))
                {
                    out.push(id);
                }
            }
        }
        out
    }

    pub(crate) fn constructors_of(&self, class: ClassId, arity: usize) -> Vec<MethodId> {
        self.methods_of(class)
            .filter(|(_, def)| def.is_constructor() && def.accepts_arity(arity))
            .map(|(id, _)| id)
            .collect()
    }

    /// The candidates whose parameters best fit `args`, in their original order.
    ///
    /// Ties are all returned. When no candidate accepts the inferred argument
    /// types, `candidates` is returned unchanged.
    pub(crate) fn best_overloads(
        &self,
        candidates: Vec<MethodId>,
        args: &[ArgumentType],
    ) -> Vec<MethodId> {
        if candidates.len() < 2 {
            return candidates;
        }
        let scored: Vec<(MethodId, u32)> = candidates
            .iter()
            .filter_map(|id| Some((*id, self.applicability(*id, args)?)))
            .collect();
        let Some(best) = scored.iter().map(|(_, score)| *score).max() else {
            return candidates;
        };
        scored
            .into_iter()
            .filter(|(_, score)| *score == best)
            .map(|(id, _)| id)
            .collect()
    }

    /// How well `args` fit the parameters of `method`; `None` when one cannot be passed.
    fn applicability(&self, method: MethodId, args: &[ArgumentType]) -> Option<u32> {
        let def = self.method(method);
        let params = self.parameter_descriptors(method);
        let fixed = if def.varargs {
            params.len().saturating_sub(1)
        } else {
            params.len()
        };

        let mut score = 0;
        for (position, arg) in args.iter().enumerate() {
            if position < fixed {
                score += self.argument_score(arg, params.get(position)?)?;
                continue;
            }
            let array = params.last()?.as_str();
            // An array in the varargs position is passed as is.
            if args.len() == params.len() {
                if let Some(direct) = self.argument_score(arg, array) {
                    score += direct;
                    continue;
                }
            }
            score += self.argument_score(arg, array.strip_prefix('[').unwrap_or(array))?;
        }
        Some(score)
    }

    fn argument_score(&self, arg: &ArgumentType, param: &str) -> Option<u32> {
        match arg {
            ArgumentType::Unknown => Some(0),
            ArgumentType::Null => (!is_primitive_descriptor(param)).then_some(1),
            ArgumentType::Known(desc) if desc == param => Some(3),
            ArgumentType::Known(desc) => {
                match (is_primitive_descriptor(desc), is_primitive_descriptor(param)) {
                    (true, true) => widens(desc, param).then_some(2),
                    (true, false) => {
                        let boxed = format!("L{};", box_type(desc)?);
                        (boxed == param || self.reference_score(&boxed, param).is_some())
                            .then_some(1)
                    }
                    (false, true) => {
                        let unboxed = unbox_descriptor(desc)?;
                        (unboxed == param || widens(unboxed, param)).then_some(1)
                    }
                    (false, false) => self.reference_score(desc, param),
                }
            }
        }
    }

    fn reference_score(&self, arg: &str, param: &str) -> Option<u32> {
        if param == OBJECT_DESCRIPTOR {
            return Some(1);
        }
        if arg.starts_with('[') || param.starts_with('[') {
            let array_supertype =
                matches!(param, "Ljava/lang/Cloneable;" | "Ljava/io/Serializable;");
            return (arg.starts_with('[') && array_supertype).then_some(1);
        }
        let arg_name = arg.strip_prefix('L')?.strip_suffix(';')?;
        let param_name = param.strip_prefix('L')?.strip_suffix(';')?;
        if arg_name == param_name {
            return Some(3);
        }
        match self.class_by_name(arg_name) {
            Some(class) => match self.is_subtype(class, param_name) {
                Some(true) => Some(2),
                Some(false) => None,
                None => Some(0),
            },
            None if JDK_SUPERTYPES.contains(&(arg_name, param_name)) => Some(2),
            None if arg_name == "java/lang/String"
                || BOXES.iter().any(|(_, boxed)| *boxed == arg_name) =>
            {
                None
            }
            None if self.class_by_name(param_name).is_some() => None,
            None => Some(0),
        }
    }

    /// Whether `class` extends or implements the class with internal name `internal`.
    ///
    /// `None` when an unindexed supertype leaves the answer open.
    fn is_subtype(&self, class: ClassId, internal: &str) -> Option<bool> {
        let mut open = false;
        for id in self.supertypes(class) {
            let def = self.class(id);
            if def.internal_name() == internal {
                return Some(true);
            }
            for raw in def.superclass.iter().chain(def.interfaces.iter()) {
                if self.resolve_type(def.file, raw).is_some() {
                    continue;
                }
                if self.internal_type_name(def.file, &erased_name(raw)) == internal {
                    return Some(true);
                }
                open = true;
            }
        }
        (!open).then_some(false)
    }

    /// Classes whose static member `name` is visible in `file` through static imports.
    pub(crate) fn static_import_owners(&self, file: FileId, name: &str) -> Vec<ClassId> {
        let Some(scope) = self.scopes.get(&file) else {
            return Vec::new();
        };
        scope
            .static_single_imports
            .iter()
            .filter(|(member, _)| member == name)
            .map(|(_, class)| class)
            .chain(scope.static_on_demand_imports.iter())
            .filter_map(|class| self.class_by_name(class))
            .fold(Vec::new(), |mut owners, class| {
                if !owners.contains(&class) {
                    owners.push(class);
                }
                owners
            })
    }

    pub fn find_field(&self, class: ClassId, name: &str) -> Option<FieldId> {
        self.supertypes(class).into_iter().find_map(|owner| {
            self.class(owner)
                .fields
                .iter()
                .position(|field| field.name == name)
                .map(|index| FieldId { class: owner, index })
        })
    }

    /// JVM descriptor of a type as written in `file` (`int[]` is `[I`).
    pub fn type_descriptor(&self, file: FileId, raw: &str) -> String {
        self.erased_descriptor(file, &[], raw)
    }

    /// Descriptor of a type written inside `method`, erasing its type variables.
    pub fn method_type_descriptor(&self, method: MethodId, raw: &str) -> String {
        let vars = self.type_variables(method.class, Some(self.method(method)));
        self.erased_descriptor(self.class(method.class).file, &vars, raw)
    }

    /// Type variables in scope: the method's first, then each enclosing class's.
    fn type_variables<'a>(
        &'a self,
        class: ClassId,
        method: Option<&'a MethodDef>,
    ) -> Vec<&'a TypeParam> {
        let mut vars: Vec<&TypeParam> = method
            .map(|method| method.type_params.iter().collect())
            .unwrap_or_default();
        let mut current = Some(class);
        while let Some(id) = current {
            let def = self.class(id);
            vars.extend(def.type_params.iter());
            current = def.outer;
        }
        vars
    }

    fn erased_descriptor(&self, file: FileId, vars: &[&TypeParam], raw: &str) -> String {
        let compact = strip_generic_args(&clean_type(raw)).replace("...", "[]");
        let mut base = compact.as_str();
        let mut out = String::new();
        while let Some(element) = base.strip_suffix("[]") {
            out.push('[');
            base = element;
        }
        if let Some(position) = vars.iter().position(|var| var.name == base) {
            // A variable erases to its first bound, which never refers back to itself.
            let erased = match &vars[position].bound {
                Some(bound) => {
                    let rest: Vec<&TypeParam> = vars
                        .iter()
                        .enumerate()
                        .filter(|(idx, _)| *idx != position)
                        .map(|(_, var)| *var)
                        .collect();
                    self.erased_descriptor(file, &rest, bound)
                }
                None => OBJECT_DESCRIPTOR.to_string(),
            };
            out.push_str(&erased);
            return out;
        }
        match primitive_descriptor(base) {
            Some(descriptor) => out.push_str(descriptor),
            None => {
                out.push('L');
                out.push_str(&self.internal_type_name(file, base));
                out.push(';');
            }
        }
        out
    }

    fn internal_type_name(&self, file: FileId, name: &str) -> String {
        if let Some(id) = self.resolve_type(file, name) {
            return self.class(id).internal_name();
        }
        let scope = self.scopes.get(&file);
        let qualified = if name.contains('.') {
            name.to_string()
        } else if let Some(imported) = scope.and_then(|scope| scope.single_imports.get(name)) {
            imported.clone()
        } else if JAVA_LANG.contains(&name) {
            format!("java.lang.{name}")
        } else {
            match scope.and_then(|scope| scope.package.as_deref()) {
                Some(pkg) => format!("{pkg}.{name}"),
                None => name.to_string(),
            }
        };
        qualified.replace('.', "/")
    }

    /// `(params)return` descriptor with type variables erased; constructors return `V`.
    pub fn method_descriptor(&self, method: MethodId) -> String {
        let mut out = String::from("(");
        for param in self.parameter_descriptors(method) {
            out.push_str(&param);
        }
        out.push(')');
        out.push_str(&self.return_descriptor(method));
        out
    }

    fn parameter_descriptors(&self, method: MethodId) -> Vec<String> {
        self.method(method)
            .params
            .iter()
            .map(|param| self.method_type_descriptor(method, param))
            .collect()
    }

    pub fn return_descriptor(&self, method: MethodId) -> String {
        match &self.method(method).return_type {
            Some(ret) => self.method_type_descriptor(method, ret),
            None => "V".to_string(),
        }
    }

    pub fn field_descriptor(&self, field: FieldId) -> String {
        let vars = self.type_variables(field.class, None);
        let file = self.class(field.class).file;
        self.erased_descriptor(file, &vars, &self.field(field).ty)
    }
}

fn is_primitive_descriptor(descriptor: &str) -> bool {
    descriptor.len() == 1
}

fn widens(from: &str, to: &str) -> bool {
    let wider = match from {
        "B" => "SIJFD",
        "S" | "C" => "IJFD",
        "I" => "JFD",
        "J" => "FD",
        "F" => "D",
        _ => "",
    };
    to.len() == 1 && wider.contains(to)
}

fn box_type(primitive: &str) -> Option<&'static str> {
    BOXES
        .iter()
        .find(|(desc, _)| *desc == primitive)
        .map(|(_, boxed)| *boxed)
}

fn unbox_descriptor(descriptor: &str) -> Option<&'static str> {
    let name = descriptor.strip_prefix('L')?.strip_suffix(';')?;
    BOXES
        .iter()
        .find(|(_, boxed)| *boxed == name)
        .map(|(desc, _)| *desc)
}

fn primitive_descriptor(name: &str) -> Option<&'static str> {
    Some(match name {
        "void" => "V",
        "boolean" => "Z",
        "byte" => "B",
        "char" => "C",
        "short" => "S",
        "int" => "I",
        "long" => "J",
        "float" => "F",
        "double" => "D",
        _ => return None,
    })
}

/// Type name without whitespace, generic arguments or array dimensions.
fn erased_name(raw: &str) -> String {
    let compact = strip_generic_args(&clean_type(raw)).replace("...", "");
    compact.trim_end_matches("[]").to_string()
}

fn file_scope(source: &str, root: Node<'_>) -> FileScope {
    let mut scope = FileScope::default();
    let mut cursor = root.walk();
    for child in root.named_children(&mut cursor) {
        match child.kind() {
            "package_declaration" => {
                scope.package = qualified_name_child(child).map(|n| node_text(source, n).to_string());
            }
            "import_declaration" => {
                let is_static = {
                    let mut import_cursor = child.walk();
                    let has_static = child
                        .children(&mut import_cursor)
                        .any(|token| token.kind() == "static");
                    has_static
                };
                let Some(name) = qualified_name_child(child) else {
                    continue;
                };
                let name = clean_type(node_text(source, name));
                let on_demand = find_named_child(child, "asterisk").is_some();
                if is_static {
                    if on_demand {
                        scope.static_on_demand_imports.push(name);
                    } else if let Some((class, member)) = name.rsplit_once('.') {
                        scope
                            .static_single_imports
                            .push((member.to_string(), class.to_string()));
                    }
                } else if on_demand {
                    scope.on_demand_imports.push(name);
                } else {
                    let simple = name.rsplit('.').next().unwrap_or(&name).to_string();
                    scope.single_imports.insert(simple, name);
                }
            }
            _ => {}
        }
    }
    scope
}

fn qualified_name_child(node: Node<'_>) -> Option<Node<'_>> {
    find_named_child(node, "scoped_identifier").or_else(|| find_named_child(node, "identifier"))
}

fn type_list(source: &str, list: Node<'_>) -> Vec<String> {
    let mut cursor = list.walk();
    let types = list
        .named_children(&mut cursor)
        .map(|ty| clean_type(node_text(source, ty)))
        .collect();
    types
}

/// Member declarations of a class, interface, enum or record body.
fn body_members(body: Node<'_>) -> Vec<Node<'_>> {
    let mut out = Vec::new();
    let mut cursor = body.walk();
    for child in body.named_children(&mut cursor) {
        if child.kind() == "enum_body_declarations" {
            let mut inner = child.walk();
            out.extend(child.named_children(&mut inner));
        } else {
            out.push(child);
        }
    }
    out
}

fn field_defs(source: &str, node: Node<'_>) -> Vec<FieldDef> {
    let Some(ty) = node.child_by_field_name("type") else {
        return Vec::new();
    };
    let ty = clean_type(node_text(source, ty));
    let mut out = Vec::new();
    let mut cursor = node.walk();
    for declarator in node.children_by_field_name("declarator", &mut cursor) {
        let Some(name) = declarator.child_by_field_name("name") else {
            continue;
        };
        let dims = declarator
            .child_by_field_name("dimensions")
            .map(|dims| clean_type(node_text(source, dims)))
            .unwrap_or_default();
        out.push(FieldDef {
            name: node_text(source, name).to_string(),
            ty: format!("{ty}{dims}"),
            name_span: Span::new(name.start_byte(), name.end_byte()),
        });
    }
    out
}

fn method_def(source: &str, node: Node<'_>) -> Option<MethodDef> {
    let name_node = node.child_by_field_name("name")?;
    let is_constructor = node.kind() == "constructor_declaration";
    let name = if is_constructor {
        CONSTRUCTOR_NAME.to_string()
    } else {
        node_text(source, name_node).to_string()
    };

    let params = node
        .child_by_field_name("parameters")
        .map(|params| parameters(source, params))
        .unwrap_or_default();
    let varargs = params.last().is_some_and(|param| param.varargs);

    let return_type = if is_constructor {
        None
    } else {
        let ty = node.child_by_field_name("type")?;
        let dims = node
            .child_by_field_name("dimensions")
            .map(|dims| clean_type(node_text(source, dims)))
            .unwrap_or_default();
        Some(format!("{}{dims}", clean_type(node_text(source, ty))))
    };

    Some(MethodDef {
        name,
        type_params: type_parameters(source, node),
        params: params.into_iter().map(|param| param.ty).collect(),
        varargs,
        return_type,
        name_span: Span::new(name_node.start_byte(), name_node.end_byte()),
        decl_span: Span::new(node.start_byte(), node.end_byte()),
        has_body: node.child_by_field_name("body").is_some(),
        implicit: false,
    })
}

/// Declared `<T extends Bound, U>` parameters of a type or method declaration.
fn type_parameters(source: &str, node: Node<'_>) -> Vec<TypeParam> {
    let Some(params) = node
        .child_by_field_name("type_parameters")
        .or_else(|| find_named_child(node, "type_parameters"))
    else {
        return Vec::new();
    };
    let mut cursor = params.walk();
    let type_params = params
        .named_children(&mut cursor)
        .filter(|param| param.kind() == "type_parameter")
        .filter_map(|param| {
            let name = find_named_child(param, "type_identifier")
                .or_else(|| find_named_child(param, "identifier"))?;
            let bound = find_named_child(param, "type_bound")
                .and_then(|bound| bound.named_child(0))
                .map(|ty| clean_type(node_text(source, ty)));
            Some(TypeParam {
                name: node_text(source, name).to_string(),
                bound,
            })
        })
        .collect();
    type_params
}

struct ParameterModel {
    name: String,
    name_span: Span,
    ty: String,
    varargs: bool,
}

fn parameters(source: &str, params: Node<'_>) -> Vec<ParameterModel> {
    let mut out = Vec::new();
    let mut cursor = params.walk();
    for param in params.named_children(&mut cursor) {
        match param.kind() {
            "formal_parameter" => {
                let (Some(ty), Some(name)) = (
                    param.child_by_field_name("type"),
                    param.child_by_field_name("name"),
                ) else {
                    continue;
                };
                let dims = param
                    .child_by_field_name("dimensions")
                    .map(|dims| clean_type(node_text(source, dims)))
                    .unwrap_or_default();
                out.push(ParameterModel {
                    name: node_text(source, name).to_string(),
                    name_span: Span::new(name.start_byte(), name.end_byte()),
                    ty: format!("{}{dims}", clean_type(node_text(source, ty))),
                    varargs: false,
                });
            }
            "spread_parameter" => {
                let mut inner = param.walk();
                let children: Vec<_> = param.named_children(&mut inner).collect();
                let ty = children
                    .iter()
                    .find(|child| !matches!(child.kind(), "modifiers" | "variable_declarator"));
                let name = children
                    .iter()
                    .find(|child| child.kind() == "variable_declarator")
                    .and_then(|declarator| declarator.child_by_field_name("name"));
                let (Some(ty), Some(name)) = (ty, name) else {
                    continue;
                };
                out.push(ParameterModel {
                    name: node_text(source, name).to_string(),
                    name_span: Span::new(name.start_byte(), name.end_byte()),
                    ty: format!("{}[]", clean_type(node_text(source, *ty))),
                    varargs: true,
                });
            }
            _ => {}
        }
    }
    out
}
