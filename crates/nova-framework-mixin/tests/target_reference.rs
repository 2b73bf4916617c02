use std::path::{Path, PathBuf};

use nova_framework_mixin::{
    collect_variants, diagnostics_for_file, is_unresolved, resolve_reference, resolve_target,
    uses_member_reference, CompletionVariant, InjectionPointKind, MixinWorkspace, Severity, Span,
    MIXIN_UNRESOLVED_TARGET,
};
use pretty_assertions::assert_eq;

const BASE: &str = r#"package com.example;

public class Base {
    protected int counter;

    protected void inherited() {}
}
"#;

const HELPER: &str = r#"package com.example;

public class Helper {
    public static String NAME = "helper";

    public static void log(String message) {}

    public int size() { return 0; }
}
"#;

const TARGET: &str = r#"package com.example;

public class Target extends Base {
    private int count;
    private Helper helper;

    public void tick(String s) {
        foo();
        this.bar();
        "x".equals(s);
        Helper.log("tick");
        helper.size();
        this.count = count + 1;
        counter++;
        inherited();
        Helper other = new Helper();
        String label = "bare";
        Runnable r = () -> foo();
    }

    public void twice() {
        foo();
        foo();
    }

    private void foo() {}

    private void bar() {}
}
"#;

const TARGET_PATH: &str = "src/com/example/Target.java";
const MIXIN_PATH: &str = "src/com/example/mixin/TargetMixin.java";

struct Fixture {
    ws: MixinWorkspace,
    /// Offset of the first character inside the `target` literal.
    offset: usize,
}

impl Fixture {
    fn new(method: &str, kind: &str, selector: &str) -> Self {
        let mixin = format!(
            r#"package com.example.mixin;

import com.example.Target;

@Mixin(Target.class)
public abstract class TargetMixin {{
    @Inject(method = "{method}", at = @At(value = "{kind}", target = "{selector}"))
    private void hook(CallbackInfo ci) {{}}
}}
"#
        );
        let marker = "target = \"";
        let offset = mixin.find(marker).expect("target attribute") + marker.len();

        let mut ws = MixinWorkspace::new();
        ws.add_file("src/com/example/Base.java", BASE).unwrap();
        ws.add_file("src/com/example/Helper.java", HELPER).unwrap();
        ws.add_file(TARGET_PATH, TARGET).unwrap();
        ws.add_file(MIXIN_PATH, mixin).unwrap();
        Fixture { ws, offset }
    }

    fn path(&self) -> &Path {
        Path::new(MIXIN_PATH)
    }

    fn is_unresolved(&self) -> bool {
        is_unresolved(&self.ws, self.path(), self.offset)
    }

    fn resolved_text(&self) -> Vec<&'static str> {
        resolve_reference(&self.ws, self.path(), self.offset)
            .into_iter()
            .map(|target| {
                assert_eq!(target.file, PathBuf::from(TARGET_PATH));
                &TARGET[target.span.start..target.span.end]
            })
            .collect()
    }

    fn variants(&self) -> Vec<CompletionVariant> {
        collect_variants(&self.ws, self.path(), self.offset)
    }
}

fn labels(variants: &[CompletionVariant]) -> Vec<&str> {
    variants.iter().map(|variant| variant.label.as_str()).collect()
}

#[test]
fn invoke_variants_cover_every_resolvable_call() {
    let fixture = Fixture::new("tick", "INVOKE", "");
    let variants = fixture.variants();
    assert_eq!(
        labels(&variants),
        vec!["foo", "bar", "Helper.log", "Helper.size", "Base.inherited"]
    );

    let inserts: Vec<&str> = variants.iter().map(|v| v.insert_text.as_str()).collect();
    assert_eq!(
        inserts,
        vec![
            "Lcom/example/Target;foo()V",
            "Lcom/example/Target;bar()V",
            "Lcom/example/Helper;log(Ljava/lang/String;)V",
            "Lcom/example/Helper;size()I",
            "Lcom/example/Base;inherited()V",
        ]
    );

    let bold: Vec<bool> = variants.iter().map(|v| v.bold).collect();
    assert_eq!(bold, vec![true, true, false, false, false]);
    assert_eq!(variants[2].lookup_strings, vec!["Helper.log".to_string()]);
    assert_eq!(variants[0].detail.as_deref(), Some("()V"));
}

#[test]
fn variants_replace_the_literal_contents() {
    let fixture = Fixture::new("tick", "INVOKE", "fo");
    let variants = fixture.variants();
    assert!(!variants.is_empty());
    let expected = Span::new(fixture.offset, fixture.offset + "fo".len());
    for variant in &variants {
        assert_eq!(variant.replace_span, Some(expected));
    }
}

#[test]
fn field_variants_include_reads_writes_and_inherited_fields() {
    let fixture = Fixture::new("tick", "FIELD", "");
    let variants = fixture.variants();
    assert_eq!(labels(&variants), vec!["helper", "count", "Base.counter"]);
    assert_eq!(
        variants[0].insert_text,
        "Lcom/example/Target;helper:Lcom/example/Helper;"
    );
    assert_eq!(variants[2].insert_text, "Lcom/example/Base;counter:I");
}

#[test]
fn construction_variants_use_the_init_marker() {
    let fixture = Fixture::new("tick", "NEW", "");
    let variants = fixture.variants();
    assert_eq!(labels(&variants), vec!["Helper.<init>"]);
    assert_eq!(variants[0].insert_text, "Lcom/example/Helper;<init>()V");
}

#[test]
fn string_constant_variants_are_call_arguments_only() {
    let fixture = Fixture::new("tick", "INVOKE_STRING", "");
    let variants = fixture.variants();
    assert_eq!(labels(&variants), vec!["tick"]);
    assert_eq!(variants[0].insert_text, "tick");
    assert_eq!(variants[0].detail.as_deref(), Some("log(...)"));
}

#[test]
fn every_variant_resolves_back_to_an_element() {
    for kind in ["INVOKE", "INVOKE_ASSIGN", "INVOKE_STRING", "FIELD", "NEW"] {
        let variants = Fixture::new("tick", kind, "").variants();
        assert!(!variants.is_empty(), "{kind}");
        for variant in variants {
            let fixture = Fixture::new("tick", kind, &variant.insert_text);
            assert!(
                !fixture.resolved_text().is_empty(),
                "{kind} {}",
                variant.insert_text
            );
            assert!(!fixture.is_unresolved(), "{kind} {}", variant.insert_text);
        }
    }
}

#[test]
fn resolves_unqualified_and_this_qualified_calls() {
    assert_eq!(
        Fixture::new("tick", "INVOKE", "foo()V").resolved_text(),
        vec!["foo()"]
    );
    assert_eq!(
        Fixture::new("tick", "INVOKE", "Lcom/example/Target;bar()V").resolved_text(),
        vec!["this.bar()"]
    );
    assert_eq!(
        Fixture::new("tick", "INVOKE_ASSIGN", "size").resolved_text(),
        vec!["helper.size()"]
    );
}

#[test]
fn inherited_members_are_owned_by_their_declaring_class() {
    assert_eq!(
        Fixture::new("tick", "INVOKE", "Lcom/example/Base;inherited()V").resolved_text(),
        vec!["inherited()"]
    );
    assert!(Fixture::new("tick", "INVOKE", "Lcom/example/Target;inherited()V").is_unresolved());
}

#[test]
fn field_writes_and_reads_resolve() {
    assert_eq!(
        Fixture::new("tick", "FIELD", "count:I").resolved_text(),
        vec!["this.count", "count"]
    );
}

#[test]
fn single_targets_require_exactly_one_match() {
    let once = Fixture::new("tick", "INVOKE", "foo");
    let target = resolve_target(&once.ws, once.path(), once.offset).expect("single match");
    assert_eq!(&TARGET[target.span.start..target.span.end], "foo()");

    let twice = Fixture::new("twice", "INVOKE", "foo");
    assert_eq!(twice.resolved_text(), vec!["foo()", "foo()"]);
    assert_eq!(resolve_target(&twice.ws, twice.path(), twice.offset), None);
}

#[test]
fn lambda_bodies_are_not_searched() {
    let fixture = Fixture::new("tick", "INVOKE", "foo");
    assert_eq!(fixture.resolved_text().len(), 1);
}

#[test]
fn unknown_injection_points_are_inapplicable() {
    let fixture = Fixture::new("tick", "HEAD", "foo");
    assert!(!fixture.is_unresolved());
    assert!(fixture.resolved_text().is_empty());
    assert!(fixture.variants().is_empty());
    assert_eq!(
        uses_member_reference(&fixture.ws, fixture.path(), fixture.offset),
        None
    );
    assert!(diagnostics_for_file(&fixture.ws, fixture.path()).is_empty());
}

#[test]
fn unknown_target_methods_are_inapplicable() {
    let fixture = Fixture::new("missing", "INVOKE", "foo");
    assert!(!fixture.is_unresolved());
    assert!(fixture.variants().is_empty());
}

#[test]
fn unmatched_selectors_are_unresolved_and_reported() {
    let fixture = Fixture::new("tick", "INVOKE", "missing");
    assert!(fixture.is_unresolved());
    assert!(fixture.resolved_text().is_empty());

    let diagnostics = diagnostics_for_file(&fixture.ws, fixture.path());
    assert_eq!(diagnostics.len(), 1);
    let diagnostic = &diagnostics[0];
    assert_eq!(diagnostic.code, MIXIN_UNRESOLVED_TARGET);
    assert_eq!(diagnostic.severity, Severity::Error);
    assert_eq!(diagnostic.message, "Cannot resolve target reference 'missing'");
    assert_eq!(
        diagnostic.span,
        Some(Span::new(fixture.offset, fixture.offset + "missing".len()))
    );
}

#[test]
fn resolved_selectors_produce_no_diagnostics() {
    let fixture = Fixture::new("tick", "FIELD", "counter");
    assert!(diagnostics_for_file(&fixture.ws, fixture.path()).is_empty());
}

#[test]
fn member_reference_usage_depends_on_the_injection_point() {
    let strings = Fixture::new("tick", "INVOKE_STRING", "tick");
    assert_eq!(
        uses_member_reference(&strings.ws, strings.path(), strings.offset),
        Some(false)
    );
    let fields = Fixture::new("tick", "FIELD", "count");
    assert_eq!(
        uses_member_reference(&fields.ws, fields.path(), fields.offset),
        Some(true)
    );
}

#[test]
fn output_types_serialize_for_lsp_adapters() {
    let fixture = Fixture::new("tick", "NEW", "");
    let variant = fixture.variants().remove(0);
    let value = serde_json::to_value(&variant).unwrap();
    assert_eq!(
        value,
        serde_json::json!({
            "label": "Helper.<init>",
            "insert_text": "Lcom/example/Helper;<init>()V",
            "lookup_strings": ["Helper.<init>"],
            "detail": "()V",
            "bold": false,
            "replace_span": { "start": fixture.offset, "end": fixture.offset },
        })
    );

    assert_eq!(
        serde_json::to_value(InjectionPointKind::InvokeStringConstant).unwrap(),
        serde_json::json!("INVOKE_STRING")
    );

    let missing = Fixture::new("tick", "FIELD", "nope");
    let diagnostics = diagnostics_for_file(&missing.ws, missing.path());
    let value = serde_json::to_value(&diagnostics[0]).unwrap();
    assert_eq!(value["severity"], serde_json::json!("Error"));
    assert_eq!(value["code"], serde_json::json!(MIXIN_UNRESOLVED_TARGET));
}

/// A target class in package `p` whose `tick` method is hooked by a mixin in the same package.
struct Scenario {
    ws: MixinWorkspace,
    target: &'static str,
    offset: usize,
}

impl Scenario {
    fn new(class: &str, target: &'static str, kind: &str, selector: &str) -> Self {
        Self::with_files(class, target, &[], kind, selector)
    }

    fn with_files(
        class: &str,
        target: &'static str,
        files: &[(&str, &str)],
        kind: &str,
        selector: &str,
    ) -> Self {
        let mixin = format!(
            r#"package p;

@Mixin({class}.class)
public abstract class TargetMixin {{
    @Inject(method = "tick", at = @At(value = "{kind}", target = "{selector}"))
    private void hook(CallbackInfo ci) {{}}
}}
"#
        );
        let marker = "target = \"";
        let offset = mixin.find(marker).expect("target attribute") + marker.len();

        let mut ws = MixinWorkspace::new();
        for (path, text) in files {
            ws.add_file(*path, *text).unwrap();
        }
        ws.add_file(format!("src/p/{class}.java"), target).unwrap();
        ws.add_file("src/p/TargetMixin.java", mixin).unwrap();
        Scenario { ws, target, offset }
    }

    fn path(&self) -> &Path {
        Path::new("src/p/TargetMixin.java")
    }

    fn resolved_text(&self) -> Vec<&'static str> {
        let target = self.target;
        resolve_reference(&self.ws, self.path(), self.offset)
            .into_iter()
            .map(|found| &target[found.span.start..found.span.end])
            .collect()
    }

    fn is_unresolved(&self) -> bool {
        is_unresolved(&self.ws, self.path(), self.offset)
    }

    fn inserts(&self) -> Vec<String> {
        collect_variants(&self.ws, self.path(), self.offset)
            .into_iter()
            .map(|variant| variant.insert_text)
            .collect()
    }
}

const OVERLOADED: &str = r#"package p;

public class Target {
    public Target(int size) {}
    public Target(String name) {}

    void foo(int a) {}
    void foo(String a) {}

    void tick() {
        foo("x");
        foo(1);
        new Target("named");
    }
}
"#;

#[test]
fn overloaded_calls_resolve_by_argument_types() {
    let by_string = Scenario::new(
        "Target",
        OVERLOADED,
        "INVOKE",
        "Lp/Target;foo(Ljava/lang/String;)V",
    );
    assert_eq!(by_string.resolved_text(), vec![r#"foo("x")"#]);
    assert!(!by_string.is_unresolved());

    let by_int = Scenario::new("Target", OVERLOADED, "INVOKE", "foo(I)V");
    assert_eq!(by_int.resolved_text(), vec!["foo(1)"]);

    assert_eq!(
        Scenario::new("Target", OVERLOADED, "INVOKE", "").inserts(),
        vec!["Lp/Target;foo(Ljava/lang/String;)V", "Lp/Target;foo(I)V"]
    );
}

#[test]
fn overloaded_constructors_resolve_by_argument_types() {
    assert_eq!(
        Scenario::new("Target", OVERLOADED, "NEW", "").inserts(),
        vec!["Lp/Target;<init>(Ljava/lang/String;)V"]
    );
    let by_int = Scenario::new("Target", OVERLOADED, "NEW", "Lp/Target;<init>(I)V");
    assert!(by_int.resolved_text().is_empty());
    assert!(by_int.is_unresolved());
}

const GENERIC: &str = r#"package p;

public class Box<E> {
    <T> void put(T value) {}

    void add(E element) {}

    void tick() {
        put("x");
        add(null);
    }
}
"#;

#[test]
fn type_variables_are_erased_in_literals() {
    assert_eq!(
        Scenario::new("Box", GENERIC, "INVOKE", "").inserts(),
        vec!["Lp/Box;put(Ljava/lang/Object;)V", "Lp/Box;add(Ljava/lang/Object;)V"]
    );
    assert_eq!(
        Scenario::new("Box", GENERIC, "INVOKE", "put(Ljava/lang/Object;)V").resolved_text(),
        vec![r#"put("x")"#]
    );
}

const UTIL: &str = r#"package q;

public class Util {
    public static int LIMIT = 3;

    public static void log(String message) {}
}
"#;

const STATIC_IMPORTS: &str = r#"package p;

import static q.Util.log;
import static q.Util.*;

public class Target {
    void tick() {
        log("x");
        int n = LIMIT;
    }
}
"#;

#[test]
fn statically_imported_members_are_owned_by_their_class() {
    let files = [("src/q/Util.java", UTIL)];
    let calls = Scenario::with_files("Target", STATIC_IMPORTS, &files, "INVOKE", "");
    let variants = collect_variants(&calls.ws, calls.path(), calls.offset);
    assert_eq!(labels(&variants), vec!["Util.log"]);
    assert_eq!(variants[0].insert_text, "Lq/Util;log(Ljava/lang/String;)V");

    let fields = Scenario::with_files("Target", STATIC_IMPORTS, &files, "FIELD", "");
    assert_eq!(fields.inserts(), vec!["Lq/Util;LIMIT:I"]);

    let log = Scenario::with_files(
        "Target",
        STATIC_IMPORTS,
        &files,
        "INVOKE",
        "Lq/Util;log(Ljava/lang/String;)V",
    );
    assert_eq!(log.resolved_text(), vec![r#"log("x")"#]);
}

const STATEMENTS: &str = r#"package p;

public class Target {
    private RuntimeException error;
    private boolean enabled;
    private int mode;

    int tick() {
        try {
            run();
        } catch (RuntimeException error) {
            throw error;
        }
        assert enabled;
        return switch (mode) {
            default -> {
                yield mode;
            }
        };
    }

    void run() {}
}
"#;

#[test]
fn catch_parameters_shadow_fields_and_statement_operands_are_reads() {
    let fields = Scenario::new("Target", STATEMENTS, "FIELD", "");
    assert_eq!(fields.inserts(), vec!["Lp/Target;enabled:Z", "Lp/Target;mode:I"]);

    assert_eq!(
        Scenario::new("Target", STATEMENTS, "FIELD", "mode:I").resolved_text(),
        vec!["mode", "mode"]
    );
    assert!(Scenario::new("Target", STATEMENTS, "FIELD", "error").is_unresolved());
}

const BLOCK_LOCALS: &str = r#"package p;

public class Target {
    private int count;

    void tick() {
        if (count > 0) {
            int count = 1;
            use(count);
        }
        use(count);
    }

    void use(int value) {}
}
"#;

#[test]
fn block_locals_only_hide_fields_inside_their_block() {
    let fixture = Scenario::new("Target", BLOCK_LOCALS, "FIELD", "count:I");
    let found = resolve_reference(&fixture.ws, fixture.path(), fixture.offset);
    let starts: Vec<usize> = found.iter().map(|target| target.span.start).collect();

    let condition = BLOCK_LOCALS.find("count > 0").unwrap();
    let trailing = BLOCK_LOCALS.rfind("use(count)").unwrap() + "use(".len();
    assert_eq!(starts, vec![condition, trailing]);
}
