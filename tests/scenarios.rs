//! End-to-end classification scenarios over the public API.

use symdex::config::Config;
use symdex::context::FileContext;
use symdex::lang::LangFlags;
use symdex::output::{self, Entry};
use symdex::pipeline::classify;
use symdex::token::{IdKind, IdRole};

fn emit(src: &str, lang: LangFlags) -> Vec<Entry> {
    let mut ctx = FileContext::new("test", lang, Config::default());
    classify(&mut ctx, src.as_bytes());
    let mut entries = Vec::new();
    output::emit(&ctx, &mut entries).unwrap();
    entries
}

fn only<'a>(entries: &'a [Entry], ident: &str) -> &'a Entry {
    let hits: Vec<_> = entries.iter().filter(|e| e.identifier == ident).collect();
    assert_eq!(hits.len(), 1, "expected exactly one '{ident}': {hits:?}");
    hits[0]
}

fn all<'a>(entries: &'a [Entry], ident: &str) -> Vec<&'a Entry> {
    entries.iter().filter(|e| e.identifier == ident).collect()
}

#[test]
fn function_definition_with_params_and_refs() {
    let entries = emit("int foo(int a, int b) { return a+b; }", LangFlags::C);

    let foo = only(&entries, "foo");
    assert_eq!((foo.kind, foo.role), (IdKind::Function, IdRole::Definition));
    assert_eq!(foo.scope, "<global>");
    assert_eq!((foo.line, foo.col), (1, 5));

    let a = all(&entries, "a");
    assert_eq!(a.len(), 2);
    assert_eq!((a[0].kind, a[0].role), (IdKind::Var, IdRole::Definition));
    assert_eq!((a[0].col, a[0].scope.as_str()), (13, "<global>:foo()"));
    assert_eq!(
        (a[1].kind, a[1].role),
        (IdKind::Identifier, IdRole::Reference)
    );
    assert_eq!((a[1].col, a[1].scope.as_str()), (33, "<global>:foo(){}"));

    let b = all(&entries, "b");
    assert_eq!(b[0].col, 20);
    assert_eq!(b[1].col, 35);
}

#[test]
fn typedef_struct_scenario() {
    let entries = emit("typedef struct S { int x; } S_t;", LangFlags::C);

    let s = only(&entries, "S");
    assert_eq!((s.kind, s.role), (IdKind::Struct, IdRole::Definition));
    assert_eq!(s.scope, "<global>");

    let x = only(&entries, "x");
    assert_eq!((x.kind, x.role), (IdKind::Var, IdRole::Definition));
    assert_eq!(x.scope, "<global>:S");

    let alias = only(&entries, "S_t");
    assert_eq!(
        (alias.kind, alias.role),
        (IdKind::StructType, IdRole::Definition)
    );
    assert_eq!(alias.scope, "<global>");
}

#[test]
fn namespace_class_method_scenario() {
    let entries = emit("namespace N { class C { void m(); }; }", LangFlags::CPP);

    let n = only(&entries, "N");
    assert_eq!((n.kind, n.role), (IdKind::Namespace, IdRole::Definition));

    let c = only(&entries, "C");
    assert_eq!((c.kind, c.role), (IdKind::Class, IdRole::Definition));
    assert_eq!(c.scope, "<global>:N");

    let m = only(&entries, "m");
    assert_eq!((m.kind, m.role), (IdKind::Function, IdRole::Declaration));
    assert_eq!(m.scope, "<global>:N:C");
}

#[test]
fn macro_function_scenario() {
    let entries = emit("#define ADD(a,b) ((a)+(b))\n", LangFlags::C);
    let add = only(&entries, "ADD");
    assert_eq!(
        (add.kind, add.role),
        (IdKind::MacroFunction, IdRole::Definition)
    );
    assert_eq!(add.scope, "<global>");
}

#[test]
fn function_pointer_scenario() {
    let entries = emit("int (*fp)(int) = 0;", LangFlags::C);
    let fp = only(&entries, "fp");
    assert_eq!((fp.kind, fp.role), (IdKind::Var, IdRole::Definition));
    assert_eq!(fp.scope, "<global>");
    // the argument int is a plain type mention
    let ints = all(&entries, "int");
    assert!(ints.iter().all(|e| e.kind == IdKind::Type));
}

#[test]
fn objective_c_interface_scenario() {
    let entries = emit(
        "@interface Foo : NSObject\n- (void)bar:(int)x;\n@end\n",
        LangFlags::OC,
    );

    let foo = only(&entries, "Foo");
    assert_eq!((foo.kind, foo.role), (IdKind::Class, IdRole::Definition));

    let bar = only(&entries, "bar");
    assert_eq!((bar.kind, bar.role), (IdKind::Function, IdRole::Declaration));
    assert!(bar.scope.contains("Foo"), "scope was {:?}", bar.scope);

    let x = only(&entries, "x");
    assert_eq!((x.kind, x.role), (IdKind::Var, IdRole::Definition));
}

#[test]
fn cast_versus_call() {
    // ALL-CAPS single word: accepted as a cast, so no function reference
    let entries = emit("a = (UINT8)-1;", LangFlags::C);
    let hit = only(&entries, "UINT8");
    assert_eq!(hit.kind, IdKind::Type);

    // lower-case word followed by parens is a call
    let entries = emit("a = foo(1);", LangFlags::C);
    let foo = only(&entries, "foo");
    assert_eq!((foo.kind, foo.role), (IdKind::Function, IdRole::Reference));
}

#[test]
fn suffix_type_names_read_as_casts() {
    let entries = emit("x = (size_t)y;", LangFlags::C);
    let hit = only(&entries, "size_t");
    assert_eq!(hit.kind, IdKind::Type);
    assert_eq!(hit.role, IdRole::Reference);
}

#[test]
fn extern_variables_are_declarations() {
    let entries = emit("extern int limit;\nint used;", LangFlags::C);
    let limit = only(&entries, "limit");
    assert_eq!((limit.kind, limit.role), (IdKind::Var, IdRole::Declaration));
    let used = only(&entries, "used");
    assert_eq!((used.kind, used.role), (IdKind::Var, IdRole::Definition));
}

#[test]
fn static_functions_scope_local() {
    let entries = emit(
        "static int helper(int v);\nstatic int helper(int v) { return v; }",
        LangFlags::C,
    );
    let helpers = all(&entries, "helper");
    assert_eq!(helpers.len(), 2);
    assert_eq!(helpers[0].role, IdRole::Declaration);
    assert_eq!(helpers[1].role, IdRole::Definition);
    assert_eq!(helpers[1].scope, "<local>");
}

#[test]
fn class_constructor_is_a_class_function() {
    let entries = emit(
        "class Point { Point(int x); int x_; };",
        LangFlags::CPP,
    );
    let points = all(&entries, "Point");
    // the class tag and its constructor
    assert!(points.iter().any(|e| e.kind == IdKind::Class && e.role == IdRole::Definition));
    assert!(points
        .iter()
        .any(|e| e.kind == IdKind::Function && e.role == IdRole::Declaration));
}

#[test]
fn pawn_functions_and_calls() {
    let entries = emit("main()\n{\n    helper(1)\n}\nhelper(v)\n{\n}\n", LangFlags::PAWN);
    let main = only(&entries, "main");
    assert_eq!((main.kind, main.role), (IdKind::Function, IdRole::Definition));
    let helpers = all(&entries, "helper");
    assert!(helpers
        .iter()
        .any(|e| e.role == IdRole::Reference && e.kind == IdKind::Function));
    assert!(helpers
        .iter()
        .any(|e| e.role == IdRole::Definition && e.kind == IdKind::Function));
}

#[test]
fn d_alias_is_a_typedef() {
    let entries = emit("alias int myint;", LangFlags::D);
    let alias = only(&entries, "myint");
    assert_eq!((alias.kind, alias.role), (IdKind::Type, IdRole::Definition));
}

#[test]
fn template_variable_definition() {
    let entries = emit("Renderer<rgb32> rend;", LangFlags::CPP);
    let rend = only(&entries, "rend");
    assert_eq!((rend.kind, rend.role), (IdKind::Var, IdRole::Definition));
    let renderer = only(&entries, "Renderer");
    assert_eq!(renderer.kind, IdKind::Type);
}
