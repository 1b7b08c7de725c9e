//! Corpus-style tests: aggregate declaration/definition/reference shapes,
//! stream invariants, and classifier idempotence.

use symdex::config::Config;
use symdex::context::FileContext;
use symdex::lang::LangFlags;
use symdex::output::{self, Entry};
use symdex::pipeline::classify;
use symdex::scope::assign_scope;
use symdex::stream::Nav;
use symdex::symbols::{combine_labels, fix_symbols};
use symdex::token::{IdKind, IdRole, TokenFlags, TokenKind};

fn context(src: &str, lang: LangFlags) -> FileContext {
    let mut ctx = FileContext::new("test", lang, Config::default());
    classify(&mut ctx, src.as_bytes());
    ctx
}

fn emit(src: &str, lang: LangFlags) -> Vec<Entry> {
    let ctx = context(src, lang);
    let mut entries = Vec::new();
    output::emit(&ctx, &mut entries).unwrap();
    entries
}

fn roles_of(entries: &[Entry], ident: &str) -> Vec<(IdKind, IdRole)> {
    entries
        .iter()
        .filter(|e| e.identifier == ident)
        .map(|e| (e.kind, e.role))
        .collect()
}

const ENUM_SRC: &str = "\
enum enua;

enum enua
{
    ENUA_A,
    ENUA_B,
};

typedef enum enua enua;

void function(void)
{
    enum enua a1;
}
";

#[test]
fn enum_proto_def_ref() {
    let entries = emit(ENUM_SRC, LangFlags::C);
    let enua = roles_of(&entries, "enua");
    assert_eq!(enua[0], (IdKind::Enum, IdRole::Declaration));
    assert_eq!(enua[1], (IdKind::Enum, IdRole::Definition));
    // the typedef line: tag reference plus the alias definition
    assert!(enua.contains(&(IdKind::Enum, IdRole::Reference)));
    assert!(enua.contains(&(IdKind::EnumType, IdRole::Definition)));
    // the local: a tag reference and a variable definition
    assert_eq!(
        roles_of(&entries, "a1"),
        vec![(IdKind::Var, IdRole::Definition)]
    );

    for val in ["ENUA_A", "ENUA_B"] {
        assert_eq!(roles_of(&entries, val), vec![(IdKind::EnumVal, IdRole::Definition)]);
    }
}

const STRUCT_SRC: &str = "\
struct strua;

struct strua
{
    int a;
    int b;
};

typedef struct strua strua;

typedef struct
{
    int a;
} strub;

struct strud
{
    int a;
    struct strue
    {
        int a;
    } e;
};
";

#[test]
fn struct_shapes() {
    let entries = emit(STRUCT_SRC, LangFlags::C);
    let strua = roles_of(&entries, "strua");
    assert_eq!(strua[0], (IdKind::Struct, IdRole::Declaration));
    assert_eq!(strua[1], (IdKind::Struct, IdRole::Definition));
    assert!(strua.contains(&(IdKind::Struct, IdRole::Reference)));
    assert!(strua.contains(&(IdKind::StructType, IdRole::Definition)));

    assert_eq!(
        roles_of(&entries, "strub"),
        vec![(IdKind::StructType, IdRole::Definition)]
    );

    // nested definition inside a body
    assert_eq!(
        roles_of(&entries, "strue"),
        vec![(IdKind::Struct, IdRole::Definition)]
    );
    // the member of the inner struct lives in the inner scope
    let inner_a = entries
        .iter()
        .filter(|e| e.identifier == "a" && e.scope.contains("strue"))
        .count();
    assert_eq!(inner_a, 1);
}

const FUNCTION_SRC: &str = "\
int functiona(int a, int b);

static int functionc(int a, int b)
{
    return a + b;
}

int functiong(
    int a,
#if defined(DEFINE)
    int b,
#endif
    int c)
{
    int d = functiona(a, c);
    return d;
}
";

#[test]
fn function_shapes() {
    let entries = emit(FUNCTION_SRC, LangFlags::C);

    let fa = roles_of(&entries, "functiona");
    assert_eq!(fa[0], (IdKind::Function, IdRole::Declaration));
    assert!(fa.contains(&(IdKind::Function, IdRole::Reference)));

    assert_eq!(
        roles_of(&entries, "functionc"),
        vec![(IdKind::Function, IdRole::Definition)]
    );

    // params survive a preprocessor split in the middle of the list
    let fg = roles_of(&entries, "functiong");
    assert_eq!(fg, vec![(IdKind::Function, IdRole::Definition)]);

    let d = roles_of(&entries, "d");
    assert_eq!(d[0], (IdKind::Var, IdRole::Definition));
}

#[test]
fn delimiter_levels_match_everywhere() {
    let ctx = context(FUNCTION_SRC, LangFlags::C);
    for id in ctx.tokens.ids() {
        let tok = ctx.tokens.tok(id);
        if tok.kind.matching_close().is_some() && !tok.is_preproc() {
            let close = ctx
                .tokens
                .skip_to_match(id, Nav::Preproc)
                .unwrap_or_else(|| panic!("unmatched {:?} at line {}", tok.text, tok.line));
            assert_eq!(tok.level, ctx.tokens.tok(close).level);
        }
    }
}

#[test]
fn preproc_flag_implies_directive_on_line() {
    let ctx = context(FUNCTION_SRC, LangFlags::C);
    for id in ctx.tokens.ids() {
        let tok = ctx.tokens.tok(id);
        if !tok.is_preproc() {
            continue;
        }
        // walk back to a PREPROC token without crossing a newline
        let mut cur = ctx.tokens.prev(id, Nav::All);
        let mut found = tok.kind == TokenKind::Preproc;
        while let Some(p) = cur {
            let ptok = ctx.tokens.tok(p);
            if ptok.kind == TokenKind::Newline {
                break;
            }
            if ptok.kind == TokenKind::Preproc {
                found = true;
                break;
            }
            cur = ctx.tokens.prev(p, Nav::All);
        }
        assert!(found, "token {:?} flagged IN_PREPROC with no directive", tok.text);
    }
}

#[test]
fn scope_totality() {
    for src in [ENUM_SRC, STRUCT_SRC, FUNCTION_SRC] {
        let ctx = context(src, LangFlags::C);
        for id in ctx.tokens.ids() {
            assert!(!ctx.tokens.tok(id).scope.is_empty());
        }
    }
}

#[test]
fn classifier_is_idempotent() {
    for (src, lang) in [
        (ENUM_SRC, LangFlags::C),
        (STRUCT_SRC, LangFlags::C),
        (FUNCTION_SRC, LangFlags::C),
        ("namespace N { class C { void m(); C(); }; }", LangFlags::CPP),
    ] {
        let mut ctx = context(src, lang);
        let snapshot: Vec<_> = ctx
            .tokens
            .ids()
            .map(|id| {
                let t = ctx.tokens.tok(id);
                (t.kind, t.parent, t.text.clone(), t.scope.clone())
            })
            .collect();

        fix_symbols(&mut ctx);
        combine_labels(&mut ctx);
        assign_scope(&mut ctx);

        let again: Vec<_> = ctx
            .tokens
            .ids()
            .map(|id| {
                let t = ctx.tokens.tok(id);
                (t.kind, t.parent, t.text.clone(), t.scope.clone())
            })
            .collect();
        assert_eq!(snapshot, again, "classifier not stable for {src:?}");
    }
}

#[test]
fn lvalue_marking() {
    let ctx = context("int x; x = y + 1;", LangFlags::C);
    let x_tokens: Vec<_> = ctx
        .tokens
        .ids()
        .filter(|&id| ctx.tokens.tok(id).text == "x")
        .collect();
    assert_eq!(x_tokens.len(), 2);
    assert!(ctx
        .tokens
        .tok(x_tokens[1])
        .flags
        .contains(TokenFlags::LVALUE));
}

#[test]
fn struct_body_members_are_variables() {
    let entries = emit(
        "struct pair { int first; int second; };",
        LangFlags::C,
    );
    for name in ["first", "second"] {
        assert_eq!(
            roles_of(&entries, name),
            vec![(IdKind::Var, IdRole::Definition)],
            "{name}"
        );
    }
}

#[test]
fn pointer_vs_multiply() {
    // declaration: star binds to the type
    let ctx = context("int *p;", LangFlags::C);
    let star = ctx
        .tokens
        .ids()
        .find(|&id| ctx.tokens.tok(id).text == "*")
        .unwrap();
    assert_eq!(ctx.tokens.tok(star).kind, TokenKind::PtrType);

    // expression: star multiplies
    let ctx = context("void f(void) { r = a * b; }", LangFlags::C);
    let star = ctx
        .tokens
        .ids()
        .find(|&id| ctx.tokens.tok(id).text == "*")
        .unwrap();
    assert_eq!(ctx.tokens.tok(star).kind, TokenKind::Arith);

    // expression start: star derefs
    let ctx = context("void f(void) { *p = 1; }", LangFlags::C);
    let star = ctx
        .tokens
        .ids()
        .find(|&id| ctx.tokens.tok(id).text == "*")
        .unwrap();
    assert_eq!(ctx.tokens.tok(star).kind, TokenKind::Deref);
}

#[test]
fn labels_and_case_colons() {
    let ctx = context(
        "void f(int v) {\nretry:\n  switch (v) { case 1: break; default: break; }\n  goto retry;\n}",
        LangFlags::C,
    );
    let mut saw_label = false;
    let mut saw_case = 0;
    for id in ctx.tokens.ids() {
        match ctx.tokens.tok(id).kind {
            TokenKind::LabelColon => saw_label = true,
            TokenKind::CaseColon => saw_case += 1,
            _ => {}
        }
    }
    assert!(saw_label);
    assert_eq!(saw_case, 2);
}

#[test]
fn ternary_colons_are_conditional() {
    let ctx = context("void f(void) { x = a ? b : c; }", LangFlags::C);
    assert!(ctx
        .tokens
        .ids()
        .any(|id| ctx.tokens.tok(id).kind == TokenKind::CondColon));
}
