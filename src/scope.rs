//! Scope assignment.
//!
//! Walks the classified stream and attaches a qualified scope path to every
//! token. Definitions of namable entities (namespaces, classes, aggregates,
//! functions) assign decorated paths to their subordinate regions: `name()`
//! for a parameter list, `name(){}` for a body, the bare name for a type or
//! namespace body. Tokens that end up with no scope fall back to
//! `<local>`, `<preproc>` or `<global>`.

use crate::context::FileContext;
use crate::stream::{Nav, TokenId, TokenStream};
use crate::token::{TokenFlags, TokenKind};

fn fallback_scope(ts: &TokenStream, pc: TokenId) -> &'static str {
    let tok = ts.tok(pc);
    if tok.flags.contains(TokenFlags::STATIC) {
        "<local>"
    } else if tok.flags.contains(TokenFlags::IN_PREPROC) {
        // the defined name itself is visible everywhere; only the rest of
        // the directive is preprocessor-local
        if matches!(tok.kind, TokenKind::Macro | TokenKind::MacroFunc) {
            "<global>"
        } else {
            "<preproc>"
        }
    } else {
        "<global>"
    }
}

/// The definition's own base path: its already-assigned scope, or the
/// fallback, plus any `A::B::` qualification written before the name.
fn qualified_base(ts: &TokenStream, def: TokenId) -> String {
    let mut base = if ts.tok(def).scope.is_empty() {
        fallback_scope(ts, def).to_string()
    } else {
        ts.tok(def).scope.clone()
    };

    // resolve the prefix chain by walking backward over '::' separators
    let mut chain: Vec<String> = Vec::new();
    let mut cur = ts.prev_nnl(def, Nav::Preproc);
    while let Some(sep) = cur {
        if ts.tok(sep).kind != TokenKind::DcMember {
            break;
        }
        let Some(owner) = ts.prev_nnl(sep, Nav::Preproc) else {
            break;
        };
        if !matches!(ts.tok(owner).kind, TokenKind::Type | TokenKind::Word) {
            break;
        }
        chain.push(ts.tok(owner).text.clone());
        cur = ts.prev_nnl(owner, Nav::Preproc);
    }
    // a re-run sees its own chain already applied
    let suffix: String = chain
        .iter()
        .rev()
        .map(|n| format!(":{n}"))
        .collect();
    if !suffix.is_empty() && !base.ends_with(&suffix) {
        base.push_str(&suffix);
    }
    base
}

/// Assign `scope` to every non-punctuator, non-keyword token strictly
/// between `open` and its matching close.
fn mark_region(ts: &mut TokenStream, open: TokenId, scope: &str) -> Option<TokenId> {
    let close = ts.skip_to_match(open, Nav::Preproc)?;
    let mut cur = ts.next(open, Nav::Preproc);
    while let Some(id) = cur {
        if id == close {
            break;
        }
        let tok = ts.tok(id);
        if !tok
            .flags
            .intersects(TokenFlags::PUNCTUATOR | TokenFlags::KEYWORD)
        {
            ts.tok_mut(id).scope = scope.to_string();
        }
        cur = ts.next(id, Nav::Preproc);
    }
    Some(close)
}

/// Assign `scope` to tokens from `start` until `end_kind` at the same
/// level; returns the terminator.
fn mark_until(
    ts: &mut TokenStream,
    start: TokenId,
    stop: impl Fn(&crate::token::Token) -> bool,
    scope: &str,
) -> Option<TokenId> {
    let mut cur = ts.next(start, Nav::Preproc);
    while let Some(id) = cur {
        if stop(ts.tok(id)) {
            return Some(id);
        }
        let tok = ts.tok(id);
        if !tok
            .flags
            .intersects(TokenFlags::PUNCTUATOR | TokenFlags::KEYWORD)
        {
            ts.tok_mut(id).scope = scope.to_string();
        }
        cur = ts.next(id, Nav::Preproc);
    }
    None
}

/// A named definition that owns a brace body: namespace word, class/struct/
/// union/enum tag, Objective-C class.
fn is_body_definition(ts: &TokenStream, pc: TokenId) -> bool {
    let tok = ts.tok(pc);
    if !tok.flags.contains(TokenFlags::DEF) {
        return false;
    }
    match tok.kind {
        TokenKind::Word => tok.parent == TokenKind::Namespace,
        TokenKind::Type => matches!(
            tok.parent,
            TokenKind::Class
                | TokenKind::Struct
                | TokenKind::Union
                | TokenKind::Enum
                | TokenKind::OcClass
        ),
        _ => false,
    }
}

pub fn assign_scope(ctx: &mut FileContext) {
    let ts = &mut ctx.tokens;

    let mut pc_opt = ts.head();
    while let Some(pc) = pc_opt {
        let kind = ts.tok(pc).kind;

        if is_body_definition(ts, pc) {
            let base = qualified_base(ts, pc);
            if base != fallback_scope(ts, pc) {
                ts.tok_mut(pc).scope = base.clone();
            }
            let name = ts.tok(pc).text.clone();
            let scope = format!("{base}:{name}");
            if ts.tok(pc).parent == TokenKind::OcClass {
                // the body runs to @end with no braces
                mark_until(ts, pc, |t| t.kind == TokenKind::OcEnd, &scope);
            } else {
                // find the body brace, skipping base-class lists
                let mut tmp = ts.next_nnl(pc, Nav::Preproc);
                while let Some(t) = tmp {
                    let tok = ts.tok(t);
                    if tok.kind == TokenKind::BraceOpen {
                        mark_region(ts, t, &scope);
                        break;
                    }
                    if tok.is_semicolon() || tok.kind == TokenKind::BraceClose {
                        break;
                    }
                    tmp = ts.next_nnl(t, Nav::Preproc);
                }
            }
        }

        match kind {
            TokenKind::FuncProto => {
                let base = qualified_base(ts, pc);
                if base != fallback_scope(ts, pc) {
                    ts.tok_mut(pc).scope = base.clone();
                }
                let name = ts.tok(pc).text.clone();
                if let Some(next) = ts.next_nnl(pc, Nav::Preproc) {
                    if ts.tok(next).kind == TokenKind::FParenOpen {
                        mark_region(ts, next, &format!("{base}:{name}()"));
                    }
                }
            }
            TokenKind::FuncDef | TokenKind::FuncClass => {
                let has_body = kind == TokenKind::FuncDef
                    || ts.tok(pc).flags.contains(TokenFlags::DEF);
                let base = qualified_base(ts, pc);
                if base != fallback_scope(ts, pc) {
                    ts.tok_mut(pc).scope = base.clone();
                }
                let name = ts.tok(pc).text.clone();
                let mut after_params: Option<TokenId> = ts.next_nnl(pc, Nav::Preproc);
                if let Some(next) = after_params {
                    if ts.tok(next).kind == TokenKind::FParenOpen {
                        after_params = mark_region(ts, next, &format!("{base}:{name}()"));
                    }
                }
                if has_body {
                    // the body brace follows the close paren, possibly past
                    // qualifiers or a constructor initializer list
                    let mut tmp = after_params.and_then(|t| ts.next_nnl(t, Nav::Preproc));
                    while let Some(t) = tmp {
                        let tok = ts.tok(t);
                        if tok.kind == TokenKind::BraceOpen {
                            mark_region(ts, t, &format!("{base}:{name}(){{}}"));
                            break;
                        }
                        if tok.is_semicolon() {
                            break;
                        }
                        tmp = ts.next_nnl(t, Nav::Preproc);
                    }
                }
            }
            TokenKind::OcMsgSpec | TokenKind::OcMsgDecl => {
                let base = qualified_base(ts, pc);
                let name = ts.tok(pc).text.clone();
                let arg_scope = format!("{base}:{name}()");
                let terminator = mark_until(
                    ts,
                    pc,
                    |t| t.is_semicolon() || t.kind == TokenKind::BraceOpen,
                    &arg_scope,
                );
                if let Some(t) = terminator {
                    if ts.tok(t).kind == TokenKind::BraceOpen {
                        mark_region(ts, t, &format!("{base}:{name}(){{}}"));
                    }
                }
            }
            _ => {}
        }

        pc_opt = ts.next(pc, Nav::All);
    }

    // scope totality
    let ids: Vec<TokenId> = ts.ids().collect();
    for id in ids {
        if ts.tok(id).scope.is_empty() {
            ts.tok_mut(id).scope = fallback_scope(ts, id).to_string();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::lang::LangFlags;
    use crate::pipeline::classify;

    fn run(src: &str, lang: LangFlags) -> FileContext {
        let mut ctx = FileContext::new("test", lang, Config::default());
        classify(&mut ctx, src.as_bytes());
        ctx
    }

    fn scope_of(ctx: &FileContext, text: &str) -> String {
        ctx.tokens
            .ids()
            .find(|&id| ctx.tokens.tok(id).text == text)
            .map(|id| ctx.tokens.tok(id).scope.clone())
            .unwrap()
    }

    fn scopes_of(ctx: &FileContext, text: &str) -> Vec<String> {
        ctx.tokens
            .ids()
            .filter(|&id| ctx.tokens.tok(id).text == text)
            .map(|id| ctx.tokens.tok(id).scope.clone())
            .collect()
    }

    #[test]
    fn function_scopes_are_decorated() {
        let ctx = run("int foo(int a, int b) { return a+b; }", LangFlags::C);
        assert_eq!(scope_of(&ctx, "foo"), "<global>");
        assert_eq!(scopes_of(&ctx, "a"), vec!["<global>:foo()", "<global>:foo(){}"]);
        assert_eq!(scopes_of(&ctx, "b"), vec!["<global>:foo()", "<global>:foo(){}"]);
    }

    #[test]
    fn aggregate_bodies_use_the_bare_name() {
        let ctx = run("typedef struct S { int x; } S_t;", LangFlags::C);
        assert_eq!(scope_of(&ctx, "S"), "<global>");
        assert_eq!(scope_of(&ctx, "x"), "<global>:S");
        assert_eq!(scope_of(&ctx, "S_t"), "<global>");
    }

    #[test]
    fn nested_definitions_accumulate() {
        let ctx = run("namespace N { class C { void m(); }; }", LangFlags::CPP);
        assert_eq!(scope_of(&ctx, "N"), "<global>");
        assert_eq!(scope_of(&ctx, "C"), "<global>:N");
        assert_eq!(scope_of(&ctx, "m"), "<global>:N:C");
    }

    #[test]
    fn macro_names_are_global_but_bodies_are_not() {
        let ctx = run("#define TOP limit\n", LangFlags::C);
        assert_eq!(scope_of(&ctx, "TOP"), "<global>");
        assert_eq!(scope_of(&ctx, "limit"), "<preproc>");
    }

    #[test]
    fn static_definitions_are_local() {
        let ctx = run("static int counter = 0;", LangFlags::C);
        assert_eq!(scope_of(&ctx, "counter"), "<local>");
    }

    #[test]
    fn qualified_methods_resolve_their_chain() {
        let ctx = run("void Engine::draw(int n) { n = n + 1; }", LangFlags::CPP);
        assert_eq!(scope_of(&ctx, "draw"), "<global>:Engine");
        assert_eq!(
            scopes_of(&ctx, "n"),
            vec![
                "<global>:Engine:draw()",
                "<global>:Engine:draw(){}",
                "<global>:Engine:draw(){}"
            ]
        );
    }

    #[test]
    fn every_token_has_a_scope() {
        let ctx = run(
            "#define M(x) ((x)+1)\nint g;\nstatic int s;\nvoid f(void) { g = M(2); }",
            LangFlags::C,
        );
        for id in ctx.tokens.ids() {
            assert!(
                !ctx.tokens.tok(id).scope.is_empty(),
                "token {:?} has empty scope",
                ctx.tokens.tok(id).text
            );
        }
    }
}
