//! Post-lex cleanup.
//!
//! Fixes that only need token sequence, not nesting levels: `[]` fusion,
//! words that must be types, `operator` names, embedded-SQL markers, and
//! the `<` template-versus-comparison decision.

use crate::context::FileContext;
use crate::lang::LangFlags;
use crate::stream::{Nav, TokenId, TokenStream};
use crate::token::{TokenFlags, TokenKind};

/// Languages in which `word <` can open a template argument list.
const TEMPLATE_LANGS: LangFlags = LangFlags::CPP
    .union(LangFlags::CS)
    .union(LangFlags::JAVA)
    .union(LangFlags::VALA);

pub fn tokenize_cleanup(ctx: &mut FileContext) {
    merge_tsquares(ctx);

    let mut pc_opt = ctx.tokens.head();
    while let Some(pc) = pc_opt {
        let next_opt = ctx.tokens.next_nnl(pc, Nav::All);
        let kind = ctx.tokens.tok(pc).kind;

        match kind {
            // `enum class` fuses into one concept; otherwise the tag that
            // follows is a type
            TokenKind::Enum => {
                if let Some(next) = next_opt {
                    match ctx.tokens.tok(next).kind {
                        TokenKind::Class => {
                            ctx.tokens.tok_mut(next).kind = TokenKind::EnumClass;
                        }
                        TokenKind::Word => {
                            ctx.tokens.tok_mut(next).kind = TokenKind::Type;
                        }
                        _ => {}
                    }
                }
            }
            // the tag of an aggregate is a type
            TokenKind::Struct | TokenKind::Union | TokenKind::EnumClass | TokenKind::Class => {
                if let Some(next) = next_opt {
                    if ctx.tokens.tok(next).kind == TokenKind::Word {
                        ctx.tokens.tok_mut(next).kind = TokenKind::Type;
                    }
                }
            }
            TokenKind::Word => {
                // a word before '::' is a type; EXEC SQL opens an embedded
                // statement
                if let Some(next) = next_opt {
                    if ctx.tokens.tok(next).kind == TokenKind::DcMember {
                        ctx.tokens.tok_mut(pc).kind = TokenKind::Type;
                    } else if ctx.tokens.tok(pc).text.eq_ignore_ascii_case("EXEC")
                        && ctx.tokens.tok(next).text.eq_ignore_ascii_case("SQL")
                    {
                        mark_exec_sql(&mut ctx.tokens, pc, next);
                    }
                }
            }
            TokenKind::Operator => {
                mark_operator_value(&mut ctx.tokens, pc);
            }
            // `extern "C"` keeps the keyword; a plain storage-class extern
            // acts like any other qualifier
            TokenKind::Extern => {
                if let Some(next) = next_opt {
                    let ntok = ctx.tokens.tok(next);
                    if !matches!(ntok.kind, TokenKind::String | TokenKind::StringMulti)
                        && !ntok.is_paren_open()
                    {
                        ctx.tokens.tok_mut(pc).kind = TokenKind::Qualifier;
                    }
                }
            }
            TokenKind::OcClass => {
                if ctx.tokens.tok(pc).text == "@protocol" {
                    ctx.tokens.tok_mut(pc).parent = TokenKind::OcProtocol;
                }
            }
            TokenKind::AngleOpen => {
                check_template(ctx, pc);
            }
            TokenKind::AngleClose => {
                // never claimed by a template scan
                if !ctx.tokens.tok(pc).flags.contains(TokenFlags::IN_TEMPLATE)
                    && ctx.tokens.tok(pc).parent != TokenKind::Template
                {
                    ctx.tokens.tok_mut(pc).kind = TokenKind::Compare;
                }
            }
            _ => {}
        }

        pc_opt = ctx.tokens.next(pc, Nav::All);
    }
}

/// Fuse adjacent `[` `]` into one `[]` token.
fn merge_tsquares(ctx: &mut FileContext) {
    let mut pc_opt = ctx.tokens.head();
    while let Some(pc) = pc_opt {
        pc_opt = ctx.tokens.next(pc, Nav::All);
        if ctx.tokens.tok(pc).kind != TokenKind::SquareOpen {
            continue;
        }
        let Some(next) = ctx.tokens.next_nnl(pc, Nav::Preproc) else {
            continue;
        };
        if ctx.tokens.tok(next).kind != TokenKind::SquareClose {
            continue;
        }
        let close_end = ctx.tokens.tok(next).col_end;
        ctx.tokens.remove(next);
        let tok = ctx.tokens.tok_mut(pc);
        tok.kind = TokenKind::TSquare;
        tok.text = "[]".to_string();
        tok.col_end = close_end;
        pc_opt = ctx.tokens.next(pc, Nav::All);
    }
}

/// `operator X` — everything between the keyword and the argument parens is
/// part of the function name. An empty `()` pair fuses into one token so a
/// call operator reads as a single name.
fn mark_operator_value(ts: &mut TokenStream, op: TokenId) {
    let Some(first) = ts.next_nnl(op, Nav::Preproc) else {
        return;
    };

    // operator() — fuse the empty pair
    if ts.tok(first).kind == TokenKind::ParenOpen {
        if let Some(close) = ts.next_nnl(first, Nav::Preproc) {
            if ts.tok(close).kind == TokenKind::ParenClose {
                let end = ts.tok(close).col_end;
                ts.remove(close);
                let tok = ts.tok_mut(first);
                tok.kind = TokenKind::OperatorVal;
                tok.parent = TokenKind::Operator;
                tok.text = "()".to_string();
                tok.col_end = end;
            }
        }
        return;
    }

    let mut cur = first;
    let mut steps = 0;
    loop {
        let tok = ts.tok(cur);
        if tok.kind == TokenKind::ParenOpen || tok.is_semicolon() || tok.is_newline() {
            break;
        }
        let tok = ts.tok_mut(cur);
        tok.kind = TokenKind::OperatorVal;
        tok.parent = TokenKind::Operator;
        steps += 1;
        match ts.next_nnl(cur, Nav::Preproc) {
            Some(next) if steps < 4 => cur = next,
            _ => break,
        }
    }
}

/// `EXEC SQL [BEGIN|END] ...` — the marker kind drives the later sweep that
/// retags the statement's words.
fn mark_exec_sql(ts: &mut TokenStream, exec: TokenId, sql: TokenId) {
    let mut kind = TokenKind::SqlExec;
    if let Some(third) = ts.next_nnl(sql, Nav::Preproc) {
        if ts.tok(third).text.eq_ignore_ascii_case("BEGIN") {
            kind = TokenKind::SqlBegin;
        } else if ts.tok(third).text.eq_ignore_ascii_case("END") {
            kind = TokenKind::SqlEnd;
        }
    }
    ts.tok_mut(exec).kind = kind;
    ts.tok_mut(sql).kind = kind;
    ts.tok_mut(sql).parent = kind;
}

/// Decide whether an `<` opens a template argument list.
///
/// A scan from the open counts angle depth, staying blind inside parens;
/// reaching the balancing `>` without hitting a statement boundary confirms
/// the template. `>>` closes two levels and is split so each list has its
/// own close token. Failures demote the `<` to a comparison.
fn check_template(ctx: &mut FileContext, open: TokenId) {
    let ts = &mut ctx.tokens;

    if !ctx.lang.intersects(TEMPLATE_LANGS) {
        ts.tok_mut(open).kind = TokenKind::Compare;
        return;
    }

    let prev = ts.prev_nnl(open, Nav::Preproc);
    let forced = prev.is_some_and(|p| ts.tok(p).kind == TokenKind::Template);
    if !forced {
        let ok_prev = prev.is_some_and(|p| {
            matches!(
                ts.tok(p).kind,
                TokenKind::Word | TokenKind::Type | TokenKind::OperatorVal
            )
        });
        if !ok_prev {
            ts.tok_mut(open).kind = TokenKind::Compare;
            return;
        }
    }

    // scan for the balancing close
    let mut depth: i32 = 1;
    let mut paren_depth: i32 = 0;
    let mut cur_opt = ts.next(open, Nav::Preproc);
    let mut end = None;
    while let Some(cur) = cur_opt {
        let tok = ts.tok(cur);
        if paren_depth == 0 {
            match tok.text.as_str() {
                "(" | "[" => paren_depth += 1,
                ")" | "]" => break,
                "<" => depth += 1,
                ">" => {
                    depth -= 1;
                    if depth == 0 {
                        end = Some(cur);
                        break;
                    }
                }
                ">>" => {
                    if depth < 2 {
                        break;
                    }
                    depth -= 2;
                    if depth == 0 {
                        end = Some(cur);
                        break;
                    }
                }
                _ => {}
            }
            if matches!(
                tok.kind,
                TokenKind::Semicolon
                    | TokenKind::VSemicolon
                    | TokenKind::BraceOpen
                    | TokenKind::BraceClose
                    | TokenKind::Bool
            ) {
                break;
            }
        } else {
            match tok.text.as_str() {
                "(" | "[" => paren_depth += 1,
                ")" | "]" => paren_depth -= 1,
                _ => {}
            }
            if paren_depth < 0 {
                break;
            }
        }
        cur_opt = ts.next(cur, Nav::Preproc);
    }

    let Some(end) = end else {
        ts.tok_mut(open).kind = TokenKind::Compare;
        return;
    };

    // split a '>>' so the outer list gets its own close
    let close = if ts.tok(end).text == ">>" {
        let line = ts.tok(end).line;
        let col = ts.tok(end).col;
        {
            let tok = ts.tok_mut(end);
            tok.kind = TokenKind::AngleClose;
            tok.text = ">".to_string();
            tok.col_end = col + 1;
        }
        let mut second = crate::token::Token::new(TokenKind::AngleClose, ">");
        second.line = line;
        second.col = col + 1;
        second.col_end = col + 2;
        second.flags |= TokenFlags::PUNCTUATOR;
        ts.insert_after(end, second)
    } else {
        end
    };

    ts.tok_mut(open).kind = TokenKind::AngleOpen;
    ts.tok_mut(open).parent = TokenKind::Template;
    ts.tok_mut(close).kind = TokenKind::AngleClose;
    ts.tok_mut(close).parent = TokenKind::Template;

    let mut cur_opt = ts.next(open, Nav::Preproc);
    while let Some(cur) = cur_opt {
        if cur == close {
            break;
        }
        ts.tok_mut(cur).flags |= TokenFlags::IN_TEMPLATE;
        cur_opt = ts.next(cur, Nav::Preproc);
    }
    ts.tok_mut(close).flags |= TokenFlags::IN_TEMPLATE;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::tokenize::tokenize;

    fn run(src: &str, lang: LangFlags) -> FileContext {
        let mut ctx = FileContext::new("test", lang, Config::default());
        tokenize(&mut ctx, src.as_bytes());
        tokenize_cleanup(&mut ctx);
        ctx
    }

    fn kinds(ctx: &FileContext) -> Vec<(TokenKind, String)> {
        ctx.tokens
            .ids()
            .map(|id| {
                let t = ctx.tokens.tok(id);
                (t.kind, t.text.clone())
            })
            .collect()
    }

    #[test]
    fn tsquare_fusion() {
        let ctx = run("int a[];", LangFlags::C);
        assert!(kinds(&ctx).contains(&(TokenKind::TSquare, "[]".into())));
        // non-empty brackets stay split
        let ctx = run("int a[3];", LangFlags::C);
        assert!(kinds(&ctx)
            .iter()
            .any(|(k, _)| *k == TokenKind::SquareOpen));
    }

    #[test]
    fn word_before_scope_is_a_type() {
        let ctx = run("std::vector v;", LangFlags::CPP);
        assert_eq!(kinds(&ctx)[0], (TokenKind::Type, "std".into()));
    }

    #[test]
    fn struct_tag_is_a_type() {
        let ctx = run("struct foo x;", LangFlags::C);
        assert_eq!(kinds(&ctx)[1], (TokenKind::Type, "foo".into()));
    }

    #[test]
    fn template_angles_are_detected() {
        let ctx = run("vector<int> v;", LangFlags::CPP);
        let ks = kinds(&ctx);
        assert!(ks.contains(&(TokenKind::AngleOpen, "<".into())));
        assert!(ks.contains(&(TokenKind::AngleClose, ">".into())));
    }

    #[test]
    fn comparisons_are_not_templates() {
        let ctx = run("if (a < b) { c = a > b; }", LangFlags::CPP);
        for (kind, text) in kinds(&ctx) {
            if text == "<" || text == ">" {
                assert_eq!(kind, TokenKind::Compare);
            }
        }
    }

    #[test]
    fn shift_right_splits_in_nested_template() {
        let ctx = run("map<int, vector<int>> m;", LangFlags::CPP);
        let closes = kinds(&ctx)
            .into_iter()
            .filter(|(k, _)| *k == TokenKind::AngleClose)
            .count();
        assert_eq!(closes, 2);
    }

    #[test]
    fn c_has_no_templates() {
        let ctx = run("x = a < b;", LangFlags::C);
        assert!(kinds(&ctx).contains(&(TokenKind::Compare, "<".into())));
    }

    #[test]
    fn operator_names() {
        let ctx = run("bool operator==(const T &o);", LangFlags::CPP);
        let ks = kinds(&ctx);
        assert!(ks.contains(&(TokenKind::OperatorVal, "==".into())));

        let ctx = run("R operator()(int x);", LangFlags::CPP);
        let ks = kinds(&ctx);
        assert!(ks.contains(&(TokenKind::OperatorVal, "()".into())));
    }

    #[test]
    fn exec_sql_markers() {
        let ctx = run("EXEC SQL SELECT a FROM t;", LangFlags::C);
        assert_eq!(kinds(&ctx)[0].0, TokenKind::SqlExec);
        let ctx = run("EXEC SQL BEGIN DECLARE SECTION;", LangFlags::C);
        assert_eq!(kinds(&ctx)[0].0, TokenKind::SqlBegin);
    }

    #[test]
    fn enum_class_tag() {
        let ctx = run("enum class Color : int { Red };", LangFlags::CPP);
        let ks = kinds(&ctx);
        assert!(ks.contains(&(TokenKind::EnumClass, "class".into())));
        assert!(ks.contains(&(TokenKind::Type, "Color".into())));
    }
}
