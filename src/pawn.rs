//! Pawn quirks.
//!
//! Pawn statements may end at a newline instead of a `;`, and functions have
//! no return type, so both get normalized here: virtual semicolons make
//! statement ends explicit, and a prescan classifies top-level functions
//! before the generic sweeps run.

use crate::context::FileContext;
use crate::stream::{Nav, TokenId, TokenStream};
use crate::token::{Token, TokenKind};

/// True when the token cannot end a statement.
fn continues_statement(kind: TokenKind) -> bool {
    matches!(
        kind,
        TokenKind::Comma
            | TokenKind::Assign
            | TokenKind::Arith
            | TokenKind::Caret
            | TokenKind::Bool
            | TokenKind::Compare
            | TokenKind::Not
            | TokenKind::Inv
            | TokenKind::Question
            | TokenKind::Colon
            | TokenKind::Plus
            | TokenKind::Minus
            | TokenKind::Star
            | TokenKind::Amp
            | TokenKind::Member
            | TokenKind::DcMember
            | TokenKind::BraceOpen
            | TokenKind::VBraceOpen
            | TokenKind::If
            | TokenKind::Else
            | TokenKind::ElseIf
            | TokenKind::Do
            | TokenKind::While
            | TokenKind::For
            | TokenKind::Switch
            | TokenKind::Case
            | TokenKind::Default
            | TokenKind::Return
            | TokenKind::Qualifier
    )
}

/// Called on a newline while a virtual brace is open: insert a virtual
/// semicolon after the statement's last token if the statement is complete.
/// Returns the inserted token so the caller can process it in stream order.
pub fn check_vsemicolon(ts: &mut TokenStream, newline: TokenId) -> Option<TokenId> {
    let prev = ts.prev_nnl(newline, Nav::All)?;
    let ptok = ts.tok(prev);
    if ptok.is_semicolon() || continues_statement(ptok.kind) {
        return None;
    }
    // still inside parens or brackets
    if ptok.level != ptok.brace_level {
        return None;
    }
    Some(insert_vsemi_after(ts, prev))
}

/// Insert a virtual semicolon directly after `at`.
pub fn insert_vsemi_after(ts: &mut TokenStream, at: TokenId) -> TokenId {
    let ptok = ts.tok(at);
    let mut vs = Token::new(TokenKind::VSemicolon, "");
    vs.line = ptok.line;
    vs.col = ptok.col_end;
    vs.col_end = ptok.col_end;
    vs.level = ptok.level;
    vs.brace_level = ptok.brace_level;
    vs.pp_level = ptok.pp_level;
    ts.insert_after(at, vs)
}

/// Classify top-level Pawn functions.
///
/// `foo(args) { }` at brace level zero is a definition; `native`, `forward`
/// and bare prototypes end without a body.
pub fn prescan(ctx: &mut FileContext) {
    let mut pc_opt = ctx.tokens.head();
    while let Some(pc) = pc_opt {
        pc_opt = ctx.tokens.next(pc, Nav::All);

        let tok = ctx.tokens.tok(pc);
        if tok.brace_level != 0
            || tok.level != 0
            || !tok.flags.contains(crate::token::TokenFlags::STMT_START)
            || tok.is_preproc()
        {
            continue;
        }

        // walk the statement head: qualifiers and a possible tag prefix
        let mut cur = pc;
        let mut steps = 0;
        let name = loop {
            steps += 1;
            if steps > 8 {
                break None;
            }
            let tok = ctx.tokens.tok(cur);
            match tok.kind {
                TokenKind::Qualifier | TokenKind::Type | TokenKind::Colon | TokenKind::TagColon => {
                    match ctx.tokens.next_nnl(cur, Nav::Preproc) {
                        Some(next) => cur = next,
                        None => break None,
                    }
                }
                TokenKind::Word | TokenKind::Function => {
                    let next = ctx.tokens.next_nnl(cur, Nav::Preproc);
                    match next.map(|n| ctx.tokens.tok(n).kind) {
                        Some(TokenKind::ParenOpen) => break Some((cur, next.unwrap())),
                        // a tag prefix: "Float:foo(...)"
                        Some(TokenKind::Colon) | Some(TokenKind::TagColon) => {
                            match ctx.tokens.next_nnl(next.unwrap(), Nav::Preproc) {
                                Some(after) => cur = after,
                                None => break None,
                            }
                        }
                        _ => break None,
                    }
                }
                _ => break None,
            }
        };

        let Some((name, popen)) = name else { continue };
        let Some(pclose) = ctx.tokens.skip_to_match(popen, Nav::Preproc) else {
            continue;
        };
        let after = ctx.tokens.next_nnl(pclose, Nav::Preproc);
        let kind = match after.map(|a| ctx.tokens.tok(a).kind) {
            Some(TokenKind::BraceOpen) => TokenKind::FuncDef,
            Some(TokenKind::Semicolon) | Some(TokenKind::VSemicolon) | None => TokenKind::FuncProto,
            // a definition body on the next line without braces still counts
            Some(_) => {
                if ctx
                    .tokens
                    .next(pclose, Nav::Preproc)
                    .is_some_and(|n| ctx.tokens.tok(n).is_newline())
                {
                    TokenKind::FuncDef
                } else {
                    continue;
                }
            }
        };
        ctx.tokens.tok_mut(name).kind = kind;
    }
}

/// Make statement ends explicit where a body relies on newline termination:
/// every virtual close brace is preceded by a (virtual) semicolon.
pub fn add_virtual_semicolons(ctx: &mut FileContext) {
    if !ctx.lang.intersects(crate::lang::LangFlags::PAWN) {
        return;
    }
    let mut pc_opt = ctx.tokens.head();
    while let Some(pc) = pc_opt {
        pc_opt = ctx.tokens.next(pc, Nav::All);
        if ctx.tokens.tok(pc).kind != TokenKind::VBraceClose {
            continue;
        }
        if let Some(prev) = ctx.tokens.prev_nnl(pc, Nav::All) {
            let ptok = ctx.tokens.tok(prev);
            if !ptok.is_semicolon()
                && !ptok.is_closing_brace()
                && !continues_statement(ptok.kind)
            {
                insert_vsemi_after(&mut ctx.tokens, prev);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::braces::brace_cleanup;
    use crate::cleanup::tokenize_cleanup;
    use crate::config::Config;
    use crate::lang::LangFlags;
    use crate::tokenize::tokenize;

    fn run(src: &str) -> FileContext {
        let mut ctx = FileContext::new("test.p", LangFlags::PAWN, Config::default());
        tokenize(&mut ctx, src.as_bytes());
        tokenize_cleanup(&mut ctx);
        brace_cleanup(&mut ctx);
        prescan(&mut ctx);
        ctx
    }

    fn kind_of(ctx: &FileContext, text: &str) -> TokenKind {
        ctx.tokens
            .ids()
            .find(|&id| ctx.tokens.tok(id).text == text)
            .map(|id| ctx.tokens.tok(id).kind)
            .unwrap()
    }

    #[test]
    fn top_level_function_is_a_definition() {
        let ctx = run("main()\n{\n    foo(1)\n}\n");
        assert_eq!(kind_of(&ctx, "main"), TokenKind::FuncDef);
    }

    #[test]
    fn native_is_a_prototype() {
        let ctx = run("native print(const text[]);\n");
        assert_eq!(kind_of(&ctx, "print"), TokenKind::FuncProto);
    }

    #[test]
    fn vsemicolon_after_unterminated_statement() {
        let ctx = run("main()\n{\n    if (a)\n        b = 1\n    c = 2\n}\n");
        let vsemis = ctx
            .tokens
            .ids()
            .filter(|&id| ctx.tokens.tok(id).kind == TokenKind::VSemicolon)
            .count();
        assert!(vsemis >= 1, "expected at least one virtual semicolon");
    }
}
