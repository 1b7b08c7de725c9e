//! C# attribute statements and properties, Java asserts, embedded SQL.

use crate::stream::{Nav, TokenId, TokenStream};
use crate::token::{TokenFlags, TokenKind};

use super::{make_type, set_paren_parent};

/// A C# `[...]` statement: `[assembly: xxx]`, `[AttributeUsage()]`.
pub(crate) fn handle_cs_square_stmt(ts: &mut TokenStream, os: TokenId) {
    let level = ts.tok(os).level;
    let mut cs_opt = ts.next(os, Nav::All);
    while let Some(cs) = cs_opt {
        if ts.tok(cs).level <= level {
            break;
        }
        cs_opt = ts.next(cs, Nav::All);
    }
    let Some(cs) = cs_opt else { return };
    if ts.tok(cs).kind != TokenKind::SquareClose {
        return;
    }

    ts.tok_mut(os).parent = TokenKind::CsSqStmt;
    ts.tok_mut(cs).parent = TokenKind::CsSqStmt;

    let mut cur = ts.next(os, Nav::All);
    while let Some(id) = cur {
        if id == cs {
            break;
        }
        ts.tok_mut(id).parent = TokenKind::CsSqStmt;
        if ts.tok(id).kind == TokenKind::Colon {
            ts.tok_mut(id).kind = TokenKind::CsSqColon;
        }
        cur = ts.next(id, Nav::All);
    }

    // whatever follows starts a fresh statement
    if let Some(after) = ts.next_nnl(cs, Nav::All) {
        ts.tok_mut(after).flags |= TokenFlags::STMT_START | TokenFlags::EXPR_START;
    }
}

/// A brace open preceded by a word or `]` is a C# property body.
pub(crate) fn handle_cs_property(ts: &mut TokenStream, bro: TokenId) {
    set_paren_parent(ts, bro, TokenKind::CsProperty);

    let level = ts.tok(bro).level;
    let mut did_prop = false;
    let mut cur = ts.prev_nnl(bro, Nav::All);
    while let Some(pc) = cur {
        if ts.tok(pc).level == level {
            if !did_prop
                && matches!(ts.tok(pc).kind, TokenKind::Word | TokenKind::This)
            {
                ts.tok_mut(pc).kind = TokenKind::CsProperty;
                did_prop = true;
            } else {
                ts.tok_mut(pc).parent = TokenKind::CsProperty;
                make_type(ts, pc);
            }
            if ts.tok(pc).flags.contains(TokenFlags::STMT_START) {
                break;
            }
        }
        cur = ts.prev_nnl(pc, Nav::All);
    }
}

/// Java: `assert EXP1 [: EXP2];` — tie the colon and semicolon to the
/// keyword.
pub(crate) fn handle_java_assert(ts: &mut TokenStream, pc: TokenId) {
    let level = ts.tok(pc).level;
    let mut did_colon = false;
    let mut tmp_opt = ts.next(pc, Nav::All);
    while let Some(tmp) = tmp_opt {
        if ts.tok(tmp).level == level {
            if !did_colon && ts.tok(tmp).kind == TokenKind::Colon {
                did_colon = true;
                ts.tok_mut(tmp).parent = TokenKind::Assert;
            }
            if ts.tok(tmp).kind == TokenKind::Semicolon {
                ts.tok_mut(tmp).parent = TokenKind::Assert;
                break;
            }
        }
        tmp_opt = ts.next(tmp, Nav::All);
    }
}

/// Embedded SQL: words up to the `;` belong to SQL, not C. `EXEC SQL
/// BEGIN`/`END` bracket a declare section whose contents sit one level
/// deeper.
pub(crate) fn mark_exec_sql(ts: &mut TokenStream, pc: TokenId) {
    let kind = ts.tok(pc).kind;

    let mut semi = None;
    let mut tmp_opt = ts.next(pc, Nav::All);
    while let Some(tmp) = tmp_opt {
        ts.tok_mut(tmp).parent = kind;
        if ts.tok(tmp).kind == TokenKind::Word {
            ts.tok_mut(tmp).kind = TokenKind::SqlWord;
        }
        if ts.tok(tmp).kind == TokenKind::Semicolon {
            semi = Some(tmp);
            break;
        }
        tmp_opt = ts.next(tmp, Nav::All);
    }

    if kind != TokenKind::SqlBegin {
        return;
    }
    let Some(semi) = semi else { return };

    let mut tmp_opt = ts.next(semi, Nav::All);
    while let Some(tmp) = tmp_opt {
        if ts.tok(tmp).kind == TokenKind::SqlEnd {
            break;
        }
        ts.tok_mut(tmp).level += 1;
        tmp_opt = ts.next(tmp, Nav::All);
    }
}
