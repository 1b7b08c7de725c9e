//! C cast and C++ named-cast detection.

use crate::stream::{Nav, TokenId, TokenStream};
use crate::token::{TokenFlags, TokenKind};

use super::{is_ucase_str, make_type, set_paren_parent};

/// Check whether a paren pair is a C cast.
///
/// The contents may only be type-ish tokens with at most one bare word;
/// single-word contents get the ALL-CAPS / `_t` tie-breaks, and the token
/// after the close must read like an operand.
pub(crate) fn fix_casts(ts: &mut TokenStream, start: TokenId) {
    let prev = ts.prev_nnl(start, Nav::All);
    if prev.is_some_and(|p| ts.tok(p).kind == TokenKind::PpDefined) {
        return; // defined(x) is not a cast
    }

    // only WORD, TYPE, qualifiers and pointers up to the close paren
    let mut count = 0;
    let mut word_count = 0;
    let mut last: Option<TokenId> = None;
    let first = ts.next_nnl(start, Nav::All);
    let mut pc_opt = first;
    while let Some(pc) = pc_opt {
        let tok = ts.tok(pc);
        let allowed = tok.is_type_like()
            || matches!(
                tok.kind,
                TokenKind::Word | TokenKind::Qualifier | TokenKind::DcMember
            )
            || tok.kind == TokenKind::Star
            || tok.kind == TokenKind::Amp;
        if !allowed {
            break;
        }
        match tok.kind {
            TokenKind::Word => word_count += 1,
            TokenKind::DcMember => word_count -= 1,
            _ => {}
        }
        last = Some(pc);
        pc_opt = ts.next_nnl(pc, Nav::All);
        count += 1;
    }

    let Some(paren_close) = pc_opt else { return };
    if ts.tok(paren_close).kind != TokenKind::ParenClose
        || prev.is_some_and(|p| ts.tok(p).kind == TokenKind::OcClass)
    {
        return;
    }
    if word_count > 1 {
        return;
    }
    let Some(last) = last else { return };

    let mut doubtful_cast = false;
    let certain = matches!(
        ts.tok(last).kind,
        TokenKind::Star | TokenKind::PtrType | TokenKind::Type
    );

    if !certain && count == 1 {
        // a single word: guess from naming conventions
        let text = ts.tok(last).text.clone();
        let ends_t = text.len() > 3 && text.ends_with("_t");
        if !ends_t && !is_ucase_str(&text) {
            doubtful_cast = true;
        }

        // the token after the close decides operand-ness
        let Some(pc) = ts.next_nnl(paren_close, Nav::All) else {
            return;
        };
        let mut after = Some(pc);
        loop {
            after = after.and_then(|a| ts.next_nnl(a, Nav::All));
            if !after.is_some_and(|a| ts.tok(a).kind == TokenKind::ParenOpen) {
                break;
            }
        }
        let Some(after) = after else { return };

        let ptok_kind = ts.tok(pc).kind;
        let after_kind = ts.tok(after).kind;
        let mut nope = false;
        if ts.tok(pc).is_star() || ts.tok(pc).is_addr() {
            // star and addr are ambiguous
            if matches!(
                after_kind,
                TokenKind::Number | TokenKind::NumberFp | TokenKind::String
            ) || doubtful_cast
            {
                nope = true;
            }
        } else if ptok_kind == TokenKind::Minus {
            // (UINT8)-1 is a cast, (foo)-"x" is not
            if after_kind == TokenKind::String || doubtful_cast {
                nope = true;
            }
        } else if ptok_kind == TokenKind::Plus {
            // (UINT8)+1
            if !matches!(after_kind, TokenKind::Number | TokenKind::NumberFp) || doubtful_cast {
                nope = true;
            }
        } else if !matches!(
            ptok_kind,
            TokenKind::Number
                | TokenKind::NumberFp
                | TokenKind::Word
                | TokenKind::Type
                | TokenKind::ParenOpen
                | TokenKind::String
                | TokenKind::Sizeof
                | TokenKind::FuncCall
                | TokenKind::FuncCallUser
                | TokenKind::Function
                | TokenKind::BraceOpen
        ) {
            return;
        }
        if nope {
            return;
        }
    }

    // a "cast" followed by a semicolon, comma or close paren is not one
    let Some(after_close) = ts.next_nnl(paren_close, Nav::All) else {
        return;
    };
    if ts.tok(after_close).is_semicolon()
        || ts.tok(after_close).kind == TokenKind::Comma
        || ts.tok(after_close).is_paren_close()
    {
        return;
    }

    ts.tok_mut(start).parent = TokenKind::CCast;
    ts.tok_mut(paren_close).parent = TokenKind::CCast;

    let mut pc_opt = first;
    while let Some(pc) = pc_opt {
        if pc == paren_close {
            break;
        }
        ts.tok_mut(pc).parent = TokenKind::CCast;
        make_type(ts, pc);
        pc_opt = ts.next_nnl(pc, Nav::All);
    }

    // the operand starts an expression
    if let Some(op) = ts.next_nnl(paren_close, Nav::All) {
        ts.tok_mut(op).flags |= TokenFlags::EXPR_START;
        if ts.tok(op).is_opening_brace() {
            set_paren_parent(ts, op, TokenKind::CCast);
        }
    }
}

/// `static_cast<...>(...)`: the angles hold a type, the parens a value.
pub(crate) fn fix_type_cast(ts: &mut TokenStream, start: TokenId) {
    let Some(mut pc) = ts.next_nnl(start, Nav::All) else {
        return;
    };
    if ts.tok(pc).kind != TokenKind::AngleOpen {
        return;
    }
    let level = ts.tok(start).level;

    loop {
        let Some(next) = ts.next_nnl(pc, Nav::All) else {
            return;
        };
        pc = next;
        if ts.tok(pc).level < level {
            return;
        }
        if ts.tok(pc).level == level && ts.tok(pc).kind == TokenKind::AngleClose {
            let Some(paren) = ts.next_nnl(pc, Nav::All) else {
                return;
            };
            if ts.tok(paren).is_str("(") {
                set_paren_parent(ts, paren, TokenKind::TypeCast);
            }
            return;
        }
        make_type(ts, pc);
    }
}
