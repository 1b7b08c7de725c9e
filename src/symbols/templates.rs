//! C++ templates, D templates, and C++11 lambdas.

use crate::stream::{Nav, TokenId, TokenStream};
use crate::token::{Token, TokenFlags, TokenKind};

use super::functions::fix_fcn_def_params;
use super::make_type;
use crate::context::FileContext;

/// We are on the C++ `template` keyword: tag the angle pair, turn
/// `class`/`struct` inside it into types, and extend the parent to the
/// declared entity.
pub(crate) fn handle_cpp_template(ts: &mut TokenStream, pc: TokenId) {
    let Some(open) = ts.next_nnl(pc, Nav::All) else {
        return;
    };
    if ts.tok(open).kind != TokenKind::AngleOpen {
        return;
    }
    ts.tok_mut(open).parent = TokenKind::Template;
    let level = ts.tok(open).level;

    let mut close = None;
    let mut tmp_opt = ts.next(open, Nav::All);
    while let Some(tmp) = tmp_opt {
        match ts.tok(tmp).kind {
            TokenKind::Class | TokenKind::Struct => {
                ts.tok_mut(tmp).kind = TokenKind::Type;
            }
            TokenKind::AngleClose if ts.tok(tmp).level == level => {
                ts.tok_mut(tmp).parent = TokenKind::Template;
                close = Some(tmp);
                break;
            }
            _ => {}
        }
        tmp_opt = ts.next(tmp, Nav::All);
    }

    if let Some(close) = close {
        let after = ts.next_nnl(close, Nav::All);
        if let Some(after) = after {
            if matches!(ts.tok(after).kind, TokenKind::Class | TokenKind::Struct) {
                ts.tok_mut(after).parent = TokenKind::Template;
                let semi = ts.next_kind(
                    after,
                    TokenKind::Semicolon,
                    Some(ts.tok(after).level),
                    Nav::All,
                );
                if let Some(semi) = semi {
                    ts.tok_mut(semi).parent = TokenKind::Template;
                }
            }
        }
    }
}

/// Collect the template parameter names of a D parenthesized type list.
/// Returns the close paren.
pub(crate) fn collect_d_template_types(
    ts: &mut TokenStream,
    open_paren: TokenId,
    names: &mut Vec<String>,
) -> Option<TokenId> {
    let level = ts.tok(open_paren).level;
    let mut maybe_type = true;
    let mut tmp_opt = ts.next_nnl(open_paren, Nav::All);
    while let Some(tmp) = tmp_opt {
        if ts.tok(tmp).level <= level {
            return Some(tmp);
        }
        match ts.tok(tmp).kind {
            TokenKind::Type | TokenKind::Word => {
                if maybe_type {
                    make_type(ts, tmp);
                    names.push(ts.tok(tmp).text.clone());
                }
                maybe_type = false;
            }
            TokenKind::Comma => maybe_type = true,
            _ => {}
        }
        tmp_opt = ts.next_nnl(tmp, Nav::All);
    }
    None
}

/// We are on the D `template` keyword:
/// `template NAME ( TYPELIST ) { BODY }`.
pub(crate) fn handle_d_template(ts: &mut TokenStream, pc: TokenId) {
    let Some(name) = ts.next_nnl(pc, Nav::All) else {
        return;
    };
    // the name may already have been promoted to a type
    if !matches!(ts.tok(name).kind, TokenKind::Word | TokenKind::Type) {
        return;
    }
    let Some(po) = ts.next_nnl(name, Nav::All) else {
        return;
    };
    if ts.tok(po).kind != TokenKind::ParenOpen {
        return;
    }

    ts.tok_mut(name).kind = TokenKind::Type;
    ts.tok_mut(name).parent = TokenKind::Template;
    ts.tok_mut(po).parent = TokenKind::Template;

    let mut names = Vec::new();
    let close = collect_d_template_types(ts, po, &mut names);
    let Some(close) = close else { return };
    if ts.tok(close).kind != TokenKind::ParenClose {
        return;
    }
    ts.tok_mut(close).parent = TokenKind::Template;

    let Some(body) = ts.next_nnl(close, Nav::All) else {
        return;
    };
    if ts.tok(body).kind != TokenKind::BraceOpen {
        return;
    }
    ts.tok_mut(body).parent = TokenKind::Template;

    let body_level = ts.tok(body).level;
    let mut tmp_opt = ts.next_nnl(body, Nav::All);
    while let Some(tmp) = tmp_opt {
        if ts.tok(tmp).level <= body_level {
            if ts.tok(tmp).kind == TokenKind::BraceClose {
                ts.tok_mut(tmp).parent = TokenKind::Template;
            }
            break;
        }
        if ts.tok(tmp).kind == TokenKind::Word && names.contains(&ts.tok(tmp).text) {
            ts.tok_mut(tmp).kind = TokenKind::Type;
        }
        tmp_opt = ts.next_nnl(tmp, Nav::All);
    }
}

/// Verify and mark a C++ lambda: `[...](...){...}` or
/// `[...](...) -> type {...}`.
pub(crate) fn handle_cpp_lambda(ctx: &mut FileContext, sq_o: TokenId) {
    let ts = &mut ctx.tokens;

    let sq_c = if ts.tok(sq_o).kind == TokenKind::SquareOpen {
        match ts.skip_to_match(sq_o, Nav::All) {
            Some(c) => Some(c),
            None => return,
        }
    } else {
        None // a fused '[]'
    };

    let capture_end = sq_c.unwrap_or(sq_o);
    let Some(pa_o) = ts.next_nnl(capture_end, Nav::All) else {
        return;
    };
    if ts.tok(pa_o).kind != TokenKind::ParenOpen {
        return;
    }
    let Some(pa_c) = ts.skip_to_match(pa_o, Nav::All) else {
        return;
    };

    let mut br_o = match ts.next_nnl(pa_c, Nav::All) {
        Some(b) => b,
        None => return,
    };
    if ts.tok(br_o).is_str("mutable") {
        br_o = match ts.next_nnl(br_o, Nav::All) {
            Some(b) => b,
            None => return,
        };
    }

    let mut ret = None;
    if ts.tok(br_o).is_str("->") {
        ret = Some(br_o);
        br_o = match ts.next_kind(
            br_o,
            TokenKind::BraceOpen,
            Some(ts.tok(br_o).level),
            Nav::All,
        ) {
            Some(b) => b,
            None => return,
        };
    }
    if ts.tok(br_o).kind != TokenKind::BraceOpen {
        return;
    }
    let Some(br_c) = ts.skip_to_match(br_o, Nav::All) else {
        return;
    };

    // it's a lambda: split a fused '[]' back into two tokens so the capture
    // list has real delimiters
    let sq_c = match sq_c {
        Some(c) => c,
        None => {
            let line = ts.tok(sq_o).line;
            let col = ts.tok(sq_o).col;
            let level = ts.tok(sq_o).level;
            {
                let tok = ts.tok_mut(sq_o);
                tok.kind = TokenKind::SquareOpen;
                tok.text = "[".to_string();
                tok.col_end = col + 1;
            }
            let mut close = Token::new(TokenKind::SquareClose, "]");
            close.line = line;
            close.col = col + 1;
            close.col_end = col + 2;
            close.level = level;
            close.flags |= TokenFlags::PUNCTUATOR;
            ts.insert_after(sq_o, close)
        }
    };

    ts.tok_mut(sq_o).parent = TokenKind::CppLambda;
    ts.tok_mut(sq_c).parent = TokenKind::CppLambda;
    ts.tok_mut(pa_o).kind = TokenKind::FParenOpen;
    ts.tok_mut(pa_o).parent = TokenKind::CppLambda;
    ts.tok_mut(pa_c).kind = TokenKind::FParenClose;
    ts.tok_mut(pa_c).parent = TokenKind::CppLambda;
    ts.tok_mut(br_o).parent = TokenKind::CppLambda;
    ts.tok_mut(br_c).parent = TokenKind::CppLambda;

    if let Some(ret) = ret {
        ts.tok_mut(ret).kind = TokenKind::CppLambdaRet;
        let mut cur = ts.next_nnl(ret, Nav::All);
        while let Some(t) = cur {
            if t == br_o {
                break;
            }
            make_type(ts, t);
            cur = ts.next_nnl(t, Nav::All);
        }
    }

    fix_fcn_def_params(ctx, Some(pa_o));
}
