//! Objective-C constructs: classes, blocks, message declarations and sends.

use log::warn;

use crate::context::FileContext;
use crate::lang::LangFlags;
use crate::stream::{Nav, TokenId, TokenStream};
use crate::token::{TokenFlags, TokenKind};

use super::functions::{fix_fcn_def_params, mark_function_return_type};
use super::{flag_parens, make_type, set_paren_parent};

/// Process an ObjC class marker (`@interface`, `@implementation`,
/// `@protocol`): protocol lists, scopes, colons, until `@end`.
pub(crate) fn handle_oc_class(ts: &mut TokenStream, pc: TokenId) {
    if ts.tok(pc).parent == TokenKind::OcProtocol {
        let tmp = ts.next_nnl(pc, Nav::All);
        if let Some(tmp) = tmp {
            if ts.tok(tmp).is_semicolon() {
                // forward protocol declaration
                ts.tok_mut(tmp).parent = TokenKind::OcProtocol;
                return;
            }
        }
    }

    // the class name itself is a type definition
    if let Some(name) = ts.next_nnl(pc, Nav::All) {
        if matches!(ts.tok(name).kind, TokenKind::Word | TokenKind::Type) {
            ts.tok_mut(name).kind = TokenKind::Type;
            ts.tok_mut(name).parent = TokenKind::OcClass;
            ts.tok_mut(name).flags |= TokenFlags::DEF;
        }
    }

    let mut hit_scope = false;
    let mut do_pl = 1;
    let mut tmp_opt = ts.next_nnl(pc, Nav::All);
    while let Some(tmp) = tmp_opt {
        let kind = ts.tok(tmp).kind;
        if kind == TokenKind::OcEnd {
            break;
        }
        if do_pl == 1 && ts.tok(tmp).is_str("<") {
            ts.tok_mut(tmp).kind = TokenKind::AngleOpen;
            ts.tok_mut(tmp).parent = TokenKind::OcProtoList;
            do_pl = 2;
        }
        if do_pl == 2 && ts.tok(tmp).is_str(">") {
            ts.tok_mut(tmp).kind = TokenKind::AngleClose;
            ts.tok_mut(tmp).parent = TokenKind::OcProtoList;
            do_pl = 0;
        }
        if ts.tok(tmp).kind == TokenKind::BraceOpen {
            do_pl = 0;
            ts.tok_mut(tmp).parent = TokenKind::OcClass;
            tmp_opt = ts.next_kind(
                tmp,
                TokenKind::BraceClose,
                Some(ts.tok(tmp).level),
                Nav::All,
            );
            if let Some(close) = tmp_opt {
                ts.tok_mut(close).parent = TokenKind::OcClass;
            }
        } else if ts.tok(tmp).kind == TokenKind::Colon {
            ts.tok_mut(tmp).kind = if hit_scope {
                TokenKind::OcColon
            } else {
                TokenKind::ClassColon
            };
            if ts.tok(tmp).kind == TokenKind::ClassColon {
                ts.tok_mut(tmp).parent = TokenKind::OcClass;
            }
        } else if ts.tok(tmp).is_str("-") || ts.tok(tmp).is_str("+") {
            do_pl = 0;
            let prev_is_nl = ts
                .prev(tmp, Nav::All)
                .is_some_and(|p| ts.tok(p).is_newline());
            if prev_is_nl {
                ts.tok_mut(tmp).kind = TokenKind::OcScope;
                ts.tok_mut(tmp).flags |= TokenFlags::STMT_START;
                hit_scope = true;
            }
        }
        if do_pl == 2 {
            ts.tok_mut(tmp).parent = TokenKind::OcProtoList;
        }
        tmp_opt = tmp_opt.and_then(|t| ts.next_nnl(t, Nav::All));
    }

    if let Some(tmp) = tmp_opt {
        if ts.tok(tmp).kind == TokenKind::BraceOpen {
            let close = ts.next_kind(
                tmp,
                TokenKind::BraceClose,
                Some(ts.tok(tmp).level),
                Nav::All,
            );
            if let Some(close) = close {
                ts.tok_mut(close).parent = TokenKind::OcClass;
            }
        }
    }
}

/// A block literal: `^ RTYPE ( ARGS ) { ... }`; RTYPE and ARGS optional.
pub(crate) fn handle_oc_block_literal(ts: &mut TokenStream, _lang: LangFlags, pc: TokenId) {
    let Some(next) = ts.next_nnl(pc, Nav::All) else {
        return;
    };
    if ts.prev_nnl(pc, Nav::All).is_none() {
        return;
    }

    // scan forward: the open brace at the caret's level ends the search
    let level = ts.tok(pc).level;
    let mut apo: Option<TokenId> = None;
    let mut bbo: Option<TokenId> = None;
    let mut tmp_opt = Some(next);
    while let Some(tmp) = tmp_opt {
        let tok = ts.tok(tmp);
        if tok.level < level || tok.kind == TokenKind::Semicolon {
            break;
        }
        if tok.level == level {
            if tok.is_paren_open() {
                apo = Some(tmp);
            }
            if tok.kind == TokenKind::BraceOpen {
                bbo = Some(tmp);
                break;
            }
        }
        tmp_opt = ts.next_nnl(tmp, Nav::All);
    }

    let Some(bbo) = bbo else { return };
    let Some(bbc) = ts.skip_to_match(bbo, Nav::All) else {
        return;
    };

    ts.tok_mut(pc).kind = TokenKind::OcBlockCaret;
    ts.tok_mut(pc).parent = TokenKind::OcBlockExpr;

    // optional args
    let lbp = if let Some(apo) = apo {
        let apc = ts.skip_to_match(apo, Nav::All);
        if apc.is_some_and(|c| ts.tok(c).is_paren_close()) {
            flag_parens(
                ts,
                apo,
                TokenFlags::OC_ATYPE,
                TokenKind::FParenOpen,
                TokenKind::OcBlockExpr,
                true,
            );
        }
        ts.prev_nnl(apo, Nav::All)
    } else {
        ts.prev_nnl(bbo, Nav::All)
    };

    // optional return type
    let mut lbp = lbp;
    while let Some(l) = lbp {
        if l == pc {
            break;
        }
        make_type(ts, l);
        ts.tok_mut(l).flags |= TokenFlags::OC_RTYPE;
        ts.tok_mut(l).parent = TokenKind::OcBlockExpr;
        lbp = ts.prev_nnl(l, Nav::All);
    }

    ts.tok_mut(bbo).parent = TokenKind::OcBlockExpr;
    ts.tok_mut(bbc).parent = TokenKind::OcBlockExpr;
}

/// A block type: `RTYPE (^LABEL)(ARGS)`; triggered on `( ^`.
pub(crate) fn handle_oc_block_type(ctx: &mut FileContext, pc: TokenId) {
    let ts = &mut ctx.tokens;
    if ts.tok(pc).flags.contains(TokenFlags::IN_TYPEDEF) {
        // typedef'd block types ride the typedef path
        return;
    }

    let Some(tpo) = ts.prev_nnl(pc, Nav::All) else {
        return;
    };
    if !ts.tok(tpo).is_paren_open() {
        return;
    }
    let Some(tpc) = ts.skip_to_match(tpo, Nav::All) else {
        return;
    };
    let Some(nam) = ts.prev_nnl(tpc, Nav::All) else {
        return;
    };
    let Some(apo) = ts.next_nnl(tpc, Nav::All) else {
        return;
    };
    let Some(apc) = ts.skip_to_match(apo, Nav::All) else {
        return;
    };
    if !ts.tok(apc).is_paren_close() {
        return;
    }

    let aft = ts.next_nnl(apc, Nav::All);
    let pt;
    if ts.tok(nam).is_str("^") {
        ts.tok_mut(nam).kind = TokenKind::PtrType;
        pt = TokenKind::FuncType;
    } else if aft.is_some_and(|a| {
        matches!(ts.tok(a).kind, TokenKind::Assign | TokenKind::Semicolon)
    }) {
        ts.tok_mut(nam).kind = TokenKind::FuncVar;
        pt = TokenKind::FuncVar;
    } else {
        ts.tok_mut(nam).kind = TokenKind::FuncType;
        pt = TokenKind::FuncType;
    }

    ts.tok_mut(pc).kind = TokenKind::PtrType;
    ts.tok_mut(pc).parent = pt;
    ts.tok_mut(tpo).kind = TokenKind::TParenOpen;
    ts.tok_mut(tpo).parent = pt;
    ts.tok_mut(tpc).kind = TokenKind::TParenClose;
    ts.tok_mut(tpc).parent = pt;
    ts.tok_mut(apo).kind = TokenKind::FParenOpen;
    ts.tok_mut(apo).parent = TokenKind::FuncProto;
    ts.tok_mut(apc).kind = TokenKind::FParenClose;
    ts.tok_mut(apc).parent = TokenKind::FuncProto;
    fix_fcn_def_params(ctx, Some(apo));
    let ts = &mut ctx.tokens;
    let before = ts.prev_nnl(tpo, Nav::All);
    mark_function_return_type(ts, nam, before, pt);
}

/// A type enclosed in parens inside a message decl. Returns the token after
/// the close paren.
fn handle_oc_md_type(
    ts: &mut TokenStream,
    paren_open: TokenId,
    ptype: TokenKind,
    flags: TokenFlags,
) -> Option<TokenId> {
    if !ts.tok(paren_open).is_paren_open() {
        return None;
    }
    let close = ts.skip_to_match(paren_open, Nav::All)?;

    ts.tok_mut(paren_open).parent = ptype;
    ts.tok_mut(paren_open).flags |= flags;
    ts.tok_mut(close).parent = ptype;
    ts.tok_mut(close).flags |= flags;

    let mut cur = ts.next_nnl(paren_open, Nav::All);
    while let Some(id) = cur {
        if id == close {
            break;
        }
        ts.tok_mut(id).flags |= flags;
        make_type(ts, id);
        cur = ts.next_nnl(id, Nav::All);
    }

    ts.next_nnl(close, Nav::All)
}

/// An ObjC message spec or declaration:
/// `-(TYPE) name[:(TYPE)arg [label:(TYPE)arg ...]] ;|{`
pub(crate) fn handle_oc_message_decl(ts: &mut TokenStream, pc: TokenId) {
    // spec ends with ';', declaration with '{'
    let level = ts.tok(pc).level;
    let mut tmp_opt = ts.next_nnl(pc, Nav::All);
    while let Some(tmp) = tmp_opt {
        let tok = ts.tok(tmp);
        if tok.level < level {
            return; // should not happen
        }
        if matches!(tok.kind, TokenKind::Semicolon | TokenKind::BraceOpen) {
            break;
        }
        tmp_opt = ts.next_nnl(tmp, Nav::All);
    }
    let Some(end) = tmp_opt else { return };
    let pt = if ts.tok(end).kind == TokenKind::Semicolon {
        TokenKind::OcMsgSpec
    } else {
        TokenKind::OcMsgDecl
    };

    ts.tok_mut(pc).kind = TokenKind::OcScope;
    ts.tok_mut(pc).parent = pt;

    // return type
    let Some(rt) = ts.next_nnl(pc, Nav::All) else {
        return;
    };
    let Some(after_rt) = handle_oc_md_type(ts, rt, pt, TokenFlags::OC_RTYPE) else {
        warn!("line {}: missing type parens", ts.tok(pc).line);
        return;
    };

    // method name / first label
    if ts.tok(after_rt).kind != TokenKind::Word {
        warn!("line {}: missing method name", ts.tok(after_rt).line);
        return;
    }
    let label = after_rt;
    ts.tok_mut(label).kind = pt;
    ts.tok_mut(label).parent = pt;

    let Some(mut cur) = ts.next_nnl(label, Nav::All) else {
        return;
    };

    // a colon next means arguments follow
    if matches!(ts.tok(cur).kind, TokenKind::Colon | TokenKind::OcColon) {
        cur = label;
        loop {
            // optional label
            if ts.tok(cur).kind == TokenKind::Word || ts.tok(cur).kind == pt {
                ts.tok_mut(cur).parent = pt;
                match ts.next_nnl(cur, Nav::All) {
                    Some(n) => cur = n,
                    None => break,
                }
            }
            // a colon must be next
            if !ts.tok(cur).is_str(":") {
                break;
            }
            ts.tok_mut(cur).kind = TokenKind::OcColon;
            ts.tok_mut(cur).parent = pt;
            let Some(type_paren) = ts.next_nnl(cur, Nav::All) else {
                break;
            };

            // the argument type in parens
            let Some(arg) = handle_oc_md_type(ts, type_paren, pt, TokenFlags::OC_ATYPE) else {
                warn!(
                    "line {}: expected a type",
                    ts.tok(type_paren).line
                );
                break;
            };
            // now on the argument name
            ts.tok_mut(arg).flags |= TokenFlags::VAR_DEF;
            match ts.next_nnl(arg, Nav::All) {
                Some(n) => cur = n,
                None => break,
            }
        }
    }

    let fin = cur;
    if ts.tok(fin).kind == TokenKind::BraceOpen {
        ts.tok_mut(fin).parent = pt;
        if let Some(close) = ts.skip_to_match(fin, Nav::All) {
            ts.tok_mut(close).parent = pt;
        }
    } else if ts.tok(fin).kind == TokenKind::Semicolon {
        ts.tok_mut(fin).parent = pt;
    }
}

/// An ObjC message send: `[ receiver selector: arg ... ]`.
pub(crate) fn handle_oc_message_send(ts: &mut TokenStream, os: TokenId) {
    // find the matching close square
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

    if let Some(semi) = ts.next_nnl(cs, Nav::All) {
        if ts.tok(semi).is_semicolon() {
            ts.tok_mut(semi).parent = TokenKind::OcMsg;
        }
    }

    ts.tok_mut(os).parent = TokenKind::OcMsg;
    ts.tok_mut(os).flags |= TokenFlags::IN_OC_MSG;
    ts.tok_mut(cs).parent = TokenKind::OcMsg;
    ts.tok_mut(cs).flags |= TokenFlags::IN_OC_MSG;

    // the receiver: a word, a nested send, or a function call
    let Some(mut tmp) = ts.next_nnl(os, Nav::All) else {
        return;
    };
    if ts.tok(tmp).kind == TokenKind::SquareOpen {
        tmp = match ts.skip_to_match(tmp, Nav::All) {
            Some(t) => t,
            None => return,
        };
    } else if !matches!(ts.tok(tmp).kind, TokenKind::Word | TokenKind::Type) {
        return;
    } else {
        let tt = ts.next_nnl(tmp, Nav::All);
        if tt.is_some_and(|t| ts.tok(t).is_paren_open()) {
            ts.tok_mut(tmp).kind = TokenKind::FuncCall;
            let after = set_paren_parent(ts, tt.unwrap(), TokenKind::FuncCall);
            tmp = match after.and_then(|a| ts.prev_nnl(a, Nav::All)) {
                Some(t) => t,
                None => return,
            };
        } else {
            ts.tok_mut(tmp).kind = TokenKind::OcMsgClass;
        }
    }

    // optional '<protocol>' list
    let mut tmp_opt = ts.next_nnl(tmp, Nav::All);
    if tmp_opt.is_some_and(|t| ts.tok(t).is_str("<")) {
        let ao = tmp_opt.unwrap();
        let ac = ts.next_str(ao, ">", Some(ts.tok(ao).level), Nav::All);
        if let Some(ac) = ac {
            ts.tok_mut(ao).kind = TokenKind::AngleOpen;
            ts.tok_mut(ao).parent = TokenKind::OcProtoList;
            ts.tok_mut(ac).kind = TokenKind::AngleClose;
            ts.tok_mut(ac).parent = TokenKind::OcProtoList;
            let mut cur = ts.next(ao, Nav::All);
            while let Some(id) = cur {
                if id == ac {
                    break;
                }
                ts.tok_mut(id).level += 1;
                ts.tok_mut(id).parent = TokenKind::OcProtoList;
                cur = ts.next(id, Nav::All);
            }
            tmp_opt = ts.next_nnl(ac, Nav::All);
        }
    }

    if let Some(t) = tmp_opt {
        if matches!(ts.tok(t).kind, TokenKind::Word | TokenKind::Type) {
            ts.tok_mut(t).kind = TokenKind::OcMsgFunc;
        }
    }

    // flag the body, marking named parameters
    let mut prev_opt: Option<TokenId> = None;
    let mut cur = ts.next(os, Nav::All);
    while let Some(id) = cur {
        if id == cs {
            break;
        }
        ts.tok_mut(id).flags |= TokenFlags::IN_OC_MSG;
        if ts.tok(id).level == ts.tok(cs).level + 1
            && ts.tok(id).kind == TokenKind::Colon
        {
            ts.tok_mut(id).kind = TokenKind::OcColon;
            if let Some(prev) = prev_opt {
                if matches!(ts.tok(prev).kind, TokenKind::Word | TokenKind::Type) {
                    // might be a named param, check what is before it
                    let pp = ts.prev(prev, Nav::All);
                    let named = pp.is_some_and(|p| {
                        !matches!(
                            ts.tok(p).kind,
                            TokenKind::OcColon | TokenKind::Arith | TokenKind::Caret
                        )
                    });
                    if named {
                        ts.tok_mut(prev).kind = TokenKind::OcMsgName;
                        ts.tok_mut(id).parent = TokenKind::OcMsgName;
                    }
                }
            }
        }
        prev_opt = Some(id);
        cur = ts.next(id, Nav::All);
    }
}
