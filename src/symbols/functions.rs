//! Function classification: call vs. prototype vs. definition vs.
//! constructor-variable, function pointers, constructors, namespaces.

use log::warn;

use crate::context::FileContext;
use crate::lang::LangFlags;
use crate::stream::{Nav, TokenId, TokenStream};
use crate::token::{TokenFlags, TokenKind};

use super::{
    chunk_ends_type, flag_parens, make_type, set_paren_parent, skip_attribute_next,
    skip_attribute_prev, skip_template_next, skip_template_prev,
};

/// Walk backwards from `pc`, marking the return type and picking up
/// storage-class hints.
pub(crate) fn mark_function_return_type(
    ts: &mut TokenStream,
    the_type: TokenId,
    start: Option<TokenId>,
    parent: TokenKind,
) {
    let mut cur = start;
    while let Some(pc) = cur {
        let tok = ts.tok(pc);
        let usable = (tok.is_type_like()
            || tok.kind == TokenKind::Operator
            || tok.kind == TokenKind::Word
            || tok.kind == TokenKind::Addr)
            && !tok.is_preproc();
        if !usable {
            break;
        }

        if tok.kind == TokenKind::Qualifier {
            if tok.is_str("extern") {
                if ts.tok(the_type).flags.contains(TokenFlags::VAR_DEF) {
                    let t = ts.tok_mut(the_type);
                    t.flags.remove(TokenFlags::VAR_DEF);
                    t.flags |= TokenFlags::VAR_DECL;
                }
            } else if tok.is_str("static") {
                ts.tok_mut(the_type).flags |= TokenFlags::STATIC;
            }
        }

        if parent != TokenKind::None {
            ts.tok_mut(pc).parent = parent;
        }
        make_type(ts, pc);
        cur = ts.prev_nnl(pc, Nav::All);
    }
}

/// Simply change any `*` to `PTR_TYPE` and words to types between the
/// parens of a function signature, and tag the parameter names.
pub(crate) fn fix_fcn_def_params(ctx: &mut FileContext, start: Option<TokenId>) {
    let lang = ctx.lang;
    let ts = &mut ctx.tokens;

    // find the open paren; a missing one makes this a no-op
    let mut start_opt = start;
    while let Some(id) = start_opt {
        if ts.tok(id).is_paren_open() {
            break;
        }
        if ts.tok(id).is_semicolon() || ts.tok(id).kind == TokenKind::BraceOpen {
            return;
        }
        start_opt = ts.next_nnl(id, Nav::All);
    }
    let Some(start) = start_opt else { return };

    let level = ts.tok(start).level + 1;
    let mut cs: Vec<TokenId> = Vec::new();

    let mut pc_opt = ts.next_nnl(start, Nav::All);
    while let Some(pc) = pc_opt {
        let tok = ts.tok(pc);
        if tok.level < level {
            break;
        }
        if tok.level > level || tok.is_preproc() {
            pc_opt = ts.next_nnl(pc, Nav::All);
            continue;
        }
        if tok.is_star() {
            ts.tok_mut(pc).kind = TokenKind::PtrType;
            cs.push(pc);
        } else if tok.kind == TokenKind::Amp
            || (lang.intersects(LangFlags::CPP) && tok.is_str("&&"))
        {
            ts.tok_mut(pc).kind = TokenKind::Byref;
            cs.push(pc);
        } else if matches!(
            tok.kind,
            TokenKind::TypeWrap | TokenKind::Word | TokenKind::Type
        ) {
            cs.push(pc);
        } else if matches!(tok.kind, TokenKind::Comma | TokenKind::Assign) {
            super::types::mark_variable_stack(ts, &mut cs);
            if ts.tok(pc).kind == TokenKind::Assign {
                // default parameter value
                ts.tok_mut(pc).parent = TokenKind::FuncProto;
            }
        }
        pc_opt = ts.next_nnl(pc, Nav::All);
    }
    super::types::mark_variable_stack(ts, &mut cs);
}

/// Process `T (*name)(args)` shapes that are not inside a typedef.
/// `pc` points at the first close paren.
pub(crate) fn mark_function_type(ctx: &mut FileContext, pc: TokenId) -> bool {
    let lang = ctx.lang;
    let ts = &mut ctx.tokens;

    let mut star_count = 0;
    let mut word_count = 0;
    let mut ptrcnk: Option<TokenId> = None;
    let mut anon = false;

    // the name can only be a word and a single star
    let varcnk = ts.prev_nnl(pc, Nav::All);
    let var_ok = varcnk.is_some_and(|v| ts.tok(v).is_word_like());
    if !var_ok {
        let caret = varcnk.filter(|&v| {
            lang.intersects(LangFlags::OC)
                && ts.tok(v).is_str("^")
                && ts
                    .prev_nnl(v, Nav::All)
                    .is_some_and(|p| ts.tok(p).is_paren_open())
        });
        if caret.is_some() {
            // anonymous ObjC block type: RTYPE (^)(ARGS)
            anon = true;
        } else {
            return nogo_exit(ts, pc);
        }
    }
    let varcnk = varcnk.unwrap();

    let Some(apo) = ts.next_nnl(pc, Nav::All) else {
        return nogo_exit(ts, pc);
    };
    if !ts.tok(apo).is_paren_open() {
        return nogo_exit(ts, pc);
    }
    let Some(apc) = ts.skip_to_match(apo, Nav::All) else {
        return nogo_exit(ts, pc);
    };

    let aft = ts.next_nnl(apc, Nav::All);
    let pt = match aft.map(|a| ts.tok(a).kind) {
        Some(TokenKind::BraceOpen) => TokenKind::FuncDef,
        Some(TokenKind::Semicolon) | Some(TokenKind::VSemicolon) | Some(TokenKind::Assign) => {
            TokenKind::FuncProto
        }
        _ => return nogo_exit(ts, pc),
    };
    let in_typedef = ts.tok(pc).flags.contains(TokenFlags::IN_TYPEDEF);
    let ptp = if in_typedef {
        TokenKind::FuncType
    } else {
        TokenKind::FuncVar
    };

    // scan back over the name and stars to the inner open paren
    let mut tmp_opt = ts.prev_nnl(pc, Nav::All);
    let mut inner_ok = false;
    while let Some(tmp) = tmp_opt {
        let tok = ts.tok(tmp);
        if tok.is_star() || tok.kind == TokenKind::PtrType || tok.kind == TokenKind::Caret {
            star_count += 1;
            ptrcnk = Some(tmp);
        } else if tok.is_word_like() || matches!(tok.kind, TokenKind::Word | TokenKind::Type) {
            word_count += 1;
        } else if tok.kind == TokenKind::DcMember {
            word_count = 0;
        } else if tok.is_str("(") {
            inner_ok = true;
            break;
        } else {
            return nogo_exit(ts, pc);
        }
        tmp_opt = ts.prev_nnl(tmp, Nav::All);
    }

    if !inner_ok || star_count > 1 || word_count > 1 || (star_count + word_count) == 0 {
        return nogo_exit(ts, pc);
    }

    // what comes before the inner paren must end a return type
    let before = tmp_opt.and_then(|t| ts.prev_nnl(t, Nav::All));
    if !chunk_ends_type(ts, before) {
        return nogo_exit(ts, pc);
    }

    if let Some(ptr) = ptrcnk {
        ts.tok_mut(ptr).kind = TokenKind::PtrType;
    }
    if !anon {
        if in_typedef {
            ts.tok_mut(varcnk).kind = TokenKind::FuncType;
        } else {
            ts.tok_mut(varcnk).kind = TokenKind::FuncVar;
            ts.tok_mut(varcnk).flags |= TokenFlags::VAR_DEF;
        }
    }
    ts.tok_mut(pc).kind = TokenKind::TParenClose;
    ts.tok_mut(pc).parent = ptp;

    ts.tok_mut(apo).kind = TokenKind::FParenOpen;
    ts.tok_mut(apo).parent = pt;
    ts.tok_mut(apc).kind = TokenKind::FParenClose;
    ts.tok_mut(apc).parent = pt;
    fix_fcn_def_params(ctx, Some(apo));
    let ts = &mut ctx.tokens;

    if let Some(aft) = aft {
        if ts.tok(aft).is_semicolon() {
            ts.tok_mut(aft).parent = if ts.tok(aft).flags.contains(TokenFlags::IN_TYPEDEF) {
                TokenKind::Typedef
            } else {
                TokenKind::FuncVar
            };
        } else if ts.tok(aft).kind == TokenKind::BraceOpen {
            flag_parens(ts, aft, TokenFlags::empty(), TokenKind::None, pt, false);
        }
    }

    // step back to the inner open paren and mark the return type
    let mut tmp_opt = ts.prev_nnl(pc, Nav::All);
    while let Some(tmp) = tmp_opt {
        if ts.tok(tmp).is_str("(") {
            if !in_typedef {
                ts.tok_mut(tmp).flags |= TokenFlags::VAR_DEF;
            }
            ts.tok_mut(tmp).kind = TokenKind::TParenOpen;
            ts.tok_mut(tmp).parent = ptp;

            let prev = ts.prev_nnl(tmp, Nav::All);
            if let Some(prev) = prev {
                if matches!(
                    ts.tok(prev).kind,
                    TokenKind::Function
                        | TokenKind::FuncCall
                        | TokenKind::FuncCallUser
                        | TokenKind::FuncDef
                        | TokenKind::FuncProto
                ) {
                    ts.tok_mut(prev).kind = TokenKind::Type;
                    ts.tok_mut(prev).flags.remove(TokenFlags::VAR_DEF);
                }
            }
            mark_function_return_type(ts, varcnk, prev, ptp);
            break;
        }
        tmp_opt = ts.prev_nnl(tmp, Nav::All);
    }
    true
}

fn nogo_exit(ts: &mut TokenStream, pc: TokenId) -> bool {
    let tmp = ts.next_nnl(pc, Nav::All);
    if let Some(tmp) = tmp {
        if ts.tok(tmp).is_paren_open() {
            flag_parens(
                ts,
                tmp,
                TokenFlags::empty(),
                TokenKind::FParenOpen,
                TokenKind::FuncCall,
                false,
            );
        }
    }
    false
}

/// Could this bracketed run be a formal parameter?
pub(crate) fn can_be_full_param(
    ts: &TokenStream,
    lang: LangFlags,
    start: TokenId,
    end: TokenId,
) -> bool {
    let mut word_cnt = 0;
    let mut type_count = 0;

    let mut pc_opt = Some(start);
    let mut last = None;
    while let Some(pc) = pc_opt {
        if pc == end {
            break;
        }
        let tok = ts.tok(pc);
        match tok.kind {
            TokenKind::Qualifier
            | TokenKind::Struct
            | TokenKind::Enum
            | TokenKind::Union
            | TokenKind::Typename => return true,
            TokenKind::Word | TokenKind::Type => {
                word_cnt += 1;
                if tok.kind == TokenKind::Type {
                    type_count += 1;
                }
            }
            TokenKind::Member | TokenKind::DcMember => {
                if word_cnt > 0 {
                    word_cnt -= 1;
                }
            }
            TokenKind::Assign => break, // default value
            TokenKind::AngleOpen => return true,
            TokenKind::Ellipsis => return true,
            TokenKind::ParenOpen if word_cnt == 0 => {
                // old-school proto param "(type)"
                let Some(close) = ts.skip_to_match(pc, Nav::Preproc) else {
                    return false;
                };
                let after = ts.next_nnl(close, Nav::Preproc);
                let ok = after.is_some_and(|a| {
                    ts.tok(a).kind == TokenKind::Comma || ts.tok(a).is_paren_close()
                });
                if !ok {
                    return false;
                }
                last = Some(close);
                pc_opt = ts.next_nnl(close, Nav::Preproc);
                word_cnt = 1;
                type_count = 1;
                continue;
            }
            TokenKind::ParenOpen if word_cnt == 1 || word_cnt == type_count => {
                // "void (*name)" or "void (*name)(params)"
                let tmp1 = ts.next_nnl(pc, Nav::Preproc);
                let tmp2 = tmp1.and_then(|t| ts.next_nnl(t, Nav::Preproc));
                let tmp3 = tmp2.and_then(|t| ts.next_nnl(t, Nav::Preproc));
                let shape_ok = tmp3.is_some_and(|t| ts.tok(t).is_str(")"))
                    && tmp1.is_some_and(|t| ts.tok(t).is_str("*"))
                    && tmp2.is_some_and(|t| ts.tok(t).kind == TokenKind::Word);
                if !shape_ok {
                    return false;
                }
                let mut after = tmp3.and_then(|t| ts.next_nnl(t, Nav::Preproc));
                if after.is_some_and(|t| ts.tok(t).is_str("(")) {
                    after = ts.skip_to_match(after.unwrap(), Nav::Preproc);
                }
                last = after;
                pc_opt = after.and_then(|t| ts.next_nnl(t, Nav::Preproc));
                word_cnt = 1;
                type_count = 1;
                continue;
            }
            TokenKind::TSquare => {}
            TokenKind::SquareOpen if word_cnt == 1 => {
                // skip over array dimensions
                let close = ts.skip_to_match(pc, Nav::Preproc);
                last = close;
                pc_opt = close.and_then(|c| ts.next_nnl(c, Nav::Preproc));
                continue;
            }
            _ if pc != start && (tok.is_star() || tok.is_addr()) => {}
            _ if word_cnt == 1 && lang.intersects(LangFlags::CPP) && tok.is_str("&&") => {} // move reference
            _ => return false,
        }
        last = Some(pc);
        pc_opt = ts.next_nnl(pc, Nav::Preproc);
    }

    if last.is_some_and(|l| ts.tok(l).is_star() || ts.tok(l).is_addr()) {
        return true;
    }
    word_cnt >= 2 || (word_cnt == 1 && type_count == 1)
}

/// We are on a token known to be a function. Decide what kind.
pub(crate) fn mark_function(ctx: &mut FileContext, pc: TokenId) {
    let lang = ctx.lang;
    let ts = &mut ctx.tokens;

    let mut prev = ts.prev_nnl_np(pc);
    let mut next = match ts.next_nnl_np(pc) {
        Some(n) => n,
        None => return,
    };

    // operator functions look left for context
    if ts.tok(pc).parent == TokenKind::Operator {
        let pc_op = ts.prev_kind(pc, TokenKind::Operator, Some(ts.tok(pc).level), Nav::All);
        if pc_op.is_some_and(|op| ts.tok(op).flags.contains(TokenFlags::EXPR_START)) {
            ts.tok_mut(pc).kind = TokenKind::FuncCall;
        }
        if lang.intersects(LangFlags::CPP) {
            let mut tmp_opt = ts.prev_nnl(pc, Nav::All);
            let mut stop = None;
            while let Some(tmp) = tmp_opt {
                match ts.tok(tmp).kind {
                    TokenKind::BraceClose | TokenKind::Semicolon => {
                        stop = Some(tmp);
                        break;
                    }
                    TokenKind::Assign => {
                        ts.tok_mut(pc).kind = TokenKind::FuncCall;
                        stop = Some(tmp);
                        break;
                    }
                    TokenKind::Template => {
                        ts.tok_mut(pc).kind = TokenKind::FuncDef;
                        stop = Some(tmp);
                        break;
                    }
                    TokenKind::BraceOpen => {
                        match ts.tok(tmp).parent {
                            TokenKind::FuncDef => ts.tok_mut(pc).kind = TokenKind::FuncCall,
                            TokenKind::Class | TokenKind::Struct => {
                                ts.tok_mut(pc).kind = TokenKind::FuncDef
                            }
                            _ => {}
                        }
                        stop = Some(tmp);
                        break;
                    }
                    _ => {}
                }
                tmp_opt = ts.prev_nnl(tmp, Nav::All);
            }
            if let Some(stop) = stop {
                if ts.tok(pc).kind != TokenKind::FuncCall {
                    // mark the return type
                    let mut tmp_opt = ts.next_nnl(stop, Nav::All);
                    while let Some(tmp) = tmp_opt {
                        if tmp == pc {
                            break;
                        }
                        make_type(ts, tmp);
                        tmp_opt = ts.next_nnl(tmp, Nav::All);
                    }
                }
            }
        }
    }

    if ts.tok(next).is_star() || ts.tok(next).is_addr() {
        next = match ts.next_nnl_np(next) {
            Some(n) => n,
            None => return,
        };
    }

    if ts.tok(pc).flags.contains(TokenFlags::IN_CONST_ARGS) {
        ts.tok_mut(pc).kind = TokenKind::FuncCtorVar;
        let n = skip_template_next(ts, Some(next));
        if let Some(n) = n {
            flag_parens(
                ts,
                n,
                TokenFlags::empty(),
                TokenKind::FParenOpen,
                TokenKind::FuncCtorVar,
                true,
            );
        }
        return;
    }

    // skip over any template and attribute madness
    let next = skip_template_next(ts, Some(next));
    let next = skip_attribute_next(ts, next);
    let Some(next) = next else { return };

    let level = ts.tok(pc).level;
    let Some(paren_open) = ts.next_str(pc, "(", Some(level), Nav::All) else {
        warn!(
            "no parens found for '{}' on line {}",
            ts.tok(pc).text,
            ts.tok(pc).line
        );
        return;
    };
    let Some(paren_close) = ts.next_str(paren_open, ")", Some(level), Nav::All) else {
        return;
    };

    // a close paren directly followed by parens is either a chained call or
    // a function pointer definition: MYTYPE (*func)(void);
    let tmp = ts.next_nnl(paren_close, Nav::All);
    if tmp.is_some_and(|t| ts.tok(t).is_str("(")) {
        let tmp = tmp.unwrap();
        // skip a leading class/namespace chain in "T (F::*A)();"
        let mut tmp1 = ts.next_nnl(next, Nav::All);
        while let Some(t1) = tmp1 {
            let t2 = ts.next_nnl(t1, Nav::All);
            if !ts.tok(t1).is_word_like()
                || !t2.is_some_and(|t| ts.tok(t).kind == TokenKind::DcMember)
            {
                break;
            }
            tmp1 = t2.and_then(|t| ts.next_nnl(t, Nav::All));
        }

        let mut tmp2 = tmp1.and_then(|t| ts.next_nnl(t, Nav::All));
        let tmp3 = if tmp2.is_some_and(|t| ts.tok(t).is_str(")")) {
            let t = tmp2;
            tmp2 = None;
            t
        } else {
            tmp2.and_then(|t| ts.next_nnl(t, Nav::All))
        };

        let caret_ok = lang.intersects(LangFlags::OC)
            && tmp1.is_some_and(|t| ts.tok(t).kind == TokenKind::Caret);
        if tmp3.is_some_and(|t| ts.tok(t).is_str(")"))
            && (tmp1.is_some_and(|t| ts.tok(t).is_star()) || caret_ok)
            && (tmp2.is_none() || tmp2.is_some_and(|t| ts.tok(t).kind == TokenKind::Word))
        {
            if let Some(t2) = tmp2 {
                // function variable
                ts.tok_mut(t2).kind = TokenKind::FuncVar;
                flag_parens(
                    ts,
                    paren_open,
                    TokenFlags::empty(),
                    TokenKind::ParenOpen,
                    TokenKind::FuncVar,
                    false,
                );
            } else {
                // function type
                flag_parens(
                    ts,
                    paren_open,
                    TokenFlags::empty(),
                    TokenKind::ParenOpen,
                    TokenKind::FuncType,
                    false,
                );
            }
            ts.tok_mut(pc).kind = TokenKind::Type;
            ts.tok_mut(pc).flags.remove(TokenFlags::VAR_DEF);
            if let Some(t1) = tmp1 {
                ts.tok_mut(t1).kind = TokenKind::PtrType;
            }
            if let Some(t2) = tmp2 {
                ts.tok_mut(t2).flags |= TokenFlags::VAR_DEF;
            }
            flag_parens(
                ts,
                tmp,
                TokenFlags::empty(),
                TokenKind::FParenOpen,
                TokenKind::FuncProto,
                false,
            );
            fix_fcn_def_params(ctx, Some(tmp));
            return;
        }
    }

    // assume a call if not already labeled
    if ts.tok(pc).kind == TokenKind::Function {
        ts.tok_mut(pc).kind = if ts.tok(pc).parent == TokenKind::Operator {
            TokenKind::FuncDef
        } else {
            TokenKind::FuncCall
        };
    }

    // C++ constructor/destructor outside the class body: Foo::Foo, ~Foo
    if ts.tok(pc).kind == TokenKind::FuncClass
        || prev.is_some_and(|p| {
            matches!(ts.tok(p).kind, TokenKind::DcMember | TokenKind::Inv)
        })
    {
        if prev.is_some_and(|p| ts.tok(p).kind == TokenKind::Inv) {
            let p = prev.unwrap();
            ts.tok_mut(p).kind = TokenKind::Destructor;
            ts.tok_mut(pc).kind = TokenKind::FuncClass;
            ts.tok_mut(pc).parent = TokenKind::Destructor;
            prev = ts.prev_nnl_np(p);
        }

        if prev.is_some_and(|p| ts.tok(p).kind == TokenKind::DcMember) {
            let mut owner = ts.prev_nnl_np(prev.unwrap());
            owner = skip_template_prev(ts, owner);
            owner = skip_attribute_prev(ts, owner);
            if let Some(owner_id) = owner {
                if matches!(ts.tok(owner_id).kind, TokenKind::Word | TokenKind::Type) {
                    if ts.tok(pc).text == ts.tok(owner_id).text {
                        ts.tok_mut(pc).kind = TokenKind::FuncClass;
                        mark_cpp_constructor(ctx, pc);
                        return;
                    }
                    // step past the class qualifier
                    prev = ts.prev_nnl_np(owner_id);
                }
            }
        }
    }
    let ts = &mut ctx.tokens;

    // decide call vs. def/proto by scanning what comes before
    if ts.tok(pc).kind == TokenKind::FuncCall
        && (ts.tok(pc).level == ts.tok(pc).brace_level || ts.tok(pc).level == 1)
        && !ts.tok(pc).flags.contains(TokenFlags::IN_ARRAY_ASSIGN)
    {
        let mut isa_def = false;
        let mut hit_star = false;
        let mut prev_opt = prev;

        while let Some(p) = prev_opt {
            let ptok = ts.tok(p);
            if ptok.is_preproc() {
                prev_opt = ts.prev_nnl_np(p);
                continue;
            }

            // attributes slip between the type and the name
            if ptok.kind == TokenKind::FParenClose && ptok.parent == TokenKind::Attribute {
                prev_opt = skip_attribute_prev(ts, Some(p));
                continue;
            }

            // const(TYPE) is definitely a return type
            if ptok.kind == TokenKind::ParenClose && ptok.parent == TokenKind::DCast {
                isa_def = true;
                break;
            }

            if matches!(ptok.kind, TokenKind::DcMember | TokenKind::Member) {
                let owner = ts.prev_nnl_np(p);
                let ok = owner.is_some_and(|o| {
                    matches!(
                        ts.tok(o).kind,
                        TokenKind::Word | TokenKind::Type | TokenKind::This
                    )
                });
                if !ok {
                    ts.tok_mut(pc).kind = TokenKind::FuncCall;
                    isa_def = false;
                    break;
                }
                prev_opt = owner.and_then(|o| ts.prev_nnl_np(o));
                continue;
            }

            if matches!(ts.tok(p).kind, TokenKind::Type | TokenKind::Word) {
                if !hit_star {
                    isa_def = true;
                    break;
                }
                isa_def = true;
            }

            if ts.tok(p).is_addr() || ts.tok(p).is_star() {
                hit_star = true;
            }

            let ptok = ts.tok(p);
            let keeps_scanning = matches!(
                ptok.kind,
                TokenKind::Operator
                    | TokenKind::TSquare
                    | TokenKind::AngleClose
                    | TokenKind::Qualifier
                    | TokenKind::Type
                    | TokenKind::Word
            ) || ptok.is_addr()
                || ptok.is_star();
            if !keeps_scanning {
                // some tokens almost never precede a proto or def
                if matches!(
                    ptok.kind,
                    TokenKind::Arith
                        | TokenKind::Assign
                        | TokenKind::Comma
                        | TokenKind::String
                        | TokenKind::StringMulti
                        | TokenKind::Number
                        | TokenKind::NumberFp
                ) {
                    isa_def = false;
                }
                break;
            }

            prev_opt = if ts.tok(p).kind == TokenKind::AngleClose {
                skip_template_prev(ts, Some(p))
            } else {
                ts.prev_nnl_np(p)
            };
        }

        if isa_def
            && prev_opt.is_some_and(|p| {
                let ptok = ts.tok(p);
                (ptok.is_paren_close() && ptok.parent != TokenKind::DCast)
                    || ptok.kind == TokenKind::Assign
                    || ptok.kind == TokenKind::Return
            })
        {
            isa_def = false;
        }
        if isa_def {
            ts.tok_mut(pc).kind = TokenKind::FuncDef;
            let start = prev_opt.or(ts.head());
            if let Some(start) = start {
                let mut tmp = Some(start);
                while let Some(t) = tmp {
                    if t == pc {
                        break;
                    }
                    make_type(ts, t);
                    tmp = ts.next_nnl(t, Nav::All);
                }
            }
        }
    }

    if ts.tok(pc).kind != TokenKind::FuncDef {
        let tmp = flag_parens(
            ts,
            next,
            TokenFlags::IN_FCN_CALL,
            TokenKind::FParenOpen,
            TokenKind::FuncCall,
            false,
        );
        if let Some(t) = tmp {
            if ts.tok(t).kind == TokenKind::BraceOpen {
                let k = ts.tok(pc).kind;
                set_paren_parent(ts, t, k);
            }
        }
        return;
    }

    // we have a definition or prototype; scan forward to find out which
    let mut semi: Option<TokenId> = None;
    let mut tmp_opt = ts.next_nnl(paren_close, Nav::All);
    while let Some(t) = tmp_opt {
        let tok = ts.tok(t);
        if tok.level < ts.tok(pc).level {
            // no semicolon: guess prototype
            ts.tok_mut(pc).kind = TokenKind::FuncProto;
            break;
        } else if tok.level == ts.tok(pc).level {
            if tok.kind == TokenKind::BraceOpen {
                break; // a definition for sure
            }
            if tok.is_semicolon() {
                semi = Some(t);
                ts.tok_mut(pc).kind = TokenKind::FuncProto;
                break;
            }
            if tok.kind == TokenKind::Comma {
                ts.tok_mut(pc).kind = TokenKind::FuncCtorVar;
                break;
            }
        }
        tmp_opt = ts.next_nnl(t, Nav::All);
    }

    // C++: a "prototype" at function scope with non-type args is really a
    // variable with constructor arguments
    if lang.intersects(LangFlags::CPP)
        && ts.tok(pc).kind == TokenKind::FuncProto
        && ts.tok(pc).parent != TokenKind::Operator
    {
        let mut is_param = true;
        let mut ref_id = ts.next_nnl(paren_open, Nav::All);
        let mut tmp_opt = ref_id;
        let inner_level = ts.tok(paren_open).level + 1;
        while let Some(t) = tmp_opt {
            if t == paren_close {
                break;
            }
            let t2 = ts.next_nnl(t, Nav::All);
            if ts.tok(t).kind == TokenKind::Comma && ts.tok(t).level == inner_level {
                if !can_be_full_param(ts, lang, ref_id.unwrap(), t) {
                    is_param = false;
                    break;
                }
                ref_id = t2;
            }
            tmp_opt = t2;
        }
        if is_param {
            if let Some(r) = ref_id {
                if r != paren_close && !can_be_full_param(ts, lang, r, paren_close) {
                    is_param = false;
                }
            }
        }
        if !is_param {
            ts.tok_mut(pc).kind = TokenKind::FuncCtorVar;
        } else if ts.tok(pc).brace_level > 0 {
            // the brace that opened the enclosing scope
            let target = ts.tok(pc).brace_level - 1;
            let mut br_open = None;
            let mut cur = ts.prev(pc, Nav::All);
            while let Some(b) = cur {
                if ts.tok(b).kind == TokenKind::BraceOpen && ts.tok(b).brace_level == target {
                    br_open = Some(b);
                    break;
                }
                cur = ts.prev(b, Nav::All);
            }

            if let Some(br) = br_open {
                if ts.tok(br).parent != TokenKind::Extern
                    && ts.tok(br).parent != TokenKind::Namespace
                {
                    // inside a function body: ctor variable unless the
                    // enclosing scope is a class/struct/namespace
                    let p = ts.prev_nnl(pc, Nav::All);
                    let ptr_before = p.is_some_and(|p| {
                        ts.tok(p).is_str("*") || ts.tok(p).is_str("&")
                    });
                    if !ptr_before
                        && !matches!(
                            ts.tok(br).parent,
                            TokenKind::Class | TokenKind::Struct | TokenKind::Namespace
                        )
                    {
                        ts.tok_mut(pc).kind = TokenKind::FuncCtorVar;
                    }
                }
            }
        }
    }
    let ts = &mut ctx.tokens;

    if let Some(semi) = semi {
        let k = ts.tok(pc).kind;
        ts.tok_mut(semi).parent = k;
    }

    let fkind = ts.tok(pc).kind;
    flag_parens(
        ts,
        paren_open,
        TokenFlags::IN_FCN_DEF,
        TokenKind::FParenOpen,
        fkind,
        false,
    );

    if fkind == TokenKind::FuncCtorVar {
        ts.tok_mut(pc).flags |= TokenFlags::VAR_DEF;
        return;
    }

    let next = if ts.tok(next).kind == TokenKind::TSquare {
        match ts.next_nnl(next, Nav::All) {
            Some(n) => n,
            None => return,
        }
    } else {
        next
    };

    // mark parameters and return type
    fix_fcn_def_params(ctx, Some(next));
    let ts = &mut ctx.tokens;
    let prev_of_pc = ts.prev_nnl(pc, Nav::All);
    mark_function_return_type(ts, pc, prev_of_pc, fkind);

    // find the brace pair and set the parent
    if ts.tok(pc).kind == TokenKind::FuncDef {
        let tmp = ts.next_nnl(paren_close, Nav::Preproc);
        if let Some(t) = tmp {
            if ts.tok(t).kind == TokenKind::BraceOpen {
                ts.tok_mut(t).parent = TokenKind::FuncDef;
                if let Some(close) = ts.skip_to_match(t, Nav::All) {
                    ts.tok_mut(close).parent = TokenKind::FuncDef;
                }
            }
        }
    }
}

/// Mark a constructor/destructor and its initializer list.
pub(crate) fn mark_cpp_constructor(ctx: &mut FileContext, pc: TokenId) {
    let ts = &mut ctx.tokens;

    if let Some(tmp) = ts.prev_nnl(pc, Nav::All) {
        if ts.tok(tmp).kind == TokenKind::Inv {
            ts.tok_mut(tmp).kind = TokenKind::Destructor;
            ts.tok_mut(pc).parent = TokenKind::Destructor;
        }
    }

    let paren_open = skip_template_next(ts, ts.next_nnl(pc, Nav::All));
    let Some(paren_open) = paren_open else { return };
    if !ts.tok(paren_open).is_str("(") {
        warn!(
            "line {}: expected '(', got '{}'",
            ts.tok(paren_open).line,
            ts.tok(paren_open).text
        );
        return;
    }

    fix_fcn_def_params(ctx, Some(paren_open));
    let ts = &mut ctx.tokens;
    flag_parens(
        ts,
        paren_open,
        TokenFlags::IN_FCN_CALL,
        TokenKind::FParenOpen,
        TokenKind::FuncClass,
        false,
    );

    // scan to the brace open, marking the initializer list
    let init_level = ts.tok(paren_open).level;
    let mut hit_colon = false;
    let mut tmp_opt = Some(paren_open);
    while let Some(tmp) = tmp_opt {
        let tok = ts.tok(tmp);
        if tok.kind == TokenKind::BraceOpen || tok.is_semicolon() {
            break;
        }
        ts.tok_mut(tmp).flags |= TokenFlags::IN_CONST_ARGS;
        tmp_opt = ts.next_nnl(tmp, Nav::All);
        let Some(tmp) = tmp_opt else { break };

        if ts.tok(tmp).is_str(":") && ts.tok(tmp).level == init_level {
            ts.tok_mut(tmp).kind = TokenKind::ConstrColon;
            hit_colon = true;
        }
        if hit_colon
            && (ts.tok(tmp).is_paren_open() || ts.tok(tmp).is_opening_brace())
            && ts.tok(tmp).level == init_level
        {
            let var = skip_template_prev(ts, ts.prev_nnl(tmp, Nav::All));
            if let Some(var) = var {
                if matches!(ts.tok(var).kind, TokenKind::Type | TokenKind::Word) {
                    ts.tok_mut(var).kind = TokenKind::FuncCtorVar;
                    flag_parens(
                        ts,
                        tmp,
                        TokenFlags::IN_FCN_CALL,
                        TokenKind::FParenOpen,
                        TokenKind::FuncCtorVar,
                        false,
                    );
                }
            }
        }
    }
    if let Some(tmp) = tmp_opt {
        if ts.tok(tmp).kind == TokenKind::BraceOpen {
            set_paren_parent(ts, tmp, TokenKind::FuncClass);
            ts.tok_mut(pc).flags |= TokenFlags::DEF;
        } else {
            ts.tok_mut(pc).flags |= TokenFlags::PROTO;
        }
    } else {
        ts.tok_mut(pc).flags |= TokenFlags::PROTO;
    }
}

/// We're on a class/struct: find its name, base list and body, and flag
/// constructors by name match.
pub(crate) fn mark_class_ctor(ctx: &mut FileContext, start: TokenId) {
    let lang = ctx.lang;
    let ts = &mut ctx.tokens;

    let Some(mut pclass) = ts.next_nnl(start, Nav::Preproc) else {
        return;
    };
    if !matches!(ts.tok(pclass).kind, TokenKind::Type | TokenKind::Word) {
        return;
    }

    let mut next_opt = ts.next_nnl(pclass, Nav::Preproc);
    while let Some(next) = next_opt {
        if !matches!(
            ts.tok(next).kind,
            TokenKind::Type | TokenKind::Word | TokenKind::DcMember
        ) {
            break;
        }
        pclass = next;
        next_opt = ts.next_nnl(next, Nav::Preproc);
    }

    let Some(mut pc) = ts.next_nnl(pclass, Nav::Preproc) else {
        return;
    };
    let body_level = ts.tok(pclass).brace_level + 1;

    let mut names: Vec<String> = vec![ts.tok(pclass).text.clone()];

    // D template class: "class foo(x) { ... }"
    if lang.intersects(LangFlags::D) && ts.tok(pc).kind == TokenKind::ParenOpen {
        ts.tok_mut(pc).parent = TokenKind::Template;
        if let Some(close) = super::templates::collect_d_template_types(ts, pc, &mut names) {
            if ts.tok(close).kind == TokenKind::ParenClose {
                ts.tok_mut(close).parent = TokenKind::Template;
            }
        }
    }

    // find the open brace, abort on a semicolon
    let mut flags = TokenFlags::empty();
    loop {
        let tok = ts.tok(pc);
        if tok.kind == TokenKind::BraceOpen {
            break;
        }
        if ts.tok(pc).is_str(":") {
            ts.tok_mut(pc).kind = TokenKind::ClassColon;
            flags |= TokenFlags::IN_CLASS_BASE;
        }
        if ts.tok(pc).is_semicolon() {
            ts.tok_mut(pclass).flags |= TokenFlags::PROTO;
            return;
        }
        ts.tok_mut(pc).flags |= flags;
        match ts.next_nnl(pc, Nav::Preproc) {
            Some(n) => pc = n,
            None => return,
        }
    }

    ts.tok_mut(pclass).flags |= TokenFlags::DEF;
    let start_kind = ts.tok(start).kind;
    set_paren_parent(ts, pc, start_kind);

    let body_start = ts.next_nnl(pc, Nav::Preproc);
    mark_class_body(ctx, body_start, body_level, start_kind, names);
}

/// Walk a class body, flagging membership and catching constructors by
/// name match.
fn mark_class_body(
    ctx: &mut FileContext,
    mut pc_opt: Option<TokenId>,
    body_level: u32,
    start_kind: TokenKind,
    names: Vec<String>,
) {
    while let Some(cur) = pc_opt {
        let ts = &mut ctx.tokens;
        ts.tok_mut(cur).flags |= TokenFlags::IN_CLASS;

        let tok = ts.tok(cur);
        if tok.brace_level > body_level || tok.is_preproc() {
            pc_opt = ts.next_nnl(cur, Nav::All);
            continue;
        }

        if tok.kind == TokenKind::BraceClose && tok.brace_level < body_level {
            let after = ts.next_nnl(cur, Nav::Preproc);
            if let Some(after) = after {
                if ts.tok(after).kind == TokenKind::Semicolon {
                    ts.tok_mut(after).parent = start_kind;
                }
            }
            return;
        }

        let next = ts.next_nnl(cur, Nav::Preproc);
        if names.contains(&ts.tok(cur).text) {
            if next.is_some_and(|n| ts.tok(n).is_str("(")) {
                ts.tok_mut(cur).kind = TokenKind::FuncClass;
                mark_cpp_constructor(ctx, cur);
            } else {
                make_type(&mut ctx.tokens, cur);
            }
        }
        pc_opt = next;
    }
}

///// We're on a 'namespace': flag the name and the braced body.
pub(crate) fn mark_namespace(ts: &mut TokenStream, pns: TokenId) {
    let mut is_using = false;
    if let Some(prev) = ts.prev_nnl(pns, Nav::All) {
        if ts.tok(prev).kind == TokenKind::Using {
            is_using = true;
            ts.tok_mut(pns).parent = TokenKind::Using;
        }
    }

    let mut pc_opt = ts.next_nnl(pns, Nav::All);
    if let Some(pc) = pc_opt {
        if ts.tok(pc).kind == TokenKind::Word {
            ts.tok_mut(pc).flags |= if is_using {
                TokenFlags::REF
            } else {
                TokenFlags::DEF
            };
        }
    }
    while let Some(pc) = pc_opt {
        ts.tok_mut(pc).parent = TokenKind::Namespace;
        if ts.tok(pc).kind != TokenKind::BraceOpen {
            if ts.tok(pc).kind == TokenKind::Semicolon {
                if is_using {
                    ts.tok_mut(pc).parent = TokenKind::Using;
                }
                return;
            }
            pc_opt = ts.next_nnl(pc, Nav::All);
            continue;
        }

        flag_parens(
            ts,
            pc,
            TokenFlags::IN_NAMESPACE,
            TokenKind::None,
            TokenKind::Namespace,
            false,
        );
        return;
    }
}

/// A word followed by a template argument list: call, definition, or
/// variable type, depending on what follows the close angle.
pub(crate) fn mark_template_func(ctx: &mut FileContext, pc: TokenId, pc_next: TokenId) {
    let ts = &mut ctx.tokens;
    let Some(angle_close) = ts.next_kind(
        pc_next,
        TokenKind::AngleClose,
        Some(ts.tok(pc).level),
        Nav::All,
    ) else {
        return;
    };

    let Some(after) = ts.next_nnl(angle_close, Nav::All) else {
        return;
    };
    if ts.tok(after).is_str("(") {
        if ts.tok(angle_close).flags.contains(TokenFlags::IN_FCN_CALL) {
            ts.tok_mut(pc).kind = TokenKind::FuncCall;
            flag_parens(
                ts,
                after,
                TokenFlags::IN_FCN_CALL,
                TokenKind::FParenOpen,
                TokenKind::FuncCall,
                false,
            );
        } else {
            // might be a definition; mark_function decides
            ts.tok_mut(pc).kind = TokenKind::FuncCall;
            mark_function(ctx, pc);
        }
    } else if ts.tok(after).kind == TokenKind::Word {
        ts.tok_mut(pc).kind = TokenKind::Type;
        ts.tok_mut(pc).flags |= TokenFlags::VAR_TYPE;
        ts.tok_mut(after).flags |= TokenFlags::VAR_DEF;
    }
}

/// Collapse `WRAP(name)` into a single synthesized token.
pub(crate) fn handle_wrap(ts: &mut TokenStream, pc: TokenId) {
    let opp = ts.next(pc, Nav::All);
    let name = opp.and_then(|id| ts.next(id, Nav::All));
    let clp = name.and_then(|id| ts.next(id, Nav::All));

    let (Some(opp), Some(name), Some(clp)) = (opp, name, clp) else {
        return;
    };
    if ts.tok(opp).kind != TokenKind::ParenOpen
        || !matches!(ts.tok(name).kind, TokenKind::Word | TokenKind::Type)
        || ts.tok(clp).kind != TokenKind::ParenClose
    {
        return;
    }

    let inner = ts.tok(name).text.clone();
    let tok = ts.tok_mut(pc);
    tok.text.push('(');
    tok.text.push_str(&inner);
    tok.text.push(')');
    tok.kind = if tok.kind == TokenKind::FuncWrap {
        TokenKind::Function
    } else {
        TokenKind::Type
    };
    tok.col_end = tok.col + tok.text.len() as u32;

    ts.remove(opp);
    ts.remove(name);
    ts.remove(clp);
}

/// `RETTYPE PROTO_WRAP(NAME, PARAMS);` marks NAME as a prototype.
pub(crate) fn handle_proto_wrap(ctx: &mut FileContext, pc: TokenId) {
    let ts = &mut ctx.tokens;
    let opp = ts.next_nnl(pc, Nav::All);
    let name = opp.and_then(|id| ts.next_nnl(id, Nav::All));
    let tmp = name
        .and_then(|id| ts.next_nnl(id, Nav::All))
        .and_then(|id| ts.next_nnl(id, Nav::All));
    let clp = opp.and_then(|id| ts.skip_to_match(id, Nav::All));
    let cma = clp.and_then(|id| ts.next_nnl(id, Nav::All));

    let (Some(opp), Some(name), Some(clp), Some(cma), Some(tmp)) = (opp, name, clp, cma, tmp)
    else {
        return;
    };
    if !matches!(ts.tok(name).kind, TokenKind::Word | TokenKind::Type)
        || ts.tok(tmp).kind != TokenKind::ParenOpen
        || ts.tok(opp).kind != TokenKind::ParenOpen
    {
        return;
    }
    let kind = match ts.tok(cma).kind {
        TokenKind::Semicolon => TokenKind::FuncProto,
        TokenKind::BraceOpen => TokenKind::FuncDef,
        _ => return,
    };
    ts.tok_mut(pc).kind = kind;
    ts.tok_mut(opp).parent = kind;
    ts.tok_mut(clp).parent = kind;

    ts.tok_mut(tmp).parent = TokenKind::ProtoWrap;
    fix_fcn_def_params(ctx, Some(tmp));
    let ts = &mut ctx.tokens;
    if let Some(close) = ts.skip_to_match(tmp, Nav::All) {
        ts.tok_mut(close).parent = TokenKind::ProtoWrap;
    }

    // mark the return type
    let mut cur = ts.prev_nnl(pc, Nav::All);
    while let Some(t) = cur {
        let tok = ts.tok(t);
        if !tok.is_type_like()
            && tok.kind != TokenKind::Operator
            && tok.kind != TokenKind::Word
            && tok.kind != TokenKind::Addr
        {
            break;
        }
        ts.tok_mut(t).parent = kind;
        make_type(ts, t);
        cur = ts.prev_nnl(t, Nav::All);
    }
}
