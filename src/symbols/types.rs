//! Typedefs, aggregate bodies, and variable definitions.

use crate::context::FileContext;
use crate::lang::LangFlags;
use crate::stream::{Nav, TokenId, TokenStream};
use crate::token::{TokenFlags, TokenKind};

use super::functions::{fix_fcn_def_params, mark_function_type};
use super::{flag_parens, make_type, set_paren_parent, skip_attribute_next, skip_template_next};

/// Skip to the start of the next statement.
fn skip_to_next_statement(ts: &TokenStream, mut pc: Option<TokenId>) -> Option<TokenId> {
    while let Some(id) = pc {
        let tok = ts.tok(id);
        if tok.is_semicolon()
            || tok.kind == TokenKind::BraceOpen
            || tok.kind == TokenKind::BraceClose
        {
            break;
        }
        pc = ts.next_nnl(id, Nav::All);
    }
    pc
}

/// Skip everything until a comma or semicolon at the same level.
fn skip_expression(ts: &TokenStream, start: TokenId) -> Option<TokenId> {
    let level = ts.tok(start).level;
    let mut pc = Some(start);
    while let Some(id) = pc {
        let tok = ts.tok(id);
        if tok.level < level {
            return Some(id);
        }
        if tok.level == level && (tok.is_semicolon() || tok.kind == TokenKind::Comma) {
            return Some(id);
        }
        pc = ts.next_nnl(id, Nav::All);
    }
    None
}

/// Skip the D `align()` construct and its optional colon.
fn skip_align(ts: &TokenStream, start: TokenId) -> Option<TokenId> {
    let mut pc = start;
    if ts.tok(pc).kind == TokenKind::Align {
        pc = ts.next_nnl(pc, Nav::All)?;
        if ts.tok(pc).kind == TokenKind::ParenOpen {
            let close = ts.next_kind(
                pc,
                TokenKind::ParenClose,
                Some(ts.tok(pc).level),
                Nav::All,
            )?;
            pc = ts.next_nnl(close, Nav::All)?;
            if ts.tok(pc).kind == TokenKind::Colon {
                pc = ts.next_nnl(pc, Nav::All)?;
            }
        }
    }
    Some(pc)
}

/// Pop the collected words: the last is the variable name, the rest are its
/// type.
pub(crate) fn mark_variable_stack(ts: &mut TokenStream, cs: &mut Vec<TokenId>) {
    let Some(var_name) = cs.pop() else {
        return;
    };
    // a trailing member of a :: chain is not a name on its own
    if ts
        .prev(var_name, Nav::All)
        .is_some_and(|p| ts.tok(p).kind == TokenKind::DcMember)
    {
        cs.push(var_name);
        return;
    }

    let mut word_cnt = 0;
    while let Some(word_type) = cs.pop() {
        if matches!(ts.tok(word_type).kind, TokenKind::Word | TokenKind::Type) {
            ts.tok_mut(word_type).kind = TokenKind::Type;
            ts.tok_mut(word_type).flags |= TokenFlags::VAR_TYPE;
        }
        word_cnt += 1;
    }

    if ts.tok(var_name).kind == TokenKind::Word {
        if word_cnt > 0 {
            ts.tok_mut(var_name).flags |= TokenFlags::VAR_DEF;
        } else {
            ts.tok_mut(var_name).kind = TokenKind::Type;
            ts.tok_mut(var_name).flags |= TokenFlags::VAR_TYPE;
        }
    }
}

/// We are on the first word of a variable definition: mark the names, star
/// pointers, skip `[...]` and initializers, stop at the `;`.
pub(crate) fn mark_variable_definition(
    ts: &mut TokenStream,
    start: TokenId,
    flags: TokenFlags,
) -> Option<TokenId> {
    let level = ts.tok(start).level;
    let mut pc = Some(start);
    while let Some(id) = pc {
        let tok = ts.tok(id);
        if tok.is_semicolon() || tok.level != level {
            break;
        }
        match tok.kind {
            TokenKind::Word | TokenKind::FuncCtorVar => {
                if !tok.flags.contains(TokenFlags::IN_ENUM) {
                    ts.tok_mut(id).flags |= flags;
                }
            }
            _ if tok.is_star() => {
                ts.tok_mut(id).kind = TokenKind::PtrType;
            }
            _ if tok.is_addr() => {
                ts.tok_mut(id).kind = TokenKind::Byref;
            }
            TokenKind::SquareOpen | TokenKind::Assign => {
                pc = skip_expression(ts, id);
                continue;
            }
            _ => {}
        }
        pc = ts.next_nnl(id, Nav::All);
    }
    pc
}

/// Statement starts with QUALIFIER/TYPE/WORD: collect the type prefix with
/// the stack discipline, pop the last entry as the variable name.
pub(crate) fn fix_var_def(ctx: &mut FileContext, start: TokenId) -> Option<TokenId> {
    let ts = &mut ctx.tokens;
    let mut cs: Vec<TokenId> = Vec::new();
    let mut flags = TokenFlags::VAR_DEF;
    let mut static_seen = false;

    let mut pc = Some(start);
    while let Some(id) = pc {
        let tok = ts.tok(id);
        let collectable = matches!(
            tok.kind,
            TokenKind::Type
                | TokenKind::Word
                | TokenKind::Qualifier
                | TokenKind::DcMember
                | TokenKind::Member
        ) || tok.is_addr()
            || tok.is_star();
        if !collectable {
            break;
        }
        cs.push(id);

        if tok.kind == TokenKind::Qualifier {
            if tok.is_str("extern") {
                flags.remove(TokenFlags::VAR_DEF);
                flags |= TokenFlags::VAR_DECL;
            } else if tok.is_str("static") {
                static_seen = true;
            }
        }

        pc = ts.next_nnl(id, Nav::All);
        pc = skip_template_next(ts, pc);
        pc = skip_attribute_next(ts, pc);
    }
    let end = pc?;

    // function defs are handled elsewhere
    if cs.len() <= 1
        || matches!(
            ts.tok(end).kind,
            TokenKind::FuncDef | TokenKind::FuncProto | TokenKind::FuncClass | TokenKind::Operator
        )
    {
        return skip_to_next_statement(ts, Some(end));
    }

    // find the alignable part past any "Engine::name" qualification
    let mut ref_idx = cs.len() - 1;
    if cs.len() >= 3
        && matches!(
            ts.tok(cs[cs.len() - 2]).kind,
            TokenKind::Member | TokenKind::DcMember
        )
    {
        let mut idx = cs.len() - 2;
        while idx > 0 {
            let sep = cs[idx];
            if !matches!(
                ts.tok(sep).kind,
                TokenKind::Member | TokenKind::DcMember
            ) {
                break;
            }
            idx -= 1;
            let owner = cs[idx];
            if !matches!(ts.tok(owner).kind, TokenKind::Word | TokenKind::Type) {
                break;
            }
            if ts.tok(sep).kind == TokenKind::DcMember {
                make_type(ts, owner);
            }
            if idx == 0 {
                break;
            }
            idx -= 1;
        }
        ref_idx = idx + 1;
    }

    if ref_idx == 0 {
        // no type part found
        return skip_to_next_statement(ts, Some(end));
    }

    for &id in &cs[..cs.len() - 1] {
        make_type(ts, id);
        ts.tok_mut(id).flags |= TokenFlags::VAR_TYPE;
    }

    if static_seen {
        flags |= TokenFlags::STATIC;
    }
    mark_variable_definition(ts, *cs.last().unwrap(), flags);

    if ts.tok(end).kind == TokenKind::Comma {
        return ts.next_nnl(end, Nav::All);
    }
    skip_to_next_statement(ts, Some(end))
}

/// The body of a struct/union holds variable definitions; methods are
/// handled by the function sweeps.
pub(crate) fn mark_struct_union_body(ctx: &mut FileContext, start: TokenId) {
    let level = ctx.tokens.tok(start).level;
    let mut pc = Some(start);
    while let Some(id) = pc {
        let tok = ctx.tokens.tok(id);
        if tok.level < level
            || (tok.level == level && tok.kind == TokenKind::BraceClose && id != start)
        {
            break;
        }
        if matches!(
            tok.kind,
            TokenKind::BraceOpen | TokenKind::BraceClose | TokenKind::Semicolon
        ) || id == start
        {
            pc = ctx.tokens.next_nnl(id, Nav::All);
            continue;
        }
        if tok.kind == TokenKind::Align {
            pc = skip_align(&ctx.tokens, id);
        } else {
            pc = fix_var_def(ctx, id);
        }
    }
}

/// We are on a typedef: flag the whole statement, detect function typedefs
/// by an intermediate `(...)(`, and mark the rightmost type as the alias.
pub(crate) fn fix_typedef(ctx: &mut FileContext, start: TokenId) {
    let lang = ctx.lang;
    let ts = &mut ctx.tokens;
    let level = ts.tok(start).level;
    let mut the_type: Option<TokenId> = None;
    let mut last_op: Option<TokenId> = None;

    // flag everything until the matching ';'
    let mut next = Some(start);
    loop {
        next = next.and_then(|id| ts.next_nnl(id, Nav::Preproc));
        let Some(id) = next else { break };
        if ts.tok(id).level < level {
            break;
        }
        ts.tok_mut(id).flags |= TokenFlags::IN_TYPEDEF;
        if ts.tok(id).level == level {
            if ts.tok(id).is_semicolon() {
                ts.tok_mut(id).parent = TokenKind::Typedef;
                break;
            }
            if ts.tok(id).kind == TokenKind::Attribute {
                break;
            }
            if lang.intersects(LangFlags::D) && ts.tok(id).kind == TokenKind::Assign {
                ts.tok_mut(id).parent = TokenKind::Typedef;
                break;
            }
            make_type(ts, id);
            if ts.tok(id).kind == TokenKind::Type {
                the_type = Some(id);
            }
            ts.tok_mut(id).flags.remove(TokenFlags::VAR_DEF);
            if ts.tok(id).is_str("(") {
                last_op = Some(id);
            }
        }
    }

    if let Some(last_op) = last_op {
        // function typedef
        flag_parens(
            ts,
            last_op,
            TokenFlags::empty(),
            TokenKind::FParenOpen,
            TokenKind::Typedef,
            false,
        );
        fix_fcn_def_params(ctx, Some(last_op));
        let ts = &mut ctx.tokens;

        let mut the_type = ts.prev_nnl(last_op, Nav::Preproc);
        if let Some(t) = the_type {
            if ts.tok(t).is_paren_close() {
                mark_function_type(ctx, t);
                the_type = ctx.tokens.prev_nnl(t, Nav::Preproc);
            } else {
                // "typedef <return type>func(params);"
                ctx.tokens.tok_mut(t).kind = TokenKind::FuncType;
            }
        }
        if let Some(t) = the_type {
            ctx.tokens.tok_mut(t).parent = TokenKind::Typedef;
        }
        return;
    }

    // skip over enum/struct/union, as it cannot be a function return type
    let Some(next) = ts.next_nnl(start, Nav::Preproc) else {
        return;
    };
    let tag = ts.tok(next).kind;
    if !matches!(
        tag,
        TokenKind::Enum | TokenKind::Struct | TokenKind::Union
    ) {
        if let Some(t) = the_type {
            // a regular typedef
            ts.tok_mut(t).parent = TokenKind::Typedef;
        }
        return;
    }

    // the next item should be either a type or '{'
    let mut next = ts.next_nnl(next, Nav::Preproc);
    if next.is_some_and(|id| ts.tok(id).kind == TokenKind::Type) {
        next = ts.next_nnl(next.unwrap(), Nav::Preproc);
    }
    if let Some(id) = next {
        if ts.tok(id).kind == TokenKind::BraceOpen {
            ts.tok_mut(id).parent = tag;
            if let Some(close) =
                ts.next_kind(id, TokenKind::BraceClose, Some(ts.tok(id).level), Nav::Preproc)
            {
                ts.tok_mut(close).parent = tag;
            }
        }
    }

    if let Some(t) = the_type {
        ts.tok_mut(t).parent = TokenKind::Typedef;
        let flag = match tag {
            TokenKind::Struct => TokenFlags::TYPEDEF_STRUCT,
            TokenKind::Union => TokenFlags::TYPEDEF_UNION,
            _ => TokenFlags::TYPEDEF_ENUM,
        };
        ts.tok_mut(t).flags |= flag;
    }
}

/// We are on an enum/struct/union tag: mark the tag type, the body, and any
/// trailing variable names.
pub(crate) fn fix_enum_struct_union(ctx: &mut FileContext, pc: TokenId) {
    let lang = ctx.lang;
    let ts = &mut ctx.tokens;
    let kind = ts.tok(pc).kind;
    let mut flags = TokenFlags::VAR_DEF;
    let in_fcn_paren = ts.tok(pc).flags & TokenFlags::IN_FCN_DEF;

    // casts were handled already
    if ts.tok(pc).parent == TokenKind::CCast {
        return;
    }

    let mut prev: Option<TokenId> = None;
    let mut next = ts.next_nnl(pc, Nav::All);
    if next.is_some_and(|id| ts.tok(id).kind == TokenKind::EnumClass) {
        next = ts.next_nnl(next.unwrap(), Nav::All);
    }
    if next.is_some_and(|id| ts.tok(id).kind == TokenKind::Type) {
        let name = next.unwrap();
        ts.tok_mut(name).parent = kind;
        prev = Some(name);
        next = ts.next_nnl(name, Nav::All);

        let Some(mut id) = next else { return };
        if lang.intersects(LangFlags::PAWN) && ts.tok(id).kind == TokenKind::ParenOpen {
            next = set_paren_parent(ts, id, TokenKind::Enum);
        } else if kind == TokenKind::Enum && ts.tok(id).kind == TokenKind::Colon {
            // enum TYPE : INT_TYPE {
            if let Some(base) = ts.next_nnl(id, Nav::All) {
                make_type(ts, base);
                id = base;
            }
            next = ts.next_nnl(id, Nav::All);
        }
    }

    if next.is_some_and(|id| ts.tok(id).kind == TokenKind::BraceOpen) {
        let brace = next.unwrap();
        let body_flag = if kind == TokenKind::Enum {
            TokenFlags::IN_ENUM
        } else {
            TokenFlags::IN_STRUCT
        };
        flag_parens(
            ts,
            brace,
            body_flag,
            TokenKind::None,
            TokenKind::None,
            false,
        );

        if matches!(kind, TokenKind::Union | TokenKind::Struct) {
            mark_struct_union_body(ctx, brace);
        }
        let ts = &mut ctx.tokens;

        ts.tok_mut(brace).parent = kind;
        next = ts.next_kind(
            brace,
            TokenKind::BraceClose,
            Some(ts.tok(pc).level),
            Nav::All,
        );
        flags |= TokenFlags::VAR_INLINE;
        if let Some(close) = next {
            ts.tok_mut(close).parent = kind;
            next = ts.next_nnl(close, Nav::All);
        }
        if let Some(name) = prev {
            ts.tok_mut(name).flags |= TokenFlags::DEF;
        }
        prev = None;
    } else if let Some(name) = prev {
        let is_proto = next.is_some_and(|id| ts.tok(id).is_semicolon());
        ts.tok_mut(name).flags |= if is_proto {
            TokenFlags::PROTO
        } else {
            TokenFlags::REF
        };
    }
    let ts = &mut ctx.tokens;

    let Some(mut cur) = next else { return };
    if ts.tok(cur).kind == TokenKind::ParenClose {
        return;
    }

    if !ts.tok(cur).is_semicolon() {
        // Pawn does not require a semicolon after an enum, and neither does
        // D; normalize with a virtual one
        if lang.intersects(LangFlags::PAWN) {
            return;
        }
        if lang.intersects(LangFlags::D) {
            if let Some(prev_tok) = ts.prev_nnl(cur, Nav::All) {
                cur = crate::pawn::insert_vsemi_after(ts, prev_tok);
            }
        }
    }

    // we are either pointing at a ';' or at variable names
    let level = ts.tok(pc).level;
    let mut next = Some(cur);
    while let Some(id) = next {
        let tok = ts.tok(id);
        if tok.is_semicolon() || tok.kind == TokenKind::Assign {
            break;
        }
        if (in_fcn_paren.bits() ^ (tok.flags & TokenFlags::IN_FCN_DEF).bits()) != 0 {
            break;
        }
        if tok.level == level {
            if tok.kind == TokenKind::Word {
                ts.tok_mut(id).flags |= flags;
            }
            if ts.tok(id).is_star() {
                ts.tok_mut(id).kind = TokenKind::PtrType;
            }
            // a comma in a function param list means we are done
            let tok = ts.tok(id);
            if matches!(tok.kind, TokenKind::Comma | TokenKind::FParenClose)
                && tok
                    .flags
                    .intersects(TokenFlags::IN_FCN_DEF | TokenFlags::IN_FCN_CALL)
            {
                return;
            }
        }
        next = ts.next_nnl(id, Nav::All);
    }

    if let Some(id) = next {
        if prev.is_none()
            && ts.tok(id).kind == TokenKind::Semicolon
            && ts.tok(id).parent == TokenKind::None
        {
            ts.tok_mut(id).parent = kind;
        }
    }
}
