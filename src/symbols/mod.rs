//! The symbol classifier.
//!
//! A sequence of sweeps over the token stream that rewrites coarse kinds
//! into specific ones: casts vs. calls, prototypes vs. definitions, pointer
//! vs. multiply, typedef aliases, constructors, blocks, lambdas. Rules are
//! heuristic and order-sensitive; a wrong guess mislabels a token but never
//! aborts the file.

mod casts;
mod functions;
mod labels;
mod objc;
mod other;
mod templates;
mod types;

pub use labels::combine_labels;

use crate::context::FileContext;
use crate::lang::LangFlags;
use crate::stream::{Nav, TokenId, TokenStream};
use crate::token::{TokenFlags, TokenKind};

/// Coerce a token into its type-fragment reading.
pub(crate) fn make_type(ts: &mut TokenStream, pc: TokenId) {
    let tok = ts.tok(pc);
    if tok.kind == TokenKind::Word {
        ts.tok_mut(pc).kind = TokenKind::Type;
    } else if tok.is_star() {
        ts.tok_mut(pc).kind = TokenKind::PtrType;
    } else if tok.is_addr() {
        ts.tok_mut(pc).kind = TokenKind::Byref;
    }
}

/// Apply/clear flags from `start` through `end` inclusive.
pub(crate) fn flag_series(
    ts: &mut TokenStream,
    start: TokenId,
    end: TokenId,
    set: TokenFlags,
    clear: TokenFlags,
    nav: Nav,
) {
    let mut cur = Some(start);
    while let Some(id) = cur {
        let tok = ts.tok_mut(id);
        tok.flags.remove(clear);
        tok.flags |= set;
        if id == end {
            break;
        }
        cur = ts.next(id, nav);
    }
}

/// Flag everything between an open delimiter and its match, optionally
/// retyping the pair and setting parents. Returns the token after the
/// close.
pub(crate) fn flag_parens(
    ts: &mut TokenStream,
    po: TokenId,
    flags: TokenFlags,
    opentype: TokenKind,
    parenttype: TokenKind,
    parent_all: bool,
) -> Option<TokenId> {
    let Some(close) = ts.skip_to_match(po, Nav::Preproc) else {
        log::warn!(
            "no match for '{}' at {}:{}",
            ts.tok(po).text,
            ts.tok(po).line,
            ts.tok(po).col
        );
        return None;
    };

    if po != close {
        if !flags.is_empty() || (parent_all && parenttype != TokenKind::None) {
            let mut cur = ts.next(po, Nav::Preproc);
            while let Some(id) = cur {
                if id == close {
                    break;
                }
                ts.tok_mut(id).flags |= flags;
                if parent_all {
                    ts.tok_mut(id).parent = parenttype;
                }
                cur = ts.next(id, Nav::Preproc);
            }
        }

        if opentype != TokenKind::None {
            ts.tok_mut(po).kind = opentype;
            ts.tok_mut(close).kind = opentype.matching_close().unwrap_or(opentype);
        }

        if parenttype != TokenKind::None {
            ts.tok_mut(po).parent = parenttype;
            ts.tok_mut(close).parent = parenttype;
        }
    }
    ts.next_nnl(close, Nav::Preproc)
}

/// Set the parent on an open delimiter and its match. Returns the token
/// after the close.
pub(crate) fn set_paren_parent(
    ts: &mut TokenStream,
    start: TokenId,
    parent: TokenKind,
) -> Option<TokenId> {
    let close = ts.skip_to_match(start, Nav::Preproc)?;
    ts.tok_mut(start).parent = parent;
    ts.tok_mut(close).parent = parent;
    ts.next_nnl(close, Nav::Preproc)
}

/// Scan backwards to see if we might be on a type declaration.
pub(crate) fn chunk_ends_type(ts: &TokenStream, start: Option<TokenId>) -> bool {
    let mut cnt = 0;
    let mut last_lval = false;
    let mut cur = start;

    while let Some(id) = cur {
        let tok = ts.tok(id);
        match tok.kind {
            TokenKind::Word
            | TokenKind::Type
            | TokenKind::PtrType
            | TokenKind::Struct
            | TokenKind::DcMember
            | TokenKind::Qualifier => {
                cnt += 1;
                last_lval = tok.flags.contains(TokenFlags::LVALUE);
                cur = ts.prev_nnl(id, Nav::All);
                continue;
            }
            _ => {}
        }
        if tok.is_semicolon()
            || tok.kind == TokenKind::Typedef
            || tok.kind == TokenKind::BraceOpen
            || tok.kind == TokenKind::BraceClose
            || (tok.kind == TokenKind::SParenOpen && last_lval)
        {
            return cnt > 0;
        }
        return false;
    }
    // ran off the start of the file
    true
}

/// Skip to the last word of an `A::B::c` chain.
pub(crate) fn skip_dc_member(ts: &TokenStream, start: TokenId) -> Option<TokenId> {
    let mut pc = start;
    let mut next = if ts.tok(pc).kind == TokenKind::DcMember {
        Some(pc)
    } else {
        ts.next_nnl(pc, Nav::All)
    };
    while let Some(n) = next {
        if ts.tok(n).kind != TokenKind::DcMember {
            break;
        }
        pc = ts.next_nnl(n, Nav::All)?;
        next = ts.next_nnl(pc, Nav::All);
    }
    Some(pc)
}

/// Skip a balanced `<...>` forward; anything else is returned unchanged.
pub(crate) fn skip_template_next(ts: &TokenStream, id: Option<TokenId>) -> Option<TokenId> {
    let id = id?;
    if ts.tok(id).kind == TokenKind::AngleOpen {
        let close = ts.next_kind(
            id,
            TokenKind::AngleClose,
            Some(ts.tok(id).level),
            Nav::All,
        )?;
        return ts.next_nnl(close, Nav::All);
    }
    Some(id)
}

/// Skip a balanced `<...>` backward.
pub(crate) fn skip_template_prev(ts: &TokenStream, id: Option<TokenId>) -> Option<TokenId> {
    let id = id?;
    if ts.tok(id).kind == TokenKind::AngleClose {
        let open = ts.prev_kind(
            id,
            TokenKind::AngleOpen,
            Some(ts.tok(id).level),
            Nav::All,
        )?;
        return ts.prev_nnl(open, Nav::All);
    }
    Some(id)
}

/// Skip an `__attribute__((...))` forward.
pub(crate) fn skip_attribute_next(ts: &TokenStream, id: Option<TokenId>) -> Option<TokenId> {
    let id = id?;
    if ts.tok(id).kind == TokenKind::Attribute {
        let pc = ts.next(id, Nav::All)?;
        if ts.tok(pc).kind == TokenKind::FParenOpen {
            let close = ts.next_kind(
                id,
                TokenKind::FParenClose,
                Some(ts.tok(id).level),
                Nav::All,
            )?;
            return ts.next_nnl(close, Nav::All);
        }
        return Some(pc);
    }
    Some(id)
}

/// Skip backward over the parens of an `__attribute__((...))`.
pub(crate) fn skip_attribute_prev(ts: &TokenStream, id: Option<TokenId>) -> Option<TokenId> {
    let id = id?;
    if ts.tok(id).kind == TokenKind::FParenClose && ts.tok(id).parent == TokenKind::Attribute {
        let attr = ts.prev_kind(
            id,
            TokenKind::Attribute,
            Some(ts.tok(id).level),
            Nav::All,
        )?;
        return ts.prev_nnl(attr, Nav::All);
    }
    Some(id)
}

/// Objective-C block context test.
pub(crate) fn is_oc_block(ts: &TokenStream, pc: TokenId) -> bool {
    let tok = ts.tok(pc);
    if matches!(
        tok.parent,
        TokenKind::OcBlockType | TokenKind::OcBlockExpr
    ) || tok.kind == TokenKind::OcBlockCaret
    {
        return true;
    }
    ts.next(pc, Nav::All)
        .is_some_and(|n| ts.tok(n).kind == TokenKind::OcBlockCaret)
        || ts
            .prev(pc, Nav::All)
            .is_some_and(|p| ts.tok(p).kind == TokenKind::OcBlockCaret)
}

pub(crate) fn is_ucase_str(s: &str) -> bool {
    s.chars().all(|c| !c.is_ascii_lowercase())
}

/// An assignment marks everything to its left (within the statement) as an
/// lvalue; a bare `&` there is a byref type fragment.
fn mark_lvalue(ts: &mut TokenStream, pc: TokenId) {
    if ts.tok(pc).is_preproc() {
        return;
    }
    let level = ts.tok(pc).level;
    let mut cur = ts.prev_nnl(pc, Nav::All);
    while let Some(prev) = cur {
        let tok = ts.tok(prev);
        if tok.level < level
            || tok.kind == TokenKind::Assign
            || tok.kind == TokenKind::Comma
            || tok.kind == TokenKind::Bool
            || tok.is_semicolon()
            || tok.is_str("(")
            || tok.is_str("{")
            || tok.is_str("[")
            || tok.is_preproc()
        {
            break;
        }
        ts.tok_mut(prev).flags |= TokenFlags::LVALUE;
        if ts.tok(prev).level == level && ts.tok(prev).is_str("&") {
            make_type(ts, prev);
        }
        cur = ts.prev_nnl(prev, Nav::All);
    }
}

/// Mark expression starts inside `#define`, `#if` and `#else` bodies, which
/// the brace pass deliberately leaves alone.
fn mark_define_expressions(ts: &mut TokenStream) {
    let mut in_define = false;
    let mut first = true;
    let mut prev_opt: Option<TokenId> = None;

    let ids: Vec<TokenId> = ts.ids().collect();
    for pc in ids {
        let kind = ts.tok(pc).kind;
        if !in_define {
            if matches!(
                kind,
                TokenKind::PpDefine | TokenKind::PpIf | TokenKind::PpElse
            ) {
                in_define = true;
                first = true;
            }
        } else if !ts.tok(pc).is_preproc() || kind == TokenKind::Preproc {
            in_define = false;
        } else if kind != TokenKind::Macro {
            let starts = first
                || prev_opt.is_some_and(|prev| {
                    let ptok = ts.tok(prev);
                    matches!(
                        ptok.kind,
                        TokenKind::ParenOpen
                            | TokenKind::FParenOpen
                            | TokenKind::SParenOpen
                            | TokenKind::BraceOpen
                            | TokenKind::Arith
                            | TokenKind::Caret
                            | TokenKind::Assign
                            | TokenKind::Compare
                            | TokenKind::Return
                            | TokenKind::Goto
                            | TokenKind::Continue
                            | TokenKind::Comma
                            | TokenKind::Colon
                            | TokenKind::Question
                    ) || ptok.is_semicolon()
                });
            if starts {
                ts.tok_mut(pc).flags |= TokenFlags::EXPR_START;
                first = false;
            }
        }
        prev_opt = Some(pc);
    }
}

/// The context-classification sweep: every token, with its neighbors, runs
/// through the rewrite rules.
fn do_symbol_check(ctx: &mut FileContext, prev: Option<TokenId>, pc: TokenId, next: Option<TokenId>) {
    let ts = &mut ctx.tokens;
    let lang = ctx.lang;

    let kind = ts.tok(pc).kind;
    let prev_kind = ts.tok_or_empty(prev).kind;
    let next_kind = ts.tok_or_empty(next).kind;

    // Objective-C boxed literals: @(...) @{...} @[...]
    if kind == TokenKind::OcAt {
        if let Some(next) = next {
            match next_kind {
                TokenKind::ParenOpen | TokenKind::BraceOpen | TokenKind::SquareOpen => {
                    flag_parens(
                        ts,
                        next,
                        TokenFlags::OC_BOXED,
                        next_kind,
                        TokenKind::OcAt,
                        false,
                    );
                }
                _ => {
                    ts.tok_mut(next).parent = TokenKind::OcAt;
                }
            }
        }
    }

    // D: const(T) is a cast
    if lang.intersects(LangFlags::D)
        && kind == TokenKind::Qualifier
        && ts.tok(pc).is_str("const")
        && next_kind == TokenKind::ParenOpen
    {
        ts.tok_mut(pc).kind = TokenKind::DCast;
        set_paren_parent(ts, next.unwrap(), TokenKind::DCast);
    }

    let kind = ts.tok(pc).kind;

    if next_kind == TokenKind::ParenOpen
        && matches!(
            kind,
            TokenKind::DCast | TokenKind::Delegate | TokenKind::Align
        )
    {
        let tmp = set_paren_parent(ts, next.unwrap(), kind);

        if kind == TokenKind::DCast {
            if let Some(tmp) = tmp {
                let t = ts.tok(tmp).kind;
                ts.tok_mut(tmp).kind = match t {
                    TokenKind::Star => TokenKind::Deref,
                    TokenKind::Amp => TokenKind::Addr,
                    TokenKind::Minus => TokenKind::Neg,
                    TokenKind::Plus => TokenKind::Pos,
                    other => other,
                };
            }
        }

        if kind == TokenKind::Delegate {
            if let Some(tmp) = tmp {
                ts.tok_mut(tmp).parent = TokenKind::Delegate;
                if ts.tok(tmp).level == ts.tok(tmp).brace_level {
                    ts.tok_mut(tmp).flags |= TokenFlags::VAR_DEF;
                }
            }
            // prior words form the delegate's return type
            let mut cur = ts.prev_nnl(pc, Nav::All);
            while let Some(id) = cur {
                if ts.tok(id).is_semicolon()
                    || ts.tok(id).kind == TokenKind::BraceOpen
                    || ts.tok(id).kind == TokenKind::VBraceOpen
                {
                    break;
                }
                make_type(ts, id);
                cur = ts.prev_nnl(id, Nav::All);
            }
        }

        if kind == TokenKind::Align {
            if let Some(tmp) = tmp {
                match ts.tok(tmp).kind {
                    TokenKind::BraceOpen => {
                        set_paren_parent(ts, tmp, TokenKind::Align);
                    }
                    TokenKind::Colon => {
                        ts.tok_mut(tmp).parent = TokenKind::Align;
                    }
                    _ => {}
                }
            }
        }
    }

    if kind == TokenKind::Invariant {
        if next_kind == TokenKind::ParenOpen {
            ts.tok_mut(next.unwrap()).parent = kind;
            let mut tmp = ts.next(next.unwrap(), Nav::All);
            while let Some(id) = tmp {
                if ts.tok(id).kind == TokenKind::ParenClose {
                    ts.tok_mut(id).parent = TokenKind::Invariant;
                    break;
                }
                make_type(ts, id);
                tmp = ts.next(id, Nav::All);
            }
        } else {
            ts.tok_mut(pc).kind = TokenKind::Qualifier;
        }
    }

    if prev_kind == TokenKind::BraceOpen
        && matches!(kind, TokenKind::Getset | TokenKind::GetsetEmpty)
    {
        flag_parens(
            ts,
            prev.unwrap(),
            TokenFlags::empty(),
            TokenKind::None,
            TokenKind::Getset,
            false,
        );
    }

    // Objective-C scopes, message sends and block literals
    if lang.intersects(LangFlags::OC) {
        if ts.tok(pc).flags.contains(TokenFlags::STMT_START)
            && (ts.tok(pc).is_str("-") || ts.tok(pc).is_str("+"))
            && ts.tok_or_empty(next).is_str("(")
        {
            objc::handle_oc_message_decl(ts, pc);
        }
        if ts.tok(pc).flags.contains(TokenFlags::EXPR_START) {
            if ts.tok(pc).kind == TokenKind::SquareOpen {
                objc::handle_oc_message_send(ts, pc);
            }
            if ts.tok(pc).kind == TokenKind::Caret {
                objc::handle_oc_block_literal(ts, lang, pc);
            }
        }
        if ts.tok(pc).kind == TokenKind::OcSel && next_kind == TokenKind::ParenOpen {
            set_paren_parent(ts, next.unwrap(), TokenKind::OcSel);
        }
    }

    // C# attributes and properties
    if lang.intersects(LangFlags::CS) {
        if ts.tok(pc).flags.contains(TokenFlags::EXPR_START)
            && ts.tok(pc).kind == TokenKind::SquareOpen
        {
            other::handle_cs_square_stmt(ts, pc);
        }

        if next_kind == TokenKind::BraceOpen
            && ts.tok_or_empty(next).parent == TokenKind::None
            && matches!(
                ts.tok(pc).kind,
                TokenKind::SquareClose | TokenKind::Word
            )
        {
            other::handle_cs_property(ts, next.unwrap());
        }
    }

    // C++11 lambdas
    if lang.intersects(LangFlags::CPP)
        && matches!(ts.tok(pc).kind, TokenKind::SquareOpen | TokenKind::TSquare)
        && prev.is_some()
        && !ts.tok_or_empty(prev).is_word_like()
    {
        templates::handle_cpp_lambda(ctx, pc);
    }
    let ts = &mut ctx.tokens;

    let kind = ts.tok(pc).kind;

    // array initializers: x = [ ... ] / x = { ... }
    if kind == TokenKind::Assign && next_kind == TokenKind::SquareOpen {
        set_paren_parent(ts, next.unwrap(), TokenKind::Assign);
        // mark a one-liner assignment
        let mut tmp = next;
        while let Some(id) = tmp.and_then(|id| ts.next(id, Nav::All)) {
            if ts.tok(id).is_newline() {
                break;
            }
            if ts.tok(id).kind == TokenKind::SquareClose
                && ts.tok(next.unwrap()).level == ts.tok(id).level
            {
                ts.tok_mut(id).flags |= TokenFlags::ONE_LINER;
                ts.tok_mut(next.unwrap()).flags |= TokenFlags::ONE_LINER;
                break;
            }
            tmp = Some(id);
        }
    }

    if kind == TokenKind::Assert {
        other::handle_java_assert(ts, pc);
    }
    if kind == TokenKind::Annotation {
        let tmp = ts.next_nnl(pc, Nav::All);
        if let Some(tmp) = tmp {
            if ts.tok(tmp).is_paren_open() {
                set_paren_parent(ts, tmp, TokenKind::Annotation);
            }
        }
    }

    // a [] in C#, D and Vala only follows a type
    if kind == TokenKind::TSquare
        && lang.intersects(LangFlags::D.union(LangFlags::CS).union(LangFlags::VALA))
    {
        if prev_kind == TokenKind::Word {
            ts.tok_mut(prev.unwrap()).kind = TokenKind::Type;
        }
        if next_kind == TokenKind::Word {
            ts.tok_mut(next.unwrap()).flags |= TokenFlags::VAR_DEF;
        }
    }

    if matches!(
        kind,
        TokenKind::SqlExec | TokenKind::SqlBegin | TokenKind::SqlEnd
    ) {
        other::mark_exec_sql(ts, pc);
    }

    if kind == TokenKind::ProtoWrap {
        functions::handle_proto_wrap(ctx, pc);
    }

    let ts = &mut ctx.tokens;

    // typedefs and aggregate bodies
    if ts.tok(pc).kind == TokenKind::Typedef {
        types::fix_typedef(ctx, pc);
    }
    let ts = &mut ctx.tokens;
    if matches!(
        ts.tok(pc).kind,
        TokenKind::Enum | TokenKind::Struct | TokenKind::Union
    ) {
        types::fix_enum_struct_union(ctx, pc);
    }
    let ts = &mut ctx.tokens;

    if ts.tok(pc).kind == TokenKind::Extern {
        if let Some(next) = next {
            if ts.tok(next).is_paren_open() {
                let tmp = flag_parens(
                    ts,
                    next,
                    TokenFlags::empty(),
                    TokenKind::None,
                    TokenKind::Extern,
                    true,
                );
                if let Some(tmp) = tmp {
                    if ts.tok(tmp).kind == TokenKind::BraceOpen {
                        set_paren_parent(ts, tmp, TokenKind::Extern);
                    }
                }
            } else {
                // next is likely the linkage string
                ts.tok_mut(next).parent = TokenKind::Extern;
                let tmp = ts.next_nnl(next, Nav::All);
                if let Some(tmp) = tmp {
                    if ts.tok(tmp).kind == TokenKind::BraceOpen {
                        set_paren_parent(ts, tmp, TokenKind::Extern);
                    }
                }
            }
        }
    }

    if ts.tok(pc).kind == TokenKind::Template {
        if lang.intersects(LangFlags::D) {
            templates::handle_d_template(ts, pc);
        } else {
            templates::handle_cpp_template(ts, pc);
        }
    }
    let ts = &mut ctx.tokens;

    if ts.tok(pc).kind == TokenKind::Word
        && next_kind == TokenKind::AngleOpen
        && ts.tok_or_empty(next).parent == TokenKind::Template
    {
        functions::mark_template_func(ctx, pc, next.unwrap());
    }
    let ts = &mut ctx.tokens;

    if ts.tok(pc).kind == TokenKind::SquareClose && next_kind == TokenKind::ParenOpen {
        flag_parens(
            ts,
            next.unwrap(),
            TokenFlags::empty(),
            TokenKind::FParenOpen,
            TokenKind::None,
            false,
        );
    }

    if ts.tok(pc).kind == TokenKind::TypeCast {
        casts::fix_type_cast(ts, pc);
    }

    if ts.tok(pc).parent == TokenKind::Assign
        && matches!(
            ts.tok(pc).kind,
            TokenKind::BraceOpen | TokenKind::SquareOpen
        )
    {
        // everything in here is part of the initializer
        flag_parens(
            ts,
            pc,
            TokenFlags::IN_ARRAY_ASSIGN,
            ts.tok(pc).kind,
            TokenKind::None,
            false,
        );
    }

    if ts.tok(pc).kind == TokenKind::DTemplate {
        if let Some(next) = next {
            set_paren_parent(ts, next, TokenKind::DTemplate);
        }
    }

    // A word before an open paren is a function call or definition
    if next_kind == TokenKind::ParenOpen {
        let tmp = ts.next_nnl(next.unwrap(), Nav::All);
        if lang.intersects(LangFlags::OC)
            && tmp.is_some_and(|t| ts.tok(t).kind == TokenKind::Caret)
        {
            objc::handle_oc_block_type(ctx, tmp.unwrap());
        } else {
            let ts = &mut ctx.tokens;
            let kind = ts.tok(pc).kind;
            if matches!(kind, TokenKind::Word | TokenKind::OperatorVal) {
                ts.tok_mut(pc).kind = TokenKind::Function;
            } else if kind == TokenKind::Type {
                // TYPE(...) is a functional cast unless the close is
                // followed by another paren: TYPE(...)(...)
                let close = ts.next_kind(
                    next.unwrap(),
                    TokenKind::ParenClose,
                    Some(ts.tok(next.unwrap()).level),
                    Nav::All,
                );
                let after = close.and_then(|c| ts.next(c, Nav::All));
                if after.is_some_and(|a| ts.tok(a).kind == TokenKind::ParenOpen) {
                    ts.tok_mut(pc).kind = TokenKind::Function;
                } else if ts.tok(pc).parent == TokenKind::None
                    && !ts.tok(pc).flags.contains(TokenFlags::IN_TYPEDEF)
                {
                    let tmp = ts.next_nnl(next.unwrap(), Nav::All);
                    if tmp.is_some_and(|t| ts.tok(t).kind == TokenKind::ParenClose) {
                        // TYPE()
                        ts.tok_mut(pc).kind = TokenKind::Function;
                    } else {
                        ts.tok_mut(pc).kind = TokenKind::CppCast;
                        set_paren_parent(ts, next.unwrap(), TokenKind::CppCast);
                    }
                }
            } else if kind == TokenKind::Attribute {
                flag_parens(
                    ts,
                    next.unwrap(),
                    TokenFlags::empty(),
                    TokenKind::FParenOpen,
                    TokenKind::Attribute,
                    false,
                );
            }
        }
    }
    let ts = &mut ctx.tokens;

    if lang.intersects(LangFlags::PAWN) {
        if ts.tok(pc).kind == TokenKind::Function && ts.tok(pc).brace_level > 0 {
            ts.tok_mut(pc).kind = TokenKind::FuncCall;
        }
        if ts.tok(pc).kind == TokenKind::State && next_kind == TokenKind::ParenOpen {
            set_paren_parent(ts, next.unwrap(), TokenKind::State);
        }
    } else if ts.tok(pc).kind == TokenKind::Function
        && (ts.tok(pc).parent == TokenKind::OcBlockExpr || !is_oc_block(ts, pc))
    {
        functions::mark_function(ctx, pc);
    }
    let ts = &mut ctx.tokens;

    // C99 designated initializer members
    if ts.tok(pc).kind == TokenKind::Member
        && matches!(prev_kind, TokenKind::Comma | TokenKind::BraceOpen)
    {
        ts.tok_mut(pc).kind = TokenKind::C99Member;
        if let Some(next) = next {
            ts.tok_mut(next).parent = TokenKind::C99Member;
        }
    }

    // mark function parens and braces
    if matches!(
        ts.tok(pc).kind,
        TokenKind::FuncDef
            | TokenKind::FuncCall
            | TokenKind::FuncCallUser
            | TokenKind::FuncProto
    ) {
        let fkind = ts.tok(pc).kind;
        let mut tmp = next;
        if let Some(t) = tmp {
            if ts.tok(t).kind == TokenKind::SquareOpen {
                tmp = set_paren_parent(ts, t, fkind);
            } else if ts.tok(t).kind == TokenKind::TSquare
                || ts.tok(t).parent == TokenKind::Operator
            {
                tmp = ts.next_nnl(t, Nav::All);
            }
        }
        if let Some(t) = tmp {
            if ts.tok(t).is_paren_open() {
                let after = flag_parens(
                    ts,
                    t,
                    TokenFlags::empty(),
                    TokenKind::FParenOpen,
                    fkind,
                    false,
                );
                if let Some(after) = after {
                    if ts.tok(after).kind == TokenKind::BraceOpen {
                        if !ts.tok(after).flags.contains(TokenFlags::IN_CONST_ARGS) {
                            set_paren_parent(ts, after, fkind);
                        }
                    } else if ts.tok(after).is_semicolon() && fkind == TokenKind::FuncProto {
                        ts.tok_mut(after).parent = fkind;
                    }
                }
            }
        }
    }

    // the parameters in catch() are definitions
    if ts.tok(pc).kind == TokenKind::Catch && next_kind == TokenKind::SParenOpen {
        functions::fix_fcn_def_params(ctx, next);
    }
    let ts = &mut ctx.tokens;

    if ts.tok(pc).kind == TokenKind::Throw && prev_kind == TokenKind::FParenClose {
        ts.tok_mut(pc).parent = ts.tok(prev.unwrap()).parent;
        if next_kind == TokenKind::ParenOpen {
            set_paren_parent(ts, next.unwrap(), TokenKind::Throw);
        }
    }

    // the braces in "for_each_entry(xxx) { }"
    if ts.tok(pc).kind == TokenKind::BraceOpen
        && prev_kind == TokenKind::FParenClose
        && matches!(
            ts.tok_or_empty(prev).parent,
            TokenKind::FuncCall | TokenKind::FuncCallUser
        )
        && !ts.tok(pc).flags.contains(TokenFlags::IN_CONST_ARGS)
    {
        set_paren_parent(ts, pc, TokenKind::FuncCall);
    }

    // ")(" outside casts/typedefs means a function type
    if next.is_some()
        && !ts
            .tok(pc)
            .flags
            .intersects(TokenFlags::IN_TYPEDEF | TokenFlags::IN_TEMPLATE)
        && ts.tok(pc).parent != TokenKind::CppCast
        && ts.tok(pc).parent != TokenKind::CCast
        && !ts.tok(pc).is_preproc()
        && !is_oc_block(ts, pc)
        && ts.tok(pc).parent != TokenKind::OcMsgDecl
        && ts.tok(pc).parent != TokenKind::OcMsgSpec
        && ts.tok(pc).is_str(")")
        && ts.tok_or_empty(next).is_str("(")
    {
        if lang.intersects(LangFlags::D) {
            flag_parens(
                ts,
                next.unwrap(),
                TokenFlags::empty(),
                TokenKind::FParenOpen,
                TokenKind::FuncCall,
                false,
            );
        } else {
            functions::mark_function_type(ctx, pc);
        }
    }
    let ts = &mut ctx.tokens;

    if matches!(ts.tok(pc).kind, TokenKind::Class | TokenKind::Struct)
        && ts.tok(pc).level == ts.tok(pc).brace_level
        && (ts.tok(pc).kind != TokenKind::Struct || !lang.intersects(LangFlags::C))
    {
        functions::mark_class_ctor(ctx, pc);
    }
    let ts = &mut ctx.tokens;

    if ts.tok(pc).kind == TokenKind::OcClass {
        objc::handle_oc_class(ts, pc);
    }

    if ts.tok(pc).kind == TokenKind::Namespace {
        functions::mark_namespace(ts, pc);
    }

    // cast detection (SPAREN/FPAREN already claimed their parens)
    if !lang.intersects(LangFlags::D) {
        let tok = ts.tok(pc);
        if tok.kind == TokenKind::ParenOpen
            && matches!(
                tok.parent,
                TokenKind::None | TokenKind::OcMsg | TokenKind::OcBlockExpr
            )
            && matches!(
                next_kind,
                TokenKind::Word
                    | TokenKind::Type
                    | TokenKind::Struct
                    | TokenKind::Qualifier
                    | TokenKind::Member
                    | TokenKind::DcMember
                    | TokenKind::Enum
                    | TokenKind::Union
            )
            && prev_kind != TokenKind::Sizeof
            && ts.tok_or_empty(prev).parent != TokenKind::Operator
        {
            casts::fix_casts(ts, pc);
        }
    }

    // unary operators at expression starts
    if ts.tok(pc).flags.contains(TokenFlags::EXPR_START) {
        match ts.tok(pc).kind {
            TokenKind::Star => {
                ts.tok_mut(pc).kind = if prev_kind == TokenKind::AngleClose {
                    TokenKind::PtrType
                } else {
                    TokenKind::Deref
                };
            }
            TokenKind::Minus => ts.tok_mut(pc).kind = TokenKind::Neg,
            TokenKind::Plus => ts.tok_mut(pc).kind = TokenKind::Pos,
            TokenKind::IncDecAfter => ts.tok_mut(pc).kind = TokenKind::IncDecBefore,
            TokenKind::Amp => ts.tok_mut(pc).kind = TokenKind::Addr,
            TokenKind::Caret => {
                if lang.intersects(LangFlags::OC) {
                    objc::handle_oc_block_literal(ts, lang, pc);
                }
            }
            _ => {}
        }
    }

    // a variable definition that starts with struct/enum/union/class
    if !ts.tok(pc).flags.contains(TokenFlags::IN_TYPEDEF)
        && ts.tok_or_empty(prev).parent != TokenKind::CppCast
        && !ts
            .tok_or_empty(prev)
            .flags
            .contains(TokenFlags::IN_FCN_DEF)
        && matches!(
            ts.tok(pc).kind,
            TokenKind::Struct | TokenKind::Union | TokenKind::Class | TokenKind::Enum
        )
    {
        if let Some(next) = next {
            let mut tmp = skip_dc_member(ts, next);
            if let Some(t) = tmp {
                if matches!(ts.tok(t).kind, TokenKind::Type | TokenKind::Word) {
                    ts.tok_mut(t).parent = ts.tok(pc).kind;
                    ts.tok_mut(t).kind = TokenKind::Type;
                    tmp = ts.next_nnl(t, Nav::All);
                }
            }
            if let Some(t) = tmp {
                if ts.tok(t).kind == TokenKind::BraceOpen {
                    tmp = ts
                        .skip_to_match(t, Nav::All)
                        .and_then(|c| ts.next_nnl(c, Nav::All));
                }
            }
            if let Some(t) = tmp {
                if ts.tok(t).is_star() || ts.tok(t).is_addr() || ts.tok(t).kind == TokenKind::Word
                {
                    types::mark_variable_definition(ts, t, TokenFlags::VAR_DEF);
                }
            }
        }
    }

    if ts.tok(pc).kind == TokenKind::OcProperty {
        let mut tmp = ts.next_nnl(pc, Nav::All);
        if let Some(t) = tmp {
            if ts.tok(t).is_paren_open() {
                tmp = ts
                    .skip_to_match(t, Nav::All)
                    .and_then(|c| ts.next_nnl(c, Nav::All));
            }
        }
        if let Some(t) = tmp {
            types::fix_var_def(ctx, t);
        }
    }
    let ts = &mut ctx.tokens;

    // the paren pair after a function-like macro
    if ts.tok(pc).kind == TokenKind::MacroFunc {
        if let Some(next) = next {
            flag_parens(
                ts,
                next,
                TokenFlags::IN_FCN_CALL,
                TokenKind::FParenOpen,
                TokenKind::MacroFunc,
                false,
            );
        }
    }

    if matches!(
        ts.tok(pc).kind,
        TokenKind::MacroOpen | TokenKind::MacroElse | TokenKind::MacroClose
    ) && next_kind == TokenKind::ParenOpen
    {
        flag_parens(
            ts,
            next.unwrap(),
            TokenFlags::empty(),
            TokenKind::FParenOpen,
            ts.tok(pc).kind,
            false,
        );
    }

    if ts.tok(pc).kind == TokenKind::Delete && next_kind == TokenKind::TSquare {
        ts.tok_mut(next.unwrap()).parent = TokenKind::Delete;
    }

    // '*' can be a pointer type, a deref, or multiplication
    if ts.tok(pc).kind == TokenKind::Star {
        let next_tok_kind = ts.tok_or_empty(next).kind;
        if ts.tok_or_empty(next).is_paren_close() || next_tok_kind == TokenKind::Comma {
            ts.tok_mut(pc).kind = TokenKind::PtrType;
        } else if lang.intersects(LangFlags::OC) && next_tok_kind == TokenKind::Star {
            // pointer-to-pointer in a message decl
            ts.tok_mut(pc).kind = TokenKind::PtrType;
            ts.tok_mut(pc).parent = prev_kind_parent(ts, prev);
            let parent = ts.tok(pc).parent;
            let n = next.unwrap();
            ts.tok_mut(n).kind = TokenKind::PtrType;
            ts.tok_mut(n).parent = parent;
        } else if prev_kind == TokenKind::Sizeof || prev_kind == TokenKind::Delete {
            ts.tok_mut(pc).kind = TokenKind::Deref;
        } else if (prev_kind == TokenKind::Word && chunk_ends_type(ts, prev))
            || prev_kind == TokenKind::DcMember
            || prev_kind == TokenKind::PtrType
        {
            ts.tok_mut(pc).kind = TokenKind::PtrType;
        } else if next_tok_kind == TokenKind::SquareOpen {
            ts.tok_mut(pc).kind = TokenKind::PtrType;
        } else {
            // most punctuators before a '*' make it a deref; a paren close
            // may end a cast or a macro call
            let ptok = ts.tok_or_empty(prev);
            let deref = ptok.flags.contains(TokenFlags::PUNCTUATOR)
                && (!ptok.is_paren_close() || ptok.parent == TokenKind::MacroFunc)
                && ptok.kind != TokenKind::SquareClose
                && ptok.kind != TokenKind::DcMember;
            ts.tok_mut(pc).kind = if deref {
                TokenKind::Deref
            } else {
                TokenKind::Arith
            };
        }
    }

    if ts.tok(pc).kind == TokenKind::Amp {
        if prev_kind == TokenKind::Delete {
            ts.tok_mut(pc).kind = TokenKind::Addr;
        } else if prev_kind == TokenKind::Type {
            ts.tok_mut(pc).kind = TokenKind::Byref;
        } else {
            ts.tok_mut(pc).kind = TokenKind::Arith;
            if prev_kind == TokenKind::Word {
                let tmp = prev.and_then(|p| ts.prev_nnl(p, Nav::All));
                if tmp.is_some_and(|t| {
                    ts.tok(t).is_semicolon()
                        || ts.tok(t).kind == TokenKind::BraceOpen
                        || ts.tok(t).kind == TokenKind::Qualifier
                }) {
                    ts.tok_mut(prev.unwrap()).kind = TokenKind::Type;
                    ts.tok_mut(pc).kind = TokenKind::Addr;
                }
            }
        }
    }

    if matches!(ts.tok(pc).kind, TokenKind::Minus | TokenKind::Plus) {
        let is_minus = ts.tok(pc).kind == TokenKind::Minus;
        if matches!(prev_kind, TokenKind::Pos | TokenKind::Neg)
            || prev_kind == TokenKind::OcClass
        {
            ts.tok_mut(pc).kind = if is_minus {
                TokenKind::Neg
            } else {
                TokenKind::Pos
            };
        } else {
            ts.tok_mut(pc).kind = TokenKind::Arith;
        }
    }
}

fn prev_kind_parent(ts: &TokenStream, prev: Option<TokenId>) -> TokenKind {
    prev.map(|p| ts.tok(p).parent).unwrap_or(TokenKind::None)
}

/// Run the classifier sweeps.
pub fn fix_symbols(ctx: &mut FileContext) {
    mark_define_expressions(&mut ctx.tokens);

    // sweep 1: collapse wrappers, mark lvalues
    let mut pc_opt = ctx.tokens.head();
    while let Some(pc) = pc_opt {
        let kind = ctx.tokens.tok(pc).kind;
        if matches!(kind, TokenKind::FuncWrap | TokenKind::TypeWrap) {
            functions::handle_wrap(&mut ctx.tokens, pc);
        }
        if ctx.tokens.tok(pc).kind == TokenKind::Assign {
            mark_lvalue(&mut ctx.tokens, pc);
        }
        pc_opt = ctx.tokens.next_nnl(pc, Nav::All);
    }

    // sweep 2: context classification
    let mut pc_opt = ctx.tokens.head();
    if let Some(pc) = pc_opt {
        if ctx.tokens.tok(pc).is_newline() {
            pc_opt = ctx.tokens.next_nnl(pc, Nav::All);
        }
    }
    while let Some(pc) = pc_opt {
        let prev = ctx.tokens.prev_nnl(pc, Nav::Preproc);
        let next = ctx.tokens.next_nnl(pc, Nav::Preproc);
        do_symbol_check(ctx, prev, pc, next);
        pc_opt = ctx.tokens.next_nnl(pc, Nav::All);
    }

    crate::pawn::add_virtual_semicolons(ctx);

    // sweep 3: variable definitions, now that function params are known
    let mut square_level: Option<u32> = None;
    let mut pc_opt = ctx.tokens.head();
    while let Some(pc) = pc_opt {
        let tok = ctx.tokens.tok(pc);

        // no variable definitions inside [ ]
        match square_level {
            None => {
                if tok.kind == TokenKind::SquareOpen {
                    square_level = Some(tok.level);
                }
            }
            Some(lv) => {
                if tok.level <= lv {
                    square_level = None;
                }
            }
        }

        let tok = ctx.tokens.tok(pc);
        if square_level.is_none()
            && tok.flags.contains(TokenFlags::STMT_START)
            && matches!(
                tok.kind,
                TokenKind::Qualifier | TokenKind::Type | TokenKind::Word
            )
            && tok.parent != TokenKind::Enum
            && !tok.flags.contains(TokenFlags::IN_ENUM)
        {
            pc_opt = types::fix_var_def(ctx, pc);
        } else {
            pc_opt = ctx.tokens.next_nnl(pc, Nav::All);
        }
    }
}
