//! The colon pass: every `:` becomes one of the specific colon kinds, and
//! words before label colons become labels.

use log::warn;

use crate::context::FileContext;
use crate::lang::LangFlags;
use crate::stream::Nav;
use crate::token::{TokenFlags, TokenKind};

pub fn combine_labels(ctx: &mut FileContext) {
    let lang = ctx.lang;
    let ts = &mut ctx.tokens;

    let mut question_count = 0u32;
    let mut hit_case = false;
    let mut hit_class = false;

    let Some(first) = ts.head() else { return };
    let mut prev = first;
    let Some(mut cur) = ts.next(first, Nav::All) else {
        return;
    };
    let mut next_opt = ts.next(cur, Nav::All);

    while let Some(next) = next_opt {
        let next_kind = ts.tok(next).kind;

        if !ts.tok(next).flags.contains(TokenFlags::IN_OC_MSG)
            && matches!(
                next_kind,
                TokenKind::Class | TokenKind::OcClass | TokenKind::Template
            )
        {
            hit_class = true;
        }
        if ts.tok(next).is_semicolon() || next_kind == TokenKind::BraceOpen {
            hit_class = false;
        }

        match next_kind {
            TokenKind::Question => question_count += 1,
            TokenKind::Case => {
                if ts.tok(cur).kind == TokenKind::Goto {
                    // "goto case x;"
                    ts.tok_mut(next).kind = TokenKind::Qualifier;
                } else {
                    hit_case = true;
                }
            }
            TokenKind::Colon => {
                if ts.tok(cur).kind == TokenKind::Default {
                    ts.tok_mut(cur).kind = TokenKind::Case;
                    hit_case = true;
                }
                if question_count > 0 {
                    ts.tok_mut(next).kind = TokenKind::CondColon;
                    question_count -= 1;
                } else if hit_case {
                    hit_case = false;
                    ts.tok_mut(next).kind = TokenKind::CaseColon;
                    let tmp = ts.next_nnl(next, Nav::All);
                    if let Some(tmp) = tmp {
                        if ts.tok(tmp).kind == TokenKind::BraceOpen {
                            ts.tok_mut(tmp).parent = TokenKind::Case;
                            let close = ts.next_kind(
                                tmp,
                                TokenKind::BraceClose,
                                Some(ts.tok(tmp).level),
                                Nav::All,
                            );
                            if let Some(close) = close {
                                ts.tok_mut(close).parent = TokenKind::Case;
                            }
                        }
                    }
                } else {
                    let nextprev = ts.prev_nnl(next, Nav::All);

                    if lang.intersects(LangFlags::PAWN) {
                        if matches!(
                            ts.tok(cur).kind,
                            TokenKind::Word | TokenKind::BraceClose
                        ) {
                            // a lone word ending a line is a label; else a
                            // state tag
                            let tmp = ts.next(next, Nav::All);
                            let lone_line = ts.tok(prev).is_newline()
                                && tmp.is_some_and(|t| ts.tok(t).is_newline());
                            let new_kind = if lone_line {
                                ts.tok_mut(next).kind = TokenKind::LabelColon;
                                TokenKind::Label
                            } else {
                                ts.tok_mut(next).kind = TokenKind::TagColon;
                                TokenKind::Tag
                            };
                            if ts.tok(cur).kind == TokenKind::Word {
                                ts.tok_mut(cur).kind = new_kind;
                            }
                        }
                    } else if ts.tok(next).flags.contains(TokenFlags::IN_ARRAY_ASSIGN) {
                        ts.tok_mut(next).kind = TokenKind::DArrayColon;
                    } else if ts.tok(next).flags.contains(TokenFlags::IN_FOR) {
                        ts.tok_mut(next).kind = TokenKind::ForColon;
                    } else if ts.tok(next).flags.contains(TokenFlags::OC_BOXED) {
                        ts.tok_mut(next).kind = TokenKind::OcDictColon;
                    } else if ts.tok(cur).kind == TokenKind::Word {
                        let tmp = ts.next(next, Nav::Preproc);
                        if ts.tok(prev).is_newline()
                            && !tmp.is_some_and(|t| ts.tok(t).kind == TokenKind::Number)
                        {
                            ts.tok_mut(cur).kind = TokenKind::Label;
                            ts.tok_mut(next).kind = TokenKind::LabelColon;
                        } else if ts.tok(next).flags.contains(TokenFlags::IN_FCN_CALL) {
                            // some macro thing, assume a label
                            ts.tok_mut(next).kind = TokenKind::LabelColon;
                        } else {
                            ts.tok_mut(next).kind = TokenKind::BitColon;
                            // the rest of the bitfield group
                            let mut tmp = ts.next(next, Nav::All);
                            while let Some(t) = tmp.and_then(|t| ts.next(t, Nav::All)) {
                                if ts.tok(t).kind == TokenKind::Semicolon {
                                    break;
                                }
                                if ts.tok(t).kind == TokenKind::Colon {
                                    ts.tok_mut(t).kind = TokenKind::BitColon;
                                }
                                tmp = Some(t);
                            }
                        }
                    } else if nextprev.is_some_and(|p| ts.tok(p).kind == TokenKind::FParenClose)
                    {
                        // a method signature colon introduces the bases
                        ts.tok_mut(next).kind = TokenKind::ClassColon;
                    } else if ts.tok(next).level > ts.tok(next).brace_level {
                        // inside a paren: leave it alone
                    } else if ts.tok(cur).kind == TokenKind::Type {
                        ts.tok_mut(next).kind = TokenKind::BitColon;
                    } else if matches!(
                        ts.tok(cur).kind,
                        TokenKind::Enum | TokenKind::Private | TokenKind::Qualifier
                    ) || ts.tok(cur).parent == TokenKind::Align
                    {
                        // bit field, align, or access specifier
                    } else if ts.tok(cur).kind == TokenKind::AngleClose || hit_class {
                        // template or class base list
                    } else if ts.tok(cur).parent == TokenKind::SqlExec {
                        // SQL variable name
                    } else if ts.tok(next).parent == TokenKind::Assert {
                        // java assert
                    } else {
                        let tmp = ts.next_nnl(next, Nav::All);
                        let cs_base = tmp.is_some_and(|t| {
                            matches!(ts.tok(t).kind, TokenKind::Base | TokenKind::This)
                        });
                        if !cs_base {
                            warn!(
                                "{}:{} unexpected colon in col {}",
                                ctx.filename,
                                ts.tok(next).line,
                                ts.tok(next).col
                            );
                        }
                    }
                }
            }
            _ => {}
        }

        prev = cur;
        cur = next;
        next_opt = ts.next(cur, Nav::All);
    }
}
