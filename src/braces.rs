//! Brace/level tracking.
//!
//! One pass over the fresh token stream that assigns `level`,
//! `brace_level` and `pp_level`, converts control-flow parens into
//! `SPAREN`s, inserts virtual braces around unbraced bodies, and keeps a
//! parse-frame stack so `#if`/`#else`/`#endif` branches cannot corrupt the
//! nesting counts.

use log::warn;

use crate::context::FileContext;
use crate::pawn;
use crate::stream::{Nav, TokenId, TokenStream};
use crate::token::{Token, TokenFlags, TokenKind};

/// Progress of a complex (keyword-driven) statement.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum BraceStage {
    #[default]
    None,
    /// Expecting `(` after if/for/switch/while.
    Paren1,
    /// Optional paren: `catch () {`.
    OpParen1,
    /// Expecting the `(` of a while-of-do.
    WodParen,
    /// Expecting the `;` after `while (...)` of a do.
    WodSemi,
    /// Expecting the body of a `do`.
    BraceDo,
    /// Expecting a `{` or a statement.
    Brace2,
    /// Expecting `else` after an if body.
    Else,
    /// Expecting `if` right after `else`.
    ElseIf,
    /// Expecting `while` after a do body.
    While,
    /// Expecting `catch` or `finally` after a try body.
    Catch,
    /// Expecting the value word of a namespace.
    Word,
}

/// Syntax shape attached to control-flow keywords.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum PatternClass {
    None,
    /// keyword + braced statement: do, try, finally
    Braced,
    /// keyword + parens + braced statement: if, for, switch, while
    PBraced,
    /// keyword + optional parens + braced statement: catch, version
    OpBraced,
    /// keyword + value + braced statement: namespace
    VBraced,
    /// special case of Braced for else
    Else,
}

fn pattern_class(kind: TokenKind) -> PatternClass {
    use TokenKind::*;
    match kind {
        If | For | Switch | While | WhileOfDo => PatternClass::PBraced,
        Do | Try | Finally => PatternClass::Braced,
        Catch | Synchronized | DVersion | Invariant => PatternClass::OpBraced,
        Namespace => PatternClass::VBraced,
        Else => PatternClass::Else,
        _ => PatternClass::None,
    }
}

#[derive(Clone, Copy, Default)]
struct PseEntry {
    kind: TokenKind,
    level: u32,
    parent: TokenKind,
    stage: BraceStage,
    in_preproc: bool,
}

/// Counting state, saved and restored around preprocessor branches.
#[derive(Clone, Default)]
pub struct ParseFrame {
    pse: Vec<PseEntry>,
    level: u32,
    brace_level: u32,
    sparen_count: u32,
    for_depth: u32,
    stmt_count: u32,
    expr_count: u32,
    in_ifdef: TokenKind,
}

impl ParseFrame {
    fn top(&self) -> PseEntry {
        self.pse.last().copied().unwrap_or_default()
    }

    fn top_mut(&mut self) -> Option<&mut PseEntry> {
        self.pse.last_mut()
    }

    fn pop(&mut self) {
        self.pse.pop();
    }
}

struct BraceState {
    frames: Vec<ParseFrame>,
    pp_counter: u32,
}

/// `#if` pushes a copy of the current frame; `#else` swaps in the pre-if
/// copy; `#endif` restores the `#if` side. Returns the pp level for the
/// directive's own line.
fn pf_check(state: &mut BraceState, frm: &mut ParseFrame, parent: TokenKind) -> u32 {
    match parent {
        TokenKind::PpIf => {
            let line_pp = state.pp_counter;
            state.pp_counter += 1;
            state.frames.push(frm.clone());
            frm.in_ifdef = TokenKind::PpIf;
            line_pp
        }
        TokenKind::PpElse => {
            let line_pp = state.pp_counter.saturating_sub(1);
            if frm.in_ifdef == TokenKind::PpIf {
                // [...] [base]-[if]: push an [else]
                state.frames.push(frm.clone());
            }
            // copy [base] (the pre-if state) over the live frame
            if state.frames.len() >= 2 {
                *frm = state.frames[state.frames.len() - 2].clone();
            }
            frm.in_ifdef = TokenKind::PpElse;
            line_pp
        }
        TokenKind::PpEndif => {
            state.pp_counter = state.pp_counter.saturating_sub(1);
            let line_pp = state.pp_counter;
            if frm.in_ifdef == TokenKind::PpElse {
                // [...] [base] [if]: keep the if side
                if let Some(top) = state.frames.last() {
                    let keep = top.clone();
                    let prev_ifdef = if state.frames.len() >= 2 {
                        state.frames[state.frames.len() - 2].in_ifdef
                    } else {
                        TokenKind::None
                    };
                    *frm = keep;
                    frm.in_ifdef = prev_ifdef;
                }
                state.frames.pop();
                state.frames.pop();
            } else if frm.in_ifdef == TokenKind::PpIf {
                if let Some(prev) = state.frames.pop() {
                    *frm = prev;
                }
            }
            line_pp
        }
        _ => state.pp_counter,
    }
}

fn insert_vbrace(
    ts: &mut TokenStream,
    at: TokenId,
    after: bool,
    kind: TokenKind,
    frm: &ParseFrame,
) -> TokenId {
    let ref_tok = ts.tok(at);
    let mut vb = Token::new(kind, "");
    vb.line = ref_tok.line;
    vb.col = ref_tok.col;
    vb.col_end = ref_tok.col;
    vb.level = frm.level;
    vb.brace_level = frm.brace_level;
    vb.pp_level = ref_tok.pp_level;
    if after {
        ts.insert_after(at, vb)
    } else {
        ts.insert_before(at, vb)
    }
}

/// Close any virtual braces on top of the stack; `pc` is the token that
/// ended the statement (a real or virtual semicolon, or a close brace).
fn close_statement(ts: &mut TokenStream, frm: &mut ParseFrame, pc: TokenId) {
    frm.stmt_count = 0;
    frm.expr_count = 0;

    let mut anchor = pc;
    while frm.top().kind == TokenKind::VBraceOpen {
        let parent = frm.top().parent;
        frm.level = frm.level.saturating_sub(1);
        frm.brace_level = frm.brace_level.saturating_sub(1);
        frm.pop();
        let vbc = insert_vbrace(ts, anchor, true, TokenKind::VBraceClose, frm);
        ts.tok_mut(vbc).parent = parent;
        anchor = vbc;
        // the virtual close may in turn complete an if/do/try
        handle_complex_close(ts, frm, vbc);
    }
}

/// Called right after popping a close for an entry whose stage is active.
fn handle_complex_close(ts: &mut TokenStream, frm: &mut ParseFrame, pc: TokenId) {
    match frm.top().stage {
        BraceStage::Paren1 => {
            // the (...) part is done, expect the body
            if let Some(top) = frm.top_mut() {
                top.stage = BraceStage::Brace2;
            }
        }
        BraceStage::Brace2 => {
            let kind = frm.top().kind;
            if kind == TokenKind::If || kind == TokenKind::ElseIf {
                if let Some(top) = frm.top_mut() {
                    top.stage = BraceStage::Else;
                }
                let next = ts.next_nnl(pc, Nav::Preproc);
                if next.is_some_and(|n| ts.tok(n).kind != TokenKind::Else) {
                    frm.pop();
                    close_statement(ts, frm, pc);
                }
            } else if kind == TokenKind::Try {
                if let Some(top) = frm.top_mut() {
                    top.stage = BraceStage::Catch;
                }
                let next = ts.next_nnl(pc, Nav::Preproc);
                let continues = next.is_some_and(|n| {
                    matches!(ts.tok(n).kind, TokenKind::Catch | TokenKind::Finally)
                });
                if !continues {
                    frm.pop();
                    close_statement(ts, frm, pc);
                }
            } else {
                frm.pop();
                close_statement(ts, frm, pc);
            }
        }
        BraceStage::BraceDo => {
            if let Some(top) = frm.top_mut() {
                top.stage = BraceStage::While;
            }
        }
        BraceStage::WodParen => {
            if let Some(top) = frm.top_mut() {
                top.stage = BraceStage::WodSemi;
            }
        }
        _ => {}
    }
}

/// Stage transitions driven by the current token. Returns true when the
/// token has been fully consumed by the stage machine.
fn check_complex_statements(ts: &mut TokenStream, frm: &mut ParseFrame, pc: TokenId) -> bool {
    // optional paren becomes either a real paren stage or a body stage
    if frm.top().stage == BraceStage::OpParen1 {
        let stage = if ts.tok(pc).kind != TokenKind::ParenOpen {
            BraceStage::Brace2
        } else {
            BraceStage::Paren1
        };
        if let Some(top) = frm.top_mut() {
            top.stage = stage;
        }
    }

    // namespace value word
    if frm.top().stage == BraceStage::Word {
        if let Some(top) = frm.top_mut() {
            top.stage = BraceStage::Brace2;
        }
        if ts.tok(pc).kind == TokenKind::Word || ts.tok(pc).kind == TokenKind::Type {
            return true;
        }
    }

    // else after an if body
    while frm.top().stage == BraceStage::Else {
        if ts.tok(pc).kind == TokenKind::Else {
            if let Some(top) = frm.top_mut() {
                top.kind = TokenKind::Else;
                top.stage = BraceStage::ElseIf;
            }
            return true;
        }
        frm.pop();
        close_statement(ts, frm, pc);
    }

    // if right after else: collapse into else-if
    if frm.top().stage == BraceStage::ElseIf {
        if ts.tok(pc).kind == TokenKind::If {
            if let Some(top) = frm.top_mut() {
                top.kind = TokenKind::ElseIf;
                top.stage = BraceStage::Paren1;
            }
            return true;
        }
        // plain else body
        if let Some(top) = frm.top_mut() {
            top.stage = BraceStage::Brace2;
        }
    }

    // catch/finally after a try body
    if frm.top().stage == BraceStage::Catch {
        let kind = ts.tok(pc).kind;
        if kind == TokenKind::Catch || kind == TokenKind::Finally {
            if let Some(top) = frm.top_mut() {
                top.kind = kind;
                top.stage = if kind == TokenKind::Catch {
                    BraceStage::OpParen1
                } else {
                    BraceStage::Brace2
                };
            }
            return true;
        }
        frm.pop();
        close_statement(ts, frm, pc);
    }

    // while after a do body
    if frm.top().stage == BraceStage::While {
        if ts.tok(pc).kind == TokenKind::While {
            ts.tok_mut(pc).kind = TokenKind::WhileOfDo;
            if let Some(top) = frm.top_mut() {
                top.kind = TokenKind::WhileOfDo;
                top.stage = BraceStage::WodParen;
            }
            return true;
        }
        frm.pop();
        close_statement(ts, frm, pc);
    }

    // insert a virtual brace for an unbraced body; the keyword entry keeps
    // its stage and advances when the virtual close pops
    if ts.tok(pc).kind != TokenKind::BraceOpen
        && matches!(frm.top().stage, BraceStage::Brace2 | BraceStage::BraceDo)
    {
        let parent = frm.top().kind;
        let vbo = insert_vbrace(ts, pc, false, TokenKind::VBraceOpen, frm);
        ts.tok_mut(vbo).parent = parent;
        frm.level += 1;
        frm.brace_level += 1;
        frm.pse.push(PseEntry {
            kind: TokenKind::VBraceOpen,
            level: ts.tok(vbo).level,
            parent,
            stage: BraceStage::None,
            in_preproc: ts.tok(vbo).is_preproc(),
        });
        frm.stmt_count = 0;
        frm.expr_count = 0;
        // the current token now sits inside the virtual braces
        let tok = ts.tok_mut(pc);
        tok.level = frm.level;
        tok.brace_level = frm.brace_level;
    }

    // a complex statement that never got its paren is thrown out
    if ts.tok(pc).kind != TokenKind::ParenOpen
        && matches!(frm.top().stage, BraceStage::Paren1 | BraceStage::WodParen)
    {
        warn!(
            "line {}: expected '(' after {:?}, giving up on it",
            ts.tok(pc).line,
            frm.top().kind
        );
        frm.pop();
    }

    false
}

/// Core per-token processing: delimiters, stages, statement starts.
fn parse_cleanup(ts: &mut TokenStream, frm: &mut ParseFrame, pc: TokenId) {
    // advance any complex statement in progress; this may wrap the token in
    // virtual braces and reset the statement counts, so it runs before the
    // start marking
    if frm.top().stage != BraceStage::None && check_complex_statements(ts, frm, pc) {
        return;
    }

    let kind = ts.tok(pc).kind;

    // statement/expression starts
    if (frm.stmt_count == 0 || frm.expr_count == 0)
        && !ts.tok(pc).is_semicolon()
        && !matches!(
            kind,
            TokenKind::BraceClose | TokenKind::VBraceClose
        )
        && !ts.tok(pc).is_paren_close()
        && kind != TokenKind::SquareClose
    {
        let mut add = TokenFlags::EXPR_START;
        if frm.stmt_count == 0 {
            add |= TokenFlags::STMT_START;
        }
        ts.tok_mut(pc).flags |= add;
    }
    frm.stmt_count += 1;
    frm.expr_count += 1;

    if frm.sparen_count > 0 {
        ts.tok_mut(pc).flags |= TokenFlags::IN_SPAREN;
        if frm.for_depth > 0 {
            ts.tok_mut(pc).flags |= TokenFlags::IN_FOR;
        }
    }

    // close delimiters
    if matches!(
        kind,
        TokenKind::ParenClose
            | TokenKind::BraceClose
            | TokenKind::VBraceClose
            | TokenKind::AngleClose
            | TokenKind::SquareClose
    ) {
        // a plain ')' closing an SPAREN/FPAREN takes the refined kind
        if kind == TokenKind::ParenClose
            && matches!(
                frm.top().kind,
                TokenKind::SParenOpen | TokenKind::FParenOpen
            )
        {
            let close = frm.top().kind.matching_close().unwrap();
            ts.tok_mut(pc).kind = close;
            if close == TokenKind::SParenClose {
                frm.sparen_count = frm.sparen_count.saturating_sub(1);
                if frm.top().parent == TokenKind::For {
                    frm.for_depth = frm.for_depth.saturating_sub(1);
                }
                ts.tok_mut(pc).flags.remove(TokenFlags::IN_SPAREN);
            }
        }

        let expected = frm.top().kind.matching_close();
        if expected == Some(ts.tok(pc).kind) {
            let parent = frm.top().parent;
            let is_brace =
                matches!(ts.tok(pc).kind, TokenKind::BraceClose | TokenKind::VBraceClose);
            frm.level = frm.level.saturating_sub(1);
            if is_brace {
                frm.brace_level = frm.brace_level.saturating_sub(1);
            }
            let tok = ts.tok_mut(pc);
            tok.parent = parent;
            tok.level = frm.level;
            tok.brace_level = frm.brace_level;
            frm.pop();
            if is_brace {
                frm.stmt_count = 0;
                frm.expr_count = 0;
            }
            if frm.top().stage != BraceStage::None {
                handle_complex_close(ts, frm, pc);
            }
        } else if frm.top().kind != TokenKind::None {
            warn!(
                "line {}: unexpected '{}' (top is {:?})",
                ts.tok(pc).line,
                ts.tok(pc).text,
                frm.top().kind
            );
        }
    }

    let kind = ts.tok(pc).kind;

    // while-of-do semicolon
    if frm.top().stage == BraceStage::WodSemi && ts.tok(pc).is_semicolon() {
        let parent = frm.top().kind;
        ts.tok_mut(pc).parent = parent;
        frm.pop();
        close_statement(ts, frm, pc);
        return;
    }

    // open delimiters
    if matches!(
        kind,
        TokenKind::ParenOpen
            | TokenKind::FParenOpen
            | TokenKind::SParenOpen
            | TokenKind::BraceOpen
            | TokenKind::VBraceOpen
            | TokenKind::AngleOpen
            | TokenKind::SquareOpen
    ) {
        let mut parent = TokenKind::None;

        // complex-statement parens become SPARENs
        if kind == TokenKind::ParenOpen
            && matches!(frm.top().stage, BraceStage::Paren1 | BraceStage::WodParen)
        {
            ts.tok_mut(pc).kind = TokenKind::SParenOpen;
            parent = frm.top().kind;
            frm.sparen_count += 1;
            if parent == TokenKind::For {
                frm.for_depth += 1;
            }
            if let Some(top) = frm.top_mut() {
                top.stage = if top.stage == BraceStage::WodParen {
                    BraceStage::WodSemi
                } else {
                    BraceStage::Paren1
                };
            }
        }

        let kind = ts.tok(pc).kind;
        if matches!(kind, TokenKind::BraceOpen | TokenKind::VBraceOpen) {
            frm.brace_level += 1;
            // the brace of a complex statement takes the keyword as parent;
            // the keyword entry advances when this brace's close pops
            if frm.top().stage == BraceStage::Brace2 || frm.top().stage == BraceStage::BraceDo {
                parent = frm.top().kind;
            }
            frm.stmt_count = 0;
            frm.expr_count = 0;
        }

        ts.tok_mut(pc).parent = parent;
        frm.level += 1;
        frm.pse.push(PseEntry {
            kind: ts.tok(pc).kind,
            level: ts.tok(pc).level,
            parent,
            stage: BraceStage::None,
            in_preproc: ts.tok(pc).is_preproc(),
        });
        // the contents start a fresh expression
        frm.expr_count = 0;
        if matches!(ts.tok(pc).kind, TokenKind::SParenOpen | TokenKind::SquareOpen) {
            frm.stmt_count = 0;
        }
        return;
    }

    // complex statement keywords open a staged entry
    match pattern_class(kind) {
        PatternClass::PBraced => {
            frm.pse.push(PseEntry {
                kind,
                level: frm.level,
                parent: TokenKind::None,
                stage: BraceStage::Paren1,
                in_preproc: ts.tok(pc).is_preproc(),
            });
        }
        PatternClass::Braced => {
            frm.pse.push(PseEntry {
                kind,
                level: frm.level,
                parent: TokenKind::None,
                stage: if kind == TokenKind::Do {
                    BraceStage::BraceDo
                } else {
                    BraceStage::Brace2
                },
                in_preproc: ts.tok(pc).is_preproc(),
            });
        }
        PatternClass::OpBraced => {
            frm.pse.push(PseEntry {
                kind,
                level: frm.level,
                parent: TokenKind::None,
                stage: BraceStage::OpParen1,
                in_preproc: ts.tok(pc).is_preproc(),
            });
        }
        PatternClass::VBraced => {
            // "using namespace foo;" declares nothing to brace
            let prev_using = ts
                .prev_nnl(pc, Nav::Preproc)
                .is_some_and(|p| ts.tok(p).kind == TokenKind::Using);
            if !prev_using {
                frm.pse.push(PseEntry {
                    kind,
                    level: frm.level,
                    parent: TokenKind::None,
                    stage: BraceStage::Word,
                    in_preproc: ts.tok(pc).is_preproc(),
                });
            }
        }
        PatternClass::Else | PatternClass::None => {}
    }

    // statement ends
    if ts.tok(pc).is_semicolon()
        || matches!(kind, TokenKind::Colon | TokenKind::CaseColon)
    {
        if ts.tok(pc).is_semicolon() && frm.top().kind == TokenKind::VBraceOpen {
            close_statement(ts, frm, pc);
        } else {
            frm.stmt_count = 0;
            frm.expr_count = 0;
        }
    } else if matches!(
        kind,
        TokenKind::Comma
            | TokenKind::Assign
            | TokenKind::Arith
            | TokenKind::Caret
            | TokenKind::Compare
            | TokenKind::Bool
            | TokenKind::Question
            | TokenKind::Not
            | TokenKind::Inv
            | TokenKind::Star
            | TokenKind::Plus
            | TokenKind::Minus
            | TokenKind::Amp
            | TokenKind::Return
            | TokenKind::Throw
            | TokenKind::Goto
            | TokenKind::Case
            | TokenKind::Default
            | TokenKind::Lambda
    ) {
        frm.expr_count = 0;
    }
}

/// Walk the stream assigning nesting info and virtual structure.
pub fn brace_cleanup(ctx: &mut FileContext) {
    let mut state = BraceState {
        frames: Vec::new(),
        pp_counter: 0,
    };
    let mut frm = ParseFrame::default();
    let mut in_preproc = TokenKind::None;
    let mut line_pp = 0u32;

    let mut pc_opt = ctx.tokens.head();
    while let Some(pc) = pc_opt {
        let ts = &mut ctx.tokens;
        let tok_kind = ts.tok(pc).kind;

        // leaving a #define body restores the outer frame
        if in_preproc != TokenKind::None && !ts.tok(pc).is_preproc() {
            if in_preproc == TokenKind::PpDefine {
                if let Some(saved) = state.frames.pop() {
                    frm = saved;
                }
            }
            in_preproc = TokenKind::None;
        }

        if tok_kind == TokenKind::Preproc {
            let directive = ts
                .next(pc, Nav::All)
                .map(|n| ts.tok(n).kind)
                .unwrap_or(TokenKind::PpOther);
            ts.tok_mut(pc).parent = directive;
            in_preproc = directive;

            if directive == TokenKind::PpDefine {
                // a define body parses against a scratch frame
                state.frames.push(frm.clone());
                frm = ParseFrame::default();
                frm.level = 1;
                frm.brace_level = 1;
                line_pp = state.pp_counter;
            } else {
                line_pp = pf_check(&mut state, &mut frm, directive);
            }
        }

        // Pawn: a newline can end an unterminated statement
        let mut pc_cur = pc;
        if ctx.lang.intersects(crate::lang::LangFlags::PAWN)
            && frm.top().kind == TokenKind::VBraceOpen
            && tok_kind == TokenKind::Newline
        {
            if let Some(vsemi) = pawn::check_vsemicolon(ts, pc) {
                pc_cur = vsemi;
            }
        }

        let tok = ts.tok(pc_cur);
        if !tok.is_newline() {
            let in_pp = tok.is_preproc();
            let pp = if in_pp { line_pp } else { state.pp_counter };
            let tok = ts.tok_mut(pc_cur);
            tok.level = frm.level;
            tok.brace_level = frm.brace_level;
            tok.pp_level = pp;
            // define bodies parse against the scratch frame; other
            // directives only get their levels, so the statement counters
            // of the surrounding code survive the line
            if !in_pp || in_preproc == TokenKind::PpDefine {
                parse_cleanup(ts, &mut frm, pc_cur);
            }
        }

        pc_opt = ctx.tokens.next(pc_cur, Nav::All);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cleanup::tokenize_cleanup;
    use crate::config::Config;
    use crate::lang::LangFlags;
    use crate::tokenize::tokenize;

    fn run(src: &str, lang: LangFlags) -> FileContext {
        let mut ctx = FileContext::new("test", lang, Config::default());
        tokenize(&mut ctx, src.as_bytes());
        tokenize_cleanup(&mut ctx);
        brace_cleanup(&mut ctx);
        ctx
    }

    fn find(ctx: &FileContext, text: &str) -> TokenId {
        ctx.tokens
            .ids()
            .find(|&id| ctx.tokens.tok(id).text == text)
            .unwrap()
    }

    #[test]
    fn levels_match_on_delimiters() {
        let ctx = run("void f(int a) { if (a) { a = 1; } }", LangFlags::C);
        for id in ctx.tokens.ids() {
            let tok = ctx.tokens.tok(id);
            if tok.kind.matching_close().is_some() {
                let close = ctx.tokens.skip_to_match(id, Nav::All).unwrap();
                assert_eq!(
                    tok.level,
                    ctx.tokens.tok(close).level,
                    "mismatch for {:?}",
                    tok.text
                );
            }
        }
    }

    #[test]
    fn sparen_conversion_and_flags() {
        let ctx = run("if (x) { y(); }", LangFlags::C);
        let open = find(&ctx, "(");
        assert_eq!(ctx.tokens.tok(open).kind, TokenKind::SParenOpen);
        assert_eq!(ctx.tokens.tok(open).parent, TokenKind::If);
        let x = find(&ctx, "x");
        assert!(ctx.tokens.tok(x).flags.contains(TokenFlags::IN_SPAREN));
    }

    #[test]
    fn unbraced_if_gets_virtual_braces() {
        let ctx = run("if (x) y = 1; z = 2;", LangFlags::C);
        let kinds: Vec<_> = ctx
            .tokens
            .ids()
            .map(|id| ctx.tokens.tok(id).kind)
            .collect();
        assert!(kinds.contains(&TokenKind::VBraceOpen));
        assert!(kinds.contains(&TokenKind::VBraceClose));
        let y = find(&ctx, "y");
        let z = find(&ctx, "z");
        assert_eq!(ctx.tokens.tok(y).brace_level, 1);
        assert_eq!(ctx.tokens.tok(z).brace_level, 0);
    }

    #[test]
    fn do_while_stages() {
        let ctx = run("do { x(); } while (x); y();", LangFlags::C);
        let wod = ctx
            .tokens
            .ids()
            .find(|&id| ctx.tokens.tok(id).kind == TokenKind::WhileOfDo);
        assert!(wod.is_some());
        let y = find(&ctx, "y");
        assert_eq!(ctx.tokens.tok(y).level, 0);
    }

    #[test]
    fn else_if_chain_levels_recover() {
        let ctx = run("if (a) x = 1; else if (b) x = 2; else x = 3; done();", LangFlags::C);
        let done = find(&ctx, "done");
        assert_eq!(ctx.tokens.tok(done).level, 0);
        assert_eq!(ctx.tokens.tok(done).brace_level, 0);
        assert!(ctx.tokens.tok(done).flags.contains(TokenFlags::STMT_START));
    }

    #[test]
    fn for_flags() {
        let ctx = run("for (i = 0; i < 3; i++) x(i);", LangFlags::C);
        let zero = find(&ctx, "0");
        assert!(ctx.tokens.tok(zero).flags.contains(TokenFlags::IN_FOR));
        assert!(ctx.tokens.tok(zero).flags.contains(TokenFlags::IN_SPAREN));
    }

    #[test]
    fn pp_levels() {
        let ctx = run("#if A\nint x;\n#endif\nint y;", LangFlags::C);
        let x = find(&ctx, "x");
        assert_eq!(ctx.tokens.tok(x).pp_level, 1);
        let y = find(&ctx, "y");
        assert_eq!(ctx.tokens.tok(y).pp_level, 0);
    }

    #[test]
    fn define_body_does_not_leak_levels() {
        let ctx = run("#define OPEN {\nint x;", LangFlags::C);
        let x = find(&ctx, "x");
        assert_eq!(ctx.tokens.tok(x).level, 0);
        assert_eq!(ctx.tokens.tok(x).brace_level, 0);
    }

    #[test]
    fn if_else_branches_share_counts() {
        let src = "void f() {\n#if A\n  if (x) {\n#else\n  if (y) {\n#endif\n    z();\n  }\n}\n";
        let ctx = run(src, LangFlags::C);
        let z = find(&ctx, "z");
        assert_eq!(ctx.tokens.tok(z).brace_level, 2);
        // the closing brace of f ends at level 0
        let last_close = ctx
            .tokens
            .ids()
            .filter(|&id| ctx.tokens.tok(id).kind == TokenKind::BraceClose)
            .last()
            .unwrap();
        assert_eq!(ctx.tokens.tok(last_close).level, 0);
    }

    #[test]
    fn statement_starts_are_marked() {
        let ctx = run("int a; int b;", LangFlags::C);
        let a_int = ctx.tokens.head().unwrap();
        assert!(ctx.tokens.tok(a_int).flags.contains(TokenFlags::STMT_START));
        let b = find(&ctx, "b");
        let b_int = ctx.tokens.prev_nnl(b, Nav::All).unwrap();
        assert!(ctx.tokens.tok(b_int).flags.contains(TokenFlags::STMT_START));
        assert!(!ctx.tokens.tok(b).flags.contains(TokenFlags::STMT_START));
    }
}
