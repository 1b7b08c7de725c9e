//! Byte stream → token stream.
//!
//! A single-character-lookahead scanner over the raw bytes. Every
//! speculative parser saves the cursor up front and restores it on failure,
//! so dispatch order is the only thing that decides between overlapping
//! forms. The scanner never fails a file: bytes nothing claims become
//! `UNKNOWN` tokens.

use log::warn;

use crate::config::next_tab_column;
use crate::context::FileContext;
use crate::keywords::find_keyword_type;
use crate::lang::LangFlags;
use crate::punctuators::find_punctuator;
use crate::token::{Token, TokenFlags, TokenKind};

/// Identifier start byte. Non-ASCII bytes are allowed so that UTF-8
/// identifiers survive as plain words.
pub fn is_word_start(ch: u8) -> bool {
    ch.is_ascii_alphabetic() || ch == b'_' || ch == b'$' || ch >= 0x80
}

/// Identifier continuation byte.
pub fn is_word_char(ch: u8) -> bool {
    is_word_start(ch) || ch.is_ascii_digit()
}

fn is_word_start_i(ch: i32) -> bool {
    (0..=255).contains(&ch) && is_word_start(ch as u8)
}

fn is_word_char_i(ch: i32) -> bool {
    (0..=255).contains(&ch) && is_word_char(ch as u8)
}

fn is_space_i(ch: i32) -> bool {
    matches!(ch, 0x09..=0x0d | 0x20)
}

fn is_dec(ch: i32) -> bool {
    (b'0' as i32..=b'9' as i32).contains(&ch)
}

fn is_dec_(ch: i32) -> bool {
    is_dec(ch) || ch == b'_' as i32
}

fn is_bin_(ch: i32) -> bool {
    ch == b'0' as i32 || ch == b'1' as i32 || ch == b'_' as i32
}

fn is_oct_(ch: i32) -> bool {
    (b'0' as i32..=b'7' as i32).contains(&ch) || ch == b'_' as i32
}

fn is_hex(ch: i32) -> bool {
    is_dec(ch)
        || (b'a' as i32..=b'f' as i32).contains(&ch)
        || (b'A' as i32..=b'F' as i32).contains(&ch)
}

fn is_hex_(ch: i32) -> bool {
    is_hex(ch) || ch == b'_' as i32
}

#[derive(Clone, Copy)]
struct CursorState {
    idx: usize,
    row: u32,
    col: u32,
    last_ch: i32,
}

/// Byte cursor with line/column bookkeeping and save/restore checkpoints.
struct Cursor<'a> {
    data: &'a [u8],
    tab_size: u32,
    st: CursorState,
}

impl<'a> Cursor<'a> {
    fn new(data: &'a [u8], tab_size: u32) -> Self {
        Cursor {
            data,
            tab_size,
            st: CursorState {
                idx: 0,
                row: 1,
                col: 1,
                last_ch: 0,
            },
        }
    }

    fn more(&self) -> bool {
        self.st.idx < self.data.len()
    }

    fn peek(&self) -> i32 {
        self.peek_at(0)
    }

    fn peek_at(&self, offset: usize) -> i32 {
        match self.data.get(self.st.idx + offset) {
            Some(&b) => b as i32,
            None => -1,
        }
    }

    fn get(&mut self) -> i32 {
        if !self.more() {
            return -1;
        }
        let ch = self.data[self.st.idx] as i32;
        self.st.idx += 1;
        match ch as u8 {
            b'\t' => self.st.col = next_tab_column(self.st.col, self.tab_size),
            b'\n' => {
                if self.st.last_ch != b'\r' as i32 {
                    self.st.row += 1;
                    self.st.col = 1;
                }
            }
            b'\r' => {
                self.st.row += 1;
                self.st.col = 1;
            }
            b => {
                // UTF-8 continuation bytes do not advance the column
                if (b & 0xC0) != 0x80 {
                    self.st.col += 1;
                }
            }
        }
        self.st.last_ch = ch;
        ch
    }

    fn expect(&mut self, ch: u8) -> bool {
        if self.peek() == ch as i32 {
            self.get();
            return true;
        }
        false
    }

    fn save(&self) -> CursorState {
        self.st
    }

    fn restore(&mut self, st: CursorState) {
        self.st = st;
    }
}

/// Token under construction.
#[derive(Default)]
struct Scratch {
    kind: TokenKind,
    flags: TokenFlags,
    text: Vec<u8>,
    line: u32,
    col: u32,
}

impl Scratch {
    fn push(&mut self, ch: i32) {
        if ch >= 0 {
            self.text.push(ch as u8);
        }
    }
}

fn parse_whitespace(cur: &mut Cursor, pc: &mut Scratch) -> bool {
    let mut nl_found = false;
    let mut any = false;
    while is_space_i(cur.peek()) {
        if cur.get() == b'\n' as i32 {
            nl_found = true;
        }
        any = true;
    }
    if any {
        pc.kind = if nl_found {
            TokenKind::Newline
        } else {
            TokenKind::Whitespace
        };
        if nl_found {
            pc.text = b"\n".to_vec();
        }
    }
    any
}

/// A `\` followed only by whitespace up to the newline is a line
/// continuation.
fn parse_bs_newline(cur: &mut Cursor, pc: &mut Scratch) -> bool {
    let saved = cur.save();
    cur.get(); // the backslash
    loop {
        let ch = cur.peek();
        if !is_space_i(ch) {
            break;
        }
        cur.get();
        if ch == b'\r' as i32 || ch == b'\n' as i32 {
            if ch == b'\r' as i32 {
                cur.expect(b'\n');
            }
            pc.text = b"\\".to_vec();
            pc.kind = TokenKind::NlCont;
            return true;
        }
    }
    cur.restore(saved);
    false
}

/// `//`, `/* */`, and D's nestable `/+ +/`. Comments are whitespace to the
/// rest of the pipeline.
fn parse_comment(cur: &mut Cursor, pc: &mut Scratch, lang: LangFlags) -> bool {
    let is_d = lang.intersects(LangFlags::D);
    let ch = cur.peek_at(1);

    if cur.peek() != b'/' as i32
        || (ch != b'*' as i32 && ch != b'/' as i32 && (ch != b'+' as i32 || !is_d))
    {
        return false;
    }

    let saved = cur.save();
    cur.get();
    cur.get();

    if ch == b'/' as i32 {
        pc.kind = TokenKind::Whitespace;
        loop {
            let mut bs_cnt = 0;
            loop {
                let ch = cur.peek();
                if ch < 0 || ch == b'\r' as i32 || ch == b'\n' as i32 {
                    break;
                }
                if ch == b'\\' as i32 {
                    bs_cnt += 1;
                } else {
                    bs_cnt = 0;
                }
                cur.get();
            }
            // an odd run of backslashes right before the newline continues
            // the comment on the next line
            if (bs_cnt & 1) == 0 || !cur.more() {
                break;
            }
            if cur.peek() == b'\r' as i32 {
                cur.get();
            }
            if cur.peek() == b'\n' as i32 {
                cur.get();
            }
        }
    } else if !cur.more() {
        cur.restore(saved);
        return false;
    } else if ch == b'*' as i32 {
        pc.kind = TokenKind::Whitespace;
        loop {
            let ch = cur.get();
            if ch < 0 {
                break;
            }
            if ch == b'*' as i32 && cur.peek() == b'/' as i32 {
                cur.get();
                break;
            }
        }
    } else {
        // '/+' nests
        pc.kind = TokenKind::Whitespace;
        let mut d_level = 1;
        while d_level > 0 && cur.more() {
            if cur.peek() == b'+' as i32 && cur.peek_at(1) == b'/' as i32 {
                cur.get();
                cur.get();
                d_level -= 1;
                continue;
            }
            if cur.peek() == b'/' as i32 && cur.peek_at(1) == b'+' as i32 {
                cur.get();
                cur.get();
                d_level += 1;
                continue;
            }
            let ch = cur.get();
            if ch == b'\r' as i32 && cur.peek() == b'\n' as i32 {
                cur.get();
            }
        }
    }
    true
}

/// Consume a user-defined literal suffix. Format-specifier macros spliced
/// onto strings (`"%"PRIx32`) are backed out and left as identifiers.
fn parse_suffix(cur: &mut Cursor, pc: &mut Scratch, forstring: bool) {
    if !is_word_start_i(cur.peek()) {
        return;
    }
    let p1 = cur.peek();
    let p2 = cur.peek_at(1);
    if forstring
        && (((p1 == b'L' as i32) && (p2 == b'"' as i32 || p2 == b'\'' as i32))
            || ((p1 == b'S' as i32) && p2 == b'"' as i32))
    {
        return;
    }
    let saved = cur.save();
    let old_len = pc.text.len();
    let mut slen = 0;
    while cur.more() && is_word_char_i(cur.peek()) {
        slen += 1;
        let ch = cur.get();
        pc.push(ch);
    }
    if forstring && slen >= 4 {
        let suffix = &pc.text[old_len..];
        if suffix.starts_with(b"PRI") || suffix.starts_with(b"SCN") {
            cur.restore(saved);
            pc.text.truncate(old_len);
        }
    }
}

/// Numbers in every supported dialect: hex/binary/octal prefixes, D
/// underscores, exponents, the union of all suffix letters, and the
/// Microsoft `i64` tail.
fn parse_number(cur: &mut Cursor, pc: &mut Scratch) -> bool {
    if !is_dec(cur.peek()) && (cur.peek() != b'.' as i32 || !is_dec(cur.peek_at(1))) {
        return false;
    }

    let mut is_float = cur.peek() == b'.' as i32;
    if is_float && cur.peek_at(1) == b'.' as i32 {
        return false;
    }

    let mut did_hex = false;
    if cur.peek() == b'0' as i32 {
        let ch = cur.get();
        pc.push(ch);
        match cur.peek() {
            x if x == b'x' as i32 || x == b'X' as i32 => {
                did_hex = true;
                loop {
                    let ch = cur.get();
                    pc.push(ch);
                    if !is_hex_(cur.peek()) {
                        break;
                    }
                }
            }
            b if b == b'b' as i32 || b == b'B' as i32 => loop {
                let ch = cur.get();
                pc.push(ch);
                if !is_bin_(cur.peek()) {
                    break;
                }
            },
            d if is_dec(d) => loop {
                let ch = cur.get();
                pc.push(ch);
                if !is_oct_(cur.peek()) {
                    break;
                }
            },
            _ => {} // just 0, or 0.1, or 0UL
        }
    } else {
        while is_dec_(cur.peek()) {
            let ch = cur.get();
            pc.push(ch);
        }
    }

    if cur.peek() == b'.' as i32 && cur.peek_at(1) != b'.' as i32 {
        let ch = cur.get();
        pc.push(ch);
        is_float = true;
        if did_hex {
            while is_hex_(cur.peek()) {
                let ch = cur.get();
                pc.push(ch);
            }
        } else {
            while is_dec_(cur.peek()) {
                let ch = cur.get();
                pc.push(ch);
            }
        }
    }

    // exponent: e/E everywhere, p/P for hex floats
    let tmp = cur.peek() | 0x20;
    if tmp == b'e' as i32 || tmp == b'p' as i32 {
        is_float = true;
        let ch = cur.get();
        pc.push(ch);
        if cur.peek() == b'+' as i32 || cur.peek() == b'-' as i32 {
            let ch = cur.get();
            pc.push(ch);
        }
        while is_dec_(cur.peek()) {
            let ch = cur.get();
            pc.push(ch);
        }
    }

    // suffixes; i/f/d/m only appear on floats
    loop {
        let tmp = cur.peek() | 0x20;
        if tmp == b'i' as i32 || tmp == b'f' as i32 || tmp == b'd' as i32 || tmp == b'm' as i32 {
            is_float = true;
        } else if tmp != b'l' as i32 && tmp != b'u' as i32 {
            break;
        }
        let ch = cur.get();
        pc.push(ch);
    }

    if cur.peek() == b'6' as i32 && cur.peek_at(1) == b'4' as i32 {
        let ch = cur.get();
        pc.push(ch);
        let ch = cur.get();
        pc.push(ch);
    }

    pc.kind = if is_float {
        TokenKind::NumberFp
    } else {
        TokenKind::Number
    };

    // anything still glued on is macro junk or a literal suffix
    parse_suffix(cur, pc, false);
    true
}

/// Quoted strings and char constants. `quote_idx` counts prefix bytes
/// before the quote (`L"..."` has one). `<...>` include strings close with
/// `>`.
fn parse_string(
    cur: &mut Cursor,
    pc: &mut Scratch,
    escape_char: u8,
    escape_char2: u8,
    quote_idx: usize,
    allow_escape: bool,
) -> bool {
    pc.text.clear();
    for _ in 0..quote_idx {
        let ch = cur.get();
        pc.push(ch);
    }

    pc.kind = TokenKind::String;
    let end_ch = match cur.peek() {
        x if x == b'<' as i32 => b'>' as i32,
        x => x,
    };
    let ch = cur.get();
    pc.push(ch); // the opening quote

    let mut escaped = false;
    while cur.more() {
        let ch = cur.get();
        pc.push(ch);
        if ch == b'\n' as i32 {
            pc.kind = TokenKind::StringMulti;
            escaped = false;
            continue;
        }
        if ch == b'\r' as i32 && cur.peek() != b'\n' as i32 {
            let ch = cur.get();
            pc.push(ch);
            pc.kind = TokenKind::StringMulti;
            escaped = false;
            continue;
        }
        if !escaped {
            if ch == escape_char as i32 && escape_char != 0 {
                escaped = true;
            } else if ch == escape_char2 as i32 && escape_char2 != 0 && cur.peek() == end_ch {
                escaped = allow_escape;
            } else if ch == end_ch {
                break;
            }
        } else {
            escaped = false;
        }
    }

    parse_suffix(cur, pc, true);
    true
}

/// C# verbatim string: `@"..."`, doubled quotes do not terminate.
fn parse_cs_string(cur: &mut Cursor, pc: &mut Scratch) -> bool {
    let ch = cur.get();
    pc.push(ch); // '@'
    let ch = cur.get();
    pc.push(ch); // '"'

    while cur.more() {
        let ch = cur.get();
        pc.push(ch);
        if ch == b'"' as i32 {
            if cur.peek() == b'"' as i32 {
                let ch = cur.get();
                pc.push(ch);
            } else {
                break;
            }
        }
    }
    pc.kind = TokenKind::String;
    true
}

/// C++11 raw string: `R"tag( ... )tag"`, with optional u8/u/U prefixes.
fn parse_cr_string(cur: &mut Cursor, pc: &mut Scratch, q_idx: usize) -> bool {
    let saved = cur.save();
    let tag_start = cur.st.idx + q_idx + 1;

    pc.text.clear();
    for _ in 0..=q_idx {
        let ch = cur.get();
        pc.push(ch);
    }

    let mut tag_len = 0;
    while cur.more() && cur.peek() != b'(' as i32 {
        tag_len += 1;
        let ch = cur.get();
        pc.push(ch);
    }
    if cur.peek() != b'(' as i32 {
        cur.restore(saved);
        return false;
    }
    let tag = cur.data[tag_start..tag_start + tag_len].to_vec();

    pc.kind = TokenKind::String;
    while cur.more() {
        if cur.peek() == b')' as i32
            && cur.peek_at(tag_len + 1) == b'"' as i32
            && cur.data[cur.st.idx + 1..].starts_with(&tag)
        {
            for _ in 0..tag_len + 2 {
                let ch = cur.get();
                pc.push(ch);
            }
            parse_suffix(cur, pc, false);
            return true;
        }
        if cur.peek() == b'\n' as i32 {
            pc.kind = TokenKind::StringMulti;
        }
        let ch = cur.get();
        pc.push(ch);
    }
    cur.restore(saved);
    false
}

/// All the D string forms: WYSIWYG `r"..."`/backtick, hex `x"..."`, plain
/// quotes, and the non-quoted escape constants (`\n`, `\x12`, `ሴ`,
/// octal, `\&entity;`).
fn d_parse_string(cur: &mut Cursor, pc: &mut Scratch, escape_char: u8, escape_char2: u8) -> bool {
    let ch = cur.peek();

    if ch == b'"' as i32 || ch == b'\'' as i32 || ch == b'`' as i32 {
        return parse_string(cur, pc, escape_char, escape_char2, 0, true);
    }
    if ch == b'\\' as i32 {
        let saved = cur.save();
        pc.text.clear();
        while cur.peek() == b'\\' as i32 {
            let ch = cur.get();
            pc.push(ch);
            match cur.peek() {
                x if x == b'x' as i32 => {
                    for _ in 0..3 {
                        let ch = cur.get();
                        pc.push(ch);
                    }
                }
                u if u == b'u' as i32 => {
                    for _ in 0..5 {
                        let ch = cur.get();
                        pc.push(ch);
                    }
                }
                u if u == b'U' as i32 => {
                    for _ in 0..9 {
                        let ch = cur.get();
                        pc.push(ch);
                    }
                }
                o if (b'0' as i32..=b'7' as i32).contains(&o) => {
                    // up to three octal digits
                    let ch = cur.get();
                    pc.push(ch);
                    for _ in 0..2 {
                        if (b'0' as i32..=b'7' as i32).contains(&cur.peek()) {
                            let ch = cur.get();
                            pc.push(ch);
                        }
                    }
                }
                a if a == b'&' as i32 => {
                    let ch = cur.get();
                    pc.push(ch);
                    while (cur.peek() as u8 as char).is_ascii_alphabetic() && cur.peek() > 0 {
                        let ch = cur.get();
                        pc.push(ch);
                    }
                    if cur.peek() == b';' as i32 {
                        let ch = cur.get();
                        pc.push(ch);
                    }
                }
                _ => {
                    let ch = cur.get();
                    pc.push(ch);
                }
            }
        }
        if pc.text.len() > 1 {
            pc.kind = TokenKind::String;
            return true;
        }
        cur.restore(saved);
    } else if (ch == b'r' as i32 || ch == b'x' as i32) && cur.peek_at(1) == b'"' as i32 {
        return parse_string(cur, pc, escape_char, escape_char2, 1, false);
    }
    false
}

/// An identifier, possibly refined into a keyword or macro name.
#[allow(clippy::too_many_arguments)]
fn parse_word(
    cur: &mut Cursor,
    pc: &mut Scratch,
    ctx: &FileContext,
    mut skipcheck: bool,
    preproc_ncnl_count: u32,
    in_preproc: TokenKind,
) -> bool {
    pc.text.clear();
    let ch = cur.get();
    pc.push(ch);

    while cur.more() && is_word_char_i(cur.peek()) {
        let ch = cur.get();
        pc.push(ch);
        // non-ASCII bytes only ever form plain identifiers
        if ch > 0x7f {
            skipcheck = true;
        }
    }
    pc.kind = TokenKind::Word;

    if skipcheck {
        return true;
    }

    // names defined by a #define get their own kinds
    if in_preproc == TokenKind::PpDefine && preproc_ncnl_count == 1 {
        pc.kind = if cur.peek() == b'(' as i32 {
            TokenKind::MacroFunc
        } else {
            TokenKind::Macro
        };
        return true;
    }

    let text = String::from_utf8_lossy(&pc.text);
    if ctx.is_lang(LangFlags::JAVA) && text.starts_with('@') && text != "@interface" {
        pc.kind = TokenKind::Annotation;
        return true;
    }

    pc.kind = find_keyword_type(&text, in_preproc, ctx.lang, &ctx.config.extra_keywords);
    if pc.kind != TokenKind::Word {
        pc.flags |= TokenFlags::KEYWORD;
    }
    true
}

/// One token worth of bytes. Returns false only at end of input.
fn parse_next(
    cur: &mut Cursor,
    pc: &mut Scratch,
    ctx: &FileContext,
    preproc_ncnl_count: u32,
    in_preproc: TokenKind,
) -> bool {
    if !cur.more() {
        return false;
    }
    pc.line = cur.st.row;
    pc.col = cur.st.col;
    pc.kind = TokenKind::None;
    pc.flags = TokenFlags::empty();
    pc.text.clear();

    if parse_whitespace(cur, pc) {
        return true;
    }

    // unhandled directives keep their bodies as one opaque chunk
    if in_preproc.is_unhandled_preproc() {
        pc.kind = TokenKind::PreprocBody;
        let mut last = 0;
        let mut saved = cur.save();
        while cur.more() {
            let ch = cur.peek();
            if ch == b'\n' as i32 || ch == b'\r' as i32 {
                // back off an escaped newline
                if last == b'\\' as i32 {
                    cur.restore(saved);
                    pc.text.pop();
                }
                break;
            }
            if ch == b'/' as i32 && cur.peek_at(1) == b'/' as i32 {
                break;
            }
            last = ch;
            saved = cur.save();
            let ch = cur.get();
            pc.push(ch);
        }
        if !pc.text.is_empty() {
            return true;
        }
    }

    if cur.peek() == b'\\' as i32 && parse_bs_newline(cur, pc) {
        return true;
    }

    if parse_comment(cur, pc, ctx.lang) {
        return true;
    }

    // C# verbatim strings and @-quoted identifiers
    if ctx.is_lang(LangFlags::CS) && cur.peek() == b'@' as i32 {
        if cur.peek_at(1) == b'"' as i32 {
            return parse_cs_string(cur, pc);
        }
        if is_word_start_i(cur.peek_at(1)) {
            return parse_word(cur, pc, ctx, true, preproc_ncnl_count, in_preproc);
        }
    }

    // C++0x u8"x" u"x" U"x" R"tag(raw)tag"
    let ch = cur.peek();
    if ctx.is_lang(LangFlags::CPP)
        && (ch == b'u' as i32 || ch == b'U' as i32 || ch == b'R' as i32)
    {
        let mut idx = 0;
        let mut is_raw = false;
        if ch == b'u' as i32 && cur.peek_at(1) == b'8' as i32 {
            idx = 2;
        } else if (ch | 0x20) == b'u' as i32 {
            idx += 1;
        }
        if cur.peek_at(idx) == b'R' as i32 {
            idx += 1;
            is_raw = true;
        }
        if cur.peek_at(idx) == b'"' as i32 {
            if is_raw {
                if parse_cr_string(cur, pc, idx) {
                    return true;
                }
            } else if parse_string(
                cur,
                pc,
                ctx.config.string_escape_char,
                ctx.config.string_escape_char2,
                idx,
                true,
            ) {
                return true;
            }
        }
    }

    // PAWN strings: \"hi" or !"hi" or !\"hi" or \!"hi"
    if ctx.is_lang(LangFlags::PAWN)
        && (cur.peek() == b'\\' as i32 || cur.peek() == b'!' as i32)
    {
        if cur.peek_at(1) == b'"' as i32 {
            return parse_string(
                cur,
                pc,
                ctx.config.string_escape_char,
                ctx.config.string_escape_char2,
                1,
                cur.peek() == b'!' as i32,
            );
        }
        if (cur.peek_at(1) == b'\\' as i32 || cur.peek_at(1) == b'!' as i32)
            && cur.peek_at(2) == b'"' as i32
        {
            return parse_string(
                cur,
                pc,
                ctx.config.string_escape_char,
                ctx.config.string_escape_char2,
                2,
                false,
            );
        }
    }

    if parse_number(cur, pc) {
        return true;
    }

    if ctx.is_lang(LangFlags::D) {
        if d_parse_string(
            cur,
            pc,
            ctx.config.string_escape_char,
            ctx.config.string_escape_char2,
        ) {
            return true;
        }
    } else {
        // L'a', L"abc", S"abc", 'a', "abc", and <abc> in #include
        let ch = cur.peek();
        let ch1 = cur.peek_at(1);
        if (((ch == b'L' as i32 || ch == b'S' as i32)
            && (ch1 == b'"' as i32 || ch1 == b'\'' as i32))
            || ch == b'"' as i32
            || ch == b'\'' as i32
            || (ch == b'<' as i32 && in_preproc == TokenKind::PpInclude))
        {
            return parse_string(
                cur,
                pc,
                ctx.config.string_escape_char,
                ctx.config.string_escape_char2,
                usize::from(is_word_start_i(ch)),
                true,
            );
        }

        if ch == b'<' as i32 && in_preproc == TokenKind::PpDefine {
            let tail_is_macro = ctx
                .tokens
                .tail()
                .is_some_and(|id| ctx.tokens.tok(id).kind == TokenKind::Macro);
            if tail_is_macro {
                // "#define XXX <": assume '<' starts an include string
                return parse_string(
                    cur,
                    pc,
                    ctx.config.string_escape_char,
                    ctx.config.string_escape_char2,
                    0,
                    false,
                );
            }
        }
    }

    // Objective-C literals: @"str", @'c', @123
    if ctx.is_lang(LangFlags::OC) && cur.peek() == b'@' as i32 {
        let nc = cur.peek_at(1);
        if nc == b'"' as i32 || nc == b'\'' as i32 {
            return parse_string(
                cur,
                pc,
                ctx.config.string_escape_char,
                ctx.config.string_escape_char2,
                1,
                true,
            );
        }
        if is_dec(nc) {
            let ch = cur.get();
            pc.push(ch);
            return parse_number(cur, pc);
        }
    }

    // identifiers, including @-words for OC / Pawn / Java
    if is_word_start_i(cur.peek())
        || (cur.peek() == b'@' as i32 && is_word_start_i(cur.peek_at(1)))
    {
        return parse_word(cur, pc, ctx, false, preproc_ncnl_count, in_preproc);
    }

    let window = [
        cur.peek().max(0) as u8,
        cur.peek_at(1).max(0) as u8,
        cur.peek_at(2).max(0) as u8,
        cur.peek_at(3).max(0) as u8,
    ];
    let window_len = (0..4).take_while(|&i| cur.peek_at(i) >= 0).count();
    if let Some(punc) = find_punctuator(&window[..window_len], ctx.lang) {
        for _ in 0..punc.tag.len() {
            let ch = cur.get();
            pc.push(ch);
        }
        pc.kind = punc.kind;
        pc.flags |= TokenFlags::PUNCTUATOR;
        return true;
    }

    // throw away this byte
    pc.kind = TokenKind::Unknown;
    let ch = cur.get();
    pc.push(ch);
    warn!(
        "{}:{} garbage in col {}: 0x{:02x}",
        ctx.filename, pc.line, pc.col, pc.text[0]
    );
    true
}

/// Tokenize the whole buffer into `ctx.tokens`.
pub fn tokenize(ctx: &mut FileContext, data: &[u8]) {
    let mut cur = Cursor::new(data, ctx.config.input_tab_size);
    let mut pc = Scratch::default();
    let mut in_preproc = TokenKind::None;
    let mut preproc_ncnl_count: u32 = 0;

    while cur.more() {
        if !parse_next(&mut cur, &mut pc, ctx, preproc_ncnl_count, in_preproc) {
            warn!("{}:{} bailed before the end?", ctx.filename, cur.st.row);
            break;
        }

        if pc.kind == TokenKind::Whitespace {
            continue;
        }

        if pc.kind == TokenKind::NlCont {
            pc.text = b"\\\n".to_vec();
        }

        // strip trailing whitespace (cpp comments and pp blocks)
        while pc
            .text
            .last()
            .is_some_and(|&b| b == b' ' || b == b'\t')
        {
            pc.text.pop();
        }

        let mut tok = Token {
            kind: pc.kind,
            parent: TokenKind::None,
            line: pc.line,
            col: pc.col,
            col_end: cur.st.col,
            flags: pc.flags,
            level: 0,
            brace_level: 0,
            pp_level: 0,
            text: String::from_utf8_lossy(&pc.text).into_owned(),
            scope: String::new(),
        };

        let rprev = ctx.tokens.tail();
        if let Some(rprev) = rprev {
            tok.flags |= ctx.tokens.tok(rprev).flags & TokenFlags::COPY_FLAGS;
            // a newline can't be in a preprocessor
            if tok.kind == TokenKind::Newline {
                tok.flags.remove(TokenFlags::IN_PREPROC);
            }
        }
        let id = ctx.tokens.push_back(tok);

        // a newline marks the end of a preprocessor
        if ctx.tokens.tok(id).kind == TokenKind::Newline {
            in_preproc = TokenKind::None;
            preproc_ncnl_count = 0;
        }

        if in_preproc != TokenKind::None {
            ctx.tokens.tok_mut(id).flags |= TokenFlags::IN_PREPROC;
            if !ctx.tokens.tok(id).is_newline() {
                preproc_ncnl_count += 1;
            }
            // the first word after '#' decides the directive kind
            if in_preproc == TokenKind::Preproc {
                let tok = ctx.tokens.tok_mut(id);
                if !tok.kind.is_preproc_kind() {
                    tok.kind = TokenKind::PpOther;
                }
                in_preproc = tok.kind;
            }
        } else {
            let prev_is_nl = rprev.map_or(true, |r| ctx.tokens.tok(r).kind == TokenKind::Newline);
            if ctx.tokens.tok(id).kind == TokenKind::Pound && prev_is_nl {
                let tok = ctx.tokens.tok_mut(id);
                tok.kind = TokenKind::Preproc;
                tok.flags |= TokenFlags::IN_PREPROC;
                in_preproc = TokenKind::Preproc;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::stream::Nav;

    fn lex(src: &str, lang: LangFlags) -> FileContext {
        let mut ctx = FileContext::new("test", lang, Config::default());
        tokenize(&mut ctx, src.as_bytes());
        ctx
    }

    fn kinds(ctx: &FileContext) -> Vec<(TokenKind, String)> {
        ctx.tokens
            .ids()
            .map(|id| {
                let t = ctx.tokens.tok(id);
                (t.kind, t.text.clone())
            })
            .collect()
    }

    #[test]
    fn words_numbers_punctuators() {
        let ctx = lex("int foo = 42;", LangFlags::C);
        let toks = kinds(&ctx);
        assert_eq!(toks[0], (TokenKind::Type, "int".into()));
        assert_eq!(toks[1], (TokenKind::Word, "foo".into()));
        assert_eq!(toks[2], (TokenKind::Assign, "=".into()));
        assert_eq!(toks[3], (TokenKind::Number, "42".into()));
        assert_eq!(toks[4], (TokenKind::Semicolon, ";".into()));
    }

    #[test]
    fn columns_are_one_based() {
        let ctx = lex("int foo;", LangFlags::C);
        let id = ctx.tokens.head().unwrap();
        let t = ctx.tokens.tok(id);
        assert_eq!((t.line, t.col, t.col_end), (1, 1, 4));
        let foo = ctx.tokens.next(id, Nav::All).unwrap();
        let t = ctx.tokens.tok(foo);
        assert_eq!((t.col, t.col_end), (5, 8));
    }

    #[test]
    fn comments_vanish() {
        let ctx = lex("a /* hi */ b // tail\nc", LangFlags::C);
        let texts: Vec<_> = kinds(&ctx).into_iter().map(|(_, t)| t).collect();
        assert_eq!(texts, vec!["a", "b", "\n", "c"]);
    }

    #[test]
    fn nested_d_comments() {
        let ctx = lex("a /+ x /+ y +/ z +/ b", LangFlags::D);
        let texts: Vec<_> = kinds(&ctx).into_iter().map(|(_, t)| t).collect();
        assert_eq!(texts, vec!["a", "b"]);
    }

    #[test]
    fn number_forms() {
        let ctx = lex("0x1F_2f 0b1010 017 1.5e-3 6ul 1.0f", LangFlags::D);
        let toks = kinds(&ctx);
        assert_eq!(toks[0].0, TokenKind::Number);
        assert_eq!(toks[0].1, "0x1F_2f");
        assert_eq!(toks[1].0, TokenKind::Number);
        assert_eq!(toks[2].0, TokenKind::Number);
        assert_eq!(toks[3].0, TokenKind::NumberFp);
        assert_eq!(toks[4].0, TokenKind::Number);
        assert_eq!(toks[4].1, "6ul");
        assert_eq!(toks[5].0, TokenKind::NumberFp);
    }

    #[test]
    fn string_forms() {
        let ctx = lex(r#"x = "a\"b";"#, LangFlags::C);
        let toks = kinds(&ctx);
        assert_eq!(toks[2], (TokenKind::String, r#""a\"b""#.into()));

        let ctx = lex("s = @\"a\"\"b\";", LangFlags::CS);
        let toks = kinds(&ctx);
        assert_eq!(toks[2], (TokenKind::String, "@\"a\"\"b\"".into()));

        let ctx = lex("auto s = R\"x(raw)x\";", LangFlags::CPP);
        let toks = kinds(&ctx);
        assert_eq!(toks[3], (TokenKind::String, "R\"x(raw)x\"".into()));
    }

    #[test]
    fn format_macro_suffix_is_left_alone() {
        let ctx = lex("\"%\"PRIx32", LangFlags::C);
        let toks = kinds(&ctx);
        assert_eq!(toks[0], (TokenKind::String, "\"%\"".into()));
        assert_eq!(toks[1].1, "PRIx32");
    }

    #[test]
    fn preproc_tracking() {
        let ctx = lex("#define ADD(a,b) ((a)+(b))\nint x;", LangFlags::C);
        let toks = kinds(&ctx);
        assert_eq!(toks[0], (TokenKind::Preproc, "#".into()));
        assert_eq!(toks[1], (TokenKind::PpDefine, "define".into()));
        assert_eq!(toks[2], (TokenKind::MacroFunc, "ADD".into()));
        // everything up to the newline is flagged IN_PREPROC
        let mut saw_newline = false;
        for id in ctx.tokens.ids() {
            let t = ctx.tokens.tok(id);
            if t.kind == TokenKind::Newline {
                saw_newline = true;
                continue;
            }
            assert_eq!(
                t.is_preproc(),
                !saw_newline,
                "token {:?} on wrong side",
                t.text
            );
        }
    }

    #[test]
    fn object_macro_vs_function_macro() {
        let ctx = lex("#define N 10", LangFlags::C);
        assert_eq!(kinds(&ctx)[2], (TokenKind::Macro, "N".into()));
    }

    #[test]
    fn include_angle_string() {
        let ctx = lex("#include <stdio.h>\n", LangFlags::C);
        let toks = kinds(&ctx);
        assert_eq!(toks[1].0, TokenKind::PpInclude);
        assert_eq!(toks[2], (TokenKind::String, "<stdio.h>".into()));
    }

    #[test]
    fn unhandled_directive_body_is_opaque() {
        let ctx = lex("#pragma omp parallel for\nx;", LangFlags::C);
        let toks = kinds(&ctx);
        assert_eq!(toks[1].0, TokenKind::PpPragma);
        assert_eq!(toks[2], (TokenKind::PreprocBody, "omp parallel for".into()));
    }

    #[test]
    fn line_continuation() {
        let ctx = lex("#define A \\\n  1\n", LangFlags::C);
        let toks = kinds(&ctx);
        assert_eq!(toks[3].0, TokenKind::NlCont);
        // the continued line is still in the preprocessor
        assert_eq!(toks[4].0, TokenKind::Number);
    }

    #[test]
    fn pawn_strings() {
        let ctx = lex("new s[] = \\\"hello\";", LangFlags::PAWN);
        let toks = kinds(&ctx);
        let strings: Vec<_> = toks.iter().filter(|(k, _)| *k == TokenKind::String).collect();
        assert_eq!(strings.len(), 1);
        assert_eq!(strings[0].1, "\\\"hello\"");
    }

    #[test]
    fn oc_literals() {
        let ctx = lex("x = @\"str\"; y = @42;", LangFlags::OC);
        let toks = kinds(&ctx);
        assert_eq!(toks[2], (TokenKind::String, "@\"str\"".into()));
        assert_eq!(toks[6], (TokenKind::Number, "@42".into()));
    }

    #[test]
    fn unknown_bytes_do_not_stop_the_scan() {
        let ctx = lex("a \x01 b", LangFlags::C);
        let toks = kinds(&ctx);
        assert_eq!(toks[1].0, TokenKind::Unknown);
        assert_eq!(toks[2].1, "b");
    }

    #[test]
    fn d_backslash_string() {
        let ctx = lex(r"x = \n\t;", LangFlags::D);
        let toks = kinds(&ctx);
        assert_eq!(toks[2].0, TokenKind::String);
        assert_eq!(toks[2].1, r"\n\t");
    }
}
