//! The token stream.
//!
//! Classifier sweeps insert and delete tokens mid-stream (virtual braces,
//! split `[]`, collapsed wrappers), so the stream is a doubly-linked
//! sequence. Links are stable indices into a slot vector with a free list
//! for holes, which keeps ids valid across unrelated insertions and
//! deletions.

use crate::token::{Token, TokenFlags, TokenKind};

/// Stable handle to a token in a [`TokenStream`].
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
pub struct TokenId(u32);

/// How navigation treats preprocessor content.
///
/// `All` returns the literal neighbor. `Preproc` stays on one side of the
/// preprocessor boundary: from outside, preproc tokens are skipped; from
/// inside, navigation refuses to leave the directive.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Nav {
    All,
    Preproc,
}

struct Slot {
    tok: Token,
    prev: Option<TokenId>,
    next: Option<TokenId>,
    live: bool,
}

pub struct TokenStream {
    slots: Vec<Slot>,
    free: Vec<u32>,
    head: Option<TokenId>,
    tail: Option<TokenId>,
    len: usize,
    empty: Token,
}

impl Default for TokenStream {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenStream {
    pub fn new() -> Self {
        TokenStream {
            slots: Vec::new(),
            free: Vec::new(),
            head: None,
            tail: None,
            len: 0,
            empty: Token::default(),
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn head(&self) -> Option<TokenId> {
        self.head
    }

    pub fn tail(&self) -> Option<TokenId> {
        self.tail
    }

    pub fn tok(&self, id: TokenId) -> &Token {
        debug_assert!(self.slots[id.0 as usize].live);
        &self.slots[id.0 as usize].tok
    }

    pub fn tok_mut(&mut self, id: TokenId) -> &mut Token {
        debug_assert!(self.slots[id.0 as usize].live);
        &mut self.slots[id.0 as usize].tok
    }

    /// The token behind `id`, or a blank placeholder for `None`.
    ///
    /// Mirrors the classic dummy-chunk trick: neighbor checks read fields
    /// without caring whether a neighbor exists.
    pub fn tok_or_empty(&self, id: Option<TokenId>) -> &Token {
        match id {
            Some(id) => self.tok(id),
            None => &self.empty,
        }
    }

    fn alloc(&mut self, tok: Token) -> TokenId {
        if let Some(idx) = self.free.pop() {
            let slot = &mut self.slots[idx as usize];
            slot.tok = tok;
            slot.prev = None;
            slot.next = None;
            slot.live = true;
            TokenId(idx)
        } else {
            self.slots.push(Slot {
                tok,
                prev: None,
                next: None,
                live: true,
            });
            TokenId((self.slots.len() - 1) as u32)
        }
    }

    pub fn push_back(&mut self, tok: Token) -> TokenId {
        let id = self.alloc(tok);
        match self.tail {
            Some(tail) => {
                self.slots[tail.0 as usize].next = Some(id);
                self.slots[id.0 as usize].prev = Some(tail);
            }
            None => self.head = Some(id),
        }
        self.tail = Some(id);
        self.len += 1;
        id
    }

    /// Insert after `at`, inheriting the neighbor's copy flags.
    pub fn insert_after(&mut self, at: TokenId, mut tok: Token) -> TokenId {
        tok.flags |= self.tok(at).flags & TokenFlags::COPY_FLAGS;
        let id = self.alloc(tok);
        let next = self.slots[at.0 as usize].next;
        self.slots[id.0 as usize].prev = Some(at);
        self.slots[id.0 as usize].next = next;
        self.slots[at.0 as usize].next = Some(id);
        match next {
            Some(next) => self.slots[next.0 as usize].prev = Some(id),
            None => self.tail = Some(id),
        }
        self.len += 1;
        id
    }

    /// Insert before `at`, inheriting the neighbor's copy flags.
    pub fn insert_before(&mut self, at: TokenId, mut tok: Token) -> TokenId {
        tok.flags |= self.tok(at).flags & TokenFlags::COPY_FLAGS;
        let id = self.alloc(tok);
        let prev = self.slots[at.0 as usize].prev;
        self.slots[id.0 as usize].next = Some(at);
        self.slots[id.0 as usize].prev = prev;
        self.slots[at.0 as usize].prev = Some(id);
        match prev {
            Some(prev) => self.slots[prev.0 as usize].next = Some(id),
            None => self.head = Some(id),
        }
        self.len += 1;
        id
    }

    pub fn remove(&mut self, id: TokenId) {
        debug_assert!(self.slots[id.0 as usize].live);
        let prev = self.slots[id.0 as usize].prev;
        let next = self.slots[id.0 as usize].next;
        match prev {
            Some(prev) => self.slots[prev.0 as usize].next = next,
            None => self.head = next,
        }
        match next {
            Some(next) => self.slots[next.0 as usize].prev = prev,
            None => self.tail = prev,
        }
        let slot = &mut self.slots[id.0 as usize];
        slot.live = false;
        slot.tok = Token::default();
        slot.prev = None;
        slot.next = None;
        self.free.push(id.0);
        self.len -= 1;
    }

    fn raw_next(&self, id: TokenId) -> Option<TokenId> {
        self.slots[id.0 as usize].next
    }

    fn raw_prev(&self, id: TokenId) -> Option<TokenId> {
        self.slots[id.0 as usize].prev
    }

    pub fn next(&self, id: TokenId, nav: Nav) -> Option<TokenId> {
        let mut pc = self.raw_next(id)?;
        if nav == Nav::Preproc {
            if self.tok(id).is_preproc() {
                if !self.tok(pc).is_preproc() {
                    return None;
                }
            } else {
                while self.tok(pc).is_preproc() {
                    pc = self.raw_next(pc)?;
                }
            }
        }
        Some(pc)
    }

    pub fn prev(&self, id: TokenId, nav: Nav) -> Option<TokenId> {
        let mut pc = self.raw_prev(id)?;
        if nav == Nav::Preproc {
            if self.tok(id).is_preproc() {
                if !self.tok(pc).is_preproc() {
                    return None;
                }
            } else {
                while self.tok(pc).is_preproc() {
                    pc = self.raw_prev(pc)?;
                }
            }
        }
        Some(pc)
    }

    /// Next token that is not a newline.
    pub fn next_nnl(&self, id: TokenId, nav: Nav) -> Option<TokenId> {
        let mut pc = self.next(id, nav)?;
        while self.tok(pc).is_newline() {
            pc = self.next(pc, nav)?;
        }
        Some(pc)
    }

    pub fn prev_nnl(&self, id: TokenId, nav: Nav) -> Option<TokenId> {
        let mut pc = self.prev(id, nav)?;
        while self.tok(pc).is_newline() {
            pc = self.prev(pc, nav)?;
        }
        Some(pc)
    }

    /// Next token that is neither a newline nor preprocessor content.
    pub fn next_nnl_np(&self, id: TokenId) -> Option<TokenId> {
        let mut pc = self.raw_next(id)?;
        while self.tok(pc).is_newline() || self.tok(pc).is_preproc() {
            pc = self.raw_next(pc)?;
        }
        Some(pc)
    }

    pub fn prev_nnl_np(&self, id: TokenId) -> Option<TokenId> {
        let mut pc = self.raw_prev(id)?;
        while self.tok(pc).is_newline() || self.tok(pc).is_preproc() {
            pc = self.raw_prev(pc)?;
        }
        Some(pc)
    }

    /// Forward scan for a kind, optionally pinned to a nesting level.
    pub fn next_kind(
        &self,
        id: TokenId,
        kind: TokenKind,
        level: Option<u32>,
        nav: Nav,
    ) -> Option<TokenId> {
        let mut pc = self.next(id, nav)?;
        loop {
            let tok = self.tok(pc);
            if tok.kind == kind && level.map_or(true, |lv| tok.level == lv) {
                return Some(pc);
            }
            pc = self.next(pc, nav)?;
        }
    }

    pub fn prev_kind(
        &self,
        id: TokenId,
        kind: TokenKind,
        level: Option<u32>,
        nav: Nav,
    ) -> Option<TokenId> {
        let mut pc = self.prev(id, nav)?;
        loop {
            let tok = self.tok(pc);
            if tok.kind == kind && level.map_or(true, |lv| tok.level == lv) {
                return Some(pc);
            }
            pc = self.prev(pc, nav)?;
        }
    }

    /// Forward scan for literal text at a level.
    pub fn next_str(
        &self,
        id: TokenId,
        text: &str,
        level: Option<u32>,
        nav: Nav,
    ) -> Option<TokenId> {
        let mut pc = self.next(id, nav)?;
        loop {
            let tok = self.tok(pc);
            if tok.text == text && level.map_or(true, |lv| tok.level == lv) {
                return Some(pc);
            }
            pc = self.next(pc, nav)?;
        }
    }

    /// From an open delimiter, the matching close at the same level.
    ///
    /// Non-delimiters are returned unchanged, mirroring the original's
    /// permissive contract; an unmatched open yields `None`.
    pub fn skip_to_match(&self, id: TokenId, nav: Nav) -> Option<TokenId> {
        match self.tok(id).kind.matching_close() {
            Some(close) => self.next_kind(id, close, Some(self.tok(id).level), nav),
            None => Some(id),
        }
    }

    pub fn skip_to_match_rev(&self, id: TokenId, nav: Nav) -> Option<TokenId> {
        match self.tok(id).kind.matching_open() {
            Some(open) => self.prev_kind(id, open, Some(self.tok(id).level), nav),
            None => Some(id),
        }
    }

    /// Forward iterator over live token ids. Snapshot-free: the iterator
    /// holds only the next id, so removing already-visited tokens is fine.
    pub fn ids(&self) -> Ids<'_> {
        Ids {
            stream: self,
            cur: self.head,
        }
    }
}

pub struct Ids<'a> {
    stream: &'a TokenStream,
    cur: Option<TokenId>,
}

impl Iterator for Ids<'_> {
    type Item = TokenId;

    fn next(&mut self) -> Option<TokenId> {
        let id = self.cur?;
        self.cur = self.stream.raw_next(id);
        Some(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn word(text: &str) -> Token {
        Token::new(TokenKind::Word, text)
    }

    #[test]
    fn push_and_walk() {
        let mut ts = TokenStream::new();
        let a = ts.push_back(word("a"));
        let b = ts.push_back(word("b"));
        let c = ts.push_back(word("c"));
        assert_eq!(ts.len(), 3);
        assert_eq!(ts.head(), Some(a));
        assert_eq!(ts.tail(), Some(c));
        assert_eq!(ts.next(a, Nav::All), Some(b));
        assert_eq!(ts.prev(c, Nav::All), Some(b));
        assert_eq!(ts.next(c, Nav::All), None);
    }

    #[test]
    fn insert_and_remove_relink() {
        let mut ts = TokenStream::new();
        let a = ts.push_back(word("a"));
        let c = ts.push_back(word("c"));
        let b = ts.insert_after(a, word("b"));
        assert_eq!(ts.next(a, Nav::All), Some(b));
        assert_eq!(ts.next(b, Nav::All), Some(c));
        ts.remove(b);
        assert_eq!(ts.next(a, Nav::All), Some(c));
        assert_eq!(ts.prev(c, Nav::All), Some(a));
        // freed slot is reused
        let d = ts.insert_before(a, word("d"));
        assert_eq!(ts.head(), Some(d));
        assert_eq!(ts.len(), 3);
    }

    #[test]
    fn inserted_token_inherits_copy_flags() {
        let mut ts = TokenStream::new();
        let mut t = word("x");
        t.flags = TokenFlags::IN_PREPROC | TokenFlags::STMT_START;
        let a = ts.push_back(t);
        let b = ts.insert_after(a, word("y"));
        assert!(ts.tok(b).flags.contains(TokenFlags::IN_PREPROC));
        assert!(!ts.tok(b).flags.contains(TokenFlags::STMT_START));
    }

    #[test]
    fn preproc_navigation() {
        let mut ts = TokenStream::new();
        let a = ts.push_back(word("a"));
        let mut pp = word("#");
        pp.flags = TokenFlags::IN_PREPROC;
        let p = ts.push_back(pp);
        let b = ts.push_back(word("b"));
        // from outside, Preproc nav skips the directive
        assert_eq!(ts.next(a, Nav::Preproc), Some(b));
        // from inside, it refuses to leave
        assert_eq!(ts.next(p, Nav::Preproc), None);
        assert_eq!(ts.prev(b, Nav::Preproc), Some(a));
    }

    #[test]
    fn match_skipping() {
        let mut ts = TokenStream::new();
        let mut open = Token::new(TokenKind::ParenOpen, "(");
        open.level = 0;
        let o = ts.push_back(open);
        let mut inner = Token::new(TokenKind::ParenOpen, "(");
        inner.level = 1;
        ts.push_back(inner);
        let mut ic = Token::new(TokenKind::ParenClose, ")");
        ic.level = 1;
        ts.push_back(ic);
        let mut close = Token::new(TokenKind::ParenClose, ")");
        close.level = 0;
        let c = ts.push_back(close);
        assert_eq!(ts.skip_to_match(o, Nav::All), Some(c));
        assert_eq!(ts.skip_to_match_rev(c, Nav::All), Some(o));
    }

    #[test]
    fn nnl_skips_newlines() {
        let mut ts = TokenStream::new();
        let a = ts.push_back(word("a"));
        ts.push_back(Token::new(TokenKind::Newline, "\n"));
        let b = ts.push_back(word("b"));
        assert_eq!(ts.next_nnl(a, Nav::All), Some(b));
        assert_eq!(ts.prev_nnl(b, Nav::All), Some(a));
    }
}
