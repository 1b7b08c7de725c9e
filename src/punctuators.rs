//! Punctuator lookup: longest match over a 1–4 byte window.

use crate::lang::LangFlags;
use crate::token::TokenKind;

pub struct Punctuator {
    pub tag: &'static str,
    pub kind: TokenKind,
    langs: LangFlags,
}

macro_rules! punc {
    ($tag:literal, $kind:ident, $langs:expr) => {
        Punctuator {
            tag: $tag,
            kind: TokenKind::$kind,
            langs: $langs,
        }
    };
}

const CPP: LangFlags = LangFlags::CPP;
const D: LangFlags = LangFlags::D;
const CS: LangFlags = LangFlags::CS;
const JAVA: LangFlags = LangFlags::JAVA;
const OC: LangFlags = LangFlags::OC;
const VALA: LangFlags = LangFlags::VALA;
const ECMA: LangFlags = LangFlags::ECMA;
const ALL: LangFlags = LangFlags::ALL;
const ALLC: LangFlags = LangFlags::ALLC;

/// Grouped by length, longest first; lookup scans groups in order.
static PUNC4: &[Punctuator] = &[
    punc!("!<>=", Compare, D),
    punc!(">>>=", Assign, CS.union(JAVA).union(ECMA)),
];

static PUNC3: &[Punctuator] = &[
    punc!("!<=", Compare, D),
    punc!("!<>", Compare, D),
    punc!("!==", Compare, D.union(ECMA)),
    punc!("!>=", Compare, D),
    punc!("->*", Member, CPP.union(D)),
    punc!("...", Ellipsis, ALLC),
    punc!("<<=", Assign, ALL),
    punc!("<>=", Compare, D),
    punc!("===", Compare, ECMA),
    punc!(">>=", Assign, ALL),
    punc!(">>>", Arith, CS.union(JAVA).union(ECMA)),
];

static PUNC2: &[Punctuator] = &[
    punc!("!<", Compare, D),
    punc!("!=", Compare, ALL),
    punc!("!>", Compare, D),
    punc!("##", PpConcat, ALLC),
    punc!("%=", Assign, ALL),
    punc!("&&", Bool, ALL),
    punc!("&=", Assign, ALL),
    punc!("*=", Assign, ALL),
    punc!("++", IncDecAfter, ALL),
    punc!("+=", Assign, ALL),
    punc!("--", IncDecAfter, ALL),
    punc!("-=", Assign, ALL),
    punc!("->", Member, ALLC),
    punc!("..", Ellipsis, D),
    punc!("/=", Assign, ALL),
    punc!("::", DcMember, ALLC),
    punc!("<<", Arith, ALL),
    punc!("<=", Compare, ALL),
    punc!("<>", Compare, D),
    punc!("==", Compare, ALL),
    punc!("=>", Lambda, CS.union(D).union(VALA).union(ECMA)),
    punc!(">=", Compare, ALL),
    punc!(">>", Arith, ALL),
    punc!("^=", Assign, ALL),
    punc!("|=", Assign, ALL),
    punc!("||", Bool, ALL),
    punc!("~=", Assign, D),
];

static PUNC1: &[Punctuator] = &[
    punc!("!", Not, ALL),
    punc!("#", Pound, ALL),
    punc!("%", Arith, ALL),
    punc!("&", Amp, ALL),
    punc!("(", ParenOpen, ALL),
    punc!(")", ParenClose, ALL),
    punc!("*", Star, ALL),
    punc!("+", Plus, ALL),
    punc!(",", Comma, ALL),
    punc!("-", Minus, ALL),
    punc!(".", Member, ALL),
    punc!("/", Arith, ALL),
    punc!(":", Colon, ALL),
    punc!(";", Semicolon, ALL),
    punc!("<", AngleOpen, ALL),
    punc!("=", Assign, ALL),
    punc!(">", AngleClose, ALL),
    punc!("?", Question, ALL),
    punc!("@", OcAt, OC),
    punc!("[", SquareOpen, ALL),
    punc!("]", SquareClose, ALL),
    punc!("^", Caret, ALL),
    punc!("{", BraceOpen, ALL),
    punc!("|", Arith, ALL),
    punc!("}", BraceClose, ALL),
    punc!("~", Inv, ALL),
];

/// Longest punctuator matching a prefix of `window` for the language set.
pub fn find_punctuator(window: &[u8], lang: LangFlags) -> Option<&'static Punctuator> {
    for table in [PUNC4, PUNC3, PUNC2, PUNC1] {
        let want = table[0].tag.len();
        if window.len() < want {
            continue;
        }
        let probe = &window[..want];
        if let Some(entry) = table
            .iter()
            .find(|entry| entry.tag.as_bytes() == probe && entry.langs.intersects(lang))
        {
            return Some(entry);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn longest_match_wins() {
        let hit = find_punctuator(b"<<=1", LangFlags::C).unwrap();
        assert_eq!(hit.tag, "<<=");
        assert_eq!(hit.kind, TokenKind::Assign);

        let hit = find_punctuator(b"<<1", LangFlags::C).unwrap();
        assert_eq!(hit.tag, "<<");

        let hit = find_punctuator(b"<1", LangFlags::C).unwrap();
        assert_eq!(hit.kind, TokenKind::AngleOpen);
    }

    #[test]
    fn language_masks_apply() {
        assert!(find_punctuator(b"~=", LangFlags::C).is_none() || {
            // "~=" is D-only; C should fall back to "~"
            find_punctuator(b"~=", LangFlags::C).unwrap().tag == "~"
        });
        assert_eq!(find_punctuator(b"~= ", LangFlags::D).unwrap().tag, "~=");
        assert_eq!(find_punctuator(b"@x", LangFlags::OC).unwrap().tag, "@");
        assert!(find_punctuator(b"@x", LangFlags::C).is_none());
    }

    #[test]
    fn short_windows_fall_through() {
        let hit = find_punctuator(b";", LangFlags::C).unwrap();
        assert_eq!(hit.kind, TokenKind::Semicolon);
        assert!(find_punctuator(b"$", LangFlags::C).is_none());
    }
}
