//! Keyword lookup.
//!
//! One static table covers the union of all supported dialects; each entry
//! carries a language mask. Entries flagged with `LangFlags::PP` only match
//! while lexing a preprocessor line. Preprocessor directive words live in
//! their own table because they collide with ordinary keywords (`if`,
//! `else`).

use std::collections::HashMap;

use crate::lang::LangFlags;
use crate::token::TokenKind;

struct Keyword {
    tag: &'static str,
    kind: TokenKind,
    langs: LangFlags,
}

macro_rules! kw {
    ($tag:literal, $kind:ident, $langs:expr) => {
        Keyword {
            tag: $tag,
            kind: TokenKind::$kind,
            langs: $langs,
        }
    };
}

const C: LangFlags = LangFlags::C;
const CPP: LangFlags = LangFlags::CPP;
const D: LangFlags = LangFlags::D;
const CS: LangFlags = LangFlags::CS;
const JAVA: LangFlags = LangFlags::JAVA;
const OC: LangFlags = LangFlags::OC;
const VALA: LangFlags = LangFlags::VALA;
const PAWN: LangFlags = LangFlags::PAWN;
const ECMA: LangFlags = LangFlags::ECMA;
const ALL: LangFlags = LangFlags::ALL;
const ALLC: LangFlags = LangFlags::ALLC;
const PP: LangFlags = LangFlags::PP;

/// Sorted by tag (byte order); duplicate tags with disjoint masks are
/// allowed and must stay adjacent.
static KEYWORDS: &[Keyword] = &[
    kw!("@autoreleasepool", Synchronized, OC),
    kw!("@catch", Catch, OC),
    kw!("@dynamic", OcDynamic, OC),
    kw!("@end", OcEnd, OC),
    kw!("@finally", Finally, OC),
    kw!("@implementation", OcClass, OC),
    kw!("@interface", Class, JAVA),
    kw!("@interface", OcClass, OC),
    kw!("@private", Private, OC),
    kw!("@property", OcProperty, OC),
    kw!("@protected", Private, OC),
    kw!("@protocol", OcClass, OC),
    kw!("@public", Private, OC),
    kw!("@selector", OcSel, OC),
    kw!("@synchronized", Synchronized, OC),
    kw!("@synthesize", OcDynamic, OC),
    kw!("@throw", Throw, OC),
    kw!("@try", Try, OC),
    kw!("_Bool", Type, C),
    kw!("_Complex", Type, C),
    kw!("_Imaginary", Type, C),
    kw!("__attribute__", Attribute, C.union(CPP).union(OC)),
    kw!("__block", Qualifier, OC),
    kw!("__const__", Qualifier, C.union(CPP)),
    kw!("__inline__", Qualifier, C.union(CPP)),
    kw!("__restrict", Qualifier, C.union(CPP)),
    kw!("__signed__", Type, C.union(CPP)),
    kw!("__typeof__", Sizeof, C.union(CPP)),
    kw!("__volatile__", Qualifier, C.union(CPP)),
    kw!("abstract", Qualifier, CS.union(D).union(JAVA).union(VALA).union(ECMA)),
    kw!("alias", Typedef, D),
    kw!("align", Align, D),
    kw!("alignof", Sizeof, C.union(CPP)),
    kw!("and", Bool, C.union(CPP)),
    kw!("and_eq", Assign, C.union(CPP)),
    kw!("assert", Assert, D.union(JAVA)),
    kw!("auto", Type, C.union(CPP)),
    kw!("base", Base, CS.union(VALA)),
    kw!("bit", Type, D),
    kw!("bool", Type, C.union(CPP).union(CS).union(D).union(VALA)),
    kw!("boolean", Type, JAVA.union(ECMA)),
    kw!("break", Break, ALL),
    kw!("byte", Type, CS.union(D).union(JAVA).union(VALA).union(ECMA)),
    kw!("case", Case, ALL),
    kw!("cast", DCast, D),
    kw!("catch", Catch, CPP.union(CS).union(D).union(JAVA).union(VALA).union(ECMA)),
    kw!("cdouble", Type, D),
    kw!("cent", Type, D),
    kw!("cfloat", Type, D),
    kw!("char", Type, ALLC),
    kw!("class", Class, CPP.union(CS).union(D).union(JAVA).union(VALA).union(ECMA)),
    kw!("const", Qualifier, ALL),
    kw!("const_cast", TypeCast, CPP),
    kw!("constexpr", Qualifier, CPP),
    kw!("continue", Continue, ALL),
    kw!("creal", Type, D),
    kw!("dchar", Type, D),
    kw!("debug", DVersion, D),
    kw!("decl", Type, PAWN),
    kw!("decltype", Sizeof, CPP),
    kw!("default", Default, ALL),
    kw!("defined", PpDefined, ALLC.union(PP)),
    kw!("delegate", Delegate, CS.union(D).union(VALA)),
    kw!("delete", Delete, CPP.union(D).union(VALA).union(ECMA)),
    kw!("deprecated", Qualifier, D),
    kw!("do", Do, ALL),
    kw!("double", Type, ALLC),
    kw!("dynamic_cast", TypeCast, CPP),
    kw!("else", Else, ALL),
    kw!("enum", Enum, ALL),
    kw!("event", Qualifier, CS),
    kw!("explicit", Qualifier, CPP.union(CS)),
    kw!("export", Qualifier, CPP.union(D).union(ECMA)),
    kw!("extends", Qualifier, JAVA.union(ECMA)),
    kw!("extern", Extern, C.union(CPP).union(CS).union(D).union(VALA)),
    kw!("final", Qualifier, D.union(JAVA).union(ECMA).union(VALA)),
    kw!("finally", Finally, CS.union(D).union(JAVA).union(VALA).union(ECMA)),
    kw!("float", Type, ALLC),
    kw!("for", For, ALL),
    kw!("foreach", For, CS.union(D).union(VALA)),
    kw!("forward", Qualifier, PAWN),
    kw!("friend", Qualifier, CPP),
    kw!("function", Function, D.union(ECMA)),
    kw!("goto", Goto, ALL),
    kw!("idouble", Type, D),
    kw!("if", If, ALL),
    kw!("ifloat", Type, D),
    kw!("immutable", Qualifier, D),
    kw!("implements", Qualifier, JAVA.union(ECMA)),
    kw!("import", Using, D.union(JAVA).union(VALA).union(ECMA)),
    kw!("in", Qualifier, CS.union(D).union(VALA).union(ECMA)),
    kw!("inline", Qualifier, C.union(CPP)),
    kw!("instanceof", Sizeof, JAVA.union(ECMA)),
    kw!("int", Type, ALLC),
    kw!("interface", Class, CS.union(D).union(JAVA).union(VALA).union(ECMA)),
    kw!("internal", Private, CS.union(VALA)),
    kw!("invariant", Invariant, D),
    kw!("ireal", Type, D),
    kw!("is", Compare, CS.union(D).union(VALA)),
    kw!("lazy", Qualifier, D),
    kw!("lock", Synchronized, CS.union(VALA)),
    kw!("long", Type, ALLC),
    kw!("mutable", Qualifier, CPP),
    kw!("namespace", Namespace, CPP.union(CS).union(D).union(VALA)),
    kw!("native", Qualifier, JAVA.union(PAWN)),
    kw!("new", New, CPP.union(CS).union(D).union(JAVA).union(VALA).union(ECMA)),
    kw!("new", Type, PAWN),
    kw!("noexcept", Qualifier, CPP),
    kw!("nothrow", Qualifier, D),
    kw!("operator", Operator, CPP.union(CS).union(PAWN)),
    kw!("out", Qualifier, CS.union(D).union(VALA)),
    kw!("override", Qualifier, CS.union(D).union(VALA)),
    kw!("package", Private, D),
    kw!("package", Using, JAVA.union(ECMA)),
    kw!("params", Qualifier, CS.union(VALA)),
    kw!("partial", Qualifier, CS),
    kw!("private", Private, CPP.union(CS).union(D).union(JAVA).union(VALA).union(ECMA)),
    kw!("protected", Private, CPP.union(CS).union(D).union(JAVA).union(VALA).union(ECMA)),
    kw!("public", Private, CPP.union(CS).union(D).union(JAVA).union(VALA).union(ECMA)),
    kw!("public", Qualifier, PAWN),
    kw!("pure", Qualifier, D),
    kw!("readonly", Qualifier, CS.union(VALA)),
    kw!("real", Type, D),
    kw!("ref", Qualifier, CS.union(VALA)),
    kw!("register", Qualifier, C.union(CPP)),
    kw!("reinterpret_cast", TypeCast, CPP),
    kw!("restrict", Qualifier, C.union(CPP)),
    kw!("return", Return, ALL),
    kw!("sealed", Qualifier, CS.union(VALA)),
    kw!("short", Type, ALLC),
    kw!("signed", Type, C.union(CPP)),
    kw!("sizeof", Sizeof, C.union(CPP).union(CS).union(VALA).union(PAWN)),
    kw!("state", State, PAWN),
    kw!("static", Qualifier, ALL),
    kw!("static_cast", TypeCast, CPP),
    kw!("stock", Qualifier, PAWN),
    kw!("string", Type, CS.union(D).union(VALA)),
    kw!("struct", Struct, C.union(CPP).union(CS).union(D).union(VALA)),
    kw!("super", This, D.union(JAVA).union(ECMA)),
    kw!("switch", Switch, ALL),
    kw!("synchronized", Synchronized, D.union(JAVA).union(ECMA)),
    kw!("tagof", Sizeof, PAWN),
    kw!("template", Template, CPP.union(D)),
    kw!("this", This, CPP.union(CS).union(D).union(JAVA).union(VALA).union(ECMA)),
    kw!("throw", Throw, CPP.union(CS).union(D).union(JAVA).union(VALA).union(ECMA)),
    kw!("throws", Qualifier, JAVA.union(ECMA)),
    kw!("try", Try, CPP.union(CS).union(D).union(JAVA).union(VALA).union(ECMA)),
    kw!("typedef", Typedef, C.union(CPP).union(OC)),
    kw!("typeid", Sizeof, CPP.union(D)),
    kw!("typename", Typename, CPP),
    kw!("typeof", Sizeof, C.union(CPP).union(CS).union(D).union(VALA)),
    kw!("ubyte", Type, D),
    kw!("ucent", Type, D),
    kw!("uint", Type, CS.union(D).union(VALA)),
    kw!("ulong", Type, CS.union(D).union(VALA)),
    kw!("unchecked", Qualifier, CS),
    kw!("union", Union, C.union(CPP).union(D)),
    kw!("unittest", DVersion, D),
    kw!("unsafe", Qualifier, CS),
    kw!("unsigned", Type, C.union(CPP)),
    kw!("ushort", Type, CS.union(D).union(VALA)),
    kw!("using", Using, CPP.union(CS).union(VALA)),
    kw!("var", Type, CS.union(VALA).union(ECMA)),
    kw!("version", DVersion, D),
    kw!("virtual", Qualifier, CPP.union(CS).union(VALA)),
    kw!("void", Type, ALLC),
    kw!("volatile", Qualifier, ALLC),
    kw!("wchar", Type, D),
    kw!("wchar_t", Type, C.union(CPP)),
    kw!("while", While, ALL),
];

/// Directive words, matched only in the slot right after a line-starting `#`.
static DIRECTIVES: &[(&str, TokenKind)] = &[
    ("assert", TokenKind::PpOther),
    ("define", TokenKind::PpDefine),
    ("elif", TokenKind::PpElse),
    ("else", TokenKind::PpElse),
    ("emit", TokenKind::PpOther),
    ("endif", TokenKind::PpEndif),
    ("endinput", TokenKind::PpOther),
    ("endregion", TokenKind::PpOther),
    ("endscript", TokenKind::PpOther),
    ("error", TokenKind::PpError),
    ("file", TokenKind::PpOther),
    ("if", TokenKind::PpIf),
    ("ifdef", TokenKind::PpIf),
    ("ifndef", TokenKind::PpIf),
    ("import", TokenKind::PpInclude),
    ("include", TokenKind::PpInclude),
    ("include_next", TokenKind::PpInclude),
    ("line", TokenKind::PpLine),
    ("pragma", TokenKind::PpPragma),
    ("region", TokenKind::PpOther),
    ("section", TokenKind::PpOther),
    ("undef", TokenKind::PpUndef),
    ("warning", TokenKind::PpError),
];

/// Resolve an identifier into a keyword kind, or `Word`.
///
/// `preproc_ctx` is the preprocessor sub-kind surrounding the token:
/// `Preproc` means the token sits in the directive slot itself.
pub fn find_keyword_type(
    word: &str,
    preproc_ctx: TokenKind,
    lang: LangFlags,
    extra: &HashMap<String, TokenKind>,
) -> TokenKind {
    if preproc_ctx == TokenKind::Preproc {
        return match DIRECTIVES.binary_search_by(|(tag, _)| (*tag).cmp(word)) {
            Ok(idx) => DIRECTIVES[idx].1,
            Err(_) => TokenKind::PpOther,
        };
    }

    if let Some(kind) = extra.get(word) {
        return *kind;
    }

    let start = KEYWORDS.partition_point(|entry| entry.tag < word);
    for entry in &KEYWORDS[start..] {
        if entry.tag != word {
            break;
        }
        if !entry.langs.intersects(lang) {
            continue;
        }
        if entry.langs.contains(LangFlags::PP) && preproc_ctx == TokenKind::None {
            continue;
        }
        return entry.kind;
    }
    TokenKind::Word
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tables_are_sorted() {
        for win in KEYWORDS.windows(2) {
            assert!(win[0].tag <= win[1].tag, "misordered: {}", win[1].tag);
        }
        for win in DIRECTIVES.windows(2) {
            assert!(win[0].0 < win[1].0, "misordered: {}", win[1].0);
        }
    }

    #[test]
    fn language_masks_gate_lookup() {
        let extra = HashMap::new();
        assert_eq!(
            find_keyword_type("class", TokenKind::None, LangFlags::CPP, &extra),
            TokenKind::Class
        );
        assert_eq!(
            find_keyword_type("class", TokenKind::None, LangFlags::C, &extra),
            TokenKind::Word
        );
        assert_eq!(
            find_keyword_type("cast", TokenKind::None, LangFlags::D, &extra),
            TokenKind::DCast
        );
    }

    #[test]
    fn duplicate_tags_resolve_by_language() {
        let extra = HashMap::new();
        assert_eq!(
            find_keyword_type("new", TokenKind::None, LangFlags::CPP, &extra),
            TokenKind::New
        );
        assert_eq!(
            find_keyword_type("new", TokenKind::None, LangFlags::PAWN, &extra),
            TokenKind::Type
        );
        assert_eq!(
            find_keyword_type("public", TokenKind::None, LangFlags::PAWN, &extra),
            TokenKind::Qualifier
        );
    }

    #[test]
    fn directive_slot_lookup() {
        let extra = HashMap::new();
        assert_eq!(
            find_keyword_type("if", TokenKind::Preproc, LangFlags::C, &extra),
            TokenKind::PpIf
        );
        assert_eq!(
            find_keyword_type("frobnicate", TokenKind::Preproc, LangFlags::C, &extra),
            TokenKind::PpOther
        );
    }

    #[test]
    fn pp_only_entries_need_preproc_context() {
        let extra = HashMap::new();
        assert_eq!(
            find_keyword_type("defined", TokenKind::None, LangFlags::C, &extra),
            TokenKind::Word
        );
        assert_eq!(
            find_keyword_type("defined", TokenKind::PpIf, LangFlags::C, &extra),
            TokenKind::PpDefined
        );
    }

    #[test]
    fn extra_keywords_win() {
        let mut extra = HashMap::new();
        extra.insert("my_t".to_string(), TokenKind::Type);
        assert_eq!(
            find_keyword_type("my_t", TokenKind::None, LangFlags::C, &extra),
            TokenKind::Type
        );
    }
}
