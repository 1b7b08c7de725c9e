//! Language identification.
//!
//! A file is tokenized under a bitmask of dialects because some extensions
//! genuinely mean two things at once (`.mm` is Objective-C++).

use std::path::Path;

use bitflags::bitflags;

bitflags! {
    #[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
    pub struct LangFlags: u16 {
        const C    = 0x0001;
        const CPP  = 0x0002;
        const D    = 0x0004;
        const CS   = 0x0008;
        const JAVA = 0x0010;
        const OC   = 0x0020;
        const VALA = 0x0040;
        const PAWN = 0x0080;
        const ECMA = 0x0100;

        /// Keyword-table-only bit: the entry matches solely while lexing a
        /// preprocessor line.
        const PP   = 0x8000;
    }
}

impl LangFlags {
    pub const ALLC: LangFlags = LangFlags::from_bits_truncate(0x017f);
    pub const ALL: LangFlags = LangFlags::from_bits_truncate(0x0fff);
}

struct FileLang {
    ext: &'static str,
    tag: &'static str,
    lang: LangFlags,
}

const LANGUAGES: &[FileLang] = &[
    FileLang { ext: ".c", tag: "C", lang: LangFlags::C },
    FileLang { ext: ".cpp", tag: "CPP", lang: LangFlags::CPP },
    FileLang { ext: ".d", tag: "D", lang: LangFlags::D },
    FileLang { ext: ".cs", tag: "CS", lang: LangFlags::CS },
    FileLang { ext: ".vala", tag: "VALA", lang: LangFlags::VALA },
    FileLang { ext: ".java", tag: "JAVA", lang: LangFlags::JAVA },
    FileLang { ext: ".pawn", tag: "PAWN", lang: LangFlags::PAWN },
    FileLang { ext: ".p", tag: "", lang: LangFlags::PAWN },
    FileLang { ext: ".sma", tag: "", lang: LangFlags::PAWN },
    FileLang { ext: ".inl", tag: "", lang: LangFlags::PAWN },
    FileLang { ext: ".h", tag: "", lang: LangFlags::C },
    FileLang { ext: ".cxx", tag: "", lang: LangFlags::CPP },
    FileLang { ext: ".hpp", tag: "", lang: LangFlags::CPP },
    FileLang { ext: ".hxx", tag: "", lang: LangFlags::CPP },
    FileLang { ext: ".cc", tag: "", lang: LangFlags::CPP },
    FileLang { ext: ".cp", tag: "", lang: LangFlags::CPP },
    FileLang { ext: ".C", tag: "", lang: LangFlags::CPP },
    FileLang { ext: ".CPP", tag: "", lang: LangFlags::CPP },
    FileLang { ext: ".c++", tag: "", lang: LangFlags::CPP },
    FileLang { ext: ".di", tag: "", lang: LangFlags::D },
    FileLang { ext: ".m", tag: "OC", lang: LangFlags::OC },
    FileLang {
        ext: ".mm",
        tag: "OC+",
        lang: LangFlags::OC.union(LangFlags::CPP),
    },
    FileLang { ext: ".sqc", tag: "", lang: LangFlags::C }, // embedded SQL
    FileLang { ext: ".es", tag: "ECMA", lang: LangFlags::ECMA },
];

/// Language from a filename extension, defaulting to C.
pub fn from_filename(path: &Path) -> LangFlags {
    let name = path.to_string_lossy();
    for entry in LANGUAGES {
        if name.ends_with(entry.ext) {
            return entry.lang;
        }
    }
    LangFlags::C
}

/// Language from an explicit tag like `CPP` or `OC+`; `None` if unknown.
pub fn from_tag(tag: &str) -> Option<LangFlags> {
    LANGUAGES
        .iter()
        .find(|entry| !entry.tag.is_empty() && entry.tag.eq_ignore_ascii_case(tag))
        .map(|entry| entry.lang)
}

/// Display tag for a language set.
pub fn to_tag(lang: LangFlags) -> &'static str {
    for entry in LANGUAGES {
        if entry.lang == lang && !entry.tag.is_empty() {
            return entry.tag;
        }
    }
    for entry in LANGUAGES {
        if entry.lang.intersects(lang) && !entry.tag.is_empty() {
            return entry.tag;
        }
    }
    "???"
}

/// Whether the extension belongs to one of the supported languages.
pub fn is_source_file(path: &Path) -> bool {
    let name = path.to_string_lossy();
    LANGUAGES.iter().any(|entry| name.ends_with(entry.ext))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_common_extensions() {
        assert_eq!(from_filename(Path::new("foo.c")), LangFlags::C);
        assert_eq!(from_filename(Path::new("foo.hpp")), LangFlags::CPP);
        assert_eq!(from_filename(Path::new("a/b/foo.d")), LangFlags::D);
        assert_eq!(
            from_filename(Path::new("view.mm")),
            LangFlags::OC | LangFlags::CPP
        );
        // unknown extensions fall back to C
        assert_eq!(from_filename(Path::new("README")), LangFlags::C);
    }

    #[test]
    fn tags_round_trip() {
        assert_eq!(from_tag("cpp"), Some(LangFlags::CPP));
        assert_eq!(from_tag("OC+"), Some(LangFlags::OC | LangFlags::CPP));
        assert_eq!(from_tag("klingon"), None);
        assert_eq!(to_tag(LangFlags::PAWN), "PAWN");
    }

    #[test]
    fn source_file_filter() {
        assert!(is_source_file(Path::new("x.java")));
        assert!(!is_source_file(Path::new("x.rs")));
    }
}
