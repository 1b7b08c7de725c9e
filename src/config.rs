//! Tokenizer configuration.
//!
//! Only three knobs cross the core boundary; everything else is derived from
//! the input bytes and the language flags.

use std::collections::HashMap;

use anyhow::{Context, Result};

use crate::token::TokenKind;

#[derive(Clone, Debug)]
pub struct Config {
    /// Column width of a tab stop when computing source columns.
    pub input_tab_size: u32,
    /// Primary string escape character.
    pub string_escape_char: u8,
    /// Secondary escape, e.g. `"` for doubled quotes in C# verbatim strings.
    pub string_escape_char2: u8,
    /// User-supplied identifiers with forced kinds (from `--types`).
    pub extra_keywords: HashMap<String, TokenKind>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            input_tab_size: 8,
            string_escape_char: b'\\',
            string_escape_char2: 0,
            extra_keywords: HashMap::new(),
        }
    }
}

impl Config {
    /// Load a type file: one entry per line, `#` comments allowed.
    ///
    /// A bare word is registered as a type name. A `kind word` pair forces a
    /// specific kind; recognized kinds are `type`, `macro-func`, `func-wrap`,
    /// `type-wrap` and `proto-wrap`.
    pub fn load_type_file(&mut self, path: &std::path::Path) -> Result<usize> {
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read type file {}", path.display()))?;
        let mut count = 0;
        for line in data.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let mut parts = line.split_whitespace();
            let first = parts.next().unwrap();
            let (kind, word) = match parts.next() {
                None => (TokenKind::Type, first),
                Some(word) => {
                    let kind = match first {
                        "type" => TokenKind::Type,
                        "macro-func" => TokenKind::MacroFunc,
                        "func-wrap" => TokenKind::FuncWrap,
                        "type-wrap" => TokenKind::TypeWrap,
                        "proto-wrap" => TokenKind::ProtoWrap,
                        other => {
                            log::warn!("{}: unknown type-file kind '{other}'", path.display());
                            continue;
                        }
                    };
                    (kind, word)
                }
            };
            self.extra_keywords.insert(word.to_string(), kind);
            count += 1;
        }
        Ok(count)
    }
}

/// Advance to the next tab stop. Column 1 is the left-most column.
pub fn next_tab_column(col: u32, tabsize: u32) -> u32 {
    let col = col.max(1);
    1 + (((col - 1) / tabsize) + 1) * tabsize
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn tab_stops() {
        assert_eq!(next_tab_column(1, 8), 9);
        assert_eq!(next_tab_column(8, 8), 9);
        assert_eq!(next_tab_column(9, 8), 17);
        assert_eq!(next_tab_column(0, 4), 5);
    }

    #[test]
    fn type_file_entries() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "# comment\nmy_handle_t\nfunc-wrap WRAPPED").unwrap();
        let mut config = Config::default();
        let n = config.load_type_file(file.path()).unwrap();
        assert_eq!(n, 2);
        assert_eq!(config.extra_keywords["my_handle_t"], TokenKind::Type);
        assert_eq!(config.extra_keywords["WRAPPED"], TokenKind::FuncWrap);
    }
}
