//! Per-file workspace.
//!
//! All pipeline stages operate on one of these; nothing is shared between
//! files, which is what makes the file fan-out embarrassingly parallel.

use crate::config::Config;
use crate::lang::LangFlags;
use crate::stream::TokenStream;

pub struct FileContext {
    pub filename: String,
    pub lang: LangFlags,
    pub config: Config,
    pub tokens: TokenStream,
}

impl FileContext {
    pub fn new(filename: impl Into<String>, lang: LangFlags, config: Config) -> Self {
        FileContext {
            filename: filename.into(),
            lang,
            config,
            tokens: TokenStream::new(),
        }
    }

    pub fn is_lang(&self, lang: LangFlags) -> bool {
        self.lang.intersects(lang)
    }
}
