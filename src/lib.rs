//! symdex: an approximate symbol indexer for C-family source files.
//!
//! Per file, the pipeline is: tokenize → cleanup → brace/level tracking →
//! symbol classification → scope assignment → projection into identifier
//! rows persisted in a SQLite index. There is no semantic resolution and no
//! preprocessor expansion; classification is heuristic and never fails a
//! file.

pub mod braces;
pub mod cleanup;
pub mod config;
pub mod context;
pub mod index;
pub mod keywords;
pub mod lang;
pub mod output;
pub mod pawn;
pub mod pipeline;
pub mod punctuators;
pub mod scope;
pub mod stream;
pub mod symbols;
pub mod token;
pub mod tokenize;

pub use config::Config;
pub use context::FileContext;
pub use index::SymbolIndex;
pub use lang::LangFlags;
