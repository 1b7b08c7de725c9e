//! Per-file driver and parallel fan-out.
//!
//! Each file runs the stage sequence on its own workspace; files are
//! independent, so the fan-out is a plain parallel iterator. The only
//! shared resource is the index handle, locked briefly per file to write
//! one batched transaction.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use ignore::WalkBuilder;
use rayon::prelude::*;

use crate::braces::brace_cleanup;
use crate::cleanup::tokenize_cleanup;
use crate::config::Config;
use crate::context::FileContext;
use crate::index::{digest, SymbolIndex};
use crate::lang::{self, LangFlags};
use crate::output::{self, Entry};
use crate::pawn;
use crate::scope::assign_scope;
use crate::symbols::{combine_labels, fix_symbols};
use crate::tokenize::tokenize;

/// Run the classification stages over one buffer.
pub fn classify(ctx: &mut FileContext, data: &[u8]) {
    tokenize(ctx, data);
    tokenize_cleanup(ctx);
    brace_cleanup(ctx);
    if ctx.lang.intersects(LangFlags::PAWN) {
        pawn::prescan(ctx);
    }
    fix_symbols(ctx);
    combine_labels(ctx);
    assign_scope(ctx);
}

/// What happened to one file.
#[derive(Debug, PartialEq, Eq)]
pub enum FileStatus {
    Indexed(usize),
    Unchanged,
}

/// Tokenize, classify and persist a single file.
pub fn process_file(
    index: &Mutex<SymbolIndex>,
    config: &Config,
    path: &Path,
    forced_lang: Option<LangFlags>,
    dump: bool,
    quiet: bool,
) -> Result<FileStatus> {
    let data = std::fs::read(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let file_digest = digest(&data);
    let filename = path.to_string_lossy().into_owned();

    let filerow = {
        let mut index = index.lock().unwrap();
        index.prepare_for_file(&filename, &file_digest)?
    };
    let Some(filerow) = filerow else {
        return Ok(FileStatus::Unchanged);
    };

    let lang = forced_lang.unwrap_or_else(|| lang::from_filename(path));
    log::info!("parsing {} as {}", filename, lang::to_tag(lang));

    let mut ctx = FileContext::new(filename.clone(), lang, config.clone());
    classify(&mut ctx, &data);

    if dump {
        output::dump_tokens(&ctx, &mut std::io::stdout().lock())?;
    }

    let mut entries: Vec<Entry> = Vec::new();
    output::emit(&ctx, &mut entries)?;
    if !quiet {
        output::print_entries(&filename, &entries);
    }

    {
        let mut index = index.lock().unwrap();
        index.store_entries(filerow, &entries)?;
    }
    Ok(FileStatus::Indexed(entries.len()))
}

/// Expand paths: files pass through, directories are walked with gitignore
/// awareness and filtered to known source extensions.
pub fn discover_files(paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for path in paths {
        if path.is_dir() {
            let walker = WalkBuilder::new(path)
                .hidden(false)
                .git_ignore(true)
                .git_global(true)
                .git_exclude(true)
                .build();
            for entry in walker {
                let entry = entry?;
                let p = entry.path();
                if !p.is_dir() && lang::is_source_file(p) {
                    files.push(p.to_path_buf());
                }
            }
        } else {
            files.push(path.clone());
        }
    }
    files.sort();
    files.dedup();
    Ok(files)
}

/// Index a set of files in parallel. Returns (indexed, skipped, failed).
pub fn run(
    index: &Mutex<SymbolIndex>,
    config: &Config,
    files: &[PathBuf],
    forced_lang: Option<LangFlags>,
    dump: bool,
    quiet: bool,
) -> (usize, usize, usize) {
    let results: Vec<_> = files
        .par_iter()
        .map(|path| process_file(index, config, path, forced_lang, dump, quiet))
        .collect();

    let mut indexed = 0;
    let mut skipped = 0;
    let mut failed = 0;
    for (path, result) in files.iter().zip(results) {
        match result {
            Ok(FileStatus::Indexed(_)) => indexed += 1,
            Ok(FileStatus::Unchanged) => skipped += 1,
            Err(err) => {
                log::error!("{}: {err:#}", path.display());
                failed += 1;
            }
        }
    }
    (indexed, skipped, failed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::{IdKind, IdRole};

    fn emit_all(src: &str, lang: LangFlags) -> Vec<Entry> {
        let mut ctx = FileContext::new("test", lang, Config::default());
        classify(&mut ctx, src.as_bytes());
        let mut entries = Vec::new();
        output::emit(&ctx, &mut entries).unwrap();
        entries
    }

    fn find<'a>(entries: &'a [Entry], ident: &str) -> Vec<&'a Entry> {
        entries.iter().filter(|e| e.identifier == ident).collect()
    }

    #[test]
    fn simple_function_definition() {
        let entries = emit_all("int foo(int a, int b) { return a+b; }", LangFlags::C);

        let foo = find(&entries, "foo");
        assert_eq!(foo.len(), 1);
        assert_eq!(foo[0].kind, IdKind::Function);
        assert_eq!(foo[0].role, IdRole::Definition);
        assert_eq!(foo[0].scope, "<global>");
        assert_eq!(foo[0].col, 5);

        let a = find(&entries, "a");
        assert_eq!(a.len(), 2);
        assert_eq!(a[0].kind, IdKind::Var);
        assert_eq!(a[0].role, IdRole::Definition);
        assert_eq!(a[0].scope, "<global>:foo()");
        assert_eq!(a[0].col, 13);
        assert_eq!(a[1].kind, IdKind::Identifier);
        assert_eq!(a[1].role, IdRole::Reference);
        assert_eq!(a[1].scope, "<global>:foo(){}");
        assert_eq!(a[1].col, 33);

        let b = find(&entries, "b");
        assert_eq!(b[0].col, 20);
        assert_eq!(b[1].col, 35);
    }

    #[test]
    fn typedef_struct() {
        let entries = emit_all("typedef struct S { int x; } S_t;", LangFlags::C);

        let s = find(&entries, "S");
        assert_eq!(s[0].kind, IdKind::Struct);
        assert_eq!(s[0].role, IdRole::Definition);
        assert_eq!(s[0].scope, "<global>");

        let x = find(&entries, "x");
        assert_eq!(x[0].kind, IdKind::Var);
        assert_eq!(x[0].role, IdRole::Definition);
        assert_eq!(x[0].scope, "<global>:S");

        let alias = find(&entries, "S_t");
        assert_eq!(alias[0].kind, IdKind::StructType);
        assert_eq!(alias[0].role, IdRole::Definition);
        assert_eq!(alias[0].scope, "<global>");
    }

    #[test]
    fn namespace_class_method() {
        let entries = emit_all("namespace N { class C { void m(); }; }", LangFlags::CPP);

        let n = find(&entries, "N");
        assert_eq!(n[0].kind, IdKind::Namespace);
        assert_eq!(n[0].role, IdRole::Definition);

        let c = find(&entries, "C");
        assert_eq!(c[0].kind, IdKind::Class);
        assert_eq!(c[0].role, IdRole::Definition);
        assert_eq!(c[0].scope, "<global>:N");

        let m = find(&entries, "m");
        assert_eq!(m[0].kind, IdKind::Function);
        assert_eq!(m[0].role, IdRole::Declaration);
        assert_eq!(m[0].scope, "<global>:N:C");
    }

    #[test]
    fn macro_function() {
        let entries = emit_all("#define ADD(a,b) ((a)+(b))\n", LangFlags::C);
        let add = find(&entries, "ADD");
        assert_eq!(add[0].kind, IdKind::MacroFunction);
        assert_eq!(add[0].role, IdRole::Definition);
    }

    #[test]
    fn function_pointer_variable() {
        let entries = emit_all("int (*fp)(int) = 0;", LangFlags::C);
        let fp = find(&entries, "fp");
        assert_eq!(fp.len(), 1);
        assert_eq!(fp[0].kind, IdKind::Var);
        assert_eq!(fp[0].role, IdRole::Definition);
        assert_eq!(fp[0].scope, "<global>");
    }

    #[test]
    fn function_call_and_prototype() {
        let entries = emit_all("void f(void);\nvoid g(void) { f(); }", LangFlags::C);
        let f = find(&entries, "f");
        assert_eq!(f.len(), 2);
        assert_eq!(f[0].role, IdRole::Declaration);
        assert_eq!(f[1].role, IdRole::Reference);
        assert_eq!(f[1].kind, IdKind::Function);
        let g = find(&entries, "g");
        assert_eq!(g[0].role, IdRole::Definition);
    }

    #[test]
    fn enum_values() {
        let entries = emit_all("enum color { RED, GREEN = 2, BLUE };", LangFlags::C);
        let color = find(&entries, "color");
        assert_eq!(color[0].kind, IdKind::Enum);
        assert_eq!(color[0].role, IdRole::Definition);
        for name in ["RED", "GREEN", "BLUE"] {
            let e = find(&entries, name);
            assert_eq!(e[0].kind, IdKind::EnumVal, "{name}");
            assert_eq!(e[0].role, IdRole::Definition, "{name}");
            assert_eq!(e[0].scope, "<global>:color");
        }
    }

    #[test]
    fn discover_filters_extensions() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.c"), "int x;").unwrap();
        std::fs::write(dir.path().join("b.txt"), "nope").unwrap();
        std::fs::write(dir.path().join("c.cpp"), "int y;").unwrap();
        let files = discover_files(&[dir.path().to_path_buf()]).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.c", "c.cpp"]);
    }
}
