use std::io::BufRead;
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{bail, Result};
use clap::Parser;
use colored::Colorize;

use symdex::index::SymbolIndex;
use symdex::{lang, pipeline, Config};

#[derive(Parser)]
#[command(
    author,
    version = env!("CARGO_PKG_VERSION"),
    about = "Symbol indexer for C-family source files",
    long_about = None
)]
struct Cli {
    /// Source files or directories to index
    paths: Vec<PathBuf>,

    /// Read files to process from a file, one per line (- is stdin)
    #[arg(short = 'F', long = "file-list")]
    file_list: Option<PathBuf>,

    /// Index database path
    #[arg(short = 'i', long = "index", default_value = "symdex.db")]
    index: PathBuf,

    /// Language override: C, CPP, D, CS, VALA, JAVA, PAWN, OC, OC+, ECMA
    #[arg(short = 'l', long = "lang")]
    lang: Option<String>,

    /// Load identifiers with forced kinds from a type file
    #[arg(short = 't', long = "types")]
    types: Vec<PathBuf>,

    /// Tab size used for source columns
    #[arg(long, default_value_t = 8)]
    tab_size: u32,

    /// Dump all tokens after parsing each file
    #[arg(short = 'd', long = "dump")]
    dump: bool,

    /// Do not print entries while indexing
    #[arg(short = 'q', long = "quiet")]
    quiet: bool,

    /// Identifier to search for (supports ? and * wildcards)
    #[arg(long = "id")]
    id: Option<String>,

    /// Show only references
    #[arg(long)]
    refs: bool,

    /// Show only definitions
    #[arg(long)]
    defs: bool,

    /// Show only declarations
    #[arg(long)]
    decls: bool,

    /// Output lookup results as JSON
    #[arg(long)]
    json: bool,
}

fn read_file_list(path: &PathBuf) -> Result<Vec<PathBuf>> {
    let reader: Box<dyn BufRead> = if path.as_os_str() == "-" {
        Box::new(std::io::stdin().lock())
    } else {
        Box::new(std::io::BufReader::new(std::fs::File::open(path)?))
    };
    let mut files = Vec::new();
    for line in reader.lines() {
        let line = line?;
        let name = line.trim();
        if name.is_empty() || name.starts_with('#') {
            continue;
        }
        files.push(PathBuf::from(name));
    }
    Ok(files)
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let forced_lang = match &cli.lang {
        Some(tag) => match lang::from_tag(tag) {
            Some(flags) => Some(flags),
            None => {
                log::warn!("ignoring unknown language: {tag}");
                None
            }
        },
        None => None,
    };

    let mut config = Config {
        input_tab_size: cli.tab_size,
        ..Config::default()
    };
    for path in &cli.types {
        let n = config.load_type_file(path)?;
        log::info!("loaded {n} entries from {}", path.display());
    }

    let mut index = SymbolIndex::open(&cli.index)?;

    let mut files = cli.paths.clone();
    if let Some(list) = &cli.file_list {
        files.extend(read_file_list(list)?);
    }

    if files.is_empty() && cli.id.is_none() {
        bail!("nothing to do: give source paths, a file list, or --id");
    }

    if !files.is_empty() {
        index.prune_missing()?;
        let files = pipeline::discover_files(&files)?;
        let shared = Mutex::new(index);
        let (indexed, skipped, failed) =
            pipeline::run(&shared, &config, &files, forced_lang, cli.dump, cli.quiet);
        eprintln!(
            "{} {indexed} indexed, {skipped} unchanged, {failed} failed",
            "done:".green().bold()
        );
        if failed > 0 {
            std::process::exit(1);
        }
        index = shared.into_inner().unwrap();
    }

    run_lookup(&index, &cli)?;

    Ok(())
}

fn run_lookup(index: &SymbolIndex, cli: &Cli) -> Result<()> {
    let Some(pattern) = &cli.id else {
        return Ok(());
    };
    let mut roles: Vec<&str> = Vec::new();
    if cli.decls {
        roles.push("DECL");
    }
    if cli.defs {
        roles.push("DEF");
    }
    if cli.refs {
        roles.push("REF");
    }
    if roles.is_empty() {
        roles = vec!["DECL", "DEF", "REF"];
    }

    let rows = index.lookup(pattern, &roles)?;
    if cli.json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }
    for row in &rows {
        println!(
            "{}:{}:{} {} {} {} {}",
            row.filename.bold(),
            row.line,
            row.column_start,
            row.scope,
            row.kind.cyan(),
            row.role.yellow(),
            row.identifier
        );
    }
    Ok(())
}
