use std::io;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};

use regex_tagger::{
    scan_files_parallel, FileWalker, JsonLinesEmitter, ParserRegistry, ScanProgress, TagEmitter,
    TaggerConfig, TaggerError,
};

#[derive(Parser)]
#[command(name = "regex-tagger")]
#[command(about = "Regex-driven tag extraction for configuration languages")]
#[command(version)]
#[command(after_long_help = r#"
EXAMPLES:
    # Tag every supported file under the current directory
    regex-tagger scan

    # Tag files with a specific parser regardless of extension
    regex-tagger scan settings.txt --parser TerraformVariables

    # List registered parsers
    regex-tagger parsers

    # Show the kinds a parser can emit
    regex-tagger kinds terraform
"#)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to the config file (defaults to .regex-tagger.yml when present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Scan files or directories and print tags as JSON lines
    Scan {
        /// Files or directories to scan
        #[arg(default_value = ".")]
        paths: Vec<PathBuf>,

        /// Use this parser for every file
        #[arg(long)]
        parser: Option<String>,

        /// Number of worker threads (defaults to the number of CPUs)
        #[arg(long, short)]
        jobs: Option<usize>,
    },

    /// List registered parsers
    Parsers,

    /// List the kinds and roles of a parser
    Kinds {
        /// Parser name or alias
        parser: String,
    },
}

fn load_registry(config_path: Option<&Path>) -> anyhow::Result<(TaggerConfig, ParserRegistry)> {
    let cwd = std::env::current_dir()?;
    let config = TaggerConfig::discover(config_path, &cwd)?;
    let registry = config.build_registry();
    for diagnostic in registry.diagnostics() {
        tracing::warn!("{}", diagnostic);
    }
    Ok((config, registry))
}

pub fn scan_paths(
    config_path: Option<&Path>,
    paths: &[PathBuf],
    parser: Option<&str>,
    jobs: Option<usize>,
) -> anyhow::Result<()> {
    let (config, registry) = load_registry(config_path)?;

    let forced = match parser {
        Some(name) => Some(
            registry
                .lookup(name)
                .ok_or_else(|| TaggerError::ParserNotFound(name.to_string()))?,
        ),
        None => None,
    };

    let walker = FileWalker::new(&registry);
    let mut files = Vec::new();
    for path in paths {
        if forced.is_some() && path.is_file() {
            files.push(path.clone());
        } else {
            files.extend(walker.walk(path)?);
        }
    }
    tracing::info!("Found {} files to scan", files.len());

    let progress = ScanProgress::new();
    let options = config.scan_options();
    let scan = || scan_files_parallel(&registry, &files, forced, options, &progress);
    let results = match jobs {
        Some(n) => rayon::ThreadPoolBuilder::new()
            .num_threads(n)
            .build()?
            .install(scan),
        None => scan(),
    };

    let stdout = io::stdout();
    let mut emitter = JsonLinesEmitter::new(stdout.lock());
    for result in results {
        if let Some(error) = &result.error {
            eprintln!("Error scanning {}: {}", result.path.display(), error);
        }
        for tag in result.tags {
            emitter.emit(tag);
        }
    }
    let written = emitter.finish()?;

    let snapshot = progress.snapshot();
    tracing::info!(
        "Emitted {} tags from {} files ({} skipped, {} errors) in {}ms",
        written,
        snapshot.files_scanned,
        snapshot.files_skipped,
        snapshot.errors,
        snapshot.elapsed.as_millis()
    );
    Ok(())
}

pub fn list_parsers(config_path: Option<&Path>) -> anyhow::Result<()> {
    let (_, registry) = load_registry(config_path)?;

    println!(
        "{:<20} {:<16} {:<14} {:<8} {}",
        "NAME", "EXTENSIONS", "METHOD", "VERSION", "ENABLED"
    );
    for parser in registry.all() {
        let version = parser.version();
        println!(
            "{:<20} {:<16} {:<14} {:<8} {}",
            parser.name(),
            parser.extensions().join(","),
            parser.method().to_string(),
            format!("{}.{}", version.current, version.age),
            if parser.is_enabled() { "yes" } else { "no" }
        );
    }
    Ok(())
}

pub fn list_kinds(config_path: Option<&Path>, name: &str) -> anyhow::Result<()> {
    let (_, registry) = load_registry(config_path)?;
    let parser = registry
        .lookup(name)
        .ok_or_else(|| TaggerError::ParserNotFound(name.to_string()))?;

    let Some(resolved) = parser.resolved() else {
        println!("{} is disabled", parser.name());
        return Ok(());
    };

    for language in resolved.vocabulary.languages() {
        println!("{}:", language);
        for kind in resolved.vocabulary.kinds(language) {
            let roles: Vec<&str> = kind.roles.iter().map(|r| r.name.as_str()).collect();
            println!(
                "  {}  {:<12} {}{}",
                kind.letter,
                kind.name,
                kind.description,
                if roles.is_empty() {
                    String::new()
                } else {
                    format!(" [roles: {}]", roles.join(", "))
                }
            );
        }
    }
    Ok(())
}
