pub mod driver;
pub mod progress;
pub mod walker;

pub use driver::{scan, scan_with_options, Scan, ScanOptions, ScanState};
pub use progress::{ProgressSnapshot, ScanProgress};
pub use walker::FileWalker;

use std::path::{Path, PathBuf};

use rayon::prelude::*;

use crate::emitter::TagEmitter;
use crate::error::{Result, TaggerError};
use crate::parsers::{ParserDescriptor, ParserRegistry};
use crate::tag::TagRecord;

/// Scans with `parser`, then with each of its Subparser targets, over the
/// same buffer.
pub fn scan_nested<'a>(
    registry: &'a ParserRegistry,
    parser: &'a ParserDescriptor,
    buffer: &'a str,
    options: ScanOptions,
) -> impl Iterator<Item = TagRecord> + 'a {
    registry
        .scan_chain(parser)
        .into_iter()
        .flat_map(move |p| scan_with_options(p, buffer, options))
}

/// Tags of one file.
#[derive(Debug)]
pub struct FileScan {
    pub path: PathBuf,
    pub parser: String,
    pub state: ScanState,
    pub tags: Vec<TagRecord>,
    pub error: Option<TaggerError>,
}

/// Reads a file as text; invalid UTF-8 is replaced rather than rejected.
pub fn read_buffer(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path).map_err(|source| TaggerError::BufferIo {
        path: path.display().to_string(),
        source,
    })?;
    Ok(match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
    })
}

/// Reads and scans one file. The buffer lives only for the duration of the
/// call.
pub fn scan_path(
    registry: &ParserRegistry,
    parser: &ParserDescriptor,
    path: &Path,
    options: ScanOptions,
) -> FileScan {
    let buffer = match read_buffer(path) {
        Ok(buffer) => buffer,
        Err(error) => {
            tracing::warn!("{}", error);
            return FileScan {
                path: path.to_path_buf(),
                parser: parser.name().to_string(),
                state: ScanState::Aborted,
                tags: Vec::new(),
                error: Some(error),
            };
        }
    };

    let tags: Vec<TagRecord> = scan_nested(registry, parser, &buffer, options).collect();
    FileScan {
        path: path.to_path_buf(),
        parser: parser.name().to_string(),
        state: ScanState::Done,
        tags,
        error: None,
    }
}

/// Scans one file straight into an emitter. Returns the number of tags.
pub fn scan_file(
    registry: &ParserRegistry,
    path: &Path,
    options: ScanOptions,
    emitter: &mut dyn TagEmitter,
) -> Result<usize> {
    let parser = registry
        .get_for_file(path)
        .ok_or_else(|| TaggerError::ParserNotFound(path.display().to_string()))?;
    let buffer = read_buffer(path)?;

    let mut count = 0;
    for tag in scan_nested(registry, parser, &buffer, options) {
        emitter.emit(tag);
        count += 1;
    }
    Ok(count)
}

/// Scans files on the rayon pool. `forced` overrides per-file parser
/// selection; files no parser claims are skipped. Results keep input order.
pub fn scan_files_parallel(
    registry: &ParserRegistry,
    files: &[PathBuf],
    forced: Option<&ParserDescriptor>,
    options: ScanOptions,
    progress: &ScanProgress,
) -> Vec<FileScan> {
    files
        .par_iter()
        .filter_map(|path| {
            let Some(parser) = forced.or_else(|| registry.get_for_file(path)) else {
                tracing::debug!("No parser for {}", path.display());
                progress.skip();
                return None;
            };

            let result = scan_path(registry, parser, path, options);
            progress.record(&result);
            Some(result)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emitter::VecEmitter;
    use crate::parsers::{Dependency, DependencyType, KindDefinition, ParserDefinition};
    use crate::rules::RegexRow;
    use tempfile::TempDir;

    #[test]
    fn test_scan_nested_runs_subparsers() {
        let mut registry = ParserRegistry::new();
        let mut host = ParserDefinition::new("Markdown");
        host.kinds = vec![KindDefinition::new('s', "section", "sections")];
        host.regex_table = vec![RegexRow::new(r"^# (.+)$", r"\1", "s")];
        host.dependencies = vec![Dependency::new(DependencyType::Subparser, "Dotenv")];
        registry.register(host).unwrap();
        registry
            .register(crate::parsers::dotenv::definition())
            .unwrap();
        registry.initialize_all();

        let parser = registry.lookup("Markdown").unwrap();
        let tags: Vec<TagRecord> =
            scan_nested(&registry, parser, "# Setup\nPORT=8080\n", ScanOptions::default()).collect();

        let summary: Vec<(&str, &str)> = tags
            .iter()
            .map(|t| (t.name.as_str(), t.parser.as_str()))
            .collect();
        assert_eq!(summary, vec![("Setup", "Markdown"), ("PORT", "Dotenv")]);
    }

    #[test]
    fn test_scan_path_missing_file_aborts() {
        let registry = ParserRegistry::with_builtins();
        registry.initialize_all();
        let parser = registry.lookup("TerraformVariables").unwrap();

        let result = scan_path(
            &registry,
            parser,
            Path::new("/no/such/file.tfvars"),
            ScanOptions::default(),
        );
        assert_eq!(result.state, ScanState::Aborted);
        assert!(matches!(result.error, Some(TaggerError::BufferIo { .. })));
        assert!(result.tags.is_empty());
    }

    #[test]
    fn test_scan_file_into_emitter() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("prod.tfvars");
        std::fs::write(&path, "region = \"eu\"\nzones = []\n").unwrap();

        let registry = ParserRegistry::with_builtins();
        registry.initialize_all();

        let mut emitter = VecEmitter::new();
        let count = scan_file(&registry, &path, ScanOptions::default(), &mut emitter).unwrap();
        assert_eq!(count, 2);
        assert_eq!(emitter.tags()[1].name, "zones");
    }

    #[test]
    fn test_scan_file_lossy_utf8() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("odd.tfvars");
        std::fs::write(&path, b"name = \"\xff\"\n").unwrap();

        let registry = ParserRegistry::with_builtins();
        registry.initialize_all();

        let mut emitter = VecEmitter::new();
        assert_eq!(scan_file(&registry, &path, ScanOptions::default(), &mut emitter).unwrap(), 1);
    }

    #[test]
    fn test_scan_files_parallel_keeps_order() {
        let temp_dir = TempDir::new().unwrap();
        let mut files = Vec::new();
        for i in 0..8 {
            let path = temp_dir.path().join(format!("f{}.tfvars", i));
            std::fs::write(&path, format!("var_{} = {}\n", i, i)).unwrap();
            files.push(path);
        }
        files.push(temp_dir.path().join("notes.txt"));

        let registry = ParserRegistry::with_builtins();
        registry.initialize_all();
        let progress = ScanProgress::new();

        let results = scan_files_parallel(&registry, &files, None, ScanOptions::default(), &progress);
        assert_eq!(results.len(), 8);
        for (i, result) in results.iter().enumerate() {
            assert_eq!(result.tags[0].name, format!("var_{}", i));
        }

        let snapshot = progress.snapshot();
        assert_eq!(snapshot.files_scanned, 8);
        assert_eq!(snapshot.files_skipped, 1);
        assert_eq!(snapshot.tags_emitted, 8);
    }
}
