pub mod config;
pub mod emitter;
pub mod error;
pub mod parsers;
pub mod pattern;
pub mod rules;
pub mod scanner;
pub mod tag;

pub use config::{TaggerConfig, CONFIG_FILENAME};
pub use emitter::{JsonLinesEmitter, TagEmitter, VecEmitter};
pub use error::{CompileError, Result, TaggerError};
pub use parsers::{
    Dependency, DependencyType, Diagnostic, InitReport, KindDefinition, ParserDefinition,
    ParserDescriptor, ParserRegistry, RegistryHandle, RoleDefinition,
};
pub use pattern::{compile, CompiledPattern, RuleFlags, ScopeAction, Template};
pub use rules::{KindSpec, RegexRow, RegexRule};
pub use scanner::{
    scan, scan_file, scan_files_parallel, scan_nested, scan_with_options, FileScan, FileWalker,
    Scan, ScanOptions, ScanProgress, ScanState,
};
pub use tag::{TagRecord, TagScope};
