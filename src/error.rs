use thiserror::Error;

/// Reasons a single regex rule fails to compile.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CompileError {
    #[error("malformed pattern `{pattern}`: {message}")]
    Malformed { pattern: String, message: String },

    #[error("unsupported construct in `{pattern}`: {construct}")]
    Unsupported { pattern: String, construct: String },

    #[error("pattern `{0}` only ever matches the empty string")]
    ZeroWidth(String),

    #[error("template `{template}` references group {group} but the pattern has {available} groups")]
    TemplateGroup {
        template: String,
        group: usize,
        available: usize,
    },

    #[error("invalid flags `{flags}`: {message}")]
    Flags { flags: String, message: String },

    #[error("invalid kind spec `{0}`")]
    KindSpec(String),
}

#[derive(Error, Debug)]
pub enum TaggerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Compile error in {parser}: {source}")]
    Compile {
        parser: String,
        #[source]
        source: CompileError,
    },

    #[error("Parser already registered: {0}")]
    DuplicateName(String),

    #[error("Registry is already initialized, cannot register {0}")]
    RegistryFrozen(String),

    #[error("{parser} depends on unknown parser {target}")]
    UnresolvedDependency { parser: String, target: String },

    #[error("{parser} depends on {target}, which is unavailable")]
    DependencyFailed { parser: String, target: String },

    #[error("Dependency cycle: {}", .0.join(" -> "))]
    Cycle(Vec<String>),

    #[error("{parser}: kind `{kind}` is not defined by {language}")]
    UnknownKind {
        parser: String,
        language: String,
        kind: String,
    },

    #[error("{parser}: role `{role}` is not defined for kind `{kind}` of {language}")]
    UnknownRole {
        parser: String,
        language: String,
        kind: String,
        role: String,
    },

    #[error("{parser} failed to initialize: {message}")]
    InitFailed { parser: String, message: String },

    #[error("{parser}: rule {rule} faulted at line {line}: {message}")]
    MatchFault {
        parser: String,
        rule: usize,
        line: usize,
        message: String,
    },

    #[error("Failed to read {path}: {source}")]
    BufferIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Config error: {0}")]
    Config(String),

    #[error("Parser not found: {0}")]
    ParserNotFound(String),
}

pub type Result<T> = std::result::Result<T, TaggerError>;
