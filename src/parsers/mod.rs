pub mod descriptor;
pub mod dotenv;
pub mod ini;
pub mod resolver;
pub mod terraform;
pub mod terraform_variables;

pub use descriptor::{
    ActiveRule, Dependency, DependencyType, KindDefinition, ParserDefinition, ParserDescriptor,
    ParserHooks, ParserMethod, ParserVersion, ResolvedParser, RoleDefinition, Vocabulary,
};
pub use resolver::{resolve, Resolution};

use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use once_cell::sync::OnceCell;

use crate::error::{Result, TaggerError};

/// Index of a registered parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RegistryHandle(usize);

impl RegistryHandle {
    pub fn index(&self) -> usize {
        self.0
    }
}

/// A rule- or parser-scoped failure. Never fatal to the registry.
#[derive(Debug)]
pub struct Diagnostic {
    pub parser: String,
    /// Regex table row, for rule-scoped failures
    pub rule: Option<usize>,
    pub error: TaggerError,
}

impl Diagnostic {
    pub fn parser(parser: &str, error: TaggerError) -> Self {
        Self {
            parser: parser.to_string(),
            rule: None,
            error,
        }
    }

    pub fn rule(parser: &str, rule: usize, error: TaggerError) -> Self {
        Self {
            parser: parser.to_string(),
            rule: Some(rule),
            error,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.rule {
            Some(rule) => write!(f, "{} (rule {}): {}", self.parser, rule, self.error),
            None => write!(f, "{}: {}", self.parser, self.error),
        }
    }
}

/// Outcome of [`ParserRegistry::initialize_all`].
#[derive(Debug, Default)]
pub struct InitReport {
    /// Parsers in the order their initialize hooks ran
    pub initialized: Vec<String>,
    /// Parsers disabled during initialization
    pub failures: Vec<Diagnostic>,
    /// Rules dropped while linking vocabularies
    pub rule_diagnostics: Vec<Diagnostic>,
}

impl InitReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty() && self.rule_diagnostics.is_empty()
    }
}

pub struct ParserRegistry {
    parsers: Vec<ParserDescriptor>,
    name_map: HashMap<String, usize>,
    alias_map: HashMap<String, usize>,
    extension_map: HashMap<String, Vec<usize>>,
    diagnostics: Vec<Diagnostic>,
    report: OnceCell<InitReport>,
}

impl ParserRegistry {
    pub fn new() -> Self {
        Self {
            parsers: Vec::new(),
            name_map: HashMap::new(),
            alias_map: HashMap::new(),
            extension_map: HashMap::new(),
            diagnostics: Vec::new(),
            report: OnceCell::new(),
        }
    }

    /// Registry holding the built-in parsers, not yet initialized.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        for definition in builtin_definitions() {
            if let Err(e) = registry.register(definition) {
                tracing::warn!("Skipping built-in parser: {}", e);
            }
        }
        registry
    }

    /// Compiles and registers a parser definition.
    ///
    /// Rules that fail to compile are dropped and recorded in
    /// [`diagnostics`](Self::diagnostics); the parser itself still registers.
    pub fn register(&mut self, definition: ParserDefinition) -> Result<RegistryHandle> {
        if self.is_initialized() {
            return Err(TaggerError::RegistryFrozen(definition.name));
        }
        let key = definition.name.to_lowercase();
        if self.name_map.contains_key(&key) {
            return Err(TaggerError::DuplicateName(definition.name));
        }

        let (descriptor, rejected) = ParserDescriptor::compile(definition);
        for (row, source) in rejected {
            let error = TaggerError::Compile {
                parser: descriptor.name().to_string(),
                source,
            };
            tracing::warn!("{} (rule {}): {}", descriptor.name(), row, error);
            self.diagnostics
                .push(Diagnostic::rule(descriptor.name(), row, error));
        }

        let index = self.parsers.len();
        for alias in descriptor.aliases() {
            let alias_key = alias.to_lowercase();
            if self.name_map.contains_key(&alias_key) || self.alias_map.contains_key(&alias_key) {
                tracing::debug!("{}: alias {} already taken", descriptor.name(), alias);
                continue;
            }
            self.alias_map.insert(alias_key, index);
        }
        for ext in descriptor.extensions() {
            self.extension_map
                .entry(ext.to_lowercase())
                .or_default()
                .push(index);
        }
        self.name_map.insert(key, index);

        tracing::debug!(
            "Registered parser {} ({} rules)",
            descriptor.name(),
            descriptor.rules().len()
        );
        self.parsers.push(descriptor);

        Ok(RegistryHandle(index))
    }

    /// Looks up a parser by name or alias, ignoring case.
    pub fn lookup(&self, name: &str) -> Option<&ParserDescriptor> {
        self.index_of(name).map(|i| &self.parsers[i])
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        let key = name.to_lowercase();
        self.name_map
            .get(&key)
            .or_else(|| self.alias_map.get(&key))
            .copied()
    }

    pub fn get(&self, handle: RegistryHandle) -> Option<&ParserDescriptor> {
        self.parsers.get(handle.0)
    }

    /// All parsers in registration order.
    pub fn all(&self) -> &[ParserDescriptor] {
        &self.parsers
    }

    pub fn len(&self) -> usize {
        self.parsers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parsers.is_empty()
    }

    /// First usable parser claiming the extension.
    pub fn get_by_extension(&self, ext: &str) -> Option<&ParserDescriptor> {
        self.extension_map
            .get(&ext.to_lowercase())?
            .iter()
            .map(|&i| &self.parsers[i])
            .find(|p| self.is_usable(p))
    }

    /// Enabled, and resolved once the registry is initialized. A parser that
    /// failed initialization stays unusable even if switched back on.
    fn is_usable(&self, parser: &ParserDescriptor) -> bool {
        parser.is_enabled() && (!self.is_initialized() || parser.resolved().is_some())
    }

    /// Picks a parser for a file by extension, then by filename pattern.
    pub fn get_for_file(&self, path: &Path) -> Option<&ParserDescriptor> {
        let by_ext = path
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(|ext| self.get_by_extension(ext));
        if by_ext.is_some() {
            return by_ext;
        }

        let file_name = path.file_name()?.to_str()?;
        self.parsers
            .iter()
            .find(|p| self.is_usable(p) && p.matches_file_name(file_name))
    }

    pub fn supported_extensions(&self) -> Vec<&str> {
        let mut exts: Vec<&str> = self.extension_map.keys().map(|s| s.as_str()).collect();
        exts.sort_unstable();
        exts
    }

    pub fn set_enabled(&self, name: &str, enabled: bool) -> Result<()> {
        let parser = self
            .lookup(name)
            .ok_or_else(|| TaggerError::ParserNotFound(name.to_string()))?;
        parser.set_enabled(enabled);
        tracing::debug!("{} {}", parser.name(), if enabled { "enabled" } else { "disabled" });
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.report.get().is_some()
    }

    /// Resolves dependencies and runs every initialize hook once, targets
    /// before dependents. Later calls return the first report.
    pub fn initialize_all(&self) -> &InitReport {
        self.report.get_or_init(|| self.run_initialization())
    }

    fn run_initialization(&self) -> InitReport {
        let Resolution {
            order,
            failures,
            mut resolved,
            rule_diagnostics,
        } = resolver::resolve(self);

        let mut report = InitReport {
            rule_diagnostics,
            ..Default::default()
        };
        let mut failed = vec![false; self.parsers.len()];

        for (index, error) in failures {
            // Cycle members are disabled, but do not take their dependents
            // down with them.
            failed[index] = !matches!(error, TaggerError::Cycle(_));
            self.disable(index, error, &mut report);
        }

        for index in order {
            let parser = &self.parsers[index];

            let broken_target = parser
                .dependencies()
                .iter()
                .filter(|dep| dep.kind.is_hard())
                .filter_map(|dep| self.index_of(&dep.target))
                .find(|&target| failed[target]);
            if let Some(target) = broken_target {
                failed[index] = true;
                let error = TaggerError::DependencyFailed {
                    parser: parser.name().to_string(),
                    target: self.parsers[target].name().to_string(),
                };
                self.disable(index, error, &mut report);
                continue;
            }

            if let Some(initialize) = parser.hooks().initialize {
                if let Err(message) = initialize() {
                    failed[index] = true;
                    let error = TaggerError::InitFailed {
                        parser: parser.name().to_string(),
                        message,
                    };
                    self.disable(index, error, &mut report);
                    continue;
                }
            }

            parser.publish(resolved[index].take().unwrap_or_default());
            report.initialized.push(parser.name().to_string());
        }

        tracing::debug!(
            "Initialized {} parsers, {} disabled",
            report.initialized.len(),
            report.failures.len()
        );
        report
    }

    fn disable(&self, index: usize, error: TaggerError, report: &mut InitReport) {
        let parser = &self.parsers[index];
        tracing::warn!("Disabling parser {}: {}", parser.name(), error);
        parser.set_enabled(false);
        report.failures.push(Diagnostic::parser(parser.name(), error));
    }

    /// Registration diagnostics followed by initialization diagnostics.
    pub fn diagnostics(&self) -> Vec<&Diagnostic> {
        let mut all: Vec<&Diagnostic> = self.diagnostics.iter().collect();
        if let Some(report) = self.report.get() {
            all.extend(report.failures.iter());
            all.extend(report.rule_diagnostics.iter());
        }
        all
    }

    /// The parser followed by its Subparser targets, depth first.
    pub fn scan_chain<'a>(&'a self, parser: &'a ParserDescriptor) -> Vec<&'a ParserDescriptor> {
        let mut chain = Vec::new();
        let mut stack = vec![parser];
        while let Some(current) = stack.pop() {
            if chain.iter().any(|p: &&ParserDescriptor| p.name() == current.name()) {
                continue;
            }
            chain.push(current);
            if let Some(resolved) = current.resolved() {
                for name in resolved.subparsers.iter().rev() {
                    if let Some(sub) = self.lookup(name) {
                        stack.push(sub);
                    }
                }
            }
        }
        chain
    }
}

impl Default for ParserRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ParserRegistry {
    fn drop(&mut self) {
        let Some(report) = self.report.get() else {
            return;
        };
        for name in report.initialized.iter().rev() {
            if let Some(finalize) = self.lookup(name).and_then(|p| p.hooks().finalize) {
                finalize();
            }
        }
    }
}

pub fn builtin_definitions() -> Vec<ParserDefinition> {
    vec![
        terraform::definition(),
        terraform_variables::definition(),
        ini::definition(),
        dotenv::definition(),
    ]
}
