//! Parser definitions (declarative tables) and compiled descriptors.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};

use crate::error::CompileError;
use crate::rules::{RegexRow, RegexRule};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleDefinition {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KindDefinition {
    pub letter: char,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub roles: Vec<RoleDefinition>,
}

impl KindDefinition {
    pub fn new(letter: char, name: &str, description: &str) -> Self {
        Self {
            letter,
            name: name.to_string(),
            description: description.to_string(),
            enabled: true,
            roles: Vec::new(),
        }
    }

    pub fn with_role(mut self, name: &str, description: &str) -> Self {
        self.roles.push(RoleDefinition {
            name: name.to_string(),
            description: description.to_string(),
        });
        self
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r.name == role)
    }
}

fn default_true() -> bool {
    true
}

/// Compatibility version of a parser's tag output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParserVersion {
    pub current: u32,
    pub age: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParserMethod {
    #[serde(default)]
    pub crafted: bool,
    #[serde(default = "default_true")]
    pub regex: bool,
}

impl ParserMethod {
    pub const REGEX_ONLY: Self = Self {
        crafted: false,
        regex: true,
    };

    pub fn is_regex_only(&self) -> bool {
        self.regex && !self.crafted
    }
}

impl Default for ParserMethod {
    fn default() -> Self {
        Self::REGEX_ONLY
    }
}

impl fmt::Display for ParserMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.crafted, self.regex) {
            (false, true) => write!(f, "regex"),
            (true, true) => write!(f, "crafted+regex"),
            (true, false) => write!(f, "crafted"),
            (false, false) => write!(f, "none"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DependencyType {
    /// Borrow kind/role vocabulary and initialization from the target
    Foreigner,
    /// Target may be run as a nested scan over the same buffer
    Subparser,
    /// Extend the target's tag schema
    Base,
}

impl DependencyType {
    /// Edges where the dependent cannot work without the target.
    pub fn is_hard(&self) -> bool {
        matches!(self, Self::Foreigner | Self::Base)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependency {
    pub kind: DependencyType,
    pub target: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
}

impl Dependency {
    pub fn new(kind: DependencyType, target: &str) -> Self {
        Self {
            kind,
            target: target.to_string(),
            data: None,
        }
    }
}

pub type InitHook = fn() -> std::result::Result<(), String>;
pub type FinalizeHook = fn();

#[derive(Clone, Copy, Default)]
pub struct ParserHooks {
    pub initialize: Option<InitHook>,
    pub finalize: Option<FinalizeHook>,
}

impl fmt::Debug for ParserHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParserHooks")
            .field("initialize", &self.initialize.is_some())
            .field("finalize", &self.finalize.is_some())
            .finish()
    }
}

// Hooks compare by presence.
impl PartialEq for ParserHooks {
    fn eq(&self, other: &Self) -> bool {
        self.initialize.is_some() == other.initialize.is_some()
            && self.finalize.is_some() == other.finalize.is_some()
    }
}

/// Declarative parser table, as written in a parser module or a config file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParserDefinition {
    pub name: String,
    #[serde(default)]
    pub extensions: Vec<String>,
    #[serde(default)]
    pub aliases: Vec<String>,
    /// Filename globs, e.g. `Makefile` or `.env.*`
    #[serde(default)]
    pub patterns: Vec<String>,
    #[serde(default)]
    pub kinds: Vec<KindDefinition>,
    #[serde(default)]
    pub regex_table: Vec<RegexRow>,
    #[serde(default)]
    pub dependencies: Vec<Dependency>,
    #[serde(default)]
    pub version: ParserVersion,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub method: ParserMethod,
    #[serde(skip)]
    pub hooks: ParserHooks,
}

impl ParserDefinition {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            extensions: Vec::new(),
            aliases: Vec::new(),
            patterns: Vec::new(),
            kinds: Vec::new(),
            regex_table: Vec::new(),
            dependencies: Vec::new(),
            version: ParserVersion::default(),
            enabled: true,
            method: ParserMethod::REGEX_ONLY,
            hooks: ParserHooks::default(),
        }
    }
}

/// A compiled rule with its kind, role and language resolved against the
/// parser's vocabulary.
#[derive(Debug, Clone)]
pub struct ActiveRule {
    pub rule: usize,
    pub kind: KindDefinition,
    pub role: Option<String>,
    pub language: String,
}

/// Kind vocabulary visible to one parser: its own kinds plus those of every
/// Foreigner/Base target, keyed by lowercased language name.
#[derive(Debug, Clone, Default)]
pub struct Vocabulary {
    languages: HashMap<String, (String, Vec<KindDefinition>)>,
}

impl Vocabulary {
    pub fn insert(&mut self, language: &str, kinds: &[KindDefinition]) {
        let entry = self
            .languages
            .entry(language.to_lowercase())
            .or_insert_with(|| (language.to_string(), Vec::new()));
        for kind in kinds {
            if !entry.1.iter().any(|k| k.letter == kind.letter) {
                entry.1.push(kind.clone());
            }
        }
    }

    pub fn extend(&mut self, other: &Vocabulary) {
        for (name, kinds) in other.languages.values() {
            self.insert(name, kinds);
        }
    }

    /// Canonical spelling of a linked language name.
    pub fn language(&self, language: &str) -> Option<&str> {
        self.languages
            .get(&language.to_lowercase())
            .map(|(name, _)| name.as_str())
    }

    pub fn kind(&self, language: &str, letter: char) -> Option<&KindDefinition> {
        self.languages
            .get(&language.to_lowercase())
            .and_then(|(_, kinds)| kinds.iter().find(|k| k.letter == letter))
    }

    pub fn kinds(&self, language: &str) -> &[KindDefinition] {
        self.languages
            .get(&language.to_lowercase())
            .map(|(_, kinds)| kinds.as_slice())
            .unwrap_or(&[])
    }

    pub fn languages(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.languages.values().map(|(n, _)| n.as_str()).collect();
        names.sort_unstable();
        names
    }
}

/// Output of dependency resolution for one parser.
#[derive(Debug, Clone, Default)]
pub struct ResolvedParser {
    pub vocabulary: Vocabulary,
    pub line_rules: Vec<ActiveRule>,
    pub multiline_rules: Vec<ActiveRule>,
    pub subparsers: Vec<String>,
}

/// A registered parser. Immutable after registration except for the
/// enabled flag.
pub struct ParserDescriptor {
    definition: ParserDefinition,
    patterns: Vec<glob::Pattern>,
    kinds: Vec<KindDefinition>,
    rules: Vec<RegexRule>,
    rule_rows: Vec<usize>,
    enabled: AtomicBool,
    resolved: OnceCell<ResolvedParser>,
}

impl ParserDescriptor {
    /// Compiles a definition. Rules that fail to compile are returned
    /// alongside the descriptor (by row index) and left out of it.
    pub fn compile(definition: ParserDefinition) -> (Self, Vec<(usize, CompileError)>) {
        let mut rules = Vec::with_capacity(definition.regex_table.len());
        let mut rule_rows = Vec::with_capacity(definition.regex_table.len());
        let mut rejected = Vec::new();

        for (index, row) in definition.regex_table.iter().enumerate() {
            match RegexRule::compile(row) {
                Ok(rule) => {
                    rules.push(rule);
                    rule_rows.push(index);
                }
                Err(e) => rejected.push((index, e)),
            }
        }

        let patterns = definition
            .patterns
            .iter()
            .filter_map(|p| match glob::Pattern::new(p) {
                Ok(pattern) => Some(pattern),
                Err(e) => {
                    tracing::warn!("{}: ignoring file pattern {:?}: {}", definition.name, p, e);
                    None
                }
            })
            .collect();

        let kinds = own_kinds(&definition.kinds, &rules);

        let descriptor = Self {
            enabled: AtomicBool::new(definition.enabled),
            definition,
            patterns,
            kinds,
            rules,
            rule_rows,
            resolved: OnceCell::new(),
        };
        (descriptor, rejected)
    }

    pub fn name(&self) -> &str {
        &self.definition.name
    }

    pub fn definition(&self) -> &ParserDefinition {
        &self.definition
    }

    pub fn extensions(&self) -> &[String] {
        &self.definition.extensions
    }

    pub fn aliases(&self) -> &[String] {
        &self.definition.aliases
    }

    pub fn dependencies(&self) -> &[Dependency] {
        &self.definition.dependencies
    }

    pub fn version(&self) -> ParserVersion {
        self.definition.version
    }

    pub fn method(&self) -> ParserMethod {
        self.definition.method
    }

    pub fn hooks(&self) -> ParserHooks {
        self.definition.hooks
    }

    /// Kinds this parser defines itself (declared plus inline kind specs).
    pub fn kinds(&self) -> &[KindDefinition] {
        &self.kinds
    }

    pub fn rules(&self) -> &[RegexRule] {
        &self.rules
    }

    /// Row of the regex table a compiled rule came from.
    pub fn rule_row(&self, rule: usize) -> usize {
        self.rule_rows.get(rule).copied().unwrap_or(rule)
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Release);
    }

    /// `None` until the registry has initialized this parser.
    pub fn resolved(&self) -> Option<&ResolvedParser> {
        self.resolved.get()
    }

    pub(crate) fn publish(&self, resolved: ResolvedParser) {
        // Only the registry's single initialization pass calls this.
        let _ = self.resolved.set(resolved);
    }

    pub fn matches_extension(&self, ext: &str) -> bool {
        self.definition
            .extensions
            .iter()
            .any(|e| e.eq_ignore_ascii_case(ext))
    }

    pub fn matches_file_name(&self, file_name: &str) -> bool {
        self.patterns.iter().any(|p| p.matches(file_name))
    }
}

impl fmt::Debug for ParserDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParserDescriptor")
            .field("name", &self.definition.name)
            .field("rules", &self.rules.len())
            .field("enabled", &self.is_enabled())
            .field("initialized", &self.resolved.get().is_some())
            .finish()
    }
}

fn own_kinds(declared: &[KindDefinition], rules: &[RegexRule]) -> Vec<KindDefinition> {
    let mut kinds = declared.to_vec();
    for rule in rules {
        if rule.language.is_some() || kinds.iter().any(|k| k.letter == rule.kind.letter) {
            continue;
        }
        if let Some(name) = &rule.kind.name {
            let mut kind = KindDefinition::new(
                rule.kind.letter,
                name,
                rule.kind.description.as_deref().unwrap_or(name),
            );
            if let Some(role) = &rule.role {
                kind = kind.with_role(role, role);
            }
            kinds.push(kind);
        }
    }
    kinds
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compile_definition_drops_bad_rules() {
        let mut def = ParserDefinition::new("Sample");
        def.regex_table = vec![
            RegexRow::new("^([a-z]+)=", r"\1", "v,variable,variables"),
            RegexRow::new("^$", "empty", "e,empty,empties"),
            RegexRow::new("^(x", r"\1", "x,x,x"),
        ];

        let (descriptor, rejected) = ParserDescriptor::compile(def);
        assert_eq!(descriptor.rules().len(), 1);
        assert_eq!(rejected.len(), 2);
        assert_eq!(rejected[0].0, 1);
        assert!(matches!(rejected[0].1, CompileError::ZeroWidth(_)));
        assert_eq!(rejected[1].0, 2);
    }

    #[test]
    fn test_inline_kinds_join_vocabulary() {
        let mut def = ParserDefinition::new("Make");
        def.kinds = vec![KindDefinition::new('m', "macro", "macros")];
        def.regex_table = vec![
            RegexRow::new("^([A-Za-z_]+):", r"\1", "t,target,targets"),
            RegexRow::new("^([A-Za-z_]+)[[:space:]]*=", r"\1", "m"),
        ];

        let (descriptor, _) = ParserDescriptor::compile(def);
        let letters: Vec<char> = descriptor.kinds().iter().map(|k| k.letter).collect();
        assert_eq!(letters, vec!['m', 't']);
        assert_eq!(descriptor.kinds()[1].description, "targets");
    }

    #[test]
    fn test_file_matching() {
        let mut def = ParserDefinition::new("Dotenv");
        def.extensions = vec!["env".to_string()];
        def.patterns = vec![".env".to_string(), ".env.*".to_string()];

        let (descriptor, _) = ParserDescriptor::compile(def);
        assert!(descriptor.matches_extension("ENV"));
        assert!(descriptor.matches_file_name(".env"));
        assert!(descriptor.matches_file_name(".env.local"));
        assert!(!descriptor.matches_file_name("env.txt"));
    }

    #[test]
    fn test_enabled_flag_toggles() {
        let (descriptor, _) = ParserDescriptor::compile(ParserDefinition::new("Toggle"));
        assert!(descriptor.is_enabled());
        descriptor.set_enabled(false);
        assert!(!descriptor.is_enabled());
    }

    #[test]
    fn test_vocabulary_lookup_is_case_insensitive() {
        let mut vocab = Vocabulary::default();
        vocab.insert(
            "Terraform",
            &[KindDefinition::new('v', "variable", "variables").with_role("assigned", "assigned")],
        );

        assert_eq!(vocab.language("terraform"), Some("Terraform"));
        let kind = vocab.kind("TERRAFORM", 'v').unwrap();
        assert!(kind.has_role("assigned"));
        assert!(vocab.kind("Terraform", 'r').is_none());
        assert!(vocab.kinds("Other").is_empty());
    }

    #[test]
    fn test_definition_yaml_defaults() {
        let yaml = r#"
name: Make
patterns: [Makefile]
regex_table:
  - regex: "^([A-Za-z0-9_.-]+):"
    name: "\\1"
    kinds: "t,target,targets"
"#;
        let def: ParserDefinition = serde_yaml::from_str(yaml).unwrap();
        assert!(def.enabled);
        assert!(def.method.is_regex_only());
        assert_eq!(def.regex_table[0].name, r"\1");
        assert!(!def.regex_table[0].icase);
        assert!(def.hooks.initialize.is_none());
    }
}
