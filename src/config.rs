//! YAML configuration for a tagging run.
//!
//! ```yaml
//! max_line_len: 65536
//! disable: [Dotenv]
//! parsers:
//!   - name: Make
//!     patterns: [Makefile, "*.mk"]
//!     regex_table:
//!       - regex: "^([A-Za-z0-9_.-]+):"
//!         name: "\\1"
//!         kinds: "t,target,targets"
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, TaggerError};
use crate::parsers::{ParserDefinition, ParserRegistry};
use crate::scanner::ScanOptions;

/// Name of the config file looked up in the working directory
pub const CONFIG_FILENAME: &str = ".regex-tagger.yml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaggerConfig {
    #[serde(default)]
    pub max_line_len: Option<usize>,

    #[serde(default)]
    pub max_buffer_len: Option<usize>,

    /// Parsers to switch off after initialization
    #[serde(default)]
    pub disable: Vec<String>,

    /// Parsers to switch on, applied after `disable`
    #[serde(default)]
    pub enable: Vec<String>,

    /// Extra declarative parsers
    #[serde(default)]
    pub parsers: Vec<ParserDefinition>,
}

impl TaggerConfig {
    pub fn parse(content: &str) -> Result<Self> {
        serde_yaml::from_str(content)
            .map_err(|e| TaggerError::Config(format!("Invalid config YAML: {}", e)))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Loads `path` if given, else `CONFIG_FILENAME` from `dir` when present.
    pub fn discover(path: Option<&Path>, dir: &Path) -> Result<Self> {
        if let Some(path) = path {
            return Self::load(path);
        }
        let default = dir.join(CONFIG_FILENAME);
        if default.is_file() {
            Self::load(&default)
        } else {
            Ok(Self::default())
        }
    }

    pub fn scan_options(&self) -> ScanOptions {
        let defaults = ScanOptions::default();
        ScanOptions {
            max_line_len: self.max_line_len.unwrap_or(defaults.max_line_len),
            max_buffer_len: self.max_buffer_len.unwrap_or(defaults.max_buffer_len),
        }
    }

    /// Registers the extra parsers. A bad definition is logged and skipped.
    pub fn register_parsers(&self, registry: &mut ParserRegistry) -> Vec<TaggerError> {
        let mut errors = Vec::new();
        for definition in &self.parsers {
            if let Err(e) = registry.register(definition.clone()) {
                tracing::warn!("Skipping configured parser: {}", e);
                errors.push(e);
            }
        }
        errors
    }

    /// Applies `disable` then `enable`. Unknown names are reported, not fatal.
    pub fn apply_toggles(&self, registry: &ParserRegistry) -> Vec<TaggerError> {
        let toggles = self
            .disable
            .iter()
            .map(|n| (n, false))
            .chain(self.enable.iter().map(|n| (n, true)));

        let mut errors = Vec::new();
        for (name, enabled) in toggles {
            if let Err(e) = registry.set_enabled(name, enabled) {
                tracing::warn!("{}", e);
                errors.push(e);
            }
        }
        errors
    }

    /// Builds the registry for a run: built-ins plus configured parsers,
    /// initialized, with toggles applied.
    pub fn build_registry(&self) -> ParserRegistry {
        let mut registry = ParserRegistry::with_builtins();
        self.register_parsers(&mut registry);
        registry.initialize_all();
        self.apply_toggles(&registry);
        registry
    }
}

pub fn default_config_path(dir: &Path) -> PathBuf {
    dir.join(CONFIG_FILENAME)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::scan;
    use tempfile::TempDir;

    const SAMPLE: &str = r#"
max_line_len: 128
disable: [Dotenv]
parsers:
  - name: Make
    extensions: [mk]
    patterns: [Makefile]
    regex_table:
      - regex: "^([A-Za-z0-9_.-]+):"
        name: "\\1"
        kinds: "t,target,targets"
"#;

    #[test]
    fn test_parse_sample() {
        let config = TaggerConfig::parse(SAMPLE).unwrap();
        assert_eq!(config.max_line_len, Some(128));
        assert_eq!(config.disable, vec!["Dotenv"]);
        assert_eq!(config.parsers.len(), 1);
        assert_eq!(config.scan_options().max_line_len, 128);
    }

    #[test]
    fn test_parse_invalid() {
        let err = TaggerConfig::parse("parsers: 12").unwrap_err();
        assert!(matches!(err, TaggerError::Config(_)));
    }

    #[test]
    fn test_build_registry_applies_config() {
        let config = TaggerConfig::parse(SAMPLE).unwrap();
        let registry = config.build_registry();

        assert!(!registry.lookup("Dotenv").unwrap().is_enabled());
        let make = registry.lookup("make").unwrap();
        let tags: Vec<_> = scan(make, "all: build\nbuild:\n\tcc main.c\n").collect();
        let names: Vec<&str> = tags.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["all", "build"]);
        assert_eq!(tags[0].kind_name, "target");
    }

    #[test]
    fn test_duplicate_configured_parser_reported() {
        let config = TaggerConfig::parse("parsers:\n  - name: terraform\n").unwrap();
        let mut registry = ParserRegistry::with_builtins();
        let errors = config.register_parsers(&mut registry);
        assert!(matches!(errors[0], TaggerError::DuplicateName(_)));
    }

    #[test]
    fn test_unknown_toggle_reported() {
        let config = TaggerConfig {
            disable: vec!["Cobol".to_string()],
            enable: vec!["Ini".to_string()],
            ..Default::default()
        };
        let registry = ParserRegistry::with_builtins();
        let errors = config.apply_toggles(&registry);
        assert_eq!(errors.len(), 1);
        assert!(registry.lookup("Ini").unwrap().is_enabled());
    }

    #[test]
    fn test_discover() {
        let temp_dir = TempDir::new().unwrap();
        let config = TaggerConfig::discover(None, temp_dir.path()).unwrap();
        assert_eq!(config, TaggerConfig::default());

        std::fs::write(default_config_path(temp_dir.path()), "disable: [Ini]\n").unwrap();
        let config = TaggerConfig::discover(None, temp_dir.path()).unwrap();
        assert_eq!(config.disable, vec!["Ini"]);

        let explicit = temp_dir.path().join("other.yml");
        std::fs::write(&explicit, "enable: [Ini]\n").unwrap();
        let config = TaggerConfig::discover(Some(&explicit), temp_dir.path()).unwrap();
        assert_eq!(config.enable, vec!["Ini"]);
    }
}
