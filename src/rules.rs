//! Regex tag rules: the declarative row and its compiled form.

use serde::{Deserialize, Serialize};

use crate::error::CompileError;
use crate::pattern::{compile, CompiledPattern, RuleFlags, ScopeAction, Template};

/// One row of a parser's regex table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegexRow {
    pub regex: String,
    /// Tag-name template, e.g. `\1`
    pub name: String,
    /// Kind spec: `v` or `v,variable,variables`
    pub kinds: String,
    #[serde(default)]
    pub flags: String,
    /// Scope action, same values as the `{scope=...}` flag
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    /// Case-insensitive matching; rows are case-sensitive by default
    #[serde(default)]
    pub icase: bool,
}

impl RegexRow {
    pub fn new(regex: &str, name: &str, kinds: &str) -> Self {
        Self {
            regex: regex.to_string(),
            name: name.to_string(),
            kinds: kinds.to_string(),
            flags: String::new(),
            scope: None,
            icase: false,
        }
    }

    pub fn with_flags(mut self, flags: &str) -> Self {
        self.flags = flags.to_string();
        self
    }

    pub fn with_scope(mut self, scope: &str) -> Self {
        self.scope = Some(scope.to_string());
        self
    }

    pub fn ignore_case(mut self) -> Self {
        self.icase = true;
        self
    }
}

/// Kind letter with the optional long name and description given inline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KindSpec {
    pub letter: char,
    pub name: Option<String>,
    pub description: Option<String>,
}

impl KindSpec {
    pub fn parse(spec: &str) -> Result<Self, CompileError> {
        let mut parts = spec.splitn(3, ',');
        let letter_part = parts.next().unwrap_or("").trim();

        let mut letters = letter_part.chars();
        let letter = match (letters.next(), letters.next()) {
            (Some(c), None) if c.is_ascii_alphanumeric() => c,
            _ => return Err(CompileError::KindSpec(spec.to_string())),
        };

        let name = parts
            .next()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from);
        let description = parts
            .next()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from);

        Ok(Self {
            letter,
            name,
            description,
        })
    }
}

#[derive(Debug, Clone)]
pub struct RegexRule {
    pub pattern: CompiledPattern,
    pub name: Template,
    pub kind: KindSpec,
    pub role: Option<String>,
    /// `_language` attribution override
    pub language: Option<String>,
    pub fields: Vec<(String, Template)>,
    pub scope: Option<ScopeAction>,
    pub exclusive: bool,
    pub multiline: bool,
    pub placeholder: bool,
}

impl RegexRule {
    pub fn compile(row: &RegexRow) -> Result<Self, CompileError> {
        let flags = RuleFlags::parse(&row.flags)?;
        let kind = KindSpec::parse(&row.kinds)?;

        let scope = match row.scope.as_deref().map(str::trim) {
            None | Some("") => flags.scope,
            Some(s) => Some(s.parse().map_err(|message| CompileError::Flags {
                flags: s.to_string(),
                message,
            })?),
        };

        let case_sensitive = !(row.icase || flags.ignore_case);
        let pattern = compile(&row.regex, case_sensitive)?;

        let name = Template::parse(&row.name);
        pattern.check_template(&name)?;

        let mut fields = Vec::with_capacity(flags.fields.len());
        for (field, value) in &flags.fields {
            let template = Template::parse(value);
            pattern.check_template(&template)?;
            fields.push((field.clone(), template));
        }

        Ok(Self {
            pattern,
            name,
            kind,
            role: flags.role,
            language: flags.language,
            fields,
            scope,
            exclusive: flags.exclusive,
            multiline: flags.multiline,
            placeholder: flags.placeholder,
        })
    }
}
