//! Regex compilation for tag rules.
//!
//! Patterns use POSIX-extended semantics (anchors, bracket expressions with
//! `[[:class:]]` names, quantifiers, groups, alternation) as understood by the
//! `regex` crate. Backreferences and look-around are rejected up front, as are
//! patterns that can only ever match the empty string.

use regex::{Regex, RegexBuilder};
use regex_syntax::ast::ErrorKind as AstErrorKind;

use crate::error::CompileError;
use crate::pattern::template::Template;

/// Upper bound on the compiled program size of a single rule.
const SIZE_LIMIT: usize = 1 << 20;

#[derive(Debug, Clone)]
pub struct CompiledPattern {
    regex: Regex,
    case_sensitive: bool,
}

impl CompiledPattern {
    pub fn as_str(&self) -> &str {
        self.regex.as_str()
    }

    pub fn regex(&self) -> &Regex {
        &self.regex
    }

    pub fn is_case_sensitive(&self) -> bool {
        self.case_sensitive
    }

    /// Number of explicit capture groups (group 0 excluded).
    pub fn group_count(&self) -> usize {
        self.regex.captures_len() - 1
    }

    /// Checks that every `\N` in the template names an existing group.
    pub fn check_template(&self, template: &Template) -> Result<(), CompileError> {
        match template.max_group() {
            Some(group) if group > self.group_count() => Err(CompileError::TemplateGroup {
                template: template.source().to_string(),
                group,
                available: self.group_count(),
            }),
            _ => Ok(()),
        }
    }
}

impl PartialEq for CompiledPattern {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str() && self.case_sensitive == other.case_sensitive
    }
}

pub fn compile(pattern: &str, case_sensitive: bool) -> Result<CompiledPattern, CompileError> {
    let hir = regex_syntax::ParserBuilder::new()
        .case_insensitive(!case_sensitive)
        .build()
        .parse(pattern)
        .map_err(|e| classify_syntax_error(pattern, e))?;

    if hir.properties().maximum_len() == Some(0) {
        return Err(CompileError::ZeroWidth(pattern.to_string()));
    }

    let regex = RegexBuilder::new(pattern)
        .case_insensitive(!case_sensitive)
        .size_limit(SIZE_LIMIT)
        .build()
        .map_err(|e| CompileError::Malformed {
            pattern: pattern.to_string(),
            message: e.to_string(),
        })?;

    Ok(CompiledPattern {
        regex,
        case_sensitive,
    })
}

fn classify_syntax_error(pattern: &str, err: regex_syntax::Error) -> CompileError {
    let construct = match &err {
        regex_syntax::Error::Parse(ast_err) => match ast_err.kind() {
            AstErrorKind::UnsupportedBackreference => Some("backreference"),
            AstErrorKind::UnsupportedLookAround => Some("look-around"),
            _ => None,
        },
        _ => None,
    };

    match construct {
        Some(construct) => CompileError::Unsupported {
            pattern: pattern.to_string(),
            construct: construct.to_string(),
        },
        None => CompileError::Malformed {
            pattern: pattern.to_string(),
            message: err.to_string(),
        },
    }
}
