//! Attribute-block mini-language attached to regex rules.
//!
//! ```text
//! {_role=assigned}{_language=Terraform}{_field=type:\1}{exclusive}{scope=push}
//! ```
//!
//! Bare single-letter flags are accepted too: `i` (ignore case),
//! `x` (exclusive) and `e` (extended syntax, the default).

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CompileError;

/// What a matching rule does to the per-scan scope stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScopeAction {
    Ref,
    Push,
    Pop,
    Clear,
    Set,
}

impl FromStr for ScopeAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "ref" => Ok(Self::Ref),
            "push" => Ok(Self::Push),
            "pop" => Ok(Self::Pop),
            "clear" => Ok(Self::Clear),
            "set" => Ok(Self::Set),
            other => Err(format!("unknown scope action `{}`", other)),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleFlags {
    pub role: Option<String>,
    pub language: Option<String>,
    /// (field name, value template) in declaration order
    pub fields: Vec<(String, String)>,
    pub scope: Option<ScopeAction>,
    pub exclusive: bool,
    pub multiline: bool,
    pub placeholder: bool,
    pub ignore_case: bool,
}

impl RuleFlags {
    pub fn parse(flags: &str) -> Result<Self, CompileError> {
        let mut parsed = Self::default();
        let err = |message: String| CompileError::Flags {
            flags: flags.to_string(),
            message,
        };

        let mut rest = flags.trim();
        while let Some(c) = rest.chars().next() {
            if c == '{' {
                let end = rest
                    .find('}')
                    .ok_or_else(|| err("unterminated `{`".to_string()))?;
                let body = &rest[1..end];
                parsed.apply_long(body).map_err(err)?;
                rest = &rest[end + 1..];
            } else {
                match c {
                    'i' => parsed.ignore_case = true,
                    'x' => parsed.exclusive = true,
                    'e' => {}
                    'b' => return Err(err("basic regex syntax is not supported".to_string())),
                    c if c.is_whitespace() => {}
                    other => return Err(err(format!("unknown flag `{}`", other))),
                }
                rest = &rest[c.len_utf8()..];
            }
        }

        Ok(parsed)
    }

    fn apply_long(&mut self, body: &str) -> Result<(), String> {
        let (key, value) = match body.split_once('=') {
            Some((k, v)) => (k.trim(), Some(v)),
            None => (body.trim(), None),
        };

        match (key, value) {
            ("_role", Some(v)) if !v.is_empty() => self.role = Some(v.to_string()),
            ("_language", Some(v)) if !v.is_empty() => self.language = Some(v.to_string()),
            ("_field", Some(v)) => {
                let (name, template) = v
                    .split_once(':')
                    .ok_or_else(|| format!("field `{}` needs NAME:VALUE", v))?;
                if name.is_empty() {
                    return Err("empty field name".to_string());
                }
                self.fields.push((name.to_string(), template.to_string()));
            }
            ("scope", Some(v)) => self.scope = Some(v.parse()?),
            ("exclusive", None) => self.exclusive = true,
            ("mline", None) => self.multiline = true,
            ("placeholder", None) => self.placeholder = true,
            ("icase", None) => self.ignore_case = true,
            (key, _) => return Err(format!("unknown or malformed flag `{}`", key)),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_role_and_language() {
        let flags = RuleFlags::parse("{_role=assigned}{_language=Terraform}").unwrap();
        assert_eq!(flags.role.as_deref(), Some("assigned"));
        assert_eq!(flags.language.as_deref(), Some("Terraform"));
        assert!(!flags.exclusive);
    }

    #[test]
    fn test_parse_empty() {
        assert_eq!(RuleFlags::parse("").unwrap(), RuleFlags::default());
    }

    #[test]
    fn test_parse_fields_keep_order() {
        let flags = RuleFlags::parse(r"{_field=type:\1}{_field=alias:x-\2}").unwrap();
        assert_eq!(
            flags.fields,
            vec![
                ("type".to_string(), r"\1".to_string()),
                ("alias".to_string(), r"x-\2".to_string()),
            ]
        );
    }

    #[test]
    fn test_parse_switches() {
        let flags = RuleFlags::parse("{exclusive}{mline}{placeholder}{scope=push}").unwrap();
        assert!(flags.exclusive);
        assert!(flags.multiline);
        assert!(flags.placeholder);
        assert_eq!(flags.scope, Some(ScopeAction::Push));
    }

    #[test]
    fn test_parse_short_flags() {
        let flags = RuleFlags::parse("ix").unwrap();
        assert!(flags.ignore_case);
        assert!(flags.exclusive);
    }

    #[test]
    fn test_parse_errors() {
        assert!(RuleFlags::parse("{_role=assigned").is_err());
        assert!(RuleFlags::parse("{bogus}").is_err());
        assert!(RuleFlags::parse("{scope=sideways}").is_err());
        assert!(RuleFlags::parse("{_field=novalue}").is_err());
        assert!(RuleFlags::parse("b").is_err());
        assert!(RuleFlags::parse("q").is_err());
    }
}
