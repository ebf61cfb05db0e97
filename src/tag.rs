use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Enclosing scope of a tag, e.g. the INI section a key belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagScope {
    pub kind: String,
    pub name: String,
}

impl TagScope {
    pub fn new(kind: &str, name: &str) -> Self {
        Self {
            kind: kind.to_string(),
            name: name.to_string(),
        }
    }
}

/// One tag produced by a scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagRecord {
    pub name: String,
    pub kind: char,
    pub kind_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    /// 1-based
    pub line: usize,
    /// 0-based byte offset of the match within its line
    pub column: usize,
    /// Parser that produced the tag
    pub parser: String,
    /// Language the tag is attributed to; differs from `parser` for
    /// foreign tags
    pub language: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub fields: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<TagScope>,
}

impl TagRecord {
    pub fn is_foreign(&self) -> bool {
        self.parser != self.language
    }
}
