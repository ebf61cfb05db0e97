//! INI-style configuration files. Keys are scoped to their section.

use super::descriptor::{KindDefinition, ParserDefinition};
use crate::rules::RegexRow;

pub fn definition() -> ParserDefinition {
    let mut def = ParserDefinition::new("Ini");
    def.extensions = vec!["ini".to_string(), "cfg".to_string()];
    def.aliases = vec!["iniconf".to_string()];
    def.patterns = vec!["*.ini.*".to_string()];
    def.kinds = vec![
        KindDefinition::new('s', "section", "sections"),
        KindDefinition::new('k', "key", "keys"),
    ];
    def.regex_table = vec![
        RegexRow::new(r"^[[:space:]]*\[([^\]]+)\]", r"\1", "s").with_scope("set"),
        RegexRow::new(r"^[[:space:]]*([A-Za-z0-9_.-]+)[[:space:]]*[=:]", r"\1", "k")
            .with_scope("ref"),
    ];
    def
}
