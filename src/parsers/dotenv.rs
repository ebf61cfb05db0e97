//! `.env` files.

use super::descriptor::{KindDefinition, ParserDefinition};
use crate::rules::RegexRow;

pub fn definition() -> ParserDefinition {
    let mut def = ParserDefinition::new("Dotenv");
    def.extensions = vec!["env".to_string()];
    def.patterns = vec![".env".to_string(), ".env.*".to_string()];
    def.kinds = vec![KindDefinition::new('v', "variable", "variables")];
    def.regex_table = vec![
        RegexRow::new(
            "^[[:space:]]*export[[:space:]]+([A-Za-z_][A-Za-z0-9_]*)=",
            r"\1",
            "v",
        )
        .with_flags("{exclusive}{_field=exported:yes}"),
        RegexRow::new("^[[:space:]]*([A-Za-z_][A-Za-z0-9_]*)=", r"\1", "v"),
    ];
    def
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsers::ParserRegistry;
    use crate::scanner::scan;

    #[test]
    fn test_dotenv_variables() {
        let mut registry = ParserRegistry::new();
        registry.register(definition()).unwrap();
        registry.initialize_all();
        let parser = registry.lookup("Dotenv").unwrap();

        let source = "DATABASE_URL=postgres://localhost\nexport API_KEY=secret\n# OLD=1\n";
        let tags: Vec<_> = scan(parser, source).collect();

        assert_eq!(tags.len(), 2);
        assert_eq!(tags[0].name, "DATABASE_URL");
        assert!(tags[0].fields.is_empty());
        assert_eq!(tags[1].name, "API_KEY");
        assert_eq!(tags[1].fields.get("exported").map(String::as_str), Some("yes"));
    }
}
