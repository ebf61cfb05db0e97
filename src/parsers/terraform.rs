//! Terraform configuration files (`.tf`).
//!
//! Tags top-level blocks. This is the base vocabulary `TerraformVariables`
//! attributes its tags to.

use super::descriptor::{KindDefinition, ParserDefinition, ParserVersion};
use crate::rules::RegexRow;

pub const NAME: &str = "Terraform";

pub fn kinds() -> Vec<KindDefinition> {
    vec![
        KindDefinition::new('r', "resource", "resources"),
        KindDefinition::new('d', "data", "data sources"),
        KindDefinition::new('v', "variable", "variables")
            .with_role("assigned", "assigned in a variable definitions file"),
        KindDefinition::new('p', "provider", "providers"),
        KindDefinition::new('m', "module", "modules"),
        KindDefinition::new('o', "output", "outputs"),
    ]
}

pub fn definition() -> ParserDefinition {
    let mut def = ParserDefinition::new(NAME);
    def.extensions = vec!["tf".to_string()];
    def.aliases = vec!["hcl".to_string()];
    def.kinds = kinds();
    def.regex_table = vec![
        RegexRow::new(
            r#"^resource[[:space:]]+"([^"]+)"[[:space:]]+"([^"]+)""#,
            r"\2",
            "r",
        )
        .with_flags(r"{_field=type:\1}"),
        RegexRow::new(
            r#"^data[[:space:]]+"([^"]+)"[[:space:]]+"([^"]+)""#,
            r"\2",
            "d",
        )
        .with_flags(r"{_field=type:\1}"),
        RegexRow::new(r#"^variable[[:space:]]+"?([A-Za-z0-9_-]+)"?"#, r"\1", "v"),
        RegexRow::new(r#"^provider[[:space:]]+"?([A-Za-z0-9_-]+)"?"#, r"\1", "p"),
        RegexRow::new(r#"^module[[:space:]]+"?([A-Za-z0-9_-]+)"?"#, r"\1", "m"),
        RegexRow::new(r#"^output[[:space:]]+"?([A-Za-z0-9_-]+)"?"#, r"\1", "o"),
    ];
    def.version = ParserVersion { current: 1, age: 0 };
    def
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsers::ParserRegistry;
    use crate::scanner::scan;

    const MAIN_TF: &str = r#"
provider "aws" {
  region = var.region
}

variable "region" {
  default = "eu-west-1"
}

resource "aws_instance" "web" {
  ami = "ami-123"
}

data "aws_ami" "ubuntu" {}

module "vpc" {
  source = "./vpc"
}

output "ip" {
  value = aws_instance.web.public_ip
}
"#;

    #[test]
    fn test_terraform_blocks() {
        let mut registry = ParserRegistry::new();
        registry.register(definition()).unwrap();
        assert!(registry.initialize_all().is_clean());

        let parser = registry.lookup(NAME).unwrap();
        let tags: Vec<(String, char)> = scan(parser, MAIN_TF).map(|t| (t.name, t.kind)).collect();
        assert_eq!(
            tags,
            vec![
                ("aws".to_string(), 'p'),
                ("region".to_string(), 'v'),
                ("web".to_string(), 'r'),
                ("ubuntu".to_string(), 'd'),
                ("vpc".to_string(), 'm'),
                ("ip".to_string(), 'o'),
            ]
        );
    }

    #[test]
    fn test_resource_type_field() {
        let mut registry = ParserRegistry::new();
        registry.register(definition()).unwrap();
        registry.initialize_all();

        let parser = registry.lookup(NAME).unwrap();
        let web = scan(parser, MAIN_TF).find(|t| t.name == "web").unwrap();
        assert_eq!(web.fields.get("type").map(String::as_str), Some("aws_instance"));
        assert_eq!(web.language, "Terraform");
        assert_eq!(web.line, 10);
    }
}
