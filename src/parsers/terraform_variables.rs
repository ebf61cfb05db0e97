//! Terraform variable definition files (`.tfvars`).
//!
//! A regex-only parser that owns no kinds: every tag is a Terraform
//! `variable` with the `assigned` role, borrowed through a Foreigner
//! dependency on the Terraform parser.

use super::descriptor::{Dependency, DependencyType, ParserDefinition, ParserVersion};
use crate::rules::RegexRow;

pub const NAME: &str = "TerraformVariables";

fn initialize() -> std::result::Result<(), String> {
    Ok(())
}

pub fn definition() -> ParserDefinition {
    let mut def = ParserDefinition::new(NAME);
    def.extensions = vec!["tfvars".to_string()];
    def.regex_table = vec![RegexRow::new("^([a-z0-9_]+)[[:space:]]*=", r"\1", "v")
        .with_flags("{_role=assigned}{_language=Terraform}")];
    def.dependencies = vec![Dependency::new(
        DependencyType::Foreigner,
        super::terraform::NAME,
    )];
    def.version = ParserVersion { current: 0, age: 0 };
    def.hooks.initialize = Some(initialize);
    def
}
