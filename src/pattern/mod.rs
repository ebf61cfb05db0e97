pub mod compiler;
pub mod flags;
pub mod template;

pub use compiler::{compile, CompiledPattern};
pub use flags::{RuleFlags, ScopeAction};
pub use template::Template;
