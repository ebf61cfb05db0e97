//! Dependency resolution between parsers.
//!
//! Orders parsers so that every Foreigner/Base/Subparser target comes before
//! its dependents, detects cycles with a three-color depth-first walk, and
//! links each parser's kind vocabulary with the vocabularies of the parsers
//! it borrows from.

use crate::error::TaggerError;

use super::descriptor::{ActiveRule, DependencyType, ParserDescriptor, ResolvedParser, Vocabulary};
use super::{Diagnostic, ParserRegistry};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    InProgress,
    Done,
}

/// Result of resolving a registry.
#[derive(Debug, Default)]
pub struct Resolution {
    /// Indices of resolvable parsers, dependencies first
    pub order: Vec<usize>,
    /// Parsers that cannot be used, with the reason
    pub failures: Vec<(usize, TaggerError)>,
    /// Linked vocabulary and active rules, per registry index
    pub resolved: Vec<Option<ResolvedParser>>,
    /// Rules dropped while linking kinds and roles
    pub rule_diagnostics: Vec<Diagnostic>,
}

struct Edge<'a> {
    kind: DependencyType,
    target: Option<usize>,
    target_name: &'a str,
}

struct Walk<'a> {
    parsers: &'a [ParserDescriptor],
    edges: Vec<Vec<Edge<'a>>>,
    marks: Vec<Mark>,
    path: Vec<usize>,
    failed: Vec<Option<TaggerError>>,
    order: Vec<usize>,
}

impl<'a> Walk<'a> {
    fn new(registry: &'a ParserRegistry) -> Self {
        let parsers = registry.all();
        let edges = parsers
            .iter()
            .map(|p| {
                p.dependencies()
                    .iter()
                    .map(|dep| Edge {
                        kind: dep.kind,
                        target: registry.index_of(&dep.target),
                        target_name: dep.target.as_str(),
                    })
                    .collect()
            })
            .collect();

        Self {
            parsers,
            edges,
            marks: vec![Mark::Unvisited; parsers.len()],
            path: Vec::new(),
            failed: (0..parsers.len()).map(|_| None).collect(),
            order: Vec::new(),
        }
    }

    fn name(&self, node: usize) -> String {
        self.parsers[node].name().to_string()
    }

    fn fail(&mut self, node: usize, error: TaggerError) {
        if self.failed[node].is_none() {
            self.failed[node] = Some(error);
        }
    }

    fn visit(&mut self, node: usize) {
        self.marks[node] = Mark::InProgress;
        self.path.push(node);

        for i in 0..self.edges[node].len() {
            let (kind, target, target_name) = {
                let edge = &self.edges[node][i];
                (edge.kind, edge.target, edge.target_name)
            };

            let Some(target) = target else {
                let error = TaggerError::UnresolvedDependency {
                    parser: self.name(node),
                    target: target_name.to_string(),
                };
                self.fail(node, error);
                continue;
            };

            match self.marks[target] {
                Mark::InProgress => {
                    self.report_cycle(target);
                    continue;
                }
                Mark::Unvisited => self.visit(target),
                Mark::Done => {}
            }

            // A cycle only disables its members; dependents link without
            // the cyclic vocabulary and lose the rules that needed it.
            let broken = match &self.failed[target] {
                Some(TaggerError::Cycle(_)) | None => false,
                Some(_) => true,
            };
            if kind.is_hard() && broken {
                let error = TaggerError::DependencyFailed {
                    parser: self.name(node),
                    target: self.name(target),
                };
                self.fail(node, error);
            }
        }

        self.path.pop();
        self.marks[node] = Mark::Done;
        if self.failed[node].is_none() {
            self.order.push(node);
        }
    }

    fn report_cycle(&mut self, entry: usize) {
        let Some(start) = self.path.iter().position(|&n| n == entry) else {
            return;
        };
        let members: Vec<usize> = self.path[start..].to_vec();
        let mut names: Vec<String> = members.iter().map(|&n| self.name(n)).collect();
        names.push(self.name(entry));

        for node in members {
            self.fail(node, TaggerError::Cycle(names.clone()));
        }
    }
}

/// Resolves every registered parser.
pub fn resolve(registry: &ParserRegistry) -> Resolution {
    let mut walk = Walk::new(registry);
    for node in 0..walk.parsers.len() {
        if walk.marks[node] == Mark::Unvisited {
            walk.visit(node);
        }
    }

    let parsers = walk.parsers;
    let mut resolved: Vec<Option<ResolvedParser>> = (0..parsers.len()).map(|_| None).collect();
    let mut rule_diagnostics = Vec::new();

    for &node in &walk.order {
        let parser = &parsers[node];
        let mut vocabulary = Vocabulary::default();
        vocabulary.insert(parser.name(), parser.kinds());

        let mut subparsers = Vec::new();
        for (edge, dep) in walk.edges[node].iter().zip(parser.dependencies()) {
            let Some(target) = edge.target else { continue };
            match dep.kind {
                DependencyType::Foreigner | DependencyType::Base => {
                    if let Some(linked) = &resolved[target] {
                        vocabulary.extend(&linked.vocabulary);
                    }
                }
                DependencyType::Subparser => subparsers.push(parsers[target].name().to_string()),
            }
        }

        let mut line_rules = Vec::new();
        let mut multiline_rules = Vec::new();
        for (index, rule) in parser.rules().iter().enumerate() {
            match activate_rule(parser, &vocabulary, index) {
                Ok(active) if rule.multiline => multiline_rules.push(active),
                Ok(active) => line_rules.push(active),
                Err(error) => {
                    let row = parser.rule_row(index);
                    tracing::warn!("{}: dropping rule {}: {}", parser.name(), row, error);
                    rule_diagnostics.push(Diagnostic::rule(parser.name(), row, error));
                }
            }
        }

        resolved[node] = Some(ResolvedParser {
            vocabulary,
            line_rules,
            multiline_rules,
            subparsers,
        });
    }

    let failures = walk
        .failed
        .into_iter()
        .enumerate()
        .filter_map(|(node, error)| error.map(|e| (node, e)))
        .collect();

    Resolution {
        order: walk.order,
        failures,
        resolved,
        rule_diagnostics,
    }
}

fn activate_rule(
    parser: &ParserDescriptor,
    vocabulary: &Vocabulary,
    index: usize,
) -> Result<ActiveRule, TaggerError> {
    let rule = &parser.rules()[index];
    let requested = rule.language.as_deref().unwrap_or(parser.name());

    let language = vocabulary
        .language(requested)
        .ok_or_else(|| TaggerError::UnresolvedDependency {
            parser: parser.name().to_string(),
            target: requested.to_string(),
        })?
        .to_string();

    let kind = vocabulary
        .kind(&language, rule.kind.letter)
        .ok_or_else(|| TaggerError::UnknownKind {
            parser: parser.name().to_string(),
            language: language.clone(),
            kind: rule.kind.letter.to_string(),
        })?
        .clone();

    if let Some(role) = &rule.role {
        if !kind.has_role(role) {
            return Err(TaggerError::UnknownRole {
                parser: parser.name().to_string(),
                language,
                kind: kind.name,
                role: role.clone(),
            });
        }
    }

    Ok(ActiveRule {
        rule: index,
        kind,
        role: rule.role.clone(),
        language,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsers::descriptor::{Dependency, KindDefinition, ParserDefinition};
    use crate::rules::RegexRow;

    fn parser(name: &str, deps: &[(DependencyType, &str)]) -> ParserDefinition {
        let mut def = ParserDefinition::new(name);
        def.kinds = vec![KindDefinition::new('v', "variable", "variables")];
        def.dependencies = deps.iter().map(|(k, t)| Dependency::new(*k, t)).collect();
        def
    }

    fn names(registry: &ParserRegistry, order: &[usize]) -> Vec<String> {
        order
            .iter()
            .map(|&i| registry.all()[i].name().to_string())
            .collect()
    }

    #[test]
    fn test_order_puts_targets_first() {
        let mut registry = ParserRegistry::new();
        registry
            .register(parser("Child", &[(DependencyType::Foreigner, "Base")]))
            .unwrap();
        registry.register(parser("Base", &[])).unwrap();

        let resolution = resolve(&registry);
        assert!(resolution.failures.is_empty());
        assert_eq!(names(&registry, &resolution.order), vec!["Base", "Child"]);
    }

    #[test]
    fn test_target_lookup_is_case_insensitive() {
        let mut registry = ParserRegistry::new();
        registry.register(parser("Base", &[])).unwrap();
        registry
            .register(parser("Child", &[(DependencyType::Base, "BASE")]))
            .unwrap();

        let resolution = resolve(&registry);
        assert!(resolution.failures.is_empty());
    }

    #[test]
    fn test_cycle_names_members() {
        let mut registry = ParserRegistry::new();
        registry
            .register(parser("A", &[(DependencyType::Foreigner, "B")]))
            .unwrap();
        registry
            .register(parser("B", &[(DependencyType::Base, "A")]))
            .unwrap();
        registry.register(parser("C", &[])).unwrap();

        registry
            .register(parser("D", &[(DependencyType::Foreigner, "A")]))
            .unwrap();

        let resolution = resolve(&registry);
        assert_eq!(names(&registry, &resolution.order), vec!["C", "D"]);
        assert_eq!(resolution.failures.len(), 2);
        for (_, error) in &resolution.failures {
            match error {
                TaggerError::Cycle(path) => assert_eq!(path, &vec!["A", "B", "A"]),
                other => panic!("expected cycle, got {other}"),
            }
        }
    }

    #[test]
    fn test_dependent_of_cycle_drops_foreign_rules() {
        let mut registry = ParserRegistry::new();
        registry
            .register(parser("A", &[(DependencyType::Foreigner, "B")]))
            .unwrap();
        registry
            .register(parser("B", &[(DependencyType::Base, "A")]))
            .unwrap();
        let mut user = parser("User", &[(DependencyType::Foreigner, "A")]);
        user.regex_table = vec![
            RegexRow::new("^([a-z]+)=", r"\1", "v"),
            RegexRow::new("^([a-z]+):", r"\1", "v").with_flags("{_language=A}"),
        ];
        registry.register(user).unwrap();

        let resolution = resolve(&registry);
        assert_eq!(names(&registry, &resolution.order), vec!["User"]);

        let linked = resolution.resolved[2].as_ref().unwrap();
        assert_eq!(linked.vocabulary.languages(), vec!["User"]);
        assert_eq!(linked.line_rules.len(), 1);
        assert!(matches!(
            resolution.rule_diagnostics[0].error,
            TaggerError::UnresolvedDependency { ref target, .. } if target == "A"
        ));
    }

    #[test]
    fn test_self_loop_is_cycle() {
        let mut registry = ParserRegistry::new();
        registry
            .register(parser("Loop", &[(DependencyType::Subparser, "Loop")]))
            .unwrap();

        let resolution = resolve(&registry);
        assert!(resolution.order.is_empty());
        assert!(matches!(resolution.failures[0].1, TaggerError::Cycle(ref p) if p.len() == 2));
    }

    #[test]
    fn test_unresolved_dependency_propagates_over_hard_edges() {
        let mut registry = ParserRegistry::new();
        registry
            .register(parser("Lonely", &[(DependencyType::Foreigner, "Missing")]))
            .unwrap();
        registry
            .register(parser("Dependent", &[(DependencyType::Base, "Lonely")]))
            .unwrap();
        registry
            .register(parser("Host", &[(DependencyType::Subparser, "Lonely")]))
            .unwrap();

        let resolution = resolve(&registry);
        assert_eq!(names(&registry, &resolution.order), vec!["Host"]);
        let errors: Vec<&TaggerError> = resolution.failures.iter().map(|(_, e)| e).collect();
        assert!(matches!(errors[0], TaggerError::UnresolvedDependency { target, .. } if target == "Missing"));
        assert!(matches!(errors[1], TaggerError::DependencyFailed { target, .. } if target == "Lonely"));
    }

    #[test]
    fn test_foreign_vocabulary_is_linked() {
        let mut registry = ParserRegistry::new();
        let mut base = ParserDefinition::new("Terraform");
        base.kinds = vec![KindDefinition::new('v', "variable", "variables").with_role("assigned", "assigned")];
        registry.register(base).unwrap();

        let mut vars = ParserDefinition::new("TerraformVariables");
        vars.regex_table = vec![
            RegexRow::new("^([a-z0-9_]+)[[:space:]]*=", r"\1", "v")
                .with_flags("{_role=assigned}{_language=terraform}"),
            RegexRow::new("^([a-z]+):", r"\1", "q").with_flags("{_language=Terraform}"),
            RegexRow::new("^([a-z]+);", r"\1", "v").with_flags("{_role=read}{_language=Terraform}"),
            RegexRow::new("^([a-z]+)!", r"\1", "v").with_flags("{_language=Ansible}"),
        ];
        vars.dependencies = vec![Dependency::new(DependencyType::Foreigner, "Terraform")];
        registry.register(vars).unwrap();

        let resolution = resolve(&registry);
        let linked = resolution.resolved[1].as_ref().unwrap();
        assert_eq!(linked.vocabulary.languages(), vec!["Terraform", "TerraformVariables"]);
        assert_eq!(linked.line_rules.len(), 1);
        assert_eq!(linked.line_rules[0].language, "Terraform");
        assert_eq!(linked.line_rules[0].kind.name, "variable");

        let errors: Vec<&TaggerError> = resolution.rule_diagnostics.iter().map(|d| &d.error).collect();
        assert!(matches!(errors[0], TaggerError::UnknownKind { .. }));
        assert!(matches!(errors[1], TaggerError::UnknownRole { .. }));
        assert!(matches!(errors[2], TaggerError::UnresolvedDependency { .. }));
    }
}
