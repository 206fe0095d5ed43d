//! Relevance (display condition) derivation.
//!
//! A node's condition comes from the rule on its incoming edge. The rule
//! names a model variable; the question asking for that variable is the
//! nearest ancestor with the same normalized name (the *rule parent*).
//! Expressions are first written with logical identities (`${age}`) and then
//! resolved to the uids of the matching ancestors (`${age_k3x9a1}`).

pub mod template;

use crate::repr::{Choice, ModelValue, NodeId, Operator, RuleValue, SplitRule, TypingTree};

/// Errors raised while deriving or resolving conditions.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RelevanceError {
    #[error("variable '{variable}' is not an ancestor of node {node}")]
    UnresolvedVariable { variable: String, node: String },
    #[error("no ancestor of node {node} asks for split variable '{variable}'")]
    MissingRuleParent { variable: String, node: String },
    #[error("node {node} has no question")]
    MissingQuestion { node: String },
    #[error("node {node} asks a choice question but has no choices")]
    MissingChoices { node: String },
    #[error("choice '{choice}' has model value '{value}', which is not a number")]
    NonNumericChoice { choice: String, value: String },
    #[error("rule '{rule}' has an operator that does not match its value")]
    InconsistentRule { rule: String },
    #[error("malformed variable reference at byte {position} of '{template}'")]
    MalformedTemplate { template: String, position: usize },
}

/// Condition of a node together with the parent choices that lead to it.
#[derive(Debug, Clone, PartialEq)]
pub struct Relevance {
    pub expression: String,
    /// Filtered parent choices, when the rule parent is a choice question.
    pub choices_from_parent: Option<Vec<Choice>>,
}

// =============================================================================
// Expressions
// =============================================================================

/// Right-hand side of a single comparison.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Literal<'a> {
    Number(f64),
    Text(&'a str),
}

/// `${var} op value`, with text values single-quoted.
pub fn xpath_condition(var: &str, operator: &str, value: Literal<'_>) -> String {
    match value {
        Literal::Number(n) => format!("${{{var}}} {operator} {n}"),
        Literal::Text(s) => format!("${{{var}}} {operator} '{s}'"),
    }
}

/// `${var} = 'a' or ${var} = 'b' …`. An empty set yields `false()`.
pub fn xpath_any_of<'a>(var: &str, values: impl IntoIterator<Item = &'a str>) -> String {
    let terms: Vec<String> = values
        .into_iter()
        .map(|v| xpath_condition(var, "=", Literal::Text(v)))
        .collect();
    if terms.is_empty() {
        "false()".to_string()
    } else {
        terms.join(" or ")
    }
}

// =============================================================================
// Resolution
// =============================================================================

/// Nearest ancestor whose name is the normalized variable of `rule`.
pub fn find_rule_parent(
    tree: &TypingTree,
    id: NodeId,
    rule: &SplitRule,
) -> Result<NodeId, RelevanceError> {
    let variable = rule.identity();
    tree.nearest_ancestor_named(id, &variable)
        .ok_or_else(|| RelevanceError::MissingRuleParent {
            variable,
            node: tree.node(id).uid().to_string(),
        })
}

/// Resolve `${name}` references against the ancestors of `id`.
///
/// Each name is replaced with the uid of the nearest ancestor carrying that
/// name; a name with no such ancestor is an error.
pub fn resolve_against_ancestors(
    tree: &TypingTree,
    id: NodeId,
    expression: &str,
) -> Result<String, RelevanceError> {
    template::resolve(expression, |name| {
        tree.nearest_ancestor_named(id, name)
            .map(|ancestor| tree.node(ancestor).uid().to_string())
            .ok_or_else(|| RelevanceError::UnresolvedVariable {
                variable: name.to_string(),
                node: tree.node(id).uid().to_string(),
            })
    })
}

// =============================================================================
// Choices
// =============================================================================

fn numeric_value(choice: &Choice, value: &ModelValue) -> Result<f64, RelevanceError> {
    value
        .as_number()
        .ok_or_else(|| RelevanceError::NonNumericChoice {
            choice: choice.name.clone(),
            value: value.as_level(),
        })
}

/// Keep the choices whose model value satisfies `rule`.
///
/// `>` keeps values at or above the cutpoint, `<` values strictly below it,
/// and `in` values whose string form is one of the rule's levels. Choices
/// without a model value never match.
pub fn filter_choices(choices: &[Choice], rule: &SplitRule) -> Result<Vec<Choice>, RelevanceError> {
    let inconsistent = || RelevanceError::InconsistentRule {
        rule: rule.to_string(),
    };

    let mut kept = Vec::new();
    for choice in choices {
        let Some(value) = &choice.model_value else {
            continue;
        };
        let keep = match (rule.operator, &rule.value) {
            (Operator::Gt, RuleValue::Threshold(t)) => numeric_value(choice, value)? >= *t,
            (Operator::Lt, RuleValue::Threshold(t)) => numeric_value(choice, value)? < *t,
            (Operator::In, RuleValue::Levels(levels)) => levels.contains(&value.as_level()),
            _ => return Err(inconsistent()),
        };
        if keep {
            kept.push(choice.clone());
        }
    }
    Ok(kept)
}

/// Choices of a question whose model value is one of `levels`.
pub fn choices_for_levels<'a>(choices: &'a [Choice], levels: &[String]) -> Vec<&'a Choice> {
    choices
        .iter()
        .filter(|c| c.model_value.as_ref().is_some_and(|v| levels.contains(&v.as_level())))
        .collect()
}

// =============================================================================
// Node relevance
// =============================================================================

/// Derive the condition under which node `id` is shown.
///
/// Returns `None` for nodes without an incoming rule (the root). When the
/// rule parent asks a choice question the condition is a disjunction over the
/// matching choice names; otherwise it is a direct comparison against the
/// rule's value.
pub fn node_relevance(tree: &TypingTree, id: NodeId) -> Result<Option<Relevance>, RelevanceError> {
    let Some(rule) = &tree.node(id).rule else {
        return Ok(None);
    };
    rule_relevance(tree, id, rule).map(Some)
}

/// Condition for reaching node `id` through `rule`.
pub fn rule_relevance(
    tree: &TypingTree,
    id: NodeId,
    rule: &SplitRule,
) -> Result<Relevance, RelevanceError> {
    if !rule.is_consistent() {
        return Err(RelevanceError::InconsistentRule {
            rule: rule.to_string(),
        });
    }
    let parent = find_rule_parent(tree, id, rule)?;
    let parent_node = tree.node(parent);
    let question = parent_node
        .question
        .as_ref()
        .ok_or_else(|| RelevanceError::MissingQuestion {
            node: parent_node.uid().to_string(),
        })?;

    let var = rule.identity();
    let (expression, choices_from_parent) = if question.kind.is_select() || question.choices.is_some() {
        let choices = question
            .choices
            .as_deref()
            .filter(|c| !c.is_empty())
            .ok_or_else(|| RelevanceError::MissingChoices {
                node: parent_node.uid().to_string(),
            })?;
        let filtered = filter_choices(choices, rule)?;
        let expression = xpath_any_of(&var, filtered.iter().map(|c| c.name.as_str()));
        (expression, Some(filtered))
    } else {
        let expression = match &rule.value {
            RuleValue::Threshold(t) => {
                xpath_condition(&var, rule.operator.as_str(), Literal::Number(*t))
            }
            RuleValue::Levels(levels) => xpath_any_of(&var, levels.iter().map(String::as_str)),
        };
        (expression, None)
    };

    Ok(Relevance {
        expression: resolve_against_ancestors(tree, id, &expression)?,
        choices_from_parent,
    })
}

/// Whether `expression` references the node with the given uid.
pub fn mentions_uid(expression: &str, uid: &str) -> bool {
    template::references(expression, uid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repr::{Question, QuestionKind};
    use rstest::rstest;

    fn choice(name: &str, value: Option<ModelValue>) -> Choice {
        Choice {
            list_name: "l".into(),
            name: name.into(),
            label: Default::default(),
            model_value: value,
        }
    }

    fn numbered() -> Vec<Choice> {
        (1..=4)
            .map(|i| choice(&format!("c{i}"), Some(ModelValue::Number(i as f64))))
            .collect()
    }

    fn names(choices: &[Choice]) -> Vec<&str> {
        choices.iter().map(|c| c.name.as_str()).collect()
    }

    #[rstest]
    #[case(Operator::Gt, 2.0, &["c2", "c3", "c4"])]
    #[case(Operator::Lt, 2.0, &["c1"])]
    #[case(Operator::Gt, 2.5, &["c3", "c4"])]
    #[case(Operator::Lt, 0.5, &[])]
    fn numeric_filtering(#[case] op: Operator, #[case] cut: f64, #[case] expected: &[&str]) {
        let rule = SplitRule::threshold("x", op, cut);
        let kept = filter_choices(&numbered(), &rule).unwrap();
        assert_eq!(names(&kept), expected);
    }

    #[test]
    fn categorical_filtering_coerces_to_string() {
        let rule = SplitRule::categorical("x", vec!["1".into(), "b".into()], vec![]);
        let choices = vec![
            choice("one", Some(ModelValue::Number(1.0))),
            choice("a", Some(ModelValue::Text("a".into()))),
            choice("b", Some(ModelValue::Text("b".into()))),
            choice("none", None),
        ];
        let kept = filter_choices(&choices, &rule).unwrap();
        assert_eq!(names(&kept), ["one", "b"]);
    }

    #[test]
    fn non_numeric_choice_in_threshold_rule() {
        let rule = SplitRule::threshold("x", Operator::Gt, 1.0);
        let choices = vec![choice("a", Some(ModelValue::Text("abc".into())))];
        assert_eq!(
            filter_choices(&choices, &rule).unwrap_err(),
            RelevanceError::NonNumericChoice {
                choice: "a".into(),
                value: "abc".into()
            }
        );
    }

    #[test]
    fn conditions_are_formatted() {
        assert_eq!(xpath_condition("age", "<", Literal::Number(30.5)), "${age} < 30.5");
        assert_eq!(xpath_condition("ed", "=", Literal::Text("p")), "${ed} = 'p'");
        assert_eq!(xpath_any_of("ed", ["a", "b"]), "${ed} = 'a' or ${ed} = 'b'");
        assert_eq!(xpath_any_of("ed", []), "false()");
    }

    /// ed (select_one) -> age (integer) -> leaf
    fn chain(kind: QuestionKind) -> (TypingTree, NodeId, NodeId, NodeId) {
        let mut tree = TypingTree::new("ed");
        let ed = tree.root();
        let mut q = Question::new("ed", kind);
        if kind.is_select() {
            q.choices = Some(vec![
                choice("none", Some(ModelValue::Text("none".into()))),
                choice("primary", Some(ModelValue::Text("primary".into()))),
                choice("secondary", Some(ModelValue::Text("secondary".into()))),
            ]);
        }
        tree.node_mut(ed).question = Some(q);

        let age = tree.create_node("age");
        tree.node_mut(age).rule = Some(SplitRule::categorical(
            "ed",
            vec!["none".into(), "secondary".into()],
            vec!["primary".into()],
        ));
        tree.node_mut(age).question = Some(Question::new("age", QuestionKind::Integer));
        tree.add_child(ed, age).unwrap();

        let leaf = tree.create_node("segment");
        tree.node_mut(leaf).rule = Some(SplitRule::threshold("Age", Operator::Lt, 30.0));
        tree.add_child(age, leaf).unwrap();
        (tree, ed, age, leaf)
    }

    #[test]
    fn choice_parent_yields_disjunction() {
        let (tree, ed, age, _) = chain(QuestionKind::SelectOne);
        let relevance = node_relevance(&tree, age).unwrap().unwrap();
        let uid = tree.node(ed).uid();
        assert_eq!(
            relevance.expression,
            format!("${{{uid}}} = 'none' or ${{{uid}}} = 'secondary'")
        );
        assert_eq!(names(&relevance.choices_from_parent.unwrap()), ["none", "secondary"]);
    }

    #[test]
    fn plain_parent_yields_comparison() {
        let (tree, _, age, leaf) = chain(QuestionKind::SelectOne);
        let relevance = node_relevance(&tree, leaf).unwrap().unwrap();
        assert_eq!(
            relevance.expression,
            format!("${{{}}} < 30", tree.node(age).uid())
        );
        assert!(relevance.choices_from_parent.is_none());
    }

    #[test]
    fn categorical_rule_on_text_parent_expands_levels() {
        let (tree, ed, age, _) = chain(QuestionKind::Text);
        let relevance = node_relevance(&tree, age).unwrap().unwrap();
        let uid = tree.node(ed).uid();
        assert_eq!(
            relevance.expression,
            format!("${{{uid}}} = 'none' or ${{{uid}}} = 'secondary'")
        );
    }

    #[test]
    fn root_has_no_relevance() {
        let (tree, ed, ..) = chain(QuestionKind::SelectOne);
        assert_eq!(node_relevance(&tree, ed).unwrap(), None);
    }

    #[test]
    fn select_without_choices_is_an_error() {
        let (mut tree, ed, age, _) = chain(QuestionKind::SelectOne);
        tree.question_mut(ed).unwrap().choices = None;
        assert!(matches!(
            node_relevance(&tree, age).unwrap_err(),
            RelevanceError::MissingChoices { .. }
        ));
    }

    #[test]
    fn inconsistent_rule_is_rejected() {
        let (mut tree, _, age, leaf) = chain(QuestionKind::SelectOne);
        tree.node_mut(leaf).rule = Some(SplitRule {
            variable: "age".into(),
            operator: Operator::In,
            value: RuleValue::Threshold(30.0),
            excluded: vec![],
        });
        assert!(matches!(
            node_relevance(&tree, leaf).unwrap_err(),
            RelevanceError::InconsistentRule { .. }
        ));
        assert!(node_relevance(&tree, age).is_ok());
    }

    #[test]
    fn missing_rule_parent() {
        let (mut tree, _, age, _) = chain(QuestionKind::SelectOne);
        tree.node_mut(age).rule = Some(SplitRule::threshold("income", Operator::Gt, 1.0));
        assert!(matches!(
            node_relevance(&tree, age).unwrap_err(),
            RelevanceError::MissingRuleParent { variable, .. } if variable == "income"
        ));
    }

    #[test]
    fn unresolved_variable_is_an_error() {
        let (tree, ed, _, leaf) = chain(QuestionKind::SelectOne);
        let resolved = resolve_against_ancestors(&tree, leaf, "${ed} != ''").unwrap();
        assert_eq!(resolved, format!("${{{}}} != ''", tree.node(ed).uid()));

        let err = resolve_against_ancestors(&tree, leaf, "${income} > 2").unwrap_err();
        assert!(matches!(
            err,
            RelevanceError::UnresolvedVariable { variable, .. } if variable == "income"
        ));
    }
}
