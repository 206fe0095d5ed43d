//! Hide choices for levels the model never saw at a split.

use tracing::{debug, info};

use crate::relevance::choices_for_levels;
use crate::repr::{NodeId, TypingTree};

/// Names of the choices of `id` whose model value is excluded at the node's
/// own split.
///
/// Returns `None` for nodes without a select question, without an excluded
/// set, or when no choice maps to an excluded level.
fn excluded_choices(tree: &TypingTree, id: NodeId) -> Option<Vec<String>> {
    let node = tree.node(id);
    let question = node.question.as_ref().filter(|q| q.kind.is_select())?;
    let excluded = &node.model.as_ref()?.left_rule.as_ref()?.excluded;
    let choices = question.choices.as_deref()?;

    let names: Vec<String> = choices_for_levels(choices, excluded)
        .into_iter()
        .map(|c| c.name.clone())
        .collect();
    (!names.is_empty()).then_some(names)
}

/// `name != 'a' and name != 'b' …` over the excluded choice names.
fn filter_expression(names: &[String]) -> String {
    names
        .iter()
        .map(|name| format!("name != '{name}'"))
        .collect::<Vec<_>>()
        .join(" and ")
}

/// Choice filter for node `id`, or `None` when no choice is excluded at its
/// split.
pub fn choice_filter(tree: &TypingTree, id: NodeId) -> Option<String> {
    excluded_choices(tree, id).map(|names| filter_expression(&names))
}

/// Set choice filters on every select question whose split excludes levels,
/// and drop the excluded choices from the children's parent choices.
pub fn set_choice_filters(tree: &TypingTree) -> TypingTree {
    let mut out = tree.clone();
    let mut filtered = 0usize;

    for id in out.preorder() {
        let Some(excluded) = excluded_choices(&out, id) else {
            continue;
        };
        let filter = filter_expression(&excluded);

        for child in out.node(id).children().to_vec() {
            if let Some(from_parent) = out
                .question_mut(child)
                .and_then(|q| q.choices_from_parent.as_mut())
            {
                from_parent.retain(|c| !excluded.contains(&c.name));
            }
        }

        debug!(node = %out.node(id).uid(), filter = %filter, "set choice filter");
        if let Some(question) = out.question_mut(id) {
            question.choice_filter = Some(filter);
        }
        filtered += 1;
    }

    info!(filtered, "set choice filters");
    out
}
