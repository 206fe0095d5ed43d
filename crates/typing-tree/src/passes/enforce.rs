//! Compose each node's relevance from its whole ancestor chain.
//!
//! A node's own condition only says which branch of its rule parent leads to
//! it. When respondents go back and change an answer, every ancestor's
//! condition must hold as well, so conditions are accumulated top-down.

use tracing::info;

use crate::Result;
use crate::relevance::mentions_uid;
use crate::repr::{NodeId, QuestionKind, TypingTree, extend_unique};

use super::{question_of, question_of_mut};

/// Drop conjuncts mentioning a hidden ancestor, including those of nodes
/// added after the options pass ran.
fn strip_hidden_ancestors(tree: &mut TypingTree, order: &[NodeId]) -> Result<()> {
    for &id in order {
        let mut hidden = Vec::new();
        for ancestor in tree.parents(id) {
            if question_of(tree, ancestor)?.is_hidden() {
                hidden.push(tree.node(ancestor).uid().to_string());
            }
        }
        if hidden.is_empty() {
            continue;
        }
        question_of_mut(tree, id)?
            .conditions
            .retain(|c| !hidden.iter().any(|uid| mentions_uid(c, uid)));
    }
    Ok(())
}

/// Accumulate ancestor conditions into every node.
///
/// 0. Conjuncts referencing a hidden ancestor are dropped.
/// 1. Nodes without conditions inherit their parent's.
/// 2. Each non-root node requires its parent to be answered (`${parent} != ''`),
///    unless the parent is a `select_multiple` or hidden, and gains the
///    conditions of every ancestor with a non-empty relevance.
///
/// Conditions stay in first-occurrence order without duplicates. Hide
/// conditions are never copied to descendants.
pub fn enforce_relevance(tree: &TypingTree) -> Result<TypingTree> {
    let mut out = tree.clone();
    let order = out.preorder();
    strip_hidden_ancestors(&mut out, &order)?;

    for &id in &order {
        let Some(parent) = out.node(id).parent() else {
            continue;
        };
        if question_of(&out, id)?.conditions.is_empty() {
            let inherited = question_of(&out, parent)?.conditions.clone();
            question_of_mut(&mut out, id)?.conditions = inherited;
        }
    }

    for &id in &order {
        let Some(parent) = out.node(id).parent() else {
            continue;
        };

        let mut conditions = question_of(&out, id)?.conditions.clone();

        let parent_question = question_of(&out, parent)?;
        if parent_question.kind != QuestionKind::SelectMultiple && !parent_question.is_hidden() {
            extend_unique(&mut conditions, [format!("${{{}}} != ''", parent_question.name)]);
        }

        for ancestor in out.parents(id) {
            let question = question_of(&out, ancestor)?;
            if question.relevant().is_some() {
                extend_unique(&mut conditions, question.conditions.iter().cloned());
            }
        }

        let mut deduped = Vec::with_capacity(conditions.len());
        extend_unique(&mut deduped, conditions);
        question_of_mut(&mut out, id)?.conditions = deduped;
    }

    info!(nodes = order.len(), "enforced relevance");
    Ok(out)
}
