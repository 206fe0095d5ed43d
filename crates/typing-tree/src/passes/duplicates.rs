//! Elide questions already asked higher up the tree.

use tracing::{debug, info};

use crate::repr::{QuestionKind, SEGMENT, TypingTree};

/// Turn a question whose name was already asked by an ancestor into a
/// `calculate` copying the root-most such ancestor's answer.
///
/// The choice list is dropped from the emitted row, but the choices stay on
/// the question so children can still derive conditions and diagram labels
/// from them. Segments and segment notes are never elided.
pub fn skip_duplicate_questions(tree: &TypingTree) -> TypingTree {
    let mut out = tree.clone();
    let mut skipped = 0usize;

    for id in out.preorder() {
        let node = out.node(id);
        if out.is_root(id) || node.question.is_none() || node.name.starts_with(SEGMENT) {
            continue;
        }

        let Some(first) = out
            .parents(id)
            .into_iter()
            .filter(|&p| out.node(p).name == node.name)
            .filter_map(|p| out.question(p))
            .last()
            .map(|q| q.name.clone())
        else {
            continue;
        };

        debug!(node = %node.uid(), asked_by = %first, "skipped duplicate question");
        if let Some(question) = out.question_mut(id) {
            question.kind = QuestionKind::Calculate;
            question.choice_list = None;
            question.choice_filter = None;
            question.calculation = Some(format!("${{{first}}}"));
        }
        skipped += 1;
    }

    info!(skipped, "skipped duplicate questions");
    out
}
