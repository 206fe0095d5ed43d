//! Required-answer flags.

use tracing::info;

use crate::config::Settings;
use crate::repr::TypingTree;

/// Set `required` from each question's kind and attach the configured
/// required message to required questions.
pub fn mark_required(tree: &TypingTree, settings: &Settings) -> TypingTree {
    let mut out = tree.clone();
    let mut required = 0usize;

    for id in out.preorder() {
        let Some(question) = out.question_mut(id) else {
            continue;
        };
        question.required = question.kind.default_required();
        if question.required {
            question.required_message = settings.required_message.clone();
            required += 1;
        }
    }

    info!(required, "marked required questions");
    out
}
