//! Tree-to-tree rewrite passes.
//!
//! Every pass takes the tree by reference and returns a rewritten copy; the
//! input is never modified. Passes walk a preorder snapshot taken before
//! they start mutating, so nodes inserted by a pass are not revisited by it.
//!
//! The order used by the pipeline:
//!
//! 1. [`attach_questions`]
//! 2. [`derive_conditions`]
//! 3. [`apply_options`]
//! 4. [`set_choice_filters`]
//! 5. [`skip_duplicate_questions`]
//! 6. [`resolve_dead_ends`]
//! 7. [`add_segment_notes`]
//! 8. [`enforce_relevance`]
//! 9. [`mark_required`]

mod choice_filter;
mod conditions;
mod dead_ends;
mod duplicates;
mod enforce;
mod notes;
mod options;
mod questions;
mod required;

pub use choice_filter::{choice_filter, set_choice_filters};
pub use conditions::derive_conditions;
pub use dead_ends::resolve_dead_ends;
pub use duplicates::skip_duplicate_questions;
pub use enforce::enforce_relevance;
pub use notes::{add_segment_notes, segment_note_label};
pub use options::apply_options;
pub use questions::attach_questions;
pub use required::mark_required;

use crate::relevance::RelevanceError;
use crate::repr::{NodeId, Question, TypingTree};

fn missing_question(tree: &TypingTree, id: NodeId) -> RelevanceError {
    RelevanceError::MissingQuestion {
        node: tree.node(id).uid().to_string(),
    }
}

/// Question of `id`, or an error naming the node.
pub(crate) fn question_of(tree: &TypingTree, id: NodeId) -> Result<&Question, RelevanceError> {
    tree.question(id).ok_or_else(|| missing_question(tree, id))
}

pub(crate) fn question_of_mut(
    tree: &mut TypingTree,
    id: NodeId,
) -> Result<&mut Question, RelevanceError> {
    let uid = tree.node(id).uid().to_string();
    tree.question_mut(id)
        .ok_or(RelevanceError::MissingQuestion { node: uid })
}
