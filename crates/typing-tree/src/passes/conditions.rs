//! Per-node conditions from incoming split rules.

use tracing::info;

use crate::Result;
use crate::relevance::node_relevance;
use crate::repr::TypingTree;

use super::question_of_mut;

/// Set each ruled node's conditions to the single condition of its incoming
/// rule, and record the parent choices leading to it.
pub fn derive_conditions(tree: &TypingTree) -> Result<TypingTree> {
    let mut out = tree.clone();
    let mut derived = 0usize;

    for id in out.preorder() {
        let Some(relevance) = node_relevance(&out, id)? else {
            continue;
        };
        let question = question_of_mut(&mut out, id)?;
        question.conditions = vec![relevance.expression];
        question.choices_from_parent = relevance.choices_from_parent;
        derived += 1;
    }

    info!(derived, "derived node conditions");
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::passes::attach_questions;
    use crate::passes::fixtures::{education_config, education_tree};
    use crate::repr::QuestionKind;

    #[test]
    fn leaves_get_choice_conditions() {
        let (tree, [root, x, y]) = education_tree();
        let tree = attach_questions(&tree, &education_config(QuestionKind::SelectOne)).unwrap();
        let out = derive_conditions(&tree).unwrap();

        let uid = out.node(root).uid();
        assert_eq!(
            out.question(x).unwrap().conditions,
            [format!("${{{uid}}} = 'none'")]
        );
        assert_eq!(
            out.question(y).unwrap().conditions,
            [format!("${{{uid}}} = 'secondary'")]
        );
        let from_parent = out.question(y).unwrap().choices_from_parent.as_ref().unwrap();
        assert_eq!(from_parent[0].name, "secondary");
        assert!(out.question(root).unwrap().conditions.is_empty());
    }

    #[test]
    fn node_without_question_fails() {
        let (tree, _) = education_tree();
        assert!(derive_conditions(&tree).is_err());
    }
}
