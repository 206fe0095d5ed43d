//! Attach form questions to tree nodes.

use tracing::info;

use crate::Result;
use crate::config::TypingConfig;
use crate::repr::{Question, SEGMENT, TypingTree};

/// Give every node without a question its form question.
///
/// Leaves named `segment` get a `calculate` storing the (renamed) predicted
/// class; every other node gets the question configured for its name.
pub fn attach_questions(tree: &TypingTree, config: &TypingConfig) -> Result<TypingTree> {
    let mut out = tree.clone();
    let mut attached = 0usize;

    for id in out.preorder() {
        let node = out.node(id);
        if node.question.is_some() {
            continue;
        }

        let question = match &node.model {
            Some(model) if node.name == SEGMENT && node.is_leaf() => {
                let segment = config.segment_name(model.stratum.as_deref(), &model.predicted_class);
                Question::segment(node.uid(), &segment)
            }
            _ => config.build_question(&node.name, node.uid())?,
        };
        out.node_mut(id).question = Some(question);
        attached += 1;
    }

    info!(attached, nodes = out.len(), "attached questions");
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::passes::fixtures::{education_config, education_tree};
    use crate::repr::QuestionKind;

    #[test]
    fn split_and_leaf_questions() {
        let (tree, [root, x, y]) = education_tree();
        let mut config = education_config(QuestionKind::SelectOne);
        config
            .segments
            .insert("rural".into(), [("X".to_string(), "Farmers".to_string())].into());

        let out = attach_questions(&tree, &config).unwrap();

        let q = out.question(root).unwrap();
        assert_eq!(q.name, out.node(root).uid());
        assert_eq!(q.kind, QuestionKind::SelectOne);
        assert_eq!(q.choices.as_ref().unwrap().len(), 3);

        let qx = out.question(x).unwrap();
        assert_eq!(qx.kind, QuestionKind::Calculate);
        assert_eq!(qx.calculation.as_deref(), Some("'Farmers'"));
        assert_eq!(out.question(y).unwrap().calculation.as_deref(), Some("'Y'"));

        assert!(tree.question(root).is_none());
    }

    #[test]
    fn missing_question_config_fails() {
        let (tree, _) = education_tree();
        let config = crate::config::TypingConfig::default();
        assert!(matches!(
            attach_questions(&tree, &config),
            Err(crate::Error::Config(_))
        ));
    }
}
