//! Configured structural rewrites: `calculate`, `split` and `hide`.

use tracing::{debug, info};

use crate::Result;
use crate::config::{OptionDirective, TypingConfig};
use crate::relevance::{mentions_uid, resolve_against_ancestors};
use crate::repr::{NodeId, QuestionKind, TypingTree};

use super::question_of_mut;

/// Apply every configured option, in order, to every node asking its source
/// question.
pub fn apply_options(tree: &TypingTree, config: &TypingConfig) -> Result<TypingTree> {
    let mut out = tree.clone();

    for option in &config.options {
        let targets: Vec<NodeId> = out
            .preorder()
            .into_iter()
            .filter(|&id| out.node(id).name == option.src_question())
            .collect();

        for &id in &targets {
            match option {
                OptionDirective::Calculate {
                    dst_question,
                    calculation,
                    ..
                } => insert_upstream(&mut out, config, id, &[dst_question.as_str()], calculation)?,
                OptionDirective::Split {
                    dst_question_a,
                    dst_question_b,
                    calculation,
                    ..
                } => insert_upstream(
                    &mut out,
                    config,
                    id,
                    &[dst_question_a.as_str(), dst_question_b.as_str()],
                    calculation,
                )?,
                OptionDirective::Hide { condition, .. } => hide(&mut out, id, condition)?,
            }
        }
        info!(
            option = option.name(),
            src = option.src_question(),
            applied = targets.len(),
            "applied option"
        );
    }
    Ok(out)
}

/// Insert the `dst` questions, chained, directly above `id`, then turn `id`
/// into a `calculate` computed from them.
///
/// Inserted questions copy the source's conditions and model split; the
/// parent choices leading to the source move to the first inserted question.
fn insert_upstream(
    tree: &mut TypingTree,
    config: &TypingConfig,
    id: NodeId,
    dst: &[&str],
    calculation: &str,
) -> Result<()> {
    let source = question_of_mut(tree, id)?;
    let conditions = source.conditions.clone();
    let mut choices_from_parent = source.choices_from_parent.take();
    let model = tree.node(id).model.clone();

    for &name in dst {
        let new = tree.create_node(name);
        let mut question = config.build_question(name, tree.node(new).uid())?;
        question.conditions = conditions.clone();
        question.choices_from_parent = choices_from_parent.take();
        let node = tree.node_mut(new);
        node.question = Some(question);
        node.model = model.clone();
        tree.insert_before(id, new)?;
        debug!(src = %tree.node(id).name, dst = name, "inserted upstream question");
    }

    let calculation = resolve_against_ancestors(tree, id, calculation)?;
    let source = question_of_mut(tree, id)?;
    source.kind = QuestionKind::Calculate;
    source.calculation = Some(calculation);
    Ok(())
}

/// Add a resolved hide condition to `id` and drop every descendant
/// conjunct that mentions it.
fn hide(tree: &mut TypingTree, id: NodeId, condition: &str) -> Result<()> {
    let condition = resolve_against_ancestors(tree, id, condition)?;
    question_of_mut(tree, id)?.hide_condition = Some(condition);

    let uid = tree.node(id).uid().to_string();
    let descendants = tree.preorder_from(id);
    for &descendant in &descendants[1..] {
        if let Some(question) = tree.question_mut(descendant) {
            question.conditions.retain(|c| !mentions_uid(c, &uid));
        }
    }
    debug!(node = %uid, "hid question");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::passes::fixtures::{education_config, education_tree};
    use crate::passes::{attach_questions, derive_conditions};

    fn prepared(options: Vec<OptionDirective>) -> (TypingTree, TypingConfig, [NodeId; 3]) {
        let (tree, ids) = education_tree();
        let mut config = education_config(QuestionKind::SelectOne);
        config.options = options;
        let tree = attach_questions(&tree, &config).unwrap();
        let tree = derive_conditions(&tree).unwrap();
        (tree, config, ids)
    }

    #[test]
    fn calculate_inserts_question_before_source() {
        let (tree, config, [root, x, _]) = prepared(vec![OptionDirective::Calculate {
            src_question: "ed".into(),
            dst_question: "school".into(),
            calculation: "if(${school} = 'none', 'none', 'secondary')".into(),
        }]);
        let out = apply_options(&tree, &config).unwrap();

        let new_root = out.root();
        assert_ne!(new_root, root);
        assert_eq!(out.node(new_root).name, "school");
        assert_eq!(out.node(new_root).children(), &[root]);

        let src = out.question(root).unwrap();
        assert_eq!(src.kind, QuestionKind::Calculate);
        let school_uid = out.node(new_root).uid();
        assert_eq!(
            src.calculation.as_deref(),
            Some(format!("if(${{{school_uid}}} = 'none', 'none', 'secondary')").as_str())
        );
        assert!(src.choices.is_some());
        assert_eq!(out.question(x).unwrap().conditions, tree.question(x).unwrap().conditions);
        assert_eq!(tree.root(), root);
    }

    #[test]
    fn split_chains_two_questions() {
        let (tree, mut config, [root, ..]) = prepared(Vec::new());
        config.options = vec![OptionDirective::Split {
            src_question: "ed".into(),
            dst_question_a: "age".into(),
            dst_question_b: "school".into(),
            calculation: "${school}".into(),
        }];
        let out = apply_options(&tree, &config).unwrap();

        let order: Vec<&str> = out
            .preorder()
            .into_iter()
            .map(|id| out.node(id).name.as_str())
            .collect();
        assert_eq!(order, ["age", "school", "ed", "segment", "segment"]);
        assert_eq!(out.node(root).parent().map(|p| out.node(p).name.as_str()), Some("school"));
    }

    #[test]
    fn inserted_questions_take_source_conditions() {
        let (mut tree, mut config, [root, x, _]) = prepared(Vec::new());
        tree.question_mut(root).unwrap().conditions = vec!["${consent} = 'yes'".into()];
        tree.question_mut(root).unwrap().choices_from_parent = Some(Vec::new());
        config.options = vec![OptionDirective::Calculate {
            src_question: "ed".into(),
            dst_question: "school".into(),
            calculation: "${school}".into(),
        }];
        let out = apply_options(&tree, &config).unwrap();
        let school = out.root();
        let q = out.question(school).unwrap();
        assert_eq!(q.conditions, ["${consent} = 'yes'"]);
        assert_eq!(q.choices_from_parent, Some(Vec::new()));
        assert_eq!(out.question(root).unwrap().choices_from_parent, None);
        assert!(!out.question(x).unwrap().conditions.is_empty());
    }

    #[test]
    fn hide_sets_condition_and_strips_descendants() {
        let (tree, config, [root, x, y]) = prepared(Vec::new());
        let mut config = config;
        config.options = vec![
            OptionDirective::Calculate {
                src_question: "ed".into(),
                dst_question: "school".into(),
                calculation: "${school}".into(),
            },
            OptionDirective::Hide {
                src_question: "ed".into(),
                condition: "${school} = 'primary'".into(),
            },
        ];
        let out = apply_options(&tree, &config).unwrap();

        let school_uid = out.node(out.root()).uid();
        let ed = out.question(root).unwrap();
        assert_eq!(
            ed.hide_condition.as_deref(),
            Some(format!("${{{school_uid}}} = 'primary'").as_str())
        );
        assert!(out.question(x).unwrap().conditions.is_empty());
        assert!(out.question(y).unwrap().conditions.is_empty());
    }

    #[test]
    fn unresolved_calculation_fails() {
        let (tree, mut config, _) = prepared(Vec::new());
        config.options = vec![OptionDirective::Calculate {
            src_question: "ed".into(),
            dst_question: "school".into(),
            calculation: "${household_size} * 2".into(),
        }];
        assert!(matches!(
            apply_options(&tree, &config),
            Err(crate::Error::Relevance(
                crate::relevance::RelevanceError::UnresolvedVariable { .. }
            ))
        ));
    }
}
