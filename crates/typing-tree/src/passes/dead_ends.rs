//! Close dead ends left by levels excluded at a categorical split.
//!
//! rpart routes a level that had no observations at a node to neither child.
//! A respondent giving that answer would reach no segment; this pass adds a
//! leaf for those answers assigning the node's own predicted class.
//!
//! Select questions with a choice filter are exempt: the filter already
//! removes the excluded levels from the offered choices, so they cannot be
//! answered.

use tracing::{debug, info};

use crate::Result;
use crate::config::TypingConfig;
use crate::relevance::rule_relevance;
use crate::repr::{
    LEAF_SENTINEL, NodeId, Question, SEGMENT, SplitRule, TypingTree, normalize_identity,
};

/// Rule reaching the dead-end leaf of `id`, if the node has a dead end.
fn dead_end_rule(tree: &TypingTree, id: NodeId) -> Option<SplitRule> {
    let node = tree.node(id);
    let model = node.model.as_ref().filter(|m| !m.is_leaf())?;
    if normalize_identity(&model.split_variable) != node.name {
        return None;
    }
    if !model.has_dead_end() || node.question.as_ref()?.choice_filter.is_some() {
        return None;
    }
    Some(SplitRule::categorical(
        model.split_variable.clone(),
        model.left_rule.as_ref()?.excluded.clone(),
        Vec::new(),
    ))
}

/// Append a segment leaf under every split node whose excluded levels are
/// still answerable.
pub fn resolve_dead_ends(tree: &TypingTree, config: &TypingConfig) -> Result<TypingTree> {
    let mut out = tree.clone();
    let mut resolved = 0usize;

    for id in out.preorder() {
        let Some(rule) = dead_end_rule(&out, id) else {
            continue;
        };
        let Some(mut model) = out.node(id).model.clone() else {
            continue;
        };
        model.split_variable = LEAF_SENTINEL.to_string();
        model.left_rule = None;
        model.right_rule = None;

        let leaf = out.create_node(SEGMENT);
        out.add_child(id, leaf)?;
        let relevance = rule_relevance(&out, leaf, &rule)?;

        let segment = config.segment_name(model.stratum.as_deref(), &model.predicted_class);
        let mut question = Question::segment(out.node(leaf).uid(), &segment);
        question.conditions = vec![relevance.expression];
        question.choices_from_parent = relevance.choices_from_parent;

        debug!(node = %out.node(id).uid(), segment = %segment, "resolved dead end");
        let node = out.node_mut(leaf);
        node.class_probabilities = Some(model.class_probabilities.clone());
        node.model = Some(model);
        node.rule = Some(rule);
        node.question = Some(question);
        resolved += 1;
    }

    info!(resolved, "resolved dead ends");
    Ok(out)
}
