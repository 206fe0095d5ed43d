//! Merge two stratum trees under a synthetic discriminating split.

use std::collections::BTreeMap;

use tracing::info;

use crate::repr::{ModelNode, SplitRule, TreeError, TypingTree, normalize_identity};

/// Variable and stratum labels of a two-way merge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Discriminator {
    pub variable: String,
    pub left_label: String,
    pub right_label: String,
}

impl Discriminator {
    pub fn new(
        variable: impl Into<String>,
        left_label: impl Into<String>,
        right_label: impl Into<String>,
    ) -> Self {
        Self {
            variable: variable.into(),
            left_label: left_label.into(),
            right_label: right_label.into(),
        }
    }

    /// Rules sending the left and right strata to their trees.
    pub fn rules(&self) -> (SplitRule, SplitRule) {
        (
            SplitRule::categorical(&self.variable, vec![self.left_label.clone()], Vec::new()),
            SplitRule::categorical(&self.variable, vec![self.right_label.clone()], Vec::new()),
        )
    }
}

/// Build a tree whose root splits on the discriminator, with a deep copy of
/// `left` and `right` as its two children. The inputs are not modified.
pub fn merge_trees(
    left: &TypingTree,
    right: &TypingTree,
    discriminator: &Discriminator,
) -> Result<TypingTree, TreeError> {
    let (left_rule, right_rule) = discriminator.rules();

    let mut merged = TypingTree::new(normalize_identity(&discriminator.variable));
    let root = merged.root();
    merged.node_mut(root).model = Some(ModelNode {
        binary_index: 0,
        predicted_class: String::new(),
        class_counts: BTreeMap::new(),
        class_probabilities: BTreeMap::new(),
        node_probability: 0.0,
        split_variable: discriminator.variable.clone(),
        left_rule: Some(left_rule.clone()),
        right_rule: Some(right_rule.clone()),
        stratum: None,
    });

    let left_root = merged.graft(root, left)?;
    merged.node_mut(left_root).rule = Some(left_rule);
    let right_root = merged.graft(root, right)?;
    merged.node_mut(right_root).rule = Some(right_rule);

    info!(
        variable = %discriminator.variable,
        nodes = merged.len(),
        "merged strata"
    );
    Ok(merged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repr::{Operator, RuleValue};

    fn stratum(root: &str) -> TypingTree {
        let mut tree = TypingTree::new(root);
        let leaf = tree.create_node("segment");
        tree.node_mut(leaf).rule = Some(SplitRule::threshold(root, Operator::Lt, 3.0));
        tree.add_child(tree.root(), leaf).unwrap();
        tree
    }

    #[test]
    fn strata_hang_under_disjoint_rules() {
        let rural = stratum("age");
        let urban = stratum("income");
        let merged = merge_trees(&rural, &urban, &Discriminator::new("location", "rural", "urban"))
            .unwrap();

        let root = merged.root();
        assert_eq!(merged.node(root).name, "location");
        let [left, right] = merged.node(root).children() else {
            panic!("expected two children");
        };
        assert_eq!(merged.node(*left).name, "age");
        assert_eq!(merged.node(*right).name, "income");
        assert_eq!(
            merged.node(*left).rule.as_ref().unwrap().value,
            RuleValue::Levels(vec!["rural".into()])
        );
        assert_eq!(
            merged.node(*right).rule.as_ref().unwrap().value,
            RuleValue::Levels(vec!["urban".into()])
        );
        assert_eq!(merged.len(), 5);

        assert!(rural.node(rural.root()).rule.is_none());
        assert_eq!(rural.len(), 2);
        let model = merged.node(root).model.as_ref().unwrap();
        assert_eq!(model.left_rule.as_ref().unwrap().operator, Operator::In);
    }

    #[test]
    fn merging_a_tree_with_itself_collides() {
        let rural = stratum("age");
        let err = merge_trees(&rural, &rural, &Discriminator::new("location", "a", "b")).unwrap_err();
        assert!(matches!(err, TreeError::DuplicateUid(_)));
    }
}
