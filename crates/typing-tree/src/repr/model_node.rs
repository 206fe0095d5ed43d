//! Model nodes: one split or leaf of the fitted classification tree.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::rule::SplitRule;

/// Split variable sentinel used by rpart for leaves.
pub const LEAF_SENTINEL: &str = "<leaf>";

/// One split or leaf record from the fitted model.
///
/// `binary_index` follows rpart's numbering: the root is `1` and the children
/// of node `i` are `2i` (left) and `2i + 1` (right).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelNode {
    pub binary_index: u32,
    pub predicted_class: String,
    pub class_counts: BTreeMap<String, u64>,
    pub class_probabilities: BTreeMap<String, f64>,
    pub node_probability: f64,
    pub split_variable: String,
    pub left_rule: Option<SplitRule>,
    pub right_rule: Option<SplitRule>,
    /// Sub-population this node belongs to, stamped by the tree builder.
    #[serde(default)]
    pub stratum: Option<String>,
}

impl ModelNode {
    /// A node is a leaf when rpart recorded no split variable for it.
    #[inline]
    pub fn is_leaf(&self) -> bool {
        self.split_variable == LEAF_SENTINEL
    }

    /// Highest class probability at this node.
    pub fn top_probability(&self) -> Option<f64> {
        top_probability(&self.class_probabilities)
    }

    /// True if the split at this node is categorical with levels routed to neither child.
    pub fn has_dead_end(&self) -> bool {
        self.left_rule
            .as_ref()
            .is_some_and(|rule| !rule.excluded.is_empty())
    }
}

/// Parent binary index of `index`: `⌊index / 2⌋`, or `None` for the root.
#[inline]
pub fn parent_index(index: u32) -> Option<u32> {
    if index <= 1 { None } else { Some(index / 2) }
}

/// Whether `index` is the left child of its parent (even indices).
#[inline]
pub fn is_left_child(index: u32) -> bool {
    index % 2 == 0
}

/// Highest probability in a class distribution.
pub fn top_probability(probabilities: &BTreeMap<String, f64>) -> Option<f64> {
    probabilities.values().copied().reduce(f64::max)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn binary_index_arithmetic() {
        assert_eq!(parent_index(1), None);
        assert_eq!(parent_index(2), Some(1));
        assert_eq!(parent_index(3), Some(1));
        assert_eq!(parent_index(7), Some(3));
        assert!(is_left_child(6));
        assert!(!is_left_child(7));
    }

    #[test]
    fn top_probability_of_distribution() {
        let probs: BTreeMap<String, f64> =
            [("a".to_string(), 0.2), ("b".to_string(), 0.7), ("c".to_string(), 0.1)].into();
        assert_eq!(top_probability(&probs), Some(0.7));
        assert_eq!(top_probability(&BTreeMap::new()), None);
    }
}
