//! Conversion from rpart JSON types to native typing tree types.

use std::collections::BTreeMap;

use tracing::debug;

use crate::repr::{
    ModelNode, NodeId, SEGMENT, TreeError, TypingTree, is_left_child, normalize_identity,
    parent_index,
};

use super::json::{RpartModel, RpartNode};
use super::rules::{ParseError, PartitionTable, split_rules};

/// Errors raised while assembling a tree from model nodes.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BuildError {
    #[error("model has no root node (binary index 1)")]
    MissingRoot,
    #[error("node index {0} is not a binary tree index")]
    InvalidIndex(u32),
    #[error("node {node} references parent {parent}, which is not in the model")]
    MissingParent { node: u32, parent: u32 },
    #[error("node {node} hangs under leaf {parent}")]
    ParentIsLeaf { node: u32, parent: u32 },
    #[error(transparent)]
    Tree(#[from] TreeError),
}

// =============================================================================
// Model nodes
// =============================================================================

/// Decode one frame row into a [`ModelNode`].
///
/// `yval2` holds the predicted class, one count per class, one probability
/// per class and the node probability, in that order.
pub fn parse_node(
    row: &RpartNode,
    ylevels: &[String],
    xlevels: &BTreeMap<String, Vec<String>>,
    table: &PartitionTable,
) -> Result<ModelNode, ParseError> {
    let n_classes = ylevels.len();
    let class_idx = row.yval as usize;
    if row.yval.fract() != 0.0 || class_idx == 0 || class_idx > n_classes {
        return Err(ParseError::InvalidClassIndex {
            node: row.node,
            yval: row.yval,
            n_classes,
        });
    }

    let expected = 2 * n_classes + 2;
    if row.yval2.len() < expected {
        return Err(ParseError::ShortClassVector {
            node: row.node,
            expected,
            actual: row.yval2.len(),
        });
    }

    let class_counts = ylevels
        .iter()
        .enumerate()
        .map(|(i, class)| (class.clone(), row.yval2[i + 1].round() as u64))
        .collect();
    let class_probabilities = ylevels
        .iter()
        .enumerate()
        .map(|(i, class)| (class.clone(), row.yval2[i + 1 + n_classes]))
        .collect();

    let mut node = ModelNode {
        binary_index: row.node,
        predicted_class: ylevels[class_idx - 1].clone(),
        class_counts,
        class_probabilities,
        node_probability: row.yval2[row.yval2.len() - 1],
        split_variable: row.var.clone(),
        left_rule: None,
        right_rule: None,
        stratum: None,
    };

    if !node.is_leaf() {
        let levels = xlevels.get(&row.var).map(Vec::as_slice);
        let (left, right) = split_rules(&row.var, row.ncat, row.index, levels, table)?;
        node.left_rule = Some(left);
        node.right_rule = Some(right);
    }

    Ok(node)
}

impl RpartModel {
    /// The `csplit` matrix as a partition table.
    pub fn partition_table(&self) -> Result<PartitionTable, ParseError> {
        if self.csplit.is_empty() {
            return Ok(PartitionTable::empty());
        }
        PartitionTable::from_rows(&self.csplit)
    }

    /// Decode every frame row, keyed by binary index.
    pub fn to_model_nodes(&self) -> Result<BTreeMap<u32, ModelNode>, ParseError> {
        let table = self.partition_table()?;
        let mut nodes = BTreeMap::new();
        for row in &self.nodes {
            let node = parse_node(row, &self.ylevels, &self.xlevels, &table)?;
            if nodes.insert(node.binary_index, node).is_some() {
                return Err(ParseError::DuplicateNode(row.node));
            }
        }
        Ok(nodes)
    }

    /// Decode the model and build its typing tree for `stratum`.
    pub fn to_typing_tree(&self, stratum: &str) -> crate::Result<TypingTree> {
        let nodes = self.to_model_nodes()?;
        Ok(build_tree(&nodes, stratum)?)
    }
}

// =============================================================================
// Tree construction
// =============================================================================

/// Tree node name for a model node: `segment` for leaves, otherwise the
/// normalized split variable.
pub fn node_name(node: &ModelNode) -> String {
    if node.is_leaf() {
        SEGMENT.to_string()
    } else {
        normalize_identity(&node.split_variable)
    }
}

fn populate(tree: &mut TypingTree, id: NodeId, model: &ModelNode, stratum: &str) {
    let mut model = model.clone();
    model.stratum = Some(stratum.to_string());
    let node = tree.node_mut(id);
    node.class_probabilities = Some(model.class_probabilities.clone());
    node.model = Some(model);
}

/// Build a typing tree from model nodes keyed by binary index.
///
/// The parent of node `i` is `⌊i/2⌋`; even indices are left children and
/// take the parent's left rule, odd indices the right rule. Nodes are
/// attached in ascending index order, so left children precede right ones.
pub fn build_tree(
    nodes: &BTreeMap<u32, ModelNode>,
    stratum: &str,
) -> Result<TypingTree, BuildError> {
    if nodes.contains_key(&0) {
        return Err(BuildError::InvalidIndex(0));
    }
    let root_model = nodes.get(&1).ok_or(BuildError::MissingRoot)?;
    let mut tree = TypingTree::new(node_name(root_model));
    let root = tree.root();
    populate(&mut tree, root, root_model, stratum);

    let mut ids: BTreeMap<u32, NodeId> = BTreeMap::new();
    ids.insert(1, root);

    for (&index, model) in nodes.range(2..) {
        let Some(parent_idx) = parent_index(index) else {
            continue;
        };
        let parent_model = nodes.get(&parent_idx).ok_or(BuildError::MissingParent {
            node: index,
            parent: parent_idx,
        })?;
        let parent_id = *ids.get(&parent_idx).ok_or(BuildError::MissingParent {
            node: index,
            parent: parent_idx,
        })?;

        let rule = if is_left_child(index) {
            parent_model.left_rule.clone()
        } else {
            parent_model.right_rule.clone()
        };
        let rule = rule.ok_or(BuildError::ParentIsLeaf {
            node: index,
            parent: parent_idx,
        })?;

        let id = tree.create_node(node_name(model));
        populate(&mut tree, id, model, stratum);
        tree.node_mut(id).rule = Some(rule);
        tree.add_child(parent_id, id)?;
        ids.insert(index, id);
    }

    debug!(stratum, nodes = tree.len(), "built typing tree");
    Ok(tree)
}
