//! rpart JSON model export support.
//!
//! This module parses the JSON export of a fitted `rpart` classification tree
//! and converts it into a [`TypingTree`](crate::repr::TypingTree).

mod convert;
mod json;
mod rules;

pub use convert::{BuildError, build_tree, node_name, parse_node};
pub use json::*;
pub use rules::{
    CategoricalPartition, ParseError, PartitionCode, PartitionTable, operator_for,
    partition_levels, split_rules,
};
