//! Canonical typing tree representation.
//!
//! - [`SplitRule`]: condition on the edge between a node and its child
//! - [`ModelNode`]: one split or leaf of the fitted model
//! - [`Question`] / [`Choice`]: form metadata attached to nodes
//! - [`TypingTree`]: arena-backed mutable tree all passes operate on

/// Node identifier: an index into the tree's arena.
pub type NodeId = u32;

pub mod model_node;
pub mod question;
pub mod rule;
pub mod tree;
pub mod uid;

pub use model_node::{LEAF_SENTINEL, ModelNode, is_left_child, parent_index, top_probability};
pub use question::{Choice, ModelValue, Question, QuestionKind, Shape, Translations, extend_unique};
pub use rule::{Operator, RuleValue, SplitRule, normalize_identity};
pub use tree::{TreeError, TreeNode, TypingTree};
pub use uid::generate_uid;

/// Name given to every leaf (segment-assignment point).
pub const SEGMENT: &str = "segment";

/// Name given to the note inserted after a segment leaf.
pub const SEGMENT_NOTE: &str = "segment_note";
