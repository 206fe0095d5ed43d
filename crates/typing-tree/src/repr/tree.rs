//! Arena-backed typing tree.
//!
//! Nodes live in a flat arena and are addressed by [`NodeId`]. Child lists own
//! the structure; the parent link is a lookup-only back-reference that is kept
//! in sync by every structural operation. Removed nodes stay in the arena,
//! detached, so ids and uids are never reused.
//!
//! Cloning a [`TypingTree`] is a deep copy; rewrite passes rely on this to
//! leave their input untouched.

use std::collections::{BTreeMap, BTreeSet};

use super::NodeId;
use super::model_node::ModelNode;
use super::question::Question;
use super::rule::SplitRule;
use super::uid::generate_uid;

/// Errors raised by structural tree operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TreeError {
    #[error("node {0} does not exist in this tree")]
    UnknownNode(NodeId),
    #[error("node {node} is already attached to a tree")]
    NotDetached { node: NodeId },
    #[error("attaching node {child} under {parent} would create a cycle")]
    Cycle { parent: NodeId, child: NodeId },
    #[error("cannot remove the root node: it has {children} children")]
    RemoveRoot { children: usize },
    #[error("uid '{0}' is already used in this tree")]
    DuplicateUid(String),
}

// =============================================================================
// TreeNode
// =============================================================================

/// A node of the typing tree.
#[derive(Debug, Clone)]
pub struct TreeNode {
    /// Logical identity (configuration key), e.g. `ed_lev3` or `segment`.
    pub name: String,
    uid: String,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    /// Model split or leaf this node was built from.
    pub model: Option<ModelNode>,
    /// Rule on the edge from the parent to this node.
    pub rule: Option<SplitRule>,
    pub question: Option<Question>,
    pub class_probabilities: Option<BTreeMap<String, f64>>,
}

impl TreeNode {
    /// Unique identifier, used as the XLSForm question name.
    #[inline]
    pub fn uid(&self) -> &str {
        &self.uid
    }

    #[inline]
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    #[inline]
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    #[inline]
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

// =============================================================================
// TypingTree
// =============================================================================

/// Mutable typing tree.
#[derive(Debug, Clone)]
pub struct TypingTree {
    nodes: Vec<TreeNode>,
    root: NodeId,
    issued: BTreeSet<String>,
}

impl TypingTree {
    /// Create a tree containing a single root node.
    pub fn new(root_name: impl Into<String>) -> Self {
        let mut tree = Self {
            nodes: Vec::new(),
            root: 0,
            issued: BTreeSet::new(),
        };
        tree.root = tree.create_node(root_name);
        tree
    }

    /// Create a detached node. Attach it with [`add_child`](Self::add_child),
    /// [`insert_before`](Self::insert_before) or [`insert_after`](Self::insert_after).
    pub fn create_node(&mut self, name: impl Into<String>) -> NodeId {
        let name = name.into();
        let uid = self.issue_uid(&name);
        let id = self.nodes.len() as NodeId;
        self.nodes.push(TreeNode {
            name,
            uid,
            parent: None,
            children: Vec::new(),
            model: None,
            rule: None,
            question: None,
            class_probabilities: None,
        });
        id
    }

    fn issue_uid(&mut self, name: &str) -> String {
        let mut rng = rand::thread_rng();
        loop {
            let uid = generate_uid(name, &mut rng);
            if self.issued.insert(uid.clone()) {
                return uid;
            }
        }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    #[inline]
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Get a node.
    ///
    /// # Panics
    ///
    /// Panics if `id` was not issued by this tree.
    #[inline]
    pub fn node(&self, id: NodeId) -> &TreeNode {
        &self.nodes[id as usize]
    }

    /// Get a node mutably.
    ///
    /// # Panics
    ///
    /// Panics if `id` was not issued by this tree.
    #[inline]
    pub fn node_mut(&mut self, id: NodeId) -> &mut TreeNode {
        &mut self.nodes[id as usize]
    }

    #[inline]
    pub fn get(&self, id: NodeId) -> Option<&TreeNode> {
        self.nodes.get(id as usize)
    }

    #[inline]
    pub fn question(&self, id: NodeId) -> Option<&Question> {
        self.node(id).question.as_ref()
    }

    #[inline]
    pub fn question_mut(&mut self, id: NodeId) -> Option<&mut Question> {
        self.node_mut(id).question.as_mut()
    }

    #[inline]
    pub fn is_root(&self, id: NodeId) -> bool {
        id == self.root
    }

    #[inline]
    pub fn is_leaf(&self, id: NodeId) -> bool {
        self.node(id).is_leaf()
    }

    /// Number of nodes reachable from the root.
    pub fn len(&self) -> usize {
        self.preorder().len()
    }

    /// A tree always has a root.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Position of a node in its parent's child list.
    pub fn child_index(&self, id: NodeId) -> Option<usize> {
        let parent = self.node(id).parent?;
        self.node(parent).children.iter().position(|&c| c == id)
    }

    /// First node in preorder with the given name.
    pub fn find(&self, name: &str) -> Option<NodeId> {
        self.preorder()
            .into_iter()
            .find(|&id| self.node(id).name == name)
    }

    /// Nearest ancestor (excluding the node itself) with the given name.
    pub fn nearest_ancestor_named(&self, id: NodeId, name: &str) -> Option<NodeId> {
        self.parents(id)
            .into_iter()
            .find(|&p| self.node(p).name == name)
    }

    fn check(&self, id: NodeId) -> Result<(), TreeError> {
        if (id as usize) < self.nodes.len() {
            Ok(())
        } else {
            Err(TreeError::UnknownNode(id))
        }
    }

    fn is_detached(&self, id: NodeId) -> bool {
        let node = self.node(id);
        node.parent.is_none() && id != self.root
    }

    // =========================================================================
    // Traversal
    // =========================================================================

    /// Ancestors from the immediate parent up to the root.
    pub fn parents(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut cur = self.node(id).parent;
        while let Some(p) = cur {
            out.push(p);
            cur = self.node(p).parent;
        }
        out
    }

    /// Root-first traversal; children in insertion order.
    pub fn preorder(&self) -> Vec<NodeId> {
        self.preorder_from(self.root)
    }

    /// Root-first traversal of the subtree rooted at `start`.
    pub fn preorder_from(&self, start: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![start];
        while let Some(id) = stack.pop() {
            out.push(id);
            stack.extend(self.node(id).children.iter().rev().copied());
        }
        out
    }

    /// Children-first traversal; children in insertion order.
    pub fn postorder(&self) -> Vec<NodeId> {
        let mut out = Vec::new();
        // (node, children already pushed)
        let mut stack = vec![(self.root, false)];
        while let Some((id, expanded)) = stack.pop() {
            if expanded {
                out.push(id);
            } else {
                stack.push((id, true));
                stack.extend(self.node(id).children.iter().rev().map(|&c| (c, false)));
            }
        }
        out
    }

    // =========================================================================
    // Mutation
    // =========================================================================

    /// Append `child` to `parent`'s children.
    pub fn add_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), TreeError> {
        self.check(parent)?;
        self.check(child)?;
        if !self.is_detached(child) {
            return Err(TreeError::NotDetached { node: child });
        }
        if parent == child || self.parents(parent).contains(&child) {
            return Err(TreeError::Cycle { parent, child });
        }
        self.node_mut(parent).children.push(child);
        self.node_mut(child).parent = Some(parent);
        Ok(())
    }

    /// Splice `new` directly above `target`.
    ///
    /// `new` takes `target`'s position among its siblings (or becomes the
    /// root) and adopts `target` as its only child.
    pub fn insert_before(&mut self, target: NodeId, new: NodeId) -> Result<(), TreeError> {
        self.check(target)?;
        self.check(new)?;
        self.check_fresh(new)?;

        let parent = self.node(target).parent;
        match parent {
            Some(parent) => {
                let pos = self
                    .child_index(target)
                    .ok_or(TreeError::UnknownNode(target))?;
                self.node_mut(parent).children[pos] = new;
                self.node_mut(new).parent = Some(parent);
            }
            None => {
                if target != self.root {
                    return Err(TreeError::UnknownNode(target));
                }
                self.root = new;
            }
        }
        self.node_mut(new).children = vec![target];
        self.node_mut(target).parent = Some(new);
        Ok(())
    }

    /// Splice `new` directly below `target`.
    ///
    /// `new` adopts all of `target`'s children and becomes its only child.
    pub fn insert_after(&mut self, target: NodeId, new: NodeId) -> Result<(), TreeError> {
        self.check(target)?;
        self.check(new)?;
        self.check_fresh(new)?;
        if self.is_detached(target) {
            return Err(TreeError::UnknownNode(target));
        }

        let adopted = std::mem::replace(&mut self.node_mut(target).children, vec![new]);
        for &child in &adopted {
            self.node_mut(child).parent = Some(new);
        }
        let new_node = self.node_mut(new);
        new_node.children = adopted;
        new_node.parent = Some(target);
        Ok(())
    }

    fn check_fresh(&self, id: NodeId) -> Result<(), TreeError> {
        if self.is_detached(id) && self.node(id).children.is_empty() {
            Ok(())
        } else {
            Err(TreeError::NotDetached { node: id })
        }
    }

    /// Detach a node, promoting its children into its former position.
    ///
    /// The root can only be removed when it has exactly one child, which then
    /// becomes the new root.
    pub fn remove(&mut self, id: NodeId) -> Result<(), TreeError> {
        self.check(id)?;
        let children = std::mem::take(&mut self.node_mut(id).children);

        let parent = self.node(id).parent;
        match parent {
            Some(parent) => {
                let pos = self.child_index(id).ok_or(TreeError::UnknownNode(id))?;
                for &child in &children {
                    self.node_mut(child).parent = Some(parent);
                }
                self.node_mut(parent).children.splice(pos..=pos, children);
            }
            None if id == self.root => {
                if children.len() != 1 {
                    let n = children.len();
                    self.node_mut(id).children = children;
                    return Err(TreeError::RemoveRoot { children: n });
                }
                let new_root = children[0];
                self.node_mut(new_root).parent = None;
                self.root = new_root;
            }
            None => {
                // Already detached: only its own subtree is released.
                for &child in &children {
                    self.node_mut(child).parent = None;
                }
            }
        }
        self.node_mut(id).parent = None;
        Ok(())
    }

    /// Deep-copy `other` (from its root) and attach the copy under `parent`.
    ///
    /// Uids are kept so that expressions inside `other` remain valid; a uid
    /// already issued by this tree is rejected before anything is copied.
    /// Returns the id of the copied root.
    pub fn graft(&mut self, parent: NodeId, other: &TypingTree) -> Result<NodeId, TreeError> {
        self.check(parent)?;
        let order = other.preorder();

        for &id in &order {
            let uid = &other.node(id).uid;
            if self.issued.contains(uid) {
                return Err(TreeError::DuplicateUid(uid.clone()));
            }
        }

        let offset = self.nodes.len() as NodeId;
        let mapping: BTreeMap<NodeId, NodeId> = order
            .iter()
            .enumerate()
            .map(|(i, &id)| (id, offset + i as NodeId))
            .collect();

        for &id in &order {
            let src = other.node(id);
            let mut copy = src.clone();
            copy.parent = src.parent.map(|p| mapping[&p]);
            copy.children = src.children.iter().map(|c| mapping[c]).collect();
            self.issued.insert(copy.uid.clone());
            self.nodes.push(copy);
        }

        let new_root = mapping[&other.root];
        self.node_mut(new_root).parent = Some(parent);
        self.node_mut(parent).children.push(new_root);
        Ok(new_root)
    }
}
