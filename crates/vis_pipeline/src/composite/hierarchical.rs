//! Leveled node tree with symmetric parent/child links.
//!
//! ```text
//! level 0:   [ n0 ]
//!             │   ╲
//! level 1:   [ n0 ][ n1 ][ -- ]      "--" = no node (slot empty)
//!             │
//! level 2:   [ n0 (no dataset) ]
//! ```
//!
//! Links are stored as `(level, index)` pairs on both ends, so they never own
//! the node they point to.

use super::amr_box::AmrBox;
use super::iterator::CompositeIter;
use super::DataNode;

/// Position of a node in the tree.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeRef {
  pub level: usize,
  pub index: usize,
}

impl NodeRef {
  pub const fn new(level: usize, index: usize) -> Self {
    Self { level, index }
  }
}

/// One node slot's contents.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct HierarchicalNode {
  /// Dataset carried by the node. A node may exist without one.
  pub dataset: Option<DataNode>,
  /// Box annotation for AMR leaves.
  pub amr_box: Option<AmrBox>,
  parents: Vec<NodeRef>,
  children: Vec<NodeRef>,
}

impl HierarchicalNode {
  pub fn with_dataset(dataset: impl Into<DataNode>) -> Self {
    Self {
      dataset: Some(dataset.into()),
      ..Self::default()
    }
  }

  pub fn parents(&self) -> &[NodeRef] {
    &self.parents
  }

  pub fn children(&self) -> &[NodeRef] {
    &self.children
  }
}

/// Levels of node slots.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct HierarchicalDataSet {
  pub(crate) levels: Vec<Vec<Option<HierarchicalNode>>>,
}

impl HierarchicalDataSet {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn number_of_levels(&self) -> usize {
    self.levels.len()
  }

  /// Resize the level list. Nodes on removed levels are disconnected from
  /// the survivors first.
  pub fn set_number_of_levels(&mut self, count: usize) {
    if count < self.levels.len() {
      for level in count..self.levels.len() {
        for index in 0..self.levels[level].len() {
          self.disconnect_all(NodeRef::new(level, index));
        }
      }
    }
    self.levels.resize_with(count, Vec::new);
  }

  pub fn number_of_data_sets(&self, level: usize) -> usize {
    self.levels.get(level).map_or(0, Vec::len)
  }

  /// Resize one level, growing the level list if needed. Existing nodes are
  /// kept; nodes in the removed tail are disconnected and dropped.
  pub fn set_number_of_data_sets(&mut self, level: usize, count: usize) {
    if level >= self.levels.len() {
      self.set_number_of_levels(level + 1);
    }
    let current = self.levels[level].len();
    for index in count..current {
      self.disconnect_all(NodeRef::new(level, index));
    }
    self.levels[level].resize_with(count, || None);
  }

  /// A node exists in the slot (it may still have no dataset).
  pub fn is_node_present(&self, at: NodeRef) -> bool {
    self.node(at).is_some()
  }

  pub fn node(&self, at: NodeRef) -> Option<&HierarchicalNode> {
    self.levels.get(at.level)?.get(at.index)?.as_ref()
  }

  pub fn node_mut(&mut self, at: NodeRef) -> Option<&mut HierarchicalNode> {
    self.levels.get_mut(at.level)?.get_mut(at.index)?.as_mut()
  }

  /// Create an empty node in the slot, growing as needed. An existing node
  /// is disconnected and reset.
  pub fn init_node(&mut self, at: NodeRef) -> &mut HierarchicalNode {
    if at.index >= self.number_of_data_sets(at.level) {
      self.set_number_of_data_sets(at.level, at.index + 1);
    }
    self.disconnect_all(at);
    let slot = &mut self.levels[at.level][at.index];
    slot.insert(HierarchicalNode::default())
  }

  /// Put `dataset` on the node at `at`, creating the node if needed.
  /// Links of an existing node are kept.
  pub fn set_data_set(&mut self, at: NodeRef, dataset: impl Into<DataNode>) {
    let dataset = dataset.into();
    match self.node_mut(at) {
      Some(node) => node.dataset = Some(dataset),
      None => self.init_node(at).dataset = Some(dataset),
    }
  }

  pub fn data_set(&self, at: NodeRef) -> Option<&DataNode> {
    self.node(at)?.dataset.as_ref()
  }

  /// Drop the node at `at` after disconnecting it.
  pub fn remove_node(&mut self, at: NodeRef) -> Option<HierarchicalNode> {
    self.disconnect_all(at);
    self.levels.get_mut(at.level)?.get_mut(at.index)?.take()
  }

  /// Link `child` under `parent` on both ends. Both nodes must exist.
  /// Returns false when either node is missing.
  pub fn connect_to_parent(&mut self, child: NodeRef, parent: NodeRef) -> bool {
    if child == parent || !self.is_node_present(child) || !self.is_node_present(parent) {
      return false;
    }
    if let Some(node) = self.node_mut(child) {
      if !node.parents.contains(&parent) {
        node.parents.push(parent);
      }
    }
    if let Some(node) = self.node_mut(parent) {
      if !node.children.contains(&child) {
        node.children.push(child);
      }
    }
    true
  }

  /// Remove every link touching `at`, on both ends.
  pub fn disconnect_all(&mut self, at: NodeRef) {
    let Some(node) = self.node_mut(at) else {
      return;
    };
    let parents = std::mem::take(&mut node.parents);
    let children = std::mem::take(&mut node.children);

    for parent in parents {
      if let Some(p) = self.node_mut(parent) {
        p.children.retain(|&c| c != at);
      }
    }
    for child in children {
      if let Some(c) = self.node_mut(child) {
        c.parents.retain(|&p| p != at);
      }
    }
  }

  /// Nodes that carry a dataset, level by level then by index.
  pub fn iter(&self) -> CompositeIter<'_> {
    CompositeIter::levels(&self.levels)
  }

  pub fn clear(&mut self) {
    self.levels.clear();
  }
}
