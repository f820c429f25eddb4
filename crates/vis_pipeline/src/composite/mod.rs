//! Composite datasets: collections of leaf datasets that flow through the
//! pipeline as a single data object.
//!
//! ```text
//! CompositeDataSet
//! ├── MultiBlock        [ block0 | block1 | -- | block3 ]   insertion order
//! ├── Hierarchical      level 0: [n0]                       level, then index
//! │                     level 1: [n0][n1]
//! └── HierarchicalBox   same tree, leaves are images with an AmrBox
//! ```
//!
//! Every child is a [`DataNode`]: either a leaf [`DataSet`] or another
//! composite, so nesting is closed over one enum.

pub mod amr_box;
pub mod hierarchical;
pub mod hierarchical_box;
pub mod iterator;
pub mod multi_block;

pub use amr_box::AmrBox;
pub use hierarchical::{HierarchicalDataSet, HierarchicalNode, NodeRef};
pub use hierarchical_box::HierarchicalBoxDataSet;
pub use iterator::{CompositeIter, CompositeVisitor, Slot, SlotPath, VisitCommand};
pub use multi_block::MultiBlockDataSet;

use crate::data::DataSet;

/// A child of a composite: a leaf or a nested composite.
#[derive(Clone, Debug, PartialEq)]
pub enum DataNode {
  Leaf(DataSet),
  Composite(Box<CompositeDataSet>),
}

impl DataNode {
  pub fn as_leaf(&self) -> Option<&DataSet> {
    match self {
      DataNode::Leaf(dataset) => Some(dataset),
      DataNode::Composite(_) => None,
    }
  }

  pub fn as_leaf_mut(&mut self) -> Option<&mut DataSet> {
    match self {
      DataNode::Leaf(dataset) => Some(dataset),
      DataNode::Composite(_) => None,
    }
  }

  pub fn as_composite(&self) -> Option<&CompositeDataSet> {
    match self {
      DataNode::Composite(inner) => Some(&**inner),
      DataNode::Leaf(_) => None,
    }
  }
}

impl From<DataSet> for DataNode {
  fn from(dataset: DataSet) -> Self {
    DataNode::Leaf(dataset)
  }
}

impl From<CompositeDataSet> for DataNode {
  fn from(composite: CompositeDataSet) -> Self {
    DataNode::Composite(Box::new(composite))
  }
}

/// Any composite container.
#[derive(Clone, Debug, PartialEq)]
pub enum CompositeDataSet {
  MultiBlock(MultiBlockDataSet),
  Hierarchical(HierarchicalDataSet),
  HierarchicalBox(HierarchicalBoxDataSet),
}

impl CompositeDataSet {
  /// Present children of this container, in traversal order.
  pub fn iter(&self) -> CompositeIter<'_> {
    match self {
      CompositeDataSet::MultiBlock(mb) => mb.iter(),
      CompositeDataSet::Hierarchical(h) => h.iter(),
      CompositeDataSet::HierarchicalBox(amr) => amr.iter(),
    }
  }

  /// Run `command` on every leaf, recursing into nested composites.
  pub fn visit(&self, command: impl VisitCommand) {
    self.accept(command);
  }

  /// Like [`visit`](Self::visit), handing the command back so stateful
  /// commands can report what they gathered.
  pub fn accept<C: VisitCommand>(&self, command: C) -> C {
    let mut visitor = CompositeVisitor::new(command);
    visitor.execute(self);
    visitor.into_command()
  }

  /// Mutable leaf traversal, same order as [`visit`](Self::visit).
  pub fn visit_mut(&mut self, mut f: impl FnMut(&[Slot], &mut DataSet)) {
    let mut path = SlotPath::new();
    iterator::visit_leaves_mut(self, &mut path, &mut f);
  }

  /// Leaves reachable from this container.
  pub fn number_of_leaves(&self) -> usize {
    let mut count = 0;
    self.visit(|_: &[Slot], _: &DataSet| count += 1);
    count
  }
}

impl From<MultiBlockDataSet> for CompositeDataSet {
  fn from(mb: MultiBlockDataSet) -> Self {
    CompositeDataSet::MultiBlock(mb)
  }
}

impl From<HierarchicalDataSet> for CompositeDataSet {
  fn from(h: HierarchicalDataSet) -> Self {
    CompositeDataSet::Hierarchical(h)
  }
}

impl From<HierarchicalBoxDataSet> for CompositeDataSet {
  fn from(amr: HierarchicalBoxDataSet) -> Self {
    CompositeDataSet::HierarchicalBox(amr)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::data::PointSet;

  fn points(n: usize) -> DataSet {
    let mut set = PointSet::new();
    for i in 0..n {
      set.push(glam::DVec3::ZERO, i as f64);
    }
    DataSet::Points(set)
  }

  /// Nested tree:
  /// mb[0] = leaf(1)
  /// mb[1] = hierarchical { (0,0) = leaf(2), (1,0) = leaf(3) }
  /// mb[2] = --
  /// mb[3] = leaf(4)
  fn nested() -> CompositeDataSet {
    let mut h = HierarchicalDataSet::new();
    h.set_data_set(NodeRef::new(1, 0), points(3));
    h.set_data_set(NodeRef::new(0, 0), points(2));

    let mut mb = MultiBlockDataSet::new();
    mb.set_block(0, points(1));
    mb.set_block(1, CompositeDataSet::from(h));
    mb.set_block(3, points(4));
    mb.into()
  }

  #[test]
  fn test_visitor_reaches_every_leaf_in_order() {
    let mut seen = Vec::new();
    nested().visit(|path: &[Slot], leaf: &DataSet| {
      seen.push((path.len(), leaf.number_of_points()));
    });
    assert_eq!(seen, vec![(1, 1), (2, 2), (2, 3), (1, 4)]);
  }

  #[test]
  fn test_visitor_paths() {
    let mut paths = Vec::new();
    nested().visit(|path: &[Slot], _: &DataSet| paths.push(path.to_vec()));
    assert_eq!(
      paths[2],
      vec![Slot::Block(1), Slot::Node(NodeRef::new(1, 0))]
    );
    assert_eq!(paths[3], vec![Slot::Block(3)]);
  }

  #[test]
  fn test_visit_mut_touches_every_leaf() {
    let mut tree = nested();
    tree.visit_mut(|_, leaf| {
      if let DataSet::Points(set) = leaf {
        set.push(glam::DVec3::ONE, -1.0);
      }
    });
    let mut sizes = Vec::new();
    tree.visit(|_: &[Slot], leaf: &DataSet| sizes.push(leaf.number_of_points()));
    assert_eq!(sizes, vec![2, 3, 4, 5]);
  }

  struct PointTally {
    leaves: usize,
    points: usize,
  }

  impl VisitCommand for PointTally {
    fn execute(&mut self, _: &[Slot], dataset: &DataSet) {
      self.leaves += 1;
      self.points += dataset.number_of_points();
    }
  }

  #[test]
  fn test_accept_returns_command_state() {
    let tally = nested().accept(PointTally { leaves: 0, points: 0 });
    assert_eq!(tally.leaves, 4);
    assert_eq!(tally.points, 10);
  }

  #[test]
  fn test_number_of_leaves() {
    assert_eq!(nested().number_of_leaves(), 4);
    let empty: CompositeDataSet = MultiBlockDataSet::new().into();
    assert_eq!(empty.number_of_leaves(), 0);
  }

  #[test]
  fn test_one_level_iteration_does_not_recurse() {
    let tree = nested();
    let slots: Vec<Slot> = tree.iter().map(|(slot, _)| slot).collect();
    assert_eq!(slots, vec![Slot::Block(0), Slot::Block(1), Slot::Block(3)]);
  }
}
