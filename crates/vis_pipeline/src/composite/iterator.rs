//! Traversal over composite datasets.
//!
//! [`CompositeIter`] is a one-level cursor over a container's present
//! children: insertion order for flat collections, level then index for
//! hierarchical ones. [`VisitCommand`] is applied to every leaf reachable
//! through nested composites, with the path of slots that leads to it.

use smallvec::SmallVec;

use super::hierarchical::{HierarchicalNode, NodeRef};
use super::{CompositeDataSet, DataNode};
use crate::data::DataSet;

/// Where a child sits inside its parent container.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Slot {
  /// Block index in a multi-block collection.
  Block(usize),
  /// Node position in a hierarchical collection.
  Node(NodeRef),
}

/// Path from the outermost composite down to a leaf.
pub type SlotPath = SmallVec<[Slot; 4]>;

// =============================================================================
// CompositeIter
// =============================================================================

enum Cursor<'a> {
  Blocks {
    blocks: &'a [Option<DataNode>],
    next: usize,
  },
  Levels {
    levels: &'a [Vec<Option<HierarchicalNode>>],
    level: usize,
    index: usize,
  },
}

/// Cursor over the present children of one composite container.
pub struct CompositeIter<'a> {
  cursor: Cursor<'a>,
}

impl<'a> CompositeIter<'a> {
  pub(crate) fn blocks(blocks: &'a [Option<DataNode>]) -> Self {
    Self {
      cursor: Cursor::Blocks { blocks, next: 0 },
    }
  }

  pub(crate) fn levels(levels: &'a [Vec<Option<HierarchicalNode>>]) -> Self {
    Self {
      cursor: Cursor::Levels {
        levels,
        level: 0,
        index: 0,
      },
    }
  }
}

impl<'a> Iterator for CompositeIter<'a> {
  type Item = (Slot, &'a DataNode);

  fn next(&mut self) -> Option<Self::Item> {
    match &mut self.cursor {
      Cursor::Blocks { blocks, next } => {
        let blocks: &'a [Option<DataNode>] = *blocks;
        while *next < blocks.len() {
          let index = *next;
          *next += 1;
          if let Some(node) = &blocks[index] {
            return Some((Slot::Block(index), node));
          }
        }
        None
      }
      Cursor::Levels {
        levels,
        level,
        index,
      } => {
        let levels: &'a [Vec<Option<HierarchicalNode>>] = *levels;
        while *level < levels.len() {
          let nodes = &levels[*level];
          while *index < nodes.len() {
            let at = NodeRef::new(*level, *index);
            *index += 1;
            if let Some(dataset) = nodes[at.index].as_ref().and_then(|n| n.dataset.as_ref()) {
              return Some((Slot::Node(at), dataset));
            }
          }
          *level += 1;
          *index = 0;
        }
        None
      }
    }
  }
}

// =============================================================================
// Visitor
// =============================================================================

/// Operation applied to every leaf of a composite tree.
pub trait VisitCommand {
  fn execute(&mut self, path: &[Slot], dataset: &DataSet);
}

impl<F> VisitCommand for F
where
  F: FnMut(&[Slot], &DataSet),
{
  fn execute(&mut self, path: &[Slot], dataset: &DataSet) {
    self(path, dataset)
  }
}

/// Depth-first leaf visitor; nested composites are entered in their own
/// traversal order.
pub struct CompositeVisitor<C> {
  command: C,
  path: SlotPath,
}

impl<C: VisitCommand> CompositeVisitor<C> {
  pub fn new(command: C) -> Self {
    Self {
      command,
      path: SlotPath::new(),
    }
  }

  pub fn execute(&mut self, composite: &CompositeDataSet) {
    for (slot, node) in composite.iter() {
      self.path.push(slot);
      match node {
        DataNode::Leaf(dataset) => self.command.execute(&self.path, dataset),
        DataNode::Composite(inner) => self.execute(inner),
      }
      self.path.pop();
    }
  }

  pub fn into_command(self) -> C {
    self.command
  }
}

/// Apply `f` to every leaf mutably, in traversal order.
pub(crate) fn visit_leaves_mut(
  composite: &mut CompositeDataSet,
  path: &mut SlotPath,
  f: &mut dyn FnMut(&[Slot], &mut DataSet),
) {
  match composite {
    CompositeDataSet::MultiBlock(mb) => {
      for (index, block) in mb.blocks.iter_mut().enumerate() {
        if let Some(node) = block {
          path.push(Slot::Block(index));
          visit_node_mut(node, path, f);
          path.pop();
        }
      }
    }
    CompositeDataSet::Hierarchical(h) => visit_levels_mut(&mut h.levels, path, f),
    CompositeDataSet::HierarchicalBox(amr) => visit_levels_mut(&mut amr.tree_mut().levels, path, f),
  }
}

fn visit_levels_mut(
  levels: &mut [Vec<Option<HierarchicalNode>>],
  path: &mut SlotPath,
  f: &mut dyn FnMut(&[Slot], &mut DataSet),
) {
  for (level, nodes) in levels.iter_mut().enumerate() {
    for (index, slot) in nodes.iter_mut().enumerate() {
      if let Some(node) = slot.as_mut().and_then(|n| n.dataset.as_mut()) {
        path.push(Slot::Node(NodeRef::new(level, index)));
        visit_node_mut(node, path, f);
        path.pop();
      }
    }
  }
}

fn visit_node_mut(node: &mut DataNode, path: &mut SlotPath, f: &mut dyn FnMut(&[Slot], &mut DataSet)) {
  match node {
    DataNode::Leaf(dataset) => f(path, dataset),
    DataNode::Composite(inner) => visit_leaves_mut(inner, path, f),
  }
}
