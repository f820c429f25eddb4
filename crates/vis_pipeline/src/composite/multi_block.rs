//! Flat, ordered collection of blocks.

use super::iterator::CompositeIter;
use super::DataNode;

/// Ordered sequence of optional blocks; each block is a leaf dataset or a
/// nested composite. Empty slots are kept so indices stay stable.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MultiBlockDataSet {
  pub(crate) blocks: Vec<Option<DataNode>>,
}

impl MultiBlockDataSet {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn number_of_blocks(&self) -> usize {
    self.blocks.len()
  }

  /// Resize, keeping existing blocks and dropping the removed tail.
  pub fn set_number_of_blocks(&mut self, count: usize) {
    self.blocks.resize_with(count, || None);
  }

  /// Store `node` at `index`, growing the sequence when needed.
  pub fn set_block(&mut self, index: usize, node: impl Into<DataNode>) {
    if index >= self.blocks.len() {
      self.set_number_of_blocks(index + 1);
    }
    self.blocks[index] = Some(node.into());
  }

  pub fn push(&mut self, node: impl Into<DataNode>) {
    self.blocks.push(Some(node.into()));
  }

  pub fn block(&self, index: usize) -> Option<&DataNode> {
    self.blocks.get(index).and_then(Option::as_ref)
  }

  pub fn block_mut(&mut self, index: usize) -> Option<&mut DataNode> {
    self.blocks.get_mut(index).and_then(Option::as_mut)
  }

  /// Take a block out, leaving its slot empty.
  pub fn take_block(&mut self, index: usize) -> Option<DataNode> {
    self.blocks.get_mut(index).and_then(Option::take)
  }

  pub fn clear(&mut self) {
    self.blocks.clear();
  }

  /// Present blocks in insertion order.
  pub fn iter(&self) -> CompositeIter<'_> {
    CompositeIter::blocks(&self.blocks)
  }
}
