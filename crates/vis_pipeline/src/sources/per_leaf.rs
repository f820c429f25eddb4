//! Composite-aware filter applying one operation to every leaf.

use tracing::debug;

use crate::composite::Slot;
use crate::data::{Content, DataSet};
use crate::extent::ExtentType;
use crate::pipeline::{Algorithm, ExecuteContext, RequestContext};

/// Operation applied to one leaf; the slot path locates it in the tree.
pub trait LeafOperation: Send {
  fn apply(&mut self, path: &[Slot], leaf: &mut DataSet);
}

impl<F> LeafOperation for F
where
  F: FnMut(&[Slot], &mut DataSet) + Send,
{
  fn apply(&mut self, path: &[Slot], leaf: &mut DataSet) {
    self(path, leaf)
  }
}

/// Copies its input and runs a [`LeafOperation`] on every leaf of the copy.
///
/// A composite input keeps its structure; a plain leaf input is treated as a
/// tree with a single leaf at the empty path. The update request is passed
/// through unchanged.
pub struct PerLeafFilter<O> {
  operation: O,
  leaves_visited: usize,
}

impl<O: LeafOperation> PerLeafFilter<O> {
  pub fn new(operation: O) -> Self {
    Self {
      operation,
      leaves_visited: 0,
    }
  }

  /// Leaves touched by the last execution.
  pub fn leaves_visited(&self) -> usize {
    self.leaves_visited
  }

  pub fn operation_mut(&mut self) -> &mut O {
    &mut self.operation
  }
}

impl<O: LeafOperation + 'static> Algorithm for PerLeafFilter<O> {
  fn name(&self) -> &str {
    "per_leaf_filter"
  }

  fn output_types(&self) -> Vec<ExtentType> {
    vec![ExtentType::Pieces]
  }

  fn number_of_required_inputs(&self) -> usize {
    1
  }

  fn compute_input_update_extents(&mut self, ctx: &mut RequestContext<'_>) {
    ctx.pass_request_through();
  }

  fn execute_data(&mut self, ctx: &mut ExecuteContext<'_>) {
    let Some((input, output)) = ctx.input_and_output(0, 0) else {
      return;
    };
    let mut content = input.content().clone();
    let mut visited = 0;
    let operation = &mut self.operation;
    match &mut content {
      Content::Empty => {}
      Content::Leaf(leaf) => {
        operation.apply(&[], leaf);
        visited = 1;
      }
      Content::Composite(composite) => composite.visit_mut(|path, leaf| {
        operation.apply(path, leaf);
        visited += 1;
      }),
    }
    self.leaves_visited = visited;
    debug!(leaves = visited, "per-leaf operation applied");
    output.set_content(content);
  }
}

#[cfg(test)]
mod tests {
  use glam::DVec3;

  use super::*;
  use crate::composite::{CompositeDataSet, HierarchicalDataSet, MultiBlockDataSet, NodeRef};
  use crate::data::{DataObject, PointSet};
  use crate::extent::Piece;
  use crate::pipeline::Pipeline;

  fn points(values: &[f64]) -> DataSet {
    let mut set = PointSet::new();
    for &v in values {
      set.push(DVec3::ZERO, v);
    }
    DataSet::Points(set)
  }

  fn tree() -> CompositeDataSet {
    let mut h = HierarchicalDataSet::new();
    h.set_data_set(NodeRef::new(0, 0), points(&[1.0]));
    h.set_data_set(NodeRef::new(1, 1), points(&[2.0, 3.0]));
    let mut mb = MultiBlockDataSet::new();
    mb.push(points(&[4.0]));
    mb.push(CompositeDataSet::from(h));
    mb.into()
  }

  fn double(_: &[Slot], leaf: &mut DataSet) {
    if let DataSet::Points(set) = leaf {
      set.scalars.iter_mut().for_each(|v| *v *= 2.0);
    }
  }

  #[test]
  fn test_applies_to_every_leaf() {
    let mut pipeline = Pipeline::new();
    let input = pipeline.add_data(DataObject::from_composite(tree()));
    let filter = pipeline.add_process(PerLeafFilter::new(double));
    pipeline.set_input(filter, 0, Some(input)).unwrap();
    let out = pipeline.output(filter, 0).unwrap();

    pipeline.update(out).unwrap();

    let composite = pipeline.data(out).unwrap().content().as_composite().unwrap().clone();
    let mut scalars = Vec::new();
    composite.visit(|_: &[Slot], leaf: &DataSet| scalars.extend(leaf.as_points().unwrap().scalars.clone()));
    assert_eq!(scalars, vec![8.0, 2.0, 4.0, 6.0]);

    // The input is untouched.
    let original = pipeline.data(input).unwrap().content().as_composite().unwrap();
    assert_eq!(original, &tree());
  }

  #[test]
  fn test_paths_reach_the_operation() {
    let mut pipeline = Pipeline::new();
    let input = pipeline.add_data(DataObject::from_composite(tree()));
    let (tx, rx) = crossbeam_channel::unbounded();
    let filter = pipeline.add_process(PerLeafFilter::new(move |path: &[Slot], _: &mut DataSet| {
      let _ = tx.send(path.to_vec());
    }));
    pipeline.set_input(filter, 0, Some(input)).unwrap();
    let out = pipeline.output(filter, 0).unwrap();

    pipeline.update(out).unwrap();

    let paths: Vec<Vec<Slot>> = rx.try_iter().collect();
    assert_eq!(paths.len(), 3);
    assert_eq!(paths[2], vec![Slot::Block(1), Slot::Node(NodeRef::new(1, 1))]);
  }

  #[test]
  fn test_piece_request_passes_through() {
    let mut pipeline = Pipeline::new();
    let input = pipeline.add_data(DataObject::from_composite(tree()));
    let filter = pipeline.add_process(PerLeafFilter::new(double));
    pipeline.set_input(filter, 0, Some(input)).unwrap();
    let out = pipeline.output(filter, 0).unwrap();

    pipeline.data_mut(out).unwrap().set_update_piece(Piece::new(0, 1, 1));
    pipeline.update(out).unwrap();
    assert_eq!(pipeline.data(input).unwrap().update_piece(), Some(Piece::new(0, 1, 1)));
  }
}
