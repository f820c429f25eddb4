//! Piece-addressed point source.

use glam::DVec3;

use crate::data::{Content, DataSet, PointSet};
use crate::extent::ExtentType;
use crate::pipeline::{Algorithm, ExecuteContext, InformationContext};

/// Points spaced evenly along a line segment, split into contiguous runs per
/// piece.
///
/// The source declares how many pieces it can make; requests beyond that are
/// answered with empty data by the pipeline without running the source.
pub struct PointSource {
  number_of_points: usize,
  maximum_pieces: i32,
  start: DVec3,
  end: DVec3,
}

impl PointSource {
  pub fn new(number_of_points: usize, maximum_pieces: i32) -> Self {
    Self {
      number_of_points,
      maximum_pieces,
      start: DVec3::ZERO,
      end: DVec3::X,
    }
  }

  pub fn with_segment(mut self, start: DVec3, end: DVec3) -> Self {
    self.start = start;
    self.end = end;
    self
  }

  /// Point indices `[begin, end)` that belong to `piece` of `count`.
  fn range(&self, piece: i32, count: i32) -> (usize, usize) {
    let n = self.number_of_points as u64;
    let (piece, count) = (piece as u64, count.max(1) as u64);
    ((n * piece / count) as usize, (n * (piece + 1) / count) as usize)
  }
}

impl Algorithm for PointSource {
  fn name(&self) -> &str {
    "point_source"
  }

  fn output_types(&self) -> Vec<ExtentType> {
    vec![ExtentType::Pieces]
  }

  fn execute_information(&mut self, ctx: &mut InformationContext<'_>) {
    if let Some(output) = ctx.output_mut(0) {
      output.set_maximum_number_of_pieces(self.maximum_pieces);
    }
  }

  fn execute_data(&mut self, ctx: &mut ExecuteContext<'_>) {
    let Some(piece) = ctx.output(0).and_then(|o| o.update_piece()) else {
      return;
    };
    let (begin, end) = self.range(piece.index, piece.count);
    let step = if self.number_of_points > 1 {
      (self.end - self.start) / (self.number_of_points - 1) as f64
    } else {
      DVec3::ZERO
    };

    let mut points = PointSet::new();
    for i in begin..end {
      points.push(self.start + step * i as f64, i as f64);
    }
    if let Some(output) = ctx.output_mut(0) {
      output.set_content(Content::Leaf(DataSet::Points(points)));
    }
  }
}
