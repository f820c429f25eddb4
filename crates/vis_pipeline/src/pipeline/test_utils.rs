//! Test utilities for pipeline tests.
//!
//! Counting producers and recording filters that make the protocol's
//! behavior observable: how often each hook ran, what was requested, and in
//! which order processes executed.

use std::sync::{Arc, Mutex};

use super::{Algorithm, ExecuteContext, InformationContext, RequestContext};
use crate::data::{DataSet, ImageData, PointSet};
use crate::extent::{Extent, ExtentType};
use glam::DVec3;

/// Shared record of execution order across processes.
#[derive(Clone, Default)]
pub struct ExecutionLog(Arc<Mutex<Vec<String>>>);

impl ExecutionLog {
  pub fn record(&self, name: &str) {
    if let Ok(mut log) = self.0.lock() {
      log.push(name.to_string());
    }
  }

  pub fn entries(&self) -> Vec<String> {
    self.0.lock().map(|log| log.clone()).unwrap_or_default()
  }
}

/// Scalar stored at each point by [`CountingImageSource`].
pub fn ramp(i: i32, j: i32, k: i32) -> f64 {
  (i + 100 * j + 10_000 * k) as f64
}

// =============================================================================
// Structured source
// =============================================================================

/// Structured source over a fixed whole extent that produces exactly the
/// requested extent.
pub struct CountingImageSource {
  pub name: String,
  pub whole: Extent,
  /// Forced output locality, for ordering tests.
  pub locality: Option<f64>,
  /// Declared maximum number of pieces.
  pub max_pieces: Option<i32>,
  pub information_passes: usize,
  pub executions: usize,
  pub requests: Vec<Extent>,
  pub log: ExecutionLog,
}

impl CountingImageSource {
  pub fn new(whole: Extent) -> Self {
    Self {
      name: "image_source".into(),
      whole,
      locality: None,
      max_pieces: None,
      information_passes: 0,
      executions: 0,
      requests: Vec::new(),
      log: ExecutionLog::default(),
    }
  }

  pub fn named(mut self, name: &str, log: &ExecutionLog) -> Self {
    self.name = name.into();
    self.log = log.clone();
    self
  }

  pub fn with_locality(mut self, locality: f64) -> Self {
    self.locality = Some(locality);
    self
  }

  pub fn with_max_pieces(mut self, max_pieces: i32) -> Self {
    self.max_pieces = Some(max_pieces);
    self
  }
}

impl Algorithm for CountingImageSource {
  fn name(&self) -> &str {
    &self.name
  }

  fn output_types(&self) -> Vec<ExtentType> {
    vec![ExtentType::Structured3D]
  }

  fn execute_information(&mut self, ctx: &mut InformationContext<'_>) {
    self.information_passes += 1;
    if let Some(output) = ctx.output_mut(0) {
      output.set_whole_extent(self.whole);
      if let Some(locality) = self.locality {
        output.set_locality(locality);
      }
      if let Some(max) = self.max_pieces {
        output.set_maximum_number_of_pieces(max);
      }
    }
  }

  fn execute_data(&mut self, ctx: &mut ExecuteContext<'_>) {
    self.executions += 1;
    self.log.record(&self.name);
    let Some(output) = ctx.output_mut(0) else {
      return;
    };
    let request = output.update_extent();
    self.requests.push(request);
    output.set_image(ImageData::from_fn(request, ramp));
  }
}

// =============================================================================
// Piece-addressed source
// =============================================================================

/// Point source that can make at most `max_pieces` pieces.
pub struct CountingPointSource {
  pub max_pieces: i32,
  pub executions: usize,
}

impl CountingPointSource {
  pub fn new(max_pieces: i32) -> Self {
    Self {
      max_pieces,
      executions: 0,
    }
  }
}

impl Algorithm for CountingPointSource {
  fn name(&self) -> &str {
    "point_source"
  }

  fn output_types(&self) -> Vec<ExtentType> {
    vec![ExtentType::Pieces]
  }

  fn execute_information(&mut self, ctx: &mut InformationContext<'_>) {
    if let Some(output) = ctx.output_mut(0) {
      output.set_maximum_number_of_pieces(self.max_pieces);
    }
  }

  fn execute_data(&mut self, ctx: &mut ExecuteContext<'_>) {
    self.executions += 1;
    let Some(output) = ctx.output_mut(0) else {
      return;
    };
    let index = output.update_piece().map_or(0, |p| p.index);
    let mut points = PointSet::new();
    points.push(DVec3::splat(index as f64), index as f64);
    output.set_content(crate::data::Content::Leaf(DataSet::Points(points)));
  }
}

/// Piece-addressed source that counts asynchronous triggers separately from
/// executions.
pub struct TriggerCountingSource {
  pub max_pieces: i32,
  pub triggers: usize,
  pub executions: usize,
}

impl TriggerCountingSource {
  pub fn new(max_pieces: i32) -> Self {
    Self {
      max_pieces,
      triggers: 0,
      executions: 0,
    }
  }
}

impl Algorithm for TriggerCountingSource {
  fn name(&self) -> &str {
    "trigger_source"
  }

  fn output_types(&self) -> Vec<ExtentType> {
    vec![ExtentType::Pieces]
  }

  fn execute_information(&mut self, ctx: &mut InformationContext<'_>) {
    if let Some(output) = ctx.output_mut(0) {
      output.set_maximum_number_of_pieces(self.max_pieces);
    }
  }

  fn trigger_asynchronous_update(&mut self) {
    self.triggers += 1;
  }

  fn execute_data(&mut self, _ctx: &mut ExecuteContext<'_>) {
    self.executions += 1;
  }
}

// =============================================================================
// Filters
// =============================================================================

/// Copies input 0's image through, recording its execution.
pub struct RecordingFilter {
  pub name: String,
  pub required_inputs: usize,
  pub executions: usize,
  pub log: ExecutionLog,
}

impl RecordingFilter {
  pub fn new(name: &str, log: &ExecutionLog) -> Self {
    Self {
      name: name.into(),
      required_inputs: 1,
      executions: 0,
      log: log.clone(),
    }
  }
}

impl Algorithm for RecordingFilter {
  fn name(&self) -> &str {
    &self.name
  }

  fn output_types(&self) -> Vec<ExtentType> {
    vec![ExtentType::Structured3D]
  }

  fn number_of_required_inputs(&self) -> usize {
    self.required_inputs
  }

  fn compute_input_update_extents(&mut self, ctx: &mut RequestContext<'_>) {
    ctx.pass_request_through();
  }

  fn execute_data(&mut self, ctx: &mut ExecuteContext<'_>) {
    self.executions += 1;
    self.log.record(&self.name);
    let Some((input, output)) = ctx.input_and_output(0, 0) else {
      return;
    };
    if let Some(image) = input.image() {
      output.set_image(image.clone());
    }
  }
}

/// Reports `steps` progress updates and stops early once aborted.
pub struct SteppingSource {
  pub steps: usize,
  pub completed: usize,
}

impl SteppingSource {
  pub fn new(steps: usize) -> Self {
    Self { steps, completed: 0 }
  }
}

impl Algorithm for SteppingSource {
  fn name(&self) -> &str {
    "stepping_source"
  }

  fn output_types(&self) -> Vec<ExtentType> {
    vec![ExtentType::Pieces]
  }

  fn execute_data(&mut self, ctx: &mut ExecuteContext<'_>) {
    self.completed = 0;
    for step in 0..self.steps {
      if ctx.abort_requested() {
        return;
      }
      self.completed += 1;
      ctx.update_progress((step + 1) as f64 / (self.steps + 1) as f64);
    }
  }
}

/// Piece-addressed filter fed by its own output.
pub struct FeedbackFilter {
  pub executions: usize,
}

impl Algorithm for FeedbackFilter {
  fn name(&self) -> &str {
    "feedback"
  }

  fn output_types(&self) -> Vec<ExtentType> {
    vec![ExtentType::Pieces]
  }

  fn execute_data(&mut self, _ctx: &mut ExecuteContext<'_>) {
    self.executions += 1;
  }
}
