//! The four-phase update protocol.
//!
//! Every phase is a recursive walk that alternates between data objects and
//! their producers. A walk carries the set of processes currently on the
//! stack; a process met again on the same walk is a cycle and the branch
//! stops there.

use std::collections::HashSet;

use smallvec::SmallVec;
use tracing::{debug, error};
use web_time::Instant;

use super::locality::sort_by_locality;
use super::process::{ExecuteContext, InformationContext, Ports, ProcessNode, RequestContext};
use super::{DataId, Pipeline, ProcessId, UpdateOutcome};
use crate::data::UpdateState;
use crate::error::{PhaseStatus, PipelineError, Result};
use crate::pipeline::event::Event;

/// Processes on the stack of one phase walk.
#[derive(Debug, Default)]
struct Walk {
  active: HashSet<ProcessId>,
}

impl Walk {
  /// False when `process` is already being visited.
  fn enter(&mut self, process: ProcessId) -> bool {
    self.active.insert(process)
  }

  fn leave(&mut self, process: ProcessId) {
    self.active.remove(&process);
  }
}

impl Pipeline {
  // ---------------------------------------------------------------------------
  // Public entry points
  // ---------------------------------------------------------------------------

  /// Bring `id` up to date with its current request.
  #[cfg_attr(feature = "profiling", tracing::instrument(skip_all, name = "pipeline::update"))]
  pub fn update(&mut self, id: DataId) -> Result<UpdateOutcome> {
    let information = self.update_information(id)?;
    let propagate = self.propagate_update_extent(id)?;
    let trigger = self.trigger_asynchronous_update(id)?;
    let data = self.update_data(id)?;
    Ok(UpdateOutcome {
      information,
      propagate,
      trigger,
      data,
    })
  }

  /// Phase 1: refresh whole extents and pipeline modification times.
  #[cfg_attr(feature = "profiling", tracing::instrument(skip_all, name = "pipeline::update_information"))]
  pub fn update_information(&mut self, id: DataId) -> Result<PhaseStatus> {
    self.check_data(id)?;
    Ok(self.data_information(id, &mut Walk::default()))
  }

  /// Phase 2: push the request of `id` upstream.
  #[cfg_attr(feature = "profiling", tracing::instrument(skip_all, name = "pipeline::propagate_update_extent"))]
  pub fn propagate_update_extent(&mut self, id: DataId) -> Result<PhaseStatus> {
    self.check_data(id)?;
    Ok(self.data_propagate(id, &mut Walk::default()))
  }

  /// Phase 3: let asynchronous producers start before anything blocks.
  #[cfg_attr(
    feature = "profiling",
    tracing::instrument(skip_all, name = "pipeline::trigger_asynchronous_update")
  )]
  pub fn trigger_asynchronous_update(&mut self, id: DataId) -> Result<PhaseStatus> {
    self.check_data(id)?;
    Ok(self.data_trigger(id, &mut Walk::default()))
  }

  /// Phase 4: execute stale producers so `id` holds its request.
  #[cfg_attr(feature = "profiling", tracing::instrument(skip_all, name = "pipeline::update_data"))]
  pub fn update_data(&mut self, id: DataId) -> Result<PhaseStatus> {
    self.check_data(id)?;
    Ok(self.data_update(id, &mut Walk::default()))
  }

  /// Update output 0 of `process` over its whole extent.
  pub fn update_whole_extent(&mut self, process: ProcessId) -> Result<UpdateOutcome> {
    let output = self.output(process, 0)?;
    self.update_information(output)?;
    self.data_mut(output)?.set_update_extent_to_whole_extent();
    self.update(output)
  }

  fn check_data(&self, id: DataId) -> Result<()> {
    if self.data.contains(id.0) {
      Ok(())
    } else {
      Err(PipelineError::StaleData(id))
    }
  }

  fn live_source(&self, id: DataId) -> Option<ProcessId> {
    self
      .data
      .get(id.0)?
      .source
      .filter(|p| self.processes.contains(p.0))
  }

  fn live_inputs(&self, process: ProcessId) -> SmallVec<[DataId; 2]> {
    self.processes.get(process.0).map_or_else(SmallVec::new, |node| {
      node
        .inputs
        .iter()
        .flatten()
        .copied()
        .filter(|id| self.data.contains(id.0))
        .collect()
    })
  }

  /// Stale-or-outside check shared by the last three phases.
  fn wants_source(&self, id: DataId) -> bool {
    self
      .data
      .get(id.0)
      .is_some_and(|o| o.needs_update() || o.last_update_extent_was_outside())
  }

  // ---------------------------------------------------------------------------
  // Phase 1: information
  // ---------------------------------------------------------------------------

  fn data_information(&mut self, id: DataId, walk: &mut Walk) -> PhaseStatus {
    let status = match self.live_source(id) {
      Some(source) => self.process_information(source, walk),
      None => {
        if let Some(object) = self.data.get_mut(id.0) {
          object.self_information();
        }
        PhaseStatus::Ok
      }
    };
    if let Some(object) = self.data.get_mut(id.0) {
      object.finish_information();
    }
    status
  }

  fn process_information(&mut self, process: ProcessId, walk: &mut Walk) -> PhaseStatus {
    if !walk.enter(process) {
      // Re-entered: this process is its own upstream. Stamp the outputs so the
      // outer visit sees them as changed and stop here.
      if let Some(node) = self.processes.get_mut(process.0) {
        node.mtime.modified();
        let stamp = node.mtime;
        for output in &node.outputs {
          if let Some(object) = self.data.get_mut(output.0) {
            object.set_pipeline_mtime(stamp);
          }
        }
        debug!(process = node.algorithm.name(), ?process, "cycle reached during update_information");
      }
      self.metrics.record_cycle();
      return PhaseStatus::CycleDetected;
    }

    let mut status = PhaseStatus::Ok;
    let inputs = self.live_inputs(process);
    for &input in &inputs {
      status = status.merge(self.data_information(input, walk));
    }

    let Some(node) = self.processes.get_mut(process.0) else {
      walk.leave(process);
      return status;
    };
    let mut newest = node.mtime;
    let mut locality = 0.0f64;
    for input in &inputs {
      if let Some(object) = self.data.get(input.0) {
        newest = newest.max(object.pipeline_mtime()).max(object.mtime());
        locality = locality.max(object.locality());
      }
    }

    if newest > node.information_time {
      let ProcessNode {
        algorithm,
        inputs,
        outputs,
        information_time,
        ..
      } = node;
      for output in outputs.iter() {
        if let Some(object) = self.data.get_mut(output.0) {
          object.set_pipeline_mtime(newest);
          object.set_locality(locality / 2.0);
        }
      }
      let mut ctx = InformationContext {
        ports: Ports {
          data: &mut self.data,
          inputs,
          outputs,
        },
      };
      algorithm.execute_information(&mut ctx);
      information_time.modified();
      self.metrics.record_information_pass();
    }

    walk.leave(process);
    status
  }

  // ---------------------------------------------------------------------------
  // Phase 2: propagate the request
  // ---------------------------------------------------------------------------

  fn data_propagate(&mut self, id: DataId, walk: &mut Walk) -> PhaseStatus {
    let Some(object) = self.data.get(id.0) else {
      return PhaseStatus::Ok;
    };
    if object.update_extent_is_empty() {
      return PhaseStatus::EmptyRequest;
    }

    let mut status = PhaseStatus::Ok;
    if self.wants_source(id) {
      if let Some(source) = self.live_source(id) {
        status = self.process_propagate(source, id, walk);
      }
    }

    let Some(object) = self.data.get_mut(id.0) else {
      return status;
    };
    if object.update_extent_is_outside_of_the_extent() {
      object.set_last_update_extent_was_outside(true);
    }
    if !object.verify_update_extent() {
      status = status.merge(PhaseStatus::OutOfRange);
    }
    object.state = UpdateState::ExtentPropagated;
    status
  }

  fn process_propagate(&mut self, process: ProcessId, output: DataId, walk: &mut Walk) -> PhaseStatus {
    if !walk.enter(process) {
      self.metrics.record_cycle();
      return PhaseStatus::CycleDetected;
    }

    if let Some(node) = self.processes.get_mut(process.0) {
      let ProcessNode {
        algorithm,
        inputs,
        outputs,
        ..
      } = node;
      let mut ctx = RequestContext {
        ports: Ports {
          data: &mut self.data,
          inputs,
          outputs,
        },
        requester: output,
      };
      algorithm.compute_input_update_extents(&mut ctx);
    }

    let mut status = PhaseStatus::Ok;
    for input in self.live_inputs(process) {
      status = status.merge(self.data_propagate(input, walk));
    }
    walk.leave(process);
    status
  }

  // ---------------------------------------------------------------------------
  // Phase 3: trigger
  // ---------------------------------------------------------------------------

  fn data_trigger(&mut self, id: DataId, walk: &mut Walk) -> PhaseStatus {
    let Some(object) = self.data.get(id.0) else {
      return PhaseStatus::Ok;
    };
    if object.update_extent_is_empty() {
      return PhaseStatus::EmptyRequest;
    }

    let mut status = PhaseStatus::Ok;
    if !object.request_exceeds_maximum_pieces() && self.wants_source(id) {
      if let Some(source) = self.live_source(id) {
        status = self.process_trigger(source, walk);
      }
    }
    if let Some(object) = self.data.get_mut(id.0) {
      object.state = UpdateState::AsyncTriggered;
    }
    status
  }

  fn process_trigger(&mut self, process: ProcessId, walk: &mut Walk) -> PhaseStatus {
    if !walk.enter(process) {
      self.metrics.record_cycle();
      return PhaseStatus::CycleDetected;
    }

    let mut status = PhaseStatus::Ok;
    for input in self.live_inputs(process) {
      status = status.merge(self.data_trigger(input, walk));
    }
    if let Some(node) = self.processes.get_mut(process.0) {
      node.algorithm.trigger_asynchronous_update();
    }
    walk.leave(process);
    status
  }

  // ---------------------------------------------------------------------------
  // Phase 4: data
  // ---------------------------------------------------------------------------

  fn data_update(&mut self, id: DataId, walk: &mut Walk) -> PhaseStatus {
    let Some(object) = self.data.get_mut(id.0) else {
      return PhaseStatus::Ok;
    };

    if object.update_extent_is_empty() {
      object.initialize();
      object.state = UpdateState::DataUpdated;
      self.metrics.record_empty_request();
      return PhaseStatus::EmptyRequest;
    }

    if object.request_exceeds_maximum_pieces() {
      if let Some(piece) = object.update_piece() {
        object.record_shortfall(piece);
      }
      object.state = UpdateState::DataUpdated;
      self.metrics.record_piece_shortfall();
      return PhaseStatus::EmptyRequest;
    }

    let mut status = PhaseStatus::Ok;
    if self.wants_source(id) {
      if let Some(source) = self.live_source(id) {
        status = self.process_update(source, id, walk);
      }
    } else {
      self.metrics.record_up_to_date();
    }

    let Some(object) = self.data.get_mut(id.0) else {
      return status;
    };
    object.set_last_update_extent_was_outside(false);
    if object.request_exact_extent() {
      object.crop();
    }
    object.state = UpdateState::DataUpdated;
    status
  }

  fn process_update(&mut self, process: ProcessId, output: DataId, walk: &mut Walk) -> PhaseStatus {
    if !walk.enter(process) {
      self.metrics.record_cycle();
      debug!(?process, "cycle reached during update_data");
      return PhaseStatus::CycleDetected;
    }

    let mut status = PhaseStatus::Ok;
    let slots: SmallVec<[Option<DataId>; 2]> = self
      .processes
      .get(process.0)
      .map_or_else(SmallVec::new, |node| node.inputs.clone());

    if slots.len() == 1 {
      if let Some(input) = slots[0] {
        status = status.merge(self.data_update(input, walk));
      }
    } else {
      let keyed: SmallVec<[(DataId, Option<f64>); 4]> = slots
        .iter()
        .flatten()
        .map(|&id| (id, self.data.get(id.0).map(|o| o.locality())))
        .collect();
      for input in sort_by_locality(&keyed) {
        status = status.merge(self.data_propagate(input, walk));
        status = status.merge(self.data_update(input, walk));
      }
    }
    walk.leave(process);

    status.merge(self.execute(process, output))
  }

  /// Run the algorithm once its inputs are current.
  fn execute(&mut self, process: ProcessId, output: DataId) -> PhaseStatus {
    let global_release = self.config.global_release_data;
    let Some(node) = self.processes.get_mut(process.0) else {
      return PhaseStatus::Ok;
    };
    let ProcessNode {
      algorithm,
      inputs,
      outputs,
      information_time,
      control,
      ..
    } = node;

    for id in outputs.iter() {
      if let Some(object) = self.data.get_mut(id.0) {
        object.prepare_for_new_data();
      }
    }

    control.fire(process, Event::Start);
    control.abort.reset();
    control.progress = 0.0;
    control.failed = false;

    let mut status = PhaseStatus::Ok;
    let required = algorithm.number_of_required_inputs();
    let connected = inputs
      .iter()
      .flatten()
      .filter(|id| self.data.contains(id.0))
      .count();

    if connected < required {
      error!(
        process = algorithm.name(),
        ?process,
        required,
        connected,
        "not enough inputs connected; execution skipped"
      );
      self.metrics.record_insufficient_inputs();
      status = PhaseStatus::InsufficientInputs;
    } else {
      let started = Instant::now();
      {
        let mut ctx = ExecuteContext {
          ports: Ports {
            data: &mut self.data,
            inputs,
            outputs,
          },
          requester: output,
          process,
          control: &mut *control,
        };
        algorithm.execute_data(&mut ctx);
      }
      self.metrics.record_execution(started.elapsed().as_micros() as u64);

      if let Some(first) = inputs.first().copied().flatten() {
        for id in outputs.iter() {
          if let Some((input, object)) = self.data.pair_mut(first.0, id.0) {
            object.field_data_mut().pass_data(input.field_data());
          }
        }
      }
    }

    if control.failed {
      debug!(process = algorithm.name(), ?process, "execution failed; outputs left stale");
    }
    if control.abort.is_aborted() {
      debug!(process = algorithm.name(), ?process, "execution aborted");
    } else {
      control.update_progress(process, 1.0);
    }
    control.fire(process, Event::End);

    for id in outputs.iter() {
      if let Some(object) = self.data.get_mut(id.0) {
        if control.failed {
          // Left released so the next pull runs the producer again.
          object.release_data();
        } else {
          object.data_has_been_generated();
        }
      }
    }
    for id in inputs.iter().flatten() {
      if let Some(object) = self.data.get_mut(id.0) {
        if object.should_release_data(global_release) {
          object.release_data();
        }
      }
    }
    // Stamped after execute_data rewrote the outputs, so their mtime bumps do
    // not count as upstream changes on the next information pass.
    information_time.modified();
    status
  }
}

