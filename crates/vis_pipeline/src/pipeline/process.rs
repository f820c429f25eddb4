//! Producer side of the update protocol.
//!
//! An [`Algorithm`] is the user-supplied part of a process. The pipeline calls
//! its hooks in a fixed order during an update:
//!
//! ```text
//! execute_information           what can be produced (whole extent, type, pieces)
//!   └─ compute_input_update_extents   what the inputs must provide
//!        └─ trigger_asynchronous_update   start remote work (optional)
//!             └─ execute_data            fill the outputs
//! ```
//!
//! Each hook receives a context that exposes exactly the process's own
//! inputs and outputs; handles never leak into algorithm code.

use std::any::Any;
use std::ops::{Deref, DerefMut};

use smallvec::SmallVec;

use super::arena::Arena;
use super::event::{AbortHandle, Event, Observers};
use super::{DataId, ProcessId};
use crate::data::DataObject;
use crate::extent::{ExtentType, Piece};
use crate::time::TimeStamp;

// =============================================================================
// Algorithm
// =============================================================================

/// Downcasting support for algorithms stored as trait objects.
pub trait AsAny {
  fn as_any(&self) -> &dyn Any;
  fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Any> AsAny for T {
  fn as_any(&self) -> &dyn Any {
    self
  }

  fn as_any_mut(&mut self) -> &mut dyn Any {
    self
  }
}

/// User-defined producer logic.
pub trait Algorithm: AsAny + Send {
  /// Name used in log records.
  fn name(&self) -> &str;

  /// Addressing mode of each output. Called once when the process is added.
  fn output_types(&self) -> Vec<ExtentType>;

  /// Inputs that must be connected for `execute_data` to run.
  fn number_of_required_inputs(&self) -> usize {
    0
  }

  /// Describe the outputs. Defaults to copying input 0's information to every
  /// output; piece-addressed outputs of input-less producers declare a single
  /// piece.
  fn execute_information(&mut self, ctx: &mut InformationContext<'_>) {
    ctx.copy_default_information();
  }

  /// Set the update request of every input. Defaults to the whole extent,
  /// tagged exact.
  fn compute_input_update_extents(&mut self, ctx: &mut RequestContext<'_>) {
    ctx.request_whole_inputs();
  }

  /// Start asynchronous work. Only port-like producers do anything here.
  fn trigger_asynchronous_update(&mut self) {}

  /// Produce data for the current requests.
  fn execute_data(&mut self, ctx: &mut ExecuteContext<'_>);
}

// =============================================================================
// Process node
// =============================================================================

/// Observer list, abort flag and progress of one process.
#[derive(Debug, Default)]
pub(crate) struct ProcessControl {
  pub observers: Observers,
  pub abort: AbortHandle,
  pub progress: f64,
  /// Set by the algorithm when it could not produce its outputs.
  pub failed: bool,
}

impl ProcessControl {
  pub fn fire(&mut self, sender: ProcessId, event: Event) {
    self.observers.invoke(sender, &event);
  }

  pub fn update_progress(&mut self, sender: ProcessId, amount: f64) {
    self.progress = amount.clamp(0.0, 1.0);
    self.fire(sender, Event::Progress(self.progress));
  }
}

pub(crate) struct ProcessNode {
  pub algorithm: Box<dyn Algorithm>,
  pub inputs: SmallVec<[Option<DataId>; 2]>,
  pub outputs: SmallVec<[DataId; 1]>,
  pub mtime: TimeStamp,
  pub information_time: TimeStamp,
  pub control: ProcessControl,
}

impl ProcessNode {
  pub fn new(algorithm: Box<dyn Algorithm>) -> Self {
    Self {
      algorithm,
      inputs: SmallVec::new(),
      outputs: SmallVec::new(),
      mtime: TimeStamp::now(),
      information_time: TimeStamp::NEVER,
      control: ProcessControl::default(),
    }
  }
}

impl std::fmt::Debug for ProcessNode {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("ProcessNode")
      .field("algorithm", &self.algorithm.name())
      .field("inputs", &self.inputs)
      .field("outputs", &self.outputs)
      .finish()
  }
}

// =============================================================================
// Contexts
// =============================================================================

/// A process's view of the data arena.
pub struct Ports<'a> {
  pub(crate) data: &'a mut Arena<DataObject>,
  pub(crate) inputs: &'a [Option<DataId>],
  pub(crate) outputs: &'a [DataId],
}

impl<'a> Ports<'a> {
  pub fn number_of_inputs(&self) -> usize {
    self.inputs.len()
  }

  pub fn number_of_outputs(&self) -> usize {
    self.outputs.len()
  }

  fn input_id(&self, port: usize) -> Option<DataId> {
    self.inputs.get(port).copied().flatten()
  }

  /// Connected, live input on `port`.
  pub fn input(&self, port: usize) -> Option<&DataObject> {
    self.data.get(self.input_id(port)?.0)
  }

  pub fn input_mut(&mut self, port: usize) -> Option<&mut DataObject> {
    let id = self.input_id(port)?;
    self.data.get_mut(id.0)
  }

  pub fn output(&self, port: usize) -> Option<&DataObject> {
    self.data.get(self.outputs.get(port)?.0)
  }

  pub fn output_mut(&mut self, port: usize) -> Option<&mut DataObject> {
    let id = *self.outputs.get(port)?;
    self.data.get_mut(id.0)
  }

  /// Read an input while writing an output. `None` if either is missing or
  /// both are the same object (a process reading its own output).
  pub fn input_and_output(&mut self, input: usize, output: usize) -> Option<(&DataObject, &mut DataObject)> {
    let input = self.input_id(input)?;
    let output = *self.outputs.get(output)?;
    self.data.pair_mut(input.0, output.0)
  }

  fn for_each_live_input(&mut self, mut f: impl FnMut(&mut DataObject)) {
    for id in self.inputs.iter().flatten() {
      if let Some(object) = self.data.get_mut(id.0) {
        f(object);
      }
    }
  }
}

/// Context for `execute_information`.
pub struct InformationContext<'a> {
  pub(crate) ports: Ports<'a>,
}

impl InformationContext<'_> {
  /// Copy input 0's information to every output. Without an input,
  /// piece-addressed outputs declare that they can only make one piece.
  pub fn copy_default_information(&mut self) {
    let outputs = self.ports.outputs;
    match self.ports.input_id(0).filter(|id| self.ports.data.contains(id.0)) {
      Some(input) => {
        for output in outputs {
          if let Some((src, dst)) = self.ports.data.pair_mut(input.0, output.0) {
            dst.copy_information_from(src);
          }
        }
      }
      None => {
        for output in outputs {
          if let Some(dst) = self.ports.data.get_mut(output.0) {
            if dst.extent_type() == ExtentType::Pieces {
              dst.set_maximum_number_of_pieces(1);
            }
          }
        }
      }
    }
  }
}

/// Context for `compute_input_update_extents`.
pub struct RequestContext<'a> {
  pub(crate) ports: Ports<'a>,
  pub(crate) requester: DataId,
}

impl RequestContext<'_> {
  /// The output whose request is being propagated.
  pub fn requesting_output(&self) -> Option<&DataObject> {
    self.ports.data.get(self.requester.0)
  }

  /// Every input requests its whole extent, exactly.
  pub fn request_whole_inputs(&mut self) {
    self.ports.for_each_live_input(|input| {
      input.set_request_exact_extent(true);
      input.set_update_extent_to_whole_extent();
    });
  }

  /// Every input receives the requesting output's request unchanged.
  pub fn pass_request_through(&mut self) {
    let requester = self.requester;
    let inputs: SmallVec<[DataId; 2]> = self.ports.inputs.iter().flatten().copied().collect();
    for input in inputs {
      if let Some((src, dst)) = self.ports.data.pair_mut(requester.0, input.0) {
        dst.copy_update_extent_from(src);
      }
    }
  }

  /// Every input receives `piece`.
  pub fn request_piece_on_inputs(&mut self, piece: Piece) {
    self.ports.for_each_live_input(|input| input.set_update_piece(piece));
  }
}

/// Context for `execute_data`.
pub struct ExecuteContext<'a> {
  pub(crate) ports: Ports<'a>,
  pub(crate) requester: DataId,
  pub(crate) process: ProcessId,
  pub(crate) control: &'a mut ProcessControl,
}

impl ExecuteContext<'_> {
  pub fn process(&self) -> ProcessId {
    self.process
  }

  /// Output whose update triggered this execution.
  pub fn requesting_output(&self) -> Option<&DataObject> {
    self.ports.data.get(self.requester.0)
  }

  /// Report progress in `[0, 1]` to observers.
  pub fn update_progress(&mut self, amount: f64) {
    self.control.update_progress(self.process, amount);
  }

  pub fn progress(&self) -> f64 {
    self.control.progress
  }

  /// An observer asked this execution to stop early.
  pub fn abort_requested(&self) -> bool {
    self.control.abort.is_aborted()
  }

  /// The outputs could not be produced. They are released instead of being
  /// marked current, so the next update executes this process again.
  pub fn report_failure(&mut self) {
    self.control.failed = true;
  }
}

macro_rules! deref_ports {
  ($($ctx:ident),*) => {
    $(
      impl<'a> Deref for $ctx<'a> {
        type Target = Ports<'a>;

        fn deref(&self) -> &Self::Target {
          &self.ports
        }
      }

      impl<'a> DerefMut for $ctx<'a> {
        fn deref_mut(&mut self) -> &mut Self::Target {
          &mut self.ports
        }
      }
    )*
  };
}

deref_ports!(InformationContext, RequestContext, ExecuteContext);
