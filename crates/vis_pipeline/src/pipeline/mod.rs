//! Demand-driven pipeline graph.
//!
//! ```text
//!                 owns                    consumes
//! ┌─────────┐ ───────────► ┌────────────┐ ◄─────────── ┌─────────┐
//! │ Process │              │ DataObject │              │ Process │
//! └─────────┘ ◄─ ─ ─ ─ ─ ─ └────────────┘ ─ ─ ─ ─ ─ ─► └─────────┘
//!               source                    consumers
//! ```
//!
//! Processes and data objects live in two generational arenas owned by
//! [`Pipeline`]. A process owns its outputs: removing it removes them too.
//! Every other edge (output → producer, object → consumers, process →
//! inputs) is a plain handle, so cycles in the graph never keep anything
//! alive and stale handles resolve to nothing.
//!
//! # Update protocol
//!
//! Pulling a data object runs four phases, each a recursive walk upstream:
//!
//! 1. **update_information**: producers describe what they can make.
//! 2. **propagate_update_extent**: requests flow upstream.
//! 3. **trigger_asynchronous_update**: remote producers start early.
//! 4. **update_data**: stale producers execute, inputs first.

mod arena;
pub mod event;
mod handle;
pub mod locality;
pub mod process;
mod update;

#[cfg(test)]
pub mod test_utils;


pub use event::{AbortHandle, ChannelCommand, Command, Event, EventKind, ObserverTag};
pub use handle::{DataId, ProcessId};
pub use process::{Algorithm, AsAny, ExecuteContext, InformationContext, Ports, RequestContext};

use smallvec::SmallVec;
use tracing::{debug, error};

use self::arena::Arena;
use self::process::ProcessNode;
use crate::config::PipelineConfig;
use crate::data::DataObject;
use crate::error::{PhaseStatus, PipelineError, Result};
use crate::extent::{ExtentTranslator, ExtentType};
use crate::metrics::PipelineMetrics;

/// Status of each phase of one `update` call.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct UpdateOutcome {
  pub information: PhaseStatus,
  pub propagate: PhaseStatus,
  pub trigger: PhaseStatus,
  pub data: PhaseStatus,
}

impl UpdateOutcome {
  /// First non-`Ok` status in phase order.
  pub fn status(&self) -> PhaseStatus {
    self
      .information
      .merge(self.propagate)
      .merge(self.trigger)
      .merge(self.data)
  }
}

/// Owner of every process and data object in a graph.
pub struct Pipeline {
  data: Arena<DataObject>,
  processes: Arena<ProcessNode>,
  config: PipelineConfig,
  metrics: PipelineMetrics,
}

impl Default for Pipeline {
  fn default() -> Self {
    Self::new()
  }
}

impl Pipeline {
  pub fn new() -> Self {
    let config = PipelineConfig::default();
    Self {
      data: Arena::new(),
      processes: Arena::new(),
      config,
      metrics: PipelineMetrics::new(config.metrics_window),
    }
  }

  pub fn with_config(config: PipelineConfig) -> Result<Self> {
    config.validate()?;
    Ok(Self {
      data: Arena::new(),
      processes: Arena::new(),
      config,
      metrics: PipelineMetrics::new(config.metrics_window),
    })
  }

  pub fn config(&self) -> &PipelineConfig {
    &self.config
  }

  pub fn metrics(&self) -> &PipelineMetrics {
    &self.metrics
  }

  pub fn metrics_mut(&mut self) -> &mut PipelineMetrics {
    &mut self.metrics
  }

  // ---------------------------------------------------------------------------
  // Construction
  // ---------------------------------------------------------------------------

  /// Insert a producer-less data object.
  pub fn add_data(&mut self, object: DataObject) -> DataId {
    DataId(self.data.insert(object))
  }

  /// Insert a process and create its outputs.
  pub fn add_process(&mut self, algorithm: impl Algorithm + 'static) -> ProcessId {
    self.add_boxed_process(Box::new(algorithm))
  }

  pub fn add_boxed_process(&mut self, algorithm: Box<dyn Algorithm>) -> ProcessId {
    let output_types = algorithm.output_types();
    let id = ProcessId(self.processes.insert(ProcessNode::new(algorithm)));

    let outputs: SmallVec<[DataId; 1]> = output_types
      .into_iter()
      .map(|extent_type| {
        let mut object = DataObject::new(extent_type);
        if extent_type == ExtentType::Structured3D {
          object.set_translator(ExtentTranslator::new(self.config.split_mode));
        }
        object.source = Some(id);
        DataId(self.data.insert(object))
      })
      .collect();

    if let Some(node) = self.processes.get_mut(id.0) {
      debug!(process = node.algorithm.name(), ?id, outputs = outputs.len(), "process added");
      node.outputs = outputs;
    }
    id
  }

  /// Connect `input` to `port`, or disconnect the port with `None`.
  pub fn set_input(&mut self, process: ProcessId, port: usize, input: Option<DataId>) -> Result<()> {
    if !self.processes.contains(process.0) {
      error!(?process, port, "set_input on a removed process");
      return Err(PipelineError::StaleProcess(process));
    }
    if let Some(id) = input {
      if !self.data.contains(id.0) {
        error!(?process, port, data = ?id, "set_input with a removed data object");
        return Err(PipelineError::StaleData(id));
      }
    }

    let Some(node) = self.processes.get_mut(process.0) else {
      return Err(PipelineError::StaleProcess(process));
    };
    if node.inputs.len() <= port {
      node.inputs.resize(port + 1, None);
    }
    let previous = std::mem::replace(&mut node.inputs[port], input);
    if previous == input {
      return Ok(());
    }
    node.mtime.modified();
    let still_connected = previous.is_some_and(|p| node.inputs.contains(&Some(p)));

    if let Some(previous) = previous.filter(|_| !still_connected) {
      if let Some(object) = self.data.get_mut(previous.0) {
        object.consumers.retain(|c| *c != process);
      }
    }
    if let Some(object) = input.and_then(|id| self.data.get_mut(id.0)) {
      if !object.consumers.contains(&process) {
        object.consumers.push(process);
      }
    }
    Ok(())
  }

  /// Connect `input` to the next free port. Returns the port.
  pub fn add_input(&mut self, process: ProcessId, input: DataId) -> Result<usize> {
    let port = self
      .processes
      .get(process.0)
      .ok_or(PipelineError::StaleProcess(process))?
      .inputs
      .len();
    self.set_input(process, port, Some(input))?;
    Ok(port)
  }

  // ---------------------------------------------------------------------------
  // Introspection
  // ---------------------------------------------------------------------------

  pub fn output(&self, process: ProcessId, port: usize) -> Result<DataId> {
    let node = self.node(process)?;
    node
      .outputs
      .get(port)
      .copied()
      .ok_or(PipelineError::PortOutOfRange { process, port })
  }

  pub fn outputs(&self, process: ProcessId) -> Result<&[DataId]> {
    Ok(&self.node(process)?.outputs)
  }

  pub fn inputs(&self, process: ProcessId) -> Result<&[Option<DataId>]> {
    Ok(&self.node(process)?.inputs)
  }

  pub fn data(&self, id: DataId) -> Result<&DataObject> {
    self.data.get(id.0).ok_or(PipelineError::StaleData(id))
  }

  pub fn data_mut(&mut self, id: DataId) -> Result<&mut DataObject> {
    self.data.get_mut(id.0).ok_or(PipelineError::StaleData(id))
  }

  /// Producer of `id`, if it has one that is still alive.
  pub fn source_of(&self, id: DataId) -> Result<Option<ProcessId>> {
    let source = self.data(id)?.source;
    Ok(source.filter(|p| self.processes.contains(p.0)))
  }

  pub fn consumers_of(&self, id: DataId) -> Result<&[ProcessId]> {
    Ok(self.data(id)?.consumers())
  }

  /// Name of a process's algorithm.
  pub fn process_name(&self, process: ProcessId) -> Result<&str> {
    Ok(self.node(process)?.algorithm.name())
  }

  /// Mark a process modified so the next update re-executes it.
  pub fn modified(&mut self, process: ProcessId) -> Result<()> {
    self.node_mut(process)?.mtime.modified();
    Ok(())
  }

  /// Read access to a process's algorithm.
  pub fn algorithm<A: Algorithm + 'static>(&self, process: ProcessId) -> Result<Option<&A>> {
    let node = self.node(process)?;
    Ok(AsAny::as_any(node.algorithm.as_ref()).downcast_ref::<A>())
  }

  /// Write access to a process's algorithm. Marks the process modified.
  pub fn algorithm_mut<A: Algorithm + 'static>(&mut self, process: ProcessId) -> Result<Option<&mut A>> {
    let node = self.node_mut(process)?;
    node.mtime.modified();
    Ok(AsAny::as_any_mut(node.algorithm.as_mut()).downcast_mut::<A>())
  }

  pub fn live_data_count(&self) -> usize {
    self.data.len()
  }

  pub fn live_process_count(&self) -> usize {
    self.processes.len()
  }

  // ---------------------------------------------------------------------------
  // Observers
  // ---------------------------------------------------------------------------

  /// Register an observer for one event kind, or every event with `None`.
  pub fn add_observer(
    &mut self,
    process: ProcessId,
    filter: Option<EventKind>,
    command: impl Command + 'static,
  ) -> Result<ObserverTag> {
    let node = self.node_mut(process)?;
    Ok(node.control.observers.add(filter, Box::new(command)))
  }

  pub fn remove_observer(&mut self, process: ProcessId, tag: ObserverTag) -> Result<bool> {
    Ok(self.node_mut(process)?.control.observers.remove(tag))
  }

  /// Shared abort flag of a process; setting it stops the running execution
  /// at the algorithm's next check.
  pub fn abort_handle(&self, process: ProcessId) -> Result<AbortHandle> {
    Ok(self.node(process)?.control.abort.clone())
  }

  /// Progress of the last (or running) execution.
  pub fn progress(&self, process: ProcessId) -> Result<f64> {
    Ok(self.node(process)?.control.progress)
  }

  // ---------------------------------------------------------------------------
  // Teardown
  // ---------------------------------------------------------------------------

  /// Remove a process together with its outputs.
  ///
  /// Consumers of the outputs keep their port with nothing connected.
  pub fn remove_process(&mut self, process: ProcessId) -> Result<()> {
    let node = self
      .processes
      .remove(process.0)
      .ok_or(PipelineError::StaleProcess(process))?;

    for input in node.inputs.iter().flatten() {
      if let Some(object) = self.data.get_mut(input.0) {
        object.consumers.retain(|c| *c != process);
      }
    }
    for &output in &node.outputs {
      if let Some(object) = self.data.remove(output.0) {
        for consumer in object.consumers {
          self.disconnect(consumer, output);
        }
      }
    }
    debug!(process = node.algorithm.name(), ?process, "process removed");
    Ok(())
  }

  /// Remove a producer-less data object.
  pub fn remove_data(&mut self, id: DataId) -> Result<()> {
    if self.source_of(id)?.is_some() {
      return Err(PipelineError::OwnedByProducer(id));
    }
    if let Some(object) = self.data.remove(id.0) {
      for consumer in object.consumers {
        self.disconnect(consumer, id);
      }
    }
    Ok(())
  }

  fn disconnect(&mut self, consumer: ProcessId, id: DataId) {
    let Some(node) = self.processes.get_mut(consumer.0) else {
      return;
    };
    for slot in node.inputs.iter_mut().filter(|slot| **slot == Some(id)) {
      *slot = None;
    }
    node.mtime.modified();
  }

  fn node(&self, process: ProcessId) -> Result<&ProcessNode> {
    self
      .processes
      .get(process.0)
      .ok_or(PipelineError::StaleProcess(process))
  }

  fn node_mut(&mut self, process: ProcessId) -> Result<&mut ProcessNode> {
    self
      .processes
      .get_mut(process.0)
      .ok_or(PipelineError::StaleProcess(process))
  }
}

impl std::fmt::Debug for Pipeline {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Pipeline")
      .field("data", &self.data.len())
      .field("processes", &self.processes.len())
      .field("config", &self.config)
      .finish()
  }
}
