//! Error and status types for the pipeline.
//!
//! Two layers: [`PipelineError`] is returned when the caller hands the
//! pipeline something it cannot work with (a stale handle, an out-of-range
//! port, a bad configuration). Everything else that can happen during an
//! update - empty requests, capacity shortfalls, cycles, missing inputs - is
//! an expected outcome and is reported as a [`PhaseStatus`].

use thiserror::Error;

use crate::pipeline::{DataId, ProcessId};

/// Errors from pipeline graph operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PipelineError {
  /// Data object handle refers to a removed slot
  #[error("stale data object handle {0:?}")]
  StaleData(DataId),

  /// Process handle refers to a removed slot
  #[error("stale process handle {0:?}")]
  StaleProcess(ProcessId),

  /// Data objects owned by a producer are removed with it
  #[error("data object {0:?} is owned by its producer")]
  OwnedByProducer(DataId),

  /// Input or output port index past the end
  #[error("port {port} out of range on process {process:?}")]
  PortOutOfRange { process: ProcessId, port: usize },

  /// Configuration failed validation
  #[error("invalid configuration: {0}")]
  InvalidConfig(String),
}

/// Errors from the raw volume reader.
#[derive(Debug, Error)]
pub enum ReaderError {
  /// File could not be opened or read
  #[error("I/O error reading {path}: {source}")]
  Io {
    path: String,
    #[source]
    source: std::io::Error,
  },

  /// File is smaller than the declared volume
  #[error("{path} holds {actual} bytes, volume needs {expected}")]
  SizeMismatch {
    path: String,
    expected: u64,
    actual: u64,
  },

  /// Dimensions or scalar type not set
  #[error("reader is not configured: {0}")]
  NotConfigured(&'static str),
}

/// Outcome of one protocol phase.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum PhaseStatus {
  /// Phase ran (or had nothing to do because data was current).
  #[default]
  Ok,
  /// Request selected nothing; data left initialized.
  EmptyRequest,
  /// Request escaped the whole extent or exceeded declared capacity.
  OutOfRange,
  /// Walk re-entered a process already on the stack.
  CycleDetected,
  /// Fewer connected inputs than the algorithm requires.
  InsufficientInputs,
}

impl PhaseStatus {
  #[inline]
  pub fn is_ok(self) -> bool {
    self == PhaseStatus::Ok
  }

  /// Keep the first non-`Ok` status.
  #[inline]
  pub fn merge(self, other: PhaseStatus) -> PhaseStatus {
    if self.is_ok() {
      other
    } else {
      self
    }
  }
}

/// Convenience alias used by graph operations.
pub type Result<T, E = PipelineError> = std::result::Result<T, E>;
