//! Typed handles into the pipeline arenas.

use std::fmt;

use super::arena::Handle;

/// Handle to a data object. Stale once the object is removed.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DataId(pub(crate) Handle);

/// Handle to a process. Stale once the process is removed.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProcessId(pub(crate) Handle);

impl fmt::Debug for DataId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "DataId({:?})", self.0)
  }
}

impl fmt::Debug for ProcessId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "ProcessId({:?})", self.0)
  }
}
