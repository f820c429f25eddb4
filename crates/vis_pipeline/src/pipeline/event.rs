//! Observer contract: Start / Progress / End notifications per process.
//!
//! ```text
//! update_data(process)
//!   ├─ Start
//!   ├─ execute_data ── Progress(0.0 ..= 1.0) * n
//!   ├─ Progress(1.0)   (unless aborted)
//!   └─ End
//! ```
//!
//! Observers can stop an execution cooperatively by setting the process's
//! [`AbortHandle`]; the algorithm polls it between units of work.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crossbeam_channel::{self as channel, Receiver, Sender};

use super::ProcessId;

/// Notification sent to observers.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Event {
  Start,
  /// Fraction of the execution completed, in `[0, 1]`.
  Progress(f64),
  End,
}

impl Event {
  pub fn kind(&self) -> EventKind {
    match self {
      Event::Start => EventKind::Start,
      Event::Progress(_) => EventKind::Progress,
      Event::End => EventKind::End,
    }
  }
}

/// Event selector for registration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EventKind {
  Start,
  Progress,
  End,
}

/// Observer callback.
pub trait Command: Send {
  fn execute(&mut self, sender: ProcessId, event: &Event);
}

impl<F> Command for F
where
  F: FnMut(ProcessId, &Event) + Send,
{
  fn execute(&mut self, sender: ProcessId, event: &Event) {
    self(sender, event)
  }
}

/// Forwards every event it receives into a channel.
pub struct ChannelCommand {
  tx: Sender<(ProcessId, Event)>,
}

impl ChannelCommand {
  /// Command plus the receiving end of its channel.
  pub fn new() -> (Self, Receiver<(ProcessId, Event)>) {
    let (tx, rx) = channel::unbounded();
    (Self { tx }, rx)
  }
}

impl Command for ChannelCommand {
  fn execute(&mut self, sender: ProcessId, event: &Event) {
    // A dropped receiver just means nobody is listening anymore.
    let _ = self.tx.send((sender, *event));
  }
}

/// Registration token returned by `add_observer`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ObserverTag(u64);

struct Observer {
  tag: ObserverTag,
  filter: Option<EventKind>,
  command: Box<dyn Command>,
}

/// Observers registered on one process, invoked in registration order.
#[derive(Default)]
pub struct Observers {
  entries: Vec<Observer>,
  next_tag: u64,
}

impl Observers {
  /// Register `command` for one event kind, or all events when `filter` is
  /// `None`.
  pub fn add(&mut self, filter: Option<EventKind>, command: Box<dyn Command>) -> ObserverTag {
    let tag = ObserverTag(self.next_tag);
    self.next_tag += 1;
    self.entries.push(Observer {
      tag,
      filter,
      command,
    });
    tag
  }

  pub fn remove(&mut self, tag: ObserverTag) -> bool {
    let before = self.entries.len();
    self.entries.retain(|o| o.tag != tag);
    self.entries.len() != before
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  pub fn invoke(&mut self, sender: ProcessId, event: &Event) {
    let kind = event.kind();
    for observer in &mut self.entries {
      if observer.filter.map_or(true, |f| f == kind) {
        observer.command.execute(sender, event);
      }
    }
  }
}

impl std::fmt::Debug for Observers {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Observers").field("count", &self.entries.len()).finish()
  }
}

/// Shared cooperative abort flag of one process.
#[derive(Clone, Debug, Default)]
pub struct AbortHandle(Arc<AtomicBool>);

impl AbortHandle {
  pub fn abort(&self) {
    self.0.store(true, Ordering::Relaxed);
  }

  pub fn is_aborted(&self) -> bool {
    self.0.load(Ordering::Relaxed)
  }

  pub(crate) fn reset(&self) {
    self.0.store(false, Ordering::Relaxed);
  }
}
