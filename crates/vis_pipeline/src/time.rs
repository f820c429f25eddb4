//! Modification time stamps.
//!
//! Every data object and process records when it was last modified, when its
//! data was last generated, and the newest modification seen upstream. All of
//! these draw from one process-wide counter so stamps from different objects
//! are directly comparable.

use std::sync::atomic::{AtomicU64, Ordering};

// =============================================================================
// TimeStamp - monotonic modification counter
// =============================================================================

/// Atomic counter backing every stamp. Starts at 1 so that `NEVER` (0) is
/// older than anything ever stamped.
static MODIFIED_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Point on the pipeline-wide modification clock.
///
/// Stamps are strictly increasing: a stamp taken later always compares
/// greater than one taken earlier, regardless of which object took it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimeStamp(u64);

impl TimeStamp {
  /// Older than every stamp produced by [`TimeStamp::now`].
  pub const NEVER: Self = Self(0);

  /// Take a fresh stamp.
  pub fn now() -> Self {
    Self(MODIFIED_COUNTER.fetch_add(1, Ordering::Relaxed))
  }

  /// Advance this stamp to now.
  #[inline]
  pub fn modified(&mut self) {
    *self = Self::now();
  }

  /// Get the raw counter value.
  pub fn raw(&self) -> u64 {
    self.0
  }
}
