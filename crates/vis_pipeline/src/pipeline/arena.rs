//! Generational slot arena backing the pipeline graph.
//!
//! Handles are `(index, generation)`. Removing a slot bumps its generation,
//! so every handle issued before the removal stops resolving instead of
//! aliasing whatever is stored there next.

use std::fmt;

/// Raw arena handle.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Handle {
  index: u32,
  generation: u32,
}

impl Handle {
  #[inline]
  pub fn index(&self) -> usize {
    self.index as usize
  }

  #[inline]
  pub fn generation(&self) -> u32 {
    self.generation
  }
}

impl fmt::Debug for Handle {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}v{}", self.index, self.generation)
  }
}

#[derive(Debug)]
struct Slot<T> {
  generation: u32,
  value: Option<T>,
}

/// Slot storage with free-list reuse.
#[derive(Debug)]
pub struct Arena<T> {
  slots: Vec<Slot<T>>,
  free: Vec<u32>,
  len: usize,
}

impl<T> Default for Arena<T> {
  fn default() -> Self {
    Self {
      slots: Vec::new(),
      free: Vec::new(),
      len: 0,
    }
  }
}

impl<T> Arena<T> {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn insert(&mut self, value: T) -> Handle {
    self.len += 1;
    if let Some(index) = self.free.pop() {
      let slot = &mut self.slots[index as usize];
      slot.value = Some(value);
      return Handle {
        index,
        generation: slot.generation,
      };
    }
    let index = self.slots.len() as u32;
    self.slots.push(Slot {
      generation: 0,
      value: Some(value),
    });
    Handle {
      index,
      generation: 0,
    }
  }

  pub fn remove(&mut self, handle: Handle) -> Option<T> {
    let slot = self.slots.get_mut(handle.index())?;
    if slot.generation != handle.generation {
      return None;
    }
    let value = slot.value.take()?;
    slot.generation = slot.generation.wrapping_add(1);
    self.free.push(handle.index);
    self.len -= 1;
    Some(value)
  }

  #[inline]
  pub fn get(&self, handle: Handle) -> Option<&T> {
    let slot = self.slots.get(handle.index())?;
    if slot.generation != handle.generation {
      return None;
    }
    slot.value.as_ref()
  }

  #[inline]
  pub fn get_mut(&mut self, handle: Handle) -> Option<&mut T> {
    let slot = self.slots.get_mut(handle.index())?;
    if slot.generation != handle.generation {
      return None;
    }
    slot.value.as_mut()
  }

  pub fn contains(&self, handle: Handle) -> bool {
    self.get(handle).is_some()
  }

  /// Shared access to `a` and exclusive access to `b`. `None` when either is
  /// stale or both name the same slot.
  pub fn pair_mut(&mut self, a: Handle, b: Handle) -> Option<(&T, &mut T)> {
    if a.index == b.index || !self.contains(a) || !self.contains(b) {
      return None;
    }
    let (ai, bi) = (a.index(), b.index());
    if ai < bi {
      let (head, tail) = self.slots.split_at_mut(bi);
      Some((head[ai].value.as_ref()?, tail[0].value.as_mut()?))
    } else {
      let (head, tail) = self.slots.split_at_mut(ai);
      Some((tail[0].value.as_ref()?, head[bi].value.as_mut()?))
    }
  }

  /// Number of live values.
  pub fn len(&self) -> usize {
    self.len
  }

  pub fn is_empty(&self) -> bool {
    self.len == 0
  }

  /// Live values with their handles.
  pub fn iter(&self) -> impl Iterator<Item = (Handle, &T)> {
    self.slots.iter().enumerate().filter_map(|(index, slot)| {
      slot.value.as_ref().map(|value| {
        (
          Handle {
            index: index as u32,
            generation: slot.generation,
          },
          value,
        )
      })
    })
  }
}
