//! ExtentTranslator - maps a piece request onto a sub-extent of a whole extent.
//!
//! Splitting is recursive bisection: at every step the current box is cut in
//! two along one axis, the piece range is cut proportionally, and the walk
//! continues into whichever half owns the requested piece.
//!
//! ```text
//! [0,9] x [0,9], 2 pieces, Block:
//!
//!   y ┌─────────┬─────────┐
//!     │ piece 0 │ piece 1 │   X and Y tie at 10 points; X (lowest axis) wins
//!     │  [0,4]  │  [5,9]  │
//!     └─────────┴─────────┘ x
//! ```

use super::{Extent, Piece};

/// Axis selection policy for splitting.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum SplitMode {
  /// Prefer cutting along X.
  XSlab,
  /// Prefer cutting along Y.
  YSlab,
  /// Prefer cutting along Z.
  ZSlab,
  /// Always cut the longest axis.
  #[default]
  Block,
}

impl SplitMode {
  fn preferred_axis(self) -> Option<usize> {
    match self {
      SplitMode::XSlab => Some(0),
      SplitMode::YSlab => Some(1),
      SplitMode::ZSlab => Some(2),
      SplitMode::Block => None,
    }
  }
}

/// How two halves of a cut meet.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Boundary {
  /// Halves own disjoint point ranges: `[lo, mid-1]` and `[mid, hi]`.
  Disjoint,
  /// Halves share the cut point and own disjoint cell ranges: `[lo, mid]`
  /// and `[mid, hi]`.
  SharedPoint,
}

impl Boundary {
  /// Splittable length of one axis.
  #[inline]
  fn size(self, lo: i32, hi: i32) -> i64 {
    match self {
      Boundary::Disjoint => hi as i64 - lo as i64 + 1,
      Boundary::SharedPoint => hi as i64 - lo as i64,
    }
  }
}

/// Translates `(piece, count, ghost_level)` requests into extents.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ExtentTranslator {
  pub split_mode: SplitMode,
}

impl ExtentTranslator {
  pub fn new(split_mode: SplitMode) -> Self {
    Self { split_mode }
  }

  /// Sub-extent owned by `piece`, grown by its ghost level and clamped to
  /// `whole`. Adjacent pieces own disjoint point ranges.
  ///
  /// Returns `None` when the piece cannot be realized: invalid piece, invalid
  /// whole extent, or more pieces requested than the extent can hold.
  pub fn piece_to_extent(&self, piece: Piece, whole: &Extent) -> Option<Extent> {
    translate(piece, whole, self.split_mode, Boundary::Disjoint)
  }

  /// Node-centred variant of [`piece_to_extent`](Self::piece_to_extent):
  /// adjacent pieces share one boundary point and own disjoint cell ranges.
  pub fn piece_to_extent_by_points(&self, piece: Piece, whole: &Extent) -> Option<Extent> {
    translate(piece, whole, self.split_mode, Boundary::SharedPoint)
  }
}

fn translate(piece: Piece, whole: &Extent, mode: SplitMode, boundary: Boundary) -> Option<Extent> {
  if !piece.is_valid() || !whole.is_valid() {
    return None;
  }
  let split = split(piece.index, piece.count, whole, mode, boundary)?;
  if piece.ghost_level > 0 {
    Some(split.grow(piece.ghost_level).clamp_to(whole))
  } else {
    Some(split)
  }
}

/// Split `extent` into `count` pieces with disjoint point ranges and return
/// the one at `index`, without ghost levels.
pub fn split_extent(index: i32, count: i32, extent: &Extent, mode: SplitMode) -> Option<Extent> {
  if count <= 0 || index < 0 || index >= count || !extent.is_valid() {
    return None;
  }
  split(index, count, extent, mode, Boundary::Disjoint)
}

/// Split `extent` into `count` pieces sharing boundary points and return the
/// one at `index`, without ghost levels.
pub fn split_extent_by_points(
  index: i32,
  count: i32,
  extent: &Extent,
  mode: SplitMode,
) -> Option<Extent> {
  if count <= 0 || index < 0 || index >= count || !extent.is_valid() {
    return None;
  }
  split(index, count, extent, mode, Boundary::SharedPoint)
}

fn split(
  mut index: i32,
  mut count: i32,
  extent: &Extent,
  mode: SplitMode,
  boundary: Boundary,
) -> Option<Extent> {
  let mut ext = *extent;

  while count > 1 {
    let sizes = [0, 1, 2].map(|axis| {
      let (lo, hi) = ext.axis(axis);
      boundary.size(lo, hi)
    });

    let axis = match mode.preferred_axis() {
      Some(axis) if sizes[axis] >= 2 => Some(axis),
      _ => longest_axis(&sizes),
    };

    let Some(axis) = axis else {
      // Nothing left to cut: piece 0 keeps the remainder.
      return (index == 0).then_some(ext);
    };

    let (lo, hi) = ext.axis(axis);
    let first_half = count / 2;
    let mid = (lo as i64 + sizes[axis] * first_half as i64 / count as i64) as i32;

    if index < first_half {
      if mid <= lo {
        // The first half received no points (or no cells).
        return None;
      }
      let upper = match boundary {
        Boundary::Disjoint => mid - 1,
        Boundary::SharedPoint => mid,
      };
      ext.set_axis(axis, lo, upper);
      count = first_half;
    } else {
      ext.set_axis(axis, mid, hi);
      count -= first_half;
      index -= first_half;
    }
  }

  Some(ext)
}

/// Longest splittable axis; ties go to the lowest axis index.
fn longest_axis(sizes: &[i64; 3]) -> Option<usize> {
  let mut best: Option<usize> = None;
  for (axis, &size) in sizes.iter().enumerate() {
    if size < 2 {
      continue;
    }
    match best {
      Some(b) if sizes[b] >= size => {}
      _ => best = Some(axis),
    }
  }
  best
}

#[cfg(test)]
#[path = "translator_test.rs"]
mod translator_test;
