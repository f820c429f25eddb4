//! Extents and piece requests - the two ways a dataset is addressed.
//!
//! Structured datasets (images, uniform grids) are addressed by an inclusive
//! integer index box. Unstructured datasets are addressed by a partition
//! index out of a piece count, plus a number of ghost (halo) levels.
//!
//! ```text
//! Extent3D:  [xmin, xmax, ymin, ymax, zmin, zmax]   (inclusive, point indices)
//!
//!            ymax ┌───────────┐
//!                 │           │     empty on an axis when  lo == hi + 1
//!                 │           │
//!            ymin └───────────┘
//!                xmin       xmax
//!
//! Pieces:    (piece, number_of_pieces, ghost_level)
//!            empty when number_of_pieces == 0
//! ```

use std::fmt;

use glam::IVec3;

pub mod translator;

pub use translator::{split_extent, split_extent_by_points, ExtentTranslator, SplitMode};

// =============================================================================
// Extent
// =============================================================================

/// Inclusive 3D index box `[xmin, xmax, ymin, ymax, zmin, zmax]`.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Extent(pub [i32; 6]);

impl Extent {
  /// The canonical "nothing" extent.
  pub const EMPTY: Self = Self([0, -1, 0, -1, 0, -1]);

  /// Create an extent from its six bounds.
  pub const fn new(xmin: i32, xmax: i32, ymin: i32, ymax: i32, zmin: i32, zmax: i32) -> Self {
    Self([xmin, xmax, ymin, ymax, zmin, zmax])
  }

  /// Create an extent from inclusive low and high corners.
  pub fn from_corners(lo: IVec3, hi: IVec3) -> Self {
    Self([lo.x, hi.x, lo.y, hi.y, lo.z, hi.z])
  }

  /// Low corner.
  #[inline]
  pub fn lo(&self) -> IVec3 {
    IVec3::new(self.0[0], self.0[2], self.0[4])
  }

  /// High corner.
  #[inline]
  pub fn hi(&self) -> IVec3 {
    IVec3::new(self.0[1], self.0[3], self.0[5])
  }

  /// Bounds `(lo, hi)` along one axis (0 = X, 1 = Y, 2 = Z).
  #[inline]
  pub fn axis(&self, axis: usize) -> (i32, i32) {
    (self.0[axis * 2], self.0[axis * 2 + 1])
  }

  /// Replace the bounds along one axis.
  #[inline]
  pub fn set_axis(&mut self, axis: usize, lo: i32, hi: i32) {
    self.0[axis * 2] = lo;
    self.0[axis * 2 + 1] = hi;
  }

  /// True when the extent selects nothing: `lo == hi + 1` on some axis.
  ///
  /// This is the standard "I want nothing" request, distinct from an inverted
  /// (invalid) extent.
  pub fn is_empty(&self) -> bool {
    (0..3).any(|axis| {
      let (lo, hi) = self.axis(axis);
      lo == hi.wrapping_add(1)
    })
  }

  /// True when `lo <= hi` on every axis.
  pub fn is_valid(&self) -> bool {
    (0..3).all(|axis| {
      let (lo, hi) = self.axis(axis);
      lo <= hi
    })
  }

  /// Component-wise containment: `other` lies entirely inside `self`.
  pub fn contains(&self, other: &Extent) -> bool {
    (0..3).all(|axis| {
      let (lo, hi) = self.axis(axis);
      let (olo, ohi) = other.axis(axis);
      olo >= lo && ohi <= hi
    })
  }

  /// Check whether a point index lies inside the extent.
  #[inline]
  pub fn contains_point(&self, i: i32, j: i32, k: i32) -> bool {
    i >= self.0[0] && i <= self.0[1] && j >= self.0[2] && j <= self.0[3] && k >= self.0[4] && k <= self.0[5]
  }

  /// Number of point indices along each axis (0 for inverted axes).
  pub fn dimensions(&self) -> [usize; 3] {
    [0, 1, 2].map(|axis| {
      let (lo, hi) = self.axis(axis);
      if hi < lo {
        0
      } else {
        (hi as i64 - lo as i64 + 1) as usize
      }
    })
  }

  /// Total number of points.
  pub fn number_of_points(&self) -> usize {
    self.dimensions().iter().product()
  }

  /// Number of cells along each axis.
  ///
  /// A flat axis (one point) counts as one cell layer so that 2D and 1D
  /// extents still have cells.
  pub fn cell_dimensions(&self) -> [usize; 3] {
    let dims = self.dimensions();
    if dims.contains(&0) {
      return [0; 3];
    }
    dims.map(|d| if d > 1 { d - 1 } else { 1 })
  }

  /// Total number of cells.
  pub fn number_of_cells(&self) -> usize {
    self.cell_dimensions().iter().product()
  }

  /// Overlap of two extents, `None` when they do not intersect.
  pub fn intersection(&self, other: &Extent) -> Option<Extent> {
    let mut out = *self;
    for axis in 0..3 {
      let (lo, hi) = self.axis(axis);
      let (olo, ohi) = other.axis(axis);
      let (nlo, nhi) = (lo.max(olo), hi.min(ohi));
      if nlo > nhi {
        return None;
      }
      out.set_axis(axis, nlo, nhi);
    }
    Some(out)
  }

  /// Grow the extent by `levels` indices on every side.
  pub fn grow(&self, levels: i32) -> Extent {
    let mut out = *self;
    for axis in 0..3 {
      let (lo, hi) = self.axis(axis);
      out.set_axis(axis, lo - levels, hi + levels);
    }
    out
  }

  /// Clamp each bound into `bounds`.
  pub fn clamp_to(&self, bounds: &Extent) -> Extent {
    let mut out = *self;
    for axis in 0..3 {
      let (lo, hi) = self.axis(axis);
      let (blo, bhi) = bounds.axis(axis);
      out.set_axis(axis, lo.clamp(blo, bhi), hi.clamp(blo, bhi));
    }
    out
  }

  /// Linear index of a point inside this extent, X fastest.
  pub fn point_index(&self, i: i32, j: i32, k: i32) -> Option<usize> {
    if !self.contains_point(i, j, k) {
      return None;
    }
    let [nx, ny, _] = self.dimensions();
    let (di, dj, dk) = (
      (i - self.0[0]) as usize,
      (j - self.0[2]) as usize,
      (k - self.0[4]) as usize,
    );
    Some(dk * nx * ny + dj * nx + di)
  }
}

impl Default for Extent {
  fn default() -> Self {
    Self::EMPTY
  }
}

impl From<[i32; 6]> for Extent {
  fn from(bounds: [i32; 6]) -> Self {
    Self(bounds)
  }
}

impl fmt::Debug for Extent {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    fmt::Display::fmt(self, f)
  }
}

impl fmt::Display for Extent {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let e = &self.0;
    write!(f, "[{},{},{},{},{},{}]", e[0], e[1], e[2], e[3], e[4], e[5])
  }
}

// =============================================================================
// Piece
// =============================================================================

/// Partition request for piece-addressed datasets.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Piece {
  /// Partition index in `0..count`.
  pub index: i32,
  /// Total number of partitions. Zero means "nothing".
  pub count: i32,
  /// Halo layers requested beyond the exclusive region.
  pub ghost_level: i32,
}

impl Piece {
  /// The whole dataset as a single piece.
  pub const WHOLE: Self = Self::new(0, 1, 0);

  /// Nothing held or requested.
  pub const NONE: Self = Self::new(0, 0, 0);

  pub const fn new(index: i32, count: i32, ghost_level: i32) -> Self {
    Self {
      index,
      count,
      ghost_level,
    }
  }

  /// A request for zero pieces.
  #[inline]
  pub fn is_empty(&self) -> bool {
    self.count == 0
  }

  /// Index inside `0..count` and a non-negative ghost level.
  pub fn is_valid(&self) -> bool {
    self.count > 0 && self.index >= 0 && self.index < self.count && self.ghost_level >= 0
  }
}

// =============================================================================
// Addressing
// =============================================================================

/// The addressing mode a data object uses.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ExtentType {
  /// Unstructured data addressed by `(piece, count, ghost_level)`.
  Pieces,
  /// Structured data addressed by a 3D index box.
  Structured3D,
}

/// A request or holding, in the addressing mode of its data object.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Addressing {
  /// Piece-addressed.
  Pieces(Piece),
  /// Extent-addressed.
  Extent3D(Extent),
}

impl Addressing {
  /// Everything a dataset of the given type can produce.
  pub fn whole(extent_type: ExtentType, whole_extent: &Extent) -> Self {
    match extent_type {
      ExtentType::Pieces => Addressing::Pieces(Piece::WHOLE),
      ExtentType::Structured3D => Addressing::Extent3D(*whole_extent),
    }
  }

  /// The empty holding of the given type.
  pub fn empty(extent_type: ExtentType) -> Self {
    match extent_type {
      ExtentType::Pieces => Addressing::Pieces(Piece::NONE),
      ExtentType::Structured3D => Addressing::Extent3D(Extent::EMPTY),
    }
  }

  /// Mode of this value.
  pub fn extent_type(&self) -> ExtentType {
    match self {
      Addressing::Pieces(_) => ExtentType::Pieces,
      Addressing::Extent3D(_) => ExtentType::Structured3D,
    }
  }

  /// True for zero pieces or a zero-volume extent.
  pub fn is_empty(&self) -> bool {
    match self {
      Addressing::Pieces(piece) => piece.is_empty(),
      Addressing::Extent3D(extent) => extent.is_empty(),
    }
  }

  /// The extent, if extent-addressed.
  pub fn as_extent(&self) -> Option<&Extent> {
    match self {
      Addressing::Extent3D(extent) => Some(extent),
      Addressing::Pieces(_) => None,
    }
  }

  /// The piece, if piece-addressed.
  pub fn as_piece(&self) -> Option<&Piece> {
    match self {
      Addressing::Pieces(piece) => Some(piece),
      Addressing::Extent3D(_) => None,
    }
  }
}
