//! Leaf datasets carried by data objects.

use std::collections::BTreeMap;

use glam::DVec3;

use crate::extent::Extent;

// =============================================================================
// ScalarType
// =============================================================================

/// On-disk / declared element type of a scalar array.
///
/// Values are always held as `f64` in memory; the type records what a reader
/// decoded from and what a writer would encode to.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ScalarType {
  U8,
  U16,
  I16,
  F32,
  #[default]
  F64,
}

impl ScalarType {
  /// Size of one element in bytes.
  pub const fn size_bytes(self) -> usize {
    match self {
      ScalarType::U8 => 1,
      ScalarType::U16 | ScalarType::I16 => 2,
      ScalarType::F32 => 4,
      ScalarType::F64 => 8,
    }
  }

  /// Decode one little-endian element. `bytes` must hold `size_bytes()` bytes.
  pub fn decode_le(self, bytes: &[u8]) -> f64 {
    match self {
      ScalarType::U8 => bytes[0] as f64,
      ScalarType::U16 => u16::from_le_bytes([bytes[0], bytes[1]]) as f64,
      ScalarType::I16 => i16::from_le_bytes([bytes[0], bytes[1]]) as f64,
      ScalarType::F32 => f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as f64,
      ScalarType::F64 => {
        let mut raw = [0u8; 8];
        raw.copy_from_slice(&bytes[..8]);
        f64::from_le_bytes(raw)
      }
    }
  }
}

// =============================================================================
// ImageData
// =============================================================================

/// Uniform grid with one scalar per point.
#[derive(Clone, Debug, PartialEq)]
pub struct ImageData {
  /// Point extent this image covers.
  pub extent: Extent,
  pub spacing: DVec3,
  pub origin: DVec3,
  pub scalar_type: ScalarType,
  /// One value per point, X fastest.
  pub scalars: Vec<f64>,
  /// Per-cell visibility: 1 visible, 0 blanked. `None` means all visible.
  pub cell_visibility: Option<Vec<u8>>,
}

impl ImageData {
  /// Zero-filled image over `extent` with unit spacing.
  pub fn new(extent: Extent) -> Self {
    Self {
      extent,
      spacing: DVec3::ONE,
      origin: DVec3::ZERO,
      scalar_type: ScalarType::F64,
      scalars: vec![0.0; extent.number_of_points()],
      cell_visibility: None,
    }
  }

  /// Image whose scalar at each point index is `f(i, j, k)`.
  pub fn from_fn(extent: Extent, mut f: impl FnMut(i32, i32, i32) -> f64) -> Self {
    let mut image = Self::new(extent);
    let mut idx = 0;
    for k in extent.0[4]..=extent.0[5] {
      for j in extent.0[2]..=extent.0[3] {
        for i in extent.0[0]..=extent.0[1] {
          image.scalars[idx] = f(i, j, k);
          idx += 1;
        }
      }
    }
    image
  }

  pub fn with_geometry(mut self, spacing: DVec3, origin: DVec3) -> Self {
    self.spacing = spacing;
    self.origin = origin;
    self
  }

  #[inline]
  pub fn scalar(&self, i: i32, j: i32, k: i32) -> Option<f64> {
    self.extent.point_index(i, j, k).map(|idx| self.scalars[idx])
  }

  /// Set one scalar; returns false when the index is outside the extent.
  pub fn set_scalar(&mut self, i: i32, j: i32, k: i32, value: f64) -> bool {
    match self.extent.point_index(i, j, k) {
      Some(idx) => {
        self.scalars[idx] = value;
        true
      }
      None => false,
    }
  }

  pub fn number_of_points(&self) -> usize {
    self.extent.number_of_points()
  }

  pub fn number_of_cells(&self) -> usize {
    self.extent.number_of_cells()
  }

  /// World position of a point index.
  pub fn point_position(&self, i: i32, j: i32, k: i32) -> DVec3 {
    self.origin + self.spacing * DVec3::new(i as f64, j as f64, k as f64)
  }

  /// Restrict the image to `extent`, dropping everything outside.
  ///
  /// Cropping to an extent that does not overlap leaves an empty image.
  pub fn crop(&mut self, extent: &Extent) {
    let Some(target) = self.extent.intersection(extent) else {
      self.scalars.clear();
      self.cell_visibility = None;
      self.extent = Extent::EMPTY;
      return;
    };
    if target == self.extent {
      return;
    }

    let mut scalars = Vec::with_capacity(target.number_of_points());
    for k in target.0[4]..=target.0[5] {
      for j in target.0[2]..=target.0[3] {
        for i in target.0[0]..=target.0[1] {
          if let Some(idx) = self.extent.point_index(i, j, k) {
            scalars.push(self.scalars[idx]);
          }
        }
      }
    }
    self.scalars = scalars;
    // Cell layout changes with the extent; visibility is regenerated on demand.
    self.cell_visibility = None;
    self.extent = target;
  }

  /// Linear cell index of the cell whose lowest corner is `(i, j, k)`.
  pub fn cell_index(&self, i: i32, j: i32, k: i32) -> Option<usize> {
    let [cx, cy, cz] = self.extent.cell_dimensions();
    let (di, dj, dk) = (i - self.extent.0[0], j - self.extent.0[2], k - self.extent.0[4]);
    if di < 0 || dj < 0 || dk < 0 {
      return None;
    }
    let (di, dj, dk) = (di as usize, dj as usize, dk as usize);
    if di >= cx || dj >= cy || dk >= cz {
      return None;
    }
    Some(dk * cx * cy + dj * cx + di)
  }

  /// Whether a cell is visible. Cells are visible when no mask is present.
  pub fn is_cell_visible(&self, cell: usize) -> bool {
    match &self.cell_visibility {
      Some(mask) => mask.get(cell).is_some_and(|&v| v != 0),
      None => cell < self.number_of_cells(),
    }
  }

  /// Replace the visibility mask.
  pub fn set_cell_visibility(&mut self, mask: Option<Vec<u8>>) {
    self.cell_visibility = mask;
  }

  /// Number of blanked cells.
  pub fn blanked_cell_count(&self) -> usize {
    self
      .cell_visibility
      .as_ref()
      .map_or(0, |mask| mask.iter().filter(|&&v| v == 0).count())
  }
}

// =============================================================================
// PointSet
// =============================================================================

/// Unstructured points with one scalar each.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PointSet {
  pub points: Vec<DVec3>,
  pub scalars: Vec<f64>,
}

impl PointSet {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn push(&mut self, point: DVec3, scalar: f64) {
    self.points.push(point);
    self.scalars.push(scalar);
  }

  pub fn len(&self) -> usize {
    self.points.len()
  }

  pub fn is_empty(&self) -> bool {
    self.points.is_empty()
  }
}

// =============================================================================
// DataSet
// =============================================================================

/// A single (non-composite) dataset.
#[derive(Clone, Debug, PartialEq)]
pub enum DataSet {
  Image(ImageData),
  Points(PointSet),
}

impl DataSet {
  pub fn as_image(&self) -> Option<&ImageData> {
    match self {
      DataSet::Image(image) => Some(image),
      DataSet::Points(_) => None,
    }
  }

  pub fn as_image_mut(&mut self) -> Option<&mut ImageData> {
    match self {
      DataSet::Image(image) => Some(image),
      DataSet::Points(_) => None,
    }
  }

  pub fn as_points(&self) -> Option<&PointSet> {
    match self {
      DataSet::Points(points) => Some(points),
      DataSet::Image(_) => None,
    }
  }

  /// Number of points or image samples.
  pub fn number_of_points(&self) -> usize {
    match self {
      DataSet::Image(image) => image.number_of_points(),
      DataSet::Points(points) => points.len(),
    }
  }
}

// =============================================================================
// FieldData
// =============================================================================

/// Named arrays that travel with a data object but are not tied to points.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FieldData {
  arrays: BTreeMap<String, Vec<f64>>,
}

impl FieldData {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn set(&mut self, name: impl Into<String>, values: Vec<f64>) {
    self.arrays.insert(name.into(), values);
  }

  pub fn get(&self, name: &str) -> Option<&[f64]> {
    self.arrays.get(name).map(Vec::as_slice)
  }

  pub fn remove(&mut self, name: &str) -> Option<Vec<f64>> {
    self.arrays.remove(name)
  }

  pub fn len(&self) -> usize {
    self.arrays.len()
  }

  pub fn is_empty(&self) -> bool {
    self.arrays.is_empty()
  }

  pub fn names(&self) -> impl Iterator<Item = &str> {
    self.arrays.keys().map(String::as_str)
  }

  /// Copy every array of `other` in, replacing arrays with the same name.
  pub fn pass_data(&mut self, other: &FieldData) {
    for (name, values) in &other.arrays {
      self.arrays.insert(name.clone(), values.clone());
    }
  }

  pub fn clear(&mut self) {
    self.arrays.clear();
  }
}
