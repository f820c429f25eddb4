//! Header-less raw volume reader.
//!
//! The file holds the whole extent as tightly packed little-endian scalars,
//! X fastest, then Y, then Z. Only the rows covering the update extent are
//! read.

use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use glam::DVec3;
use tracing::{debug, error};

use crate::data::{ImageData, ImageInformation, ScalarType};
use crate::error::ReaderError;
use crate::extent::{Extent, ExtentType};
use crate::pipeline::{Algorithm, ExecuteContext, InformationContext};

pub struct RawImageReader {
  path: Option<PathBuf>,
  whole_extent: Extent,
  scalar_type: ScalarType,
  spacing: DVec3,
  origin: DVec3,
}

impl Default for RawImageReader {
  fn default() -> Self {
    Self {
      path: None,
      whole_extent: Extent::EMPTY,
      scalar_type: ScalarType::U8,
      spacing: DVec3::ONE,
      origin: DVec3::ZERO,
    }
  }
}

impl RawImageReader {
  pub fn new(path: impl Into<PathBuf>, whole_extent: Extent, scalar_type: ScalarType) -> Self {
    Self {
      path: Some(path.into()),
      whole_extent,
      scalar_type,
      ..Self::default()
    }
  }

  pub fn with_geometry(mut self, spacing: DVec3, origin: DVec3) -> Self {
    self.spacing = spacing;
    self.origin = origin;
    self
  }

  pub fn path(&self) -> Option<&Path> {
    self.path.as_deref()
  }

  pub fn set_path(&mut self, path: impl Into<PathBuf>) {
    self.path = Some(path.into());
  }

  /// Bytes the file must hold for the declared whole extent.
  pub fn expected_len(&self) -> u64 {
    self.whole_extent.number_of_points() as u64 * self.scalar_type.size_bytes() as u64
  }

  /// Read `extent` (clamped to the whole extent) from the file.
  pub fn read_extent(&self, extent: &Extent) -> Result<ImageData, ReaderError> {
    let path = self.path.as_ref().ok_or(ReaderError::NotConfigured("file path"))?;
    if !self.whole_extent.is_valid() {
      return Err(ReaderError::NotConfigured("whole extent"));
    }
    let display = path.display().to_string();
    let io_err = |source| ReaderError::Io {
      path: display.clone(),
      source,
    };

    let file = File::open(path).map_err(io_err)?;
    let actual = file.metadata().map_err(io_err)?.len();
    let expected = self.expected_len();
    if actual < expected {
      return Err(ReaderError::SizeMismatch {
        path: display.clone(),
        expected,
        actual,
      });
    }

    let mut image = ImageData::new(Extent::EMPTY).with_geometry(self.spacing, self.origin);
    image.scalar_type = self.scalar_type;
    let Some(target) = extent.intersection(&self.whole_extent) else {
      return Ok(image);
    };
    image.extent = target;
    image.scalars = Vec::with_capacity(target.number_of_points());

    let [nx, ny, _] = self.whole_extent.dimensions();
    let size = self.scalar_type.size_bytes();
    let row_points = target.dimensions()[0];
    let mut row = vec![0u8; row_points * size];
    let mut reader = BufReader::new(file);
    let w = self.whole_extent.0;

    for k in target.0[4]..=target.0[5] {
      for j in target.0[2]..=target.0[3] {
        let first = ((k - w[4]) as u64 * ny as u64 + (j - w[2]) as u64) * nx as u64 + (target.0[0] - w[0]) as u64;
        reader.seek(SeekFrom::Start(first * size as u64)).map_err(io_err)?;
        reader.read_exact(&mut row).map_err(io_err)?;
        image
          .scalars
          .extend(row.chunks_exact(size).map(|bytes| self.scalar_type.decode_le(bytes)));
      }
    }
    Ok(image)
  }
}

impl Algorithm for RawImageReader {
  fn name(&self) -> &str {
    "raw_image_reader"
  }

  fn output_types(&self) -> Vec<ExtentType> {
    vec![ExtentType::Structured3D]
  }

  fn execute_information(&mut self, ctx: &mut InformationContext<'_>) {
    if let Some(output) = ctx.output_mut(0) {
      output.set_whole_extent(self.whole_extent);
      output.set_information(ImageInformation {
        spacing: self.spacing,
        origin: self.origin,
        scalar_type: self.scalar_type,
      });
    }
  }

  fn execute_data(&mut self, ctx: &mut ExecuteContext<'_>) {
    let Some(request) = ctx.output(0).map(|o| o.update_extent()) else {
      return;
    };
    match self.read_extent(&request) {
      Ok(image) => {
        debug!(extent = %image.extent, "raw volume read");
        if let Some(output) = ctx.output_mut(0) {
          output.set_image(image);
        }
      }
      Err(err) => {
        error!(%err, request = %request, "raw volume read failed; output left empty");
        ctx.report_failure();
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use std::io::Write;

  use super::*;
  use crate::pipeline::Pipeline;

  const WHOLE: Extent = Extent::new(0, 3, 0, 2, 0, 1);

  /// Bytes of a volume whose u16 value at (i, j, k) is `i + 10 j + 100 k`.
  fn volume_bytes() -> Vec<u8> {
    let mut bytes = Vec::new();
    for k in 0..=1u16 {
      for j in 0..=2u16 {
        for i in 0..=3u16 {
          bytes.extend_from_slice(&(i + 10 * j + 100 * k).to_le_bytes());
        }
      }
    }
    bytes
  }

  fn write_volume() -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(&volume_bytes()).unwrap();
    file.flush().unwrap();
    file
  }

  #[test]
  fn test_reads_only_requested_sub_extent() {
    let file = write_volume();
    let reader = RawImageReader::new(file.path(), WHOLE, ScalarType::U16);

    let image = reader.read_extent(&Extent::new(1, 2, 1, 2, 1, 1)).unwrap();
    assert_eq!(image.extent, Extent::new(1, 2, 1, 2, 1, 1));
    assert_eq!(image.scalars, vec![111.0, 112.0, 121.0, 122.0]);
    assert_eq!(image.scalar_type, ScalarType::U16);
  }

  #[test]
  fn test_short_file_is_rejected() {
    let file = write_volume();
    let reader = RawImageReader::new(file.path(), Extent::new(0, 3, 0, 2, 0, 2), ScalarType::U16);
    let err = reader.read_extent(&WHOLE).unwrap_err();
    assert!(matches!(
      err,
      ReaderError::SizeMismatch {
        expected: 72,
        actual: 48,
        ..
      }
    ));
  }

  #[test]
  fn test_unconfigured_reader() {
    let reader = RawImageReader::default();
    assert!(matches!(
      reader.read_extent(&WHOLE),
      Err(ReaderError::NotConfigured(_))
    ));
  }

  #[test]
  fn test_streams_through_pipeline() {
    let file = write_volume();
    let mut pipeline = Pipeline::new();
    let reader = pipeline.add_process(
      RawImageReader::new(file.path(), WHOLE, ScalarType::U16).with_geometry(DVec3::splat(2.0), DVec3::ZERO),
    );
    let out = pipeline.output(reader, 0).unwrap();

    pipeline.update_information(out).unwrap();
    let object = pipeline.data(out).unwrap();
    assert_eq!(object.whole_extent(), WHOLE);
    assert_eq!(object.information().scalar_type, ScalarType::U16);

    pipeline.data_mut(out).unwrap().set_update_extent(Extent::new(0, 3, 2, 2, 0, 1));
    pipeline.update(out).unwrap();
    let image = pipeline.data(out).unwrap().image().unwrap();
    assert_eq!(image.scalar(3, 2, 1), Some(123.0));
    assert_eq!(image.spacing, DVec3::splat(2.0));
  }

  #[test]
  fn test_missing_file_leaves_output_empty() {
    let dir = tempfile::tempdir().unwrap();
    let mut pipeline = Pipeline::new();
    let reader = pipeline.add_process(RawImageReader::new(dir.path().join("missing.raw"), WHOLE, ScalarType::U8));
    let out = pipeline.output(reader, 0).unwrap();

    pipeline.update(out).unwrap();
    assert!(pipeline.data(out).unwrap().content().is_empty());
  }

  #[test]
  fn test_failed_read_is_retried_on_next_update() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("late.raw");
    let mut pipeline = Pipeline::new();
    let reader = pipeline.add_process(RawImageReader::new(&path, WHOLE, ScalarType::U16));
    let out = pipeline.output(reader, 0).unwrap();

    pipeline.update(out).unwrap();
    let object = pipeline.data(out).unwrap();
    assert!(object.content().is_empty());
    assert!(object.data_released());

    // The file appears; nothing about the reader changed.
    std::fs::write(&path, volume_bytes()).unwrap();
    pipeline.update(out).unwrap();

    let object = pipeline.data(out).unwrap();
    assert!(!object.data_released());
    assert_eq!(object.image().unwrap().scalar(3, 2, 1), Some(123.0));
  }
}
