//! Synthetic structured source.

use glam::DVec3;

use crate::data::{ImageData, ImageInformation, ScalarType};
use crate::extent::{Extent, ExtentType};
use crate::pipeline::{Algorithm, ExecuteContext, InformationContext};

/// Scalar field evaluated at a world position.
pub type ScalarField = Box<dyn Fn(DVec3) -> f64 + Send + Sync>;

/// Samples a scalar field on a uniform grid.
///
/// Only the requested update extent is generated, so downstream streaming
/// (pieces, slabs, halos) translates directly into less work here. Progress
/// is reported once per Z slice.
pub struct ImageSource {
  whole_extent: Extent,
  spacing: DVec3,
  origin: DVec3,
  field: ScalarField,
}

impl ImageSource {
  pub fn new(whole_extent: Extent, field: impl Fn(DVec3) -> f64 + Send + Sync + 'static) -> Self {
    Self {
      whole_extent,
      spacing: DVec3::ONE,
      origin: DVec3::ZERO,
      field: Box::new(field),
    }
  }

  pub fn with_geometry(mut self, spacing: DVec3, origin: DVec3) -> Self {
    self.spacing = spacing;
    self.origin = origin;
    self
  }

  pub fn whole_extent(&self) -> Extent {
    self.whole_extent
  }

  /// Changing the extent through `Pipeline::algorithm_mut` marks the process
  /// modified.
  pub fn set_whole_extent(&mut self, whole_extent: Extent) {
    self.whole_extent = whole_extent;
  }
}

impl Algorithm for ImageSource {
  fn name(&self) -> &str {
    "image_source"
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
        scalar_type: ScalarType::F64,
      });
    }
  }

  fn execute_data(&mut self, ctx: &mut ExecuteContext<'_>) {
    let Some(request) = ctx.output(0).map(|o| o.update_extent()) else {
      return;
    };
    let Some(extent) = request.intersection(&self.whole_extent) else {
      return;
    };

    let mut image = ImageData::new(extent).with_geometry(self.spacing, self.origin);
    let (k0, k1) = extent.axis(2);
    let slices = (k1 - k0 + 1) as f64;
    let mut idx = 0;
    for k in k0..=k1 {
      if ctx.abort_requested() {
        break;
      }
      for j in extent.0[2]..=extent.0[3] {
        for i in extent.0[0]..=extent.0[1] {
          image.scalars[idx] = (self.field)(image.point_position(i, j, k));
          idx += 1;
        }
      }
      ctx.update_progress((k - k0 + 1) as f64 / slices);
    }

    if let Some(output) = ctx.output_mut(0) {
      output.set_image(image);
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::extent::Piece;
  use crate::pipeline::Pipeline;

  fn linear(p: DVec3) -> f64 {
    p.x + 10.0 * p.y + 100.0 * p.z
  }

  #[test]
  fn test_generates_only_the_request() {
    let mut pipeline = Pipeline::new();
    let source = pipeline.add_process(ImageSource::new(Extent::new(0, 7, 0, 7, 0, 7), linear));
    let out = pipeline.output(source, 0).unwrap();

    pipeline.data_mut(out).unwrap().set_update_piece(Piece::new(3, 4, 0));
    pipeline.update(out).unwrap();

    let image = pipeline.data(out).unwrap().image().unwrap();
    assert_eq!(image.extent, Extent::new(4, 7, 4, 7, 0, 7));
    assert_eq!(image.scalar(5, 6, 7), Some(5.0 + 60.0 + 700.0));
  }

  #[test]
  fn test_geometry_reaches_information() {
    let mut pipeline = Pipeline::new();
    let source = pipeline.add_process(
      ImageSource::new(Extent::new(0, 3, 0, 3, 0, 0), linear)
        .with_geometry(DVec3::splat(0.5), DVec3::new(1.0, 0.0, 0.0)),
    );
    let out = pipeline.output(source, 0).unwrap();

    pipeline.update_information(out).unwrap();
    let info = *pipeline.data(out).unwrap().information();
    assert_eq!(info.spacing, DVec3::splat(0.5));

    pipeline.update(out).unwrap();
    let image = pipeline.data(out).unwrap().image().unwrap();
    assert_eq!(image.scalar(2, 0, 0), Some(2.0));
  }

  #[test]
  fn test_changing_whole_extent_reexecutes() {
    let mut pipeline = Pipeline::new();
    let source = pipeline.add_process(ImageSource::new(Extent::new(0, 3, 0, 3, 0, 0), linear));
    let out = pipeline.output(source, 0).unwrap();
    pipeline.update(out).unwrap();

    pipeline
      .algorithm_mut::<ImageSource>(source)
      .unwrap()
      .unwrap()
      .set_whole_extent(Extent::new(0, 5, 0, 5, 0, 0));
    pipeline.update_whole_extent(source).unwrap();

    assert_eq!(pipeline.data(out).unwrap().extent(), Extent::new(0, 5, 0, 5, 0, 0));
  }
}
