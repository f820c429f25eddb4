//! Box-mean smoothing filter.
//!
//! Each output point is the mean of the input points within `radius` of it
//! along every axis. To produce an update extent the filter needs a halo of
//! `radius` points around it, so it asks its input for the grown extent,
//! clamped to what the input can provide.

use tracing::warn;

use crate::data::ImageData;
use crate::extent::ExtentType;
use crate::pipeline::{Algorithm, ExecuteContext, RequestContext};

pub struct ImageBoxMean {
  radius: i32,
}

impl ImageBoxMean {
  pub fn new(radius: i32) -> Self {
    Self { radius: radius.max(0) }
  }

  pub fn radius(&self) -> i32 {
    self.radius
  }

  pub fn set_radius(&mut self, radius: i32) {
    self.radius = radius.max(0);
  }
}

impl Algorithm for ImageBoxMean {
  fn name(&self) -> &str {
    "image_box_mean"
  }

  fn output_types(&self) -> Vec<ExtentType> {
    vec![ExtentType::Structured3D]
  }

  fn number_of_required_inputs(&self) -> usize {
    1
  }

  fn compute_input_update_extents(&mut self, ctx: &mut RequestContext<'_>) {
    let Some(wanted) = ctx.requesting_output().map(|o| o.update_extent()) else {
      return;
    };
    let radius = self.radius;
    if let Some(input) = ctx.input_mut(0) {
      let halo = if wanted.is_empty() {
        wanted
      } else {
        wanted.grow(radius).clamp_to(&input.whole_extent())
      };
      input.set_update_extent(halo);
    }
  }

  fn execute_data(&mut self, ctx: &mut ExecuteContext<'_>) {
    let Some((input, output)) = ctx.input_and_output(0, 0) else {
      return;
    };
    let Some(source) = input.image() else {
      warn!(filter = "image_box_mean", "input holds no image; output left empty");
      return;
    };
    let Some(extent) = output.update_extent().intersection(&source.extent) else {
      return;
    };

    let r = self.radius;
    let mut image = ImageData::new(extent).with_geometry(source.spacing, source.origin);
    image.scalar_type = source.scalar_type;
    let mut idx = 0;
    for k in extent.0[4]..=extent.0[5] {
      for j in extent.0[2]..=extent.0[3] {
        for i in extent.0[0]..=extent.0[1] {
          let (mut sum, mut n) = (0.0, 0u32);
          for dk in -r..=r {
            for dj in -r..=r {
              for di in -r..=r {
                if let Some(value) = source.scalar(i + di, j + dj, k + dk) {
                  sum += value;
                  n += 1;
                }
              }
            }
          }
          image.scalars[idx] = if n > 0 { sum / n as f64 } else { 0.0 };
          idx += 1;
        }
      }
    }
    output.set_image(image);
  }
}
