//! Built-in producers.
//!
//! | Producer          | Output     | Inputs | Streaming                          |
//! |-------------------|------------|--------|------------------------------------|
//! | `ImageSource`     | structured | 0      | generates only the update extent   |
//! | `RawImageReader`  | structured | 0      | reads only the update extent       |
//! | `PointSource`     | pieces     | 0      | declares a maximum piece count     |
//! | `ImageBoxMean`    | structured | 1      | requests a halo of `radius` points |
//! | `PerLeafFilter`   | pieces     | 1      | passes the request through         |

pub mod box_mean;
pub mod image_source;
pub mod per_leaf;
pub mod point_source;
pub mod raw_reader;

pub use box_mean::ImageBoxMean;
pub use image_source::{ImageSource, ScalarField};
pub use per_leaf::{LeafOperation, PerLeafFilter};
pub use point_source::PointSource;
pub use raw_reader::RawImageReader;
