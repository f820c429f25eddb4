//! Data objects and the leaf datasets they carry.

pub mod dataset;
pub mod object;

pub use dataset::{DataSet, FieldData, ImageData, PointSet, ScalarType};
pub use object::{Content, DataObject, ImageInformation, UpdateState};
