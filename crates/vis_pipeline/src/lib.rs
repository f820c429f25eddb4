//! vis_pipeline - Demand-driven visualization pipeline
//!
//! Data flows downstream from sources through filters; requests flow
//! upstream. Nothing executes until a consumer pulls a data object, and then
//! only the producers whose output is stale or does not cover the request
//! run.
//!
//! ```text
//!   ┌──────────────┐  output   ┌──────────────┐  output   ┌──────────┐
//!   │ ImageSource  ├──────────►│ ImageBoxMean ├──────────►│ consumer │
//!   └──────────────┘           └──────────────┘           └────┬─────┘
//!          ▲ request + halo           ▲ request                 │ update()
//!          └──────────────────────────┴─────────────────────────┘
//! ```
//!
//! # Features
//!
//! - **Four-phase update**: information, request propagation, asynchronous
//!   trigger, data; each phase idempotent when nothing upstream changed
//! - **Streaming**: structured extents and piece requests, split by
//!   [`ExtentTranslator`] with ghost levels
//! - **Composite data**: multi-block, hierarchical and AMR box datasets with
//!   leaf visitors
//! - **Observers**: Start / Progress / End events and cooperative abort
//!
//! # Example
//!
//! ```ignore
//! use vis_pipeline::{Extent, ImageSource, ImageBoxMean, Piece, Pipeline};
//!
//! let mut pipeline = Pipeline::new();
//! let source = pipeline.add_process(ImageSource::new(Extent::new(0, 63, 0, 63, 0, 63), |p| p.length()));
//! let smooth = pipeline.add_process(ImageBoxMean::new(1));
//! pipeline.set_input(smooth, 0, Some(pipeline.output(source, 0)?))?;
//!
//! // Stream the result in 8 pieces.
//! let out = pipeline.output(smooth, 0)?;
//! for index in 0..8 {
//!     pipeline.data_mut(out)?.set_update_piece(Piece::new(index, 8, 0));
//!     pipeline.update(out)?;
//! }
//! ```

pub mod composite;
pub mod config;
pub mod data;
pub mod error;
pub mod extent;
pub mod metrics;
pub mod pipeline;
pub mod sources;
pub mod time;

pub use composite::{
  AmrBox, CompositeDataSet, DataNode, HierarchicalBoxDataSet, HierarchicalDataSet, MultiBlockDataSet, NodeRef, Slot,
};
pub use config::PipelineConfig;
pub use data::{Content, DataObject, DataSet, FieldData, ImageData, PointSet, ScalarType, UpdateState};
pub use error::{PhaseStatus, PipelineError, ReaderError};
pub use extent::{Addressing, Extent, ExtentTranslator, ExtentType, Piece, SplitMode};
pub use metrics::PipelineMetrics;
pub use pipeline::{
  AbortHandle, Algorithm, ChannelCommand, Command, DataId, Event, EventKind, ExecuteContext, InformationContext,
  ObserverTag, Pipeline, ProcessId, RequestContext, UpdateOutcome,
};
pub use sources::{ImageBoxMean, ImageSource, PerLeafFilter, PointSource, RawImageReader};
pub use time::TimeStamp;
