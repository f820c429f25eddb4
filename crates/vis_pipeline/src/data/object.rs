//! DataObject - the consumer-facing half of the update protocol.
//!
//! A data object records what its producer can make (`whole_extent`), what it
//! currently holds (`held`), what downstream wants (`request`), and the
//! timestamps that decide whether the held data is stale.
//!
//! ```text
//!              whole_extent  ──  everything the producer can make
//!                   ▲
//!   request ⊆ whole ┤  verify_update_extent()
//!                   │
//!   held ⊇ request ─┘  otherwise "outside of the extent": re-execute
//! ```
//!
//! The object never owns its producer; `source` is a plain handle into the
//! pipeline arena and the process owns the object.

use glam::DVec3;
use smallvec::SmallVec;
use tracing::{error, warn};

use super::dataset::{DataSet, FieldData, ImageData, ScalarType};
use crate::composite::CompositeDataSet;
use crate::extent::{Addressing, Extent, ExtentTranslator, ExtentType, Piece};
use crate::pipeline::ProcessId;
use crate::time::TimeStamp;

/// Where an object is within one update cycle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum UpdateState {
  #[default]
  Unrequested,
  InformationPropagated,
  ExtentPropagated,
  AsyncTriggered,
  DataUpdated,
}

/// Geometry and type of structured data, known before execution.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ImageInformation {
  pub spacing: DVec3,
  pub origin: DVec3,
  pub scalar_type: ScalarType,
}

impl Default for ImageInformation {
  fn default() -> Self {
    Self {
      spacing: DVec3::ONE,
      origin: DVec3::ZERO,
      scalar_type: ScalarType::F64,
    }
  }
}

/// Payload held by a data object.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum Content {
  #[default]
  Empty,
  Leaf(DataSet),
  Composite(CompositeDataSet),
}

impl Content {
  pub fn is_empty(&self) -> bool {
    matches!(self, Content::Empty)
  }

  pub fn as_image(&self) -> Option<&ImageData> {
    match self {
      Content::Leaf(dataset) => dataset.as_image(),
      _ => None,
    }
  }

  pub fn as_image_mut(&mut self) -> Option<&mut ImageData> {
    match self {
      Content::Leaf(dataset) => dataset.as_image_mut(),
      _ => None,
    }
  }

  pub fn as_leaf(&self) -> Option<&DataSet> {
    match self {
      Content::Leaf(dataset) => Some(dataset),
      _ => None,
    }
  }

  pub fn as_composite(&self) -> Option<&CompositeDataSet> {
    match self {
      Content::Composite(composite) => Some(composite),
      _ => None,
    }
  }
}

/// A node of the pipeline graph that carries data.
#[derive(Debug)]
pub struct DataObject {
  extent_type: ExtentType,
  whole_extent: Extent,
  held: Addressing,
  request: Addressing,
  /// Piece request on a structured object, re-translated whenever the whole
  /// extent changes.
  piece_request: Option<Piece>,
  /// Piece a structured `held` extent was generated for.
  held_piece: Option<Piece>,
  update_extent_initialized: bool,
  request_exact_extent: bool,
  /// -1 means unlimited.
  maximum_number_of_pieces: i32,

  mtime: TimeStamp,
  pipeline_mtime: TimeStamp,
  update_time: TimeStamp,

  data_released: bool,
  release_data_flag: bool,
  locality: f64,
  last_update_extent_was_outside: bool,
  pub(crate) state: UpdateState,

  translator: ExtentTranslator,
  information: ImageInformation,
  field_data: FieldData,
  content: Content,

  pub(crate) source: Option<ProcessId>,
  pub(crate) consumers: SmallVec<[ProcessId; 2]>,
}

impl DataObject {
  /// Empty object of the given addressing mode.
  pub fn new(extent_type: ExtentType) -> Self {
    Self {
      extent_type,
      whole_extent: Extent::EMPTY,
      held: Addressing::empty(extent_type),
      request: Addressing::empty(extent_type),
      piece_request: None,
      held_piece: None,
      update_extent_initialized: false,
      request_exact_extent: false,
      maximum_number_of_pieces: -1,
      mtime: TimeStamp::now(),
      pipeline_mtime: TimeStamp::NEVER,
      update_time: TimeStamp::NEVER,
      data_released: true,
      release_data_flag: false,
      locality: 0.0,
      last_update_extent_was_outside: false,
      state: UpdateState::Unrequested,
      translator: ExtentTranslator::default(),
      information: ImageInformation::default(),
      field_data: FieldData::new(),
      content: Content::Empty,
      source: None,
      consumers: SmallVec::new(),
    }
  }

  /// Structured object holding `image`; its extent becomes the held extent.
  pub fn from_image(image: ImageData) -> Self {
    let mut object = Self::new(ExtentType::Structured3D);
    object.set_image(image);
    object
  }

  /// Piece-addressed object holding `dataset` as the whole (piece 0 of 1).
  pub fn from_pieces(dataset: DataSet) -> Self {
    let mut object = Self::new(ExtentType::Pieces);
    object.content = Content::Leaf(dataset);
    object.held = Addressing::Pieces(Piece::WHOLE);
    object.data_released = false;
    object
  }

  /// Composite object; composites use piece addressing for their requests.
  pub fn from_composite(composite: CompositeDataSet) -> Self {
    let mut object = Self::new(ExtentType::Pieces);
    object.content = Content::Composite(composite);
    object.held = Addressing::Pieces(Piece::WHOLE);
    object.data_released = false;
    object
  }

  // ---------------------------------------------------------------------------
  // Accessors
  // ---------------------------------------------------------------------------

  pub fn extent_type(&self) -> ExtentType {
    self.extent_type
  }

  pub fn whole_extent(&self) -> Extent {
    self.whole_extent
  }

  /// What the object currently holds.
  pub fn held(&self) -> Addressing {
    self.held
  }

  /// Held extent for structured objects, `EMPTY` otherwise.
  pub fn extent(&self) -> Extent {
    self.held.as_extent().copied().unwrap_or(Extent::EMPTY)
  }

  /// Held piece. Structured objects report the piece their held extent was
  /// generated for, if it came from a piece request.
  pub fn piece(&self) -> Option<Piece> {
    match self.held {
      Addressing::Pieces(piece) => Some(piece),
      Addressing::Extent3D(_) => self.held_piece,
    }
  }

  /// What downstream currently wants.
  pub fn request(&self) -> Addressing {
    self.request
  }

  /// Requested extent for structured objects, `EMPTY` otherwise.
  pub fn update_extent(&self) -> Extent {
    self.request.as_extent().copied().unwrap_or(Extent::EMPTY)
  }

  /// Requested piece for piece-addressed objects, or the piece a structured
  /// request was translated from.
  pub fn update_piece(&self) -> Option<Piece> {
    match self.request {
      Addressing::Pieces(piece) => Some(piece),
      Addressing::Extent3D(_) => self.piece_request,
    }
  }

  pub fn update_extent_initialized(&self) -> bool {
    self.update_extent_initialized
  }

  pub fn request_exact_extent(&self) -> bool {
    self.request_exact_extent
  }

  pub fn set_request_exact_extent(&mut self, exact: bool) {
    self.request_exact_extent = exact;
  }

  pub fn maximum_number_of_pieces(&self) -> i32 {
    self.maximum_number_of_pieces
  }

  /// Declare how many pieces the producer can split this data into.
  /// Negative means unlimited.
  pub fn set_maximum_number_of_pieces(&mut self, max: i32) {
    if self.maximum_number_of_pieces != max {
      self.maximum_number_of_pieces = max;
      self.modified();
    }
  }

  pub fn mtime(&self) -> TimeStamp {
    self.mtime
  }

  pub fn pipeline_mtime(&self) -> TimeStamp {
    self.pipeline_mtime
  }

  pub(crate) fn set_pipeline_mtime(&mut self, time: TimeStamp) {
    self.pipeline_mtime = time;
  }

  pub fn update_time(&self) -> TimeStamp {
    self.update_time
  }

  pub fn data_released(&self) -> bool {
    self.data_released
  }

  pub fn release_data_flag(&self) -> bool {
    self.release_data_flag
  }

  /// Free this object's data after its consumers executed.
  pub fn set_release_data_flag(&mut self, release: bool) {
    self.release_data_flag = release;
  }

  pub fn locality(&self) -> f64 {
    self.locality
  }

  pub fn set_locality(&mut self, locality: f64) {
    self.locality = locality.clamp(0.0, 1.0);
  }

  pub fn last_update_extent_was_outside(&self) -> bool {
    self.last_update_extent_was_outside
  }

  pub fn state(&self) -> UpdateState {
    self.state
  }

  pub fn translator(&self) -> &ExtentTranslator {
    &self.translator
  }

  pub fn set_translator(&mut self, translator: ExtentTranslator) {
    self.translator = translator;
    self.retranslate_piece_request();
  }

  pub fn information(&self) -> &ImageInformation {
    &self.information
  }

  pub fn set_information(&mut self, information: ImageInformation) {
    self.information = information;
  }

  pub fn field_data(&self) -> &FieldData {
    &self.field_data
  }

  pub fn field_data_mut(&mut self) -> &mut FieldData {
    &mut self.field_data
  }

  pub fn content(&self) -> &Content {
    &self.content
  }

  pub fn content_mut(&mut self) -> &mut Content {
    &mut self.content
  }

  pub fn image(&self) -> Option<&ImageData> {
    self.content.as_image()
  }

  /// Producer of this object, if any.
  pub fn source(&self) -> Option<ProcessId> {
    self.source
  }

  /// Processes reading this object. Introspection only.
  pub fn consumers(&self) -> &[ProcessId] {
    &self.consumers
  }

  // ---------------------------------------------------------------------------
  // Content
  // ---------------------------------------------------------------------------

  /// Replace the content with `image`. The held extent follows the image.
  /// Logs and ignores the call on a piece-addressed object.
  pub fn set_image(&mut self, image: ImageData) {
    if self.extent_type != ExtentType::Structured3D {
      error!(
        extent = %image.extent,
        "set_image on a piece-addressed data object; ignored"
      );
      return;
    }
    self.held = Addressing::Extent3D(image.extent);
    self.information = ImageInformation {
      spacing: image.spacing,
      origin: image.origin,
      scalar_type: image.scalar_type,
    };
    self.content = Content::Leaf(DataSet::Image(image));
    self.data_released = false;
    self.modified();
  }

  /// Replace the content without touching the held extent or piece.
  pub fn set_content(&mut self, content: Content) {
    self.content = content;
    self.data_released = false;
    self.modified();
  }

  /// Set the held extent of a structured object.
  pub fn set_extent(&mut self, extent: Extent) {
    match self.extent_type {
      ExtentType::Structured3D => {
        self.held = Addressing::Extent3D(extent);
        self.modified();
      }
      ExtentType::Pieces => {
        error!(%extent, "set_extent on a piece-addressed data object; ignored");
      }
    }
  }

  /// Set the whole extent directly. Producers do this in execute_information.
  pub fn set_whole_extent(&mut self, whole: Extent) {
    if self.whole_extent != whole {
      self.whole_extent = whole;
      self.retranslate_piece_request();
    }
  }

  // ---------------------------------------------------------------------------
  // Requests
  // ---------------------------------------------------------------------------

  /// Request a sub-extent of a structured object.
  pub fn set_update_extent(&mut self, extent: Extent) {
    match self.extent_type {
      ExtentType::Structured3D => {
        self.update_extent_initialized = true;
        self.piece_request = None;
        self.request = Addressing::Extent3D(extent);
      }
      ExtentType::Pieces => {
        error!(%extent, "structured update extent on a piece-addressed data object; ignored");
      }
    }
  }

  /// Request a piece. Structured objects translate it against the whole
  /// extent now and again whenever the whole extent changes.
  pub fn set_update_piece(&mut self, piece: Piece) {
    self.update_extent_initialized = true;
    match self.extent_type {
      ExtentType::Pieces => {
        self.piece_request = None;
        self.request = Addressing::Pieces(piece);
      }
      ExtentType::Structured3D => {
        self.piece_request = Some(piece);
        self.retranslate_piece_request();
      }
    }
  }

  /// Request everything. Clears the initialized flag so later whole-extent
  /// changes are followed automatically.
  pub fn set_update_extent_to_whole_extent(&mut self) {
    self.piece_request = None;
    self.request = Addressing::whole(self.extent_type, &self.whole_extent);
    self.update_extent_initialized = false;
  }

  /// Copy the request of `other` when both use the same addressing mode.
  pub fn copy_update_extent_from(&mut self, other: &DataObject) {
    match (self.extent_type, other.request) {
      (ExtentType::Structured3D, Addressing::Extent3D(extent)) => match other.piece_request {
        Some(piece) => self.set_update_piece(piece),
        None => self.set_update_extent(extent),
      },
      (ExtentType::Pieces, Addressing::Pieces(piece)) => self.set_update_piece(piece),
      (ExtentType::Structured3D, Addressing::Pieces(piece)) => self.set_update_piece(piece),
      (ExtentType::Pieces, Addressing::Extent3D(_)) => match other.piece_request {
        Some(piece) => self.set_update_piece(piece),
        None => self.set_update_piece(Piece::WHOLE),
      },
    }
  }

  fn retranslate_piece_request(&mut self) {
    let Some(piece) = self.piece_request else {
      return;
    };
    if piece.is_empty() {
      self.request = Addressing::Extent3D(Extent::EMPTY);
      return;
    }
    if !self.whole_extent.is_valid() {
      // Whole extent not known yet; translated after update_information.
      self.request = Addressing::Extent3D(Extent::EMPTY);
      return;
    }
    let extent = match self.translator.piece_to_extent(piece, &self.whole_extent) {
      Some(extent) => extent,
      None => {
        error!(
          piece = piece.index,
          pieces = piece.count,
          whole = %self.whole_extent,
          "piece could not be translated to an extent"
        );
        Extent::EMPTY
      }
    };
    self.request = Addressing::Extent3D(extent);
  }

  /// Fill in the whole-extent request if nobody set one.
  pub(crate) fn finish_information(&mut self) {
    if !self.update_extent_initialized {
      self.set_update_extent_to_whole_extent();
    } else {
      self.retranslate_piece_request();
    }
    self.state = UpdateState::InformationPropagated;
  }

  /// Source-less objects describe themselves.
  pub(crate) fn self_information(&mut self) {
    if self.extent_type == ExtentType::Structured3D {
      let extent = self.extent();
      self.set_whole_extent(extent);
    }
    self.pipeline_mtime = self.mtime;
  }

  // ---------------------------------------------------------------------------
  // Request predicates
  // ---------------------------------------------------------------------------

  /// The request selects nothing.
  pub fn update_extent_is_empty(&self) -> bool {
    self.request.is_empty()
  }

  /// The request is not covered by what is held.
  pub fn update_extent_is_outside_of_the_extent(&self) -> bool {
    match (self.request, self.held) {
      (Addressing::Pieces(want), Addressing::Pieces(have)) => {
        want.index != have.index || want.count != have.count || want.ghost_level > have.ghost_level
      }
      (Addressing::Extent3D(want), Addressing::Extent3D(have)) => {
        !want.is_empty() && !have.contains(&want)
      }
      _ => true,
    }
  }

  /// Check `request ⊆ whole_extent`. Logs the violation and returns false.
  pub fn verify_update_extent(&self) -> bool {
    match self.request {
      Addressing::Extent3D(extent) => {
        if extent.is_empty() || self.whole_extent.contains(&extent) {
          true
        } else {
          error!(
            update_extent = %extent,
            whole_extent = %self.whole_extent,
            "update extent does not lie within the whole extent"
          );
          false
        }
      }
      Addressing::Pieces(piece) => {
        if piece.is_empty() || piece.is_valid() {
          true
        } else {
          error!(
            piece = piece.index,
            pieces = piece.count,
            ghost_level = piece.ghost_level,
            "invalid update piece"
          );
          false
        }
      }
    }
  }

  /// The requested piece index is beyond what the producer declared it can
  /// make.
  pub fn request_exceeds_maximum_pieces(&self) -> bool {
    match self.update_piece() {
      Some(piece) => self.maximum_number_of_pieces >= 0 && piece.index >= self.maximum_number_of_pieces,
      None => false,
    }
  }

  /// Data must be regenerated to satisfy the current request.
  pub fn needs_update(&self) -> bool {
    self.update_time < self.pipeline_mtime
      || self.data_released
      || self.update_extent_is_outside_of_the_extent()
  }

  // ---------------------------------------------------------------------------
  // Lifecycle
  // ---------------------------------------------------------------------------

  /// Drop content and held extent. Does not change the modification time.
  pub fn initialize(&mut self) {
    self.content = Content::Empty;
    self.held = Addressing::empty(self.extent_type);
    self.held_piece = None;
    self.field_data.clear();
  }

  /// Free the data. Does not change the modification time.
  pub fn release_data(&mut self) {
    self.initialize();
    self.data_released = true;
  }

  pub(crate) fn prepare_for_new_data(&mut self) {
    self.initialize();
  }

  /// Mark the data current with respect to the request.
  pub(crate) fn data_has_been_generated(&mut self) {
    self.data_released = false;
    self.held_piece = self.piece_request;
    self.held = match self.request {
      Addressing::Pieces(piece) => Addressing::Pieces(piece),
      Addressing::Extent3D(requested) => match self.content.as_image() {
        Some(image) => Addressing::Extent3D(image.extent),
        None => Addressing::Extent3D(requested),
      },
    };
    self.update_time.modified();
    self.state = UpdateState::DataUpdated;
  }

  /// Record an empty result for `piece` without running the producer.
  pub(crate) fn record_shortfall(&mut self, piece: Piece) {
    self.initialize();
    match self.extent_type {
      ExtentType::Pieces => self.held = Addressing::Pieces(piece),
      ExtentType::Structured3D => self.held_piece = Some(piece),
    }
    warn!(
      piece = piece.index,
      pieces = piece.count,
      maximum = self.maximum_number_of_pieces,
      "requested piece exceeds the declared maximum number of pieces"
    );
  }

  /// Shrink the content to exactly the request.
  pub fn crop(&mut self) {
    let Addressing::Extent3D(requested) = self.request else {
      return;
    };
    if requested.is_empty() {
      return;
    }
    if let Some(image) = self.content.as_image_mut() {
      image.crop(&requested);
      self.held = Addressing::Extent3D(image.extent);
    }
  }

  /// Bump the modification time.
  pub fn modified(&mut self) {
    self.mtime.modified();
  }

  /// Release after consumers ran, honoring the global flag.
  pub fn should_release_data(&self, global_release: bool) -> bool {
    global_release || self.release_data_flag
  }

  pub(crate) fn set_last_update_extent_was_outside(&mut self, outside: bool) {
    self.last_update_extent_was_outside = outside;
  }

  /// Copy what the producer can produce from `input`.
  ///
  /// Whole extent and image information only travel between structured
  /// objects; the declared piece limit always travels.
  pub fn copy_information_from(&mut self, input: &DataObject) {
    if self.extent_type == ExtentType::Structured3D && input.extent_type == ExtentType::Structured3D {
      self.set_whole_extent(input.whole_extent);
      self.information = input.information;
    }
    self.maximum_number_of_pieces = input.maximum_number_of_pieces;
  }
}

#[cfg(test)]
#[path = "object_test.rs"]
mod object_test;
