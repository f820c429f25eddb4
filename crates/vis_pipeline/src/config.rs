//! PipelineConfig - pipeline-wide policy knobs.

use crate::error::PipelineError;
use crate::extent::SplitMode;

/// Pipeline-wide configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PipelineConfig {
	/// Release every input's data after a consumer has executed.
	/// ORed with each data object's own release flag.
	pub global_release_data: bool,
	/// Split mode given to the translator of every new structured output.
	pub split_mode: SplitMode,
	/// Number of samples kept in the execution timing window.
	pub metrics_window: usize,
}

impl PipelineConfig {
	/// Keep data around, block splitting.
	pub const DEFAULT: Self = Self {
		global_release_data: false,
		split_mode: SplitMode::Block,
		metrics_window: 128,
	};

	/// Streaming preset: free intermediate data as soon as it was consumed
	/// and cut pieces as Z slabs.
	pub const STREAMING: Self = Self {
		global_release_data: true,
		split_mode: SplitMode::ZSlab,
		metrics_window: 128,
	};

	pub fn with_global_release_data(mut self, release: bool) -> Self {
		self.global_release_data = release;
		self
	}

	pub fn with_split_mode(mut self, split_mode: SplitMode) -> Self {
		self.split_mode = split_mode;
		self
	}

	pub fn with_metrics_window(mut self, samples: usize) -> Self {
		self.metrics_window = samples;
		self
	}

	/// Check invariants that the pipeline relies on.
	pub fn validate(&self) -> Result<(), PipelineError> {
		if self.metrics_window == 0 {
			return Err(PipelineError::InvalidConfig(
				"metrics_window must be > 0".to_string(),
			));
		}
		Ok(())
	}
}

impl Default for PipelineConfig {
	fn default() -> Self {
		Self::DEFAULT
	}
}
