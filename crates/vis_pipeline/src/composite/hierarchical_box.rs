//! AMR collection: uniform-grid leaves annotated with their cell box.
//!
//! Level `L + 1` refines level `L` by `refinement_ratio(L)`. A coarse cell
//! that is covered by a finer box is blanked in the coarse leaf's visibility
//! mask so that each region of space is shown at its finest level only.
//!
//! ```text
//! level 0 (ratio 2)          level 1
//! ┌──┬──┬──┬──┐              ┌─┬─┬─┬─┐
//! │  │  │  │  │              │ │ │ │ │   fine box [2..5]
//! ├──┼──┼──┼──┤   coarsen    ├─┼─┼─┼─┤   coarsened -> [1..2]
//! │  │██│██│  │   <──────    │ │ │ │ │
//! └──┴──┴──┴──┘              └─┴─┴─┴─┘
//! ```

use glam::IVec3;
use rayon::prelude::*;
use tracing::warn;

use super::amr_box::AmrBox;
use super::hierarchical::{HierarchicalDataSet, NodeRef};
use super::iterator::CompositeIter;
use super::DataNode;
use crate::data::{DataSet, ImageData};

/// Leveled AMR dataset.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct HierarchicalBoxDataSet {
	tree: HierarchicalDataSet,
	refinement_ratios: Vec<i32>,
}

impl HierarchicalBoxDataSet {
	pub fn new() -> Self {
		Self::default()
	}

	/// The underlying node tree (links, presence, raw nodes).
	pub fn tree(&self) -> &HierarchicalDataSet {
		&self.tree
	}

	pub fn tree_mut(&mut self) -> &mut HierarchicalDataSet {
		&mut self.tree
	}

	pub fn number_of_levels(&self) -> usize {
		self.tree.number_of_levels()
	}

	/// Ratio between `level` and `level + 1`.
	pub fn set_refinement_ratio(&mut self, level: usize, ratio: i32) {
		if level >= self.refinement_ratios.len() {
			self.refinement_ratios.resize(level + 1, 0);
		}
		self.refinement_ratios[level] = ratio;
	}

	pub fn refinement_ratio(&self, level: usize) -> Option<i32> {
		self.refinement_ratios.get(level).copied().filter(|&r| r > 0)
	}

	/// Store a uniform-grid leaf with its cell box.
	pub fn set_data_set(&mut self, level: usize, index: usize, amr_box: AmrBox, image: ImageData) {
		let at = NodeRef::new(level, index);
		self.tree.set_data_set(at, DataSet::Image(image));
		if let Some(node) = self.tree.node_mut(at) {
			node.amr_box = Some(amr_box);
		}
	}

	/// Leaf image and box at `(level, index)`.
	pub fn data_set(&self, level: usize, index: usize) -> Option<(&AmrBox, &ImageData)> {
		let node = self.tree.node(NodeRef::new(level, index))?;
		let image = node.dataset.as_ref()?.as_leaf()?.as_image()?;
		Some((node.amr_box.as_ref()?, image))
	}

	/// Boxes of every leaf on `level`.
	pub fn boxes(&self, level: usize) -> Vec<AmrBox> {
		self.tree
			.levels
			.get(level)
			.map(|nodes| nodes.iter().flatten().filter_map(|n| n.amr_box).collect())
			.unwrap_or_default()
	}

	/// Rebuild every leaf's cell visibility mask.
	///
	/// A cell on level `L` is blanked when any box on level `L + 1`,
	/// coarsened by `refinement_ratio(L)`, contains it. Leaves on the finest
	/// level stay fully visible. Returns the total number of blanked cells.
	#[cfg_attr(feature = "profiling", tracing::instrument(skip_all, name = "amr::visibility"))]
	pub fn generate_visibility_arrays(&mut self) -> usize {
		let levels = self.tree.number_of_levels();
		let mut blanked = 0;

		for level in 0..levels {
			let covering: Vec<AmrBox> = if level + 1 < levels {
				match self.refinement_ratio(level) {
					Some(ratio) => self.boxes(level + 1).iter().filter_map(|b| b.coarsen(ratio)).collect(),
					None => {
						warn!(level, "no refinement ratio; level left fully visible");
						Vec::new()
					}
				}
			} else {
				Vec::new()
			};

			blanked += self.tree.levels[level]
				.par_iter_mut()
				.flatten()
				.map(|node| {
					let Some(amr_box) = node.amr_box else {
						return 0;
					};
					let Some(image) = node
						.dataset
						.as_mut()
						.and_then(DataNode::as_leaf_mut)
						.and_then(DataSet::as_image_mut)
					else {
						return 0;
					};
					let (mask, count) = visibility_mask(&amr_box, &covering);
					image.set_cell_visibility(Some(mask));
					count
				})
				.sum::<usize>();
		}

		blanked
	}

	/// Leaves level by level, then by index.
	pub fn iter(&self) -> CompositeIter<'_> {
		self.tree.iter()
	}
}

/// Visibility mask over `amr_box` cells and the number of blanked cells.
fn visibility_mask(amr_box: &AmrBox, covering: &[AmrBox]) -> (Vec<u8>, usize) {
	let mut mask = vec![1u8; amr_box.number_of_cells()];
	let mut blanked = 0;
	let mut idx = 0;
	for z in amr_box.lo.z..=amr_box.hi.z {
		for y in amr_box.lo.y..=amr_box.hi.y {
			for x in amr_box.lo.x..=amr_box.hi.x {
				let cell = IVec3::new(x, y, z);
				if covering.iter().any(|b| b.contains_cell(cell)) {
					mask[idx] = 0;
					blanked += 1;
				}
				idx += 1;
			}
		}
	}
	(mask, blanked)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::extent::Extent;

	/// Image whose cells match `amr_box` (points one past the high cell).
	fn image_for(amr_box: &AmrBox) -> ImageData {
		ImageData::new(Extent::from_corners(amr_box.lo, amr_box.hi + IVec3::ONE))
	}

	fn two_level() -> HierarchicalBoxDataSet {
		let mut amr = HierarchicalBoxDataSet::new();
		amr.set_refinement_ratio(0, 2);

		let coarse = AmrBox::new(IVec3::ZERO, IVec3::new(3, 3, 0));
		amr.set_data_set(0, 0, coarse, image_for(&coarse));

		let fine = AmrBox::new(IVec3::new(2, 2, 0), IVec3::new(5, 5, 1));
		amr.set_data_set(1, 0, fine, image_for(&fine));
		amr
	}

	#[test]
	fn test_covered_cells_blanked() {
		let mut amr = two_level();
		let blanked = amr.generate_visibility_arrays();

		// Fine [2..5] coarsens to [1..2] on x and y: 2 x 2 coarse cells.
		assert_eq!(blanked, 4);
		let (_, coarse) = amr.data_set(0, 0).unwrap();
		assert_eq!(coarse.blanked_cell_count(), 4);
		assert!(coarse.is_cell_visible(0));
		assert!(!coarse.is_cell_visible(5));

		let (_, fine) = amr.data_set(1, 0).unwrap();
		assert_eq!(fine.blanked_cell_count(), 0);
	}

	/// Overlapping fine boxes still blank each coarse cell once.
	#[test]
	fn test_overlapping_boxes_blank_once() {
		let mut amr = two_level();
		let overlap = AmrBox::new(IVec3::new(2, 2, 0), IVec3::new(3, 3, 0));
		amr.set_data_set(1, 1, overlap, image_for(&overlap));

		assert_eq!(amr.generate_visibility_arrays(), 4);
	}

	#[test]
	fn test_regenerating_is_stable() {
		let mut amr = two_level();
		let first = amr.generate_visibility_arrays();
		let second = amr.generate_visibility_arrays();
		assert_eq!(first, second);
	}

	#[test]
	fn test_missing_ratio_leaves_level_visible() {
		let mut amr = HierarchicalBoxDataSet::new();
		let coarse = AmrBox::new(IVec3::ZERO, IVec3::new(1, 1, 0));
		let fine = AmrBox::new(IVec3::ZERO, IVec3::new(1, 1, 0));
		amr.set_data_set(0, 0, coarse, image_for(&coarse));
		amr.set_data_set(1, 0, fine, image_for(&fine));

		assert_eq!(amr.generate_visibility_arrays(), 0);
		assert_eq!(amr.refinement_ratio(0), None);
	}

	#[test]
	fn test_zero_ratio_does_not_coarsen() {
		let mut amr = two_level();
		amr.set_refinement_ratio(0, 0);
		assert_eq!(amr.refinement_ratio(0), None);
		assert_eq!(amr.generate_visibility_arrays(), 0);
	}

	#[test]
	fn test_boxes_per_level() {
		let amr = two_level();
		assert_eq!(amr.boxes(1), vec![AmrBox::new(IVec3::new(2, 2, 0), IVec3::new(5, 5, 1))]);
		assert!(amr.boxes(4).is_empty());
	}
}
