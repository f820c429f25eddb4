//! Integer cell box for adaptive mesh refinement levels.

use glam::IVec3;

/// Inclusive cell-index box at one refinement level.
///
/// Coarsening and refinement use floor semantics so that negative corners
/// map consistently: a box refined and then coarsened by the same ratio is
/// unchanged, and a coarsened box refined back covers the original.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct AmrBox {
	/// Lowest cell index (inclusive).
	pub lo: IVec3,
	/// Highest cell index (inclusive).
	pub hi: IVec3,
}

impl AmrBox {
	pub fn new(lo: IVec3, hi: IVec3) -> Self {
		Self { lo, hi }
	}

	/// A box that contains no cells.
	#[inline]
	pub fn is_empty(&self) -> bool {
		self.hi.x < self.lo.x || self.hi.y < self.lo.y || self.hi.z < self.lo.z
	}

	/// Cells along each axis.
	pub fn cell_dimensions(&self) -> IVec3 {
		(self.hi - self.lo + IVec3::ONE).max(IVec3::ZERO)
	}

	pub fn number_of_cells(&self) -> usize {
		let d = self.cell_dimensions();
		d.x as usize * d.y as usize * d.z as usize
	}

	#[inline]
	pub fn contains_cell(&self, cell: IVec3) -> bool {
		cell.x >= self.lo.x
			&& cell.x <= self.hi.x
			&& cell.y >= self.lo.y
			&& cell.y <= self.hi.y
			&& cell.z >= self.lo.z
			&& cell.z <= self.hi.z
	}

	/// Map to the next coarser level, `ratio` fine cells per coarse cell.
	/// `None` for a ratio below 1.
	pub fn coarsen(&self, ratio: i32) -> Option<AmrBox> {
		if ratio < 1 {
			return None;
		}
		Some(AmrBox {
			lo: IVec3::new(
				self.lo.x.div_euclid(ratio),
				self.lo.y.div_euclid(ratio),
				self.lo.z.div_euclid(ratio),
			),
			hi: IVec3::new(
				self.hi.x.div_euclid(ratio),
				self.hi.y.div_euclid(ratio),
				self.hi.z.div_euclid(ratio),
			),
		})
	}

	/// Map to the next finer level. `None` for a ratio below 1.
	pub fn refine(&self, ratio: i32) -> Option<AmrBox> {
		(ratio >= 1).then(|| AmrBox {
			lo: self.lo * ratio,
			hi: (self.hi + IVec3::ONE) * ratio - IVec3::ONE,
		})
	}

	/// Linear index of `cell` inside this box, X fastest.
	pub fn cell_index(&self, cell: IVec3) -> Option<usize> {
		if !self.contains_cell(cell) {
			return None;
		}
		let d = self.cell_dimensions();
		let r = cell - self.lo;
		Some((r.z as usize * d.y as usize + r.y as usize) * d.x as usize + r.x as usize)
	}
}
