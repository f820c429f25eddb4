use super::*;

fn block() -> ExtentTranslator {
  ExtentTranslator::default()
}

/// Count how many realized pieces own each point of `whole`.
fn point_coverage(whole: &Extent, pieces: &[Extent]) -> Vec<u32> {
  let mut hits = vec![0u32; whole.number_of_points()];
  for piece in pieces {
    for k in piece.0[4]..=piece.0[5] {
      for j in piece.0[2]..=piece.0[3] {
        for i in piece.0[0]..=piece.0[1] {
          if let Some(idx) = whole.point_index(i, j, k) {
            hits[idx] += 1;
          }
        }
      }
    }
  }
  hits
}

// =========================================================================
// Block mode
// =========================================================================

/// Two pieces of a 10x10 slice split the X axis (X/Y tie, lowest axis wins).
#[test]
fn test_two_pieces_of_square_slice() {
  let whole = Extent::new(0, 9, 0, 9, 0, 0);
  let t = block();

  assert_eq!(
    t.piece_to_extent(Piece::new(0, 2, 0), &whole),
    Some(Extent::new(0, 4, 0, 9, 0, 0))
  );
  assert_eq!(
    t.piece_to_extent(Piece::new(1, 2, 0), &whole),
    Some(Extent::new(5, 9, 0, 9, 0, 0))
  );
}

/// A single piece is the whole extent.
#[test]
fn test_single_piece_is_whole() {
  let whole = Extent::new(-3, 12, 4, 8, 0, 2);
  assert_eq!(block().piece_to_extent(Piece::WHOLE, &whole), Some(whole));
}

/// Block mode cuts the longest axis first.
#[test]
fn test_longest_axis_is_cut() {
  let whole = Extent::new(0, 3, 0, 19, 0, 3);
  assert_eq!(
    split_extent(0, 2, &whole, SplitMode::Block),
    Some(Extent::new(0, 3, 0, 9, 0, 3))
  );
}

/// Equal splits are deterministic and prefer X, then Y, then Z.
#[test]
fn test_tie_break_prefers_lowest_axis() {
  let cube = Extent::new(0, 7, 0, 7, 0, 7);
  let first = split_extent(0, 2, &cube, SplitMode::Block);
  assert_eq!(first, Some(Extent::new(0, 3, 0, 7, 0, 7)));
  assert_eq!(first, split_extent(0, 2, &cube, SplitMode::Block));

  // Y and Z tie, X is too short.
  let flat_x = Extent::new(0, 0, 0, 5, 0, 5);
  assert_eq!(
    split_extent(1, 2, &flat_x, SplitMode::Block),
    Some(Extent::new(0, 0, 3, 5, 0, 5))
  );
}

/// Every point of the whole extent belongs to exactly one piece.
#[test]
fn test_pieces_partition_the_whole_extent() {
  let whole = Extent::new(0, 9, -2, 4, 1, 3);
  for count in 1..=16 {
    let pieces: Vec<Extent> = (0..count)
      .filter_map(|index| block().piece_to_extent(Piece::new(index, count, 0), &whole))
      .collect();

    for piece in &pieces {
      assert!(whole.contains(piece), "{count} pieces: {piece} escapes {whole}");
    }
    let coverage = point_coverage(&whole, &pieces);
    assert!(
      coverage.iter().all(|&hits| hits == 1),
      "{count} pieces do not partition {whole}"
    );
  }
}

/// More pieces than points: piece 0 keeps the remainder, others are empty.
#[test]
fn test_too_many_pieces() {
  let whole = Extent::new(0, 0, 0, 0, 0, 0);
  assert_eq!(split_extent(0, 4, &whole, SplitMode::Block), Some(whole));
  assert_eq!(split_extent(1, 4, &whole, SplitMode::Block), None);
  assert_eq!(split_extent(3, 4, &whole, SplitMode::Block), None);

  // Two points, three pieces: one piece lands in an empty half.
  let pair = Extent::new(0, 1, 0, 0, 0, 0);
  let realized: Vec<_> = (0..3)
    .map(|i| split_extent(i, 3, &pair, SplitMode::Block))
    .collect();
  assert_eq!(realized.iter().filter(|e| e.is_some()).count(), 2);
}

#[test]
fn test_invalid_requests_have_no_data() {
  let whole = Extent::new(0, 9, 0, 9, 0, 0);
  let t = block();
  assert_eq!(t.piece_to_extent(Piece::new(2, 2, 0), &whole), None);
  assert_eq!(t.piece_to_extent(Piece::new(-1, 2, 0), &whole), None);
  assert_eq!(t.piece_to_extent(Piece::NONE, &whole), None);
  assert_eq!(t.piece_to_extent(Piece::WHOLE, &Extent::EMPTY), None);
}

// =========================================================================
// Slab modes
// =========================================================================

/// Z slabs of a cube: four slabs stacked along Z.
#[test]
fn test_z_slabs() {
  let cube = Extent::new(0, 9, 0, 9, 0, 9);
  let t = ExtentTranslator::new(SplitMode::ZSlab);
  let z_ranges: Vec<(i32, i32)> = (0..4)
    .map(|i| {
      t.piece_to_extent(Piece::new(i, 4, 0), &cube)
        .map(|e| e.axis(2))
        .unwrap()
    })
    .collect();
  assert_eq!(z_ranges, vec![(0, 1), (2, 4), (5, 6), (7, 9)]);
}

/// Once the slab axis is exhausted, splitting falls back to block mode.
#[test]
fn test_slab_falls_back_to_block() {
  let whole = Extent::new(0, 9, 0, 1, 0, 0);
  let t = ExtentTranslator::new(SplitMode::YSlab);

  // 4 pieces: Y gives two rows, then each row splits along X.
  let p0 = t.piece_to_extent(Piece::new(0, 4, 0), &whole).unwrap();
  let p3 = t.piece_to_extent(Piece::new(3, 4, 0), &whole).unwrap();
  assert_eq!(p0, Extent::new(0, 4, 0, 0, 0, 0));
  assert_eq!(p3, Extent::new(5, 9, 1, 1, 0, 0));
}

// =========================================================================
// Ghost levels
// =========================================================================

/// Ghost levels grow the piece and clamp at the whole extent.
#[test]
fn test_ghost_levels_grow_and_clamp() {
  let whole = Extent::new(0, 9, 0, 9, 0, 0);
  let t = block();
  assert_eq!(
    t.piece_to_extent(Piece::new(0, 2, 1), &whole),
    Some(Extent::new(0, 5, 0, 9, 0, 0))
  );
  assert_eq!(
    t.piece_to_extent(Piece::new(1, 2, 3), &whole),
    Some(Extent::new(2, 9, 0, 9, 0, 0))
  );
}

// =========================================================================
// By points
// =========================================================================

/// Adjacent pieces share one boundary point.
#[test]
fn test_by_points_shares_boundary() {
  let whole = Extent::new(0, 10, 0, 0, 0, 0);
  let t = block();
  let a = t.piece_to_extent_by_points(Piece::new(0, 2, 0), &whole).unwrap();
  let b = t.piece_to_extent_by_points(Piece::new(1, 2, 0), &whole).unwrap();
  assert_eq!(a, Extent::new(0, 5, 0, 0, 0, 0));
  assert_eq!(b, Extent::new(5, 10, 0, 0, 0, 0));
}

/// Cell ranges of node-centred pieces are disjoint and cover every cell.
#[test]
fn test_by_points_cells_partition() {
  let whole = Extent::new(0, 8, 0, 6, 0, 0);
  for count in 1..=12 {
    let mut hits = vec![0u32; 8 * 6];
    for index in 0..count {
      let Some(piece) = split_extent_by_points(index, count, &whole, SplitMode::Block) else {
        continue;
      };
      for j in piece.0[2]..piece.0[3] {
        for i in piece.0[0]..piece.0[1] {
          hits[(j * 8 + i) as usize] += 1;
        }
      }
    }
    assert!(
      hits.iter().all(|&h| h == 1),
      "{count} pieces do not partition cells: {hits:?}"
    );
  }
}
