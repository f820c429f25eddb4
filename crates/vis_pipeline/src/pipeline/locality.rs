//! Input ordering by locality.
//!
//! Inputs produced close to the consumer (low locality) are updated first so
//! that remote producers get as much time as possible to finish their
//! asynchronous work before they are waited on.

/// Stable ascending sort by locality; entries without a locality go last.
///
/// Bottom-up iterative merge sort: runs of width 1, 2, 4, ... are merged
/// pairwise between two buffers until one run spans the input.
pub fn sort_by_locality<T: Copy>(items: &[(T, Option<f64>)]) -> Vec<T> {
  let n = items.len();
  let mut src: Vec<(T, Option<f64>)> = items.to_vec();
  let mut dst: Vec<(T, Option<f64>)> = items.to_vec();

  let mut width = 1;
  while width < n {
    let mut start = 0;
    while start < n {
      let mid = (start + width).min(n);
      let end = (start + 2 * width).min(n);
      merge(&src[start..mid], &src[mid..end], &mut dst[start..end]);
      start = end;
    }
    std::mem::swap(&mut src, &mut dst);
    width *= 2;
  }

  src.into_iter().map(|(item, _)| item).collect()
}

/// `a` before `b` in the final order. Ties keep `a` first for stability.
#[inline]
fn goes_first(a: Option<f64>, b: Option<f64>) -> bool {
  match (a, b) {
    (Some(x), Some(y)) => x <= y,
    (Some(_), None) => true,
    (None, Some(_)) => false,
    (None, None) => true,
  }
}

fn merge<T: Copy>(left: &[(T, Option<f64>)], right: &[(T, Option<f64>)], out: &mut [(T, Option<f64>)]) {
  let (mut i, mut j) = (0, 0);
  for slot in out.iter_mut() {
    let take_left = j >= right.len() || (i < left.len() && goes_first(left[i].1, right[j].1));
    if take_left {
      *slot = left[i];
      i += 1;
    } else {
      *slot = right[j];
      j += 1;
    }
  }
}
