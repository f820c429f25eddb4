//! Pipeline update benchmarks.
//!
//! - **cached**: pulling an up-to-date chain (protocol overhead only)
//! - **streamed**: source + box mean, re-executed piece by piece
//! - **chain_depth**: cost of a cached pull as the chain grows

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use vis_pipeline::{DataId, Extent, ImageBoxMean, ImageSource, Piece, Pipeline};

const WHOLE: Extent = Extent::new(0, 63, 0, 63, 0, 15);

/// Source followed by `depth` box-mean filters. Returns the last output.
fn chain(depth: usize) -> (Pipeline, DataId) {
  let mut pipeline = Pipeline::new();
  let source = pipeline.add_process(ImageSource::new(WHOLE, |p| p.x * p.y - p.z));
  let mut out = pipeline.output(source, 0).unwrap();
  for _ in 0..depth {
    let filter = pipeline.add_process(ImageBoxMean::new(1));
    pipeline.set_input(filter, 0, Some(out)).unwrap();
    out = pipeline.output(filter, 0).unwrap();
  }
  (pipeline, out)
}

fn bench_cached(c: &mut Criterion) {
  let (mut pipeline, out) = chain(4);
  pipeline.update(out).unwrap();
  c.bench_function("cached_pull", |b| {
    b.iter(|| black_box(pipeline.update(black_box(out)).unwrap()))
  });
}

fn bench_streamed(c: &mut Criterion) {
  let mut group = c.benchmark_group("streamed");
  group.sample_size(20);
  for pieces in [1, 4, 16] {
    group.bench_with_input(BenchmarkId::new("pieces", pieces), &pieces, |b, &pieces| {
      let (mut pipeline, out) = chain(1);
      b.iter(|| {
        for index in 0..pieces {
          pipeline
            .data_mut(out)
            .unwrap()
            .set_update_piece(Piece::new(index, pieces, 0));
          black_box(pipeline.update(out).unwrap());
        }
      })
    });
  }
  group.finish();
}

fn bench_chain_depth(c: &mut Criterion) {
  let mut group = c.benchmark_group("chain_depth");
  for depth in [1, 8, 32] {
    let (mut pipeline, out) = chain(depth);
    pipeline.update(out).unwrap();
    group.bench_with_input(BenchmarkId::from_parameter(depth), &depth, |b, _| {
      b.iter(|| black_box(pipeline.update(out).unwrap()))
    });
  }
  group.finish();
}

criterion_group!(benches, bench_cached, bench_streamed, bench_chain_depth);
criterion_main!(benches);
