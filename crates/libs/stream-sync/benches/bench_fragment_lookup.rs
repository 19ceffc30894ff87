//! Fragment lookup and seek planning benchmark
//!
//! Both run for every drifting stream on every tick, so they must stay cheap
//! for long live windows (thousands of buffered fragments).

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use remotemedia_stream_sync::{
    find_closest_fragment, find_fragment_by_timestamp, plan_seek, Fragment, SeekableRange,
};

const START: i64 = 1_700_000_000_000;

/// Create a live window of `count` 2s fragments, every tenth one untagged
fn create_index(count: usize) -> Vec<Fragment> {
    (0..count)
        .map(|i| {
            let media_start = i as f64 * 2.0;
            if i % 10 == 9 {
                Fragment::untagged(media_start, 2.0)
            } else {
                Fragment::tagged(media_start, 2.0, START + i as i64 * 2_000)
            }
        })
        .collect()
}

fn bench_lookup(c: &mut Criterion) {
    let mut group = c.benchmark_group("fragment_lookup");

    for count in [60, 600, 3_600] {
        let fragments = create_index(count);
        let target = START + (count as i64 - 2) * 2_000 + 700;
        let seekable = [SeekableRange::new(0.0, count as f64 * 2.0)];

        group.bench_with_input(BenchmarkId::new("by_timestamp", count), &fragments, |b, f| {
            b.iter(|| find_fragment_by_timestamp(black_box(f), black_box(target)))
        });

        group.bench_with_input(BenchmarkId::new("closest", count), &fragments, |b, f| {
            b.iter(|| find_closest_fragment(black_box(f), black_box(target)))
        });

        group.bench_with_input(BenchmarkId::new("plan_seek", count), &fragments, |b, f| {
            b.iter(|| plan_seek(Some(black_box(f.as_slice())), black_box(&seekable), black_box(target)))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_lookup);
criterion_main!(benches);
