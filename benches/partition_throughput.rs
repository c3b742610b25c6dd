#![forbid(unsafe_code)]

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use cleave::{Edge, Hdrf, HdrfConfig, StreamingState, VertexId};

const EDGE_COUNT: usize = 10_000;
const VERTEX_SPACE: u64 = 2_000;

/// Synthetic stream with a skewed endpoint: a small hot set of vertices
/// appears on most edges, which is where replication-affinity scoring does
/// real work.
fn synthetic_edges() -> Vec<Edge> {
    let mut rng = ChaCha8Rng::seed_from_u64(0xC1EA);
    let mut edges = Vec::with_capacity(EDGE_COUNT);
    while edges.len() < EDGE_COUNT {
        let u = rng.gen_range(0..VERTEX_SPACE / 20);
        let v = rng.gen_range(0..VERTEX_SPACE);
        if u != v {
            edges.push(Edge::new(VertexId(u), VertexId(v)));
        }
    }
    edges
}

fn partition_throughput(c: &mut Criterion) {
    let edges = synthetic_edges();
    let mut group = c.benchmark_group("hdrf/process_edge");
    group.sample_size(20);
    group.throughput(Throughput::Elements(edges.len() as u64));

    for &partitions in &[4u32, 16, 64] {
        group.bench_with_input(
            BenchmarkId::from_parameter(partitions),
            &partitions,
            |b, &partitions| {
                b.iter(|| {
                    let state = StreamingState::new(partitions);
                    let hdrf = Hdrf::new(HdrfConfig {
                        partitions,
                        seed: Some(7),
                        ..HdrfConfig::default()
                    })
                    .unwrap();
                    for &edge in &edges {
                        black_box(hdrf.process_edge(edge, &state).unwrap());
                    }
                });
            },
        );
    }
    group.finish();
}

criterion_group!(benches, partition_throughput);
criterion_main!(benches);
