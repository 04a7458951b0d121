use criterion::{black_box, criterion_group, criterion_main, Criterion};

use tcamc_core::encode::{prefix, srge, CgfeConfig, ChunkConfig, PORT_WIDTH};

// ranges with different shapes: aligned, worst-case fragmentation,
// boundary straddling, and the classic ephemeral-port split
const RANGES: [(u16, u16); 5] = [(0, 1023), (1, 65534), (1024, 65535), (16380, 16390), (1000, 2000)];

fn bench_encoders(c: &mut Criterion) {
    let dirpe = ChunkConfig::new(PORT_WIDTH, 2).unwrap();
    let cgfe = CgfeConfig::new(PORT_WIDTH, 2).unwrap();

    let mut group = c.benchmark_group("encode_port_ranges");
    group.bench_function("pfx", |b| {
        b.iter(|| {
            for &(lo, hi) in &RANGES {
                black_box(prefix::encode(black_box(lo), black_box(hi), PORT_WIDTH).unwrap());
            }
        })
    });
    group.bench_function("srge", |b| {
        b.iter(|| {
            for &(lo, hi) in &RANGES {
                black_box(srge::encode(black_box(lo), black_box(hi), PORT_WIDTH).unwrap());
            }
        })
    });
    group.bench_function("dirpe", |b| {
        b.iter(|| {
            for &(lo, hi) in &RANGES {
                black_box(dirpe.encode_range(black_box(lo), black_box(hi)).unwrap());
            }
        })
    });
    group.bench_function("cgfe", |b| {
        b.iter(|| {
            for &(lo, hi) in &RANGES {
                black_box(cgfe.encode_range(black_box(lo), black_box(hi)).unwrap());
            }
        })
    });
    group.finish();
}

criterion_group!(benches, bench_encoders);
criterion_main!(benches);
