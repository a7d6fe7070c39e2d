use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};

use rand_core::RngCore;
use silent_core::{prg::Prg, Block};

fn criterion_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("prg");

    group.throughput(Throughput::Elements(1));
    group.bench_function("u64", move |bench| {
        let mut prg = Prg::new();
        bench.iter(|| black_box(prg.next_u64()));
    });

    group.throughput(Throughput::Elements(1));
    group.bench_function("block", move |bench| {
        let mut prg = Prg::new();
        bench.iter(|| black_box(prg.random_block()));
    });

    const BLOCKS_PER: u64 = 16 * 1024;
    group.throughput(Throughput::Elements(BLOCKS_PER));
    group.bench_function("blocks", move |bench| {
        let mut prg = Prg::new();
        let mut x = vec![Block::ZERO; BLOCKS_PER as usize];
        bench.iter(|| {
            prg.random_blocks(black_box(&mut x));
        });
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
