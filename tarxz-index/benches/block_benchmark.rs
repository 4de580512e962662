use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use tarxz_index::container;

fn make_input(size: usize) -> Vec<u8> {
    // Mildly compressible: real tar payloads are rarely pure noise.
    (0..size).map(|i| (i % 251) as u8).collect()
}

fn bench_compress(c: &mut Criterion) {
    let mut group = c.benchmark_group("compress_block");
    for &size in &[64 * 1024usize, 512 * 1024, 4 * 1024 * 1024] {
        let input = make_input(size);
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &input, |b, input| {
            b.iter(|| {
                let mut out = Vec::new();
                tarxz_index::lzma::compress_block(black_box(input), 6, &mut out).unwrap();
                out
            });
        });
    }
    group.finish();
}

fn bench_compress_decompress_roundtrip(c: &mut Criterion) {
    let input = make_input(1024 * 1024);
    let mut compressed = Vec::new();
    tarxz_index::lzma::compress_block(&input, 6, &mut compressed).unwrap();

    c.bench_function("decompress_block/1MiB", |b| {
        b.iter(|| tarxz_index::lzma::decompress_block(black_box(&compressed), input.len()).unwrap());
    });
}

fn bench_block_header(c: &mut Criterion) {
    let dict_size = tarxz_index::lzma::dict_size_for_preset(6);
    c.bench_function("write_block_header", |b| {
        b.iter(|| {
            let mut out = Vec::new();
            container::write_block_header(&mut out, black_box(dict_size)).unwrap();
            out
        });
    });
}

criterion_group!(
    benches,
    bench_compress,
    bench_compress_decompress_roundtrip,
    bench_block_header
);
criterion_main!(benches);
