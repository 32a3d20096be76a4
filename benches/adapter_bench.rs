//! Benchmarks for the hashing, compression and image adapters

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use hostbridge::ffi::{bridge_free, compression as lz4_ffi};
use hostbridge::wrappers::{compression, hashing, qoi};

/// Semi-compressible payload: short repeating phrases with a counter mixed in
fn payload(size: usize) -> Vec<u8> {
    let mut data = Vec::with_capacity(size);
    let mut i = 0u32;
    while data.len() < size {
        data.extend_from_slice(b"the quick brown fox ");
        data.extend_from_slice(&i.to_le_bytes());
        i += 1;
    }
    data.truncate(size);
    data
}

/// Benchmark one-shot hashes for varying input sizes
fn bench_hashing(c: &mut Criterion) {
    let mut group = c.benchmark_group("hashing");

    for &size in &[64usize, 4096, 65536] {
        let data = payload(size);
        group.throughput(Throughput::Bytes(size as u64));

        group.bench_function(format!("xxh32_{}", size), |b| {
            b.iter(|| black_box(hashing::xxhash32(black_box(&data), 0)))
        });
        group.bench_function(format!("xxh64_{}", size), |b| {
            b.iter(|| black_box(hashing::xxhash64(black_box(&data), 0)))
        });
        group.bench_function(format!("xxh3_64_{}", size), |b| {
            b.iter(|| black_box(hashing::xxh3_64(black_box(&data))))
        });
        group.bench_function(format!("xxh3_128_{}", size), |b| {
            b.iter(|| black_box(hashing::xxh3_128(black_box(&data))))
        });
    }

    group.finish();
}

/// Benchmark LZ4 and Snappy into preallocated buffers
fn bench_compression(c: &mut Criterion) {
    let mut group = c.benchmark_group("compression");
    let data = payload(64 * 1024);
    group.throughput(Throughput::Bytes(data.len() as u64));

    let mut lz4_dst = vec![0u8; compression::lz4_compress_bound(data.len())];
    group.bench_function("lz4_compress", |b| {
        b.iter(|| black_box(compression::lz4_compress_into(black_box(&data), &mut lz4_dst).unwrap()))
    });

    let mut hc_dst = lz4_dst.clone();
    group.bench_function("lz4_compress_hc9", |b| {
        b.iter(|| black_box(compression::lz4_compress_hc_into(black_box(&data), &mut hc_dst, 9).unwrap()))
    });

    let packed_len = compression::lz4_compress_into(&data, &mut lz4_dst).unwrap();
    let mut restored = vec![0u8; data.len()];
    group.bench_function("lz4_decompress", |b| {
        b.iter(|| {
            black_box(compression::lz4_decompress_into(black_box(&lz4_dst[..packed_len]), &mut restored).unwrap())
        })
    });

    let mut snappy_dst = vec![0u8; compression::snappy_max_compressed_length(data.len())];
    group.bench_function("snappy_compress", |b| {
        b.iter(|| black_box(compression::snappy_compress_into(black_box(&data), &mut snappy_dst).unwrap()))
    });

    let snappy_len = compression::snappy_compress_into(&data, &mut snappy_dst).unwrap();
    group.bench_function("snappy_uncompress", |b| {
        b.iter(|| {
            black_box(compression::snappy_uncompress_into(black_box(&snappy_dst[..snappy_len]), &mut restored).unwrap())
        })
    });

    group.finish();
}

/// Benchmark the cost of crossing the boundary: allocating export plus free
fn bench_boundary(c: &mut Criterion) {
    let data = payload(4096);

    c.bench_function("lz4_compress_alloc_and_free", |b| {
        b.iter(|| {
            let mut len = 0usize;
            let ptr = unsafe { lz4_ffi::lz4_compress_alloc(data.as_ptr(), data.len(), &mut len) };
            black_box(len);
            bridge_free(ptr);
        })
    });
}

/// Benchmark QOI on a gradient image
fn bench_qoi(c: &mut Criterion) {
    let (width, height) = (256u32, 256u32);
    let mut pixels = Vec::with_capacity((width * height * 4) as usize);
    for y in 0..height {
        for x in 0..width {
            pixels.extend_from_slice(&[x as u8, y as u8, (x ^ y) as u8, 255]);
        }
    }
    let encoded = qoi::encode(&pixels, width, height, 4).unwrap();

    let mut group = c.benchmark_group("qoi");
    group.throughput(Throughput::Bytes(pixels.len() as u64));
    group.bench_function("encode_256x256", |b| {
        b.iter(|| black_box(qoi::encode(black_box(&pixels), width, height, 4).unwrap()))
    });
    group.bench_function("decode_256x256", |b| {
        b.iter(|| black_box(qoi::decode(black_box(&encoded), 4).unwrap()))
    });
    group.finish();
}

criterion_group!(
    benches,
    bench_hashing,
    bench_compression,
    bench_boundary,
    bench_qoi,
);
criterion_main!(benches);
