//! Encode/decode throughput for typed values and the stream reader.
//!
//! Run with: cargo bench --bench codec

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use shape_pack::{Codec, Reader, Writer};

#[derive(Serialize, Deserialize, Clone, Debug)]
struct Entry {
    id: u64,
    name: String,
    parent: Option<Box<u64>>,
    scores: BTreeMap<String, i32>,
    #[serde(with = "serde_bytes")]
    payload: Vec<u8>,
}

fn entries(count: usize) -> Vec<Entry> {
    let mut rng = rand::rngs::StdRng::seed_from_u64(0x5eed);
    (0..count)
        .map(|i| Entry {
            id: rng.gen(),
            name: format!("entry-{}", i),
            parent: if rng.gen_bool(0.5) { Some(Box::new(rng.gen())) } else { None },
            scores: (0..rng.gen_range(0..8))
                .map(|k| (format!("k{}", k), rng.gen_range(-1000..1000)))
                .collect(),
            payload: (0..rng.gen_range(0..64)).map(|_| rng.gen()).collect(),
        })
        .collect()
}

fn typed(c: &mut Criterion) {
    let mut group = c.benchmark_group("typed");
    for count in [1usize, 100, 1000] {
        let batch = entries(count);
        let mut codec = Codec::new();
        let enc = codec.encode(&batch).unwrap();
        group.throughput(Throughput::Bytes(enc.len() as u64));
        group.bench_with_input(BenchmarkId::new("encode", count), &batch, |b, batch| {
            b.iter(|| codec.encode(black_box(batch)).unwrap())
        });
        group.bench_with_input(BenchmarkId::new("decode", count), &enc, |b, enc| {
            b.iter(|| codec.decode::<Vec<Entry>>(black_box(enc)).unwrap())
        });
    }
    group.finish();
}

fn stream(c: &mut Criterion) {
    let batch = entries(1000);
    let mut writer = Writer::new(Vec::new());
    for e in batch.iter() {
        writer.write(e).unwrap();
    }
    let data = writer.into_inner();
    let mut group = c.benchmark_group("stream");
    group.throughput(Throughput::Bytes(data.len() as u64));
    group.bench_function("read_1000", |b| {
        b.iter(|| {
            let mut reader = Reader::new(black_box(&data[..]));
            let mut n = 0;
            while let Some(e) = reader.read::<Entry>().unwrap() {
                black_box(e);
                n += 1;
            }
            n
        })
    });
    group.finish();
}

criterion_group!(benches, typed, stream);
criterion_main!(benches);
