// In benches/comparator_bench.rs

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use tuplegroup::{
    ComparatorRegistry, Schema, SortCriteria, SortPlan, Tuple, TupleComparator, TupleSerializer,
    Value,
};

// --- Data generation ---

const WORDS: [&str; 8] = [
    "abeja", "beber", "gato", "jauja", "listo", "perro", "Perro", "zorro",
];

fn generate_tuples(schema: &Arc<Schema>, count: usize) -> Vec<Tuple> {
    let mut rng = StdRng::seed_from_u64(42);
    (0..count)
        .map(|_| {
            let values = vec![
                Value::from(WORDS[rng.random_range(0..WORDS.len())]),
                Value::Int(rng.random_range(0..100)),
                Value::Long(rng.random_range(0..1_000_000)),
                Value::Double(rng.random::<f64>()),
            ];
            Tuple::from_values(Arc::clone(schema), values).unwrap()
        })
        .collect()
}

// --- Benchmark Suite ---

const BENCH_TUPLES: usize = 10_000;

fn bench_comparator(c: &mut Criterion) {
    // --- Setup Data ---
    let schema = Arc::new(Schema::parse("bench", "word:string,age:vint,ts:vlong,score:double").unwrap());
    let criteria = SortCriteria::parse(
        "word using case_insensitive asc, age desc, ts asc",
        &ComparatorRegistry::with_builtins(),
    )
    .unwrap();
    let plan = Arc::new(SortPlan::single(Arc::clone(&schema), criteria).unwrap());
    let comparator = TupleComparator::new(Arc::clone(&plan));
    let serializer = TupleSerializer::new(plan);

    let tuples = generate_tuples(&schema, BENCH_TUPLES);
    let encoded: Vec<Vec<u8>> = tuples.iter().map(|t| serializer.to_bytes(t).unwrap()).collect();

    // --- Pairwise comparison ---
    let mut group = c.benchmark_group("Tuple Comparison");
    group.throughput(criterion::Throughput::Elements((BENCH_TUPLES - 1) as u64));

    group.bench_function("Compare [1] Object", |b| {
        b.iter(|| {
            for pair in tuples.windows(2) {
                black_box(comparator.compare(black_box(&pair[0]), black_box(&pair[1])).unwrap());
            }
        })
    });
    group.bench_function("Compare [2] Binary", |b| {
        b.iter(|| {
            for pair in encoded.windows(2) {
                black_box(comparator.compare_bytes(black_box(&pair[0]), black_box(&pair[1])).unwrap());
            }
        })
    });
    group.finish();

    // --- Sort throughput ---
    let mut group = c.benchmark_group("Sort");
    group.throughput(criterion::Throughput::Elements(BENCH_TUPLES as u64));

    group.bench_function("Sort [1] Tuples", |b| {
        b.iter_batched(
            || tuples.clone(),
            |mut batch| comparator.sort_tuples(&mut batch).unwrap(),
            BatchSize::LargeInput,
        )
    });
    group.bench_function("Sort [2] Serialized", |b| {
        b.iter_batched(
            || encoded.clone(),
            |mut batch| comparator.sort_serialized(&mut batch).unwrap(),
            BatchSize::LargeInput,
        )
    });
    group.finish();
}

// These two lines generate the main function and register the benchmark group.
criterion_group!(benches, bench_comparator);
criterion_main!(benches);
