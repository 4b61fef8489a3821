//! Scoring and pair generation benchmarks

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use duprec_core::algorithm::{phonetic_distance, Algorithm};
use duprec_core::{
    AllPairs, BlockingKey, DuplicateRecognition, Entity, EntityStore, FieldComparator, PairStrategy,
    Scorer,
};

fn generate_companies(count: u64) -> EntityStore {
    EntityStore::from_entities((0..count).map(|i| {
        Entity::new(i + 1)
            .with("company", format!("Company Number {} GmbH", i % (count / 2).max(1)))
            .with("homepage", format!("https://www.company-{}.example/", i % 97))
            .with("country", if i % 3 == 0 { "Germany" } else { "DE" })
            .with("postal_code", format!("{:05}", i % 20))
    }))
    .unwrap()
}

fn company_scorer() -> Scorer {
    Scorer::builder()
        .comparator(
            FieldComparator::new("company", Algorithm::PhoneticDistance).threshold(0.6),
            1.0,
        )
        .comparator(FieldComparator::new("homepage", Algorithm::Url).threshold(0.8), 1.0)
        .comparator(FieldComparator::new("country", Algorithm::Country).negative(true), 0.5)
        .build()
        .unwrap()
}

fn bench_phonetic_distance(c: &mut Criterion) {
    c.bench_function("phonetic_distance", |b| {
        b.iter(|| {
            phonetic_distance(
                black_box("acme industries gmbh"),
                black_box("acme industrie gmbh & co kg"),
            )
        })
    });
}

fn bench_score_pair(c: &mut Criterion) {
    let store = generate_companies(2);
    let scorer = company_scorer();
    let entities: Vec<&Entity> = store.iter().collect();
    c.bench_function("score_pair", |b| {
        b.iter(|| scorer.score_pair(black_box(entities[0]), black_box(entities[1])))
    });
}

fn bench_pair_generation(c: &mut Criterion) {
    let mut group = c.benchmark_group("pair_generation");
    for count in [100, 1000] {
        let store = generate_companies(count);
        group.bench_with_input(BenchmarkId::new("all_pairs", count), &store, |b, store| {
            b.iter(|| AllPairs.pairs(black_box(store)).count())
        });
        let blocking = BlockingKey::new("postal_code");
        group.bench_with_input(BenchmarkId::new("blocking_key", count), &store, |b, store| {
            b.iter(|| blocking.pairs(black_box(store)).count())
        });
    }
    group.finish();
}

fn bench_full_run(c: &mut Criterion) {
    let mut group = c.benchmark_group("full_run");
    group.sample_size(10);
    for count in [50, 200] {
        let engine = DuplicateRecognition::builder(generate_companies(count), company_scorer())
            .build()
            .unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(count), &engine, |b, engine| {
            b.iter(|| engine.run().unwrap())
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_phonetic_distance,
    bench_score_pair,
    bench_pair_generation,
    bench_full_run,
);
criterion_main!(benches);
