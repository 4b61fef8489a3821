//! End-to-end duplicate recognition tests

mod common;

use std::collections::HashSet;
use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use common::fixtures::{companies, numbered, COMPANIES_TOML};
use duprec_core::{
    comparator_fn, text_comparator, Algorithm, CancelToken, DuplicateRecognition,
    DuprecConfig, Entity, EntityId, EntityStore, FieldComparator, IncrementalPlan, MemorySink,
    PairStrategy, ScoredPair, Scorer,
};

fn edge_set(edges: &[ScoredPair]) -> HashSet<(u64, u64)> {
    edges.iter().map(|e| (e.a.0, e.b.0)).collect()
}

// === Basic scenario ===

#[test]
fn test_jon_john_alice() {
    let store = EntityStore::from_entities([
        Entity::new(1).with("name", "Jon"),
        Entity::new(2).with("name", "John"),
        Entity::new(3).with("name", "Alice"),
    ])
    .unwrap();
    let scorer = Scorer::builder()
        .comparator(text_comparator("name", "name", strsim::jaro_winkler), 1.0)
        .build()
        .unwrap();

    let report = DuplicateRecognition::builder(store, scorer)
        .threshold(0.8)
        .build()
        .unwrap()
        .run()
        .unwrap();

    assert_eq!(edge_set(&report.edges), HashSet::from([(1, 2)]));
    assert_eq!(report.stats.compared_pairs, 3);
}

// === Config driven runs ===

#[test]
fn test_companies_from_config() {
    let config = DuprecConfig::from_toml(COMPANIES_TOML).unwrap();
    let report = config.build_engine(companies()).unwrap().run().unwrap();

    assert_eq!(edge_set(&report.edges), HashSet::from([(1, 4), (2, 5)]));
    assert_eq!(report.stats.compared_pairs, 15);

    let acme = report.edges.iter().find(|e| e.a == EntityId(1)).unwrap();
    assert!((acme.score - 1.0).abs() < 1e-9);
    assert_eq!(acme.field("country"), Some(0.0), "same country is no penalty");

    let globex = report.edges.iter().find(|e| e.a == EntityId(2)).unwrap();
    assert_eq!(globex.field("vat_id"), Some(1.0));
    assert!(globex.score > 0.95 && globex.score < 1.0);
}

#[test]
fn test_companies_best_matches() {
    let config = DuprecConfig::from_toml(COMPANIES_TOML).unwrap();
    let report = config.build_engine(companies()).unwrap().run().unwrap();

    let best = |id: u64| {
        report
            .best_matches
            .iter()
            .find(|m| m.entity == EntityId(id))
            .map(|m| m.other.0)
    };
    assert_eq!(best(1), Some(4));
    assert_eq!(best(4), Some(1));
    assert_eq!(best(2), Some(5));
    assert_eq!(best(5), Some(2));
    assert_eq!(report.best_matches.len(), 6);
}

#[test]
fn test_blocking_key_restricts_pairs() {
    let toml = format!("blocking_key = \"postal_code\"\n{COMPANIES_TOML}");
    let config = DuprecConfig::from_toml(&toml).unwrap();
    let report = config.build_engine(companies()).unwrap().run().unwrap();

    assert_eq!(report.stats.compared_pairs, 2);
    assert_eq!(edge_set(&report.edges), HashSet::from([(1, 4), (2, 5)]));
}

#[test]
fn test_config_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(COMPANIES_TOML.as_bytes()).unwrap();
    let config = DuprecConfig::from_path(file.path()).unwrap();
    assert_eq!(config.name, "companies");
    assert_eq!(config.fields.len(), 4);

    assert!(DuprecConfig::from_path("/definitely/not/here.toml").is_err());
}

// === Incremental runs ===

#[test]
fn test_incremental_run_only_scores_new_entities() {
    let config = DuprecConfig::from_toml(COMPANIES_TOML).unwrap();
    let store = companies();

    let first_wave: Vec<EntityId> = vec![EntityId(1), EntityId(2), EntityId(3)];
    let first_plan = IncrementalPlan::new(Vec::new(), first_wave.clone());
    let first = DuplicateRecognition::builder(store.clone(), config.build_scorer().unwrap())
        .strategy(first_plan)
        .threshold(config.threshold)
        .clean_entities(Some(config.scored_attributes()))
        .build()
        .unwrap()
        .run()
        .unwrap();
    assert_eq!(first.stats.compared_pairs, 3);
    assert!(first.edges.is_empty());

    let existing: Vec<_> = first.best_matches.iter().map(|m| m.comparison.clone()).collect();
    let plan = IncrementalPlan::from_store(&store, first_wave);
    assert_eq!(plan.pairs(&store).count(), 12);

    let second = DuplicateRecognition::builder(store, config.build_scorer().unwrap())
        .strategy(plan)
        .threshold(config.threshold)
        .existing_best(existing)
        .clean_entities(Some(config.scored_attributes()))
        .build()
        .unwrap()
        .run()
        .unwrap();

    assert_eq!(second.stats.compared_pairs, 12);
    let edges = edge_set(&second.edges);
    assert!(edges.contains(&(4, 1)));
    assert!(edges.contains(&(5, 2)));
    assert_eq!(edges.len(), 2);
}

// === Streaming, limits and cancellation ===

#[test]
fn test_sink_sees_all_comparisons_in_chunks() {
    struct CountingSink {
        chunks: Vec<usize>,
    }
    impl duprec_core::EdgeSink for CountingSink {
        fn write_comparisons(&mut self, comparisons: &[ScoredPair]) -> duprec_core::Result<()> {
            self.chunks.push(comparisons.len());
            Ok(())
        }
    }

    let scorer = Scorer::builder()
        .comparator(FieldComparator::new("name", Algorithm::PhoneticDistance), 1.0)
        .build()
        .unwrap();
    let engine = DuplicateRecognition::builder(numbered(8), scorer)
        .chunk_size(10)
        .build()
        .unwrap();
    let mut sink = CountingSink { chunks: Vec::new() };
    engine.run_with_sink(&mut sink).unwrap();

    assert_eq!(sink.chunks.iter().sum::<usize>(), 28);
    assert_eq!(sink.chunks, vec![10, 10, 8]);
}

#[test]
fn test_sink_error_aborts_run() {
    struct FailingSink;
    impl duprec_core::EdgeSink for FailingSink {
        fn write_comparisons(&mut self, _: &[ScoredPair]) -> duprec_core::Result<()> {
            Err(duprec_core::DuprecError::Sink("table is read-only".into()))
        }
    }

    let scorer = Scorer::builder()
        .comparator(FieldComparator::new("name", Algorithm::Equality), 1.0)
        .build()
        .unwrap();
    let engine = DuplicateRecognition::builder(numbered(3), scorer).build().unwrap();
    let err = engine.run_with_sink(&mut FailingSink).unwrap_err();
    assert!(err.to_string().contains("read-only"));
}

#[test]
fn test_cancellation_keeps_partial_results() {
    let token = CancelToken::new();
    let calls = Arc::new(AtomicUsize::new(0));

    let cancel = token.clone();
    let counter = Arc::clone(&calls);
    let scorer = Scorer::builder()
        .comparator(
            comparator_fn("cancel_after_five", move |_: &Entity, _: &Entity| {
                if counter.fetch_add(1, Ordering::SeqCst) + 1 == 5 {
                    cancel.cancel();
                }
                Ok(1.0)
            }),
            1.0,
        )
        .build()
        .unwrap();

    let engine = DuplicateRecognition::builder(numbered(10), scorer)
        .chunk_size(1)
        .cancel_token(token)
        .build()
        .unwrap();
    let mut sink = MemorySink::default();
    let report = engine.run_with_sink(&mut sink).unwrap();

    assert!(report.cancelled);
    assert_eq!(report.stats.compared_pairs, 5);
    assert_eq!(report.edges.len(), 5);
    assert_eq!(sink.comparisons.len(), 5);
    assert_eq!(calls.load(Ordering::SeqCst), 5);
}

#[test]
fn test_limit_stops_after_batches() {
    let scorer = Scorer::builder()
        .comparator(FieldComparator::new("name", Algorithm::Equality), 1.0)
        .build()
        .unwrap();
    let report = DuplicateRecognition::builder(numbered(5), scorer)
        .limit(Some(2))
        .build()
        .unwrap()
        .run()
        .unwrap();
    // Entity 1 against 2..=5, then entity 2 against 3..=5.
    assert_eq!(report.stats.compared_batches, 2);
    assert_eq!(report.stats.compared_pairs, 7);
    assert!(report.edges.is_empty());
}
