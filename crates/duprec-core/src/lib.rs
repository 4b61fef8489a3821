//! duprec-core: pairwise duplicate recognition.
//!
//! Computes similarity scores across a set of entities and reports them as
//! an edge list. Consuming applications inject the comparison logic
//! ([`Comparator`]), the candidate restriction ([`PairStrategy`]) and the
//! result destination ([`EdgeSink`]).
//!
//! # Pipeline
//!
//! entity store → pair strategy → scorer (comparators) → collector
//!
//! ```
//! use duprec_core::{
//!     Algorithm, DuplicateRecognition, Entity, EntityStore, FieldComparator, Scorer,
//! };
//!
//! let store = EntityStore::from_entities([
//!     Entity::new(1).with("name", "Jon"),
//!     Entity::new(2).with("name", "John"),
//!     Entity::new(3).with("name", "Alice"),
//! ])?;
//! let scorer = Scorer::builder()
//!     .comparator(FieldComparator::new("name", Algorithm::JaroWinkler), 1.0)
//!     .build()?;
//! let report = DuplicateRecognition::builder(store, scorer)
//!     .threshold(0.8)
//!     .build()?
//!     .run()?;
//! assert_eq!(report.edges.len(), 1);
//! # Ok::<(), duprec_core::DuprecError>(())
//! ```

pub mod algorithm;
pub mod collector;
pub mod comparator;
pub mod config;
pub mod country;
pub mod engine;
pub mod entity;
pub mod error;
pub mod field;
pub mod normalize;
pub mod pairs;
pub mod scorer;
pub mod stats;

pub use algorithm::Algorithm;
pub use collector::{BestMatch, BestMatches, ResultCollector};
pub use comparator::{comparator_fn, text_comparator, Comparator, FnComparator, ScoreRange};
pub use config::{DuprecConfig, FieldConfig, EXACT_MATCH_WEIGHT};
pub use country::CountryResolver;
pub use engine::{CancelToken, DuplicateRecognition, EdgeSink, MemorySink, RunReport};
pub use entity::{AttributeValue, Entity, EntityId, EntityStore};
pub use error::{ComparatorError, DuprecError, Result};
pub use field::FieldComparator;
pub use pairs::{AllPairs, BlockingKey, Filtered, IncrementalPlan, Pair, PairBatch, PairStrategy};
pub use scorer::{Aggregation, ErrorPolicy, FieldScore, MissingPolicy, ScoredPair, Scorer};
pub use stats::{Statistics, StatsSummary};
