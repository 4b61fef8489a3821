//! Run orchestration
//!
//! [`DuplicateRecognition`] wires the pieces together:
//! entity store → pair strategy → scorer → collector / best matches / sink.
//!
//! Pairs are scored in chunks. With the `parallel` feature each chunk is
//! scored on the rayon pool; results are always merged in generation order,
//! so reports are deterministic regardless of thread scheduling.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

#[cfg(feature = "parallel")]
use rayon::prelude::*;
use serde::Serialize;

use crate::collector::{BestMatch, BestMatches, ResultCollector};
use crate::entity::EntityStore;
use crate::error::{DuprecError, Result};
use crate::normalize::prepare_entity;
use crate::pairs::{AllPairs, Pair, PairStrategy};
use crate::scorer::{ErrorPolicy, ScoredPair, Scorer};
use crate::stats::{Statistics, StatsSummary};

/// Default acceptance threshold for edges.
pub const DEFAULT_THRESHOLD: f64 = 0.7;

/// Default number of pairs scored (and written) per chunk.
pub const DEFAULT_CHUNK_SIZE: usize = 1000;

// ---------------------------------------------------------------------------
// Sinks
// ---------------------------------------------------------------------------

/// Destination for scored comparisons, e.g. an edge table.
///
/// `write_comparisons` receives every scored pair, accepted or not, one chunk
/// at a time. `write_best_matches` is called once at the end of a run.
pub trait EdgeSink {
    fn write_comparisons(&mut self, comparisons: &[ScoredPair]) -> Result<()>;

    fn write_best_matches(&mut self, _best: &[BestMatch]) -> Result<()> {
        Ok(())
    }
}

/// Sink that keeps everything in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub comparisons: Vec<ScoredPair>,
    pub best_matches: Vec<BestMatch>,
}

impl EdgeSink for MemorySink {
    fn write_comparisons(&mut self, comparisons: &[ScoredPair]) -> Result<()> {
        self.comparisons.extend_from_slice(comparisons);
        Ok(())
    }

    fn write_best_matches(&mut self, best: &[BestMatch]) -> Result<()> {
        self.best_matches = best.to_vec();
        Ok(())
    }
}

struct NullSink;

impl EdgeSink for NullSink {
    fn write_comparisons(&mut self, _comparisons: &[ScoredPair]) -> Result<()> {
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Cancellation
// ---------------------------------------------------------------------------

/// Cloneable flag that stops a run from dispatching further pairs.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

/// Outcome of a run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    /// Accepted edges (score >= threshold) in generation order
    pub edges: Vec<ScoredPair>,
    /// Closest match per entity
    pub best_matches: Vec<BestMatch>,
    pub stats: StatsSummary,
    /// Pairs dropped by the error policy
    pub skipped: usize,
    /// Whether the run was stopped through its [`CancelToken`]
    pub cancelled: bool,
}

enum Outcome {
    Scored(ScoredPair),
    Skipped,
    Cancelled,
}

struct RunState {
    collector: ResultCollector,
    best: BestMatches,
    skipped: usize,
    cancelled: bool,
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Pairwise duplicate recognition over an entity store.
pub struct DuplicateRecognition {
    name: String,
    store: EntityStore,
    scorer: Scorer,
    strategy: Box<dyn PairStrategy>,
    threshold: f64,
    chunk_size: usize,
    limit: Option<usize>,
    cancel: CancelToken,
    existing_best: Vec<ScoredPair>,
}

impl DuplicateRecognition {
    pub fn builder(store: EntityStore, scorer: Scorer) -> DuplicateRecognitionBuilder {
        DuplicateRecognitionBuilder {
            name: "duplicates".to_string(),
            store,
            scorer,
            strategy: Box::new(AllPairs),
            threshold: DEFAULT_THRESHOLD,
            chunk_size: DEFAULT_CHUNK_SIZE,
            limit: None,
            cancel: CancelToken::new(),
            existing_best: Vec::new(),
            keep_attributes: None,
            clean: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn store(&self) -> &EntityStore {
        &self.store
    }

    pub fn scorer(&self) -> &Scorer {
        &self.scorer
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Run and return the report, without streaming to a sink.
    pub fn run(&self) -> Result<RunReport> {
        self.run_with_sink(&mut NullSink)
    }

    /// Run, streaming every scored comparison and the final best matches to
    /// `sink`.
    pub fn run_with_sink(&self, sink: &mut dyn EdgeSink) -> Result<RunReport> {
        let started = Instant::now();
        let stats = Statistics::new(self.name.as_str());
        tracing::info!(
            "[{}] Scoring {} entities (threshold {:.2}, chunk size {})",
            self.name,
            self.store.len(),
            self.threshold,
            self.chunk_size
        );

        let mut best = BestMatches::new();
        best.seed(self.existing_best.iter().cloned());
        let mut state = RunState {
            collector: ResultCollector::new(self.threshold)?,
            best,
            skipped: 0,
            cancelled: false,
        };

        let mut chunk: Vec<Pair> = Vec::with_capacity(self.chunk_size);
        let mut batches = 0usize;
        for batch in self.strategy.batches(&self.store) {
            if self.cancel.is_cancelled() {
                state.cancelled = true;
                break;
            }
            if self.limit.is_some_and(|limit| batches >= limit) {
                tracing::info!("[{}] Batch limit of {} reached", self.name, batches);
                break;
            }
            batches += 1;
            stats.record_batch();
            tracing::debug!(
                "[{}] Comparing {} with {} entities",
                self.name,
                batch.entity,
                batch.len()
            );

            chunk.extend(batch.pairs());
            while chunk.len() >= self.chunk_size {
                let rest = chunk.split_off(self.chunk_size);
                self.process_chunk(&chunk, &mut state, &stats, sink)?;
                chunk = rest;
                if state.cancelled {
                    break;
                }
            }
            if state.cancelled {
                break;
            }
        }
        if !state.cancelled && !chunk.is_empty() {
            self.process_chunk(&chunk, &mut state, &stats, sink)?;
        }
        if state.cancelled {
            tracing::info!("[{}] Run cancelled, keeping partial results", self.name);
        }

        let best_matches = state.best.to_vec();
        stats.time("write_best_matches", || sink.write_best_matches(&best_matches))?;
        stats.record_timing("run", started.elapsed());
        stats.report();

        let edges = state.collector.into_edges();
        tracing::info!(
            "[{}] Finished: {} edges, {} skipped pairs",
            self.name,
            edges.len(),
            state.skipped
        );

        Ok(RunReport {
            edges,
            best_matches,
            stats: stats.summary(),
            skipped: state.skipped,
            cancelled: state.cancelled,
        })
    }

    fn process_chunk(
        &self,
        pairs: &[Pair],
        state: &mut RunState,
        stats: &Statistics,
        sink: &mut dyn EdgeSink,
    ) -> Result<()> {
        // Score - parallel when feature enabled
        #[cfg(feature = "parallel")]
        let outcomes: Vec<Result<Outcome>> = stats.time("score_chunk", || {
            pairs.par_iter().map(|pair| self.score_one(pair)).collect()
        });

        #[cfg(not(feature = "parallel"))]
        let outcomes: Vec<Result<Outcome>> = stats.time("score_chunk", || {
            pairs.iter().map(|pair| self.score_one(pair)).collect()
        });

        let mut written = Vec::with_capacity(outcomes.len());
        for outcome in outcomes {
            match outcome? {
                Outcome::Scored(scored) => {
                    stats.record_pair(scored.count);
                    state.best.offer(&scored);
                    state.collector.offer(scored.clone());
                    written.push(scored);
                }
                Outcome::Skipped => state.skipped += 1,
                Outcome::Cancelled => state.cancelled = true,
            }
        }

        if !written.is_empty() {
            stats.time("write_comparisons", || sink.write_comparisons(&written))?;
        }
        Ok(())
    }

    fn score_one(&self, pair: &Pair) -> Result<Outcome> {
        if self.cancel.is_cancelled() {
            return Ok(Outcome::Cancelled);
        }

        let (a, b) = match (self.store.get(pair.a), self.store.get(pair.b)) {
            (Some(a), Some(b)) => (a, b),
            (None, _) => return self.unknown_entity(pair, DuprecError::UnknownEntity(pair.a)),
            (_, None) => return self.unknown_entity(pair, DuprecError::UnknownEntity(pair.b)),
        };

        Ok(match self.scorer.score_pair(a, b)? {
            Some(scored) => Outcome::Scored(scored),
            None => Outcome::Skipped,
        })
    }

    fn unknown_entity(&self, pair: &Pair, err: DuprecError) -> Result<Outcome> {
        tracing::error!("[{}] Pair ({}, {}): {}", self.name, pair.a, pair.b, err);
        match self.scorer.error_policy() {
            ErrorPolicy::Abort => Err(err),
            ErrorPolicy::SkipPair | ErrorPolicy::IgnoreComparator => Ok(Outcome::Skipped),
        }
    }
}

/// Builder for [`DuplicateRecognition`].
pub struct DuplicateRecognitionBuilder {
    name: String,
    store: EntityStore,
    scorer: Scorer,
    strategy: Box<dyn PairStrategy>,
    threshold: f64,
    chunk_size: usize,
    limit: Option<usize>,
    cancel: CancelToken,
    existing_best: Vec<ScoredPair>,
    keep_attributes: Option<HashSet<String>>,
    clean: bool,
}

impl DuplicateRecognitionBuilder {
    /// Name used in log lines and statistics.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn strategy(mut self, strategy: impl PairStrategy + 'static) -> Self {
        self.strategy = Box::new(strategy);
        self
    }

    pub fn boxed_strategy(mut self, strategy: Box<dyn PairStrategy>) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    /// Stop after this many comparison batches. `Some(0)` is rejected by
    /// [`build`](Self::build).
    pub fn limit(mut self, limit: Option<usize>) -> Self {
        self.limit = limit;
        self
    }

    pub fn cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = token;
        self
    }

    /// Best matches stored by an earlier run.
    pub fn existing_best(mut self, existing: Vec<ScoredPair>) -> Self {
        self.existing_best = existing;
        self
    }

    /// Clean entity values before scoring (trim, lowercase, drop empties).
    /// With `keep`, attributes outside the set are dropped too.
    pub fn clean_entities(mut self, keep: Option<HashSet<String>>) -> Self {
        self.clean = true;
        self.keep_attributes = keep;
        self
    }

    pub fn build(self) -> Result<DuplicateRecognition> {
        if !self.threshold.is_finite() {
            return Err(DuprecError::Configuration(format!(
                "threshold must be finite, got {}",
                self.threshold
            )));
        }
        if self.chunk_size == 0 {
            return Err(DuprecError::Configuration("chunk_size must be > 0".into()));
        }
        if self.limit == Some(0) {
            return Err(DuprecError::Configuration("limit must be > 0 when set".into()));
        }

        let store = if self.clean {
            let keep = self.keep_attributes;
            self.store.map_entities(|e| prepare_entity(e, keep.as_ref()))
        } else {
            self.store
        };

        Ok(DuplicateRecognition {
            name: self.name,
            store,
            scorer: self.scorer,
            strategy: self.strategy,
            threshold: self.threshold,
            chunk_size: self.chunk_size,
            limit: self.limit,
            cancel: self.cancel,
            existing_best: self.existing_best,
        })
    }
}
