//! Pair generation
//!
//! Strategies produce a lazy, finite stream of [`PairBatch`]es: one entity
//! and the pool of entities it must be compared with. Flattening the batches
//! gives the edge list to score. Every strategy guarantees that no pair is a
//! self pair and that no unordered pair is emitted twice.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::entity::{Entity, EntityId, EntityStore};
use crate::normalize::clean_value;

/// Two entity ids to compare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Pair {
    pub a: EntityId,
    pub b: EntityId,
}

impl Pair {
    pub fn new(a: u64, b: u64) -> Self {
        Self {
            a: EntityId(a),
            b: EntityId(b),
        }
    }

    /// Order-independent key: `(A, B)` and `(B, A)` share it.
    pub fn key(&self) -> (EntityId, EntityId) {
        if self.a <= self.b {
            (self.a, self.b)
        } else {
            (self.b, self.a)
        }
    }

    pub fn is_self_pair(&self) -> bool {
        self.a == self.b
    }
}

/// One entity and the entities it is compared with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairBatch {
    pub entity: EntityId,
    pub pool: Vec<EntityId>,
}

impl PairBatch {
    pub fn pairs(&self) -> impl Iterator<Item = Pair> + '_ {
        self.pool.iter().map(move |&other| Pair {
            a: self.entity,
            b: other,
        })
    }

    pub fn len(&self) -> usize {
        self.pool.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pool.is_empty()
    }
}

/// Decides which pairs of a store get compared.
pub trait PairStrategy: Send + Sync {
    /// Lazily produce the comparison batches. Empty batches are never yielded.
    fn batches<'a>(&'a self, store: &'a EntityStore) -> Box<dyn Iterator<Item = PairBatch> + 'a>;

    /// Flattened pair stream.
    fn pairs<'a>(&'a self, store: &'a EntityStore) -> Box<dyn Iterator<Item = Pair> + 'a> {
        Box::new(
            self.batches(store)
                .flat_map(|batch| batch.pairs().collect::<Vec<_>>()),
        )
    }
}

// ---------------------------------------------------------------------------
// All pairs
// ---------------------------------------------------------------------------

/// Full cross product minus self and mirrored pairs: `n·(n-1)/2` pairs.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllPairs;

impl PairStrategy for AllPairs {
    fn batches<'a>(&'a self, store: &'a EntityStore) -> Box<dyn Iterator<Item = PairBatch> + 'a> {
        let entities = store.as_slice();
        Box::new((0..entities.len()).filter_map(move |i| {
            let pool: Vec<EntityId> = entities[i + 1..].iter().map(|e| e.id).collect();
            (!pool.is_empty()).then(|| PairBatch {
                entity: entities[i].id,
                pool,
            })
        }))
    }
}

// ---------------------------------------------------------------------------
// Blocking key
// ---------------------------------------------------------------------------

/// Only compare entities that share the cleaned value of one attribute.
///
/// Entities without the attribute are never paired.
#[derive(Debug, Clone)]
pub struct BlockingKey {
    attribute: String,
}

impl BlockingKey {
    pub fn new(attribute: impl Into<String>) -> Self {
        Self {
            attribute: attribute.into(),
        }
    }

    fn block_of(&self, entity: &Entity) -> Option<String> {
        entity
            .get(&self.attribute)
            .and_then(clean_value)
            .map(|v| v.to_text())
    }
}

impl PairStrategy for BlockingKey {
    fn batches<'a>(&'a self, store: &'a EntityStore) -> Box<dyn Iterator<Item = PairBatch> + 'a> {
        let entities = store.as_slice();

        // Positions per block, in store order.
        let mut blocks: Vec<Vec<usize>> = Vec::new();
        let mut block_index: HashMap<String, usize> = HashMap::new();
        let mut membership: Vec<Option<(usize, usize)>> = Vec::with_capacity(entities.len());
        for (pos, entity) in entities.iter().enumerate() {
            match self.block_of(entity) {
                Some(key) => {
                    let b = *block_index.entry(key).or_insert_with(|| {
                        blocks.push(Vec::new());
                        blocks.len() - 1
                    });
                    membership.push(Some((b, blocks[b].len())));
                    blocks[b].push(pos);
                }
                None => membership.push(None),
            }
        }

        Box::new((0..entities.len()).filter_map(move |i| {
            let (b, rank) = membership[i]?;
            let pool: Vec<EntityId> = blocks[b][rank + 1..]
                .iter()
                .map(|&pos| entities[pos].id)
                .collect();
            (!pool.is_empty()).then(|| PairBatch {
                entity: entities[i].id,
                pool,
            })
        }))
    }
}

// ---------------------------------------------------------------------------
// Closure restriction
// ---------------------------------------------------------------------------

/// Restricts another strategy with a caller-supplied predicate.
pub struct Filtered<S, F> {
    inner: S,
    predicate: F,
}

impl<S, F> Filtered<S, F>
where
    S: PairStrategy,
    F: Fn(&Entity, &Entity) -> bool + Send + Sync,
{
    pub fn new(inner: S, predicate: F) -> Self {
        Self { inner, predicate }
    }
}

impl<S, F> PairStrategy for Filtered<S, F>
where
    S: PairStrategy,
    F: Fn(&Entity, &Entity) -> bool + Send + Sync,
{
    fn batches<'a>(&'a self, store: &'a EntityStore) -> Box<dyn Iterator<Item = PairBatch> + 'a> {
        Box::new(self.inner.batches(store).filter_map(move |mut batch| {
            // Unknown ids are kept so the engine can report them.
            if let Some(entity) = store.get(batch.entity) {
                batch.pool.retain(|&other| match store.get(other) {
                    Some(other) => (self.predicate)(entity, other),
                    None => true,
                });
            }
            (!batch.is_empty()).then_some(batch)
        }))
    }
}

// ---------------------------------------------------------------------------
// Incremental plan
// ---------------------------------------------------------------------------

/// Plan for a run over a partially compared population.
///
/// 1. `refresh` pairs (already compared, but one side changed) come first,
///    grouped by their first id.
/// 2. Each `uncompared` id is then compared with every id compared so far
///    and joins that set afterwards. With nothing compared yet, the first
///    uncompared id seeds the set.
#[derive(Debug, Clone, Default)]
pub struct IncrementalPlan {
    pub refresh: Vec<Pair>,
    pub compared: Vec<EntityId>,
    pub uncompared: Vec<EntityId>,
}

impl IncrementalPlan {
    pub fn new(compared: Vec<EntityId>, uncompared: Vec<EntityId>) -> Self {
        Self {
            refresh: Vec::new(),
            compared,
            uncompared,
        }
    }

    pub fn with_refresh(mut self, refresh: Vec<Pair>) -> Self {
        self.refresh = refresh;
        self
    }

    /// Treat every store entity outside `compared` as uncompared.
    pub fn from_store(store: &EntityStore, compared: Vec<EntityId>) -> Self {
        let seen: HashSet<EntityId> = compared.iter().copied().collect();
        let uncompared = store.ids().filter(|id| !seen.contains(id)).collect();
        Self::new(compared, uncompared)
    }

    fn refresh_batches(&self) -> (Vec<PairBatch>, HashSet<(EntityId, EntityId)>) {
        let mut batches: Vec<PairBatch> = Vec::new();
        let mut by_entity: HashMap<EntityId, usize> = HashMap::new();
        let mut seen: HashSet<(EntityId, EntityId)> = HashSet::new();

        for pair in &self.refresh {
            if pair.is_self_pair() || !seen.insert(pair.key()) {
                continue;
            }
            let idx = *by_entity.entry(pair.a).or_insert_with(|| {
                batches.push(PairBatch {
                    entity: pair.a,
                    pool: Vec::new(),
                });
                batches.len() - 1
            });
            batches[idx].pool.push(pair.b);
        }
        (batches, seen)
    }
}

impl PairStrategy for IncrementalPlan {
    fn batches<'a>(&'a self, _store: &'a EntityStore) -> Box<dyn Iterator<Item = PairBatch> + 'a> {
        let (refresh, refreshed) = self.refresh_batches();
        if refresh.is_empty() {
            tracing::info!("No existing pairs need to be refreshed.");
        }

        let mut existing: Vec<EntityId> = Vec::new();
        let mut existing_set: HashSet<EntityId> = HashSet::new();
        for &id in &self.compared {
            if existing_set.insert(id) {
                existing.push(id);
            }
        }
        if existing.is_empty() {
            match self.uncompared.first() {
                Some(&first) => {
                    existing.push(first);
                    existing_set.insert(first);
                }
                None => tracing::info!("No new pairs need to be compared."),
            }
        }

        let new_pairs = self.uncompared.iter().filter_map(move |&a| {
            if !existing_set.insert(a) {
                return None;
            }
            let pool: Vec<EntityId> = existing
                .iter()
                .copied()
                .filter(|&b| !refreshed.contains(&Pair { a, b }.key()))
                .collect();
            existing.push(a);
            (!pool.is_empty()).then(|| PairBatch { entity: a, pool })
        });

        Box::new(refresh.into_iter().chain(new_pairs))
    }
}
