//! Result collection: threshold filtering and per-entity best matches.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::entity::EntityId;
use crate::error::{DuprecError, Result};
use crate::scorer::ScoredPair;

/// Keeps scored pairs at or above a threshold, in insertion order.
#[derive(Debug, Clone)]
pub struct ResultCollector {
    threshold: f64,
    edges: Vec<ScoredPair>,
    seen: usize,
}

impl ResultCollector {
    pub fn new(threshold: f64) -> Result<Self> {
        if !threshold.is_finite() {
            return Err(DuprecError::Configuration(format!(
                "threshold must be finite, got {threshold}"
            )));
        }
        Ok(Self {
            threshold,
            edges: Vec::new(),
            seen: 0,
        })
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Offer a pair; returns whether it was accepted.
    pub fn offer(&mut self, pair: ScoredPair) -> bool {
        self.seen += 1;
        if pair.score >= self.threshold {
            self.edges.push(pair);
            true
        } else {
            false
        }
    }

    pub fn extend(&mut self, pairs: impl IntoIterator<Item = ScoredPair>) {
        for pair in pairs {
            self.offer(pair);
        }
    }

    /// Number of pairs offered so far.
    pub fn seen(&self) -> usize {
        self.seen
    }

    pub fn edges(&self) -> &[ScoredPair] {
        &self.edges
    }

    pub fn into_edges(self) -> Vec<ScoredPair> {
        self.edges
    }
}

/// An entity's closest match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BestMatch {
    pub entity: EntityId,
    pub other: EntityId,
    pub comparison: ScoredPair,
}

/// Highest scoring comparison per entity.
///
/// Comparisons grow quadratically, so callers usually persist only each
/// entity's closest match. Seed with previously stored matches before an
/// incremental run, otherwise entities outside the run lose theirs.
#[derive(Debug, Clone, Default)]
pub struct BestMatches {
    best: HashMap<EntityId, ScoredPair>,
    order: Vec<EntityId>,
}

impl BestMatches {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load matches from an earlier run.
    pub fn seed(&mut self, existing: impl IntoIterator<Item = ScoredPair>) {
        for pair in existing {
            self.offer(&pair);
        }
    }

    /// Record `pair` for both of its entities where it is at least as good as
    /// the current best. Ties go to the later comparison.
    pub fn offer(&mut self, pair: &ScoredPair) {
        self.offer_for(pair.a, pair);
        self.offer_for(pair.b, pair);
    }

    fn offer_for(&mut self, entity: EntityId, pair: &ScoredPair) {
        match self.best.get(&entity) {
            Some(current) if current.score > pair.score => {}
            Some(_) => {
                self.best.insert(entity, pair.clone());
            }
            None => {
                self.order.push(entity);
                self.best.insert(entity, pair.clone());
            }
        }
    }

    pub fn get(&self, entity: EntityId) -> Option<&ScoredPair> {
        self.best.get(&entity)
    }

    pub fn len(&self) -> usize {
        self.best.len()
    }

    pub fn is_empty(&self) -> bool {
        self.best.is_empty()
    }

    /// `(entity, other, comparison)` in first-seen order.
    pub fn entries(&self) -> impl Iterator<Item = (EntityId, EntityId, &ScoredPair)> + '_ {
        self.order.iter().filter_map(move |&entity| {
            let pair = self.best.get(&entity)?;
            Some((entity, pair.other(entity)?, pair))
        })
    }

    pub fn to_vec(&self) -> Vec<BestMatch> {
        self.entries()
            .map(|(entity, other, pair)| BestMatch {
                entity,
                other,
                comparison: pair.clone(),
            })
            .collect()
    }
}
