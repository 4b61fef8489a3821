//! Weighted scoring of entity pairs
//!
//! The scorer runs every configured comparator on a pair and aggregates the
//! results into one [`ScoredPair`]. How comparator failures and missing
//! attributes are treated is injected through [`ErrorPolicy`] and
//! [`MissingPolicy`].

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::comparator::{Comparator, ScoreRange};
use crate::entity::{Entity, EntityId};
use crate::error::{ComparatorError, DuprecError, Result};
use crate::pairs::Pair;

/// How comparator scores are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Aggregation {
    /// `(Σ w·s - Σ penalties) / Σ w`, where `Σ w` sums only the weights of
    /// contributing positive comparators.
    #[default]
    WeightedMean,
    /// Signed weighted sum divided by the number of contributing comparators.
    CountMean,
    /// Best single comparator score. Negative comparators are ignored.
    Max,
}

/// What to do when a comparator fails on a pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorPolicy {
    /// Log the failure and drop the pair; the run continues.
    #[default]
    SkipPair,
    /// Score the pair without the failing comparator.
    IgnoreComparator,
    /// Stop the run and return the error.
    Abort,
}

/// What to do when a comparator reports a missing attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingPolicy {
    /// The comparator simply does not contribute.
    #[default]
    Abstain,
    /// Treat it as an `InvalidInput` error, handled by the [`ErrorPolicy`].
    Fail,
}

/// One comparator's contribution to a pair score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldScore {
    pub name: String,
    pub score: f64,
    /// Signed: penalties carry a negative weight.
    pub weight: f64,
}

/// A scored comparison between two entities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredPair {
    pub a: EntityId,
    pub b: EntityId,
    pub score: f64,
    pub breakdown: Vec<FieldScore>,
    /// Number of comparators that contributed.
    pub count: usize,
    /// Signed sum of contributing weights.
    pub weight_sum: f64,
}

impl ScoredPair {
    pub fn pair(&self) -> Pair {
        Pair { a: self.a, b: self.b }
    }

    /// The other side of the pair, if `id` is part of it.
    pub fn other(&self, id: EntityId) -> Option<EntityId> {
        if id == self.a {
            Some(self.b)
        } else if id == self.b {
            Some(self.a)
        } else {
            None
        }
    }

    /// Score of a single comparator, if it contributed.
    pub fn field(&self, name: &str) -> Option<f64> {
        self.breakdown.iter().find(|f| f.name == name).map(|f| f.score)
    }
}

#[derive(Clone)]
struct WeightedComparator {
    comparator: Arc<dyn Comparator>,
    weight: f64,
}

/// Applies a weighted comparator set to entity pairs.
#[derive(Clone)]
pub struct Scorer {
    comparators: Vec<WeightedComparator>,
    aggregation: Aggregation,
    error_policy: ErrorPolicy,
    missing_policy: MissingPolicy,
    range: ScoreRange,
}

impl fmt::Debug for Scorer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let comparators: Vec<(&str, f64)> = self
            .comparators
            .iter()
            .map(|c| (c.comparator.name(), c.weight))
            .collect();
        f.debug_struct("Scorer")
            .field("comparators", &comparators)
            .field("aggregation", &self.aggregation)
            .field("error_policy", &self.error_policy)
            .field("missing_policy", &self.missing_policy)
            .field("range", &self.range)
            .finish()
    }
}

impl Scorer {
    pub fn builder() -> ScorerBuilder {
        ScorerBuilder::default()
    }

    pub fn range(&self) -> ScoreRange {
        self.range
    }

    pub fn error_policy(&self) -> ErrorPolicy {
        self.error_policy
    }

    pub fn comparator_names(&self) -> impl Iterator<Item = &str> {
        self.comparators.iter().map(|c| c.comparator.name())
    }

    /// Score one pair.
    ///
    /// Returns `Ok(None)` when the pair was skipped under
    /// [`ErrorPolicy::SkipPair`], and `Err` only under [`ErrorPolicy::Abort`].
    pub fn score_pair(&self, a: &Entity, b: &Entity) -> Result<Option<ScoredPair>> {
        let mut breakdown = Vec::with_capacity(self.comparators.len());

        for wc in &self.comparators {
            let cmp = wc.comparator.as_ref();
            let failure = match cmp.compare(a, b) {
                Ok(score) if score.is_finite() && self.range.contains(score) => {
                    let weight = if cmp.is_negative() { -wc.weight } else { wc.weight };
                    breakdown.push(FieldScore {
                        name: cmp.name().to_string(),
                        score,
                        weight,
                    });
                    continue;
                }
                Ok(score) => ComparatorError::failed(format!(
                    "score {score} outside range {}..={}",
                    self.range.min, self.range.max
                )),
                Err(ComparatorError::MissingAttribute { .. })
                    if self.missing_policy == MissingPolicy::Abstain =>
                {
                    continue;
                }
                Err(e) => e,
            };

            let missing_on = match &failure {
                ComparatorError::MissingAttribute { attribute } if !a.has(attribute) => a.id,
                _ => b.id,
            };
            let err = failure.into_duprec(cmp.name(), a.id, b.id, missing_on);
            match self.error_policy {
                ErrorPolicy::SkipPair => {
                    tracing::warn!("Skipping pair ({}, {}): {}", a.id, b.id, err);
                    return Ok(None);
                }
                ErrorPolicy::IgnoreComparator => {
                    tracing::debug!("Ignoring comparator on ({}, {}): {}", a.id, b.id, err);
                }
                ErrorPolicy::Abort => return Err(err),
            }
        }

        Ok(Some(self.aggregate(a.id, b.id, breakdown)))
    }

    fn aggregate(&self, a: EntityId, b: EntityId, breakdown: Vec<FieldScore>) -> ScoredPair {
        let count = breakdown.len();
        let weight_sum: f64 = breakdown.iter().map(|f| f.weight).sum();
        let signed_sum: f64 = breakdown.iter().map(|f| f.weight * f.score).sum();
        let positive_weight: f64 = breakdown
            .iter()
            .filter(|f| f.weight > 0.0)
            .map(|f| f.weight)
            .sum();

        // No positive evidence scores 0, not the bottom of the range.
        let raw = match self.aggregation {
            Aggregation::WeightedMean if positive_weight > 0.0 => signed_sum / positive_weight,
            Aggregation::CountMean if positive_weight > 0.0 => signed_sum / count as f64,
            Aggregation::Max => breakdown
                .iter()
                .filter(|f| f.weight > 0.0)
                .map(|f| f.score)
                .reduce(f64::max)
                .unwrap_or(0.0),
            _ => 0.0,
        };

        ScoredPair {
            a,
            b,
            score: self.range.clamp(raw),
            breakdown,
            count,
            weight_sum,
        }
    }
}

/// Builder for [`Scorer`].
#[derive(Default)]
pub struct ScorerBuilder {
    comparators: Vec<WeightedComparator>,
    aggregation: Aggregation,
    error_policy: ErrorPolicy,
    missing_policy: MissingPolicy,
}

impl ScorerBuilder {
    pub fn comparator(mut self, comparator: impl Comparator + 'static, weight: f64) -> Self {
        self.comparators.push(WeightedComparator {
            comparator: Arc::new(comparator),
            weight,
        });
        self
    }

    pub fn shared_comparator(mut self, comparator: Arc<dyn Comparator>, weight: f64) -> Self {
        self.comparators.push(WeightedComparator { comparator, weight });
        self
    }

    pub fn aggregation(mut self, aggregation: Aggregation) -> Self {
        self.aggregation = aggregation;
        self
    }

    pub fn error_policy(mut self, policy: ErrorPolicy) -> Self {
        self.error_policy = policy;
        self
    }

    pub fn missing_policy(mut self, policy: MissingPolicy) -> Self {
        self.missing_policy = policy;
        self
    }

    pub fn build(self) -> Result<Scorer> {
        if self.comparators.is_empty() {
            return Err(DuprecError::Configuration(
                "at least one comparator is required".into(),
            ));
        }

        for wc in &self.comparators {
            if !wc.weight.is_finite() || wc.weight < 0.0 {
                return Err(DuprecError::Configuration(format!(
                    "comparator '{}': weight must be finite and >= 0, got {}",
                    wc.comparator.name(),
                    wc.weight
                )));
            }
        }

        let range = self.comparators[0].comparator.range();
        if let Some(other) = self.comparators.iter().find(|wc| wc.comparator.range() != range) {
            return Err(DuprecError::Configuration(format!(
                "comparator '{}' declares a different score range",
                other.comparator.name()
            )));
        }

        // Zero-weight comparators can never change a score.
        let comparators: Vec<WeightedComparator> = self
            .comparators
            .into_iter()
            .filter(|wc| {
                if wc.weight == 0.0 {
                    tracing::debug!("Dropping zero-weight comparator '{}'", wc.comparator.name());
                }
                wc.weight > 0.0
            })
            .collect();

        if !comparators.iter().any(|wc| !wc.comparator.is_negative()) {
            return Err(DuprecError::Configuration(
                "at least one non-negative comparator must have a positive weight".into(),
            ));
        }

        Ok(Scorer {
            comparators,
            aggregation: self.aggregation,
            error_policy: self.error_policy,
            missing_policy: self.missing_policy,
            range,
        })
    }
}
