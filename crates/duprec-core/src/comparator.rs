//! The comparator capability injected by consuming applications.
//!
//! A comparator maps two entities to a score inside its declared
//! [`ScoreRange`]. Weighting and aggregation are the scorer's job; a
//! comparator only judges one aspect of a pair.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::entity::Entity;
use crate::error::ComparatorError;

/// Inclusive bounds of a comparator's output.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreRange {
    pub min: f64,
    pub max: f64,
}

impl ScoreRange {
    /// The usual 0.0..=1.0 similarity range.
    pub const UNIT: ScoreRange = ScoreRange { min: 0.0, max: 1.0 };

    pub fn new(min: f64, max: f64) -> Option<Self> {
        if min.is_finite() && max.is_finite() && min < max {
            Some(Self { min, max })
        } else {
            None
        }
    }

    pub fn clamp(&self, score: f64) -> f64 {
        if score.is_nan() {
            return self.min;
        }
        score.clamp(self.min, self.max)
    }

    pub fn contains(&self, score: f64) -> bool {
        score >= self.min && score <= self.max
    }
}

impl Default for ScoreRange {
    fn default() -> Self {
        Self::UNIT
    }
}

/// Computes a similarity score between two entities.
pub trait Comparator: Send + Sync {
    /// Name used in score breakdowns and error messages.
    fn name(&self) -> &str;

    /// Output bounds.
    fn range(&self) -> ScoreRange {
        ScoreRange::UNIT
    }

    /// Whether this comparator scores disagreement (a penalty) rather than
    /// agreement.
    fn is_negative(&self) -> bool {
        false
    }

    fn compare(&self, a: &Entity, b: &Entity) -> Result<f64, ComparatorError>;
}

/// A comparator backed by a closure.
pub struct FnComparator<F> {
    name: String,
    range: ScoreRange,
    f: F,
}

impl<F> FnComparator<F>
where
    F: Fn(&Entity, &Entity) -> Result<f64, ComparatorError> + Send + Sync,
{
    pub fn new(name: impl Into<String>, f: F) -> Self {
        Self {
            name: name.into(),
            range: ScoreRange::UNIT,
            f,
        }
    }

    pub fn with_range(mut self, range: ScoreRange) -> Self {
        self.range = range;
        self
    }
}

impl<F> Comparator for FnComparator<F>
where
    F: Fn(&Entity, &Entity) -> Result<f64, ComparatorError> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn range(&self) -> ScoreRange {
        self.range
    }

    fn compare(&self, a: &Entity, b: &Entity) -> Result<f64, ComparatorError> {
        (self.f)(a, b)
    }
}

impl<F> fmt::Debug for FnComparator<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnComparator")
            .field("name", &self.name)
            .field("range", &self.range)
            .finish()
    }
}

/// Wrap a closure over two whole entities.
pub fn comparator_fn<F>(name: impl Into<String>, f: F) -> FnComparator<F>
where
    F: Fn(&Entity, &Entity) -> Result<f64, ComparatorError> + Send + Sync,
{
    FnComparator::new(name, f)
}

/// Wrap a string metric applied to one attribute of both entities.
///
/// The attribute is required; its absence on either side is reported as
/// [`ComparatorError::MissingAttribute`].
pub fn text_comparator<M>(
    name: impl Into<String>,
    attribute: impl Into<String>,
    metric: M,
) -> FnComparator<impl Fn(&Entity, &Entity) -> Result<f64, ComparatorError> + Send + Sync>
where
    M: Fn(&str, &str) -> f64 + Send + Sync,
{
    let attribute = attribute.into();
    FnComparator::new(name, move |a: &Entity, b: &Entity| {
        match (a.get(&attribute), b.get(&attribute)) {
            (Some(x), Some(y)) => Ok(metric(&x.to_text(), &y.to_text())),
            _ => Err(ComparatorError::missing(attribute.as_str())),
        }
    })
}
