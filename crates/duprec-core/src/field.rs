//! Built-in per-attribute comparator.

use std::sync::Arc;

use crate::algorithm::Algorithm;
use crate::comparator::Comparator;
use crate::country::CountryResolver;
use crate::entity::Entity;
use crate::error::ComparatorError;

/// Compares one attribute of two entities with a matching [`Algorithm`].
///
/// Scores below `threshold` are zeroed. A `negative` field scores
/// disagreement (`1 - s`), which the scorer turns into a penalty.
#[derive(Debug, Clone)]
pub struct FieldComparator {
    attribute: String,
    algorithm: Algorithm,
    threshold: f64,
    negative: bool,
    countries: Option<Arc<CountryResolver>>,
}

impl FieldComparator {
    pub fn new(attribute: impl Into<String>, algorithm: Algorithm) -> Self {
        Self {
            attribute: attribute.into(),
            algorithm,
            threshold: 0.0,
            negative: false,
            countries: None,
        }
    }

    pub fn threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn negative(mut self, negative: bool) -> Self {
        self.negative = negative;
        self
    }

    /// Use a custom country table for [`Algorithm::Country`].
    pub fn countries(mut self, countries: Arc<CountryResolver>) -> Self {
        self.countries = Some(countries);
        self
    }

    pub fn attribute(&self) -> &str {
        &self.attribute
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }
}

impl Comparator for FieldComparator {
    fn name(&self) -> &str {
        &self.attribute
    }

    fn is_negative(&self) -> bool {
        self.negative
    }

    fn compare(&self, a: &Entity, b: &Entity) -> Result<f64, ComparatorError> {
        let (x, y) = match (a.get(&self.attribute), b.get(&self.attribute)) {
            (Some(x), Some(y)) => (x, y),
            _ => return Err(ComparatorError::missing(self.attribute.as_str())),
        };

        let mut score = match &self.countries {
            Some(countries) => self.algorithm.compare_with(x, y, countries),
            None => self.algorithm.compare(x, y),
        };
        if score < self.threshold {
            score = 0.0;
        }
        if self.negative {
            score = 1.0 - score;
        }
        Ok(score)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_threshold_zeroes_weak_scores() {
        let cmp = FieldComparator::new("last_name", Algorithm::PhoneticDistance).threshold(0.8);
        let a = Entity::new(1).with("last_name", "john");
        let b = Entity::new(2).with("last_name", "jon");
        assert_eq!(cmp.compare(&a, &b), Ok(0.0));

        let c = Entity::new(3).with("last_name", "johnson");
        let d = Entity::new(4).with("last_name", "johnsen");
        assert!(cmp.compare(&c, &d).unwrap() > 0.85);
    }

    #[test]
    fn test_negative_field_scores_disagreement() {
        let cmp = FieldComparator::new("country", Algorithm::Country).negative(true);
        let de = Entity::new(1).with("country", "de");
        let germany = Entity::new(2).with("country", "germany");
        let fr = Entity::new(3).with("country", "fr");
        assert_eq!(cmp.compare(&de, &germany), Ok(0.0));
        assert_eq!(cmp.compare(&de, &fr), Ok(1.0));
        assert!(cmp.is_negative());
    }

    #[test]
    fn test_missing_attribute() {
        let cmp = FieldComparator::new("phone", Algorithm::Phone);
        let a = Entity::new(1).with("phone", "123");
        let b = Entity::new(2);
        assert_eq!(cmp.compare(&a, &b), Err(ComparatorError::missing("phone")));
    }

    #[test]
    fn test_custom_country_table() {
        let countries = Arc::new(CountryResolver::new().with_alias("bundesrepublik", "Germany"));
        let cmp = FieldComparator::new("country", Algorithm::Country).countries(countries);
        let a = Entity::new(1).with("country", "Bundesrepublik");
        let b = Entity::new(2).with("country", "DE");
        assert_eq!(cmp.compare(&a, &b), Ok(1.0));
    }
}
