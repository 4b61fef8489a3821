//! TOML configuration for a duplicate recognition run
//!
//! ```toml
//! name = "contacts"
//! threshold = 0.8
//! blocking_key = "postal_code"
//!
//! [fields.last_name]
//! weight = 0.5
//! algorithm = "phonetic_distance"
//! threshold = 0.8
//!
//! [fields.country]
//! weight = 0.1
//! algorithm = "country"
//! negative = true
//!
//! [country_aliases]
//! "alemania" = "Germany"
//! ```

use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::algorithm::Algorithm;
use crate::country::CountryResolver;
use crate::engine::{DuplicateRecognition, DEFAULT_CHUNK_SIZE, DEFAULT_THRESHOLD};
use crate::entity::EntityStore;
use crate::error::{DuprecError, Result};
use crate::field::FieldComparator;
use crate::pairs::{AllPairs, BlockingKey, PairStrategy};
use crate::scorer::{Aggregation, ErrorPolicy, MissingPolicy, Scorer};

/// Weight for identifier-like fields where an exact match is near proof.
pub const EXACT_MATCH_WEIGHT: f64 = 10.0;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DuprecConfig {
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default = "default_threshold")]
    pub threshold: f64,
    #[serde(default)]
    pub aggregation: Aggregation,
    #[serde(default)]
    pub error_policy: ErrorPolicy,
    #[serde(default)]
    pub missing: MissingPolicy,
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    /// Maximum number of comparison batches per run
    #[serde(default)]
    pub limit: Option<usize>,
    #[serde(default)]
    pub blocking_key: Option<String>,
    /// Trim and lowercase values, dropping attributes no field uses
    #[serde(default = "default_clean")]
    pub clean: bool,
    pub fields: BTreeMap<String, FieldConfig>,
    #[serde(default)]
    pub country_aliases: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldConfig {
    pub weight: f64,
    #[serde(default)]
    pub algorithm: Algorithm,
    #[serde(default)]
    pub threshold: f64,
    #[serde(default)]
    pub negative: bool,
}

fn default_name() -> String {
    "duplicates".to_string()
}

fn default_threshold() -> f64 {
    DEFAULT_THRESHOLD
}

fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}

fn default_clean() -> bool {
    true
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl DuprecConfig {
    pub fn from_toml(input: &str) -> Result<Self> {
        let config: DuprecConfig =
            toml::from_str(input).map_err(|e| DuprecError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let input = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml(&input)
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.threshold) {
            return Err(DuprecError::Configuration(format!(
                "threshold must be within 0..=1, got {}",
                self.threshold
            )));
        }

        if self.chunk_size == 0 {
            return Err(DuprecError::Configuration("chunk_size must be > 0".into()));
        }
        if self.limit == Some(0) {
            return Err(DuprecError::Configuration("limit must be > 0 when set".into()));
        }

        for (name, field) in &self.fields {
            if !field.weight.is_finite() || field.weight < 0.0 {
                return Err(DuprecError::Configuration(format!(
                    "field '{name}': weight must be finite and >= 0, got {}",
                    field.weight
                )));
            }
            if !(0.0..=1.0).contains(&field.threshold) {
                return Err(DuprecError::Configuration(format!(
                    "field '{name}': threshold must be within 0..=1, got {}",
                    field.threshold
                )));
            }
        }

        if !self.fields.values().any(|f| f.weight > 0.0 && !f.negative) {
            return Err(DuprecError::Configuration(
                "at least one non-negative field with a positive weight is required".into(),
            ));
        }

        Ok(())
    }

    // -----------------------------------------------------------------------
    // Build
    // -----------------------------------------------------------------------

    pub fn build_scorer(&self) -> Result<Scorer> {
        let countries = self
            .country_aliases
            .iter()
            .fold(CountryResolver::new(), |r, (alias, canonical)| {
                r.with_alias(alias, canonical)
            });
        let countries = Arc::new(countries);

        let mut builder = Scorer::builder()
            .aggregation(self.aggregation)
            .error_policy(self.error_policy)
            .missing_policy(self.missing);

        for (name, field) in &self.fields {
            let mut comparator = FieldComparator::new(name.as_str(), field.algorithm)
                .threshold(field.threshold)
                .negative(field.negative);
            if field.algorithm == Algorithm::Country {
                comparator = comparator.countries(Arc::clone(&countries));
            }
            builder = builder.comparator(comparator, field.weight);
        }

        builder.build()
    }

    pub fn pair_strategy(&self) -> Box<dyn PairStrategy> {
        match &self.blocking_key {
            Some(key) => Box::new(BlockingKey::new(key.as_str())),
            None => Box::new(AllPairs),
        }
    }

    /// Attributes that take part in scoring or blocking.
    pub fn scored_attributes(&self) -> HashSet<String> {
        self.fields
            .iter()
            .filter(|(_, f)| f.weight > 0.0)
            .map(|(name, _)| name.clone())
            .chain(self.blocking_key.iter().cloned())
            .collect()
    }

    /// Engine over `store` with this config's scorer, strategy and limits.
    pub fn build_engine(&self, store: EntityStore) -> Result<DuplicateRecognition> {
        let mut builder = DuplicateRecognition::builder(store, self.build_scorer()?)
            .name(self.name.as_str())
            .boxed_strategy(self.pair_strategy())
            .threshold(self.threshold)
            .chunk_size(self.chunk_size)
            .limit(self.limit);
        if self.clean {
            builder = builder.clean_entities(Some(self.scored_attributes()));
        }
        builder.build()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
