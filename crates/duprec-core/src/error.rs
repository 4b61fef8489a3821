//! Error types for duprec-core

use thiserror::Error;

use crate::entity::EntityId;

/// Result type alias for duprec operations
pub type Result<T> = std::result::Result<T, DuprecError>;

/// Main error type for duprec operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DuprecError {
    /// A comparator needed an attribute the entity does not carry
    #[error("Invalid input: entity {entity} is missing attribute '{attribute}'")]
    InvalidInput { entity: EntityId, attribute: String },

    /// An injected comparator reported a failure
    #[error("Comparator '{comparator}' failed on ({a}, {b}): {message}")]
    ComparatorFailure {
        comparator: String,
        a: EntityId,
        b: EntityId,
        message: String,
    },

    /// Bad threshold, weights, or other settings
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// TOML parse / deserialization error
    #[error("Config parse error: {0}")]
    ConfigParse(String),

    /// Two entities with the same id were inserted into a store
    #[error("Duplicate entity id: {0}")]
    DuplicateEntity(EntityId),

    /// A pair referenced an id that is not in the store
    #[error("Entity not found: {0}")]
    UnknownEntity(EntityId),

    /// IO error (config file read, etc.)
    #[error("IO error: {0}")]
    Io(String),

    /// An edge sink rejected a write
    #[error("Sink error: {0}")]
    Sink(String),
}

impl From<std::io::Error> for DuprecError {
    fn from(e: std::io::Error) -> Self {
        DuprecError::Io(e.to_string())
    }
}

/// Errors a comparator can report for a single pair.
///
/// These are lifted into [`DuprecError`] by the scorer, which knows the pair
/// and the comparator name.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ComparatorError {
    /// Required attribute absent on one or both sides
    #[error("missing attribute '{attribute}'")]
    MissingAttribute { attribute: String },

    /// Any other failure raised by the comparison logic
    #[error("{0}")]
    Failed(String),
}

impl ComparatorError {
    pub fn missing(attribute: impl Into<String>) -> Self {
        Self::MissingAttribute {
            attribute: attribute.into(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }

    /// Lift into a run-level error for the pair `(a, b)`.
    ///
    /// A missing attribute is attributed to whichever side lacks it, which
    /// the caller resolves; `missing_on` is that side.
    pub(crate) fn into_duprec(
        self,
        comparator: &str,
        a: EntityId,
        b: EntityId,
        missing_on: EntityId,
    ) -> DuprecError {
        match self {
            Self::MissingAttribute { attribute } => DuprecError::InvalidInput {
                entity: missing_on,
                attribute,
            },
            Self::Failed(message) => DuprecError::ComparatorFailure {
                comparator: comparator.to_string(),
                a,
                b,
                message,
            },
        }
    }
}
