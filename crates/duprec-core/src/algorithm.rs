//! Per-attribute matching algorithms
//!
//! Every algorithm maps two attribute values to a similarity in 0.0..=1.0.

use std::fmt;

use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use strsim::{jaro_winkler, levenshtein};

use crate::country::CountryResolver;
use crate::entity::AttributeValue;
use crate::normalize::{clean_text, digits_only, normalize_email, normalize_url};

lazy_static! {
    static ref DEFAULT_COUNTRIES: CountryResolver = CountryResolver::new();
}

/// Matching algorithm applied to a single attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Algorithm {
    #[default]
    Equality,
    PhoneticDistance,
    JaroWinkler,
    Url,
    Country,
    VatId,
    Phone,
    Email,
}

impl Algorithm {
    /// Compare two values with the built-in country table.
    pub fn compare(&self, a: &AttributeValue, b: &AttributeValue) -> f64 {
        self.compare_with(a, b, &DEFAULT_COUNTRIES)
    }

    /// Compare two values, resolving countries through `countries`.
    pub fn compare_with(
        &self,
        a: &AttributeValue,
        b: &AttributeValue,
        countries: &CountryResolver,
    ) -> f64 {
        if let (Some(x), Some(y)) = (a.as_number(), b.as_number()) {
            return match self {
                Self::Equality => bool_score(x == y),
                _ => numeric_closeness(x, y),
            };
        }

        let a = a.to_text();
        let b = b.to_text();
        match self {
            Self::Equality => bool_score(clean_text(&a) == clean_text(&b)),
            Self::PhoneticDistance => phonetic_distance(&a, &b),
            Self::JaroWinkler => jaro_winkler(&a, &b),
            Self::Url => phonetic_distance(&normalize_url(&a), &normalize_url(&b)),
            Self::Country => countries.compare(&a, &b),
            Self::VatId | Self::Phone => compare_stripped_numbers(&a, &b),
            Self::Email => bool_score(normalize_email(&a) == normalize_email(&b)),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Equality => "equality",
            Self::PhoneticDistance => "phonetic_distance",
            Self::JaroWinkler => "jaro_winkler",
            Self::Url => "url",
            Self::Country => "country",
            Self::VatId => "vat_id",
            Self::Phone => "phone",
            Self::Email => "email",
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn bool_score(b: bool) -> f64 {
    if b {
        1.0
    } else {
        0.0
    }
}

/// `1 - levenshtein / max_len`; two empty strings score 0.
pub fn phonetic_distance(a: &str, b: &str) -> f64 {
    let max_len = a.chars().count().max(b.chars().count());
    if max_len == 0 {
        return 0.0;
    }
    1.0 - levenshtein(a, b) as f64 / max_len as f64
}

/// Equality after stripping everything but digits.
pub fn compare_stripped_numbers(a: &str, b: &str) -> f64 {
    let a = digits_only(a);
    let b = digits_only(b);
    bool_score(!a.is_empty() && a == b)
}

/// Relative closeness of two numbers.
pub fn numeric_closeness(a: f64, b: f64) -> f64 {
    if a == b {
        return 1.0;
    }
    let scale = a.abs().max(b.abs());
    if !scale.is_finite() || scale == 0.0 {
        return 0.0;
    }
    (1.0 - (a - b).abs() / scale).clamp(0.0, 1.0)
}
