//! Text normalization applied to attribute values before comparison

use std::collections::HashSet;

use lazy_static::lazy_static;
use regex::Regex;
use unicode_normalization::UnicodeNormalization;

use crate::entity::{AttributeValue, Entity};

lazy_static! {
    /// URL noise removed before comparing homepages
    static ref URL_NOISE: Regex = Regex::new(r"https?:|www\.|/").unwrap();
}

/// Clean a single value.
///
/// - Text is trimmed and lowercased
/// - Empty text yields `None` (the attribute is dropped)
pub fn clean_value(value: &AttributeValue) -> Option<AttributeValue> {
    match value {
        AttributeValue::Text(s) => {
            let cleaned = clean_text(s);
            if cleaned.is_empty() {
                None
            } else {
                Some(AttributeValue::Text(cleaned))
            }
        }
        AttributeValue::Number(n) if n.is_nan() => None,
        other => Some(other.clone()),
    }
}

/// Clean every attribute of an entity, dropping empty values.
///
/// When `keep` is given, attributes outside it are dropped as well, so only
/// the fields that take part in scoring survive.
pub fn prepare_entity(mut entity: Entity, keep: Option<&HashSet<String>>) -> Entity {
    entity.attributes = std::mem::take(&mut entity.attributes)
        .into_iter()
        .filter(|(name, _)| keep.map_or(true, |k| k.contains(name)))
        .filter_map(|(name, value)| clean_value(&value).map(|v| (name, v)))
        .collect();
    entity
}

/// Trimmed, lowercased text.
pub fn clean_text(text: &str) -> String {
    text.trim().to_lowercase()
}

/// Fold text for fuzzy comparison
///
/// - Unicode NFKD with diacritics removed
/// - Keeps only ASCII alphanumerics and whitespace
/// - Lowercases
/// - Collapses whitespace
pub fn fold_text(text: &str) -> String {
    let folded: String = text
        .nfkd()
        .filter(|c| c.is_ascii_alphanumeric() || c.is_ascii_whitespace())
        .collect::<String>()
        .to_lowercase();

    collapse_whitespace(&folded).trim().to_string()
}

/// Collapse multiple whitespace characters into a single space
pub fn collapse_whitespace(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut prev_was_space = false;

    for c in s.chars() {
        if c.is_whitespace() {
            if !prev_was_space {
                result.push(' ');
                prev_was_space = true;
            }
        } else {
            result.push(c);
            prev_was_space = false;
        }
    }

    result
}

/// Keep only ASCII digits (phone numbers, VAT ids).
pub fn digits_only(s: &str) -> String {
    s.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// Strip scheme, `www.` and slashes from a URL.
pub fn normalize_url(url: &str) -> String {
    URL_NOISE.replace_all(&url.trim().to_lowercase(), "").into_owned()
}

/// Lowercase an address and drop any `+tag` from the local part.
pub fn normalize_email(email: &str) -> String {
    let email = email.trim().to_lowercase();
    match email.split_once('@') {
        Some((local, domain)) => {
            let local = local.split('+').next().unwrap_or(local);
            format!("{local}@{domain}")
        }
        None => email,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_value() {
        assert_eq!(
            clean_value(&AttributeValue::from("  Jon Doe ")),
            Some(AttributeValue::from("jon doe"))
        );
        assert_eq!(clean_value(&AttributeValue::from("   ")), None);
        assert_eq!(
            clean_value(&AttributeValue::Number(3.0)),
            Some(AttributeValue::Number(3.0))
        );
        assert_eq!(clean_value(&AttributeValue::Number(f64::NAN)), None);
    }

    #[test]
    fn test_prepare_entity_drops_unscored_and_empty() {
        let keep: HashSet<String> = ["name".to_string(), "city".to_string()].into();
        let entity = Entity::new(1)
            .with("name", " ALICE ")
            .with("city", "")
            .with("notes", "irrelevant");
        let prepared = prepare_entity(entity, Some(&keep));
        assert_eq!(prepared.text("name"), Some("alice"));
        assert!(!prepared.has("city"));
        assert!(!prepared.has("notes"));
    }

    #[test]
    fn test_fold_text() {
        assert_eq!(fold_text("Études   Françaises"), "etudes francaises");
        assert_eq!(fold_text("Hello, World!"), "hello world");
        assert_eq!(fold_text("  Müller "), "muller");
    }

    #[test]
    fn test_digits_only() {
        assert_eq!(digits_only("+49 (0) 30-1234"), "490301234");
        assert_eq!(digits_only("DE123456"), "123456");
        assert_eq!(digits_only("none"), "");
    }

    #[test]
    fn test_normalize_url() {
        assert_eq!(normalize_url("https://www.example.com/"), "example.com");
        assert_eq!(normalize_url("http://example.com/about"), "example.comabout");
        assert_eq!(normalize_url("example.com"), "example.com");
    }

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email(" Jon+news@Example.COM"), "jon@example.com");
        assert_eq!(normalize_email("not-an-email"), "not-an-email");
    }
}
