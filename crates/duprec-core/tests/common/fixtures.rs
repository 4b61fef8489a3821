//! Shared entity fixtures for integration tests

use duprec_core::{Entity, EntityStore};

/// Companies with a few planted duplicates.
///
/// 1/4 are the same company (spelling + URL variants), 2/5 share a VAT id,
/// 3 and 6 are unrelated.
#[allow(dead_code)]
pub fn companies() -> EntityStore {
    EntityStore::from_entities([
        Entity::new(1)
            .with("company", "Acme Industries")
            .with("homepage", "https://www.acme-industries.com/")
            .with("country", "Germany")
            .with("postal_code", "10115"),
        Entity::new(2)
            .with("company", "Globex Corporation")
            .with("vat_id", "DE 811 907 980")
            .with("country", "DE")
            .with("postal_code", "80331"),
        Entity::new(3)
            .with("company", "Initech")
            .with("homepage", "http://initech.example")
            .with("country", "United States")
            .with("postal_code", "73301"),
        Entity::new(4)
            .with("company", "ACME Industries ")
            .with("homepage", "acme-industries.com")
            .with("country", "deutschland")
            .with("postal_code", "10115"),
        Entity::new(5)
            .with("company", "Globex Corp")
            .with("vat_id", "DE811907980")
            .with("country", "Germany")
            .with("postal_code", "80331"),
        Entity::new(6)
            .with("company", "Umbrella")
            .with("country", "FR")
            .with("postal_code", "75001"),
    ])
    .expect("fixture ids are unique")
}

/// `n` entities named `entity-{i}`.
#[allow(dead_code)]
pub fn numbered(n: u64) -> EntityStore {
    EntityStore::from_entities((1..=n).map(|i| Entity::new(i).with("name", format!("entity-{i}"))))
        .expect("fixture ids are unique")
}

/// Companies config used by several tests.
#[allow(dead_code)]
pub const COMPANIES_TOML: &str = r#"
name = "companies"
threshold = 0.75

[fields.company]
weight = 1.0
algorithm = "phonetic_distance"
threshold = 0.6

[fields.homepage]
weight = 1.0
algorithm = "url"
threshold = 0.8

[fields.vat_id]
weight = 10.0
algorithm = "vat_id"

[fields.country]
weight = 0.5
algorithm = "country"
negative = true
"#;
