//! Entities and the entity store.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{DuprecError, Result};

/// Opaque, unique entity identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(pub u64);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for EntityId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

/// A single attribute value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Bool(bool),
    Number(f64),
    Text(String),
}

impl AttributeValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Text form used by string metrics.
    pub fn to_text(&self) -> String {
        match self {
            Self::Text(s) => s.clone(),
            Self::Number(n) => n.to_string(),
            Self::Bool(b) => b.to_string(),
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<f64> for AttributeValue {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<i64> for AttributeValue {
    fn from(n: i64) -> Self {
        Self::Number(n as f64)
    }
}

impl From<bool> for AttributeValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

/// An identifier plus a bundle of named attributes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub id: EntityId,
    #[serde(default)]
    pub attributes: BTreeMap<String, AttributeValue>,
}

impl Entity {
    pub fn new(id: u64) -> Self {
        Self {
            id: EntityId(id),
            attributes: BTreeMap::new(),
        }
    }

    /// Builder-style attribute setter.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<AttributeValue>) {
        self.attributes.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&AttributeValue> {
        self.attributes.get(name)
    }

    pub fn text(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(AttributeValue::as_text)
    }

    pub fn has(&self, name: &str) -> bool {
        self.attributes.contains_key(name)
    }
}

/// Insertion-ordered collection of entities keyed by id.
///
/// Pair strategies walk entities in insertion order, so the first entity of
/// every generated pair is the one inserted earlier.
#[derive(Debug, Clone, Default)]
pub struct EntityStore {
    entities: Vec<Entity>,
    index: HashMap<EntityId, usize>,
}

impl EntityStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store, rejecting duplicate ids.
    pub fn from_entities(entities: impl IntoIterator<Item = Entity>) -> Result<Self> {
        let mut store = Self::new();
        for entity in entities {
            store.insert(entity)?;
        }
        Ok(store)
    }

    pub fn insert(&mut self, entity: Entity) -> Result<()> {
        if self.index.contains_key(&entity.id) {
            return Err(DuprecError::DuplicateEntity(entity.id));
        }
        self.index.insert(entity.id, self.entities.len());
        self.entities.push(entity);
        Ok(())
    }

    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.index.get(&id).map(|&i| &self.entities[i])
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.index.contains_key(&id)
    }

    /// Position of an entity in insertion order.
    pub fn position(&self, id: EntityId) -> Option<usize> {
        self.index.get(&id).copied()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.entities.iter()
    }

    pub fn ids(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.entities.iter().map(|e| e.id)
    }

    pub(crate) fn as_slice(&self) -> &[Entity] {
        &self.entities
    }

    /// Apply `f` to every entity, keeping ids and order.
    pub(crate) fn map_entities(self, mut f: impl FnMut(Entity) -> Entity) -> Self {
        let entities: Vec<Entity> = self.entities.into_iter().map(&mut f).collect();
        Self {
            entities,
            index: self.index,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_and_lookup() {
        let e = Entity::new(1)
            .with("name", "Jon")
            .with("age", 42i64)
            .with("active", true);
        assert_eq!(e.text("name"), Some("Jon"));
        assert_eq!(e.get("age").and_then(AttributeValue::as_number), Some(42.0));
        assert!(e.has("active"));
        assert!(e.text("age").is_none());
    }

    #[test]
    fn store_preserves_insertion_order() {
        let store =
            EntityStore::from_entities([Entity::new(9), Entity::new(3), Entity::new(5)]).unwrap();
        let ids: Vec<u64> = store.ids().map(|id| id.0).collect();
        assert_eq!(ids, vec![9, 3, 5]);
        assert_eq!(store.position(EntityId(3)), Some(1));
        assert!(store.get(EntityId(4)).is_none());
    }

    #[test]
    fn store_rejects_duplicate_ids() {
        let err = EntityStore::from_entities([Entity::new(1), Entity::new(1)]).unwrap_err();
        assert_eq!(err, DuprecError::DuplicateEntity(EntityId(1)));
    }

    #[test]
    fn attribute_value_deserializes_untagged() {
        let json = r#"{"id": 4, "attributes": {"name": "Ann", "zip": 12345, "vip": false}}"#;
        let e: Entity = serde_json::from_str(json).unwrap();
        assert_eq!(e.id, EntityId(4));
        assert_eq!(e.text("name"), Some("Ann"));
        assert_eq!(e.get("zip"), Some(&AttributeValue::Number(12345.0)));
        assert_eq!(e.get("vip"), Some(&AttributeValue::Bool(false)));
    }
}
