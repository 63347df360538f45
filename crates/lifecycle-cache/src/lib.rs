//! Shared read cache for the order lifecycle engine.
//!
//! Several screens render the same order at once: a detail view reads the
//! entity slot while list and search views read named collections that contain
//! the same record. This crate provides the low-level backend trait for those
//! slots, and a high-level service that knows how entity identity maps onto
//! collection records so a write to one entity can be propagated everywhere it
//! is displayed.

use lifecycle_types::{truncate_id, TimelineEvent};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Re-export implementations
pub mod implementations {
	pub mod memory;
}

/// Errors that can occur during cache operations.
#[derive(Debug, Error)]
pub enum CacheError {
	/// Error that occurs when a requested entity is not cached.
	#[error("Not found: {0}")]
	NotFound(String),
	/// Error that occurs during serialization/deserialization.
	#[error("Serialization error: {0}")]
	Serialization(String),
	/// Error that occurs in the cache backend.
	#[error("Backend error: {0}")]
	Backend(String),
	/// Error that occurs during configuration validation.
	#[error("Configuration error: {0}")]
	Configuration(String),
}

/// Trait defining the low-level interface for cache backends.
///
/// All operations are synchronous and in-memory. Implementations must allow
/// concurrent access to different keys without a global lock.
pub trait CacheInterface: Send + Sync {
	/// Returns a copy of the entity stored under `id`.
	fn get_entity(&self, id: &str) -> Option<Value>;

	/// Stores or replaces the entity under `id`.
	fn set_entity(&self, id: &str, value: Value);

	/// Removes the entity under `id`, returning it.
	fn remove_entity(&self, id: &str) -> Option<Value>;

	/// Names of every cached collection.
	fn collection_names(&self) -> Vec<String>;

	/// Returns a copy of the named collection.
	fn get_collection(&self, name: &str) -> Option<Vec<Value>>;

	/// Stores or replaces the named collection.
	fn set_collection(&self, name: &str, records: Vec<Value>);

	/// Mutates the named collection in place. Returns false if it is not cached.
	fn update_collection(&self, name: &str, updater: &mut dyn FnMut(&mut Vec<Value>)) -> bool;

	/// Returns the cached timeline rows of an entity.
	fn get_timeline(&self, entity_id: &str) -> Option<Vec<TimelineEvent>>;

	/// Stores or replaces the cached timeline rows of an entity.
	fn set_timeline(&self, entity_id: &str, events: Vec<TimelineEvent>);

	/// Drops the cached timeline rows of an entity.
	fn remove_timeline(&self, entity_id: &str);
}

/// Type alias for cache factory functions.
pub type CacheFactory = fn(&toml::Value) -> Result<Box<dyn CacheInterface>, CacheError>;

/// Get all registered cache implementations.
///
/// Returns a vector of (name, factory) tuples used by the engine builder to
/// resolve `cache.primary`.
pub fn get_all_implementations() -> Vec<(&'static str, CacheFactory)> {
	use implementations::memory;

	vec![(memory::NAME, memory::create_cache as CacheFactory)]
}

/// A record's previous value inside one collection, kept for restoration.
#[derive(Debug, Clone, PartialEq)]
pub struct CollectionEntry {
	/// Collection name.
	pub collection: String,
	/// The record as it was before it was replaced.
	pub record: Value,
}

/// High-level cache service that provides identity-aware operations.
///
/// The CacheService wraps a backend and knows which field of a collection
/// record carries the entity identity, so entity writes can be propagated
/// into every collection that displays the entity while sibling records are
/// left untouched.
pub struct CacheService {
	/// The underlying cache backend implementation.
	backend: Box<dyn CacheInterface>,
	/// Field holding the identity inside collection records.
	identity_field: String,
}

impl CacheService {
	/// Creates a new CacheService with the specified backend.
	pub fn new(backend: Box<dyn CacheInterface>, identity_field: impl Into<String>) -> Self {
		Self {
			backend,
			identity_field: identity_field.into(),
		}
	}

	/// Returns the field used to match collection records.
	pub fn identity_field(&self) -> &str {
		&self.identity_field
	}

	/// Returns a copy of the cached entity.
	pub fn entity(&self, id: &str) -> Option<Value> {
		self.backend.get_entity(id)
	}

	/// Retrieves and deserializes a cached entity.
	pub fn entity_as<T: DeserializeOwned>(&self, id: &str) -> Result<T, CacheError> {
		let value = self
			.backend
			.get_entity(id)
			.ok_or_else(|| CacheError::NotFound(id.to_string()))?;
		serde_json::from_value(value).map_err(|e| CacheError::Serialization(e.to_string()))
	}

	/// Stores an entity value without touching collections.
	pub fn put_entity(&self, id: &str, value: Value) {
		self.backend.set_entity(id, value);
	}

	/// Serializes and stores an entity without touching collections.
	pub fn store<T: Serialize>(&self, id: &str, data: &T) -> Result<(), CacheError> {
		let value =
			serde_json::to_value(data).map_err(|e| CacheError::Serialization(e.to_string()))?;
		self.backend.set_entity(id, value);
		Ok(())
	}

	/// Removes an entity slot.
	pub fn evict(&self, id: &str) -> Option<Value> {
		self.backend.remove_entity(id)
	}

	/// Returns a copy of a named collection.
	pub fn collection(&self, name: &str) -> Option<Vec<Value>> {
		self.backend.get_collection(name)
	}

	/// Stores a named collection, e.g. the result of a list or search query.
	pub fn put_collection(&self, name: &str, records: Vec<Value>) {
		self.backend.set_collection(name, records);
	}

	/// Checks whether a collection record carries the given identity.
	///
	/// String and numeric identities are both accepted.
	pub fn matches_identity(&self, record: &Value, id: &str) -> bool {
		match record.get(&self.identity_field) {
			Some(Value::String(s)) => s == id,
			Some(Value::Number(n)) => n.to_string() == id,
			_ => false,
		}
	}

	/// Returns the current record of `id` in every collection that contains it.
	pub fn collections_containing(&self, id: &str) -> Vec<CollectionEntry> {
		let mut entries = Vec::new();
		for name in self.backend.collection_names() {
			let Some(records) = self.backend.get_collection(&name) else {
				continue;
			};
			if let Some(record) = records.iter().find(|r| self.matches_identity(r, id)) {
				entries.push(CollectionEntry {
					collection: name,
					record: record.clone(),
				});
			}
		}
		entries
	}

	/// Replaces the record of `id` in the given collections with `value`.
	///
	/// Only matching records are replaced. Returns how many records changed.
	pub fn replace_in_collections(
		&self,
		id: &str,
		value: &Value,
		collections: &[String],
	) -> usize {
		let mut replaced = 0;
		for name in collections {
			let found = self.backend.update_collection(name, &mut |records: &mut Vec<Value>| {
				for record in records.iter_mut() {
					if self.matches_identity(record, id) {
						*record = value.clone();
						replaced += 1;
					}
				}
			});
			if !found {
				tracing::debug!(
					entity_id = %truncate_id(id),
					collection = %name,
					"Collection no longer cached, skipping"
				);
			}
		}
		replaced
	}

	/// Restores previously captured collection records of `id`.
	pub fn restore_collections(&self, id: &str, entries: &[CollectionEntry]) -> usize {
		let mut restored = 0;
		for entry in entries {
			restored += self.replace_in_collections(
				id,
				&entry.record,
				std::slice::from_ref(&entry.collection),
			);
		}
		restored
	}

	/// Names of every collection currently containing `id`.
	pub fn collection_names_containing(&self, id: &str) -> Vec<String> {
		self.collections_containing(id)
			.into_iter()
			.map(|entry| entry.collection)
			.collect()
	}

	/// Returns the cached timeline rows of an entity.
	pub fn timeline(&self, entity_id: &str) -> Option<Vec<TimelineEvent>> {
		self.backend.get_timeline(entity_id)
	}

	/// Stores the cached timeline rows of an entity.
	pub fn put_timeline(&self, entity_id: &str, events: Vec<TimelineEvent>) {
		self.backend.set_timeline(entity_id, events);
	}

	/// Drops the cached timeline rows of an entity.
	pub fn remove_timeline(&self, entity_id: &str) {
		self.backend.remove_timeline(entity_id);
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use implementations::memory::MemoryCache;
	use serde_json::json;

	fn service() -> CacheService {
		CacheService::new(Box::new(MemoryCache::new()), "id")
	}

	#[test]
	fn test_matches_string_and_numeric_identity() {
		let cache = service();
		assert!(cache.matches_identity(&json!({"id": "order-1"}), "order-1"));
		assert!(cache.matches_identity(&json!({"id": 42}), "42"));
		assert!(!cache.matches_identity(&json!({"id": "order-2"}), "order-1"));
		assert!(!cache.matches_identity(&json!("order-1"), "order-1"));
	}

	#[test]
	fn test_replace_leaves_siblings_untouched() {
		let cache = service();
		cache.put_collection(
			"orders:list",
			vec![
				json!({"id": "order-1", "status": "pending"}),
				json!({"id": "order-2", "status": "shipped"}),
			],
		);
		cache.put_collection("orders:search", vec![json!({"id": "order-3"})]);

		let names = cache.collection_names_containing("order-1");
		assert_eq!(names, vec!["orders:list".to_string()]);

		let draft = json!({"id": "order-1", "status": "draft"});
		let replaced = cache.replace_in_collections("order-1", &draft, &names);
		assert_eq!(replaced, 1);

		let list = cache.collection("orders:list").unwrap();
		assert_eq!(list[0]["status"], "draft");
		assert_eq!(list[1], json!({"id": "order-2", "status": "shipped"}));
		assert_eq!(
			cache.collection("orders:search").unwrap(),
			vec![json!({"id": "order-3"})]
		);
	}

	#[test]
	fn test_restore_collections() {
		let cache = service();
		let original = json!({"id": "order-1", "status": "pending"});
		cache.put_collection("orders:list", vec![original.clone()]);

		let captured = cache.collections_containing("order-1");
		cache.replace_in_collections(
			"order-1",
			&json!({"id": "order-1", "status": "completed"}),
			&["orders:list".to_string()],
		);
		assert_eq!(cache.restore_collections("order-1", &captured), 1);
		assert_eq!(cache.collection("orders:list").unwrap(), vec![original]);
	}

	#[test]
	fn test_entity_as_missing() {
		let cache = service();
		let result: Result<serde_json::Value, _> = cache.entity_as("missing");
		assert!(matches!(result, Err(CacheError::NotFound(_))));
	}

	#[test]
	fn test_registered_implementations() {
		let names: Vec<_> = get_all_implementations()
			.into_iter()
			.map(|(name, _)| name)
			.collect();
		assert_eq!(names, vec!["memory"]);
	}
}
