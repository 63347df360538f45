//! In-memory cache backend implementation.
//!
//! Entities, collections and timelines each live in their own `DashMap`, so
//! writers touching different keys never contend on a global lock.

use crate::{CacheError, CacheInterface};
use dashmap::DashMap;
use lifecycle_types::TimelineEvent;
use serde_json::Value;

/// Name under which the memory backend is registered.
pub const NAME: &str = "memory";

/// In-memory cache implementation.
#[derive(Default)]
pub struct MemoryCache {
	entities: DashMap<String, Value>,
	collections: DashMap<String, Vec<Value>>,
	timelines: DashMap<String, Vec<TimelineEvent>>,
}

impl MemoryCache {
	/// Creates a new, empty MemoryCache instance.
	pub fn new() -> Self {
		Self::default()
	}
}

impl CacheInterface for MemoryCache {
	fn get_entity(&self, id: &str) -> Option<Value> {
		self.entities.get(id).map(|entry| entry.value().clone())
	}

	fn set_entity(&self, id: &str, value: Value) {
		self.entities.insert(id.to_string(), value);
	}

	fn remove_entity(&self, id: &str) -> Option<Value> {
		self.entities.remove(id).map(|(_, value)| value)
	}

	fn collection_names(&self) -> Vec<String> {
		let mut names: Vec<String> = self
			.collections
			.iter()
			.map(|entry| entry.key().clone())
			.collect();
		names.sort();
		names
	}

	fn get_collection(&self, name: &str) -> Option<Vec<Value>> {
		self.collections.get(name).map(|entry| entry.value().clone())
	}

	fn set_collection(&self, name: &str, records: Vec<Value>) {
		self.collections.insert(name.to_string(), records);
	}

	fn update_collection(&self, name: &str, updater: &mut dyn FnMut(&mut Vec<Value>)) -> bool {
		match self.collections.get_mut(name) {
			Some(mut entry) => {
				updater(entry.value_mut());
				true
			},
			None => false,
		}
	}

	fn get_timeline(&self, entity_id: &str) -> Option<Vec<TimelineEvent>> {
		self.timelines
			.get(entity_id)
			.map(|entry| entry.value().clone())
	}

	fn set_timeline(&self, entity_id: &str, events: Vec<TimelineEvent>) {
		self.timelines.insert(entity_id.to_string(), events);
	}

	fn remove_timeline(&self, entity_id: &str) {
		self.timelines.remove(entity_id);
	}
}

/// Factory function to create a memory cache backend from configuration.
///
/// Configuration parameters:
/// - None; the section must be an empty table or absent keys only
pub fn create_cache(config: &toml::Value) -> Result<Box<dyn CacheInterface>, CacheError> {
	if !config.is_table() {
		return Err(CacheError::Configuration(
			"memory cache configuration must be a table".into(),
		));
	}
	Ok(Box::new(MemoryCache::new()))
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	#[test]
	fn test_entity_operations() {
		let cache = MemoryCache::new();

		cache.set_entity("order-1", json!({"status": "pending"}));
		assert_eq!(cache.get_entity("order-1"), Some(json!({"status": "pending"})));

		// Overwrite
		cache.set_entity("order-1", json!({"status": "shipped"}));
		assert_eq!(cache.get_entity("order-1"), Some(json!({"status": "shipped"})));

		assert!(cache.remove_entity("order-1").is_some());
		assert_eq!(cache.get_entity("order-1"), None);
	}

	#[test]
	fn test_returned_values_are_copies() {
		let cache = MemoryCache::new();
		cache.set_entity("order-1", json!({"status": "pending"}));

		let mut copy = cache.get_entity("order-1").unwrap();
		copy["status"] = json!("completed");

		assert_eq!(cache.get_entity("order-1"), Some(json!({"status": "pending"})));
	}

	#[test]
	fn test_update_missing_collection() {
		let cache = MemoryCache::new();
		let mut called = false;
		let found = cache.update_collection("missing", &mut |_records: &mut Vec<Value>| {
			called = true;
		});
		assert!(!found);
		assert!(!called);
	}

	#[test]
	fn test_collection_names_sorted() {
		let cache = MemoryCache::new();
		cache.set_collection("orders:search", vec![]);
		cache.set_collection("orders:list", vec![]);
		assert_eq!(cache.collection_names(), vec!["orders:list", "orders:search"]);
	}

	#[test]
	fn test_factory_rejects_non_table() {
		assert!(create_cache(&toml::Value::Table(Default::default())).is_ok());
		assert!(matches!(
			create_cache(&toml::Value::Integer(3)),
			Err(CacheError::Configuration(_))
		));
	}
}
