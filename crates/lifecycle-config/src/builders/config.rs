//! Configuration builder for creating test and development configurations.
//!
//! Constructs `Config` instances with defaults matching an in-memory cache,
//! without going through a TOML file.

use crate::{CacheConfig, Config, EngineConfig, OptimisticConfig, TimelineConfig};
use std::collections::HashMap;

/// Builder for creating `Config` instances with a fluent API.
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
	engine_id: String,
	cache_primary: String,
	identity_field: String,
	optimistic: OptimisticConfig,
	timeline: TimelineConfig,
}

impl Default for ConfigBuilder {
	fn default() -> Self {
		Self::new()
	}
}

impl ConfigBuilder {
	/// Creates a new `ConfigBuilder` backed by the memory cache.
	pub fn new() -> Self {
		Self {
			engine_id: "test-engine".to_string(),
			cache_primary: "memory".to_string(),
			identity_field: "id".to_string(),
			optimistic: OptimisticConfig::default(),
			timeline: TimelineConfig::default(),
		}
	}

	/// Sets the engine ID.
	pub fn engine_id(mut self, id: impl Into<String>) -> Self {
		self.engine_id = id.into();
		self
	}

	/// Sets the primary cache implementation.
	pub fn cache_primary(mut self, primary: impl Into<String>) -> Self {
		self.cache_primary = primary.into();
		self
	}

	/// Sets the identity field used to match collection records.
	pub fn identity_field(mut self, field: impl Into<String>) -> Self {
		self.identity_field = field.into();
		self
	}

	/// Enables or disables progress indicators while updates are in flight.
	pub fn show_progress(mut self, show: bool) -> Self {
		self.optimistic.show_progress = show;
		self
	}

	/// Replaces the timeline defaults.
	pub fn timeline(mut self, timeline: TimelineConfig) -> Self {
		self.timeline = timeline;
		self
	}

	/// Builds the `Config` with the configured values.
	pub fn build(self) -> Config {
		let mut implementations = HashMap::new();
		implementations.insert(
			self.cache_primary.clone(),
			toml::Value::Table(toml::map::Map::new()),
		);

		Config {
			engine: EngineConfig { id: self.engine_id },
			cache: CacheConfig {
				primary: self.cache_primary,
				implementations,
				identity_field: self.identity_field,
			},
			optimistic: self.optimistic,
			timeline: self.timeline,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_builder_defaults() {
		let config = ConfigBuilder::new().build();
		assert_eq!(config.engine.id, "test-engine");
		assert_eq!(config.cache.primary, "memory");
		assert!(config.cache.implementations.contains_key("memory"));
	}

	#[test]
	fn test_builder_overrides() {
		let config = ConfigBuilder::new()
			.engine_id("tenant-7")
			.identity_field("uuid")
			.show_progress(false)
			.build();
		assert_eq!(config.engine.id, "tenant-7");
		assert_eq!(config.cache.identity_field, "uuid");
		assert!(!config.optimistic.show_progress);
	}
}
