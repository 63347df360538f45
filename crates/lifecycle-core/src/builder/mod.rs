//! Builder for constructing lifecycle engines.
//!
//! Resolves the configured cache implementation through its factory, then
//! wires the cache, the feedback sink and the order service adapters into a
//! [`LifecycleEngine`].

use crate::engine::event_bus::{EventBus, DEFAULT_CAPACITY};
use crate::engine::{LifecycleEngine, OrderDispatcher, OrderSource};
use crate::feedback::{FeedbackSink, TracingFeedback};
use lifecycle_cache::{CacheFactory, CacheService};
use lifecycle_config::Config;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

/// Errors that can occur during engine construction.
#[derive(Debug, Error)]
pub enum BuilderError {
	#[error("Configuration error: {0}")]
	Config(String),
	#[error("Missing required component: {0}")]
	MissingComponent(String),
}

/// Builder for a [`LifecycleEngine`].
pub struct EngineBuilder {
	config: Config,
	feedback: Option<Arc<dyn FeedbackSink>>,
	source: Option<Arc<dyn OrderSource>>,
	event_capacity: usize,
}

impl EngineBuilder {
	pub fn new(config: Config) -> Self {
		Self {
			config,
			feedback: None,
			source: None,
			event_capacity: DEFAULT_CAPACITY,
		}
	}

	/// Sets the feedback sink. Defaults to [`TracingFeedback`].
	pub fn with_feedback(mut self, feedback: Arc<dyn FeedbackSink>) -> Self {
		self.feedback = Some(feedback);
		self
	}

	/// Sets the source used by [`LifecycleEngine::load_order`].
	pub fn with_order_source(mut self, source: Arc<dyn OrderSource>) -> Self {
		self.source = Some(source);
		self
	}

	/// Sets how many events the bus buffers per subscriber.
	pub fn with_event_capacity(mut self, capacity: usize) -> Self {
		self.event_capacity = capacity;
		self
	}

	/// Builds the engine using the registered cache implementations.
	pub fn build(self, dispatcher: Arc<dyn OrderDispatcher>) -> Result<LifecycleEngine, BuilderError> {
		let factories = lifecycle_cache::get_all_implementations()
			.into_iter()
			.map(|(name, factory)| (name.to_string(), factory))
			.collect();
		self.build_with_factories(factories, dispatcher)
	}

	/// Builds the engine resolving `cache.primary` among `factories`.
	pub fn build_with_factories(
		self,
		factories: HashMap<String, CacheFactory>,
		dispatcher: Arc<dyn OrderDispatcher>,
	) -> Result<LifecycleEngine, BuilderError> {
		let primary = &self.config.cache.primary;
		let settings = self.config.cache.implementations.get(primary).ok_or_else(|| {
			BuilderError::Config(format!("Primary cache '{}' is not configured", primary))
		})?;
		let factory = factories
			.get(primary)
			.ok_or_else(|| BuilderError::MissingComponent(format!("cache implementation '{}'", primary)))?;

		let backend = match factory(settings) {
			Ok(backend) => {
				tracing::info!(component = "cache", implementation = %primary, "Loaded");
				backend
			},
			Err(e) => {
				tracing::error!(
					component = "cache",
					implementation = %primary,
					error = %e,
					"Failed to create cache implementation"
				);
				return Err(BuilderError::Config(format!(
					"Failed to create cache implementation '{}': {}",
					primary, e
				)));
			},
		};

		let cache = Arc::new(CacheService::new(
			backend,
			self.config.cache.identity_field.clone(),
		));
		let feedback = self
			.feedback
			.unwrap_or_else(|| Arc::new(TracingFeedback) as Arc<dyn FeedbackSink>);

		Ok(LifecycleEngine::new(
			self.config,
			cache,
			feedback,
			dispatcher,
			self.source,
			EventBus::new(self.event_capacity),
		))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::engine::MockOrderDispatcher;
	use lifecycle_config::builders::config::ConfigBuilder;

	#[test]
	fn test_build_with_memory_cache() {
		let engine = EngineBuilder::new(ConfigBuilder::new().identity_field("uuid").build())
			.build(Arc::new(MockOrderDispatcher::new()))
			.unwrap();
		assert_eq!(engine.cache().identity_field(), "uuid");
	}

	#[test]
	fn test_unknown_primary_is_rejected() {
		let config = ConfigBuilder::new().cache_primary("redis").build();
		let result = EngineBuilder::new(config).build(Arc::new(MockOrderDispatcher::new()));
		assert!(matches!(result, Err(BuilderError::MissingComponent(_))));
	}

	#[test]
	fn test_factory_error_is_reported() {
		let mut config = ConfigBuilder::new().build();
		config
			.cache
			.implementations
			.insert("memory".into(), toml::Value::String("bogus".into()));
		let result = EngineBuilder::new(config).build(Arc::new(MockOrderDispatcher::new()));
		assert!(matches!(result, Err(BuilderError::Config(_))));
	}
}
