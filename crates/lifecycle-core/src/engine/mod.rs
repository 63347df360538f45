//! Lifecycle engine tying the cache, the update manager and the order service together.
//!
//! The engine reads orders from the shared cache, derives their progress and
//! timeline, and drives stage advances through the optimistic update manager
//! while the authoritative mutation is dispatched to the order service.

pub mod event_bus;

use crate::feedback::FeedbackSink;
use crate::optimistic::{OptimisticError, OptimisticUpdateManager};
use crate::progress::calculate_progress;
use crate::stage::map_status_to_stage;
use crate::timeline::{generate_timeline, newest_first, TimelineOptions};
use crate::transition::check_transition;
use async_trait::async_trait;
use lifecycle_cache::CacheService;
use lifecycle_config::Config;
use lifecycle_types::{
	truncate_id, ActorType, BusinessStage, OptimisticUpdateContext, ProgressResult,
	RecordedEvent, TimelineEvent,
};
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;
use tracing::instrument;

/// Field of a cached order holding its recorded history.
pub const HISTORY_FIELD: &str = "history";

/// Errors reported by the order service.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DispatchError {
	#[error("Order not found: {0}")]
	NotFound(String),
	#[error("Rejected: {0}")]
	Rejected(String),
	#[error("Service unavailable: {0}")]
	Unavailable(String),
}

/// Errors that can occur during engine operations.
#[derive(Debug, Error)]
pub enum EngineError {
	#[error("Configuration error: {0}")]
	Config(String),
	#[error("Order not cached: {0}")]
	NotCached(String),
	#[error("Transition error: {0}")]
	Transition(String),
	#[error("Optimistic update error: {0}")]
	Optimistic(#[from] OptimisticError),
	#[error("Dispatch error: {0}")]
	Dispatch(#[from] DispatchError),
}

/// Sends authoritative mutations to the order service.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OrderDispatcher: Send + Sync {
	/// Applies the mutation described by `context` and returns the order as
	/// the service now stores it.
	async fn dispatch(
		&self,
		entity_id: &str,
		context: &OptimisticUpdateContext,
	) -> Result<Value, DispatchError>;
}

/// Reads orders from the order service.
#[async_trait]
pub trait OrderSource: Send + Sync {
	async fn fetch(&self, entity_id: &str) -> Result<Value, DispatchError>;
}

/// Main engine driving order lifecycles.
#[derive(Clone)]
pub struct LifecycleEngine {
	config: Config,
	cache: Arc<CacheService>,
	updates: OptimisticUpdateManager,
	dispatcher: Arc<dyn OrderDispatcher>,
	source: Option<Arc<dyn OrderSource>>,
	event_bus: event_bus::EventBus,
}

impl LifecycleEngine {
	/// Creates an engine over an existing cache.
	pub fn new(
		config: Config,
		cache: Arc<CacheService>,
		feedback: Arc<dyn FeedbackSink>,
		dispatcher: Arc<dyn OrderDispatcher>,
		source: Option<Arc<dyn OrderSource>>,
		event_bus: event_bus::EventBus,
	) -> Self {
		let updates = OptimisticUpdateManager::with_event_bus(
			cache.clone(),
			feedback,
			config.optimistic.clone(),
			event_bus.clone(),
		);
		Self {
			config,
			cache,
			updates,
			dispatcher,
			source,
			event_bus,
		}
	}

	pub fn config(&self) -> &Config {
		&self.config
	}

	pub fn cache(&self) -> &Arc<CacheService> {
		&self.cache
	}

	pub fn updates(&self) -> &OptimisticUpdateManager {
		&self.updates
	}

	pub fn event_bus(&self) -> &event_bus::EventBus {
		&self.event_bus
	}

	/// Timeline options derived from the `[timeline]` section.
	pub fn timeline_options(&self) -> TimelineOptions {
		TimelineOptions::from(&self.config.timeline)
	}

	/// Fetches an order from the order service and caches it.
	///
	/// Refuses to overwrite an order with a pending optimistic update.
	#[instrument(skip_all, fields(order_id = %truncate_id(entity_id)))]
	pub async fn load_order(&self, entity_id: &str) -> Result<Value, EngineError> {
		let source = self
			.source
			.as_ref()
			.ok_or_else(|| EngineError::Config("no order source configured".into()))?;

		let order = source.fetch(entity_id).await?;
		if self.updates.has_pending_updates(entity_id) {
			return Err(OptimisticError::PendingUpdate(entity_id.to_string()).into());
		}

		self.cache.put_entity(entity_id, order.clone());
		tracing::debug!("Cached order");
		Ok(order)
	}

	/// Progress of a cached order.
	pub fn progress(&self, entity_id: &str) -> Result<ProgressResult, EngineError> {
		let order = self.cached(entity_id)?;
		Ok(calculate_progress(self.status_of(&order)))
	}

	/// Timeline of a cached order, including optimistic rows staged for it.
	pub fn timeline(
		&self,
		entity_id: &str,
		options: &TimelineOptions,
	) -> Result<Vec<TimelineEvent>, EngineError> {
		let order = self.cached(entity_id)?;
		let history = recorded_history(&order);
		let mut events = generate_timeline(&history, self.status_of(&order), options);

		if let Some(mut rows) = self.cache.timeline(entity_id) {
			let staged: HashSet<BusinessStage> = rows.iter().map(|row| row.stage).collect();
			let (replaced, kept): (Vec<_>, Vec<_>) = events
				.into_iter()
				.partition(|event| event.synthetic && staged.contains(&event.stage));

			// A replaced synthetic row may carry the current stage's actions
			let with_actions = replaced
				.into_iter()
				.filter(|event| event.requires_action || !event.next_actions.is_empty());
			for synthetic in with_actions {
				if let Some(row) = rows
					.iter_mut()
					.filter(|row| row.stage == synthetic.stage)
					.max_by_key(|row| row.timestamp)
				{
					row.requires_action = synthetic.requires_action;
					row.next_actions = synthetic.next_actions;
				}
			}

			events = kept;
			events.extend(rows);
			events.sort_by(newest_first);
			if let Some(max) = options.max_events {
				events.truncate(max);
			}
		}

		Ok(events)
	}

	/// Moves a cached order to `to`.
	///
	/// The speculative state is visible in the cache while the mutation is
	/// dispatched. On success the service's payload replaces it; on failure
	/// the previous state is restored and the error is reported. Illegal
	/// transitions are refused when `enforce` is set and logged otherwise.
	#[instrument(skip_all, fields(order_id = %truncate_id(entity_id), to = %to.as_str()))]
	pub async fn advance_stage(
		&self,
		entity_id: &str,
		to: BusinessStage,
		enforce: bool,
	) -> Result<Value, EngineError> {
		let order = self.cached(entity_id)?;
		let from = map_status_to_stage(self.status_of(&order));

		let check = check_transition(from, to);
		if !check.allowed {
			if enforce {
				return Err(EngineError::Transition(check.reason));
			}
			tracing::warn!(from = %from.as_str(), reason = %check.reason, "Advancing despite illegal transition");
		}

		let context =
			OptimisticUpdateContext::stage_advance(entity_id, &self.config.optimistic.status_field, to)
				.with_from_state(Value::String(from.as_str().to_string()))
				.with_feedback(format!("Moving order to {}...", to));

		let handle = self.updates.apply_optimistic_status_update(context.clone())?;
		let entry = self.updates.create_optimistic_timeline_entry(
			to,
			&self.config.engine.id,
			ActorType::Admin,
			None,
		);
		let timeline_rollback = self.updates.update_timeline_cache(entity_id, entry);

		let result = self.dispatcher.dispatch(entity_id, &context).await;
		// The service's history supersedes the provisional row either way
		timeline_rollback.rollback();

		match result {
			Ok(payload) => {
				if !self.updates.confirm_update(handle.update_id, payload.clone()) {
					tracing::warn!("Update was rolled back before the service confirmed it");
				}
				Ok(payload)
			},
			Err(e) => {
				self.updates.handle_update_error(handle.update_id, &e, &context);
				Err(e.into())
			},
		}
	}

	fn cached(&self, entity_id: &str) -> Result<Value, EngineError> {
		self.cache
			.entity(entity_id)
			.ok_or_else(|| EngineError::NotCached(entity_id.to_string()))
	}

	fn status_of<'a>(&self, order: &'a Value) -> &'a str {
		order
			.get(&self.config.optimistic.status_field)
			.and_then(Value::as_str)
			.unwrap_or_default()
	}
}

/// Recorded history of an order, skipping entries that do not parse.
fn recorded_history(order: &Value) -> Vec<RecordedEvent> {
	let Some(entries) = order.get(HISTORY_FIELD).and_then(Value::as_array) else {
		return Vec::new();
	};
	entries
		.iter()
		.filter_map(|entry| match serde_json::from_value(entry.clone()) {
			Ok(event) => Some(event),
			Err(e) => {
				tracing::debug!(error = %e, "Skipping malformed history entry");
				None
			},
		})
		.collect()
}
