//! Optimistic update management.
//!
//! Stages speculative entity states in the shared cache before the order
//! service confirms them, and guarantees that every staged update is either
//! confirmed with the authoritative payload or rolled back to its snapshot.
//! At most one update may be pending per entity.

pub mod timeline;

pub use timeline::TimelineRollback;

use crate::engine::event_bus::EventBus;
use crate::feedback::FeedbackSink;
use crate::progress::progress_for_stage;
use crate::stage::map_status_to_stage;
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use lifecycle_cache::{CacheService, CollectionEntry};
use lifecycle_config::OptimisticConfig;
use lifecycle_types::{
	truncate_id, BusinessStage, LifecycleEvent, OptimisticUpdateContext, UpdateOperation,
};
use serde_json::{Map, Value};
use std::fmt;
use std::sync::{Arc, Weak};
use thiserror::Error;
use tracing::instrument;
use uuid::Uuid;

/// Errors that can occur when staging an optimistic update.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum OptimisticError {
	#[error("entity not found in cache: {0}")]
	EntityNotFound(String),
	#[error("pending optimistic update already in progress for entity {0}")]
	PendingUpdate(String),
}

/// Bookkeeping for one staged update.
#[derive(Debug, Clone)]
pub struct PendingUpdateRecord {
	pub update_id: Uuid,
	pub entity_id: String,
	/// Entity value as it was before the update was staged.
	pub snapshot: Value,
	/// Collection records of the entity as they were before the update.
	pub collections: Vec<CollectionEntry>,
	pub context: OptimisticUpdateContext,
	pub created_at: DateTime<Utc>,
}

struct ManagerInner {
	cache: Arc<CacheService>,
	pending: DashMap<String, PendingUpdateRecord>,
	feedback: Arc<dyn FeedbackSink>,
	event_bus: Option<EventBus>,
	config: OptimisticConfig,
}

/// Manager of speculative cache updates.
///
/// Cloning is cheap; clones share the same pending table. Pending records live
/// exactly as long as the manager, and handles only hold a weak reference.
#[derive(Clone)]
pub struct OptimisticUpdateManager {
	inner: Arc<ManagerInner>,
}

/// Handle returned for a staged update.
pub struct OptimisticUpdateHandle {
	pub update_id: Uuid,
	pub context: OptimisticUpdateContext,
	manager: Weak<ManagerInner>,
}

impl fmt::Debug for OptimisticUpdateHandle {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("OptimisticUpdateHandle")
			.field("update_id", &self.update_id)
			.field("entity_id", &self.context.entity_id)
			.finish()
	}
}

impl OptimisticUpdateHandle {
	/// Restores the snapshot of this update.
	///
	/// Does nothing and returns false once the update was confirmed, rolled
	/// back, or the manager was dropped.
	pub fn rollback(&self) -> bool {
		match self.manager.upgrade() {
			Some(inner) => inner.restore(self.update_id, Some(&self.context.entity_id), None),
			None => false,
		}
	}
}

impl OptimisticUpdateManager {
	/// Creates a manager writing into `cache` and reporting to `feedback`.
	pub fn new(
		cache: Arc<CacheService>,
		feedback: Arc<dyn FeedbackSink>,
		config: OptimisticConfig,
	) -> Self {
		Self {
			inner: Arc::new(ManagerInner {
				cache,
				pending: DashMap::new(),
				feedback,
				event_bus: None,
				config,
			}),
		}
	}

	/// Creates a manager that also publishes lifecycle events on `event_bus`.
	pub fn with_event_bus(
		cache: Arc<CacheService>,
		feedback: Arc<dyn FeedbackSink>,
		config: OptimisticConfig,
		event_bus: EventBus,
	) -> Self {
		Self {
			inner: Arc::new(ManagerInner {
				cache,
				pending: DashMap::new(),
				feedback,
				event_bus: Some(event_bus),
				config,
			}),
		}
	}

	pub fn cache(&self) -> &Arc<CacheService> {
		&self.inner.cache
	}

	/// Stages a speculative state for the entity of `context`.
	///
	/// The entity must be cached and have no pending update. On success the
	/// entity slot and every collection record of the entity hold the
	/// speculative representation, flagged with the optimistic marker.
	#[instrument(skip_all, fields(entity_id = %truncate_id(&context.entity_id), operation = %context.operation))]
	pub fn apply_optimistic_status_update(
		&self,
		context: OptimisticUpdateContext,
	) -> Result<OptimisticUpdateHandle, OptimisticError> {
		let inner = &self.inner;
		let entity_id = context.entity_id.clone();

		let snapshot = inner
			.cache
			.entity(&entity_id)
			.ok_or_else(|| OptimisticError::EntityNotFound(entity_id.clone()))?;

		let update_id = Uuid::new_v4();
		let stage = match inner.pending.entry(entity_id.clone()) {
			Entry::Occupied(existing) => {
				tracing::warn!(
					pending_update = %existing.get().update_id,
					"Rejecting update, another one is still pending"
				);
				return Err(OptimisticError::PendingUpdate(entity_id));
			},
			Entry::Vacant(slot) => {
				let (speculative, stage) = inner.speculative_state(&snapshot, &context);
				let collections = inner.cache.collections_containing(&entity_id);
				let names: Vec<String> =
					collections.iter().map(|e| e.collection.clone()).collect();

				inner.cache.put_entity(&entity_id, speculative.clone());
				let replaced = inner
					.cache
					.replace_in_collections(&entity_id, &speculative, &names);

				slot.insert(PendingUpdateRecord {
					update_id,
					entity_id: entity_id.clone(),
					snapshot,
					collections,
					context: context.clone(),
					created_at: Utc::now(),
				});

				tracing::info!(
					update_id = %update_id,
					collections = replaced,
					"Staged optimistic update"
				);
				stage
			},
		};

		if inner.config.show_progress {
			let message = context
				.user_feedback
				.clone()
				.unwrap_or_else(|| default_progress_message(&context, stage));
			inner.feedback.show_progress(&message);
		}

		inner.publish(LifecycleEvent::UpdateStaged {
			update_id,
			entity_id,
			operation: context.operation,
			stage,
		});

		Ok(OptimisticUpdateHandle {
			update_id,
			context,
			manager: Arc::downgrade(&self.inner),
		})
	}

	/// Replaces the speculative state with the authoritative payload.
	///
	/// The payload is written verbatim, minus any optimistic marker, into the
	/// entity slot and every collection containing the entity. Collection
	/// copies get the identity field back if the payload lacks it. Unknown or
	/// already resolved update ids are ignored and return false.
	#[instrument(skip_all, fields(update_id = %update_id))]
	pub fn confirm_update(&self, update_id: Uuid, server_payload: Value) -> bool {
		let inner = &self.inner;
		let Some(entity_id) = inner.entity_for_update(update_id) else {
			tracing::debug!("Ignoring confirmation of unknown update");
			return false;
		};
		let Some((_, record)) = inner
			.pending
			.remove_if(&entity_id, |_, record| record.update_id == update_id)
		else {
			tracing::debug!("Update resolved concurrently, ignoring confirmation");
			return false;
		};

		let mut payload = server_payload;
		if let Value::Object(map) = &mut payload {
			map.remove(&inner.config.marker_field);
		}

		let mut names: Vec<String> = record
			.collections
			.iter()
			.map(|entry| entry.collection.clone())
			.collect();
		for name in inner.cache.collection_names_containing(&entity_id) {
			if !names.contains(&name) {
				names.push(name);
			}
		}

		// The entity slot keeps the payload verbatim; list copies must stay matchable
		let record_copy = inner.with_identity(&payload, &entity_id);
		inner.cache.put_entity(&entity_id, payload.clone());
		let replaced = inner
			.cache
			.replace_in_collections(&entity_id, &record_copy, &names);

		let stage = match record.context.operation {
			UpdateOperation::StageAdvance => payload
				.get(&inner.config.status_field)
				.and_then(Value::as_str)
				.or_else(|| {
					record
						.context
						.to_state
						.get(&inner.config.status_field)
						.and_then(Value::as_str)
				})
				.map(map_status_to_stage),
			UpdateOperation::FieldEdit => None,
		};

		inner.feedback.dismiss_progress();
		if let Some(stage) = stage {
			inner.feedback.report_success(stage);
		}

		tracing::info!(
			entity_id = %truncate_id(&entity_id),
			collections = replaced,
			"Confirmed optimistic update"
		);
		inner.publish(LifecycleEvent::UpdateConfirmed {
			update_id,
			entity_id,
			stage,
		});
		true
	}

	/// Restores the pre-mutation state of an update.
	///
	/// With a pending record for `update_id`, the entity slot receives
	/// `explicit_snapshot` if given, otherwise the stored snapshot, and the
	/// captured collection records are put back. Without a record, an explicit
	/// snapshot is still written to the entity and its collections; otherwise
	/// nothing happens and false is returned.
	#[instrument(skip_all, fields(update_id = %update_id, entity_id = %truncate_id(entity_id)))]
	pub fn rollback_update(
		&self,
		update_id: Uuid,
		entity_id: &str,
		explicit_snapshot: Option<Value>,
	) -> bool {
		self.inner.restore(update_id, Some(entity_id), explicit_snapshot)
	}

	/// Rolls back a failed update and reports the error to the user.
	///
	/// Returns whether a pending update was rolled back.
	#[instrument(skip_all, fields(update_id = %update_id, entity_id = %truncate_id(&context.entity_id)))]
	pub fn handle_update_error(
		&self,
		update_id: Uuid,
		error: &dyn fmt::Display,
		context: &OptimisticUpdateContext,
	) -> bool {
		let inner = &self.inner;
		let restored = inner.restore(update_id, Some(&context.entity_id), None);

		let message = failure_message(context, &inner.config.status_field, error);
		tracing::warn!(rolled_back = restored, "{}", message);
		inner.feedback.dismiss_progress();
		inner.feedback.report_error(&message);

		inner.publish(LifecycleEvent::UpdateFailed {
			update_id,
			entity_id: context.entity_id.clone(),
			error: error.to_string(),
		});
		restored
	}

	/// Whether an update is pending for the entity.
	pub fn has_pending_updates(&self, entity_id: &str) -> bool {
		self.inner.pending.contains_key(entity_id)
	}

	/// Pending updates of the entity. Holds at most one record.
	pub fn get_pending_updates(&self, entity_id: &str) -> Vec<PendingUpdateRecord> {
		self.inner
			.pending
			.get(entity_id)
			.map(|record| vec![record.value().clone()])
			.unwrap_or_default()
	}

	/// Number of pending updates across all entities.
	pub fn pending_count(&self) -> usize {
		self.inner.pending.len()
	}

	/// Rolls back every pending update, returning how many were restored.
	pub fn clear_all_updates(&self) -> usize {
		// Collect first so no shard guard is held while restoring
		let pending: Vec<(Uuid, String)> = self
			.inner
			.pending
			.iter()
			.map(|entry| (entry.update_id, entry.key().clone()))
			.collect();

		let cleared = pending
			.into_iter()
			.filter(|(update_id, entity_id)| self.inner.restore(*update_id, Some(entity_id), None))
			.count();
		if cleared > 0 {
			tracing::info!(cleared, "Cleared pending optimistic updates");
		}
		cleared
	}
}

impl ManagerInner {
	/// Builds the speculative representation and the stage it implies.
	fn speculative_state(
		&self,
		current: &Value,
		context: &OptimisticUpdateContext,
	) -> (Value, Option<BusinessStage>) {
		let mut speculative = match current {
			Value::Object(map) => map.clone(),
			_ => Map::new(),
		};
		for (field, value) in &context.to_state {
			speculative.insert(field.clone(), value.clone());
		}

		// Keep the record matchable inside collections
		let identity_field = self.cache.identity_field();
		if !speculative.contains_key(identity_field) {
			speculative.insert(
				identity_field.to_string(),
				Value::String(context.entity_id.clone()),
			);
		}

		let stage = match context.operation {
			UpdateOperation::StageAdvance => {
				let status = speculative
					.get(&self.config.status_field)
					.and_then(Value::as_str)
					.unwrap_or_default();
				let stage = map_status_to_stage(status);
				speculative.insert(
					self.config.stage_field.clone(),
					Value::String(stage.as_str().to_string()),
				);
				speculative.insert(
					self.config.progress_field.clone(),
					Value::from(progress_for_stage(stage).progress_percentage),
				);
				Some(stage)
			},
			UpdateOperation::FieldEdit => None,
		};

		speculative.insert(self.config.marker_field.clone(), Value::Bool(true));
		(Value::Object(speculative), stage)
	}

	/// Copy of `value` carrying the entity identity, for writing into collections.
	fn with_identity(&self, value: &Value, entity_id: &str) -> Value {
		let mut copy = value.clone();
		if let Value::Object(map) = &mut copy {
			let identity_field = self.cache.identity_field();
			if !map.contains_key(identity_field) {
				map.insert(
					identity_field.to_string(),
					Value::String(entity_id.to_string()),
				);
			}
		}
		copy
	}

	fn entity_for_update(&self, update_id: Uuid) -> Option<String> {
		self.pending
			.iter()
			.find(|entry| entry.update_id == update_id)
			.map(|entry| entry.key().clone())
	}

	fn restore(&self, update_id: Uuid, entity_id: Option<&str>, explicit: Option<Value>) -> bool {
		let entity_id = match entity_id {
			Some(id) => id.to_string(),
			None => match self.entity_for_update(update_id) {
				Some(id) => id,
				None => return false,
			},
		};

		match self
			.pending
			.remove_if(&entity_id, |_, record| record.update_id == update_id)
		{
			Some((_, record)) => {
				let snapshot = explicit.unwrap_or(record.snapshot);
				self.cache.put_entity(&entity_id, snapshot);
				let restored = self.cache.restore_collections(&entity_id, &record.collections);

				tracing::info!(
					update_id = %update_id,
					entity_id = %truncate_id(&entity_id),
					collections = restored,
					"Rolled back optimistic update"
				);
				self.feedback.dismiss_progress();
				self.publish(LifecycleEvent::UpdateRolledBack {
					update_id,
					entity_id,
				});
				true
			},
			None => match explicit {
				Some(snapshot) => {
					let names = self.cache.collection_names_containing(&entity_id);
					let record_copy = self.with_identity(&snapshot, &entity_id);
					self.cache.put_entity(&entity_id, snapshot);
					self.cache.replace_in_collections(&entity_id, &record_copy, &names);
					tracing::debug!(
						entity_id = %truncate_id(&entity_id),
						"Restored caller supplied snapshot without pending record"
					);
					true
				},
				None => {
					tracing::debug!(update_id = %update_id, "No pending update to roll back");
					false
				},
			},
		}
	}

	fn publish(&self, event: LifecycleEvent) {
		if let Some(bus) = &self.event_bus {
			bus.publish(event).ok();
		}
	}
}

fn default_progress_message(
	context: &OptimisticUpdateContext,
	stage: Option<BusinessStage>,
) -> String {
	match stage {
		Some(stage) => format!("Moving order {} to {}...", context.entity_id, stage),
		None => format!("Updating order {}...", context.entity_id),
	}
}

fn failure_message(
	context: &OptimisticUpdateContext,
	status_field: &str,
	error: &dyn fmt::Display,
) -> String {
	let target = context
		.to_state
		.get(status_field)
		.and_then(Value::as_str)
		.map(map_status_to_stage);
	match (context.operation, target) {
		(UpdateOperation::StageAdvance, Some(stage)) => format!(
			"Failed to move order {} to {}: {}",
			context.entity_id, stage, error
		),
		_ => format!(
			"Failed to apply {} to order {}: {}",
			context.operation, context.entity_id, error
		),
	}
}
