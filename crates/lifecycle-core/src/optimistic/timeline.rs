//! Optimistic rows in cached timelines.
//!
//! While a stage advance is in flight the order's cached timeline shows a
//! provisional row for the new stage. The row is removed again when the
//! update resolves, either way.

use super::{ManagerInner, OptimisticUpdateManager};
use crate::timeline::catalog::{is_business_critical, stage_info};
use chrono::Utc;
use lifecycle_types::{
	truncate_id, ActorType, BusinessStage, LifecycleEvent, TimelineEvent,
};
use serde_json::{Map, Value};
use std::sync::Weak;
use uuid::Uuid;

/// Undo token for one optimistic timeline row.
#[must_use = "dropping the token leaves the optimistic row in the cached timeline"]
pub struct TimelineRollback {
	entity_id: String,
	event_id: String,
	/// Whether the entity had a cached timeline before the row was added.
	had_timeline: bool,
	manager: Weak<ManagerInner>,
}

impl TimelineRollback {
	/// Id of the optimistic row.
	pub fn event_id(&self) -> &str {
		&self.event_id
	}

	/// Removes the optimistic row from the cached timeline.
	///
	/// Rows written by others since are kept. If the entity had no cached
	/// timeline before and nothing else remains, the slot is dropped.
	pub fn rollback(self) {
		let Some(inner) = self.manager.upgrade() else {
			return;
		};
		let Some(mut events) = inner.cache.timeline(&self.entity_id) else {
			return;
		};

		events.retain(|event| event.id != self.event_id);
		if events.is_empty() && !self.had_timeline {
			inner.cache.remove_timeline(&self.entity_id);
		} else {
			inner.cache.put_timeline(&self.entity_id, events);
		}
		tracing::debug!(
			entity_id = %truncate_id(&self.entity_id),
			event_id = %self.event_id,
			"Removed optimistic timeline row"
		);
	}
}

impl OptimisticUpdateManager {
	/// Builds a provisional timeline row for a stage the order is moving to.
	pub fn create_optimistic_timeline_entry(
		&self,
		stage: BusinessStage,
		actor: &str,
		actor_type: ActorType,
		description: Option<&str>,
	) -> TimelineEvent {
		let info = stage_info(stage);
		let mut metadata = Map::new();
		metadata.insert(self.inner.config.marker_field.clone(), Value::Bool(true));

		TimelineEvent {
			id: format!("optimistic-{}", Uuid::new_v4()),
			stage,
			status: stage.as_str().to_string(),
			timestamp: Utc::now(),
			actor: actor.to_string(),
			actor_type,
			category: info.category,
			title: stage.label().to_string(),
			description: description.unwrap_or(info.description).to_string(),
			indonesian_title: Some(stage.indonesian_label().to_string()),
			indonesian_description: Some(info.indonesian_description.to_string()),
			metadata: Value::Object(metadata),
			is_business_critical: is_business_critical(stage),
			requires_action: false,
			next_actions: Vec::new(),
			synthetic: false,
			optimistic: true,
		}
	}

	/// Puts `entry` at the head of the entity's cached timeline.
	pub fn update_timeline_cache(&self, entity_id: &str, entry: TimelineEvent) -> TimelineRollback {
		let inner = &self.inner;
		let previous = inner.cache.timeline(entity_id);
		let had_timeline = previous.is_some();

		let event_id = entry.id.clone();
		let stage = entry.stage;
		let mut events = previous.unwrap_or_default();
		events.insert(0, entry);
		inner.cache.put_timeline(entity_id, events);

		inner.publish(LifecycleEvent::TimelineEntryStaged {
			entity_id: entity_id.to_string(),
			event_id: event_id.clone(),
			stage,
		});

		TimelineRollback {
			entity_id: entity_id.to_string(),
			event_id,
			had_timeline,
			manager: std::sync::Arc::downgrade(&self.inner),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::feedback::TracingFeedback;
	use lifecycle_cache::{implementations::memory::MemoryCache, CacheService};
	use lifecycle_config::OptimisticConfig;
	use lifecycle_types::EventCategory;
	use std::sync::Arc;

	fn manager() -> OptimisticUpdateManager {
		let cache = Arc::new(CacheService::new(Box::new(MemoryCache::new()), "id"));
		OptimisticUpdateManager::new(cache, Arc::new(TracingFeedback), OptimisticConfig::default())
	}

	#[test]
	fn test_entry_is_flagged_optimistic() {
		let manager = manager();
		let entry = manager.create_optimistic_timeline_entry(
			BusinessStage::FullPayment,
			"Alice",
			ActorType::Admin,
			None,
		);

		assert!(entry.optimistic);
		assert!(!entry.synthetic);
		assert!(entry.id.starts_with("optimistic-"));
		assert_eq!(entry.category, EventCategory::Payment);
		assert!(entry.is_business_critical);
		assert_eq!(entry.metadata["_optimistic"], true);
		assert_eq!(entry.title, "Full Payment");
	}

	#[test]
	fn test_rollback_removes_only_own_row() {
		let manager = manager();
		let cache = manager.cache().clone();

		let first = manager.create_optimistic_timeline_entry(
			BusinessStage::VendorSourcing,
			"Alice",
			ActorType::Admin,
			Some("Sourcing started"),
		);
		let undo = manager.update_timeline_cache("order-1", first);

		let second = manager.create_optimistic_timeline_entry(
			BusinessStage::VendorNegotiation,
			"Bob",
			ActorType::Admin,
			None,
		);
		let second_id = second.id.clone();
		let _keep = manager.update_timeline_cache("order-1", second);
		assert_eq!(cache.timeline("order-1").unwrap().len(), 2);

		undo.rollback();
		let remaining = cache.timeline("order-1").unwrap();
		assert_eq!(remaining.len(), 1);
		assert_eq!(remaining[0].id, second_id);
	}

	#[test]
	fn test_rollback_drops_slot_created_for_row() {
		let manager = manager();
		let entry = manager.create_optimistic_timeline_entry(
			BusinessStage::Shipping,
			"Vendor Co",
			ActorType::Vendor,
			None,
		);
		let undo = manager.update_timeline_cache("order-1", entry);
		assert!(manager.cache().timeline("order-1").is_some());

		undo.rollback();
		assert!(manager.cache().timeline("order-1").is_none());
	}
}
