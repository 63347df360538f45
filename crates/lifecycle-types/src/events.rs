//! Event types published by the lifecycle engine.
//!
//! Events flow through the engine's broadcast bus so that other screens and
//! background listeners can react to staged, confirmed or rolled back updates.

use crate::{BusinessStage, UpdateOperation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Main event type for optimistic update activity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LifecycleEvent {
	/// A speculative state was written into the cache.
	UpdateStaged {
		update_id: Uuid,
		entity_id: String,
		operation: UpdateOperation,
		/// Stage implied by the speculative state.
		stage: Option<BusinessStage>,
	},
	/// The server confirmed an update and its payload replaced the speculative state.
	UpdateConfirmed {
		update_id: Uuid,
		entity_id: String,
		stage: Option<BusinessStage>,
	},
	/// The pre-mutation snapshot was restored.
	UpdateRolledBack { update_id: Uuid, entity_id: String },
	/// The authoritative mutation failed and the update was rolled back.
	UpdateFailed {
		update_id: Uuid,
		entity_id: String,
		error: String,
	},
	/// An optimistic row was added to an entity's cached timeline.
	TimelineEntryStaged {
		entity_id: String,
		event_id: String,
		stage: BusinessStage,
	},
}

impl LifecycleEvent {
	/// Entity the event refers to.
	pub fn entity_id(&self) -> &str {
		match self {
			LifecycleEvent::UpdateStaged { entity_id, .. }
			| LifecycleEvent::UpdateConfirmed { entity_id, .. }
			| LifecycleEvent::UpdateRolledBack { entity_id, .. }
			| LifecycleEvent::UpdateFailed { entity_id, .. }
			| LifecycleEvent::TimelineEntryStaged { entity_id, .. } => entity_id,
		}
	}
}
