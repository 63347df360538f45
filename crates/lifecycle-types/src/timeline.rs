//! Timeline types.
//!
//! A timeline is the newest-first narrative of an order: real events taken
//! from recorded history plus synthetic events that backfill stages which were
//! never logged.

use crate::BusinessStage;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Who performed the action behind an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorType {
	Customer,
	Admin,
	Vendor,
	System,
}

impl ActorType {
	/// Lenient parse used for recorded history. Unknown values yield `None`.
	pub fn parse_lossy(value: &str) -> Option<Self> {
		match value.trim().to_ascii_lowercase().as_str() {
			"customer" | "client" | "buyer" => Some(ActorType::Customer),
			"admin" | "staff" | "operator" => Some(ActorType::Admin),
			"vendor" | "supplier" => Some(ActorType::Vendor),
			"system" | "automation" => Some(ActorType::System),
			_ => None,
		}
	}
}

/// Broad category of an event, derived from its stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventCategory {
	Status,
	Payment,
	Vendor,
	Production,
	Shipping,
	Note,
}

/// One row of an order timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineEvent {
	/// Event identifier. Synthetic events use `synthetic-<stage>`.
	pub id: String,
	/// Canonical stage this event belongs to.
	pub stage: BusinessStage,
	/// Status string as recorded, or the stage identifier for synthetic rows.
	pub status: String,
	pub timestamp: DateTime<Utc>,
	/// Display name of the actor.
	pub actor: String,
	pub actor_type: ActorType,
	pub category: EventCategory,
	/// English title.
	pub title: String,
	/// English description.
	pub description: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub indonesian_title: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub indonesian_description: Option<String>,
	#[serde(default)]
	pub metadata: serde_json::Value,
	pub is_business_critical: bool,
	pub requires_action: bool,
	#[serde(default)]
	pub next_actions: Vec<String>,
	/// Generated to fill a gap in recorded history.
	pub synthetic: bool,
	/// Staged by the optimistic update manager and not yet confirmed.
	#[serde(default)]
	pub optimistic: bool,
}

/// An entry of recorded order history as delivered by the persistence layer.
///
/// Every field is optional: history is upstream data and may be incomplete.
/// Missing values are filled with defaults during reconstruction.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordedEvent {
	#[serde(default)]
	pub id: Option<String>,
	#[serde(default)]
	pub status: Option<String>,
	/// RFC 3339 string or unix seconds.
	#[serde(default, alias = "created_at", alias = "createdAt")]
	pub timestamp: Option<serde_json::Value>,
	#[serde(default)]
	pub actor: Option<String>,
	#[serde(default, alias = "actorType")]
	pub actor_type: Option<String>,
	#[serde(default, alias = "note")]
	pub description: Option<String>,
	#[serde(default)]
	pub metadata: Option<serde_json::Value>,
}

/// Aggregate statistics over a timeline.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineStats {
	pub total_events: usize,
	pub synthetic_events: usize,
	pub by_category: BTreeMap<EventCategory, usize>,
	pub by_actor: BTreeMap<ActorType, usize>,
	pub business_critical: usize,
	pub requires_action: usize,
	/// Mean time spent between consecutive stage changes, in seconds.
	pub average_stage_duration_secs: Option<i64>,
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_recorded_event_accepts_aliases() {
		let event: RecordedEvent = serde_json::from_value(serde_json::json!({
			"status": "shipped",
			"created_at": "2024-03-01T10:00:00Z",
			"actorType": "vendor",
		}))
		.unwrap();
		assert_eq!(event.status.as_deref(), Some("shipped"));
		assert!(event.timestamp.is_some());
		assert_eq!(event.actor_type.as_deref(), Some("vendor"));
	}

	#[test]
	fn test_actor_type_parse_lossy() {
		assert_eq!(ActorType::parse_lossy(" Vendor "), Some(ActorType::Vendor));
		assert_eq!(ActorType::parse_lossy("robot"), None);
	}
}
