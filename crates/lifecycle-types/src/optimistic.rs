//! Optimistic update types.
//!
//! An optimistic update is a speculative, client-visible state change applied
//! to the shared cache before the authoritative order service confirms it.

use crate::BusinessStage;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Kind of mutation being staged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateOperation {
	/// Move the order to another business stage.
	StageAdvance,
	/// Edit arbitrary fields of the entity.
	FieldEdit,
}

impl fmt::Display for UpdateOperation {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			UpdateOperation::StageAdvance => write!(f, "stage advance"),
			UpdateOperation::FieldEdit => write!(f, "field edit"),
		}
	}
}

/// Describes one speculative mutation of a cached entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptimisticUpdateContext {
	/// Identity of the entity in the cache.
	pub entity_id: String,
	pub operation: UpdateOperation,
	/// State the caller believes the entity is in, for messages and audit.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub from_state: Option<Value>,
	/// Fields overlaid onto the cached representation.
	pub to_state: Map<String, Value>,
	/// Message shown while the update is in flight.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub user_feedback: Option<String>,
}

impl OptimisticUpdateContext {
	/// Context for advancing an order to `to`, writing the canonical status string.
	pub fn stage_advance(
		entity_id: impl Into<String>,
		status_field: &str,
		to: BusinessStage,
	) -> Self {
		let mut to_state = Map::new();
		to_state.insert(
			status_field.to_string(),
			Value::String(to.as_str().to_string()),
		);
		Self {
			entity_id: entity_id.into(),
			operation: UpdateOperation::StageAdvance,
			from_state: None,
			to_state,
			user_feedback: None,
		}
	}

	/// Context for a plain field edit.
	pub fn field_edit(entity_id: impl Into<String>, fields: Map<String, Value>) -> Self {
		Self {
			entity_id: entity_id.into(),
			operation: UpdateOperation::FieldEdit,
			from_state: None,
			to_state: fields,
			user_feedback: None,
		}
	}

	pub fn with_from_state(mut self, from_state: Value) -> Self {
		self.from_state = Some(from_state);
		self
	}

	pub fn with_feedback(mut self, message: impl Into<String>) -> Self {
		self.user_feedback = Some(message.into());
		self
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_stage_advance_writes_canonical_status() {
		let ctx =
			OptimisticUpdateContext::stage_advance("order-1", "status", BusinessStage::VendorSourcing);
		assert_eq!(ctx.operation, UpdateOperation::StageAdvance);
		assert_eq!(ctx.to_state.get("status"), Some(&Value::from("vendor_sourcing")));
	}
}
