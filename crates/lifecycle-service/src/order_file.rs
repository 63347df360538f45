//! Order service backed by a JSON file.
//!
//! Lets the CLI drive the engine against a single order document on disk.
//! Dispatching a mutation writes the new state back to the file and appends
//! a history entry, the way the order service would.

use async_trait::async_trait;
use chrono::Utc;
use lifecycle_core::engine::HISTORY_FIELD;
use lifecycle_core::{DispatchError, OrderDispatcher, OrderSource};
use lifecycle_types::OptimisticUpdateContext;
use serde_json::{json, Value};
use std::path::PathBuf;

/// Order document stored in one JSON file.
pub struct FileOrderStore {
	path: PathBuf,
	actor: String,
	status_field: String,
}

impl FileOrderStore {
	pub fn new(path: impl Into<PathBuf>, actor: impl Into<String>, status_field: &str) -> Self {
		Self {
			path: path.into(),
			actor: actor.into(),
			status_field: status_field.to_string(),
		}
	}

	async fn read(&self) -> Result<Value, DispatchError> {
		let content = tokio::fs::read_to_string(&self.path)
			.await
			.map_err(|e| DispatchError::Unavailable(format!("{}: {}", self.path.display(), e)))?;
		serde_json::from_str(&content)
			.map_err(|e| DispatchError::Rejected(format!("{}: {}", self.path.display(), e)))
	}

	async fn write(&self, order: &Value) -> Result<(), DispatchError> {
		let content = serde_json::to_string_pretty(order)
			.map_err(|e| DispatchError::Rejected(e.to_string()))?;
		tokio::fs::write(&self.path, content)
			.await
			.map_err(|e| DispatchError::Unavailable(format!("{}: {}", self.path.display(), e)))
	}
}

#[async_trait]
impl OrderSource for FileOrderStore {
	async fn fetch(&self, _entity_id: &str) -> Result<Value, DispatchError> {
		self.read().await
	}
}

#[async_trait]
impl OrderDispatcher for FileOrderStore {
	async fn dispatch(
		&self,
		_entity_id: &str,
		context: &OptimisticUpdateContext,
	) -> Result<Value, DispatchError> {
		let mut order = self.read().await?;
		let Value::Object(fields) = &mut order else {
			return Err(DispatchError::Rejected("order document is not an object".into()));
		};

		for (field, value) in &context.to_state {
			fields.insert(field.clone(), value.clone());
		}
		let now = Utc::now().to_rfc3339();
		fields.insert("updated_at".into(), Value::String(now.clone()));

		if let Some(status) = context.to_state.get(&self.status_field) {
			let entry = json!({
				"id": uuid::Uuid::new_v4().to_string(),
				"status": status,
				"created_at": now,
				"actor": self.actor,
				"actor_type": "admin",
			});
			match fields.get_mut(HISTORY_FIELD) {
				Some(Value::Array(history)) => history.push(entry),
				_ => {
					fields.insert(HISTORY_FIELD.into(), Value::Array(vec![entry]));
				},
			}
		}

		self.write(&order).await?;
		Ok(order)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use lifecycle_types::BusinessStage;
	use tempfile::tempdir;

	#[tokio::test]
	async fn test_dispatch_writes_status_and_history() {
		let dir = tempdir().unwrap();
		let path = dir.path().join("order.json");
		std::fs::write(&path, r#"{"id": "order-1", "status": "pending"}"#).unwrap();

		let store = FileOrderStore::new(&path, "cli", "status");
		let context =
			OptimisticUpdateContext::stage_advance("order-1", "status", BusinessStage::VendorSourcing);
		let payload = store.dispatch("order-1", &context).await.unwrap();

		assert_eq!(payload["status"], "vendor_sourcing");
		assert_eq!(payload["history"][0]["status"], "vendor_sourcing");
		assert_eq!(payload["history"][0]["actor"], "cli");

		let stored: Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
		assert_eq!(stored, payload);
	}

	#[tokio::test]
	async fn test_fetch_rejects_invalid_json() {
		let dir = tempdir().unwrap();
		let path = dir.path().join("order.json");
		std::fs::write(&path, "not json").unwrap();

		let store = FileOrderStore::new(&path, "cli", "status");
		assert!(matches!(
			store.fetch("order-1").await,
			Err(DispatchError::Rejected(_))
		));
	}
}
