//! Event bus for lifecycle events.
//!
//! A thin wrapper over a tokio broadcast channel. Every subscriber receives
//! every event published after it subscribed; publishing with no subscribers
//! is not an error for callers, who ignore the result with `.ok()`.

use lifecycle_types::LifecycleEvent;
use tokio::sync::broadcast;

/// Default number of events buffered per subscriber.
pub const DEFAULT_CAPACITY: usize = 256;

/// Broadcast bus carrying [`LifecycleEvent`]s.
#[derive(Clone)]
pub struct EventBus {
	sender: broadcast::Sender<LifecycleEvent>,
}

impl EventBus {
	/// Creates a bus buffering up to `capacity` events per subscriber.
	pub fn new(capacity: usize) -> Self {
		let (sender, _) = broadcast::channel(capacity.max(1));
		Self { sender }
	}

	/// Publishes an event, returning the number of subscribers that received it.
	pub fn publish(
		&self,
		event: LifecycleEvent,
	) -> Result<usize, broadcast::error::SendError<LifecycleEvent>> {
		self.sender.send(event)
	}

	/// Subscribes to events published from now on.
	pub fn subscribe(&self) -> broadcast::Receiver<LifecycleEvent> {
		self.sender.subscribe()
	}
}

impl Default for EventBus {
	fn default() -> Self {
		Self::new(DEFAULT_CAPACITY)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use uuid::Uuid;

	#[tokio::test]
	async fn test_publish_and_subscribe() {
		let bus = EventBus::default();
		let mut receiver = bus.subscribe();

		let event = LifecycleEvent::UpdateRolledBack {
			update_id: Uuid::new_v4(),
			entity_id: "order-1".into(),
		};
		assert_eq!(bus.publish(event.clone()).unwrap(), 1);
		assert_eq!(receiver.recv().await.unwrap(), event);
	}

	#[test]
	fn test_publish_without_subscribers() {
		let bus = EventBus::new(4);
		let event = LifecycleEvent::UpdateRolledBack {
			update_id: Uuid::new_v4(),
			entity_id: "order-1".into(),
		};
		assert!(bus.publish(event).is_err());
	}
}
