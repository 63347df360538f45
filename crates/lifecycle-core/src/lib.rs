//! Core order lifecycle engine.
//!
//! Derives the canonical business stage of an order from its raw status,
//! reports progress along the fixed stage sequence, validates stage
//! transitions, reconstructs a human-readable timeline from partial history
//! and stages optimistic updates in the shared cache while the authoritative
//! order service confirms them.

pub mod builder;
pub mod engine;
pub mod feedback;
pub mod optimistic;
pub mod progress;
pub mod stage;
pub mod timeline;
pub mod transition;

pub use builder::{BuilderError, EngineBuilder};
pub use engine::event_bus::EventBus;
pub use engine::{DispatchError, EngineError, LifecycleEngine, OrderDispatcher, OrderSource};
pub use feedback::{FeedbackEntry, FeedbackSink, RecordingFeedback, TracingFeedback};
pub use optimistic::{
	OptimisticError, OptimisticUpdateHandle, OptimisticUpdateManager, PendingUpdateRecord,
	TimelineRollback,
};
pub use progress::{calculate_progress, progress_for_stage};
pub use stage::{map_status_to_stage, normalize_status, try_map_status};
pub use timeline::{generate_timeline, get_timeline_stats, TimelineOptions};
pub use transition::{
	allowed_transitions, can_transition_to_stage, check_transition, get_transition_reason,
	TransitionCheck,
};
