//! Common types module for the order lifecycle engine.
//!
//! This module defines the core data types shared by every lifecycle crate:
//! the canonical business stages, derived progress results, timeline events,
//! optimistic update contexts and the lifecycle events published on the bus.

/// Lifecycle events published while optimistic updates are staged and resolved.
pub mod events;
/// Optimistic update contexts and operations.
pub mod optimistic;
/// Derived progress results.
pub mod progress;
/// Canonical business stages and their fixed sequence.
pub mod stage;
/// Timeline events, recorded history entries and aggregate statistics.
pub mod timeline;
/// Utility functions for display formatting.
pub mod utils;

// Re-export all types for convenient access
pub use events::*;
pub use optimistic::*;
pub use progress::*;
pub use stage::*;
pub use timeline::*;
pub use utils::truncate_id;
