//! Progress results derived from an order's stage.

use crate::BusinessStage;
use serde::{Deserialize, Serialize};

/// Progress of an order through the canonical sequence.
///
/// Derived on every read and never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressResult {
	/// Stage the order is currently in.
	pub current_stage: BusinessStage,
	/// Every canonical stage strictly before the current one, in order.
	pub completed_stages: Vec<BusinessStage>,
	/// The following canonical stage, if any.
	pub next_stage: Option<BusinessStage>,
	/// Percentage through the sequence, 0 to 100.
	pub progress_percentage: u8,
	/// Position in the canonical sequence. Cancelled reports the first index
	/// and Refunded the last, matching their fixed percentages.
	pub stage_index: usize,
	/// Whether the order has reached a terminal outcome.
	pub is_terminal: bool,
	/// Whether forward progress is currently possible.
	pub can_progress: bool,
}
