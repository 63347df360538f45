//! Progress calculation over the canonical stage sequence.

use crate::stage::map_status_to_stage;
use lifecycle_types::{BusinessStage, ProgressResult, STAGE_SEQUENCE};

/// Progress reported for refunded orders, treated as a closed, resolved outcome.
const REFUNDED_PERCENTAGE: u8 = 100;
/// Progress reported for cancelled orders.
const CANCELLED_PERCENTAGE: u8 = 0;

/// Computes the progress of an order from its raw status.
pub fn calculate_progress(status: &str) -> ProgressResult {
	progress_for_stage(map_status_to_stage(status))
}

/// Computes the progress of an order already mapped to a stage.
pub fn progress_for_stage(stage: BusinessStage) -> ProgressResult {
	let last = STAGE_SEQUENCE.len() - 1;

	let Some(index) = stage.index() else {
		let (percentage, stage_index) = match stage {
			BusinessStage::Refunded => (REFUNDED_PERCENTAGE, last),
			_ => (CANCELLED_PERCENTAGE, 0),
		};
		return ProgressResult {
			current_stage: stage,
			completed_stages: Vec::new(),
			next_stage: None,
			progress_percentage: percentage,
			stage_index,
			is_terminal: true,
			can_progress: false,
		};
	};

	let next_stage = STAGE_SEQUENCE.get(index + 1).copied();
	let is_terminal = stage.is_terminal();

	ProgressResult {
		current_stage: stage,
		completed_stages: STAGE_SEQUENCE[..index].to_vec(),
		next_stage,
		progress_percentage: percentage(index, last),
		stage_index: index,
		is_terminal,
		can_progress: !is_terminal && next_stage.is_some(),
	}
}

/// `round(index / last * 100)`, computed in integers.
fn percentage(index: usize, last: usize) -> u8 {
	if last == 0 {
		return 100;
	}
	((index * 200 + last) / (2 * last)).min(100) as u8
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_draft_is_zero_percent() {
		let progress = calculate_progress("draft");
		assert_eq!(progress.current_stage, BusinessStage::Draft);
		assert_eq!(progress.progress_percentage, 0);
		assert_eq!(progress.stage_index, 0);
		assert!(progress.completed_stages.is_empty());
		assert_eq!(progress.next_stage, Some(BusinessStage::Pending));
		assert!(progress.can_progress);
		assert!(!progress.is_terminal);
	}

	#[test]
	fn test_completed_is_full_and_terminal() {
		let progress = calculate_progress("Completed");
		assert_eq!(progress.progress_percentage, 100);
		assert_eq!(progress.stage_index, 11);
		assert_eq!(progress.completed_stages.len(), 11);
		assert_eq!(progress.next_stage, None);
		assert!(progress.is_terminal);
		assert!(!progress.can_progress);
	}

	#[test]
	fn test_index_and_monotonic_percentage() {
		let mut previous = 0;
		for (i, stage) in STAGE_SEQUENCE.iter().enumerate() {
			let progress = calculate_progress(stage.as_str());
			assert_eq!(progress.stage_index, i);
			assert_eq!(progress.completed_stages, STAGE_SEQUENCE[..i].to_vec());
			assert!(progress.progress_percentage >= previous);
			previous = progress.progress_percentage;
		}
	}

	#[test]
	fn test_rounding() {
		// 1/11 = 9.09%, 6/11 = 54.5%, 10/11 = 90.9%
		assert_eq!(calculate_progress("pending").progress_percentage, 9);
		assert_eq!(calculate_progress("partial_payment").progress_percentage, 55);
		assert_eq!(calculate_progress("shipping").progress_percentage, 91);
	}

	#[test]
	fn test_cancelled() {
		let progress = calculate_progress("canceled");
		assert_eq!(progress.current_stage, BusinessStage::Cancelled);
		assert_eq!(progress.progress_percentage, 0);
		assert!(progress.is_terminal);
		assert!(!progress.can_progress);
		assert_eq!(progress.next_stage, None);
	}

	#[test]
	fn test_refunded() {
		let progress = calculate_progress("Refunded");
		assert_eq!(progress.progress_percentage, 100);
		assert!(progress.is_terminal);
		assert!(!progress.can_progress);
		assert_eq!(progress.next_stage, None);
	}

	#[test]
	fn test_deterministic() {
		assert_eq!(calculate_progress("in_production"), calculate_progress("in_production"));
		assert_eq!(calculate_progress("garbage"), calculate_progress("draft"));
	}
}
