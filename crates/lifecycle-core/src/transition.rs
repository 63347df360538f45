//! Stage transition validation.
//!
//! Encodes the fixed business flow: forward-adjacent moves along the canonical
//! sequence, the payment branch out of AwaitingPayment, and the quality control
//! loop back to production. Validation is advisory; callers consult it before
//! staging a mutation and may choose to override it.

use lifecycle_types::{BusinessStage, STAGE_SEQUENCE};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Outcome of a transition check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionCheck {
	pub from: BusinessStage,
	pub to: BusinessStage,
	pub allowed: bool,
	/// Human-readable explanation naming both stages.
	pub reason: String,
}

/// Static transition table - each stage maps to allowed next stages
static TRANSITIONS: Lazy<HashMap<BusinessStage, HashSet<BusinessStage>>> = Lazy::new(|| {
	let mut m: HashMap<BusinessStage, HashSet<BusinessStage>> = HashMap::new();

	// Forward-adjacent moves along the sequence
	for pair in STAGE_SEQUENCE.windows(2) {
		m.entry(pair[0]).or_default().insert(pair[1]);
	}

	// Payment branch: a customer may pay in full without a down payment
	m.entry(BusinessStage::AwaitingPayment)
		.or_default()
		.insert(BusinessStage::FullPayment);

	// Failed quality control loops back to production
	m.entry(BusinessStage::QualityControl)
		.or_default()
		.insert(BusinessStage::InProduction);

	m.insert(BusinessStage::Completed, HashSet::new()); // terminal
	m.insert(BusinessStage::Cancelled, HashSet::new()); // terminal
	m.insert(BusinessStage::Refunded, HashSet::new()); // terminal
	m
});

/// Checks if a stage transition is legal.
pub fn can_transition_to_stage(from: BusinessStage, to: BusinessStage) -> bool {
	TRANSITIONS
		.get(&from)
		.is_some_and(|targets| targets.contains(&to))
}

/// Legal targets of `from`, in canonical order.
pub fn allowed_transitions(from: BusinessStage) -> Vec<BusinessStage> {
	BusinessStage::all()
		.filter(|to| can_transition_to_stage(from, *to))
		.collect()
}

/// Explains why a transition is or is not legal.
pub fn get_transition_reason(from: BusinessStage, to: BusinessStage) -> String {
	if can_transition_to_stage(from, to) {
		return match (from, to) {
			(BusinessStage::QualityControl, BusinessStage::InProduction) => format!(
				"{} failed inspection; returning to {} is the sanctioned rework loop",
				from, to
			),
			(BusinessStage::AwaitingPayment, BusinessStage::FullPayment) => format!(
				"{} may branch directly to {} when the order is paid in full",
				from, to
			),
			_ => format!("{} advances to {} in the standard order flow", from, to),
		};
	}

	if from.is_terminal() {
		return format!(
			"Cannot move from {} to {}: {} is a terminal stage and the order flow ends there",
			from, to, from
		);
	}

	if from == to {
		return format!(
			"Cannot move from {} to {}: the order is already in {}",
			from, to, from
		);
	}

	let expected = allowed_transitions(from)
		.iter()
		.map(|stage| stage.to_string())
		.collect::<Vec<_>>()
		.join(" or ");

	let direction = match (from.index(), to.index()) {
		(Some(f), Some(t)) if t < f => "moving backwards is not part of the order flow",
		(Some(f), Some(t)) if t > f + 1 => "stages cannot be skipped in the order flow",
		_ => "this move is not part of the order flow",
	};

	format!(
		"Cannot move from {} to {}: {}; the next stage after {} must be {}",
		from, to, direction, from, expected
	)
}

/// Checks a transition and explains the result in one call.
pub fn check_transition(from: BusinessStage, to: BusinessStage) -> TransitionCheck {
	TransitionCheck {
		from,
		to,
		allowed: can_transition_to_stage(from, to),
		reason: get_transition_reason(from, to),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use BusinessStage::*;

	#[test]
	fn test_forward_adjacent_transitions_are_legal() {
		for pair in STAGE_SEQUENCE.windows(2) {
			assert!(can_transition_to_stage(pair[0], pair[1]), "{:?}", pair);
		}
		assert!(can_transition_to_stage(Draft, Pending));
	}

	#[test]
	fn test_skipping_is_illegal() {
		assert!(!can_transition_to_stage(Draft, Completed));
		assert!(!can_transition_to_stage(Pending, CustomerQuote));
		assert!(!can_transition_to_stage(FullPayment, Shipping));
	}

	#[test]
	fn test_payment_branch() {
		assert!(can_transition_to_stage(AwaitingPayment, PartialPayment));
		assert!(can_transition_to_stage(AwaitingPayment, FullPayment));
		assert!(can_transition_to_stage(PartialPayment, FullPayment));
		assert_eq!(
			allowed_transitions(AwaitingPayment),
			vec![PartialPayment, FullPayment]
		);
	}

	#[test]
	fn test_quality_control_loop() {
		assert!(can_transition_to_stage(QualityControl, InProduction));
		assert!(can_transition_to_stage(QualityControl, Shipping));
		// The loop is the only sanctioned backward move
		assert!(!can_transition_to_stage(Shipping, QualityControl));
		assert!(!can_transition_to_stage(InProduction, FullPayment));
	}

	#[test]
	fn test_terminal_lock_out() {
		for to in BusinessStage::all() {
			assert!(!can_transition_to_stage(Completed, to));
			assert!(!can_transition_to_stage(Cancelled, to));
			assert!(!can_transition_to_stage(Refunded, to));
		}
		assert!(allowed_transitions(Completed).is_empty());
	}

	#[test]
	fn test_self_transition_is_illegal() {
		assert!(!can_transition_to_stage(Shipping, Shipping));
		assert!(get_transition_reason(Shipping, Shipping).contains("already in Shipping"));
	}

	#[test]
	fn test_reason_names_both_stages() {
		let reason = get_transition_reason(Draft, Completed);
		assert!(reason.contains("Draft"));
		assert!(reason.contains("Completed"));
		assert!(reason.contains("order flow"));
		assert!(reason.contains("Pending Review"));

		let reason = get_transition_reason(Completed, Shipping);
		assert!(reason.contains("terminal"));
		assert!(reason.contains("Shipping"));

		let reason = get_transition_reason(Shipping, Pending);
		assert!(reason.contains("backwards"));
	}

	#[test]
	fn test_check_transition() {
		let check = check_transition(QualityControl, InProduction);
		assert!(check.allowed);
		assert!(check.reason.contains("rework"));
	}
}
