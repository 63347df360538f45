//! Stage mapping from raw order statuses.
//!
//! Upstream statuses vary in casing, punctuation and vocabulary. This is the
//! single boundary where they are normalized into a [`BusinessStage`]; the rest
//! of the engine works on the canonical enum only.

use lifecycle_types::BusinessStage;

/// Normalizes a raw status: trims, lowercases and replaces `-` and spaces with `_`.
pub fn normalize_status(status: &str) -> String {
	status
		.trim()
		.to_lowercase()
		.chars()
		.map(|c| if c == '-' || c.is_whitespace() { '_' } else { c })
		.collect()
}

/// Maps a raw order status to its canonical business stage.
///
/// Total: unrecognized input falls back to [`BusinessStage::Draft`] so a bad
/// status degrades the display instead of failing the read path.
pub fn map_status_to_stage(status: &str) -> BusinessStage {
	let normalized = normalize_status(status);
	match lookup(&normalized) {
		Some(stage) => stage,
		None => {
			tracing::debug!(status = %status, "Unrecognized order status, falling back to draft");
			BusinessStage::Draft
		},
	}
}

/// Same as [`map_status_to_stage`] but reports unrecognized statuses as `None`.
pub fn try_map_status(status: &str) -> Option<BusinessStage> {
	lookup(&normalize_status(status))
}

fn lookup(normalized: &str) -> Option<BusinessStage> {
	// Compare without separators so "InProduction", "in_production" and
	// "in production" all resolve to the same key
	let compact: String = normalized.chars().filter(|c| *c != '_').collect();
	let stage = match compact.as_str() {
		"draft" | "new" | "created" => BusinessStage::Draft,
		"pending" | "submitted" | "pendingreview" | "underreview" => BusinessStage::Pending,
		"vendorsourcing" | "sourcing" | "sourcingvendor" | "findingvendor" => {
			BusinessStage::VendorSourcing
		},
		"vendornegotiation" | "negotiation" | "negotiating" | "vendornegotiating" => {
			BusinessStage::VendorNegotiation
		},
		"customerquote" | "quote" | "quoted" | "quotation" | "quotesent" => {
			BusinessStage::CustomerQuote
		},
		"awaitingpayment" | "pendingpayment" | "waitingpayment" | "unpaid" | "invoiced" => {
			BusinessStage::AwaitingPayment
		},
		"partialpayment" | "partiallypaid" | "partialpaid" | "downpayment" | "dppaid" => {
			BusinessStage::PartialPayment
		},
		"fullpayment" | "paid" | "fullypaid" | "paymentcomplete" | "paymentreceived" => {
			BusinessStage::FullPayment
		},
		"inproduction" | "production" | "producing" | "processing" => BusinessStage::InProduction,
		"qualitycontrol" | "qc" | "qualitycheck" | "inspection" => BusinessStage::QualityControl,
		"shipping" | "shipped" | "intransit" | "delivering" | "dispatched" => {
			BusinessStage::Shipping
		},
		"completed" | "complete" | "delivered" | "done" | "closed" => BusinessStage::Completed,
		"cancelled" | "canceled" | "void" => BusinessStage::Cancelled,
		"refunded" | "refund" | "refundcompleted" => BusinessStage::Refunded,
		_ => return None,
	};
	Some(stage)
}

#[cfg(test)]
mod tests {
	use super::*;
	use lifecycle_types::STAGE_SEQUENCE;

	#[test]
	fn test_normalization() {
		assert_eq!(normalize_status("  In-Production "), "in_production");
		assert_eq!(normalize_status("Quality Control"), "quality_control");
	}

	#[test]
	fn test_variants_of_the_same_status() {
		for raw in ["shipped", "Shipped", " SHIPPED ", "in-transit", "In Transit"] {
			assert_eq!(map_status_to_stage(raw), BusinessStage::Shipping, "{raw}");
		}
		assert_eq!(map_status_to_stage("in_production"), BusinessStage::InProduction);
		assert_eq!(map_status_to_stage("InProduction"), BusinessStage::InProduction);
		assert_eq!(map_status_to_stage("canceled"), BusinessStage::Cancelled);
	}

	#[test]
	fn test_canonical_identifiers_round_trip() {
		for stage in STAGE_SEQUENCE
			.into_iter()
			.chain([BusinessStage::Cancelled, BusinessStage::Refunded])
		{
			assert_eq!(map_status_to_stage(stage.as_str()), stage);
			assert_eq!(map_status_to_stage(stage.label()), stage);
			// Idempotent on its own output
			assert_eq!(map_status_to_stage(map_status_to_stage(stage.as_str()).as_str()), stage);
		}
	}

	#[test]
	fn test_unrecognized_falls_back_to_draft() {
		for raw in ["", "   ", "???", "shipping-ish", "\u{1F4E6}", "null"] {
			assert_eq!(map_status_to_stage(raw), BusinessStage::Draft, "{raw:?}");
			assert_eq!(try_map_status(raw), None);
		}
	}
}
