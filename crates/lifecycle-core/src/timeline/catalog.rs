//! Static lookup tables keyed by stage.
//!
//! Category, criticality, default actor and localized copy are all derived
//! from the stage, never from free-text inspection of a description.

use lifecycle_types::{ActorType, BusinessStage, EventCategory};

/// Descriptive data attached to every event of a stage.
#[derive(Debug, Clone, Copy)]
pub(crate) struct StageInfo {
	pub category: EventCategory,
	pub default_actor: ActorType,
	pub description: &'static str,
	pub indonesian_description: &'static str,
	/// Actions offered while the order sits in this stage.
	pub next_actions: &'static [&'static str],
}

/// Actions offered once an order has completed.
pub(crate) const CLOSING_ACTIONS: &[&str] = &["archive_order", "request_feedback"];

pub(crate) fn stage_info(stage: BusinessStage) -> StageInfo {
	match stage {
		BusinessStage::Draft => StageInfo {
			category: EventCategory::Status,
			default_actor: ActorType::Customer,
			description: "Order draft created",
			indonesian_description: "Draf pesanan dibuat",
			next_actions: &["submit_order"],
		},
		BusinessStage::Pending => StageInfo {
			category: EventCategory::Status,
			default_actor: ActorType::Customer,
			description: "Order submitted and waiting for review",
			indonesian_description: "Pesanan dikirim dan menunggu tinjauan",
			next_actions: &["review_order", "start_vendor_sourcing"],
		},
		BusinessStage::VendorSourcing => StageInfo {
			category: EventCategory::Vendor,
			default_actor: ActorType::Admin,
			description: "Searching for a suitable vendor",
			indonesian_description: "Mencari vendor yang sesuai",
			next_actions: &["assign_vendor"],
		},
		BusinessStage::VendorNegotiation => StageInfo {
			category: EventCategory::Vendor,
			default_actor: ActorType::Admin,
			description: "Negotiating price and terms with the vendor",
			indonesian_description: "Negosiasi harga dan ketentuan dengan vendor",
			next_actions: &["confirm_vendor_terms"],
		},
		BusinessStage::CustomerQuote => StageInfo {
			category: EventCategory::Status,
			default_actor: ActorType::Admin,
			description: "Quote sent to the customer",
			indonesian_description: "Penawaran dikirim ke pelanggan",
			next_actions: &["accept_quote", "request_revision"],
		},
		BusinessStage::AwaitingPayment => StageInfo {
			category: EventCategory::Payment,
			default_actor: ActorType::Customer,
			description: "Waiting for the customer's payment",
			indonesian_description: "Menunggu pembayaran dari pelanggan",
			next_actions: &["record_down_payment", "record_full_payment"],
		},
		BusinessStage::PartialPayment => StageInfo {
			category: EventCategory::Payment,
			default_actor: ActorType::Customer,
			description: "Down payment received",
			indonesian_description: "Uang muka diterima",
			next_actions: &["record_remaining_payment"],
		},
		BusinessStage::FullPayment => StageInfo {
			category: EventCategory::Payment,
			default_actor: ActorType::Customer,
			description: "Payment received in full",
			indonesian_description: "Pembayaran diterima lunas",
			next_actions: &["start_production"],
		},
		BusinessStage::InProduction => StageInfo {
			category: EventCategory::Production,
			default_actor: ActorType::Vendor,
			description: "Vendor is producing the order",
			indonesian_description: "Vendor sedang memproduksi pesanan",
			next_actions: &["submit_for_quality_control"],
		},
		BusinessStage::QualityControl => StageInfo {
			category: EventCategory::Production,
			default_actor: ActorType::Admin,
			description: "Goods are being inspected",
			indonesian_description: "Barang sedang diperiksa",
			next_actions: &["approve_quality", "reject_to_production"],
		},
		BusinessStage::Shipping => StageInfo {
			category: EventCategory::Shipping,
			default_actor: ActorType::Vendor,
			description: "Order shipped to the customer",
			indonesian_description: "Pesanan dikirim ke pelanggan",
			next_actions: &["confirm_delivery"],
		},
		BusinessStage::Completed => StageInfo {
			category: EventCategory::Status,
			default_actor: ActorType::System,
			description: "Order delivered and completed",
			indonesian_description: "Pesanan diterima dan selesai",
			next_actions: CLOSING_ACTIONS,
		},
		BusinessStage::Cancelled => StageInfo {
			category: EventCategory::Status,
			default_actor: ActorType::Admin,
			description: "Order cancelled",
			indonesian_description: "Pesanan dibatalkan",
			next_actions: &["archive_order"],
		},
		BusinessStage::Refunded => StageInfo {
			category: EventCategory::Payment,
			default_actor: ActorType::Admin,
			description: "Payment refunded to the customer",
			indonesian_description: "Dana dikembalikan ke pelanggan",
			next_actions: &["archive_order"],
		},
	}
}

/// Whether events of this stage are business critical.
///
/// Payment events always are; so are quotes and every terminal outcome.
pub(crate) fn is_business_critical(stage: BusinessStage) -> bool {
	stage_info(stage).category == EventCategory::Payment
		|| matches!(
			stage,
			BusinessStage::CustomerQuote
				| BusinessStage::Completed
				| BusinessStage::Cancelled
				| BusinessStage::Refunded
		)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_payment_stages_are_critical() {
		for stage in BusinessStage::all() {
			if stage_info(stage).category == EventCategory::Payment {
				assert!(is_business_critical(stage), "{stage:?}");
			}
		}
		assert!(!is_business_critical(BusinessStage::InProduction));
	}

	#[test]
	fn test_every_stage_has_copy() {
		for stage in BusinessStage::all() {
			let info = stage_info(stage);
			assert!(!info.description.is_empty());
			assert!(!info.indonesian_description.is_empty());
			assert!(!info.next_actions.is_empty());
		}
	}
}
