//! Canonical business stages of a commerce order.
//!
//! Orders move through a fixed, totally ordered sequence of twelve stages.
//! Two additional terminal markers, Cancelled and Refunded, sit outside the
//! forward sequence.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// A canonical business stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BusinessStage {
	/// Order is being drafted by the customer.
	Draft,
	/// Order was submitted and awaits review.
	Pending,
	/// Admins are looking for a vendor.
	VendorSourcing,
	/// Price and terms are being negotiated with the vendor.
	VendorNegotiation,
	/// A quote has been sent to the customer.
	CustomerQuote,
	/// Quote accepted, waiting for the customer to pay.
	AwaitingPayment,
	/// Down payment received.
	PartialPayment,
	/// Order fully paid.
	FullPayment,
	/// Vendor is producing the goods.
	InProduction,
	/// Goods are being inspected.
	QualityControl,
	/// Goods are on their way to the customer.
	Shipping,
	/// Order delivered and closed.
	Completed,
	/// Terminal marker: order cancelled.
	Cancelled,
	/// Terminal marker: order refunded.
	Refunded,
}

/// The designed forward flow, in order.
pub const STAGE_SEQUENCE: [BusinessStage; 12] = [
	BusinessStage::Draft,
	BusinessStage::Pending,
	BusinessStage::VendorSourcing,
	BusinessStage::VendorNegotiation,
	BusinessStage::CustomerQuote,
	BusinessStage::AwaitingPayment,
	BusinessStage::PartialPayment,
	BusinessStage::FullPayment,
	BusinessStage::InProduction,
	BusinessStage::QualityControl,
	BusinessStage::Shipping,
	BusinessStage::Completed,
];

/// Error returned when a string is not an exact stage name.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("Unknown business stage: {0}")]
pub struct UnknownStage(pub String);

impl BusinessStage {
	/// Returns the snake_case identifier, which is also the canonical status string.
	pub fn as_str(&self) -> &'static str {
		match self {
			BusinessStage::Draft => "draft",
			BusinessStage::Pending => "pending",
			BusinessStage::VendorSourcing => "vendor_sourcing",
			BusinessStage::VendorNegotiation => "vendor_negotiation",
			BusinessStage::CustomerQuote => "customer_quote",
			BusinessStage::AwaitingPayment => "awaiting_payment",
			BusinessStage::PartialPayment => "partial_payment",
			BusinessStage::FullPayment => "full_payment",
			BusinessStage::InProduction => "in_production",
			BusinessStage::QualityControl => "quality_control",
			BusinessStage::Shipping => "shipping",
			BusinessStage::Completed => "completed",
			BusinessStage::Cancelled => "cancelled",
			BusinessStage::Refunded => "refunded",
		}
	}

	/// Human-readable English title.
	pub fn label(&self) -> &'static str {
		match self {
			BusinessStage::Draft => "Draft",
			BusinessStage::Pending => "Pending Review",
			BusinessStage::VendorSourcing => "Vendor Sourcing",
			BusinessStage::VendorNegotiation => "Vendor Negotiation",
			BusinessStage::CustomerQuote => "Customer Quote",
			BusinessStage::AwaitingPayment => "Awaiting Payment",
			BusinessStage::PartialPayment => "Partial Payment",
			BusinessStage::FullPayment => "Full Payment",
			BusinessStage::InProduction => "In Production",
			BusinessStage::QualityControl => "Quality Control",
			BusinessStage::Shipping => "Shipping",
			BusinessStage::Completed => "Completed",
			BusinessStage::Cancelled => "Cancelled",
			BusinessStage::Refunded => "Refunded",
		}
	}

	/// Indonesian title shown to local customers.
	pub fn indonesian_label(&self) -> &'static str {
		match self {
			BusinessStage::Draft => "Draf",
			BusinessStage::Pending => "Menunggu Tinjauan",
			BusinessStage::VendorSourcing => "Pencarian Vendor",
			BusinessStage::VendorNegotiation => "Negosiasi Vendor",
			BusinessStage::CustomerQuote => "Penawaran Pelanggan",
			BusinessStage::AwaitingPayment => "Menunggu Pembayaran",
			BusinessStage::PartialPayment => "Pembayaran Sebagian",
			BusinessStage::FullPayment => "Pembayaran Lunas",
			BusinessStage::InProduction => "Dalam Produksi",
			BusinessStage::QualityControl => "Kontrol Kualitas",
			BusinessStage::Shipping => "Pengiriman",
			BusinessStage::Completed => "Selesai",
			BusinessStage::Cancelled => "Dibatalkan",
			BusinessStage::Refunded => "Dana Dikembalikan",
		}
	}

	/// Position in [`STAGE_SEQUENCE`], or `None` for the terminal markers.
	pub fn index(&self) -> Option<usize> {
		STAGE_SEQUENCE.iter().position(|s| s == self)
	}

	/// True for Cancelled and Refunded, which live outside the forward sequence.
	pub fn is_terminal_marker(&self) -> bool {
		matches!(self, BusinessStage::Cancelled | BusinessStage::Refunded)
	}

	/// True for every stage from which no further forward transition is legal.
	pub fn is_terminal(&self) -> bool {
		matches!(
			self,
			BusinessStage::Completed | BusinessStage::Cancelled | BusinessStage::Refunded
		)
	}

	/// Returns an iterator over all stages, sequence first, then terminal markers.
	pub fn all() -> impl Iterator<Item = Self> {
		STAGE_SEQUENCE
			.into_iter()
			.chain([BusinessStage::Cancelled, BusinessStage::Refunded])
	}
}

impl fmt::Display for BusinessStage {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.label())
	}
}

impl FromStr for BusinessStage {
	type Err = UnknownStage;

	/// Strict parse of the snake_case identifier. Lenient status mapping
	/// lives in the engine's stage mapper.
	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::all()
			.find(|stage| stage.as_str() == s)
			.ok_or_else(|| UnknownStage(s.to_string()))
	}
}
