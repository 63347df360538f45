//! UI feedback sink.
//!
//! The engine never renders anything itself. It reports in-flight progress,
//! confirmed stages and failures to a sink supplied by the host application.

use lifecycle_types::BusinessStage;
use std::sync::Mutex;

/// Receiver of user-facing feedback about optimistic updates.
pub trait FeedbackSink: Send + Sync {
	/// Shows a progress indicator while an update is in flight.
	fn show_progress(&self, message: &str);

	/// Hides the progress indicator.
	fn dismiss_progress(&self);

	/// Reports that an order reached a stage.
	fn report_success(&self, stage: BusinessStage);

	/// Reports a failed update.
	fn report_error(&self, message: &str);
}

/// Sink that writes feedback to the tracing log, for headless hosts.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingFeedback;

impl FeedbackSink for TracingFeedback {
	fn show_progress(&self, message: &str) {
		tracing::info!(feedback = "progress", "{}", message);
	}

	fn dismiss_progress(&self) {
		tracing::debug!(feedback = "dismiss", "Progress dismissed");
	}

	fn report_success(&self, stage: BusinessStage) {
		tracing::info!(feedback = "success", stage = %stage.as_str(), "Order moved to {}", stage);
	}

	fn report_error(&self, message: &str) {
		tracing::warn!(feedback = "error", "{}", message);
	}
}

/// One piece of feedback captured by [`RecordingFeedback`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedbackEntry {
	Progress(String),
	Dismissed,
	Success(BusinessStage),
	Error(String),
}

/// Sink that keeps every report in memory, in order.
#[derive(Debug, Default)]
pub struct RecordingFeedback {
	entries: Mutex<Vec<FeedbackEntry>>,
}

impl RecordingFeedback {
	pub fn new() -> Self {
		Self::default()
	}

	/// Returns a copy of everything reported so far.
	pub fn entries(&self) -> Vec<FeedbackEntry> {
		self.entries
			.lock()
			.unwrap_or_else(|poisoned| poisoned.into_inner())
			.clone()
	}

	/// Error messages reported so far.
	pub fn errors(&self) -> Vec<String> {
		self.entries()
			.into_iter()
			.filter_map(|entry| match entry {
				FeedbackEntry::Error(message) => Some(message),
				_ => None,
			})
			.collect()
	}

	fn push(&self, entry: FeedbackEntry) {
		self.entries
			.lock()
			.unwrap_or_else(|poisoned| poisoned.into_inner())
			.push(entry);
	}
}

impl FeedbackSink for RecordingFeedback {
	fn show_progress(&self, message: &str) {
		self.push(FeedbackEntry::Progress(message.to_string()));
	}

	fn dismiss_progress(&self) {
		self.push(FeedbackEntry::Dismissed);
	}

	fn report_success(&self, stage: BusinessStage) {
		self.push(FeedbackEntry::Success(stage));
	}

	fn report_error(&self, message: &str) {
		self.push(FeedbackEntry::Error(message.to_string()));
	}
}
