//! Aggregate statistics over a reconstructed timeline.

use chrono::{DateTime, Utc};
use lifecycle_types::{BusinessStage, TimelineEvent, TimelineStats};

/// Counts events by category and actor and measures average stage dwell time.
pub fn get_timeline_stats(timeline: &[TimelineEvent]) -> TimelineStats {
	let mut stats = TimelineStats {
		total_events: timeline.len(),
		..Default::default()
	};

	for event in timeline {
		*stats.by_category.entry(event.category).or_default() += 1;
		*stats.by_actor.entry(event.actor_type).or_default() += 1;
		if event.synthetic {
			stats.synthetic_events += 1;
		}
		if event.is_business_critical {
			stats.business_critical += 1;
		}
		if event.requires_action {
			stats.requires_action += 1;
		}
	}

	stats.average_stage_duration_secs = average_dwell_secs(timeline);
	stats
}

/// Mean time between consecutive stage changes, walking the timeline oldest first.
fn average_dwell_secs(timeline: &[TimelineEvent]) -> Option<i64> {
	let mut ordered: Vec<&TimelineEvent> = timeline.iter().collect();
	ordered.sort_by_key(|event| event.timestamp);

	let mut durations = Vec::new();
	let mut entered: Option<(BusinessStage, DateTime<Utc>)> = None;
	for event in ordered {
		match entered {
			Some((stage, since)) if stage != event.stage => {
				durations.push((event.timestamp - since).num_seconds());
				entered = Some((event.stage, event.timestamp));
			},
			None => entered = Some((event.stage, event.timestamp)),
			_ => {},
		}
	}

	if durations.is_empty() {
		return None;
	}
	Some(durations.iter().sum::<i64>() / durations.len() as i64)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::timeline::{generate_timeline, TimelineOptions};
	use chrono::Duration;
	use lifecycle_types::{ActorType, EventCategory, RecordedEvent};
	use serde_json::json;

	fn reference() -> DateTime<Utc> {
		DateTime::parse_from_rfc3339("2024-06-01T12:00:00Z")
			.unwrap()
			.with_timezone(&Utc)
	}

	#[test]
	fn test_stats_for_synthetic_timeline() {
		let options = TimelineOptions {
			reference_time: Some(reference()),
			synthetic_step: Duration::hours(2),
			..Default::default()
		};
		let timeline = generate_timeline(&[], "full_payment", &options);
		let stats = get_timeline_stats(&timeline);

		assert_eq!(stats.total_events, 8);
		assert_eq!(stats.synthetic_events, 8);
		assert_eq!(stats.by_actor.get(&ActorType::System), Some(&8));
		assert_eq!(stats.by_category.get(&EventCategory::Payment), Some(&3));
		assert_eq!(stats.by_category.get(&EventCategory::Vendor), Some(&2));
		// Three payment stages plus the customer quote
		assert_eq!(stats.business_critical, 4);
		assert_eq!(stats.requires_action, 1);
		assert_eq!(stats.average_stage_duration_secs, Some(2 * 3600));
	}

	#[test]
	fn test_dwell_ignores_repeated_stage_events() {
		let history = vec![
			RecordedEvent {
				id: Some("a".into()),
				status: Some("draft".into()),
				timestamp: Some(json!("2024-05-01T00:00:00Z")),
				..Default::default()
			},
			RecordedEvent {
				id: Some("b".into()),
				status: Some("draft".into()),
				timestamp: Some(json!("2024-05-01T06:00:00Z")),
				..Default::default()
			},
			RecordedEvent {
				id: Some("c".into()),
				status: Some("pending".into()),
				timestamp: Some(json!("2024-05-02T00:00:00Z")),
				..Default::default()
			},
		];
		let options = TimelineOptions {
			reference_time: Some(reference()),
			..Default::default()
		};
		let stats = get_timeline_stats(&generate_timeline(&history, "pending", &options));

		assert_eq!(stats.total_events, 3);
		assert_eq!(stats.synthetic_events, 0);
		assert_eq!(stats.average_stage_duration_secs, Some(24 * 3600));
	}

	#[test]
	fn test_empty_timeline() {
		let stats = get_timeline_stats(&[]);
		assert_eq!(stats, TimelineStats::default());
	}
}
