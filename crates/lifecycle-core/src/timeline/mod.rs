//! Timeline reconstruction.
//!
//! Merges recorded order history with synthetic events for canonical stages
//! that were skipped or never logged, producing one newest-first narrative.
//! Reconstruction never fails: malformed history degrades to defaults and
//! synthetic backfill.

pub(crate) mod catalog;
pub mod stats;

pub use stats::get_timeline_stats;

use crate::stage::{map_status_to_stage, try_map_status};
use catalog::{is_business_critical, stage_info};
use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use lifecycle_config::TimelineConfig;
use lifecycle_types::{ActorType, BusinessStage, RecordedEvent, TimelineEvent, STAGE_SEQUENCE};
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

/// Actor name used when history does not say who acted.
pub const SYSTEM_ACTOR: &str = "System";

/// Spacing of synthetic events when none is configured.
const DEFAULT_STEP_MINUTES: i64 = 60;

/// Options controlling timeline reconstruction.
#[derive(Debug, Clone, PartialEq)]
pub struct TimelineOptions {
	/// Maximum number of events returned.
	pub max_events: Option<usize>,
	/// Whether recorded events performed by the system actor are kept.
	/// Synthetic events are always kept.
	pub include_system_events: bool,
	/// Whether Indonesian titles and descriptions are populated.
	pub use_indonesian: bool,
	/// Time used for missing timestamps and to anchor synthetic events when
	/// no recorded event exists. Defaults to now.
	pub reference_time: Option<DateTime<Utc>>,
	/// Spacing of synthetic events that cannot be placed between two recorded ones.
	pub synthetic_step: Duration,
}

impl Default for TimelineOptions {
	fn default() -> Self {
		Self {
			max_events: None,
			include_system_events: true,
			use_indonesian: true,
			reference_time: None,
			synthetic_step: Duration::minutes(DEFAULT_STEP_MINUTES),
		}
	}
}

impl From<&TimelineConfig> for TimelineOptions {
	fn from(config: &TimelineConfig) -> Self {
		Self {
			max_events: config.max_events,
			include_system_events: config.include_system_events,
			use_indonesian: config.use_indonesian,
			reference_time: None,
			synthetic_step: i64::try_from(config.synthetic_step_minutes)
				.ok()
				.and_then(Duration::try_minutes)
				.unwrap_or_else(|| Duration::minutes(DEFAULT_STEP_MINUTES)),
		}
	}
}

/// Builds the timeline of an order from its recorded history and current status.
pub fn generate_timeline(
	recorded: &[RecordedEvent],
	current_status: &str,
	options: &TimelineOptions,
) -> Vec<TimelineEvent> {
	let now = options.reference_time.unwrap_or_else(Utc::now);
	let current = map_status_to_stage(current_status);

	// Enrich recorded history, keeping the first occurrence of a repeated id
	let mut seen_ids = HashSet::new();
	let mut events: Vec<TimelineEvent> =
		Vec::with_capacity(recorded.len() + STAGE_SEQUENCE.len());
	for (position, raw) in recorded.iter().enumerate() {
		if let Some(id) = raw.id.as_deref() {
			if !seen_ids.insert(id.to_string()) {
				tracing::debug!(event_id = %id, "Dropping duplicate recorded event");
				continue;
			}
		}
		events.push(enrich_recorded(raw, position, now, options));
	}

	let chain = backfill_chain(current, &events);
	let synthetic = synthesize_missing(&chain, &events, now, options);
	events.extend(synthetic);

	assign_actions(&mut events, current);

	events.sort_by(newest_first);

	if !options.include_system_events {
		events.retain(|event| event.synthetic || event.actor_type != ActorType::System);
	}

	if let Some(max) = options.max_events {
		events.truncate(max);
	}

	events
}

/// Canonical stages the timeline must show, oldest first.
///
/// Forward stages cover the sequence up to the current stage. For cancelled
/// and refunded orders the sequence runs up to the furthest stage found in
/// history, followed by the terminal marker itself.
fn backfill_chain(current: BusinessStage, recorded: &[TimelineEvent]) -> Vec<BusinessStage> {
	match current.index() {
		Some(index) => STAGE_SEQUENCE[..=index].to_vec(),
		None => {
			let furthest = recorded.iter().filter_map(|e| e.stage.index()).max();
			let mut chain = furthest
				.map(|index| STAGE_SEQUENCE[..=index].to_vec())
				.unwrap_or_default();
			chain.push(current);
			chain
		},
	}
}

/// Creates synthetic events for chain stages without a recorded event.
///
/// Timestamps are interpolated between the nearest recorded neighbours in the
/// chain, so a synthetic event is never later than the next recorded stage nor
/// earlier than the previous one. Without a neighbour on one side, events are
/// spaced by `synthetic_step` from the other; without any, they end at the
/// reference time.
fn synthesize_missing(
	chain: &[BusinessStage],
	recorded: &[TimelineEvent],
	now: DateTime<Utc>,
	options: &TimelineOptions,
) -> Vec<TimelineEvent> {
	// Earliest and latest recorded timestamp per stage
	let mut bounds: HashMap<BusinessStage, (DateTime<Utc>, DateTime<Utc>)> = HashMap::new();
	for event in recorded {
		bounds
			.entry(event.stage)
			.and_modify(|(first, last)| {
				*first = (*first).min(event.timestamp);
				*last = (*last).max(event.timestamp);
			})
			.or_insert((event.timestamp, event.timestamp));
	}

	let step_ms = options.synthetic_step.num_milliseconds().max(1);
	let last_position = chain.len().saturating_sub(1);
	// Projections forward never land before any recorded event
	let latest_recorded = recorded.iter().map(|event| event.timestamp).max();
	let mut synthetic = Vec::new();

	for (k, stage) in chain.iter().enumerate() {
		if bounds.contains_key(stage) {
			continue;
		}

		let previous = chain[..k]
			.iter()
			.enumerate()
			.rev()
			.find_map(|(p, s)| bounds.get(s).map(|(_, last)| (p, *last)));
		let next = chain[k + 1..]
			.iter()
			.enumerate()
			.find_map(|(offset, s)| bounds.get(s).map(|(first, _)| (k + 1 + offset, *first)));

		let timestamp = match (previous, next) {
			(Some((p, after)), Some((n, before))) => {
				let span = (before - after).num_milliseconds();
				let offset = (span as i128 * (k - p) as i128 / (n - p) as i128) as i64;
				shift(after, offset).unwrap_or(after)
			},
			(Some((p, after)), None) => {
				let base = latest_recorded.map_or(after, |latest| latest.max(after));
				let projected = shift(base, step_offset(step_ms, k - p)).unwrap_or(base);
				// Do not project into the future past the reference time
				projected.min(now.max(base))
			},
			(None, Some((n, before))) => {
				shift(before, -step_offset(step_ms, n - k)).unwrap_or(before)
			},
			(None, None) => shift(now, -step_offset(step_ms, last_position - k)).unwrap_or(now),
		};

		synthetic.push(synthetic_event(*stage, timestamp, options));
	}

	synthetic
}

/// `steps` multiples of `step_ms`, saturating.
fn step_offset(step_ms: i64, steps: usize) -> i64 {
	step_ms.saturating_mul(i64::try_from(steps).unwrap_or(i64::MAX))
}

/// Moves `at` by `offset_ms`, or None when the result leaves chrono's range.
fn shift(at: DateTime<Utc>, offset_ms: i64) -> Option<DateTime<Utc>> {
	let delta = Duration::try_milliseconds(offset_ms)?;
	at.checked_add_signed(delta)
}

fn enrich_recorded(
	raw: &RecordedEvent,
	position: usize,
	now: DateTime<Utc>,
	options: &TimelineOptions,
) -> TimelineEvent {
	let stage = raw
		.status
		.as_deref()
		.map(map_status_to_stage)
		.unwrap_or(BusinessStage::Draft);
	let info = stage_info(stage);

	let actor = raw
		.actor
		.as_deref()
		.map(str::trim)
		.filter(|a| !a.is_empty())
		.map(str::to_string);
	let actor_type = raw
		.actor_type
		.as_deref()
		.and_then(ActorType::parse_lossy)
		.unwrap_or(if actor.is_some() {
			info.default_actor
		} else {
			ActorType::System
		});

	let timestamp = raw
		.timestamp
		.as_ref()
		.and_then(parse_timestamp)
		.unwrap_or(now);

	let description = raw
		.description
		.as_deref()
		.map(str::trim)
		.filter(|d| !d.is_empty())
		.unwrap_or(info.description)
		.to_string();

	let status = raw
		.status
		.clone()
		.filter(|s| try_map_status(s).is_some())
		.unwrap_or_else(|| stage.as_str().to_string());

	TimelineEvent {
		id: raw
			.id
			.clone()
			.unwrap_or_else(|| format!("recorded-{}", position)),
		stage,
		status,
		timestamp,
		actor: actor.unwrap_or_else(|| SYSTEM_ACTOR.to_string()),
		actor_type,
		category: info.category,
		title: stage.label().to_string(),
		description,
		indonesian_title: options
			.use_indonesian
			.then(|| stage.indonesian_label().to_string()),
		indonesian_description: options
			.use_indonesian
			.then(|| info.indonesian_description.to_string()),
		metadata: raw
			.metadata
			.clone()
			.unwrap_or_else(|| Value::Object(Map::new())),
		is_business_critical: is_business_critical(stage),
		requires_action: false,
		next_actions: Vec::new(),
		synthetic: false,
		optimistic: false,
	}
}

fn synthetic_event(
	stage: BusinessStage,
	timestamp: DateTime<Utc>,
	options: &TimelineOptions,
) -> TimelineEvent {
	let info = stage_info(stage);
	TimelineEvent {
		id: format!("synthetic-{}", stage.as_str()),
		stage,
		status: stage.as_str().to_string(),
		timestamp,
		actor: SYSTEM_ACTOR.to_string(),
		actor_type: ActorType::System,
		category: info.category,
		title: stage.label().to_string(),
		description: info.description.to_string(),
		indonesian_title: options
			.use_indonesian
			.then(|| stage.indonesian_label().to_string()),
		indonesian_description: options
			.use_indonesian
			.then(|| info.indonesian_description.to_string()),
		metadata: Value::Object(Map::new()),
		is_business_critical: is_business_critical(stage),
		requires_action: false,
		next_actions: Vec::new(),
		synthetic: true,
		optimistic: false,
	}
}

/// Populates actions on the most recent event of the current stage only.
///
/// Events of superseded stages never require action. Terminal stages get
/// their closing actions without requiring any.
fn assign_actions(events: &mut [TimelineEvent], current: BusinessStage) {
	let latest = events
		.iter_mut()
		.filter(|event| event.stage == current)
		.max_by(|a, b| {
			// Prefer a recorded event over a synthetic one at the same instant
			a.timestamp
				.cmp(&b.timestamp)
				.then(a.synthetic.cmp(&b.synthetic).reverse())
		});

	if let Some(event) = latest {
		event.next_actions = stage_info(current)
			.next_actions
			.iter()
			.map(|action| action.to_string())
			.collect();
		event.requires_action = !current.is_terminal();
	}
}

/// Timeline order: newest first, later stages first on equal timestamps.
pub(crate) fn newest_first(a: &TimelineEvent, b: &TimelineEvent) -> Ordering {
	b.timestamp
		.cmp(&a.timestamp)
		.then_with(|| stage_rank(b.stage).cmp(&stage_rank(a.stage)))
}

/// Ordering used to break timestamp ties: later stages sort as newer.
fn stage_rank(stage: BusinessStage) -> usize {
	stage.index().unwrap_or(STAGE_SEQUENCE.len())
}

/// Parses an RFC 3339 string, a `YYYY-MM-DD HH:MM:SS` string, or unix
/// seconds (milliseconds when the value is too large to be seconds).
pub(crate) fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
	match value {
		Value::String(s) => {
			let s = s.trim();
			DateTime::parse_from_rfc3339(s)
				.map(|dt| dt.with_timezone(&Utc))
				.ok()
				.or_else(|| {
					NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
						.ok()
						.map(|naive| naive.and_utc())
				})
		},
		Value::Number(n) => {
			let raw = n.as_i64()?;
			if raw.unsigned_abs() >= 100_000_000_000 {
				DateTime::from_timestamp_millis(raw)
			} else {
				DateTime::from_timestamp(raw, 0)
			}
		},
		_ => None,
	}
}
