//! Configuration module for the order lifecycle engine.
//!
//! This module provides structures and utilities for managing engine configuration.
//! It supports loading configuration from TOML files, resolving `${VAR}` and
//! `${VAR:-default}` environment references before parsing, and validation of the
//! resulting values.

pub mod builders;

pub use builders::config::ConfigBuilder;

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

/// Errors that can occur during configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
	/// Error that occurs during file I/O operations.
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
	/// Error that occurs when parsing TOML configuration.
	#[error("Configuration error: {0}")]
	Parse(String),
	/// Error that occurs when configuration validation fails.
	#[error("Validation error: {0}")]
	Validation(String),
}

impl From<toml::de::Error> for ConfigError {
	fn from(err: toml::de::Error) -> Self {
		// Keep only the message, not the echoed input
		ConfigError::Parse(err.message().to_string())
	}
}

/// Main configuration structure for the lifecycle engine.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
	/// Identity of this engine instance.
	pub engine: EngineConfig,
	/// Configuration for the shared read cache.
	pub cache: CacheConfig,
	/// Field names and feedback behavior of optimistic updates.
	#[serde(default)]
	pub optimistic: OptimisticConfig,
	/// Defaults applied when reconstructing timelines.
	#[serde(default)]
	pub timeline: TimelineConfig,
}

/// Configuration specific to the engine instance.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EngineConfig {
	/// Unique identifier for this engine instance, used in logs.
	pub id: String,
}

/// Configuration for the shared read cache.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CacheConfig {
	/// Which implementation to use as primary.
	pub primary: String,
	/// Map of cache implementation names to their configurations.
	#[serde(default)]
	pub implementations: HashMap<String, toml::Value>,
	/// Field holding an entity's identity inside cached collection records.
	#[serde(default = "default_identity_field")]
	pub identity_field: String,
}

/// Field names used when writing speculative state into cached entities.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OptimisticConfig {
	/// Marker flag set on speculative representations.
	#[serde(default = "default_marker_field")]
	pub marker_field: String,
	/// Field carrying the raw order status.
	#[serde(default = "default_status_field")]
	pub status_field: String,
	/// Derived field receiving the canonical stage of a speculative stage advance.
	#[serde(default = "default_stage_field")]
	pub stage_field: String,
	/// Derived field receiving the progress percentage of a speculative stage advance.
	#[serde(default = "default_progress_field")]
	pub progress_field: String,
	/// Whether staging surfaces a progress indicator on the feedback sink.
	#[serde(default = "default_true")]
	pub show_progress: bool,
}

impl Default for OptimisticConfig {
	fn default() -> Self {
		Self {
			marker_field: default_marker_field(),
			status_field: default_status_field(),
			stage_field: default_stage_field(),
			progress_field: default_progress_field(),
			show_progress: true,
		}
	}
}

/// Defaults for timeline reconstruction.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TimelineConfig {
	/// Maximum number of events returned, unlimited when unset.
	#[serde(default)]
	pub max_events: Option<usize>,
	/// Whether events performed by the system actor are shown.
	#[serde(default = "default_true")]
	pub include_system_events: bool,
	/// Whether Indonesian titles and descriptions are populated.
	#[serde(default = "default_true")]
	pub use_indonesian: bool,
	/// Spacing of synthetic events that cannot be placed between two recorded ones.
	#[serde(default = "default_synthetic_step_minutes")]
	pub synthetic_step_minutes: u64,
}

impl Default for TimelineConfig {
	fn default() -> Self {
		Self {
			max_events: None,
			include_system_events: true,
			use_indonesian: true,
			synthetic_step_minutes: default_synthetic_step_minutes(),
		}
	}
}

fn default_identity_field() -> String {
	"id".to_string()
}

fn default_marker_field() -> String {
	"_optimistic".to_string()
}

fn default_status_field() -> String {
	"status".to_string()
}

fn default_stage_field() -> String {
	"business_stage".to_string()
}

fn default_progress_field() -> String {
	"progress_percentage".to_string()
}

fn default_true() -> bool {
	true
}

/// Returns the default spacing of extrapolated synthetic events.
///
/// One hour keeps backfilled stages visually distinct without implying
/// a precise time.
/// Upper bound for `timeline.synthetic_step_minutes`, one year.
pub const MAX_SYNTHETIC_STEP_MINUTES: u64 = 525_600;

fn default_synthetic_step_minutes() -> u64 {
	60
}

/// Resolves environment variables in a string.
///
/// Replaces ${VAR_NAME} with the value of the environment variable VAR_NAME.
/// Supports default values with ${VAR_NAME:-default_value}.
///
/// Input strings are limited to 1MB to bound regex work.
pub(crate) fn resolve_env_vars(input: &str) -> Result<String, ConfigError> {
	const MAX_INPUT_SIZE: usize = 1024 * 1024;
	if input.len() > MAX_INPUT_SIZE {
		return Err(ConfigError::Validation(format!(
			"Configuration file too large: {} bytes (max: {} bytes)",
			input.len(),
			MAX_INPUT_SIZE
		)));
	}

	let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]{0,127})(?::-([^}]{0,256}))?\}")
		.map_err(|e| ConfigError::Parse(format!("Regex error: {}", e)))?;

	let mut result = input.to_string();
	let mut replacements = Vec::new();

	for cap in re.captures_iter(input) {
		let (Some(full_match), Some(var_name)) = (cap.get(0), cap.get(1)) else {
			continue;
		};
		let default_value = cap.get(2).map(|m| m.as_str());

		let value = match std::env::var(var_name.as_str()) {
			Ok(v) => v,
			Err(_) => match default_value {
				Some(default) => default.to_string(),
				None => {
					return Err(ConfigError::Validation(format!(
						"Environment variable '{}' not found",
						var_name.as_str()
					)));
				},
			},
		};

		replacements.push((full_match.start(), full_match.end(), value));
	}

	// Apply replacements in reverse order to maintain positions
	for (start, end, value) in replacements.iter().rev() {
		result.replace_range(start..end, value);
	}

	Ok(result)
}

impl Config {
	/// Loads configuration from a TOML file, resolving environment references.
	pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
		let path = path.as_ref();
		let content = tokio::fs::read_to_string(path).await.map_err(|e| {
			ConfigError::Io(std::io::Error::new(
				e.kind(),
				format!("Cannot read {}: {}", path.display(), e),
			))
		})?;
		content.parse()
	}

	/// Validates the configuration to ensure all required fields are properly set.
	///
	/// - Ensures the engine ID is not empty
	/// - Checks the primary cache names a configured implementation
	/// - Rejects empty field names for identity, marker and status
	/// - Rejects zero `max_events` and zero `synthetic_step_minutes`
	fn validate(&self) -> Result<(), ConfigError> {
		if self.engine.id.trim().is_empty() {
			return Err(ConfigError::Validation("Engine ID cannot be empty".into()));
		}

		if self.cache.implementations.is_empty() {
			return Err(ConfigError::Validation(
				"At least one cache implementation must be configured".into(),
			));
		}
		if !self.cache.implementations.contains_key(&self.cache.primary) {
			return Err(ConfigError::Validation(format!(
				"Primary cache '{}' is not a configured implementation",
				self.cache.primary
			)));
		}

		let required_fields = [
			("cache.identity_field", &self.cache.identity_field),
			("optimistic.marker_field", &self.optimistic.marker_field),
			("optimistic.status_field", &self.optimistic.status_field),
			("optimistic.stage_field", &self.optimistic.stage_field),
			("optimistic.progress_field", &self.optimistic.progress_field),
		];
		for (name, value) in required_fields {
			if value.trim().is_empty() {
				return Err(ConfigError::Validation(format!("{} cannot be empty", name)));
			}
		}

		if self.timeline.max_events == Some(0) {
			return Err(ConfigError::Validation(
				"timeline.max_events must be greater than 0".into(),
			));
		}
		if self.timeline.synthetic_step_minutes == 0 {
			return Err(ConfigError::Validation(
				"timeline.synthetic_step_minutes must be greater than 0".into(),
			));
		}
		if self.timeline.synthetic_step_minutes > MAX_SYNTHETIC_STEP_MINUTES {
			return Err(ConfigError::Validation(format!(
				"timeline.synthetic_step_minutes must be at most {}",
				MAX_SYNTHETIC_STEP_MINUTES
			)));
		}

		Ok(())
	}
}

/// Parses configuration from a TOML string.
///
/// Environment variables are resolved and the configuration is validated
/// after parsing.
impl FromStr for Config {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let resolved = resolve_env_vars(s)?;
		let config: Config = toml::from_str(&resolved)?;
		config.validate()?;
		Ok(config)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	const MINIMAL: &str = r#"
[engine]
id = "orders-ui"

[cache]
primary = "memory"
[cache.implementations.memory]
"#;

	#[test]
	fn test_minimal_config_uses_defaults() {
		let config: Config = MINIMAL.parse().unwrap();
		assert_eq!(config.engine.id, "orders-ui");
		assert_eq!(config.cache.identity_field, "id");
		assert_eq!(config.optimistic.marker_field, "_optimistic");
		assert_eq!(config.optimistic.status_field, "status");
		assert!(config.optimistic.show_progress);
		assert_eq!(config.timeline.max_events, None);
		assert!(config.timeline.include_system_events);
		assert!(config.timeline.use_indonesian);
		assert_eq!(config.timeline.synthetic_step_minutes, 60);
	}

	#[test]
	fn test_env_var_resolution() {
		std::env::set_var("LIFECYCLE_TEST_HOST", "localhost");
		std::env::set_var("LIFECYCLE_TEST_PORT", "5432");

		let input = "host = \"${LIFECYCLE_TEST_HOST}:${LIFECYCLE_TEST_PORT}\"";
		let result = resolve_env_vars(input).unwrap();
		assert_eq!(result, "host = \"localhost:5432\"");

		std::env::remove_var("LIFECYCLE_TEST_HOST");
		std::env::remove_var("LIFECYCLE_TEST_PORT");
	}

	#[test]
	fn test_env_var_with_default() {
		let input = "value = \"${LIFECYCLE_MISSING_VAR:-default_value}\"";
		let result = resolve_env_vars(input).unwrap();
		assert_eq!(result, "value = \"default_value\"");
	}

	#[test]
	fn test_missing_env_var_error() {
		let input = "value = \"${LIFECYCLE_MISSING_VAR}\"";
		let result = resolve_env_vars(input);
		assert!(result.is_err());
		assert!(result
			.unwrap_err()
			.to_string()
			.contains("LIFECYCLE_MISSING_VAR"));
	}

	#[test]
	fn test_config_with_env_vars() {
		std::env::set_var("LIFECYCLE_TEST_ENGINE_ID", "tenant-42");

		let config_str = r#"
[engine]
id = "${LIFECYCLE_TEST_ENGINE_ID}"

[cache]
primary = "memory"
identity_field = "${LIFECYCLE_TEST_IDENTITY:-order_id}"
[cache.implementations.memory]

[timeline]
max_events = 20
use_indonesian = false
"#;

		let config: Config = config_str.parse().unwrap();
		assert_eq!(config.engine.id, "tenant-42");
		assert_eq!(config.cache.identity_field, "order_id");
		assert_eq!(config.timeline.max_events, Some(20));
		assert!(!config.timeline.use_indonesian);

		std::env::remove_var("LIFECYCLE_TEST_ENGINE_ID");
	}

	#[test]
	fn test_unknown_primary_cache_rejected() {
		let config_str = r#"
[engine]
id = "orders-ui"

[cache]
primary = "redis"
[cache.implementations.memory]
"#;
		let err = config_str.parse::<Config>().unwrap_err();
		assert!(err.to_string().contains("redis"));
	}

	#[test]
	fn test_zero_max_events_rejected() {
		let config_str = format!("{}\n[timeline]\nmax_events = 0\n", MINIMAL);
		let err = config_str.parse::<Config>().unwrap_err();
		assert!(matches!(err, ConfigError::Validation(_)));
	}

	#[test]
	fn test_synthetic_step_bounds() {
		let too_large = format!(
			"{}\n[timeline]\nsynthetic_step_minutes = {}\n",
			MINIMAL,
			MAX_SYNTHETIC_STEP_MINUTES + 1
		);
		let err = too_large.parse::<Config>().unwrap_err();
		assert!(matches!(err, ConfigError::Validation(_)));

		let at_limit = format!(
			"{}\n[timeline]\nsynthetic_step_minutes = {}\n",
			MINIMAL, MAX_SYNTHETIC_STEP_MINUTES
		);
		let config = at_limit.parse::<Config>().unwrap();
		assert_eq!(config.timeline.synthetic_step_minutes, MAX_SYNTHETIC_STEP_MINUTES);
	}

	#[test]
	fn test_empty_engine_id_rejected() {
		let config_str = MINIMAL.replace("orders-ui", " ");
		assert!(config_str.parse::<Config>().is_err());
	}

	#[tokio::test]
	async fn test_from_file() {
		let temp_dir = tempfile::TempDir::new().unwrap();
		let path = temp_dir.path().join("lifecycle.toml");
		std::fs::write(&path, MINIMAL).unwrap();

		let config = Config::from_file(&path).await.unwrap();
		assert_eq!(config.cache.primary, "memory");
	}

	#[tokio::test]
	async fn test_from_missing_file() {
		let result = Config::from_file("/nonexistent/lifecycle.toml").await;
		assert!(matches!(result, Err(ConfigError::Io(_))));
	}
}
