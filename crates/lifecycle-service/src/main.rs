//! Command-line entry point for the order lifecycle engine.
//!
//! Exposes stage mapping, progress, transition checks, timeline
//! reconstruction and optimistic stage advances over an order stored in a
//! JSON file. Results are printed as pretty JSON on stdout; logs go to stderr.

use clap::{Args as ClapArgs, Parser, Subcommand};
use lifecycle_config::builders::config::ConfigBuilder;
use lifecycle_config::Config;
use lifecycle_core::{
	allowed_transitions, calculate_progress, check_transition, get_timeline_stats,
	map_status_to_stage, EngineBuilder, LifecycleEngine, TimelineOptions,
};
use lifecycle_types::BusinessStage;
use serde::Serialize;
use serde_json::json;
use std::path::{Path, PathBuf};
use std::sync::Arc;

mod order_file;

use order_file::FileOrderStore;

/// Command-line arguments for the lifecycle tool.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
	/// Path to configuration file. Built-in defaults are used when omitted.
	#[arg(short, long)]
	config: Option<PathBuf>,

	/// Log level (trace, debug, info, warn, error)
	#[arg(short, long, default_value = "warn")]
	log_level: String,

	#[command(subcommand)]
	command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
	/// Show the stage and progress of a raw status
	Progress {
		status: String,
	},
	/// Check whether an order may move between two statuses
	Transition {
		from: String,
		to: String,
	},
	/// Reconstruct the timeline of an order file
	Timeline(TimelineArgs),
	/// Advance an order file to another stage through an optimistic update
	Advance {
		/// JSON file holding the order
		file: PathBuf,
		/// Target status
		to: String,
		/// Refuse transitions the business flow does not allow
		#[arg(long)]
		enforce: bool,
	},
}

#[derive(ClapArgs, Debug)]
struct TimelineArgs {
	/// JSON file holding the order
	file: PathBuf,
	/// Maximum number of events to print
	#[arg(long)]
	max_events: Option<usize>,
	/// Hide recorded events performed by the system
	#[arg(long)]
	no_system: bool,
	/// Omit Indonesian titles and descriptions
	#[arg(long)]
	english: bool,
	/// Print aggregate statistics instead of events
	#[arg(long)]
	stats: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	let args = Args::parse();

	use tracing_subscriber::{fmt, EnvFilter};

	let env_filter =
		EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
	fmt()
		.with_env_filter(env_filter)
		.with_writer(std::io::stderr)
		.with_target(true)
		.init();

	let config = match &args.config {
		Some(path) => Config::from_file(path).await?,
		None => ConfigBuilder::new().engine_id("lifecycle-cli").build(),
	};
	tracing::debug!("Loaded configuration [{}]", config.engine.id);

	match args.command {
		Command::Progress { status } => print_json(&calculate_progress(&status))?,
		Command::Transition { from, to } => {
			let from = map_status_to_stage(&from);
			let check = check_transition(from, map_status_to_stage(&to));
			print_json(&json!({
				"check": check,
				"allowed": allowed_transitions(from),
			}))?;
		},
		Command::Timeline(timeline) => {
			let options = timeline_options(&config, &timeline);
			let engine = build_engine(config, &timeline.file)?;
			let entity_id = load(&engine, &timeline.file).await?;

			let events = engine.timeline(&entity_id, &options)?;
			if timeline.stats {
				print_json(&get_timeline_stats(&events))?;
			} else {
				print_json(&events)?;
			}
		},
		Command::Advance { file, to, enforce } => {
			let stage = parse_target(&to)?;
			let engine = build_engine(config, &file)?;
			let entity_id = load(&engine, &file).await?;

			let order = engine.advance_stage(&entity_id, stage, enforce).await?;
			print_json(&json!({
				"order": order,
				"progress": engine.progress(&entity_id)?,
			}))?;
		},
	}

	Ok(())
}

fn build_engine(
	config: Config,
	file: &Path,
) -> Result<LifecycleEngine, Box<dyn std::error::Error>> {
	let store = Arc::new(FileOrderStore::new(
		file,
		config.engine.id.clone(),
		&config.optimistic.status_field,
	));
	Ok(EngineBuilder::new(config)
		.with_order_source(store.clone())
		.build(store)?)
}

/// Loads the order file into the engine's cache, returning its identity.
async fn load(engine: &LifecycleEngine, file: &Path) -> Result<String, Box<dyn std::error::Error>> {
	let fallback = file
		.file_stem()
		.map(|stem| stem.to_string_lossy().into_owned())
		.unwrap_or_else(|| "order".to_string());
	let order = engine.load_order(&fallback).await?;

	let identity = match order.get(engine.cache().identity_field()) {
		Some(serde_json::Value::String(id)) => id.clone(),
		Some(serde_json::Value::Number(id)) => id.to_string(),
		_ => return Ok(fallback),
	};
	if identity != fallback {
		engine.cache().evict(&fallback);
		engine.cache().put_entity(&identity, order);
	}
	Ok(identity)
}

fn timeline_options(config: &Config, args: &TimelineArgs) -> TimelineOptions {
	let mut options = TimelineOptions::from(&config.timeline);
	if args.max_events.is_some() {
		options.max_events = args.max_events;
	}
	if args.no_system {
		options.include_system_events = false;
	}
	if args.english {
		options.use_indonesian = false;
	}
	options
}

/// Target stages must be named exactly; unknown statuses are not silently mapped to draft.
fn parse_target(status: &str) -> Result<BusinessStage, Box<dyn std::error::Error>> {
	lifecycle_core::try_map_status(status)
		.ok_or_else(|| format!("unknown target status '{}'", status).into())
}

fn print_json<T: Serialize>(value: &T) -> Result<(), serde_json::Error> {
	println!("{}", serde_json::to_string_pretty(value)?);
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use tempfile::tempdir;

	#[test]
	fn test_parse_timeline_flags() {
		let args = Args::parse_from([
			"lifecycle",
			"timeline",
			"order.json",
			"--max-events",
			"5",
			"--no-system",
			"--english",
			"--stats",
		]);
		let Command::Timeline(timeline) = args.command else {
			panic!("expected timeline command");
		};
		assert_eq!(timeline.max_events, Some(5));
		assert!(timeline.no_system && timeline.english && timeline.stats);

		let options = timeline_options(&ConfigBuilder::new().build(), &timeline);
		assert_eq!(options.max_events, Some(5));
		assert!(!options.include_system_events);
		assert!(!options.use_indonesian);
	}

	#[test]
	fn test_parse_target() {
		assert_eq!(parse_target("In Production").unwrap(), BusinessStage::InProduction);
		assert!(parse_target("teleported").is_err());
	}

	#[tokio::test]
	async fn test_advance_order_file() {
		let dir = tempdir().unwrap();
		let path = dir.path().join("draft-order.json");
		std::fs::write(&path, r#"{"id": "order-7", "status": "pending", "history": []}"#).unwrap();

		let engine = build_engine(ConfigBuilder::new().build(), &path).unwrap();
		let entity_id = load(&engine, &path).await.unwrap();
		assert_eq!(entity_id, "order-7");
		assert!(engine.cache().entity("draft-order").is_none());

		let order = engine
			.advance_stage(&entity_id, BusinessStage::VendorSourcing, true)
			.await
			.unwrap();
		assert_eq!(order["status"], "vendor_sourcing");
		assert_eq!(engine.cache().entity("order-7").unwrap(), order);

		let timeline = engine
			.timeline(&entity_id, &TimelineOptions::default())
			.unwrap();
		assert_eq!(timeline[0].stage, BusinessStage::VendorSourcing);
		assert!(!timeline[0].synthetic);
	}
}
