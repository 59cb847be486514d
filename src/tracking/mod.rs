//! Experiment tracking
//!
//! Training can report its parameters, per-iteration metrics and the saved
//! model to one or more trackers. Only local backends exist:
//! - `jsonl`: an event log per run, with copied artifacts
//! - `memory`: an in-process buffer, mostly for tests
//!
//! [`MetaTracker`] fans out to several backends and keeps going when one fails.

pub mod jsonl;
pub mod memory;
pub mod meta;
pub mod tracker;

pub use jsonl::JsonlTracker;
pub use memory::InMemoryTracker;
pub use meta::MetaTracker;
pub use tracker::{ExperimentTracker, Metrics, Params, Tags, TrackerEvent, TrackerRecord};

use crate::config::TrackingConfig;
use crate::error::Result;
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use strum::{Display, EnumString};
use tracing::{info, warn};

const DEFAULT_RUNS_DIR: &str = "runs";

/// Tracker backend kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum TrackerKind {
    Jsonl,
    Memory,
}

/// One entry of `[[tracking.trackers]]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackerConfig {
    pub kind: TrackerKind,

    /// Output directory for file-based trackers
    #[serde(default)]
    pub dir: Option<PathBuf>,
}

impl TrackerConfig {
    pub fn jsonl(dir: impl Into<PathBuf>) -> Self {
        Self {
            kind: TrackerKind::Jsonl,
            dir: Some(dir.into()),
        }
    }

    pub fn memory() -> Self {
        Self {
            kind: TrackerKind::Memory,
            dir: None,
        }
    }
}

/// Build a single tracker backend
pub fn create_tracker(config: &TrackerConfig) -> Result<Box<dyn ExperimentTracker>> {
    let tracker: Box<dyn ExperimentTracker> = match config.kind {
        TrackerKind::Jsonl => {
            let dir = config
                .dir
                .clone()
                .unwrap_or_else(|| PathBuf::from(DEFAULT_RUNS_DIR));
            Box::new(JsonlTracker::new(dir))
        }
        TrackerKind::Memory => Box::new(InMemoryTracker::new()),
    };
    Ok(tracker)
}

/// Build a [`MetaTracker`] over every configured backend.
///
/// Returns `None` when tracking is disabled or nothing is configured.
pub fn create_meta_tracker(config: &TrackingConfig) -> Result<Option<MetaTracker>> {
    if !config.enabled {
        return Ok(None);
    }
    if config.trackers.is_empty() {
        warn!("Tracking enabled but no trackers configured");
        return Ok(None);
    }

    let mut meta = MetaTracker::default();
    for tracker_config in &config.trackers {
        meta.add_tracker(create_tracker(tracker_config)?);
    }

    info!(trackers = meta.len(), "Experiment tracking enabled");
    Ok(Some(meta))
}

/// `<base>_<YYYYmmdd_HHMMSS>_<6 random lowercase alphanumerics>`
pub fn generate_unique_experiment_name(base: &str) -> String {
    let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(6)
        .map(|b| char::from(b).to_ascii_lowercase())
        .collect();
    format!("{}_{}_{}", base, timestamp, suffix)
}
