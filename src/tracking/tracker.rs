use crate::error::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub type Tags = BTreeMap<String, String>;
pub type Params = BTreeMap<String, String>;
pub type Metrics = BTreeMap<String, f64>;

/// Trait for experiment tracking backends
pub trait ExperimentTracker: Send {
    /// Get tracker name
    fn name(&self) -> &str;

    /// Open a run; every other call except `finish_run` needs one
    fn start_run(&mut self, project: &str, run_name: &str, tags: &Tags) -> Result<()>;

    fn log_metrics(&mut self, metrics: &Metrics, step: Option<usize>) -> Result<()>;

    fn log_params(&mut self, params: &Params) -> Result<()>;

    /// Record a persisted model file under `name`
    fn log_model(&mut self, path: &Path, name: &str) -> Result<()>;

    /// Record an arbitrary file; `name` defaults to the file name
    fn log_artifact(&mut self, path: &Path, name: Option<&str>) -> Result<()>;

    fn set_tags(&mut self, tags: &Tags) -> Result<()>;

    /// Close the current run; a no-op without one
    fn finish_run(&mut self) -> Result<()>;
}

/// Event emitted by the local trackers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TrackerEvent {
    RunStarted {
        project: String,
        run_name: String,
        run_id: String,
        tags: Tags,
    },
    Metrics {
        step: Option<usize>,
        metrics: Metrics,
    },
    Params {
        params: Params,
    },
    Model {
        name: String,
        path: PathBuf,
    },
    Artifact {
        name: String,
        path: PathBuf,
    },
    Tags {
        tags: Tags,
    },
    RunFinished {
        run_id: String,
    },
}

/// [`TrackerEvent`] with the time it was recorded
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackerRecord {
    pub timestamp: DateTime<Utc>,

    #[serde(flatten)]
    pub event: TrackerEvent,
}

impl TrackerRecord {
    pub fn now(event: TrackerEvent) -> Self {
        Self {
            timestamp: Utc::now(),
            event,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_wire_format() {
        let record = TrackerRecord::now(TrackerEvent::Metrics {
            step: Some(3),
            metrics: [("val_accuracy".to_string(), 0.9)].into_iter().collect(),
        });
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["event"], "metrics");
        assert_eq!(json["step"], 3);
        assert_eq!(json["metrics"]["val_accuracy"], 0.9);
        assert!(json["timestamp"].is_string());

        let back: TrackerRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back, record);
    }
}
