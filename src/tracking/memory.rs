use crate::error::{Result, SentimentError};
use crate::tracking::tracker::{
    ExperimentTracker, Metrics, Params, Tags, TrackerEvent, TrackerRecord,
};
use parking_lot::Mutex;
use std::path::Path;
use std::sync::Arc;

#[derive(Debug, Default)]
struct MemoryState {
    run_id: Option<String>,
    records: Vec<TrackerRecord>,
}

/// Tracker that keeps events in memory.
///
/// Clones share one buffer, so a test can keep a handle while the model
/// manager owns another.
#[derive(Debug, Clone, Default)]
pub struct InMemoryTracker {
    state: Arc<Mutex<MemoryState>>,
}

impl InMemoryTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every recorded event
    pub fn events(&self) -> Vec<TrackerEvent> {
        self.state
            .lock()
            .records
            .iter()
            .map(|r| r.event.clone())
            .collect()
    }

    pub fn records(&self) -> Vec<TrackerRecord> {
        self.state.lock().records.clone()
    }

    pub fn is_running(&self) -> bool {
        self.state.lock().run_id.is_some()
    }

    /// All metric events in order, with their steps
    pub fn metrics(&self) -> Vec<(Option<usize>, Metrics)> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                TrackerEvent::Metrics { step, metrics } => Some((step, metrics)),
                _ => None,
            })
            .collect()
    }

    fn record(&self, event: TrackerEvent) -> Result<()> {
        let mut state = self.state.lock();
        if state.run_id.is_none() {
            return Err(SentimentError::tracking("memory", "No active run"));
        }
        state.records.push(TrackerRecord::now(event));
        Ok(())
    }
}

impl ExperimentTracker for InMemoryTracker {
    fn name(&self) -> &str {
        "memory"
    }

    fn start_run(&mut self, project: &str, run_name: &str, tags: &Tags) -> Result<()> {
        let run_id = uuid::Uuid::new_v4().to_string();
        let mut state = self.state.lock();
        state.run_id = Some(run_id.clone());
        state.records.push(TrackerRecord::now(TrackerEvent::RunStarted {
            project: project.to_string(),
            run_name: run_name.to_string(),
            run_id,
            tags: tags.clone(),
        }));
        Ok(())
    }

    fn log_metrics(&mut self, metrics: &Metrics, step: Option<usize>) -> Result<()> {
        self.record(TrackerEvent::Metrics {
            step,
            metrics: metrics.clone(),
        })
    }

    fn log_params(&mut self, params: &Params) -> Result<()> {
        self.record(TrackerEvent::Params {
            params: params.clone(),
        })
    }

    fn log_model(&mut self, path: &Path, name: &str) -> Result<()> {
        self.record(TrackerEvent::Model {
            name: name.to_string(),
            path: path.to_path_buf(),
        })
    }

    fn log_artifact(&mut self, path: &Path, name: Option<&str>) -> Result<()> {
        let name = name
            .map(str::to_string)
            .or_else(|| path.file_name().map(|f| f.to_string_lossy().into_owned()))
            .unwrap_or_default();
        self.record(TrackerEvent::Artifact {
            name,
            path: path.to_path_buf(),
        })
    }

    fn set_tags(&mut self, tags: &Tags) -> Result<()> {
        self.record(TrackerEvent::Tags { tags: tags.clone() })
    }

    fn finish_run(&mut self) -> Result<()> {
        let mut state = self.state.lock();
        if let Some(run_id) = state.run_id.take() {
            state
                .records
                .push(TrackerRecord::now(TrackerEvent::RunFinished { run_id }));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_calls_before_start_fail() {
        let mut tracker = InMemoryTracker::new();
        let err = tracker.log_params(&Params::new()).unwrap_err();
        assert!(matches!(err, SentimentError::Tracking { .. }));
    }

    #[test]
    fn test_clones_share_events() {
        let handle = InMemoryTracker::new();
        let mut tracker = handle.clone();

        tracker.start_run("proj", "run", &Tags::new()).unwrap();
        assert!(handle.is_running());
        tracker
            .log_metrics(&[("loss".to_string(), 0.5)].into_iter().collect(), Some(1))
            .unwrap();
        tracker.finish_run().unwrap();

        let events = handle.events();
        assert_eq!(events.len(), 3);
        assert!(matches!(events[0], TrackerEvent::RunStarted { .. }));
        assert!(matches!(events[2], TrackerEvent::RunFinished { .. }));
        assert_eq!(handle.metrics()[0].0, Some(1));
        assert!(!handle.is_running());
    }

    #[test]
    fn test_finish_without_run_is_noop() {
        let mut tracker = InMemoryTracker::new();
        tracker.finish_run().unwrap();
        assert!(tracker.events().is_empty());
    }
}
