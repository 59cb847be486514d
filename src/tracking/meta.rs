use crate::error::Result;
use crate::tracking::tracker::{ExperimentTracker, Metrics, Params, Tags};
use std::path::Path;
use tracing::{error, warn};

/// Fans every call out to a set of trackers.
///
/// A tracker whose `start_run` fails sits out the run. Failures of any other
/// call are logged and swallowed so one broken backend never stops training.
#[derive(Default)]
pub struct MetaTracker {
    trackers: Vec<Box<dyn ExperimentTracker>>,
    active: Vec<usize>,
}

impl MetaTracker {
    pub fn new(trackers: Vec<Box<dyn ExperimentTracker>>) -> Self {
        Self {
            trackers,
            active: Vec::new(),
        }
    }

    pub fn add_tracker(&mut self, tracker: Box<dyn ExperimentTracker>) {
        self.trackers.push(tracker);
    }

    pub fn len(&self) -> usize {
        self.trackers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trackers.is_empty()
    }

    /// Names of the trackers taking part in the current run
    pub fn active_trackers(&self) -> Vec<&str> {
        self.active
            .iter()
            .filter_map(|&i| self.trackers.get(i))
            .map(|t| t.name())
            .collect()
    }

    fn for_each_active<F>(&mut self, operation: &str, mut call: F)
    where
        F: FnMut(&mut dyn ExperimentTracker) -> Result<()>,
    {
        for &i in &self.active {
            if let Some(tracker) = self.trackers.get_mut(i) {
                if let Err(e) = call(tracker.as_mut()) {
                    error!(
                        tracker = tracker.name(),
                        operation,
                        error = %e,
                        "Experiment tracker call failed"
                    );
                }
            }
        }
    }
}

impl ExperimentTracker for MetaTracker {
    fn name(&self) -> &str {
        "meta"
    }

    fn start_run(&mut self, project: &str, run_name: &str, tags: &Tags) -> Result<()> {
        self.active.clear();
        for (i, tracker) in self.trackers.iter_mut().enumerate() {
            match tracker.start_run(project, run_name, tags) {
                Ok(()) => self.active.push(i),
                Err(e) => {
                    warn!(
                        tracker = tracker.name(),
                        error = %e,
                        "Failed to start run, tracker disabled for this run"
                    );
                }
            }
        }
        Ok(())
    }

    fn log_metrics(&mut self, metrics: &Metrics, step: Option<usize>) -> Result<()> {
        self.for_each_active("log_metrics", |t| t.log_metrics(metrics, step));
        Ok(())
    }

    fn log_params(&mut self, params: &Params) -> Result<()> {
        self.for_each_active("log_params", |t| t.log_params(params));
        Ok(())
    }

    fn log_model(&mut self, path: &Path, name: &str) -> Result<()> {
        self.for_each_active("log_model", |t| t.log_model(path, name));
        Ok(())
    }

    fn log_artifact(&mut self, path: &Path, name: Option<&str>) -> Result<()> {
        self.for_each_active("log_artifact", |t| t.log_artifact(path, name));
        Ok(())
    }

    fn set_tags(&mut self, tags: &Tags) -> Result<()> {
        self.for_each_active("set_tags", |t| t.set_tags(tags));
        Ok(())
    }

    fn finish_run(&mut self) -> Result<()> {
        self.for_each_active("finish_run", |t| t.finish_run());
        self.active.clear();
        Ok(())
    }
}
