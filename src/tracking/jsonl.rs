use crate::error::{Result, SentimentError};
use crate::tracking::tracker::{
    ExperimentTracker, Metrics, Params, Tags, TrackerEvent, TrackerRecord,
};
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

struct ActiveRun {
    run_id: String,
    log_path: PathBuf,
    artifacts_dir: PathBuf,
    writer: BufWriter<File>,
}

/// Writes one JSON record per line to `<dir>/<project>/<run_id>.jsonl` and
/// copies logged files into `<dir>/<project>/<run_id>/artifacts/`.
pub struct JsonlTracker {
    dir: PathBuf,
    run: Option<ActiveRun>,
}

impl JsonlTracker {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            run: None,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn run_id(&self) -> Option<&str> {
        self.run.as_ref().map(|r| r.run_id.as_str())
    }

    /// Event log of the active run
    pub fn log_path(&self) -> Option<&Path> {
        self.run.as_ref().map(|r| r.log_path.as_path())
    }

    fn active(&mut self) -> Result<&mut ActiveRun> {
        self.run
            .as_mut()
            .ok_or_else(|| SentimentError::tracking("jsonl", "No active run"))
    }

    fn write(&mut self, event: TrackerEvent) -> Result<()> {
        let run = self.active()?;
        write_record(&mut run.writer, &TrackerRecord::now(event))
    }

    fn copy_into_artifacts(&mut self, path: &Path, subdir: Option<&str>) -> Result<PathBuf> {
        let file_name = path.file_name().ok_or_else(|| {
            SentimentError::tracking("jsonl", format!("{} has no file name", path.display()))
        })?;
        if !path.is_file() {
            return Err(SentimentError::tracking(
                "jsonl",
                format!("{} is not a file", path.display()),
            ));
        }

        let run = self.active()?;
        let target_dir = match subdir {
            Some(sub) => run.artifacts_dir.join(sub),
            None => run.artifacts_dir.clone(),
        };
        fs::create_dir_all(&target_dir)?;

        let target = target_dir.join(file_name);
        fs::copy(path, &target)?;
        debug!(from = %path.display(), to = %target.display(), "Copied artifact");
        Ok(target)
    }
}

fn write_record(writer: &mut BufWriter<File>, record: &TrackerRecord) -> Result<()> {
    serde_json::to_writer(&mut *writer, record)?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}

impl ExperimentTracker for JsonlTracker {
    fn name(&self) -> &str {
        "jsonl"
    }

    fn start_run(&mut self, project: &str, run_name: &str, tags: &Tags) -> Result<()> {
        if self.run.is_some() {
            self.finish_run()?;
        }

        let run_id = uuid::Uuid::new_v4().to_string();
        let project_dir = self.dir.join(project);
        fs::create_dir_all(&project_dir)?;

        let log_path = project_dir.join(format!("{}.jsonl", run_id));
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)?;

        let mut run = ActiveRun {
            run_id: run_id.clone(),
            log_path,
            artifacts_dir: project_dir.join(&run_id).join("artifacts"),
            writer: BufWriter::new(file),
        };

        write_record(
            &mut run.writer,
            &TrackerRecord::now(TrackerEvent::RunStarted {
                project: project.to_string(),
                run_name: run_name.to_string(),
                run_id,
                tags: tags.clone(),
            }),
        )?;

        info!(
            run_id = %run.run_id,
            path = %run.log_path.display(),
            "Started tracking run"
        );
        self.run = Some(run);
        Ok(())
    }

    fn log_metrics(&mut self, metrics: &Metrics, step: Option<usize>) -> Result<()> {
        self.write(TrackerEvent::Metrics {
            step,
            metrics: metrics.clone(),
        })
    }

    fn log_params(&mut self, params: &Params) -> Result<()> {
        self.write(TrackerEvent::Params {
            params: params.clone(),
        })
    }

    fn log_model(&mut self, path: &Path, name: &str) -> Result<()> {
        let target = self.copy_into_artifacts(path, Some(name))?;
        self.write(TrackerEvent::Model {
            name: name.to_string(),
            path: target,
        })
    }

    fn log_artifact(&mut self, path: &Path, name: Option<&str>) -> Result<()> {
        let target = self.copy_into_artifacts(path, None)?;
        let name = match name {
            Some(name) => name.to_string(),
            None => target
                .file_name()
                .map(|f| f.to_string_lossy().into_owned())
                .unwrap_or_default(),
        };
        self.write(TrackerEvent::Artifact { name, path: target })
    }

    fn set_tags(&mut self, tags: &Tags) -> Result<()> {
        self.write(TrackerEvent::Tags { tags: tags.clone() })
    }

    fn finish_run(&mut self) -> Result<()> {
        if let Some(mut run) = self.run.take() {
            write_record(
                &mut run.writer,
                &TrackerRecord::now(TrackerEvent::RunFinished {
                    run_id: run.run_id.clone(),
                }),
            )?;
            info!(run_id = %run.run_id, "Finished tracking run");
        }
        Ok(())
    }
}
