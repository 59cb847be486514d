use crate::config::{Config, PathsConfig, TrainingConfig};
use crate::error::{Result, SentimentError};
use crate::ml::dataset::{class_distribution, load_training_data, DatasetSplit};
use crate::ml::metrics::{calculate_metrics, log_loss};
use crate::ml::models::{
    IterationMetrics, ModelMetrics, ModelState, Prediction, Sentiment, TrainingReport,
};
use crate::ml::pipeline::SentimentPipeline;
use crate::tracking::{
    create_meta_tracker, generate_unique_experiment_name, ExperimentTracker, Metrics, Tags,
};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

const MODEL_ARTIFACT_NAME: &str = "sentiment_model";

/// Where the manager reads and writes, as reported by `info`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectInfo {
    pub project_root: PathBuf,
    pub model_directory: PathBuf,
    pub data_directory: PathBuf,
    pub model_path: PathBuf,
    pub data_path: PathBuf,
    pub model_exists: bool,
    pub data_exists: bool,
    pub state: ModelState,
}

/// Trains, persists and serves the sentiment pipeline.
///
/// Not internally synchronised; callers serialise `train` and `predict` on
/// one instance.
pub struct ModelManager {
    paths: PathsConfig,
    training: TrainingConfig,
    project_name: String,
    pipeline: Option<SentimentPipeline>,
    state: ModelState,
    tracker: Option<Box<dyn ExperimentTracker>>,
}

impl ModelManager {
    pub fn new(paths: PathsConfig, training: TrainingConfig) -> Self {
        Self {
            paths,
            training,
            project_name: crate::config::TrackingConfig::default().project_name,
            pipeline: None,
            state: ModelState::Uninitialized,
            tracker: None,
        }
    }

    /// Default layout (`models/`, `data/`) under `project_root`
    pub fn with_project_root(project_root: impl Into<PathBuf>) -> Self {
        Self::new(PathsConfig::with_root(project_root), TrainingConfig::default())
    }

    /// Build from application config, attaching trackers when tracking is enabled
    pub fn from_config(config: &Config) -> Result<Self> {
        let mut manager = Self::new(config.paths.clone(), config.training.clone())
            .with_project_name(config.tracking.project_name.clone());
        if let Some(meta) = create_meta_tracker(&config.tracking)? {
            manager.tracker = Some(Box::new(meta));
        }
        Ok(manager)
    }

    pub fn with_tracker(mut self, tracker: Box<dyn ExperimentTracker>) -> Self {
        self.tracker = Some(tracker);
        self
    }

    pub fn with_project_name(mut self, project_name: impl Into<String>) -> Self {
        self.project_name = project_name.into();
        self
    }

    pub fn state(&self) -> ModelState {
        self.state
    }

    pub fn model_path(&self) -> PathBuf {
        self.paths.model_path()
    }

    pub fn data_path(&self) -> PathBuf {
        self.paths.data_path()
    }

    pub fn training_config(&self) -> &TrainingConfig {
        &self.training
    }

    /// Pipeline in memory, if any
    pub fn pipeline(&self) -> Option<&SentimentPipeline> {
        self.pipeline.as_ref()
    }

    /// Create the model and data directories; a missing data file is only reported
    pub fn validate_setup(&mut self) -> Result<()> {
        info!("Validating project setup...");

        for dir in [
            self.paths.resolved_model_dir(),
            self.paths.resolved_data_dir(),
        ] {
            if dir.exists() {
                debug!("Directory exists: {}", dir.display());
            } else {
                fs::create_dir_all(&dir)?;
                info!("Created directory: {}", dir.display());
            }
        }

        let data_path = self.paths.data_path();
        if data_path.exists() {
            info!("Data file exists: {}", data_path.display());
        } else {
            warn!(
                "Data file does not exist: {}. Create a JSON-lines file with `text` and `label` fields",
                data_path.display()
            );
        }

        if self.state == ModelState::Uninitialized {
            self.state = ModelState::Validated;
        }
        Ok(())
    }

    /// Train with the configured number of incremental passes
    pub fn train_default(&mut self) -> Result<TrainingReport> {
        self.train(self.training.iterations)
    }

    /// Fit the pipeline, run `iterations` incremental passes, evaluate on the
    /// held-out test split and persist the result.
    pub fn train(&mut self, iterations: usize) -> Result<TrainingReport> {
        if self.state == ModelState::Uninitialized {
            self.validate_setup()?;
        }

        info!("Training model...");
        let examples = load_training_data(self.paths.data_path())?;
        let distribution = class_distribution(&examples);
        info!("Class distribution: {:?}", distribution);

        let split = DatasetSplit::new(
            examples,
            self.training.test_size,
            self.training.validation_size,
            self.training.seed,
        )?;
        info!(
            train = split.train.len(),
            validation = split.validation.len(),
            test = split.test.len(),
            "Split training data"
        );

        let train_texts = DatasetSplit::texts(&split.train);
        let train_labels = DatasetSplit::labels(&split.train);

        let mut pipeline = SentimentPipeline::new(&self.training);
        let initial_fit_epochs = pipeline.fit(&train_texts, &train_labels)?;
        info!(
            epochs = initial_fit_epochs,
            features = pipeline.metadata().n_features,
            "Initial fit complete"
        );

        self.start_tracking_run(&pipeline);
        let outcome = self.run_iterations(&mut pipeline, &split, iterations);
        if outcome.is_err() {
            let mut tags = Tags::new();
            tags.insert("status".to_string(), "failed".to_string());
            self.track("set_tags", |t| t.set_tags(&tags));
        }
        self.track("finish_run", |t| t.finish_run());
        let (history, test_metrics, model_path) = outcome?;

        self.pipeline = Some(pipeline);
        self.state = ModelState::Trained;

        Ok(TrainingReport {
            class_distribution: distribution,
            n_train: split.train.len(),
            n_validation: split.validation.len(),
            n_test: split.test.len(),
            initial_fit_epochs,
            history,
            test_metrics,
            model_path,
        })
    }

    /// Incremental passes, test evaluation and persistence inside an open tracking run
    fn run_iterations(
        &mut self,
        pipeline: &mut SentimentPipeline,
        split: &DatasetSplit,
        iterations: usize,
    ) -> Result<(Vec<IterationMetrics>, ModelMetrics, PathBuf)> {
        let train_texts = DatasetSplit::texts(&split.train);
        let train_labels = DatasetSplit::labels(&split.train);
        let val_labels = DatasetSplit::labels(&split.validation);
        let x_train = pipeline.transform(&train_texts)?;
        let x_val = pipeline.transform(&DatasetSplit::texts(&split.validation))?;

        let mut history = Vec::with_capacity(iterations);
        for i in 0..iterations {
            pipeline.partial_fit(&x_train, &train_labels)?;

            let train_proba = pipeline.predict_proba_features(&x_train)?;
            let val_proba = pipeline.predict_proba_features(&x_val)?;
            let train_pred = predictions(&train_proba);
            let val_pred = predictions(&val_proba);

            let iteration = IterationMetrics {
                iteration: i + 1,
                train_samples: train_labels.len(),
                train_loss: log_loss(&train_labels, &train_proba),
                val_loss: log_loss(&val_labels, &val_proba),
                train: calculate_metrics(&train_labels, &train_pred),
                validation: calculate_metrics(&val_labels, &val_pred),
            };

            self.track("log_metrics", |t| {
                t.log_metrics(&iteration.to_tracker_metrics(), Some(i))
            });

            if self.training.log_every > 0 && i % self.training.log_every == 0 {
                info!(
                    "Iteration {}: Train Loss: {:.4}, Val Loss: {:.4}",
                    i, iteration.train_loss, iteration.val_loss
                );
            }
            history.push(iteration);
        }

        let test_metrics = self.evaluate(pipeline, split)?;
        info!(
            "Test accuracy: {:.4}, precision: {:.4}, recall: {:.4}, f1: {:.4}",
            test_metrics.accuracy,
            test_metrics.precision,
            test_metrics.recall,
            test_metrics.f1_score
        );

        {
            let metadata = pipeline.metadata_mut();
            metadata.n_validation_samples = split.validation.len();
            metadata.n_test_samples = split.test.len();
            metadata.test_metrics = Some(test_metrics.clone());
        }

        let model_path = self.paths.model_path();
        pipeline.save(&model_path)?;
        info!("Model saved to {}", model_path.display());

        let final_metrics: Metrics = test_metrics.to_tracker_metrics("test");
        self.track("log_metrics", |t| t.log_metrics(&final_metrics, None));
        self.track("log_model", |t| t.log_model(&model_path, MODEL_ARTIFACT_NAME));

        Ok((history, test_metrics, model_path))
    }

    fn evaluate(&self, pipeline: &SentimentPipeline, split: &DatasetSplit) -> Result<ModelMetrics> {
        if split.test.is_empty() {
            return Ok(ModelMetrics::new());
        }
        let x_test = pipeline.transform(&DatasetSplit::texts(&split.test))?;
        let y_pred = pipeline.predict_features(&x_test)?;
        Ok(calculate_metrics(&DatasetSplit::labels(&split.test), &y_pred))
    }

    fn start_tracking_run(&mut self, pipeline: &SentimentPipeline) {
        let project = self.project_name.clone();
        let run_name = generate_unique_experiment_name("sentiment_training");
        let mut tags = Tags::new();
        tags.insert("model".to_string(), pipeline.metadata().name.clone());
        tags.insert("version".to_string(), pipeline.metadata().version.clone());
        let params = pipeline.metadata().hyperparameters.clone();

        self.track("start_run", |t| t.start_run(&project, &run_name, &tags));
        self.track("log_params", |t| t.log_params(&params));
    }

    /// Forward to the tracker, if any; tracking failures never fail training
    fn track<F>(&mut self, operation: &str, call: F)
    where
        F: FnOnce(&mut dyn ExperimentTracker) -> Result<()>,
    {
        if let Some(tracker) = self.tracker.as_mut() {
            if let Err(e) = call(tracker.as_mut()) {
                warn!(
                    tracker = tracker.name(),
                    operation,
                    error = %e,
                    "Experiment tracking failed"
                );
            }
        }
    }

    /// Label and maximum class posterior for `text`, loading the saved model on first use
    pub fn predict(&mut self, text: &str) -> Result<(Sentiment, f64)> {
        let prediction = self.predict_detailed(text)?;
        Ok((prediction.label, prediction.confidence))
    }

    pub fn predict_detailed(&mut self, text: &str) -> Result<Prediction> {
        if self.pipeline.is_none() {
            self.load_model()?;
        }
        let pipeline = self.pipeline.as_ref().ok_or_else(|| {
            SentimentError::ModelNotFound(self.paths.model_path())
        })?;
        pipeline.predict(text)
    }

    /// Replace the in-memory pipeline with the persisted one
    pub fn load_model(&mut self) -> Result<()> {
        let model_path = self.paths.model_path();
        let pipeline = SentimentPipeline::load(&model_path)?;
        info!("Model loaded from {}", model_path.display());

        self.pipeline = Some(pipeline);
        self.state = ModelState::Loaded;
        Ok(())
    }

    pub fn project_info(&self) -> ProjectInfo {
        let model_path = self.paths.model_path();
        let data_path = self.paths.data_path();
        ProjectInfo {
            project_root: self.paths.project_root.clone(),
            model_directory: self.paths.resolved_model_dir(),
            data_directory: self.paths.resolved_data_dir(),
            model_exists: model_path.exists(),
            data_exists: data_path.exists(),
            model_path,
            data_path,
            state: self.state,
        }
    }

    pub fn project_root(&self) -> &Path {
        &self.paths.project_root
    }
}

fn predictions(probabilities: &[[f64; 2]]) -> Vec<Sentiment> {
    probabilities
        .iter()
        .map(|row| Prediction::from_probabilities(row).label)
        .collect()
}
