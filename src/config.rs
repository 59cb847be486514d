use crate::error::{Result, SentimentError};
use crate::tracking::TrackerConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Directory and file layout
    #[serde(default)]
    pub paths: PathsConfig,

    /// Model fitting hyperparameters
    #[serde(default)]
    pub training: TrainingConfig,

    /// Optional text filters applied before prediction
    #[serde(default)]
    pub preprocessing: PreprocessingConfig,

    /// Experiment tracking
    #[serde(default)]
    pub tracking: TrackingConfig,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl Config {
    /// Load configuration from the embedded defaults, an optional file and the environment
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder()
            // Start with default values
            .add_source(config::File::from_str(
                include_str!("../config/default.toml"),
                config::FileFormat::Toml,
            ));

        // Override with config file if one was given
        if let Some(path) = config_path {
            builder = builder.add_source(config::File::from(path).required(true));
        }

        let config: Config = builder
            // Override with environment variables (TICAT__SECTION__KEY)
            .add_source(
                config::Environment::with_prefix("TICAT")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        self.training.validate()?;
        if self.paths.model_filename.trim().is_empty() {
            return Err(SentimentError::Configuration(
                "paths.model_filename must not be empty".to_string(),
            ));
        }
        if self.paths.data_filename.trim().is_empty() {
            return Err(SentimentError::Configuration(
                "paths.data_filename must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Where the training data and the model artifact live
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Project root; model and data directories default to children of it
    #[serde(default = "default_project_root")]
    pub project_root: PathBuf,

    /// Model directory (defaults to `<project_root>/models`)
    pub model_dir: Option<PathBuf>,

    /// Data directory (defaults to `<project_root>/data`)
    pub data_dir: Option<PathBuf>,

    /// Artifact file name inside the model directory
    #[serde(default = "default_model_filename")]
    pub model_filename: String,

    /// Training data file name inside the data directory
    #[serde(default = "default_data_filename")]
    pub data_filename: String,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self::with_root(default_project_root())
    }
}

impl PathsConfig {
    /// Default layout under the given project root
    pub fn with_root(project_root: impl Into<PathBuf>) -> Self {
        Self {
            project_root: project_root.into(),
            model_dir: None,
            data_dir: None,
            model_filename: default_model_filename(),
            data_filename: default_data_filename(),
        }
    }

    pub fn with_model_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.model_dir = Some(dir.into());
        self
    }

    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = Some(dir.into());
        self
    }

    pub fn resolved_model_dir(&self) -> PathBuf {
        self.model_dir
            .clone()
            .unwrap_or_else(|| self.project_root.join("models"))
    }

    pub fn resolved_data_dir(&self) -> PathBuf {
        self.data_dir
            .clone()
            .unwrap_or_else(|| self.project_root.join("data"))
    }

    pub fn model_path(&self) -> PathBuf {
        self.resolved_model_dir().join(&self.model_filename)
    }

    pub fn data_path(&self) -> PathBuf {
        self.resolved_data_dir().join(&self.data_filename)
    }
}

/// Hyperparameters for the TF-IDF + SGD pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingConfig {
    /// Incremental-fit passes run after the initial fit
    #[serde(default = "default_iterations")]
    pub iterations: usize,

    /// L2 regularisation strength
    #[serde(default = "default_alpha")]
    pub alpha: f64,

    /// Maximum vocabulary size
    #[serde(default = "default_max_features")]
    pub max_features: usize,

    /// Drop English stop words during tokenisation
    #[serde(default = "default_true")]
    pub english_stop_words: bool,

    /// Epoch cap for the initial fit
    #[serde(default = "default_max_iter")]
    pub max_iter: usize,

    /// Loss improvement threshold for early stopping of the initial fit
    #[serde(default = "default_tol")]
    pub tol: f64,

    /// Epochs without improvement before the initial fit stops
    #[serde(default = "default_n_iter_no_change")]
    pub n_iter_no_change: usize,

    /// Fraction held out for the final test split
    #[serde(default = "default_test_size")]
    pub test_size: f64,

    /// Fraction of the remaining data held out for validation
    #[serde(default = "default_validation_size")]
    pub validation_size: f64,

    /// Seed for splitting and shuffling
    #[serde(default = "default_seed")]
    pub seed: u64,

    /// Log progress every N iterations
    #[serde(default = "default_log_every")]
    pub log_every: usize,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            iterations: default_iterations(),
            alpha: default_alpha(),
            max_features: default_max_features(),
            english_stop_words: default_true(),
            max_iter: default_max_iter(),
            tol: default_tol(),
            n_iter_no_change: default_n_iter_no_change(),
            test_size: default_test_size(),
            validation_size: default_validation_size(),
            seed: default_seed(),
            log_every: default_log_every(),
        }
    }
}

impl TrainingConfig {
    pub fn with_iterations(mut self, iterations: usize) -> Self {
        self.iterations = iterations;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if !(self.alpha > 0.0) {
            return Err(SentimentError::Configuration(
                "training.alpha must be greater than 0".to_string(),
            ));
        }
        if self.max_features == 0 {
            return Err(SentimentError::Configuration(
                "training.max_features must be greater than 0".to_string(),
            ));
        }
        if self.max_iter == 0 {
            return Err(SentimentError::Configuration(
                "training.max_iter must be greater than 0".to_string(),
            ));
        }
        for (name, value) in [
            ("test_size", self.test_size),
            ("validation_size", self.validation_size),
        ] {
            if !(value > 0.0 && value < 1.0) {
                return Err(SentimentError::Configuration(format!(
                    "training.{} must be between 0.0 and 1.0 (exclusive)",
                    name
                )));
            }
        }
        if self.log_every == 0 {
            return Err(SentimentError::Configuration(
                "training.log_every must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Optional filters run after text cleaning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreprocessingConfig {
    /// Plain-text file with one greeting or sign-off per line
    pub greetings_file: Option<PathBuf>,

    /// YAML file holding stop word lists
    pub stopwords_file: Option<PathBuf>,

    /// Key of the list to use inside the stop word file
    #[serde(default = "default_stopwords_key")]
    pub stopwords_key: String,
}

impl Default for PreprocessingConfig {
    fn default() -> Self {
        Self {
            greetings_file: None,
            stopwords_file: None,
            stopwords_key: default_stopwords_key(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackingConfig {
    /// Enable experiment tracking during training
    #[serde(default)]
    pub enabled: bool,

    /// Project (experiment) name runs are grouped under
    #[serde(default = "default_project_name")]
    pub project_name: String,

    /// Tracker backends to fan out to
    #[serde(default)]
    pub trackers: Vec<TrackerConfig>,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            project_name: default_project_name(),
            trackers: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default)]
    pub json_logs: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logs: false,
        }
    }
}

// Default value functions
fn default_project_root() -> PathBuf {
    PathBuf::from(".")
}

fn default_model_filename() -> String {
    "sentiment_model.bin".to_string()
}

fn default_data_filename() -> String {
    "training_data.jsonl".to_string()
}

fn default_iterations() -> usize {
    1000
}

fn default_alpha() -> f64 {
    0.0001
}

fn default_max_features() -> usize {
    5000
}

fn default_max_iter() -> usize {
    1000
}

fn default_tol() -> f64 {
    1e-3
}

fn default_n_iter_no_change() -> usize {
    5
}

fn default_test_size() -> f64 {
    0.2
}

fn default_validation_size() -> f64 {
    0.25
}

fn default_seed() -> u64 {
    42
}

fn default_log_every() -> usize {
    100
}

fn default_stopwords_key() -> String {
    "stopwords".to_string()
}

fn default_project_name() -> String {
    "sentiment-analysis".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_values() {
        assert_eq!(default_iterations(), 1000);
        assert_eq!(default_max_features(), 5000);
        assert_eq!(default_seed(), 42);
        assert_eq!(default_log_level(), "info");
        assert!(default_true());
    }

    #[test]
    fn test_paths_resolve_under_project_root() {
        let paths = PathsConfig::with_root("/srv/ticat");
        assert_eq!(paths.resolved_model_dir(), PathBuf::from("/srv/ticat/models"));
        assert_eq!(paths.resolved_data_dir(), PathBuf::from("/srv/ticat/data"));
        assert_eq!(
            paths.model_path(),
            PathBuf::from("/srv/ticat/models/sentiment_model.bin")
        );
        assert_eq!(
            paths.data_path(),
            PathBuf::from("/srv/ticat/data/training_data.jsonl")
        );
    }

    #[test]
    fn test_explicit_dirs_override_root() {
        let paths = PathsConfig::with_root("/srv/ticat")
            .with_model_dir("/opt/ml/model")
            .with_data_dir("/opt/ml/input/data");
        assert_eq!(paths.model_path(), PathBuf::from("/opt/ml/model/sentiment_model.bin"));
        assert_eq!(paths.data_path(), PathBuf::from("/opt/ml/input/data/training_data.jsonl"));
    }

    #[test]
    fn test_training_config_validation() {
        assert!(TrainingConfig::default().validate().is_ok());

        let bad_split = TrainingConfig {
            test_size: 1.0,
            ..Default::default()
        };
        assert!(bad_split.validate().is_err());

        let bad_alpha = TrainingConfig {
            alpha: 0.0,
            ..Default::default()
        };
        assert!(bad_alpha.validate().is_err());
    }

    #[test]
    fn test_load_embedded_defaults() {
        let config = Config::load(None).unwrap();
        assert_eq!(config.training.iterations, 1000);
        assert_eq!(config.paths.model_filename, "sentiment_model.bin");
        assert!(!config.tracking.enabled);
    }

    #[test]
    fn test_file_and_env_layers_override_defaults() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("ticat.toml");
        std::fs::write(
            &path,
            "[training]\nmax_features = 300\n\n[tracking]\nproject_name = \"tickets\"\n",
        )
        .unwrap();

        std::env::set_var("TICAT__TRAINING__LOG_EVERY", "7");
        let loaded = Config::load(Some(&path));
        std::env::remove_var("TICAT__TRAINING__LOG_EVERY");
        let config = loaded.unwrap();

        assert_eq!(config.training.max_features, 300);
        assert_eq!(config.tracking.project_name, "tickets");
        assert_eq!(config.training.log_every, 7);
        // untouched keys keep their defaults
        assert_eq!(config.training.seed, 42);
    }
}
