use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by the sentiment pipeline
#[derive(Error, Debug)]
pub enum SentimentError {
    /// Training data file is absent at train time
    #[error("Training data file not found: {}", .0.display())]
    DataFileMissing(PathBuf),

    /// A training row could not be ingested
    #[error("Malformed training record at line {line}: {reason}")]
    MalformedTrainingRecord { line: usize, reason: String },

    /// No persisted model artifact to serve predictions from
    #[error("No model found at {}. Please train the model first.", .0.display())]
    ModelNotFound(PathBuf),

    /// Text preprocessing failed (callers of `process_text` never see this)
    #[error("Preprocessing error: {0}")]
    Preprocessing(String),

    /// Greetings list file is absent
    #[error("Greetings file not found: {}", .0.display())]
    GreetingsFileMissing(PathBuf),

    /// Stop word file is absent
    #[error("Stop word file not found: {}", .0.display())]
    StopwordsFileMissing(PathBuf),

    /// Model fitting errors
    #[error("Training error: {0}")]
    Training(String),

    /// Experiment tracker errors
    #[error("Tracking error ({tracker}): {message}")]
    Tracking { tracker: String, message: String },

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl SentimentError {
    /// Get error code string
    pub fn error_code(&self) -> &str {
        match self {
            SentimentError::DataFileMissing(_) => "DATA_FILE_MISSING",
            SentimentError::MalformedTrainingRecord { .. } => "MALFORMED_TRAINING_RECORD",
            SentimentError::ModelNotFound(_) => "MODEL_NOT_FOUND",
            SentimentError::Preprocessing(_) => "PREPROCESSING_FAILURE",
            SentimentError::GreetingsFileMissing(_) => "GREETINGS_FILE_MISSING",
            SentimentError::StopwordsFileMissing(_) => "STOPWORDS_FILE_MISSING",
            SentimentError::Training(_) => "TRAINING_ERROR",
            SentimentError::Tracking { .. } => "TRACKING_ERROR",
            SentimentError::Configuration(_) => "CONFIGURATION_ERROR",
            SentimentError::Validation(_) => "VALIDATION_ERROR",
            SentimentError::Io(_) => "IO_ERROR",
            SentimentError::Serialization(_) => "SERIALIZATION_ERROR",
        }
    }

    /// Whether the error should abort the current operation.
    ///
    /// Only preprocessing failures are recoverable; everything else is fatal.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, SentimentError::Preprocessing(_))
    }

    pub(crate) fn tracking(tracker: impl Into<String>, message: impl Into<String>) -> Self {
        SentimentError::Tracking {
            tracker: tracker.into(),
            message: message.into(),
        }
    }
}

/// Conversion from serde_json::Error
impl From<serde_json::Error> for SentimentError {
    fn from(err: serde_json::Error) -> Self {
        SentimentError::Serialization(err.to_string())
    }
}

/// Conversion from serde_yaml::Error
impl From<serde_yaml::Error> for SentimentError {
    fn from(err: serde_yaml::Error) -> Self {
        SentimentError::Serialization(err.to_string())
    }
}

/// Conversion from bincode::Error
impl From<bincode::Error> for SentimentError {
    fn from(err: bincode::Error) -> Self {
        SentimentError::Serialization(err.to_string())
    }
}

/// Conversion from config::ConfigError
impl From<config::ConfigError> for SentimentError {
    fn from(err: config::ConfigError) -> Self {
        SentimentError::Configuration(err.to_string())
    }
}

/// Conversion from regex::Error
impl From<regex::Error> for SentimentError {
    fn from(err: regex::Error) -> Self {
        SentimentError::Preprocessing(err.to_string())
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, SentimentError>;
