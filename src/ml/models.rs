use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use strum::{Display, EnumIter, EnumString, IntoEnumIterator};

/// Sentiment label.
///
/// Variant order is the class index order used by the classifier.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Sentiment {
    Negative,
    Positive,
}

impl Sentiment {
    pub const N_CLASSES: usize = 2;

    pub fn index(self) -> usize {
        match self {
            Sentiment::Negative => 0,
            Sentiment::Positive => 1,
        }
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Sentiment::iter().nth(index)
    }
}

/// One labelled line of the training data file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingExample {
    pub text: String,
    pub label: Sentiment,
}

impl TrainingExample {
    pub fn new(text: impl Into<String>, label: Sentiment) -> Self {
        Self {
            text: text.into(),
            label,
        }
    }
}

/// Prediction result with confidence score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    /// Predicted label
    pub label: Sentiment,

    /// Maximum class posterior (0.0 - 1.0)
    pub confidence: f64,

    /// All class probabilities
    pub probabilities: BTreeMap<Sentiment, f64>,
}

impl Prediction {
    pub fn new(label: Sentiment, confidence: f64) -> Self {
        Self {
            label,
            confidence,
            probabilities: BTreeMap::new(),
        }
    }

    pub fn with_probabilities(mut self, probabilities: BTreeMap<Sentiment, f64>) -> Self {
        self.probabilities = probabilities;
        self
    }

    /// Build from a probability row indexed like [`Sentiment::index`]
    pub fn from_probabilities(row: &[f64]) -> Self {
        let mut best = Sentiment::Negative;
        let mut best_p = f64::NEG_INFINITY;
        let mut probabilities = BTreeMap::new();

        for label in Sentiment::iter() {
            let p = row.get(label.index()).copied().unwrap_or(0.0);
            // ties go to the lower class index
            if p > best_p {
                best = label;
                best_p = p;
            }
            probabilities.insert(label, p);
        }

        Self::new(best, best_p.clamp(0.0, 1.0)).with_probabilities(probabilities)
    }
}

/// Model evaluation metrics.
///
/// Precision, recall and F1 are support-weighted averages over classes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMetrics {
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,

    /// Rows are true labels, columns predictions
    pub confusion_matrix: Option<Array2<usize>>,

    pub per_class_metrics: HashMap<String, ClassMetrics>,
}

/// Per-class evaluation metrics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassMetrics {
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,
    pub support: usize,
}

impl ModelMetrics {
    pub fn new() -> Self {
        Self {
            accuracy: 0.0,
            precision: 0.0,
            recall: 0.0,
            f1_score: 0.0,
            confusion_matrix: None,
            per_class_metrics: HashMap::new(),
        }
    }

    /// Flatten into `<prefix>_accuracy`, `<prefix>_precision`, ... for trackers
    pub fn to_tracker_metrics(&self, prefix: &str) -> BTreeMap<String, f64> {
        [
            ("accuracy", self.accuracy),
            ("precision", self.precision),
            ("recall", self.recall),
            ("f1", self.f1_score),
        ]
        .into_iter()
        .map(|(name, value)| (format!("{}_{}", prefix, name), value))
        .collect()
    }
}

impl Default for ModelMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Metrics recorded after one incremental-fit pass
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IterationMetrics {
    /// 1-based pass number
    pub iteration: usize,
    pub train_samples: usize,
    pub train_loss: f64,
    pub val_loss: f64,
    pub train: ModelMetrics,
    pub validation: ModelMetrics,
}

impl IterationMetrics {
    pub fn to_tracker_metrics(&self) -> BTreeMap<String, f64> {
        let mut metrics = self.train.to_tracker_metrics("train");
        metrics.extend(self.validation.to_tracker_metrics("val"));
        metrics.insert("iteration".to_string(), self.iteration as f64);
        metrics.insert("train_samples".to_string(), self.train_samples as f64);
        metrics.insert("train_loss".to_string(), self.train_loss);
        metrics.insert("val_loss".to_string(), self.val_loss);
        metrics
    }
}

/// Model metadata stored alongside the fitted pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMetadata {
    pub name: String,
    pub version: String,
    pub trained_at: chrono::DateTime<chrono::Utc>,
    pub n_training_samples: usize,
    pub n_validation_samples: usize,
    pub n_test_samples: usize,
    pub n_features: usize,
    pub hyperparameters: BTreeMap<String, String>,
    pub test_metrics: Option<ModelMetrics>,
}

impl ModelMetadata {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            trained_at: chrono::Utc::now(),
            n_training_samples: 0,
            n_validation_samples: 0,
            n_test_samples: 0,
            n_features: 0,
            hyperparameters: BTreeMap::new(),
            test_metrics: None,
        }
    }
}

/// Outcome of [`crate::ml::ModelManager::train`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingReport {
    pub class_distribution: BTreeMap<Sentiment, usize>,
    pub n_train: usize,
    pub n_validation: usize,
    pub n_test: usize,
    /// Epochs used by the initial fit before early stopping
    pub initial_fit_epochs: usize,
    pub history: Vec<IterationMetrics>,
    pub test_metrics: ModelMetrics,
    pub model_path: PathBuf,
}

/// Lifecycle of a [`crate::ml::ModelManager`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ModelState {
    Uninitialized,
    Validated,
    Trained,
    Loaded,
}

impl ModelState {
    /// A pipeline is in memory and can serve predictions
    pub fn is_ready(self) -> bool {
        matches!(self, ModelState::Trained | ModelState::Loaded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_sentiment_wire_format() {
        assert_eq!(serde_json::to_string(&Sentiment::Positive).unwrap(), "\"POSITIVE\"");
        assert_eq!(Sentiment::from_str("NEGATIVE").unwrap(), Sentiment::Negative);
        assert_eq!(Sentiment::Positive.to_string(), "POSITIVE");
        assert!(serde_json::from_str::<Sentiment>("\"NEUTRAL\"").is_err());
    }

    #[test]
    fn test_sentiment_index_order() {
        assert_eq!(Sentiment::Negative.index(), 0);
        assert_eq!(Sentiment::Positive.index(), 1);
        assert_eq!(Sentiment::from_index(1), Some(Sentiment::Positive));
        assert_eq!(Sentiment::from_index(2), None);
    }

    #[test]
    fn test_training_example_deserialization() {
        let example: TrainingExample =
            serde_json::from_str(r#"{"text": "Great support", "label": "POSITIVE"}"#).unwrap();
        assert_eq!(example, TrainingExample::new("Great support", Sentiment::Positive));
    }

    #[test]
    fn test_prediction_from_probabilities() {
        let prediction = Prediction::from_probabilities(&[0.2, 0.8]);
        assert_eq!(prediction.label, Sentiment::Positive);
        assert_eq!(prediction.confidence, 0.8);
        assert_eq!(prediction.probabilities.len(), 2);
        assert_eq!(prediction.probabilities[&Sentiment::Negative], 0.2);
    }

    #[test]
    fn test_iteration_metrics_flattening() {
        let iteration = IterationMetrics {
            iteration: 3,
            train_samples: 60,
            train_loss: 0.4,
            val_loss: 0.5,
            train: ModelMetrics::new(),
            validation: ModelMetrics::new(),
        };
        let flat = iteration.to_tracker_metrics();
        assert_eq!(flat["iteration"], 3.0);
        assert_eq!(flat["train_samples"], 60.0);
        assert!(flat.contains_key("val_f1"));
        assert!(flat.contains_key("train_precision"));
        assert_eq!(flat.len(), 12);
    }

    #[test]
    fn test_model_state_readiness() {
        assert!(!ModelState::Uninitialized.is_ready());
        assert!(!ModelState::Validated.is_ready());
        assert!(ModelState::Trained.is_ready());
        assert!(ModelState::Loaded.is_ready());
        assert_eq!(ModelState::Loaded.to_string(), "loaded");
    }
}
