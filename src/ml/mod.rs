/// Machine learning module for ticket sentiment classification
///
/// This module provides:
/// - TF-IDF feature extraction and feature scaling
/// - A logistic-loss linear classifier trained with SGD
/// - Stratified train/validation/test splitting of JSON-lines data
/// - Evaluation metrics (accuracy, weighted precision/recall/F1, log loss)
/// - Model lifecycle management: training, persistence and prediction

pub mod classifier;
pub mod dataset;
pub mod features;
pub mod manager;
pub mod metrics;
pub mod models;
pub mod pipeline;
pub mod stop_words;

pub use classifier::{Classifier, SgdClassifier, SgdParameters};
pub use dataset::{class_distribution, load_training_data, DatasetSplit};
pub use features::{SparseMatrix, StandardScaler, TfidfVectorizer};
pub use manager::{ModelManager, ProjectInfo};
pub use metrics::{accuracy, calculate_metrics, log_loss, LOG_LOSS_EPSILON};
pub use models::{
    ClassMetrics, IterationMetrics, ModelMetadata, ModelMetrics, ModelState, Prediction,
    Sentiment, TrainingExample, TrainingReport,
};
pub use pipeline::SentimentPipeline;
