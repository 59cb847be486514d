use crate::config::TrainingConfig;
use crate::error::{Result, SentimentError};
use crate::ml::classifier::{Classifier, SgdClassifier, SgdParameters};
use crate::ml::features::{SparseMatrix, StandardScaler, TfidfVectorizer};
use crate::ml::models::{ModelMetadata, Prediction, Sentiment};
use crate::preprocessing::TextPreProcessor;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{BufReader, BufWriter};
use std::path::Path;
use tracing::info;

/// TF-IDF -> scaler -> SGD logistic classifier, persisted as one artifact
///
/// Every text is run through [`TextPreProcessor::process_text`] before
/// vectorization, for fitting and prediction alike.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SentimentPipeline {
    vectorizer: TfidfVectorizer,
    scaler: StandardScaler,
    classifier: SgdClassifier,
    metadata: ModelMetadata,
}

impl SentimentPipeline {
    pub fn new(config: &TrainingConfig) -> Self {
        let mut metadata = ModelMetadata::new("sentiment_sgd");
        metadata.hyperparameters = hyperparameters(config);

        Self {
            vectorizer: TfidfVectorizer::new(config.max_features, config.english_stop_words),
            scaler: StandardScaler::new(),
            classifier: SgdClassifier::new(SgdParameters::from(config)),
            metadata,
        }
    }

    /// Fit every stage on the given texts; returns the classifier's epoch count
    pub fn fit<S: AsRef<str>>(&mut self, texts: &[S], labels: &[Sentiment]) -> Result<usize> {
        let cleaned = TextPreProcessor::process_batch(texts);
        let tfidf = self.vectorizer.fit_transform(&cleaned)?;
        let features = self.scaler.fit_transform(&tfidf)?;
        let epochs = self.classifier.fit(&features, labels)?;

        self.metadata.n_features = self.vectorizer.vocab_size();
        self.metadata.n_training_samples = texts.len();
        self.metadata.trained_at = chrono::Utc::now();
        Ok(epochs)
    }

    /// One more classifier epoch on already transformed features
    pub fn partial_fit(&mut self, features: &SparseMatrix, labels: &[Sentiment]) -> Result<()> {
        self.classifier.partial_fit(features, labels)
    }

    /// Vectorize and scale with the fitted stages
    pub fn transform<S: AsRef<str>>(&self, texts: &[S]) -> Result<SparseMatrix> {
        let cleaned = TextPreProcessor::process_batch(texts);
        let tfidf = self.vectorizer.transform_batch(&cleaned)?;
        self.scaler.transform(&tfidf)
    }

    pub fn predict_proba_features(&self, features: &SparseMatrix) -> Result<Vec<[f64; 2]>> {
        self.classifier.predict_proba(features)
    }

    pub fn predict_features(&self, features: &SparseMatrix) -> Result<Vec<Sentiment>> {
        self.classifier.predict(features)
    }

    pub fn predict_proba(&self, text: &str) -> Result<[f64; 2]> {
        let tfidf = self.vectorizer.transform(&TextPreProcessor::process_text(text))?;
        let row = self.scaler.transform_row(&tfidf)?;
        self.classifier.predict_proba_row(&row)
    }

    pub fn predict(&self, text: &str) -> Result<Prediction> {
        Ok(Prediction::from_probabilities(&self.predict_proba(text)?))
    }

    pub fn is_trained(&self) -> bool {
        self.vectorizer.is_fitted() && self.scaler.is_fitted() && self.classifier.is_trained()
    }

    pub fn metadata(&self) -> &ModelMetadata {
        &self.metadata
    }

    pub fn metadata_mut(&mut self) -> &mut ModelMetadata {
        &mut self.metadata
    }

    pub fn vectorizer(&self) -> &TfidfVectorizer {
        &self.vectorizer
    }

    pub fn classifier(&self) -> &SgdClassifier {
        &self.classifier
    }

    /// Write the pipeline with bincode, creating parent directories
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if !self.is_trained() {
            return Err(SentimentError::Training(
                "Refusing to save an untrained pipeline".to_string(),
            ));
        }
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let writer = BufWriter::new(fs::File::create(path)?);
        bincode::serialize_into(writer, self)?;

        info!(path = %path.display(), "Saved sentiment model");
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(SentimentError::ModelNotFound(path.to_path_buf()));
        }

        let reader = BufReader::new(fs::File::open(path)?);
        let pipeline: Self = bincode::deserialize_from(reader)?;

        info!(
            path = %path.display(),
            name = %pipeline.metadata.name,
            features = pipeline.metadata.n_features,
            "Loaded sentiment model"
        );
        Ok(pipeline)
    }
}

fn hyperparameters(config: &TrainingConfig) -> std::collections::BTreeMap<String, String> {
    [
        ("loss", "log_loss".to_string()),
        ("penalty", "l2".to_string()),
        ("learning_rate", "optimal".to_string()),
        ("alpha", config.alpha.to_string()),
        ("max_iter", config.max_iter.to_string()),
        ("tol", config.tol.to_string()),
        ("n_iter_no_change", config.n_iter_no_change.to_string()),
        ("max_features", config.max_features.to_string()),
        ("english_stop_words", config.english_stop_words.to_string()),
        ("random_state", config.seed.to_string()),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v))
    .collect()
}
