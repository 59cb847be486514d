use crate::config::Config;
use crate::error::Result;
use crate::ml::{ModelManager, Prediction, Sentiment};
use crate::preprocessing::{GreetingFilter, StopwordFilter, TextPreProcessor};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Identifier reported with every prediction
pub const MODEL_ID: &str = "sentiment_analysis_model";

/// Prediction payload returned to callers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentResponse {
    pub label: Sentiment,
    pub confidence: f64,
    pub model_id: String,
}

impl From<&Prediction> for SentimentResponse {
    fn from(prediction: &Prediction) -> Self {
        Self {
            label: prediction.label,
            confidence: prediction.confidence,
            model_id: MODEL_ID.to_string(),
        }
    }
}

/// Raw ticket text in, sentiment out: cleaning, greeting cut and stop word
/// removal in front of a [`ModelManager`].
pub struct SentimentAnalyzer {
    manager: ModelManager,
    greetings: Option<GreetingFilter>,
    stopwords: Option<StopwordFilter>,
}

impl SentimentAnalyzer {
    pub fn new(manager: ModelManager) -> Self {
        Self {
            manager,
            greetings: None,
            stopwords: None,
        }
    }

    /// Build the manager and load the filters named in the config
    pub fn from_config(config: &Config) -> Result<Self> {
        let mut analyzer = Self::new(ModelManager::from_config(config)?);

        if let Some(path) = &config.preprocessing.greetings_file {
            analyzer.greetings = Some(GreetingFilter::load(path)?);
        }
        if let Some(path) = &config.preprocessing.stopwords_file {
            analyzer.stopwords = Some(StopwordFilter::load(
                path,
                &config.preprocessing.stopwords_key,
            )?);
        }

        Ok(analyzer)
    }

    pub fn with_greetings(mut self, greetings: GreetingFilter) -> Self {
        self.greetings = Some(greetings);
        self
    }

    pub fn with_stopwords(mut self, stopwords: StopwordFilter) -> Self {
        self.stopwords = Some(stopwords);
        self
    }

    pub fn manager(&self) -> &ModelManager {
        &self.manager
    }

    pub fn manager_mut(&mut self) -> &mut ModelManager {
        &mut self.manager
    }

    /// Text exactly as the model will see it
    pub fn prepare(&self, text: &str) -> String {
        let mut prepared = TextPreProcessor::process_text(text);
        if let Some(greetings) = &self.greetings {
            prepared = greetings.cut_after_greetings(&prepared);
        }
        if let Some(stopwords) = &self.stopwords {
            prepared = stopwords.remove_stop_words(&prepared);
        }
        debug!(input_len = text.len(), prepared_len = prepared.len(), "Prepared text");
        prepared
    }

    pub fn analyze(&mut self, text: &str) -> Result<Prediction> {
        let prepared = self.prepare(text);
        self.manager.predict_detailed(&prepared)
    }

    pub fn respond(&mut self, text: &str) -> Result<SentimentResponse> {
        Ok(SentimentResponse::from(&self.analyze(text)?))
    }
}
