use crate::error::{Result, SentimentError};
use crate::preprocessing::TextPreProcessor;
use std::fs;
use std::path::Path;
use tracing::{debug, info};

/// Cuts ticket text at the first greeting or sign-off ("mit freundlichen
/// grüßen", "best regards", ...) so signatures and quoted history do not
/// leak into the features.
#[derive(Debug, Clone, Default)]
pub struct GreetingFilter {
    sequences: Vec<String>,
}

impl GreetingFilter {
    /// Load greeting sequences from a file with one sequence per line
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(SentimentError::GreetingsFileMissing(path.to_path_buf()));
        }

        let contents = fs::read_to_string(path)?;
        let filter = Self::from_sequences(contents.lines());
        info!(
            path = %path.display(),
            sequences = filter.len(),
            "Greeting sequences loaded"
        );
        Ok(filter)
    }

    /// Build a filter from in-memory sequences.
    ///
    /// Sequences are cleaned the same way ticket text is, so they must be
    /// matched against already-processed text.
    pub fn from_sequences<I, S>(sequences: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let sequences = sequences
            .into_iter()
            .map(|line| line.as_ref().trim().replace(['"', ','], ""))
            .filter(|line| !line.is_empty())
            .map(|line| TextPreProcessor::process_text(&line))
            // a sequence that cleans down to nothing would match every text
            .filter(|line| !line.is_empty())
            .collect();

        Self { sequences }
    }

    /// Return the text before the first matching sequence, trimmed.
    ///
    /// Sequences are tried in load order; text without a match is returned as is.
    pub fn cut_after_greetings(&self, text: &str) -> String {
        for greeting in &self.sequences {
            if let Some(pos) = text.find(greeting.as_str()) {
                debug!(greeting = %greeting, "Cutting text at greeting");
                return text[..pos].trim().to_string();
            }
        }
        text.to_string()
    }

    pub fn sequences(&self) -> &[String] {
        &self.sequences
    }

    pub fn len(&self) -> usize {
        self.sequences.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sequences.is_empty()
    }
}
