use crate::error::{Result, SentimentError};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;
use tracing::info;

/// Removes domain stop words loaded from a YAML file of named lists:
///
/// ```yaml
/// stopwords:
///   - hallo
///   - bitte
/// ```
#[derive(Debug, Clone, Default)]
pub struct StopwordFilter {
    stop_words: HashSet<String>,
}

impl StopwordFilter {
    /// Load the list stored under `key`
    pub fn load(path: impl AsRef<Path>, key: &str) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(SentimentError::StopwordsFileMissing(path.to_path_buf()));
        }

        let contents = fs::read_to_string(path)?;
        let filter = Self::from_yaml(&contents, key)?;
        info!(
            path = %path.display(),
            key = key,
            stop_words = filter.len(),
            "Stop words loaded"
        );
        Ok(filter)
    }

    /// Parse the list stored under `key` from YAML source
    pub fn from_yaml(source: &str, key: &str) -> Result<Self> {
        let lists: HashMap<String, serde_yaml::Value> = serde_yaml::from_str(source)?;
        let list = lists.get(key).ok_or_else(|| {
            SentimentError::Validation(format!("Stop word file has no '{}' list", key))
        })?;
        let words: Vec<String> = serde_yaml::from_value(list.clone()).map_err(|e| {
            SentimentError::Validation(format!("Stop word list '{}' is not a list of words: {}", key, e))
        })?;

        Ok(Self::from_words(words))
    }

    pub fn from_words<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            stop_words: words
                .into_iter()
                .map(|w| w.as_ref().trim().to_lowercase())
                .filter(|w| !w.is_empty())
                .collect(),
        }
    }

    /// Drop every whitespace-separated word whose lowercase form is a stop word
    pub fn remove_stop_words(&self, text: &str) -> String {
        text.split_whitespace()
            .filter(|word| !self.stop_words.contains(&word.to_lowercase()))
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn contains(&self, word: &str) -> bool {
        self.stop_words.contains(&word.to_lowercase())
    }

    pub fn len(&self) -> usize {
        self.stop_words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stop_words.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const YAML: &str = "stopwords:\n  - Hallo\n  - bitte\ngreetings:\n  - servus\n";

    #[test]
    fn test_from_yaml_selects_key() {
        let filter = StopwordFilter::from_yaml(YAML, "stopwords").unwrap();
        assert_eq!(filter.len(), 2);
        assert!(filter.contains("hallo"));
        assert!(!filter.contains("servus"));
    }

    #[test]
    fn test_remove_stop_words_case_insensitive() {
        let filter = StopwordFilter::from_words(["hallo", "bitte"]);
        assert_eq!(
            filter.remove_stop_words("Hallo team  bitte   prüfen"),
            "team prüfen"
        );
    }

    #[test]
    fn test_missing_key() {
        let err = StopwordFilter::from_yaml(YAML, "unknown").unwrap_err();
        assert!(matches!(err, SentimentError::Validation(_)));
    }

    #[test]
    fn test_list_of_non_words_rejected() {
        let err = StopwordFilter::from_yaml("stopwords:\n  nested: true\n", "stopwords").unwrap_err();
        assert!(matches!(err, SentimentError::Validation(_)));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(YAML.as_bytes()).unwrap();
        let filter = StopwordFilter::load(file.path(), "greetings").unwrap();
        assert!(filter.contains("Servus"));
    }

    #[test]
    fn test_missing_file() {
        let err = StopwordFilter::load("/nonexistent/stopwords.yaml", "stopwords").unwrap_err();
        assert!(matches!(err, SentimentError::StopwordsFileMissing(_)));
    }
}
