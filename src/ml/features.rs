use crate::error::{Result, SentimentError};
use crate::ml::stop_words::is_english_stop_word;
use ndarray::{Array1, Array2};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};

static TOKEN_RE: Lazy<std::result::Result<Regex, regex::Error>> =
    Lazy::new(|| Regex::new(r"\b\w\w+\b"));

/// Row-major sparse matrix; each row holds `(column, value)` pairs sorted by column
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SparseMatrix {
    n_features: usize,
    rows: Vec<Vec<(usize, f64)>>,
}

impl SparseMatrix {
    pub fn new(n_features: usize) -> Self {
        Self {
            n_features,
            rows: Vec::new(),
        }
    }

    /// Append a row; columns must be below `n_features` and strictly increasing
    pub fn push_row(&mut self, row: Vec<(usize, f64)>) -> Result<()> {
        if let Some(&(column, _)) = row.iter().find(|(j, _)| *j >= self.n_features) {
            return Err(SentimentError::Validation(format!(
                "Column {} out of range for {} features",
                column, self.n_features
            )));
        }
        if row.windows(2).any(|pair| pair[0].0 >= pair[1].0) {
            return Err(SentimentError::Validation(
                "Row columns must be strictly increasing".to_string(),
            ));
        }
        self.rows.push(row);
        Ok(())
    }

    pub fn row(&self, index: usize) -> &[(usize, f64)] {
        &self.rows[index]
    }

    pub fn rows(&self) -> &[Vec<(usize, f64)>] {
        &self.rows
    }

    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn nnz(&self) -> usize {
        self.rows.iter().map(Vec::len).sum()
    }

    pub fn to_dense(&self) -> Array2<f64> {
        let mut dense = Array2::zeros((self.rows.len(), self.n_features));
        for (i, row) in self.rows.iter().enumerate() {
            for &(j, value) in row {
                dense[[i, j]] = value;
            }
        }
        dense
    }
}

/// TF-IDF text vectorizer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TfidfVectorizer {
    /// Maximum vocabulary size
    max_features: usize,

    /// Drop English stop words
    english_stop_words: bool,

    /// Vocabulary mapping (term -> column)
    vocabulary: BTreeMap<String, usize>,

    /// Smoothed inverse document frequency per column
    idf: Array1<f64>,

    /// Is fitted (vocabulary built)
    is_fitted: bool,
}

impl TfidfVectorizer {
    pub fn new(max_features: usize, english_stop_words: bool) -> Self {
        Self {
            max_features,
            english_stop_words,
            vocabulary: BTreeMap::new(),
            idf: Array1::zeros(0),
            is_fitted: false,
        }
    }

    /// Lowercase, tokenize and drop stop words
    pub fn analyze(&self, document: &str) -> Result<Vec<String>> {
        let token_re = Lazy::force(&TOKEN_RE)
            .as_ref()
            .map_err(|e| SentimentError::Preprocessing(e.to_string()))?;

        let lowered = document.to_lowercase();
        Ok(token_re
            .find_iter(&lowered)
            .map(|m| m.as_str())
            .filter(|token| !(self.english_stop_words && is_english_stop_word(token)))
            .map(str::to_string)
            .collect())
    }

    /// Build vocabulary and idf weights from a corpus
    pub fn fit<S: AsRef<str>>(&mut self, documents: &[S]) -> Result<()> {
        if documents.is_empty() {
            return Err(SentimentError::Training(
                "Cannot fit vectorizer on an empty corpus".to_string(),
            ));
        }

        let mut term_freq: HashMap<String, usize> = HashMap::new();
        let mut doc_freq: HashMap<String, usize> = HashMap::new();

        for document in documents {
            let terms = self.analyze(document.as_ref())?;
            let unique_terms: HashSet<&String> = terms.iter().collect();
            for term in unique_terms {
                *doc_freq.entry(term.clone()).or_insert(0) += 1;
            }
            for term in terms {
                *term_freq.entry(term).or_insert(0) += 1;
            }
        }

        if term_freq.is_empty() {
            return Err(SentimentError::Training(
                "Empty vocabulary; documents may only contain stop words".to_string(),
            ));
        }

        // Keep the most frequent terms, ties broken by term
        let mut vocab_list: Vec<(String, usize)> = term_freq.into_iter().collect();
        vocab_list.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        vocab_list.truncate(self.max_features);

        // Columns follow lexical order of the kept terms
        let mut terms: Vec<String> = vocab_list.into_iter().map(|(term, _)| term).collect();
        terms.sort();

        let n_docs = documents.len() as f64;
        self.idf = terms
            .iter()
            .map(|term| {
                let df = doc_freq.get(term).copied().unwrap_or(0) as f64;
                ((1.0 + n_docs) / (1.0 + df)).ln() + 1.0
            })
            .collect();
        self.vocabulary = terms
            .into_iter()
            .enumerate()
            .map(|(idx, term)| (term, idx))
            .collect();
        self.is_fitted = true;

        Ok(())
    }

    /// Transform one document into an L2-normalised tf-idf row
    pub fn transform(&self, document: &str) -> Result<Vec<(usize, f64)>> {
        if !self.is_fitted {
            return Err(SentimentError::Training(
                "TfidfVectorizer must be fitted before transform".to_string(),
            ));
        }

        let mut counts: HashMap<usize, usize> = HashMap::new();
        for term in self.analyze(document)? {
            if let Some(&idx) = self.vocabulary.get(&term) {
                *counts.entry(idx).or_insert(0) += 1;
            }
        }

        let mut row: Vec<(usize, f64)> = counts
            .into_iter()
            .map(|(idx, count)| (idx, count as f64 * self.idf[idx]))
            .collect();
        row.sort_by_key(|&(idx, _)| idx);

        let norm = row.iter().map(|(_, v)| v * v).sum::<f64>().sqrt();
        if norm > 0.0 {
            for (_, value) in row.iter_mut() {
                *value /= norm;
            }
        }

        Ok(row)
    }

    pub fn transform_batch<S: AsRef<str>>(&self, documents: &[S]) -> Result<SparseMatrix> {
        let mut matrix = SparseMatrix::new(self.vocab_size());
        for document in documents {
            matrix.push_row(self.transform(document.as_ref())?)?;
        }
        Ok(matrix)
    }

    /// Fit and transform in one step
    pub fn fit_transform<S: AsRef<str>>(&mut self, documents: &[S]) -> Result<SparseMatrix> {
        self.fit(documents)?;
        self.transform_batch(documents)
    }

    pub fn vocabulary(&self) -> &BTreeMap<String, usize> {
        &self.vocabulary
    }

    pub fn idf(&self) -> &Array1<f64> {
        &self.idf
    }

    /// Check if fitted
    pub fn is_fitted(&self) -> bool {
        self.is_fitted
    }

    /// Get vocabulary size
    pub fn vocab_size(&self) -> usize {
        self.vocabulary.len()
    }
}

/// Scales each feature by its standard deviation without centering, so
/// sparse rows stay sparse.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StandardScaler {
    scale: Array1<f64>,
    is_fitted: bool,
}

impl StandardScaler {
    pub fn new() -> Self {
        Self {
            scale: Array1::zeros(0),
            is_fitted: false,
        }
    }

    /// Compute per-feature population standard deviations
    pub fn fit(&mut self, matrix: &SparseMatrix) -> Result<()> {
        let n_rows = matrix.n_rows();
        if n_rows == 0 {
            return Err(SentimentError::Training(
                "Cannot fit scaler on an empty matrix".to_string(),
            ));
        }

        let n_features = matrix.n_features();
        let mut sum = Array1::<f64>::zeros(n_features);
        let mut sum_sq = Array1::<f64>::zeros(n_features);
        for row in matrix.rows() {
            for &(j, value) in row {
                sum[j] += value;
                sum_sq[j] += value * value;
            }
        }

        let n = n_rows as f64;
        self.scale = sum
            .iter()
            .zip(sum_sq.iter())
            .map(|(&s, &sq)| {
                let mean = s / n;
                let std = (sq / n - mean * mean).max(0.0).sqrt();
                // constant features are left as they are
                if std < 10.0 * f64::EPSILON {
                    1.0
                } else {
                    std
                }
            })
            .collect();
        self.is_fitted = true;

        Ok(())
    }

    pub fn transform_row(&self, row: &[(usize, f64)]) -> Result<Vec<(usize, f64)>> {
        if !self.is_fitted {
            return Err(SentimentError::Training(
                "StandardScaler must be fitted before transform".to_string(),
            ));
        }
        row.iter()
            .map(|&(j, value)| match self.scale.get(j) {
                Some(scale) => Ok((j, value / scale)),
                None => Err(SentimentError::Validation(format!(
                    "Column {} out of range for {} scaled features",
                    j,
                    self.scale.len()
                ))),
            })
            .collect()
    }

    pub fn transform(&self, matrix: &SparseMatrix) -> Result<SparseMatrix> {
        let mut scaled = SparseMatrix::new(matrix.n_features());
        for row in matrix.rows() {
            scaled.push_row(self.transform_row(row)?)?;
        }
        Ok(scaled)
    }

    pub fn fit_transform(&mut self, matrix: &SparseMatrix) -> Result<SparseMatrix> {
        self.fit(matrix)?;
        self.transform(matrix)
    }

    pub fn scale(&self) -> &Array1<f64> {
        &self.scale
    }

    pub fn is_fitted(&self) -> bool {
        self.is_fitted
    }
}

impl Default for StandardScaler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn corpus() -> Vec<&'static str> {
        vec![
            "great product, great support",
            "terrible product and slow support",
            "the delivery was great",
        ]
    }

    #[test]
    fn test_analyze_drops_stop_words_and_short_tokens() {
        let vectorizer = TfidfVectorizer::new(100, true);
        let tokens = vectorizer.analyze("The product is A great fit").unwrap();
        assert_eq!(tokens, vec!["product", "great", "fit"]);
    }

    #[test]
    fn test_analyze_keeps_stop_words_when_disabled() {
        let vectorizer = TfidfVectorizer::new(100, false);
        let tokens = vectorizer.analyze("the product").unwrap();
        assert_eq!(tokens, vec!["the", "product"]);
    }

    #[test]
    fn test_vocabulary_in_lexical_order() {
        let mut vectorizer = TfidfVectorizer::new(100, true);
        vectorizer.fit(&corpus()).unwrap();

        assert!(vectorizer.is_fitted());
        let terms: Vec<&String> = vectorizer.vocabulary().keys().collect();
        let indices: Vec<usize> = vectorizer.vocabulary().values().copied().collect();
        assert_eq!(terms.first().map(|t| t.as_str()), Some("delivery"));
        assert_eq!(indices, (0..vectorizer.vocab_size()).collect::<Vec<_>>());
        assert!(!vectorizer.vocabulary().contains_key("the"));
    }

    #[test]
    fn test_max_features_keeps_most_frequent() {
        let mut vectorizer = TfidfVectorizer::new(2, true);
        vectorizer.fit(&corpus()).unwrap();
        // "great" x3, then "product" and "support" x2 tie; ties go to the lower term
        let terms: Vec<&str> = vectorizer.vocabulary().keys().map(|t| t.as_str()).collect();
        assert_eq!(terms, vec!["great", "product"]);
    }

    #[test]
    fn test_smooth_idf() {
        let mut vectorizer = TfidfVectorizer::new(100, true);
        vectorizer.fit(&corpus()).unwrap();
        let great = vectorizer.vocabulary()["great"];
        let terrible = vectorizer.vocabulary()["terrible"];
        // great: df = 2 of 3, terrible: df = 1 of 3
        assert!((vectorizer.idf()[great] - ((4.0f64 / 3.0).ln() + 1.0)).abs() < 1e-12);
        assert!((vectorizer.idf()[terrible] - ((4.0f64 / 2.0).ln() + 1.0)).abs() < 1e-12);
    }

    #[test]
    fn test_rows_are_l2_normalised() {
        let mut vectorizer = TfidfVectorizer::new(100, true);
        let matrix = vectorizer.fit_transform(&corpus()).unwrap();
        for row in matrix.rows() {
            let norm: f64 = row.iter().map(|(_, v)| v * v).sum::<f64>().sqrt();
            assert!((norm - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_unknown_terms_give_empty_row() {
        let mut vectorizer = TfidfVectorizer::new(100, true);
        vectorizer.fit(&corpus()).unwrap();
        assert!(vectorizer.transform("completely unseen words").unwrap().is_empty());
    }

    #[test]
    fn test_transform_before_fit_fails() {
        let vectorizer = TfidfVectorizer::new(100, true);
        assert!(vectorizer.transform("anything").is_err());
    }

    #[test]
    fn test_stop_word_only_corpus_fails() {
        let mut vectorizer = TfidfVectorizer::new(100, true);
        assert!(vectorizer.fit(&["the and of", "a an"]).is_err());
    }

    #[test]
    fn test_push_row_rejects_bad_columns() {
        let mut matrix = SparseMatrix::new(3);
        assert!(matches!(
            matrix.push_row(vec![(3, 1.0)]),
            Err(SentimentError::Validation(_))
        ));
        assert!(matrix.push_row(vec![(2, 1.0), (0, 1.0)]).is_err());
        assert_eq!(matrix.n_rows(), 0);

        matrix.push_row(vec![(0, 1.0), (2, 1.0)]).unwrap();
        assert_eq!(matrix.to_dense().shape(), &[1, 3]);

        let mut scaler = StandardScaler::new();
        scaler.fit(&matrix).unwrap();
        assert!(scaler.transform_row(&[(7, 1.0)]).is_err());
    }

    #[test]
    fn test_scaler_divides_by_std() {
        let mut matrix = SparseMatrix::new(2);
        matrix.push_row(vec![(0, 1.0), (1, 2.0)]).unwrap();
        matrix.push_row(vec![(0, 3.0), (1, 2.0)]).unwrap();

        let mut scaler = StandardScaler::new();
        let scaled = scaler.fit_transform(&matrix).unwrap();

        // column 0: std 1.0; column 1 is constant and left unscaled
        assert_eq!(scaler.scale().to_vec(), vec![1.0, 1.0]);
        assert_eq!(scaled.row(1), &[(0, 3.0), (1, 2.0)]);
    }

    #[test]
    fn test_scaler_preserves_sparsity() {
        let mut matrix = SparseMatrix::new(3);
        matrix.push_row(vec![(0, 2.0)]).unwrap();
        matrix.push_row(vec![]).unwrap();
        matrix.push_row(vec![(2, 4.0)]).unwrap();

        let mut scaler = StandardScaler::new();
        let scaled = scaler.fit_transform(&matrix).unwrap();
        assert_eq!(scaled.nnz(), matrix.nnz());
        assert!(scaled.row(1).is_empty());

        let dense = scaled.to_dense();
        assert_eq!(dense.shape(), &[3, 3]);
        assert!((dense[[0, 0]] - 2.0 / (8.0f64 / 9.0).sqrt()).abs() < 1e-12);
    }
}
