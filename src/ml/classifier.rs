use crate::config::TrainingConfig;
use crate::error::{Result, SentimentError};
use crate::ml::features::SparseMatrix;
use crate::ml::models::Sentiment;
use ndarray::Array1;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::debug;

const MAX_DLOSS: f64 = 1e12;
const MIN_WEIGHT_SCALE: f64 = 1e-9;

/// Trait for classifiers over sparse feature rows
pub trait Classifier: Send + Sync {
    /// Train from scratch; returns the number of epochs run
    fn fit(&mut self, features: &SparseMatrix, labels: &[Sentiment]) -> Result<usize>;

    /// Run one more pass over the given samples, keeping the current weights
    fn partial_fit(&mut self, features: &SparseMatrix, labels: &[Sentiment]) -> Result<()>;

    /// Class probabilities for one row, indexed by [`Sentiment::index`]
    fn predict_proba_row(&self, row: &[(usize, f64)]) -> Result<[f64; 2]>;

    /// Class probabilities for every row
    fn predict_proba(&self, features: &SparseMatrix) -> Result<Vec<[f64; 2]>> {
        features
            .rows()
            .iter()
            .map(|row| self.predict_proba_row(row))
            .collect()
    }

    /// Predict class labels
    fn predict(&self, features: &SparseMatrix) -> Result<Vec<Sentiment>> {
        Ok(self
            .predict_proba(features)?
            .iter()
            .map(|p| {
                if p[Sentiment::Positive.index()] > p[Sentiment::Negative.index()] {
                    Sentiment::Positive
                } else {
                    Sentiment::Negative
                }
            })
            .collect())
    }

    /// Check if model is trained
    fn is_trained(&self) -> bool;
}

/// Hyperparameters of [`SgdClassifier`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SgdParameters {
    pub alpha: f64,
    pub max_iter: usize,
    pub tol: f64,
    pub n_iter_no_change: usize,
    pub seed: u64,
}

impl Default for SgdParameters {
    fn default() -> Self {
        Self::from(&TrainingConfig::default())
    }
}

impl From<&TrainingConfig> for SgdParameters {
    fn from(config: &TrainingConfig) -> Self {
        Self {
            alpha: config.alpha,
            max_iter: config.max_iter,
            tol: config.tol,
            n_iter_no_change: config.n_iter_no_change,
            seed: config.seed,
        }
    }
}

/// Binary logistic regression trained with plain SGD, L2 penalty and the
/// "optimal" learning-rate schedule `eta = 1 / (alpha * (t0 + t))`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SgdClassifier {
    params: SgdParameters,

    weights: Array1<f64>,

    intercept: f64,

    /// Learning-rate step counter; survives `partial_fit`
    t: f64,

    /// Epochs run since the last `fit`; drives per-epoch shuffling seeds
    epochs_seen: u64,

    trained: bool,
}

impl SgdClassifier {
    pub fn new(params: SgdParameters) -> Self {
        Self {
            params,
            weights: Array1::zeros(0),
            intercept: 0.0,
            t: 1.0,
            epochs_seen: 0,
            trained: false,
        }
    }

    pub fn weights(&self) -> &Array1<f64> {
        &self.weights
    }

    pub fn intercept(&self) -> f64 {
        self.intercept
    }

    pub fn params(&self) -> &SgdParameters {
        &self.params
    }

    /// Raw margin `w . x + b`
    pub fn decision_function(&self, row: &[(usize, f64)]) -> Result<f64> {
        if !self.trained {
            return Err(SentimentError::Training("Model not trained".to_string()));
        }
        let mut z = self.intercept;
        for &(j, value) in row {
            let w = self.weights.get(j).ok_or_else(|| {
                SentimentError::Validation(format!(
                    "Feature index {} out of range for {} weights",
                    j,
                    self.weights.len()
                ))
            })?;
            z += w * value;
        }
        Ok(z)
    }

    fn reset(&mut self, n_features: usize) {
        self.weights = Array1::zeros(n_features);
        self.intercept = 0.0;
        self.t = 1.0;
        self.epochs_seen = 0;
        self.trained = true;
    }

    /// `t0` so that the first step size matches a typical weight magnitude
    fn optimal_init(&self) -> f64 {
        let alpha = self.params.alpha;
        let typw = (1.0 / alpha.sqrt()).sqrt();
        let initial_eta0 = typw / 1f64.max(dloss(-typw, 1.0));
        1.0 / (initial_eta0 * alpha)
    }

    fn check_inputs(&self, features: &SparseMatrix, labels: &[Sentiment]) -> Result<Vec<f64>> {
        if features.n_rows() != labels.len() {
            return Err(SentimentError::Validation(format!(
                "{} feature rows but {} labels",
                features.n_rows(),
                labels.len()
            )));
        }
        if features.n_rows() == 0 {
            return Err(SentimentError::Training(
                "Cannot train on an empty dataset".to_string(),
            ));
        }
        Ok(labels
            .iter()
            .map(|label| match label {
                Sentiment::Positive => 1.0,
                Sentiment::Negative => -1.0,
            })
            .collect())
    }

    /// One shuffled pass; returns the summed loss before each update
    fn run_epoch(&mut self, features: &SparseMatrix, targets: &[f64]) -> f64 {
        let mut order: Vec<usize> = (0..features.n_rows()).collect();
        let mut rng = StdRng::seed_from_u64(self.params.seed.wrapping_add(self.epochs_seen));
        order.shuffle(&mut rng);

        let alpha = self.params.alpha;
        let optimal_init = self.optimal_init();
        let mut wscale = 1.0;
        let mut sumloss = 0.0;

        for i in order {
            let row = features.row(i);
            let y = targets[i];

            let mut z = self.intercept;
            for &(j, value) in row {
                z += self.weights[j] * wscale * value;
            }
            sumloss += loss(z, y);

            let eta = 1.0 / (alpha * (optimal_init + self.t - 1.0));
            let update = -eta * dloss(z, y).clamp(-MAX_DLOSS, MAX_DLOSS);

            wscale *= (1.0 - eta * alpha).max(0.0);
            if update != 0.0 && wscale > 0.0 {
                for &(j, value) in row {
                    self.weights[j] += update * value / wscale;
                }
            }
            self.intercept += update;

            if wscale < MIN_WEIGHT_SCALE {
                self.weights *= wscale;
                wscale = 1.0;
            }
            self.t += 1.0;
        }

        self.weights *= wscale;
        self.epochs_seen += 1;
        sumloss
    }
}

impl Classifier for SgdClassifier {
    fn fit(&mut self, features: &SparseMatrix, labels: &[Sentiment]) -> Result<usize> {
        let targets = self.check_inputs(features, labels)?;
        if !targets.iter().any(|&y| y > 0.0) || !targets.iter().any(|&y| y < 0.0) {
            return Err(SentimentError::Training(
                "Training data must contain both POSITIVE and NEGATIVE examples".to_string(),
            ));
        }

        self.reset(features.n_features());

        let n_samples = features.n_rows() as f64;
        let mut best_loss = f64::INFINITY;
        let mut no_improvement = 0;
        let mut epochs = 0;

        for _ in 0..self.params.max_iter {
            let sumloss = self.run_epoch(features, &targets);
            epochs += 1;

            if sumloss > best_loss - self.params.tol * n_samples {
                no_improvement += 1;
            } else {
                no_improvement = 0;
            }
            if sumloss < best_loss {
                best_loss = sumloss;
            }
            if no_improvement >= self.params.n_iter_no_change {
                debug!(epochs, loss = sumloss / n_samples, "SGD converged");
                break;
            }
        }

        Ok(epochs)
    }

    fn partial_fit(&mut self, features: &SparseMatrix, labels: &[Sentiment]) -> Result<()> {
        let targets = self.check_inputs(features, labels)?;
        if !self.trained {
            self.reset(features.n_features());
        } else if features.n_features() != self.weights.len() {
            return Err(SentimentError::Validation(format!(
                "Expected {} features, got {}",
                self.weights.len(),
                features.n_features()
            )));
        }

        self.run_epoch(features, &targets);
        Ok(())
    }

    fn predict_proba_row(&self, row: &[(usize, f64)]) -> Result<[f64; 2]> {
        let p = sigmoid(self.decision_function(row)?);
        Ok([1.0 - p, p])
    }

    fn is_trained(&self) -> bool {
        self.trained
    }
}

fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

/// Logistic loss `ln(1 + exp(-y z))`
fn loss(z: f64, y: f64) -> f64 {
    let margin = z * y;
    if margin > 18.0 {
        (-margin).exp()
    } else if margin < -18.0 {
        -margin
    } else {
        (-margin).exp().ln_1p()
    }
}

/// Derivative of [`loss`] with respect to `z`
fn dloss(z: f64, y: f64) -> f64 {
    let margin = z * y;
    if margin > 18.0 {
        (-margin).exp() * -y
    } else if margin < -18.0 {
        -y
    } else {
        -y / (margin.exp() + 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Feature 0 fires for positives, feature 1 for negatives
    fn separable(n: usize) -> (SparseMatrix, Vec<Sentiment>) {
        let mut matrix = SparseMatrix::new(3);
        let mut labels = Vec::new();
        for i in 0..n {
            if i % 2 == 0 {
                matrix.push_row(vec![(0, 1.0), (2, 0.1)]).unwrap();
                labels.push(Sentiment::Positive);
            } else {
                matrix.push_row(vec![(1, 1.0), (2, 0.1)]).unwrap();
                labels.push(Sentiment::Negative);
            }
        }
        (matrix, labels)
    }

    #[test]
    fn test_loss_and_gradient() {
        assert!((loss(0.0, 1.0) - 2f64.ln()).abs() < 1e-12);
        assert!((dloss(0.0, 1.0) + 0.5).abs() < 1e-12);
        assert!(loss(100.0, 1.0) < 1e-40);
        assert_eq!(loss(-100.0, 1.0), 100.0);
        assert_eq!(dloss(-100.0, 1.0), -1.0);
    }

    #[test]
    fn test_sigmoid_is_stable() {
        assert_eq!(sigmoid(0.0), 0.5);
        assert!(sigmoid(-800.0) >= 0.0);
        assert!(sigmoid(800.0) <= 1.0);
    }

    #[test]
    fn test_fit_separable_data() {
        let (x, y) = separable(40);
        let mut clf = SgdClassifier::new(SgdParameters::default());
        assert!(!clf.is_trained());

        let epochs = clf.fit(&x, &y).unwrap();
        assert!(epochs >= 1 && epochs <= 1000);
        assert!(clf.is_trained());
        assert_eq!(clf.predict(&x).unwrap(), y);

        let proba = clf.predict_proba_row(&[(0, 1.0)]).unwrap();
        assert!(proba[1] > 0.5);
        assert!((proba[0] + proba[1] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_fit_is_deterministic() {
        let (x, y) = separable(30);
        let mut a = SgdClassifier::new(SgdParameters::default());
        let mut b = SgdClassifier::new(SgdParameters::default());
        a.fit(&x, &y).unwrap();
        b.fit(&x, &y).unwrap();
        assert_eq!(a.weights(), b.weights());
        assert_eq!(a.intercept(), b.intercept());
    }

    #[test]
    fn test_partial_fit_keeps_step_counter() {
        let (x, y) = separable(20);
        let mut clf = SgdClassifier::new(SgdParameters::default());
        clf.fit(&x, &y).unwrap();
        let t_before = clf.t;
        clf.partial_fit(&x, &y).unwrap();
        assert_eq!(clf.t, t_before + 20.0);
        assert_eq!(clf.predict(&x).unwrap(), y);
    }

    #[test]
    fn test_partial_fit_from_scratch() {
        let (x, y) = separable(20);
        let mut clf = SgdClassifier::new(SgdParameters::default());
        clf.partial_fit(&x, &y).unwrap();
        assert!(clf.is_trained());
    }

    #[test]
    fn test_single_class_rejected() {
        let mut x = SparseMatrix::new(1);
        x.push_row(vec![(0, 1.0)]).unwrap();
        x.push_row(vec![(0, 2.0)]).unwrap();
        let mut clf = SgdClassifier::new(SgdParameters::default());
        let err = clf
            .fit(&x, &[Sentiment::Positive, Sentiment::Positive])
            .unwrap_err();
        assert!(matches!(err, SentimentError::Training(_)));
    }

    #[test]
    fn test_predict_before_training_fails() {
        let clf = SgdClassifier::new(SgdParameters::default());
        assert!(clf.predict_proba_row(&[(0, 1.0)]).is_err());
    }

    #[test]
    fn test_feature_count_mismatch() {
        let (x, y) = separable(10);
        let mut clf = SgdClassifier::new(SgdParameters::default());
        clf.fit(&x, &y).unwrap();

        let mut wider = SparseMatrix::new(5);
        wider.push_row(vec![(4, 1.0)]).unwrap();
        assert!(clf.partial_fit(&wider, &[Sentiment::Positive]).is_err());
    }
}
