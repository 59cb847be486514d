use crate::ml::models::{ClassMetrics, ModelMetrics, Sentiment};
use ndarray::Array2;
use std::collections::HashMap;
use strum::IntoEnumIterator;

/// Probability floor used by [`log_loss`]
pub const LOG_LOSS_EPSILON: f64 = 1e-15;

/// Fraction of matching labels; 0.0 for empty input
pub fn accuracy(y_true: &[Sentiment], y_pred: &[Sentiment]) -> f64 {
    if y_true.is_empty() {
        return 0.0;
    }
    let correct = y_true
        .iter()
        .zip(y_pred.iter())
        .filter(|(t, p)| t == p)
        .count();
    correct as f64 / y_true.len() as f64
}

/// Mean cross-entropy of the true class, probabilities clipped to
/// `[eps, 1 - eps]` and renormalised per row.
pub fn log_loss(y_true: &[Sentiment], probabilities: &[[f64; 2]]) -> f64 {
    if y_true.is_empty() {
        return 0.0;
    }

    let total: f64 = y_true
        .iter()
        .zip(probabilities.iter())
        .map(|(label, row)| {
            let clipped = row.map(|p| p.clamp(LOG_LOSS_EPSILON, 1.0 - LOG_LOSS_EPSILON));
            let norm: f64 = clipped.iter().sum();
            -(clipped[label.index()] / norm).ln()
        })
        .sum();

    total / y_true.len() as f64
}

/// Accuracy plus support-weighted precision, recall and F1.
///
/// Classes without predictions (or without support) score 0.0 instead of
/// producing NaN.
pub fn calculate_metrics(y_true: &[Sentiment], y_pred: &[Sentiment]) -> ModelMetrics {
    let n_samples = y_true.len();
    if n_samples == 0 {
        return ModelMetrics::new();
    }

    let mut confusion = Array2::<usize>::zeros((Sentiment::N_CLASSES, Sentiment::N_CLASSES));
    for (t, p) in y_true.iter().zip(y_pred.iter()) {
        confusion[[t.index(), p.index()]] += 1;
    }

    let mut per_class = HashMap::new();
    let mut weighted_precision = 0.0;
    let mut weighted_recall = 0.0;
    let mut weighted_f1 = 0.0;

    for class in Sentiment::iter() {
        let c = class.index();
        let tp = confusion[[c, c]];
        let fp = confusion.column(c).sum() - tp;
        let fn_count = confusion.row(c).sum() - tp;
        let support = tp + fn_count;

        let precision = if tp + fp > 0 {
            tp as f64 / (tp + fp) as f64
        } else {
            0.0
        };

        let recall = if support > 0 {
            tp as f64 / support as f64
        } else {
            0.0
        };

        let f1 = if precision + recall > 0.0 {
            2.0 * precision * recall / (precision + recall)
        } else {
            0.0
        };

        let weight = support as f64 / n_samples as f64;
        weighted_precision += weight * precision;
        weighted_recall += weight * recall;
        weighted_f1 += weight * f1;

        per_class.insert(
            class.to_string(),
            ClassMetrics {
                precision,
                recall,
                f1_score: f1,
                support,
            },
        );
    }

    ModelMetrics {
        accuracy: accuracy(y_true, y_pred),
        precision: weighted_precision,
        recall: weighted_recall,
        f1_score: weighted_f1,
        confusion_matrix: Some(confusion),
        per_class_metrics: per_class,
    }
}
