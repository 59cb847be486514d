use crate::error::{Result, SentimentError};
use crate::ml::models::{Sentiment, TrainingExample};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::debug;

/// Read newline-delimited `{"text", "label"}` records.
///
/// Blank lines are skipped. The first bad line aborts the whole load with its
/// 1-based line number.
pub fn load_training_data(path: impl AsRef<Path>) -> Result<Vec<TrainingExample>> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(SentimentError::DataFileMissing(path.to_path_buf()));
    }

    let content = fs::read_to_string(path)?;
    let mut examples = Vec::new();

    for (index, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let example: TrainingExample =
            serde_json::from_str(line).map_err(|e| SentimentError::MalformedTrainingRecord {
                line: index + 1,
                reason: e.to_string(),
            })?;
        examples.push(example);
    }

    debug!(path = %path.display(), records = examples.len(), "Loaded training data");
    Ok(examples)
}

/// Count examples per label
pub fn class_distribution(examples: &[TrainingExample]) -> BTreeMap<Sentiment, usize> {
    let mut distribution = BTreeMap::new();
    for example in examples {
        *distribution.entry(example.label).or_insert(0) += 1;
    }
    distribution
}

/// Train / validation / test partitions
#[derive(Debug, Clone, Default)]
pub struct DatasetSplit {
    pub train: Vec<TrainingExample>,
    pub validation: Vec<TrainingExample>,
    pub test: Vec<TrainingExample>,
}

impl DatasetSplit {
    /// Carve off `test_size` for test, then `validation_size` of the rest for
    /// validation. Both cuts are stratified by label.
    pub fn new(
        examples: Vec<TrainingExample>,
        test_size: f64,
        validation_size: f64,
        seed: u64,
    ) -> Result<Self> {
        let distribution = class_distribution(&examples);
        if distribution.len() < Sentiment::N_CLASSES {
            return Err(SentimentError::Training(format!(
                "Training data must contain both classes, found {:?}",
                distribution
            )));
        }

        let mut rng = StdRng::seed_from_u64(seed);
        let (rest, test) = stratified_split(examples, test_size, &mut rng)?;
        let (train, validation) = stratified_split(rest, validation_size, &mut rng)?;

        if class_distribution(&train).len() < Sentiment::N_CLASSES {
            return Err(SentimentError::Training(
                "Training split does not contain both classes".to_string(),
            ));
        }

        Ok(Self {
            train,
            validation,
            test,
        })
    }

    pub fn texts(examples: &[TrainingExample]) -> Vec<&str> {
        examples.iter().map(|e| e.text.as_str()).collect()
    }

    pub fn labels(examples: &[TrainingExample]) -> Vec<Sentiment> {
        examples.iter().map(|e| e.label).collect()
    }
}

/// Split off `ceil(fraction * n)` examples, allocated to classes in
/// proportion to their counts by largest remainder. Every class with more
/// than one example keeps at least one on the larger side.
fn stratified_split(
    examples: Vec<TrainingExample>,
    fraction: f64,
    rng: &mut StdRng,
) -> Result<(Vec<TrainingExample>, Vec<TrainingExample>)> {
    let n = examples.len();
    if n < 2 {
        return Err(SentimentError::Training(format!(
            "Need at least 2 examples to split, got {}",
            n
        )));
    }

    let n_held_out = ((fraction * n as f64).ceil() as usize).clamp(1, n - 1);

    let mut groups: BTreeMap<Sentiment, Vec<TrainingExample>> = BTreeMap::new();
    for example in examples {
        groups.entry(example.label).or_default().push(example);
    }

    // floor of each class's share, then hand out the rest by largest remainder
    let mut allocation: BTreeMap<Sentiment, usize> = BTreeMap::new();
    let mut remainders = Vec::new();
    for (label, group) in &groups {
        let exact = n_held_out as f64 * group.len() as f64 / n as f64;
        allocation.insert(*label, exact.floor() as usize);
        remainders.push((*label, exact - exact.floor()));
    }
    let allocated: usize = allocation.values().sum();
    remainders.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
    for (label, _) in remainders.into_iter().take(n_held_out.saturating_sub(allocated)) {
        if let Some(count) = allocation.get_mut(&label) {
            *count += 1;
        }
    }

    let mut kept = Vec::with_capacity(n - n_held_out);
    let mut held_out = Vec::with_capacity(n_held_out);
    for (label, mut group) in groups {
        group.shuffle(rng);
        let mut take = allocation.get(&label).copied().unwrap_or(0);
        if group.len() > 1 {
            take = take.min(group.len() - 1);
        }
        let rest = group.split_off(take.min(group.len()));
        held_out.extend(group);
        kept.extend(rest);
    }

    kept.shuffle(rng);
    held_out.shuffle(rng);
    Ok((kept, held_out))
}
