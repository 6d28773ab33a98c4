use crate::signal::Label;
use anyhow::Result;
use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};
use std::collections::BTreeSet;

/// Seam for an external model: anything that can be trained on and score
/// feature matrices.
pub trait Classifier {
    fn fit(&mut self, features: &[Vec<f64>], labels: &[Label]) -> Result<()>;
    fn predict(&self, features: &[Vec<f64>]) -> Result<Vec<Label>>;

    /// Mean accuracy on the given data.
    fn score(&self, features: &[Vec<f64>], labels: &[Label]) -> Result<f64> {
        let predicted = self.predict(features)?;
        accuracy(&predicted, labels)
    }
}

pub fn accuracy(predicted: &[Label], truth: &[Label]) -> Result<f64> {
    if predicted.len() != truth.len() {
        anyhow::bail!(
            "{} predictions for {} labels",
            predicted.len(),
            truth.len()
        );
    }
    if truth.is_empty() {
        return Ok(0.0);
    }
    let hits = predicted.iter().zip(truth).filter(|(p, t)| p == t).count();
    Ok(hits as f64 / truth.len() as f64)
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Split {
    pub train_x: Vec<Vec<f64>>,
    pub train_y: Vec<Label>,
    pub test_x: Vec<Vec<f64>>,
    pub test_y: Vec<Label>,
}

impl Split {
    fn push_train(&mut self, x: &[f64], y: Label) {
        self.train_x.push(x.to_vec());
        self.train_y.push(y);
    }
    fn push_test(&mut self, x: &[f64], y: Label) {
        self.test_x.push(x.to_vec());
        self.test_y.push(y);
    }
}

fn check_inputs(x: &[Vec<f64>], y: &[Label], test_ratio: f64) -> Result<()> {
    if x.len() != y.len() {
        anyhow::bail!("{} feature rows for {} labels", x.len(), y.len());
    }
    if !(0.0..=1.0).contains(&test_ratio) {
        anyhow::bail!("test ratio must be within [0, 1], got {}", test_ratio);
    }
    Ok(())
}

/// Per label, keep the first rows for training and hold out the trailing
/// `floor(n * test_ratio)`. Row order within a label is preserved, which keeps
/// time-adjacent windows on the same side of the split.
pub fn split_per_label(x: &[Vec<f64>], y: &[Label], test_ratio: f64) -> Result<Split> {
    check_inputs(x, y, test_ratio)?;
    let mut split = Split::default();
    for label in y.iter().copied().collect::<BTreeSet<_>>() {
        let rows: Vec<usize> = (0..y.len()).filter(|&i| y[i] == label).collect();
        let n_test = (rows.len() as f64 * test_ratio) as usize;
        let n_train = rows.len() - n_test;
        for (k, &i) in rows.iter().enumerate() {
            if k < n_train {
                split.push_train(&x[i], label);
            } else {
                split.push_test(&x[i], label);
            }
        }
    }
    Ok(split)
}

/// Seeded random split holding out `ceil(n * test_ratio)` rows.
pub fn split_shuffled(x: &[Vec<f64>], y: &[Label], test_ratio: f64, seed: u64) -> Result<Split> {
    check_inputs(x, y, test_ratio)?;
    let mut order: Vec<usize> = (0..y.len()).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    order.shuffle(&mut rng);
    let n_test = (y.len() as f64 * test_ratio).ceil() as usize;
    let mut split = Split::default();
    for (k, &i) in order.iter().enumerate() {
        if k < n_test {
            split.push_test(&x[i], y[i]);
        } else {
            split.push_train(&x[i], y[i]);
        }
    }
    Ok(split)
}

/// Keep `positive` and map every other label to 0.
pub fn one_vs_rest(labels: &[Label], positive: Label) -> Vec<Label> {
    labels
        .iter()
        .map(|&l| if l == positive { positive } else { 0 })
        .collect()
}

/// For each distinct non-zero label, train the classifier to separate it from
/// the rest and score it on a per-label held-out tail.
pub fn leave_one_out_scores<C: Classifier>(
    classifier: &mut C,
    x: &[Vec<f64>],
    y: &[Label],
    test_ratio: f64,
) -> Result<Vec<(Label, f64)>> {
    check_inputs(x, y, test_ratio)?;
    let labels: BTreeSet<Label> = y.iter().copied().filter(|&l| l != 0).collect();
    let mut scores = Vec::with_capacity(labels.len());
    for label in labels {
        let relabeled = one_vs_rest(y, label);
        let split = split_per_label(x, &relabeled, test_ratio)?;
        classifier.fit(&split.train_x, &split.train_y)?;
        let score = classifier.score(&split.test_x, &split.test_y)?;
        log::debug!("one-vs-rest label {}: score {:.3}", label, score);
        scores.push((label, score));
    }
    Ok(scores)
}
