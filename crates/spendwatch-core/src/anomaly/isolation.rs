use rand::{rngs::StdRng, seq::index, Rng, SeedableRng};
use tracing::debug;

use super::DetectorSettings;
use crate::{stats::quantile, CancelToken, CoreError};

const EULER_GAMMA: f64 = 0.577_215_664_901_532_9;

/// Expected path length of an unsuccessful search in a random binary search tree
/// built from `n` points; normalises isolation depths.
pub fn average_path_length(n: usize) -> f64 {
    match n {
        0 | 1 => 0.0,
        2 => 1.0,
        _ => {
            let n = n as f64;
            2.0 * ((n - 1.0).ln() + EULER_GAMMA) - 2.0 * (n - 1.0) / n
        }
    }
}

#[derive(Debug, Clone)]
enum Node {
    Leaf {
        size: usize,
    },
    Split {
        threshold: f64,
        left: usize,
        right: usize,
    },
}

/// One random partitioning tree, stored as an arena of nodes rooted at index 0.
#[derive(Debug, Clone)]
struct IsolationTree {
    nodes: Vec<Node>,
}

impl IsolationTree {
    fn grow(sample: &mut [f64], max_depth: usize, rng: &mut StdRng) -> Self {
        let mut nodes = Vec::with_capacity(sample.len() * 2);
        Self::grow_node(&mut nodes, sample, 0, max_depth, rng);
        Self { nodes }
    }

    fn grow_node(
        nodes: &mut Vec<Node>,
        values: &mut [f64],
        depth: usize,
        max_depth: usize,
        rng: &mut StdRng,
    ) -> usize {
        let index = nodes.len();
        nodes.push(Node::Leaf { size: values.len() });
        if depth >= max_depth || values.len() <= 1 {
            return index;
        }

        let (min, max) = values
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
                (lo.min(v), hi.max(v))
            });
        if max <= min {
            return index;
        }

        let threshold = rng.gen_range(min..max);
        let split = partition(values, threshold);
        let (left_values, right_values) = values.split_at_mut(split);
        let left = Self::grow_node(nodes, left_values, depth + 1, max_depth, rng);
        let right = Self::grow_node(nodes, right_values, depth + 1, max_depth, rng);
        nodes[index] = Node::Split {
            threshold,
            left,
            right,
        };
        index
    }

    /// Depth at which `value` lands in a leaf, plus the expected remaining depth
    /// for the points that leaf still holds.
    fn path_length(&self, value: f64) -> f64 {
        let mut index = 0;
        let mut depth = 0usize;
        loop {
            match self.nodes[index] {
                Node::Leaf { size } => return depth as f64 + average_path_length(size),
                Node::Split {
                    threshold,
                    left,
                    right,
                } => {
                    index = if value <= threshold { left } else { right };
                    depth += 1;
                }
            }
        }
    }
}

/// Moves values `<= threshold` to the front and returns how many there are.
fn partition(values: &mut [f64], threshold: f64) -> usize {
    let mut split = 0;
    for i in 0..values.len() {
        if values[i] <= threshold {
            values.swap(i, split);
            split += 1;
        }
    }
    split
}

/// Builds isolation ensembles over one-dimensional amounts.
#[derive(Debug, Clone, Default)]
pub struct IsolationForest {
    settings: DetectorSettings,
}

impl IsolationForest {
    pub fn new(settings: DetectorSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &DetectorSettings {
        &self.settings
    }

    pub fn fit(&self, amounts: &[f64]) -> Result<FittedEnsemble, CoreError> {
        self.fit_with_cancel(amounts, &CancelToken::new())
    }

    /// Trains a fresh ensemble and derives the decision boundary from the
    /// training scores. The token is checked between trees.
    pub fn fit_with_cancel(
        &self,
        amounts: &[f64],
        token: &CancelToken,
    ) -> Result<FittedEnsemble, CoreError> {
        self.settings.validate()?;
        if amounts.len() < 2 {
            return Err(CoreError::InsufficientData {
                required: 2,
                found: amounts.len(),
            });
        }
        if let Some(bad) = amounts.iter().find(|value| !value.is_finite()) {
            return Err(CoreError::Validation(format!(
                "cannot score non-finite amount {bad}"
            )));
        }

        let sample_size = self.settings.max_samples.min(amounts.len());
        let max_depth = (sample_size as f64).log2().ceil() as usize;
        let mut rng = StdRng::seed_from_u64(self.settings.seed);

        let mut trees = Vec::with_capacity(self.settings.n_trees);
        for _ in 0..self.settings.n_trees {
            token.check()?;
            let mut sample: Vec<f64> = index::sample(&mut rng, amounts.len(), sample_size)
                .into_iter()
                .map(|i| amounts[i])
                .collect();
            trees.push(IsolationTree::grow(&mut sample, max_depth, &mut rng));
        }

        let mut ensemble = FittedEnsemble {
            trees,
            normalizer: average_path_length(sample_size),
            threshold: 0.0,
            training_size: amounts.len(),
        };
        let scores: Vec<f64> = amounts.iter().map(|&amount| ensemble.score(amount)).collect();
        ensemble.threshold = quantile(&scores, 1.0 - self.settings.contamination);

        debug!(
            trees = ensemble.trees.len(),
            sample_size,
            threshold = ensemble.threshold,
            "isolation ensemble trained"
        );
        Ok(ensemble)
    }
}

/// A trained ensemble together with its data-dependent decision boundary.
#[derive(Debug, Clone)]
pub struct FittedEnsemble {
    trees: Vec<IsolationTree>,
    normalizer: f64,
    threshold: f64,
    training_size: usize,
}

impl FittedEnsemble {
    /// Isolation score `2^(-mean_path / c(psi))`: close to 1 is anomalous, around
    /// 0.5 is typical.
    pub fn score(&self, amount: f64) -> f64 {
        let total: f64 = self.trees.iter().map(|tree| tree.path_length(amount)).sum();
        let mean_path = total / self.trees.len() as f64;
        2f64.powf(-mean_path / self.normalizer)
    }

    /// Scores strictly above the boundary are anomalous.
    pub fn is_anomalous(&self, amount: f64) -> bool {
        self.score(amount) > self.threshold
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn tree_count(&self) -> usize {
        self.trees.len()
    }

    pub fn training_size(&self) -> usize {
        self.training_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn typical_amounts() -> Vec<f64> {
        (0..40).map(|i| 200.0 + (i % 10) as f64 * 15.0).collect()
    }

    #[test]
    fn average_path_length_matches_closed_form() {
        assert_eq!(average_path_length(0), 0.0);
        assert_eq!(average_path_length(1), 0.0);
        assert_eq!(average_path_length(2), 1.0);
        let c256 = average_path_length(256);
        assert!((c256 - 10.2448).abs() < 1e-3, "c(256) = {c256}");
    }

    #[test]
    fn partition_splits_around_threshold() {
        let mut values = [5.0, 1.0, 4.0, 2.0, 3.0];
        let split = partition(&mut values, 2.5);
        assert_eq!(split, 2);
        assert!(values[..split].iter().all(|&v| v <= 2.5));
        assert!(values[split..].iter().all(|&v| v > 2.5));
    }

    #[test]
    fn outlier_scores_higher_than_typical_points() {
        let mut amounts = typical_amounts();
        amounts.push(9_000.0);
        let ensemble = IsolationForest::default().fit(&amounts).unwrap();

        let outlier = ensemble.score(9_000.0);
        let typical = ensemble.score(260.0);
        assert!(outlier > typical, "outlier {outlier} vs typical {typical}");
        assert!(outlier > 0.6);
        assert!(ensemble.is_anomalous(9_000.0));
        assert!(!ensemble.is_anomalous(260.0));
    }

    #[test]
    fn same_seed_gives_identical_scores() {
        let amounts = typical_amounts();
        let forest = IsolationForest::default();
        let first = forest.fit(&amounts).unwrap();
        let second = forest.fit(&amounts).unwrap();
        for amount in [150.0, 260.0, 1_000.0] {
            assert_eq!(first.score(amount), second.score(amount));
        }
        assert_eq!(first.threshold(), second.threshold());
    }

    #[test]
    fn constant_amounts_score_uniformly() {
        let amounts = vec![50.0; 20];
        let ensemble = IsolationForest::default().fit(&amounts).unwrap();
        assert!(!ensemble.is_anomalous(50.0));
        assert_eq!(ensemble.training_size(), 20);
    }

    #[test]
    fn cancelled_token_aborts_training() {
        let token = CancelToken::new();
        token.cancel();
        let err = IsolationForest::default()
            .fit_with_cancel(&typical_amounts(), &token)
            .unwrap_err();
        assert!(matches!(err, CoreError::Cancelled));
    }

    #[test]
    fn rejects_non_finite_amounts() {
        let mut amounts = typical_amounts();
        amounts.push(f64::NAN);
        assert!(matches!(
            IsolationForest::default().fit(&amounts),
            Err(CoreError::Validation(_))
        ));
    }
}
