//! Tree ensembles: random forest and gradient boosting

use super::tree::{mean_target, MaxFeatures, RegressionTree, TreeBuilder, TreeParams};
use super::{sigmoid, BinaryModel};
use authorcheck_core::{Error, Label, Result};
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use sprs::{CsMat, CsVecView};
use tracing::debug;

/// Clamp applied to probabilities before taking a logit
const PROBABILITY_CLAMP: f64 = 1e-15;

/// Floor for the Newton-step denominator
const MIN_HESSIAN: f64 = 1e-12;

fn binary_targets(y: &[Label]) -> Vec<f64> {
    y.iter().map(|label| if label.is_ai() { 1.0 } else { 0.0 }).collect()
}

/// Bootstrap-aggregated trees grown on random feature subsets
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomForest {
    trees: Vec<RegressionTree>,
    n_features: usize,
}

impl RandomForest {
    pub fn fit(x: &CsMat<f64>, y: &[Label], n_estimators: usize, seed: u64) -> Result<Self> {
        if n_estimators == 0 {
            return Err(Error::training("random forest needs at least one tree"));
        }

        let targets = binary_targets(y);
        let columns = x.to_csc();
        let params = TreeParams {
            max_features: MaxFeatures::Sqrt,
            ..Default::default()
        };
        let mut builder = TreeBuilder::new(x, &columns, &targets, &params);

        let n_samples = y.len();
        let mut master = StdRng::seed_from_u64(seed);
        let mut trees = Vec::with_capacity(n_estimators);

        for _ in 0..n_estimators {
            let mut rng = StdRng::seed_from_u64(master.gen());
            let bootstrap: Vec<usize> = (0..n_samples).map(|_| rng.gen_range(0..n_samples)).collect();
            trees.push(builder.build(&bootstrap, &mut rng, |s| mean_target(s, &targets)));
        }

        debug!(
            n_estimators,
            mean_leaves = trees.iter().map(|t| t.num_leaves()).sum::<usize>() as f64
                / n_estimators as f64,
            "Random forest fit complete"
        );

        Ok(Self {
            trees,
            n_features: x.cols(),
        })
    }
}

impl BinaryModel for RandomForest {
    fn n_features(&self) -> usize {
        self.n_features
    }

    /// Mean of the trees' leaf class fractions
    fn positive_probability(&self, row: CsVecView<'_, f64>) -> f64 {
        let total: f64 = self.trees.iter().map(|tree| tree.predict(&row)).sum();
        total / self.trees.len() as f64
    }
}

/// Additive log-odds model of shallow regression trees
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradientBoosting {
    /// Log-odds of the training prior
    init: f64,
    learning_rate: f64,
    trees: Vec<RegressionTree>,
    n_features: usize,
}

impl GradientBoosting {
    pub fn fit(
        x: &CsMat<f64>,
        y: &[Label],
        n_estimators: usize,
        learning_rate: f64,
        max_depth: usize,
        seed: u64,
    ) -> Result<Self> {
        if learning_rate <= 0.0 || !learning_rate.is_finite() {
            return Err(Error::training(format!(
                "learning rate must be positive, got {}",
                learning_rate
            )));
        }

        let targets = binary_targets(y);
        let n_samples = targets.len();
        let prior = (targets.iter().sum::<f64>() / n_samples as f64)
            .clamp(PROBABILITY_CLAMP, 1.0 - PROBABILITY_CLAMP);
        let init = (prior / (1.0 - prior)).ln();

        let columns = x.to_csc();
        let params = TreeParams {
            max_depth: Some(max_depth),
            max_features: MaxFeatures::All,
            ..Default::default()
        };
        let samples: Vec<usize> = (0..n_samples).collect();
        let mut rng = StdRng::seed_from_u64(seed);

        let mut raw = vec![init; n_samples];
        let mut residuals = vec![0.0; n_samples];
        let mut hessians = vec![0.0; n_samples];
        let mut trees = Vec::with_capacity(n_estimators);

        for _ in 0..n_estimators {
            for i in 0..n_samples {
                let p = sigmoid(raw[i]);
                residuals[i] = targets[i] - p;
                hessians[i] = p * (1.0 - p);
            }

            let tree = {
                let mut builder = TreeBuilder::new(x, &columns, &residuals, &params);
                builder.build(&samples, &mut rng, |leaf| {
                    let numerator: f64 = leaf.iter().map(|&s| residuals[s]).sum();
                    let denominator: f64 = leaf.iter().map(|&s| hessians[s]).sum();
                    if denominator < MIN_HESSIAN {
                        0.0
                    } else {
                        numerator / denominator
                    }
                })
            };

            for (i, row) in x.outer_iterator().enumerate() {
                raw[i] += learning_rate * tree.predict(&row);
            }
            trees.push(tree);
        }

        debug!(n_estimators, learning_rate, max_depth, "Gradient boosting fit complete");

        Ok(Self {
            init,
            learning_rate,
            trees,
            n_features: x.cols(),
        })
    }
}

impl BinaryModel for GradientBoosting {
    fn n_features(&self) -> usize {
        self.n_features
    }

    fn positive_probability(&self, row: CsVecView<'_, f64>) -> f64 {
        let boost: f64 = self.trees.iter().map(|tree| tree.predict(&row)).sum();
        sigmoid(self.init + self.learning_rate * boost)
    }
}
