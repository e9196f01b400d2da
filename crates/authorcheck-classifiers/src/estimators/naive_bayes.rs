//! Multinomial naive Bayes

use super::{sigmoid, BinaryModel};
use authorcheck_core::{Error, Label, Result};
use serde::{Deserialize, Serialize};
use sprs::{CsMat, CsVecView};
use tracing::debug;

/// Multinomial naive Bayes over non-negative count features
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MultinomialNb {
    /// ln P(class); `-inf` for a class absent from training data
    class_log_prior: [f64; 2],
    /// ln P(feature | class) per class, smoothed
    feature_log_prob: [Vec<f64>; 2],
}

impl MultinomialNb {
    /// Fit with additive (Laplace/Lidstone) smoothing `alpha`
    pub fn fit(x: &CsMat<f64>, y: &[Label], alpha: f64) -> Result<Self> {
        if alpha <= 0.0 || !alpha.is_finite() {
            return Err(Error::training(format!(
                "naive Bayes smoothing must be positive, got {}",
                alpha
            )));
        }

        let n_features = x.cols();
        let mut feature_count = [vec![0.0; n_features], vec![0.0; n_features]];
        let mut class_count = [0usize; 2];

        for (row, label) in x.outer_iterator().zip(y) {
            let class = label.as_index();
            class_count[class] += 1;
            for (col, &value) in row.iter() {
                if value < 0.0 {
                    return Err(Error::training(
                        "naive Bayes requires non-negative features",
                    ));
                }
                feature_count[class][col] += value;
            }
        }

        let n_samples = y.len() as f64;
        let class_log_prior = [
            (class_count[0] as f64 / n_samples).ln(),
            (class_count[1] as f64 / n_samples).ln(),
        ];

        let feature_log_prob = feature_count.map(|counts| {
            let total: f64 = counts.iter().sum::<f64>() + alpha * n_features as f64;
            counts
                .iter()
                .map(|&count| ((count + alpha) / total).ln())
                .collect::<Vec<_>>()
        });

        debug!(
            human = class_count[0],
            ai = class_count[1],
            n_features,
            "Fitted multinomial naive Bayes"
        );

        Ok(Self {
            class_log_prior,
            feature_log_prob,
        })
    }

    fn joint_log_likelihood(&self, row: &CsVecView<'_, f64>, class: usize) -> f64 {
        let log_prob = &self.feature_log_prob[class];
        self.class_log_prior[class]
            + row
                .iter()
                .map(|(col, &value)| value * log_prob[col])
                .sum::<f64>()
    }
}

impl BinaryModel for MultinomialNb {
    fn n_features(&self) -> usize {
        self.feature_log_prob[0].len()
    }

    fn positive_probability(&self, row: CsVecView<'_, f64>) -> f64 {
        let human = self.joint_log_likelihood(&row, 0);
        let ai = self.joint_log_likelihood(&row, 1);
        sigmoid(ai - human)
    }
}
