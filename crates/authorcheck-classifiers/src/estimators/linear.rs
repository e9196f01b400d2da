//! Linear models: logistic regression and linear SVM
//!
//! Both minimize `||w||^2 / 2 + C * sum(loss)` (intercept unpenalized) by
//! full-batch gradient descent with a fixed `1 / L` step, where `L` bounds the
//! smoothness of the averaged objective.

use super::{sigmoid, BinaryModel};
use authorcheck_core::{Error, Label, Result};
use serde::{Deserialize, Serialize};
use sprs::{CsMat, CsVecView};
use tracing::debug;

/// Stop once the gradient's largest component falls below this
const GRADIENT_TOLERANCE: f64 = 1e-6;

#[derive(Debug, Clone, Copy)]
enum Loss {
    /// `ln(1 + exp(-t f))`
    Logistic,
    /// `max(0, 1 - t f)^2`
    SquaredHinge,
}

impl Loss {
    /// Derivative of the loss with respect to the margin `f`, for target `t` in {-1, 1}
    fn derivative(self, target: f64, margin: f64) -> f64 {
        match self {
            Self::Logistic => -target * sigmoid(-target * margin),
            Self::SquaredHinge => -2.0 * target * (1.0 - target * margin).max(0.0),
        }
    }

    /// Upper bound on the second derivative
    fn smoothness(self) -> f64 {
        match self {
            Self::Logistic => 0.25,
            Self::SquaredHinge => 2.0,
        }
    }
}

/// Weight vector plus intercept
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinearModel {
    weights: Vec<f64>,
    intercept: f64,
}

impl LinearModel {
    /// Signed distance-like score `w . x + b`
    pub fn margin(&self, row: &CsVecView<'_, f64>) -> f64 {
        self.intercept
            + row
                .iter()
                .map(|(col, &value)| self.weights[col] * value)
                .sum::<f64>()
    }

    fn fit(x: &CsMat<f64>, y: &[Label], loss: Loss, c: f64, max_iter: usize) -> Result<Self> {
        if c <= 0.0 || !c.is_finite() {
            return Err(Error::training(format!(
                "regularization strength C must be positive, got {}",
                c
            )));
        }

        let n_samples = y.len() as f64;
        let n_features = x.cols();
        let targets: Vec<f64> = y
            .iter()
            .map(|label| if label.is_ai() { 1.0 } else { -1.0 })
            .collect();

        // +1 accounts for the intercept column
        let max_row_norm_sq = x
            .outer_iterator()
            .map(|row| row.iter().map(|(_, v)| v * v).sum::<f64>())
            .fold(0.0, f64::max)
            + 1.0;
        let lipschitz = 1.0 / n_samples + c * loss.smoothness() * max_row_norm_sq;
        let step = 1.0 / lipschitz;

        let mut model = Self {
            weights: vec![0.0; n_features],
            intercept: 0.0,
        };
        let mut grad_w = vec![0.0; n_features];
        let mut iterations = 0;

        for _ in 0..max_iter {
            iterations += 1;

            for (g, w) in grad_w.iter_mut().zip(&model.weights) {
                *g = w / n_samples;
            }
            let mut grad_b = 0.0;

            for (row, &target) in x.outer_iterator().zip(&targets) {
                let margin = model.margin(&row);
                let d = c / n_samples * loss.derivative(target, margin);
                if d == 0.0 {
                    continue;
                }
                for (col, &value) in row.iter() {
                    grad_w[col] += d * value;
                }
                grad_b += d;
            }

            let largest = grad_w
                .iter()
                .fold(grad_b.abs(), |acc, g| acc.max(g.abs()));
            if largest < GRADIENT_TOLERANCE {
                break;
            }

            for (w, g) in model.weights.iter_mut().zip(&grad_w) {
                *w -= step * g;
            }
            model.intercept -= step * grad_b;
        }

        debug!(?loss, iterations, step, "Linear model fit complete");
        Ok(model)
    }
}

/// L2-regularized logistic regression
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogisticRegression {
    model: LinearModel,
}

impl LogisticRegression {
    pub fn fit(x: &CsMat<f64>, y: &[Label], c: f64, max_iter: usize) -> Result<Self> {
        Ok(Self {
            model: LinearModel::fit(x, y, Loss::Logistic, c, max_iter)?,
        })
    }
}

impl BinaryModel for LogisticRegression {
    fn n_features(&self) -> usize {
        self.model.weights.len()
    }

    fn positive_probability(&self, row: CsVecView<'_, f64>) -> f64 {
        sigmoid(self.model.margin(&row))
    }
}

/// Linear support vector classifier (squared hinge loss)
///
/// The SVM has no calibrated probability; the margin is squashed through the
/// logistic function so that `positive_probability > 0.5` iff the margin is
/// positive.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinearSvc {
    model: LinearModel,
}

impl LinearSvc {
    pub fn fit(x: &CsMat<f64>, y: &[Label], c: f64, max_iter: usize) -> Result<Self> {
        Ok(Self {
            model: LinearModel::fit(x, y, Loss::SquaredHinge, c, max_iter)?,
        })
    }

    /// Raw decision function for one row
    pub fn decision(&self, row: CsVecView<'_, f64>) -> f64 {
        self.model.margin(&row)
    }
}

impl BinaryModel for LinearSvc {
    fn n_features(&self) -> usize {
        self.model.weights.len()
    }

    fn positive_probability(&self, row: CsVecView<'_, f64>) -> f64 {
        sigmoid(self.model.margin(&row))
    }

    fn predict_row(&self, row: CsVecView<'_, f64>) -> Label {
        Label::from(self.model.margin(&row) > 0.0)
    }
}
