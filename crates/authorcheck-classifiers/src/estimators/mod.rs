//! Classical binary estimators over sparse text features
//!
//! Each estimator is configured by an [`EstimatorKind`] and fit into a
//! [`FittedEstimator`], which is what gets serialized inside an artifact.

mod ensemble;
mod linear;
mod naive_bayes;
mod tree;

pub use ensemble::{GradientBoosting, RandomForest};
pub use linear::{LinearSvc, LogisticRegression};
pub use naive_bayes::MultinomialNb;
pub use tree::{MaxFeatures, RegressionTree, TreeParams};

use authorcheck_core::{Error, Label, Result};
use serde::{Deserialize, Serialize};
use sprs::{CsMat, CsVecView};

/// Estimator configuration, as registered for an algorithm
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EstimatorKind {
    /// Multinomial naive Bayes with additive smoothing
    MultinomialNaiveBayes { alpha: f64 },

    /// L2-regularized logistic regression
    LogisticRegression { c: f64, max_iter: usize },

    /// Bagged, feature-subsampled decision trees
    RandomForest { n_estimators: usize, seed: u64 },

    /// Log-loss gradient boosted regression trees
    GradientBoosting {
        n_estimators: usize,
        learning_rate: f64,
        max_depth: usize,
        seed: u64,
    },

    /// L2-regularized linear SVM with squared hinge loss
    LinearSvc { c: f64, max_iter: usize },
}

impl EstimatorKind {
    /// Short identifier used in logs
    pub fn label(&self) -> &'static str {
        match self {
            Self::MultinomialNaiveBayes { .. } => "multinomial_nb",
            Self::LogisticRegression { .. } => "logistic_regression",
            Self::RandomForest { .. } => "random_forest",
            Self::GradientBoosting { .. } => "gradient_boosting",
            Self::LinearSvc { .. } => "linear_svc",
        }
    }

    /// Whether the estimator requires non-negative (count) features
    pub fn requires_counts(&self) -> bool {
        matches!(self, Self::MultinomialNaiveBayes { .. })
    }

    /// Fit on a CSR feature matrix and matching labels
    pub fn fit(&self, x: &CsMat<f64>, y: &[Label]) -> Result<FittedEstimator> {
        validate_training_input(x, y)?;

        let fitted = match *self {
            Self::MultinomialNaiveBayes { alpha } => {
                FittedEstimator::NaiveBayes(MultinomialNb::fit(x, y, alpha)?)
            }
            Self::LogisticRegression { c, max_iter } => {
                FittedEstimator::LogisticRegression(LogisticRegression::fit(x, y, c, max_iter)?)
            }
            Self::RandomForest { n_estimators, seed } => {
                FittedEstimator::RandomForest(RandomForest::fit(x, y, n_estimators, seed)?)
            }
            Self::GradientBoosting {
                n_estimators,
                learning_rate,
                max_depth,
                seed,
            } => FittedEstimator::GradientBoosting(GradientBoosting::fit(
                x,
                y,
                n_estimators,
                learning_rate,
                max_depth,
                seed,
            )?),
            Self::LinearSvc { c, max_iter } => {
                FittedEstimator::LinearSvc(LinearSvc::fit(x, y, c, max_iter)?)
            }
        };

        Ok(fitted)
    }
}

/// Common behaviour of fitted binary models
pub trait BinaryModel {
    /// Number of feature columns seen during fitting
    fn n_features(&self) -> usize;

    /// Probability that the row belongs to the AI-generated class
    fn positive_probability(&self, row: CsVecView<'_, f64>) -> f64;

    /// Hard prediction for one row
    fn predict_row(&self, row: CsVecView<'_, f64>) -> Label {
        Label::from(self.positive_probability(row) > 0.5)
    }
}

/// A fitted estimator of any supported kind
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum FittedEstimator {
    NaiveBayes(MultinomialNb),
    LogisticRegression(LogisticRegression),
    RandomForest(RandomForest),
    GradientBoosting(GradientBoosting),
    LinearSvc(LinearSvc),
}

impl FittedEstimator {
    fn model(&self) -> &dyn BinaryModel {
        match self {
            Self::NaiveBayes(m) => m,
            Self::LogisticRegression(m) => m,
            Self::RandomForest(m) => m,
            Self::GradientBoosting(m) => m,
            Self::LinearSvc(m) => m,
        }
    }

    /// Hard predictions, one per row
    pub fn predict(&self, x: &CsMat<f64>) -> Result<Vec<Label>> {
        self.check_shape(x)?;
        let model = self.model();
        Ok(x.outer_iterator().map(|row| model.predict_row(row)).collect())
    }

    /// AI-class probabilities, one per row
    pub fn predict_proba(&self, x: &CsMat<f64>) -> Result<Vec<f64>> {
        self.check_shape(x)?;
        let model = self.model();
        Ok(x
            .outer_iterator()
            .map(|row| model.positive_probability(row))
            .collect())
    }

    /// Number of feature columns the estimator expects
    pub fn n_features(&self) -> usize {
        self.model().n_features()
    }

    fn check_shape(&self, x: &CsMat<f64>) -> Result<()> {
        if !x.is_csr() {
            return Err(Error::training("feature matrix must be in CSR layout"));
        }
        let expected = self.n_features();
        if x.cols() != expected {
            return Err(Error::training(format!(
                "shape mismatch: estimator was fit on {} features, got {}",
                expected,
                x.cols()
            )));
        }
        Ok(())
    }
}

fn validate_training_input(x: &CsMat<f64>, y: &[Label]) -> Result<()> {
    if y.is_empty() {
        return Err(Error::training("cannot fit on an empty training set"));
    }
    if !x.is_csr() {
        return Err(Error::training("feature matrix must be in CSR layout"));
    }
    if x.rows() != y.len() {
        return Err(Error::training(format!(
            "feature matrix has {} rows but {} labels were given",
            x.rows(),
            y.len()
        )));
    }
    Ok(())
}

/// Numerically stable logistic function
pub(crate) fn sigmoid(z: f64) -> f64 {
    if z.is_nan() {
        0.5
    } else if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::{csr, separable};
    use super::*;

    fn all_kinds() -> Vec<EstimatorKind> {
        vec![
            EstimatorKind::MultinomialNaiveBayes { alpha: 1.0 },
            EstimatorKind::LogisticRegression {
                c: 1.0,
                max_iter: 1000,
            },
            EstimatorKind::RandomForest {
                n_estimators: 100,
                seed: 42,
            },
            EstimatorKind::GradientBoosting {
                n_estimators: 50,
                learning_rate: 0.1,
                max_depth: 3,
                seed: 42,
            },
            EstimatorKind::LinearSvc {
                c: 1.0,
                max_iter: 1000,
            },
        ]
    }

    #[test]
    fn test_every_kind_separates_clusters() {
        let (x, y) = separable();
        for kind in all_kinds() {
            let fitted = kind.fit(&x, &y).unwrap();
            let predicted = fitted.predict(&x).unwrap();
            assert_eq!(predicted, y, "{} misclassified training data", kind.label());

            for p in fitted.predict_proba(&x).unwrap() {
                assert!((0.0..=1.0).contains(&p));
            }
        }
    }

    #[test]
    fn test_rejects_mismatched_labels() {
        let (x, _) = separable();
        let err = EstimatorKind::LinearSvc {
            c: 1.0,
            max_iter: 10,
        }
        .fit(&x, &[Label::Ai])
        .unwrap_err();
        assert!(matches!(err, Error::Training(_)));
    }

    #[test]
    fn test_rejects_empty_training_set() {
        let x = csr(&[]);
        let err = EstimatorKind::MultinomialNaiveBayes { alpha: 1.0 }
            .fit(&x, &[])
            .unwrap_err();
        assert!(matches!(err, Error::Training(_)));
    }

    #[test]
    fn test_prediction_shape_mismatch() {
        let (x, y) = separable();
        let fitted = EstimatorKind::MultinomialNaiveBayes { alpha: 1.0 }
            .fit(&x, &y)
            .unwrap();
        let wrong = csr(&[&[1.0, 0.0]]);
        assert!(matches!(fitted.predict(&wrong), Err(Error::Training(_))));
    }

    #[test]
    fn test_single_class_training() {
        let x = csr(&[&[1.0, 0.0], &[0.0, 2.0]]);
        let y = vec![Label::Ai, Label::Ai];
        for kind in all_kinds() {
            let fitted = kind.fit(&x, &y).unwrap();
            let predicted = fitted.predict(&x).unwrap();
            assert_eq!(predicted, y, "{} failed on a single-class set", kind.label());
        }
    }

    #[test]
    fn test_sigmoid_extremes() {
        assert_eq!(sigmoid(f64::INFINITY), 1.0);
        assert_eq!(sigmoid(f64::NEG_INFINITY), 0.0);
        assert_eq!(sigmoid(0.0), 0.5);
        assert_eq!(sigmoid(f64::NAN), 0.5);
    }
}
