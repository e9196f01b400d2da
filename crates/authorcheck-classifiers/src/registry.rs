//! The fixed set of algorithms the harness trains and compares

use crate::estimators::EstimatorKind;
use crate::vectorizer::VectorizerKind;
use authorcheck_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// One registered algorithm: its estimator and the features it is fed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlgorithmSpec {
    /// Registry key; also names the artifact file
    pub name: String,

    /// Estimator configuration
    pub estimator: EstimatorKind,

    /// Feature weighting
    pub vectorizer: VectorizerKind,
}

impl AlgorithmSpec {
    pub fn new(name: impl Into<String>, estimator: EstimatorKind, vectorizer: VectorizerKind) -> Self {
        Self {
            name: name.into(),
            estimator,
            vectorizer,
        }
    }
}

/// Ordered, immutable name → spec mapping
///
/// Built once and passed to the harness explicitly. Iteration order is
/// registration order, which is also the order of harness results.
#[derive(Debug, Clone)]
pub struct AlgorithmRegistry {
    specs: Vec<AlgorithmSpec>,
}

impl AlgorithmRegistry {
    /// Build from explicit specs; names must be unique
    pub fn new(specs: Vec<AlgorithmSpec>) -> Result<Self> {
        let mut seen = HashSet::new();
        for spec in &specs {
            if !seen.insert(spec.name.as_str()) {
                return Err(Error::config(format!(
                    "algorithm '{}' registered twice",
                    spec.name
                )));
            }
            if spec.estimator.requires_counts() && spec.vectorizer != VectorizerKind::Count {
                return Err(Error::config(format!(
                    "algorithm '{}' requires the count vectorizer",
                    spec.name
                )));
            }
        }
        Ok(Self { specs })
    }

    /// The five standard algorithms
    ///
    /// Naive Bayes gets raw counts; every other estimator gets TF-IDF.
    pub fn standard() -> Self {
        Self {
            specs: vec![
                AlgorithmSpec::new(
                    "naive_bayes",
                    EstimatorKind::MultinomialNaiveBayes { alpha: 1.0 },
                    VectorizerKind::Count,
                ),
                AlgorithmSpec::new(
                    "logistic_regression",
                    EstimatorKind::LogisticRegression {
                        c: 1.0,
                        max_iter: 1000,
                    },
                    VectorizerKind::Tfidf,
                ),
                AlgorithmSpec::new(
                    "random_forest",
                    EstimatorKind::RandomForest {
                        n_estimators: 100,
                        seed: 42,
                    },
                    VectorizerKind::Tfidf,
                ),
                AlgorithmSpec::new(
                    "gradient_boosting",
                    EstimatorKind::GradientBoosting {
                        n_estimators: 100,
                        learning_rate: 0.1,
                        max_depth: 3,
                        seed: 42,
                    },
                    VectorizerKind::Tfidf,
                ),
                AlgorithmSpec::new(
                    "linear_svc",
                    EstimatorKind::LinearSvc {
                        c: 1.0,
                        max_iter: 1000,
                    },
                    VectorizerKind::Tfidf,
                ),
            ],
        }
    }

    /// Parse a YAML list of specs
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let specs: Vec<AlgorithmSpec> = serde_yaml::from_str(yaml)
            .map_err(|e| Error::config(format!("invalid algorithm registry: {}", e)))?;
        Self::new(specs)
    }

    /// Keep only the named algorithms, preserving registry order.
    /// An empty list keeps everything.
    pub fn filter<S: AsRef<str>>(&self, names: &[S]) -> Result<Self> {
        if names.is_empty() {
            return Ok(self.clone());
        }
        for name in names {
            if self.get(name.as_ref()).is_none() {
                return Err(Error::config(format!(
                    "unknown algorithm '{}'",
                    name.as_ref()
                )));
            }
        }
        let specs = self
            .specs
            .iter()
            .filter(|spec| names.iter().any(|n| n.as_ref() == spec.name))
            .cloned()
            .collect();
        Ok(Self { specs })
    }

    pub fn get(&self, name: &str) -> Option<&AlgorithmSpec> {
        self.specs.iter().find(|spec| spec.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &AlgorithmSpec> {
        self.specs.iter()
    }

    pub fn names(&self) -> Vec<&str> {
        self.specs.iter().map(|spec| spec.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}

impl Default for AlgorithmRegistry {
    fn default() -> Self {
        Self::standard()
    }
}
