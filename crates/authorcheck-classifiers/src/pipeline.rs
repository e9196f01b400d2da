//! Vectorizer → estimator pipelines
//!
//! A pipeline is fit once on training text and then used unchanged for
//! evaluation and serving. It is the unit that gets persisted as an artifact.

use crate::estimators::FittedEstimator;
use crate::registry::AlgorithmSpec;
use crate::vectorizer::{TextVectorizer, VectorizerKind, VectorizerParams};
use authorcheck_core::{Error, Label, Result};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::debug;

/// A fitted text vectorizer followed by a fitted estimator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pipeline {
    vectorizer: TextVectorizer,
    estimator: FittedEstimator,
}

impl Pipeline {
    /// Fit the vectorizer chosen by `spec`, then the estimator on its output
    pub fn fit<T: AsRef<str>>(spec: &AlgorithmSpec, texts: &[T], labels: &[Label]) -> Result<Self> {
        if texts.len() != labels.len() {
            return Err(Error::training(format!(
                "{} texts but {} labels",
                texts.len(),
                labels.len()
            )));
        }
        if spec.estimator.requires_counts() && spec.vectorizer != VectorizerKind::Count {
            return Err(Error::config(format!(
                "algorithm '{}' requires count features",
                spec.name
            )));
        }

        let start = Instant::now();
        let (vectorizer, features) =
            TextVectorizer::fit_transform(spec.vectorizer, VectorizerParams::default(), texts);
        let estimator = spec.estimator.fit(&features, labels)?;

        debug!(
            algorithm = %spec.name,
            vocab_size = vectorizer.num_features(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Pipeline fit complete"
        );

        Ok(Self {
            vectorizer,
            estimator,
        })
    }

    /// Hard labels for each text
    pub fn predict<T: AsRef<str>>(&self, texts: &[T]) -> Result<Vec<Label>> {
        self.estimator.predict(&self.vectorizer.transform(texts))
    }

    /// AI-class probability for each text
    pub fn predict_proba<T: AsRef<str>>(&self, texts: &[T]) -> Result<Vec<f64>> {
        self.estimator.predict_proba(&self.vectorizer.transform(texts))
    }

    /// AI-class probability for a single text
    pub fn positive_probability(&self, text: &str) -> Result<f64> {
        let probabilities = self.predict_proba(&[text])?;
        probabilities
            .into_iter()
            .next()
            .ok_or_else(|| Error::training("pipeline returned no probability"))
    }

    pub fn vectorizer(&self) -> &TextVectorizer {
        &self.vectorizer
    }

    pub fn estimator(&self) -> &FittedEstimator {
        &self.estimator
    }
}
