//! Classifier trait and the artifact-backed authorship classifier

use crate::artifact::TrainedArtifact;
use crate::pipeline::Pipeline;
use async_trait::async_trait;
use authorcheck_core::{normalize, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::time::Instant;
use tracing::info;

/// Scores above this are reported as AI-written
pub const LIKELY_AI_ABOVE: f64 = 75.0;

/// Scores below this are reported as human-written
pub const LIKELY_HUMAN_BELOW: f64 = 30.0;

/// Trait for all authorship classifiers
#[async_trait]
pub trait Classifier: Send + Sync {
    /// Classify the given text
    async fn classify(&self, text: &str) -> Result<ClassificationResult>;

    /// Get the classifier name
    fn name(&self) -> &str;
}

/// Coarse verdict reported to callers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuthorshipLabel {
    #[serde(rename = "Likely AI")]
    LikelyAi,
    #[serde(rename = "Likely Human")]
    LikelyHuman,
    #[serde(rename = "Some AI assistance used")]
    SomeAiAssistance,
}

impl AuthorshipLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LikelyAi => "Likely AI",
            Self::LikelyHuman => "Likely Human",
            Self::SomeAiAssistance => "Some AI assistance used",
        }
    }
}

impl fmt::Display for AuthorshipLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of classification
#[derive(Debug, Clone, PartialEq)]
pub struct ClassificationResult {
    /// Thresholded verdict
    pub label: AuthorshipLabel,

    /// AI probability as a percentage, rounded to 2 decimals
    pub confidence: f64,

    /// Latency in microseconds
    pub latency_us: u64,
}

impl ClassificationResult {
    /// Build a result from a raw AI-class probability
    pub fn from_probability(probability: f64) -> Self {
        let confidence = confidence_score(probability);
        Self {
            label: label_for(confidence),
            confidence,
            latency_us: 0,
        }
    }
}

/// Probability → percentage in `[0, 100]` rounded to 2 decimals
pub fn confidence_score(probability: f64) -> f64 {
    let probability = if probability.is_nan() {
        0.5
    } else {
        probability.clamp(0.0, 1.0)
    };
    (probability * 100.0 * 100.0).round() / 100.0
}

/// Threshold a confidence score. Both bounds are strict.
pub fn label_for(score: f64) -> AuthorshipLabel {
    if score > LIKELY_AI_ABOVE {
        AuthorshipLabel::LikelyAi
    } else if score < LIKELY_HUMAN_BELOW {
        AuthorshipLabel::LikelyHuman
    } else {
        AuthorshipLabel::SomeAiAssistance
    }
}

/// Classifier backed by a trained pipeline
pub struct AuthorshipClassifier {
    name: String,
    pipeline: Pipeline,
}

impl AuthorshipClassifier {
    pub fn new(name: impl Into<String>, pipeline: Pipeline) -> Self {
        Self {
            name: name.into(),
            pipeline,
        }
    }

    /// Load a saved artifact
    pub fn from_artifact(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let artifact = TrainedArtifact::load(path)?;
        info!(
            path = %path.display(),
            algorithm = artifact.algorithm(),
            "Loaded model artifact"
        );
        let name = artifact.algorithm().to_string();
        Ok(Self::new(name, artifact.into_pipeline()))
    }

    /// Synchronous scoring of one raw text
    pub fn score(&self, text: &str) -> Result<ClassificationResult> {
        let start = Instant::now();
        let probability = self.pipeline.positive_probability(&normalize(text))?;
        let mut result = ClassificationResult::from_probability(probability);
        result.latency_us = start.elapsed().as_micros() as u64;

        metrics::counter!("authorcheck_predictions_total", "label" => result.label.as_str())
            .increment(1);
        metrics::histogram!("authorcheck_prediction_latency_us").record(result.latency_us as f64);
        Ok(result)
    }
}

#[async_trait]
impl Classifier for AuthorshipClassifier {
    async fn classify(&self, text: &str) -> Result<ClassificationResult> {
        self.score(text)
    }

    fn name(&self) -> &str {
        &self.name
    }
}
