//! Multi-algorithm training and evaluation harness
//!
//! For every registered algorithm the harness either reuses the artifact
//! already in the model directory or fits a fresh pipeline and saves it, then
//! scores it on the same held-out split. Latency covers obtaining a ready
//! pipeline (cache check plus load or fit), so cached runs report near zero.

use crate::artifact::{artifact_path, TrainedArtifact};
use crate::config::HarnessConfig;
use crate::dataset::{load_dataset, train_test_split, DatasetSplit};
use crate::evaluation::{accuracy, weighted_f1};
use crate::pipeline::Pipeline;
use crate::registry::{AlgorithmRegistry, AlgorithmSpec};
use authorcheck_core::{Error, EvaluationResult, Label, Result};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::info;

/// Round to two decimal places
fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Trains or reuses one pipeline per algorithm and scores them
pub struct Harness {
    registry: AlgorithmRegistry,
    model_dir: PathBuf,
}

impl Harness {
    pub fn new(registry: AlgorithmRegistry, model_dir: impl Into<PathBuf>) -> Self {
        Self {
            registry,
            model_dir: model_dir.into(),
        }
    }

    /// Evaluate every algorithm on `split`, in registry order.
    ///
    /// The first failing algorithm aborts the run.
    pub fn evaluate(&self, split: &DatasetSplit) -> Result<Vec<EvaluationResult>> {
        std::fs::create_dir_all(&self.model_dir)?;

        let train_texts = split.train_texts();
        let train_labels = split.train_labels();
        let test_texts = split.test_texts();
        let test_labels = split.test_labels();

        let mut results = Vec::with_capacity(self.registry.len());
        for spec in self.registry.iter() {
            let start = Instant::now();
            let (pipeline, retrained) = self.obtain(spec, &train_texts, &train_labels)?;
            let latency = start.elapsed().as_secs_f64();

            let predicted = pipeline.predict(&test_texts)?;
            let result = EvaluationResult {
                model: spec.name.clone(),
                accuracy: accuracy(&test_labels, &predicted)?,
                f1_score: weighted_f1(&test_labels, &predicted)?,
                latency_sec: round2(latency),
                retrained,
            };

            info!(
                model = %result.model,
                accuracy = result.accuracy,
                f1_score = result.f1_score,
                latency_sec = result.latency_sec,
                retrained,
                "Evaluated model"
            );
            results.push(result);
        }

        Ok(results)
    }

    /// Load the cached artifact for `spec`, or fit and save a new one
    fn obtain(
        &self,
        spec: &AlgorithmSpec,
        texts: &[&str],
        labels: &[Label],
    ) -> Result<(Pipeline, bool)> {
        let path = artifact_path(&self.model_dir, &spec.name);

        if path.exists() {
            info!(model = %spec.name, path = %path.display(), "Artifact exists, loading instead of training");
            let artifact = TrainedArtifact::load(&path)?;
            if artifact.algorithm() != spec.name {
                return Err(Error::artifact(format!(
                    "{} holds a '{}' artifact, expected '{}'",
                    path.display(),
                    artifact.algorithm(),
                    spec.name
                )));
            }
            metrics::counter!("authorcheck_artifacts_reused_total").increment(1);
            return Ok((artifact.into_pipeline(), false));
        }

        info!(model = %spec.name, "Training model");
        let pipeline = Pipeline::fit(spec, texts, labels)?;
        let artifact = TrainedArtifact::new(spec.name.clone(), pipeline);
        artifact.save(&path)?;
        info!(model = %spec.name, path = %path.display(), "Saved model");
        metrics::counter!("authorcheck_artifacts_trained_total").increment(1);

        Ok((artifact.into_pipeline(), true))
    }
}

/// Full harness run: load the dataset, split, evaluate, write the results table
pub fn run(config: &HarnessConfig, registry: &AlgorithmRegistry) -> Result<Vec<EvaluationResult>> {
    if !config.data_path.is_file() {
        return Err(Error::config(format!(
            "dataset not found at {}",
            config.data_path.display()
        )));
    }
    let registry = registry.filter(&config.algorithms)?;

    info!(path = %config.data_path.display(), "Loading dataset");
    let examples = load_dataset(&config.data_path)?;
    let split = train_test_split(&examples, config.test_size, config.seed)?;

    let results = Harness::new(registry, &config.model_dir).evaluate(&split)?;
    write_results(&config.results_path, &results)?;
    info!(path = %config.results_path.display(), "Model evaluation results saved");

    Ok(results)
}

/// Write results as CSV with columns `model,accuracy,f1_score,latency_sec,retrained`
pub fn write_results(path: impl AsRef<Path>, results: &[EvaluationResult]) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let mut writer = csv::Writer::from_path(path)
        .map_err(|e| Error::dataset(format!("{}: {}", path.display(), e)))?;
    for result in results {
        writer
            .serialize(result)
            .map_err(|e| Error::dataset(format!("{}: {}", path.display(), e)))?;
    }
    writer.flush()?;
    Ok(())
}
