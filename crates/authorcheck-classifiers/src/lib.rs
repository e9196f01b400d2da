//! authorcheck Classifiers
//!
//! Everything between a labeled dataset and a served prediction:
//! - Word n-gram count and TF-IDF vectorizers over sparse matrices
//! - Classical binary estimators (naive Bayes, logistic regression, random
//!   forest, gradient boosting, linear SVM)
//! - The algorithm registry and the cache-aware training/evaluation harness
//! - Artifact persistence and on-demand acquisition of remote artifacts
//! - The [`Classifier`] trait used by the server

pub mod artifact;
pub mod classifier;
pub mod config;
pub mod dataset;
pub mod estimators;
pub mod evaluation;
pub mod harness;
pub mod model_loader;
pub mod pipeline;
pub mod registry;
pub mod vectorizer;

pub use artifact::{artifact_path, TrainedArtifact, ARTIFACT_EXTENSION};
pub use classifier::{
    confidence_score, label_for, AuthorshipClassifier, AuthorshipLabel, ClassificationResult,
    Classifier,
};
pub use config::{HarnessConfig, ServingConfig};
pub use dataset::{clean_dataset, load_dataset, train_test_split, CleaningReport, DatasetSplit};
pub use estimators::{EstimatorKind, FittedEstimator};
pub use harness::{write_results, Harness};
pub use model_loader::{ModelFetcher, ModelSource};
pub use pipeline::Pipeline;
pub use registry::{AlgorithmRegistry, AlgorithmSpec};
pub use vectorizer::{TextVectorizer, VectorizerKind, VectorizerParams};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::classifier::{AuthorshipClassifier, ClassificationResult, Classifier};
    pub use crate::config::{HarnessConfig, ServingConfig};
    pub use crate::harness::Harness;
    pub use crate::model_loader::{ModelFetcher, ModelSource};
    pub use crate::registry::{AlgorithmRegistry, AlgorithmSpec};
}
