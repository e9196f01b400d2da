//! Configuration for the training harness and the serving side

use crate::model_loader::{ModelSource, DEFAULT_DRIVE_ENDPOINT};
use authorcheck_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable naming the local artifact to serve
pub const MODEL_PATH_ENV: &str = "MODEL_PATH";

/// Environment variable naming the remote artifact source
pub const MODEL_URL_ENV: &str = "MODEL_URL";

/// Environment variable holding the expected artifact SHA-256
pub const MODEL_SHA256_ENV: &str = "MODEL_SHA256";

fn read_yaml<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)?;
    serde_yaml::from_str(&content)
        .map_err(|e| Error::config(format!("{}: {}", path.display(), e)))
}

/// Harness configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HarnessConfig {
    /// Cleaned dataset CSV
    #[serde(default = "default_data_path")]
    pub data_path: PathBuf,

    /// Directory holding one artifact per algorithm
    #[serde(default = "default_model_dir")]
    pub model_dir: PathBuf,

    /// Where the results table is written
    #[serde(default = "default_results_path")]
    pub results_path: PathBuf,

    /// Held-out fraction
    #[serde(default = "default_test_size")]
    pub test_size: f64,

    /// Split seed
    #[serde(default = "default_seed")]
    pub seed: u64,

    /// Restrict the run to these algorithms (empty = all)
    #[serde(default)]
    pub algorithms: Vec<String>,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            data_path: default_data_path(),
            model_dir: default_model_dir(),
            results_path: default_results_path(),
            test_size: default_test_size(),
            seed: default_seed(),
            algorithms: Vec::new(),
        }
    }
}

impl HarnessConfig {
    /// Parse from YAML
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(|e| Error::config(format!("invalid harness config: {}", e)))
    }

    /// Load from a YAML file, or defaults if it does not exist
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            read_yaml(path)
        } else {
            Ok(Self::default())
        }
    }
}

fn default_data_path() -> PathBuf {
    PathBuf::from("data/cleaned/AI_Human_cleaned.csv")
}

fn default_model_dir() -> PathBuf {
    PathBuf::from("models")
}

fn default_results_path() -> PathBuf {
    PathBuf::from("results/model_results.csv")
}

fn default_test_size() -> f64 {
    0.2
}

fn default_seed() -> u64 {
    42
}

/// Serving configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServingConfig {
    /// Local artifact to load
    #[serde(default = "default_model_path")]
    pub model_path: PathBuf,

    /// Remote source used when `model_path` does not exist
    #[serde(default)]
    pub model_url: Option<String>,

    /// Expected SHA-256 of downloaded artifacts
    #[serde(default)]
    pub model_sha256: Option<String>,

    /// Google Drive download endpoint
    #[serde(default = "default_drive_endpoint")]
    pub drive_endpoint: String,

    /// Listen address
    #[serde(default = "default_listen")]
    pub listen: String,

    /// Origins allowed by CORS
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: Vec<String>,
}

impl Default for ServingConfig {
    fn default() -> Self {
        Self {
            model_path: default_model_path(),
            model_url: None,
            model_sha256: None,
            drive_endpoint: default_drive_endpoint(),
            listen: default_listen(),
            allowed_origins: default_allowed_origins(),
        }
    }
}

impl ServingConfig {
    /// Parse from YAML
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(|e| Error::config(format!("invalid serving config: {}", e)))
    }

    /// Load from a YAML file (defaults if absent), then apply environment overrides
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            read_yaml(path)?
        } else {
            Self::default()
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Override fields from `MODEL_PATH`, `MODEL_URL` and `MODEL_SHA256`.
    /// Empty values are ignored.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(path) = lookup(MODEL_PATH_ENV) {
            self.model_path = PathBuf::from(path);
        }
        if let Some(url) = lookup(MODEL_URL_ENV) {
            self.model_url = Some(url);
        }
        if let Some(digest) = lookup(MODEL_SHA256_ENV) {
            self.model_sha256 = Some(digest);
        }
    }

    /// The configured remote source, parsed. `None` when no URL is set.
    pub fn model_source(&self) -> Result<Option<ModelSource>> {
        self.model_url.as_deref().map(ModelSource::parse).transpose()
    }
}

fn default_model_path() -> PathBuf {
    PathBuf::from("models/naive_bayes.bin")
}

fn default_drive_endpoint() -> String {
    DEFAULT_DRIVE_ENDPOINT.to_string()
}

fn default_listen() -> String {
    "0.0.0.0:8000".to_string()
}

fn default_allowed_origins() -> Vec<String> {
    vec![
        "https://outlook.office.com".to_string(),
        "https://outlook.office365.com".to_string(),
        "http://localhost:8000".to_string(),
    ]
}
