//! Trained artifact storage
//!
//! An artifact is one fitted [`Pipeline`] bound to the algorithm name it was
//! trained for, encoded with bincode at `{model_dir}/{name}.bin`. Writes go
//! through a temporary file in the same directory and are renamed into place,
//! so readers never observe a partial artifact.

use crate::pipeline::Pipeline;
use authorcheck_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::debug;

/// File extension of serialized artifacts
pub const ARTIFACT_EXTENSION: &str = "bin";

/// Bumped whenever the encoded layout changes
pub const FORMAT_VERSION: u32 = 1;

/// Where the artifact for `name` lives inside `model_dir`
pub fn artifact_path(model_dir: impl AsRef<Path>, name: &str) -> PathBuf {
    model_dir
        .as_ref()
        .join(format!("{}.{}", name, ARTIFACT_EXTENSION))
}

/// A persisted pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainedArtifact {
    format_version: u32,
    algorithm: String,
    pipeline: Pipeline,
}

impl TrainedArtifact {
    pub fn new(algorithm: impl Into<String>, pipeline: Pipeline) -> Self {
        Self {
            format_version: FORMAT_VERSION,
            algorithm: algorithm.into(),
            pipeline,
        }
    }

    /// Name of the algorithm this artifact was trained for
    pub fn algorithm(&self) -> &str {
        &self.algorithm
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    pub fn into_pipeline(self) -> Pipeline {
        self.pipeline
    }

    /// Encode to bytes
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        bincode::serde::encode_to_vec(self, bincode::config::standard())
            .map_err(|e| Error::artifact(format!("failed to encode artifact: {}", e)))
    }

    /// Decode from bytes, rejecting other format versions
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let (artifact, _): (Self, usize) =
            bincode::serde::decode_from_slice(bytes, bincode::config::standard())
                .map_err(|e| Error::artifact(format!("failed to decode artifact: {}", e)))?;

        if artifact.format_version != FORMAT_VERSION {
            return Err(Error::artifact(format!(
                "unsupported artifact format version {} (expected {})",
                artifact.format_version, FORMAT_VERSION
            )));
        }
        Ok(artifact)
    }

    /// Atomically write to `path`, replacing any existing artifact
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir)?;

        let bytes = self.to_bytes()?;
        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(&bytes)?;
        tmp.as_file().sync_all()?;
        tmp.persist(path).map_err(|e| Error::Io(e.error))?;

        debug!(path = %path.display(), bytes = bytes.len(), "Saved artifact");
        Ok(())
    }

    /// Read and decode the artifact at `path`
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)?;
        Self::from_bytes(&bytes).map_err(|e| match e {
            Error::Artifact(msg) => Error::artifact(format!("{}: {}", path.display(), msg)),
            other => other,
        })
    }
}
