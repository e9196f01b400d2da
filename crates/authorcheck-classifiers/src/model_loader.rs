//! Artifact acquisition
//!
//! Makes sure a serialized model exists at a local path before the server
//! loads it, downloading it on demand from one of two kinds of source:
//!
//! - **Direct**: a single GET whose body is the artifact
//! - **Google Drive**: large files are served behind a virus-scan warning
//!   page; the first response sets a `download_warning*` cookie whose value
//!   must be echoed back as `confirm=<token>` to get the real bytes
//!
//! Bytes are streamed into a temporary file next to the destination and
//! renamed into place only once the whole body has been written (and, if a
//! digest is configured, verified). A failed attempt leaves no file behind.

use authorcheck_core::{Error, Result};
use futures_util::StreamExt;
use sha2::{Digest, Sha256};
use std::fmt;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tempfile::NamedTempFile;
use tracing::{debug, info};
use url::Url;

/// Default Google Drive download endpoint
pub const DEFAULT_DRIVE_ENDPOINT: &str = "https://docs.google.com/uc";

/// Prefix of the cookie carrying the confirmation token
pub const WARNING_COOKIE_PREFIX: &str = "download_warning";

/// Buffer size used while writing the response body to disk
const WRITE_CHUNK_SIZE: usize = 32 * 1024;

const DRIVE_HOSTS: [&str; 3] = [
    "drive.google.com",
    "docs.google.com",
    "drive.usercontent.google.com",
];

/// Where a model artifact can be downloaded from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelSource {
    /// Plain HTTP(S) URL serving the artifact bytes
    Direct { url: Url },

    /// Google Drive file, downloaded through the confirmation-token handshake
    GoogleDrive { file_id: String },
}

impl ModelSource {
    /// Classify a configured URL.
    ///
    /// Drive URLs are recognized by host; the file id is taken from a
    /// `/file/d/<id>` path or an `id=` query parameter. A Drive URL without
    /// either is a parse error. Every other http(s) URL is direct.
    pub fn parse(raw: &str) -> Result<Self> {
        let url = Url::parse(raw.trim())
            .map_err(|e| Error::config(format!("invalid model URL '{}': {}", raw, e)))?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(Error::config(format!(
                "unsupported model URL scheme '{}'",
                url.scheme()
            )));
        }

        let is_drive = url
            .host_str()
            .is_some_and(|host| DRIVE_HOSTS.contains(&host));
        if !is_drive {
            return Ok(Self::Direct { url });
        }

        drive_file_id(&url)
            .map(|file_id| Self::GoogleDrive { file_id })
            .ok_or_else(|| Error::parse(format!("no Google Drive file id in '{}'", raw)))
    }

    /// Short name used in logs and metrics
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Direct { .. } => "direct",
            Self::GoogleDrive { .. } => "google_drive",
        }
    }
}

impl FromStr for ModelSource {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for ModelSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Direct { url } => write!(f, "{}", url),
            Self::GoogleDrive { file_id } => write!(f, "gdrive:{}", file_id),
        }
    }
}

fn drive_file_id(url: &Url) -> Option<String> {
    if let Some(mut segments) = url.path_segments() {
        while let Some(segment) = segments.next() {
            if segment == "d" {
                if let Some(id) = segments.next().filter(|id| !id.is_empty()) {
                    return Some(id.to_string());
                }
            }
        }
    }

    url.query_pairs()
        .find(|(key, value)| key == "id" && !value.is_empty())
        .map(|(_, value)| value.into_owned())
}

/// Value of the first cookie whose name starts with [`WARNING_COOKIE_PREFIX`]
pub fn confirm_token<'a, I>(cookies: I) -> Option<String>
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    cookies
        .into_iter()
        .find(|(name, _)| name.starts_with(WARNING_COOKIE_PREFIX))
        .map(|(_, value)| value.to_string())
}

/// Downloads artifacts into place
#[derive(Debug, Clone)]
pub struct ModelFetcher {
    client: reqwest::Client,
    drive_endpoint: String,
    expected_sha256: Option<String>,
}

impl ModelFetcher {
    /// Create a fetcher with a cookie-aware client and the public Drive endpoint
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .cookie_store(true)
            .build()
            .map_err(|e| Error::transport(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            drive_endpoint: DEFAULT_DRIVE_ENDPOINT.to_string(),
            expected_sha256: None,
        })
    }

    /// Override the Drive endpoint (tests point this at a local server)
    pub fn with_drive_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.drive_endpoint = endpoint.into();
        self
    }

    /// Verify freshly downloaded bytes against a hex SHA-256 digest
    pub fn with_sha256(mut self, digest: Option<String>) -> Self {
        self.expected_sha256 = digest.map(|d| d.trim().to_ascii_lowercase());
        self
    }

    /// Make sure `dest` exists, downloading from `source` if it does not.
    ///
    /// An existing file is trusted as-is. Returns `true` if a download happened.
    pub async fn ensure(&self, dest: impl AsRef<Path>, source: Option<&ModelSource>) -> Result<bool> {
        let dest = dest.as_ref();
        if dest.is_file() {
            debug!(path = %dest.display(), "Model artifact already present");
            return Ok(false);
        }

        let source = source.ok_or_else(|| {
            Error::config(format!(
                "model not found at {} and no MODEL_URL is configured",
                dest.display()
            ))
        })?;

        self.download(source, dest).await?;
        Ok(true)
    }

    /// Like [`ensure`](Self::ensure), but takes the configured URL as text.
    ///
    /// The URL is only parsed when a download is actually needed, so a bad
    /// URL does not matter while the artifact is already on disk.
    pub async fn ensure_url(&self, dest: impl AsRef<Path>, url: Option<&str>) -> Result<bool> {
        let dest = dest.as_ref();
        if dest.is_file() {
            debug!(path = %dest.display(), "Model artifact already present");
            return Ok(false);
        }

        let source = url.map(ModelSource::parse).transpose()?;
        self.ensure(dest, source.as_ref()).await
    }

    /// Download `source` to `dest` unconditionally
    pub async fn download(&self, source: &ModelSource, dest: &Path) -> Result<()> {
        info!(source = %source, path = %dest.display(), "Downloading model artifact");

        let response = match source {
            ModelSource::Direct { url } => self.fetch(url.as_str()).await?,
            ModelSource::GoogleDrive { file_id } => self.fetch_drive(file_id).await?,
        };

        let written = write_atomically(response, dest, self.expected_sha256.as_deref()).await?;

        metrics::counter!("authorcheck_downloads_total", "source" => source.kind()).increment(1);
        info!(path = %dest.display(), bytes = written, "Model artifact downloaded");
        Ok(())
    }

    async fn fetch(&self, url: &str) -> Result<reqwest::Response> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| Error::transport(format!("request to {} failed: {}", url, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::http(status.as_u16(), url));
        }
        Ok(response)
    }

    async fn fetch_drive(&self, file_id: &str) -> Result<reqwest::Response> {
        let url = self.drive_url(file_id, None)?;
        let response = self.fetch(url.as_str()).await?;

        let cookies: Vec<(String, String)> = response
            .cookies()
            .map(|c| (c.name().to_string(), c.value().to_string()))
            .collect();
        let token = confirm_token(cookies.iter().map(|(name, value)| (name.as_str(), value.as_str())));
        match token {
            Some(token) => {
                debug!(file_id, "Drive returned a download warning, confirming");
                let confirmed = self.drive_url(file_id, Some(&token))?;
                self.fetch(confirmed.as_str()).await
            }
            None => Ok(response),
        }
    }

    fn drive_url(&self, file_id: &str, confirm: Option<&str>) -> Result<Url> {
        let mut url = Url::parse(&self.drive_endpoint).map_err(|e| {
            Error::config(format!(
                "invalid Drive endpoint '{}': {}",
                self.drive_endpoint, e
            ))
        })?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("export", "download");
            query.append_pair("id", file_id);
            if let Some(token) = confirm {
                query.append_pair("confirm", token);
            }
        }
        Ok(url)
    }
}

/// Stream `response` into a temp file beside `dest`, then rename into place
async fn write_atomically(
    response: reqwest::Response,
    dest: &Path,
    expected_sha256: Option<&str>,
) -> Result<u64> {
    let dir = destination_dir(dest);
    std::fs::create_dir_all(&dir)?;

    let tmp = NamedTempFile::new_in(&dir)?;
    let mut writer = BufWriter::with_capacity(WRITE_CHUNK_SIZE, tmp);
    let mut hasher = Sha256::new();
    let mut written = 0u64;

    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk =
            chunk.map_err(|e| Error::transport(format!("error while reading body: {}", e)))?;
        // keep-alive
        if chunk.is_empty() {
            continue;
        }
        hasher.update(&chunk);
        writer.write_all(&chunk)?;
        written += chunk.len() as u64;
    }

    let tmp = writer.into_inner().map_err(|e| Error::Io(e.into_error()))?;
    tmp.as_file().sync_all()?;

    if let Some(expected) = expected_sha256 {
        let actual = format!("{:x}", hasher.finalize());
        if actual != expected {
            return Err(Error::Integrity {
                expected: expected.to_string(),
                actual,
            });
        }
    }

    tmp.persist(dest).map_err(|e| Error::Io(e.error))?;
    Ok(written)
}

fn destination_dir(dest: &Path) -> PathBuf {
    match dest.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}
