//! Icon resolution for export.
//!
//! The live scene references building icons by href. Export has to inline
//! them as `data:` URIs before rasterizing, so icons are fetched through an
//! injected [`IconSource`]: files on disk for the CLI, HTTP for hosted
//! assets, or a stub in tests.

#[cfg(test)]
#[path = "icons_test.rs"]
mod icons_test;

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;

const REQUEST_TIMEOUT_SECS: u64 = 30;
const CONNECT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, thiserror::Error)]
pub enum IconError {
    /// The icon could not be read from disk.
    #[error("icon read failed for {href}: {source}")]
    Io { href: String, source: std::io::Error },

    /// The HTTP request for the icon failed.
    #[error("icon request failed for {href}: {message}")]
    Request { href: String, message: String },

    /// The icon host returned a non-success status.
    #[error("icon response error for {href}: status {status}")]
    Status { href: String, status: u16 },

    /// The href escapes the icon directory.
    #[error("icon href rejected: {0}")]
    InvalidHref(String),

    /// The underlying HTTP client could not be constructed.
    #[error("HTTP client build failed: {0}")]
    HttpClientBuild(String),
}

// =============================================================================
// ICON SOURCE TRAIT
// =============================================================================

/// Fetches raw icon bytes by href. Enables mocking in tests.
#[async_trait::async_trait]
pub trait IconSource: Send + Sync {
    /// Load the bytes behind `href`.
    ///
    /// # Errors
    ///
    /// Returns an [`IconError`] if the icon is missing or unreachable.
    async fn fetch(&self, href: &str) -> Result<Vec<u8>, IconError>;
}

/// Reads icons relative to a base directory. Absolute hrefs are taken as is.
#[derive(Debug, Clone)]
pub struct FsIconSource {
    root: PathBuf,
}

impl FsIconSource {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, href: &str) -> Result<PathBuf, IconError> {
        let path = PathBuf::from(href);
        if path.is_absolute() {
            return Ok(path);
        }
        if path.components().any(|c| matches!(c, std::path::Component::ParentDir)) {
            return Err(IconError::InvalidHref(href.to_owned()));
        }
        if path.starts_with(&self.root) {
            return Ok(path);
        }
        Ok(self.root.join(path))
    }
}

#[async_trait::async_trait]
impl IconSource for FsIconSource {
    async fn fetch(&self, href: &str) -> Result<Vec<u8>, IconError> {
        let path = self.resolve(href)?;
        tokio::fs::read(&path).await.map_err(|source| IconError::Io { href: href.to_owned(), source })
    }
}

/// Fetches icons over HTTP(S).
pub struct HttpIconSource {
    http: reqwest::Client,
}

impl HttpIconSource {
    /// Build a client with the default timeouts.
    ///
    /// # Errors
    ///
    /// Returns [`IconError::HttpClientBuild`] if the TLS backend fails to
    /// initialize.
    pub fn new() -> Result<Self, IconError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .build()
            .map_err(|e| IconError::HttpClientBuild(e.to_string()))?;
        Ok(Self { http })
    }
}

#[async_trait::async_trait]
impl IconSource for HttpIconSource {
    async fn fetch(&self, href: &str) -> Result<Vec<u8>, IconError> {
        let response = self
            .http
            .get(href)
            .send()
            .await
            .map_err(|e| IconError::Request { href: href.to_owned(), message: e.to_string() })?;

        let status = response.status().as_u16();
        if !response.status().is_success() {
            return Err(IconError::Status { href: href.to_owned(), status });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| IconError::Request { href: href.to_owned(), message: e.to_string() })?;
        Ok(bytes.to_vec())
    }
}

// =============================================================================
// EMBEDDING
// =============================================================================

/// MIME type guessed from the href's extension.
#[must_use]
pub fn mime_for(href: &str) -> &'static str {
    let path = href.split(['?', '#']).next().unwrap_or(href);
    let ext = path.rsplit('.').next().unwrap_or("").to_ascii_lowercase();
    match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        _ => "image/png",
    }
}

/// Inline `bytes` as a base64 `data:` URI.
#[must_use]
pub fn to_data_uri(href: &str, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", mime_for(href), STANDARD.encode(bytes))
}

/// Fetch every href concurrently. Returns `href -> data URI` for the icons
/// that loaded; failures are logged and left out.
pub async fn embed_all(source: &dyn IconSource, hrefs: &[String]) -> HashMap<String, String> {
    let fetches = hrefs.iter().map(|href| async move { (href, source.fetch(href).await) });
    let results = futures::future::join_all(fetches).await;

    let mut embedded = HashMap::with_capacity(results.len());
    for (href, result) in results {
        match result {
            Ok(bytes) => {
                embedded.insert(href.clone(), to_data_uri(href, &bytes));
            }
            Err(e) => tracing::warn!(error = %e, href = %href, "icon fetch failed; skipping"),
        }
    }
    tracing::debug!(requested = hrefs.len(), embedded = embedded.len(), "icons embedded");
    embedded
}
