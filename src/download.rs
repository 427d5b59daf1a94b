// HTTP artifact fetching behind a seam the Java provisioner depends on
//
// Synchronous relative to the caller, bounded by a fixed request timeout,
// no retries: a network failure here propagates up and aborts provisioning
// for the whole run.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use tracing::info;
use url::Url;

use crate::error::{DownloadError, ProvisionError, Result};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Fetches remote artifacts. The Java provisioner is written against this
/// trait so tests can count or fake network calls.
#[async_trait]
pub trait Downloader: Send + Sync {
    /// Download `url` to `dest`, replacing any existing file.
    async fn download(&self, url: &Url, dest: &Path) -> Result<()>;

    /// Fetch `url` into memory (used for detached signature files).
    async fn fetch(&self, url: &Url) -> Result<Vec<u8>>;
}

/// reqwest-backed downloader used outside of tests
pub struct HttpDownloader {
    client: reqwest::Client,
}

impl HttpDownloader {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| {
                ProvisionError::from(DownloadError::RequestFailed {
                    url: String::new(),
                    error: e.to_string(),
                })
            })?;
        Ok(Self { client })
    }

    async fn get(&self, url: &Url) -> Result<Vec<u8>> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| DownloadError::RequestFailed {
                url: url.to_string(),
                error: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(DownloadError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            }
            .into());
        }

        let bytes = response.bytes().await.map_err(|e| DownloadError::RequestFailed {
            url: url.to_string(),
            error: e.to_string(),
        })?;
        Ok(bytes.to_vec())
    }
}

#[async_trait]
impl Downloader for HttpDownloader {
    async fn download(&self, url: &Url, dest: &Path) -> Result<()> {
        info!(url = %url, dest = %dest.display(), "Downloading artifact");
        let bytes = self.get(url).await?;
        tokio::fs::write(dest, &bytes)
            .await
            .map_err(|e| DownloadError::WriteFailed {
                url: url.to_string(),
                path: dest.to_path_buf(),
                error: e.to_string(),
            })?;
        Ok(())
    }

    async fn fetch(&self, url: &Url) -> Result<Vec<u8>> {
        self.get(url).await
    }
}
