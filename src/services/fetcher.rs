//! Report content fetching from a hosted repository or a local directory.
//!
//! Remote sources are rewritten to their raw-content host and read from the
//! `main` branch. A failed remote request is retried once after a fixed
//! delay; local reads are never retried.

use std::future::Future;
use std::path::Path;
use std::time::Duration;

use reqwest::StatusCode;

use crate::errors::FetchError;

/// Host of repository pages.
pub const REPOSITORY_HOST: &str = "github.com";

/// Host serving raw file content.
pub const RAW_CONTENT_HOST: &str = "raw.githubusercontent.com";

/// Branch report files are read from.
pub const CONTENT_BRANCH: &str = "main";

/// Total attempts for a remote fetch, first try included.
pub const MAX_FETCH_ATTEMPTS: u32 = 2;

/// Delay before the retry of a failed remote fetch.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(1);

/// Resolves a (source, file name) pair to the file's full contents.
pub trait Fetch: Send + Sync {
    fn fetch(
        &self,
        source: &str,
        file_name: &str,
    ) -> impl Future<Output = Result<Vec<u8>, FetchError>> + Send;
}

/// Whether `source` names a remote repository rather than a local path.
pub fn is_remote(source: &str) -> bool {
    source.starts_with("http")
}

/// Raw-content URL of `file_name` in the repository at `source`.
pub fn raw_content_url(source: &str, file_name: &str) -> String {
    let base = source.replacen(REPOSITORY_HOST, RAW_CONTENT_HOST, 1);
    format!(
        "{}/{CONTENT_BRANCH}/{file_name}",
        base.trim_end_matches('/')
    )
}

/// Fetcher backed by an HTTP client and the local filesystem.
#[derive(Debug, Clone)]
pub struct ContentFetcher {
    client: reqwest::Client,
    retry_delay: Duration,
}

impl ContentFetcher {
    pub fn new(client: reqwest::Client, retry_delay: Duration) -> Self {
        Self {
            client,
            retry_delay,
        }
    }

    async fn fetch_remote(&self, source: &str, file_name: &str) -> Result<Vec<u8>, FetchError> {
        let url = raw_content_url(source, file_name);
        let mut attempt = 1;

        loop {
            let failure = match self.client.get(&url).send().await {
                Ok(response) if response.status() == StatusCode::OK => {
                    let body = response.bytes().await.map_err(|source| FetchError::Body {
                        file: file_name.to_string(),
                        source,
                    })?;
                    tracing::debug!(file = %file_name, url = %url, bytes = body.len(), "Fetched remote file");
                    return Ok(body.to_vec());
                }
                Ok(response) => FetchError::Status {
                    file: file_name.to_string(),
                    attempts: attempt,
                    status: response.status().as_u16(),
                },
                Err(source) => FetchError::Transport {
                    file: file_name.to_string(),
                    attempts: attempt,
                    source,
                },
            };

            if attempt >= MAX_FETCH_ATTEMPTS {
                return Err(failure);
            }

            tracing::warn!(file = %file_name, attempt, error = %failure, "Remote fetch failed, retrying");
            tokio::time::sleep(self.retry_delay).await;
            attempt += 1;
        }
    }

    async fn fetch_local(&self, source: &str, file_name: &str) -> Result<Vec<u8>, FetchError> {
        let path = Path::new(source).join(file_name);
        tokio::fs::read(&path)
            .await
            .map_err(|source| FetchError::Local {
                file: file_name.to_string(),
                source,
            })
    }
}

impl Fetch for ContentFetcher {
    async fn fetch(&self, source: &str, file_name: &str) -> Result<Vec<u8>, FetchError> {
        if is_remote(source) {
            self.fetch_remote(source, file_name).await
        } else {
            self.fetch_local(source, file_name).await
        }
    }
}
