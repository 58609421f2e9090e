//! Remote content retrieval for assets declared with an `http(s)://` or
//! protocol-relative `//` reference.
//!
//! Fetching is a single blocking GET with a bounded connect timeout and no
//! retry: a failed fetch is terminal for that content request and the caller
//! degrades (skips the asset from a bundle, or links the remote URL
//! directly).

use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Connect timeout applied to every remote fetch.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("request to {url} failed: {message}")]
    Transport { url: String, message: String },
    #[error("request to {url} returned HTTP {status}")]
    Status { url: String, status: u16 },
}

/// Source of remote asset contents.
pub trait RemoteFetcher {
    /// Fetch `url` as text, giving up on connecting after `connect_timeout`.
    fn fetch(&self, url: &str, connect_timeout: Duration) -> Result<String, FetchError>;
}

/// Blocking HTTP fetcher backed by `reqwest`.
#[derive(Debug, Default, Clone, Copy)]
pub struct HttpFetcher;

impl RemoteFetcher for HttpFetcher {
    fn fetch(&self, url: &str, connect_timeout: Duration) -> Result<String, FetchError> {
        let target = absolute_url(url);
        debug!(url = %target, "fetching remote asset");

        let transport = |e: reqwest::Error| FetchError::Transport {
            url: target.clone(),
            message: e.to_string(),
        };
        let client = reqwest::blocking::Client::builder()
            .connect_timeout(connect_timeout)
            .build()
            .map_err(transport)?;
        let response = client.get(&target).send().map_err(transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: target.clone(),
                status: status.as_u16(),
            });
        }
        response.text().map_err(transport)
    }
}

/// Protocol-relative URLs are fetched over https.
pub fn absolute_url(url: &str) -> String {
    if url.starts_with("//") {
        format!("https:{url}")
    } else {
        url.to_string()
    }
}
