//! Report retrieval.
//!
//! [`ReportSource`] is the seam the scheduler fetches through; the
//! production implementation is [`HttpReportFetcher`], one HTTP GET per
//! call with no internal retry.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::FetchError;

/// Something that yields the raw report text.
#[async_trait]
pub trait ReportSource: Send + Sync + std::fmt::Debug {
    /// Retrieves the current report body.
    ///
    /// # Errors
    ///
    /// Returns a [`FetchError`] on transport failure or non-success status.
    async fn fetch(&self) -> Result<String, FetchError>;
}

/// Fetches the report over HTTP with a shared `reqwest` client.
#[derive(Debug, Clone)]
pub struct HttpReportFetcher {
    client: reqwest::Client,
    url: String,
}

impl HttpReportFetcher {
    /// Creates a fetcher for `url` with a per-request `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Transport`] if the HTTP client cannot be built.
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!(
                env!("CARGO_PKG_NAME"),
                "/",
                env!("CARGO_PKG_VERSION")
            ))
            .build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }

    /// Configured report URL.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl ReportSource for HttpReportFetcher {
    async fn fetch(&self) -> Result<String, FetchError> {
        let response = self.client.get(&self.url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }
        Ok(response.text().await?)
    }
}
