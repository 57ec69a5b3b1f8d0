//! Shared HTTP plumbing: the retrying page client and its UA profiles.
//!
//! Boards are fetched with a pooled [`reqwest::Client`] presenting a
//! fixed browser user agent. Requests are retried on transport errors
//! and 5xx responses with exponential backoff; 4xx responses are
//! permanent and surface immediately.

use std::time::Duration;

use serde::de::DeserializeOwned;

use crate::SourceError;

/// Desktop Chrome profile, used by the HTML boards.
pub const DESKTOP_UA: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/122.0.0.0 Safari/537.36";

/// Mobile Chrome profile; some boards serve the lighter mobile markup
/// to this agent and skip the heavier bot checks.
pub const MOBILE_UA: &str = "Mozilla/5.0 (Linux; Android 6.0; Nexus 5 Build/MRA58N) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/135.0.0.0 Mobile Safari/537.36";

/// Retry delays in seconds (exponential backoff: 1s, 2s, 4s).
const RETRY_DELAYS_SECS: [u64; 3] = [1, 2, 4];

/// HTTP request timeout for a single attempt.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// A pooled HTTP client with retry, shared by one source.
pub struct PageClient {
    client: reqwest::Client,
}

impl PageClient {
    /// Client presenting the desktop Chrome profile.
    pub fn desktop() -> Self {
        Self::with_user_agent(DESKTOP_UA)
    }

    /// Client presenting the mobile Chrome profile.
    pub fn mobile() -> Self {
        Self::with_user_agent(MOBILE_UA)
    }

    /// Client with an explicit user agent.
    pub fn with_user_agent(user_agent: &str) -> Self {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(REQUEST_TIMEOUT)
            .gzip(true)
            .build()
            .expect("Failed to build reqwest HTTP client");
        Self { client }
    }

    /// Fetch a page body as text, with retry.
    pub async fn get_html(&self, url: &str) -> Result<String, SourceError> {
        self.get_html_with_headers(url, &[]).await
    }

    /// Fetch a page body as text with extra request headers, with retry.
    pub async fn get_html_with_headers(
        &self,
        url: &str,
        headers: &[(&str, &str)],
    ) -> Result<String, SourceError> {
        let response = self.get_with_retry(url, &[], headers).await?;
        Ok(response.text().await?)
    }

    /// Fetch and deserialize a JSON endpoint, with retry.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
        headers: &[(&str, &str)],
    ) -> Result<T, SourceError> {
        let response = self.get_with_retry(url, query, headers).await?;
        Ok(response.json::<T>().await?)
    }

    async fn get_with_retry(
        &self,
        url: &str,
        query: &[(&str, String)],
        headers: &[(&str, &str)],
    ) -> Result<reqwest::Response, SourceError> {
        let mut last_err: Option<SourceError> = None;

        for (attempt, delay_secs) in RETRY_DELAYS_SECS.iter().enumerate() {
            match self.try_get(url, query, headers).await {
                Ok(response) => return Ok(response),
                Err(SourceError::Status { status, url }) if status < 500 => {
                    return Err(SourceError::Status { status, url });
                }
                Err(e) => {
                    tracing::warn!(
                        attempt = attempt + 1,
                        url,
                        error = %e,
                        "Page fetch attempt failed, retrying"
                    );
                    last_err = Some(e);
                    tokio::time::sleep(Duration::from_secs(*delay_secs)).await;
                }
            }
        }

        match self.try_get(url, query, headers).await {
            Ok(response) => Ok(response),
            Err(e) => Err(last_err.unwrap_or(e)),
        }
    }

    async fn try_get(
        &self,
        url: &str,
        query: &[(&str, String)],
        headers: &[(&str, &str)],
    ) -> Result<reqwest::Response, SourceError> {
        let mut request = self.client.get(url);
        if !query.is_empty() {
            request = request.query(query);
        }
        for (name, value) in headers {
            request = request.header(*name, *value);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        Ok(response)
    }
}

impl Default for PageClient {
    fn default() -> Self {
        Self::desktop()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clients_build_without_panicking() {
        let _desktop = PageClient::desktop();
        let _mobile = PageClient::mobile();
    }

    #[test]
    fn status_error_display_names_url() {
        let err = SourceError::Status {
            status: 429,
            url: "https://example.com/jobs".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Board returned HTTP 429 for https://example.com/jobs"
        );
    }
}
