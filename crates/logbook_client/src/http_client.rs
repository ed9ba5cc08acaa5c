//! HTTP client implementation for the logbook results API.
//!
//! This module provides a reqwest-based implementation of the [`PageFetcher`](crate::PageFetcher) trait.

use crate::config::Config;
use crate::utils::body_snippet;
use crate::{FetchResult, LogbookError, PageFetcher, Record};
use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest::header::ACCEPT;
use secrecy::{ExposeSecret, SecretString};
use std::time::Duration;

/// Client for the logbook results API using reqwest.
#[derive(Clone, Debug)]
pub struct ReqwestLogbookClient {
    accept: String,
    expired_token_message: String,
    client: reqwest::Client,
}

#[derive(serde::Deserialize)]
struct ResultsPayload {
    #[serde(default)]
    data: Vec<Record>,
    #[serde(default)]
    meta: serde_json::Value,
}

impl ReqwestLogbookClient {
    /// Create a new client instance.
    ///
    /// # Arguments
    /// * `accept` - The versioned media type pinned in the `Accept` header
    /// * `expired_token_message` - The 401 `message` that signals an expired access token
    pub fn new(
        accept: impl Into<String>,
        expired_token_message: impl Into<String>,
    ) -> Result<Self, LogbookError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            accept: accept.into(),
            expired_token_message: expired_token_message.into(),
            client,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, LogbookError> {
        Self::new(&config.accept, &config.expired_token_message)
    }

    /// Build an authenticated GET request.
    fn get_request(&self, url: &str, access_token: &SecretString) -> reqwest::RequestBuilder {
        self.client
            .get(url)
            .bearer_auth(access_token.expose_secret())
            .header(ACCEPT, &self.accept)
    }

    /// Classify a 401: only the configured reason string counts as expiry.
    async fn classify_unauthorized(&self, resp: reqwest::Response) -> Result<FetchResult, LogbookError> {
        let body = resp.text().await.unwrap_or_default();
        let message = serde_json::from_str::<serde_json::Value>(&body)
            .ok()
            .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(str::to_owned));

        if message.as_deref() == Some(self.expired_token_message.as_str()) {
            return Ok(FetchResult::AuthExpired);
        }
        Err(LogbookError::Unauthorized(body_snippet(
            &message.unwrap_or(body),
        )))
    }

    /// Extract error information from a failed response.
    async fn error_from_response(&self, resp: reqwest::Response) -> LogbookError {
        let status = resp.status().as_u16();
        let body = resp.text().await.unwrap_or_default();
        LogbookError::Status {
            status,
            body: body_snippet(&body),
        }
    }
}

/// Read `meta.pagination.links.next`. Absent, null, empty, or a `links` value
/// that is not an object all mean there is no further page.
fn next_link(meta: &serde_json::Value) -> Option<String> {
    meta.pointer("/pagination/links/next")
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
}

#[async_trait]
impl PageFetcher for ReqwestLogbookClient {
    async fn fetch(
        &self,
        url: &str,
        access_token: &SecretString,
    ) -> Result<FetchResult, LogbookError> {
        let resp = self.get_request(url, access_token).send().await?;
        let status = resp.status();
        if status == StatusCode::UNAUTHORIZED {
            return self.classify_unauthorized(resp).await;
        }
        if status != StatusCode::OK {
            return Err(self.error_from_response(resp).await);
        }

        // Read body as text first so a decode failure can carry a snippet.
        let text = resp.text().await?;
        let payload: ResultsPayload = serde_json::from_str(&text).map_err(|e| {
            LogbookError::Decode(format!(
                "decoding results page: {} - body: {}",
                e,
                body_snippet(&text)
            ))
        })?;

        Ok(FetchResult::Success {
            next_link: next_link(&payload.meta),
            records: payload.data,
        })
    }
}
