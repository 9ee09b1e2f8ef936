//! GitHub REST API client.
//!
//! This module provides the HTTP client used by the gateway: authentication
//! headers, error mapping, retries for transient failures and transparent
//! pagination through `Link` headers.

use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::{Client, Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, trace};

use crate::error::{GitHubError, GorcError, Result};

/// GitHub API base URL.
pub const GITHUB_API_URL: &str = "https://api.github.com";

/// REST API version requested on every call.
const API_VERSION: &str = "2022-11-28";

/// Page size for list endpoints.
const PER_PAGE: u32 = 100;

/// Default request timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Maximum number of attempts for transient failures.
const MAX_RETRIES: u32 = 3;

/// Delay between retries in milliseconds.
const RETRY_DELAY_MS: u64 = 1000;

/// Upper bound on a rate-limit wait before giving up on a call.
const MAX_RATE_LIMIT_WAIT_SECS: u64 = 60;

/// GitHub REST API client.
#[derive(Debug, Clone)]
pub struct GitHubClient {
    /// HTTP client with authentication headers installed.
    client: Client,
    /// API base URL without trailing slash.
    base_url: String,
    /// Base retry delay.
    retry_delay: Duration,
}

impl GitHubClient {
    /// Creates a client for api.github.com.
    ///
    /// # Errors
    ///
    /// Returns an error if the token is not a valid header value or the
    /// HTTP client cannot be created.
    pub fn new(token: &str) -> Result<Self> {
        Self::with_base_url(token, GITHUB_API_URL)
    }

    /// Creates a client for a custom API URL (GitHub Enterprise, tests).
    ///
    /// # Errors
    ///
    /// Returns an error if the token is not a valid header value or the
    /// HTTP client cannot be created.
    pub fn with_base_url(token: &str, base_url: &str) -> Result<Self> {
        let mut auth = HeaderValue::from_str(&format!("Bearer {token}")).map_err(|e| {
            GitHubError::AuthenticationFailed {
                message: format!("Token is not a valid header value: {e}"),
            }
        })?;
        auth.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, auth);
        headers.insert(
            header::ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert("x-github-api-version", HeaderValue::from_static(API_VERSION));

        let client = Client::builder()
            .default_headers(headers)
            .user_agent(concat!("gorc/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .map_err(|e| GitHubError::network(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            retry_delay: Duration::from_millis(RETRY_DELAY_MS),
        })
    }

    /// Sets the base delay between retries.
    #[must_use]
    pub const fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Fetches a single JSON resource.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the body cannot be decoded.
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self.execute(Method::GET, &self.url(path), None).await?;
        decode(response).await
    }

    /// Fetches every page of a list endpoint.
    ///
    /// # Errors
    ///
    /// Returns an error if any page fails or cannot be decoded.
    pub async fn paginate<T: DeserializeOwned>(&self, path: &str) -> Result<Vec<T>> {
        let separator = if path.contains('?') { '&' } else { '?' };
        let mut next = Some(format!("{}{separator}per_page={PER_PAGE}", self.url(path)));
        let mut items = Vec::new();
        let mut pages = 0_u32;

        while let Some(url) = next {
            let response = self.execute(Method::GET, &url, None).await?;
            next = next_link(response.headers());
            let page: Vec<T> = decode(response).await?;
            items.extend(page);
            pages += 1;
        }

        debug!("Fetched {} items from {path} in {pages} page(s)", items.len());
        Ok(items)
    }

    /// Sends a `PUT` request.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn put(&self, path: &str, body: Option<&serde_json::Value>) -> Result<()> {
        self.execute(Method::PUT, &self.url(path), body).await.map(drop)
    }

    /// Sends a `PATCH` request.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn patch(&self, path: &str, body: &serde_json::Value) -> Result<()> {
        self.execute(Method::PATCH, &self.url(path), Some(body))
            .await
            .map(drop)
    }

    /// Sends a `POST` request.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn post(&self, path: &str, body: &serde_json::Value) -> Result<()> {
        self.execute(Method::POST, &self.url(path), Some(body))
            .await
            .map(drop)
    }

    /// Sends a `DELETE` request.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn delete(&self, path: &str) -> Result<()> {
        self.execute(Method::DELETE, &self.url(path), None)
            .await
            .map(drop)
    }

    /// Builds an absolute URL from an API path.
    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Executes a request, retrying transient failures.
    async fn execute(
        &self,
        method: Method,
        url: &str,
        body: Option<&serde_json::Value>,
    ) -> Result<Response> {
        let mut last_error = None;

        for attempt in 0..MAX_RETRIES {
            if let Some(err) = &last_error {
                let delay = retry_delay(err, self.retry_delay, attempt);
                debug!("Retry attempt {attempt} of {MAX_RETRIES} in {delay:?}");
                tokio::time::sleep(delay).await;
            }

            match self.execute_once(method.clone(), url, body).await {
                Ok(response) => return Ok(response),
                Err(e) if e.is_retryable() => last_error = Some(e),
                Err(e) => return Err(e),
            }
        }

        Err(last_error.unwrap_or_else(|| {
            GorcError::GitHub(GitHubError::network("Max retries exceeded"))
        }))
    }

    /// Executes a single request and maps error statuses.
    async fn execute_once(
        &self,
        method: Method,
        url: &str,
        body: Option<&serde_json::Value>,
    ) -> Result<Response> {
        trace!("{method} {url}");

        let mut request = self.client.request(method, url);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| GitHubError::network(format!("Request failed: {e}")))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        if status == StatusCode::TOO_MANY_REQUESTS || is_rate_limited(&response) {
            return Err(GorcError::GitHub(GitHubError::RateLimited {
                retry_after_secs: retry_after(&response),
            }));
        }

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            let body = response.text().await.unwrap_or_default();
            return Err(GorcError::GitHub(GitHubError::AuthenticationFailed {
                message: format!("{status}: {}", api_message(&body)),
            }));
        }

        if status == StatusCode::NOT_FOUND {
            return Err(GorcError::GitHub(GitHubError::NotFound {
                resource: url.to_string(),
            }));
        }

        let body = response.text().await.unwrap_or_default();
        Err(GorcError::GitHub(GitHubError::api_error(
            status.as_u16(),
            api_message(&body),
        )))
    }
}

/// Decodes a JSON response body.
async fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
    response.json().await.map_err(|e| {
        GorcError::GitHub(GitHubError::invalid_response(format!(
            "Failed to parse response: {e}"
        )))
    })
}

/// Returns true for a 403 caused by an exhausted primary rate limit.
fn is_rate_limited(response: &Response) -> bool {
    response.status() == StatusCode::FORBIDDEN
        && response
            .headers()
            .get("x-ratelimit-remaining")
            .and_then(|v| v.to_str().ok())
            == Some("0")
}

/// Reads `retry-after`, defaulting to a minute.
fn retry_after(response: &Response) -> u64 {
    response
        .headers()
        .get(header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.parse().ok())
        .unwrap_or(MAX_RATE_LIMIT_WAIT_SECS)
}

/// Computes the wait before the next attempt.
fn retry_delay(err: &GorcError, base: Duration, attempt: u32) -> Duration {
    err.retry_delay_secs().map_or(base * attempt, |secs| {
        Duration::from_secs(secs.min(MAX_RATE_LIMIT_WAIT_SECS))
    })
}

/// Extracts `message` from a GitHub error body, falling back to the raw body.
fn api_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(String::from))
        .unwrap_or_else(|| body.to_string())
}

/// Extracts the `rel="next"` URL from a `Link` header.
fn next_link(headers: &HeaderMap) -> Option<String> {
    let link = headers.get(header::LINK)?.to_str().ok()?;
    link.split(',').find_map(|part| {
        let mut sections = part.split(';');
        let url = sections.next()?.trim();
        let is_next = sections.any(|s| s.trim() == r#"rel="next""#);
        if is_next {
            url.strip_prefix('<')
                .and_then(|u| u.strip_suffix('>'))
                .map(String::from)
        } else {
            None
        }
    })
}
