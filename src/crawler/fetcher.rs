//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler:
//! - Building HTTP clients from the fetch configuration
//! - GET requests that follow redirects and report the final URL
//! - A redirect cap that hands back the last 3xx response instead of failing
//! - Classification of transport failures

use crate::config::FetchConfig;
use reqwest::{redirect::Policy, Client};
use std::time::Duration;
use thiserror::Error;

/// The only status code treated as a successful fetch
pub const SUCCESS_STATUS: u16 = 200;

/// A response received from a server, whatever its status
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// HTTP status code
    pub status_code: u16,

    /// Final URL after redirects
    pub final_url: String,

    /// Content-Type header value, if the server sent one
    pub content_type: Option<String>,

    /// Page body content
    pub body: String,
}

impl FetchedPage {
    /// Returns true if the status is the recognized success code
    pub fn is_success(&self) -> bool {
        self.status_code == SUCCESS_STATUS
    }
}

/// Transport failures: no usable response was received
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Request timeout for {url}")]
    Timeout { url: String },

    #[error("Connection failed for {url}: {message}")]
    Connect { url: String, message: String },

    #[error("Failed to read body of {url}: {message}")]
    Body { url: String, message: String },

    #[error("Request failed for {url}: {message}")]
    Request { url: String, message: String },
}

impl FetchError {
    /// Short label used in log lines
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Timeout { .. } => "timeout",
            Self::Connect { .. } => "connect",
            Self::Body { .. } => "body",
            Self::Request { .. } => "request",
        }
    }
}

/// Builds an HTTP client from the fetch configuration
///
/// # Example
///
/// ```no_run
/// use driftnet::config::FetchConfig;
/// use driftnet::crawler::build_http_client;
///
/// let client = build_http_client(&FetchConfig::default()).unwrap();
/// ```
pub fn build_http_client(config: &FetchConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.user_agent.as_str())
        .timeout(Duration::from_secs(config.timeout_secs))
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .redirect(redirect_policy(config.max_redirects))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Follows up to `max_redirects` hops
///
/// Past the cap the last redirect response is returned as-is, so a redirect
/// loop surfaces as a 3xx status rather than a transport failure.
fn redirect_policy(max_redirects: usize) -> Policy {
    Policy::custom(move |attempt| {
        if attempt.previous().len() > max_redirects {
            attempt.stop()
        } else {
            attempt.follow()
        }
    })
}

/// Fetches a URL with a GET request
///
/// Any response, whatever its status, is returned as `Ok`. Only failures
/// that leave no usable response are returned as `Err`.
pub async fn fetch_url(client: &Client, url: &str) -> Result<FetchedPage, FetchError> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| classify_error(url, e))?;

    let status_code = response.status().as_u16();
    let final_url = response.url().to_string();
    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let body = response.text().await.map_err(|e| FetchError::Body {
        url: url.to_string(),
        message: e.to_string(),
    })?;

    Ok(FetchedPage {
        status_code,
        final_url,
        content_type,
        body,
    })
}

/// Maps a reqwest error onto a transport failure kind
fn classify_error(url: &str, error: reqwest::Error) -> FetchError {
    if error.is_timeout() {
        FetchError::Timeout {
            url: url.to_string(),
        }
    } else if error.is_connect() {
        FetchError::Connect {
            url: url.to_string(),
            message: error.to_string(),
        }
    } else {
        FetchError::Request {
            url: url.to_string(),
            message: error.to_string(),
        }
    }
}
