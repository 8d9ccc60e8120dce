//! reqwest-backed [`Fetcher`].
//!
//! Sends browser-like headers so vendor sites serve the same HTML a shopper
//! would see, follows a bounded number of redirects, and streams the body so
//! the size cap is enforced before the whole payload is buffered.

use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use crate::error::{FetchError, FetchResult};
use crate::traits::fetcher::{FetchLimits, FetchedResponse, Fetcher};

const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// HTTP fetcher with browser headers.
#[derive(Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self, reqwest::Error> {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::ACCEPT,
            reqwest::header::HeaderValue::from_static(
                "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8",
            ),
        );
        headers.insert(
            reqwest::header::ACCEPT_LANGUAGE,
            reqwest::header::HeaderValue::from_static("en-US,en;q=0.5"),
        );
        headers.insert(
            reqwest::header::UPGRADE_INSECURE_REQUESTS,
            reqwest::header::HeaderValue::from_static("1"),
        );

        let client = reqwest::Client::builder()
            .user_agent(BROWSER_USER_AGENT)
            .default_headers(headers)
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()?;

        Ok(Self { client })
    }

    /// Use a preconfigured client (proxies, custom TLS).
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    async fn fetch(&self, url: Url, limits: FetchLimits) -> FetchResult<FetchedResponse> {
        let raw = url.to_string();
        let response = self
            .client
            .get(url)
            .timeout(limits.timeout)
            .send()
            .await
            .map_err(|e| transport_error(&raw, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: raw,
                status: status.as_u16(),
            });
        }

        if let Some(len) = response.content_length() {
            if len as usize > limits.max_bytes {
                return Err(FetchError::TooLarge {
                    url: raw,
                    limit: limits.max_bytes,
                });
            }
        }

        let final_url = response.url().to_string();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        let mut response = response;
        let mut body = Vec::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| transport_error(&raw, e))?
        {
            if body.len() + chunk.len() > limits.max_bytes {
                return Err(FetchError::TooLarge {
                    url: raw,
                    limit: limits.max_bytes,
                });
            }
            body.extend_from_slice(&chunk);
        }

        Ok(FetchedResponse {
            url: final_url,
            status: status.as_u16(),
            content_type,
            body,
        })
    }
}

fn transport_error(url: &str, err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        FetchError::Timeout {
            url: url.to_string(),
        }
    } else {
        FetchError::Transport {
            url: url.to_string(),
            source: Box::new(err),
        }
    }
}

/// Parse an http(s) URL, rejecting other schemes.
pub(crate) fn parse_http_url(raw: &str) -> FetchResult<Url> {
    let url = Url::parse(raw.trim()).map_err(|_| FetchError::InvalidUrl {
        url: raw.to_string(),
    })?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        _ => Err(FetchError::InvalidUrl {
            url: raw.to_string(),
        }),
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn get(&self, url: &str, limits: FetchLimits) -> FetchResult<FetchedResponse> {
        let parsed = parse_http_url(url)?;
        debug!(url = %parsed, timeout_ms = limits.timeout.as_millis() as u64, "HTTP GET");

        // reqwest's timeout covers the body too, but a slow-drip server can
        // still hold a chunk loop open; bound the whole call.
        let grace = limits.timeout + Duration::from_millis(250);
        match tokio::time::timeout(grace, self.fetch(parsed, limits)).await {
            Ok(result) => result,
            Err(_) => {
                warn!(url = %url, "Fetch exceeded deadline");
                Err(FetchError::Timeout {
                    url: url.to_string(),
                })
            }
        }
    }
}
