//! Page fetching from the GitHub events API.
//!
//! A fetcher performs exactly one request per call and never retries;
//! retrying is left to whoever schedules the next run.

use crate::error::{DigestError, Result};
use crate::models::{Cursor, Page, PageMeta, PageRequest, RateLimit};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::HeaderMap;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, warn};

/// Fetches one page of items from a paginated endpoint.
#[async_trait]
pub trait PageFetcher<T>: Send + Sync {
    /// Performs a single request and returns the page it produced.
    async fn fetch(&self, request: &PageRequest) -> Result<Page<T>>;
}

/// Client for the GitHub REST API.
pub struct GitHubClient {
    http: reqwest::Client,
    api_url: String,
    token: Option<String>,
}

impl GitHubClient {
    /// Create a client for the given API base URL.
    pub fn new(api_url: &str, token: Option<String>, timeout_seconds: u64) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .user_agent(concat!("ghdigest/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| DigestError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http,
            api_url: api_url.trim_end_matches('/').to_string(),
            token,
        })
    }

    /// First-page request for a user's activity feed.
    pub fn user_events(user: &str, per_page: u32) -> PageRequest {
        PageRequest::start(
            format!("/users/{}/events", user),
            &[("per_page", per_page.to_string())],
        )
    }

    fn build_request(&self, request: &PageRequest) -> reqwest::RequestBuilder {
        let builder = match request {
            PageRequest::Start { endpoint, params } => self
                .http
                .get(format!("{}{}", self.api_url, endpoint))
                .query(params),
            PageRequest::Next(cursor) => self.http.get(&cursor.0),
        };

        let builder = builder
            .header("Accept", "application/vnd.github+json")
            .header("X-GitHub-Api-Version", "2022-11-28");

        match self.token {
            Some(ref token) => builder.bearer_auth(token),
            None => builder,
        }
    }
}

#[async_trait]
impl<T> PageFetcher<T> for GitHubClient
where
    T: DeserializeOwned + Send + 'static,
{
    async fn fetch(&self, request: &PageRequest) -> Result<Page<T>> {
        debug!("GET {}", request);

        let fetch_error = |reason: String| DigestError::Fetch {
            request: request.to_string(),
            reason,
        };

        let response = self
            .build_request(request)
            .send()
            .await
            .map_err(|e| fetch_error(format!("HTTP request failed: {}", e)))?;

        let status = response.status();
        let headers = response.headers().clone();
        let rate_limit = parse_rate_limit(&headers);

        if let Some(limit) = rate_limit {
            debug!(
                "Rate limit: {}/{} remaining, resets at {}",
                limit.remaining, limit.limit, limit.reset_at
            );
            if limit.is_low() {
                warn!(
                    "Only {} of {} API requests left until {}",
                    limit.remaining, limit.limit, limit.reset_at
                );
            }
        }

        if let Some(err) = classify_status(request, status, rate_limit) {
            return Err(match err {
                DigestError::Fetch { request, reason } => {
                    let body = response.text().await.unwrap_or_default();
                    let excerpt: String = body.chars().take(200).collect();
                    DigestError::Fetch {
                        request,
                        reason: format!("{}: {}", reason, excerpt),
                    }
                }
                other => other,
            });
        }

        let next = headers
            .get("link")
            .and_then(|v| v.to_str().ok())
            .and_then(parse_next_link);

        let body = response
            .bytes()
            .await
            .map_err(|e| fetch_error(format!("Failed to read response body: {}", e)))?;
        let items: Vec<T> = decode_items(request, &body)?;

        debug!(
            "Fetched {} items (next page: {})",
            items.len(),
            if next.is_some() { "yes" } else { "no" }
        );

        Ok(Page::new(items, PageMeta { next, rate_limit }))
    }
}

/// Map a non-success status to the error it stands for.
///
/// 401 is `Unauthorized`. 403 and 429 are `RateLimited` only when the
/// headers say the window is spent; everything else is a plain fetch
/// failure.
pub fn classify_status(
    request: &PageRequest,
    status: StatusCode,
    rate_limit: Option<RateLimit>,
) -> Option<DigestError> {
    match status {
        s if s.is_success() => None,
        StatusCode::UNAUTHORIZED => Some(DigestError::Unauthorized),
        StatusCode::FORBIDDEN | StatusCode::TOO_MANY_REQUESTS
            if rate_limit.is_some_and(|l| l.remaining == 0) =>
        {
            let reset_at = rate_limit.map(|l| l.reset_at).unwrap_or_else(Utc::now);
            Some(DigestError::RateLimited { reset_at })
        }
        _ => Some(DigestError::Fetch {
            request: request.to_string(),
            reason: format!("Unexpected HTTP status {}", status),
        }),
    }
}

/// Decode a page body, which must be a JSON array of items.
pub fn decode_items<T: DeserializeOwned>(request: &PageRequest, body: &[u8]) -> Result<Vec<T>> {
    serde_json::from_slice(body).map_err(|e| DigestError::Fetch {
        request: request.to_string(),
        reason: format!("JSON parse error: {}", e),
    })
}

/// Extract the `rel="next"` URL from a Link header.
///
/// GitHub Link headers look like:
/// `<https://api.github.com/user/1/events?page=2>; rel="next", <...?page=10>; rel="last"`
pub fn parse_next_link(link_header: &str) -> Option<Cursor> {
    link_header.split(',').find_map(|part| {
        let mut url = None;
        let mut is_next = false;

        for segment in part.split(';') {
            let segment = segment.trim();
            if segment.starts_with('<') && segment.ends_with('>') {
                url = Some(&segment[1..segment.len() - 1]);
            } else if let Some(rel) = segment.strip_prefix("rel=") {
                is_next = rel.trim_matches('"').split_whitespace().any(|r| r == "next");
            }
        }

        match (url, is_next) {
            (Some(url), true) => Some(Cursor(url.to_string())),
            _ => None,
        }
    })
}

/// Read the `x-ratelimit-*` headers, if all are present.
pub fn parse_rate_limit(headers: &HeaderMap) -> Option<RateLimit> {
    let number = |name: &str| -> Option<i64> {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse().ok())
    };

    let limit = number("x-ratelimit-limit")?;
    let remaining = number("x-ratelimit-remaining")?;
    let reset_at = DateTime::from_timestamp(number("x-ratelimit-reset")?, 0)?;

    Some(RateLimit {
        limit: u32::try_from(limit).ok()?,
        remaining: u32::try_from(remaining).ok()?,
        reset_at,
    })
}
