//! Data models for the activity digest.
//!
//! This module contains the feed records returned by the events API and
//! the page structure the paginator walks and merges.

use crate::error::{DigestError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Event type for pushes to a branch.
pub const PUSH_EVENT: &str = "PushEvent";

/// Event type for created refs; repository creation is `ref_type = "repository"`.
pub const CREATE_EVENT: &str = "CreateEvent";

/// Reference to the repository an event happened in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepoRef {
    /// Full name, e.g. `owner/repo`.
    #[serde(default)]
    pub name: Option<String>,
}

/// A single activity record from the feed.
///
/// Only the fields the digest relies on are typed. They stay optional at
/// decode time and are checked when accessed, so one odd record fails the
/// run with a precise error instead of failing the whole page decode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Event identifier.
    #[serde(default)]
    pub id: Option<String>,
    /// Type discriminator, e.g. `PushEvent`.
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    /// ISO-8601 creation timestamp.
    #[serde(default)]
    pub created_at: Option<String>,
    /// Repository the event belongs to.
    #[serde(default)]
    pub repo: Option<RepoRef>,
    /// Type-specific payload.
    #[serde(default)]
    pub payload: Value,
}

impl Event {
    /// Returns the type discriminator.
    pub fn kind(&self) -> Result<&str> {
        self.kind
            .as_deref()
            .ok_or_else(|| DigestError::malformed("type", self.id.as_deref()))
    }

    /// Returns the parsed creation timestamp.
    pub fn created_at(&self) -> Result<DateTime<Utc>> {
        self.created_at
            .as_deref()
            .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
            .map(|ts| ts.with_timezone(&Utc))
            .ok_or_else(|| DigestError::malformed("created_at", self.id.as_deref()))
    }

    /// Returns the repository full name.
    pub fn repo_name(&self) -> Result<&str> {
        self.repo
            .as_ref()
            .and_then(|r| r.name.as_deref())
            .ok_or_else(|| DigestError::malformed("repo.name", self.id.as_deref()))
    }

    /// Looks up a payload field by dot-separated path (`commits.0.sha`).
    pub fn payload_field(&self, path: &str) -> Option<&Value> {
        path.split('.').try_fold(&self.payload, |value, key| match value {
            Value::Array(items) => key.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => value.get(key),
        })
    }

    /// Whether this event records a newly created repository.
    pub fn is_repository_creation(&self) -> Result<bool> {
        if self.kind()? != CREATE_EVENT {
            return Ok(false);
        }
        let ref_type = self
            .payload_field("ref_type")
            .and_then(Value::as_str)
            .ok_or_else(|| DigestError::malformed("payload.ref_type", self.id.as_deref()))?;
        Ok(ref_type == "repository")
    }

    /// Whether this event is a push.
    pub fn is_push(&self) -> Result<bool> {
        Ok(self.kind()? == PUSH_EVENT)
    }

    /// Number of commits carried by a push payload.
    ///
    /// Uses `payload.size` and falls back to the length of `payload.commits`.
    pub fn commit_count(&self) -> Result<u64> {
        if let Some(size) = self.payload_field("size").and_then(Value::as_u64) {
            return Ok(size);
        }
        self.payload_field("commits")
            .and_then(Value::as_array)
            .map(|commits| commits.len() as u64)
            .ok_or_else(|| DigestError::malformed("payload.size", self.id.as_deref()))
    }
}

/// Opaque continuation token pointing at the next page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cursor(pub String);

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A request for one page of a paginated endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageRequest {
    /// First page: endpoint path plus query parameters.
    Start {
        endpoint: String,
        params: Vec<(String, String)>,
    },
    /// Any later page, addressed by the cursor of the page before it.
    Next(Cursor),
}

impl PageRequest {
    /// Creates a first-page request.
    pub fn start(endpoint: impl Into<String>, params: &[(&str, String)]) -> Self {
        PageRequest::Start {
            endpoint: endpoint.into(),
            params: params
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
        }
    }
}

impl fmt::Display for PageRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PageRequest::Start { endpoint, params } if params.is_empty() => {
                write!(f, "{}", endpoint)
            }
            PageRequest::Start { endpoint, params } => {
                let query: Vec<String> = params.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
                write!(f, "{}?{}", endpoint, query.join("&"))
            }
            PageRequest::Next(cursor) => write!(f, "{}", cursor),
        }
    }
}

/// Rate-limit state reported alongside a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimit {
    /// Requests allowed per window.
    pub limit: u32,
    /// Requests left in the current window.
    pub remaining: u32,
    /// When the window resets.
    pub reset_at: DateTime<Utc>,
}

impl RateLimit {
    /// Whether less than a tenth of the window is left.
    pub fn is_low(&self) -> bool {
        self.limit > 0 && self.remaining.saturating_mul(10) < self.limit
    }
}

/// Page-scoped metadata. Never part of an individual item.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageMeta {
    /// Continuation cursor, `None` on the last page.
    pub next: Option<Cursor>,
    /// Rate-limit headers of the request that produced this page.
    pub rate_limit: Option<RateLimit>,
}

/// Items of one or more pages plus the metadata of the latest one.
///
/// A merged result is also a `Page`: merging concatenates items and keeps
/// the right-hand metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    /// Items in feed order.
    pub items: Vec<T>,
    /// Metadata of the most recently fetched page.
    pub meta: PageMeta,
}

impl<T> Page<T> {
    /// Creates a page.
    pub fn new(items: Vec<T>, meta: PageMeta) -> Self {
        Self { items, meta }
    }

    /// Appends `next`'s items and adopts its metadata.
    pub fn merge(mut self, next: Page<T>) -> Page<T> {
        self.items.extend(next.items);
        Page {
            items: self.items,
            meta: next.meta,
        }
    }

    /// The cursor for the following page, if any.
    pub fn next_cursor(&self) -> Option<&Cursor> {
        self.meta.next.as_ref()
    }

    /// Last item on the page.
    pub fn last(&self) -> Option<&T> {
        self.items.last()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Builds an event for tests.
#[cfg(test)]
pub(crate) fn test_event(kind: &str, repo: &str, created_at: &str, payload: Value) -> Event {
    Event {
        id: Some(format!("{}-{}-{}", kind, repo, created_at)),
        kind: Some(kind.to_string()),
        created_at: Some(created_at.to_string()),
        repo: Some(RepoRef {
            name: Some(repo.to_string()),
        }),
        payload,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn page(items: &[u32], next: Option<&str>) -> Page<u32> {
        Page::new(
            items.to_vec(),
            PageMeta {
                next: next.map(|c| Cursor(c.to_string())),
                rate_limit: None,
            },
        )
    }

    #[test]
    fn test_merge_concatenates_in_fetch_order() {
        let merged = page(&[1, 2], Some("p2"))
            .merge(page(&[3], Some("p3")))
            .merge(page(&[4, 5], None));

        assert_eq!(merged.items, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_merge_keeps_latest_metadata() {
        let merged = page(&[1], Some("p2")).merge(page(&[2], Some("p3")));
        assert_eq!(merged.next_cursor(), Some(&Cursor("p3".to_string())));

        let merged = merged.merge(page(&[3], None));
        assert_eq!(merged.meta, PageMeta::default());
    }

    #[test]
    fn test_merge_keeps_duplicates() {
        let merged = page(&[7, 7], None).merge(page(&[7], None));
        assert_eq!(merged.items, vec![7, 7, 7]);
    }

    #[test]
    fn test_event_decode_from_api_json() {
        let raw = json!({
            "id": "42",
            "type": "PushEvent",
            "created_at": "2024-03-01T12:00:00Z",
            "repo": {"id": 1, "name": "a/b", "url": "https://api.github.com/repos/a/b"},
            "payload": {"size": 3, "commits": []}
        });
        let event: Event = serde_json::from_value(raw).unwrap();

        assert_eq!(event.kind().unwrap(), "PushEvent");
        assert_eq!(event.repo_name().unwrap(), "a/b");
        assert_eq!(event.commit_count().unwrap(), 3);
        assert_eq!(
            event.created_at().unwrap().to_rfc3339(),
            "2024-03-01T12:00:00+00:00"
        );
    }

    #[test]
    fn test_missing_fields_are_malformed() {
        let event: Event = serde_json::from_value(json!({"id": "9"})).unwrap();

        assert!(matches!(
            event.kind(),
            Err(DigestError::MalformedEvent { ref field, .. }) if field == "type"
        ));
        assert!(event.created_at().is_err());
        assert!(event.repo_name().is_err());
    }

    #[test]
    fn test_unparseable_timestamp_is_malformed() {
        let mut event = test_event("PushEvent", "a/b", "yesterday", json!({}));
        assert!(event.created_at().is_err());

        event.created_at = Some("2024-03-01T12:00:00+02:00".to_string());
        assert_eq!(
            event.created_at().unwrap().to_rfc3339(),
            "2024-03-01T10:00:00+00:00"
        );
    }

    #[test]
    fn test_commit_count_falls_back_to_commits_array() {
        let event = test_event(
            "PushEvent",
            "a/b",
            "2024-03-01T12:00:00Z",
            json!({"commits": [{"sha": "1"}, {"sha": "2"}]}),
        );
        assert_eq!(event.commit_count().unwrap(), 2);

        let empty = test_event("PushEvent", "a/b", "2024-03-01T12:00:00Z", json!({}));
        assert!(empty.commit_count().is_err());
    }

    #[test]
    fn test_repository_creation() {
        let repo = test_event(
            "CreateEvent",
            "x/y",
            "2024-03-01T12:00:00Z",
            json!({"ref_type": "repository"}),
        );
        let branch = test_event(
            "CreateEvent",
            "x/y",
            "2024-03-01T12:00:00Z",
            json!({"ref_type": "branch", "ref": "main"}),
        );
        let push = test_event("PushEvent", "x/y", "2024-03-01T12:00:00Z", json!({}));

        assert!(repo.is_repository_creation().unwrap());
        assert!(!branch.is_repository_creation().unwrap());
        assert!(!push.is_repository_creation().unwrap());
    }

    #[test]
    fn test_payload_field_path() {
        let event = test_event(
            "PushEvent",
            "a/b",
            "2024-03-01T12:00:00Z",
            json!({"ref": "refs/heads/main", "commits": [{"author": {"name": "bot"}}]}),
        );
        assert_eq!(
            event.payload_field("ref"),
            Some(&json!("refs/heads/main"))
        );
        assert_eq!(
            event.payload_field("commits.0.author.name"),
            Some(&json!("bot"))
        );
        assert_eq!(event.payload_field("commits.3"), None);
        assert_eq!(event.payload_field("missing"), None);
    }

    #[test]
    fn test_page_request_display() {
        let start = PageRequest::start("/users/octo/events", &[("per_page", "100".to_string())]);
        assert_eq!(start.to_string(), "/users/octo/events?per_page=100");

        let next = PageRequest::Next(Cursor("https://api.github.com/x?page=2".to_string()));
        assert_eq!(next.to_string(), "https://api.github.com/x?page=2");
    }

    #[test]
    fn test_rate_limit_is_low() {
        let reset_at = Utc::now();
        assert!(RateLimit { limit: 60, remaining: 5, reset_at }.is_low());
        assert!(!RateLimit { limit: 60, remaining: 6, reset_at }.is_low());
        assert!(!RateLimit { limit: 0, remaining: 0, reset_at }.is_low());
    }
}
