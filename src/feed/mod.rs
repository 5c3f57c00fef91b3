//! Activity feed retrieval.
//!
//! Page fetching against the events API and conditional pagination
//! over the pages it returns.

pub mod fetcher;
pub mod paginator;
pub mod progress;

pub use fetcher::{GitHubClient, PageFetcher};
pub use paginator::{fetch_paginated, paginate, until_cutoff, with_page_budget};
pub use progress::ProgressFetcher;
