//! Conditional pagination.
//!
//! Walks a cursor-paginated endpoint one page at a time. Whether a next
//! page exists comes from page metadata; whether to fetch it is decided by
//! a caller-supplied predicate over the current page's content.

use crate::error::Result;
use crate::feed::fetcher::PageFetcher;
use crate::models::{Event, Page, PageMeta, PageRequest};
use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

/// Follow `initial`'s cursors while `should_continue` holds for the page
/// most recently fetched.
///
/// Returns every page's items concatenated in fetch order, carrying the
/// metadata of the last page fetched. Any fetch failure aborts the walk;
/// no partial result is returned.
///
/// The predicate is the only bound when the API never reports a last
/// page, so it must eventually return `false`.
pub async fn paginate<T, F, P>(
    fetcher: &F,
    initial: Page<T>,
    mut should_continue: P,
) -> Result<Page<T>>
where
    F: PageFetcher<T> + ?Sized,
    P: FnMut(&Page<T>) -> Result<bool>,
{
    let mut result = Page::new(Vec::new(), PageMeta::default());
    let mut current = initial;
    let mut pages = 1usize;

    loop {
        if !should_continue(&current)? {
            debug!("Stopping after {} page(s): predicate declined", pages);
            break;
        }

        let Some(cursor) = current.next_cursor().cloned() else {
            debug!("Stopping after {} page(s): no next page", pages);
            break;
        };

        let next = fetcher.fetch(&PageRequest::Next(cursor)).await?;
        pages += 1;

        result = result.merge(current);
        current = next;
    }

    let result = result.merge(current);
    info!("Fetched {} item(s) across {} page(s)", result.len(), pages);
    Ok(result)
}

/// Fetch the first page for `request`, then [`paginate`] from it.
pub async fn fetch_paginated<T, F, P>(
    fetcher: &F,
    request: &PageRequest,
    should_continue: P,
) -> Result<Page<T>>
where
    F: PageFetcher<T> + ?Sized,
    P: FnMut(&Page<T>) -> Result<bool>,
{
    let initial = fetcher.fetch(request).await?;
    paginate(fetcher, initial, should_continue).await
}

/// Continue while the last event on the page is at or after `cutoff`.
///
/// Feeds are newest first, so the last event is the oldest on the page.
/// Only that one event is inspected. An empty page stops the walk.
pub fn until_cutoff(cutoff: DateTime<Utc>) -> impl FnMut(&Page<Event>) -> Result<bool> {
    move |page| match page.last() {
        Some(oldest) => Ok(oldest.created_at()? >= cutoff),
        None => Ok(false),
    }
}

/// Wrap `inner` so that no more than `max_pages` pages are fetched in total.
pub fn with_page_budget<T, P>(
    max_pages: usize,
    mut inner: P,
) -> impl FnMut(&Page<T>) -> Result<bool>
where
    P: FnMut(&Page<T>) -> Result<bool>,
{
    let mut seen = 0usize;
    move |page| {
        seen += 1;
        let wants_more = inner(page)?;
        if wants_more && seen >= max_pages {
            // On the last page the walk ends anyway; nothing was cut.
            if page.next_cursor().is_some() {
                warn!(
                    "Page budget of {} reached before the cutoff; older events are not included",
                    max_pages
                );
            }
            return Ok(false);
        }
        Ok(wants_more)
    }
}
