//! Spinner feedback while pages are being fetched.

use crate::error::Result;
use crate::feed::fetcher::PageFetcher;
use crate::models::{Page, PageRequest};
use async_trait::async_trait;
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Wraps a fetcher and shows a spinner counting pages and items.
pub struct ProgressFetcher<F> {
    inner: F,
    bar: Option<ProgressBar>,
    pages: AtomicUsize,
    items: AtomicUsize,
}

impl<F> ProgressFetcher<F> {
    /// Wrap `inner`; with `show_progress` off this only counts.
    pub fn new(inner: F, show_progress: bool) -> Self {
        let bar = show_progress.then(|| {
            let pb = ProgressBar::new_spinner();
            pb.set_style(
                ProgressStyle::default_spinner()
                    .template("{spinner:.green} [{elapsed_precise}] {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_spinner()),
            );
            pb.enable_steady_tick(Duration::from_millis(120));
            pb.set_message("Fetching activity feed...");
            pb
        });

        Self {
            inner,
            bar,
            pages: AtomicUsize::new(0),
            items: AtomicUsize::new(0),
        }
    }

    /// Number of pages fetched so far.
    pub fn pages(&self) -> usize {
        self.pages.load(Ordering::Relaxed)
    }

    /// Stop the spinner and clear its line.
    pub fn finish(&self) {
        if let Some(ref pb) = self.bar {
            pb.finish_and_clear();
        }
    }
}

#[async_trait]
impl<T, F> PageFetcher<T> for ProgressFetcher<F>
where
    T: Send + 'static,
    F: PageFetcher<T>,
{
    async fn fetch(&self, request: &PageRequest) -> Result<Page<T>> {
        let page = self.inner.fetch(request).await?;

        let pages = self.pages.fetch_add(1, Ordering::Relaxed) + 1;
        let items = self.items.fetch_add(page.len(), Ordering::Relaxed) + page.len();
        if let Some(ref pb) = self.bar {
            pb.set_message(format!("Fetched {} page(s), {} event(s)", pages, items));
        }

        Ok(page)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PageMeta;

    struct Fixed;

    #[async_trait]
    impl PageFetcher<u8> for Fixed {
        async fn fetch(&self, _request: &PageRequest) -> Result<Page<u8>> {
            Ok(Page::new(vec![1, 2, 3], PageMeta::default()))
        }
    }

    #[tokio::test]
    async fn test_counts_pages() {
        let fetcher = ProgressFetcher::new(Fixed, false);
        let request = PageRequest::start("/x", &[]);

        let page: Page<u8> = fetcher.fetch(&request).await.unwrap();
        let _: Page<u8> = fetcher.fetch(&request).await.unwrap();

        assert_eq!(page.len(), 3);
        assert_eq!(fetcher.pages(), 2);
        assert_eq!(fetcher.items.load(Ordering::Relaxed), 6);
        fetcher.finish();
    }
}
