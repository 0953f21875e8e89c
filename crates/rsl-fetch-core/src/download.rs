//! The page loop: navigate, extract, decode, dedupe, save — one page at a time
//! until the page ceiling is reached or the failure streak runs out.

use std::path::PathBuf;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::config::FetchConfig;
use crate::error::Result;
use crate::image::decode_data_url;
use crate::source::PageSource;
use crate::store::{BookStore, SaveOutcome};
use crate::streak::FailureStreak;
use crate::types::{BookId, BookInfo};

/// How many pages the user asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageLimit {
    /// At most this many pages.
    Count(usize),
    /// Every page the viewer lists.
    All,
}

/// Page ceiling once the viewer's own page count is (maybe) known.
///
/// `All` takes the discovered count, or `all_ceiling` when it is unknown.
/// An explicit count is only ever lowered to the discovered count.
pub fn effective_ceiling(limit: PageLimit, discovered: Option<usize>, all_ceiling: usize) -> usize {
    let discovered = discovered.filter(|&total| total > 0);
    match (limit, discovered) {
        (PageLimit::All, Some(total)) => total,
        (PageLimit::All, None) => all_ceiling,
        (PageLimit::Count(n), Some(total)) => n.min(total),
        (PageLimit::Count(n), None) => n,
    }
}

/// Knobs for one download run.
#[derive(Debug, Clone)]
pub struct DownloadOptions {
    pub limit: PageLimit,
    pub all_pages_ceiling: usize,
    pub failure_limit: u32,
    pub min_image_bytes: usize,
    pub page_delay: Duration,
    pub output_dir: PathBuf,
}

impl DownloadOptions {
    pub fn from_config(fetch: &FetchConfig, limit: PageLimit, output_dir: PathBuf) -> Self {
        Self {
            limit,
            all_pages_ceiling: fetch.all_pages_ceiling,
            failure_limit: fetch.failure_limit,
            min_image_bytes: fetch.min_image_bytes,
            page_delay: Duration::from_millis(fetch.page_delay_ms),
            output_dir,
        }
    }
}

/// Result of visiting a single page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageOutcome {
    Saved { bytes: usize },
    NoImage,
    TooSmall { bytes: usize },
    Duplicate,
    /// Navigation, extraction, decoding or write failure.
    Failed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    FailureStreak,
    CeilingReached,
}

#[derive(Debug, Clone)]
pub struct RunSummary {
    pub book_id: BookId,
    pub dir: PathBuf,
    pub saved: usize,
    pub pages_visited: usize,
    pub bytes_written: u64,
    pub ceiling: usize,
    pub stop: StopReason,
    pub info: Option<BookInfo>,
}

/// Drives a [`PageSource`] over one book.
pub struct Downloader<S: PageSource> {
    source: S,
    book_id: BookId,
    store: BookStore,
    streak: FailureStreak,
    options: DownloadOptions,
}

impl<S: PageSource> Downloader<S> {
    pub fn new(source: S, book_id: BookId, options: DownloadOptions) -> Self {
        let store = BookStore::new(&options.output_dir, &book_id, options.min_image_bytes);
        let streak = FailureStreak::new(options.failure_limit);
        Self {
            source,
            book_id,
            store,
            streak,
            options,
        }
    }

    /// Run the whole book. The source is closed before returning.
    pub async fn run(mut self) -> Result<RunSummary> {
        self.store.prepare().await?;

        let (info, discovered) = match self.source.open_page(1).await {
            Ok(()) => {
                let info = self.save_description().await;
                let discovered = self.discover_page_count().await;
                (info, discovered)
            }
            Err(e) => {
                warn!(book_id = %self.book_id, error = %e, "Could not open first page; skipping description");
                (None, None)
            }
        };

        let ceiling = effective_ceiling(
            self.options.limit,
            discovered,
            self.options.all_pages_ceiling,
        );
        info!(book_id = %self.book_id, ceiling, "Extracting pages (stops early on repeated failures)");

        let mut saved = 0usize;
        let mut bytes_written = 0u64;
        let mut pages_visited = 0usize;
        let mut stop = StopReason::CeilingReached;

        for page in 1..=ceiling {
            pages_visited += 1;
            let outcome = self.process_page(page).await;
            log_outcome(page, &outcome);

            if let PageOutcome::Saved { bytes } = outcome {
                saved += 1;
                bytes_written += bytes as u64;
                self.streak.record_success();
            } else if self.streak.record_failure() {
                info!(
                    failures = self.streak.count(),
                    page, "Stopping after consecutive failures"
                );
                stop = StopReason::FailureStreak;
                break;
            }

            if page < ceiling && !self.options.page_delay.is_zero() {
                tokio::time::sleep(self.options.page_delay).await;
            }
        }

        if let Err(e) = self.source.close().await {
            warn!(error = %e, "Failed to close viewer session");
        }

        Ok(RunSummary {
            book_id: self.book_id,
            dir: self.store.dir().to_path_buf(),
            saved,
            pages_visited,
            bytes_written,
            ceiling,
            stop,
            info,
        })
    }

    async fn process_page(&mut self, page: usize) -> PageOutcome {
        if let Err(e) = self.source.open_page(page).await {
            return PageOutcome::Failed(e.to_string());
        }

        let extract = match self.source.page_image().await {
            Ok(extract) => extract,
            Err(e) => return PageOutcome::Failed(e.to_string()),
        };
        let Some(data_url) = extract.image_data else {
            return PageOutcome::NoImage;
        };

        let data = match decode_data_url(&data_url) {
            Ok(data) => data,
            Err(e) => return PageOutcome::Failed(e.to_string()),
        };

        match self.store.save_page(page, &data).await {
            Ok(SaveOutcome::Saved { path, bytes }) => {
                debug!(page, path = %path.display(), "Page written");
                PageOutcome::Saved { bytes }
            }
            Ok(SaveOutcome::TooSmall { bytes }) => PageOutcome::TooSmall { bytes },
            Ok(SaveOutcome::Duplicate) => PageOutcome::Duplicate,
            Err(e) => PageOutcome::Failed(e.to_string()),
        }
    }

    async fn save_description(&mut self) -> Option<BookInfo> {
        let raw = match self.source.book_info().await {
            Ok(raw) => raw,
            Err(e) => {
                warn!(error = %e, "Failed to read book description");
                return None;
            }
        };
        let info = BookInfo::from_raw(raw);
        match self.store.write_description(&info).await {
            Ok(path) => {
                info!(path = %path.display(), "Book description saved");
                Some(info)
            }
            Err(e) => {
                warn!(error = %e, "Failed to save book description");
                None
            }
        }
    }

    async fn discover_page_count(&mut self) -> Option<usize> {
        match self.source.page_count().await {
            Ok(Some(total)) => {
                info!(total, "Discovered page count");
                Some(total)
            }
            Ok(None) => {
                warn!("Could not determine page count");
                None
            }
            Err(e) => {
                warn!(error = %e, "Page count discovery failed");
                None
            }
        }
    }
}

fn log_outcome(page: usize, outcome: &PageOutcome) {
    match outcome {
        PageOutcome::Saved { bytes } => info!(page, kb = bytes / 1024, "Saved page"),
        PageOutcome::NoImage => warn!(page, "No page image found"),
        PageOutcome::TooSmall { bytes } => warn!(page, bytes, "Image too small; skipped"),
        PageOutcome::Duplicate => warn!(page, "Duplicate image; skipped"),
        PageOutcome::Failed(e) => warn!(page, error = %e, "Page failed"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_mode_uses_discovered_count() {
        assert_eq!(effective_ceiling(PageLimit::All, Some(37), 500), 37);
    }

    #[test]
    fn test_all_mode_without_count_uses_ceiling() {
        assert_eq!(effective_ceiling(PageLimit::All, None, 500), 500);
        assert_eq!(effective_ceiling(PageLimit::All, Some(0), 500), 500);
    }

    #[test]
    fn test_explicit_count_wins_when_smaller() {
        assert_eq!(effective_ceiling(PageLimit::Count(10), Some(37), 500), 10);
    }

    #[test]
    fn test_explicit_count_lowered_to_book_length() {
        assert_eq!(effective_ceiling(PageLimit::Count(20), Some(12), 500), 12);
        assert_eq!(effective_ceiling(PageLimit::Count(20), None, 500), 20);
    }

    #[test]
    fn test_options_from_config() {
        let fetch = FetchConfig::default();
        let options = DownloadOptions::from_config(&fetch, PageLimit::All, PathBuf::from("out"));
        assert_eq!(options.failure_limit, 5);
        assert_eq!(options.all_pages_ceiling, 500);
        assert_eq!(options.min_image_bytes, 5000);
        assert_eq!(options.page_delay, Duration::from_millis(800));
    }
}
