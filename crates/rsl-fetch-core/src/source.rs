//! Page source abstraction — the rendering engine as seen by the download loop.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{PageExtract, RawBookInfo};

/// A viewer session that can be pointed at one page at a time.
///
/// Implemented by the browser driver; tests use scripted fakes.
#[async_trait]
pub trait PageSource: Send {
    /// Navigate to the 1-based page and wait for it to settle.
    async fn open_page(&mut self, page: usize) -> Result<()>;

    /// Scan the current page for its inline JPEG background.
    async fn page_image(&mut self) -> Result<PageExtract>;

    /// Scrape book metadata from the current page.
    async fn book_info(&mut self) -> Result<RawBookInfo>;

    /// Count the pages listed in the viewer's preview sidebar, if it can be found.
    async fn page_count(&mut self) -> Result<Option<usize>>;

    /// Shut the session down.
    async fn close(&mut self) -> Result<()>;
}
