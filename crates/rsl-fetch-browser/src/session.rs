//! Viewer session — one Chrome instance with one page, pointed at a single book.

use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig as CdpConfig};
use chromiumoxide::cdp::browser_protocol::network::SetUserAgentOverrideParams;
use chromiumoxide::cdp::browser_protocol::page::{EventLifecycleEvent, SetLifecycleEventsEnabledParams};
use chromiumoxide::cdp::js_protocol::runtime::EvaluateParams;
use chromiumoxide::handler::viewport::Viewport;
use chromiumoxide::Page;
use futures::StreamExt;
use serde::de::DeserializeOwned;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use rsl_fetch_core::config::BrowserConfig;
use rsl_fetch_core::error::{Result, RslFetchError};
use rsl_fetch_core::source::PageSource;
use rsl_fetch_core::types::{BookId, PageExtract, RawBookInfo};

use crate::lifecycle::IdleWatch;
use crate::scripts::{
    BOOK_INFO_SCRIPT, COUNT_PREVIEWS_SCRIPT, CountResult, INFO_BUTTON_XPATH, PAGE_IMAGE_SCRIPT,
    SCROLL_PREVIEWS_SCRIPT, ScrollResult,
};

/// A live browser session on the viewer for one book.
pub struct ViewerSession {
    browser: Browser,
    page: Page,
    handler: Option<JoinHandle<()>>,
    book_id: BookId,
    viewer_base: String,
    config: BrowserConfig,
    visited: bool,
}

impl ViewerSession {
    /// Launch Chrome and open a blank page with the configured viewport and user agent.
    pub async fn launch(config: &BrowserConfig, book_id: BookId, viewer_base: String) -> Result<Self> {
        let mut builder = CdpConfig::builder()
            .window_size(config.viewport_width, config.viewport_height)
            .viewport(Viewport {
                width: config.viewport_width,
                height: config.viewport_height,
                ..Viewport::default()
            })
            .request_timeout(Duration::from_millis(config.timeout_ms));
        if !config.headless {
            builder = builder.with_head();
        }
        // A configured path that does not exist falls back to auto-detect
        if let Some(path) = config.usable_chrome_path() {
            builder = builder.chrome_executable(path);
        }
        let cdp_config = builder.build().map_err(RslFetchError::Browser)?;

        info!(headless = config.headless, "Launching browser");
        let (browser, mut handler) = Browser::launch(cdp_config)
            .await
            .map_err(|e| RslFetchError::Browser(e.to_string()))?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!(error = %e, "CDP handler stopped");
                    break;
                }
            }
        });

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| RslFetchError::Browser(e.to_string()))?;
        page.set_user_agent(SetUserAgentOverrideParams::new(config.user_agent.clone()))
            .await
            .map_err(|e| RslFetchError::Browser(e.to_string()))?;
        page.execute(SetLifecycleEventsEnabledParams::new(true))
            .await
            .map_err(|e| RslFetchError::Browser(e.to_string()))?;

        info!(url = %book_id.viewer_url(&viewer_base), "Opened viewer session");

        Ok(Self {
            browser,
            page,
            handler: Some(handler),
            book_id,
            viewer_base,
            config: config.clone(),
            visited: false,
        })
    }

    async fn evaluate<T: DeserializeOwned>(&self, script: &str) -> Result<T> {
        let params = EvaluateParams::builder()
            .expression(script)
            .return_by_value(true)
            .build()
            .map_err(RslFetchError::Extraction)?;
        let result = self
            .page
            .evaluate_expression(params)
            .await
            .map_err(|e| RslFetchError::Extraction(e.to_string()))?;
        result
            .into_value()
            .map_err(|e| RslFetchError::Extraction(e.to_string()))
    }

    /// Best-effort click on the info button so metadata is rendered.
    async fn reveal_info_panel(&self) {
        match self.page.find_xpath(INFO_BUTTON_XPATH).await {
            Ok(button) => {
                if let Err(e) = button.click().await {
                    debug!(error = %e, "Info button click failed");
                    return;
                }
                settle(self.config.info_click_settle_ms).await;
            }
            Err(e) => debug!(error = %e, "Info button not found"),
        }
    }
}

#[async_trait]
impl PageSource for ViewerSession {
    async fn open_page(&mut self, page: usize) -> Result<()> {
        let url = self.book_id.page_url(&self.viewer_base, page);
        debug!(page, url = %url, "Browser navigate");

        // Subscribe before navigating so the new document's `init` is not missed
        let mut events = self
            .page
            .event_listener::<EventLifecycleEvent>()
            .await
            .map_err(|e| RslFetchError::Navigation(format!("{url}: {e}")))?;
        let main_frame = self
            .page
            .mainframe()
            .await
            .ok()
            .flatten()
            .map(|frame| frame.inner().clone());
        let mut watch = IdleWatch::new(main_frame);

        let page_handle = &self.page;
        let navigate = async {
            if let Err(e) = page_handle.goto(url.as_str()).await {
                return Err(RslFetchError::Navigation(format!("{url}: {e}")));
            }
            while let Some(event) = events.next().await {
                if watch.observe(event.frame_id.inner(), event.loader_id.inner(), &event.name) {
                    return Ok(());
                }
            }
            Err(RslFetchError::Navigation(format!(
                "{url}: lifecycle events ended before network idle"
            )))
        };

        let timeout = Duration::from_millis(self.config.timeout_ms);
        match tokio::time::timeout(timeout, navigate).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(RslFetchError::Navigation(format!(
                    "{url}: timed out after {}ms",
                    self.config.timeout_ms
                )));
            }
        }

        let pause = if self.visited {
            self.config.settle_ms
        } else {
            self.config.first_page_settle_ms
        };
        self.visited = true;
        settle(pause).await;
        Ok(())
    }

    async fn page_image(&mut self) -> Result<PageExtract> {
        self.evaluate(PAGE_IMAGE_SCRIPT).await
    }

    async fn book_info(&mut self) -> Result<RawBookInfo> {
        self.reveal_info_panel().await;
        self.evaluate(BOOK_INFO_SCRIPT).await
    }

    async fn page_count(&mut self) -> Result<Option<usize>> {
        let scroll: ScrollResult = self.evaluate(SCROLL_PREVIEWS_SCRIPT).await?;
        if !scroll.scrolled {
            debug!("Preview sidebar not found; counting what is rendered");
        }
        settle(self.config.scroll_settle_ms).await;

        let result: CountResult = self.evaluate(COUNT_PREVIEWS_SCRIPT).await?;
        if let (Some(count), Some(selector)) = (result.count, &result.selector) {
            debug!(count, selector = %selector, "Counted preview items");
        }
        Ok(result.count)
    }

    async fn close(&mut self) -> Result<()> {
        let closed = self
            .browser
            .close()
            .await
            .map(|_| ())
            .map_err(|e| RslFetchError::Browser(e.to_string()));
        let _ = self.browser.wait().await;
        if let Some(handler) = self.handler.take() {
            let _ = handler.await;
        }
        debug!("Browser closed");
        closed
    }
}

async fn settle(ms: u64) {
    if ms > 0 {
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }
}
