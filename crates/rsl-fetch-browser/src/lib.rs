//! CDP browser automation for the RSL book viewer.
//!
//! Provides [`ViewerSession`], the Chrome-backed [`PageSource`] used by the
//! download loop. Requires Chrome/Chromium installed.
//!
//! [`PageSource`]: rsl_fetch_core::source::PageSource

mod lifecycle;
mod scripts;
pub mod session;

pub use session::ViewerSession;
