//! Page lifecycle tracking for navigations that wait on network idle.

const INIT: &str = "init";
const NETWORK_IDLE: &str = "networkIdle";

/// Follows main-frame lifecycle events for a single navigation.
///
/// Only a `networkIdle` from the document whose `init` was observed after
/// subscribing counts, so a late event from the previous page is ignored.
#[derive(Debug, Default)]
pub(crate) struct IdleWatch {
    frame_id: Option<String>,
    loader_id: Option<String>,
}

impl IdleWatch {
    /// `frame_id` is the main frame; `None` accepts events from any frame.
    pub(crate) fn new(frame_id: Option<String>) -> Self {
        Self {
            frame_id,
            loader_id: None,
        }
    }

    /// Feed one lifecycle event; returns `true` once the new document is network-idle.
    pub(crate) fn observe(&mut self, frame_id: &str, loader_id: &str, name: &str) -> bool {
        if self.frame_id.as_deref().is_some_and(|main| main != frame_id) {
            return false;
        }
        match name {
            INIT => {
                self.loader_id = Some(loader_id.to_string());
                false
            }
            NETWORK_IDLE => self.loader_id.as_deref() == Some(loader_id),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_idle_after_init_of_same_document() {
        let mut watch = IdleWatch::new(Some("main".into()));
        assert!(!watch.observe("main", "L2", "init"));
        assert!(!watch.observe("main", "L2", "DOMContentLoaded"));
        assert!(!watch.observe("main", "L2", "load"));
        assert!(watch.observe("main", "L2", "networkIdle"));
    }

    #[test]
    fn test_stale_idle_from_previous_document_ignored() {
        let mut watch = IdleWatch::new(Some("main".into()));
        assert!(!watch.observe("main", "L1", "networkIdle"));
        assert!(!watch.observe("main", "L2", "init"));
        assert!(!watch.observe("main", "L1", "networkIdle"));
        assert!(watch.observe("main", "L2", "networkIdle"));
    }

    #[test]
    fn test_subframe_events_ignored() {
        let mut watch = IdleWatch::new(Some("main".into()));
        assert!(!watch.observe("iframe", "X", "init"));
        assert!(!watch.observe("iframe", "X", "networkIdle"));
        assert!(!watch.observe("main", "L2", "init"));
        assert!(watch.observe("main", "L2", "networkIdle"));
    }

    #[test]
    fn test_unknown_main_frame_accepts_any_frame() {
        let mut watch = IdleWatch::new(None);
        assert!(!watch.observe("f", "L", "init"));
        assert!(watch.observe("f", "L", "networkIdle"));
    }

    #[test]
    fn test_almost_idle_is_not_enough() {
        let mut watch = IdleWatch::new(Some("main".into()));
        watch.observe("main", "L2", "init");
        assert!(!watch.observe("main", "L2", "networkAlmostIdle"));
    }
}
