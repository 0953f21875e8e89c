//! In-page JavaScript evaluated against the viewer.
//!
//! Every script is an IIFE returning a plain object so the result always
//! serializes by value.

use serde::Deserialize;

/// XPath of the viewer toolbar button that opens the book info panel.
pub(crate) const INFO_BUTTON_XPATH: &str = r#"//*[@id="app"]/div[1]/div[1]/div/ul/li[7]/button"#;

/// First element whose computed background is an inline JPEG, in document order.
pub(crate) const PAGE_IMAGE_SCRIPT: &str = r#"(() => {
    const re = /url\("?(data:image\/jpeg;base64,[^"]+)"?\)/;
    for (const element of document.querySelectorAll('*')) {
        const bg = window.getComputedStyle(element).backgroundImage;
        if (bg && bg.includes('data:image/jpeg')) {
            const match = bg.match(re);
            if (match) {
                return { imageData: match[1] };
            }
        }
    }
    return { imageData: null };
})()"#;

/// Title, author, visible text and location of the current document.
pub(crate) const BOOK_INFO_SCRIPT: &str = r#"(() => {
    const firstText = (selectors, minLength) => {
        for (const selector of selectors) {
            const elem = document.querySelector(selector);
            if (elem) {
                const text = elem.textContent.trim();
                if (text.length > minLength) {
                    return text;
                }
            }
        }
        return null;
    };
    return {
        title: firstText(['h1', 'h2', '.title', '[class*="title"]'], 10),
        author: firstText(['[class*="author"]', '.creator', '.metadata .author'], 0),
        text: document.body ? (document.body.innerText || '') : '',
        url: window.location.href,
    };
})()"#;

/// Scroll the preview sidebar to the bottom so lazy items render.
pub(crate) const SCROLL_PREVIEWS_SCRIPT: &str = r#"(() => {
    const container = document.querySelector('.sidebar__scroll-container');
    if (container) {
        container.scrollTop = container.scrollHeight;
        return { scrolled: true };
    }
    return { scrolled: false };
})()"#;

/// Count preview entries, trying each selector in priority order.
pub(crate) const COUNT_PREVIEWS_SCRIPT: &str = r#"(() => {
    const selectors = [
        '.preview-list__item',
        '.preview-viewer__scroll-container li',
        '.sidebar__container li',
    ];
    for (const selector of selectors) {
        const items = document.querySelectorAll(selector);
        if (items.length > 0) {
            return { count: items.length, selector };
        }
    }
    return { count: null, selector: null };
})()"#;

#[derive(Debug, Deserialize)]
pub(crate) struct ScrollResult {
    pub scrolled: bool,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CountResult {
    pub count: Option<usize>,
    pub selector: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_count_selectors_in_priority_order() {
        let list = COUNT_PREVIEWS_SCRIPT.find(".preview-list__item").unwrap();
        let scroll = COUNT_PREVIEWS_SCRIPT
            .find(".preview-viewer__scroll-container li")
            .unwrap();
        let sidebar = COUNT_PREVIEWS_SCRIPT.find(".sidebar__container li").unwrap();
        assert!(list < scroll && scroll < sidebar);
    }

    #[test]
    fn test_title_selectors_in_priority_order() {
        let h1 = BOOK_INFO_SCRIPT.find("'h1'").unwrap();
        let h2 = BOOK_INFO_SCRIPT.find("'h2'").unwrap();
        let class = BOOK_INFO_SCRIPT.find("'.title'").unwrap();
        assert!(h1 < h2 && h2 < class);
    }

    #[test]
    fn test_scripts_are_iifes() {
        for script in [
            PAGE_IMAGE_SCRIPT,
            BOOK_INFO_SCRIPT,
            SCROLL_PREVIEWS_SCRIPT,
            COUNT_PREVIEWS_SCRIPT,
        ] {
            assert!(script.starts_with("(() => {"));
            assert!(script.ends_with("})()"));
        }
    }

    #[test]
    fn test_count_result_deser() {
        let found: CountResult =
            serde_json::from_str(r#"{"count": 37, "selector": ".preview-list__item"}"#).unwrap();
        assert_eq!(found.count, Some(37));
        assert_eq!(found.selector.as_deref(), Some(".preview-list__item"));

        let missing: CountResult =
            serde_json::from_str(r#"{"count": null, "selector": null}"#).unwrap();
        assert!(missing.count.is_none());
    }

    #[test]
    fn test_scroll_result_deser() {
        let result: ScrollResult = serde_json::from_str(r#"{"scrolled": false}"#).unwrap();
        assert!(!result.scrolled);
    }
}
