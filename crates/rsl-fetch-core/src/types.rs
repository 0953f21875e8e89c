use std::fmt;
use std::sync::LazyLock;

use chrono::{NaiveDate, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

static BOOK_ID_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"rsl\d+").unwrap());

static YEAR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?-u:\b)(1[89]\d{2}|20\d{2})(?-u:\b)").unwrap());

static TRAILING_BRACKET_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*\[.*?\]\s*$").unwrap());

/// Viewer identifier of a digitized book, e.g. `rsl01001234567`.
#[derive(Debug, Clone, Hash, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BookId(String);

impl BookId {
    /// Extract the first `rsl<digits>` token from a URL or any other string.
    pub fn from_url(url: &str) -> Option<Self> {
        BOOK_ID_RE.find(url).map(|m| Self(m.as_str().to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `{base}/{id}`
    pub fn viewer_url(&self, base: &str) -> String {
        format!("{}/{}", base.trim_end_matches('/'), self.0)
    }

    /// `{base}/{id}?page={page}`
    pub fn page_url(&self, base: &str, page: usize) -> String {
        format!("{}?page={page}", self.viewer_url(base))
    }
}

impl fmt::Display for BookId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Book metadata as scraped from the first viewer page, before cleanup.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawBookInfo {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    /// Visible text of the whole document, scanned for a publication year.
    #[serde(default)]
    pub text: Option<String>,
    pub url: String,
}

/// Cleaned-up book description written to `description.txt`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookInfo {
    pub title: Option<String>,
    pub author: Option<String>,
    pub year: Option<String>,
    pub url: String,
    pub date: NaiveDate,
}

impl BookInfo {
    /// Build a description dated today (UTC).
    pub fn from_raw(raw: RawBookInfo) -> Self {
        Self::from_raw_on(raw, Utc::now().date_naive())
    }

    pub fn from_raw_on(raw: RawBookInfo, date: NaiveDate) -> Self {
        let title = raw
            .title
            .as_deref()
            .map(clean_title)
            .filter(|t| !t.is_empty());
        let author = raw
            .author
            .map(|a| a.trim().to_string())
            .filter(|a| !a.is_empty());
        let year = raw.text.as_deref().and_then(last_year);
        Self {
            title,
            author,
            year,
            url: raw.url,
            date,
        }
    }

    /// Render the plain-text description; absent fields are omitted.
    pub fn render(&self) -> String {
        let mut out = String::new();
        if let Some(title) = &self.title {
            out.push_str(&format!("{title}\n\n"));
        }
        if let Some(author) = &self.author {
            out.push_str(&format!("Автор: {author}\n"));
        }
        if let Some(year) = &self.year {
            out.push_str(&format!("Год: {year}\n"));
        }
        out.push_str(&format!("\nИсточник: {}\n", self.url));
        out.push_str(&format!("Скачано: {}\n", self.date.format("%Y-%m-%d")));
        out
    }
}

/// Drop bracketed annotations such as `[Текст]` from the first `[` whose
/// bracket run reaches the end of the title.
pub fn clean_title(title: &str) -> String {
    TRAILING_BRACKET_RE.replace(title.trim(), "").trim().to_string()
}

/// The last four-digit year token (1800-2099) in the text.
///
/// Word boundaries are ASCII-only, so `1889г.` still yields `1889`.
pub fn last_year(text: &str) -> Option<String> {
    YEAR_RE
        .captures_iter(text)
        .last()
        .map(|caps| caps[1].to_string())
}

/// Result of scanning one rendered page for its image.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageExtract {
    /// First `data:image/jpeg;base64,...` background found in document order.
    #[serde(default)]
    pub image_data: Option<String>,
}
