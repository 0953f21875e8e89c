//! Book directory store — writes page JPEGs and the description, skipping
//! duplicates and placeholder-sized images.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tracing::debug;

use crate::error::Result;
use crate::types::{BookId, BookInfo};

pub const DESCRIPTION_FILE: &str = "description.txt";

/// What happened to a decoded page image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    Saved { path: PathBuf, bytes: usize },
    TooSmall { bytes: usize },
    Duplicate,
}

/// File-based store for one book.
///
/// Layout:
/// - `<output>/<book_id>/description.txt`
/// - `<output>/<book_id>/page_0001.jpg` ... one file per unique page
pub struct BookStore {
    dir: PathBuf,
    min_image_bytes: usize,
    seen: HashSet<String>,
}

impl BookStore {
    pub fn new(output_dir: &Path, book_id: &BookId, min_image_bytes: usize) -> Self {
        Self {
            dir: output_dir.join(book_id.as_str()),
            min_image_bytes,
            seen: HashSet::new(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn page_path(&self, page: usize) -> PathBuf {
        self.dir.join(format!("page_{page:04}.jpg"))
    }

    /// Create the book directory, reusing it if it already exists.
    pub async fn prepare(&self) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir).await?;
        Ok(())
    }

    /// Save one page unless it is undersized or already seen this run.
    pub async fn save_page(&mut self, page: usize, data: &[u8]) -> Result<SaveOutcome> {
        if data.len() <= self.min_image_bytes {
            return Ok(SaveOutcome::TooSmall { bytes: data.len() });
        }

        let hash = content_hash(data);
        if self.seen.contains(&hash) {
            debug!(page, hash = %hash, "Duplicate page image");
            return Ok(SaveOutcome::Duplicate);
        }

        let path = self.page_path(page);
        write_atomic(&path, data).await?;
        self.seen.insert(hash);

        Ok(SaveOutcome::Saved {
            path,
            bytes: data.len(),
        })
    }

    /// Write `description.txt`, replacing any previous one.
    pub async fn write_description(&self, info: &BookInfo) -> Result<PathBuf> {
        let path = self.dir.join(DESCRIPTION_FILE);
        write_atomic(&path, info.render().as_bytes()).await?;
        Ok(path)
    }
}

/// SHA-256 of the image bytes, hex encoded.
pub fn content_hash(data: &[u8]) -> String {
    format!("{:x}", Sha256::digest(data))
}

async fn write_atomic(path: &Path, data: &[u8]) -> Result<()> {
    // Atomic write: write to temp then rename
    let tmp = path.with_extension("tmp");
    tokio::fs::write(&tmp, data).await?;
    if let Err(e) = tokio::fs::rename(&tmp, path).await {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(e.into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MIN_IMAGE_BYTES;
    use crate::types::RawBookInfo;

    fn book() -> BookId {
        BookId::from_url("rsl01001234567").unwrap()
    }

    fn jpeg(len: usize, fill: u8) -> Vec<u8> {
        let mut data = vec![fill; len];
        data[0] = 0xFF;
        data[1] = 0xD8;
        data
    }

    #[tokio::test]
    async fn test_prepare_creates_book_dir() {
        let dir = tempfile::tempdir().unwrap();
        let store = BookStore::new(dir.path(), &book(), MIN_IMAGE_BYTES);
        store.prepare().await.unwrap();
        assert!(dir.path().join("rsl01001234567").is_dir());
        // Reusing an existing directory is fine
        store.prepare().await.unwrap();
    }

    #[tokio::test]
    async fn test_size_threshold_boundary() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = BookStore::new(dir.path(), &book(), MIN_IMAGE_BYTES);
        store.prepare().await.unwrap();

        let outcome = store.save_page(1, &jpeg(5000, 1)).await.unwrap();
        assert_eq!(outcome, SaveOutcome::TooSmall { bytes: 5000 });
        assert!(!store.page_path(1).exists());

        let outcome = store.save_page(1, &jpeg(5001, 1)).await.unwrap();
        assert!(matches!(outcome, SaveOutcome::Saved { bytes: 5001, .. }));
        assert_eq!(std::fs::read(store.page_path(1)).unwrap().len(), 5001);
    }

    #[tokio::test]
    async fn test_duplicate_not_written() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = BookStore::new(dir.path(), &book(), MIN_IMAGE_BYTES);
        store.prepare().await.unwrap();

        let image = jpeg(6000, 7);
        assert!(matches!(
            store.save_page(1, &image).await.unwrap(),
            SaveOutcome::Saved { .. }
        ));
        assert_eq!(store.save_page(2, &image).await.unwrap(), SaveOutcome::Duplicate);
        assert!(!store.page_path(2).exists());
        assert!(matches!(
            store.save_page(3, &jpeg(6000, 8)).await.unwrap(),
            SaveOutcome::Saved { .. }
        ));
    }

    #[tokio::test]
    async fn test_existing_page_file_is_overwritten() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = BookStore::new(dir.path(), &book(), MIN_IMAGE_BYTES);
        store.prepare().await.unwrap();
        std::fs::write(store.page_path(1), b"stale").unwrap();

        store.save_page(1, &jpeg(5500, 3)).await.unwrap();
        assert_eq!(std::fs::read(store.page_path(1)).unwrap().len(), 5500);
        assert!(!store.page_path(1).with_extension("tmp").exists());
    }

    #[tokio::test]
    async fn test_write_description() {
        let dir = tempfile::tempdir().unwrap();
        let store = BookStore::new(dir.path(), &book(), MIN_IMAGE_BYTES);
        store.prepare().await.unwrap();

        let info = BookInfo::from_raw_on(
            RawBookInfo {
                title: Some("A sufficiently long title".into()),
                url: "https://viewer.rsl.ru/ru/rsl01001234567?page=1".into(),
                ..RawBookInfo::default()
            },
            chrono::NaiveDate::from_ymd_opt(2026, 10, 16).unwrap(),
        );
        let path = store.write_description(&info).await.unwrap();
        assert_eq!(path.file_name().unwrap(), DESCRIPTION_FILE);
        let written = std::fs::read_to_string(path).unwrap();
        assert!(written.starts_with("A sufficiently long title\n\n"));
        assert!(written.ends_with("Скачано: 2026-10-16\n"));
    }

    #[test]
    fn test_content_hash_distinguishes_payloads() {
        assert_eq!(content_hash(b"page"), content_hash(b"page"));
        assert_ne!(content_hash(b"page one"), content_hash(b"page two"));
        assert_eq!(content_hash(b"").len(), 64);
    }
}
