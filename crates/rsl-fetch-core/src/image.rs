//! Decoding of inline JPEG data URLs.

use base64::Engine;

use crate::error::{Result, RslFetchError};

const JPEG_DATA_URL_PREFIX: &str = "data:image/jpeg";

/// Decode a `data:image/jpeg;base64,...` URL into raw JPEG bytes.
pub fn decode_data_url(data_url: &str) -> Result<Vec<u8>> {
    if !data_url.starts_with(JPEG_DATA_URL_PREFIX) {
        return Err(RslFetchError::Decode(format!(
            "not a JPEG data URL: {}",
            preview(data_url)
        )));
    }

    let (_, payload) = data_url
        .split_once(',')
        .ok_or_else(|| RslFetchError::Decode("data URL has no payload".into()))?;

    base64::engine::general_purpose::STANDARD
        .decode(payload.trim())
        .map_err(|e| RslFetchError::Decode(e.to_string()))
}

fn preview(s: &str) -> &str {
    match s.char_indices().nth(32) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data_url(bytes: &[u8]) -> String {
        format!(
            "data:image/jpeg;base64,{}",
            base64::engine::general_purpose::STANDARD.encode(bytes)
        )
    }

    #[test]
    fn test_decode_data_url() {
        let bytes = vec![0xFF, 0xD8, 0xFF, 0xE0, 1, 2, 3];
        assert_eq!(decode_data_url(&data_url(&bytes)).unwrap(), bytes);
    }

    #[test]
    fn test_rejects_other_mime_types() {
        let err = decode_data_url("data:image/png;base64,iVBORw0KGgo=").unwrap_err();
        assert!(matches!(err, RslFetchError::Decode(_)));
    }

    #[test]
    fn test_rejects_missing_payload() {
        assert!(decode_data_url("data:image/jpeg;base64").is_err());
    }

    #[test]
    fn test_rejects_invalid_base64() {
        assert!(decode_data_url("data:image/jpeg;base64,@@not base64@@").is_err());
    }
}
