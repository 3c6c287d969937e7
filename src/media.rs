//! Image and file sources handed over by the bridge layer
//!
//! The JavaScript side passes media either as a `file://` URI or as a base64
//! string. [`ImageSource`] tells the two apart and loads the raw bytes.

use std::path::{Path, PathBuf};

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use log::debug;

use crate::error::WechatError;

const FILE_SCHEME: &str = "file://";

/// Where the bytes of a media payload come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    /// Local file referenced by a `file://` URI
    File(PathBuf),
    /// Inline base64 payload (standard alphabet, whitespace allowed)
    Base64(String),
}

impl ImageSource {
    /// Classify a bridge string
    ///
    /// # Errors
    /// Returns `WechatError::Media` for an empty string or an empty file URI
    pub fn parse(value: &str) -> Result<Self, WechatError> {
        let value = value.trim();
        if value.is_empty() {
            return Err(WechatError::Media("media source is empty".to_string()));
        }

        match value.strip_prefix(FILE_SCHEME) {
            Some("") => Err(WechatError::Media("file URI has no path".to_string())),
            Some(path) => Ok(Self::File(PathBuf::from(path))),
            None => Ok(Self::Base64(value.to_string())),
        }
    }

    /// Path of a file source
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::File(path) => Some(path),
            Self::Base64(_) => None,
        }
    }

    /// Read or decode the source into raw bytes
    ///
    /// # Errors
    /// Returns `WechatError::Media` when the file cannot be read or the base64
    /// payload is malformed or empty
    pub async fn load(&self) -> Result<Vec<u8>, WechatError> {
        let bytes = match self {
            Self::File(path) => tokio::fs::read(path).await.map_err(|e| {
                WechatError::Media(format!("cannot read {}: {}", path.display(), e))
            })?,
            Self::Base64(encoded) => decode_base64(encoded)?,
        };

        if bytes.is_empty() {
            return Err(WechatError::Media("media source has no data".to_string()));
        }

        debug!("[Media] loaded {} bytes from {}", bytes.len(), self.kind());
        Ok(bytes)
    }

    fn kind(&self) -> &'static str {
        match self {
            Self::File(_) => "file",
            Self::Base64(_) => "base64",
        }
    }
}

/// Parse and load in one step
pub async fn load(value: &str) -> Result<Vec<u8>, WechatError> {
    ImageSource::parse(value)?.load().await
}

pub(crate) fn decode_base64(encoded: &str) -> Result<Vec<u8>, WechatError> {
    let compact: String = encoded.chars().filter(|c| !c.is_whitespace()).collect();
    BASE64
        .decode(compact.as_bytes())
        .map_err(|e| WechatError::Media(format!("invalid base64 payload: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_file_uri() {
        let source = ImageSource::parse("file:///tmp/photo.jpg").unwrap();
        assert_eq!(source, ImageSource::File(PathBuf::from("/tmp/photo.jpg")));
        assert_eq!(source.path(), Some(Path::new("/tmp/photo.jpg")));
    }

    #[test]
    fn test_parse_base64() {
        let source = ImageSource::parse("aGVsbG8=").unwrap();
        assert_eq!(source, ImageSource::Base64("aGVsbG8=".to_string()));
        assert!(source.path().is_none());
    }

    #[test]
    fn test_parse_empty() {
        assert!(ImageSource::parse("").is_err());
        assert!(ImageSource::parse("   ").is_err());
        assert!(ImageSource::parse("file://").is_err());
    }

    #[test]
    fn test_decode_base64_ignores_line_breaks() {
        let bytes = decode_base64("aGVs\nbG8g\r\nd29y bGQ=").unwrap();
        assert_eq!(bytes, b"hello world");
    }

    #[test]
    fn test_decode_base64_invalid() {
        let result = decode_base64("not*base64");
        assert!(matches!(result, Err(WechatError::Media(_))));
    }

    #[tokio::test]
    async fn test_load_base64() {
        let bytes = load("aGVsbG8=").await.unwrap();
        assert_eq!(bytes, b"hello");
    }

    #[tokio::test]
    async fn test_load_missing_file() {
        let result = load("file:///definitely/not/here.png").await;
        assert!(matches!(result, Err(WechatError::Media(_))));
    }

    #[tokio::test]
    async fn test_load_file() {
        let path = std::env::temp_dir().join(format!("wechat_open_media_{}.bin", std::process::id()));
        tokio::fs::write(&path, b"\x89PNG").await.unwrap();

        let uri = format!("file://{}", path.display());
        let bytes = load(&uri).await.unwrap();
        assert_eq!(bytes, b"\x89PNG");

        tokio::fs::remove_file(&path).await.unwrap();
    }
}
