use std::sync::Arc;

use thiserror::Error;

/// HTTP transport level failures
#[derive(Debug, Clone, Error)]
pub enum HttpError {
    #[error("request failed: {0}")]
    Reqwest(Arc<reqwest::Error>),

    #[error("response decode failed: {0}")]
    Decode(String),
}

/// Thumbnail compression failures
///
/// None of these is fatal to a share: callers drop the thumbnail and go on.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ThumbnailError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("image decode failed: {0}")]
    Decode(String),

    #[error("image encode failed: {0}")]
    Encode(String),

    #[error("cannot fit image into {budget} bytes (smallest attempt was {smallest} bytes)")]
    BudgetUnreachable { budget: usize, smallest: usize },

    #[error("compression cancelled")]
    Cancelled,
}

/// WeChat SDK error types
#[derive(Debug, Error)]
pub enum WechatError {
    #[error("HTTP error: {0}")]
    Http(HttpError),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("WeChat API error (code={code}): {message}")]
    Api { code: i32, message: String },

    #[error("Access token error: {0}")]
    Token(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Signature error: {0}")]
    Signature(String),

    #[error("Media source error: {0}")]
    Media(String),

    #[error("Thumbnail error: {0}")]
    Thumbnail(#[from] ThumbnailError),

    #[error("Dispatch error: {0}")]
    Dispatch(String),
}

impl From<reqwest::Error> for WechatError {
    fn from(e: reqwest::Error) -> Self {
        WechatError::Http(HttpError::Reqwest(Arc::new(e)))
    }
}

impl WechatError {
    /// Turn a WeChat `errcode`/`errmsg` pair into a result.
    pub(crate) fn check_api(errcode: i32, errmsg: &str) -> Result<(), WechatError> {
        if errcode != 0 {
            return Err(WechatError::Api {
                code: errcode,
                message: errmsg.to_string(),
            });
        }
        Ok(())
    }

    /// Whether the error says the access token is stale.
    pub(crate) fn is_token_expired(&self) -> bool {
        matches!(self, WechatError::Api { code, .. } if *code == 40001 || *code == 42001)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_api_success() {
        assert!(WechatError::check_api(0, "ok").is_ok());
    }

    #[test]
    fn test_check_api_failure() {
        let err = WechatError::check_api(40013, "invalid appid").unwrap_err();
        match err {
            WechatError::Api { code, message } => {
                assert_eq!(code, 40013);
                assert_eq!(message, "invalid appid");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_token_expired_codes() {
        let expired = WechatError::Api {
            code: 42001,
            message: "access_token expired".into(),
        };
        assert!(expired.is_token_expired());

        let other = WechatError::Api {
            code: 40013,
            message: "invalid appid".into(),
        };
        assert!(!other.is_token_expired());
    }

    #[test]
    fn test_thumbnail_error_converts() {
        let err: WechatError = ThumbnailError::Cancelled.into();
        assert!(matches!(err, WechatError::Thumbnail(ThumbnailError::Cancelled)));
    }
}
