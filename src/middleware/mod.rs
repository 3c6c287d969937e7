//! Middleware components for the HTTP side of the SDK.
//!
//! Middleware are plain tower layers wrapped around [`WechatClient`] and
//! installed with [`WechatOpenBuilder::with_middleware`].
//!
//! - [`LoggingMiddleware`] - Logs each request and response with credentials redacted
//!
//! ## Usage
//!
//! ```ignore
//! use wechat_open_sdk::middleware::LoggingMiddleware;
//!
//! let wechat = WechatOpen::builder()
//!     .appid(appid)
//!     .secret(secret)
//!     .with_middleware(LoggingMiddleware::new().verbose())
//!     .build()?;
//! ```
//!
//! [`WechatClient`]: crate::client::WechatClient
//! [`WechatOpenBuilder::with_middleware`]: crate::client::WechatOpenBuilder::with_middleware

// Re-export tower types for convenience
pub use tower::{Layer, Service, ServiceBuilder};

mod logging;

pub use logging::{redact_url, LoggingMiddleware, LoggingMiddlewareService};
