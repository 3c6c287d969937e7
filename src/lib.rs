//! WeChat Open Platform SDK core for Rust
//!
//! The host-side half of a WeChat Open Platform bridge. The proprietary
//! platform SDK stays behind the [`session::Transport`] trait; this crate
//! owns everything around it:
//!
//! | Area | Entry point |
//! |------|-------------|
//! | Share thumbnails | [`ThumbnailCompressor`] |
//! | Share requests | [`share::ShareComposer`] |
//! | QR-code login signing | [`WechatOpen::prepare_qr_auth`] |
//! | OAuth login | [`WechatOpen::oauth_login`] |
//! | Request/response routing | [`Session`] |
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use wechat_open_sdk::{WechatOpen, types::{AppId, AppSecret}};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let wechat = WechatOpen::builder()
//!         .appid(AppId::new("wx1234567890abcdef")?)
//!         .secret(AppSecret::new("your_secret")?)
//!         .build()?;
//!
//!     // Signed parameters for the platform SDK's QR login
//!     let params = wechat.prepare_qr_auth("snsapi_userinfo").await?;
//!     println!("signature: {}", params.signature);
//!
//!     // Squeeze an image under the 64 KB thumbnail limit
//!     let image = std::fs::read("photo.jpg")?;
//!     let thumb = wechat.compressor().compress(&image, 64)?.into_within_budget()?;
//!     println!("thumbnail: {} bytes", thumb.len());
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Modules
//!
//! - [`thumbnail`] - Adaptive thumbnail compression
//! - [`media`] - `file://` and base64 media sources
//! - [`share`] - Share options and the platform message model
//! - [`session`] - Platform session, dispatch and response routing
//! - [`event`] - Platform responses and relayed events
//! - [`api`] - QR login and OAuth HTTP APIs
//! - [`client`] - HTTP client and the [`WechatOpen`] facade
//! - [`crypto`] - QR login signature and nonce
//! - [`middleware`] - tower layers for the HTTP client
//! - [`token`] - Access token and SDK ticket cache
//! - [`error`] - Error types
//! - [`types`] - Validated ids, share scenes, mini program types
//!
//! ## Error Handling
//!
//! Network and platform failures surface as [`WechatError`]; compression
//! failures as [`ThumbnailError`], which converts into it:
//!
//! ```rust,ignore
//! use wechat_open_sdk::WechatError;
//!
//! match result {
//!     Ok(user) => { /* handle success */ }
//!     Err(WechatError::Api { code, message }) => {
//!         eprintln!("API error: {} - {}", code, message);
//!     }
//!     Err(WechatError::Thumbnail(e)) => {
//!         eprintln!("Thumbnail error: {}", e);
//!     }
//!     Err(e) => {
//!         eprintln!("Other error: {}", e);
//!     }
//! }
//! ```

pub mod api;
pub mod client;
pub mod crypto;
pub mod error;
pub mod event;
pub mod media;
pub mod middleware;
pub mod session;
pub mod share;
pub mod thumbnail;
pub mod token;
pub mod types;
mod utils;

pub use client::{WechatClient, WechatClientBuilder, WechatOpen, WechatOpenBuilder};
pub use error::{ThumbnailError, WechatError};
pub use event::WechatEvent;
pub use session::{Session, SessionConfig, Transport};
pub use share::ShareComposer;
pub use thumbnail::{CompressionOptions, Compressed, ThumbnailCompressor};
