//! WeChat Open Platform HTTP APIs
//!
//! - [`qr_auth`] - Signed parameters for QR-code login
//! - [`oauth`] - Auth code exchange and user profile
//!
//! ## Usage
//!
//! ```rust,ignore
//! use wechat_open_sdk::{WechatOpen, types::{AppId, AppSecret}};
//! ```

pub mod oauth;
pub mod qr_auth;
pub mod r#trait;

pub use oauth::{OAuthAccessToken, OAuthApi, UserInfo};
pub use qr_auth::{QrAuthApi, QrAuthParams, SCOPE_USER_INFO};
pub use r#trait::{WechatApi, WechatContext};
