//! Signing utilities for WeChat Open Platform requests
//!
//! Only the QR-code login signature lives here; everything else the platform
//! SDK signs on its own.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use wechat_open_sdk::crypto;
//!
//! let nonce = crypto::generate_nonce();
//! let signature = crypto::create_signature(appid, &nonce, sdk_ticket, &timestamp);
//! ```

pub mod signature;

pub use signature::{create_signature, generate_nonce};
