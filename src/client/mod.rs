//! WeChat HTTP Client module
//!
//! This module contains the WechatClient, the WechatOpen facade and its builder.

mod wechat_client;
pub use wechat_client::{WechatClient, WechatClientBuilder};

mod wechat_open;
pub use wechat_open::WechatOpen;

mod builder;
pub use builder::WechatOpenBuilder;
