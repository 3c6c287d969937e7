//! Unified WeChat Open Platform client

use std::sync::Arc;

use crate::api::oauth::{OAuthAccessToken, OAuthApi, UserInfo};
use crate::api::qr_auth::{QrAuthApi, QrAuthParams};
use crate::api::WechatContext;
use crate::error::WechatError;
use crate::share::ShareComposer;
use crate::thumbnail::ThumbnailCompressor;

/// Unified WeChat Open Platform client
///
/// Entry point for the HTTP side of the SDK: credential caching, QR login
/// signing, OAuth and share thumbnail compression. Cheap to clone.
///
/// # Example
///
/// ```rust,ignore
/// use wechat_open_sdk::WechatOpen;
/// use wechat_open_sdk::types::{AppId, AppSecret};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let wechat = WechatOpen::builder()
///         .appid(AppId::new("wx1234567890abcdef")?)
///         .secret(AppSecret::new("your_secret")?)
///         .build()?;
///
///     let user = wechat.oauth_login("code").await?;
///     println!("Nickname: {}", user.nickname);
///
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct WechatOpen {
    context: Arc<WechatContext>,
    compressor: Arc<ThumbnailCompressor>,
}

impl std::fmt::Debug for WechatOpen {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WechatOpen")
            .field("appid", &self.appid())
            .field("compressor", &self.compressor)
            .finish_non_exhaustive()
    }
}

impl WechatOpen {
    pub(crate) fn new(context: Arc<WechatContext>, compressor: Arc<ThumbnailCompressor>) -> Self {
        Self {
            context,
            compressor,
        }
    }

    pub fn builder() -> super::builder::WechatOpenBuilder {
        super::builder::WechatOpenBuilder::default()
    }

    pub fn appid(&self) -> &str {
        self.context.client.appid()
    }

    pub fn context(&self) -> &Arc<WechatContext> {
        &self.context
    }

    pub fn compressor(&self) -> &Arc<ThumbnailCompressor> {
        &self.compressor
    }

    // Credentials

    pub async fn get_access_token(&self) -> Result<String, WechatError> {
        self.context.token_manager.get_token().await
    }

    pub async fn get_sdk_ticket(&self) -> Result<String, WechatError> {
        self.context.token_manager.get_sdk_ticket().await
    }

    /// Drop both the cached access token and SDK ticket
    pub async fn invalidate_token(&self) {
        self.context.token_manager.invalidate().await;
    }

    // QR login

    pub async fn prepare_qr_auth(&self, scope: &str) -> Result<QrAuthParams, WechatError> {
        QrAuthApi::new(self.context.clone()).prepare(scope).await
    }

    // OAuth

    pub async fn oauth_exchange_code(&self, code: &str) -> Result<OAuthAccessToken, WechatError> {
        OAuthApi::new(self.context.clone()).exchange_code(code).await
    }

    pub async fn oauth_user_info(
        &self,
        access_token: &str,
        openid: &str,
    ) -> Result<UserInfo, WechatError> {
        OAuthApi::new(self.context.clone())
            .user_info(access_token, openid)
            .await
    }

    pub async fn oauth_login(&self, code: &str) -> Result<UserInfo, WechatError> {
        OAuthApi::new(self.context.clone()).login(code).await
    }

    // Share

    /// Share composer backed by this client's compressor
    pub fn share_composer(&self) -> ShareComposer {
        ShareComposer::new(self.compressor.clone())
    }
}
