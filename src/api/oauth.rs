//! App login through WeChat OAuth
//!
//! After the user approves an auth request the app receives a `code`. The
//! code is exchanged for a user-scoped access token, which in turn reads the
//! user's public profile.

use std::sync::Arc;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::api::r#trait::{WechatApi, WechatContext};
use crate::error::WechatError;

/// Response from `/sns/oauth2/access_token`
#[non_exhaustive]
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OAuthAccessToken {
    #[serde(default)]
    pub access_token: String,
    /// Lifetime in seconds
    #[serde(default)]
    pub expires_in: i64,
    #[serde(default)]
    pub refresh_token: String,
    #[serde(default)]
    pub openid: String,
    /// Granted scopes, comma separated
    #[serde(default)]
    pub scope: String,
    #[serde(default)]
    pub unionid: Option<String>,
}

/// Response from `/sns/userinfo`
#[non_exhaustive]
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UserInfo {
    #[serde(default)]
    pub openid: String,
    #[serde(default)]
    pub nickname: String,
    /// 1 male, 2 female, 0 unknown
    #[serde(default)]
    pub sex: i32,
    #[serde(default)]
    pub province: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub country: String,
    /// Avatar URL, empty when the user has none
    #[serde(default)]
    pub headimgurl: String,
    #[serde(default)]
    pub privilege: Vec<String>,
    #[serde(default)]
    pub unionid: Option<String>,
}

/// WeChat OAuth API
pub struct OAuthApi {
    context: Arc<WechatContext>,
}

impl OAuthApi {
    pub fn new(context: Arc<WechatContext>) -> Self {
        Self { context }
    }

    /// Exchange an auth `code` for a user access token
    ///
    /// GET /sns/oauth2/access_token
    pub async fn exchange_code(&self, code: &str) -> Result<OAuthAccessToken, WechatError> {
        let code = self.require_arg("code", code)?;

        let query = [
            ("appid", self.context.client.appid()),
            ("secret", self.context.client.secret()),
            ("code", code),
            ("grant_type", "authorization_code"),
        ];
        self.context.client.get("/sns/oauth2/access_token", &query).await
    }

    /// Read the profile of `openid` with a user access token
    ///
    /// GET /sns/userinfo
    pub async fn user_info(&self, access_token: &str, openid: &str) -> Result<UserInfo, WechatError> {
        let query = [("access_token", access_token), ("openid", openid)];
        self.context.client.get("/sns/userinfo", &query).await
    }

    /// [`exchange_code`](Self::exchange_code) followed by [`user_info`](Self::user_info)
    pub async fn login(&self, code: &str) -> Result<UserInfo, WechatError> {
        let token = self.exchange_code(code).await?;
        debug!("[{}] exchanged code for openid {}", self.api_name(), token.openid);
        let mut info = self.user_info(&token.access_token, &token.openid).await?;
        if info.unionid.is_none() {
            info.unionid = token.unionid;
        }
        Ok(info)
    }
}

impl WechatApi for OAuthApi {
    fn context(&self) -> &WechatContext {
        &self.context
    }

    fn api_name(&self) -> &'static str {
        "oauth"
    }
}
