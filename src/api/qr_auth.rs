//! QR-code login preparation
//!
//! A desktop or TV style login shows a QR code that the user scans with the
//! WeChat app. The platform SDK renders the code, but it must be handed a
//! signed request: a fresh nonce, a timestamp and the SHA1 signature over the
//! current SDK ticket. [`QrAuthApi::prepare`] produces exactly that.

use std::sync::Arc;

use log::info;
use serde::{Deserialize, Serialize};

use crate::api::r#trait::{WechatApi, WechatContext};
use crate::crypto::signature::{create_signature, generate_nonce, timestamp_millis};
use crate::error::WechatError;

/// Scope requesting the user's public profile
pub const SCOPE_USER_INFO: &str = "snsapi_userinfo";

/// Signed parameters for the platform SDK's QR-code auth call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QrAuthParams {
    pub appid: String,
    pub scope: String,
    pub nonce_str: String,
    /// Milliseconds since the unix epoch
    pub timestamp: String,
    /// Lowercase hex SHA1
    pub signature: String,
    /// Opaque data echoed back on iOS
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheme_data: Option<String>,
}

/// QR-code login API
pub struct QrAuthApi {
    context: Arc<WechatContext>,
}

impl QrAuthApi {
    pub fn new(context: Arc<WechatContext>) -> Self {
        Self { context }
    }

    /// Fetch (or reuse) the SDK ticket and sign a new QR login request
    ///
    /// # Errors
    /// - `WechatError::Config` when `scope` is empty
    /// - `WechatError::Http` / `WechatError::Api` when the token or ticket fetch fails
    pub async fn prepare(&self, scope: &str) -> Result<QrAuthParams, WechatError> {
        self.prepare_with_scheme_data(scope, None).await
    }

    pub async fn prepare_with_scheme_data(
        &self,
        scope: &str,
        scheme_data: Option<String>,
    ) -> Result<QrAuthParams, WechatError> {
        let scope = self.require_arg("scope", scope)?;

        let ticket = self.context.token_manager.get_sdk_ticket().await?;
        let appid = self.context.client.appid().to_string();
        let nonce_str = generate_nonce();
        let timestamp = timestamp_millis();
        let signature = create_signature(&appid, &nonce_str, &ticket, &timestamp);

        info!(
            "[{}] signed QR login request for {} (scope {})",
            self.api_name(),
            appid,
            scope
        );

        Ok(QrAuthParams {
            appid,
            scope: scope.to_string(),
            nonce_str,
            timestamp,
            signature,
            scheme_data,
        })
    }
}

impl WechatApi for QrAuthApi {
    fn context(&self) -> &WechatContext {
        &self.context
    }

    fn api_name(&self) -> &'static str {
        "qr_auth"
    }
}
