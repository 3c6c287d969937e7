//! WeChat API trait and context
//!
//! Provides the base trait and context for all WeChat API implementations.

use std::sync::Arc;

use crate::client::WechatClient;
use crate::error::WechatError;
use crate::token::TokenManager;

/// Shared resources every API implementation needs: the HTTP client and the
/// credential cache.
#[derive(Clone)]
pub struct WechatContext {
    pub(crate) client: Arc<WechatClient>,
    pub(crate) token_manager: Arc<TokenManager>,
}

impl std::fmt::Debug for WechatContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WechatContext")
            .field("client", &"WechatClient { .. }")
            .field("token_manager", &"TokenManager { .. }")
            .finish()
    }
}

impl WechatContext {
    pub fn new(client: Arc<WechatClient>, token_manager: Arc<TokenManager>) -> Self {
        Self {
            client,
            token_manager,
        }
    }

    /// Build a context whose token manager shares `client`'s connection pool.
    pub fn from_client(client: WechatClient) -> Self {
        let token_manager = Arc::new(TokenManager::new(client.clone()));
        Self::new(Arc::new(client), token_manager)
    }

    pub fn client(&self) -> &WechatClient {
        &self.client
    }

    pub fn token_manager(&self) -> &TokenManager {
        &self.token_manager
    }
}

/// Common surface of the API families built on a [`WechatContext`].
pub trait WechatApi: Send + Sync {
    fn context(&self) -> &WechatContext;

    /// Name used as log prefix and in error messages
    fn api_name(&self) -> &'static str;

    /// Reject an empty (or whitespace-only) request argument before any
    /// network call, returning it trimmed.
    ///
    /// # Errors
    /// `WechatError::Config` naming the API and the argument
    fn require_arg<'a>(&self, name: &str, value: &'a str) -> Result<&'a str, WechatError> {
        let value = value.trim();
        if value.is_empty() {
            return Err(WechatError::Config(format!(
                "{}: {} must not be empty",
                self.api_name(),
                name
            )));
        }
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AppId, AppSecret};

    struct DemoApi(WechatContext);

    impl WechatApi for DemoApi {
        fn context(&self) -> &WechatContext {
            &self.0
        }

        fn api_name(&self) -> &'static str {
            "demo_api"
        }
    }

    fn api() -> DemoApi {
        let client = WechatClient::builder()
            .appid(AppId::new("wx1234567890abcdef").unwrap())
            .secret(AppSecret::new("secret1234567890ab").unwrap())
            .build()
            .unwrap();
        DemoApi(WechatContext::from_client(client))
    }

    #[test]
    fn test_require_arg_trims() {
        assert_eq!(api().require_arg("code", "  abc \n").unwrap(), "abc");
    }

    #[test]
    fn test_require_arg_names_api_and_argument() {
        match api().require_arg("scope", " \t ") {
            Err(WechatError::Config(message)) => {
                assert_eq!(message, "demo_api: scope must not be empty");
            }
            other => panic!("unexpected result: {other:?}"),
        }
        assert_eq!(api().context().client().appid(), "wx1234567890abcdef");
    }
}
